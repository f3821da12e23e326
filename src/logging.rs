//! Logging setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose { "gcommit=debug" } else { "warn" }
}

/// Install a stderr subscriber. `RUST_LOG` overrides `--verbose`.
///
/// Stdout stays reserved for the message and prompts. Calling this twice is
/// harmless; the second call is ignored.
pub fn setup_logging(verbose: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose),
        )
        .try_init();

    tracing::debug!("Logging initialized: verbose={verbose}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(true), "gcommit=debug");
        assert_eq!(default_directive(false), "warn");
    }
}
