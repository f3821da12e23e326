//! YAML config files: home (per-user) and local (per-project).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::{ApiKey, ConfigLayer, env_vars};
use crate::error::ConfigError;

/// Project config file name, searched from the working directory upward.
pub const LOCAL_CONFIG_NAME: &str = ".gcommit.yaml";

const DEFAULT_CONFIG: &str = "\
# gcommit configuration
llm:
  # api_key: sk-your-key-here
  model: gpt-4o-mini
  temperature: 0.3
  max_tokens: 500

commit:
  language: english
  format: conventional
";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    llm: LlmSection,
    commit: CommitSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LlmSection {
    api_key: Option<ApiKey>,
    base_url: Option<String>,
    model: Option<String>,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CommitSection {
    language: Option<String>,
    format: Option<String>,
    custom_template: Option<String>,
    auto_commit: Option<bool>,
    edit_before_commit: Option<bool>,
    max_regenerations: Option<u32>,
    max_diff_bytes: Option<usize>,
}

impl From<ConfigFile> for ConfigLayer {
    fn from(file: ConfigFile) -> Self {
        let ConfigFile { llm, commit } = file;
        ConfigLayer {
            api_key: llm.api_key,
            base_url: llm.base_url,
            model: llm.model,
            temperature: llm.temperature,
            max_tokens: llm.max_tokens,
            timeout_secs: llm.timeout_secs,
            max_retries: llm.max_retries,
            language: commit.language,
            format: commit.format,
            custom_template: commit.custom_template,
            auto_commit: commit.auto_commit,
            edit_before_commit: commit.edit_before_commit,
            max_regenerations: commit.max_regenerations,
            max_diff_bytes: commit.max_diff_bytes,
            hint: None,
        }
    }
}

/// Parse config file text. A file holding only comments is an empty layer.
pub fn parse_config(text: &str, path: &Path) -> Result<ConfigLayer, ConfigError> {
    let has_content = text
        .lines()
        .map(str::trim)
        .any(|l| !l.is_empty() && !l.starts_with('#'));
    if !has_content {
        return Ok(ConfigLayer::default());
    }

    let file: ConfigFile = serde_yaml_ng::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.into())
}

/// Where the home config lives, and whether the user named it explicitly.
///
/// Order: `--config`, `GCOMMIT_CONFIG`, `$XDG_CONFIG_HOME/gcommit/config.yaml`,
/// then the platform config directory.
pub fn home_config_path<F>(explicit: Option<&Path>, lookup: F) -> Option<(PathBuf, bool)>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(path) = explicit {
        return Some((path.to_path_buf(), true));
    }
    if let Some(path) = lookup(env_vars::CONFIG).filter(|p| !p.is_empty()) {
        return Some((PathBuf::from(path), true));
    }
    let base = lookup("XDG_CONFIG_HOME")
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some((base.join("gcommit").join("config.yaml"), false))
}

/// Load the home config.
///
/// A missing explicit path is an error. A missing implicit path gets a
/// commented default file so the user has something to edit.
pub fn load_home_config(explicit: Option<&Path>) -> Result<Option<ConfigLayer>, ConfigError> {
    let Some((path, is_explicit)) = home_config_path(explicit, |name| std::env::var(name).ok())
    else {
        warn!("Could not determine a config directory; skipping home config");
        return Ok(None);
    };

    if !path.exists() {
        if is_explicit {
            return Err(ConfigError::FileNotFound(path));
        }
        write_default_config(&path)?;
        println!("Created default config at {}", path.display());
        println!(
            "Set your API key there or via {}.",
            env_vars::API_KEY
        );
    }

    let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let layer = parse_config(&text, &path)?;
    info!("Loaded home config from {}", path.display());
    Ok(Some(layer))
}

/// Write the commented default config, creating parent directories.
pub fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    fs::write(path, DEFAULT_CONFIG).map_err(write_err)
}

/// Find `.gcommit.yaml` in `start` or its ancestors, stopping at the
/// repository root (the first directory containing `.git`).
pub fn find_local_config(start: &Path) -> Option<PathBuf> {
    for dir in start.ancestors() {
        let candidate = dir.join(LOCAL_CONFIG_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        if dir.join(".git").exists() {
            break;
        }
    }
    None
}

/// Load the local config. Unreadable or invalid files are skipped with a
/// warning.
pub fn load_local_config(start: &Path) -> Option<ConfigLayer> {
    let path = find_local_config(start)?;
    let loaded = fs::read_to_string(&path)
        .map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })
        .and_then(|text| parse_config(&text, &path));

    match loaded {
        Ok(layer) => {
            debug!("Loaded local config from {}", path.display());
            Some(layer)
        }
        Err(e) => {
            warn!("Could not read local config: {e}");
            None
        }
    }
}
