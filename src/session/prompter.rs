//! Terminal prompt using dialoguer.

use std::io;

use async_trait::async_trait;
use dialoguer::Input;

use crate::session::{Prompter, UserChoice};

const RULE: &str = "────────────────────────────────────────";

/// Prints the message and reads the answer from the terminal.
pub struct DialoguerPrompter;

#[async_trait]
impl Prompter for DialoguerPrompter {
    async fn choose(&self, message: &str, can_regenerate: bool) -> io::Result<UserChoice> {
        println!();
        println!("Generated commit message:");
        println!("{RULE}");
        println!("{message}");
        println!("{RULE}");

        let prompt = if can_regenerate {
            "Commit? [y]es / [n]o / [e]dit / [r]egenerate"
        } else {
            "Commit? [y]es / [n]o / [e]dit"
        };

        // The read blocks; run it off the runtime so Ctrl-C can win the race.
        let answer = tokio::task::spawn_blocking(move || {
            Input::<String>::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        })
        .await
        .map_err(io::Error::other)?
        .map_err(io::Error::other)?;

        Ok(UserChoice::parse(&answer))
    }

    fn notify(&self, note: &str) {
        println!("{note}");
    }
}
