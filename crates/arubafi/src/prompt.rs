//! Terminal prompting for connection attributes missing from the profile.

use std::io::{self, IsTerminal};

use secrecy::SecretString;

use arubafi_api::credentials::{NonInteractive, Prompter};
use arubafi_api::Error;

/// Asks on the controlling terminal: `dialoguer` for text and yes/no,
/// `rpassword` for secrets.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompter;

fn prompt_failed(prompt: &str, err: &dyn std::fmt::Display) -> Error {
    Error::Configuration {
        message: format!("{prompt}: {err}"),
    }
}

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str) -> Result<String, Error> {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .map_err(|e| prompt_failed(prompt, &e))
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool, Error> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| prompt_failed(prompt, &e))
    }

    fn password(&self, prompt: &str) -> Result<SecretString, Error> {
        rpassword::prompt_password(format!("{prompt}: "))
            .map(SecretString::from)
            .map_err(|e| prompt_failed(prompt, &e))
    }
}

/// The terminal prompter when stdin is a terminal, otherwise one that
/// refuses every question.
pub fn for_stdin() -> Box<dyn Prompter> {
    if io::stdin().is_terminal() {
        Box::new(TerminalPrompter)
    } else {
        Box::new(NonInteractive)
    }
}
