//! ui::prompts
//!
//! Interactive prompts and confirmations.
//!
//! # Design
//!
//! Prompts are only shown in interactive mode. In non-interactive mode,
//! operations requiring user input must either have defaults or fail
//! with a clear error message. Prompts read from stdin and write to
//! stderr, so stdout stays clean for the result summary.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::auth::{CredentialPrompt, RepoIdentity, Secret};

/// Errors from prompts.
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("prompt cancelled by user")]
    Cancelled,

    #[error("not in interactive mode")]
    NotInteractive,

    #[error("IO error: {0}")]
    IoError(String),
}

impl From<io::Error> for PromptError {
    fn from(e: io::Error) -> Self {
        PromptError::IoError(e.to_string())
    }
}

/// Prompt for confirmation (yes/no).
///
/// Returns `Ok(true)` if the user confirms, `Ok(false)` if they decline.
/// An empty answer takes `default`.
/// Returns `Err(PromptError::NotInteractive)` if not in interactive mode.
pub fn confirm(message: &str, default: bool, interactive: bool) -> Result<bool, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    let answer = read_line(&format!("{message} {hint} "))?;
    Ok(parse_yes_no(&answer).unwrap_or(default))
}

/// Prompt for text input. An empty answer takes `default`.
pub fn input(message: &str, default: Option<&str>, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    let prompt = match default {
        Some(default) => format!("{message} [{default}]: "),
        None => format!("{message}: "),
    };
    let answer = read_line(&prompt)?;
    let answer = answer.trim();
    Ok(if answer.is_empty() {
        default.unwrap_or_default().to_string()
    } else {
        answer.to_string()
    })
}

/// Prompt for masked input (e.g., passwords, tokens).
///
/// The input is not echoed to the terminal.
pub fn password(message: &str, interactive: bool) -> Result<Secret, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    let value = rpassword::prompt_password(format!("{message}: "))?;
    Ok(Secret::new(value.trim().to_string()))
}

fn read_line(prompt: &str) -> Result<String, PromptError> {
    let mut stderr = io::stderr();
    stderr.write_all(prompt.as_bytes())?;
    stderr.flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(PromptError::Cancelled);
    }
    Ok(line)
}

fn parse_yes_no(answer: &str) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Asks for a push credential on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalCredentialPrompt;

impl CredentialPrompt for TerminalCredentialPrompt {
    fn prompt(
        &self,
        identity: &RepoIdentity,
        username_hint: Option<&str>,
    ) -> io::Result<Option<(String, Secret)>> {
        eprintln!("No stored credential for {identity}.");
        let to_io = |e: PromptError| io::Error::new(io::ErrorKind::Other, e.to_string());
        let username = input("Username", username_hint.or(Some(crate::auth::DEFAULT_USERNAME)), true)
            .map_err(to_io)?;
        let token = password("Personal access token (empty to skip)", true).map_err(to_io)?;
        if token.is_empty() {
            return Ok(None);
        }
        Ok(Some((username, token)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_refuses() {
        assert!(matches!(
            confirm("Push?", true, false),
            Err(PromptError::NotInteractive)
        ));
        assert!(matches!(
            input("Name", None, false),
            Err(PromptError::NotInteractive)
        ));
        assert!(matches!(
            password("Token", false),
            Err(PromptError::NotInteractive)
        ));
    }

    #[test]
    fn yes_no_answers() {
        assert_eq!(parse_yes_no("Y\n"), Some(true));
        assert_eq!(parse_yes_no(" no "), Some(false));
        assert_eq!(parse_yes_no(""), None);
        assert_eq!(parse_yes_no("maybe"), None);
    }
}
