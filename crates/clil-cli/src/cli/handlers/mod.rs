//! Command handlers for the CLIL CLI

pub mod admin;
pub mod auth;
pub mod config;
pub mod documents;
pub mod materials;
pub mod subjects;
pub mod system;

use crate::error::{CliError, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password};

fn prompt_text(prompt: &str) -> Result<String> {
    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact_text()
        .map_err(CliError::interactive)
}

fn prompt_password(confirm: bool) -> Result<String> {
    let theme = ColorfulTheme::default();
    let mut prompt = Password::with_theme(&theme).with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Repeat password", "Passwords do not match");
    }
    prompt.interact().map_err(CliError::interactive)
}

/// Ask before a destructive action unless `--yes` was given
fn confirm(prompt: &str, skip: bool) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(CliError::interactive)
}
