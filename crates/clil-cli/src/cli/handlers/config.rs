//! Configuration command handlers

use crate::config::CliConfig;
use crate::error::Result;
use crate::output::{compress_path, json_output};
use clil_common::ConfigLoader;
use std::path::Path;

/// Handle `config show`
pub fn handle_show(config: &CliConfig, json: bool) -> Result<()> {
    if json {
        return json_output(config);
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

/// Handle `config path`
pub fn handle_path(path: Option<&Path>) -> Result<()> {
    let path = CliConfig::resolve_path(path)?;
    let marker = if path.exists() { "" } else { " (not created)" };
    println!("{}{marker}", compress_path(&path));
    Ok(())
}
