// Tool configuration loading for the testbed runner
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use testbed_common::config::ToolConfig;

/// Load a tool configuration from a JSON file
pub fn load_tool_config(config_path: &Path) -> Result<ToolConfig> {
    if !config_path.exists() {
        bail!("Tool config file not found: {}", config_path.display());
    }

    let content = fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let config: ToolConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    config.validate()?;
    Ok(config)
}

/// Resolve the tool configuration from CLI sources.
///
/// Precedence: explicit command line > config file > built-in default.
/// A command line replaces only the command, the file's prepare step is kept.
pub fn resolve_tool_config(
    config_path: Option<&Path>,
    command_line: Option<&str>,
) -> Result<ToolConfig> {
    let mut config = match config_path {
        Some(path) => load_tool_config(path)?,
        None => ToolConfig::default(),
    };

    if let Some(line) = command_line {
        config.command = ToolConfig::from_command_line(line)?.command;
    }

    Ok(config)
}
