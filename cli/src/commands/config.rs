//! The `config` command group: validate and display the effective config.

use clap::Subcommand;
use ragcoord_core::Config;
use serde::Serialize;

use crate::output::{Output, OutputFormat};

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate the effective configuration.
    Validate,
    /// Print the effective configuration (after file + environment
    /// overrides) as it reaches the coordinator.
    Show,
}

#[derive(Debug, Serialize)]
pub struct ConfigValidation {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl Output for ConfigValidation {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        if self.is_valid {
            writeln!(writer, "configuration is valid")?;
        } else {
            writeln!(writer, "configuration is invalid: {}", self.error.as_deref().unwrap_or("unknown"))?;
        }
        Ok(())
    }
}

impl Output for Config {
    fn write_human<W: std::io::Write>(&self, mut writer: W) -> anyhow::Result<()> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| anyhow::anyhow!("failed to render configuration: {e}"))?;
        write!(writer, "{toml}")?;
        Ok(())
    }
}

pub fn handle_config_command(command: ConfigCommands, config: &Config, format: OutputFormat) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Validate => {
            let result = match config.validate() {
                Ok(()) => ConfigValidation { is_valid: true, error: None },
                Err(e) => ConfigValidation { is_valid: false, error: Some(e.to_string()) },
            };
            format.print(&result)
        }
        ConfigCommands::Show => format.print(config),
    }
}
