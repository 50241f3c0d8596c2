//! Output rendering for CLI commands.
//!
//! The teacher's CLI also renders YAML; this workspace doesn't depend on
//! `serde_yaml`, so only human-readable and JSON rendering are supported.

use clap::ValueEnum;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, one command's worth of prose and tables.
    Human,
    /// Pretty-printed JSON for scripting.
    Json,
}

pub trait Output {
    fn write<W: Write>(&self, writer: W, format: OutputFormat) -> anyhow::Result<()>
    where
        Self: Serialize,
    {
        match format {
            OutputFormat::Human => self.write_human(writer),
            OutputFormat::Json => self.write_json(writer),
        }
    }

    fn write_human<W: Write>(&self, writer: W) -> anyhow::Result<()>;

    fn write_json<W: Write>(&self, writer: W) -> anyhow::Result<()>
    where
        Self: Serialize,
    {
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}

impl OutputFormat {
    pub fn print<T: Output + Serialize>(self, data: &T) -> anyhow::Result<()> {
        data.write(io::stdout(), self)?;
        if self == OutputFormat::Json {
            println!();
        }
        Ok(())
    }
}
