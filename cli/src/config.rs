//! Configuration loading for the CLI.
//!
//! Precedence, highest first: an explicit `--config` path, the
//! `RAGCOORD_CONFIG` environment variable, `./ragcoord.toml`,
//! `./.ragcoord.toml`, then [`ragcoord_core::Config::default`]. Whatever is
//! loaded is then layered with `RAGCOORD_`-prefixed environment overrides and
//! validated before use.

use std::path::Path;

use anyhow::Context;
use ragcoord_core::Config;

const ENV_CONFIG_PATH: &str = "RAGCOORD_CONFIG";
const DEFAULT_PATHS: &[&str] = &["ragcoord.toml", ".ragcoord.toml"];

/// Loads and validates the effective configuration.
pub fn load_config(explicit_path: Option<&Path>) -> anyhow::Result<Config> {
    let config = load_raw_config(explicit_path)?;
    config.validate().context("configuration failed validation")?;
    Ok(config)
}

/// Loads the effective configuration without validating it, so `config
/// validate`/`config show` can report on a broken config instead of just
/// failing to start.
pub fn load_raw_config(explicit_path: Option<&Path>) -> anyhow::Result<Config> {
    let config = match explicit_path {
        Some(path) => read_toml(path)?,
        None => load_from_environment_or_defaults()?,
    };
    Ok(config.with_env_overrides())
}

fn load_from_environment_or_defaults() -> anyhow::Result<Config> {
    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        let path = Path::new(&path);
        if path.exists() {
            tracing::info!(path = %path.display(), "loading configuration from {ENV_CONFIG_PATH}");
            return read_toml(path);
        }
        tracing::warn!(path = %path.display(), "{ENV_CONFIG_PATH} points to a nonexistent file, ignoring");
    }

    for candidate in DEFAULT_PATHS {
        let path = Path::new(candidate);
        if path.exists() {
            tracing::info!(path = %path.display(), "loading configuration");
            return read_toml(path);
        }
    }

    tracing::info!("no configuration file found, using defaults");
    Ok(Config::default())
}

fn read_toml(path: &Path) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration file: {}", path.display()))?;
    Config::from_toml_str(&content)
        .with_context(|| format!("failed to parse configuration file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir.path()).unwrap();
        let config = load_config(None).unwrap();
        std::env::set_current_dir(original).unwrap();
        assert_eq!(config.cache.memory.capacity, 1000);
    }

    #[test]
    fn explicit_path_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[cache.memory]\ncapacity = 42\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.cache.memory.capacity, 42);
    }

    #[test]
    fn explicit_path_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "not valid toml [[[").unwrap();
        assert!(load_config(Some(&path)).is_err());
    }
}
