//! Configuration loading

use anyhow::Result;
use std::path::Path;

use crate::Config;

/// Explicit config file path
pub const CONFIG_PATH_ENV: &str = "ELSA_CONFIG_PATH";

/// Load and validate configuration
///
/// Config file search order:
/// 1. `ELSA_CONFIG_PATH` environment variable (explicit path)
/// 2. ./config.yaml (current working directory)
/// 3. /config/config.yaml (Kubernetes mount path)
/// 4. Fall back to environment variables only
///
/// Logging is not initialized yet at this point, so progress goes to stderr.
pub fn load_config() -> Result<Config> {
    let config = match find_config_file() {
        Some(path) => {
            eprintln!("Loading config from {path}");
            Config::from_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load {path}: {e}"))?
        }
        None => {
            eprintln!("No config file found, using environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?
        }
    };

    // Fail fast on misconfigurations
    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Config validation error: {error}");
        }
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    Ok(config)
}

fn find_config_file() -> Option<String> {
    std::env::var(CONFIG_PATH_ENV)
        .ok()
        .filter(|p| Path::new(p).exists())
        .or_else(|| existing("config.yaml"))
        .or_else(|| existing("/config/config.yaml"))
}

fn existing(path: &str) -> Option<String> {
    Path::new(path).exists().then(|| path.to_string())
}
