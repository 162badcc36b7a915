//! Config command - print or write an example configuration

use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::config::Config;

pub fn execute(config: &Config, example: bool, output: Option<PathBuf>) -> Result<()> {
    let text = if example {
        Config::example_toml()?
    } else {
        toml::to_string_pretty(config).map_err(|e| anyhow!("Failed to serialize configuration: {}", e))?
    };

    match output {
        Some(path) => {
            if example {
                std::fs::write(&path, text)?;
            } else {
                config.save_to_file(&path)?;
            }
            log::info!("Configuration written to {}", path.display());
        }
        None => print!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_written_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fidocad.toml");
        execute(&Config::default(), true, Some(path.clone())).unwrap();
        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded.layers.len(), 1);
    }

    #[test]
    fn test_effective_config_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("current.toml");
        let mut config = Config::default();
        config.export.resolution = 4.0;
        execute(&config, false, Some(path.clone())).unwrap();
        assert_eq!(Config::load_from_file(&path).unwrap(), config);
    }
}
