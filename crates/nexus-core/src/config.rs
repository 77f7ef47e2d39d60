//! User configuration (`config.toml`).
//!
//! ```toml
//! [solver]
//! max_iterations = 200
//! epsilon = 0.0001
//! ```
//!
//! Every key is optional; missing keys keep their defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use nexus_engine::engine::SolverSettings;
use serde::{Deserialize, Serialize};

use crate::error::{NexusError, Result};

const MAX_CONFIG_FILE_BYTES: u64 = 64 * 1024;
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub solver: SolverSettings,
}

impl Config {
    /// Load configuration from `path`, or from the user config directory when
    /// `path` is None.
    ///
    /// A missing file in the user config directory gives the defaults; a
    /// missing explicit path is an error.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        match path {
            Some(path) if !path.exists() => Err(NexusError::ConfigNotFound(path.to_path_buf())),
            Some(path) => Config::load_from(path),
            None => match user_config_path() {
                Some(path) if path.exists() => Config::load_from(&path),
                _ => {
                    log::debug!("no user config file, using defaults");
                    Ok(Config::default())
                }
            },
        }
    }

    /// Read and parse a config file.
    pub fn load_from(path: &Path) -> Result<Config> {
        let size = std::fs::metadata(path)?.len();
        if size > MAX_CONFIG_FILE_BYTES {
            return Err(NexusError::ConfigTooLarge {
                path: path.to_path_buf(),
                size,
                max: MAX_CONFIG_FILE_BYTES,
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config = Config::parse(&content).map_err(|source| NexusError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> std::result::Result<Config, toml::de::Error> {
        let config: Config = toml::from_str(content)?;
        if config.solver.max_iterations == 0 {
            log::warn!("solver.max_iterations is 0; goal seek can only accept its seed value");
        }
        Ok(config)
    }
}

/// `<config_dir>/nexus/config.toml` for the current platform.
pub fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "nexus")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push(CONFIG_FILE_NAME);
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("nexus-config-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_solver_section() {
        let config = Config::parse("[solver]\nmax_iterations = 250\n").unwrap();
        assert_eq!(config.solver.max_iterations, 250);
        assert_eq!(config.solver.epsilon, 0.001);
        assert_eq!(config.solver.min_slope, 1e-9);
    }

    #[test]
    fn test_malformed_config_is_error() {
        assert!(Config::parse("[solver]\nepsilon = \"tiny\"\n").is_err());
        assert!(Config::parse("[solver").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let path = temp_path("ok.toml");
        std::fs::write(&path, "[solver]\nepsilon = 0.5\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.solver.epsilon, 0.5);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_load_reports_parse_errors_with_path() {
        let path = temp_path("bad.toml");
        std::fs::write(&path, "solver = 3\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, NexusError::ConfigParse { .. }));
        assert!(err.to_string().contains("bad.toml"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_explicit_path_is_error() {
        let path = temp_path("missing.toml");
        assert!(matches!(
            Config::load(Some(&path)),
            Err(NexusError::ConfigNotFound(_))
        ));
    }
}
