/**
 * Core configuration
 *
 * Every field has a default so a partial TOML file only overrides what it names.
 */
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::constants::{DEFAULT_CFM, DEFAULT_ERP, GRAVITY_Y, PHYSICS_TIMESTEP};
use crate::replay::HeaderMode;

/// Environment variable that overrides the replay directory
pub const REPLAY_DIR_ENV: &str = "SPHEREFALL_REPLAY_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")] Io(#[from] std::io::Error),
    #[error("invalid config: {0}")] Parse(#[from] toml::de::Error),
    #[error("timestep must be positive, got {0}")] Timestep(f32),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub gravity: [f32; 3],
    pub timestep: f32,
    pub erp: f32,
    pub cfm: f32,
    /// Directory holding saved replays and the recording scratch file
    pub replay_dir: PathBuf,
    pub header_mode: HeaderMode,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, GRAVITY_Y, 0.0],
            timestep: PHYSICS_TIMESTEP,
            erp: DEFAULT_ERP,
            cfm: DEFAULT_CFM,
            replay_dir: PathBuf::from("replays"),
            header_mode: HeaderMode::Lenient,
        }
    }
}

impl CoreConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = toml::from_str(source)?;
        if !(config.timestep.is_finite() && config.timestep > 0.0) {
            return Err(ConfigError::Timestep(config.timestep));
        }
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&source)?.with_env_overrides();
        log::info!("Loaded core config from {}", path.display());
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = replay_dir_from_env() {
            self.replay_dir = dir;
        }
        self
    }
}

/// Retrieve the replay directory override from the environment
pub fn replay_dir_from_env() -> Option<PathBuf> {
    std::env::var_os(REPLAY_DIR_ENV).filter(|v| !v.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = CoreConfig::from_toml_str("replay_dir = \"/tmp/r\"\nheader_mode = \"strict\"\n").unwrap();
        assert_eq!(config.replay_dir, PathBuf::from("/tmp/r"));
        assert_eq!(config.header_mode, HeaderMode::Strict);
        assert_eq!(config.timestep, PHYSICS_TIMESTEP);
        assert_eq!(config.gravity, [0.0, GRAVITY_Y, 0.0]);
    }

    #[test]
    fn rejects_zero_timestep() {
        assert!(matches!(CoreConfig::from_toml_str("timestep = 0.0"), Err(ConfigError::Timestep(_))));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(CoreConfig::from_toml_str("gravity = ["), Err(ConfigError::Parse(_))));
    }
}
