//! Session configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

pub const MAX_LEVEL: u8 = 10;
pub const MAX_HANDICAP: u8 = 9;
const MAX_MEMORY_MB: u32 = 1024;

/// Options recognized when a session starts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Human plays white; the engine takes black.
    pub player_is_white: bool,
    pub undo_allowed: bool,
    /// Move the level up or down between games depending on who won.
    pub autolevel: bool,
    pub start_level: u8,
    pub komi: f32,
    pub random_seed: u64,
    /// Search budget for the engine, in MiB.
    pub memory_mb: u32,
    pub requested_handicap: u8,
    /// Record to resume from.
    pub infile: Option<PathBuf>,
    /// Where Save and ForceQuit write the record.
    pub outfile: Option<PathBuf>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_is_white: false,
            undo_allowed: false,
            autolevel: false,
            start_level: 1,
            komi: 6.5,
            random_seed: 0,
            memory_mb: 8,
            requested_handicap: 0,
            infile: None,
            outfile: None,
        }
    }
}

impl GameConfig {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_level > MAX_LEVEL {
            return Err(Error::Config(format!(
                "start_level must be at most {MAX_LEVEL}, got {}",
                self.start_level
            )));
        }
        if self.requested_handicap > MAX_HANDICAP {
            return Err(Error::Config(format!(
                "requested_handicap must be at most {MAX_HANDICAP}, got {}",
                self.requested_handicap
            )));
        }
        if !self.komi.is_finite() {
            return Err(Error::Config("komi must be a finite number".to_string()));
        }
        if self.memory_mb == 0 || self.memory_mb > MAX_MEMORY_MB {
            return Err(Error::Config(format!(
                "memory_mb must be within 1..={MAX_MEMORY_MB}, got {}",
                self.memory_mb
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = GameConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.komi, 6.5);
        assert!(!config.player_is_white);
    }

    #[test]
    fn from_json_fills_missing_fields_with_defaults() {
        let config =
            GameConfig::from_json(r#"{"player_is_white": true, "outfile": "game.grec"}"#).unwrap();

        assert!(config.player_is_white);
        assert_eq!(config.outfile, Some(PathBuf::from("game.grec")));
        assert_eq!(config.start_level, 1);
        assert_eq!(config.infile, None);
    }

    #[test]
    fn from_json_rejects_out_of_range_values() {
        let err = GameConfig::from_json(r#"{"start_level": 11}"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = GameConfig::from_json(r#"{"requested_handicap": 10}"#).unwrap_err();
        assert!(err.to_string().contains("requested_handicap"));

        let err = GameConfig::from_json(r#"{"memory_mb": 0}"#).unwrap_err();
        assert!(err.to_string().contains("memory_mb"));
    }

    #[test]
    fn from_json_reports_malformed_input() {
        let err = GameConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn from_file_reads_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.json");
        std::fs::write(&path, r#"{"komi": 0.5, "requested_handicap": 3}"#).unwrap();

        let config = GameConfig::from_file(&path).unwrap();

        assert_eq!(config.komi, 0.5);
        assert_eq!(config.requested_handicap, 3);
    }
}
