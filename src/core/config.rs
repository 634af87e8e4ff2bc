//! Compiler settings, loaded from RON.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::schema::ids::RecordId;

/// Priority written on every generated topic.
pub const DEFAULT_TOPIC_PRIORITY: u32 = 2500;

/// Rounds a batch run asks the speaker resolver before giving up on a scene.
pub const DEFAULT_MAX_RESOLUTION_ROUNDS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Prepended to generated editor ids and script names. May be empty.
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_max_resolution_rounds")]
    pub max_resolution_rounds: u32,
    #[serde(default = "default_topic_priority")]
    pub topic_priority: u32,
    /// Route voice-type speakers into per-voice-type generic quests.
    #[serde(default)]
    pub generic_voice_quests: bool,
    /// Keyword excluding commanded actors from generic quests.
    #[serde(default)]
    pub commanded_voice_excluded_keyword: Option<RecordId>,
}

fn default_max_resolution_rounds() -> u32 {
    DEFAULT_MAX_RESOLUTION_ROUNDS
}

fn default_topic_priority() -> u32 {
    DEFAULT_TOPIC_PRIORITY
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            max_resolution_rounds: DEFAULT_MAX_RESOLUTION_ROUNDS,
            topic_priority: DEFAULT_TOPIC_PRIORITY,
            generic_voice_quests: false,
            commanded_voice_excluded_keyword: None,
        }
    }
}

impl CompilerConfig {
    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(contents: &str) -> Result<Self, ConfigError> {
        let config: CompilerConfig = ron::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidPrefix(self.prefix.clone()));
        }
        if self.max_resolution_rounds == 0 {
            return Err(ConfigError::NoResolutionRounds);
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("prefix {0:?} contains whitespace")]
    InvalidPrefix(String),
    #[error("max_resolution_rounds must be at least 1")]
    NoResolutionRounds,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config = CompilerConfig::parse_ron(r#"(prefix: "MQ")"#).unwrap();
        assert_eq!(config.prefix, "MQ");
        assert_eq!(config.max_resolution_rounds, DEFAULT_MAX_RESOLUTION_ROUNDS);
        assert_eq!(config.topic_priority, DEFAULT_TOPIC_PRIORITY);
        assert!(!config.generic_voice_quests);
    }

    #[test]
    fn full_config_parses() {
        let ron = r#"(
            prefix: "DLC",
            max_resolution_rounds: 2,
            topic_priority: 50,
            generic_voice_quests: true,
            commanded_voice_excluded_keyword: Some(2048),
        )"#;
        let config = CompilerConfig::parse_ron(ron).unwrap();
        assert_eq!(config.max_resolution_rounds, 2);
        assert_eq!(config.commanded_voice_excluded_keyword, Some(RecordId(2048)));
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(matches!(
            CompilerConfig::parse_ron(r#"(prefix: "My Mod")"#),
            Err(ConfigError::InvalidPrefix(_))
        ));
        assert!(matches!(
            CompilerConfig::parse_ron("(max_resolution_rounds: 0)"),
            Err(ConfigError::NoResolutionRounds)
        ));
        assert!(matches!(
            CompilerConfig::parse_ron("(prefix: 3)"),
            Err(ConfigError::Ron(_))
        ));
    }
}
