use crate::synth::DEFAULT_SAMPLE_RATE;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

/// Settings for a [`PhrasePlayer`](crate::player::PhrasePlayer) and its output device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Rate at which phrases are rendered and played, in samples per second.
    pub sample_rate: u32,
    /// Name of the output device to use, or `None` for the default device.
    pub output_device: Option<String>,
    /// Whether a phrase that renders to no samples still reports completion.
    ///
    /// When disabled, such a phrase ends without its completion callback ever being invoked.
    pub complete_silent_phrases: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            output_device: None,
            complete_silent_phrases: true,
        }
    }
}

impl PlayerConfig {
    /// Reads a config from a JSON file, using defaults for any missing fields.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid("sample_rate must be positive"));
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Malformed config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: PlayerConfig = serde_json::from_str(r#"{"output_device": "USB Audio"}"#).unwrap();
        assert_eq!(config.sample_rate, 44_100);
        assert_eq!(config.output_device.as_deref(), Some("USB Audio"));
        assert!(config.complete_silent_phrases);
    }

    #[test]
    fn test_zero_sample_rate_is_rejected() {
        let config = PlayerConfig {
            sample_rate: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(PlayerConfig::default().validate().is_ok());
    }

    #[test]
    fn test_read_from_file() {
        let path = std::env::temp_dir().join(format!("phrase-engine-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"sample_rate": 48000, "complete_silent_phrases": false}"#).unwrap();
        let config = PlayerConfig::from_json_file(&path);
        std::fs::remove_file(&path).ok();

        let config = config.unwrap();
        assert_eq!(config.sample_rate, 48_000);
        assert_eq!(config.output_device, None);
        assert!(!config.complete_silent_phrases);
    }
}
