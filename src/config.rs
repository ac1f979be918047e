//! Stream configuration.
//!
//! Everything is a constructor parameter; the JSON file is only a
//! convenient way to keep a run's settings together.

use crate::data::transforms::LabelMode;
use crate::error::{check_probability, DataError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Examples per batch.
    pub batch_size: usize,
    /// Window length for character streams.
    pub seq_len: usize,
    /// Bernoulli probability of the (primary) drop mask.
    pub drop_prob: f32,
    /// Second mask probability; enables the two-mask layout for PTB.
    pub drop_prob_secondary: Option<f32>,
    /// Width H of the single drop mask.
    pub hidden_dim: usize,
    /// Cap on the number of examples per split.
    pub max_examples: Option<usize>,
    /// Random window offset per epoch on the training split.
    pub augment: bool,
    pub label_mode: LabelMode,
    pub shuffle_train: bool,
    /// Master seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Reproduces the variant whose evaluation mask reuses the primary
    /// probability for the secondary channel.
    pub eval_secondary_uses_primary: bool,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            seq_len: 100,
            drop_prob: 0.5,
            drop_prob_secondary: None,
            hidden_dim: 100,
            max_examples: None,
            augment: true,
            label_mode: LabelMode::Final,
            shuffle_train: true,
            seed: None,
            eval_secondary_uses_primary: false,
        }
    }
}

impl StreamConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: StreamConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DataError::InvalidConfig("batch_size must be positive".into()));
        }
        if self.seq_len == 0 {
            return Err(DataError::InvalidConfig("seq_len must be positive".into()));
        }
        if self.hidden_dim == 0 {
            return Err(DataError::InvalidConfig("hidden_dim must be positive".into()));
        }
        if self.max_examples == Some(0) {
            return Err(DataError::InvalidConfig("max_examples must be positive when set".into()));
        }
        check_probability(self.drop_prob)?;
        if let Some(p) = self.drop_prob_secondary {
            check_probability(p)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: StreamConfig = serde_json::from_str(
            r#"{ "batch_size": 32, "drop_prob": 0.25, "label_mode": { "mode": "per_step", "sentinel": -1 } }"#,
        )
        .unwrap();
        assert_eq!(config.batch_size, 32);
        assert_eq!(config.drop_prob, 0.25);
        assert_eq!(config.hidden_dim, 100);
        assert_eq!(config.label_mode, LabelMode::PerStep { sentinel: -1 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let bad_prob = StreamConfig {
            drop_prob: 1.2,
            ..StreamConfig::default()
        };
        assert!(matches!(bad_prob.validate(), Err(DataError::InvalidProbability(_))));

        let bad_secondary = StreamConfig {
            drop_prob_secondary: Some(-0.5),
            ..StreamConfig::default()
        };
        assert!(bad_secondary.validate().is_err());

        let no_batch = StreamConfig {
            batch_size: 0,
            ..StreamConfig::default()
        };
        assert!(matches!(no_batch.validate(), Err(DataError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streams.json");
        std::fs::write(&path, r#"{ "seed": 7, "augment": false }"#).unwrap();

        let config = StreamConfig::from_json_file(&path).unwrap();
        assert_eq!(config.seed, Some(7));
        assert!(!config.augment);

        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(StreamConfig::from_json_file(&path), Err(DataError::Json(_))));
    }
}
