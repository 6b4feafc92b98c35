// Caller-tunable generation settings.
//
// `BackingConfig` holds the knobs exposed to whoever requests an
// accompaniment: the two syncopation probabilities, how many generations to
// step, an optional seed, and the octave shift the melody renderer applies.
// It round-trips through JSON; missing fields take their defaults.
//
// The swing and voice-leading probabilities are fixed constants (rules.rs,
// voice_leading.rs) and deliberately absent here.

use crate::rules::PatternParams;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange { name: &'static str, value: f64 },
    #[error("octave_shift must be -1, 0 or 1, got {0}")]
    OctaveShiftOutOfRange(i8),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackingConfig {
    /// Chance that the syncopation rule fires at a beat.
    pub syncopation_probability: f64,
    /// Width of the kick band and of the crash band in the syncopation rule.
    pub kick_or_crash_probability: f64,
    /// Melody transposition in octaves. Passed through to the renderer.
    pub octave_shift: i8,
    /// Generations to step the engine.
    pub steps: u32,
    /// Seed for a reproducible run. `None` lets the caller pick one.
    pub seed: Option<u64>,
}

impl Default for BackingConfig {
    fn default() -> Self {
        let params = PatternParams::default();
        BackingConfig {
            syncopation_probability: params.syncopation_probability,
            kick_or_crash_probability: params.kick_or_crash_probability,
            octave_shift: 0,
            steps: 1,
            seed: None,
        }
    }
}

impl BackingConfig {
    /// Parse and validate a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BackingConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("syncopation_probability", self.syncopation_probability),
            ("kick_or_crash_probability", self.kick_or_crash_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ProbabilityOutOfRange { name, value });
            }
        }
        if !(-1..=1).contains(&self.octave_shift) {
            return Err(ConfigError::OctaveShiftOutOfRange(self.octave_shift));
        }
        Ok(())
    }

    pub fn pattern_params(&self) -> PatternParams {
        PatternParams {
            syncopation_probability: self.syncopation_probability,
            kick_or_crash_probability: self.kick_or_crash_probability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BackingConfig::default();
        assert_eq!(config.syncopation_probability, 0.5);
        assert_eq!(config.kick_or_crash_probability, 0.2);
        assert_eq!(config.steps, 1);
        assert_eq!(config.seed, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_config_serializes() {
        let config = BackingConfig {
            seed: Some(7),
            ..Default::default()
        };
        let json = serde_json::to_string_pretty(&config).unwrap();
        let restored = BackingConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config =
            BackingConfig::from_json(r#"{"syncopation_probability": 0.9, "seed": 3}"#).unwrap();
        assert_eq!(config.syncopation_probability, 0.9);
        assert_eq!(config.kick_or_crash_probability, 0.2);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.pattern_params().syncopation_probability, 0.9);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(matches!(
            BackingConfig::from_json(r#"{"kick_or_crash_probability": 1.5}"#),
            Err(ConfigError::ProbabilityOutOfRange {
                name: "kick_or_crash_probability",
                ..
            })
        ));
        assert!(matches!(
            BackingConfig::from_json(r#"{"octave_shift": 2}"#),
            Err(ConfigError::OctaveShiftOutOfRange(2))
        ));
        assert!(matches!(
            BackingConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
        let nan = BackingConfig {
            syncopation_probability: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());
    }
}
