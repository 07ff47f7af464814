//! Race configuration: roster, board length and batch parameters.
//!
//! Configuration arrives as JSON. Parsing and validation are separate steps;
//! [`RaceConfig::from_json`] does both so callers only see valid configs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    DEFAULT_BOARD_LENGTH, DEFAULT_RUNS, DEFAULT_SEED, MAX_BOARD_LENGTH, MIN_BOARD_LENGTH,
};
use crate::skill::{Phase, SkillSpec, SkillTag};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceConfig {
    #[serde(default = "RaceConfig::default_board_length")]
    pub board_length: u32,
    #[serde(default = "RaceConfig::default_runs")]
    pub runs: u32,
    #[serde(default = "RaceConfig::default_seed")]
    pub seed: u64,
    pub roster: Vec<CompetitorSpec>,
}

impl RaceConfig {
    const fn default_board_length() -> u32 {
        DEFAULT_BOARD_LENGTH
    }

    const fn default_runs() -> u32 {
        DEFAULT_RUNS
    }

    const fn default_seed() -> u64 {
        DEFAULT_SEED
    }

    /// Config with default batch parameters around `roster`.
    #[must_use]
    pub fn with_roster(roster: Vec<CompetitorSpec>) -> Self {
        Self {
            board_length: DEFAULT_BOARD_LENGTH,
            runs: DEFAULT_RUNS,
            seed: DEFAULT_SEED,
            roster,
        }
    }

    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Parse` for malformed JSON and the matching
    /// validation error when a field is out of bounds.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration against documented bounds.
    ///
    /// Roster identity (empty roster, duplicate keys) is checked when the
    /// roster is built.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_board_length(self.board_length)?;
        if self.runs == 0 {
            return Err(ConfigError::MinViolation {
                field: "runs",
                min: 1.0,
                value: 0.0,
            });
        }
        for competitor in &self.roster {
            competitor.validate()?;
        }
        Ok(())
    }
}

pub(crate) fn validate_board_length(board_length: u32) -> Result<(), ConfigError> {
    if !(MIN_BOARD_LENGTH..=MAX_BOARD_LENGTH).contains(&board_length) {
        return Err(ConfigError::RangeViolation {
            field: "board_length",
            min: f64::from(MIN_BOARD_LENGTH),
            max: f64::from(MAX_BOARD_LENGTH),
            value: f64::from(board_length),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorSpec {
    /// Stable identity; never the display name.
    pub key: String,
    pub name: String,
    pub weight: f64,
    #[serde(default)]
    pub skills: Vec<SkillSpec>,
}

impl CompetitorSpec {
    #[must_use]
    pub fn new(key: impl Into<String>, name: impl Into<String>, weight: f64) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            weight,
            skills: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_skill(mut self, skill: SkillSpec) -> Self {
        self.skills.push(skill);
        self
    }

    /// # Errors
    ///
    /// Returns `ConfigError` for a non-positive weight or an invalid skill.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(ConfigError::InvalidWeight {
                competitor: self.key.clone(),
                value: self.weight,
            });
        }
        for (slot, skill) in self.skills.iter().enumerate() {
            skill.validate(&self.key, slot)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be at least {min} (got {value})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("competitor '{competitor}' weight must be finite and positive (got {value})")]
    InvalidWeight { competitor: String, value: f64 },
    #[error("competitor '{competitor}' skill {slot} probability must be within [0, 1] (got {value})")]
    InvalidProbability {
        competitor: String,
        slot: usize,
        value: f64,
    },
    #[error("competitor '{competitor}' skill {slot} has an empty face list")]
    EmptyFaces { competitor: String, slot: usize },
    #[error("competitor '{competitor}' skill {slot} has a zero face")]
    ZeroFace { competitor: String, slot: usize },
    #[error("competitor '{competitor}' uses {skill}, which is not registered for {phase}")]
    UnregisteredSkill {
        competitor: String,
        skill: SkillTag,
        phase: Phase,
    },
    #[error("{skill} declares {declared} but was registered for {requested}")]
    PhaseMismatch {
        skill: SkillTag,
        declared: Phase,
        requested: Phase,
    },
    #[error("{skill} is already registered for {phase}")]
    DuplicateRegistration { skill: SkillTag, phase: Phase },
    #[error("failed to parse race configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::SkillKind;

    const MINIMAL: &str = r#"{
        "roster": [
            { "key": "a", "name": "Alpha", "weight": 1.5 },
            { "key": "b", "name": "Beta", "weight": 2.0,
              "skills": [{ "kind": "stack_surge", "probability": 0.5 }] }
        ]
    }"#;

    #[test]
    fn defaults_fill_batch_parameters() {
        let config = RaceConfig::from_json(MINIMAL).unwrap();
        assert_eq!(config.board_length, DEFAULT_BOARD_LENGTH);
        assert_eq!(config.runs, DEFAULT_RUNS);
        assert_eq!(config.seed, DEFAULT_SEED);
        assert_eq!(config.roster.len(), 2);
        assert_eq!(config.roster[1].skills[0].kind, SkillKind::StackSurge);
        assert!(config.roster[0].skills.is_empty());
    }

    #[test]
    fn validate_rejects_out_of_range_fields() {
        let mut config = RaceConfig::from_json(MINIMAL).unwrap();
        config.board_length = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::RangeViolation { field: "board_length", .. })
        ));
        config.board_length = 24;
        config.runs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MinViolation { field: "runs", .. })
        ));
        config.runs = 10;
        config.roster[0].weight = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = RaceConfig::from_json("{ \"roster\": 3 }").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse race configuration"));
    }

    #[test]
    fn unknown_skill_kind_fails_to_parse() {
        let json = r#"{ "roster": [{ "key": "a", "name": "A", "weight": 1.0,
            "skills": [{ "kind": "teleport", "probability": 1.0 }] }] }"#;
        assert!(matches!(
            RaceConfig::from_json(json),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn config_roundtrips_through_json() {
        let config = RaceConfig::with_roster(vec![
            CompetitorSpec::new("a", "Alpha", 1.2)
                .with_skill(SkillSpec::new(SkillKind::TrailingBoost { bonus: 2 }, 0.4)),
        ]);
        let json = serde_json::to_string(&config).unwrap();
        let restored = RaceConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
    }
}
