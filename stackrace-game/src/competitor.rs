use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::config::{CompetitorSpec, ConfigError};
use crate::numbers::index_to_u16;
use crate::rng::RaceRandom;
use crate::skill::{SkillRegistry, SkillSpec};

/// Dense roster index of a competitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitorId(u16);

impl CompetitorId {
    #[must_use]
    pub fn from_index(index: usize) -> Self {
        Self(index_to_u16(index))
    }

    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CompetitorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Immutable competitor descriptor, shared by every race of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: CompetitorId,
    pub key: String,
    pub name: String,
    /// Payout multiplier applied to the win rate.
    pub weight: f64,
    /// Skill descriptors in declaration order; the first one eligible for a
    /// phase shadows the rest.
    pub skills: Vec<SkillSpec>,
}

impl Competitor {
    #[must_use]
    pub fn skills(&self) -> &[SkillSpec] {
        &self.skills
    }
}

/// Bonus added per move while a deferred bonus window is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BonusAmount {
    Fixed(u32),
    /// Drawn uniformly from the listed values on every application.
    Uniform(Vec<u32>),
}

impl BonusAmount {
    pub fn draw(&self, rng: &mut dyn RaceRandom) -> u32 {
        match self {
            Self::Fixed(amount) => *amount,
            Self::Uniform(faces) => rng.roll(Some(faces.as_slice())),
        }
    }
}

/// Extra steps owed for an inclusive window of rounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredBonus {
    pub amount: BonusAmount,
    pub first_round: u32,
    pub last_round: u32,
}

impl DeferredBonus {
    #[must_use]
    pub const fn covers(&self, round: u32) -> bool {
        self.first_round <= round && round <= self.last_round
    }

    #[must_use]
    pub const fn is_expired(&self, round: u32) -> bool {
        round > self.last_round
    }
}

/// Mutable per-race state owned by a competitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorState {
    pub deferred_bonus: Option<DeferredBonus>,
}

impl CompetitorState {
    pub fn reset(&mut self) {
        self.deferred_bonus = None;
    }
}

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("roster is empty")]
    EmptyRoster,
    #[error("competitor key '{key}' appears more than once")]
    DuplicateCompetitor { key: String },
    #[error("roster of {len} competitors exceeds the supported maximum of {max}")]
    RosterTooLarge { len: usize, max: usize },
    #[error("simulation needs at least one run")]
    NoRuns,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Validated, ordered set of competitors.
///
/// Declaration order matters: it fixes the initial stack on the start cell
/// and the dispatch order of round-level phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Roster(Vec<Competitor>);

impl Roster {
    /// Build a roster, rejecting empty rosters, duplicate keys, invalid
    /// skills and skills the registry does not know.
    ///
    /// # Errors
    ///
    /// Returns `SetupError` on the first violation found.
    pub fn from_specs(
        specs: &[CompetitorSpec],
        registry: &SkillRegistry,
    ) -> Result<Self, SetupError> {
        if specs.is_empty() {
            return Err(SetupError::EmptyRoster);
        }
        let max = usize::from(u16::MAX);
        if specs.len() > max {
            return Err(SetupError::RosterTooLarge {
                len: specs.len(),
                max,
            });
        }
        let mut keys = HashSet::with_capacity(specs.len());
        let mut competitors = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            if !keys.insert(spec.key.as_str()) {
                return Err(SetupError::DuplicateCompetitor {
                    key: spec.key.clone(),
                });
            }
            spec.validate()?;
            for (slot, skill) in spec.skills.iter().enumerate() {
                registry.validate_spec(&spec.key, slot, skill)?;
            }
            competitors.push(Competitor {
                id: CompetitorId::from_index(index),
                key: spec.key.clone(),
                name: spec.name.clone(),
                weight: spec.weight,
                skills: spec.skills.clone(),
            });
        }
        Ok(Self(competitors))
    }

    #[must_use]
    pub fn get(&self, id: CompetitorId) -> Option<&Competitor> {
        self.0.get(id.index())
    }

    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<&Competitor> {
        self.0.iter().find(|competitor| competitor.key == key)
    }

    /// Identifiers in declaration order.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = CompetitorId> + '_ {
        self.0.iter().map(|competitor| competitor.id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Competitor> {
        self.0.iter()
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Competitor;
    type IntoIter = std::slice::Iter<'a, Competitor>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
