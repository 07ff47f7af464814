//! Competitor skills: the phase enumeration, the closed set of skill kinds,
//! and the typed context a skill sees when its phase is dispatched.
//!
//! Skill descriptors are immutable and shared across races. Anything a skill
//! remembers between invocations (the one-shot "fired" flag) lives in
//! [`SkillSlots`], which the race engine resets at setup.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::board::Board;
use crate::competitor::{BonusAmount, CompetitorId, CompetitorState};
use crate::config::ConfigError;
use crate::constants::{
    LATE_CHARGE_DEFAULT_DELAY, LATE_CHARGE_DEFAULT_ROUNDS, TRAILING_BOOST_DEFAULT_BONUS,
};
use crate::race::event::{RaceEvent, RaceEventKind, emit};
use crate::race::{EventSink, RunState};
use crate::rng::RaceRandom;

mod effects;
pub mod registry;
pub mod slots;

pub use registry::SkillRegistry;
pub use slots::SkillSlots;

/// Fixed points in the turn lifecycle where skills may trigger, low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    BeforeRound,
    OnEnterTurn,
    BeforeRoll,
    OnRoll,
    AfterRoll,
    BeforeMove,
    OnMove,
    AfterMove,
    OnExitTurn,
    AfterRound,
}

impl Phase {
    pub const ALL: [Self; 10] = [
        Self::BeforeRound,
        Self::OnEnterTurn,
        Self::BeforeRoll,
        Self::OnRoll,
        Self::AfterRoll,
        Self::BeforeMove,
        Self::OnMove,
        Self::AfterMove,
        Self::OnExitTurn,
        Self::AfterRound,
    ];

    /// Execution priority; gaps of ten leave room for intermediate phases.
    #[must_use]
    pub const fn priority(self) -> u8 {
        (self as u8) * 10
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeRound => "BEFORE_ROUND",
            Self::OnEnterTurn => "ON_ENTER_TURN",
            Self::BeforeRoll => "BEFORE_ROLL",
            Self::OnRoll => "ON_ROLL",
            Self::AfterRoll => "AFTER_ROLL",
            Self::BeforeMove => "BEFORE_MOVE",
            Self::OnMove => "ON_MOVE",
            Self::AfterMove => "AFTER_MOVE",
            Self::OnExitTurn => "ON_EXIT_TURN",
            Self::AfterRound => "AFTER_ROUND",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase-specific data handed to a skill alongside the board and run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhasePayload {
    BeforeRound,
    OnEnterTurn,
    BeforeRoll,
    OnRoll,
    AfterRoll { rolled: u32 },
    BeforeMove { rolled: u32 },
    /// Step count for this competitor before any override.
    OnMove { steps: u32 },
    AfterMove { rolled: u32 },
    OnExitTurn,
    AfterRound,
}

impl PhasePayload {
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::BeforeRound => Phase::BeforeRound,
            Self::OnEnterTurn => Phase::OnEnterTurn,
            Self::BeforeRoll => Phase::BeforeRoll,
            Self::OnRoll => Phase::OnRoll,
            Self::AfterRoll { .. } => Phase::AfterRoll,
            Self::BeforeMove { .. } => Phase::BeforeMove,
            Self::OnMove { .. } => Phase::OnMove,
            Self::AfterMove { .. } => Phase::AfterMove,
            Self::OnExitTurn => Phase::OnExitTurn,
            Self::AfterRound => Phase::AfterRound,
        }
    }

    /// Pending step count, only present during `ON_MOVE`.
    #[must_use]
    pub const fn steps(self) -> Option<u32> {
        match self {
            Self::OnMove { steps } => Some(steps),
            _ => None,
        }
    }
}

/// Fieldless identifier of a skill kind; the key of the phase registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillTag {
    StackClimb,
    LastMover,
    TrailingBoost,
    RestrictedDie,
    StackSurge,
    DoubleMove,
    LateCharge,
}

impl SkillTag {
    pub const ALL: [Self; 7] = [
        Self::StackClimb,
        Self::LastMover,
        Self::TrailingBoost,
        Self::RestrictedDie,
        Self::StackSurge,
        Self::DoubleMove,
        Self::LateCharge,
    ];

    /// Phase this kind declares.
    #[must_use]
    pub const fn phase(self) -> Phase {
        match self {
            Self::StackClimb => Phase::AfterRound,
            Self::LastMover => Phase::BeforeRound,
            Self::TrailingBoost | Self::StackSurge | Self::DoubleMove => Phase::OnMove,
            Self::RestrictedDie => Phase::OnRoll,
            Self::LateCharge => Phase::OnExitTurn,
        }
    }

    /// Kinds that may fire at most once per race.
    #[must_use]
    pub const fn is_one_shot(self) -> bool {
        matches!(self, Self::LateCharge)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StackClimb => "stack_climb",
            Self::LastMover => "last_mover",
            Self::TrailingBoost => "trailing_boost",
            Self::RestrictedDie => "restricted_die",
            Self::StackSurge => "stack_surge",
            Self::DoubleMove => "double_move",
            Self::LateCharge => "late_charge",
        }
    }
}

impl fmt::Display for SkillTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of skill kinds together with their parameters.
///
/// Every kind except `restricted_die` stays dormant during round 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillKind {
    /// After the round, climb to the top of the own stack.
    StackClimb,
    /// Before the round, take the last turn when buried in a stack.
    LastMover,
    /// While trailing, move `bonus` extra steps.
    TrailingBoost {
        #[serde(default = "SkillKind::default_trailing_bonus")]
        bonus: u32,
    },
    /// Roll from a custom face set instead of the shared die.
    RestrictedDie { faces: Vec<u32> },
    /// Move one extra step per other competitor sharing the cell.
    StackSurge,
    /// Double the step count for the whole carried group.
    DoubleMove,
    /// Once per race, when trailing at the end of a turn, bank a bonus for
    /// `rounds` rounds starting `delay` rounds later.
    LateCharge {
        amount: BonusAmount,
        #[serde(default = "SkillKind::default_late_delay")]
        delay: u32,
        #[serde(default = "SkillKind::default_late_rounds")]
        rounds: u32,
    },
}

impl SkillKind {
    const fn default_trailing_bonus() -> u32 {
        TRAILING_BOOST_DEFAULT_BONUS
    }

    const fn default_late_delay() -> u32 {
        LATE_CHARGE_DEFAULT_DELAY
    }

    const fn default_late_rounds() -> u32 {
        LATE_CHARGE_DEFAULT_ROUNDS
    }

    #[must_use]
    pub const fn tag(&self) -> SkillTag {
        match self {
            Self::StackClimb => SkillTag::StackClimb,
            Self::LastMover => SkillTag::LastMover,
            Self::TrailingBoost { .. } => SkillTag::TrailingBoost,
            Self::RestrictedDie { .. } => SkillTag::RestrictedDie,
            Self::StackSurge => SkillTag::StackSurge,
            Self::DoubleMove => SkillTag::DoubleMove,
            Self::LateCharge { .. } => SkillTag::LateCharge,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.tag().phase()
    }

    #[must_use]
    pub const fn is_one_shot(&self) -> bool {
        self.tag().is_one_shot()
    }

    fn validate(&self, competitor: &str, slot: usize) -> Result<(), ConfigError> {
        match self {
            Self::RestrictedDie { faces } => validate_faces(faces, competitor, slot),
            Self::LateCharge { amount, rounds, .. } => {
                if *rounds == 0 {
                    return Err(ConfigError::MinViolation {
                        field: "late_charge.rounds",
                        min: 1.0,
                        value: 0.0,
                    });
                }
                match amount {
                    BonusAmount::Fixed(_) => Ok(()),
                    BonusAmount::Uniform(faces) => validate_faces(faces, competitor, slot),
                }
            }
            Self::StackClimb
            | Self::LastMover
            | Self::TrailingBoost { .. }
            | Self::StackSurge
            | Self::DoubleMove => Ok(()),
        }
    }
}

fn validate_faces(faces: &[u32], competitor: &str, slot: usize) -> Result<(), ConfigError> {
    if faces.is_empty() {
        return Err(ConfigError::EmptyFaces {
            competitor: competitor.to_string(),
            slot,
        });
    }
    if faces.contains(&0) {
        return Err(ConfigError::ZeroFace {
            competitor: competitor.to_string(),
            slot,
        });
    }
    Ok(())
}

/// Immutable skill descriptor: a kind plus its trigger probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSpec {
    #[serde(flatten)]
    pub kind: SkillKind,
    pub probability: f64,
}

impl SkillSpec {
    #[must_use]
    pub const fn new(kind: SkillKind, probability: f64) -> Self {
        Self { kind, probability }
    }

    #[must_use]
    pub const fn certain(kind: SkillKind) -> Self {
        Self::new(kind, 1.0)
    }

    /// Whether a uniform `[0, 1)` draw opens the gate.
    ///
    /// A zero probability never fires, even on an exact `0.0` draw.
    #[must_use]
    pub fn passes_gate(&self, draw: f64) -> bool {
        self.probability > 0.0 && draw <= self.probability
    }

    /// Validate probability and kind parameters.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the probability is outside `[0, 1]` or the
    /// kind carries an empty face list, a zero face, or an empty bonus window.
    pub fn validate(&self, competitor: &str, slot: usize) -> Result<(), ConfigError> {
        if !self.probability.is_finite() || !(0.0..=1.0).contains(&self.probability) {
            return Err(ConfigError::InvalidProbability {
                competitor: competitor.to_string(),
                slot,
                value: self.probability,
            });
        }
        self.kind.validate(competitor, slot)
    }
}

/// What a fired skill did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", content = "value", rename_all = "snake_case")]
pub enum SkillEffect {
    /// Mutated race state directly (stack, turn order, deferred bonus).
    Applied,
    /// Replacement dice value.
    Dice(u32),
    /// Replacement step count for the acting competitor only.
    Steps(u32),
    /// Replacement step count forced on the whole carried group.
    CarriedSteps(u32),
}

/// Read/write handle a skill receives when its phase is dispatched.
///
/// Borrows are split so a skill can touch the board, the turn order and its
/// own per-race state, but never another competitor's bonus.
pub struct HookContext<'a> {
    pub competitor: CompetitorId,
    pub payload: PhasePayload,
    pub board: &'a mut Board,
    pub run: &'a mut RunState,
    pub state: &'a mut CompetitorState,
    pub rng: &'a mut dyn RaceRandom,
    pub events: &'a mut dyn EventSink,
}

impl HookContext<'_> {
    pub(crate) fn emit(&mut self, kind: RaceEventKind, payload: impl FnOnce() -> serde_json::Value) {
        let round = self.run.round();
        let competitor = self.competitor;
        let phase = self.payload.phase();
        emit(self.events, || {
            RaceEvent::new(round, kind)
                .by(competitor)
                .during(phase)
                .with_payload(payload())
        });
    }
}
