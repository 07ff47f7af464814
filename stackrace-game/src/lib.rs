//! Stackrace Game Engine
//!
//! Platform-agnostic core of a stacked-dice racing simulator. Competitors
//! share cells in ordered stacks, carry everyone above them when they move,
//! and trigger skills at fixed points of each turn. The [`Aggregator`] runs
//! many independent races and reports win rate and expected payout.

pub mod aggregate;
pub mod board;
pub mod competitor;
pub mod config;
pub mod constants;
pub mod numbers;
pub mod race;
pub mod rng;
pub mod skill;

// Re-export commonly used types
pub use aggregate::{Aggregator, CompetitorResult, SimulationReport};
pub use board::{Board, Stack};
pub use competitor::{
    BonusAmount, Competitor, CompetitorId, CompetitorState, DeferredBonus, Roster, SetupError,
};
pub use config::{CompetitorSpec, ConfigError, RaceConfig};
pub use race::{
    EventLog, EventSink, LogSink, NullSink, Race, RaceEvent, RaceEventKind, RaceOutcome,
    RaceState, RunState,
};
pub use rng::{RaceRandom, RngBundle, ScriptedRandom};
pub use skill::{
    HookContext, Phase, PhasePayload, SkillEffect, SkillKind, SkillRegistry, SkillSlots,
    SkillSpec, SkillTag,
};

use thiserror::Error;

/// Trait for abstracting where race configuration comes from.
/// Platform-specific implementations should provide this
pub trait ConfigLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the race configuration from the platform-specific source
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be read or parsed.
    fn load_race_config(&self) -> Result<RaceConfig, Self::Error>;
}

#[derive(Debug, Error)]
pub enum EngineError<E>
where
    E: std::error::Error + 'static,
{
    #[error("failed to load race configuration: {0}")]
    Load(#[source] E),
    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Main simulation engine tying a config source to a skill registry
pub struct SimulationEngine<L>
where
    L: ConfigLoader,
{
    loader: L,
    registry: SkillRegistry,
}

impl<L> SimulationEngine<L>
where
    L: ConfigLoader,
{
    /// Create an engine with every built-in skill registered
    pub fn new(loader: L) -> Self {
        Self::with_registry(loader, SkillRegistry::standard())
    }

    pub const fn with_registry(loader: L, registry: SkillRegistry) -> Self {
        Self { loader, registry }
    }

    /// Load, validate and build an aggregator together with its config
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the configuration is invalid.
    pub fn prepare(&self) -> Result<(Aggregator, RaceConfig), EngineError<L::Error>> {
        let config = self
            .loader
            .load_race_config()
            .map_err(EngineError::Load)?;
        let aggregator = Aggregator::from_config(&config, self.registry.clone())?;
        Ok((aggregator, config))
    }

    /// Run the batch described by the loaded configuration
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the configuration is invalid.
    pub fn run(&self) -> Result<SimulationReport, EngineError<L::Error>> {
        let (aggregator, config) = self.prepare()?;
        Ok(aggregator.simulate(config.runs, config.seed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[derive(Clone, Default)]
    struct FixtureLoader {
        board_length: u32,
        runs: u32,
    }

    impl ConfigLoader for FixtureLoader {
        type Error = Infallible;

        fn load_race_config(&self) -> Result<RaceConfig, Self::Error> {
            let mut config = RaceConfig::with_roster(vec![
                CompetitorSpec::new("a", "Alpha", 1.0),
                CompetitorSpec::new("b", "Beta", 2.0),
            ]);
            config.board_length = self.board_length;
            config.runs = self.runs;
            Ok(config)
        }
    }

    #[derive(Debug, Error)]
    #[error("fixture unavailable")]
    struct Unavailable;

    struct BrokenLoader;

    impl ConfigLoader for BrokenLoader {
        type Error = Unavailable;

        fn load_race_config(&self) -> Result<RaceConfig, Self::Error> {
            Err(Unavailable)
        }
    }

    #[test]
    fn engine_runs_configured_batch() {
        let engine = SimulationEngine::new(FixtureLoader {
            board_length: 10,
            runs: 50,
        });
        let report = engine.run().unwrap();
        assert_eq!(report.runs, 50);
        assert_eq!(report.board_length, 10);
        assert_eq!(report.results.len(), 2);
    }

    #[test]
    fn engine_surfaces_setup_and_load_errors() {
        let engine = SimulationEngine::new(FixtureLoader {
            board_length: 1,
            runs: 5,
        });
        assert!(matches!(
            engine.prepare(),
            Err(EngineError::Setup(SetupError::Config(
                ConfigError::RangeViolation { .. }
            )))
        ));

        let broken = SimulationEngine::new(BrokenLoader);
        let err = broken.run().unwrap_err();
        assert!(matches!(err, EngineError::Load(Unavailable)));
        assert_eq!(
            err.to_string(),
            "failed to load race configuration: fixture unavailable"
        );
    }
}
