//! Roster configuration sources for the command line.

use std::fs;
use std::path::PathBuf;

use stackrace_game::{ConfigError, ConfigLoader, RaceConfig};
use thiserror::Error;

/// Reference line-up shipped with the binary.
pub const DEFAULT_ROSTER: &str = include_str!("../assets/roster.json");

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Embedded,
    File(PathBuf),
}

/// Command-line values that replace whatever the source declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Overrides {
    pub runs: Option<u32>,
    pub seed: Option<u64>,
    pub board_length: Option<u32>,
}

impl Overrides {
    fn apply(self, config: &mut RaceConfig) {
        if let Some(runs) = self.runs {
            config.runs = runs;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(board_length) = self.board_length {
            config.board_length = board_length;
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read roster file {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct CliConfigLoader {
    source: ConfigSource,
    overrides: Overrides,
}

impl CliConfigLoader {
    pub const fn new(source: ConfigSource, overrides: Overrides) -> Self {
        Self { source, overrides }
    }

    fn read_source(&self) -> Result<String, LoadError> {
        match &self.source {
            ConfigSource::Embedded => Ok(DEFAULT_ROSTER.to_string()),
            ConfigSource::File(path) => fs::read_to_string(path).map_err(|source| LoadError::Read {
                path: path.clone(),
                source,
            }),
        }
    }
}

impl ConfigLoader for CliConfigLoader {
    type Error = LoadError;

    /// Parse the source and apply overrides. Bounds are checked afterwards so
    /// a flag can repair an out-of-range file value.
    fn load_race_config(&self) -> Result<RaceConfig, Self::Error> {
        let json = self.read_source()?;
        let mut config: RaceConfig = serde_json::from_str(&json).map_err(ConfigError::from)?;
        self.overrides.apply(&mut config);
        log::debug!(
            "loaded {} competitors (board {}, runs {}, seed {})",
            config.roster.len(),
            config.board_length,
            config.runs,
            config.seed
        );
        Ok(config)
    }
}
