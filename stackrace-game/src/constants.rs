//! Centralized tuning constants for the race engine.

// Board ----------------------------------------------------------------------
pub const DEFAULT_BOARD_LENGTH: u32 = 24;
pub const MIN_BOARD_LENGTH: u32 = 2;
pub const MAX_BOARD_LENGTH: u32 = 1_000;
/// Every competitor starts the race on this cell.
pub const START_POSITION: u32 = 1;

// Dice -----------------------------------------------------------------------
pub const DEFAULT_DICE_FACES: [u32; 3] = [1, 2, 3];

// Aggregation ----------------------------------------------------------------
pub const DEFAULT_RUNS: u32 = 10_000;
pub const DEFAULT_SEED: u64 = 0x5EED_D460_2025;
pub(crate) const PROGRESS_LOG_INTERVAL: u32 = 1_000;

// RNG stream domain tags -----------------------------------------------------
pub(crate) const STREAM_DICE: &[u8] = b"stackrace.dice";
pub(crate) const STREAM_GATE: &[u8] = b"stackrace.gate";
pub(crate) const STREAM_ORDER: &[u8] = b"stackrace.order";

// Skill defaults -------------------------------------------------------------
pub(crate) const TRAILING_BOOST_DEFAULT_BONUS: u32 = 3;
pub(crate) const LATE_CHARGE_DEFAULT_DELAY: u32 = 1;
pub(crate) const LATE_CHARGE_DEFAULT_ROUNDS: u32 = 2;

// Log targets ----------------------------------------------------------------
pub(crate) const LOG_TARGET_RACE: &str = "stackrace::race";
pub(crate) const LOG_TARGET_AGGREGATE: &str = "stackrace::aggregate";
