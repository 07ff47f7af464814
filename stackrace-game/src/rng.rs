//! Randomness for the race engine.
//!
//! Every random decision goes through [`RaceRandom`] so tests can script
//! dice, gates and turn orders. The production source is [`RngBundle`], which
//! keeps one independent stream per concern so that a skill gate drawing (or
//! not drawing) never shifts the dice sequence.

use hmac::{Hmac, Mac};
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

use crate::competitor::CompetitorId;
use crate::constants::{DEFAULT_DICE_FACES, STREAM_DICE, STREAM_GATE, STREAM_ORDER};

/// Injectable source of the three kinds of draws a race needs.
pub trait RaceRandom {
    /// Uniform pick from `faces`, or from the default die when `None`/empty.
    fn roll(&mut self, faces: Option<&[u32]>) -> u32;

    /// Uniform real in `[0, 1)` used for skill gates.
    fn unit(&mut self) -> f64;

    /// Uniform permutation of a turn order in place.
    fn shuffle(&mut self, order: &mut [CompetitorId]);
}

/// Resolve the face set a roll should draw from.
#[must_use]
pub fn effective_faces(faces: Option<&[u32]>) -> &[u32] {
    match faces {
        Some(faces) if !faces.is_empty() => faces,
        _ => &DEFAULT_DICE_FACES,
    }
}

/// Per-race bundle of deterministic RNG streams.
#[derive(Debug, Clone)]
pub struct RngBundle {
    dice: CountingRng<ChaCha20Rng>,
    gate: CountingRng<ChaCha20Rng>,
    order: CountingRng<ChaCha20Rng>,
}

impl RngBundle {
    /// Streams for a single race keyed by the user seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self::for_race(seed, 0)
    }

    /// Streams for race `race_index` of a batch.
    ///
    /// The result depends only on `(seed, race_index)`, so batches produce
    /// identical tallies whether races run sequentially or in parallel.
    #[must_use]
    pub fn for_race(seed: u64, race_index: u64) -> Self {
        Self {
            dice: CountingRng::new(derive_stream_seed(seed, race_index, STREAM_DICE)),
            gate: CountingRng::new(derive_stream_seed(seed, race_index, STREAM_GATE)),
            order: CountingRng::new(derive_stream_seed(seed, race_index, STREAM_ORDER)),
        }
    }

    #[must_use]
    pub const fn dice_draws(&self) -> u64 {
        self.dice.draws()
    }

    #[must_use]
    pub const fn gate_draws(&self) -> u64 {
        self.gate.draws()
    }

    #[must_use]
    pub const fn order_draws(&self) -> u64 {
        self.order.draws()
    }
}

impl RaceRandom for RngBundle {
    fn roll(&mut self, faces: Option<&[u32]>) -> u32 {
        let faces = effective_faces(faces);
        faces
            .choose(&mut self.dice)
            .copied()
            .unwrap_or(DEFAULT_DICE_FACES[0])
    }

    fn unit(&mut self) -> f64 {
        self.gate.r#gen::<f64>()
    }

    fn shuffle(&mut self, order: &mut [CompetitorId]) {
        order.shuffle(&mut self.order);
    }
}

/// Scripted source for reproducing exact race sequences.
///
/// Queued values are consumed front to back. Once a queue runs dry, rolls
/// return the lowest available face, gates draw `0.0` and shuffles keep the
/// order they were given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedRandom {
    rolls: VecDeque<u32>,
    units: VecDeque<f64>,
    orders: VecDeque<Vec<CompetitorId>>,
}

impl ScriptedRandom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_rolls(mut self, rolls: impl IntoIterator<Item = u32>) -> Self {
        self.rolls.extend(rolls);
        self
    }

    #[must_use]
    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    /// Queue a full turn order to hand out on the next shuffle.
    #[must_use]
    pub fn with_order(mut self, order: impl IntoIterator<Item = CompetitorId>) -> Self {
        self.orders.push_back(order.into_iter().collect());
        self
    }

    /// Values still queued as `(rolls, units, orders)`.
    #[must_use]
    pub fn remaining(&self) -> (usize, usize, usize) {
        (self.rolls.len(), self.units.len(), self.orders.len())
    }
}

impl RaceRandom for ScriptedRandom {
    fn roll(&mut self, faces: Option<&[u32]>) -> u32 {
        let faces = effective_faces(faces);
        self.rolls
            .pop_front()
            .or_else(|| faces.iter().copied().min())
            .unwrap_or(DEFAULT_DICE_FACES[0])
    }

    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(0.0)
    }

    fn shuffle(&mut self, order: &mut [CompetitorId]) {
        if let Some(scripted) = self.orders.pop_front()
            && scripted.len() == order.len()
        {
            order.copy_from_slice(&scripted);
        }
    }
}

/// Counting wrapper for RNG streams providing instrumentation.
#[derive(Debug, Clone)]
pub struct CountingRng<R> {
    rng: R,
    draws: u64,
}

impl CountingRng<ChaCha20Rng> {
    fn new(seed: [u8; 32]) -> Self {
        Self {
            rng: ChaCha20Rng::from_seed(seed),
            draws: 0,
        }
    }
}

impl<R: RngCore> CountingRng<R> {
    /// Number of draw calls performed against this stream.
    #[must_use]
    pub const fn draws(&self) -> u64 {
        self.draws
    }
}

impl<R: RngCore> RngCore for CountingRng<R> {
    fn next_u32(&mut self) -> u32 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.draws = self.draws.saturating_add(1);
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.draws = self.draws.saturating_add(1);
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.draws = self.draws.saturating_add(1);
        self.rng.try_fill_bytes(dest)
    }
}

fn derive_stream_seed(seed: u64, race_index: u64, domain_tag: &[u8]) -> [u8; 32] {
    let digest = match Hmac::<Sha256>::new_from_slice(&seed.to_le_bytes()) {
        Ok(mut mac) => {
            mac.update(&race_index.to_le_bytes());
            mac.update(domain_tag);
            mac.finalize().into_bytes()
        }
        // HMAC accepts keys of any length; keep a keyed-hash fallback anyway.
        Err(_) => {
            let mut hasher = Sha256::new();
            hasher.update(seed.to_le_bytes());
            hasher.update(race_index.to_le_bytes());
            hasher.update(domain_tag);
            hasher.finalize()
        }
    };
    let mut bytes = [0_u8; 32];
    bytes.copy_from_slice(&digest);
    bytes
}
