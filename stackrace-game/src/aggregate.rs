//! Monte Carlo aggregation over many independent races.

use serde::{Deserialize, Serialize};

use crate::competitor::{CompetitorId, Roster, SetupError};
use crate::config::{RaceConfig, validate_board_length};
use crate::constants::{LOG_TARGET_AGGREGATE, PROGRESS_LOG_INTERVAL};
use crate::numbers::{binomial_std_error, ratio};
use crate::race::{EventSink, LogSink, Race, RaceOutcome};
use crate::rng::{RaceRandom, RngBundle};
use crate::skill::SkillRegistry;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Runs batches of races over one roster and tallies winners.
#[derive(Debug, Clone)]
pub struct Aggregator {
    roster: Roster,
    registry: SkillRegistry,
    board_length: u32,
}

impl Aggregator {
    /// # Errors
    ///
    /// Returns `SetupError::Config` when `board_length` is out of bounds.
    pub fn new(
        roster: Roster,
        registry: SkillRegistry,
        board_length: u32,
    ) -> Result<Self, SetupError> {
        validate_board_length(board_length)?;
        Ok(Self {
            roster,
            registry,
            board_length,
        })
    }

    /// Validate `config` and build the roster against `registry`.
    ///
    /// # Errors
    ///
    /// Returns `SetupError` for invalid configuration or roster defects.
    pub fn from_config(config: &RaceConfig, registry: SkillRegistry) -> Result<Self, SetupError> {
        config.validate()?;
        let roster = Roster::from_specs(&config.roster, &registry)?;
        Self::new(roster, registry, config.board_length)
    }

    #[must_use]
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    #[must_use]
    pub const fn registry(&self) -> &SkillRegistry {
        &self.registry
    }

    #[must_use]
    pub const fn board_length(&self) -> u32 {
        self.board_length
    }

    /// Fresh race engine over this roster.
    #[must_use]
    pub fn race(&self) -> Race<'_> {
        Race::new(&self.roster, &self.registry, self.board_length)
    }

    /// Run `n_runs` races, race `i` drawing from `RngBundle::for_race(seed, i)`.
    ///
    /// # Errors
    ///
    /// Returns `SetupError::NoRuns` when `n_runs` is zero.
    pub fn simulate(&self, n_runs: u32, seed: u64) -> Result<SimulationReport, SetupError> {
        ensure_runs(n_runs)?;
        log::info!(
            target: LOG_TARGET_AGGREGATE,
            "simulating {n_runs} races over {} competitors (seed {seed})",
            self.roster.len()
        );
        let mut tally = WinTally::new(self.roster.len());
        let mut race = self.race();
        let mut sink = LogSink;
        for index in 0..n_runs {
            let mut rng = RngBundle::for_race(seed, u64::from(index));
            let outcome = race.run(&mut rng, &mut sink);
            tally.record(outcome.winner);
            self.log_run(index + 1, n_runs, &outcome);
        }
        Ok(SimulationReport::from_tally(self, &tally, Some(seed)))
    }

    /// Run `n_runs` races drawing from one caller-supplied stream.
    ///
    /// # Errors
    ///
    /// Returns `SetupError::NoRuns` when `n_runs` is zero.
    pub fn simulate_with(
        &self,
        n_runs: u32,
        rng: &mut dyn RaceRandom,
        events: &mut dyn EventSink,
    ) -> Result<SimulationReport, SetupError> {
        ensure_runs(n_runs)?;
        let mut tally = WinTally::new(self.roster.len());
        let mut race = self.race();
        for run in 1..=n_runs {
            let outcome = race.run(rng, events);
            tally.record(outcome.winner);
            self.log_run(run, n_runs, &outcome);
        }
        Ok(SimulationReport::from_tally(self, &tally, None))
    }

    /// Data-parallel [`Aggregator::simulate`]; tallies are identical for the
    /// same seed because every race derives its own streams.
    ///
    /// # Errors
    ///
    /// Returns `SetupError::NoRuns` when `n_runs` is zero.
    #[cfg(feature = "parallel")]
    pub fn simulate_parallel(
        &self,
        n_runs: u32,
        seed: u64,
    ) -> Result<SimulationReport, SetupError> {
        ensure_runs(n_runs)?;
        log::info!(
            target: LOG_TARGET_AGGREGATE,
            "simulating {n_runs} races in parallel over {} competitors (seed {seed})",
            self.roster.len()
        );
        let competitors = self.roster.len();
        let tally = (0..n_runs)
            .into_par_iter()
            .fold(
                || (self.race(), WinTally::new(competitors)),
                |(mut race, mut tally), index| {
                    let mut rng = RngBundle::for_race(seed, u64::from(index));
                    let outcome = race.run(&mut rng, &mut crate::race::NullSink);
                    tally.record(outcome.winner);
                    (race, tally)
                },
            )
            .map(|(_, tally)| tally)
            .reduce(|| WinTally::new(competitors), WinTally::merge);
        log::info!(target: LOG_TARGET_AGGREGATE, "simulated {n_runs}/{n_runs} races");
        Ok(SimulationReport::from_tally(self, &tally, Some(seed)))
    }

    fn log_run(&self, run: u32, n_runs: u32, outcome: &RaceOutcome) {
        if run % PROGRESS_LOG_INTERVAL == 0 || run == n_runs {
            log::info!(target: LOG_TARGET_AGGREGATE, "simulated {run}/{n_runs} races");
        }
        if log::log_enabled!(target: LOG_TARGET_AGGREGATE, log::Level::Debug) {
            let ranking: Vec<&str> = outcome
                .standings
                .iter()
                .filter_map(|&id| self.roster.get(id))
                .map(|competitor| competitor.name.as_str())
                .collect();
            log::debug!(
                target: LOG_TARGET_AGGREGATE,
                "run {run}: winner {} after {} rounds, ranking {}",
                self.roster
                    .get(outcome.winner)
                    .map_or("?", |competitor| competitor.name.as_str()),
                outcome.rounds,
                ranking.join(" > ")
            );
        }
    }
}

fn ensure_runs(n_runs: u32) -> Result<(), SetupError> {
    if n_runs == 0 {
        return Err(SetupError::NoRuns);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct WinTally {
    wins: Vec<u64>,
    runs: u64,
}

impl WinTally {
    fn new(competitors: usize) -> Self {
        Self {
            wins: vec![0; competitors],
            runs: 0,
        }
    }

    fn record(&mut self, winner: CompetitorId) {
        if let Some(count) = self.wins.get_mut(winner.index()) {
            *count += 1;
        }
        self.runs += 1;
    }

    #[cfg_attr(not(feature = "parallel"), allow(dead_code))]
    fn merge(mut self, other: Self) -> Self {
        for (mine, theirs) in self.wins.iter_mut().zip(other.wins) {
            *mine += theirs;
        }
        self.runs += other.runs;
        self
    }
}

/// Per-competitor result of a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorResult {
    pub id: CompetitorId,
    pub key: String,
    pub name: String,
    pub weight: f64,
    pub wins: u64,
    pub win_rate: f64,
    /// Win rate times payout weight.
    pub expected_value: f64,
    /// Binomial standard error of `win_rate`.
    pub std_error: f64,
}

/// Batch summary with one entry per competitor, in roster order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub runs: u64,
    /// Present when races drew from seed-derived streams.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub board_length: u32,
    pub results: Vec<CompetitorResult>,
}

impl SimulationReport {
    fn from_tally(aggregator: &Aggregator, tally: &WinTally, seed: Option<u64>) -> Self {
        let results = aggregator
            .roster
            .iter()
            .map(|competitor| {
                let wins = tally.wins.get(competitor.id.index()).copied().unwrap_or(0);
                let win_rate = ratio(wins, tally.runs);
                CompetitorResult {
                    id: competitor.id,
                    key: competitor.key.clone(),
                    name: competitor.name.clone(),
                    weight: competitor.weight,
                    wins,
                    win_rate,
                    expected_value: win_rate * competitor.weight,
                    std_error: binomial_std_error(win_rate, tally.runs),
                }
            })
            .collect();
        Self {
            runs: tally.runs,
            seed,
            board_length: aggregator.board_length,
            results,
        }
    }

    #[must_use]
    pub fn get(&self, id: CompetitorId) -> Option<&CompetitorResult> {
        self.results.iter().find(|result| result.id == id)
    }

    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<&CompetitorResult> {
        self.results.iter().find(|result| result.key == key)
    }

    /// Results by expected value, best first; ties keep roster order.
    #[must_use]
    pub fn ranked(&self) -> Vec<&CompetitorResult> {
        let mut ranked: Vec<&CompetitorResult> = self.results.iter().collect();
        ranked.sort_by(|a, b| b.expected_value.total_cmp(&a.expected_value));
        ranked
    }

    /// Competitors that won at least once.
    pub fn winners(&self) -> impl Iterator<Item = &CompetitorResult> {
        self.results.iter().filter(|result| result.wins > 0)
    }

    #[must_use]
    pub fn total_wins(&self) -> u64 {
        self.results.iter().map(|result| result.wins).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompetitorSpec;
    use crate::race::{EventLog, RaceEventKind};
    use crate::skill::{SkillKind, SkillSpec};

    fn aggregator(specs: Vec<CompetitorSpec>, board_length: u32) -> Aggregator {
        let mut config = RaceConfig::with_roster(specs);
        config.board_length = board_length;
        Aggregator::from_config(&config, SkillRegistry::standard()).unwrap()
    }

    fn plain(keys: &[&str]) -> Vec<CompetitorSpec> {
        keys.iter()
            .map(|key| CompetitorSpec::new(*key, key.to_uppercase(), 1.0))
            .collect()
    }

    #[test]
    fn zero_runs_is_rejected() {
        let agg = aggregator(plain(&["a", "b"]), 10);
        assert!(matches!(agg.simulate(0, 1), Err(SetupError::NoRuns)));
    }

    #[test]
    fn report_is_preseeded_and_sums_to_runs() {
        let agg = aggregator(plain(&["a", "b", "c"]), 8);
        let report = agg.simulate(200, 5).unwrap();
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.runs, 200);
        assert_eq!(report.total_wins(), 200);
        let keys: Vec<&str> = report.results.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        let rate_sum: f64 = report.results.iter().map(|r| r.win_rate).sum();
        assert!((rate_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn expected_value_scales_with_weight() {
        let specs = vec![
            CompetitorSpec::new("a", "A", 2.5),
            CompetitorSpec::new("b", "B", 1.0),
        ];
        let report = aggregator(specs, 10).simulate(100, 9).unwrap();
        for result in &report.results {
            assert!((result.expected_value - result.win_rate * result.weight).abs() < 1e-12);
        }
    }

    #[test]
    fn same_seed_reproduces_report() {
        let agg = aggregator(plain(&["a", "b", "c", "d"]), 12);
        assert_eq!(agg.simulate(300, 77).unwrap(), agg.simulate(300, 77).unwrap());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential() {
        let mut specs = plain(&["a", "b", "c"]);
        specs[0] = specs[0]
            .clone()
            .with_skill(SkillSpec::new(SkillKind::DoubleMove, 0.5));
        let agg = aggregator(specs, 16);
        assert_eq!(
            agg.simulate(500, 123).unwrap(),
            agg.simulate_parallel(500, 123).unwrap()
        );
    }

    #[test]
    fn simulate_with_uses_shared_stream_and_sink() {
        let agg = aggregator(plain(&["a", "b"]), 6);
        let mut rng = RngBundle::from_seed(3);
        let mut log = EventLog::new();
        let report = agg.simulate_with(4, &mut rng, &mut log).unwrap();
        assert_eq!(report.seed, None);
        assert_eq!(report.total_wins(), 4);
        assert_eq!(log.of_kind(RaceEventKind::RaceFinished).count(), 4);
    }

    #[test]
    fn ranked_orders_by_expected_value() {
        let specs = vec![
            CompetitorSpec::new("low", "Low", 0.1),
            CompetitorSpec::new("high", "High", 10.0),
        ];
        let report = aggregator(specs, 10).simulate(400, 1).unwrap();
        let ranked = report.ranked();
        assert!(ranked[0].expected_value >= ranked[1].expected_value);
        assert_eq!(report.winners().count(), 2);
        assert!(report.get_by_key("high").is_some());
    }
}
