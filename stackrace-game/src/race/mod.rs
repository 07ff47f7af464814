//! Single-race state machine: rounds, turns, movement and skill dispatch.

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::competitor::{CompetitorId, CompetitorState, Roster};
use crate::skill::SkillSlots;

mod engine;
pub mod event;

pub use engine::Race;
pub use event::{EventLog, EventSink, LogSink, NullSink, RaceEvent, RaceEventKind};

/// Round-level bookkeeping of a race in progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    round: u32,
    is_first_round: bool,
    turn_order: Vec<CompetitorId>,
}

impl RunState {
    /// One-based round counter; 0 before the first round.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    #[must_use]
    pub const fn is_first_round(&self) -> bool {
        self.is_first_round
    }

    #[must_use]
    pub fn turn_order(&self) -> &[CompetitorId] {
        &self.turn_order
    }

    /// Move `id` to the end of the turn order; false when absent.
    pub fn move_to_back(&mut self, id: CompetitorId) -> bool {
        let Some(index) = self.turn_order.iter().position(|&other| other == id) else {
            return false;
        };
        let moved = self.turn_order.remove(index);
        self.turn_order.push(moved);
        true
    }

    /// Back to the start line: round 0, first round pending, `order` queued.
    pub(crate) fn reset(&mut self, order: impl IntoIterator<Item = CompetitorId>) {
        self.round = 0;
        self.is_first_round = true;
        self.set_turn_order(order);
    }

    pub(crate) fn begin_round(&mut self) -> u32 {
        self.round = self.round.saturating_add(1);
        self.is_first_round = self.round == 1;
        self.round
    }

    pub(crate) fn set_turn_order(&mut self, order: impl IntoIterator<Item = CompetitorId>) {
        self.turn_order.clear();
        self.turn_order.extend(order);
    }
}

/// Everything that changes during one race.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceState {
    pub(crate) board: Board,
    pub(crate) run: RunState,
    pub(crate) competitors: Vec<CompetitorState>,
    pub(crate) slots: SkillSlots,
}

impl RaceState {
    pub(crate) fn new(roster: &Roster, board_length: u32) -> Self {
        Self {
            board: Board::new(board_length),
            run: RunState::default(),
            competitors: vec![CompetitorState::default(); roster.len()],
            slots: SkillSlots::for_roster(roster),
        }
    }

    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }

    #[must_use]
    pub const fn run(&self) -> &RunState {
        &self.run
    }

    #[must_use]
    pub fn competitor(&self, id: CompetitorId) -> Option<&CompetitorState> {
        self.competitors.get(id.index())
    }

    #[must_use]
    pub const fn slots(&self) -> &SkillSlots {
        &self.slots
    }
}

/// Result of a finished race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceOutcome {
    pub winner: CompetitorId,
    pub rounds: u32,
    /// Final ranking, leader first.
    pub standings: Vec<CompetitorId>,
    /// Final cell of each competitor, indexed by id.
    pub positions: Vec<u32>,
}

impl RaceOutcome {
    #[must_use]
    pub fn position_of(&self, id: CompetitorId) -> Option<u32> {
        self.positions.get(id.index()).copied()
    }

    /// One-based finishing place of `id`.
    #[must_use]
    pub fn place_of(&self, id: CompetitorId) -> Option<usize> {
        self.standings
            .iter()
            .position(|&other| other == id)
            .map(|index| index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(index: usize) -> CompetitorId {
        CompetitorId::from_index(index)
    }

    #[test]
    fn begin_round_tracks_first_round() {
        let mut run = RunState::default();
        assert_eq!(run.begin_round(), 1);
        assert!(run.is_first_round());
        assert_eq!(run.begin_round(), 2);
        assert!(!run.is_first_round());
        run.reset([id(1), id(0)]);
        assert_eq!(run.round(), 0);
        assert!(run.is_first_round());
        assert_eq!(run.turn_order(), &[id(1), id(0)]);
    }

    #[test]
    fn move_to_back_preserves_relative_order() {
        let mut run = RunState::default();
        run.set_turn_order([id(0), id(1), id(2), id(3)]);
        assert!(run.move_to_back(id(1)));
        assert_eq!(run.turn_order(), &[id(0), id(2), id(3), id(1)]);
        assert!(!run.move_to_back(id(9)));
    }

    #[test]
    fn outcome_places_are_one_based() {
        let outcome = RaceOutcome {
            winner: id(2),
            rounds: 5,
            standings: vec![id(2), id(0), id(1)],
            positions: vec![10, 4, 12],
        };
        assert_eq!(outcome.place_of(id(2)), Some(1));
        assert_eq!(outcome.place_of(id(1)), Some(3));
        assert_eq!(outcome.position_of(id(0)), Some(10));
        assert_eq!(outcome.position_of(id(1)), Some(4));
        assert_eq!(outcome.place_of(id(7)), None);
    }
}
