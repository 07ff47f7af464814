//! Linear track of numbered cells where competitors stack.
//!
//! Each cell holds an ordered stack, bottom first. The board is the only
//! owner of positions: a competitor's cell is whatever stack currently holds
//! it, and `positions` is a lookup index kept in lockstep with the stacks.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::competitor::CompetitorId;
use crate::constants::START_POSITION;

/// Ordered occupants of one cell, bottom first.
pub type Stack = SmallVec<[CompetitorId; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    length: u32,
    /// Indexed by cell number; index 0 is never occupied.
    stacks: Vec<Stack>,
    /// Indexed by competitor; 0 marks "not on the board".
    positions: Vec<u32>,
}

impl Board {
    #[must_use]
    pub fn new(length: u32) -> Self {
        let cells = usize::try_from(length).unwrap_or(usize::MAX).saturating_add(1);
        Self {
            length,
            stacks: vec![Stack::new(); cells],
            positions: Vec::new(),
        }
    }

    /// Clear every cell and place `competitors` on the start cell in order.
    pub fn reset(&mut self, competitors: &[CompetitorId]) {
        for stack in &mut self.stacks {
            stack.clear();
        }
        let slots = competitors
            .iter()
            .map(|id| id.index() + 1)
            .max()
            .unwrap_or(0);
        self.positions.clear();
        self.positions.resize(slots, 0);
        for &id in competitors {
            if let Some(stack) = self.stacks.get_mut(START_POSITION as usize) {
                stack.push(id);
            }
            self.positions[id.index()] = START_POSITION;
        }
    }

    #[must_use]
    pub const fn length(&self) -> u32 {
        self.length
    }

    /// Whether any competitor has reached the final cell.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.stack_at(self.length).is_empty()
    }

    /// Lowest occupied cell, or the start cell on an empty board.
    #[must_use]
    pub fn trailing_position(&self) -> u32 {
        self.positions
            .iter()
            .copied()
            .filter(|&position| position > 0)
            .min()
            .unwrap_or(START_POSITION)
    }

    /// True when `id` shares the lowest occupied cell (ties count).
    #[must_use]
    pub fn is_trailing(&self, id: CompetitorId) -> bool {
        let position = self.position_of(id);
        position > 0 && position == self.trailing_position()
    }

    /// Current cell of `id`, or 0 when it is not on the board.
    #[must_use]
    pub fn position_of(&self, id: CompetitorId) -> u32 {
        self.positions.get(id.index()).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn stack_at(&self, position: u32) -> &[CompetitorId] {
        self.stacks
            .get(position as usize)
            .map(Stack::as_slice)
            .unwrap_or(&[])
    }

    /// Stack holding `id`.
    #[must_use]
    pub fn stack_of(&self, id: CompetitorId) -> &[CompetitorId] {
        self.stack_at(self.position_of(id))
    }

    /// Zero-based height of `id` within its stack.
    #[must_use]
    pub fn height_of(&self, id: CompetitorId) -> Option<usize> {
        self.stack_of(id).iter().position(|&other| other == id)
    }

    #[must_use]
    pub fn is_top(&self, id: CompetitorId) -> bool {
        self.stack_of(id).last() == Some(&id)
    }

    /// `id` plus everyone above it, bottom first.
    #[must_use]
    pub fn carried_group(&self, id: CompetitorId) -> Stack {
        let stack = self.stack_of(id);
        self.height_of(id)
            .map(|height| stack[height..].iter().copied().collect())
            .unwrap_or_default()
    }

    /// Move `id` forward `steps` cells onto the top of the destination stack.
    ///
    /// `id` is always detached and re-appended, so a zero-step move still
    /// puts it on top of its own cell. Destinations past the final cell are
    /// capped at the final cell. Returns the new position.
    pub fn advance(&mut self, id: CompetitorId, steps: u32) -> u32 {
        let from = self.position_of(id);
        if from == 0 {
            return 0;
        }
        self.detach(id, from);
        let to = from.saturating_add(steps).min(self.length);
        if let Some(stack) = self.stacks.get_mut(to as usize) {
            stack.push(id);
        }
        if let Some(slot) = self.positions.get_mut(id.index()) {
            *slot = to;
        }
        to
    }

    /// Move `id` to the top of its current stack; false when already there.
    pub fn raise_to_top(&mut self, id: CompetitorId) -> bool {
        if self.is_top(id) {
            return false;
        }
        let position = self.position_of(id);
        self.detach(id, position);
        if let Some(stack) = self.stacks.get_mut(position as usize) {
            stack.push(id);
        }
        true
    }

    /// Top of the final cell's stack.
    #[must_use]
    pub fn finish_leader(&self) -> Option<CompetitorId> {
        self.stack_at(self.length).last().copied()
    }

    /// Occupied cells from the start line to the finish.
    pub fn occupied(&self) -> impl Iterator<Item = (u32, &[CompetitorId])> {
        self.stacks
            .iter()
            .enumerate()
            .filter(|(_, stack)| !stack.is_empty())
            .map(|(cell, stack)| (u32::try_from(cell).unwrap_or(u32::MAX), stack.as_slice()))
    }

    /// Competitors ranked by position, higher in a stack ranking first.
    #[must_use]
    pub fn standings(&self) -> Vec<CompetitorId> {
        self.stacks
            .iter()
            .rev()
            .flat_map(|stack| stack.iter().rev().copied())
            .collect()
    }

    /// Every placed competitor appears in exactly one stack, at the cell its
    /// position says.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let mut seen = vec![0_u8; self.positions.len()];
        for (cell, stack) in self.stacks.iter().enumerate() {
            for &id in stack {
                let Some(count) = seen.get_mut(id.index()) else {
                    return false;
                };
                *count = count.saturating_add(1);
                if self.positions[id.index()] as usize != cell {
                    return false;
                }
            }
        }
        seen.iter()
            .zip(&self.positions)
            .all(|(&count, &position)| (position == 0 && count == 0) || count == 1)
    }

    fn detach(&mut self, id: CompetitorId, position: u32) {
        if let Some(stack) = self.stacks.get_mut(position as usize)
            && let Some(height) = stack.iter().position(|&other| other == id)
        {
            stack.remove(height);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize) -> Vec<CompetitorId> {
        (0..n).map(CompetitorId::from_index).collect()
    }

    fn board_with(n: usize, length: u32) -> (Board, Vec<CompetitorId>) {
        let ids = ids(n);
        let mut board = Board::new(length);
        board.reset(&ids);
        (board, ids)
    }

    #[test]
    fn reset_stacks_everyone_on_start_in_order() {
        let (board, ids) = board_with(3, 10);
        assert_eq!(board.stack_at(START_POSITION), ids.as_slice());
        assert!(board.is_top(ids[2]));
        assert_eq!(board.height_of(ids[0]), Some(0));
        assert!(board.is_consistent());
        assert!(!board.is_finished());
    }

    #[test]
    fn advance_lands_on_top_and_carries_nothing_itself() {
        let (mut board, ids) = board_with(3, 10);
        assert_eq!(board.advance(ids[2], 2), 3);
        assert_eq!(board.advance(ids[1], 2), 3);
        assert_eq!(board.stack_at(3), &[ids[2], ids[1]]);
        assert_eq!(board.stack_at(1), &[ids[0]]);
        assert!(board.is_consistent());
    }

    #[test]
    fn zero_step_advance_retops_own_stack() {
        let (mut board, ids) = board_with(3, 10);
        assert_eq!(board.advance(ids[0], 0), START_POSITION);
        assert_eq!(board.stack_at(START_POSITION), &[ids[1], ids[2], ids[0]]);
        assert!(board.is_consistent());
    }

    #[test]
    fn advance_caps_at_final_cell() {
        let (mut board, ids) = board_with(2, 5);
        assert_eq!(board.advance(ids[0], 50), 5);
        assert!(board.is_finished());
        assert_eq!(board.finish_leader(), Some(ids[0]));
    }

    #[test]
    fn carried_group_is_self_and_above() {
        let (board, ids) = board_with(4, 10);
        assert_eq!(board.carried_group(ids[1]).as_slice(), &ids[1..]);
        assert_eq!(board.carried_group(ids[3]).as_slice(), &ids[3..]);
    }

    #[test]
    fn trailing_counts_ties() {
        let (mut board, ids) = board_with(3, 10);
        assert!(board.is_trailing(ids[0]));
        assert!(board.is_trailing(ids[2]));
        board.advance(ids[2], 1);
        assert!(!board.is_trailing(ids[2]));
        assert_eq!(board.trailing_position(), START_POSITION);
    }

    #[test]
    fn raise_to_top_reorders_within_cell() {
        let (mut board, ids) = board_with(3, 10);
        assert!(board.raise_to_top(ids[0]));
        assert_eq!(board.stack_at(START_POSITION), &[ids[1], ids[2], ids[0]]);
        assert!(!board.raise_to_top(ids[0]));
        assert!(board.is_consistent());
    }

    #[test]
    fn standings_rank_by_cell_then_height() {
        let (mut board, ids) = board_with(3, 10);
        board.advance(ids[0], 4);
        let standings = board.standings();
        assert_eq!(standings, vec![ids[0], ids[2], ids[1]]);
        let occupied: Vec<u32> = board.occupied().map(|(cell, _)| cell).collect();
        assert_eq!(occupied, vec![1, 5]);
    }
}
