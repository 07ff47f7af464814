use serde_json::json;

use super::event::{RaceEvent, RaceEventKind, emit};
use super::{EventSink, RaceOutcome, RaceState};
use crate::competitor::{CompetitorId, Roster};
use crate::constants::LOG_TARGET_RACE;
use crate::rng::RaceRandom;
use crate::skill::{HookContext, PhasePayload, SkillEffect, SkillRegistry};

/// One race over a shared roster and registry.
///
/// A `Race` can be run repeatedly; [`Race::setup`] restores the start line,
/// clears every deferred bonus and re-arms one-shot skills.
#[derive(Debug, Clone)]
pub struct Race<'a> {
    roster: &'a Roster,
    registry: &'a SkillRegistry,
    state: RaceState,
}

impl<'a> Race<'a> {
    #[must_use]
    pub fn new(roster: &'a Roster, registry: &'a SkillRegistry, board_length: u32) -> Self {
        Self {
            roster,
            registry,
            state: RaceState::new(roster, board_length),
        }
    }

    #[must_use]
    pub const fn state(&self) -> &RaceState {
        &self.state
    }

    /// Reset board, run state, competitor state and skill slots.
    pub fn setup(&mut self) {
        let ids: Vec<CompetitorId> = self.roster.ids().collect();
        self.state.board.reset(&ids);
        self.state.run.reset(self.roster.ids().rev());
        for competitor in &mut self.state.competitors {
            competitor.reset();
        }
        self.state.slots.reset();
    }

    /// Run a full race from setup to finish.
    pub fn run(&mut self, rng: &mut dyn RaceRandom, events: &mut dyn EventSink) -> RaceOutcome {
        self.run_observed(rng, events, |_| {})
    }

    /// Run a full race, calling `observe` after every turn and after the
    /// round-end phase.
    pub fn run_observed<F>(
        &mut self,
        rng: &mut dyn RaceRandom,
        events: &mut dyn EventSink,
        mut observe: F,
    ) -> RaceOutcome
    where
        F: FnMut(&RaceState),
    {
        self.setup();
        loop {
            self.play_round_observed(rng, events, &mut observe);
            if let Some(winner) = self.state.board.finish_leader() {
                let outcome = self.outcome(winner);
                log::trace!(
                    target: LOG_TARGET_RACE,
                    "race finished after {} rounds, winner {}",
                    outcome.rounds,
                    outcome.winner
                );
                emit(events, || {
                    RaceEvent::new(outcome.rounds, RaceEventKind::RaceFinished)
                        .by(winner)
                        .with_payload(json!({ "standings": outcome.standings }))
                });
                return outcome;
            }
        }
    }

    /// Play a single round on the current state.
    pub fn play_round(&mut self, rng: &mut dyn RaceRandom, events: &mut dyn EventSink) {
        self.play_round_observed(rng, events, &mut |_| {});
    }

    fn play_round_observed(
        &mut self,
        rng: &mut dyn RaceRandom,
        events: &mut dyn EventSink,
        observe: &mut dyn FnMut(&RaceState),
    ) {
        let roster = self.roster;
        let round = self.state.run.begin_round();
        if self.state.run.is_first_round() {
            self.state.run.set_turn_order(roster.ids().rev());
        } else {
            let mut order: Vec<CompetitorId> = roster.ids().collect();
            rng.shuffle(&mut order);
            self.state.run.set_turn_order(order);
        }
        let order = self.state.run.turn_order().to_vec();
        emit(events, || {
            RaceEvent::new(round, RaceEventKind::RoundStarted).with_payload(json!({ "order": order }))
        });

        for id in roster.ids() {
            self.dispatch(id, PhasePayload::BeforeRound, rng, events);
        }

        // Reorders made by skills during turns apply from the next round.
        let order = self.state.run.turn_order().to_vec();
        for id in order {
            self.play_turn(id, rng, events);
            observe(&self.state);
        }

        for id in roster.ids() {
            self.dispatch(id, PhasePayload::AfterRound, rng, events);
        }
        observe(&self.state);

        let board = &self.state.board;
        emit(events, || {
            let positions: Vec<u32> = roster.ids().map(|id| board.position_of(id)).collect();
            RaceEvent::new(round, RaceEventKind::RoundEnded)
                .with_payload(json!({ "positions": positions }))
        });
    }

    fn play_turn(&mut self, id: CompetitorId, rng: &mut dyn RaceRandom, events: &mut dyn EventSink) {
        self.dispatch(id, PhasePayload::OnEnterTurn, rng, events);
        self.dispatch(id, PhasePayload::BeforeRoll, rng, events);
        let rolled = self.roll_dice(id, rng, events);
        self.dispatch(id, PhasePayload::AfterRoll { rolled }, rng, events);
        self.move_group(id, rolled, rng, events);
        self.dispatch(id, PhasePayload::OnExitTurn, rng, events);
    }

    fn roll_dice(
        &mut self,
        id: CompetitorId,
        rng: &mut dyn RaceRandom,
        events: &mut dyn EventSink,
    ) -> u32 {
        let (value, custom) = match self.dispatch(id, PhasePayload::OnRoll, rng, events) {
            Some(SkillEffect::Dice(value)) => (value, true),
            _ => (rng.roll(None), false),
        };
        let round = self.state.run.round();
        emit(events, || {
            RaceEvent::new(round, RaceEventKind::DiceRolled)
                .by(id)
                .with_payload(json!({ "value": value, "custom": custom }))
        });
        value
    }

    /// Move `mover` and everyone above it.
    ///
    /// Only the mover runs `ON_MOVE`; a group override it produces applies to
    /// every competitor carried after it.
    fn move_group(
        &mut self,
        mover: CompetitorId,
        rolled: u32,
        rng: &mut dyn RaceRandom,
        events: &mut dyn EventSink,
    ) {
        let group = self.state.board.carried_group(mover);
        self.dispatch(mover, PhasePayload::BeforeMove { rolled }, rng, events);
        let mut forced: Option<u32> = None;
        for (index, member) in group.iter().copied().enumerate() {
            let steps = forced.unwrap_or(rolled);
            if let Some(group_steps) = self.move_competitor(member, steps, index == 0, rng, events)
            {
                forced = Some(group_steps);
            }
        }
        self.dispatch(mover, PhasePayload::AfterMove { rolled }, rng, events);
    }

    /// Move a single competitor; returns a group override if its `ON_MOVE`
    /// skill produced one.
    fn move_competitor(
        &mut self,
        id: CompetitorId,
        steps: u32,
        skills_enabled: bool,
        rng: &mut dyn RaceRandom,
        events: &mut dyn EventSink,
    ) -> Option<u32> {
        let mut steps = steps;
        let mut group_steps = None;
        if skills_enabled {
            match self.dispatch(id, PhasePayload::OnMove { steps }, rng, events) {
                Some(SkillEffect::Steps(adjusted)) => steps = adjusted,
                Some(SkillEffect::CarriedSteps(adjusted)) => {
                    steps = adjusted;
                    group_steps = Some(adjusted);
                }
                _ => {}
            }
        }
        steps = steps.saturating_add(self.deferred_bonus(id, rng, events));

        let board = &mut self.state.board;
        let from = board.position_of(id);
        let steps = steps.min(board.length().saturating_sub(from));
        let to = board.advance(id, steps);

        let round = self.state.run.round();
        emit(events, || {
            RaceEvent::new(round, RaceEventKind::Moved).by(id).with_payload(json!({
                "from": from,
                "to": to,
                "steps": steps,
                "carried": !skills_enabled,
            }))
        });
        group_steps
    }

    /// Extra steps owed by an open deferred bonus window.
    ///
    /// A window that has passed is cleared on the next move attempt.
    fn deferred_bonus(
        &mut self,
        id: CompetitorId,
        rng: &mut dyn RaceRandom,
        events: &mut dyn EventSink,
    ) -> u32 {
        let round = self.state.run.round();
        let Some(state) = self.state.competitors.get_mut(id.index()) else {
            return 0;
        };
        let Some(bonus) = state.deferred_bonus.as_ref() else {
            return 0;
        };
        if bonus.is_expired(round) {
            state.deferred_bonus = None;
            emit(events, || RaceEvent::new(round, RaceEventKind::BonusExpired).by(id));
            return 0;
        }
        if !bonus.covers(round) {
            return 0;
        }
        let extra = bonus.amount.draw(rng);
        emit(events, || {
            RaceEvent::new(round, RaceEventKind::BonusApplied)
                .by(id)
                .with_payload(json!({ "extra": extra }))
        });
        extra
    }

    /// Run the competitor's first skill eligible for the payload's phase.
    ///
    /// A one-shot that already fired this race is skipped without drawing
    /// from the gate stream.
    pub(crate) fn dispatch(
        &mut self,
        competitor: CompetitorId,
        payload: PhasePayload,
        rng: &mut dyn RaceRandom,
        events: &mut dyn EventSink,
    ) -> Option<SkillEffect> {
        let phase = payload.phase();
        let roster = self.roster;
        let registry = self.registry;
        let entrant = roster.get(competitor)?;
        let (slot, spec) = registry.first_eligible(phase, entrant.skills())?;
        let one_shot = spec.kind.is_one_shot();
        if one_shot && self.state.slots.has_fired(competitor, slot) {
            return None;
        }
        if !spec.passes_gate(rng.unit()) {
            return None;
        }

        let RaceState {
            board,
            run,
            competitors,
            slots,
        } = &mut self.state;
        let own = competitors.get_mut(competitor.index())?;
        let mut ctx = HookContext {
            competitor,
            payload,
            board: &mut *board,
            run: &mut *run,
            state: own,
            rng: &mut *rng,
            events: &mut *events,
        };
        let effect = spec.kind.apply(&mut ctx)?;
        if one_shot {
            slots.mark_fired(competitor, slot);
        }

        let round = run.round();
        let tag = spec.kind.tag();
        emit(events, || {
            RaceEvent::new(round, RaceEventKind::SkillTriggered)
                .by(competitor)
                .during(phase)
                .with_payload(json!({ "skill": tag, "slot": slot, "effect": effect }))
        });
        Some(effect)
    }

    fn outcome(&self, winner: CompetitorId) -> RaceOutcome {
        let board = &self.state.board;
        RaceOutcome {
            winner,
            rounds: self.state.run.round(),
            standings: board.standings(),
            positions: self.roster.ids().map(|id| board.position_of(id)).collect(),
        }
    }
}
