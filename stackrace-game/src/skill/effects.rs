//! Behavior of each skill kind once its gate has opened.
//!
//! Returning `None` means the kind's precondition did not hold; the engine
//! then treats the invocation as a no-op and does not consume a one-shot.

use serde_json::json;

use super::{HookContext, SkillEffect, SkillKind};
use crate::competitor::{BonusAmount, DeferredBonus};
use crate::race::event::RaceEventKind;

impl SkillKind {
    pub(crate) fn apply(&self, ctx: &mut HookContext<'_>) -> Option<SkillEffect> {
        if ctx.run.is_first_round() && !matches!(self, Self::RestrictedDie { .. }) {
            return None;
        }
        match self {
            Self::StackClimb => stack_climb(ctx),
            Self::LastMover => last_mover(ctx),
            Self::TrailingBoost { bonus } => trailing_boost(ctx, *bonus),
            Self::RestrictedDie { faces } => {
                Some(SkillEffect::Dice(ctx.rng.roll(Some(faces.as_slice()))))
            }
            Self::StackSurge => stack_surge(ctx),
            Self::DoubleMove => {
                let steps = ctx.payload.steps()?;
                Some(SkillEffect::CarriedSteps(steps.saturating_mul(2)))
            }
            Self::LateCharge {
                amount,
                delay,
                rounds,
            } => late_charge(ctx, amount, *delay, *rounds),
        }
    }
}

fn stack_climb(ctx: &mut HookContext<'_>) -> Option<SkillEffect> {
    if !ctx.board.raise_to_top(ctx.competitor) {
        return None;
    }
    let position = ctx.board.position_of(ctx.competitor);
    let stack = ctx.board.stack_at(position).to_vec();
    ctx.emit(RaceEventKind::StackReordered, || {
        json!({ "position": position, "stack": stack })
    });
    Some(SkillEffect::Applied)
}

fn last_mover(ctx: &mut HookContext<'_>) -> Option<SkillEffect> {
    let me = ctx.competitor;
    let buried = ctx.board.stack_of(me).len() > 1 && !ctx.board.is_top(me);
    if !buried || ctx.run.turn_order().last() == Some(&me) {
        return None;
    }
    if !ctx.run.move_to_back(me) {
        return None;
    }
    let order = ctx.run.turn_order().to_vec();
    ctx.emit(RaceEventKind::TurnOrderChanged, || json!({ "order": order }));
    Some(SkillEffect::Applied)
}

fn trailing_boost(ctx: &HookContext<'_>, bonus: u32) -> Option<SkillEffect> {
    let steps = ctx.payload.steps()?;
    ctx.board
        .is_trailing(ctx.competitor)
        .then(|| SkillEffect::Steps(steps.saturating_add(bonus)))
}

fn stack_surge(ctx: &HookContext<'_>) -> Option<SkillEffect> {
    let steps = ctx.payload.steps()?;
    let others = ctx.board.stack_of(ctx.competitor).len().saturating_sub(1);
    let extra = u32::try_from(others).unwrap_or(u32::MAX);
    (extra > 0).then(|| SkillEffect::Steps(steps.saturating_add(extra)))
}

fn late_charge(
    ctx: &mut HookContext<'_>,
    amount: &BonusAmount,
    delay: u32,
    rounds: u32,
) -> Option<SkillEffect> {
    if !ctx.board.is_trailing(ctx.competitor) {
        return None;
    }
    let first_round = ctx.run.round().saturating_add(delay);
    let last_round = first_round.saturating_add(rounds.saturating_sub(1));
    let bonus = DeferredBonus {
        amount: amount.clone(),
        first_round,
        last_round,
    };
    ctx.state.deferred_bonus = Some(bonus);
    ctx.emit(RaceEventKind::BonusGranted, || {
        json!({ "first_round": first_round, "last_round": last_round })
    });
    Some(SkillEffect::Applied)
}
