use crate::competitor::{CompetitorId, Roster};

/// Per-race "already fired" flags, one per competitor skill slot.
///
/// Only one-shot kinds consult these flags. They are owned by the race
/// state, never by the shared skill descriptors, so repeated races over the
/// same roster start from a clean slate after [`SkillSlots::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillSlots {
    fired: Vec<Vec<bool>>,
}

impl SkillSlots {
    #[must_use]
    pub fn for_roster(roster: &Roster) -> Self {
        Self {
            fired: roster
                .iter()
                .map(|competitor| vec![false; competitor.skills.len()])
                .collect(),
        }
    }

    pub fn reset(&mut self) {
        for slots in &mut self.fired {
            slots.fill(false);
        }
    }

    #[must_use]
    pub fn has_fired(&self, id: CompetitorId, slot: usize) -> bool {
        self.fired
            .get(id.index())
            .and_then(|slots| slots.get(slot))
            .copied()
            .unwrap_or(false)
    }

    pub(crate) fn mark_fired(&mut self, id: CompetitorId, slot: usize) {
        if let Some(flag) = self
            .fired
            .get_mut(id.index())
            .and_then(|slots| slots.get_mut(slot))
        {
            *flag = true;
        }
    }

    /// Number of slots of `id` that fired this race.
    #[must_use]
    pub fn fired_count(&self, id: CompetitorId) -> usize {
        self.fired
            .get(id.index())
            .map_or(0, |slots| slots.iter().filter(|&&fired| fired).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::competitor::BonusAmount;
    use crate::config::CompetitorSpec;
    use crate::skill::{SkillKind, SkillRegistry, SkillSpec};

    #[test]
    fn flags_mark_and_reset() {
        let late = SkillSpec::certain(SkillKind::LateCharge {
            amount: BonusAmount::Fixed(1),
            delay: 1,
            rounds: 1,
        });
        let specs = vec![
            CompetitorSpec::new("a", "A", 1.0).with_skill(late),
            CompetitorSpec::new("b", "B", 1.0),
        ];
        let roster = Roster::from_specs(&specs, &SkillRegistry::standard()).unwrap();
        let a = CompetitorId::from_index(0);
        let b = CompetitorId::from_index(1);

        let mut slots = SkillSlots::for_roster(&roster);
        assert!(!slots.has_fired(a, 0));
        slots.mark_fired(a, 0);
        slots.mark_fired(b, 3);
        assert!(slots.has_fired(a, 0));
        assert_eq!(slots.fired_count(a), 1);
        assert_eq!(slots.fired_count(b), 0);

        slots.reset();
        assert!(!slots.has_fired(a, 0));
    }
}
