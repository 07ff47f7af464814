//! Phase-to-skill registry.

use std::collections::BTreeMap;

use super::{Phase, SkillSpec, SkillTag};
use crate::config::ConfigError;

/// Maps each phase to the skill kinds allowed to run during it.
///
/// Built once before a batch and shared read-only across races.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillRegistry {
    by_phase: BTreeMap<Phase, Vec<SkillTag>>,
}

impl SkillRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry with every built-in kind under its declared phase.
    #[must_use]
    pub fn standard() -> Self {
        let mut by_phase: BTreeMap<Phase, Vec<SkillTag>> = BTreeMap::new();
        for tag in SkillTag::ALL {
            by_phase.entry(tag.phase()).or_default().push(tag);
        }
        Self { by_phase }
    }

    /// Allow `tag` to run during `phase`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::PhaseMismatch` when `phase` is not the phase the
    /// kind declares, and `ConfigError::DuplicateRegistration` when the pair
    /// is already present.
    pub fn register(&mut self, phase: Phase, tag: SkillTag) -> Result<&mut Self, ConfigError> {
        if tag.phase() != phase {
            return Err(ConfigError::PhaseMismatch {
                skill: tag,
                declared: tag.phase(),
                requested: phase,
            });
        }
        let eligible = self.by_phase.entry(phase).or_default();
        if eligible.contains(&tag) {
            return Err(ConfigError::DuplicateRegistration { skill: tag, phase });
        }
        eligible.push(tag);
        Ok(self)
    }

    /// Kinds eligible during `phase`, in registration order.
    #[must_use]
    pub fn eligible(&self, phase: Phase) -> &[SkillTag] {
        self.by_phase.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    #[must_use]
    pub fn accepts(&self, phase: Phase, tag: SkillTag) -> bool {
        self.eligible(phase).contains(&tag)
    }

    #[must_use]
    pub fn is_registered(&self, tag: SkillTag) -> bool {
        self.accepts(tag.phase(), tag)
    }

    /// Validate a competitor's skill and check that its kind is registered.
    ///
    /// # Errors
    ///
    /// Returns the validation error of the descriptor, or
    /// `ConfigError::UnregisteredSkill`.
    pub fn validate_spec(
        &self,
        competitor: &str,
        slot: usize,
        spec: &SkillSpec,
    ) -> Result<(), ConfigError> {
        spec.validate(competitor, slot)?;
        let tag = spec.kind.tag();
        if !self.is_registered(tag) {
            return Err(ConfigError::UnregisteredSkill {
                competitor: competitor.to_string(),
                skill: tag,
                phase: tag.phase(),
            });
        }
        Ok(())
    }

    /// First skill in declaration order eligible for `phase`, with its slot.
    ///
    /// Later eligible skills are shadowed for that phase.
    #[must_use]
    pub fn first_eligible<'s>(
        &self,
        phase: Phase,
        skills: &'s [SkillSpec],
    ) -> Option<(usize, &'s SkillSpec)> {
        skills
            .iter()
            .enumerate()
            .find(|(_, spec)| self.accepts(phase, spec.kind.tag()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skill::SkillKind;

    #[test]
    fn standard_registry_covers_every_kind_under_its_phase() {
        let registry = SkillRegistry::standard();
        for tag in SkillTag::ALL {
            assert!(registry.accepts(tag.phase(), tag), "{tag} missing");
        }
        assert_eq!(
            registry.eligible(Phase::OnMove),
            &[
                SkillTag::TrailingBoost,
                SkillTag::StackSurge,
                SkillTag::DoubleMove
            ]
        );
        assert!(registry.eligible(Phase::BeforeRoll).is_empty());
    }

    #[test]
    fn register_rejects_wrong_phase_and_duplicates() {
        let mut registry = SkillRegistry::empty();
        assert!(matches!(
            registry.register(Phase::OnRoll, SkillTag::StackClimb),
            Err(ConfigError::PhaseMismatch { .. })
        ));
        registry
            .register(Phase::OnRoll, SkillTag::RestrictedDie)
            .unwrap();
        assert!(matches!(
            registry.register(Phase::OnRoll, SkillTag::RestrictedDie),
            Err(ConfigError::DuplicateRegistration { .. })
        ));
        assert!(registry.is_registered(SkillTag::RestrictedDie));
        assert!(!registry.is_registered(SkillTag::StackClimb));
    }

    #[test]
    fn first_eligible_shadows_later_skills() {
        let registry = SkillRegistry::standard();
        let skills = vec![
            SkillSpec::certain(SkillKind::StackClimb),
            SkillSpec::new(SkillKind::StackSurge, 0.5),
            SkillSpec::certain(SkillKind::DoubleMove),
        ];
        let (slot, spec) = registry.first_eligible(Phase::OnMove, &skills).unwrap();
        assert_eq!(slot, 1);
        assert_eq!(spec.kind, SkillKind::StackSurge);
        assert!(registry.first_eligible(Phase::OnRoll, &skills).is_none());
    }
}
