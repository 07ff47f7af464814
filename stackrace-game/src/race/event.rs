//! Structured events emitted by the race engine.
//!
//! Events are observational: no sink can influence a race. The engine checks
//! [`EventSink::enabled`] before building a payload, so batch simulations
//! with a [`NullSink`] pay nothing for them.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::competitor::CompetitorId;
use crate::constants::LOG_TARGET_RACE;
use crate::skill::Phase;

/// Mechanical event kind emitted by the race engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceEventKind {
    RoundStarted,
    SkillTriggered,
    DiceRolled,
    Moved,
    BonusGranted,
    BonusApplied,
    BonusExpired,
    StackReordered,
    TurnOrderChanged,
    RoundEnded,
    RaceFinished,
}

/// Structured event emitted by the race engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceEvent {
    /// One-based round counter; 0 before the first round starts.
    pub round: u32,
    pub kind: RaceEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitor: Option<CompetitorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl RaceEvent {
    #[must_use]
    pub const fn new(round: u32, kind: RaceEventKind) -> Self {
        Self {
            round,
            kind,
            competitor: None,
            phase: None,
            payload: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub const fn by(mut self, competitor: CompetitorId) -> Self {
        self.competitor = Some(competitor);
        self
    }

    #[must_use]
    pub const fn during(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

impl fmt::Display for RaceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {} {:?}", self.round, self.kind)?;
        if let Some(competitor) = self.competitor {
            write!(f, " {competitor}")?;
        }
        if let Some(phase) = self.phase {
            write!(f, " [{phase}]")?;
        }
        if !self.payload.is_null() {
            write!(f, " {}", self.payload)?;
        }
        Ok(())
    }
}

/// Receiver for race events.
pub trait EventSink {
    /// Whether events should be built at all.
    fn enabled(&self) -> bool {
        true
    }

    fn record(&mut self, event: RaceEvent);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn enabled(&self) -> bool {
        false
    }

    fn record(&mut self, _event: RaceEvent) {}
}

/// Collects events in memory, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    events: Vec<RaceEvent>,
}

impl EventLog {
    #[must_use]
    pub const fn new() -> Self {
        Self { events: Vec::new() }
    }

    #[must_use]
    pub fn events(&self) -> &[RaceEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<RaceEvent> {
        self.events
    }

    pub fn of_kind(&self, kind: RaceEventKind) -> impl Iterator<Item = &RaceEvent> {
        self.events.iter().filter(move |event| event.kind == kind)
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventLog {
    fn record(&mut self, event: RaceEvent) {
        self.events.push(event);
    }
}

/// Forwards events to the `log` facade at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn enabled(&self) -> bool {
        log::log_enabled!(target: LOG_TARGET_RACE, log::Level::Debug)
    }

    fn record(&mut self, event: RaceEvent) {
        log::debug!(target: LOG_TARGET_RACE, "{event}");
    }
}

pub(crate) fn emit(events: &mut dyn EventSink, build: impl FnOnce() -> RaceEvent) {
    if events.enabled() {
        events.record(build());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn event_roundtrips_and_skips_empty_fields() {
        let event = RaceEvent::new(3, RaceEventKind::Moved)
            .by(CompetitorId::from_index(1))
            .during(Phase::OnMove)
            .with_payload(json!({ "from": 2, "to": 5 }));
        let json = serde_json::to_string(&event).expect("serialize");
        let restored: RaceEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(restored, event);

        let bare = serde_json::to_value(RaceEvent::new(1, RaceEventKind::RoundStarted))
            .expect("serialize");
        assert_eq!(bare, json!({ "round": 1, "kind": "round_started" }));
    }

    #[test]
    fn display_is_single_line() {
        let event = RaceEvent::new(2, RaceEventKind::DiceRolled)
            .by(CompetitorId::from_index(0))
            .with_payload(json!({ "value": 3 }));
        assert_eq!(event.to_string(), r#"round 2 DiceRolled #0 {"value":3}"#);
    }

    #[test]
    fn null_sink_skips_building() {
        let mut sink = NullSink;
        let mut built = false;
        emit(&mut sink, || {
            built = true;
            RaceEvent::new(1, RaceEventKind::RoundEnded)
        });
        assert!(!built);

        let mut log = EventLog::new();
        emit(&mut log, || RaceEvent::new(1, RaceEventKind::RoundEnded));
        emit(&mut log, || RaceEvent::new(1, RaceEventKind::RaceFinished));
        assert_eq!(log.len(), 2);
        assert_eq!(log.of_kind(RaceEventKind::RaceFinished).count(), 1);
    }
}
