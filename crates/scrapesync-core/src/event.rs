//! Lifecycle events.
//!
//! An [`Event`] records one lifecycle signal for a workload, either observed
//! on the runtime's event stream or synthesized by the snapshot producer.
//! Events are immutable once created; ordering between them is defined
//! solely by arrival order into the [`crate::EventLog`].

use std::time::{SystemTime, UNIX_EPOCH};

/// A recognized lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    /// The workload started.
    Start,
    /// The workload was already running (snapshot baseline).
    Running,
    /// The workload stopped.
    Stop,
    /// The workload's process exited.
    Die,
}

impl EventAction {
    /// Every recognized action, in wire-name order.
    pub const ALL: [EventAction; 4] = [
        EventAction::Start,
        EventAction::Running,
        EventAction::Stop,
        EventAction::Die,
    ];

    /// Map a runtime action name onto a variant.
    ///
    /// Total over the four recognized names; anything else is `None` and
    /// must be dropped by the caller, never treated as a transition.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "start" => Some(EventAction::Start),
            "running" => Some(EventAction::Running),
            "stop" => Some(EventAction::Stop),
            "die" => Some(EventAction::Die),
            _ => None,
        }
    }

    /// The runtime's wire name for this action.
    pub fn as_name(&self) -> &'static str {
        match self {
            EventAction::Start => "start",
            EventAction::Running => "running",
            EventAction::Stop => "stop",
            EventAction::Die => "die",
        }
    }

    /// Whether this action removes the workload from the target set.
    pub fn is_removal(&self) -> bool {
        matches!(self, EventAction::Stop | EventAction::Die)
    }
}

/// One immutable lifecycle signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// What happened.
    pub action: EventAction,
    /// Opaque stable identifier of the workload instance.
    pub workload_id: String,
    /// Service name the workload publishes under (the job key).
    pub name: String,
    /// When the event was recorded (epoch seconds, informational only).
    pub recorded_at: u64,
}

impl Event {
    /// Create an event stamped with the current time.
    pub fn new(action: EventAction, workload_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            action,
            workload_id: workload_id.into(),
            name: name.into(),
            recorded_at: epoch_secs(),
        }
    }
}

/// Current time as epoch seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_name_recognizes_all_actions() {
        for action in EventAction::ALL {
            assert_eq!(EventAction::from_name(action.as_name()), Some(action));
        }
    }

    #[test]
    fn from_name_rejects_unknown() {
        assert_eq!(EventAction::from_name("destroy"), None);
        assert_eq!(EventAction::from_name(""), None);
        assert_eq!(EventAction::from_name("Start"), None);
    }

    #[test]
    fn removal_actions() {
        assert!(EventAction::Stop.is_removal());
        assert!(EventAction::Die.is_removal());
        assert!(!EventAction::Start.is_removal());
        assert!(!EventAction::Running.is_removal());
    }

    #[test]
    fn event_is_stamped() {
        let event = Event::new(EventAction::Start, "w1", "svc-a");
        assert_eq!(event.workload_id, "w1");
        assert_eq!(event.name, "svc-a");
        assert!(event.recorded_at > 0);
    }
}
