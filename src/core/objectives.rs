use std::fmt;

use serde::{Deserialize, Serialize};

use super::events::{Event, EventSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentStatus {
    NotReady,
    Starting,
    OK,
    Warning,
    Failed,
}

impl ComponentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ComponentStatus::OK | ComponentStatus::Warning | ComponentStatus::Failed)
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComponentStatus::NotReady => "NotReady",
            ComponentStatus::Starting => "Starting",
            ComponentStatus::OK => "OK",
            ComponentStatus::Warning => "Warning",
            ComponentStatus::Failed => "Failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectiveId {
    Pod,
    SessionAuth,
    PodApi,
    KeyManager,
    KeyAuth,
    Agent,
}

impl ObjectiveId {
    pub const ALL: [ObjectiveId; 6] = [
        ObjectiveId::Pod,
        ObjectiveId::SessionAuth,
        ObjectiveId::PodApi,
        ObjectiveId::KeyManager,
        ObjectiveId::KeyAuth,
        ObjectiveId::Agent,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ObjectiveId::Pod => "Locate Pod",
            ObjectiveId::SessionAuth => "Locate Session Auth Endpoint",
            ObjectiveId::PodApi => "Locate Pod API Endpoint",
            ObjectiveId::KeyManager => "Locate Key Manager",
            ObjectiveId::KeyAuth => "Locate Key Manager Auth Endpoint",
            ObjectiveId::Agent => "Locate Agent",
        }
    }
}

pub const NO_CONTACT: &str = "No Contact";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub id: ObjectiveId,
    pub status: ComponentStatus,
    pub message: String,
}

impl Objective {
    fn new(id: ObjectiveId) -> Self {
        Self {
            id,
            status: ComponentStatus::NotReady,
            message: NO_CONTACT.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.id.label()
    }
}

/// Per-service status indicators for one run. Every transition is published
/// on the event sink.
#[derive(Debug, Clone)]
pub struct ObjectiveTracker {
    objectives: Vec<Objective>,
    events: EventSink,
}

impl ObjectiveTracker {
    pub fn new(events: EventSink) -> Self {
        Self {
            objectives: ObjectiveId::ALL.iter().copied().map(Objective::new).collect(),
            events,
        }
    }

    #[cfg(test)]
    pub fn get(&self, id: ObjectiveId) -> &Objective {
        // ALL covers every variant, see new()
        self.objectives
            .iter()
            .find(|o| o.id == id)
            .unwrap_or_else(|| unreachable!("objective {:?} not tracked", id))
    }

    #[cfg(test)]
    pub fn status(&self, id: ObjectiveId) -> ComponentStatus {
        self.get(id).status
    }

    pub fn snapshot(&self) -> Vec<Objective> {
        self.objectives.clone()
    }

    /// Move an objective to `status`. A terminal objective cannot go back to
    /// `Starting` (or `NotReady`) without an explicit `reset`; such requests
    /// are ignored and `false` is returned.
    pub fn set(&mut self, id: ObjectiveId, status: ComponentStatus, message: impl Into<String>) -> bool {
        let message = message.into();
        let Some(objective) = self.objectives.iter_mut().find(|o| o.id == id) else {
            return false;
        };

        if objective.status.is_terminal() && !status.is_terminal() {
            tracing::warn!(
                "Ignoring {} -> {} for \"{}\" without a reset",
                objective.status,
                status,
                id.label()
            );
            return false;
        }

        tracing::debug!("{}: {} ({})", id.label(), status, message);
        objective.status = status;
        objective.message = message.clone();

        self.events.emit(Event::ObjectiveChanged {
            id,
            label: id.label(),
            status,
            message,
        });
        true
    }

    pub fn set_ok(&mut self, id: ObjectiveId) -> bool {
        self.set(id, ComponentStatus::OK, "OK")
    }

    pub fn reset(&mut self, id: ObjectiveId) {
        if let Some(objective) = self.objectives.iter_mut().find(|o| o.id == id) {
            objective.status = ComponentStatus::NotReady;
            objective.message = NO_CONTACT.to_string();
            self.events.emit(Event::ObjectiveChanged {
                id,
                label: id.label(),
                status: ComponentStatus::NotReady,
                message: NO_CONTACT.to_string(),
            });
        }
    }

    /// Fail every objective that has not yet reached a terminal state.
    pub fn fail_undetermined(&mut self, message: &str) {
        let pending: Vec<ObjectiveId> = self
            .objectives
            .iter()
            .filter(|o| !o.status.is_terminal())
            .map(|o| o.id)
            .collect();

        for id in pending {
            self.set(id, ComponentStatus::Failed, message);
        }
    }
}
