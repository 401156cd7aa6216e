use tokio::sync::mpsc;

use super::objectives::{ComponentStatus, ObjectiveId};

/// Everything the discovery engine tells the outside world. A presentation
/// layer subscribes to these; the engine itself never writes to the terminal.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TaskBegin {
        title: String,
        total_work: u64,
    },
    SubTask(String),
    Worked(u64),
    Title(String),
    Message(String),
    ObjectiveChanged {
        id: ObjectiveId,
        label: &'static str,
        status: ComponentStatus,
        message: String,
    },
    Finished,
}

/// Sending half of the event stream. Sending never fails the run: a dropped
/// receiver only means nobody is watching.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<mpsc::UnboundedSender<Event>>,
}

impl EventSink {
    pub fn new(sender: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// A sink that discards everything.
    #[cfg(test)]
    pub fn detached() -> Self {
        Self { sender: None }
    }

    pub fn emit(&self, event: Event) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    pub fn say(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("{}", message);
        self.emit(Event::Message(message));
    }

    pub fn title(&self, title: impl Into<String>) {
        self.emit(Event::Title(title.into()));
    }

    /// One `name = value` line of a summary block.
    pub fn field(&self, name: &str, value: impl std::fmt::Display) {
        self.say(format!("{:<20}={}", name, value));
    }

    pub fn worked(&self, units: u64) {
        if units > 0 {
            self.emit(Event::Worked(units));
        }
    }
}
