use crate::core::events::{Event, EventSink};

pub const PROBE_POD_WORK: u64 = 6;
pub const AUTH_PROBE_WORK: u64 = 1;
pub const AGENT_PROBE_WORK: u64 = 1;
pub const SAVE_CONFIG_WORK: u64 = 2;

pub fn total_work(pod_ports: usize) -> u64 {
    PROBE_POD_WORK * pod_ports as u64 + AUTH_PROBE_WORK + AGENT_PROBE_WORK + SAVE_CONFIG_WORK
}

/// Work-unit budget of one sub-task. Units not reported by the time it is
/// dropped are reported then, so early exits still complete the bar.
pub struct SubTask {
    events: EventSink,
    remaining: u64,
}

impl SubTask {
    pub fn begin(events: &EventSink, title: impl Into<String>, work: u64) -> Self {
        events.emit(Event::SubTask(title.into()));
        Self {
            events: events.clone(),
            remaining: work,
        }
    }

    pub fn worked(&mut self, units: u64) {
        let units = units.min(self.remaining);
        self.remaining -= units;
        self.events.worked(units);
    }
}

impl Drop for SubTask {
    fn drop(&mut self) {
        self.events.worked(self.remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worked_total(rx: &mut tokio::sync::mpsc::UnboundedReceiver<Event>) -> u64 {
        let mut total = 0;
        while let Ok(event) = rx.try_recv() {
            if let Event::Worked(units) = event {
                total += units;
            }
        }
        total
    }

    #[test]
    fn test_drop_reports_remainder() {
        let (events, mut rx) = EventSink::channel();
        {
            let mut task = SubTask::begin(&events, "Probing Port 443", PROBE_POD_WORK);
            task.worked(1);
            task.worked(1);
        }
        assert_eq!(worked_total(&mut rx), PROBE_POD_WORK);
    }

    #[test]
    fn test_never_overreports() {
        let (events, mut rx) = EventSink::channel();
        {
            let mut task = SubTask::begin(&events, "Saving Configuration", SAVE_CONFIG_WORK);
            task.worked(5);
        }
        assert_eq!(worked_total(&mut rx), SAVE_CONFIG_WORK);
    }

    #[test]
    fn test_total_work() {
        assert_eq!(total_work(2), 16);
    }
}
