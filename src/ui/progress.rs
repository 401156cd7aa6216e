use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::core::events::Event;
use crate::core::objectives::ComponentStatus;

/// Renders the discovery event stream: an overall progress bar with the
/// narration printed above it, or plain lines with `--simple`.
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
    simple: bool,
}

impl ProgressReporter {
    pub fn new(simple: bool) -> Self {
        Self { bar: None, simple }
    }

    /// Consume events until the sending side goes away.
    pub fn spawn(mut self, mut rx: UnboundedReceiver<Event>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.handle(event);
            }
            self.finish();
        })
    }

    fn handle(&mut self, event: Event) {
        match &event {
            Event::TaskBegin { title, total_work } if !self.simple => {
                let bar = ProgressBar::with_draw_target(Some(*total_work), ProgressDrawTarget::stderr());
                bar.set_style(
                    ProgressStyle::with_template("{spinner:.blue} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar.set_message(title.clone());
                bar.enable_steady_tick(Duration::from_millis(80));
                self.bar = Some(bar);
            }
            Event::SubTask(title) => {
                if let Some(bar) = &self.bar {
                    bar.set_message(title.clone());
                }
            }
            Event::Worked(units) => {
                if let Some(bar) = &self.bar {
                    bar.inc(*units);
                }
            }
            Event::Finished => self.finish(),
            _ => {}
        }

        if let Some(line) = render(&event) {
            self.println(&line);
        }
    }

    fn println(&self, line: &str) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{}", line),
        }
    }

    fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

/// The text a single event contributes to the narration, if any.
pub fn render(event: &Event) -> Option<String> {
    match event {
        Event::TaskBegin { title, .. } => Some(title.bold().to_string()),
        Event::Title(title) => Some(format!(
            "\n{}\n{}",
            title.bright_cyan().bold(),
            "=".repeat(title.chars().count()).bright_cyan()
        )),
        Event::Message(message) => Some(message.clone()),
        Event::ObjectiveChanged {
            label,
            status,
            message,
            ..
        } if status.is_terminal() => Some(format!("{} {}: {}", status_badge(*status), label, message)),
        _ => None,
    }
}

pub fn status_badge(status: ComponentStatus) -> ColoredString {
    let text = format!("[{}]", status);
    match status {
        ComponentStatus::OK => text.green().bold(),
        ComponentStatus::Warning => text.yellow().bold(),
        ComponentStatus::Failed => text.red().bold(),
        ComponentStatus::Starting => text.blue(),
        ComponentStatus::NotReady => text.bright_black(),
    }
}
