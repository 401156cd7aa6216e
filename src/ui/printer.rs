use colored::*;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::core::models::SessionIdentity;
use crate::core::objectives::{ComponentStatus, Objective};
use crate::discovery::{ProbeReport, RunOutcome};

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn status_cell(status: ComponentStatus) -> Cell {
    let cell = Cell::new(status.to_string());
    match status {
        ComponentStatus::OK => cell.fg(Color::Green),
        ComponentStatus::Warning => cell.fg(Color::Yellow),
        ComponentStatus::Failed => cell.fg(Color::Red),
        ComponentStatus::Starting => cell.fg(Color::Blue),
        ComponentStatus::NotReady => cell.fg(Color::DarkGrey),
    }
}

pub fn objectives_table(objectives: &[Objective]) -> String {
    let mut table = table();
    table.set_header(vec![
        Cell::new("Objective").add_attribute(Attribute::Bold),
        Cell::new("Status").add_attribute(Attribute::Bold),
        Cell::new("Message").add_attribute(Attribute::Bold),
    ]);
    for objective in objectives {
        table.add_row(vec![
            Cell::new(objective.label()),
            status_cell(objective.status),
            Cell::new(&objective.message),
        ]);
    }
    table.to_string()
}

pub fn print_objectives(objectives: &[Objective]) {
    println!("\n{}", objectives_table(objectives));
}

pub fn outcome_line(outcome: RunOutcome) -> ColoredString {
    match outcome {
        RunOutcome::Completed => "Probe complete".green().bold(),
        RunOutcome::NoWebServer => "Probe did not find a website".red().bold(),
        RunOutcome::NotAPod => "Probe found a website but no pod".red().bold(),
        RunOutcome::NoKeyManager => "Probe found a pod but no key manager".red().bold(),
        RunOutcome::Cancelled => "Probe cancelled".yellow().bold(),
    }
}

/// Identity fields the pod reported for our session, `field=value` joined.
fn identity_line(identity: &SessionIdentity) -> Option<String> {
    if !identity.authenticated {
        return None;
    }
    let known: Vec<String> = identity
        .fields
        .iter()
        .filter_map(|(field, value)| value.as_ref().map(|v| format!("{}={}", field, v)))
        .collect();
    (!known.is_empty()).then(|| known.join(", "))
}

pub fn report_lines(target: &str, report: &ProbeReport) -> Vec<String> {
    let mut lines = vec![format!("{}: {}", "Target".cyan().bold(), target)];

    if let Some(pod_url) = &report.pod.pod_url {
        let health = if report.pod_healthy {
            "healthy".green()
        } else {
            "unhealthy".red()
        };
        lines.push(format!("{}: {} ({})", "Pod".cyan().bold(), pod_url, health));
    }
    if let Some(agent_url) = &report.agent.agent_api_url {
        lines.push(format!("{}: {} ({})", "Agent".cyan().bold(), agent_url, report.agent.name));
    }
    if let Some(identity) = report.session_identity.as_ref().and_then(identity_line) {
        lines.push(format!("{}: {}", "Authenticated as".cyan().bold(), identity));
    }
    lines.push(format!(
        "{}: {} root, {} server",
        "Certificates".cyan().bold(),
        report.trust_certs.len(),
        report.leaf_certs.len()
    ));
    if report.saved {
        lines.push("Configuration saved".green().dimmed().to_string());
    }
    lines
}

pub fn print_report(target: &str, report: &ProbeReport) {
    println!("\n{}", "═══════════════════════════════════════".green().bold());
    println!("{}", outcome_line(report.outcome));
    println!("{}", "═══════════════════════════════════════".green().bold());
    println!();
    for line in report_lines(target, report) {
        println!("{}", line);
    }

    print_objectives(&report.objectives);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{AgentConfig, PodConfig, create_url};
    use crate::core::objectives::ObjectiveId;

    #[test]
    fn test_objectives_table_lists_every_objective() {
        let objectives = vec![
            Objective {
                id: ObjectiveId::Pod,
                status: ComponentStatus::OK,
                message: "OK".to_string(),
            },
            Objective {
                id: ObjectiveId::KeyAuth,
                status: ComponentStatus::Warning,
                message: "Unable to authenticate".to_string(),
            },
        ];

        let rendered = objectives_table(&objectives);
        assert!(rendered.contains("Locate Pod"));
        assert!(rendered.contains("Locate Key Manager Auth Endpoint"));
        assert!(rendered.contains("Unable to authenticate"));
        assert!(rendered.contains("Warning"));
    }

    #[test]
    fn test_report_shows_agent_and_identity() {
        colored::control::set_override(false);
        let report = ProbeReport {
            outcome: RunOutcome::Completed,
            pod: PodConfig::default(),
            agent: AgentConfig {
                name: "acme-api.symphony.com".to_string(),
                agent_api_url: Some(create_url("https://acme-api.symphony.com:8444/agent").unwrap()),
            },
            pod_healthy: true,
            session_identity: Some(SessionIdentity {
                authenticated: true,
                fields: vec![
                    ("id".to_string(), Some("7".to_string())),
                    ("company".to_string(), None),
                    ("displayName".to_string(), Some("Bot".to_string())),
                ],
            }),
            trust_certs: Vec::new(),
            leaf_certs: Vec::new(),
            objectives: Vec::new(),
            saved: false,
        };

        let lines = report_lines("acme.symphony.com", &report);
        assert!(lines.contains(
            &"Agent: https://acme-api.symphony.com:8444/agent (acme-api.symphony.com)".to_string()
        ));
        assert!(lines.contains(&"Authenticated as: id=7, displayName=Bot".to_string()));
    }

    #[test]
    fn test_rejected_session_has_no_identity_line() {
        let identity = SessionIdentity {
            authenticated: false,
            fields: vec![("id".to_string(), Some("7".to_string()))],
        };
        assert_eq!(identity_line(&identity), None);
    }

    #[test]
    fn test_outcome_line() {
        colored::control::set_override(false);
        assert_eq!(outcome_line(RunOutcome::Cancelled).to_string(), "Probe cancelled");
    }
}
