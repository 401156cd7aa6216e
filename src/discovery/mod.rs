pub mod endpoints;
pub mod orchestrator;
pub mod work;


pub use orchestrator::{DiscoveryOrchestrator, ProbeReport, RunOutcome};
