use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodProbeError {
    /// A programmer-level invariant was violated, e.g. a URL that cannot be
    /// built from parts we assembled ourselves. Never a network condition.
    #[error("program fault: {0}")]
    ProgramFault(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("tls setup failed: {0}")]
    Tls(String),

    #[error("store failure: {0}")]
    Store(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PodProbeError {
    pub fn program_fault(what: impl std::fmt::Display) -> Self {
        PodProbeError::ProgramFault(what.to_string())
    }

    pub fn is_program_fault(&self) -> bool {
        matches!(self, PodProbeError::ProgramFault(_))
    }
}
