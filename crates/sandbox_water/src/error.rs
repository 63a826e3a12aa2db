//! Startup and configuration errors.
//!
//! Runtime policy decisions (ignored mode transitions, capped populations,
//! empty depth bands) are not errors and never show up here.

/// Errors surfaced while configuring or assembling a sandbox session.
#[derive(thiserror::Error, Debug)]
pub enum SandboxError {
    #[error("missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SandboxError {
    pub fn invalid_config<T: ToString>(msg: T) -> Self {
        SandboxError::InvalidConfig(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SandboxError>;
