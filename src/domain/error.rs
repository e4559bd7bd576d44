use std::time::Duration;
use thiserror::Error;

use crate::domain::model::SessionStrategy;

/// Engine error taxonomy. Failures that abort a workflow run surface as one
/// of these; recoverable conditions (unconfirmed upload, blocking overlay)
/// are absorbed inside the components that detect them.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no locator candidate matched for '{target}'")]
    LocatorNotFound { target: String },

    #[error("session establishment failed (attempted: {attempted:?})")]
    SessionEstablishmentFailed { attempted: Vec<SessionStrategy> },

    #[error("credentials are not configured")]
    MissingCredentials,

    #[error("verification challenge was not resolved within {0:?}")]
    ChallengeUnresolved(Duration),

    #[error("submission failed after {attempts} attempts")]
    SubmissionFailed { attempts: u32 },

    #[error("required step '{step}' failed: {reason}")]
    StepFailed { step: String, reason: String },

    #[error("media source error: {0}")]
    Media(String),

    #[error("evidence error: {0}")]
    Evidence(String),

    #[error("browser error: {0}")]
    Browser(#[from] anyhow::Error),
}
