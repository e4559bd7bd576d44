use std::path::PathBuf;

use super::locator::LocatorCandidate;

/// The single interaction a step performs on its resolved target.
#[derive(Debug, Clone)]
pub enum StepAction {
    Click,
    TypeText(String),
    UploadFile(PathBuf),
}

/// One discrete scripted interaction with the remote UI.
///
/// Steps execute strictly in declared order. A `required` step's failure
/// aborts the run; a non-required step's failure degrades to a warning.
#[derive(Debug, Clone)]
pub struct WorkflowStep {
    pub name: String,
    pub candidates: Vec<LocatorCandidate>,
    pub action: StepAction,
    /// Resolved with a short timeout after the action to confirm its effect.
    pub post_condition: Option<LocatorCandidate>,
    pub required: bool,
}

impl WorkflowStep {
    pub fn new(
        name: impl Into<String>,
        candidates: Vec<LocatorCandidate>,
        action: StepAction,
    ) -> Self {
        Self {
            name: name.into(),
            candidates,
            action,
            post_condition: None,
            required: true,
        }
    }

    pub fn with_post_condition(mut self, candidate: LocatorCandidate) -> Self {
        self.post_condition = Some(candidate);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Tri-state outcome of a step.
///
/// `Indeterminate` means the action was performed but the post-condition
/// could not be confirmed within its timeout. It is treated as
/// success-with-warning, never as fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    Indeterminate,
    Failure(String),
}

impl StepOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}
