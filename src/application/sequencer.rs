//! Strictly ordered execution of workflow steps.

use std::sync::Arc;

use crate::application::evidence::EvidenceCollector;
use crate::application::resolver::LocatorResolver;
use crate::domain::error::EngineError;
use crate::domain::model::{LocatorMode, StepAction, StepOutcome, WorkflowStep};
use crate::infrastructure::browser::BrowserDriver;

/// Runs workflow steps in declared order, capturing a snapshot after each
/// completed step.
pub struct StepSequencer {
    resolver: LocatorResolver,
}

impl StepSequencer {
    pub fn new(resolver: LocatorResolver) -> Self {
        Self { resolver }
    }

    /// Execute every step in order.
    ///
    /// A required step's failure captures a diagnostic snapshot and aborts
    /// the run; a non-required step's failure logs a warning and execution
    /// continues with the next step.
    pub async fn run(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        steps: &[WorkflowStep],
        evidence: &mut EvidenceCollector,
    ) -> Result<Vec<(String, StepOutcome)>, EngineError> {
        let mut outcomes = Vec::with_capacity(steps.len());

        for step in steps {
            let outcome = self.execute_step(driver, step).await;
            tracing::info!(step = %step.name, outcome = ?outcome, "Step finished");

            match &outcome {
                StepOutcome::Failure(reason) => {
                    if step.required {
                        evidence.capture(driver, &step.name).await;
                        return Err(EngineError::StepFailed {
                            step: step.name.clone(),
                            reason: reason.clone(),
                        });
                    }
                    tracing::warn!(step = %step.name, "Optional step failed: {}", reason);
                }
                StepOutcome::Indeterminate => {
                    tracing::warn!(step = %step.name, "Post-condition not confirmed");
                    evidence.capture(driver, &step.name).await;
                }
                StepOutcome::Success => {
                    evidence.capture(driver, &step.name).await;
                }
            }

            outcomes.push((step.name.clone(), outcome));
        }

        Ok(outcomes)
    }

    async fn execute_step(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        step: &WorkflowStep,
    ) -> StepOutcome {
        let mode = match step.action {
            StepAction::Click => LocatorMode::Clickable,
            _ => LocatorMode::Presence,
        };

        let element = match self
            .resolver
            .resolve(driver, &step.name, &step.candidates, mode)
            .await
        {
            Ok(element) => element,
            Err(e) => return StepOutcome::Failure(e.to_string()),
        };

        let acted = match &step.action {
            StepAction::Click => driver.click(element).await,
            StepAction::TypeText(text) => driver.type_text(element, text).await,
            StepAction::UploadFile(path) => driver.upload_file(element, path).await,
        };
        if let Err(e) = acted {
            return StepOutcome::Failure(format!("action failed: {e}"));
        }

        match &step.post_condition {
            None => StepOutcome::Success,
            Some(condition) => {
                let confirmed = self
                    .resolver
                    .resolve(
                        driver,
                        &step.name,
                        std::slice::from_ref(condition),
                        LocatorMode::Presence,
                    )
                    .await;
                match confirmed {
                    Ok(_) => StepOutcome::Success,
                    Err(_) => StepOutcome::Indeterminate,
                }
            }
        }
    }
}
