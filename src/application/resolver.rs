//! Ordered resolution of element locator candidates.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::domain::error::EngineError;
use crate::domain::model::{LocatorCandidate, LocatorMode};
use crate::infrastructure::browser::{BrowserDriver, ElementRef};

/// Resolves a page element from an ordered list of locator candidates.
///
/// Candidates are tried strictly in order; each gets its full timeout
/// before the next is attempted. The first match wins even if a later
/// candidate would also have matched.
#[derive(Clone)]
pub struct LocatorResolver {
    poll_interval: Duration,
}

impl Default for LocatorResolver {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(200),
        }
    }
}

impl LocatorResolver {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// Resolve `label` against the candidate list, in order.
    ///
    /// Driver query errors count as a non-match for that poll; the
    /// candidate keeps polling until its deadline. Exhausting every
    /// candidate yields `LocatorNotFound`.
    pub async fn resolve(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        label: &str,
        candidates: &[LocatorCandidate],
        mode: LocatorMode,
    ) -> Result<ElementRef, EngineError> {
        for (idx, candidate) in candidates.iter().enumerate() {
            let deadline = tokio::time::Instant::now() + candidate.timeout;
            loop {
                match self.try_candidate(driver, candidate, mode).await {
                    Some(element) => {
                        tracing::debug!(
                            target_label = label,
                            candidate = idx,
                            expression = %candidate.expression,
                            "Locator resolved"
                        );
                        return Ok(element);
                    }
                    None => {
                        if tokio::time::Instant::now() >= deadline {
                            break;
                        }
                        sleep(self.poll_interval).await;
                    }
                }
            }
            tracing::debug!(
                target_label = label,
                candidate = idx,
                expression = %candidate.expression,
                "Candidate timed out"
            );
        }

        Err(EngineError::LocatorNotFound {
            target: label.to_string(),
        })
    }

    async fn try_candidate(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        candidate: &LocatorCandidate,
        mode: LocatorMode,
    ) -> Option<ElementRef> {
        let element = match driver.query(candidate).await {
            Ok(found) => found?,
            Err(e) => {
                tracing::trace!(expression = %candidate.expression, "Query error: {}", e);
                return None;
            }
        };

        match mode {
            LocatorMode::Presence => Some(element),
            LocatorMode::Clickable => match driver.is_interactable(element).await {
                Ok(true) => Some(element),
                Ok(false) => None,
                Err(e) => {
                    tracing::trace!(expression = %candidate.expression, "Interactability check error: {}", e);
                    None
                }
            },
        }
    }
}
