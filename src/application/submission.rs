//! Final-submission click with layered fallback strategies, overlay
//! dismissal, and bounded retry.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::application::resolver::LocatorResolver;
use crate::domain::error::EngineError;
use crate::domain::model::{LocatorCandidate, LocatorMode};
use crate::infrastructure::browser::{BrowserDriver, ElementRef};

/// Retry budget for the submission loop.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Click methods tried in order on each attempt. The first one that does
/// not raise ends the strategy pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickStrategy {
    Direct,
    Scripted,
    Pointer,
    ScrollThenClick,
}

pub const CLICK_STRATEGIES: [ClickStrategy; 4] = [
    ClickStrategy::Direct,
    ClickStrategy::Scripted,
    ClickStrategy::Pointer,
    ClickStrategy::ScrollThenClick,
];

/// A known blocking-overlay shape and the controls that close it.
#[derive(Debug, Clone)]
pub struct OverlayPattern {
    pub overlay: LocatorCandidate,
    /// Close controls searched inside the overlay, in order.
    pub close_controls: Vec<LocatorCandidate>,
}

/// How submission success is recognized.
#[derive(Debug, Clone)]
pub struct Confirmation {
    /// URL substring indicating the dashboard return navigation.
    pub url_fragment: String,
    /// Optional visible confirmation marker, checked alongside the URL.
    pub marker: Option<LocatorCandidate>,
}

/// Terminal state of a submission pass. `Unconfirmed` means a click
/// strategy went through but no confirmation signal arrived in time; the
/// run still completes and the review image tells the operator the truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Confirmed,
    Unconfirmed,
}

pub struct SubmissionController {
    resolver: LocatorResolver,
    policy: RetryPolicy,
    overlays: Vec<OverlayPattern>,
    confirm_timeout: Duration,
    poll_interval: Duration,
}

impl SubmissionController {
    pub fn new(
        resolver: LocatorResolver,
        policy: RetryPolicy,
        overlays: Vec<OverlayPattern>,
        confirm_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            policy,
            overlays,
            confirm_timeout,
            poll_interval: Duration::from_millis(200),
        }
    }

    /// Drive the commit control until one attempt lands a click, then wait
    /// for the confirmation signal. Every attempt after the first starts
    /// by dismissing known overlays.
    pub async fn submit(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        commit: &[LocatorCandidate],
        confirmation: &Confirmation,
    ) -> Result<SubmitOutcome, EngineError> {
        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                self.dismiss_overlays(driver).await;
                sleep(self.policy.backoff).await;
            }

            let element = match self
                .resolver
                .resolve(driver, "commit control", commit, LocatorMode::Clickable)
                .await
            {
                Ok(element) => element,
                Err(e) => {
                    tracing::warn!(attempt, "Commit control not resolvable: {}", e);
                    continue;
                }
            };

            match self.try_click(driver, element).await {
                Some(strategy) => {
                    tracing::info!(attempt, strategy = ?strategy, "Commit click landed");
                    return Ok(self.await_confirmation(driver, confirmation).await);
                }
                None => {
                    tracing::warn!(attempt, "All click strategies raised");
                }
            }
        }

        Err(EngineError::SubmissionFailed {
            attempts: self.policy.max_attempts,
        })
    }

    /// Run the strategy ladder; returns the strategy that landed, if any.
    async fn try_click(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        element: ElementRef,
    ) -> Option<ClickStrategy> {
        for strategy in CLICK_STRATEGIES {
            let result = match strategy {
                ClickStrategy::Direct => driver.click(element).await,
                ClickStrategy::Scripted => driver.click_scripted(element).await,
                ClickStrategy::Pointer => driver.click_pointer(element).await,
                ClickStrategy::ScrollThenClick => {
                    match driver.scroll_into_view(element).await {
                        Ok(()) => driver.click(element).await,
                        Err(e) => Err(e),
                    }
                }
            };
            match result {
                Ok(()) => return Some(strategy),
                Err(e) => {
                    tracing::debug!(strategy = ?strategy, "Click strategy raised: {}", e);
                }
            }
        }
        None
    }

    /// Close anything matching a known overlay pattern. A close control
    /// inside the overlay is preferred; with none found, a click just
    /// outside the overlay's top-left corner usually collapses it.
    async fn dismiss_overlays(&self, driver: &Arc<dyn BrowserDriver>) {
        for pattern in &self.overlays {
            let overlay = match driver.query(&pattern.overlay).await {
                Ok(Some(el)) => el,
                Ok(None) => continue,
                Err(e) => {
                    tracing::debug!(overlay = %pattern.overlay.expression, "Overlay query error: {}", e);
                    continue;
                }
            };

            // A hidden overlay blocks nothing; touching it would land
            // clicks on whatever sits underneath.
            if !matches!(driver.is_interactable(overlay).await, Ok(true)) {
                tracing::debug!(overlay = %pattern.overlay.expression, "Overlay present but not visible");
                continue;
            }

            tracing::info!(overlay = %pattern.overlay.expression, "Dismissing overlay");
            let mut closed = false;
            for control in &pattern.close_controls {
                if let Ok(Some(close)) = driver.query_within(overlay, control).await {
                    if driver.click(close).await.is_ok() {
                        closed = true;
                        break;
                    }
                }
            }

            if !closed {
                if let Ok(Some(bounds)) = driver.bounds(overlay).await {
                    let _ = driver.click_at(bounds.x - 10.0, bounds.y - 10.0).await;
                }
            }
        }
    }

    async fn await_confirmation(
        &self,
        driver: &Arc<dyn BrowserDriver>,
        confirmation: &Confirmation,
    ) -> SubmitOutcome {
        let deadline = tokio::time::Instant::now() + self.confirm_timeout;
        loop {
            if let Ok(url) = driver.current_url().await {
                if url.contains(&confirmation.url_fragment) {
                    return SubmitOutcome::Confirmed;
                }
            }
            if let Some(marker) = &confirmation.marker {
                if let Ok(Some(_)) = driver.query(marker).await {
                    return SubmitOutcome::Confirmed;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!("No confirmation signal before deadline");
                return SubmitOutcome::Unconfirmed;
            }
            sleep(self.poll_interval).await;
        }
    }
}
