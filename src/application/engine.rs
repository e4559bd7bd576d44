//! Top-level publish workflow: session, composer steps, submission,
//! review evidence.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use ulid::Ulid;

use crate::application::evidence::EvidenceCollector;
use crate::application::resolver::LocatorResolver;
use crate::application::sequencer::StepSequencer;
use crate::application::session::SessionManager;
use crate::application::submission::{
    Confirmation, OverlayPattern, RetryPolicy, SubmissionController, SubmitOutcome,
};
use crate::domain::error::EngineError;
use crate::domain::model::{
    LocatorCandidate, Post, SessionState, StepAction, StepOutcome, WorkflowStep,
};
use crate::infrastructure::browser::BrowserDriver;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::media;

/// Locators for the dashboard's composer surface. Each target carries its
/// fallback candidates in resolution order.
#[derive(Debug, Clone)]
pub struct ComposerLocators {
    pub open_composer: Vec<LocatorCandidate>,
    pub composer_dialog: LocatorCandidate,
    pub upload_input: Vec<LocatorCandidate>,
    pub media_preview: LocatorCandidate,
    pub caption_box: Vec<LocatorCandidate>,
    pub customize_networks: Vec<LocatorCandidate>,
    pub network_caption: Vec<LocatorCandidate>,
    pub tag_input: Vec<LocatorCandidate>,
    pub channel_picker: Vec<LocatorCandidate>,
    pub channel_option: Vec<LocatorCandidate>,
    pub commit: Vec<LocatorCandidate>,
    /// Toast or banner confirming the post went out.
    pub confirmation_marker: Option<LocatorCandidate>,
    pub overlays: Vec<OverlayPattern>,
}

impl Default for ComposerLocators {
    fn default() -> Self {
        let t = Duration::from_secs(3);
        Self {
            open_composer: vec![
                LocatorCandidate::css("[data-testid='new-post-button']", t),
                LocatorCandidate::text("New Post", t),
                LocatorCandidate::xpath("//button[contains(., 'Create Post')]", t),
            ],
            composer_dialog: LocatorCandidate::css("[role='dialog'] [data-testid='composer']", t),
            upload_input: vec![LocatorCandidate::css("input[type='file']", t)],
            media_preview: LocatorCandidate::css("[data-testid='media-preview']", t),
            caption_box: vec![
                LocatorCandidate::css("[data-testid='composer'] [role='textbox']", t),
                LocatorCandidate::css("div[contenteditable='true']", t),
            ],
            customize_networks: vec![LocatorCandidate::text("Customize for each network", t)],
            network_caption: vec![LocatorCandidate::css(
                "[data-testid='network-tab'] [role='textbox']",
                t,
            )],
            tag_input: vec![LocatorCandidate::css("[data-testid='tag-input']", t)],
            channel_picker: vec![LocatorCandidate::css("[data-testid='channel-picker']", t)],
            channel_option: vec![LocatorCandidate::css(
                "[data-testid='channel-picker'] [role='option']",
                t,
            )],
            commit: vec![
                LocatorCandidate::text("Share Now", t),
                LocatorCandidate::text("Post Now", t),
                LocatorCandidate::css("[data-testid='share-button']", t),
            ],
            confirmation_marker: Some(LocatorCandidate::text(
                "has been shared",
                Duration::from_secs(1),
            )),
            overlays: vec![OverlayPattern {
                overlay: LocatorCandidate::css("[role='dialog'][data-overlay]", t),
                close_controls: vec![
                    LocatorCandidate::css("[aria-label='Close']", t),
                    LocatorCandidate::css("button.close", t),
                ],
            }],
        }
    }
}

/// What a finished run produced, for the caller and the operator.
#[derive(Debug)]
pub struct WorkflowReport {
    pub run_id: String,
    pub session: SessionState,
    pub steps: Vec<(String, StepOutcome)>,
    pub submission: SubmitOutcome,
    /// Composed snapshot grid, when any snapshot was captured.
    pub review_image: Option<Vec<u8>>,
}

/// Owns one browser and runs publish workflows against it, one at a time.
pub struct PublishEngine {
    driver: Arc<dyn BrowserDriver>,
    config: AppConfig,
    session: SessionManager,
    locators: ComposerLocators,
    resolver: LocatorResolver,
    run_lock: Mutex<()>,
}

/// Dashboard elements proving an authenticated session.
fn default_markers() -> Vec<LocatorCandidate> {
    let t = Duration::from_secs(3);
    vec![
        LocatorCandidate::css("[data-testid='account-menu']", t),
        LocatorCandidate::css("nav [aria-label='Profile']", t),
    ]
}

impl PublishEngine {
    pub fn new(driver: Arc<dyn BrowserDriver>, config: AppConfig) -> Self {
        let resolver = LocatorResolver::default();
        let session = SessionManager::new(config.clone(), default_markers())
            .with_resolver(resolver.clone());
        Self {
            driver,
            config,
            session,
            locators: ComposerLocators::default(),
            resolver,
            run_lock: Mutex::new(()),
        }
    }

    pub fn with_session(mut self, session: SessionManager) -> Self {
        self.session = session;
        self
    }

    pub fn with_locators(mut self, locators: ComposerLocators) -> Self {
        self.locators = locators;
        self
    }

    pub fn with_resolver(mut self, resolver: LocatorResolver) -> Self {
        self.resolver = resolver;
        self
    }

    fn build_submission(&self) -> SubmissionController {
        SubmissionController::new(
            self.resolver.clone(),
            RetryPolicy {
                max_attempts: 3,
                backoff: self.config.timeouts.submit_backoff,
            },
            self.locators.overlays.clone(),
            self.config.timeouts.confirm,
        )
    }

    /// Run the full workflow for one post. Concurrent calls serialize on
    /// the engine's run lock; the browser holds exactly one composer.
    pub async fn publish(&self, post: &Post) -> Result<WorkflowReport, EngineError> {
        let _guard = self.run_lock.lock().await;
        let run_id = Ulid::new().to_string();
        tracing::info!(run_id = %run_id, "Publish run started");

        let session = self.establish_with_retry().await?;
        let staged = media::stage(&post.media)?;
        let steps = self.composer_steps(staged.path(), post);

        let sequencer = StepSequencer::new(self.resolver.clone());
        let mut evidence = EvidenceCollector::new();
        let step_outcomes = sequencer.run(&self.driver, &steps, &mut evidence).await?;

        let confirmation = Confirmation {
            url_fragment: self.confirmation_fragment(),
            marker: self.locators.confirmation_marker.clone(),
        };
        let submission = self
            .build_submission()
            .submit(&self.driver, &self.locators.commit, &confirmation)
            .await?;
        evidence.capture(&self.driver, "after-submit").await;

        let review_image = evidence.compose()?;
        tracing::info!(run_id = %run_id, submission = ?submission, "Publish run finished");

        Ok(WorkflowReport {
            run_id,
            session,
            steps: step_outcomes,
            submission,
            review_image,
        })
    }

    /// Session establishment, with one browser restart when every strategy
    /// was exhausted. A stuck renderer is the usual culprit there.
    async fn establish_with_retry(&self) -> Result<SessionState, EngineError> {
        match self.session.establish(&self.driver).await {
            Ok(state) => Ok(state),
            Err(EngineError::SessionEstablishmentFailed { .. }) => {
                tracing::warn!("Session establishment exhausted, restarting browser");
                self.driver.stop().await?;
                self.driver.start().await?;
                self.session.establish(&self.driver).await
            }
            Err(e) => Err(e),
        }
    }

    fn composer_steps(&self, media_path: &Path, post: &Post) -> Vec<WorkflowStep> {
        let locators = &self.locators;
        let mut upload_confirm = locators.media_preview.clone();
        upload_confirm.timeout = self.config.timeouts.upload_confirm;

        let mut steps = vec![
            WorkflowStep::new(
                "open-composer",
                locators.open_composer.clone(),
                StepAction::Click,
            )
            .with_post_condition(locators.composer_dialog.clone()),
            WorkflowStep::new(
                "upload-media",
                locators.upload_input.clone(),
                StepAction::UploadFile(media_path.to_path_buf()),
            )
            .with_post_condition(upload_confirm),
            WorkflowStep::new(
                "caption",
                locators.caption_box.clone(),
                StepAction::TypeText(post.caption.clone()),
            ),
            WorkflowStep::new(
                "customize-networks",
                locators.customize_networks.clone(),
                StepAction::Click,
            )
            .optional(),
            WorkflowStep::new(
                "focus-network-caption",
                locators.network_caption.clone(),
                StepAction::Click,
            )
            .optional(),
        ];

        if !post.tags.is_empty() {
            steps.push(
                WorkflowStep::new(
                    "tags",
                    locators.tag_input.clone(),
                    StepAction::TypeText(post.tag_line()),
                )
                .optional(),
            );
        }

        steps.push(
            WorkflowStep::new(
                "open-channel-picker",
                locators.channel_picker.clone(),
                StepAction::Click,
            )
            .optional(),
        );
        steps.push(
            WorkflowStep::new(
                "pick-channel",
                locators.channel_option.clone(),
                StepAction::Click,
            )
            .optional(),
        );

        steps
    }

    /// URL substring proving the dashboard took the post: the path part of
    /// the configured root URL.
    fn confirmation_fragment(&self) -> String {
        let root = &self.config.dashboard.root_url;
        root.split_once("://")
            .and_then(|(_, rest)| rest.find('/').map(|i| rest[i..].to_string()))
            .unwrap_or_else(|| self.config.dashboard.auth_domain.clone())
    }
}
