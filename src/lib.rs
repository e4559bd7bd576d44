//! Headless-browser publishing engine for a social-media dashboard.
//!
//! The engine drives a real browser through the dashboard's composer:
//! it establishes an authenticated session (probe, cookie restore, then
//! credential login), runs the composer steps in order, pushes the final
//! submission through layered click fallbacks, and hands back a composed
//! snapshot grid for operator review.

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::engine::{ComposerLocators, PublishEngine, WorkflowReport};
pub use application::session::SessionManager;
pub use application::submission::SubmitOutcome;
pub use domain::error::EngineError;
pub use domain::model::{MediaSource, Post, SessionState, StepOutcome};
pub use infrastructure::browser::{BrowserDriver, ChromiumDriver};
