use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a candidate expression is evaluated against the live page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorStrategy {
    /// CSS selector, including attribute matches like `input[type='file']`.
    Css,
    /// XPath expression.
    XPath,
    /// Visible-text match; the driver translates this into a text query.
    Text,
}

/// What "found" means for a resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocatorMode {
    /// Element exists in the DOM.
    Presence,
    /// Element exists, is visible, and is enabled.
    Clickable,
}

/// One strategy+expression pair for finding a UI element, with its own
/// polling budget. Candidates are declared per step and evaluated strictly
/// in declared order; the first resolvable candidate wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorCandidate {
    pub strategy: LocatorStrategy,
    pub expression: String,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl LocatorCandidate {
    pub fn css(expression: impl Into<String>, timeout: Duration) -> Self {
        Self {
            strategy: LocatorStrategy::Css,
            expression: expression.into(),
            timeout,
        }
    }

    pub fn xpath(expression: impl Into<String>, timeout: Duration) -> Self {
        Self {
            strategy: LocatorStrategy::XPath,
            expression: expression.into(),
            timeout,
        }
    }

    pub fn text(expression: impl Into<String>, timeout: Duration) -> Self {
        Self {
            strategy: LocatorStrategy::Text,
            expression: expression.into(),
            timeout,
        }
    }
}
