use serde::{Deserialize, Serialize};

/// Session states over the lifecycle of establishing an authenticated
/// browsing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Unchecked,
    /// An existing session passed the dashboard probe.
    Valid,
    /// Persisted cookies were injected and the probe passed afterwards.
    CookieRestored,
    /// A fresh credential login succeeded.
    LoggedIn,
    Failed,
}

impl SessionState {
    /// States in which the workflow may run against the session.
    pub fn is_established(&self) -> bool {
        matches!(self, Self::Valid | Self::CookieRestored | Self::LoggedIn)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::Unchecked
    }
}

/// Establishment strategies, in the order they are tried. Recorded on
/// failure so the caller can see which paths were exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStrategy {
    Probe,
    CookieRestore,
    CredentialLogin,
}
