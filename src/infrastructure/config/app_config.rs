use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::paths;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub dashboard: DashboardConfig,
    pub browser: BrowserSettings,
    /// Required only when a fresh credential login is needed.
    pub credentials: Option<Credentials>,
    pub media: MediaSettings,
    pub timeouts: TimeoutSettings,
}

/// Target dashboard endpoints and domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Authenticated landing page; also the post-submission return URL.
    pub root_url: String,
    pub login_url: String,
    /// Domain the post-navigation URL must be on for the session to count
    /// as authenticated.
    pub auth_domain: String,
    /// Registrable root domain used to canonicalize cookie domains.
    pub root_domain: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            root_url: "https://publish.example.com/all-channels".to_string(),
            login_url: "https://login.example.com/login".to_string(),
            auth_domain: "publish.example.com".to_string(),
            root_domain: "example.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Leave empty to use the platform default profile path.
    pub user_data_dir: String,
}

impl BrowserSettings {
    pub fn effective_profile_dir(&self) -> PathBuf {
        if self.user_data_dir.is_empty() {
            paths::profile_dir()
        } else {
            PathBuf::from(&self.user_data_dir)
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            user_data_dir: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Directory scanned for the first recognized media file when a run is
    /// triggered without an inline payload.
    pub dir: PathBuf,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("media"),
        }
    }
}

/// Waiting budgets for the cooperative blocking operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSettings {
    /// Page settle time after navigating to the dashboard root.
    #[serde(with = "humantime_serde")]
    pub probe_settle: Duration,
    /// Per-candidate budget for authenticated-marker locators.
    #[serde(with = "humantime_serde")]
    pub marker: Duration,
    /// Default per-candidate budget for step locators.
    #[serde(with = "humantime_serde")]
    pub locator: Duration,
    /// Budget for confirming a media upload finished.
    #[serde(with = "humantime_serde")]
    pub upload_confirm: Duration,
    /// Window for a human operator to resolve an image challenge.
    #[serde(with = "humantime_serde")]
    pub challenge_window: Duration,
    /// Wait for the post-login URL transition or inline error.
    #[serde(with = "humantime_serde")]
    pub login_wait: Duration,
    /// Wait for the post-submission confirmation signal.
    #[serde(with = "humantime_serde")]
    pub confirm: Duration,
    /// Pause between submission attempts.
    #[serde(with = "humantime_serde")]
    pub submit_backoff: Duration,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            probe_settle: Duration::from_secs(2),
            marker: Duration::from_secs(3),
            locator: Duration::from_secs(3),
            upload_confirm: Duration::from_secs(60),
            challenge_window: Duration::from_secs(120),
            login_wait: Duration::from_secs(10),
            confirm: Duration::from_secs(10),
            submit_backoff: Duration::from_secs(2),
        }
    }
}
