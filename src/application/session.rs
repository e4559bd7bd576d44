//! Authenticated-session establishment: probe, cookie restore, then
//! credential login, in that order.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;

use crate::application::resolver::LocatorResolver;
use crate::domain::error::EngineError;
use crate::domain::model::{Cookie, LocatorCandidate, LocatorMode, SessionState, SessionStrategy};
use crate::infrastructure::browser::BrowserDriver;
use crate::infrastructure::config::{loader, paths, AppConfig};

/// Locators for the login page surface.
#[derive(Debug, Clone)]
pub struct LoginLocators {
    pub email: Vec<LocatorCandidate>,
    pub password: Vec<LocatorCandidate>,
    pub submit: Vec<LocatorCandidate>,
    /// Inline error shown on rejected credentials.
    pub error_banner: LocatorCandidate,
    /// Cookie-consent accept control, clicked opportunistically.
    pub consent: LocatorCandidate,
    /// Verification-challenge checkbox widget.
    pub challenge_widget: LocatorCandidate,
    /// Image puzzle presented when the checkbox alone is not enough.
    pub challenge_puzzle: LocatorCandidate,
}

impl Default for LoginLocators {
    fn default() -> Self {
        let t = Duration::from_secs(3);
        let quick = Duration::from_secs(1);
        Self {
            email: vec![
                LocatorCandidate::css("input[type='email']", t),
                LocatorCandidate::css("input[name='email']", t),
            ],
            password: vec![
                LocatorCandidate::css("input[type='password']", t),
                LocatorCandidate::css("input[name='password']", t),
            ],
            submit: vec![
                LocatorCandidate::css("button[type='submit']", t),
                LocatorCandidate::text("Log In", t),
            ],
            error_banner: LocatorCandidate::css("[data-testid='login-error']", quick),
            consent: LocatorCandidate::xpath(
                "//button[contains(normalize-space(text()), 'Accept')]",
                quick,
            ),
            challenge_widget: LocatorCandidate::css("iframe[title*='challenge']", quick),
            challenge_puzzle: LocatorCandidate::css("iframe[title*='puzzle']", quick),
        }
    }
}

/// Drives a browser into an authenticated dashboard session.
///
/// Strategies run strictly in order of cost: a probe of the live session
/// first, persisted-cookie restoration second, credential login last.
pub struct SessionManager {
    config: AppConfig,
    resolver: LocatorResolver,
    /// Markers whose presence on the dashboard proves authentication.
    markers: Vec<LocatorCandidate>,
    login: LoginLocators,
    jar_path: PathBuf,
}

impl SessionManager {
    pub fn new(config: AppConfig, markers: Vec<LocatorCandidate>) -> Self {
        Self {
            config,
            resolver: LocatorResolver::default(),
            markers,
            login: LoginLocators::default(),
            jar_path: paths::cookie_jar_path(),
        }
    }

    pub fn with_resolver(mut self, resolver: LocatorResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_login_locators(mut self, login: LoginLocators) -> Self {
        self.login = login;
        self
    }

    pub fn with_jar_path(mut self, path: PathBuf) -> Self {
        self.jar_path = path;
        self
    }

    /// Establish an authenticated session, trying the cheapest strategy
    /// first. Returns the state describing which strategy succeeded.
    pub async fn establish(
        &self,
        driver: &Arc<dyn BrowserDriver>,
    ) -> Result<SessionState, EngineError> {
        let mut attempted = Vec::new();

        attempted.push(SessionStrategy::Probe);
        if self.probe(driver).await? {
            tracing::info!("Existing session is valid");
            return Ok(SessionState::Valid);
        }

        attempted.push(SessionStrategy::CookieRestore);
        if self.restore_cookies(driver).await? {
            tracing::info!("Session restored from cookie jar");
            return Ok(SessionState::CookieRestored);
        }

        attempted.push(SessionStrategy::CredentialLogin);
        match self.login(driver).await {
            Ok(true) => {
                tracing::info!("Credential login succeeded");
                return Ok(SessionState::LoggedIn);
            }
            Ok(false) => {
                tracing::warn!("Credential login did not produce a session");
            }
            // Configuration and challenge failures carry their own meaning.
            Err(e @ EngineError::MissingCredentials)
            | Err(e @ EngineError::ChallengeUnresolved(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Credential login errored: {}", e);
            }
        }

        Err(EngineError::SessionEstablishmentFailed { attempted })
    }

    /// Navigate to the dashboard root and check both the landing URL and
    /// an authenticated marker.
    async fn probe(&self, driver: &Arc<dyn BrowserDriver>) -> Result<bool, EngineError> {
        driver.navigate(&self.config.dashboard.root_url).await?;
        sleep(self.config.timeouts.probe_settle).await;

        let url = driver.current_url().await?;
        if !url.contains(&self.config.dashboard.auth_domain) {
            tracing::debug!(url = %url, "Probe landed off the dashboard domain");
            return Ok(false);
        }

        let marker = self
            .resolver
            .resolve(driver, "auth marker", &self.markers, LocatorMode::Presence)
            .await;
        Ok(marker.is_ok())
    }

    /// Inject persisted cookies and re-probe. A missing or unreadable jar
    /// is a normal miss, not an error.
    async fn restore_cookies(&self, driver: &Arc<dyn BrowserDriver>) -> Result<bool, EngineError> {
        if !self.jar_path.exists() {
            tracing::debug!(path = ?self.jar_path, "No cookie jar on disk");
            return Ok(false);
        }

        let cookies: Vec<Cookie> = match loader::load_yaml(&self.jar_path) {
            Ok(cookies) => cookies,
            Err(e) => {
                tracing::warn!(path = ?self.jar_path, "Cookie jar unreadable: {}", e);
                return Ok(false);
            }
        };

        // Cookies are injected from the registrable root so root-scoped
        // domains apply across every subdomain.
        let root_domain = &self.config.dashboard.root_domain;
        driver.navigate(&format!("https://{root_domain}")).await?;
        let mut restored = 0usize;
        let mut skipped = 0usize;
        for cookie in &cookies {
            let normalized = cookie.normalized(root_domain);
            match driver.set_cookies(std::slice::from_ref(&normalized)).await {
                Ok(()) => restored += 1,
                Err(e) => {
                    skipped += 1;
                    tracing::debug!(cookie = %cookie.name, "Cookie rejected: {}", e);
                }
            }
        }
        tracing::info!(restored, skipped, "Cookie jar injected");

        if restored == 0 {
            return Ok(false);
        }
        self.probe(driver).await
    }

    /// Fresh credential login. `Ok(false)` is a soft rejection (bad
    /// credentials, marker missing); configuration and challenge failures
    /// are hard errors.
    async fn login(&self, driver: &Arc<dyn BrowserDriver>) -> Result<bool, EngineError> {
        let credentials = self
            .config
            .credentials
            .as_ref()
            .ok_or(EngineError::MissingCredentials)?;

        driver.navigate(&self.config.dashboard.login_url).await?;
        sleep(self.config.timeouts.probe_settle).await;

        // Consent banner, when present, sits over the form.
        if let Ok(Some(consent)) = driver.query(&self.login.consent).await {
            let _ = driver.click(consent).await;
        }

        self.handle_challenge(driver).await?;

        let email = self
            .resolver
            .resolve(driver, "email field", &self.login.email, LocatorMode::Presence)
            .await?;
        driver.type_text(email, &credentials.email).await?;

        let password = self
            .resolver
            .resolve(
                driver,
                "password field",
                &self.login.password,
                LocatorMode::Presence,
            )
            .await?;
        driver.type_text(password, &credentials.password).await?;

        let submit = self
            .resolver
            .resolve(
                driver,
                "login submit",
                &self.login.submit,
                LocatorMode::Clickable,
            )
            .await?;
        driver.click(submit).await?;

        if !self.await_login_transition(driver).await? {
            return Ok(false);
        }

        let established = self.probe(driver).await?;
        if established {
            self.persist_cookies(driver).await;
        }
        Ok(established)
    }

    /// Wait for the page to leave the login URL, or for an inline error.
    async fn await_login_transition(
        &self,
        driver: &Arc<dyn BrowserDriver>,
    ) -> Result<bool, EngineError> {
        let deadline = tokio::time::Instant::now() + self.config.timeouts.login_wait;
        loop {
            let url = driver.current_url().await?;
            if !url.starts_with(&self.config.dashboard.login_url) {
                return Ok(true);
            }
            if let Ok(Some(_)) = driver.query(&self.login.error_banner).await {
                tracing::warn!("Login rejected with an inline error");
                return Ok(false);
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!("No login transition before deadline");
                return Ok(false);
            }
            sleep(Duration::from_millis(200)).await;
        }
    }

    /// Tick the challenge checkbox if one is shown; if an image puzzle
    /// follows, hold the run open for a human to solve it.
    async fn handle_challenge(&self, driver: &Arc<dyn BrowserDriver>) -> Result<(), EngineError> {
        let widget = match driver.query(&self.login.challenge_widget).await {
            Ok(Some(widget)) => widget,
            _ => return Ok(()),
        };

        tracing::info!("Verification challenge detected");
        if let Err(e) = driver.click(widget).await {
            tracing::warn!("Challenge checkbox click failed: {}", e);
        }
        sleep(Duration::from_millis(500)).await;

        if !matches!(driver.query(&self.login.challenge_puzzle).await, Ok(Some(_))) {
            return Ok(());
        }

        let window = self.config.timeouts.challenge_window;
        tracing::warn!(window = ?window, "Image puzzle shown, waiting for manual resolution");
        let deadline = tokio::time::Instant::now() + window;
        loop {
            if !matches!(driver.query(&self.login.challenge_puzzle).await, Ok(Some(_))) {
                tracing::info!("Challenge resolved");
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(EngineError::ChallengeUnresolved(window));
            }
            sleep(Duration::from_secs(1)).await;
        }
    }

    /// Persist the live session's cookies. Best-effort; a write failure
    /// only costs the next run a login.
    async fn persist_cookies(&self, driver: &Arc<dyn BrowserDriver>) {
        let cookies = match driver.get_cookies().await {
            Ok(cookies) => cookies,
            Err(e) => {
                tracing::warn!("Could not read cookies for persistence: {}", e);
                return;
            }
        };
        if let Some(parent) = self.jar_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                tracing::warn!("Could not create cookie jar directory: {}", e);
                return;
            }
        }
        match loader::save_yaml(&self.jar_path, &cookies) {
            Ok(()) => tracing::info!(count = cookies.len(), path = ?self.jar_path, "Cookie jar saved"),
            Err(e) => tracing::warn!("Cookie jar write failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::browser::fake::FakeDriver;
    use crate::infrastructure::config::{Credentials, TimeoutSettings};

    const AUTH_URL: &str = "https://publish.example.com/all-channels";
    const LOGIN_URL: &str = "https://login.example.com/login";
    const MARKER: &str = "#account-menu";

    fn fast_timeouts() -> TimeoutSettings {
        TimeoutSettings {
            probe_settle: Duration::from_millis(5),
            marker: Duration::from_millis(40),
            locator: Duration::from_millis(40),
            upload_confirm: Duration::from_millis(100),
            challenge_window: Duration::from_millis(100),
            login_wait: Duration::from_millis(100),
            confirm: Duration::from_millis(100),
            submit_backoff: Duration::from_millis(5),
        }
    }

    fn test_config(with_credentials: bool) -> AppConfig {
        let mut config = AppConfig::default();
        config.timeouts = fast_timeouts();
        if with_credentials {
            config.credentials = Some(Credentials {
                email: "user@example.com".to_string(),
                password: "hunter2".to_string(),
            });
        }
        config
    }

    fn fast_login_locators() -> LoginLocators {
        let t = Duration::from_millis(40);
        LoginLocators {
            email: vec![LocatorCandidate::css("#email", t)],
            password: vec![LocatorCandidate::css("#password", t)],
            submit: vec![LocatorCandidate::css("#login-submit", t)],
            error_banner: LocatorCandidate::css("#login-error", t),
            consent: LocatorCandidate::css("#consent", t),
            challenge_widget: LocatorCandidate::css("#challenge", t),
            challenge_puzzle: LocatorCandidate::css("#puzzle", t),
        }
    }

    fn manager(config: AppConfig, jar: PathBuf) -> SessionManager {
        SessionManager::new(
            config,
            vec![LocatorCandidate::css(MARKER, Duration::from_millis(40))],
        )
        .with_resolver(LocatorResolver::new(Duration::from_millis(10)))
        .with_login_locators(fast_login_locators())
        .with_jar_path(jar)
    }

    fn jar_with_cookies(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("cookies.yaml");
        let cookies = vec![Cookie {
            name: "session".to_string(),
            value: "abc".to_string(),
            domain: ".example.com".to_string(),
            path: "/".to_string(),
            secure: true,
            expiry: None,
        }];
        loader::save_yaml(&path, &cookies).unwrap();
        path
    }

    #[tokio::test]
    async fn valid_probe_short_circuits_everything() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeDriver::new());
        fake.set_url(AUTH_URL);
        fake.add_present(MARKER);
        let driver: Arc<dyn BrowserDriver> = fake.clone();

        let state = manager(test_config(true), jar_with_cookies(&dir))
            .establish(&driver)
            .await
            .unwrap();

        assert_eq!(state, SessionState::Valid);
        assert!(fake.calls_matching("set_cookies").is_empty());
        assert!(fake.calls_matching("type:").is_empty());
    }

    #[tokio::test]
    async fn cookie_restore_never_reaches_login() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeDriver::new());
        // On the right domain, but the marker only appears once cookies land.
        fake.set_url(AUTH_URL);
        fake.grant_login_after_cookies(MARKER);
        let driver: Arc<dyn BrowserDriver> = fake.clone();

        let state = manager(test_config(true), jar_with_cookies(&dir))
            .establish(&driver)
            .await
            .unwrap();

        assert_eq!(state, SessionState::CookieRestored);
        assert_eq!(fake.calls_matching("set_cookies").len(), 1);
        assert!(fake.calls_matching("type:").is_empty());
    }

    #[tokio::test]
    async fn cookies_are_injected_from_the_root_domain() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeDriver::new());
        fake.set_url(AUTH_URL);
        fake.grant_login_after_cookies(MARKER);
        let driver: Arc<dyn BrowserDriver> = fake.clone();

        manager(test_config(true), jar_with_cookies(&dir))
            .establish(&driver)
            .await
            .unwrap();

        let calls = fake.calls();
        let root_nav = calls
            .iter()
            .position(|c| c == "navigate:https://example.com")
            .expect("navigated to the registrable root before injecting");
        let inject = calls
            .iter()
            .position(|c| c.starts_with("set_cookies"))
            .unwrap();
        assert!(root_nav < inject);
    }

    #[tokio::test]
    async fn challenge_checkbox_without_puzzle_is_the_fast_path() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeDriver::new());
        fake.set_url(LOGIN_URL);
        fake.add_present(MARKER);
        fake.add_present("#challenge");
        fake.add_present("#email");
        fake.add_present("#password");
        fake.add_present("#login-submit");
        fake.set_url_on_click("#login-submit", AUTH_URL);
        let driver: Arc<dyn BrowserDriver> = fake.clone();

        let state = manager(test_config(true), dir.path().join("missing.yaml"))
            .establish(&driver)
            .await
            .unwrap();

        assert_eq!(state, SessionState::LoggedIn);
        // The checkbox was ticked before the form was filled.
        let calls = fake.calls();
        let checkbox = calls.iter().position(|c| c == "direct:#challenge").unwrap();
        let typed = calls.iter().position(|c| c.starts_with("type:")).unwrap();
        assert!(checkbox < typed);
    }

    #[tokio::test]
    async fn unresolved_puzzle_aborts_with_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeDriver::new());
        fake.set_url(LOGIN_URL);
        fake.add_present("#challenge");
        fake.add_present("#puzzle");
        let driver: Arc<dyn BrowserDriver> = fake.clone();

        let config = test_config(true);
        let window = config.timeouts.challenge_window;
        let err = manager(config, dir.path().join("missing.yaml"))
            .establish(&driver)
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::ChallengeUnresolved(w) if w == window));
        // The run never got as far as the credential form.
        assert!(fake.calls_matching("type:").is_empty());
    }

    #[tokio::test]
    async fn stale_cookies_fall_through_to_login() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeDriver::new());
        // Stuck on the login domain until the submit click lands.
        fake.set_url(LOGIN_URL);
        fake.add_present(MARKER);
        fake.add_present("#email");
        fake.add_present("#password");
        fake.add_present("#login-submit");
        fake.set_url_on_click("#login-submit", AUTH_URL);
        let driver: Arc<dyn BrowserDriver> = fake.clone();

        let jar = jar_with_cookies(&dir);
        let state = manager(test_config(true), jar.clone())
            .establish(&driver)
            .await
            .unwrap();

        assert_eq!(state, SessionState::LoggedIn);
        // Restore was tried before login.
        let calls = fake.calls();
        let restore_pos = calls.iter().position(|c| c.starts_with("set_cookies")).unwrap();
        let login_pos = calls.iter().position(|c| c.starts_with("type:")).unwrap();
        assert!(restore_pos < login_pos);
        // A fresh jar was written after the successful login.
        assert!(jar.exists());
    }

    #[tokio::test]
    async fn missing_credentials_is_a_hard_error() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeDriver::new());
        fake.set_url(LOGIN_URL);
        let driver: Arc<dyn BrowserDriver> = fake.clone();

        let err = manager(test_config(false), dir.path().join("missing.yaml"))
            .establish(&driver)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::MissingCredentials));
    }

    #[tokio::test]
    async fn all_strategies_exhausted_reports_the_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeDriver::new());
        fake.set_url(LOGIN_URL);
        // Login form present, but the submit never leaves the login page.
        fake.add_present("#email");
        fake.add_present("#password");
        fake.add_present("#login-submit");
        let driver: Arc<dyn BrowserDriver> = fake.clone();

        let err = manager(test_config(true), dir.path().join("missing.yaml"))
            .establish(&driver)
            .await
            .unwrap_err();

        match err {
            EngineError::SessionEstablishmentFailed { attempted } => {
                assert_eq!(
                    attempted,
                    vec![
                        SessionStrategy::Probe,
                        SessionStrategy::CookieRestore,
                        SessionStrategy::CredentialLogin,
                    ]
                );
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
