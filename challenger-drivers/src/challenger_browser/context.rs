use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};
use webdriver::capabilities::Capabilities;

use super::options::LaunchOptions;
use super::resolver::{major_component, DriverResolver, ManagedDriverResolver};
use super::service::DriverService;

pub const DEFAULT_WEBDRIVER_PORT: u16 = 9515;

/// Failures surfaced while bringing a challenger session up.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The session handshake was rejected, or the driver process failed in
    /// a way that points at a driver/browser version mismatch. This is the
    /// only class the launch policy retries.
    #[error("driver communication failed: {0}")]
    DriverComm(String),
    /// No driver executable could be located for the requested launch.
    #[error("no usable driver executable: {0}")]
    DriverNotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Launch policy state.
///
/// The first attempt pins the executable the resolver handed out. The
/// single fallback drops the path and gives the resolver the detected
/// browser major instead, so it can self-select a compatible driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchStrategy {
    DirectPath(PathBuf),
    VersionHint(Option<u32>),
}

/// Seam between the launch policy and the machinery that actually starts
/// a driver service and opens a WebDriver session.
#[async_trait]
pub trait SessionLauncher {
    type Session;

    async fn launch(
        &self,
        strategy: &LaunchStrategy,
        options: &LaunchOptions,
    ) -> Result<Self::Session, LaunchError>;
}

/// A running challenger browser session: the WebDriver client plus the
/// service process it talks to.
pub struct ChallengerContext {
    pub client: Client,
    service: DriverService,
}

impl ChallengerContext {
    /// Navigate the session to `url`.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        Ok(())
    }

    /// Close the browser session and terminate the driver service.
    pub async fn close(self) -> Result<()> {
        self.client.close().await?;
        self.service.shutdown().await;
        Ok(())
    }
}

/// Real launcher: spawns the chromedriver service and connects a
/// `fantoccini` client to it.
pub struct ChromedriverLauncher {
    resolver: Arc<dyn DriverResolver>,
    port: u16,
}

impl ChromedriverLauncher {
    pub fn new(resolver: Arc<dyn DriverResolver>, port: u16) -> Self {
        Self { resolver, port }
    }

    fn capabilities(&self, options: &LaunchOptions) -> Capabilities {
        let mut args = options.browser_arguments();
        if options.headless {
            args.push("--headless".to_string());
        }

        let mut chrome_opts = HashMap::new();
        chrome_opts.insert("args".to_string(), json!(args));

        let mut caps = Capabilities::new();
        caps.insert("goog:chromeOptions".to_string(), json!(chrome_opts));
        caps
    }
}

#[async_trait]
impl SessionLauncher for ChromedriverLauncher {
    type Session = ChallengerContext;

    async fn launch(
        &self,
        strategy: &LaunchStrategy,
        options: &LaunchOptions,
    ) -> Result<ChallengerContext, LaunchError> {
        let executable = match strategy {
            LaunchStrategy::DirectPath(path) => path.clone(),
            LaunchStrategy::VersionHint(major) => self.resolver.resolve_for_major(*major).await?,
        };

        let service = DriverService::start(&executable, self.port, &options.scoped_env()).await?;

        // A rejected handshake here is the version-mismatch signature; the
        // service child is reaped on drop either way.
        let client = ClientBuilder::native()
            .capabilities(self.capabilities(options))
            .connect(&service.endpoint())
            .await
            .map_err(|e| LaunchError::DriverComm(e.to_string()))?;

        Ok(ChallengerContext { client, service })
    }
}

/// Builder for a challenger browser context.
///
/// `silence` defaults to true unless explicitly set to false; `lang`
/// defaults to [`super::options::DEFAULT_LANG`].
pub struct ChallengeContextBuilder {
    silence: Option<bool>,
    lang: Option<String>,
    port: u16,
    resolver: Arc<dyn DriverResolver>,
}

impl Default for ChallengeContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengeContextBuilder {
    pub fn new() -> Self {
        Self {
            silence: None,
            lang: None,
            port: DEFAULT_WEBDRIVER_PORT,
            resolver: Arc::new(ManagedDriverResolver::new()),
        }
    }

    /// Control headless operation. Unset means silent.
    pub fn silence(mut self, silence: bool) -> Self {
        self.silence = Some(silence);
        self
    }

    /// Restrict the language of challenge labels.
    pub fn lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn webdriver_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn resolver(mut self, resolver: Arc<dyn DriverResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Produce a running challenger session.
    ///
    /// Resolution and the browser-version inspection may touch disk and
    /// spawn processes; first runs are slower until the installer cache is
    /// warm.
    pub async fn build(self) -> Result<ChallengerContext> {
        let options = LaunchOptions::new(self.silence, self.lang);
        let launcher = ChromedriverLauncher::new(self.resolver.clone(), self.port);
        launch_with_fallback(&launcher, self.resolver.as_ref(), options)
            .await
            .context("challenger context could not be established")
    }
}

/// Two-state launch policy: direct path first, then exactly one retry
/// carrying the detected browser major as a version hint. Only the
/// driver-communication error class takes the fallback transition; every
/// other failure, and a failed second attempt, propagates to the caller.
pub(crate) async fn launch_with_fallback<L: SessionLauncher>(
    launcher: &L,
    resolver: &dyn DriverResolver,
    options: LaunchOptions,
) -> Result<L::Session, LaunchError> {
    let executable = resolver.resolve().await?;
    let browser_version = resolver.browser_version().await;

    debug!("🎮 activating challenger context");
    match launcher
        .launch(&LaunchStrategy::DirectPath(executable), &options)
        .await
    {
        Ok(session) => Ok(session),
        Err(LaunchError::DriverComm(reason)) => {
            let hint = browser_version.as_deref().and_then(major_component);
            warn!(%reason, hint = ?hint, "driver rejected the session, retrying with a version hint");
            launcher
                .launch(&LaunchStrategy::VersionHint(hint), &options)
                .await
        }
        Err(other) => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;
    use std::sync::Mutex;

    struct ScriptedLauncher {
        outcomes: Mutex<Vec<Result<(), LaunchError>>>,
        seen: Mutex<Vec<LaunchStrategy>>,
    }

    impl ScriptedLauncher {
        fn new(outcomes: Vec<Result<(), LaunchError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn seen(&self) -> Vec<LaunchStrategy> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SessionLauncher for ScriptedLauncher {
        type Session = ();

        async fn launch(
            &self,
            strategy: &LaunchStrategy,
            _options: &LaunchOptions,
        ) -> Result<(), LaunchError> {
            self.seen.lock().unwrap().push(strategy.clone());
            self.outcomes.lock().unwrap().remove(0)
        }
    }

    struct FixedResolver {
        version: Option<&'static str>,
    }

    #[async_trait]
    impl DriverResolver for FixedResolver {
        async fn resolve(&self) -> Result<PathBuf, LaunchError> {
            Ok(PathBuf::from("/tmp/chromedriver"))
        }

        async fn resolve_for_major(&self, _major: Option<u32>) -> Result<PathBuf, LaunchError> {
            Ok(PathBuf::from("/tmp/chromedriver"))
        }

        async fn browser_version(&self) -> Option<String> {
            self.version.map(str::to_string)
        }
    }

    fn comm_failure() -> LaunchError {
        LaunchError::DriverComm("session not created".to_string())
    }

    fn options() -> LaunchOptions {
        LaunchOptions::new(None, None)
    }

    #[tokio::test]
    async fn first_attempt_success_needs_no_fallback() {
        let launcher = ScriptedLauncher::new(vec![Ok(())]);
        let resolver = FixedResolver {
            version: Some("126.0.6478.61"),
        };

        launch_with_fallback(&launcher, &resolver, options())
            .await
            .unwrap();

        assert_eq!(
            launcher.seen(),
            vec![LaunchStrategy::DirectPath(PathBuf::from("/tmp/chromedriver"))]
        );
    }

    #[tokio::test]
    async fn comm_failure_retries_once_with_the_version_hint() {
        let launcher = ScriptedLauncher::new(vec![Err(comm_failure()), Ok(())]);
        let resolver = FixedResolver {
            version: Some("126.0.6478.61"),
        };

        launch_with_fallback(&launcher, &resolver, options())
            .await
            .unwrap();

        assert_eq!(
            launcher.seen(),
            vec![
                LaunchStrategy::DirectPath(PathBuf::from("/tmp/chromedriver")),
                LaunchStrategy::VersionHint(Some(126)),
            ]
        );
    }

    #[tokio::test]
    async fn second_comm_failure_propagates() {
        let launcher = ScriptedLauncher::new(vec![Err(comm_failure()), Err(comm_failure())]);
        let resolver = FixedResolver {
            version: Some("126.0.6478.61"),
        };

        let err = launch_with_fallback(&launcher, &resolver, options())
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::DriverComm(_)));
        assert_eq!(launcher.seen().len(), 2);
    }

    #[tokio::test]
    async fn non_comm_failures_skip_the_fallback() {
        let launcher = ScriptedLauncher::new(vec![Err(LaunchError::Io(std::io::Error::new(
            ErrorKind::NotFound,
            "driver vanished",
        )))]);
        let resolver = FixedResolver {
            version: Some("126.0.6478.61"),
        };

        let err = launch_with_fallback(&launcher, &resolver, options())
            .await
            .unwrap_err();

        assert!(matches!(err, LaunchError::Io(_)));
        assert_eq!(launcher.seen().len(), 1);
    }

    #[tokio::test]
    async fn non_numeric_browser_version_omits_the_hint() {
        let launcher = ScriptedLauncher::new(vec![Err(comm_failure()), Ok(())]);
        let resolver = FixedResolver {
            version: Some("dev-build"),
        };

        launch_with_fallback(&launcher, &resolver, options())
            .await
            .unwrap();

        assert_eq!(launcher.seen()[1], LaunchStrategy::VersionHint(None));
    }

    #[tokio::test]
    async fn undetectable_browser_version_omits_the_hint() {
        let launcher = ScriptedLauncher::new(vec![Err(comm_failure()), Ok(())]);
        let resolver = FixedResolver { version: None };

        launch_with_fallback(&launcher, &resolver, options())
            .await
            .unwrap();

        assert_eq!(launcher.seen()[1], LaunchStrategy::VersionHint(None));
    }
}
