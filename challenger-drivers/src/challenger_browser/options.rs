use serde::{Deserialize, Serialize};

/// Locale used for challenge labels when the caller does not pick one.
pub const DEFAULT_LANG: &str = "zh_CN";

/// Per-launch browser options.
///
/// Assembled once per construction call, owned by that call, and discarded
/// with it. `headless` follows the silence flag: unset means silent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchOptions {
    pub headless: bool,
    pub lang: String,
}

impl LaunchOptions {
    pub fn new(silence: Option<bool>, lang: Option<String>) -> Self {
        Self {
            headless: silence.unwrap_or(true),
            lang: lang.unwrap_or_else(|| DEFAULT_LANG.to_string()),
        }
    }

    /// Chrome startup flags for a challenge session.
    ///
    /// Verbose browser logging and the shared-memory transport are always
    /// off; GPU and software rasterization are only disabled when running
    /// silent.
    pub fn browser_arguments(&self) -> Vec<String> {
        let mut args = vec![
            "--log-level=3".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--lang={}", self.lang),
        ];
        if self.headless {
            args.push("--disable-gpu".to_string());
            args.push("--disable-software-rasterizer".to_string());
        }
        args
    }

    /// Environment applied to the spawned driver process only. The caller's
    /// own process environment is left untouched, so concurrent sessions
    /// with different languages cannot interfere with each other.
    pub fn scoped_env(&self) -> Vec<(String, String)> {
        vec![("LANGUAGE".to_string(), self.lang.clone())]
    }
}
