use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, warn};

use super::context::LaunchError;

const DRIVER_BINARY: &str = "chromedriver";

/// Browser binaries probed for version inspection, most specific first.
const BROWSER_BINARIES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// Locates driver executables and inspects the installed browser.
///
/// Driver binaries are provisioned by the external installer service; this
/// trait only decides which of the provisioned binaries a launch should
/// use. It is the seam mocked out by the launch-policy tests.
#[async_trait]
pub trait DriverResolver: Send + Sync {
    /// Newest driver executable available locally.
    async fn resolve(&self) -> Result<PathBuf, LaunchError>;

    /// Driver executable matching the given browser major version. With no
    /// hint this behaves like [`DriverResolver::resolve`].
    async fn resolve_for_major(&self, major: Option<u32>) -> Result<PathBuf, LaunchError>;

    /// Installed browser's full version string, inspected from the OS.
    async fn browser_version(&self) -> Option<String>;
}

/// Default resolver: consults the installer service's cache directory
/// (version-suffixed binaries like `chromedriver-126`), then `PATH`.
pub struct ManagedDriverResolver {
    cache_dir: PathBuf,
}

impl Default for ManagedDriverResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ManagedDriverResolver {
    pub fn new() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("challenger")
            .join("drivers");
        Self { cache_dir }
    }

    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    fn cached_for_major(&self, major: u32) -> Option<PathBuf> {
        let candidate = self.cache_dir.join(format!("{DRIVER_BINARY}-{major}"));
        candidate.is_file().then_some(candidate)
    }

    /// An unsuffixed `chromedriver` wins; otherwise the highest
    /// version-suffixed entry in the cache.
    fn newest_cached(&self) -> Option<PathBuf> {
        let plain = self.cache_dir.join(DRIVER_BINARY);
        if plain.is_file() {
            return Some(plain);
        }

        let entries = std::fs::read_dir(&self.cache_dir).ok()?;
        let mut versioned: Vec<(u32, PathBuf)> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let major = name
                    .strip_prefix("chromedriver-")?
                    .parse::<u32>()
                    .ok()?;
                Some((major, entry.path()))
            })
            .collect();
        versioned.sort_by_key(|(major, _)| *major);
        versioned.pop().map(|(_, path)| path)
    }
}

#[async_trait]
impl DriverResolver for ManagedDriverResolver {
    async fn resolve(&self) -> Result<PathBuf, LaunchError> {
        if let Some(found) = self.newest_cached() {
            debug!(driver = %found.display(), "resolved cached driver");
            return Ok(found);
        }
        if let Some(found) = find_in_path(DRIVER_BINARY) {
            debug!(driver = %found.display(), "resolved driver from PATH");
            return Ok(found);
        }
        Err(LaunchError::DriverNotFound(format!(
            "chromedriver is neither cached under {} nor on PATH",
            self.cache_dir.display()
        )))
    }

    async fn resolve_for_major(&self, major: Option<u32>) -> Result<PathBuf, LaunchError> {
        if let Some(major) = major {
            if let Some(found) = self.cached_for_major(major) {
                debug!(major, driver = %found.display(), "resolved version-matched driver");
                return Ok(found);
            }
            warn!(major, "no cached driver for that major, using the newest");
        }
        self.resolve().await
    }

    async fn browser_version(&self) -> Option<String> {
        for &binary in BROWSER_BINARIES {
            let Ok(output) = Command::new(binary).arg("--version").output().await else {
                continue;
            };
            if !output.status.success() {
                continue;
            }
            let line = String::from_utf8_lossy(&output.stdout);
            if let Some(version) = parse_version(line.trim()) {
                debug!(binary, %version, "inspected installed browser");
                return Some(version);
            }
        }
        None
    }
}

/// Leading major component of a dotted version, when numeric.
pub fn major_component(version: &str) -> Option<u32> {
    version.split('.').next()?.parse().ok()
}

/// Pulls the dotted version out of a `<browser> --version` line, e.g.
/// `"Google Chrome 126.0.6478.61"`.
fn parse_version(line: &str) -> Option<String> {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    let re = VERSION_RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)+)").unwrap());
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
