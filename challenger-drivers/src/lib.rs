//! Driver layer for challenger browser sessions.
//!
//! This crate brings up the configured headless-browser context used to
//! face human-machine challenges.
//!
//! - [`challenger_browser::context::ChallengeContextBuilder`]: session construction
//!   with the one-shot version-hint fallback
//! - [`challenger_browser::options::LaunchOptions`]: per-launch Chrome flags and
//!   the scoped language environment
//! - [`challenger_browser::resolver`]: driver executable lookup and browser
//!   version inspection
//! - [`challenger_browser::service::DriverService`]: the spawned WebDriver process

pub mod challenger_browser;
