//! Loader for the user configuration file with first-run bootstrap.
//!
//! The workspace ships a read-only `config-sample.yaml`; the user's own
//! `config.yaml` is created from it on first run. Loading merges the YAML
//! file with `CHALLENGER_`-prefixed environment variables and expands
//! `${VAR}` placeholders before handing the result back as an open-ended
//! mapping. Schema validation belongs to the consumers, not to this crate.
//!
//! Bootstrap does not terminate the process: the caller receives an
//! explicit [`ConfigOutcome::Bootstrapped`] and decides what to do with it.

use config::{Config, Environment, File};
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Open-ended string-keyed configuration mapping.
pub type ConfigMap = serde_json::Map<String, Value>;

/// Result of a [`ChallengerConfigLoader::load`] call.
#[derive(Debug)]
pub enum ConfigOutcome {
    /// The user configuration existed and was parsed.
    Loaded(ConfigMap),
    /// The user configuration was missing; a fresh copy of the sample was
    /// written to `output`. The process should be restarted after the user
    /// has edited it.
    Bootstrapped { output: PathBuf },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The built-in sample template is gone. It ships with the project and
    /// must stay in the project root.
    #[error(
        "built-in sample configuration is missing: {0}; \
         restore config-sample.yaml from the project repository"
    )]
    MissingSample(PathBuf),
    #[error("configuration i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration could not be parsed: {0}")]
    Parse(#[from] config::ConfigError),
    #[error("configuration root must be a mapping")]
    NotAMapping,
}

// Recursive so values that expand to further `${VAR}` references settle,
// with a depth cap to terminate on cycles.
fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML file + env overrides)
/// and the sample-file bootstrap.
pub struct ChallengerConfigLoader {
    output: PathBuf,
    sample: PathBuf,
}

impl Default for ChallengerConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ChallengerConfigLoader {
    /// Start with the conventional project-root paths: `config.yaml` for
    /// the user file, `config-sample.yaml` for the built-in template.
    pub fn new() -> Self {
        Self {
            output: PathBuf::from("config.yaml"),
            sample: PathBuf::from("config-sample.yaml"),
        }
    }

    /// Path the user configuration is read from (and bootstrapped to).
    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = path.as_ref().to_path_buf();
        self
    }

    /// Path of the built-in sample template.
    pub fn with_sample(mut self, path: impl AsRef<Path>) -> Self {
        self.sample = path.as_ref().to_path_buf();
        self
    }

    /// Check the template, bootstrap the user file if needed, and parse.
    ///
    /// The template is checked first: without it the project checkout is
    /// broken regardless of whether a user file exists. A missing user
    /// file is copied byte-for-byte from the template and reported as
    /// [`ConfigOutcome::Bootstrapped`] without being parsed.
    ///
    /// ```
    /// use challenger_config::{ChallengerConfigLoader, ConfigOutcome};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let sample = dir.path().join("config-sample.yaml");
    /// let output = dir.path().join("config.yaml");
    /// std::fs::write(&sample, "solver: hcaptcha\n").unwrap();
    ///
    /// let outcome = ChallengerConfigLoader::new()
    ///     .with_output(&output)
    ///     .with_sample(&sample)
    ///     .load()
    ///     .unwrap();
    ///
    /// assert!(matches!(outcome, ConfigOutcome::Bootstrapped { .. }));
    /// assert!(output.exists());
    /// ```
    pub fn load(self) -> Result<ConfigOutcome, ConfigError> {
        if !self.sample.exists() {
            return Err(ConfigError::MissingSample(self.sample));
        }

        if !self.output.exists() {
            std::fs::copy(&self.sample, &self.output)?;
            return Ok(ConfigOutcome::Bootstrapped {
                output: self.output,
            });
        }

        let cfg = Config::builder()
            .add_source(File::from(self.output.as_path()))
            .add_source(Environment::with_prefix("CHALLENGER").separator("__"))
            .build()?;

        // Convert to serde_json::Value first, then expand `${VAR}`
        // references recursively before handing the mapping out.
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        match v {
            Value::Object(map) => Ok(ConfigOutcome::Loaded(map)),
            _ => Err(ConfigError::NotAMapping),
        }
    }
}
