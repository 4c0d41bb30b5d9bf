//! Runtime status line formatting.
//!
//! Operational events are reported as a single line of the form
//! `>> MOTIVE [action] message - key=value key=value`, suitable for both
//! console output and log sinks.

use std::fmt;

/// Builder for a single `>> MOTIVE [action]` status line.
///
/// The motive defaults to `RUN`; message and fields are optional and only
/// rendered when present. Field order is preserved.
///
/// ```
/// use challenger_common::report::RuntimeReport;
///
/// let line = RuntimeReport::new("ChallengeTask")
///     .motive("STOP")
///     .message("session closed")
///     .field("elapsed", 12)
///     .to_string();
///
/// assert_eq!(line, ">> STOP [ChallengeTask] session closed - elapsed=12");
/// ```
#[derive(Debug, Clone)]
pub struct RuntimeReport {
    action: String,
    motive: String,
    message: String,
    fields: Vec<(String, String)>,
}

impl RuntimeReport {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            motive: "RUN".to_string(),
            message: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn motive(mut self, motive: impl Into<String>) -> Self {
        self.motive = motive.into();
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }
}

impl fmt::Display for RuntimeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ">> {} [{}]", self.motive, self.action)?;
        if !self.message.is_empty() {
            write!(f, " {}", self.message)?;
        }
        if !self.fields.is_empty() {
            let joined = self
                .fields
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ");
            write!(f, " - {joined}")?;
        }
        Ok(())
    }
}
