//! Composite outcome type shared by phase hooks, actions and the engine

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a [`Status`].
///
/// Ordered so that aggregation is a plain `max`: an error outranks a
/// cancellation, which outranks a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Info,
    Warning,
    Cancel,
    Error,
}

impl Severity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Cancel => "cancel",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of a step, possibly aggregating child outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Status>,
}

impl Status {
    fn new(severity: Severity, message: Option<String>) -> Self {
        Self {
            severity,
            message,
            children: Vec::new(),
        }
    }

    /// A plain success
    pub fn ok() -> Self {
        Self::new(Severity::Ok, None)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, Some(message.into()))
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, Some(message.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, Some(message.into()))
    }

    /// Error status built from any error, keeping its full cause chain
    pub fn from_error(context: &str, err: &anyhow::Error) -> Self {
        Self::error(format!("{context}: {err:#}"))
    }

    pub fn cancel() -> Self {
        Self::new(Severity::Cancel, Some("Operation cancelled".into()))
    }

    /// An empty aggregate; its severity follows whatever gets merged in
    pub fn multi(message: impl Into<String>) -> Self {
        Self::new(Severity::Ok, Some(message.into()))
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn children(&self) -> &[Status] {
        &self.children
    }

    /// Add a child outcome and raise this status to its severity
    ///
    /// OK children with nothing below them are folded away so that
    /// successful runs stay compact.
    pub fn merge(&mut self, child: Status) {
        self.severity = self.severity.max(child.severity);
        if child.severity == Severity::Ok && child.children.is_empty() {
            return;
        }
        self.children.push(child);
    }

    /// Builder-style [`merge`](Self::merge)
    pub fn with(mut self, child: Status) -> Self {
        self.merge(child);
        self
    }

    pub fn is_ok(&self) -> bool {
        self.severity == Severity::Ok
    }

    /// True for error and cancel, the severities that abort a run
    pub fn is_failure(&self) -> bool {
        self.severity >= Severity::Cancel
    }

    /// True if this status or any descendant is a cancellation
    ///
    /// An error still outranks a cancellation in the aggregate severity,
    /// so the cancel is looked up explicitly.
    pub fn is_cancelled(&self) -> bool {
        self.severity == Severity::Cancel || self.children.iter().any(Status::is_cancelled)
    }

    /// Iterate over this status and every descendant, depth first
    pub fn flatten(&self) -> Vec<&Status> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match &self.message {
            Some(message) => writeln!(f, "{indent}[{}] {message}", self.severity)?,
            None => writeln!(f, "{indent}[{}]", self.severity)?,
        }
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Ok < Severity::Info);
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Cancel);
        assert!(Severity::Cancel < Severity::Error);
    }

    #[test]
    fn test_merge_takes_max_severity() {
        let mut status = Status::multi("run");
        assert!(status.is_ok());

        status.merge(Status::warning("slow mirror"));
        assert_eq!(status.severity(), Severity::Warning);

        status.merge(Status::info("note"));
        assert_eq!(status.severity(), Severity::Warning);

        status.merge(Status::error("boom"));
        assert_eq!(status.severity(), Severity::Error);
        assert!(status.is_failure());
        assert_eq!(status.children().len(), 3);
    }

    #[test]
    fn test_plain_ok_children_are_folded() {
        let status = Status::multi("run")
            .with(Status::ok())
            .with(Status::multi("phase 'install'"));
        assert!(status.is_ok());
        assert!(status.children().is_empty());

        let status = Status::multi("run").with(Status::multi("phase").with(Status::info("note")));
        assert_eq!(status.severity(), Severity::Info);
        assert_eq!(status.children().len(), 1);
    }

    #[test]
    fn test_cancel_reported_distinctly() {
        let status = Status::multi("run")
            .with(Status::cancel())
            .with(Status::error("undo failed"));
        assert_eq!(status.severity(), Severity::Error);
        assert!(status.is_cancelled());

        let plain = Status::multi("run").with(Status::error("boom"));
        assert!(!plain.is_cancelled());
    }

    #[test]
    fn test_display_tree() {
        let status = Status::multi("perform").with(Status::error("action failed"));
        let text = status.to_string();
        assert!(text.contains("[error] perform"));
        assert!(text.contains("  [error] action failed"));
    }

    #[test]
    fn test_from_error_keeps_chain() {
        let err = anyhow::anyhow!("disk full").context("writing marker");
        let status = Status::from_error("execute", &err);
        let message = status.message().unwrap();
        assert!(message.contains("writing marker"));
        assert!(message.contains("disk full"));
    }
}
