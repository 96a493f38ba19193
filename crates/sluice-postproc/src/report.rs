//! Append-only status log returned to the caller as the pass report.
//!
//! Every line is mirrored to `tracing` at the matching level so the same
//! history reaches the process logs.

use std::fmt;

use tracing::{debug, error, info, warn};

/// Severity attached to a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Diagnostic detail.
    Debug,
    /// Normal progress.
    Info,
    /// Something was skipped or left behind.
    Warning,
    /// Something failed.
    Error,
}

impl Severity {
    const fn tag(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Line { severity: Severity, message: String },
    Verbatim(String),
}

/// Ordered sequence of status lines accumulated across one pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultLog {
    entries: Vec<Entry>,
}

impl ResultLog {
    /// Create an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append a line at `severity`.
    pub fn push(&mut self, severity: Severity, message: impl Into<String>) {
        let message = message.into();
        match severity {
            Severity::Debug => debug!("{message}"),
            Severity::Info => info!("{message}"),
            Severity::Warning => warn!("{message}"),
            Severity::Error => error!("{message}"),
        }
        self.entries.push(Entry::Line { severity, message });
    }

    /// Append a debug line.
    pub fn debug(&mut self, message: impl Into<String>) {
        self.push(Severity::Debug, message);
    }

    /// Append an info line.
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Severity::Info, message);
    }

    /// Append a warning line.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(Severity::Warning, message);
    }

    /// Append an error line.
    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Severity::Error, message);
    }

    /// Append a collaborator's own log text unchanged.
    pub fn append_verbatim(&mut self, text: &str) {
        let text = text.trim_end_matches(['\r', '\n']);
        if !text.is_empty() {
            self.entries.push(Entry::Verbatim(text.to_string()));
        }
    }

    /// Number of entries recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any rendered line contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().any(|line| line.contains(needle))
    }

    /// Rendered lines in insertion order.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|entry| match entry {
            Entry::Line { severity, message } => format!("[{severity}] {message}"),
            Entry::Verbatim(text) => text.clone(),
        })
    }

    /// Newline-joined report text.
    #[must_use]
    pub fn render(&self) -> String {
        self.lines().collect::<Vec<_>>().join("\n")
    }
}
