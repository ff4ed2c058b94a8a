//! Diagnostic types and the collecting sink.
//!
//! Pipeline stages never print or throw user-facing problems; they push
//! diagnostics into a sink and keep going, so a failing compile reports
//! every violation found, each with its byte range in the original file.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Severity {
    Error = 0,
    Warning = 1,
}

/// A single diagnostic, addressed by byte range in the original source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,

    /// Start byte offset in the original file
    pub start: usize,

    /// End byte offset in the original file
    pub end: usize,

    /// Name of the component function this diagnostic belongs to, if any
    #[serde(default)]
    pub component: Option<CompactString>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            start,
            end,
            component: None,
        }
    }

    pub fn warning(message: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            start,
            end,
            component: None,
        }
    }

    pub fn with_component(mut self, name: impl Into<CompactString>) -> Self {
        self.component = Some(name.into());
        self
    }
}

/// Collects diagnostics across pipeline stages.
///
/// Checks continue past individual failures; the driving caller inspects
/// `has_errors` to decide whether to proceed to transformation.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, message: impl Into<String>, start: usize, end: usize) {
        self.push(Diagnostic::error(message, start, end));
    }

    pub fn warning(&mut self, message: impl Into<String>, start: usize, end: usize) {
        self.push(Diagnostic::warning(message, start, end));
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn into_inner(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
