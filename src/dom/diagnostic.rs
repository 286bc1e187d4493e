use crate::dom::SourceRange;
use serde::{Deserialize, Serialize};

/// Severity level of a diagnostic emitted while loading or serializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// The phase that produced the diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticPhase {
    Load,
    Diff,
    Serialize,
}

/// A structured diagnostic for debugging round-trip decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<DiagnosticPhase>,

    /// A stable identifier like `html2wt.separator.conflict`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub message: String,

    /// The original-source range this diagnostic refers to, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<SourceRange>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn warning(phase: DiagnosticPhase, code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            phase: Some(phase),
            code: Some(code.to_string()),
            message: message.into(),
            range: None,
            notes: Vec::new(),
        }
    }

    pub fn with_range(mut self, range: Option<SourceRange>) -> Self {
        self.range = range;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Forwards the diagnostic to the `log` facade.
    pub fn log(&self) {
        let code = self.code.as_deref().unwrap_or("-");
        match self.severity {
            Severity::Error => log::error!("[{code}] {}", self.message),
            Severity::Warning => log::warn!("[{code}] {}", self.message),
            Severity::Info => log::info!("[{code}] {}", self.message),
        }
    }
}
