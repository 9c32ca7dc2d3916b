//! # Verification Results
//!
//! A [`VerificationResult`] is an append-only log of [`StepResult`]s in
//! pipeline order. Each step keeps its own messages and metadata, and its
//! [`StepStatus`] distinguishes a step that never ran (`Skipped`) from one
//! that ran and failed (`Failed`) or ran with caveats
//! (`SucceededWithWarnings`).
//!
//! Overall validity is "no step Failed". Skipped steps do not count
//! against it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Severity of a step message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSeverity {
    Info,
    Warning,
    Error,
}

/// A coded diagnostic emitted by a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMessage {
    /// Stable code, e.g. `verifier.signatures.missing`.
    pub code: String,
    pub message: String,
    pub severity: MessageSeverity,
    /// Entry field path or entry id the message concerns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl std::fmt::Display for VerificationMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " ({path})")?;
        }
        Ok(())
    }
}

/// Outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepStatus {
    Succeeded,
    SucceededWithWarnings,
    Failed,
    Skipped,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded => "Succeeded",
            Self::SucceededWithWarnings => "SucceededWithWarnings",
            Self::Failed => "Failed",
            Self::Skipped => "Skipped",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Messages, metadata and status of one pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub status: StepStatus,
    pub messages: Vec<VerificationMessage>,
    pub metadata: BTreeMap<String, String>,
}

impl StepResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Succeeded,
            messages: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Derive the status from the messages. A Skipped step stays Skipped.
    pub(crate) fn finalize_status(&mut self) {
        if self.status == StepStatus::Skipped {
            return;
        }
        self.status = if self.has_severity(MessageSeverity::Error) {
            StepStatus::Failed
        } else if self.has_severity(MessageSeverity::Warning) {
            StepStatus::SucceededWithWarnings
        } else {
            StepStatus::Succeeded
        };
    }

    fn has_severity(&self, severity: MessageSeverity) -> bool {
        self.messages.iter().any(|m| m.severity == severity)
    }

    /// Whether any message carries `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.messages.iter().any(|m| m.code == code)
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Write access to a step while it runs.
pub struct StepContext<'a> {
    step: &'a mut StepResult,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(step: &'a mut StepResult) -> Self {
        Self { step }
    }

    fn push(
        &mut self,
        severity: MessageSeverity,
        code: &str,
        message: impl Into<String>,
        path: Option<&str>,
    ) {
        self.step.messages.push(VerificationMessage {
            code: code.to_string(),
            message: message.into(),
            severity,
            path: path.map(str::to_string),
        });
    }

    pub fn add_error(&mut self, code: &str, message: impl Into<String>, path: Option<&str>) {
        self.push(MessageSeverity::Error, code, message, path);
    }

    pub fn add_warning(&mut self, code: &str, message: impl Into<String>, path: Option<&str>) {
        self.push(MessageSeverity::Warning, code, message, path);
    }

    pub fn add_info(&mut self, code: &str, message: impl Into<String>, path: Option<&str>) {
        self.push(MessageSeverity::Info, code, message, path);
    }

    /// Record a metadata value. Later writes to the same key win.
    pub fn add_metadata(&mut self, key: &str, value: impl Into<String>) {
        self.step.metadata.insert(key.to_string(), value.into());
    }

    /// Mark the step Skipped with an informational reason.
    pub fn skip(&mut self, code: &str, message: impl Into<String>) {
        self.add_info(code, message, None);
        self.step.status = StepStatus::Skipped;
    }

    pub fn is_skipped(&self) -> bool {
        self.step.status == StepStatus::Skipped
    }
}

/// The ordered step log of one verification run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub steps: Vec<StepResult>,
}

impl VerificationResult {
    pub(crate) fn push(&mut self, step: StepResult) {
        self.steps.push(step);
    }

    /// True when no step Failed.
    pub fn is_valid(&self) -> bool {
        self.steps.iter().all(|s| s.status != StepStatus::Failed)
    }

    /// Error messages across all steps, in step order.
    pub fn errors(&self) -> Vec<&VerificationMessage> {
        self.messages_with(MessageSeverity::Error)
    }

    /// Warning messages across all steps, in step order.
    pub fn warnings(&self) -> Vec<&VerificationMessage> {
        self.messages_with(MessageSeverity::Warning)
    }

    fn messages_with(&self, severity: MessageSeverity) -> Vec<&VerificationMessage> {
        self.steps
            .iter()
            .flat_map(|s| s.messages.iter())
            .filter(|m| m.severity == severity)
            .collect()
    }

    /// The step with `name`, if it ran.
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }
}
