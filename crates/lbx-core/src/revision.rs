//! # Revision Graph
//!
//! Entries link to the entry they revise through `previous_id`. The graph is
//! never materialized: [`RevisionGraph::traverse`] walks backwards one id at a
//! time through an [`EntryResolver`], keeping a seen-set of ids so a cyclic
//! history terminates with an issue instead of looping.
//!
//! ## Stopping rules
//!
//! Before each hop, in order:
//!
//! 1. `max_depth` reached: Warning `core.revision.max_depth`.
//! 2. Predecessor id already seen: Error `core.revision.cycle_detected`.
//! 3. Resolver returns nothing: Error `core.revision.missing_predecessor`.
//!
//! The chain always starts with the head. Traversal succeeds when no
//! Error-severity issue was emitted.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::entry::Entry;

/// Looks up entries by id.
pub trait EntryResolver: Send + Sync {
    /// Return the entry with `id`, or `None` when it is unknown.
    fn resolve(&self, id: &str) -> Option<Entry>;
}

impl<F> EntryResolver for F
where
    F: Fn(&str) -> Option<Entry> + Send + Sync,
{
    fn resolve(&self, id: &str) -> Option<Entry> {
        self(id)
    }
}

/// Severity of a revision issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// Why traversal stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevisionIssueCode {
    MaxDepth,
    CycleDetected,
    MissingPredecessor,
}

impl RevisionIssueCode {
    /// Stable dotted code, e.g. `core.revision.cycle_detected`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MaxDepth => "core.revision.max_depth",
            Self::CycleDetected => "core.revision.cycle_detected",
            Self::MissingPredecessor => "core.revision.missing_predecessor",
        }
    }

    pub fn severity(&self) -> IssueSeverity {
        match self {
            Self::MaxDepth => IssueSeverity::Warning,
            Self::CycleDetected | Self::MissingPredecessor => IssueSeverity::Error,
        }
    }
}

impl std::fmt::Display for RevisionIssueCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issue found while walking a revision chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionIssue {
    pub code: RevisionIssueCode,
    pub message: String,
    pub severity: IssueSeverity,
    /// For `max_depth`, the entry where traversal stopped. Otherwise the
    /// predecessor id that was revisited or could not be resolved.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

impl RevisionIssue {
    fn new(code: RevisionIssueCode, message: String, entry_id: &str) -> Self {
        Self {
            code,
            message,
            severity: code.severity(),
            entry_id: Some(entry_id.to_string()),
        }
    }
}

/// Result of a revision traversal.
#[derive(Debug, Clone, PartialEq)]
pub struct RevisionTraversal {
    /// Head first, then each resolved predecessor.
    pub chain: Vec<Entry>,
    pub issues: Vec<RevisionIssue>,
}

impl RevisionTraversal {
    /// True when no Error-severity issue was emitted.
    pub fn is_success(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| i.severity == IssueSeverity::Error)
    }

    /// Number of predecessor hops followed.
    pub fn depth(&self) -> usize {
        self.chain.len().saturating_sub(1)
    }
}

/// Backward traversal over `previous_id` links.
#[derive(Debug, Clone, Copy, Default)]
pub struct RevisionGraph;

impl RevisionGraph {
    /// Walk back from `head` until the history ends or a stopping rule fires.
    pub fn traverse(
        head: &Entry,
        resolver: &dyn EntryResolver,
        max_depth: Option<usize>,
    ) -> RevisionTraversal {
        let mut chain = vec![head.clone()];
        let mut issues = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let head_id = head.id.trim();
        if !head_id.is_empty() {
            seen.insert(head_id.to_string());
        }

        let mut depth = 0usize;
        let mut current = head.clone();

        while let Some(previous_id) = current.predecessor().map(str::to_string) {
            if max_depth.is_some_and(|max| depth >= max) {
                issues.push(RevisionIssue::new(
                    RevisionIssueCode::MaxDepth,
                    format!(
                        "maximum revision depth of {} reached",
                        max_depth.unwrap_or_default()
                    ),
                    &current.id,
                ));
                break;
            }

            if !seen.insert(previous_id.clone()) {
                issues.push(RevisionIssue::new(
                    RevisionIssueCode::CycleDetected,
                    format!("revision cycle detected at entry {previous_id}"),
                    &previous_id,
                ));
                break;
            }

            let Some(previous) = resolver.resolve(&previous_id) else {
                issues.push(RevisionIssue::new(
                    RevisionIssueCode::MissingPredecessor,
                    format!("previous entry {previous_id} could not be resolved"),
                    &previous_id,
                ));
                break;
            };

            chain.push(previous.clone());
            current = previous;
            depth += 1;
        }

        tracing::debug!(
            head = %head.id,
            depth,
            issues = issues.len(),
            "revision chain traversed"
        );
        RevisionTraversal { chain, issues }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::entry::fixtures;

    const A: &str = "00000000-0000-4000-8000-00000000000a";
    const B: &str = "00000000-0000-4000-8000-00000000000b";
    const C: &str = "00000000-0000-4000-8000-00000000000c";

    fn entry(id: &str, previous: Option<&str>) -> Entry {
        let mut entry = fixtures::entry();
        entry.id = id.to_string();
        entry.previous_id = previous.map(str::to_string);
        entry
    }

    fn store(entries: &[Entry]) -> HashMap<String, Entry> {
        entries.iter().map(|e| (e.id.clone(), e.clone())).collect()
    }

    fn resolver(map: HashMap<String, Entry>) -> impl Fn(&str) -> Option<Entry> + Send + Sync {
        move |id: &str| map.get(id).cloned()
    }

    #[test]
    fn head_without_predecessor_is_single_link() {
        let head = entry(A, None);
        let result = RevisionGraph::traverse(&head, &resolver(HashMap::new()), None);
        assert_eq!(result.chain.len(), 1);
        assert!(result.issues.is_empty());
        assert!(result.is_success());
    }

    #[test]
    fn follows_full_chain() {
        let a = entry(A, None);
        let b = entry(B, Some(A));
        let c = entry(C, Some(B));
        let result = RevisionGraph::traverse(&c, &resolver(store(&[a, b])), None);
        let ids: Vec<&str> = result.chain.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec![C, B, A]);
        assert!(result.is_success());
        assert_eq!(result.depth(), 2);
    }

    #[test]
    fn cycle_is_an_error() {
        let a = entry(A, Some(C));
        let b = entry(B, Some(A));
        let c = entry(C, Some(B));
        let result = RevisionGraph::traverse(&c, &resolver(store(&[a, b, c.clone()])), None);
        assert!(!result.is_success());
        let issue = result.issues.last().unwrap();
        assert_eq!(issue.code, RevisionIssueCode::CycleDetected);
        assert!(issue.code.as_str().ends_with("cycle_detected"));
        assert_eq!(issue.severity, IssueSeverity::Error);
        // C -> B -> A -> C: the revisited link is C.
        assert_eq!(issue.entry_id.as_deref(), Some(C));
        assert_eq!(result.chain.len(), 3);
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let a = entry(A, Some(A));
        let result = RevisionGraph::traverse(&a, &resolver(store(&[a.clone()])), None);
        assert_eq!(result.issues[0].code, RevisionIssueCode::CycleDetected);
        assert_eq!(result.chain.len(), 1);
    }

    #[test]
    fn depth_limit_is_a_warning() {
        let a = entry(A, None);
        let b = entry(B, Some(A));
        let c = entry(C, Some(B));
        let result = RevisionGraph::traverse(&c, &resolver(store(&[a, b])), Some(1));
        assert_eq!(result.chain.len(), 2);
        assert_eq!(result.issues.len(), 1);
        assert_eq!(result.issues[0].code, RevisionIssueCode::MaxDepth);
        assert_eq!(result.issues[0].severity, IssueSeverity::Warning);
        assert_eq!(result.issues[0].entry_id.as_deref(), Some(B));
        assert!(result.is_success());
    }

    #[test]
    fn missing_predecessor_is_an_error() {
        let c = entry(C, Some(B));
        let result = RevisionGraph::traverse(&c, &resolver(HashMap::new()), None);
        assert_eq!(result.chain.len(), 1);
        assert_eq!(result.issues[0].code, RevisionIssueCode::MissingPredecessor);
        assert_eq!(result.issues[0].entry_id.as_deref(), Some(B));
        assert!(!result.is_success());
    }

    #[test]
    fn issue_code_serializes_snake_case() {
        let json = serde_json::to_string(&RevisionIssueCode::CycleDetected).unwrap();
        assert_eq!(json, "\"cycle_detected\"");
    }
}
