//! Core domain types for LinkForge runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One remote document (a product description), fetched fresh for a single
/// processing pass and discarded afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Opaque external handle identifying the document in its store.
    pub handle: String,
    /// Store-side identifier used for updates (e.g., a GraphQL GID).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_id: Option<String>,
    /// Display title, when the store provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// The description HTML fragment.
    pub html: String,
    /// SHA-256 hash of `html` at fetch time.
    pub content_hash: String,
    /// When the document was fetched.
    pub fetched_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// LinkOutcome
// ---------------------------------------------------------------------------

/// Terminal classification of one document's processing pass.
///
/// Exactly one outcome per (document, keyword-list) pass: the batch stops at
/// the first keyword that is already linked or gets linked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkOutcome {
    /// A link was inserted for `keyword`.
    Linked { keyword: String },
    /// `keyword` was already linked to the target; nothing was changed.
    AlreadyLinked { keyword: String },
    /// No keyword in the list matched inside the scope region.
    NoMatch,
    /// The document could not be processed; `reason` is human-readable.
    Error { reason: String },
}

impl LinkOutcome {
    /// The coarse outcome kind, for aggregation.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Linked { .. } => OutcomeKind::Linked,
            Self::AlreadyLinked { .. } => OutcomeKind::AlreadyLinked,
            Self::NoMatch => OutcomeKind::NoMatch,
            Self::Error { .. } => OutcomeKind::Error,
        }
    }
}

impl std::fmt::Display for LinkOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Linked { keyword } => write!(f, "linked '{keyword}'"),
            Self::AlreadyLinked { keyword } => write!(f, "'{keyword}' already linked"),
            Self::NoMatch => write!(f, "no keyword matched"),
            Self::Error { reason } => write!(f, "error: {reason}"),
        }
    }
}

/// Outcome kind without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Linked,
    AlreadyLinked,
    NoMatch,
    Error,
}

// ---------------------------------------------------------------------------
// DocumentReport / RunSummary
// ---------------------------------------------------------------------------

/// Per-document result within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// The document's store handle.
    pub handle: String,
    /// Terminal outcome of the pass.
    pub outcome: LinkOutcome,
    /// Whether the mutated document was persisted back to the store.
    pub persisted: bool,
}

/// Aggregate result of one collection run.
///
/// Reports preserve input document order; the counters are always the sizes
/// of the corresponding report partitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Unique run identifier (UUID v7, time-sortable).
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished (set by the runner on completion).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Documents that received a new link.
    pub linked: usize,
    /// Documents where a keyword was already linked.
    pub already_linked: usize,
    /// Documents where no keyword matched.
    pub no_match: usize,
    /// Documents that failed (fetch, parse, scope, persist).
    pub errors: usize,
    /// Ordered per-document results.
    pub reports: Vec<DocumentReport>,
}

impl RunSummary {
    /// Start an empty summary for a new run.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: None,
            linked: 0,
            already_linked: 0,
            no_match: 0,
            errors: 0,
            reports: Vec::new(),
        }
    }

    /// Record one document's report, bumping the matching counter.
    pub fn record(&mut self, report: DocumentReport) {
        match report.outcome.kind() {
            OutcomeKind::Linked => self.linked += 1,
            OutcomeKind::AlreadyLinked => self.already_linked += 1,
            OutcomeKind::NoMatch => self.no_match += 1,
            OutcomeKind::Error => self.errors += 1,
        }
        self.reports.push(report);
    }

    /// Total number of documents covered by this summary.
    pub fn total(&self) -> usize {
        self.reports.len()
    }
}

impl Default for RunSummary {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(handle: &str, outcome: LinkOutcome) -> DocumentReport {
        DocumentReport {
            handle: handle.into(),
            outcome,
            persisted: false,
        }
    }

    #[test]
    fn summary_counters_match_reports() {
        let mut summary = RunSummary::new();
        summary.record(report(
            "sapphire-ring",
            LinkOutcome::Linked {
                keyword: "Sapphire".into(),
            },
        ));
        summary.record(report(
            "topaz-ring",
            LinkOutcome::AlreadyLinked {
                keyword: "Topaz".into(),
            },
        ));
        summary.record(report("plain-band", LinkOutcome::NoMatch));
        summary.record(report(
            "broken",
            LinkOutcome::Error {
                reason: "no scope region".into(),
            },
        ));

        assert_eq!(summary.linked, 1);
        assert_eq!(summary.already_linked, 1);
        assert_eq!(summary.no_match, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.total(), 4);
        // Input order preserved
        assert_eq!(summary.reports[0].handle, "sapphire-ring");
        assert_eq!(summary.reports[3].handle, "broken");
    }

    #[test]
    fn outcome_serialization_uses_kind_tag() {
        let outcome = LinkOutcome::Linked {
            keyword: "Sapphire".into(),
        };
        let json = serde_json::to_string(&outcome).expect("serialize");
        assert!(json.contains("\"kind\":\"linked\""));

        let parsed: LinkOutcome = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, outcome);
    }

    #[test]
    fn outcome_display() {
        let outcome = LinkOutcome::AlreadyLinked {
            keyword: "Topaz".into(),
        };
        assert_eq!(outcome.to_string(), "'Topaz' already linked");
        assert_eq!(LinkOutcome::NoMatch.to_string(), "no keyword matched");
    }

    #[test]
    fn summary_roundtrip() {
        let mut summary = RunSummary::new();
        summary.record(report("a", LinkOutcome::NoMatch));
        summary.finished_at = Some(Utc::now());

        let json = serde_json::to_string(&summary).expect("serialize");
        let parsed: RunSummary = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.run_id, summary.run_id);
        assert_eq!(parsed.no_match, 1);
        assert_eq!(parsed.reports.len(), 1);
    }
}
