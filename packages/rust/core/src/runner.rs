//! Sequential collection runner.
//!
//! Iterates a document set in order, drives fetch → process → persist for
//! each document, and aggregates outcomes into a [`RunSummary`]. Documents
//! are processed strictly one at a time to respect store rate limits and to
//! keep the idempotency check race-free; a configurable pacing interval is
//! enforced between documents.

use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use linkforge_shared::{
    Document, DocumentReport, LinkForgeError, LinkOutcome, Result, RunSummary,
};
use linkforge_store::DocumentStore;

use crate::cancel::CancellationToken;
use crate::processor;

// ---------------------------------------------------------------------------
// Run configuration
// ---------------------------------------------------------------------------

/// Configuration for one collection run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Heading text delimiting the target region.
    pub marker_text: String,
    /// Keywords to link, applied in order.
    pub keywords: Vec<String>,
    /// URL the inserted link points at.
    pub link_target: String,
    /// Minimum interval between documents.
    pub pacing: Duration,
    /// Process without persisting (outcomes still recorded).
    pub dry_run: bool,
}

impl RunConfig {
    /// Reject configurations that would make the whole run meaningless.
    /// Raised before any document is processed.
    fn validate(&self) -> Result<()> {
        if self.link_target.trim().is_empty() {
            return Err(LinkForgeError::config("link target must not be empty"));
        }
        if !self.keywords.iter().any(|k| !k.trim().is_empty()) {
            return Err(LinkForgeError::config(
                "keyword list must contain at least one keyword",
            ));
        }
        if self.marker_text.trim().is_empty() {
            return Err(LinkForgeError::config("marker text must not be empty"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a document is fetched.
    fn document_started(&self, handle: &str, current: usize, total: usize);
    /// Called after a document's outcome is decided.
    fn document_finished(&self, handle: &str, outcome: &LinkOutcome);
    /// Called once when the run completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn document_started(&self, _handle: &str, _current: usize, _total: usize) {}
    fn document_finished(&self, _handle: &str, _outcome: &LinkOutcome) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Run the keyword batch over every document, in the given order.
///
/// Per-document failures (fetch, scope, persist) are recorded as `error`
/// outcomes and never abort the run; the returned summary covers every
/// document processed before completion or cancellation.
#[instrument(skip_all, fields(documents = handles.len(), dry_run = config.dry_run))]
pub async fn run<S: DocumentStore>(
    store: &S,
    handles: &[String],
    config: &RunConfig,
    cancel: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    config.validate()?;

    let mut summary = RunSummary::new();
    let total = handles.len();

    info!(
        run_id = %summary.run_id,
        documents = total,
        keywords = config.keywords.len(),
        pacing_ms = config.pacing.as_millis() as u64,
        "starting run"
    );

    for (i, handle) in handles.iter().enumerate() {
        if cancel.is_cancelled() {
            info!(processed = summary.total(), "run cancelled");
            break;
        }

        if i > 0 && !config.pacing.is_zero() {
            tokio::time::sleep(config.pacing).await;
        }

        progress.document_started(handle, i + 1, total);
        let report = process_one(store, handle, config).await;
        progress.document_finished(handle, &report.outcome);
        summary.record(report);
    }

    summary.finished_at = Some(Utc::now());

    info!(
        run_id = %summary.run_id,
        linked = summary.linked,
        already_linked = summary.already_linked,
        no_match = summary.no_match,
        errors = summary.errors,
        "run complete"
    );

    progress.done(&summary);
    Ok(summary)
}

/// One document's full fetch → process → persist transaction.
async fn process_one<S: DocumentStore>(
    store: &S,
    handle: &str,
    config: &RunConfig,
) -> DocumentReport {
    let document: Document = match store.fetch_document(handle).await {
        Ok(doc) => doc,
        Err(e) => {
            warn!(handle, error = %e, "fetch failed");
            return DocumentReport {
                handle: handle.to_string(),
                outcome: LinkOutcome::Error {
                    reason: format!("fetch failed: {e}"),
                },
                persisted: false,
            };
        }
    };

    let pass = processor::process(
        &document.html,
        &config.marker_text,
        &config.keywords,
        &config.link_target,
    );

    let mut persisted = false;
    let outcome = match (&pass.outcome, &pass.html) {
        (LinkOutcome::Linked { .. }, Some(mutated)) if !config.dry_run => {
            match store.persist_document(&document, mutated).await {
                Ok(()) => {
                    persisted = true;
                    pass.outcome.clone()
                }
                Err(e) => {
                    // Persistence failure downgrades the outcome; the run
                    // itself continues.
                    warn!(handle, error = %e, "persist failed");
                    LinkOutcome::Error {
                        reason: format!("persist failed: {e}"),
                    }
                }
            }
        }
        _ => pass.outcome.clone(),
    };

    DocumentReport {
        handle: handle.to_string(),
        outcome,
        persisted,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
