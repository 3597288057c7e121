//! Batch orchestration for LinkForge.
//!
//! [`processor`] applies an ordered keyword list to a single document and
//! classifies the outcome; [`runner`] drives a whole collection through the
//! processor sequentially, with pacing, cooperative cancellation, and
//! per-outcome aggregation.

pub mod cancel;
pub mod processor;
pub mod runner;

pub use cancel::CancellationToken;
pub use processor::{PassReport, process};
pub use runner::{ProgressReporter, RunConfig, SilentProgress, run};
