//! Error types for the extraction pipeline.
//!
//! Only structural preconditions surface as errors. Per-cell anomalies
//! (unreadable text, grammar mismatches, unknown course codes) are
//! absorbed as degraded data so the composed schedule always has a
//! deterministic shape.

use thiserror::Error;

/// Hard failures of the extraction pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No candidate regions survived the area/shape filters. This aborts
    /// the run before any OCR is attempted.
    #[error("no cells detected in the table image")]
    NoCellsDetected,

    /// The OCR engine is unavailable or failed in a way that cannot be
    /// absorbed (e.g. the executable is missing).
    #[error("OCR engine failure: {0}")]
    Ocr(String),

    /// A timing table does not describe the fixed 12-slot template.
    #[error("invalid timing table: {0}")]
    TimingTable(String),
}
