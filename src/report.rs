//! Run reports: what a completed pipeline run looked like.
//!
//! Serialisable so the CLI's `--json` mode can emit the whole run as a
//! machine-readable record. Console output is informational; the report
//! is the structured equivalent.

use crate::step::StepKind;
use serde::Serialize;
use std::path::PathBuf;

/// One executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub label: String,
    pub kind: StepKind,
    pub duration_ms: u64,
}

/// Summary of a successful run.
///
/// Only produced on full success — a failed run returns an error naming
/// the failing step instead.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Executed steps, in order.
    pub steps: Vec<StepReport>,
    /// Resolved page count of the rendered document.
    pub page_count: u32,
    /// Pages stamped (equals `page_count` on success).
    pub stamped_pages: u32,
    /// Final location of the stage file.
    pub stage_file: PathBuf,
    /// Final location of the stamped PDF.
    pub output_pdf: PathBuf,
    /// Wall-clock duration of the whole run.
    pub total_duration_ms: u64,
}
