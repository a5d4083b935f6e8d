//! Error types for the pdfpipe library.
//!
//! Every failure in a pipeline run is fatal: the run stops at the failing
//! step and nothing is retried or rolled back. A single [`PipelineError`]
//! enum therefore covers the whole taxonomy — process failures, file
//! staging failures, HTTP failures, and the undeterminable-page-count
//! case.
//!
//! The one place that does NOT use these errors is the page-count
//! resolver: its internal strategy failures are swallowed and expressed
//! as `Option::None`, and only the caller escalates `None` to
//! [`PipelineError::PageCountUnavailable`].

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdfpipe library.
#[derive(Debug, Error)]
pub enum PipelineError {
    // ── Process errors ────────────────────────────────────────────────────
    /// The external program could not be started at all.
    #[error("Failed to start '{program}': {source}\nCheck the program exists and is executable.")]
    ProcessSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The external program ran but exited non-zero.
    #[error("'{program}' exited with {code}\nstderr:\n{stderr}")]
    ProcessFailed {
        program: String,
        /// Exit code, or -1 when the process was killed by a signal.
        code: i32,
        stderr: String,
    },

    // ── File staging errors ───────────────────────────────────────────────
    /// Source file for a rename or copy does not exist.
    ///
    /// The stage file is produced by the previous step; a missing source
    /// almost always means that step silently wrote nothing.
    #[error("Stage file not found: '{path}'\nThe previous step did not produce its output.")]
    MissingSource { path: PathBuf },

    /// Rename failed for a reason other than a missing source.
    #[error("Failed to rename '{from}' to '{to}': {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copy failed for a reason other than a missing source.
    #[error("Failed to copy '{from}' to '{to}': {source}")]
    CopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── HTTP errors ───────────────────────────────────────────────────────
    /// The service answered with a non-success status.
    #[error("'{operation}' returned HTTP {status} from {url}")]
    HttpStatus {
        operation: &'static str,
        url: String,
        status: u16,
    },

    /// The request never completed (connection refused, timeout, TLS…).
    #[error("'{operation}' request to {url} failed: {reason}")]
    HttpTransport {
        operation: &'static str,
        url: String,
        reason: String,
    },

    /// The binary response body could not be written to disk.
    #[error("Failed to write response body to '{path}': {source}")]
    ResponseWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Stamping errors ───────────────────────────────────────────────────
    /// Every page-count strategy came up empty.
    #[error("Could not determine page count of '{path}'\nTried Spotlight metadata, pdfinfo, and raw-byte heuristics.")]
    PageCountUnavailable { path: PathBuf },

    /// A single page's stamp call failed; earlier pages stay stamped.
    #[error("Stamping page {page} of {total} failed: {source}")]
    StampFailed {
        page: u32,
        total: u32,
        #[source]
        source: Box<PipelineError>,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Step wrapper ──────────────────────────────────────────────────────
    /// Orchestrator wrapper naming the step that failed.
    #[error("Step '{label}' failed: {source}")]
    Step {
        label: String,
        #[source]
        source: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Wrap an error with the label of the step it aborted.
    pub(crate) fn at_step(self, label: &str) -> Self {
        PipelineError::Step {
            label: label.to_string(),
            source: Box::new(self),
        }
    }

    /// The label of the failing step, if this error came out of the
    /// orchestrator.
    pub fn step_label(&self) -> Option<&str> {
        match self {
            PipelineError::Step { label, .. } => Some(label),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_failed_display() {
        let e = PipelineError::ProcessFailed {
            program: "merge_letterdata".into(),
            code: 2,
            stderr: "boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("exited with 2"), "got: {msg}");
        assert!(msg.contains("boom"));
    }

    #[test]
    fn step_wrapper_names_label() {
        let inner = PipelineError::MissingSource {
            path: PathBuf::from("output/output.json"),
        };
        let e = inner.at_step("rename mapping output");
        assert_eq!(e.step_label(), Some("rename mapping output"));
        assert!(e.to_string().contains("rename mapping output"));
    }

    #[test]
    fn http_status_display() {
        let e = PipelineError::HttpStatus {
            operation: "stamp-image",
            url: "http://svc/pdf/stamp-image".into(),
            status: 502,
        };
        assert!(e.to_string().contains("502"));
        assert!(e.to_string().contains("stamp-image"));
    }

    #[test]
    fn stamp_failed_carries_page() {
        let e = PipelineError::StampFailed {
            page: 3,
            total: 7,
            source: Box::new(PipelineError::HttpStatus {
                operation: "stamp-image",
                url: "http://svc".into(),
                status: 500,
            }),
        };
        assert!(e.to_string().contains("page 3 of 7"));
    }
}
