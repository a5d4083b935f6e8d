//! The pipeline step model.
//!
//! A run is an ordered list of [`Step`]s executed strictly in sequence.
//! Steps are plain data — a label plus one of four operation kinds — and
//! execution is a single dispatch over the enum. Nothing a step produces
//! is consulted by a later step except through the filesystem: a
//! rename's destination is the next copy's source, and so on.

use crate::error::PipelineError;
use crate::pipeline::{fsops, http::ServiceClient, process};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// The four things a step can do.
#[derive(Debug, Clone)]
pub enum StepOp {
    /// Run an external collaborator program; success is exit 0.
    Invoke(process::ProcessSpec),
    /// Rename a file, replacing any existing destination.
    Rename { from: PathBuf, to: PathBuf },
    /// Copy a file, creating destination directories as needed.
    Copy { from: PathBuf, to: PathBuf },
    /// Call the document-generation service.
    Call(HttpCall),
}

/// The service calls that appear in the fixed step list.
///
/// (The per-page stamp call is not a step — it belongs to the stamping
/// loop, which runs after the list completes.)
#[derive(Debug, Clone)]
pub enum HttpCall {
    /// Multipart upload of the template document.
    UploadTemplate { file: PathBuf },
    /// Render the stage file against the named template; the binary
    /// response body becomes the working PDF.
    RenderDocument {
        stage_file: PathBuf,
        template_name: String,
        output: PathBuf,
    },
}

/// Step kind, as reported in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    Invoke,
    Rename,
    Copy,
    Call,
}

/// One ordered unit of work in the pipeline.
#[derive(Debug, Clone)]
pub struct Step {
    /// Human-readable label, used in progress output and failure
    /// messages ("Step 'render document' failed: …").
    pub label: String,
    pub op: StepOp,
}

impl Step {
    pub fn new(label: impl Into<String>, op: StepOp) -> Self {
        Self {
            label: label.into(),
            op,
        }
    }

    pub fn kind(&self) -> StepKind {
        match &self.op {
            StepOp::Invoke(_) => StepKind::Invoke,
            StepOp::Rename { .. } => StepKind::Rename,
            StepOp::Copy { .. } => StepKind::Copy,
            StepOp::Call(_) => StepKind::Call,
        }
    }

    /// Execute the step to completion.
    ///
    /// The error is returned bare; the runner wraps it with the step's
    /// label so callers see which step aborted the run.
    pub async fn execute(&self, client: &ServiceClient) -> Result<(), PipelineError> {
        info!(step = %self.label, "executing");
        match &self.op {
            StepOp::Invoke(spec) => {
                process::run(spec).await?;
                Ok(())
            }
            StepOp::Rename { from, to } => fsops::rename(from, to).await,
            StepOp::Copy { from, to } => fsops::copy(from, to).await,
            StepOp::Call(HttpCall::UploadTemplate { file }) => {
                client.upload_document(file).await
            }
            StepOp::Call(HttpCall::RenderDocument {
                stage_file,
                template_name,
                output,
            }) => {
                client
                    .render_to_document(stage_file, template_name, output)
                    .await
            }
        }
    }
}
