//! External process invocation.
//!
//! The data-population stages are opaque collaborator programs: the
//! pipeline starts them, optionally feeds them a line on stdin (the
//! mapping tool reads the contract number that way), captures their
//! output, and treats anything but exit 0 as fatal. Output is captured
//! rather than inherited so a failing tool's stderr can be attached to
//! the error that aborts the run.

use crate::config::ToolCommand;
use crate::error::PipelineError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// A fully-resolved process invocation, ready to execute.
///
/// Unlike [`ToolCommand`], the working directory here is absolute — the
/// planner resolves it against the run's base directory.
#[derive(Debug, Clone)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    /// Text piped to the child's stdin, if any.
    pub stdin_text: Option<String>,
}

impl ProcessSpec {
    /// Resolve a [`ToolCommand`] against a base directory.
    pub fn from_tool(tool: &ToolCommand, base_dir: &Path, default_cwd: &Path) -> Self {
        let cwd = match &tool.cwd {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => base_dir.join(dir),
            None => default_cwd.to_path_buf(),
        };
        Self {
            program: tool.program.clone(),
            args: tool.args.clone(),
            cwd: Some(cwd),
            stdin_text: None,
        }
    }

    pub fn stdin_text(mut self, text: impl Into<String>) -> Self {
        self.stdin_text = Some(text.into());
        self
    }
}

/// Captured output of a successful invocation.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run the program to completion and capture its output.
///
/// Succeeds only on exit code 0. A non-zero exit (or death by signal,
/// reported as code -1) is returned as
/// [`PipelineError::ProcessFailed`] with the captured stderr attached.
pub async fn run(spec: &ProcessSpec) -> Result<ProcessOutput, PipelineError> {
    debug!(program = %spec.program, args = ?spec.args, cwd = ?spec.cwd, "spawning");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if spec.stdin_text.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn().map_err(|source| PipelineError::ProcessSpawn {
        program: spec.program.clone(),
        source,
    })?;

    if let Some(text) = &spec.stdin_text {
        // The tool reads a single line; a trailing newline terminates it.
        let mut stdin = child.stdin.take().expect("stdin was piped");
        let mut line = text.clone();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|source| PipelineError::ProcessSpawn {
                program: spec.program.clone(),
                source,
            })?;
        drop(stdin);
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|source| PipelineError::ProcessSpawn {
            program: spec.program.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !stdout.is_empty() {
        debug!(program = %spec.program, "stdout:\n{}", stdout.trim_end());
    }
    if !stderr.is_empty() {
        warn!(program = %spec.program, "stderr:\n{}", stderr.trim_end());
    }

    if !output.status.success() {
        return Err(PipelineError::ProcessFailed {
            program: spec.program.clone(),
            code: output.status.code().unwrap_or(-1),
            stderr,
        });
    }

    Ok(ProcessOutput { stdout, stderr })
}
