//! Configuration types for a pipeline run.
//!
//! Everything a run needs is collected in [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. One struct per run makes it trivial to
//! log the effective configuration, diff two runs, and build the fixed
//! step list from data instead of scattering paths through the code.
//!
//! # Design choice: builder over constructor
//! The config spans stage directories, three tool commands, service URL,
//! stamp geometry and timeouts. A positional constructor over that many
//! fields is unreadable; the builder lets callers set only what differs
//! from the defaults.

use crate::error::PipelineError;
use crate::progress::ObserverHandle;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// An external collaborator tool: program, arguments, working directory.
///
/// The pipeline never interprets what the tool does — it only runs it and
/// checks the exit code. `cwd` is resolved against the run's base
/// directory when relative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, a: impl Into<String>) -> Self {
        self.args.push(a.into());
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// Placement of the stamp on each page, passed verbatim to the
/// stamp-image endpoint as query parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StampGeometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub units: Units,
    pub anchor: Anchor,
}

impl Default for StampGeometry {
    /// Barcode placement in the top-right margin of a portrait A4 letter.
    fn default() -> Self {
        Self {
            x: 204.0,
            y: 220.8,
            width: 6.4,
            height: 45.2,
            units: Units::Mm,
            anchor: Anchor::TopLeft,
        }
    }
}

/// Unit of the stamp geometry values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Mm,
    Pt,
    Px,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Mm => "mm",
            Units::Pt => "pt",
            Units::Px => "px",
        }
    }
}

/// Corner (or centre) the stamp coordinates are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Anchor {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Center,
}

impl Anchor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Anchor::TopLeft => "top-left",
            Anchor::TopRight => "top-right",
            Anchor::BottomLeft => "bottom-left",
            Anchor::BottomRight => "bottom-right",
            Anchor::Center => "center",
        }
    }
}

/// Relative locations of the stage directories under the base directory.
///
/// Each data-population stage owns a directory with an `output/` (and,
/// for consumers, an `input/`) subdirectory; the stage file flows through
/// them by rename and copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageLayout {
    /// Contract-mapping generator's directory.
    pub mapping_dir: PathBuf,
    /// Letter-data merger's directory.
    pub merge_dir: PathBuf,
    /// Script-resolution evaluator's resource directory.
    pub resolve_dir: PathBuf,
    /// Render inputs: the stage file, the template, the barcode image.
    pub render_input_dir: PathBuf,
    /// Render outputs: the produced PDF.
    pub render_output_dir: PathBuf,
}

impl Default for StageLayout {
    fn default() -> Self {
        Self {
            mapping_dir: PathBuf::from("mapping"),
            merge_dir: PathBuf::from("merge"),
            resolve_dir: PathBuf::from("resolve"),
            render_input_dir: PathBuf::from("render/input"),
            render_output_dir: PathBuf::from("render/output"),
        }
    }
}

/// Configuration for one pipeline run.
///
/// Built via [`PipelineConfig::builder()`].
///
/// # Example
/// ```rust
/// use pdfpipe::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .base_dir("/data/letters")
///     .contract_number("381034")
///     .service_url("https://platform.example.com/pdfgeneration-service")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Directory the stage layout is resolved against. Default: `.`
    pub base_dir: PathBuf,

    /// Contract number piped to the mapping tool's stdin.
    pub contract_number: String,

    /// Base URL of the document-generation service, without a trailing
    /// slash. The upload, render and stamp endpoint paths are fixed
    /// relative to it.
    pub service_url: String,

    /// Stage directory layout under `base_dir`.
    pub layout: StageLayout,

    /// Contract-mapping generator invocation. Receives the contract
    /// number on stdin and writes `output/output.json` in its directory.
    pub mapping_tool: ToolCommand,

    /// Letter-data merger invocation.
    pub merge_tool: ToolCommand,

    /// Optional compile step for the script-resolution evaluator.
    /// Skipped when `None` (pre-built evaluator).
    pub eval_compile_tool: Option<ToolCommand>,

    /// Script-resolution evaluator invocation.
    pub eval_run_tool: ToolCommand,

    /// Template file name, expected in the render input directory and
    /// used as the `templateName` query parameter of the render call.
    pub template_name: String,

    /// Barcode image file name, expected in the render input directory.
    pub barcode_name: String,

    /// Stamp placement per page.
    pub stamp: StampGeometry,

    /// Per-request HTTP timeout in seconds. Default: 300.
    ///
    /// Generous on purpose: rendering a large template can take minutes,
    /// but a hung service must eventually surface as an error rather
    /// than hang the run forever.
    pub http_timeout_secs: u64,

    /// Observer notified of step and stamping progress. Not part of the
    /// run contract — purely informational.
    pub observer: Option<ObserverHandle>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            contract_number: String::new(),
            service_url: String::new(),
            layout: StageLayout::default(),
            mapping_tool: ToolCommand::new("python3").arg("mapping.py"),
            merge_tool: ToolCommand::new("python3").arg("merge_letterdata.py"),
            eval_compile_tool: None,
            eval_run_tool: ToolCommand::new("./run-evaluator.sh"),
            template_name: "letter-template.docx".to_string(),
            barcode_name: "barcode.jpg".to_string(),
            stamp: StampGeometry::default(),
            http_timeout_secs: 300,
            observer: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("base_dir", &self.base_dir)
            .field("contract_number", &self.contract_number)
            .field("service_url", &self.service_url)
            .field("layout", &self.layout)
            .field("mapping_tool", &self.mapping_tool)
            .field("merge_tool", &self.merge_tool)
            .field("eval_compile_tool", &self.eval_compile_tool)
            .field("eval_run_tool", &self.eval_run_tool)
            .field("template_name", &self.template_name)
            .field("barcode_name", &self.barcode_name)
            .field("stamp", &self.stamp)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn PipelineObserver>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve a layout-relative directory against the base directory.
    pub fn dir(&self, rel: &Path) -> PathBuf {
        if rel.is_absolute() {
            rel.to_path_buf()
        } else {
            self.base_dir.join(rel)
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_dir = dir.into();
        self
    }

    pub fn contract_number(mut self, n: impl Into<String>) -> Self {
        self.config.contract_number = n.into();
        self
    }

    pub fn service_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.config.service_url = url.trim_end_matches('/').to_string();
        self
    }

    pub fn layout(mut self, layout: StageLayout) -> Self {
        self.config.layout = layout;
        self
    }

    pub fn mapping_tool(mut self, cmd: ToolCommand) -> Self {
        self.config.mapping_tool = cmd;
        self
    }

    pub fn merge_tool(mut self, cmd: ToolCommand) -> Self {
        self.config.merge_tool = cmd;
        self
    }

    pub fn eval_compile_tool(mut self, cmd: ToolCommand) -> Self {
        self.config.eval_compile_tool = Some(cmd);
        self
    }

    pub fn eval_run_tool(mut self, cmd: ToolCommand) -> Self {
        self.config.eval_run_tool = cmd;
        self
    }

    pub fn template_name(mut self, name: impl Into<String>) -> Self {
        self.config.template_name = name.into();
        self
    }

    pub fn barcode_name(mut self, name: impl Into<String>) -> Self {
        self.config.barcode_name = name.into();
        self
    }

    pub fn stamp(mut self, geometry: StampGeometry) -> Self {
        self.config.stamp = geometry;
        self
    }

    pub fn http_timeout_secs(mut self, secs: u64) -> Self {
        self.config.http_timeout_secs = secs.max(1);
        self
    }

    pub fn observer(mut self, observer: ObserverHandle) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, PipelineError> {
        let c = &self.config;
        if c.contract_number.trim().is_empty() {
            return Err(PipelineError::InvalidConfig(
                "contract number must not be empty".into(),
            ));
        }
        if c.contract_number.chars().any(char::is_whitespace) {
            return Err(PipelineError::InvalidConfig(format!(
                "contract number must not contain whitespace, got '{}'",
                c.contract_number
            )));
        }
        if !c.service_url.starts_with("http://") && !c.service_url.starts_with("https://") {
            return Err(PipelineError::InvalidConfig(format!(
                "service URL must be http(s), got '{}'",
                c.service_url
            )));
        }
        if c.stamp.width <= 0.0 || c.stamp.height <= 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "stamp width/height must be positive, got {}x{}",
                c.stamp.width, c.stamp.height
            )));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PipelineConfigBuilder {
        PipelineConfig::builder()
            .contract_number("381034")
            .service_url("http://localhost:8080/pdfgeneration-service")
    }

    #[test]
    fn builder_accepts_valid_config() {
        let c = valid().build().unwrap();
        assert_eq!(c.contract_number, "381034");
        assert_eq!(c.stamp, StampGeometry::default());
    }

    #[test]
    fn empty_contract_number_rejected() {
        let err = PipelineConfig::builder()
            .service_url("http://svc")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("contract number"));
    }

    #[test]
    fn non_http_service_url_rejected() {
        let err = PipelineConfig::builder()
            .contract_number("1")
            .service_url("ftp://svc")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn service_url_trailing_slash_stripped() {
        let c = valid().service_url("http://svc/").build().unwrap();
        assert_eq!(c.service_url, "http://svc");
    }

    #[test]
    fn zero_stamp_size_rejected() {
        let geometry = StampGeometry {
            width: 0.0,
            ..StampGeometry::default()
        };
        let err = valid().stamp(geometry).build().unwrap_err();
        assert!(err.to_string().contains("stamp"));
    }

    #[test]
    fn dir_resolves_relative_against_base() {
        let c = valid().base_dir("/data/letters").build().unwrap();
        assert_eq!(
            c.dir(&c.layout.mapping_dir),
            PathBuf::from("/data/letters/mapping")
        );
        assert_eq!(c.dir(Path::new("/abs")), PathBuf::from("/abs"));
    }

    #[test]
    fn units_and_anchor_render_as_query_values() {
        assert_eq!(Units::Mm.as_str(), "mm");
        assert_eq!(Anchor::TopLeft.as_str(), "top-left");
        assert_eq!(Anchor::BottomRight.as_str(), "bottom-right");
    }
}
