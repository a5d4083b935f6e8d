//! # pdfpipe
//!
//! Sequential pipeline runner for a document-generation flow: drive the
//! data-population tools, render the merged data to PDF, stamp a barcode
//! on every page.
//!
//! ## Why this crate?
//!
//! The flow spans three external programs and three HTTP endpoints, with
//! a JSON stage file handed between them by renames and copies. Run by
//! hand, a silent failure in the middle leaves a half-staged tree that
//! is miserable to diagnose. This crate makes the sequence explicit: a
//! fixed, ordered list of steps, each of which either completes or
//! aborts the whole run with a message naming the step that failed.
//!
//! ## Pipeline Overview
//!
//! ```text
//! contract number
//!  │
//!  ├─ 1. Mapping   contract-mapping tool  → output.json → input.json
//!  ├─ 2. Merge     letter-data merger     → output.json → input.json
//!  ├─ 3. Resolve   script evaluator       → output.json → input.json
//!  ├─ 4. Upload    template → storage endpoint
//!  ├─ 5. Render    stage file → render endpoint → output.pdf
//!  ├─ 6. Count     page-count resolver (4 fallback strategies)
//!  └─ 7. Stamp     barcode onto pages 1..N, one call per page
//! ```
//!
//! Everything runs strictly in sequence; the first failure is fatal. No
//! step is retried and no partial work is rolled back.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdfpipe::{run_pipeline, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .base_dir("/data/letters")
//!         .contract_number("381034")
//!         .service_url("https://platform.example.com/pdfgeneration-service")
//!         .build()?;
//!     let report = run_pipeline(&config).await?;
//!     eprintln!(
//!         "stamped {} pages in {}ms → {}",
//!         report.stamped_pages,
//!         report.total_duration_ms,
//!         report.output_pdf.display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfpipe` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdfpipe = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod runner;
pub mod step;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    Anchor, PipelineConfig, PipelineConfigBuilder, StageLayout, StampGeometry, ToolCommand, Units,
};
pub use error::PipelineError;
pub use pipeline::http::ServiceClient;
pub use pipeline::pagecount::resolve as resolve_page_count;
pub use pipeline::stamp::{stamp_all_pages, BarcodeStamper, PageStamper};
pub use progress::{NoopObserver, ObserverHandle, PipelineObserver};
pub use report::{RunReport, StepReport};
pub use runner::{plan_steps, run_pipeline, run_steps};
pub use step::{HttpCall, Step, StepKind, StepOp};
