//! Run entry point: plan the fixed step list, execute it, stamp.
//!
//! A run has three phases, all strictly sequential:
//!
//! 1. **Steps** — the fixed list produced by [`plan_steps`]: drive the
//!    three data-population tools, move the stage file between them,
//!    upload the template, render the PDF.
//! 2. **Page count** — resolve how many pages the render produced; an
//!    undeterminable count is fatal because stamping cannot proceed.
//! 3. **Stamping** — one stamp call per page, in order, replacing the
//!    working PDF each time.
//!
//! The first failure anywhere aborts the run with an error naming the
//! step (or page) that failed. Nothing is retried, nothing is rolled
//! back.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::http::ServiceClient;
use crate::pipeline::process::ProcessSpec;
use crate::pipeline::{pagecount, stamp};
use crate::progress::PipelineObserver;
use crate::report::{RunReport, StepReport};
use crate::step::{HttpCall, Step, StepOp};
use std::time::Instant;
use tracing::{debug, info};

/// Stage file name from the producer's point of view.
const STAGE_PRODUCED: &str = "output.json";
/// Stage file name from the consumer's point of view.
const STAGE_CONSUMED: &str = "input.json";
/// The rendered (and then stamped, in place) document.
const OUTPUT_PDF: &str = "output.pdf";

/// Expand the configuration into the fixed ordered step list.
///
/// Pure: no filesystem access, no validation beyond what the config
/// builder already did. Kept separate from execution so tests can assert
/// the plan itself.
pub fn plan_steps(config: &PipelineConfig) -> Vec<Step> {
    let mapping_dir = config.dir(&config.layout.mapping_dir);
    let merge_dir = config.dir(&config.layout.merge_dir);
    let resolve_dir = config.dir(&config.layout.resolve_dir);
    let render_input = config.dir(&config.layout.render_input_dir);
    let render_output = config.dir(&config.layout.render_output_dir);

    let mut steps = Vec::with_capacity(12);

    // ── Mapping stage ────────────────────────────────────────────────────
    steps.push(Step::new(
        "run contract-mapping tool",
        StepOp::Invoke(
            ProcessSpec::from_tool(&config.mapping_tool, &config.base_dir, &mapping_dir)
                .stdin_text(config.contract_number.clone()),
        ),
    ));
    steps.push(Step::new(
        "rename mapping output",
        StepOp::Rename {
            from: mapping_dir.join("output").join(STAGE_PRODUCED),
            to: mapping_dir.join("output").join(STAGE_CONSUMED),
        },
    ));
    steps.push(Step::new(
        "stage mapping output into merge input",
        StepOp::Copy {
            from: mapping_dir.join("output").join(STAGE_CONSUMED),
            to: merge_dir.join("input").join(STAGE_CONSUMED),
        },
    ));

    // ── Merge stage ──────────────────────────────────────────────────────
    steps.push(Step::new(
        "run letter-data merger",
        StepOp::Invoke(ProcessSpec::from_tool(
            &config.merge_tool,
            &config.base_dir,
            &merge_dir,
        )),
    ));
    steps.push(Step::new(
        "rename merge output",
        StepOp::Rename {
            from: merge_dir.join("output").join(STAGE_PRODUCED),
            to: merge_dir.join("output").join(STAGE_CONSUMED),
        },
    ));
    steps.push(Step::new(
        "stage merge output into resolver input",
        StepOp::Copy {
            from: merge_dir.join("output").join(STAGE_CONSUMED),
            to: resolve_dir.join("input").join(STAGE_CONSUMED),
        },
    ));

    // ── Script-resolution stage ──────────────────────────────────────────
    if let Some(compile) = &config.eval_compile_tool {
        steps.push(Step::new(
            "compile script-resolution evaluator",
            StepOp::Invoke(ProcessSpec::from_tool(
                compile,
                &config.base_dir,
                &resolve_dir,
            )),
        ));
    }
    steps.push(Step::new(
        "run script-resolution evaluator",
        StepOp::Invoke(ProcessSpec::from_tool(
            &config.eval_run_tool,
            &config.base_dir,
            &resolve_dir,
        )),
    ));
    steps.push(Step::new(
        "rename resolver output",
        StepOp::Rename {
            from: resolve_dir.join("output").join(STAGE_PRODUCED),
            to: resolve_dir.join("output").join(STAGE_CONSUMED),
        },
    ));
    steps.push(Step::new(
        "stage resolver output into render input",
        StepOp::Copy {
            from: resolve_dir.join("output").join(STAGE_CONSUMED),
            to: render_input.join(STAGE_CONSUMED),
        },
    ));

    // ── Render stage ─────────────────────────────────────────────────────
    steps.push(Step::new(
        "upload template document",
        StepOp::Call(HttpCall::UploadTemplate {
            file: render_input.join(&config.template_name),
        }),
    ));
    steps.push(Step::new(
        "render document",
        StepOp::Call(HttpCall::RenderDocument {
            stage_file: render_input.join(STAGE_CONSUMED),
            template_name: config.template_name.clone(),
            output: render_output.join(OUTPUT_PDF),
        }),
    ));

    steps
}

/// Execute steps in order, stopping at the first failure.
///
/// Returns one [`StepReport`] per completed step. The error of a failed
/// step is wrapped with the step's label; steps after the failure are
/// not executed.
pub async fn run_steps(
    steps: &[Step],
    client: &ServiceClient,
    observer: Option<&dyn PipelineObserver>,
) -> Result<Vec<StepReport>, PipelineError> {
    let total = steps.len();
    let mut reports = Vec::with_capacity(total);

    for (index, step) in steps.iter().enumerate() {
        if let Some(obs) = observer {
            obs.on_step_start(index, total, &step.label);
        }
        let start = Instant::now();

        match step.execute(client).await {
            Ok(()) => {
                let duration_ms = start.elapsed().as_millis() as u64;
                debug!(step = %step.label, duration_ms, "step complete");
                if let Some(obs) = observer {
                    obs.on_step_complete(index, total, &step.label, duration_ms);
                }
                reports.push(StepReport {
                    label: step.label.clone(),
                    kind: step.kind(),
                    duration_ms,
                });
            }
            Err(e) => {
                if let Some(obs) = observer {
                    obs.on_step_failed(index, total, &step.label, &e.to_string());
                }
                return Err(e.at_step(&step.label));
            }
        }
    }

    Ok(reports)
}

/// Run the whole pipeline: steps, page count, stamping.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Any step failure, an undeterminable page count, or a failed stamp
/// call. All are fatal; the run stops where the failure happened.
pub async fn run_pipeline(config: &PipelineConfig) -> Result<RunReport, PipelineError> {
    let total_start = Instant::now();
    info!(contract = %config.contract_number, "starting pipeline run");

    let client = ServiceClient::new(&config.service_url, config.http_timeout_secs)?;
    let steps = plan_steps(config);
    let observer = config.observer.as_deref();

    if let Some(obs) = observer {
        obs.on_run_start(steps.len());
    }

    // ── Phase 1: the fixed step list ─────────────────────────────────────
    let step_reports = run_steps(&steps, &client, observer).await?;

    // ── Phase 2: page count ──────────────────────────────────────────────
    let render_input = config.dir(&config.layout.render_input_dir);
    let output_pdf = config.dir(&config.layout.render_output_dir).join(OUTPUT_PDF);

    let page_count = pagecount::resolve(&output_pdf)
        .await
        .ok_or_else(|| PipelineError::PageCountUnavailable {
            path: output_pdf.clone(),
        })?;
    info!(pages = page_count, "document rendered");

    // ── Phase 3: stamp every page ────────────────────────────────────────
    if let Some(obs) = observer {
        obs.on_stamp_start(page_count);
    }
    let stamper = stamp::BarcodeStamper::new(
        client,
        render_input.join(&config.barcode_name),
        config.stamp.clone(),
    );
    stamp::stamp_all_pages(&stamper, &output_pdf, page_count, observer).await?;

    let total_duration_ms = total_start.elapsed().as_millis() as u64;
    info!(
        pages = page_count,
        total_duration_ms, "pipeline run complete"
    );

    Ok(RunReport {
        steps: step_reports,
        page_count,
        stamped_pages: page_count,
        stage_file: render_input.join(STAGE_CONSUMED),
        output_pdf,
        total_duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::StepKind;

    fn config() -> PipelineConfig {
        PipelineConfig::builder()
            .base_dir("/work")
            .contract_number("381034")
            .service_url("http://svc/pdfgeneration-service")
            .build()
            .unwrap()
    }

    #[test]
    fn plan_has_the_fixed_order() {
        let steps = plan_steps(&config());
        let labels: Vec<&str> = steps.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "run contract-mapping tool",
                "rename mapping output",
                "stage mapping output into merge input",
                "run letter-data merger",
                "rename merge output",
                "stage merge output into resolver input",
                "run script-resolution evaluator",
                "rename resolver output",
                "stage resolver output into render input",
                "upload template document",
                "render document",
            ]
        );
    }

    #[test]
    fn plan_includes_compile_step_when_configured() {
        let cfg = PipelineConfig::builder()
            .base_dir("/work")
            .contract_number("381034")
            .service_url("http://svc")
            .eval_compile_tool(crate::config::ToolCommand::new("./mvnw").arg("compile"))
            .build()
            .unwrap();
        let steps = plan_steps(&cfg);
        assert_eq!(steps.len(), 12);
        assert_eq!(steps[6].label, "compile script-resolution evaluator");
        assert_eq!(steps[6].kind(), StepKind::Invoke);
    }

    #[test]
    fn plan_pipes_contract_number_to_mapping_tool() {
        let steps = plan_steps(&config());
        match &steps[0].op {
            StepOp::Invoke(spec) => {
                assert_eq!(spec.stdin_text.as_deref(), Some("381034"));
                assert_eq!(
                    spec.cwd.as_deref(),
                    Some(std::path::Path::new("/work/mapping"))
                );
            }
            other => panic!("expected Invoke, got {other:?}"),
        }
    }

    #[test]
    fn plan_threads_the_stage_file_between_stages() {
        let steps = plan_steps(&config());
        // The copy out of the mapping stage reads what the rename wrote.
        let renamed_to = match &steps[1].op {
            StepOp::Rename { to, .. } => to.clone(),
            other => panic!("expected Rename, got {other:?}"),
        };
        let copied_from = match &steps[2].op {
            StepOp::Copy { from, .. } => from.clone(),
            other => panic!("expected Copy, got {other:?}"),
        };
        assert_eq!(renamed_to, copied_from);
    }

    #[test]
    fn plan_renders_into_the_output_directory() {
        let steps = plan_steps(&config());
        match &steps.last().unwrap().op {
            StepOp::Call(HttpCall::RenderDocument { output, .. }) => {
                assert_eq!(
                    output,
                    std::path::Path::new("/work/render/output/output.pdf")
                );
            }
            other => panic!("expected RenderDocument, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_steps_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("after.txt");
        let steps = vec![
            Step::new(
                "fail early",
                StepOp::Invoke(ProcessSpec {
                    program: "/bin/sh".into(),
                    args: vec!["-c".into(), "exit 2".into()],
                    cwd: None,
                    stdin_text: None,
                }),
            ),
            Step::new(
                "never runs",
                StepOp::Invoke(ProcessSpec {
                    program: "/bin/sh".into(),
                    args: vec!["-c".into(), format!("touch {}", marker.display())],
                    cwd: None,
                    stdin_text: None,
                }),
            ),
        ];
        let client = ServiceClient::new("http://localhost:1", 1).unwrap();

        let err = run_steps(&steps, &client, None).await.unwrap_err();

        assert_eq!(err.step_label(), Some("fail early"));
        assert!(!marker.exists(), "the step after the failure must not run");
    }

    #[tokio::test]
    async fn run_steps_reports_each_completed_step() {
        let steps = vec![
            Step::new(
                "first",
                StepOp::Invoke(ProcessSpec {
                    program: "/bin/sh".into(),
                    args: vec!["-c".into(), "true".into()],
                    cwd: None,
                    stdin_text: None,
                }),
            ),
            Step::new(
                "second",
                StepOp::Invoke(ProcessSpec {
                    program: "/bin/sh".into(),
                    args: vec!["-c".into(), "true".into()],
                    cwd: None,
                    stdin_text: None,
                }),
            ),
        ];
        let client = ServiceClient::new("http://localhost:1", 1).unwrap();

        let reports = run_steps(&steps, &client, None).await.unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].label, "first");
        assert_eq!(reports[0].kind, StepKind::Invoke);
        assert_eq!(reports[1].label, "second");
    }
}
