//! The page-stamping loop.
//!
//! Stamping is a sequential fold over page numbers with the working PDF
//! as the accumulator: page 1 is stamped into a new document, that
//! document replaces the working PDF, page 2 is stamped into *that*, and
//! so on. The service stamps exactly one page per call, so N pages cost
//! N round-trips and order matters.
//!
//! A failed call aborts immediately. Pages already stamped stay stamped —
//! there is no rollback, the partially-stamped document is simply left
//! on disk for inspection.
//!
//! The per-page operation sits behind [`PageStamper`] so the loop can be
//! exercised with a recording fake; the production implementation is
//! [`BarcodeStamper`], which calls the stamp-image endpoint.

use crate::config::StampGeometry;
use crate::error::PipelineError;
use crate::pipeline::http::ServiceClient;
use crate::progress::PipelineObserver;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// One page-stamping operation.
#[async_trait]
pub trait PageStamper: Send + Sync {
    /// Stamp page `page` (1-indexed) of the document at `pdf` and return
    /// the complete stamped document.
    async fn stamp_page(&self, pdf: &Path, page: u32) -> Result<Vec<u8>, PipelineError>;
}

/// Stamps the configured barcode image via the document-generation
/// service.
pub struct BarcodeStamper {
    client: ServiceClient,
    image: PathBuf,
    geometry: StampGeometry,
}

impl BarcodeStamper {
    pub fn new(client: ServiceClient, image: PathBuf, geometry: StampGeometry) -> Self {
        Self {
            client,
            image,
            geometry,
        }
    }
}

#[async_trait]
impl PageStamper for BarcodeStamper {
    async fn stamp_page(&self, pdf: &Path, page: u32) -> Result<Vec<u8>, PipelineError> {
        self.client
            .stamp_image(pdf, &self.image, &self.geometry, page)
            .await
    }
}

/// Stamp pages `1..=total_pages` of `pdf` in increasing order.
///
/// After each successful call the working PDF is replaced through a
/// sibling scratch file (write, then rename) so the document on disk is
/// always a complete PDF, never a half-written one. On failure the error
/// names the page and no further pages are attempted.
pub async fn stamp_all_pages(
    stamper: &dyn PageStamper,
    pdf: &Path,
    total_pages: u32,
    observer: Option<&dyn PipelineObserver>,
) -> Result<(), PipelineError> {
    let scratch = scratch_path(pdf);

    for page in 1..=total_pages {
        let stamped = stamper
            .stamp_page(pdf, page)
            .await
            .map_err(|e| PipelineError::StampFailed {
                page,
                total: total_pages,
                source: Box::new(e),
            })?;

        tokio::fs::write(&scratch, &stamped)
            .await
            .map_err(|source| PipelineError::ResponseWrite {
                path: scratch.clone(),
                source,
            })?;
        tokio::fs::rename(&scratch, pdf)
            .await
            .map_err(|source| PipelineError::RenameFailed {
                from: scratch.clone(),
                to: pdf.to_path_buf(),
                source,
            })?;

        info!(page, total_pages, "page stamped");
        if let Some(obs) = observer {
            obs.on_page_stamped(page, total_pages);
        }
    }

    Ok(())
}

/// Scratch file next to the working PDF, so the final rename stays on
/// one filesystem.
fn scratch_path(pdf: &Path) -> PathBuf {
    let mut name = pdf
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.pdf".to_string());
    name.push_str(".stamping");
    pdf.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records the page numbers and document contents it was called
    /// with; fails on a configured page.
    struct FakeStamper {
        calls: Mutex<Vec<(u32, Vec<u8>)>>,
        fail_on_page: Option<u32>,
    }

    impl FakeStamper {
        fn new(fail_on_page: Option<u32>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_on_page,
            }
        }
    }

    #[async_trait]
    impl PageStamper for FakeStamper {
        async fn stamp_page(&self, pdf: &Path, page: u32) -> Result<Vec<u8>, PipelineError> {
            let contents = std::fs::read(pdf).unwrap();
            self.calls.lock().unwrap().push((page, contents));
            if self.fail_on_page == Some(page) {
                return Err(PipelineError::HttpStatus {
                    operation: "stamp-image",
                    url: "http://svc/pdf/stamp-image".into(),
                    status: 500,
                });
            }
            Ok(format!("stamped-through-{page}").into_bytes())
        }
    }

    async fn working_pdf(dir: &TempDir) -> PathBuf {
        let pdf = dir.path().join("output.pdf");
        tokio::fs::write(&pdf, b"original").await.unwrap();
        pdf
    }

    #[tokio::test]
    async fn stamps_every_page_in_order() {
        let dir = TempDir::new().unwrap();
        let pdf = working_pdf(&dir).await;
        let stamper = FakeStamper::new(None);

        stamp_all_pages(&stamper, &pdf, 3, None).await.unwrap();

        let calls = stamper.calls.lock().unwrap();
        let pages: Vec<u32> = calls.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![1, 2, 3]);
        assert_eq!(
            tokio::fs::read(&pdf).await.unwrap(),
            b"stamped-through-3"
        );
    }

    #[tokio::test]
    async fn each_call_sees_the_previous_pages_output() {
        // The document is the accumulator: call k must receive the
        // output of call k-1, not the original render.
        let dir = TempDir::new().unwrap();
        let pdf = working_pdf(&dir).await;
        let stamper = FakeStamper::new(None);

        stamp_all_pages(&stamper, &pdf, 3, None).await.unwrap();

        let calls = stamper.calls.lock().unwrap();
        assert_eq!(calls[0].1, b"original");
        assert_eq!(calls[1].1, b"stamped-through-1");
        assert_eq!(calls[2].1, b"stamped-through-2");
    }

    #[tokio::test]
    async fn failure_aborts_without_attempting_later_pages() {
        let dir = TempDir::new().unwrap();
        let pdf = working_pdf(&dir).await;
        let stamper = FakeStamper::new(Some(2));

        let err = stamp_all_pages(&stamper, &pdf, 5, None).await.unwrap_err();

        match err {
            PipelineError::StampFailed { page, total, .. } => {
                assert_eq!(page, 2);
                assert_eq!(total, 5);
            }
            other => panic!("expected StampFailed, got {other:?}"),
        }
        let calls = stamper.calls.lock().unwrap();
        let pages: Vec<u32> = calls.iter().map(|(p, _)| *p).collect();
        assert_eq!(pages, vec![1, 2], "pages 3..5 must not be attempted");
        // Page 1's stamp survives the abort.
        assert_eq!(
            tokio::fs::read(&pdf).await.unwrap(),
            b"stamped-through-1"
        );
    }

    #[tokio::test]
    async fn zero_pages_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let pdf = working_pdf(&dir).await;
        let stamper = FakeStamper::new(None);

        stamp_all_pages(&stamper, &pdf, 0, None).await.unwrap();

        assert!(stamper.calls.lock().unwrap().is_empty());
        assert_eq!(tokio::fs::read(&pdf).await.unwrap(), b"original");
    }

    #[test]
    fn scratch_path_is_a_sibling() {
        let p = scratch_path(Path::new("/out/output.pdf"));
        assert_eq!(p, Path::new("/out/output.pdf.stamping"));
    }
}
