//! Document-generation service client.
//!
//! Three endpoints are consumed, all multipart POSTs:
//!
//! * `POST {base}/storage/docxs` — upload the template (`file` field)
//! * `POST {base}/docx/render-to-pdf?templateName=…` — render the stage
//!   file (`json` field) against the uploaded template; the response
//!   body is the produced PDF
//! * `POST {base}/pdf/stamp-image?x=…&page=…` — stamp an image onto one
//!   page (`pdf` + `image` fields); the response body is the stamped PDF
//!
//! Success is `status.is_success()`; any other status is fatal to the
//! run. The service is a collaborator, not part of this crate — nothing
//! here interprets the documents it returns.

use crate::config::StampGeometry;
use crate::error::PipelineError;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

const UPLOAD_PATH: &str = "/storage/docxs";
const RENDER_PATH: &str = "/docx/render-to-pdf";
const STAMP_PATH: &str = "/pdf/stamp-image";

/// Blocking-style client for the document-generation service.
///
/// One client per run; connections are reused across the render call and
/// the per-page stamp calls.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: reqwest::Client,
    base_url: String,
}

impl ServiceClient {
    /// Build a client with the run-wide request timeout.
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, PipelineError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PipelineError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload the template document to the storage endpoint.
    pub async fn upload_document(&self, file: &Path) -> Result<(), PipelineError> {
        let url = self.endpoint(UPLOAD_PATH);
        info!(file = %file.display(), url = %url, "uploading template");

        let part = file_part(file).await?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport("upload-document", &url, e))?;

        check_status("upload-document", &url, &response)?;
        Ok(())
    }

    /// Render the stage file against the named template; write the PDF
    /// response body to `output`, creating parent directories as needed.
    pub async fn render_to_document(
        &self,
        stage_file: &Path,
        template_name: &str,
        output: &Path,
    ) -> Result<(), PipelineError> {
        let url = self.endpoint(RENDER_PATH);
        info!(template = template_name, url = %url, "rendering document");

        let json = tokio::fs::read_to_string(stage_file).await.map_err(|_| {
            PipelineError::MissingSource {
                path: stage_file.to_path_buf(),
            }
        })?;
        let form = Form::new().text("json", json);

        let response = self
            .http
            .post(&url)
            .query(&[("templateName", template_name)])
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport("render-to-document", &url, e))?;

        check_status("render-to-document", &url, &response)?;

        let body = response
            .bytes()
            .await
            .map_err(|e| transport("render-to-document", &url, e))?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| PipelineError::ResponseWrite {
                    path: output.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(output, &body)
            .await
            .map_err(|source| PipelineError::ResponseWrite {
                path: output.to_path_buf(),
                source,
            })?;

        info!(output = %output.display(), bytes = body.len(), "document rendered");
        Ok(())
    }

    /// Stamp `image` onto one page of `pdf`; returns the stamped PDF bytes.
    pub async fn stamp_image(
        &self,
        pdf: &Path,
        image: &Path,
        geometry: &StampGeometry,
        page: u32,
    ) -> Result<Vec<u8>, PipelineError> {
        let url = self.endpoint(STAMP_PATH);
        debug!(page, url = %url, "stamping page");

        let form = Form::new()
            .part("pdf", file_part(pdf).await?)
            .part("image", file_part(image).await?);

        let response = self
            .http
            .post(&url)
            .query(&stamp_query(geometry, page))
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport("stamp-image", &url, e))?;

        check_status("stamp-image", &url, &response)?;

        let body = response
            .bytes()
            .await
            .map_err(|e| transport("stamp-image", &url, e))?;
        Ok(body.to_vec())
    }
}

/// Query parameters of the stamp call, in the order the service
/// documents them.
fn stamp_query(g: &StampGeometry, page: u32) -> Vec<(&'static str, String)> {
    vec![
        ("x", g.x.to_string()),
        ("y", g.y.to_string()),
        ("width", g.width.to_string()),
        ("height", g.height.to_string()),
        ("units", g.units.as_str().to_string()),
        ("anchor", g.anchor.as_str().to_string()),
        ("page", page.to_string()),
    ]
}

/// Read a file into a multipart part carrying its original file name.
async fn file_part(path: &Path) -> Result<Part, PipelineError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|_| PipelineError::MissingSource {
            path: path.to_path_buf(),
        })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    Ok(Part::bytes(bytes).file_name(name))
}

fn transport(operation: &'static str, url: &str, e: reqwest::Error) -> PipelineError {
    PipelineError::HttpTransport {
        operation,
        url: url.to_string(),
        reason: e.to_string(),
    }
}

fn check_status(
    operation: &'static str,
    url: &str,
    response: &reqwest::Response,
) -> Result<(), PipelineError> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(PipelineError::HttpStatus {
            operation,
            url: url.to_string(),
            status: status.as_u16(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Anchor, Units};

    #[test]
    fn endpoints_join_without_double_slash() {
        let client = ServiceClient::new("http://svc/pdfgeneration-service/", 30).unwrap();
        assert_eq!(
            client.endpoint(UPLOAD_PATH),
            "http://svc/pdfgeneration-service/storage/docxs"
        );
        assert_eq!(
            client.endpoint(STAMP_PATH),
            "http://svc/pdfgeneration-service/pdf/stamp-image"
        );
    }

    #[test]
    fn stamp_query_matches_service_contract() {
        let g = StampGeometry {
            x: 204.0,
            y: 220.8,
            width: 6.4,
            height: 45.2,
            units: Units::Mm,
            anchor: Anchor::TopLeft,
        };
        let q = stamp_query(&g, 3);
        assert_eq!(
            q,
            vec![
                ("x", "204".to_string()),
                ("y", "220.8".to_string()),
                ("width", "6.4".to_string()),
                ("height", "45.2".to_string()),
                ("units", "mm".to_string()),
                ("anchor", "top-left".to_string()),
                ("page", "3".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn file_part_missing_file_is_missing_source() {
        let err = file_part(Path::new("/no/such/template.docx"))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingSource { .. }));
    }
}
