//! Page-count resolution: how many pages does the rendered PDF have?
//!
//! The stamping loop needs an exact page count, but no single source of
//! truth is available on every machine. Four strategies are tried in
//! decreasing order of reliability; the first to produce a positive
//! count wins:
//!
//! 1. Spotlight metadata (`mdls -name kMDItemNumberOfPages`) — macOS only
//! 2. `pdfinfo` (poppler) — exact, when installed
//! 3. Raw byte markers — count `/Type /Page` minus `/Type /Pages`
//! 4. The first `/Count <n>` entry in a Latin-1 decoding of the bytes
//!
//! Every strategy is allowed to fail — missing binary, unreadable file,
//! no match — and each failure means "ask the next one", never an error.
//! The resolver's only failure mode is `None`, which the caller
//! escalates to [`crate::error::PipelineError::PageCountUnavailable`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, trace};

static RE_SPOTLIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"kMDItemNumberOfPages\s*=\s*(\d+)").unwrap());
static RE_PDFINFO: Lazy<Regex> = Lazy::new(|| Regex::new(r"Pages:\s*(\d+)").unwrap());
static RE_COUNT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/Count\s+(\d+)").unwrap());

/// Resolve the page count of the PDF at `path`.
///
/// Returns `None` only when every strategy is exhausted. Never errors:
/// strategy failures of any kind are absorbed.
pub async fn resolve(path: &Path) -> Option<u32> {
    if let Some(n) = from_spotlight(path).await {
        debug!(pages = n, "page count from Spotlight metadata");
        return Some(n);
    }
    if let Some(n) = from_pdfinfo(path).await {
        debug!(pages = n, "page count from pdfinfo");
        return Some(n);
    }

    let bytes = tokio::fs::read(path).await.ok()?;
    if let Some(n) = from_page_markers(&bytes) {
        debug!(pages = n, "page count from byte markers (approximate)");
        return Some(n);
    }
    if let Some(n) = from_count_entry(&bytes) {
        debug!(pages = n, "page count from /Count fallback");
        return Some(n);
    }

    trace!(path = %path.display(), "all page-count strategies exhausted");
    None
}

/// Strategy 1: query the platform file-metadata index.
///
/// `mdls` prints `kMDItemNumberOfPages = 5` for an indexed PDF. On
/// non-macOS hosts the binary does not exist and the spawn failure is
/// the strategy's "no answer".
async fn from_spotlight(path: &Path) -> Option<u32> {
    let output = Command::new("mdls")
        .args(["-name", "kMDItemNumberOfPages"])
        .arg(path)
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    parse_first_capture(&RE_SPOTLIGHT, &String::from_utf8_lossy(&output.stdout))
}

/// Strategy 2: ask poppler's `pdfinfo`, which prints `Pages: 5`.
async fn from_pdfinfo(path: &Path) -> Option<u32> {
    let output = Command::new("pdfinfo").arg(path).output().await.ok()?;
    if !output.status.success() {
        return None;
    }
    parse_first_capture(&RE_PDFINFO, &String::from_utf8_lossy(&output.stdout))
}

/// Strategy 3: count page-object markers in the raw bytes.
///
/// `/Type /Page` matches both page objects and the `/Type /Pages`
/// collection nodes (prefix match), so the collection count is
/// subtracted when that leaves a positive number; otherwise the raw
/// count is used. Approximate by construction: nested or indirect page
/// trees can make it over- or under-count. That inaccuracy is a known
/// limitation of the strategy, accepted because it only runs when both
/// exact sources are unavailable.
pub(crate) fn from_page_markers(bytes: &[u8]) -> Option<u32> {
    let page_objects = count_occurrences(bytes, b"/Type /Page");
    let page_trees = count_occurrences(bytes, b"/Type /Pages");
    let n = if page_objects > page_trees {
        page_objects - page_trees
    } else {
        page_objects
    };
    (n > 0).then_some(n)
}

/// Strategy 4: find the first `/Count <n>` entry.
///
/// The bytes are widened Latin-1 style (one char per byte), so decoding
/// can never fail regardless of what binary streams the file contains.
pub(crate) fn from_count_entry(bytes: &[u8]) -> Option<u32> {
    let text: String = bytes.iter().map(|&b| b as char).collect();
    parse_first_capture(&RE_COUNT, &text)
}

/// First capture group of the first match, parsed as a positive integer.
fn parse_first_capture(re: &Regex, text: &str) -> Option<u32> {
    let n: u32 = re.captures(text)?.get(1)?.as_str().parse().ok()?;
    (n > 0).then_some(n)
}

/// Non-overlapping occurrences of `needle` in `haystack`.
fn count_occurrences(haystack: &[u8], needle: &[u8]) -> u32 {
    if needle.is_empty() {
        return 0;
    }
    let mut count = 0u32;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            count += 1;
            i += needle.len();
        } else {
            i += 1;
        }
    }
    count
}
