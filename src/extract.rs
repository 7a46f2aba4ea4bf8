//! Eager (whole-document) extraction entry points.
//!
//! [`extract`] resolves one input, reads its text, runs the [`Pipeline`] and
//! returns the full [`ExtractionReport`]. For many packets at once use
//! [`crate::batch`], which shares one pipeline across documents and bounds
//! how many run at the same time.

use crate::config::ExtractionConfig;
use crate::error::PacketError;
use crate::output::{ExtractionReport, ExtractionStats};
use crate::pipeline::input::{self, DocumentKind};
use crate::pipeline::text::{self, PdfiumExtractor, PlainTextExtractor, TextExtractor};
use crate::pipeline::Pipeline;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Extract question records from a packet file or URL.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `input` — Local file path (PDF or UTF-8 text) or HTTP/HTTPS URL
/// * `config` — Extraction configuration
///
/// # Returns
/// `Ok(ExtractionReport)` even when some blocks were dropped (see
/// `report.diagnostics`) or no blocks were found (see `report.warnings`).
///
/// # Errors
/// Returns `Err(PacketError)` only for fatal errors:
/// - File not found / permission denied / download failure
/// - Neither a PDF nor UTF-8 text; corrupt or locked PDF
/// - No extractable text at all
pub async fn extract(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionReport, PacketError> {
    let input_str = input_str.as_ref();
    let pipeline = Arc::new(Pipeline::new(config)?);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(1);
        cb.on_document_start(0, 1, input_str);
    }

    let result = extract_with_pipeline(input_str, config, pipeline).await;

    if let Some(ref cb) = config.progress_callback {
        match &result {
            Ok(report) => cb.on_document_complete(0, 1, report.records.len()),
            Err(e) => cb.on_document_error(0, 1, &e.to_string()),
        }
        cb.on_batch_complete(1, usize::from(result.is_ok()));
    }

    result
}

/// The per-document work shared by [`extract`] and the batch entry points.
/// Fires no progress events.
pub(crate) async fn extract_with_pipeline(
    input_str: &str,
    config: &ExtractionConfig,
    pipeline: Arc<Pipeline>,
) -> Result<ExtractionReport, PacketError> {
    let total_start = Instant::now();
    info!("Starting extraction: {}", input_str);

    // ── Steps 1–3: Resolve input, pick the backend, read pages ───────────
    let text_start = Instant::now();
    let pages = read_pages(input_str, config).await?;
    let text_duration_ms = text_start.elapsed().as_millis() as u64;
    debug!("Extracted {} pages in {}ms", pages.len(), text_duration_ms);

    // ── Step 4: Run the text pipeline ────────────────────────────────────
    let source_name = input::display_name(input_str);
    let page_count = pages.len();
    let mut report = tokio::task::spawn_blocking(move || {
        pipeline.run(&text::join_pages(&pages), &source_name)
    })
    .await
    .map_err(|e| PacketError::Internal(format!("Pipeline task panicked: {}", e)))??;

    report.stats.total_pages = page_count;
    report.stats.text_duration_ms = text_duration_ms;
    report.stats.total_duration_ms = total_start.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: {} records from {} blocks ({} skipped), {}ms total",
        report.stats.records_emitted,
        report.stats.blocks_found,
        report.stats.blocks_skipped,
        report.stats.total_duration_ms
    );

    Ok(report)
}

/// Resolve `input_str` and read its selected pages on the blocking pool.
async fn read_pages(input_str: &str, config: &ExtractionConfig) -> Result<Vec<String>, PacketError> {
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let path = resolved.path().to_path_buf();
    let extractor = select_extractor(config, resolved.kind());
    let selection = config.pages.clone();

    let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&path, &selection))
        .await
        .map_err(|e| PacketError::Internal(format!("Text extraction task panicked: {}", e)))??;

    // `resolved` owns any download dir; it must outlive the backend call.
    drop(resolved);
    Ok(pages)
}

/// The normalised document text (footers stripped, spacing repaired) that
/// the block segmenter would see. Useful for debugging a packet that yields
/// fewer records than expected.
pub async fn document_text(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<String, PacketError> {
    let input_str = input_str.as_ref();
    let pipeline = Pipeline::new(config)?;
    let raw = text::join_pages(&read_pages(input_str, config).await?);
    if raw.trim().is_empty() {
        return Err(PacketError::EmptyDocument {
            source_name: input::display_name(input_str),
        });
    }
    tokio::task::spawn_blocking(move || pipeline.normalize(&raw))
        .await
        .map_err(|e| PacketError::Internal(format!("Normalisation task panicked: {}", e)))
}

/// Injected extractor first, then by sniffed document kind.
fn select_extractor(config: &ExtractionConfig, kind: DocumentKind) -> Arc<dyn TextExtractor> {
    if let Some(ref extractor) = config.extractor {
        return Arc::clone(extractor);
    }
    match kind {
        DocumentKind::Pdf => Arc::new(PdfiumExtractor::new(config.password.clone())),
        DocumentKind::Text => Arc::new(PlainTextExtractor),
    }
}

/// Extract a packet and write its records to `output_path` as a JSON array.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionStats, PacketError> {
    let report = extract(input_str, config).await?;
    write_json_atomic(output_path.as_ref(), &report.records).await?;
    Ok(report.stats)
}

/// Pretty-print `value` as JSON into `path` via a sibling temp file and a
/// rename. Parent directories are created.
pub async fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PacketError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| PacketError::Internal(format!("serialising output: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PacketError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, format!("{json}\n"))
        .await
        .map_err(|e| PacketError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| PacketError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally; do not call from inside an
/// async context.
pub fn extract_sync(
    input_str: impl AsRef<str>,
    config: &ExtractionConfig,
) -> Result<ExtractionReport, PacketError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| PacketError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(input_str, config))
}

/// Extract records from packet bytes in memory (PDF or UTF-8 text).
///
/// The bytes are written to a managed [`tempfile`] that is removed when this
/// call returns.
///
/// # Example
/// ```rust,no_run
/// use packet2json::{extract_from_bytes, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bytes: Vec<u8> = std::fs::read("Round 1.pdf")?;
/// let report = extract_from_bytes(&bytes, &ExtractionConfig::default()).await?;
/// println!("{} records", report.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionReport, PacketError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| PacketError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| PacketError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `extract` returns
    extract(&path, config).await
}
