//! Multi-document extraction: a packet set (one PDF per round) in one call.
//!
//! All documents share a single [`Pipeline`], so footer patterns are
//! compiled and the dictionary loaded once per batch. Up to
//! `config.concurrency` documents are in flight at a time.
//!
//! [`extract_stream`] yields each document as soon as it finishes
//! (completion order, tagged with its input index). [`extract_batch`] waits
//! for all of them and returns results in input order.

use crate::config::ExtractionConfig;
use crate::error::{DocumentError, PacketError};
use crate::extract::extract_with_pipeline;
use crate::output::ExtractionReport;
use crate::pipeline::Pipeline;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::Stream;
use tracing::{info, warn};

/// One finished document of a batch.
#[derive(Debug)]
pub struct DocumentResult {
    /// 0-based position in the caller's input list.
    pub index: usize,
    pub result: Result<ExtractionReport, DocumentError>,
}

/// A boxed stream of finished documents.
pub type DocumentStream = Pin<Box<dyn Stream<Item = DocumentResult> + Send>>;

/// Extract several packets, streaming each report as it completes.
///
/// A failing document becomes a [`DocumentError`] item; the rest of the
/// batch continues. Progress events fire per document, and
/// `on_batch_complete` fires once the stream is exhausted.
///
/// # Errors
/// Only configuration errors (bad footer regex, unreadable dictionary) are
/// fatal, since they would fail every document identically.
pub fn extract_stream<I, S>(
    inputs: I,
    config: &ExtractionConfig,
) -> Result<DocumentStream, PacketError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let inputs: Vec<String> = inputs.into_iter().map(Into::into).collect();
    let total = inputs.len();
    let pipeline = Arc::new(Pipeline::new(config)?);
    info!("Starting batch extraction of {} documents", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
        if total == 0 {
            cb.on_batch_complete(0, 0);
        }
    }

    let concurrency = config.concurrency;
    let config = config.clone();
    let done = Arc::new(AtomicUsize::new(0));
    let succeeded = Arc::new(AtomicUsize::new(0));

    let s = stream::iter(inputs.into_iter().enumerate().map(move |(index, input)| {
        let cfg = config.clone();
        let pipeline = Arc::clone(&pipeline);
        let done = Arc::clone(&done);
        let succeeded = Arc::clone(&succeeded);
        async move {
            if let Some(ref cb) = cfg.progress_callback {
                cb.on_document_start(index, total, &input);
            }

            let result = extract_with_pipeline(&input, &cfg, pipeline).await;

            let result = match result {
                Ok(report) => {
                    succeeded.fetch_add(1, Ordering::SeqCst);
                    if let Some(ref cb) = cfg.progress_callback {
                        cb.on_document_complete(index, total, report.records.len());
                    }
                    Ok(report)
                }
                Err(e) => {
                    warn!("Document {} failed: {}", input, e);
                    if let Some(ref cb) = cfg.progress_callback {
                        cb.on_document_error(index, total, &e.to_string());
                    }
                    Err(DocumentError::new(input, &e))
                }
            };

            if done.fetch_add(1, Ordering::SeqCst) + 1 == total {
                if let Some(ref cb) = cfg.progress_callback {
                    cb.on_batch_complete(total, succeeded.load(Ordering::SeqCst));
                }
            }

            DocumentResult { index, result }
        }
    }))
    .buffer_unordered(concurrency);

    Ok(Box::pin(s))
}

/// Extract several packets and return their results in input order.
pub async fn extract_batch<I, S>(
    inputs: I,
    config: &ExtractionConfig,
) -> Result<Vec<Result<ExtractionReport, DocumentError>>, PacketError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut results: Vec<DocumentResult> = extract_stream(inputs, config)?.collect().await;
    results.sort_by_key(|r| r.index);
    Ok(results.into_iter().map(|r| r.result).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::ExtractionProgressCallback;
    use std::io::Write;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl ExtractionProgressCallback for Recorder {
        fn on_batch_start(&self, total_documents: usize) {
            self.events.lock().unwrap().push(format!("start {total_documents}"));
        }
        fn on_document_error(&self, index: usize, _total: usize, _error: &str) {
            self.events.lock().unwrap().push(format!("error {index}"));
        }
        fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {success_count}/{total_documents}"));
        }
    }

    fn packet(ordinal: u32) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(
            tmp,
            "TOSS-UP\n{ordinal}) PHYSICS – Short Answer What is the SI unit of force? ANSWER: NEWTON"
        )
        .unwrap();
        tmp
    }

    #[tokio::test]
    async fn batch_keeps_input_order_and_isolates_failures() {
        let a = packet(1);
        let b = packet(2);
        let recorder = Arc::new(Recorder::default());
        let config = ExtractionConfig::builder()
            .concurrency(2)
            .progress_callback(recorder.clone())
            .build()
            .unwrap();

        let inputs = vec![
            a.path().to_string_lossy().to_string(),
            "/nonexistent/round.pdf".to_string(),
            b.path().to_string_lossy().to_string(),
        ];
        let results = extract_batch(inputs, &config).await.unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().records.len(), 1);
        let err = results[1].as_ref().unwrap_err();
        assert_eq!(err.input, "/nonexistent/round.pdf");
        assert!(err.detail.contains("not found"), "{}", err.detail);
        assert_eq!(results[2].as_ref().unwrap().records[0].correct_answer, "NEWTON");

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.first().map(String::as_str), Some("start 3"));
        assert!(events.contains(&"error 1".to_string()));
        assert_eq!(events.last().map(String::as_str), Some("done 2/3"));
    }

    #[tokio::test]
    async fn stream_tags_every_document() {
        let a = packet(3);
        let mut stream = extract_stream(
            vec![a.path().to_string_lossy().to_string(); 3],
            &ExtractionConfig::default(),
        )
        .unwrap();
        let mut seen = Vec::new();
        while let Some(doc) = stream.next().await {
            assert!(doc.result.is_ok());
            seen.push(doc.index);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn empty_batch() {
        let recorder = Arc::new(Recorder::default());
        let config = ExtractionConfig::builder()
            .progress_callback(recorder.clone())
            .build()
            .unwrap();
        let results = extract_batch(Vec::<String>::new(), &config).await.unwrap();
        assert!(results.is_empty());
        assert_eq!(*recorder.events.lock().unwrap(), vec!["start 0", "done 0/0"]);
    }

    #[test]
    fn bad_footer_pattern_fails_the_whole_batch() {
        let config = ExtractionConfig {
            extra_footer_patterns: vec!["(unclosed".into()],
            ..Default::default()
        };
        assert!(matches!(
            extract_stream(vec!["a.pdf"], &config),
            Err(PacketError::InvalidConfig(_))
        ));
    }
}
