//! Progress-callback trait for per-document extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the batch entry points work through their inputs. Single
//! document calls report a batch of one.
//!
//! # Example
//!
//! ```rust
//! use packet2json::{ExtractionProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     records: Arc<AtomicUsize>,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_document_complete(&self, _index: usize, _total: usize, records: usize) {
//!         self.records.fetch_add(records, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     records: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExtractionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the extraction entry points as documents are processed.
///
/// Implementations must be `Send + Sync`: documents of a batch run
/// concurrently, so `on_document_*` may be called from several threads at
/// once. All methods default to no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once before any document is opened.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called when work on a document begins.
    ///
    /// # Arguments
    /// * `index` — 0-based position of the document in the input list
    /// * `total` — number of documents in the batch
    /// * `input` — the path or URL as given
    fn on_document_start(&self, index: usize, total: usize, input: &str) {
        let _ = (index, total, input);
    }

    /// Called when a document produced a report.
    ///
    /// `records` is the number of question records emitted.
    fn on_document_complete(&self, index: usize, total: usize, records: usize) {
        let _ = (index, total, records);
    }

    /// Called when a document failed with a fatal error.
    fn on_document_error(&self, index: usize, total: usize, error: &str) {
        let _ = (index, total, error);
    }

    /// Called once after every document was attempted.
    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let _ = (total_documents, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
