//! # packet2json
//!
//! Turn quiz-bowl packet PDFs into structured question records.
//!
//! Packets are exported from word processors and read back through a PDF
//! text layer that routinely loses spaces ("WhatisDNA?"), glues page
//! footers into answers, and flattens the layout into one stream of
//! characters. This crate repairs the spacing, cuts the stream into
//! toss-up/bonus blocks, classifies each block, separates answer choices
//! from the question, and cleans the answer, producing records ready for a
//! question database.
//!
//! ## Pipeline Overview
//!
//! ```text
//! packet (PDF, text, or URL)
//!  │
//!  ├─ 1. Input     resolve local file or download from URL; sniff PDF vs text
//!  ├─ 2. Text      per-page text via pdfium (spawn_blocking) or form feeds
//!  ├─ 3. Footer    strip "… Round 3 Page 7" boilerplate
//!  ├─ 4. Spacing   ordered rule cascade, then dictionary word segmentation
//!  ├─ 5. Segment   TOSS-UP / BONUS blocks in document order
//!  ├─ 6. Classify  category, style, keyword override
//!  ├─ 7. Options   W)–Z) options or 1)–4) items, prompt
//!  └─ 8. Answer    footer leaks removed; MC answers reduced to W/X/Y/Z
//! ```
//!
//! Blocks that cannot become a valid record are dropped with a
//! [`Diagnostic`] and the rest of the packet still comes through.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use packet2json::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExtractionConfig::builder().source("MIT_2025").build()?;
//!     let report = extract("Round 1.pdf", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&report.records)?);
//!     for diag in &report.diagnostics {
//!         eprintln!("skipped {diag}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `packet2json` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! packet2json = { version = "0.1", default-features = false }
//! ```
//!
//! ## PDF backend
//!
//! PDF text comes from pdfium. Set `PDFIUM_LIB_PATH` to the directory that
//! holds `libpdfium`, or install it system-wide. Plain-text packets (for
//! example `pdftotext` output) need no native library.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{extract_batch, extract_stream, DocumentResult, DocumentStream};
pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, PageSelection, SpacingStrategy, DEFAULT_SOURCE,
};
pub use error::{DocumentError, PacketError, SkipReason};
pub use extract::{
    document_text, extract, extract_from_bytes, extract_sync, extract_to_file, write_json_atomic,
};
pub use output::{
    BlockOutcome, Category, Diagnostic, ExtractionReport, ExtractionStats, OptionLabel,
    QuestionRecord, QuestionStyle, QuestionType, RawQuestionBlock,
};
pub use pipeline::text::{PdfiumExtractor, PlainTextExtractor, TextExtractor};
pub use pipeline::wordseg::SegmentDictionary;
pub use pipeline::{extract_text, Pipeline};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
