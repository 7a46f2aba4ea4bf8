//! Error types for the packet2json library.
//!
//! Three error types reflect three failure scopes:
//!
//! * [`PacketError`] — **Fatal**: the document cannot be processed at all
//!   (missing file, unreadable PDF, empty text, bad configuration). Returned
//!   as `Err(PacketError)` from the top-level `extract*` functions.
//!
//! * [`SkipReason`] — **Non-fatal, per block**: one question block could not
//!   be turned into a record (unknown category, missing answer letter, too few
//!   options). Stored inside [`crate::output::Diagnostic`] so the rest of the
//!   packet still comes through.
//!
//! * [`DocumentError`] — **Non-fatal, per document** inside a batch: one
//!   packet failed but the other packets in the batch are unaffected.

use crate::output::{QuestionStyle, QuestionType};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the packet2json library.
///
/// Block-level failures use [`SkipReason`] and are stored in the
/// [`crate::output::ExtractionReport`] rather than propagated here.
#[derive(Debug, Error)]
pub enum PacketError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Packet file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file is neither a PDF nor UTF-8 text.
    #[error("Unsupported document '{path}': not a PDF and not UTF-8 text\nFirst bytes: {magic:?}")]
    UnsupportedDocument { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Page selection does not match any page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// The text backend failed on a specific page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    // ── Pipeline preconditions ────────────────────────────────────────────
    /// The extraction backend produced no text at all.
    ///
    /// Usually a scanned packet without a text layer; this crate does not OCR.
    #[error("Document '{source_name}' has no extractable text\nScanned packets need OCR before extraction.")]
    EmptyDocument { source_name: String },

    /// The word-segmentation dictionary could not be read or parsed.
    #[error("Failed to load segmentation dictionary '{path}': {detail}")]
    DictionaryLoad { path: PathBuf, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
PDF packets need the pdfium shared library. You can:\n\
  • Install libpdfium system-wide, or\n\
  • Set PDFIUM_LIB_PATH=/path/to/dir/containing/libpdfium, or\n\
  • Extract the text yourself and pass the .txt file instead.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single question block was dropped.
///
/// Every variant carries enough of the offending raw text to fix the source
/// packet by hand.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The category header did not match any known category.
    #[error("unknown category '{raw}'")]
    UnresolvedCategory { raw: String },

    /// The style header did not match any known question style.
    #[error("unknown question style '{raw}'")]
    UnresolvedStyle { raw: String },

    /// A multiple-choice answer contained no W/X/Y/Z letter.
    #[error("no option letter in multiple-choice answer '{raw}'")]
    UnresolvedAnswer { raw: String },

    /// Too few options were found for the question style.
    #[error("{style} question has {found} options, needs at least {required}")]
    MalformedOptions {
        style: QuestionStyle,
        found: usize,
        required: usize,
    },

    /// Nothing was left of the question text after option extraction.
    #[error("empty question text")]
    EmptyPrompt,

    /// The answer region was empty after footer removal.
    #[error("empty answer")]
    EmptyAnswer,
}

impl SkipReason {
    /// The raw token that caused the drop, if the reason carries one.
    pub fn offending_token(&self) -> Option<&str> {
        match self {
            SkipReason::UnresolvedCategory { raw }
            | SkipReason::UnresolvedStyle { raw }
            | SkipReason::UnresolvedAnswer { raw } => Some(raw),
            _ => None,
        }
    }
}

/// A non-fatal error for one document of a batch.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
#[error("{input}: {detail}")]
pub struct DocumentError {
    /// The input string as given by the caller.
    pub input: String,
    /// Rendered [`PacketError`] message.
    pub detail: String,
}

impl DocumentError {
    pub fn new(input: impl Into<String>, err: &PacketError) -> Self {
        Self {
            input: input.into(),
            detail: err.to_string(),
        }
    }
}

/// Convenience for the diagnostics channel.
pub(crate) fn describe_block(question_type: QuestionType, ordinal: u32) -> String {
    format!("{} {}", question_type.label(), ordinal)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_display() {
        let e = PacketError::EmptyDocument {
            source_name: "Round 1.pdf".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("Round 1.pdf"), "got: {msg}");
        assert!(msg.contains("OCR"));
    }

    #[test]
    fn dictionary_load_display() {
        let e = PacketError::DictionaryLoad {
            path: PathBuf::from("/tmp/unigrams.txt"),
            detail: "line 3: bad count".into(),
        };
        assert!(e.to_string().contains("unigrams.txt"));
        assert!(e.to_string().contains("line 3"));
    }

    #[test]
    fn malformed_options_display() {
        let e = SkipReason::MalformedOptions {
            style: QuestionStyle::MultipleChoice,
            found: 3,
            required: 4,
        };
        let msg = e.to_string();
        assert!(msg.contains("MULTIPLE_CHOICE"), "got: {msg}");
        assert!(msg.contains('3') && msg.contains('4'));
    }

    #[test]
    fn offending_token_is_exposed() {
        let e = SkipReason::UnresolvedCategory {
            raw: "ASTROLOGY".into(),
        };
        assert_eq!(e.offending_token(), Some("ASTROLOGY"));
        assert_eq!(SkipReason::EmptyPrompt.offending_token(), None);
    }

    #[test]
    fn skip_reason_serialises_with_kind_tag() {
        let e = SkipReason::UnresolvedStyle {
            raw: "Essay".into(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert_eq!(json, r#"{"kind":"unresolved_style","raw":"Essay"}"#);
    }

    #[test]
    fn block_description() {
        assert_eq!(describe_block(QuestionType::Tossup, 7), "TOSS-UP 7");
        assert_eq!(describe_block(QuestionType::Bonus, 2), "BONUS 2");
    }
}
