//! Page-text extraction backends.
//!
//! The pipeline only needs per-page text; where it comes from is behind the
//! [`TextExtractor`] trait. Two backends ship with the crate:
//!
//! * [`PdfiumExtractor`] reads the text layer of a PDF through pdfium.
//! * [`PlainTextExtractor`] reads text that was already extracted by another
//!   tool (`pdftotext`, a copy-paste), with pages separated by form feeds.
//!
//! Both are blocking. The async entry points call them inside
//! `tokio::task::spawn_blocking`; pdfium in particular must never run on a
//! runtime worker thread.

use crate::config::PageSelection;
use crate::error::PacketError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable naming the directory that holds the pdfium library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Page separator used by `pdftotext` and most plain-text exports.
const FORM_FEED: char = '\x0c';

/// Pages are joined with a blank line before the pipeline sees them.
pub const PAGE_JOINER: &str = "\n\n";

/// A source of per-page text.
pub trait TextExtractor: Send + Sync {
    /// Text of the selected pages, in page order.
    ///
    /// # Errors
    /// Any fatal backend failure; an explicit page selection that matches
    /// nothing is [`PacketError::PageOutOfRange`].
    fn extract_pages(&self, path: &Path, pages: &PageSelection)
        -> Result<Vec<String>, PacketError>;
}

/// Join extracted pages into one document string.
pub fn join_pages(pages: &[String]) -> String {
    pages.join(PAGE_JOINER)
}

// ── pdfium ───────────────────────────────────────────────────────────────

/// Reads the PDF text layer via `pdfium-render`.
///
/// The library is bound on every call: from `library_path` if set, else from
/// `$PDFIUM_LIB_PATH`, else from the system library search path.
#[derive(Debug, Clone, Default)]
pub struct PdfiumExtractor {
    password: Option<String>,
    library_path: Option<PathBuf>,
}

impl PdfiumExtractor {
    pub fn new(password: Option<String>) -> Self {
        Self {
            password,
            library_path: None,
        }
    }

    /// Bind to the pdfium library in `dir` instead of the environment.
    pub fn with_library_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.library_path = Some(dir.into());
        self
    }

    fn bind(&self) -> Result<Pdfium, PacketError> {
        let dir = self
            .library_path
            .clone()
            .or_else(|| std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from));

        let bindings = match dir {
            Some(dir) => {
                debug!("Binding pdfium from {}", dir.display());
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
            }
            None => Pdfium::bind_to_system_library(),
        }
        .map_err(|e| PacketError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Pdfium::new(bindings))
    }
}

impl TextExtractor for PdfiumExtractor {
    fn extract_pages(
        &self,
        path: &Path,
        selection: &PageSelection,
    ) -> Result<Vec<String>, PacketError> {
        let pdfium = self.bind()?;
        let password = self.password.as_deref();

        let document = pdfium
            .load_pdf_from_file(path, password)
            .map_err(|e| load_error(path, password.is_some(), e))?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!("PDF loaded: {} pages", total_pages);

        let indices = selection.resolve(total_pages)?;
        let mut texts = Vec::with_capacity(indices.len());

        for idx in indices {
            let page = pages
                .get(idx as u16)
                .map_err(|e| PacketError::TextExtractionFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?;

            let text = page
                .text()
                .map_err(|e| PacketError::TextExtractionFailed {
                    page: idx + 1,
                    detail: format!("{:?}", e),
                })?
                .all();

            debug!("Extracted page {} → {} chars", idx + 1, text.len());
            texts.push(text);
        }

        Ok(texts)
    }
}

/// pdfium reports password problems through its generic error type; the
/// debug rendering is the only stable place the kind shows up.
fn load_error(path: &Path, had_password: bool, e: PdfiumError) -> PacketError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if had_password {
            PacketError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            PacketError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        PacketError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

// ── Plain text ───────────────────────────────────────────────────────────

/// Reads UTF-8 text, one page per form-feed separated chunk.
///
/// A file without form feeds is a single page.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl PlainTextExtractor {
    /// Split already-loaded text into its selected pages.
    pub fn split_pages(text: &str, selection: &PageSelection) -> Result<Vec<String>, PacketError> {
        let mut pages: Vec<&str> = text.split(FORM_FEED).collect();
        // `pdftotext` ends every page with a form feed, leaving an empty tail.
        if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
            pages.pop();
        }

        let indices = selection.resolve(pages.len())?;
        Ok(indices.into_iter().map(|i| pages[i].to_string()).collect())
    }
}

impl TextExtractor for PlainTextExtractor {
    fn extract_pages(
        &self,
        path: &Path,
        selection: &PageSelection,
    ) -> Result<Vec<String>, PacketError> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PacketError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => PacketError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => PacketError::Internal(format!("reading {}: {}", path.display(), e)),
        })?;

        let text = String::from_utf8(bytes).map_err(|e| {
            let mut magic = [0u8; 4];
            let head = e.as_bytes();
            let n = head.len().min(4);
            magic[..n].copy_from_slice(&head[..n]);
            PacketError::UnsupportedDocument {
                path: path.to_path_buf(),
                magic,
            }
        })?;

        let pages = Self::split_pages(&text, selection)?;
        debug!("Read {} text pages from {}", pages.len(), path.display());
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn form_feeds_split_pages() {
        let pages =
            PlainTextExtractor::split_pages("one\x0ctwo\x0cthree\x0c", &PageSelection::All).unwrap();
        assert_eq!(pages, vec!["one", "two", "three"]);
    }

    #[test]
    fn no_form_feed_is_one_page() {
        let pages = PlainTextExtractor::split_pages("TOSS-UP\n1) …", &PageSelection::All).unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn selection_is_honoured() {
        let text = "a\x0cb\x0cc\x0cd";
        assert_eq!(
            PlainTextExtractor::split_pages(text, &PageSelection::Range(2, 3)).unwrap(),
            vec!["b", "c"]
        );
        assert_eq!(
            PlainTextExtractor::split_pages(text, &PageSelection::Set(vec![4, 1])).unwrap(),
            vec!["a", "d"]
        );
    }

    #[test]
    fn selection_past_the_end_is_an_error() {
        let err = PlainTextExtractor::split_pages("a\x0cb", &PageSelection::Single(5)).unwrap_err();
        assert!(matches!(err, PacketError::PageOutOfRange { page: 5, total: 2 }));
    }

    #[test]
    fn reads_file_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "first page\x0csecond page").unwrap();
        let pages = PlainTextExtractor
            .extract_pages(tmp.path(), &PageSelection::All)
            .unwrap();
        assert_eq!(join_pages(&pages), "first page\n\nsecond page");
    }

    #[test]
    fn invalid_utf8_is_unsupported() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&[0xff, 0xfe, 0x00, 0x41, 0x42]).unwrap();
        let err = PlainTextExtractor
            .extract_pages(tmp.path(), &PageSelection::All)
            .unwrap_err();
        assert!(matches!(
            err,
            PacketError::UnsupportedDocument { magic: [0xff, 0xfe, 0x00, 0x41], .. }
        ));
    }

    #[test]
    fn missing_file() {
        let err = PlainTextExtractor
            .extract_pages(Path::new("/nonexistent/round.txt"), &PageSelection::All)
            .unwrap_err();
        assert!(matches!(err, PacketError::FileNotFound { .. }));
    }
}
