//! Input resolution: normalise a user-supplied path or URL to a local file
//! and decide which text backend reads it.
//!
//! pdfium can only open files from disk, so URLs are downloaded into a
//! `TempDir` owned by the [`ResolvedInput`]; dropping the handle removes the
//! download. The document kind is sniffed from the content rather than the
//! file extension: packets are routinely renamed, and pre-extracted text
//! often arrives as `.pdf.txt` or with no extension at all.

use crate::error::PacketError;
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info};

/// Which backend can read a resolved document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Starts with `%PDF`.
    Pdf,
    /// Valid UTF-8 text (possibly empty).
    Text,
}

/// The resolved input: either a local path or a downloaded temp file.
#[derive(Debug)]
pub enum ResolvedInput {
    /// Input was already a local file.
    Local { path: PathBuf, kind: DocumentKind },
    /// Input was a URL; the document lives in a temp directory that is kept
    /// alive until this value is dropped.
    Downloaded {
        path: PathBuf,
        kind: DocumentKind,
        _temp_dir: TempDir,
    },
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local { path, .. } | ResolvedInput::Downloaded { path, .. } => path,
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            ResolvedInput::Local { kind, .. } | ResolvedInput::Downloaded { kind, .. } => *kind,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Classify a document from its bytes.
///
/// # Errors
/// [`PacketError::UnsupportedDocument`] when the content is neither a PDF
/// nor UTF-8 text.
pub fn sniff_kind(path: &Path, bytes: &[u8]) -> Result<DocumentKind, PacketError> {
    if bytes.starts_with(b"%PDF") {
        return Ok(DocumentKind::Pdf);
    }
    if std::str::from_utf8(bytes).is_ok() {
        return Ok(DocumentKind::Text);
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(PacketError::UnsupportedDocument {
        path: path.to_path_buf(),
        magic,
    })
}

/// Resolve the input string to a local file of a known kind.
///
/// URLs are downloaded with `timeout_secs` as the whole-request timeout.
pub async fn resolve_input(input: &str, timeout_secs: u64) -> Result<ResolvedInput, PacketError> {
    if input.trim().is_empty() {
        return Err(PacketError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        download_url(input, timeout_secs).await
    } else {
        resolve_local(input)
    }
}

/// Resolve a local file path, validating existence and content kind.
fn resolve_local(path_str: &str) -> Result<ResolvedInput, PacketError> {
    let path = PathBuf::from(path_str);

    if !path.exists() {
        return Err(PacketError::FileNotFound { path });
    }
    if path.is_dir() {
        return Err(PacketError::InvalidInput {
            input: path_str.to_string(),
        });
    }

    let mut file = match std::fs::File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(PacketError::PermissionDenied { path });
        }
        Err(_) => return Err(PacketError::FileNotFound { path }),
    };

    // A PDF is recognised from its first four bytes; anything else has to be
    // read whole to know whether it is UTF-8.
    let mut magic = [0u8; 4];
    let read = file
        .read(&mut magic)
        .map_err(|e| PacketError::Internal(format!("reading {}: {}", path.display(), e)))?;
    let kind = if magic[..read].starts_with(b"%PDF") {
        DocumentKind::Pdf
    } else {
        let bytes = std::fs::read(&path)
            .map_err(|e| PacketError::Internal(format!("reading {}: {}", path.display(), e)))?;
        sniff_kind(&path, &bytes)?
    };

    debug!("Resolved local {:?} document: {}", kind, path.display());
    Ok(ResolvedInput::Local { path, kind })
}

/// Download a URL to a temporary directory and return the path.
async fn download_url(url: &str, timeout_secs: u64) -> Result<ResolvedInput, PacketError> {
    info!("Downloading packet from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| PacketError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            PacketError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PacketError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(PacketError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let filename = filename_from_url(url);

    let bytes = response.bytes().await.map_err(|e| {
        if e.is_timeout() {
            PacketError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            PacketError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    let temp_dir = TempDir::new().map_err(|e| PacketError::Internal(e.to_string()))?;
    let file_path = temp_dir.path().join(&filename);
    let kind = sniff_kind(&file_path, &bytes)?;

    tokio::fs::write(&file_path, &bytes)
        .await
        .map_err(|e| PacketError::Internal(format!("Failed to write temp file: {}", e)))?;

    info!("Downloaded {} bytes to: {}", bytes.len(), file_path.display());

    Ok(ResolvedInput::Downloaded {
        path: file_path,
        kind,
        _temp_dir: temp_dir,
    })
}

/// Last non-empty path segment of the URL, or a fixed fallback.
pub fn filename_from_url(url: &str) -> String {
    if let Ok(parsed) = reqwest::Url::parse(url) {
        if let Some(mut segments) = parsed.path_segments() {
            if let Some(last) = segments.next_back() {
                if !last.is_empty() && last.contains('.') {
                    return last.to_string();
                }
            }
        }
    }

    "downloaded-packet".to_string()
}

/// Human-facing name of an input: the file name for paths and URLs, else the
/// input as given.
pub fn display_name(input: &str) -> String {
    if is_url(input) {
        return filename_from_url(input);
    }
    Path::new(input)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/round1.pdf"));
        assert!(is_url("http://example.com/round1.pdf"));
        assert!(!is_url("/tmp/round1.pdf"));
        assert!(!is_url("round1.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn sniffing() {
        let p = Path::new("x");
        assert_eq!(sniff_kind(p, b"%PDF-1.7\n...").unwrap(), DocumentKind::Pdf);
        assert_eq!(sniff_kind(p, "TOSS-UP 1) …".as_bytes()).unwrap(), DocumentKind::Text);
        assert_eq!(sniff_kind(p, b"").unwrap(), DocumentKind::Text);
        let err = sniff_kind(p, &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0xff]).unwrap_err();
        assert!(matches!(
            err,
            PacketError::UnsupportedDocument { magic: [0x89, b'P', b'N', b'G'], .. }
        ));
    }

    #[test]
    fn url_filenames() {
        assert_eq!(
            filename_from_url("https://example.com/packets/Round%201.pdf"),
            "Round%201.pdf"
        );
        assert_eq!(filename_from_url("https://example.com/packets/"), "downloaded-packet");
        assert_eq!(display_name("/data/2024/Round 3.pdf"), "Round 3.pdf");
        assert_eq!(display_name("https://example.com/a/r2.txt"), "r2.txt");
    }

    #[tokio::test]
    async fn resolves_local_text_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        write!(tmp, "BONUS\n1) MATH – Short Answer What is 2+2? ANSWER: 4").unwrap();
        let resolved = resolve_input(tmp.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.kind(), DocumentKind::Text);
        assert_eq!(resolved.path(), tmp.path());
    }

    #[tokio::test]
    async fn resolves_local_pdf_by_magic() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n").unwrap();
        let resolved = resolve_input(tmp.path().to_str().unwrap(), 5).await.unwrap();
        assert_eq!(resolved.kind(), DocumentKind::Pdf);
    }

    #[tokio::test]
    async fn missing_and_blank_inputs() {
        let err = resolve_input("/nonexistent/round.pdf", 5).await.unwrap_err();
        assert!(matches!(err, PacketError::FileNotFound { .. }));
        let err = resolve_input("   ", 5).await.unwrap_err();
        assert!(matches!(err, PacketError::InvalidInput { .. }));
    }
}
