//! Configuration types for packet extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. One struct holds every knob so a
//! config can be shared across the documents of a batch and logged as a
//! whole.

use crate::error::PacketError;
use crate::pipeline::text::TextExtractor;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Source label stamped on records when the caller gives none.
pub const DEFAULT_SOURCE: &str = "USER_SUBMITTED";

/// Configuration for a packet extraction.
///
/// Built via [`ExtractionConfig::builder()`] or using
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use packet2json::{ExtractionConfig, SpacingStrategy};
///
/// let config = ExtractionConfig::builder()
///     .source("MIT_2025")
///     .spacing(SpacingStrategy::Rules)
///     .concurrency(2)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// How missing spaces are repaired. Default: [`SpacingStrategy::Both`].
    pub spacing: SpacingStrategy,

    /// Unigram file for dictionary segmentation. If None, the embedded
    /// dictionary is used.
    pub dictionary_path: Option<PathBuf>,

    /// Value of every record's `source` field. Default: `"USER_SUBMITTED"`.
    pub source: String,

    /// Remove `(ACCEPT: …)`-style notes from non-multiple-choice answers.
    /// Default: false.
    pub strip_acceptance_notes: bool,

    /// Extra footer regexes, applied before the built-in footer patterns.
    pub extra_footer_patterns: Vec<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted packets.
    pub password: Option<String>,

    /// Documents processed at once by the batch entry points. Default: 4.
    ///
    /// Each document holds one pdfium handle in a blocking thread, so this
    /// also bounds the number of blocking threads in use.
    pub concurrency: usize,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Pre-constructed text extractor. Takes precedence over the built-in
    /// PDF/plain-text selection.
    pub extractor: Option<Arc<dyn TextExtractor>>,

    /// Per-document progress events. Default: None.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            spacing: SpacingStrategy::default(),
            dictionary_path: None,
            source: DEFAULT_SOURCE.to_string(),
            strip_acceptance_notes: false,
            extra_footer_patterns: Vec::new(),
            pages: PageSelection::default(),
            password: None,
            concurrency: 4,
            download_timeout_secs: 120,
            extractor: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("spacing", &self.spacing)
            .field("dictionary_path", &self.dictionary_path)
            .field("source", &self.source)
            .field("strip_acceptance_notes", &self.strip_acceptance_notes)
            .field("extra_footer_patterns", &self.extra_footer_patterns)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("concurrency", &self.concurrency)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("extractor", &self.extractor.as_ref().map(|_| "<dyn TextExtractor>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExtractionProgressCallback>"),
            )
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn spacing(mut self, strategy: SpacingStrategy) -> Self {
        self.config.spacing = strategy;
        self
    }

    pub fn dictionary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.dictionary_path = Some(path.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.config.source = source.into();
        self
    }

    pub fn strip_acceptance_notes(mut self, v: bool) -> Self {
        self.config.strip_acceptance_notes = v;
        self
    }

    /// Add one extra footer regex. May be called repeatedly.
    pub fn footer_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.extra_footer_patterns.push(pattern.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.config.extractor = Some(extractor);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, PacketError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(PacketError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.source.trim().is_empty() {
            return Err(PacketError::InvalidConfig(
                "Source label must not be empty".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(PacketError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        for pattern in &c.extra_footer_patterns {
            if let Err(e) = regex::Regex::new(pattern) {
                return Err(PacketError::InvalidConfig(format!(
                    "footer pattern '{}' is invalid: {}",
                    pattern, e
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which spacing repairs run on the extracted text.
///
/// | Strategy | Rule cascade | Dictionary segmentation |
/// |----------|--------------|-------------------------|
/// | `Rules` | yes | no |
/// | `Dictionary` | no | yes |
/// | `Both` (default) | yes | yes |
/// | `None` | no | no |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpacingStrategy {
    Rules,
    Dictionary,
    #[default]
    Both,
    None,
}

impl SpacingStrategy {
    pub fn uses_rules(self) -> bool {
        matches!(self, SpacingStrategy::Rules | SpacingStrategy::Both)
    }

    pub fn uses_dictionary(self) -> bool {
        matches!(self, SpacingStrategy::Dictionary | SpacingStrategy::Both)
    }
}

impl std::str::FromStr for SpacingStrategy {
    type Err = PacketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rules" => Ok(SpacingStrategy::Rules),
            "dictionary" | "dict" => Ok(SpacingStrategy::Dictionary),
            "both" => Ok(SpacingStrategy::Both),
            "none" | "off" => Ok(SpacingStrategy::None),
            other => Err(PacketError::InvalidConfig(format!(
                "unknown spacing strategy '{}' (expected rules, dictionary, both or none)",
                other
            ))),
        }
    }
}

/// Specifies which pages of the packet to read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// Read all pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Like [`to_indices`](Self::to_indices), but an explicit selection that
    /// matches no page is an error instead of an empty document.
    pub fn resolve(&self, total_pages: usize) -> Result<Vec<usize>, PacketError> {
        let indices = self.to_indices(total_pages);
        if indices.is_empty() && total_pages > 0 {
            let page = match self {
                PageSelection::All => 1,
                PageSelection::Single(p) => *p,
                PageSelection::Range(start, _) => *start,
                PageSelection::Set(pages) => pages.first().copied().unwrap_or(0),
            };
            return Err(PacketError::PageOutOfRange {
                page,
                total: total_pages,
            });
        }
        Ok(indices)
    }
}
