//! Footer removal: recurring page boilerplate printed at the bottom of every
//! packet page ("MIT Science Bowl Invitational Round 3 Page 7").
//!
//! Text extraction interleaves these footers with question text, often with
//! the spaces missing, so every pattern tolerates zero-or-more whitespace
//! between its words. Removal runs on the whole document before spacing
//! repair and block segmentation, and again on each answer string (answers
//! are the last thing on a page and pick up footer leaks most often).

use crate::error::PacketError;
use once_cell::sync::Lazy;
use regex::Regex;

// ── Built-in footer vocabulary ───────────────────────────────────────────────

/// `<ORG> Science Bowl <Event words> Round <N> Page <N>`
///
/// An org acronym must start a word, so a glued uppercase answer keeps its
/// tail ("SULFURIC ACIDMITScienceBowl…"). `MIT` is also matched glued.
const ORG_EVENT_FOOTER: &str = r"(?:\b[A-Z]{2,5}\s*|MIT\s*)?(?i:science\s*bowl)(?:\s*[A-Z][a-z]+)*?\s*(?i:round)\s*\d+\s*(?i:page)\s*\d+";

/// `Round <N> Page <N>`
const ROUND_PAGE_FOOTER: &str = r"(?i)\bround\s*\d+\s*page\s*\d+";

/// Bare `Page <N>`. The capitalised form is also matched when glued to the
/// preceding word ("cellPage 4").
const BARE_PAGE_FOOTER: &str = r"(?:\b(?i:page)|Page)\s*\d+";

static BUILTIN_FOOTERS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [ORG_EVENT_FOOTER, ROUND_PAGE_FOOTER, BARE_PAGE_FOOTER]
        .iter()
        .map(|p| Regex::new(p).unwrap())
        .collect()
});

static RE_TRAILING_FRAGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\b[A-Z]{2,5}\s*|MIT\s*)?(?i:science\s*bowl)|(?i:invitational\s*round)").unwrap()
});

static RE_EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Removes footer boilerplate from document and answer text.
///
/// Construct once per run with [`FooterStripper::new`]; cloning is cheap
/// enough to hand one to each document of a batch.
#[derive(Debug, Clone, Default)]
pub struct FooterStripper {
    /// Caller-supplied patterns, applied before the built-in set.
    extra: Vec<Regex>,
}

impl FooterStripper {
    /// Compile the caller's extra footer patterns.
    ///
    /// # Errors
    /// [`PacketError::InvalidConfig`] if any pattern is not a valid regex.
    pub fn new(extra_patterns: &[String]) -> Result<Self, PacketError> {
        let extra = extra_patterns
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| {
                    PacketError::InvalidConfig(format!("footer pattern '{}' is invalid: {}", p, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { extra })
    }

    /// Remove every footer occurrence and cap blank lines at one.
    ///
    /// Never fails; text without footers only has its excess newlines
    /// collapsed and its ends trimmed.
    pub fn strip(&self, text: &str) -> String {
        let mut out = text.to_string();
        for re in self.extra.iter().chain(BUILTIN_FOOTERS.iter()) {
            if re.is_match(&out) {
                out = re.replace_all(&out, "").into_owned();
            }
        }
        RE_EXCESS_NEWLINES
            .replace_all(&out, "\n\n")
            .trim()
            .to_string()
    }

    /// Truncate `text` at the first partial footer leak, e.g. an answer that
    /// ends in "… MIT Science Bowl" after the page number was cut off.
    pub fn strip_trailing_fragments(&self, text: &str) -> String {
        match RE_TRAILING_FRAGMENT.find(text) {
            Some(m) => text[..m.start()].trim_end().to_string(),
            None => text.to_string(),
        }
    }
}
