//! Output types: question records and the per-document extraction report.
//!
//! [`QuestionRecord`] is the storage-ready shape; its serde field names are
//! the interchange format and must not change. [`ExtractionReport`] wraps the
//! records of one document together with the blocks that were dropped and
//! timing / breakdown statistics.

use crate::error::SkipReason;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ── Enumerations ─────────────────────────────────────────────────────────

/// Subject area of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Biology,
    Chemistry,
    Physics,
    EarthSpace,
    Math,
    Energy,
    Other,
}

/// How a question is meant to be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionStyle {
    ShortAnswer,
    MultipleChoice,
    IdentifyAll,
    Rank,
}

impl QuestionStyle {
    /// Minimum number of options a record of this style must carry.
    pub fn required_options(self) -> usize {
        match self {
            QuestionStyle::ShortAnswer => 0,
            QuestionStyle::MultipleChoice => 4,
            QuestionStyle::IdentifyAll | QuestionStyle::Rank => 3,
        }
    }
}

/// Whether a question is a toss-up or the bonus that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    #[serde(rename = "TOSSUP")]
    Tossup,
    #[serde(rename = "BONUS")]
    Bonus,
}

impl QuestionType {
    /// The keyword that introduces this type in a packet.
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::Tossup => "TOSS-UP",
            QuestionType::Bonus => "BONUS",
        }
    }
}

/// Option marker letter. Ordering follows W < X < Y < Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionLabel {
    W,
    X,
    Y,
    Z,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [OptionLabel::W, OptionLabel::X, OptionLabel::Y, OptionLabel::Z];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'W' => Some(OptionLabel::W),
            'X' => Some(OptionLabel::X),
            'Y' => Some(OptionLabel::Y),
            'Z' => Some(OptionLabel::Z),
            _ => None,
        }
    }

    /// Label for the 1-based position of a numbered item (1 → W … 4 → Z).
    pub fn from_position(n: usize) -> Option<Self> {
        n.checked_sub(1).and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn as_char(self) -> char {
        match self {
            OptionLabel::W => 'W',
            OptionLabel::X => 'X',
            OptionLabel::Y => 'Y',
            OptionLabel::Z => 'Z',
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

macro_rules! screaming_display {
    ($($ty:ty),*) => {$(
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match serde_json::to_value(self) {
                    Ok(serde_json::Value::String(s)) => f.write_str(&s),
                    _ => write!(f, "{:?}", self),
                }
            }
        }
    )*};
}

screaming_display!(Category, QuestionStyle, QuestionType);

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

// ── Intermediate ─────────────────────────────────────────────────────────

/// One question occurrence as cut out of the document text, before
/// classification. Never mutated after the segmenter produces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQuestionBlock {
    pub question_type: QuestionType,
    /// Per-type position printed in the packet (`TOSS-UP 3)`). Always ≥ 1.
    pub ordinal: u32,
    pub raw_category: String,
    pub raw_style: String,
    pub raw_body: String,
    pub raw_answer: String,
}

/// Option texts keyed by label, as produced by the option extractor.
pub type OptionMap = BTreeMap<OptionLabel, String>;

// ── Records ──────────────────────────────────────────────────────────────

/// A storage-ready question.
///
/// Invariants (enforced by [`crate::pipeline::Pipeline`] before a record is
/// emitted):
/// - `MULTIPLE_CHOICE`: all four options present and non-empty, answer is a
///   single letter `W`–`Z`.
/// - `IDENTIFY_ALL` / `RANK`: at least three options present.
/// - `SHORT_ANSWER`: no options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question_text: String,
    pub category: Category,
    pub question_style: QuestionStyle,
    pub question_type: QuestionType,
    pub correct_answer: String,
    pub option_1: Option<String>,
    pub option_2: Option<String>,
    pub option_3: Option<String>,
    pub option_4: Option<String>,
    pub source: String,
    /// Packets carry no explanations; always `None`.
    pub explanation: Option<String>,
}

impl QuestionRecord {
    /// Options in W, X, Y, Z order.
    pub fn options(&self) -> [Option<&str>; 4] {
        [
            self.option_1.as_deref(),
            self.option_2.as_deref(),
            self.option_3.as_deref(),
            self.option_4.as_deref(),
        ]
    }

    pub fn option_count(&self) -> usize {
        self.options().iter().filter(|o| o.is_some()).count()
    }

    /// Spread an [`OptionMap`] into the four positional option slots.
    pub(crate) fn slots_from(options: &OptionMap) -> [Option<String>; 4] {
        let mut slots: [Option<String>; 4] = Default::default();
        for (label, text) in options {
            slots[label.index()] = Some(text.clone());
        }
        slots
    }
}

// ── Report ───────────────────────────────────────────────────────────────

/// A block that did not become a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub ordinal: u32,
    pub question_type: QuestionType,
    pub reason: SkipReason,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            crate::error::describe_block(self.question_type, self.ordinal),
            self.reason
        )
    }
}

/// Result of turning one [`RawQuestionBlock`] into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOutcome {
    Accepted(QuestionRecord),
    Skipped(Diagnostic),
}

/// Everything produced for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// File name (or URL) the records came from.
    pub source_name: String,
    /// Records in document order.
    pub records: Vec<QuestionRecord>,
    /// Blocks that were found but dropped.
    pub diagnostics: Vec<Diagnostic>,
    /// Document-level notes, e.g. no blocks found at all.
    pub warnings: Vec<String>,
    pub stats: ExtractionStats,
}

impl ExtractionReport {
    pub(crate) fn push(&mut self, outcome: BlockOutcome) {
        match outcome {
            BlockOutcome::Accepted(record) => {
                self.stats.count(&record);
                self.records.push(record);
            }
            BlockOutcome::Skipped(diag) => {
                self.stats.blocks_skipped += 1;
                self.diagnostics.push(diag);
            }
        }
    }
}

/// Counters and timings for one extraction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    /// Pages whose text was fed to the pipeline.
    pub total_pages: usize,
    pub blocks_found: usize,
    pub records_emitted: usize,
    pub blocks_skipped: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub by_style: BTreeMap<QuestionStyle, usize>,
    pub by_type: BTreeMap<QuestionType, usize>,
    /// Wall-clock time for the whole extraction, including text extraction.
    pub total_duration_ms: u64,
    /// Time spent in the text backend.
    pub text_duration_ms: u64,
}

impl ExtractionStats {
    fn count(&mut self, record: &QuestionRecord) {
        self.records_emitted += 1;
        *self.by_category.entry(record.category).or_default() += 1;
        *self.by_style.entry(record.question_style).or_default() += 1;
        *self.by_type.entry(record.question_type).or_default() += 1;
    }

    /// Fold another document's counters into this one (batch summaries).
    pub fn merge(&mut self, other: &ExtractionStats) {
        self.total_pages += other.total_pages;
        self.blocks_found += other.blocks_found;
        self.records_emitted += other.records_emitted;
        self.blocks_skipped += other.blocks_skipped;
        for (k, v) in &other.by_category {
            *self.by_category.entry(*k).or_default() += v;
        }
        for (k, v) in &other.by_style {
            *self.by_style.entry(*k).or_default() += v;
        }
        for (k, v) in &other.by_type {
            *self.by_type.entry(*k).or_default() += v;
        }
        self.total_duration_ms += other.total_duration_ms;
        self.text_duration_ms += other.text_duration_ms;
    }
}
