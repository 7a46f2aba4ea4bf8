//! Pipeline stages for packet-to-record extraction.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own and the text backend can be swapped without touching
//! the text stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ text ──▶ footer ──▶ spacing ──▶ segment ──▶ classify ──▶ options ──▶ answer
//! (URL/path) (pdfium)  (strip)   (rules+dict)  (blocks)   (enums)      (W–Z)     (clean)
//! ```
//!
//! 1. [`input`]    resolve the path or URL to a local file and sniff its kind
//! 2. [`text`]     per-page text; pdfium runs in `spawn_blocking`
//! 3. [`footer`]   remove page footer boilerplate
//! 4. [`spacing`]  repair missing spaces: ordered rule cascade, then
//!    dictionary segmentation via [`wordseg`]
//! 5. [`segment`]  cut the document into [`RawQuestionBlock`]s
//! 6. [`classify`] canonical category and style, with the keyword override
//! 7. [`options`]  labeled options or numbered items, and the prompt
//! 8. [`answer`]   final answer string
//!
//! Stages 3 to 8 are pure and synchronous; [`Pipeline`] strings them
//! together for one document.

pub mod answer;
pub mod classify;
pub mod footer;
pub mod input;
pub mod options;
pub mod segment;
pub mod spacing;
pub mod text;
pub mod wordseg;

use crate::config::{ExtractionConfig, SpacingStrategy};
use crate::error::{describe_block, PacketError, SkipReason};
use crate::output::{
    BlockOutcome, Diagnostic, ExtractionReport, QuestionRecord, QuestionStyle, RawQuestionBlock,
};
use footer::FooterStripper;
use std::sync::Arc;
use tracing::{debug, info, warn};
use wordseg::SegmentDictionary;

/// The synchronous text pipeline for one document.
///
/// Built once per run from an [`ExtractionConfig`] and shared (`Arc`) by
/// every document of a batch. Holds no per-document state.
#[derive(Debug, Clone)]
pub struct Pipeline {
    footer: FooterStripper,
    /// `None` means the embedded dictionary.
    dictionary: Option<Arc<SegmentDictionary>>,
    spacing: SpacingStrategy,
    source: String,
    strip_acceptance_notes: bool,
}

impl Pipeline {
    /// Compile footer patterns and load the segmentation dictionary.
    ///
    /// The dictionary file is only read when the spacing strategy uses it.
    ///
    /// # Errors
    /// [`PacketError::InvalidConfig`] for a bad footer regex,
    /// [`PacketError::DictionaryLoad`] for an unreadable dictionary.
    pub fn new(config: &ExtractionConfig) -> Result<Self, PacketError> {
        let footer = FooterStripper::new(&config.extra_footer_patterns)?;
        let dictionary = match (&config.dictionary_path, config.spacing.uses_dictionary()) {
            (Some(path), true) => Some(Arc::new(SegmentDictionary::load(path)?)),
            _ => None,
        };
        Ok(Self {
            footer,
            dictionary,
            spacing: config.spacing,
            source: config.source.clone(),
            strip_acceptance_notes: config.strip_acceptance_notes,
        })
    }

    fn dictionary(&self) -> Option<&SegmentDictionary> {
        if !self.spacing.uses_dictionary() {
            return None;
        }
        Some(
            self.dictionary
                .as_deref()
                .unwrap_or_else(|| SegmentDictionary::builtin()),
        )
    }

    /// Footer removal followed by spacing repair: the normalised
    /// DocumentText the segmenter reads.
    pub fn normalize(&self, raw_text: &str) -> String {
        let stripped = self.footer.strip(raw_text);
        spacing::normalize_spacing(&stripped, self.spacing, self.dictionary())
    }

    /// Turn one raw block into a record, or say why it cannot be one.
    pub fn process_block(&self, block: &RawQuestionBlock) -> BlockOutcome {
        match self.build_record(block) {
            Ok(record) => BlockOutcome::Accepted(record),
            Err(reason) => {
                warn!(
                    ordinal = block.ordinal,
                    question_type = %block.question_type,
                    token = reason.offending_token().unwrap_or(""),
                    "Dropped {}: {}",
                    describe_block(block.question_type, block.ordinal),
                    reason
                );
                BlockOutcome::Skipped(Diagnostic {
                    ordinal: block.ordinal,
                    question_type: block.question_type,
                    reason,
                })
            }
        }
    }

    fn build_record(&self, block: &RawQuestionBlock) -> Result<QuestionRecord, SkipReason> {
        let category = classify::parse_category(&block.raw_category).ok_or_else(|| {
            SkipReason::UnresolvedCategory {
                raw: block.raw_category.clone(),
            }
        })?;
        let declared = classify::parse_style(&block.raw_style).ok_or_else(|| {
            SkipReason::UnresolvedStyle {
                raw: block.raw_style.clone(),
            }
        })?;
        let style = classify::detect_special_style(&block.raw_body, declared);
        if style != declared {
            debug!(
                "{}: style {} overridden to {} by body keywords",
                describe_block(block.question_type, block.ordinal),
                declared,
                style
            );
        }

        let extracted = options::extract_options(&block.raw_body, style);
        if extracted.prompt.is_empty() {
            return Err(SkipReason::EmptyPrompt);
        }

        let found = match style {
            QuestionStyle::MultipleChoice => extracted
                .options
                .values()
                .filter(|text| !text.is_empty())
                .count(),
            _ => extracted.options.len(),
        };
        let required = style.required_options();
        let malformed = match style {
            QuestionStyle::ShortAnswer => found != 0,
            _ => found < required,
        };
        if malformed {
            return Err(SkipReason::MalformedOptions {
                style,
                found,
                required,
            });
        }

        let correct_answer = answer::clean_answer(
            &block.raw_answer,
            style,
            &self.footer,
            self.strip_acceptance_notes,
        )?;

        let [option_1, option_2, option_3, option_4] = QuestionRecord::slots_from(&extracted.options);
        Ok(QuestionRecord {
            question_text: extracted.prompt,
            category,
            question_style: style,
            question_type: block.question_type,
            correct_answer,
            option_1,
            option_2,
            option_3,
            option_4,
            source: self.source.clone(),
            explanation: None,
        })
    }

    /// Run every text stage over one document.
    ///
    /// # Errors
    /// [`PacketError::EmptyDocument`] when `raw_text` has no content at all.
    /// Zero blocks is not an error: the report comes back empty with a
    /// warning.
    pub fn run(&self, raw_text: &str, source_name: &str) -> Result<ExtractionReport, PacketError> {
        if raw_text.trim().is_empty() {
            return Err(PacketError::EmptyDocument {
                source_name: source_name.to_string(),
            });
        }

        let text = self.normalize(raw_text);
        let blocks = segment::segment_blocks(&text);
        debug!("{}: {} question blocks", source_name, blocks.len());

        let mut report = ExtractionReport {
            source_name: source_name.to_string(),
            ..Default::default()
        };
        report.stats.blocks_found = blocks.len();

        if blocks.is_empty() {
            warn!("{}: no question blocks found", source_name);
            report
                .warnings
                .push("no question blocks found; is this a packet?".to_string());
            return Ok(report);
        }

        for block in &blocks {
            let dropped = self.dropped_items(block);
            if dropped > 0 {
                let msg = format!(
                    "{}: {} numbered item(s) beyond the fourth were dropped",
                    describe_block(block.question_type, block.ordinal),
                    dropped
                );
                warn!("{}: {}", source_name, msg);
                report.warnings.push(msg);
            }
            report.push(self.process_block(block));
        }

        info!(
            "{}: {} records, {} blocks skipped",
            source_name, report.stats.records_emitted, report.stats.blocks_skipped
        );
        Ok(report)
    }

    /// Numbered items past the fourth slot, for blocks that resolve to a
    /// numbered style.
    fn dropped_items(&self, block: &RawQuestionBlock) -> usize {
        let Some(declared) = classify::parse_style(&block.raw_style) else {
            return 0;
        };
        match classify::detect_special_style(&block.raw_body, declared) {
            QuestionStyle::IdentifyAll | QuestionStyle::Rank => {
                options::extract_numbered(&block.raw_body).dropped_items
            }
            _ => 0,
        }
    }
}

/// Extract records from text that is already in memory.
///
/// No I/O and no runtime: useful for tests and for callers with their own
/// text extraction. Page selection and the text backend do not apply.
pub fn extract_text(
    text: &str,
    source_name: &str,
    config: &ExtractionConfig,
) -> Result<ExtractionReport, PacketError> {
    let mut report = Pipeline::new(config)?.run(text, source_name)?;
    report.stats.total_pages = text.split('\x0c').count();
    Ok(report)
}
