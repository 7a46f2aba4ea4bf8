//! Question block segmentation.
//!
//! A region starts at every `TOSS-UP` / `BONUS` keyword and runs to the next
//! one. A region becomes a [`RawQuestionBlock`] when it opens with a header
//! `<keyword> <ordinal>) <category> <dash> <style>` and contains `ANSWER:`.
//! Everything else (title pages, rules text, truncated blocks) is discarded
//! with a debug log.

use crate::output::{QuestionType, RawQuestionBlock};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

static RE_SECTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:TOSS-UP|BONUS)\b").unwrap());

/// Header with one of the known style phrases.
static RE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(TOSS-UP|BONUS)\s*(\d+)\s*\)\s*(?P<cat>[A-Za-z&][A-Za-z&\s-]*?)\s*[–—-]\s*(?P<style>(?i:multiple\s*choice|short\s*answer|identify\s*all|rank))\b",
    )
    .unwrap()
});

/// Fallback header: any single word after the dash, so an unknown style can
/// still be reported instead of silently vanishing.
static RE_LOOSE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(TOSS-UP|BONUS)\s*(\d+)\s*\)\s*(?P<cat>[A-Za-z&][A-Za-z&\s]*?)\s*[–—-]\s*(?P<style>[A-Za-z]+)",
    )
    .unwrap()
});

static RE_ANSWER: Lazy<Regex> = Lazy::new(|| Regex::new(r"ANSWER\s*:").unwrap());

/// Split normalised document text into question blocks, in document order.
pub fn segment_blocks(text: &str) -> Vec<RawQuestionBlock> {
    let starts: Vec<usize> = RE_SECTION.find_iter(text).map(|m| m.start()).collect();
    let mut blocks = Vec::with_capacity(starts.len());

    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(text.len());
        let region = &text[start..end];
        match parse_region(region) {
            Some(block) => blocks.push(block),
            None => debug!(
                "Discarded region at byte {}: {:?}",
                start,
                preview(region, 60)
            ),
        }
    }
    blocks
}

fn parse_region(region: &str) -> Option<RawQuestionBlock> {
    let caps = RE_HEADER
        .captures(region)
        .or_else(|| RE_LOOSE_HEADER.captures(region))?;
    let header_end = caps.get(0)?.end();
    block_from_header(&caps, &region[header_end..])
}

fn block_from_header(caps: &Captures, rest: &str) -> Option<RawQuestionBlock> {
    let question_type = match &caps[1] {
        "TOSS-UP" => QuestionType::Tossup,
        _ => QuestionType::Bonus,
    };
    let ordinal: u32 = caps[2].parse().ok().filter(|n| *n >= 1)?;
    let answer = RE_ANSWER.find(rest)?;

    Some(RawQuestionBlock {
        question_type,
        ordinal,
        raw_category: caps["cat"].trim().to_string(),
        raw_style: caps["style"].trim().to_string(),
        raw_body: rest[..answer.start()].trim().to_string(),
        raw_answer: rest[answer.end()..].trim().to_string(),
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &flat[..idx]),
        None => flat,
    }
}
