//! Category and style classification of raw block headers.

use crate::output::{Category, QuestionStyle};
use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix table, checked in order against the normalised header.
const CATEGORY_PREFIXES: &[(&str, Category)] = &[
    ("EARTH AND SPACE", Category::EarthSpace),
    ("EARTH & SPACE", Category::EarthSpace),
    ("EARTH SPACE", Category::EarthSpace),
    ("EARTH SCIENCE", Category::EarthSpace),
    ("ASTRONOMY", Category::EarthSpace),
    ("CHEMISTRY", Category::Chemistry),
    ("BIOLOGY", Category::Biology),
    ("LIFE SCIENCE", Category::Biology),
    ("PHYSICS", Category::Physics),
    ("MATHEMATICS", Category::Math),
    ("MATH", Category::Math),
    ("ENERGY", Category::Energy),
    ("GENERAL SCIENCE", Category::Other),
    ("OTHER", Category::Other),
];

const STYLES: &[(&str, QuestionStyle)] = &[
    ("MULTIPLE CHOICE", QuestionStyle::MultipleChoice),
    ("SHORT ANSWER", QuestionStyle::ShortAnswer),
    ("IDENTIFY ALL", QuestionStyle::IdentifyAll),
    ("RANK", QuestionStyle::Rank),
];

const IDENTIFY_ALL_PHRASES: &[&str] = &[
    "identify all of the following",
    "identify all of the",
    "identify all",
];

const RANK_PHRASES: &[&str] = &[
    "rank the following",
    "order the following",
    "arrange in order",
    "arrange the following in order",
    "chronological order",
];

/// "arrange them in increasing order", "arrange … in order of size".
static RE_ARRANGE_IN_ORDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\barrange\b[^.?]*?\bin\s+(?:\w+\s+)?order\b").unwrap()
});

static RE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[–—-]\s*").unwrap());

fn normalise_header(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    let spaced = RE_DASHES.replace_all(&upper, " ");
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Map a raw category header ("EARTH AND SPACE", "Earth-Space") to a
/// [`Category`]. `None` when nothing in the table is a prefix.
pub fn parse_category(raw: &str) -> Option<Category> {
    let normalised = normalise_header(raw);
    CATEGORY_PREFIXES
        .iter()
        .find(|(prefix, _)| normalised.starts_with(*prefix))
        .map(|(_, category)| *category)
}

/// Map a raw style header ("Multiple Choice") to a [`QuestionStyle`].
pub fn parse_style(raw: &str) -> Option<QuestionStyle> {
    let normalised = normalise_header(raw);
    let compact: String = normalised.split(' ').collect();
    STYLES
        .iter()
        .find(|(name, _)| *name == normalised || name.replace(' ', "") == compact)
        .map(|(_, style)| *style)
}

/// Keyword override: a body that asks to identify all or to rank wins over
/// whatever style the header declared. Line breaks inside the body count as
/// plain spaces.
pub fn detect_special_style(body: &str, declared: QuestionStyle) -> QuestionStyle {
    let body = body.split_whitespace().collect::<Vec<_>>().join(" ");
    let lower = body.to_lowercase();
    if IDENTIFY_ALL_PHRASES.iter().any(|p| lower.contains(p)) {
        return QuestionStyle::IdentifyAll;
    }
    if RANK_PHRASES.iter().any(|p| lower.contains(p)) || RE_ARRANGE_IN_ORDER.is_match(&body) {
        return QuestionStyle::Rank;
    }
    declared
}
