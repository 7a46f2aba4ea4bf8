//! Dictionary-driven word segmentation for tokens the rule cascade cannot
//! split ("Whatis", "ofthefollowing").
//!
//! Scoring follows the unigram model of the `wordsegment` package: a known
//! word scores `log10(count / total)`, an unknown chunk scores
//! `log10(10 / (total * 10^len))`, and the best split is found with a
//! Viterbi pass over the lowercased token.
//!
//! [`segment_word`] decides *whether* a token may be rewritten. The decision
//! is a table of guards evaluated in order; the first guard that fires keeps
//! the token verbatim. Only tokens that look glued are split: camelCase, a
//! lowercase run of seven or more letters, or a capitalised run of eight or
//! more. Shorter tokens missing from the dictionary are far more often real
//! words ("Sunlight", "hereby") than two words stuck together.

use crate::error::PacketError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Longest chunk considered during Viterbi, whatever the dictionary holds.
const MAX_CHUNK: usize = 24;

/// A split is only trusted when it yields this many words.
const MIN_SPLIT_WORDS: usize = 2;
const MAX_SPLIT_WORDS: usize = 9;

/// Prefixes that are not words of their own; a split starting with one of
/// them ("sub marine", "re heated") is cutting a single word apart.
const BOUND_PREFIXES: &[&str] = &[
    "anti", "bio", "de", "geo", "hyper", "hypo", "inter", "intra", "macro", "micro", "mono",
    "multi", "non", "poly", "pre", "re", "semi", "sub", "trans", "ultra", "un",
];

static BUILTIN: Lazy<SegmentDictionary> = Lazy::new(|| {
    SegmentDictionary::parse(include_str!("../../data/unigrams.txt"), Path::new("<builtin>"))
        .unwrap()
});

// ── Dictionary ───────────────────────────────────────────────────────────────

/// Unigram counts used to score candidate splits.
///
/// Loaded once per run and shared read-only (wrap in `Arc` for batches).
#[derive(Debug, Clone)]
pub struct SegmentDictionary {
    counts: HashMap<String, u64>,
    log_total: f64,
    max_word_len: usize,
}

impl SegmentDictionary {
    /// The English word list compiled into the binary (about 29k words).
    pub fn builtin() -> &'static SegmentDictionary {
        &BUILTIN
    }

    /// Load a `word<TAB|space>count` file (the `unigrams.txt` layout).
    ///
    /// Blank lines and lines starting with `#` are ignored.
    pub fn load(path: &Path) -> Result<Self, PacketError> {
        let text = std::fs::read_to_string(path).map_err(|e| PacketError::DictionaryLoad {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
        let dict = Self::parse(&text, path)?;
        debug!(
            "Loaded {} dictionary words from {}",
            dict.len(),
            path.display()
        );
        Ok(dict)
    }

    fn parse(text: &str, origin: &Path) -> Result<Self, PacketError> {
        let fail = |line: usize, detail: String| PacketError::DictionaryLoad {
            path: origin.to_path_buf(),
            detail: format!("line {}: {}", line, detail),
        };

        let mut entries = Vec::new();
        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut fields = line.split_whitespace();
            let (Some(word), Some(count), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(fail(i + 1, format!("expected 'word count', got '{}'", line)));
            };
            let count: u64 = count
                .parse()
                .map_err(|_| fail(i + 1, format!("bad count '{}'", count)))?;
            entries.push((word.to_string(), count));
        }
        if entries.is_empty() {
            return Err(PacketError::DictionaryLoad {
                path: origin.to_path_buf(),
                detail: "no entries".into(),
            });
        }
        Ok(Self::from_counts(entries))
    }

    /// Build from in-memory counts. Words are lowercased; duplicates add up.
    pub fn from_counts<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: AsRef<str>,
    {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for (word, count) in entries {
            *counts.entry(word.as_ref().to_lowercase()).or_default() += count;
        }
        let total: u64 = counts.values().sum();
        let max_word_len = counts.keys().map(|w| w.chars().count()).max().unwrap_or(1);
        Self {
            counts,
            log_total: (total.max(1) as f64).log10(),
            max_word_len,
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Case-insensitive membership test.
    pub fn contains(&self, word: &str) -> bool {
        if word.chars().any(|c| c.is_uppercase()) {
            self.counts.contains_key(&word.to_lowercase())
        } else {
            self.counts.contains_key(word)
        }
    }

    fn score(&self, chunk: &str, chunk_len: usize) -> f64 {
        match self.counts.get(chunk) {
            Some(&count) => (count as f64).log10() - self.log_total,
            None => 1.0 - self.log_total - chunk_len as f64,
        }
    }

    /// Most probable split of `text` (lowercased first). Never empty for
    /// non-empty input; unknown stretches come back as single chunks.
    pub fn segment(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        // Byte offset of every char boundary, so chunks slice cleanly.
        let bounds: Vec<usize> = lower
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(lower.len()))
            .collect();
        let n = bounds.len() - 1;
        if n == 0 {
            return Vec::new();
        }
        let limit = self.max_word_len.clamp(1, MAX_CHUNK);

        // best[i] = (score of best split of the first i chars, start of last chunk)
        let mut best: Vec<(f64, usize)> = vec![(f64::NEG_INFINITY, 0); n + 1];
        best[0].0 = 0.0;
        for end in 1..=n {
            for start in end.saturating_sub(limit)..end {
                let chunk = &lower[bounds[start]..bounds[end]];
                let candidate = best[start].0 + self.score(chunk, end - start);
                if candidate > best[end].0 {
                    best[end] = (candidate, start);
                }
            }
        }

        let mut words = Vec::new();
        let mut end = n;
        while end > 0 {
            let start = best[end].1;
            words.push(lower[bounds[start]..bounds[end]].to_string());
            end = start;
        }
        words.reverse();
        words
    }
}

// ── Guards ───────────────────────────────────────────────────────────────────

/// Why a token was left untouched by [`segment_word`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Three characters or fewer.
    TooShort,
    /// Digits only.
    Numeric,
    /// Hyphen between two other characters ("Tay-Sachs").
    Hyphenated,
    /// Ends in `: ; , . ! ? )`.
    TerminalPunctuation,
    /// Has letters and none of them lowercase ("DNA", "EARTH").
    AllUppercase,
    /// Contains something other than letters and apostrophes.
    NonAlphabetic,
    /// Already a dictionary word.
    KnownWord,
    /// Too short to be glued text: no inner capital, and at most six
    /// letters (lowercase start) or seven (capital start).
    PlainWord,
}

type GuardCheck = fn(&str, &SegmentDictionary) -> bool;

/// Guards that run before marker prefixes are considered.
const SHAPE_GUARDS: &[(Guard, GuardCheck)] = &[
    (Guard::TooShort, is_too_short),
    (Guard::Numeric, is_numeric),
    (Guard::Hyphenated, is_hyphenated),
    (Guard::TerminalPunctuation, has_terminal_punctuation),
    (Guard::AllUppercase, is_all_uppercase),
];

/// Guards that run on the text left after marker prefixes.
const CONTENT_GUARDS: &[(Guard, GuardCheck)] = &[
    (Guard::NonAlphabetic, is_non_alphabetic),
    (Guard::KnownWord, is_known_word),
    (Guard::PlainWord, is_plain_word),
];

fn is_too_short(w: &str, _: &SegmentDictionary) -> bool {
    w.chars().count() <= 3
}

fn is_numeric(w: &str, _: &SegmentDictionary) -> bool {
    w.chars().all(|c| c.is_ascii_digit())
}

fn is_hyphenated(w: &str, _: &SegmentDictionary) -> bool {
    w.contains('-') && !w.starts_with('-') && !w.ends_with('-')
}

fn has_terminal_punctuation(w: &str, _: &SegmentDictionary) -> bool {
    w.ends_with([':', ';', ',', '.', '!', '?', ')'])
}

fn is_all_uppercase(w: &str, _: &SegmentDictionary) -> bool {
    w.chars().any(char::is_alphabetic) && !w.chars().any(char::is_lowercase)
}

fn is_non_alphabetic(w: &str, _: &SegmentDictionary) -> bool {
    !w.chars().all(|c| c.is_alphabetic() || c == '\'')
}

fn is_known_word(w: &str, dict: &SegmentDictionary) -> bool {
    dict.contains(w)
}

fn is_plain_word(w: &str, _: &SegmentDictionary) -> bool {
    let camel_case = w
        .chars()
        .zip(w.chars().skip(1))
        .any(|(a, b)| a.is_lowercase() && b.is_uppercase());
    if camel_case {
        return false;
    }
    let len = w.chars().count();
    let mut chars = w.chars();
    match chars.next() {
        Some(c) if c.is_lowercase() => len <= 6,
        Some(c) if c.is_uppercase() => len <= 7 || !chars.any(char::is_lowercase),
        _ => true,
    }
}

fn first_guard(word: &str, dict: &SegmentDictionary, table: &[(Guard, GuardCheck)]) -> Option<Guard> {
    table
        .iter()
        .find(|(_, check)| check(word, dict))
        .map(|(guard, _)| *guard)
}

static RE_ORDINAL_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+\))(.+)$").unwrap());
static RE_OPTION_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([WXYZ]\))(.+)$").unwrap());

/// Segment one whitespace-free token, or return it unchanged.
///
/// Order of decisions:
/// 1. shape guards (length, digits, hyphen, trailing punctuation, all caps);
/// 2. an ordinal (`12)`) or option (`W)`) prefix is kept verbatim and only
///    the remainder is segmented;
/// 3. content guards (non-letters, already a known word, not glued-looking);
/// 4. Viterbi split, see `split_known`.
///
/// Text behind a marker prefix skips the glued-looking check: `12)Whatis`
/// is glued by construction.
pub fn segment_word(word: &str, dict: &SegmentDictionary) -> String {
    if first_guard(word, dict, SHAPE_GUARDS).is_some() {
        return word.to_string();
    }

    for re in [&*RE_ORDINAL_PREFIX, &*RE_OPTION_PREFIX] {
        if let Some(caps) = re.captures(word) {
            let rest = &caps[2];
            let rest_out = if rest.chars().any(char::is_lowercase) {
                split_known(rest, dict).unwrap_or_else(|| rest.to_string())
            } else {
                rest.to_string()
            };
            return format!("{} {}", &caps[1], rest_out);
        }
    }

    if first_guard(word, dict, CONTENT_GUARDS).is_some() {
        return word.to_string();
    }
    split_known(word, dict).unwrap_or_else(|| word.to_string())
}

/// Viterbi split of `word`, or `None` when it should stay whole.
///
/// A split is accepted only with 2–9 pieces that are all known words, no
/// stray single letters (a non-initial "a" is fine) and no bound prefix as
/// the first piece. A leading capital is put back on the first piece.
fn split_known(word: &str, dict: &SegmentDictionary) -> Option<String> {
    if is_non_alphabetic(word, dict) || is_known_word(word, dict) {
        return None;
    }

    let mut pieces = dict.segment(word);
    let trusted = (MIN_SPLIT_WORDS..=MAX_SPLIT_WORDS).contains(&pieces.len())
        && pieces.iter().all(|p| dict.contains(p))
        && pieces
            .iter()
            .enumerate()
            .all(|(i, p)| p.chars().count() > 1 || (i > 0 && p == "a"))
        && !BOUND_PREFIXES.contains(&pieces[0].as_str());
    if !trusted {
        debug!("Keeping '{}' whole (best split {:?})", word, pieces);
        return None;
    }

    if word.chars().next().is_some_and(char::is_uppercase) {
        pieces[0] = capitalize(&pieces[0]);
    }
    Some(pieces.join(" "))
}

/// Which guard (if any) keeps `word` unchanged. Marker prefixes are not
/// unwrapped here; use [`segment_word`] for the full decision.
pub fn guard_for(word: &str, dict: &SegmentDictionary) -> Option<Guard> {
    first_guard(word, dict, SHAPE_GUARDS).or_else(|| first_guard(word, dict, CONTENT_GUARDS))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Run [`segment_word`] over every whitespace token, line by line.
///
/// Line breaks are kept; runs of spaces inside a line become one space.
pub fn segment_tokens(text: &str, dict: &SegmentDictionary) -> String {
    text.split('\n')
        .map(|line| {
            line.split_whitespace()
                .map(|token| segment_word(token, dict))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
