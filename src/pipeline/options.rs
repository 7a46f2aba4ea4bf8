//! Option and numbered-item extraction from a question body.
//!
//! Multiple-choice bodies carry labeled options `W) … X) … Y) … Z) …`;
//! identify-all and ranking bodies carry numbered items `1) …; 2) …; 3) …`
//! which are mapped onto the same four labels (1 → W … 4 → Z).

use crate::output::{OptionLabel, OptionMap, QuestionStyle};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_LABEL_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:^|\s)([WXYZ])\)").unwrap());
static RE_NUMBER_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s;:])(\d{1,2})\)").unwrap());
static RE_ANSWER_FRAGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*ANSWER\s*:").unwrap());

/// A question body split into its prompt and options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedOptions {
    /// Body text before the first marker, whitespace collapsed.
    pub prompt: String,
    pub options: OptionMap,
    /// Numbered items past the fourth. They have no slot and are lost.
    pub dropped_items: usize,
}

/// A marker found in the body: where its text starts and where the marker
/// itself begins.
struct Marker {
    start: usize,
    text_start: usize,
}

/// Split `body` according to `style`.
///
/// `SHORT_ANSWER` bodies are never split. Numbered styles fall back to
/// labeled markers when no `1)` item is present.
pub fn extract_options(body: &str, style: QuestionStyle) -> ExtractedOptions {
    match style {
        QuestionStyle::ShortAnswer => ExtractedOptions {
            prompt: collapse(body),
            ..Default::default()
        },
        QuestionStyle::MultipleChoice => extract_labeled(body),
        QuestionStyle::IdentifyAll | QuestionStyle::Rank => {
            let numbered = extract_numbered(body);
            if numbered.options.is_empty() {
                extract_labeled(body)
            } else {
                numbered
            }
        }
    }
}

/// Labeled mode: `W)`..`Z)` at token start, accepted in increasing label
/// order so a later reference to "W)" inside option text is not a new option.
pub fn extract_labeled(body: &str) -> ExtractedOptions {
    let mut markers: Vec<(OptionLabel, Marker)> = Vec::new();
    for caps in RE_LABEL_MARKER.captures_iter(body) {
        let (Some(whole), Some(letter)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(label) = letter.as_str().chars().next().and_then(OptionLabel::from_char) else {
            continue;
        };
        if markers.last().is_some_and(|(last, _)| *last >= label) {
            continue;
        }
        markers.push((
            label,
            Marker {
                start: letter.start(),
                text_start: whole.end(),
            },
        ));
    }

    let Some((_, first)) = markers.first() else {
        return unsplit(body);
    };
    let prompt = collapse(&body[..first.start]);

    let mut options = OptionMap::new();
    for (i, (label, marker)) in markers.iter().enumerate() {
        let end = markers.get(i + 1).map_or(body.len(), |(_, next)| next.start);
        let raw = &body[marker.text_start..end];
        let raw = match RE_ANSWER_FRAGMENT.find(raw) {
            Some(m) => &raw[..m.start()],
            None => raw,
        };
        options.insert(*label, clean_option(raw));
    }

    ExtractedOptions {
        prompt,
        options,
        dropped_items: 0,
    }
}

/// Numbered mode: `1)`, `2)`, … accepted only in sequence.
pub fn extract_numbered(body: &str) -> ExtractedOptions {
    let mut markers: Vec<Marker> = Vec::new();
    for caps in RE_NUMBER_MARKER.captures_iter(body) {
        let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let expected = markers.len() + 1;
        if number.as_str().parse::<usize>().ok() != Some(expected) {
            continue;
        }
        markers.push(Marker {
            start: number.start(),
            text_start: whole.end(),
        });
    }

    let Some(first) = markers.first() else {
        return unsplit(body);
    };
    let prompt = collapse(&body[..first.start])
        .trim_end_matches([':', ';', ',', '.'])
        .trim_end()
        .to_string();

    let mut options = OptionMap::new();
    for (i, marker) in markers.iter().enumerate() {
        let Some(label) = OptionLabel::from_position(i + 1) else {
            break;
        };
        let end = markers.get(i + 1).map_or(body.len(), |next| next.start);
        options.insert(label, clean_option(&body[marker.text_start..end]));
    }

    ExtractedOptions {
        prompt,
        options,
        dropped_items: markers.len().saturating_sub(OptionLabel::ALL.len()),
    }
}

fn unsplit(body: &str) -> ExtractedOptions {
    ExtractedOptions {
        prompt: collapse(body),
        ..Default::default()
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collapse whitespace and drop trailing list punctuation (`;`, `,`, and a
/// single `.`).
fn clean_option(raw: &str) -> String {
    let text = collapse(raw);
    let text = text.trim_end_matches([';', ',']).trim_end();
    let text = text.strip_suffix('.').unwrap_or(text);
    text.trim_end().to_string()
}
