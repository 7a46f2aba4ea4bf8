//! Answer cleanup: footer leaks out, whitespace collapsed, multiple-choice
//! answers reduced to their option letter.

use super::footer::FooterStripper;
use crate::error::SkipReason;
use crate::output::QuestionStyle;
use once_cell::sync::Lazy;
use regex::Regex;

static RE_OPTION_LETTER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([WXYZ])\b").unwrap());

/// `(ACCEPT: …)`, `[DO NOT ACCEPT: …]`, `(ALSO ACCEPT …)`.
static RE_ACCEPTANCE_NOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s*[\(\[]\s*(?:ALSO\s+|DO\s+NOT\s+)?ACCEPT\b[^\)\]]*[\)\]]").unwrap()
});

/// Produce the final `correct_answer` for a block.
///
/// # Errors
/// - [`SkipReason::EmptyAnswer`] when nothing is left after cleanup.
/// - [`SkipReason::UnresolvedAnswer`] when a multiple-choice answer has no
///   standalone W/X/Y/Z letter.
pub fn clean_answer(
    raw: &str,
    style: QuestionStyle,
    footer: &FooterStripper,
    strip_acceptance_notes: bool,
) -> Result<String, SkipReason> {
    let stripped = footer.strip_trailing_fragments(&footer.strip(raw));
    let mut answer = stripped.split_whitespace().collect::<Vec<_>>().join(" ");

    if answer.is_empty() {
        return Err(SkipReason::EmptyAnswer);
    }

    if style == QuestionStyle::MultipleChoice {
        let upper = answer.to_uppercase();
        return RE_OPTION_LETTER
            .captures(&upper)
            .map(|caps| caps[1].to_string())
            .ok_or(SkipReason::UnresolvedAnswer { raw: answer });
    }

    if strip_acceptance_notes {
        answer = RE_ACCEPTANCE_NOTE.replace_all(&answer, "").trim().to_string();
        if answer.is_empty() {
            return Err(SkipReason::EmptyAnswer);
        }
    }
    Ok(answer)
}
