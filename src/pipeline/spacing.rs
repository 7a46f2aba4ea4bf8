//! Spacing repair: put back the inter-word spaces the text backend lost.
//!
//! Packet PDFs routinely come out as `TOSS-UP1)BIOLOGY–Short Answer
//! WhatisDNA?ANSWER:…`. Two passes fix this:
//!
//! 1. An ordered cascade of [`SpacingRule`]s. Each rule is a regex plus a
//!    rewrite; rules run in table order, once each, and later rules rely on
//!    the work of earlier ones (the section-keyword line break assumes the
//!    case split already ran).
//! 2. Dictionary segmentation of whatever glued lowercase runs remain, see
//!    [`super::wordseg`].
//!
//! Scientific tokens that legitimately mix case or letters and digits
//! (`NaCl`, `Fe2O3`, `pH`, `mRNA`, `3rd`, `U.S.A.`, `f(x)`) are protected so
//! that correctly spaced text passes through unchanged.

use super::wordseg::{segment_tokens, SegmentDictionary};
use crate::config::SpacingStrategy;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;

/// How a rule rewrites each match.
#[derive(Clone, Copy)]
pub enum Rewrite {
    /// `regex` replacement template (`$1 $2`).
    Template(&'static str),
    /// Computed replacement. Receives the text before the match and the
    /// captures; `None` keeps the match unchanged.
    With(fn(&str, &Captures) -> Option<String>),
}

/// One step of the cascade.
pub struct SpacingRule {
    pub name: &'static str,
    pattern: Regex,
    rewrite: Rewrite,
}

impl SpacingRule {
    fn new(name: &'static str, pattern: &str, rewrite: Rewrite) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).unwrap(),
            rewrite,
        }
    }

    /// Apply this rule to every match in `text`.
    pub fn apply(&self, text: &str) -> String {
        match self.rewrite {
            Rewrite::Template(template) => self.pattern.replace_all(text, template).into_owned(),
            Rewrite::With(rewrite) => {
                let mut out = String::with_capacity(text.len() + 16);
                let mut last = 0;
                for caps in self.pattern.captures_iter(text) {
                    let Some(m) = caps.get(0) else { continue };
                    out.push_str(&text[last..m.start()]);
                    match rewrite(&text[..m.start()], &caps) {
                        Some(replacement) => out.push_str(&replacement),
                        None => out.push_str(m.as_str()),
                    }
                    last = m.end();
                }
                out.push_str(&text[last..]);
                out
            }
        }
    }
}

impl std::fmt::Debug for SpacingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpacingRule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish()
    }
}

static RULES: Lazy<Vec<SpacingRule>> = Lazy::new(|| {
    vec![
        // ── Rule a: lowercase → uppercase ("theAlps") ──
        SpacingRule::new(
            "lower_upper",
            r"[A-Za-z0-9]*[a-z][A-Z][A-Za-z0-9]*",
            Rewrite::With(split_case_boundaries),
        ),
        // ── Rule b: lowercase ↔ digit ("question1", "2slices") ──
        SpacingRule::new(
            "letter_digit",
            r"[A-Za-z0-9]*(?:[a-z]\d|\d[a-z])[A-Za-z0-9]*",
            Rewrite::With(split_digit_boundaries),
        ),
        // ── Rule c: digit or `N)` → capitalised word ("1)Earth") ──
        SpacingRule::new(
            "digit_word",
            r"[A-Za-z0-9]*\d\)?[A-Z][a-z][A-Za-z0-9]*",
            Rewrite::With(split_digit_word),
        ),
        // ── Rule d: sentence punctuation → uppercase ("Alps.The") ──
        SpacingRule::new("punct_upper", r"[.!?;:][A-Z]", Rewrite::With(space_after_punctuation)),
        // ── Rule e: word → "(" ("choice(W)") ──
        SpacingRule::new("word_paren", r"([A-Za-z]+)\(", Rewrite::With(space_before_paren)),
        // ── Rule f: section keyword glued to its ordinal ──
        SpacingRule::new(
            "section_ordinal",
            r"(TOSS-UP|BONUS)(\d+\))",
            Rewrite::Template("$1\n$2"),
        ),
        // ── Rule g: "1)BIOLOGY" ──
        SpacingRule::new("ordinal_caps", r"(\d+\))([A-Z]{2,})", Rewrite::Template("$1 $2")),
        // ── Rule h: option marker glued to the previous word ──
        SpacingRule::new("option_marker", r"([a-z])([WXYZ]\))", Rewrite::Template("$1 $2")),
        // ── Rule i: "ANSWER:W" ──
        SpacingRule::new("answer_keyword", r"ANSWER:([A-Za-z0-9])", Rewrite::Template("ANSWER: $1")),
        // ── Rule j: known multi-word terms ──
        SpacingRule::new("term_table", &term_pattern(), Rewrite::With(replace_term)),
    ]
});

/// The cascade in application order.
pub fn rules() -> &'static [SpacingRule] {
    &RULES
}

// ── Protections ──────────────────────────────────────────────────────────────

const ELEMENTS: &[&str] = &[
    "H", "He", "Li", "Be", "B", "C", "N", "O", "F", "Ne", "Na", "Mg", "Al", "Si", "P", "S", "Cl",
    "Ar", "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As",
    "Se", "Br", "Kr", "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In",
    "Sn", "Sb", "Te", "I", "Xe", "Cs", "Ba", "La", "Ce", "Pr", "Nd", "Pm", "Sm", "Eu", "Gd", "Tb",
    "Dy", "Ho", "Er", "Tm", "Yb", "Lu", "Hf", "Ta", "W", "Re", "Os", "Ir", "Pt", "Au", "Hg", "Tl",
    "Pb", "Bi", "Po", "At", "Rn", "Fr", "Ra", "Ac", "Th", "Pa", "U", "Np", "Pu", "Am", "Cm", "Bk",
    "Cf", "Es", "Fm", "Md", "No", "Lr", "Rf", "Db", "Sg", "Bh", "Hs", "Mt", "Ds", "Rg", "Cn", "Nh",
    "Fl", "Mc", "Lv", "Ts", "Og",
];

/// Mixed-case tokens that are spelled that way on purpose.
const PROTECTED_MIXED_CASE: &[&str] = &[
    "pH", "pKa", "pKb", "pOH", "mRNA", "tRNA", "rRNA", "cDNA", "siRNA", "miRNA", "snRNA", "mtDNA",
    "dNTP", "NaOH", "kJ", "kW", "kWh", "kV", "kHz", "MHz", "GHz", "Hz", "eV", "keV", "MeV", "GeV",
    "TeV", "mL", "dL", "kPa", "MPa", "GPa", "hPa", "mA", "mV", "mW", "MW", "GW", "mM", "nM", "kN",
    "mN", "mJ", "kB", "MB", "GB", "HeLa", "CoA", "NADH", "NADPH", "FADH", "iPSC", "iPSCs",
];

const PAREN_FUNCTIONS: &[&str] = &["sin", "cos", "tan", "log", "ln", "exp", "sqrt", "max", "min"];

static RE_ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(?:st|nd|rd|th|s)$").unwrap());
static RE_HYBRIDISATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^d?\d?sp\d?(?:d\d?)?$").unwrap());
static RE_SCI_NOTATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+[eE]\d+$").unwrap());
static RE_DIGIT_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d\)?)([A-Z][a-z])").unwrap());
static RE_SURNAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^Ma?c[A-Z][a-z]+$").unwrap());

/// True when `token` parses as a run of element symbols with optional
/// counts (`NaCl`, `CaCl2`, `Fe2O3`).
pub fn is_chemical_formula(token: &str) -> bool {
    let chars: Vec<char> = token.chars().collect();
    let mut i = 0;
    let mut symbols = 0;
    while i < chars.len() {
        if !chars[i].is_ascii_uppercase() {
            return false;
        }
        let mut end = i + 1;
        if end < chars.len() && chars[end].is_ascii_lowercase() {
            end += 1;
        }
        let symbol: String = chars[i..end].iter().collect();
        if !ELEMENTS.contains(&symbol.as_str()) {
            return false;
        }
        symbols += 1;
        while end < chars.len() && chars[end].is_ascii_digit() {
            end += 1;
        }
        i = end;
    }
    symbols > 0
}

fn is_protected_mixed_case(token: &str) -> bool {
    let singular = token.strip_suffix('s').unwrap_or(token);
    PROTECTED_MIXED_CASE.contains(&token)
        || PROTECTED_MIXED_CASE.contains(&singular)
        || RE_SURNAME.is_match(token)
}

fn insert_spaces(token: &str, boundary: fn(char, char) -> bool) -> String {
    let mut out = String::with_capacity(token.len() + 4);
    let mut prev: Option<char> = None;
    for c in token.chars() {
        if prev.is_some_and(|p| boundary(p, c)) {
            out.push(' ');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

// ── Rewrites ─────────────────────────────────────────────────────────────────

fn split_case_boundaries(_before: &str, caps: &Captures) -> Option<String> {
    let token = caps.get(0)?.as_str();
    if is_chemical_formula(token) || is_protected_mixed_case(token) {
        return None;
    }
    Some(insert_spaces(token, |a, b| {
        a.is_ascii_lowercase() && b.is_ascii_uppercase()
    }))
}

fn split_digit_boundaries(_before: &str, caps: &Captures) -> Option<String> {
    let token = caps.get(0)?.as_str();
    if is_chemical_formula(token)
        || RE_ORDINAL.is_match(token)
        || RE_HYBRIDISATION.is_match(token)
        || RE_SCI_NOTATION.is_match(token)
    {
        return None;
    }
    Some(insert_spaces(token, |a, b| {
        (a.is_ascii_lowercase() && b.is_ascii_digit())
            || (a.is_ascii_digit() && b.is_ascii_lowercase())
    }))
}

fn split_digit_word(_before: &str, caps: &Captures) -> Option<String> {
    let token = caps.get(0)?.as_str();
    if is_chemical_formula(token) {
        return None;
    }
    Some(RE_DIGIT_WORD.replace_all(token, "$1 $2").into_owned())
}

fn space_after_punctuation(before: &str, caps: &Captures) -> Option<String> {
    let m = caps.get(0)?.as_str();
    let mut chars = m.chars();
    let (punct, next) = (chars.next()?, chars.next()?);
    if punct == '.' {
        // Dotted initialism: a lone capital right before the period.
        let mut tail = before.chars().rev();
        let last = tail.next();
        let before_last = tail.next();
        if last.is_some_and(|c| c.is_ascii_uppercase())
            && !before_last.is_some_and(char::is_alphabetic)
        {
            return None;
        }
    }
    Some(format!("{} {}", punct, next))
}

fn space_before_paren(_before: &str, caps: &Captures) -> Option<String> {
    let word = caps.get(1)?.as_str();
    if word.len() == 1 || PAREN_FUNCTIONS.contains(&word.to_ascii_lowercase().as_str()) {
        return None;
    }
    Some(format!("{} (", word))
}

// ── Rule j table ─────────────────────────────────────────────────────────────

/// Glued phrases seen in real packets, keyed lowercase.
const TERMS: &[(&str, &str)] = &[
    ("earthandspace", "earth and space"),
    ("multiplechoice", "multiple choice"),
    ("shortanswer", "short answer"),
    ("identifyall", "identify all"),
    ("ofthefollowing", "of the following"),
    ("whichofthefollowing", "which of the following"),
    ("ofwhich", "of which"),
    ("typesof", "types of"),
    ("whatisthe", "what is the"),
    ("whatis", "what is"),
    ("howmany", "how many"),
    ("giventhat", "given that"),
    ("supposethat", "suppose that"),
    ("thatare", "that are"),
    ("continentalconvergence", "continental convergence"),
    ("oceanicconvergence", "oceanic convergence"),
    ("continentaldivergence", "continental divergence"),
    ("tectonicboundaries", "tectonic boundaries"),
    ("violatestheoctetrule", "violates the octet rule"),
    ("sulfurtetrafluoride", "sulfur tetrafluoride"),
    ("dinitrogentetroxide", "dinitrogen tetroxide"),
    ("phosphorustrichloride", "phosphorus trichloride"),
    ("sulfuricacid", "sulfuric acid"),
    ("hydrofluoricacid", "hydrofluoric acid"),
    ("hydrochloricacid", "hydrochloric acid"),
    ("perchloricacid", "perchloric acid"),
    ("nitricacid", "nitric acid"),
    ("sodiumhydroxide", "sodium hydroxide"),
    ("meterspersecondsquared", "meters per second squared"),
    ("equivalencepoint", "equivalence point"),
    ("resonanceform", "resonance form"),
    ("phylogenetictrees", "phylogenetic trees"),
    ("geneticdrift", "genetic drift"),
    ("stormsurge", "storm surge"),
    ("kettlelake", "kettle lake"),
    ("intermittentstream", "intermittent stream"),
    ("submarinevalley", "submarine valley"),
    ("alleeeffect", "Allee effect"),
];

static TERM_LOOKUP: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| TERMS.iter().copied().collect());

fn term_pattern() -> String {
    let mut keys: Vec<&str> = TERMS.iter().map(|(k, _)| *k).collect();
    // Longest first so "whichofthefollowing" wins over "ofthefollowing".
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));
    let alternatives: Vec<String> = keys.iter().map(|k| regex::escape(k)).collect();
    format!("(?i)(?:{})", alternatives.join("|"))
}

fn replace_term(_before: &str, caps: &Captures) -> Option<String> {
    let found = caps.get(0)?.as_str();
    let replacement = TERM_LOOKUP.get(found.to_ascii_lowercase().as_str())?;
    let letters = || found.chars().filter(|c| c.is_alphabetic());
    if letters().all(|c| c.is_uppercase()) {
        Some(replacement.to_uppercase())
    } else if found.chars().next().is_some_and(char::is_uppercase) {
        let mut chars = replacement.chars();
        chars
            .next()
            .map(|first| first.to_uppercase().chain(chars).collect())
    } else {
        Some(replacement.to_string())
    }
}

// ── Whitespace cleanup ───────────────────────────────────────────────────────

static RE_MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());
static RE_SPACE_AROUND_NEWLINE: Lazy<Regex> = Lazy::new(|| Regex::new(r" *\n *").unwrap());
static RE_EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn normalise_whitespace_chars(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace(['\t', '\u{a0}'], " ")
}

fn collapse_whitespace(text: &str) -> String {
    let s = RE_MULTI_SPACE.replace_all(text, " ");
    let s = RE_SPACE_AROUND_NEWLINE.replace_all(&s, "\n");
    let s = RE_EXCESS_NEWLINES.replace_all(&s, "\n\n");
    s.trim().to_string()
}

// ── Entry points ─────────────────────────────────────────────────────────────

/// Run the rule cascade and the whitespace cleanup.
pub fn apply_rules(text: &str) -> String {
    let mut s = normalise_whitespace_chars(text);
    for rule in rules() {
        s = rule.apply(&s);
    }
    collapse_whitespace(&s)
}

/// Repair spacing according to `strategy`.
///
/// `dict` is only consulted by the dictionary strategies; when it is `None`
/// they behave like [`SpacingStrategy::Rules`] / [`SpacingStrategy::None`].
pub fn normalize_spacing(
    text: &str,
    strategy: SpacingStrategy,
    dict: Option<&SegmentDictionary>,
) -> String {
    let mut s = if strategy.uses_rules() {
        apply_rules(text)
    } else {
        collapse_whitespace(&normalise_whitespace_chars(text))
    };
    if let (true, Some(dict)) = (strategy.uses_dictionary(), dict) {
        s = collapse_whitespace(&segment_tokens(&s, dict));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> &'static SpacingRule {
        rules().iter().find(|r| r.name == name).unwrap()
    }

    #[test]
    fn cascade_order_is_fixed() {
        let names: Vec<&str> = rules().iter().map(|r| r.name).collect();
        assert_eq!(
            names,
            vec![
                "lower_upper",
                "letter_digit",
                "digit_word",
                "punct_upper",
                "word_paren",
                "section_ordinal",
                "ordinal_caps",
                "option_marker",
                "answer_keyword",
                "term_table",
            ]
        );
    }

    #[test]
    fn splits_case_boundaries() {
        assert_eq!(rule("lower_upper").apply("theAlps inItaly"), "the Alps in Italy");
        assert_eq!(rule("lower_upper").apply("WhatisDNA"), "Whatis DNA");
    }

    #[test]
    fn case_split_protects_formulas_and_units() {
        let r = rule("lower_upper");
        for token in ["NaCl", "CaCl2", "Fe2O3", "pH", "pKa", "mRNA", "MeV", "kJ", "HeLa", "McClintock"] {
            assert_eq!(r.apply(token), token, "token {token}");
        }
    }

    #[test]
    fn splits_letter_digit_boundaries() {
        let r = rule("letter_digit");
        assert_eq!(r.apply("question1"), "question 1");
        assert_eq!(r.apply("2slices"), "2 slices");
        for token in ["3rd", "1990s", "sp3", "d2sp3", "Fe2O3", "6e23"] {
            assert_eq!(r.apply(token), token, "token {token}");
        }
    }

    #[test]
    fn punctuation_rule_keeps_initialisms() {
        let r = rule("punct_upper");
        assert_eq!(r.apply("Alps.The"), "Alps. The");
        assert_eq!(r.apply("DNA?ANSWER"), "DNA? ANSWER");
        assert_eq!(r.apply("the U.S.A. is"), "the U.S.A. is");
    }

    #[test]
    fn paren_rule_keeps_function_calls() {
        let r = rule("word_paren");
        assert_eq!(r.apply("choice(W)"), "choice (W)");
        assert_eq!(r.apply("f(x) and sin(x)"), "f(x) and sin(x)");
    }

    #[test]
    fn section_and_marker_rules() {
        assert_eq!(rule("section_ordinal").apply("TOSS-UP1)"), "TOSS-UP\n1)");
        assert_eq!(rule("ordinal_caps").apply("1)BIOLOGY"), "1) BIOLOGY");
        assert_eq!(rule("option_marker").apply("choiceW) one"), "choice W) one");
        assert_eq!(rule("answer_keyword").apply("ANSWER:W)"), "ANSWER: W)");
        assert_eq!(rule("digit_word").apply("1)Earth"), "1) Earth");
    }

    #[test]
    fn digit_word_rule_keeps_formulas() {
        let r = rule("digit_word");
        for token in ["NH4Cl", "K2Cr2O7", "CH3Cl", "H2Se", "Mg3N2", "NH4Cl,"] {
            assert_eq!(r.apply(token), token, "token {token}");
        }
        assert_eq!(r.apply("see 2)Mars and 3)Venus"), "see 2) Mars and 3) Venus");
        assert_eq!(r.apply("TOSS-UP7)Which"), "TOSS-UP7) Which");
    }

    #[test]
    fn term_table_keeps_case_shape() {
        let r = rule("term_table");
        assert_eq!(r.apply("EARTHANDSPACE"), "EARTH AND SPACE");
        assert_eq!(r.apply("Continentalconvergence"), "Continental convergence");
        assert_eq!(r.apply("whichofthefollowing"), "which of the following");
    }

    #[test]
    fn full_cascade_on_packet_header() {
        let out = apply_rules("TOSS-UP1)BIOLOGY–Short Answer WhatisDNA?ANSWER:DEOXYRIBONUCLEIC ACID");
        assert_eq!(
            out,
            "TOSS-UP\n1) BIOLOGY–Short Answer What is DNA? ANSWER: DEOXYRIBONUCLEIC ACID"
        );
    }

    #[test]
    fn whitespace_cleanup() {
        assert_eq!(apply_rules("a  b \n  c\r\n\r\n\r\n\r\nd  "), "a b\nc\n\nd");
    }

    #[test]
    fn idempotent_on_clean_text() {
        let clean = "TOSS-UP\n1) CHEMISTRY Multiple Choice Which of the following salts, NaCl or \
                     CaCl2, has a pH above 7 in the U.S.A. standard? W) NaCl X) CaCl2 Y) Fe2O3 \
                     Z) the 3rd one ANSWER: W) NaCl";
        assert_eq!(apply_rules(clean), clean);
        let once = apply_rules("theAlps.TheBONUS2)PHYSICS short choiceW)");
        assert_eq!(apply_rules(&once), once);
    }

    #[test]
    fn idempotent_on_formulas_and_prose() {
        for clean in [
            "Heating NH4Cl releases ammonia, and K2Cr2O7 oxidises CH3Cl but not H2Se.",
            "W) NH4Cl X) K2Cr2O7 Y) CH3Cl Z) H2Se",
            "Sunlight cannot reach the cell together with heat; nowhere else became warmer.",
        ] {
            assert_eq!(apply_rules(clean), clean);
            let both = normalize_spacing(
                clean,
                SpacingStrategy::Both,
                Some(SegmentDictionary::builtin()),
            );
            assert_eq!(both, clean);
        }
    }

    #[test]
    fn strategies() {
        let dict = SegmentDictionary::from_counts([("cell", 10u64), ("walls", 10)]);
        let text = "Cellwalls  hold";
        assert_eq!(normalize_spacing(text, SpacingStrategy::None, Some(&dict)), "Cellwalls hold");
        assert_eq!(normalize_spacing(text, SpacingStrategy::Rules, Some(&dict)), "Cellwalls hold");
        assert_eq!(
            normalize_spacing(text, SpacingStrategy::Dictionary, Some(&dict)),
            "Cell walls hold"
        );
        assert_eq!(
            normalize_spacing("theCellwalls", SpacingStrategy::Both, Some(&dict)),
            "the Cell walls"
        );
        assert_eq!(normalize_spacing("theCellwalls", SpacingStrategy::Both, None), "the Cellwalls");
    }

    #[test]
    fn formula_detection() {
        assert!(is_chemical_formula("NaCl"));
        assert!(is_chemical_formula("H2SO4"));
        assert!(!is_chemical_formula("Alps"));
        assert!(!is_chemical_formula("theAlps"));
        assert!(!is_chemical_formula(""));
    }
}
