//! Integration tests for the text pipeline, run against the sample packet in
//! `./test_cases/sample_round.txt` (three pages, form-feed separated, with
//! page footers and one block whose spaces were lost in extraction).
//!
//! No native library or network access is needed:
//!   cargo test --test pipeline

use packet2json::pipeline::options::extract_options;
use packet2json::pipeline::segment::segment_blocks;
use packet2json::pipeline::spacing::normalize_spacing;
use packet2json::pipeline::wordseg::{guard_for, segment_word, Guard};
use packet2json::pipeline::{answer::clean_answer, footer::FooterStripper};
use packet2json::{
    extract, extract_batch, extract_text, Category, ExtractionConfig, ExtractionReport,
    OptionLabel, PageSelection, Pipeline, QuestionStyle, QuestionType, SegmentDictionary,
    SkipReason, SpacingStrategy,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route pipeline logs through the test harness (`RUST_LOG=debug` to see them).
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn sample_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_cases/sample_round.txt")
}

fn sample_text() -> String {
    std::fs::read_to_string(sample_path()).expect("sample packet is checked in")
}

fn sample_report() -> ExtractionReport {
    init_logging();
    extract_text(&sample_text(), "sample_round.txt", &ExtractionConfig::default()).unwrap()
}

/// Record invariants every emitted record must satisfy.
fn assert_record_invariants(report: &ExtractionReport) {
    for r in &report.records {
        assert!(!r.question_text.is_empty(), "empty question text: {r:?}");
        assert!(!r.correct_answer.is_empty(), "empty answer: {r:?}");
        assert_eq!(r.explanation, None);
        match r.question_style {
            QuestionStyle::MultipleChoice => {
                assert!(
                    r.options().iter().all(|o| o.is_some_and(|t| !t.is_empty())),
                    "MC record without four options: {r:?}"
                );
                assert!(
                    ["W", "X", "Y", "Z"].contains(&r.correct_answer.as_str()),
                    "MC answer outside W–Z: {r:?}"
                );
            }
            QuestionStyle::IdentifyAll | QuestionStyle::Rank => {
                assert!(r.option_count() >= 3, "too few items: {r:?}");
            }
            QuestionStyle::ShortAnswer => {
                assert_eq!(r.option_count(), 0, "short answer with options: {r:?}");
            }
        }
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[test]
fn scenario_glued_block_is_recovered() {
    let text = normalize_spacing(
        "TOSS-UP1)BIOLOGY–Short Answer WhatisDNA?ANSWER:DEOXYRIBONUCLEIC ACID",
        SpacingStrategy::Both,
        Some(SegmentDictionary::builtin()),
    );
    let blocks = segment_blocks(&text);
    assert_eq!(blocks.len(), 1);
    let b = &blocks[0];
    assert_eq!(b.question_type, QuestionType::Tossup);
    assert_eq!(b.ordinal, 1);
    assert_eq!(b.raw_category, "BIOLOGY");
    assert_eq!(b.raw_style, "Short Answer");
    assert_eq!(b.raw_body, "What is DNA?");
    assert_eq!(b.raw_answer, "DEOXYRIBONUCLEIC ACID");
}

#[test]
fn scenario_override_phrase_split_across_lines() {
    let report = extract_text(
        "BONUS\n4) CHEMISTRY – Short Answer Identify\nall of the following that are noble \
         gases: 1) neon; 2) iron; 3) argon ANSWER: 1 AND 3",
        "override.txt",
        &ExtractionConfig::default(),
    )
    .unwrap();
    assert!(report.diagnostics.is_empty(), "{:?}", report.diagnostics);
    let r = &report.records[0];
    assert_eq!(r.question_style, QuestionStyle::IdentifyAll);
    assert!(r.question_text.starts_with("Identify all of the following"), "{r:?}");
    assert_eq!(r.option_count(), 3);
    assert_eq!(r.option_1.as_deref(), Some("neon"));
    assert_eq!(r.option_3.as_deref(), Some("argon"));
    assert_eq!(r.correct_answer, "1 AND 3");
}

#[test]
fn scenario_four_labeled_options() {
    let e = extract_options(
        "Which is correct? W) First X) Second Y) Third Z) Fourth",
        QuestionStyle::MultipleChoice,
    );
    assert_eq!(e.prompt, "Which is correct?");
    let opts: Vec<(OptionLabel, &str)> =
        e.options.iter().map(|(k, v)| (*k, v.as_str())).collect();
    assert_eq!(
        opts,
        vec![
            (OptionLabel::W, "First"),
            (OptionLabel::X, "Second"),
            (OptionLabel::Y, "Third"),
            (OptionLabel::Z, "Fourth"),
        ]
    );
}

#[test]
fn scenario_multiple_choice_answer_letter() {
    let answer = clean_answer(
        "W) CONTINENTAL-CONTINENTAL CONVERGENCE",
        QuestionStyle::MultipleChoice,
        &FooterStripper::default(),
        false,
    );
    assert_eq!(answer.unwrap(), "W");
}

#[test]
fn scenario_footer_leak_in_answer() {
    let answer = clean_answer(
        "HIBERNATION MIT Science Bowl Invitational Round 1 Page 3",
        QuestionStyle::ShortAnswer,
        &FooterStripper::default(),
        false,
    );
    assert_eq!(answer.unwrap(), "HIBERNATION");
}

#[test]
fn glued_footer_does_not_eat_uppercase_answer() {
    let answer = clean_answer(
        "SULFURIC ACIDMITScienceBowlInvitationalRound1Page3",
        QuestionStyle::ShortAnswer,
        &FooterStripper::default(),
        false,
    );
    assert_eq!(answer.unwrap(), "SULFURIC ACID");

    let report = extract_text(
        "TOSS-UP 1) CHEMISTRY – Short Answer Which acid is H2SO4? \
         ANSWER: SULFURIC ACIDMITScienceBowlInvitationalRound1Page3",
        "glued_footer.txt",
        &ExtractionConfig::default(),
    )
    .unwrap();
    assert_eq!(report.records[0].correct_answer, "SULFURIC ACID");
}

// ── Properties ───────────────────────────────────────────────────────────────

#[test]
fn spacing_is_idempotent_on_clean_text() {
    let dict = SegmentDictionary::builtin();
    for text in [
        "Which of the following is a noble gas?",
        "What is the pH of a solution with NaCl and CaCl2 at 25 degrees?",
        "The probe reached Mars in 1997; it returned data for three months.",
        "TOSS-UP\n1) BIOLOGY – Short Answer What is mRNA? ANSWER: MESSENGER RNA",
        "Water cannot flow outside the cell together with sometimes heat.",
        "Sunlight became scarce, and the photographed samples were hereby kept nowhere near heat.",
        "Which of NH4Cl, K2Cr2O7, CH3Cl and H2Se is an ionic compound?",
        "BONUS\n4) CHEMISTRY – Short Answer Identify\nall of the following that are noble \
         gases: 1) neon; 2) iron; 3) argon ANSWER: 1 AND 3",
    ] {
        let once = normalize_spacing(text, SpacingStrategy::Both, Some(dict));
        assert_eq!(once, text, "clean text was rewritten");
        let twice = normalize_spacing(&once, SpacingStrategy::Both, Some(dict));
        assert_eq!(once, twice, "not idempotent for {text:?}");
    }
}

#[test]
fn common_words_are_not_split() {
    let dict = SegmentDictionary::builtin();
    for word in [
        "cannot", "together", "sometimes", "became", "nowhere", "hereby", "Sunlight", "outside",
        "nevertheless", "photographed", "Wavelength", "somewhere", "whatever", "understand",
        "therefore", "greenhouse", "rainforest", "earthquake", "bloodstream", "Northernmost",
    ] {
        assert_eq!(segment_word(word, dict), word, "{word} was split");
        assert_eq!(
            normalize_spacing(word, SpacingStrategy::Both, Some(dict)),
            word,
            "{word} was split"
        );
    }
}

#[test]
fn document_normalisation_is_idempotent() {
    let pipeline = Pipeline::new(&ExtractionConfig::default()).unwrap();
    let once = pipeline.normalize(&sample_text());
    assert_eq!(pipeline.normalize(&once), once);
}

#[test]
fn segmentation_guards_leave_tokens_alone() {
    let dict = SegmentDictionary::builtin();
    for (token, guard) in [
        ("the", Guard::TooShort),
        ("2025", Guard::Numeric),
        ("Tay-Sachs", Guard::Hyphenated),
        ("ofthe:", Guard::TerminalPunctuation),
        ("WHATISDNA", Guard::AllUppercase),
    ] {
        assert_eq!(guard_for(token, dict), Some(guard), "guard for {token}");
        assert_eq!(segment_word(token, dict), token);
    }
}

#[test]
fn marker_prefixes_are_kept_verbatim() {
    let dict = SegmentDictionary::builtin();
    assert_eq!(segment_word("12)Whatis", dict), "12) What is");
    assert_eq!(segment_word("W)ofthe", dict), "W) of the");
}

#[test]
fn sample_packet_blocks_in_document_order() {
    let pipeline = Pipeline::new(&ExtractionConfig::default()).unwrap();
    let blocks = segment_blocks(&pipeline.normalize(&sample_text()));
    let seen: Vec<(QuestionType, u32)> =
        blocks.iter().map(|b| (b.question_type, b.ordinal)).collect();
    use QuestionType::{Bonus, Tossup};
    assert_eq!(
        seen,
        vec![
            (Tossup, 1),
            (Bonus, 1),
            (Tossup, 2),
            (Bonus, 2),
            (Tossup, 3),
            (Bonus, 3),
            (Tossup, 4),
            (Bonus, 4),
            (Tossup, 5),
            (Tossup, 6),
            (Bonus, 6),
            (Tossup, 7),
        ]
    );
}

#[test]
fn sample_packet_records() {
    let report = sample_report();
    assert_record_invariants(&report);

    assert_eq!(report.stats.blocks_found, 12);
    assert_eq!(report.records.len(), 10);
    assert_eq!(report.stats.blocks_skipped, 2);
    assert_eq!(report.stats.total_pages, 3);

    let first = &report.records[0];
    assert_eq!(first.question_text, "What organelle is the site of cellular respiration?");
    assert_eq!(first.category, Category::Biology);
    assert_eq!(first.correct_answer, "MITOCHONDRIA");

    let argon = &report.records[2];
    assert_eq!(argon.question_style, QuestionStyle::MultipleChoice);
    assert_eq!(argon.option_3.as_deref(), Some("Argon"));
    assert_eq!(argon.correct_answer, "Y");

    let acids = &report.records[3];
    assert_eq!(acids.question_style, QuestionStyle::IdentifyAll);
    assert_eq!(acids.question_text, "Identify all of the following that are strong acids");
    assert_eq!(acids.option_1.as_deref(), Some("hydrochloric acid"));
    assert_eq!(acids.option_3.as_deref(), Some("nitric acid"));
    assert_eq!(acids.option_4, None);

    let plates = &report.records[4];
    assert_eq!(plates.category, Category::EarthSpace);
    assert_eq!(plates.correct_answer, "W");

    let last = report.records.last().unwrap();
    assert_eq!(last.question_text, "What is DNA?");
    assert_eq!(last.correct_answer, "DEOXYRIBONUCLEIC ACID");

    // No footer text survives anywhere.
    for r in &report.records {
        assert!(!r.question_text.contains("Science Bowl"), "{r:?}");
        assert!(!r.correct_answer.contains("Page"), "{r:?}");
    }
}

#[test]
fn sample_packet_diagnostics_and_warnings() {
    let report = sample_report();
    let reasons: Vec<(QuestionType, u32, &SkipReason)> = report
        .diagnostics
        .iter()
        .map(|d| (d.question_type, d.ordinal, &d.reason))
        .collect();
    assert_eq!(
        reasons,
        vec![
            (
                QuestionType::Tossup,
                4,
                &SkipReason::UnresolvedCategory { raw: "POETRY".into() }
            ),
            (
                QuestionType::Tossup,
                5,
                &SkipReason::MalformedOptions {
                    style: QuestionStyle::MultipleChoice,
                    found: 3,
                    required: 4
                }
            ),
        ]
    );

    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("BONUS 6"), "{:?}", report.warnings);

    let planets = report
        .records
        .iter()
        .find(|r| r.question_style == QuestionStyle::Rank && r.option_count() == 4)
        .expect("five-item ranking keeps its first four items");
    assert_eq!(planets.option_4.as_deref(), Some("Earth"));
}

#[test]
fn breakdown_counters() {
    let stats = sample_report().stats;
    assert_eq!(stats.by_type.get(&QuestionType::Tossup), Some(&5));
    assert_eq!(stats.by_type.get(&QuestionType::Bonus), Some(&5));
    assert_eq!(stats.by_category.get(&Category::Biology), Some(&3));
    assert_eq!(stats.by_style.get(&QuestionStyle::MultipleChoice), Some(&3));
    assert_eq!(stats.by_style.get(&QuestionStyle::Rank), Some(&2));
    assert_eq!(stats.by_style.get(&QuestionStyle::IdentifyAll), Some(&1));
}

#[test]
fn record_json_shape() {
    let report = sample_report();
    let value = serde_json::to_value(&report.records[1]).unwrap();
    let obj = value.as_object().unwrap();
    let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "category",
            "correct_answer",
            "explanation",
            "option_1",
            "option_2",
            "option_3",
            "option_4",
            "question_style",
            "question_text",
            "question_type",
            "source",
        ]
    );
    assert_eq!(obj["question_style"], "MULTIPLE_CHOICE");
    assert_eq!(obj["question_type"], "BONUS");
    assert_eq!(obj["category"], "BIOLOGY");
    assert_eq!(obj["source"], "USER_SUBMITTED");
}

#[test]
fn rules_only_leaves_glued_words() {
    let packet = "TOSS-UP 1) BIOLOGY – Short Answer Whichorganellecontainschlorophyll in \
                  plants? ANSWER: CHLOROPLAST";
    let rules = ExtractionConfig::builder()
        .spacing(SpacingStrategy::Rules)
        .build()
        .unwrap();
    let report = extract_text(packet, "glued.txt", &rules).unwrap();
    assert_eq!(
        report.records[0].question_text,
        "Whichorganellecontainschlorophyll in plants?"
    );

    let report = extract_text(packet, "glued.txt", &ExtractionConfig::default()).unwrap();
    assert_eq!(
        report.records[0].question_text,
        "Which organelle contains chlorophyll in plants?"
    );
}

// ── Async entry points ───────────────────────────────────────────────────────

#[tokio::test]
async fn extract_reads_text_packet_from_disk() {
    let report = extract(sample_path().to_str().unwrap(), &ExtractionConfig::default())
        .await
        .unwrap();
    assert_eq!(report.source_name, "sample_round.txt");
    assert_eq!(report.records.len(), 10);
    assert_record_invariants(&report);
}

#[tokio::test]
async fn page_selection_limits_the_text() {
    let config = ExtractionConfig::builder()
        .pages(PageSelection::Single(1))
        .build()
        .unwrap();
    let report = extract(sample_path().to_str().unwrap(), &config).await.unwrap();
    assert_eq!(report.stats.total_pages, 1);
    assert_eq!(report.records.len(), 3);
}

#[tokio::test]
async fn batch_merges_stats() {
    let path = sample_path().to_string_lossy().to_string();
    let results = extract_batch(vec![path.clone(), path], &ExtractionConfig::default())
        .await
        .unwrap();
    let mut total = packet2json::ExtractionStats::default();
    for r in &results {
        total.merge(&r.as_ref().unwrap().stats);
    }
    assert_eq!(total.records_emitted, 20);
    assert_eq!(total.blocks_skipped, 4);
}
