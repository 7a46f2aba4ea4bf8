//! CLI binary for packet2json.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints records, reports or previews.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use packet2json::{
    document_text, extract_batch, write_json_atomic, ExtractionConfig, ExtractionProgressCallback,
    ExtractionReport, ExtractionStats, PageSelection, ProgressCallback, QuestionRecord,
    SpacingStrategy,
};
use std::collections::{HashMap, HashSet};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// One bar across the documents of the run, with a log line per document.
/// Documents finish out of order when `--concurrency` > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    names: Mutex<HashMap<usize, String>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening packets…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} packets  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
    }

    /// Name and elapsed seconds for a finished document.
    fn finish(&self, index: usize) -> (String, f64) {
        let elapsed = self
            .start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let name = self
            .names
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .unwrap_or_default();
        (name, elapsed)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.activate_bar(total_documents);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Extracting {total_documents} packet(s)…"))
        ));
    }

    fn on_document_start(&self, index: usize, _total: usize, input: &str) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        let name = short_name(input);
        self.bar.set_message(name.clone());
        if let Ok(mut m) = self.names.lock() {
            m.insert(index, name);
        }
    }

    fn on_document_complete(&self, index: usize, _total: usize, records: usize) {
        let (name, secs) = self.finish(index);
        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            green("✓"),
            name,
            dim(&format!("{records:>4} records")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, _total: usize, error: &str) {
        let (name, secs) = self.finish(index);

        // First line only; the library's messages carry hints on later lines.
        let first = error.lines().next().unwrap_or(error);
        let msg = match first.char_indices().nth(80) {
            Some((idx, _)) => format!("{}…", &first[..idx]),
            None => first.to_string(),
        };

        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            red("✗"),
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_documents: usize, success_count: usize) {
        let failed = total_documents.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} packet(s) extracted successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} packets extracted  ({} failed)",
                if failed == total_documents {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_documents,
                red(&failed.to_string()),
            );
        }
    }
}

fn short_name(input: &str) -> String {
    input
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(input)
        .to_string()
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Records as a JSON array on stdout
  packet2json "Round 1.pdf"

  # A whole packet set into one file, tagged with a source label
  packet2json --source MIT_2025 packets/*.pdf -o mit2025.json

  # One JSON file per packet
  packet2json packets/*.pdf --output-dir out/

  # Records plus skipped blocks and statistics
  packet2json --report "Round 1.pdf"

  # Eyeball what would be imported
  packet2json --preview "Round 1.pdf"

  # Debug a packet: print the repaired text the segmenter sees
  packet2json --emit-text "Round 1.pdf"

  # Pre-extracted text (pages separated by form feeds)
  pdftotext "Round 1.pdf" round1.txt && packet2json round1.txt

  # Strip an event-specific footer
  packet2json --footer-pattern 'Regional\s*Finals\s*\d{4}' round.pdf

SPACING STRATEGIES:
  both        rule cascade, then dictionary segmentation (default)
  rules       rule cascade only
  dictionary  dictionary segmentation only
  none        whitespace cleanup only

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Directory containing libpdfium (else the system library)
  RUST_LOG          Override the log filter (e.g. packet2json=debug)
"#;

/// Extract structured question records from quiz-bowl packet PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "packet2json",
    version,
    about = "Extract structured question records from quiz-bowl packet PDFs",
    long_about = "Extract toss-up and bonus questions from quiz-bowl packets (PDF files, \
pre-extracted text, or URLs) into JSON records: question text, category, style, type, \
answer options and the cleaned answer. Blocks that cannot be parsed are skipped and reported.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Packet files (PDF or text) or HTTP/HTTPS URLs.
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<String>,

    /// Write the combined JSON array to this file instead of stdout.
    #[arg(short, long, env = "PACKET2JSON_OUTPUT", conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// Write one `<name>.json` per input into this directory.
    #[arg(long, env = "PACKET2JSON_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Value of every record's `source` field.
    #[arg(long, env = "PACKET2JSON_SOURCE", default_value = packet2json::DEFAULT_SOURCE)]
    source: String,

    /// Spacing repair: both, rules, dictionary, none.
    #[arg(long, env = "PACKET2JSON_SPACING", default_value = "both")]
    spacing: SpacingStrategy,

    /// Unigram file (`word count` per line) replacing the embedded dictionary.
    #[arg(long, env = "PACKET2JSON_DICTIONARY")]
    dictionary: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PACKET2JSON_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted packets.
    #[arg(long, env = "PACKET2JSON_PASSWORD")]
    password: Option<String>,

    /// Extra footer regex to strip (repeatable).
    #[arg(long = "footer-pattern", value_name = "REGEX")]
    footer_patterns: Vec<String>,

    /// Remove "(ACCEPT: …)" style notes from non-multiple-choice answers.
    #[arg(long, env = "PACKET2JSON_STRIP_ACCEPT_NOTES")]
    strip_accept_notes: bool,

    /// Print the normalised document text instead of records.
    #[arg(long, conflicts_with_all = ["report", "preview"])]
    emit_text: bool,

    /// Output full reports (records, skipped blocks, warnings, stats).
    #[arg(long, conflicts_with = "preview")]
    report: bool,

    /// Human-readable listing of what would be extracted; writes no JSON.
    #[arg(long)]
    preview: bool,

    /// Number of packets processed at once.
    #[arg(short, long, env = "PACKET2JSON_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PACKET2JSON_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long, env = "PACKET2JSON_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PACKET2JSON_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PACKET2JSON_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs; skipped-block warnings still show.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.emit_text;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Text-only mode ───────────────────────────────────────────────────
    if cli.emit_text {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for input in &cli.inputs {
            let text = document_text(input, &config)
                .await
                .with_context(|| format!("Failed to read '{}'", input))?;
            if cli.inputs.len() > 1 {
                writeln!(handle, "===== {} =====", input).context("Failed to write to stdout")?;
            }
            writeln!(handle, "{text}").context("Failed to write to stdout")?;
        }
        return Ok(());
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let start = Instant::now();
    let results = extract_batch(cli.inputs.clone(), &config)
        .await
        .context("Extraction failed")?;

    let mut extracted: Vec<(&str, ExtractionReport)> = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (input, result) in cli.inputs.iter().zip(results) {
        match result {
            Ok(report) => extracted.push((input.as_str(), report)),
            Err(e) => failures.push(e),
        }
    }
    let reports: Vec<&ExtractionReport> = extracted.iter().map(|(_, r)| r).collect();

    // ── Emit ─────────────────────────────────────────────────────────────
    if cli.preview {
        print_preview(&reports).context("Failed to write preview")?;
    } else if let Some(ref dir) = cli.output_dir {
        let inputs: Vec<&str> = extracted.iter().map(|(input, _)| *input).collect();
        for ((_, report), stem) in extracted.iter().zip(output_stems(&inputs)) {
            let path = dir.join(format!("{}.json", stem));
            let written = if cli.report {
                write_json_atomic(&path, report).await
            } else {
                write_json_atomic(&path, &report.records).await
            };
            written.with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "   {} → {}",
                    dim(&format!("{:>4} records", report.records.len())),
                    bold(&path.display().to_string())
                );
            }
        }
    } else if cli.report {
        emit_json(&reports, cli.output.as_deref()).await?;
    } else {
        let records: Vec<&QuestionRecord> = reports.iter().flat_map(|r| &r.records).collect();
        emit_json(&records, cli.output.as_deref()).await?;
    }

    // ── Summary ──────────────────────────────────────────────────────────
    let mut totals = ExtractionStats::default();
    for report in &reports {
        totals.merge(&report.stats);
    }
    if !cli.quiet {
        for report in &reports {
            for diag in &report.diagnostics {
                eprintln!("  {} {}: {}", cyan("⚠"), report.source_name, diag);
            }
            for warning in &report.warnings {
                eprintln!("  {} {}: {}", cyan("⚠"), report.source_name, warning);
            }
        }
        eprintln!(
            "{}  {} records  {} skipped  {}ms{}",
            if totals.blocks_skipped == 0 && failures.is_empty() {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&totals.records_emitted.to_string()),
            totals.blocks_skipped,
            start.elapsed().as_millis(),
            cli.output
                .as_ref()
                .map(|p| format!("  →  {}", bold(&p.display().to_string())))
                .unwrap_or_default(),
        );
    }

    if !failures.is_empty() {
        for err in &failures {
            eprintln!("{} {}", red("✗"), err);
        }
        anyhow::bail!(
            "{} of {} packet(s) failed",
            failures.len(),
            cli.inputs.len()
        );
    }

    Ok(())
}

/// Pretty JSON to `output` (atomic) or stdout.
async fn emit_json<T: serde::Serialize + ?Sized>(value: &T, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => write_json_atomic(path, value)
            .await
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{json}").context("Failed to write to stdout")
        }
    }
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ExtractionConfig::builder()
        .spacing(cli.spacing)
        .source(cli.source.clone())
        .strip_acceptance_notes(cli.strip_accept_notes)
        .pages(pages)
        .concurrency(cli.concurrency)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref path) = cli.dictionary {
        builder = builder.dictionary_path(path.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    for pattern in &cli.footer_patterns {
        builder = builder.footer_pattern(pattern.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}

/// `<stem>` for `--output-dir` files: "Round 1.pdf" → "Round 1".
fn file_stem(input: &str) -> String {
    let name = short_name(input);
    Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or(name)
}

/// One distinct stem per input: repeats get `-2`, `-3`, … so that
/// `a/Round 1.pdf` and `b/Round 1.pdf` do not overwrite each other.
/// Compared case-insensitively for case-insensitive file systems.
fn output_stems(inputs: &[&str]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let stem = file_stem(input);
            let mut candidate = stem.clone();
            let mut n = 2;
            while !taken.insert(candidate.to_lowercase()) {
                candidate = format!("{}-{}", stem, n);
                n += 1;
            }
            if candidate != stem {
                tracing::warn!(
                    "{} would overwrite {}.json, writing {}.json",
                    input,
                    stem,
                    candidate
                );
            }
            candidate
        })
        .collect()
}

// ── Preview ──────────────────────────────────────────────────────────────────

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

fn print_preview(reports: &[&ExtractionReport]) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut totals = ExtractionStats::default();

    for report in reports {
        totals.merge(&report.stats);
        writeln!(out, "{}", bold(&format!("── {} ──", report.source_name)))?;
        for (i, record) in report.records.iter().enumerate() {
            writeln!(
                out,
                "{:>3}. {} │ {} │ {}",
                i + 1,
                cyan(&record.question_type.to_string()),
                record.category,
                record.question_style,
            )?;
            writeln!(out, "     {}", truncate(&record.question_text, 100))?;
            for (label, option) in ["W", "X", "Y", "Z"].iter().zip(record.options()) {
                if let Some(option) = option {
                    writeln!(out, "       {}) {}", label, truncate(option, 80))?;
                }
            }
            writeln!(out, "     {} {}", dim("ANSWER:"), green(&record.correct_answer))?;
        }
        for diag in &report.diagnostics {
            writeln!(out, "  {} {}", red("skipped"), diag)?;
        }
        writeln!(out)?;
    }

    writeln!(out, "{}", bold("Summary"))?;
    writeln!(
        out,
        "  {} records from {} blocks ({} skipped), {} pages",
        totals.records_emitted, totals.blocks_found, totals.blocks_skipped, totals.total_pages
    )?;
    for (k, v) in &totals.by_type {
        writeln!(out, "  {:<16} {:>4}", k.to_string(), v)?;
    }
    for (k, v) in &totals.by_category {
        writeln!(out, "  {:<16} {:>4}", k.to_string(), v)?;
    }
    for (k, v) in &totals.by_style {
        writeln!(out, "  {:<16} {:>4}", k.to_string(), v)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_specs() {
        assert_eq!(parse_pages("all").unwrap(), PageSelection::All);
        assert_eq!(parse_pages(" 5 ").unwrap(), PageSelection::Single(5));
        assert_eq!(parse_pages("3-15").unwrap(), PageSelection::Range(3, 15));
        assert_eq!(parse_pages("1,3,5").unwrap(), PageSelection::Set(vec![1, 3, 5]));
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-3").is_err());
        assert!(parse_pages("1,x").is_err());
    }

    #[test]
    fn stems_and_names() {
        assert_eq!(file_stem("packets/Round 1.pdf"), "Round 1");
        assert_eq!(file_stem("https://example.com/r/round2.txt"), "round2");
        assert_eq!(short_name("a/b/c.pdf"), "c.pdf");
    }

    #[test]
    fn output_stems_are_distinct() {
        let stems = output_stems(&[
            "a/Round 1.pdf",
            "b/Round 1.pdf",
            "Round 1-2.txt",
            "c/round 1.pdf",
            "Round 2.pdf",
        ]);
        assert_eq!(
            stems,
            vec!["Round 1", "Round 1-2", "Round 1-2-2", "round 1-3", "Round 2"]
        );
    }

    #[test]
    fn cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "packet2json",
            "--spacing",
            "rules",
            "--footer-pattern",
            "Finals",
            "--footer-pattern",
            "Day\\s*2",
            "a.pdf",
            "b.pdf",
        ])
        .unwrap();
        assert_eq!(cli.inputs, vec!["a.pdf", "b.pdf"]);
        assert_eq!(cli.spacing, SpacingStrategy::Rules);
        assert_eq!(cli.footer_patterns.len(), 2);
        let config = build_config(&cli, None).unwrap();
        assert_eq!(config.extra_footer_patterns.len(), 2);
        assert_eq!(config.source, packet2json::DEFAULT_SOURCE);
    }

    #[test]
    fn output_modes_conflict() {
        assert!(Cli::try_parse_from(["packet2json", "-o", "a.json", "--output-dir", "d", "x.pdf"]).is_err());
        assert!(Cli::try_parse_from(["packet2json", "--emit-text", "--preview", "x.pdf"]).is_err());
    }
}
