use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use hdr_detection::{Progress, RexifSource, RunSummary, ScanOptions, Stage, DEFAULT_EXTENSION};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Default log file name, written inside the scanned folder
const LOG_FILE_NAME: &str = "hdr_grouper.log";

#[derive(Parser)]
#[command(name = "hdr-grouper")]
#[command(about = "Group bracketed RAW exposures into HDR_xx subfolders", version)]
struct Cli {
    /// Folder containing the RAW files (prompted for when omitted)
    #[arg(env = "HDR_GROUPER_FOLDER")]
    folder: Option<PathBuf>,

    /// RAW extension to scan for; repeat for more than one
    #[arg(short, long = "extension", default_values_t = vec![DEFAULT_EXTENSION.to_string()])]
    extensions: Vec<String>,

    /// Where to write the report (default: <FOLDER>/hdr_grouper.log)
    #[arg(long, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Do not write a report file
    #[arg(long)]
    no_log_file: bool,

    /// Print the summary as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Progress bars for the extract and move stages
struct ConsoleProgress {
    bar: Option<ProgressBar>,
}

impl ConsoleProgress {
    fn new() -> Self {
        Self { bar: None }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{msg:<22} [{bar:40.cyan/blue}] {pos}/{len} ({elapsed})")
            .map(|style| style.progress_chars("=> "))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Progress for ConsoleProgress {
    fn start(&mut self, stage: Stage, total: usize) {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(Self::style());
        bar.set_message(stage.label());
        self.bar = Some(bar);
    }

    fn advance(&mut self, _stage: Stage, _item: &str) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn finish(&mut self, _stage: Stage) {
        if let Some(bar) = self.bar.take() {
            bar.finish();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let folder = match cli.folder.clone() {
        Some(folder) => folder,
        None => prompt_for_folder()?,
    };

    let options = ScanOptions::with_extensions(&cli.extensions)?;
    info!(folder = %folder.display(), extensions = ?options.extensions, "starting");

    let mut progress = ConsoleProgress::new();
    let outcome = hdr_detection::run(&folder, &RexifSource, &options, &mut progress)
        .with_context(|| format!("Failed to process {}", folder.display()))?;
    let summary = &outcome.summary;

    write_report(
        summary,
        outcome.collection.files_seen(),
        &options.extensions,
        cli.json,
        &mut io::stdout().lock(),
        &mut io::stderr().lock(),
    )?;

    if !cli.no_log_file {
        let log_path = cli.log_file.clone().unwrap_or_else(|| folder.join(LOG_FILE_NAME));
        match summary.write_log(&log_path) {
            Ok(()) => info!(path = %log_path.display(), "report written"),
            Err(e) => warn!(error = %e, "could not write report file"),
        }
    }

    Ok(())
}

/// Print the run summary to `out`; notices that are not part of the report go
/// to `notices` when `out` must stay machine-readable
fn write_report<W: Write, E: Write>(
    summary: &RunSummary,
    files_seen: usize,
    extensions: &[String],
    json: bool,
    out: &mut W,
    notices: &mut E,
) -> Result<()> {
    if files_seen == 0 {
        let notice = format!(
            "No {} files found in the specified folder.",
            extensions.join("/").to_uppercase()
        );
        if json {
            writeln!(notices, "{}", notice)?;
        } else {
            writeln!(out, "{}", notice)?;
        }
    }

    if json {
        let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary to JSON")?;
        writeln!(out, "{}", json)?;
    } else {
        write!(out, "{}", summary.render())?;
        if summary.set_count() > 0 {
            writeln!(out, "HDR photos have been organized into their respective subfolders.")?;
        }
    }

    out.flush()?;
    Ok(())
}

/// Logs go to stderr so stdout carries only the report
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .init();
}

fn prompt_for_folder() -> Result<PathBuf> {
    print!("Enter the folder path to scan for NEF files: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read folder path from stdin")?;

    let folder = clean_path_input(&line);
    if folder.as_os_str().is_empty() {
        bail!("No folder path given");
    }
    Ok(folder)
}

/// Trim whitespace and the quotes a drag-and-drop into the terminal adds
fn clean_path_input(input: &str) -> PathBuf {
    let trimmed = input.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(trimmed);
    Path::new(unquoted).to_path_buf()
}
