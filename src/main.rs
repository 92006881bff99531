use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{ArgGroup, Parser};

use refmark_pdf::annotate::OutputPolicy;
use refmark_pdf::pattern::{MarkerPattern, DEFAULT_LABEL, DEFAULT_TERMINATOR};
use refmark_pdf::scan::{ScanOptions, TargetSpec};
use refmark_pdf::{highlight_file, HighlightOptions, HighlightOutcome};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about,
    long_about = "Find reference codes in a PDF and write a copy with every occurrence highlighted.",
    arg_required_else_help = true
)]
#[clap(group(ArgGroup::new("mode").required(true).args(["codes", "auto"])))]
pub struct Args {
    /// Path to the PDF file to scan
    pub pdf_path: String,

    /// Code to look for; repeat the flag for several
    #[clap(short = 'c', long = "code")]
    pub codes: Vec<String>,

    /// Discover codes from reference markers instead of listing them
    #[clap(short, long)]
    pub auto: bool,

    /// Marker label for --auto
    #[clap(long, default_value_t = String::from(DEFAULT_LABEL))]
    pub label: String,

    /// Marker terminator for --auto
    #[clap(long, default_value_t = DEFAULT_TERMINATOR)]
    pub terminator: char,

    /// Output file path. Defaults to `<input>_highlighted.pdf`.
    #[clap(short, long)]
    pub output: Option<String>,

    /// Keep pages without matches instead of dropping them
    #[clap(long)]
    pub keep_all_pages: bool,

    /// Skip the raw-text pass and match from tokens only
    #[clap(long)]
    pub no_direct_search: bool,

    /// Stop starting new pages after this many seconds
    #[clap(long)]
    pub timeout_secs: Option<u64>,

    /// Write the scan report as JSON to this path
    #[clap(long)]
    pub report: Option<String>,

    /// Enable debug logging for the scan stages
    #[clap(short, long)]
    pub verbose: bool,

    /// Directory for log files
    #[clap(long)]
    pub log_dir: Option<String>,
}

impl Args {
    pub fn parse_args() -> Self {
        Args::parse()
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).into_owned())
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}_highlighted.pdf"))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse_args();

    // Keep the guard alive so buffered log output is flushed on exit
    let _guard = match &args.log_dir {
        Some(dir) => refmark_pdf::logging::init_logging_with_dir(args.verbose, expand_path(dir))?,
        None => refmark_pdf::logging::init_logging(args.verbose),
    };

    let pdf_path = expand_path(&args.pdf_path);

    let targets = if args.auto {
        TargetSpec::AutoDetect(MarkerPattern::new(args.label.as_str(), args.terminator)?)
    } else {
        TargetSpec::Explicit(args.codes.clone())
    };
    let options = HighlightOptions {
        targets,
        scan: ScanOptions {
            direct_search: !args.no_direct_search,
            timeout: args.timeout_secs.map(Duration::from_secs),
        },
        output: if args.keep_all_pages {
            OutputPolicy::FullDocument
        } else {
            OutputPolicy::MatchedPagesOnly
        },
    };

    let outcome = highlight_file(&pdf_path, &options)?;

    if let Some(report_path) = &args.report {
        let report_path = expand_path(report_path);
        let json = serde_json::to_string_pretty(outcome.report())?;
        fs::write(&report_path, json)
            .with_context(|| format!("writing report to {}", report_path.display()))?;
    }

    if outcome.report().timed_out {
        eprintln!(
            "warning: scan timed out after {} of {} pages",
            outcome.report().pages_scanned,
            outcome.report().page_count
        );
    }

    match outcome {
        HighlightOutcome::Document { bytes, report } => {
            let output_path = match &args.output {
                Some(path) => expand_path(path),
                None => default_output_path(&pdf_path),
            };
            fs::write(&output_path, bytes)
                .with_context(|| format!("writing {}", output_path.display()))?;
            println!(
                "{} matches on {} of {} pages -> {}",
                report.match_count(),
                report.pages.len(),
                report.page_count,
                output_path.display()
            );
            Ok(())
        }
        HighlightOutcome::NoMatches { report } => {
            eprintln!("no matches found on {} scanned pages", report.pages_scanned);
            drop(_guard);
            std::process::exit(1);
        }
    }
}
