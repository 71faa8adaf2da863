//! County Growth CLI - extract city data and compute year-over-year growth
//!
//! This tool takes the province-wide prior-year and current-year indicator
//! workbooks, extracts one city's county rows, and writes the two per-year
//! tables plus the growth comparison table into an output directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use county_growth_toolkit::pipeline::{list_indicators, run_process, StageProgress};
use county_growth_toolkit::{FixedSelection, NegativeIndicatorSelector, ProcessConfig, RunReport};
use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "county-growth")]
#[command(about = "Extract one city's county rows from province-wide workbooks and compute growth")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full extraction and growth pipeline
    Process {
        /// Prior-year input workbook (.xlsx)
        #[arg(short, long)]
        prior: PathBuf,

        /// Current-year input workbook (.xlsx)
        #[arg(short, long)]
        current: PathBuf,

        /// Directory the three output workbooks are written into
        #[arg(short, long)]
        out_dir: PathBuf,

        /// City whose county rows are extracted
        #[arg(long, env = "COUNTY_GROWTH_CITY", default_value = "忻州")]
        city: String,

        /// Rows to skip before the fixed table layout begins
        #[arg(long, default_value = "0")]
        skip_rows: usize,

        /// Indicator names treated as negative ("lower is better";
        /// sign-inverted before growth computation)
        #[arg(long, value_delimiter = ',')]
        negative: Vec<String>,

        /// File with one negative indicator name per line
        #[arg(long)]
        negative_file: Option<PathBuf>,

        /// Pick negative indicators interactively on stdin
        /// (replaces --negative / --negative-file)
        #[arg(long)]
        interactive: bool,

        /// Print the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the indicator names discovered in a workbook
    ///
    /// One name per line, so the output can be edited into a
    /// --negative-file for scripted runs.
    Indicators {
        /// Input workbook (.xlsx)
        #[arg(short, long)]
        input: PathBuf,

        /// Rows to skip before the fixed table layout begins
        #[arg(long, default_value = "0")]
        skip_rows: usize,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            prior,
            current,
            out_dir,
            city,
            skip_rows,
            negative,
            negative_file,
            interactive,
            json,
        } => process(
            prior,
            current,
            out_dir,
            city,
            skip_rows,
            negative,
            negative_file,
            interactive,
            json,
        ),
        Commands::Indicators { input, skip_rows } => {
            for name in list_indicators(&input, skip_rows)? {
                println!("{name}");
            }
            Ok(())
        }
    }
}

fn process(
    prior: PathBuf,
    current: PathBuf,
    out_dir: PathBuf,
    city: String,
    skip_rows: usize,
    negative: Vec<String>,
    negative_file: Option<PathBuf>,
    interactive: bool,
    json: bool,
) -> Result<()> {
    let config = ProcessConfig {
        prior_input: prior,
        current_input: current,
        output_dir: out_dir,
        city,
        skip_rows,
    };

    let mut selector: Box<dyn NegativeIndicatorSelector> = if interactive {
        Box::new(PromptSelector)
    } else {
        let mut names = negative;
        if let Some(path) = negative_file {
            names.extend(load_negative_file(&path)?);
        }
        Box::new(FixedSelection::new(names))
    };

    let report = run_process(&config, selector.as_mut(), |progress: &StageProgress| {
        eprintln!("[{:>3}%] {}", progress.percent, progress.message);
        true
    })?;

    print_report(&report, json)?;
    Ok(())
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!(
        "Done! {} counties x {} indicators.",
        report.counties, report.indicators
    );
    println!("  Prior year:   {}", report.prior_output.display());
    println!("  Current year: {}", report.current_output.display());
    println!("  Comparison:   {}", report.comparison_output.display());
    if !report.negative_indicators.is_empty() {
        println!(
            "  Negative indicators: {}",
            report.negative_indicators.join(", ")
        );
    }
    if report.coerced_cells > 0 {
        eprintln!(
            "Warning: {} non-numeric value cell(s) were treated as absent",
            report.coerced_cells
        );
    }
    Ok(())
}

/// One indicator name per line; blank lines are skipped.
fn load_negative_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read negative-indicator file {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}

/// Numbered stdin picker for the negative-indicator choice.
///
/// Lists the discovered indicators, then accepts numbers separated by
/// spaces or commas. An empty line confirms an empty selection; invalid
/// input re-prompts.
struct PromptSelector;

impl NegativeIndicatorSelector for PromptSelector {
    fn select(&mut self, indicators: &[String]) -> Result<BTreeSet<String>> {
        println!("Discovered {} indicator(s):", indicators.len());
        for (idx, name) in indicators.iter().enumerate() {
            println!("{:>3}) {}", idx + 1, name);
        }

        loop {
            print!("Negative indicators (numbers separated by space or comma, empty for none): ");
            io::stdout().flush().context("failed to write prompt")?;

            let mut input = String::new();
            let bytes = io::stdin()
                .read_line(&mut input)
                .context("failed to read selection")?;
            if bytes == 0 {
                // EOF on stdin: treat as an empty selection
                return Ok(BTreeSet::new());
            }

            match parse_selection(input.trim(), indicators) {
                Ok(selected) => return Ok(selected),
                Err(message) => {
                    println!("{message}");
                    continue;
                }
            }
        }
    }
}

fn parse_selection(
    input: &str,
    indicators: &[String],
) -> std::result::Result<BTreeSet<String>, String> {
    let mut selected = BTreeSet::new();
    for token in input.split([' ', ',']).filter(|token| !token.is_empty()) {
        match token.parse::<usize>() {
            Ok(choice) if (1..=indicators.len()).contains(&choice) => {
                selected.insert(indicators[choice - 1].clone());
            }
            _ => {
                return Err(format!(
                    "Invalid choice: {token}. Enter numbers between 1 and {}.",
                    indicators.len()
                ))
            }
        }
    }
    Ok(selected)
}
