mod loader;
mod reports;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write, stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use loader::{CliConfigLoader, ConfigSource, Overrides};
use stackrace_game::{Aggregator, RaceConfig, SimulationEngine, SimulationReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Colored ranking table
    Console,
    /// Full report as pretty-printed JSON
    Json,
    /// Markdown summary and ranking table
    Markdown,
    /// One row per competitor
    Csv,
}

#[derive(Debug, Parser)]
#[command(name = "stackrace-sim", version = "0.3.0")]
#[command(about = "Monte Carlo simulator for stacked-dice races - win rate and expected payout per competitor")]
struct Args {
    /// Roster configuration file (JSON); defaults to the built-in line-up
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of races to simulate
    #[arg(long)]
    runs: Option<u32>,

    /// Seed for the per-race random streams
    #[arg(long)]
    seed: Option<u64>,

    /// Number of cells on the track
    #[arg(long)]
    board_length: Option<u32>,

    /// Output report format
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    report: ReportFormat,

    /// Optional path to write the report output instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Spread races across all cores; tallies match a sequential run
    #[arg(long)]
    parallel: bool,

    /// List the configured competitors and exit
    #[arg(long)]
    list_roster: bool,

    /// Verbose output (debug logging unless RUST_LOG is set)
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn loader(&self) -> CliConfigLoader {
        let source = self
            .config
            .clone()
            .map_or(ConfigSource::Embedded, ConfigSource::File);
        let overrides = Overrides {
            runs: self.runs,
            seed: self.seed,
            board_length: self.board_length,
        };
        CliConfigLoader::new(source, overrides)
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let engine = SimulationEngine::new(args.loader());
    let (aggregator, config) = engine
        .prepare()
        .context("failed to prepare race simulation")?;

    if maybe_list_roster(&args, &config)? {
        return Ok(());
    }

    if args.report == ReportFormat::Console {
        announce_banner();
    }

    let start_time = Instant::now();
    let report = run_simulation(&aggregator, &config, args.parallel)?;
    write_report(&args, &report, start_time.elapsed())
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn announce_banner() {
    println!("{}", "🎲 Stackrace Simulator".bright_cyan().bold());
    println!("{}", "======================".cyan());
}

fn run_simulation(
    aggregator: &Aggregator,
    config: &RaceConfig,
    parallel: bool,
) -> Result<SimulationReport> {
    let report = if parallel {
        aggregator.simulate_parallel(config.runs, config.seed)
    } else {
        aggregator.simulate(config.runs, config.seed)
    };
    report.with_context(|| format!("failed to simulate {} races", config.runs))
}

#[derive(Debug, Serialize)]
struct RosterEntry<'a> {
    key: &'a str,
    name: &'a str,
    weight: f64,
    skills: Vec<String>,
}

fn roster_entries(config: &RaceConfig) -> Vec<RosterEntry<'_>> {
    config
        .roster
        .iter()
        .map(|spec| RosterEntry {
            key: &spec.key,
            name: &spec.name,
            weight: spec.weight,
            skills: spec
                .skills
                .iter()
                .map(|skill| format!("{} (p={})", skill.kind.tag(), skill.probability))
                .collect(),
        })
        .collect()
}

fn maybe_list_roster(args: &Args, config: &RaceConfig) -> Result<bool> {
    if !args.list_roster {
        return Ok(false);
    }
    let mut output_target = OutputTarget::new(args.output.clone())?;
    let entries = roster_entries(config);
    if args.report == ReportFormat::Json {
        writeln!(output_target.writer(), "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        writeln!(output_target.writer(), "Configured competitors:")?;
        for entry in &entries {
            writeln!(
                output_target.writer(),
                "  {:14} {:16} x{:<6} {}",
                entry.key,
                entry.name,
                entry.weight,
                entry.skills.join(", ")
            )?;
        }
    }
    output_target.flush_inner()?;
    Ok(true)
}

fn write_report(args: &Args, report: &SimulationReport, duration: Duration) -> Result<()> {
    let mut output_target = OutputTarget::new(args.output.clone())?;

    match args.report {
        ReportFormat::Json => reports::generate_json_report(&mut output_target, report)?,
        ReportFormat::Markdown => reports::generate_markdown_report(&mut output_target, report)?,
        ReportFormat::Csv => reports::generate_csv_report(&mut output_target, report)?,
        ReportFormat::Console => {
            reports::generate_console_report(&mut output_target, report, duration)?;
        }
    }

    output_target.flush_inner()?;
    if let Some(path) = &args.output {
        log::info!("report written to {}", path.display());
    }
    Ok(())
}

enum OutputTarget {
    Stdout(BufWriter<std::io::Stdout>),
    File(BufWriter<File>),
}

impl OutputTarget {
    fn new(path: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path {
            let file = File::create(&path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Self::File(BufWriter::new(file)))
        } else {
            Ok(Self::Stdout(BufWriter::new(stdout())))
        }
    }

    fn writer(&mut self) -> &mut dyn Write {
        match self {
            Self::Stdout(w) => w,
            Self::File(w) => w,
        }
    }

    fn flush_inner(&mut self) -> std::io::Result<()> {
        match self {
            Self::Stdout(w) => w.flush(),
            Self::File(w) => w.flush(),
        }
    }
}

impl Write for OutputTarget {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_inner()
    }
}
