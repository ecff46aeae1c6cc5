//! Specrun CLI - Main Entry Point
//!
//! Loads scenario suite files, validates them, runs them against the mock
//! page driver built from each suite's inline app model, and manages report
//! artifacts.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use specrun_harness::mock::{AppModel, MockApp};
use specrun_harness::report;
use specrun_harness::{FixtureStore, HarnessConfig, ScenarioRunner, Suite, Viewport};

/// Specrun - alias-based scenario runner for end-to-end UI tests
#[derive(Parser)]
#[command(name = "specrun")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run scenario suites
    Run(RunArgs),

    /// Validate suite files without running them
    Check {
        /// Path to the suites directory
        #[arg(short, long, default_value = "suites")]
        specs: PathBuf,
    },

    /// Manage report artifacts
    #[command(subcommand)]
    Reports(ReportsCommand),
}

#[derive(Args)]
struct RunArgs {
    /// Path to the suites directory
    #[arg(short, long, default_value = "suites")]
    specs: PathBuf,

    /// Run only suites carrying this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only the suite with this name
    #[arg(short, long)]
    name: Option<String>,

    /// Base URL recorded in the report
    #[arg(long, default_value = "http://localhost:4200")]
    base_url: String,

    /// Viewport width
    #[arg(long, default_value = "1920")]
    viewport_width: u32,

    /// Viewport height
    #[arg(long, default_value = "1080")]
    viewport_height: u32,

    /// Default wait timeout in milliseconds
    #[arg(long, default_value = "5000")]
    wait_timeout_ms: u64,

    /// Path to the fixtures directory
    #[arg(short, long, default_value = "fixtures")]
    fixtures: PathBuf,

    /// Output directory for reports
    #[arg(short, long, default_value = "reports")]
    output: PathBuf,

    /// Archive the previous report before writing the new one
    #[arg(long)]
    archive: bool,
}

#[derive(Subcommand)]
enum ReportsCommand {
    /// Create the reports directory
    Init {
        #[arg(short, long, default_value = "reports")]
        dir: PathBuf,
    },
    /// Remove the reports directory and everything under it
    Clean {
        #[arg(short, long, default_value = "reports")]
        dir: PathBuf,
    },
    /// Move the current report into the archive
    Archive {
        #[arg(short, long, default_value = "reports")]
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Check { specs } => check(&specs),
        Commands::Reports(cmd) => reports(cmd),
    }
}

async fn run(args: RunArgs) -> anyhow::Result<()> {
    let suites = load_suites(&args.specs)?;
    let selected: Vec<Suite> = suites
        .into_iter()
        .filter(|s| args.tag.as_deref().map_or(true, |t| s.has_tag(t)))
        .filter(|s| args.name.as_deref().map_or(true, |n| s.name == n))
        .collect();

    if selected.is_empty() {
        println!("No suites matched under {}", args.specs.display());
        std::process::exit(2);
    }

    for suite in &selected {
        if let Err(e) = suite.validate() {
            eprintln!("❌ suite '{}': {e}", suite.name);
            std::process::exit(2);
        }
    }

    let fixtures = if args.fixtures.is_dir() {
        FixtureStore::load_dir(&args.fixtures)?
    } else {
        FixtureStore::new()
    };

    let config = HarnessConfig {
        base_url: args.base_url,
        viewport: Viewport {
            width: args.viewport_width,
            height: args.viewport_height,
        },
        wait_timeout: Duration::from_millis(args.wait_timeout_ms),
        ..Default::default()
    };

    let mut runner = ScenarioRunner::new(config).with_fixtures(fixtures);
    let results = runner
        .run_suites(&selected, &|suite, network| {
            // Suites without an inline app model get an empty document;
            // interactive drivers come from embedding the harness instead
            let model = suite.app.clone().unwrap_or_else(AppModel::default);
            Box::new(MockApp::from_model(&model, network.clone()))
        })
        .await?;

    if args.archive {
        report::archive_current(&args.output)?;
    }
    report::write_report(&args.output, &results)?;

    println!(
        "{} passed, {} failed, {} skipped ({} ms)",
        results.passed, results.failed, results.skipped, results.duration_ms
    );

    if !results.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}

fn check(specs: &PathBuf) -> anyhow::Result<()> {
    let suites = load_suites(specs)?;
    let mut broken = 0usize;

    for suite in &suites {
        match suite.validate() {
            Ok(()) => println!("✅ {}", suite.name),
            Err(e) => {
                broken += 1;
                println!("❌ {}: {e}", suite.name);
            }
        }
    }

    println!("{} suite(s), {} invalid", suites.len(), broken);
    if broken > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn reports(cmd: ReportsCommand) -> anyhow::Result<()> {
    match cmd {
        ReportsCommand::Init { dir } => {
            report::ensure_reports_dir(&dir)?;
            println!("Reports directory ready: {}", dir.display());
        }
        ReportsCommand::Clean { dir } => {
            if report::clean_reports_dir(&dir)? {
                println!("Removed {}", dir.display());
            } else {
                println!("Nothing to remove at {}", dir.display());
            }
        }
        ReportsCommand::Archive { dir } => match report::archive_current(&dir)? {
            Some(path) => println!("Archived as {}", path.display()),
            None => println!("No current report to archive"),
        },
    }
    Ok(())
}

fn load_suites(dir: &PathBuf) -> anyhow::Result<Vec<Suite>> {
    if !dir.is_dir() {
        anyhow::bail!("suites directory not found: {}", dir.display());
    }
    let suites = Suite::load_all(dir)?;
    if suites.is_empty() {
        anyhow::bail!("no suite files under {}", dir.display());
    }
    Ok(suites)
}
