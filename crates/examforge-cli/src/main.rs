//! examforge CLI: the user-facing command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod context;

#[derive(Parser)]
#[command(name = "examforge", version, about = "Timed tests, scoring and performance reports")]
struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog file or directory (overrides config)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Results directory (overrides config)
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a timed test interactively
    Take {
        /// Student identifier
        #[arg(long)]
        student: String,

        /// Test identifier
        #[arg(long)]
        test: String,
    },

    /// Show a stored result
    Result {
        #[arg(long)]
        student: String,

        #[arg(long)]
        test: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Build a combined performance report for a student
    Report {
        #[arg(long)]
        student: String,

        /// Restrict the report to a single test
        #[arg(long)]
        test: Option<String>,

        /// Output format: text, json, html
        #[arg(long, default_value = "text")]
        format: String,

        /// Write to this file instead of stdout (json, html)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Compare two saved JSON reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Accuracy change threshold, in percentage points
        #[arg(long, default_value = "5.0")]
        threshold: f64,

        /// Exit code 1 if regressions found
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Validate catalog TOML files
    Validate,

    /// List tests in the catalog
    ListTests,

    /// Create starter config and sample catalog
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examforge=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();
    let overrides = context::Overrides {
        config: cli.config,
        catalog: cli.catalog,
        results_dir: cli.results_dir,
    };

    let result = match cli.command {
        Commands::Take { student, test } => commands::take::execute(&overrides, student, test).await,
        Commands::Result {
            student,
            test,
            format,
        } => commands::result::execute(&overrides, student, test, format).await,
        Commands::Report {
            student,
            test,
            format,
            output,
        } => commands::report::execute(&overrides, student, test, format, output).await,
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_regression, format),
        Commands::Validate => commands::validate::execute(&overrides),
        Commands::ListTests => commands::list_tests::execute(&overrides),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
