#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::{path::PathBuf, process::ExitCode, time::Duration};

use clap::{Parser, Subcommand};
use dbmatrix_matrix::CategoryFilter;
use dbmatrix_runner::{
    DEFAULT_FIXTURES_DIR, FIXTURES_DIR_ENV_VAR, RunOptions, RunnerError, build_matrix,
    issue_lines, load, run,
};
use dbmatrix_scenarios::Group;

/// Runs database client scenarios across every fixture they apply to
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding `databases.json5` and one fixture per database
    #[arg(long, global = true, env = FIXTURES_DIR_ENV_VAR, default_value = DEFAULT_FIXTURES_DIR)]
    fixtures: PathBuf,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug, Clone)]
enum Commands {
    /// Print the id of every registered case
    List {
        /// Only fixtures of this category (sql, document, keyvalue, all)
        #[arg(long, default_value = "all")]
        category: CategoryFilter,

        /// Only these scenario groups
        #[arg(long, value_delimiter = ',')]
        group: Vec<Group>,
    },
    /// Print fixture authoring issues
    Validate,
    /// Run the matrix against the simulated client and print the report
    Run {
        /// Only fixtures of this category (sql, document, keyvalue, all)
        #[arg(long, default_value = "all")]
        category: CategoryFilter,

        /// Only these scenario groups
        #[arg(long, value_delimiter = ',')]
        group: Vec<Group>,

        /// Upper bound on a single case, in milliseconds
        #[arg(long, default_value_t = 60_000)]
        timeout_ms: u64,

        /// Seed of the simulator's value generator
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, RunnerError> {
    dbmatrix_logging::init()?;

    let args = Args::parse();

    match args.cmd {
        Commands::List { category, group } => {
            let store = load(&args.fixtures, category)?;
            for id in build_matrix(store, &group)?.ids() {
                println!("{id}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate => {
            let store = load(&args.fixtures, CategoryFilter::All)?;
            let issues = issue_lines(&store);
            for line in &issues {
                println!("{line}");
            }

            if issues.is_empty() {
                println!("{} fixture(s), no issues", store.len());
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Run {
            category,
            group,
            timeout_ms,
            seed,
        } => {
            let store = load(&args.fixtures, category)?;
            let matrix = build_matrix(store, &group)?;

            let report = run(
                &matrix,
                RunOptions {
                    case_timeout: Some(Duration::from_millis(timeout_ms)),
                    seed,
                },
            )
            .await;

            println!("{report}");

            Ok(if report.is_success() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
