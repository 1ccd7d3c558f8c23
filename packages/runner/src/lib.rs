#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Loads a fixture directory, builds the scenario matrix over it and runs it against
//! the simulated client.

use std::{path::Path, sync::Arc, time::Duration};

use dbmatrix_automation::simulator::SimulatedBrowser;
use dbmatrix_fixtures::{FixtureError, FixtureStore, load_store};
use dbmatrix_matrix::{CategoryFilter, Matrix, MatrixError, Report, Runner, RunnerConfig};
use dbmatrix_mock_data::GenerationPolicy;
use dbmatrix_scenarios::{Group, register_all, register_groups};
use thiserror::Error;

pub const FIXTURES_DIR_ENV_VAR: &str = "DBMATRIX_FIXTURES_DIR";
pub const DEFAULT_FIXTURES_DIR: &str = "fixtures";

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    #[error(transparent)]
    Matrix(#[from] MatrixError),
    #[error(transparent)]
    Logging(#[from] dbmatrix_logging::InitError),
}

/// Loads the fixtures in `dir`, keeping those in `category`.
///
/// # Errors
///
/// * If the fixture directory cannot be loaded
pub fn load(dir: &Path, category: CategoryFilter) -> Result<Arc<FixtureStore>, RunnerError> {
    let store = load_store(dir)?;
    log::debug!("load: {} fixture(s) from {}", store.len(), dir.display());

    if category == CategoryFilter::All {
        return Ok(Arc::new(store));
    }

    let kept = store
        .iter()
        .filter(|x| category.matches(x.category))
        .map(|x| (**x).clone())
        .collect::<Vec<_>>();

    Ok(Arc::new(FixtureStore::new(kept)?))
}

/// Registers `groups` over `store`, or every group when `groups` is empty.
///
/// # Errors
///
/// * If any group fails to register
pub fn build_matrix(store: Arc<FixtureStore>, groups: &[Group]) -> Result<Matrix, RunnerError> {
    let mut matrix = Matrix::new(store);

    if groups.is_empty() {
        register_all(&mut matrix)?;
    } else {
        register_groups(&mut matrix, groups.iter().copied())?;
    }

    log::debug!("build_matrix: {} case(s)", matrix.cases().len());

    Ok(matrix)
}

/// One line per fixture authoring issue.
#[must_use]
pub fn issue_lines(store: &FixtureStore) -> Vec<String> {
    store
        .issues()
        .into_iter()
        .flat_map(|(id, issues)| {
            issues
                .into_iter()
                .map(move |issue| format!("{id}: {issue}"))
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub case_timeout: Option<Duration>,
    /// Seed of the simulator's value generator
    pub seed: Option<u64>,
}

/// Runs every case of `matrix` against a simulated client over its store.
pub async fn run(matrix: &Matrix, options: RunOptions) -> Report {
    let mut browser =
        SimulatedBrowser::new(matrix.store().clone()).with_policy(GenerationPolicy::from_env());
    if let Some(seed) = options.seed {
        browser = browser.with_seed(seed);
    }

    let mut config = RunnerConfig::default();
    if let Some(timeout) = options.case_timeout {
        config = config.case_timeout(timeout);
    }

    Runner::new(Arc::new(browser))
        .with_config(config)
        .run_matrix(matrix)
        .await
}
