use std::{sync::Arc, time::Duration};

use dbmatrix_automation::{Automation, AutomationError, WaitOptions};
use dbmatrix_fixtures::{DatabaseFixture, TableConfig};
use dbmatrix_mock_data::MockDataError;
use thiserror::Error;

use crate::SkipReason;

/// How a case body ends when it does not pass.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("{0}")]
    Assertion(String),
    #[error("skipped: {0}")]
    Skipped(SkipReason),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Automation(#[from] AutomationError),
    #[error(transparent)]
    MockData(#[from] MockDataError),
}

impl ScenarioError {
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    #[must_use]
    pub fn missing_data(message: impl Into<String>) -> Self {
        Self::Skipped(SkipReason::MissingFixtureData(message.into()))
    }

    /// Whether the failure lies with the environment rather than the behavior under
    /// test.
    #[must_use]
    pub const fn is_environment(&self) -> bool {
        match self {
            Self::Automation(e) => e.is_environment(),
            _ => false,
        }
    }
}

/// Fails the enclosing case with an assertion error unless `cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::ScenarioError::Assertion(format!($($arg)+)));
        }
    };
    ($cond:expr $(,)?) => {
        $crate::ensure!($cond, "assertion failed: {}", stringify!($cond))
    };
}

/// Fails the enclosing case with an assertion error unless both sides are equal.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr, $($arg:tt)+) => {
        match (&$left, &$right) {
            (left, right) => {
                if left != right {
                    return Err($crate::ScenarioError::Assertion(format!(
                        "{}: expected {:?}, got {:?}",
                        format!($($arg)+),
                        right,
                        left
                    )));
                }
            }
        }
    };
    ($left:expr, $right:expr $(,)?) => {
        $crate::ensure_eq!($left, $right, "{} != {}", stringify!($left), stringify!($right))
    };
}

/// What a case body gets to work with.
#[derive(Clone)]
pub struct ScenarioContext {
    fixture: Arc<DatabaseFixture>,
    automation: Arc<dyn Automation>,
    wait: WaitOptions,
}

impl std::fmt::Debug for ScenarioContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioContext")
            .field("fixture", &self.fixture.id)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl ScenarioContext {
    #[must_use]
    pub fn new(
        fixture: Arc<DatabaseFixture>,
        automation: Arc<dyn Automation>,
        wait: WaitOptions,
    ) -> Self {
        Self {
            fixture,
            automation,
            wait,
        }
    }

    #[must_use]
    pub fn fixture(&self) -> &DatabaseFixture {
        &self.fixture
    }

    #[must_use]
    pub fn automation(&self) -> &dyn Automation {
        self.automation.as_ref()
    }

    #[must_use]
    pub const fn wait_options(&self) -> WaitOptions {
        self.wait
    }

    /// The fixture's config for `table`.
    ///
    /// # Errors
    ///
    /// * A [`SkipReason::MissingFixtureData`] skip if the fixture has no such table
    pub fn table_config(&self, table: &str) -> Result<&TableConfig, ScenarioError> {
        self.fixture.table_config(table).ok_or_else(|| {
            ScenarioError::missing_data(format!(
                "no table config for '{table}' in '{}'",
                self.fixture.id
            ))
        })
    }

    /// The fixture's default test table and its config.
    ///
    /// # Errors
    ///
    /// * A [`SkipReason::MissingFixtureData`] skip if either is missing
    pub fn default_table(&self) -> Result<(&str, &TableConfig), ScenarioError> {
        let name = self.fixture.default_table().ok_or_else(|| {
            ScenarioError::missing_data(format!("no default test table in '{}'", self.fixture.id))
        })?;

        Ok((name, self.table_config(name)?))
    }

    /// Waits out the fixture's mutation delay so the last write is visible.
    pub async fn settle(&self) {
        let delay = self.fixture.mutation_delay;
        if !delay.is_zero() {
            log::trace!("settle: waiting {delay:?} for '{}'", self.fixture.id);
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(value: u32) -> Result<(), ScenarioError> {
        ensure!(value > 1, "value {value} too small");
        ensure_eq!(value % 2, 0);
        Ok(())
    }

    #[test_log::test]
    fn ensure_macros_produce_assertion_errors() {
        assert!(check(4).is_ok());
        assert!(matches!(
            check(1),
            Err(ScenarioError::Assertion(message)) if message == "value 1 too small"
        ));
        assert!(matches!(
            check(3),
            Err(ScenarioError::Assertion(message)) if message == "value % 2 != 0: expected 0, got 1"
        ));
    }

    #[test_log::test]
    fn only_environment_automation_errors_are_environment() {
        assert!(
            ScenarioError::from(AutomationError::LoginFailed("down".to_string())).is_environment()
        );
        assert!(!ScenarioError::assertion("nope").is_environment());
        assert!(!ScenarioError::from(AutomationError::RowNotFound(0)).is_environment());
    }
}
