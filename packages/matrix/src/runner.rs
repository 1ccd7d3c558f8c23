use std::{
    any::Any,
    panic::AssertUnwindSafe,
    sync::Arc,
    time::{Duration, Instant},
};

use dbmatrix_automation::{Automation, LoginOptions, WaitOptions, with_session};
use futures::FutureExt as _;

use crate::{
    CaseKind, CaseReport, Matrix, Outcome, Report, ScenarioContext, ScenarioError, TestCase,
};

/// Time allowed for the session teardown once a case has run out of time.
const TEARDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Upper bound on one case, login and body included
    pub case_timeout: Duration,
    /// Bounds handed to case bodies for their polls
    pub wait: WaitOptions,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            case_timeout: Duration::from_secs(60),
            wait: WaitOptions::default(),
        }
    }
}

impl RunnerConfig {
    #[must_use]
    pub const fn case_timeout(mut self, timeout: Duration) -> Self {
        self.case_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }
}

/// Executes registered cases one at a time against an automation backend.
pub struct Runner {
    automation: Arc<dyn Automation>,
    config: RunnerConfig,
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Runner {
    #[must_use]
    pub fn new(automation: Arc<dyn Automation>) -> Self {
        Self {
            automation,
            config: RunnerConfig::default(),
        }
    }

    #[must_use]
    pub const fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub async fn run_matrix(&self, matrix: &Matrix) -> Report {
        self.run(matrix.cases()).await
    }

    /// Runs `cases` sequentially, in order.
    pub async fn run(&self, cases: &[TestCase]) -> Report {
        let mut report = Report::default();

        for case in cases {
            let case_report = self.run_case(case).await;

            match &case_report.outcome {
                Outcome::Passed | Outcome::Skipped(_) => log::info!("{case_report}"),
                Outcome::Failed(_) => log::warn!("{case_report}"),
                Outcome::Errored(_) => log::error!("{case_report}"),
            }

            report.cases.push(case_report);
        }

        log::info!("run: {}", report.summary());

        report
    }

    async fn run_case(&self, case: &TestCase) -> CaseReport {
        let id = case.id.to_string();
        let start = Instant::now();

        let (fixture, login, body) = match &case.kind {
            CaseKind::Skip(reason) => {
                return CaseReport {
                    id,
                    outcome: Outcome::Skipped(reason.clone()),
                    duration: Duration::ZERO,
                };
            }
            CaseKind::Run {
                fixture,
                login,
                body,
            } => (fixture, *login, body),
        };

        dbmatrix_logging::debug_or_trace!(
            ("run_case: {id}"),
            ("run_case: {id} login={login} timeout={:?}", self.config.case_timeout)
        );

        let ctx = ScenarioContext::new(fixture.clone(), self.automation.clone(), self.config.wait);
        let timeout = self.config.case_timeout;
        let deadline = tokio::time::Instant::now() + timeout;
        let timed = async move {
            tokio::time::timeout_at(deadline, body(ctx))
                .await
                .unwrap_or(Err(ScenarioError::Timeout(timeout)))
        };

        let automation = self.automation.as_ref();
        let execution = async move {
            if login {
                with_session(automation, fixture, &LoginOptions::default(), || timed).await
            } else {
                timed.await
            }
        };

        // Login and logout count against the case deadline too; the grace lets the
        // logout after a timed-out body finish.
        let bounded = async move {
            if let Ok(result) = tokio::time::timeout_at(deadline + TEARDOWN_GRACE, execution).await
            {
                return result;
            }
            if login {
                release_session(automation, &fixture.id).await;
            }
            Err(ScenarioError::Timeout(timeout))
        };

        let result = AssertUnwindSafe(dbmatrix_logging::scoped(fixture.id.clone(), bounded))
            .catch_unwind()
            .await;

        let outcome = match result {
            Ok(Ok(())) => Outcome::Passed,
            Ok(Err(ScenarioError::Skipped(reason))) => Outcome::Skipped(reason),
            Ok(Err(e)) if e.is_environment() => Outcome::Errored(e.to_string()),
            Ok(Err(e)) => Outcome::Failed(e.to_string()),
            Err(panic) => Outcome::Failed(format!("panicked: {}", panic_message(&*panic))),
        };

        CaseReport {
            id,
            outcome,
            duration: start.elapsed(),
        }
    }
}

/// Best-effort logout after a case was abandoned mid-session.
async fn release_session(automation: &dyn Automation, fixture: &str) {
    match tokio::time::timeout(TEARDOWN_GRACE, automation.logout()).await {
        Ok(Ok(())) => log::debug!("release_session: logged out of '{fixture}'"),
        Ok(Err(e)) => log::debug!("release_session: '{fixture}': {e}"),
        Err(_) => log::warn!("release_session: logout from '{fixture}' timed out"),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
