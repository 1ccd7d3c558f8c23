use std::{fmt, time::Duration};

use dbmatrix_fixtures::FeatureSupport;

use crate::CategoryFilter;

/// Why a case did not run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The fixture does not support a feature the group requires
    UnsupportedFeature {
        feature: String,
        support: FeatureSupport,
    },
    /// No fixture matched the group's category and feature filter
    NoMatchingFixture {
        category: CategoryFilter,
        features: Vec<String>,
    },
    /// The fixture is authored inconsistently
    Configuration(String),
    /// The fixture lacks data the case needs
    MissingFixtureData(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedFeature { feature, support } => {
                let state = match support {
                    FeatureSupport::Unsupported => "disabled",
                    FeatureSupport::Undeclared => "undeclared",
                    FeatureSupport::Supported => "supported",
                };
                write!(f, "unsupported feature: '{feature}' is {state}")
            }
            Self::NoMatchingFixture { category, features } => {
                write!(f, "no matching fixture for category '{}'", category.as_ref())?;
                if !features.is_empty() {
                    write!(f, " with features [{}]", features.join(", "))?;
                }
                Ok(())
            }
            Self::Configuration(message) => write!(f, "configuration error: {message}"),
            Self::MissingFixtureData(message) => write!(f, "missing fixture data: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    /// An assertion did not hold
    Failed(String),
    Skipped(SkipReason),
    /// The environment is broken (backend unreachable, certificate unreadable, ...)
    Errored(String),
}

impl Outcome {
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Passed => "PASS",
            Self::Failed(_) => "FAIL",
            Self::Skipped(_) => "SKIP",
            Self::Errored(_) => "ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseReport {
    pub id: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

impl fmt::Display for CaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<5} {}", self.outcome.label(), self.id)?;
        match &self.outcome {
            Outcome::Passed => write!(f, " ({}ms)", self.duration.as_millis()),
            Outcome::Failed(message) | Outcome::Errored(message) => write!(f, ": {message}"),
            Outcome::Skipped(reason) => write!(f, " ({reason})"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl Summary {
    #[must_use]
    pub const fn total(&self) -> usize {
        self.passed + self.failed + self.skipped + self.errored
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} skipped, {} errored ({} total)",
            self.passed,
            self.failed,
            self.skipped,
            self.errored,
            self.total()
        )
    }
}

/// Outcomes of a run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub cases: Vec<CaseReport>,
}

impl Report {
    #[must_use]
    pub fn summary(&self) -> Summary {
        self.cases
            .iter()
            .fold(Summary::default(), |mut summary, case| {
                match case.outcome {
                    Outcome::Passed => summary.passed += 1,
                    Outcome::Failed(_) => summary.failed += 1,
                    Outcome::Skipped(_) => summary.skipped += 1,
                    Outcome::Errored(_) => summary.errored += 1,
                }
                summary
            })
    }

    /// Whether nothing failed or errored.
    #[must_use]
    pub fn is_success(&self) -> bool {
        let summary = self.summary();
        summary.failed == 0 && summary.errored == 0
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|x| x.id == id)
    }

    #[must_use]
    pub fn outcome(&self, id: &str) -> Option<&Outcome> {
        self.get(id).map(|x| &x.outcome)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            writeln!(f, "{case}")?;
        }
        write!(f, "{}", self.summary())
    }
}
