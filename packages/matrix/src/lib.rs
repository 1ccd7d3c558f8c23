#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Expands scenario groups over the fixture store and runs the resulting cases.
//!
//! A group is registered once with [`Matrix::for_each_database`] and turns into one
//! set of cases per fixture matching the group's category and required features.

use std::sync::Arc;

use dbmatrix_fixtures::{DatabaseCategory, DatabaseFixture, FixtureStore};
use strum::{AsRefStr, EnumString};
use thiserror::Error;

mod context;
mod registrar;
mod report;
mod runner;

pub use context::{ScenarioContext, ScenarioError};
pub use registrar::{
    ANY_FIXTURE, CaseFn, CaseId, CaseKind, Registrar, RegistrationError, TestCase,
};
pub use report::{CaseReport, Outcome, Report, SkipReason, Summary};
pub use runner::{Runner, RunnerConfig};

/// Case name of the marker registered when a group matches no fixture.
pub const NO_MATCHING_FIXTURE: &str = "no matching fixture";

/// Which fixtures a group runs against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum CategoryFilter {
    Sql,
    Document,
    KeyValue,
    #[default]
    All,
}

impl CategoryFilter {
    #[must_use]
    pub const fn matches(self, category: DatabaseCategory) -> bool {
        matches!(
            (self, category),
            (Self::All, _)
                | (Self::Sql, DatabaseCategory::Sql)
                | (Self::Document, DatabaseCategory::Document)
                | (Self::KeyValue, DatabaseCategory::KeyValue)
        )
    }
}

impl From<DatabaseCategory> for CategoryFilter {
    fn from(value: DatabaseCategory) -> Self {
        match value {
            DatabaseCategory::Sql => Self::Sql,
            DatabaseCategory::Document => Self::Document,
            DatabaseCategory::KeyValue => Self::KeyValue,
        }
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatrixOptions {
    /// Feature tags every matching fixture must support
    pub features: Vec<String>,
    /// Wrap each case in a session logged into the fixture
    pub login: bool,
}

impl Default for MatrixOptions {
    fn default() -> Self {
        Self {
            features: vec![],
            login: true,
        }
    }
}

impl MatrixOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn feature(mut self, feature: impl AsRef<str>) -> Self {
        self.features.push(feature.as_ref().to_string());
        self
    }

    #[must_use]
    pub fn features<T: AsRef<str>>(mut self, features: impl IntoIterator<Item = T>) -> Self {
        self.features
            .extend(features.into_iter().map(|x| x.as_ref().to_string()));
        self
    }

    #[must_use]
    pub const fn login(mut self, login: bool) -> Self {
        self.login = login;
        self
    }
}

#[derive(Debug, Error)]
pub enum MatrixError {
    #[error("Failed to register group '{group}' for fixture '{fixture}': {source}")]
    Registration {
        group: String,
        fixture: String,
        #[source]
        source: RegistrationError,
    },
    #[error("Invalid category '{0}'")]
    InvalidCategory(String),
}

/// Parses a category filter, rejecting anything outside the closed set.
///
/// # Errors
///
/// * [`MatrixError::InvalidCategory`] for unknown names
pub fn parse_category(value: &str) -> Result<CategoryFilter, MatrixError> {
    value
        .parse()
        .map_err(|_| MatrixError::InvalidCategory(value.to_string()))
}

/// Registered cases over one fixture store, in registration order.
#[derive(Debug)]
pub struct Matrix {
    store: Arc<FixtureStore>,
    cases: Vec<TestCase>,
}

impl Matrix {
    #[must_use]
    pub const fn new(store: Arc<FixtureStore>) -> Self {
        Self {
            store,
            cases: vec![],
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<FixtureStore> {
        &self.store
    }

    #[must_use]
    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    #[must_use]
    pub fn into_cases(self) -> Vec<TestCase> {
        self.cases
    }

    /// Registered case ids, in registration order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.cases.iter().map(|x| x.id.to_string()).collect()
    }

    /// Invokes `body` once per fixture matching `category` whose required features
    /// are all supported, collecting the cases it registers.
    ///
    /// Fixtures of the right category missing a required feature get a skipped case
    /// naming the feature. Fixtures with authoring issues get a skipped case listing
    /// them and their body is not invoked. When no fixture matches at all, a single
    /// `group::*::no matching fixture` skip marker is registered.
    ///
    /// # Errors
    ///
    /// * [`MatrixError::Registration`] if `body` fails for any fixture
    pub fn for_each_database<F>(
        &mut self,
        group: &str,
        category: CategoryFilter,
        options: &MatrixOptions,
        mut body: F,
    ) -> Result<(), MatrixError>
    where
        F: FnMut(&Arc<DatabaseFixture>, &mut Registrar) -> Result<(), RegistrationError>,
    {
        let mut matched = 0_usize;

        let store = self.store.clone();

        for fixture in store.iter() {
            if !category.matches(fixture.category) {
                continue;
            }

            let unsupported = options
                .features
                .iter()
                .map(|feature| (feature, fixture.has_feature(feature)))
                .find(|(_, support)| !support.is_supported());

            if let Some((feature, support)) = unsupported {
                log::debug!(
                    "for_each_database: group={group} fixture={} missing feature={feature} ({support:?})",
                    fixture.id
                );
                self.cases.push(TestCase::skip(
                    CaseId::new(group, &fixture.id, feature.as_str()),
                    SkipReason::UnsupportedFeature {
                        feature: feature.clone(),
                        support,
                    },
                ));
                continue;
            }

            matched += 1;

            let issues = fixture.issues();
            if !issues.is_empty() {
                let message = issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                log::warn!(
                    "for_each_database: group={group} fixture={} has configuration issues: {message}",
                    fixture.id
                );
                self.cases.push(TestCase::skip(
                    CaseId::new(group, &fixture.id, "configuration"),
                    SkipReason::Configuration(message),
                ));
                continue;
            }

            let mut registrar = Registrar::new(group, fixture.clone(), options.login);
            body(fixture, &mut registrar).map_err(|source| MatrixError::Registration {
                group: group.to_string(),
                fixture: fixture.id.clone(),
                source,
            })?;

            let cases = registrar.into_cases();
            log::debug!(
                "for_each_database: group={group} fixture={} registered {} case(s)",
                fixture.id,
                cases.len()
            );
            self.cases.extend(cases);
        }

        if matched == 0 {
            log::debug!("for_each_database: group={group} matched no fixture");
            self.cases.push(TestCase::skip(
                CaseId::new(group, ANY_FIXTURE, NO_MATCHING_FIXTURE),
                SkipReason::NoMatchingFixture {
                    category,
                    features: options.features.clone(),
                },
            ));
        }

        Ok(())
    }
}
