use std::{collections::BTreeSet, future::Future, sync::Arc};

use dbmatrix_fixtures::DatabaseFixture;
use futures::{FutureExt as _, future::BoxFuture};
use thiserror::Error;

use crate::{ScenarioContext, ScenarioError, SkipReason};

/// Case id segment standing in for the fixture when no fixture applies.
pub const ANY_FIXTURE: &str = "*";

pub type CaseFn =
    Box<dyn Fn(ScenarioContext) -> BoxFuture<'static, Result<(), ScenarioError>> + Send + Sync>;

/// Stable `group::fixture::case` identity of a registered case.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CaseId {
    pub group: String,
    pub fixture: String,
    pub name: String,
}

impl CaseId {
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        fixture: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            fixture: fixture.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for CaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}::{}::{}", self.group, self.fixture, self.name)
    }
}

pub enum CaseKind {
    Run {
        fixture: Arc<DatabaseFixture>,
        /// Wrap the body in a session logged into `fixture`
        login: bool,
        body: CaseFn,
    },
    Skip(SkipReason),
}

impl std::fmt::Debug for CaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Run { fixture, login, .. } => f
                .debug_struct("Run")
                .field("fixture", &fixture.id)
                .field("login", login)
                .finish_non_exhaustive(),
            Self::Skip(reason) => f.debug_tuple("Skip").field(reason).finish(),
        }
    }
}

#[derive(Debug)]
pub struct TestCase {
    pub id: CaseId,
    pub kind: CaseKind,
}

impl TestCase {
    #[must_use]
    pub fn skip(id: CaseId, reason: SkipReason) -> Self {
        Self {
            id,
            kind: CaseKind::Skip(reason),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Case '{0}' is already registered")]
    DuplicateCase(String),
    #[error("{0}")]
    Invalid(String),
}

/// Collects the cases one fixture's group body registers.
pub struct Registrar {
    group: String,
    fixture: Arc<DatabaseFixture>,
    login: bool,
    names: BTreeSet<String>,
    cases: Vec<TestCase>,
}

impl Registrar {
    pub(crate) fn new(group: &str, fixture: Arc<DatabaseFixture>, login: bool) -> Self {
        Self {
            group: group.to_string(),
            fixture,
            login,
            names: BTreeSet::new(),
            cases: vec![],
        }
    }

    #[must_use]
    pub fn fixture(&self) -> &Arc<DatabaseFixture> {
        &self.fixture
    }

    fn id(&mut self, name: impl Into<String>) -> Result<CaseId, RegistrationError> {
        let name = name.into();
        if !self.names.insert(name.clone()) {
            return Err(RegistrationError::DuplicateCase(name));
        }

        Ok(CaseId::new(&self.group, &self.fixture.id, name))
    }

    /// Registers a case running `body`.
    ///
    /// # Errors
    ///
    /// * If a case with the same name is already registered for this fixture
    pub fn test<F, Fut>(&mut self, name: impl Into<String>, body: F) -> Result<(), RegistrationError>
    where
        F: Fn(ScenarioContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ScenarioError>> + Send + 'static,
    {
        let id = self.id(name)?;
        log::trace!("register: {id}");

        self.cases.push(TestCase {
            id,
            kind: CaseKind::Run {
                fixture: self.fixture.clone(),
                login: self.login,
                body: Box::new(move |ctx| body(ctx).boxed()),
            },
        });

        Ok(())
    }

    /// Registers a case that is reported as skipped without running.
    ///
    /// # Errors
    ///
    /// * If a case with the same name is already registered for this fixture
    pub fn skip(
        &mut self,
        name: impl Into<String>,
        reason: SkipReason,
    ) -> Result<(), RegistrationError> {
        let id = self.id(name)?;
        log::debug!("register: {id} skipped ({reason})");
        self.cases.push(TestCase::skip(id, reason));

        Ok(())
    }

    pub(crate) fn into_cases(self) -> Vec<TestCase> {
        self.cases
    }
}
