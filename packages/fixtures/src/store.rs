use std::{collections::BTreeSet, sync::Arc};

use crate::{DatabaseFixture, FixtureError, FixtureIssue};

/// Immutable, ordered collection of fixtures.
///
/// Iteration follows declaration order, which is what keeps matrix expansion
/// deterministic between runs.
#[derive(Debug, Clone, Default)]
pub struct FixtureStore {
    fixtures: Vec<Arc<DatabaseFixture>>,
}

impl FixtureStore {
    /// Builds a store from fixtures in declaration order.
    ///
    /// # Errors
    ///
    /// * If a fixture has an empty id
    /// * If two fixtures share the same id
    pub fn new(fixtures: impl IntoIterator<Item = DatabaseFixture>) -> Result<Self, FixtureError> {
        let mut seen = BTreeSet::new();
        let mut store = vec![];

        for fixture in fixtures {
            if fixture.id.is_empty() {
                return Err(FixtureError::MissingId);
            }
            if !seen.insert(fixture.id.clone()) {
                return Err(FixtureError::DuplicateId(fixture.id));
            }
            store.push(Arc::new(fixture));
        }

        log::debug!("FixtureStore: loaded {} fixture(s): {seen:?}", store.len());

        Ok(Self { fixtures: store })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<DatabaseFixture>> {
        self.fixtures.iter()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<DatabaseFixture>> {
        self.fixtures.iter().find(|fixture| fixture.id == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    /// Authoring issues of every fixture that has any, in declaration order.
    #[must_use]
    pub fn issues(&self) -> Vec<(String, Vec<FixtureIssue>)> {
        self.fixtures
            .iter()
            .map(|fixture| (fixture.id.clone(), fixture.issues()))
            .filter(|(_, issues)| !issues.is_empty())
            .collect()
    }
}
