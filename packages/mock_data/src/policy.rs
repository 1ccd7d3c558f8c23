use std::collections::BTreeSet;

use crate::MockDataError;

/// Environment variable listing tables mock data may not be generated for.
pub const DISABLE_ENV_VAR: &str = "DBMATRIX_DISABLE_MOCK_DATA";

/// Which tables mock data generation is allowed for.
///
/// Parsed from `*` (every table disabled) or a comma-separated list of table names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GenerationPolicy {
    #[default]
    AllowAll,
    DisableAll,
    Disable(BTreeSet<String>),
}

impl GenerationPolicy {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        let value = value.trim();

        if value.is_empty() {
            return Self::AllowAll;
        }
        if value == "*" {
            return Self::DisableAll;
        }

        let tables = value
            .split(',')
            .map(str::trim)
            .filter(|x| !x.is_empty())
            .map(ToString::to_string)
            .collect::<BTreeSet<_>>();

        if tables.is_empty() {
            Self::AllowAll
        } else {
            Self::Disable(tables)
        }
    }

    #[must_use]
    pub fn from_env() -> Self {
        std::env::var(DISABLE_ENV_VAR).map_or(Self::AllowAll, |x| Self::parse(&x))
    }

    #[must_use]
    pub fn is_allowed(&self, table: &str) -> bool {
        match self {
            Self::AllowAll => true,
            Self::DisableAll => false,
            Self::Disable(tables) => !tables.contains(table),
        }
    }

    /// # Errors
    ///
    /// * If generation is disabled for `table`
    pub fn check(&self, table: &str) -> Result<(), MockDataError> {
        if self.is_allowed(table) {
            Ok(())
        } else {
            Err(MockDataError::Disabled(table.to_string()))
        }
    }
}
