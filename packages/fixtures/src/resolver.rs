//! Capability and table lookups over a fixture.
//!
//! Both lookups are pure reads and never modify the fixture.

use strum::{AsRefStr, EnumString};

use crate::{DatabaseFixture, TableConfig};

/// Result of asking a fixture whether it supports a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureSupport {
    /// Declared and enabled
    Supported,
    /// Explicitly declared `false`
    Unsupported,
    /// Never mentioned by the fixture
    Undeclared,
}

impl FeatureSupport {
    /// Strict reading: only an explicit declaration counts as support.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Supported)
    }

    #[must_use]
    pub const fn is_disabled(self) -> bool {
        matches!(self, Self::Unsupported)
    }

    /// Lenient reading: anything not explicitly disabled counts as support.
    #[must_use]
    pub const fn or_assume_supported(self) -> bool {
        !self.is_disabled()
    }
}

/// Well-known feature tags.
///
/// Fixtures may declare any tag; these are the ones scenario groups branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr)]
#[strum(serialize_all = "camelCase")]
pub enum Feature {
    Crud,
    Export,
    Graph,
    MockData,
    Scratchpad,
    Ssl,
    TypeCasting,
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Resolves whether `fixture` supports `feature`.
#[must_use]
pub fn has_feature(fixture: &DatabaseFixture, feature: impl AsRef<str>) -> FeatureSupport {
    match fixture.features.get(feature.as_ref()) {
        Some(true) => FeatureSupport::Supported,
        Some(false) => FeatureSupport::Unsupported,
        None => FeatureSupport::Undeclared,
    }
}

/// Looks up `table` in the fixture's table map by exact name.
#[must_use]
pub fn get_table_config<'a>(fixture: &'a DatabaseFixture, table: &str) -> Option<&'a TableConfig> {
    fixture.tables.get(table)
}

impl DatabaseFixture {
    #[must_use]
    pub fn has_feature(&self, feature: impl AsRef<str>) -> FeatureSupport {
        has_feature(self, feature)
    }

    #[must_use]
    pub fn table_config(&self, table: &str) -> Option<&TableConfig> {
        get_table_config(self, table)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parse_fixture;

    fn fixture() -> DatabaseFixture {
        parse_fixture(
            "postgres",
            r#"{
                type: "Postgres",
                category: "sql",
                features: { export: true, graph: true, typeCasting: false },
                tables: {
                    users: { columns: { id: "integer", name: "text" } },
                },
            }"#,
        )
        .unwrap()
    }

    #[test_log::test]
    fn has_feature_is_three_valued() {
        let fixture = fixture();

        assert_eq!(has_feature(&fixture, "export"), FeatureSupport::Supported);
        assert_eq!(
            has_feature(&fixture, Feature::TypeCasting),
            FeatureSupport::Unsupported
        );
        assert_eq!(
            has_feature(&fixture, Feature::MockData),
            FeatureSupport::Undeclared
        );
    }

    #[test_log::test]
    fn lenient_and_strict_readings_differ_only_for_undeclared() {
        assert!(FeatureSupport::Supported.is_supported());
        assert!(FeatureSupport::Supported.or_assume_supported());
        assert!(!FeatureSupport::Unsupported.is_supported());
        assert!(!FeatureSupport::Unsupported.or_assume_supported());
        assert!(!FeatureSupport::Undeclared.is_supported());
        assert!(FeatureSupport::Undeclared.or_assume_supported());
    }

    #[test_log::test]
    fn feature_tags_use_camel_case() {
        assert_eq!(Feature::MockData.as_ref(), "mockData");
        assert_eq!("typeCasting".parse::<Feature>().unwrap(), Feature::TypeCasting);
    }

    #[test_log::test]
    fn table_lookup_is_exact() {
        let fixture = fixture();

        assert!(get_table_config(&fixture, "users").is_some());
        assert!(get_table_config(&fixture, "Users").is_none());
        assert!(fixture.table_config("orders").is_none());
    }
}
