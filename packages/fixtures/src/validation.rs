//! Fixture authoring checks run when the test matrix is built.

use thiserror::Error;

use crate::{DatabaseFixture, ForeignKeyRelation};

/// A fixture authoring mistake that makes part of the fixture unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixtureIssue {
    #[error("relationship {relation} references unknown table '{table}'")]
    UnknownTable { relation: String, table: String },
    #[error("relationship {relation} references unknown column '{table}.{column}'")]
    UnknownColumn {
        relation: String,
        table: String,
        column: String,
    },
    #[error("mockData.{field} names unknown table '{table}'")]
    UnknownMockDataTable { field: &'static str, table: String },
}

fn describe(relation: &ForeignKeyRelation) -> String {
    format!(
        "{}.{} -> {}.{}",
        relation.table, relation.column, relation.parent_table, relation.parent_column
    )
}

impl DatabaseFixture {
    /// Collects every dangling reference in the fixture's mock-data block.
    #[must_use]
    pub fn issues(&self) -> Vec<FixtureIssue> {
        let mut issues = vec![];

        let Some(mock_data) = &self.mock_data else {
            return issues;
        };

        for (field, table) in [
            ("supportedTable", &mock_data.supported_table),
            ("fkTable", &mock_data.fk_table),
        ] {
            if let Some(table) = table
                && !self.tables.contains_key(table)
            {
                issues.push(FixtureIssue::UnknownMockDataTable {
                    field,
                    table: table.clone(),
                });
            }
        }

        for relation in &mock_data.relationships {
            for (table, column) in [
                (&relation.table, &relation.column),
                (&relation.parent_table, &relation.parent_column),
            ] {
                let Some(config) = self.tables.get(table) else {
                    issues.push(FixtureIssue::UnknownTable {
                        relation: describe(relation),
                        table: table.clone(),
                    });
                    continue;
                };

                if config.columns.get(column).is_none() {
                    issues.push(FixtureIssue::UnknownColumn {
                        relation: describe(relation),
                        table: table.clone(),
                        column: column.clone(),
                    });
                }
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parse_fixture;

    #[test_log::test]
    fn valid_relationships_have_no_issues() {
        let fixture = parse_fixture(
            "postgres",
            r#"{
                type: "Postgres",
                category: "sql",
                tables: {
                    users: { columns: { id: "integer" } },
                    orders: { columns: { id: "integer", user_id: "integer" } },
                },
                mockData: {
                    supportedTable: "users",
                    fkTable: "orders",
                    relationships: [
                        { table: "orders", column: "user_id", parentTable: "users", parentColumn: "id" },
                    ],
                },
            }"#,
        )
        .unwrap();

        assert_eq!(fixture.issues(), vec![]);
    }

    #[test_log::test]
    fn dangling_references_are_reported() {
        let fixture = parse_fixture(
            "postgres",
            r#"{
                type: "Postgres",
                category: "sql",
                tables: {
                    orders: { columns: { id: "integer", user_id: "integer" } },
                },
                mockData: {
                    fkTable: "order_items",
                    relationships: [
                        { table: "orders", column: "customer_id", parentTable: "users", parentColumn: "id" },
                    ],
                },
            }"#,
        )
        .unwrap();

        assert_eq!(
            fixture.issues(),
            vec![
                FixtureIssue::UnknownMockDataTable {
                    field: "fkTable",
                    table: "order_items".to_string(),
                },
                FixtureIssue::UnknownColumn {
                    relation: "orders.customer_id -> users.id".to_string(),
                    table: "orders".to_string(),
                    column: "customer_id".to_string(),
                },
                FixtureIssue::UnknownTable {
                    relation: "orders.customer_id -> users.id".to_string(),
                    table: "users".to_string(),
                },
            ]
        );
    }

    #[test_log::test]
    fn fixture_without_mock_data_has_no_issues() {
        let fixture =
            parse_fixture("redis", r#"{ type: "Redis", category: "keyvalue" }"#).unwrap();

        assert!(fixture.issues().is_empty());
    }
}
