use std::collections::{BTreeMap, BTreeSet};

use dbmatrix_fixtures::ForeignKeyRelation;
use thiserror::Error;

use crate::Row;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "{}.{} = '{value}' in row {row} has no match in {}.{}",
    relation.table,
    relation.column,
    relation.parent_table,
    relation.parent_column
)]
pub struct IntegrityViolation {
    pub relation: ForeignKeyRelation,
    pub value: String,
    pub row: usize,
}

/// Checks that every non-empty foreign-key value in `tables` is one of the parent's
/// key values. Relations whose child table is not in `tables` are not checked.
///
/// # Errors
///
/// * Every foreign-key value without a matching parent key
pub fn check_referential_integrity(
    relations: &[ForeignKeyRelation],
    tables: &BTreeMap<String, Vec<Row>>,
) -> Result<(), Vec<IntegrityViolation>> {
    let mut violations = vec![];

    for relation in relations {
        let Some(rows) = tables.get(&relation.table) else {
            continue;
        };

        let keys = tables
            .get(&relation.parent_table)
            .into_iter()
            .flatten()
            .filter_map(|row| row.get(&relation.parent_column))
            .map(String::as_str)
            .collect::<BTreeSet<_>>();

        for (index, row) in rows.iter().enumerate() {
            let Some(value) = row.get(&relation.column) else {
                continue;
            };
            if value.is_empty() || keys.contains(value.as_str()) {
                continue;
            }

            violations.push(IntegrityViolation {
                relation: relation.clone(),
                value: value.clone(),
                row: index,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        log::debug!("check_referential_integrity: {} violation(s)", violations.len());
        Err(violations)
    }
}
