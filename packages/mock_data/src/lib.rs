#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Mock data generation for tables with foreign-key dependencies.
//!
//! Generating rows for a table that references other tables first requires rows in
//! those parent tables. [`DependencyGraph::plan`] resolves the parents in topological
//! order and sizes every step; the resulting [`GenerationPlan`] is both what the
//! dependency preview reports and what [`generate`] executes, so the two cannot
//! disagree.

use thiserror::Error;

pub mod dependency;
pub mod generator;
pub mod integrity;
pub mod patterns;
pub mod policy;
pub mod values;

pub use dependency::{DependencyGraph, DependencyPreview, GenerationPlan, PlanRole, PlannedTable};
pub use generator::{GeneratedData, Row, generate};
pub use integrity::{IntegrityViolation, check_referential_integrity};
pub use policy::GenerationPolicy;

/// Upper bound on the number of rows a single generation request may create.
pub const MAX_ROW_COUNT: u32 = 200;

/// Fewest rows generated for any parent table a generation depends on.
pub const MIN_PARENT_ROWS: u32 = 5;

/// Child rows planned per parent row once the minimum is exceeded.
pub const ROWS_PER_PARENT: u32 = 10;

/// Chance that a nullable column is left `NULL` in a generated row.
pub const NULL_PROBABILITY: f64 = 0.2;

#[derive(Debug, Error)]
pub enum MockDataError {
    #[error("Foreign keys of '{0}' form a cycle")]
    Cycle(String),
    #[error("No table config for '{0}'")]
    UnknownTable(String),
    #[error("No rows in '{parent}' to reference from '{table}.{column}'")]
    NoParentRows {
        table: String,
        column: String,
        parent: String,
    },
    #[error("Ran out of unique values for key '{table}.{column}'")]
    KeySpaceExhausted { table: String, column: String },
    #[error("Mock data generation is disabled for '{0}'")]
    Disabled(String),
}

/// Clamps a requested row count to [`MAX_ROW_COUNT`].
#[must_use]
pub const fn clamp_row_count(requested: u32) -> u32 {
    if requested > MAX_ROW_COUNT {
        MAX_ROW_COUNT
    } else {
        requested
    }
}

/// Interprets raw row-count input the way the row-count field does: surrounding
/// whitespace is ignored, anything that is not a non-negative integer counts as zero,
/// and the result is clamped.
#[must_use]
pub fn parse_row_count_input(input: &str) -> u32 {
    let input = input.trim();

    if input.is_empty() || !input.bytes().all(|x| x.is_ascii_digit()) {
        return 0;
    }

    // Digits only, so the only parse failure left is overflow.
    input
        .parse::<u64>()
        .map_or(MAX_ROW_COUNT, |x| clamp_row_count(u32::try_from(x).unwrap_or(u32::MAX)))
}
