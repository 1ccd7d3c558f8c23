#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Declarative database fixtures for the dbmatrix test matrix.
//!
//! A fixture describes one database backend under test: how to connect to it, which
//! category it belongs to, which optional features it supports, the tables it exposes
//! and the canned data scenarios use against it. Fixtures are loaded once per process
//! into an immutable [`FixtureStore`] and shared read-only from there on.
//!
//! # Example
//!
//! ```rust
//! use dbmatrix_fixtures::{Feature, FeatureSupport, parse_fixture};
//!
//! let fixture = parse_fixture("postgres", r#"{
//!     type: "Postgres",
//!     category: "sql",
//!     features: { export: true, typeCasting: false },
//! }"#).unwrap();
//!
//! assert_eq!(fixture.has_feature(Feature::Export), FeatureSupport::Supported);
//! assert_eq!(fixture.has_feature(Feature::TypeCasting), FeatureSupport::Unsupported);
//! assert_eq!(fixture.has_feature(Feature::Graph), FeatureSupport::Undeclared);
//! ```

use std::path::PathBuf;

use thiserror::Error;

pub mod file;
pub mod models;
pub mod resolver;
pub mod store;
pub mod validation;

pub use file::{load_fixture, load_store, parse_fixture};
pub use models::*;
pub use resolver::{Feature, FeatureSupport, get_table_config, has_feature};
pub use store::FixtureStore;
pub use validation::FixtureIssue;

/// Errors raised while loading or assembling fixtures.
///
/// All of these are configuration errors: they prevent a [`FixtureStore`] from being
/// built at all.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("Failed to read fixture file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse fixture '{id}': {source}")]
    Parse { id: String, source: json5::Error },
    #[error("Fixture manifest not found in {0}")]
    ManifestNotFound(PathBuf),
    #[error("Fixture file for '{id}' not found in {dir}")]
    FixtureNotFound { id: String, dir: PathBuf },
    #[error("Fixture file for '{expected}' declares id '{actual}'")]
    IdMismatch { expected: String, actual: String },
    #[error("Duplicate fixture id '{0}'")]
    DuplicateId(String),
    #[error("Fixture is missing an id")]
    MissingId,
}
