#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Scenario groups exercising the database client.
//!
//! Each group registers its cases through [`Matrix::for_each_database`] and reads
//! everything backend specific (tables, column order, test values, delays) from the
//! fixture of the database it runs against.

use dbmatrix_matrix::{Matrix, MatrixError};
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator as _};

pub mod crud;
pub mod export;
pub mod graph;
pub mod mock_data;
pub mod session;
pub mod ssl;
pub mod support;
pub mod type_casting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum Group {
    Crud,
    Export,
    Graph,
    TypeCasting,
    MockData,
    Ssl,
    Session,
}

impl std::fmt::Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl Group {
    /// Registers this group's cases with `matrix`.
    ///
    /// # Errors
    ///
    /// * If registering the group fails for any fixture
    pub fn register(self, matrix: &mut Matrix) -> Result<(), MatrixError> {
        log::debug!("register: group={self}");

        match self {
            Self::Crud => crud::register(matrix),
            Self::Export => export::register(matrix),
            Self::Graph => graph::register(matrix),
            Self::TypeCasting => type_casting::register(matrix),
            Self::MockData => mock_data::register(matrix),
            Self::Ssl => ssl::register(matrix),
            Self::Session => session::register(matrix),
        }
    }
}

/// Registers every group, in declaration order.
///
/// # Errors
///
/// * If registering any group fails
pub fn register_all(matrix: &mut Matrix) -> Result<(), MatrixError> {
    register_groups(matrix, Group::iter())
}

/// Registers `groups`, in the given order.
///
/// # Errors
///
/// * If registering any group fails
pub fn register_groups(
    matrix: &mut Matrix,
    groups: impl IntoIterator<Item = Group>,
) -> Result<(), MatrixError> {
    for group in groups {
        group.register(matrix)?;
    }

    Ok(())
}
