#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! The automation collaborator scenarios drive the database client through.
//!
//! [`Automation`] is the seam between the test matrix and whatever actually operates
//! the client (a browser session in production, [`simulator::SimulatedBrowser`] in this
//! workspace). Calls look synchronous to scenario code but suspend on the underlying
//! session; anything that has to be retried until it holds goes through
//! [`wait::wait_for`].

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

use async_trait::async_trait;
use dbmatrix_fixtures::DatabaseFixture;
use dbmatrix_mock_data::{DependencyPreview, MockDataError, Row};
use strum::{AsRefStr, EnumString};
use thiserror::Error;

pub mod export;
pub mod rows;
pub mod session;
pub mod ssl;
pub mod wait;

#[cfg(feature = "simulator")]
pub mod simulator;

pub use export::{ExportExchange, ExportFormat, ExportRequest, ExportResponse};
pub use rows::RenderedTable;
pub use session::with_session;
pub use wait::{WaitOptions, wait_for};

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Connection to '{target}' refused: {reason}")]
    ConnectionRefused { target: String, reason: String },
    #[error("Failed to read certificate {path}: {source}")]
    Certificate {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Login failed: {0}")]
    LoginFailed(String),
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("No table selected")]
    NoTableSelected,
    #[error("Table '{0}' not found")]
    TableNotFound(String),
    #[error("Row {0} not found")]
    RowNotFound(usize),
    #[error("Timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },
    #[error("Rejected: {0}")]
    Rejected(String),
    #[error("Invalid delimiter '{delimiter}': {reason}")]
    InvalidDelimiter {
        delimiter: String,
        reason: &'static str,
    },
    #[error(transparent)]
    MockData(#[from] MockDataError),
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    #[cfg(feature = "simulator")]
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl AutomationError {
    /// Whether this error points at a broken environment (backend unreachable,
    /// certificate unreadable, session could not be established) rather than at
    /// the behavior under test.
    #[must_use]
    pub const fn is_environment(&self) -> bool {
        matches!(
            self,
            Self::ConnectionRefused { .. }
                | Self::Certificate { .. }
                | Self::LoginFailed(_)
                | Self::NotLoggedIn
        )
    }
}

/// Top-level views of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "kebab-case")]
pub enum View {
    Storage,
    Graph,
    Scratchpad,
    Chat,
}

/// Extra inputs of the login form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginOptions {
    pub ssl_mode: Option<String>,
    /// PEM content of the CA certificate
    pub ca_certificate: Option<String>,
}

impl LoginOptions {
    #[must_use]
    pub fn ssl_mode(mut self, mode: impl Into<String>) -> Self {
        self.ssl_mode = Some(mode.into());
        self
    }

    #[must_use]
    pub fn ca_certificate(mut self, content: impl Into<String>) -> Self {
        self.ca_certificate = Some(content.into());
        self
    }
}

#[async_trait]
pub trait Automation: Send + Sync {
    /// Logs into the database described by `fixture`'s connection.
    ///
    /// # Errors
    ///
    /// * If the backend cannot be reached or rejects the credentials
    async fn login(
        &self,
        fixture: &DatabaseFixture,
        options: &LoginOptions,
    ) -> Result<(), AutomationError>;

    /// # Errors
    ///
    /// * If there is no session to end
    async fn logout(&self) -> Result<(), AutomationError>;

    /// # Errors
    ///
    /// * If not logged in
    async fn navigate(&self, view: View) -> Result<(), AutomationError>;

    /// # Errors
    ///
    /// * If not logged in or the table does not exist
    async fn select_table(&self, table: &str) -> Result<(), AutomationError>;

    /// Rows of the selected table as rendered, including the leading selection column.
    ///
    /// # Errors
    ///
    /// * If no table is selected
    async fn rendered_rows(&self) -> Result<RenderedTable, AutomationError>;

    /// # Errors
    ///
    /// * If no table is selected or the backend rejects the row
    async fn add_row(&self, values: &Row) -> Result<(), AutomationError>;

    /// Updates one cell of the rendered row at `row`.
    ///
    /// # Errors
    ///
    /// * If the row does not exist or the backend rejects the value
    async fn update_row(&self, row: usize, column: &str, value: &str)
    -> Result<(), AutomationError>;

    /// # Errors
    ///
    /// * If the row does not exist
    async fn delete_row(&self, row: usize) -> Result<(), AutomationError>;

    /// Submits an export of the selected table and returns the intercepted exchange.
    ///
    /// # Errors
    ///
    /// * If no table is selected
    async fn export(&self, request: &ExportRequest) -> Result<ExportExchange, AutomationError>;

    /// # Errors
    ///
    /// * If not logged in
    async fn secure_connection_indicator(&self) -> Result<bool, AutomationError>;

    /// Node to neighbor names as shown by the graph view.
    ///
    /// # Errors
    ///
    /// * If not logged in
    async fn graph_topology(&self) -> Result<BTreeMap<String, Vec<String>>, AutomationError>;

    /// Types `input` into the mock data row-count field and returns what it displays.
    ///
    /// # Errors
    ///
    /// * If not logged in
    async fn set_mock_row_count(&self, input: &str) -> Result<String, AutomationError>;

    /// # Errors
    ///
    /// * If generation is not possible for `table`
    async fn mock_data_preview(
        &self,
        table: &str,
        rows: u32,
    ) -> Result<DependencyPreview, AutomationError>;

    /// Generates mock rows and returns the number of rows written per table.
    ///
    /// # Errors
    ///
    /// * If generation is not possible for `table`
    async fn generate_mock_data(
        &self,
        table: &str,
        rows: u32,
    ) -> Result<BTreeMap<String, usize>, AutomationError>;

    /// # Errors
    ///
    /// * If the table does not exist
    async fn table_rows(&self, table: &str) -> Result<Vec<Row>, AutomationError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn environment_errors_are_classified() {
        assert!(
            AutomationError::ConnectionRefused {
                target: "localhost:5432".to_string(),
                reason: "refused".to_string(),
            }
            .is_environment()
        );
        assert!(AutomationError::LoginFailed("bad password".to_string()).is_environment());
        assert!(!AutomationError::RowNotFound(3).is_environment());
        assert!(!AutomationError::Rejected("constraint".to_string()).is_environment());
    }

    #[test_log::test]
    fn views_parse_from_strings() {
        assert_eq!("graph".parse::<View>().unwrap(), View::Graph);
        assert_eq!(View::Scratchpad.as_ref(), "scratchpad");
    }
}
