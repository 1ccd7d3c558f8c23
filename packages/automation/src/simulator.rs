//! In-memory stand-in for a browser session against the database client.
//!
//! [`SimulatedBrowser`] keeps one in-memory database per fixture of its store and
//! behaves the way the client does against the real backends:
//!
//! * Writes become visible only after the fixture's `mutationDelay`
//! * Rendered rows start with the selection column
//! * Values written to sql tables are coerced to the declared column type, and
//!   rejected when they cannot be
//! * SSL modes are evaluated against the fixture's mode matrix
//! * Mock data is planned and generated through [`dbmatrix_mock_data`]
//!
//! Tables are seeded with a few generated rows on first login, except tables that carry
//! `typeTests` or `typeCasting` data: scenarios populate those themselves.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use dbmatrix_fixtures::{ColumnDescriptor, DatabaseCategory, DatabaseFixture, FixtureStore};
use dbmatrix_mock_data::{
    DependencyGraph, DependencyPreview, GenerationPolicy, Row, generate, parse_row_count_input,
    values::{ValueKind, random_uuid},
};
use rand::{SeedableRng as _, rngs::StdRng};
use tokio::time::Instant;

use crate::{
    Automation, AutomationError, ExportExchange, ExportFormat, ExportRequest, ExportResponse,
    LoginOptions, RenderedTable, View,
    export::{DEFAULT_CSV_DELIMITER, escape_formula, validate_delimiter},
    ssl::is_disabled_mode,
};

/// Rows generated for every seeded table.
pub const SEED_ROWS: u32 = 3;

#[derive(Debug)]
struct Session {
    fixture: Arc<DatabaseFixture>,
    secure: bool,
    view: View,
    selected: Option<String>,
    row_count_input: String,
}

#[derive(Debug)]
enum Mutation {
    Insert { table: String, id: u64, row: Row },
    Update {
        table: String,
        id: u64,
        column: String,
        value: String,
    },
    Delete { table: String, id: u64 },
}

#[derive(Debug)]
struct Pending {
    visible_at: Instant,
    mutation: Mutation,
}

#[derive(Debug, Default)]
struct Database {
    tables: BTreeMap<String, Vec<(u64, Row)>>,
    pending: Vec<Pending>,
    next_id: u64,
}

impl Database {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn apply(&mut self, mutation: Mutation) {
        match mutation {
            Mutation::Insert { table, id, row } => {
                self.tables.entry(table).or_default().push((id, row));
            }
            Mutation::Update {
                table,
                id,
                column,
                value,
            } => {
                if let Some((_, row)) = self
                    .tables
                    .get_mut(&table)
                    .and_then(|rows| rows.iter_mut().find(|(x, _)| *x == id))
                {
                    row.insert(column, value);
                }
            }
            Mutation::Delete { table, id } => {
                if let Some(rows) = self.tables.get_mut(&table) {
                    rows.retain(|(x, _)| *x != id);
                }
            }
        }
    }

    fn mutate(&mut self, delay: Duration, mutation: Mutation) {
        if delay.is_zero() {
            self.apply(mutation);
        } else {
            log::trace!("mutate: deferring {mutation:?} by {delay:?}");
            self.pending.push(Pending {
                visible_at: Instant::now() + delay,
                mutation,
            });
        }
    }

    /// Applies every pending mutation that is due, in submission order.
    fn settle(&mut self) {
        let now = Instant::now();
        let (due, pending) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition::<Vec<_>, _>(|x| x.visible_at <= now);
        self.pending = pending;

        for x in due {
            self.apply(x.mutation);
        }
    }

    fn rows(&self, table: &str) -> Result<&[(u64, Row)], AutomationError> {
        self.tables
            .get(table)
            .map(Vec::as_slice)
            .ok_or_else(|| AutomationError::TableNotFound(table.to_string()))
    }

    fn snapshot(&self) -> BTreeMap<String, Vec<Row>> {
        self.tables
            .iter()
            .map(|(table, rows)| {
                (
                    table.clone(),
                    rows.iter().map(|(_, row)| row.clone()).collect(),
                )
            })
            .collect()
    }
}

#[derive(Debug)]
struct State {
    session: Option<Session>,
    databases: BTreeMap<String, Database>,
    rng: StdRng,
}

impl State {
    fn session(&self) -> Result<&Session, AutomationError> {
        self.session.as_ref().ok_or(AutomationError::NotLoggedIn)
    }

    fn session_mut(&mut self) -> Result<&mut Session, AutomationError> {
        self.session.as_mut().ok_or(AutomationError::NotLoggedIn)
    }

    /// The session's fixture and database, with due mutations applied.
    fn current(&mut self) -> Result<(Arc<DatabaseFixture>, &mut Database), AutomationError> {
        let fixture = self.session()?.fixture.clone();
        let database = self
            .databases
            .get_mut(&fixture.id)
            .ok_or(AutomationError::NotLoggedIn)?;
        database.settle();

        Ok((fixture, database))
    }

    fn selected_table(&self) -> Result<String, AutomationError> {
        self.session()?
            .selected
            .clone()
            .ok_or(AutomationError::NoTableSelected)
    }
}

/// Simulated client session over in-memory databases.
#[derive(Debug)]
pub struct SimulatedBrowser {
    store: Arc<FixtureStore>,
    policy: GenerationPolicy,
    unreachable: BTreeSet<String>,
    login_delays: BTreeMap<String, Duration>,
    state: Mutex<State>,
}

impl SimulatedBrowser {
    #[must_use]
    pub fn new(store: Arc<FixtureStore>) -> Self {
        Self {
            store,
            policy: GenerationPolicy::default(),
            unreachable: BTreeSet::new(),
            login_delays: BTreeMap::new(),
            state: Mutex::new(State {
                session: None,
                databases: BTreeMap::new(),
                rng: StdRng::seed_from_u64(0),
            }),
        }
    }

    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        self.lock().rng = StdRng::seed_from_u64(seed);
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: GenerationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Makes logins to the fixture `id` fail as if its backend were down.
    #[must_use]
    pub fn with_unreachable(mut self, id: impl Into<String>) -> Self {
        self.unreachable.insert(id.into());
        self
    }

    /// Makes logins to the fixture `id` take `delay` before they are answered.
    #[must_use]
    pub fn with_login_delay(mut self, id: impl Into<String>, delay: Duration) -> Self {
        self.login_delays.insert(id.into(), delay);
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn seed(rng: &mut StdRng, fixture: &DatabaseFixture) -> Database {
    let graph = DependencyGraph::from_fixture(fixture);
    let mut database = Database::default();

    for (name, config) in &fixture.tables {
        let rows = database.tables.entry(name.clone()).or_default();

        // Already filled as the parent of an earlier table
        let data = &config.test_data;
        if !rows.is_empty() || !data.type_tests.is_empty() || !data.type_casting.is_empty() {
            continue;
        }

        let generated = graph.plan(name, SEED_ROWS).and_then(|plan| {
            generate(rng, &plan, &graph, &fixture.tables, &database.snapshot())
        });

        match generated {
            Ok(generated) => {
                for (table, rows) in generated.tables {
                    for row in rows {
                        let id = database.next_id();
                        database.apply(Mutation::Insert {
                            table: table.clone(),
                            id,
                            row,
                        });
                    }
                }
            }
            Err(e) => log::warn!("seed: not seeding '{}.{name}': {e}", fixture.id),
        }
    }

    database
}

/// Column names as rendered: declared columns first, then any other keys the rows
/// carry, sorted.
fn rendered_columns(fixture: &DatabaseFixture, table: &str, rows: &[(u64, Row)]) -> Vec<String> {
    let mut columns = fixture
        .table_config(table)
        .map(|x| x.columns.names().map(ToString::to_string).collect::<Vec<_>>())
        .unwrap_or_default();

    let extra = rows
        .iter()
        .flat_map(|(_, row)| row.keys())
        .filter(|x| !columns.contains(x))
        .cloned()
        .collect::<BTreeSet<_>>();
    columns.extend(extra);

    columns
}

/// Coerces `value` to the type declared for `column`, the way a sql backend would.
fn coerce(column: &ColumnDescriptor, value: &str) -> Result<String, AutomationError> {
    if value.is_empty() {
        return Ok(String::new());
    }

    let reject = || {
        AutomationError::Rejected(format!(
            "invalid input syntax for type {}: \"{value}\"",
            column.data_type
        ))
    };
    let trimmed = value.trim();

    match ValueKind::detect(&column.data_type) {
        ValueKind::Integer => {
            if let Ok(x) = trimmed.parse::<i64>() {
                return Ok(x.to_string());
            }
            trimmed
                .parse::<f64>()
                .ok()
                .filter(|x| x.is_finite())
                .map(|x| format!("{}", x.round()))
                .ok_or_else(reject)
        }
        ValueKind::Float => trimmed
            .parse::<f64>()
            .map(|x| x.to_string())
            .map_err(|_| reject()),
        ValueKind::Decimal => trimmed
            .parse::<f64>()
            .map(|_| trimmed.to_string())
            .map_err(|_| reject()),
        ValueKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "1" | "t" | "true" | "y" | "yes" | "on" => Ok("true".to_string()),
            "0" | "f" | "false" | "n" | "no" | "off" => Ok("false".to_string()),
            _ => Err(reject()),
        },
        ValueKind::Text {
            max_len: Some(max_len),
        } if value.chars().count() > max_len => Err(AutomationError::Rejected(format!(
            "value too long for type {}",
            column.data_type
        ))),
        _ => Ok(value.to_string()),
    }
}

fn export_body(
    request: &ExportRequest,
    columns: &[String],
    rows: &[Row],
) -> Result<Vec<u8>, AutomationError> {
    match request.format {
        ExportFormat::Csv => {
            let delimiter = validate_delimiter(
                request
                    .delimiter
                    .as_deref()
                    .unwrap_or(DEFAULT_CSV_DELIMITER),
            )?;
            let mut writer = csv::WriterBuilder::new()
                .delimiter(delimiter)
                .from_writer(vec![]);

            writer.write_record(columns)?;
            for row in rows {
                writer.write_record(
                    columns
                        .iter()
                        .map(|x| escape_formula(row.get(x).map_or("", String::as_str))),
                )?;
            }

            writer
                .into_inner()
                .map_err(|e| AutomationError::Csv(e.into_error().into()))
        }
        ExportFormat::Ndjson => {
            let mut body = vec![];
            for row in rows {
                serde_json::to_writer(&mut body, row)?;
                body.push(b'\n');
            }
            Ok(body)
        }
        // Spreadsheet encoding is the client's business; only the envelope is checked.
        ExportFormat::Excel => Ok(vec![]),
    }
}

#[async_trait]
impl Automation for SimulatedBrowser {
    async fn login(
        &self,
        fixture: &DatabaseFixture,
        options: &LoginOptions,
    ) -> Result<(), AutomationError> {
        let Some(fixture) = self.store.get(&fixture.id).cloned() else {
            return Err(AutomationError::LoginFailed(format!(
                "unknown database '{}'",
                fixture.id
            )));
        };

        if let Some(delay) = self.login_delays.get(&fixture.id) {
            tokio::time::sleep(*delay).await;
        }

        if self.unreachable.contains(&fixture.id) {
            let connection = &fixture.connection;
            return Err(AutomationError::ConnectionRefused {
                target: connection.port.map_or_else(
                    || connection.host.clone(),
                    |port| format!("{}:{port}", connection.host),
                ),
                reason: "connection refused".to_string(),
            });
        }

        let secure = match &options.ssl_mode {
            Some(mode) => {
                let spec = fixture
                    .ssl
                    .as_ref()
                    .and_then(|x| x.modes.iter().find(|x| x.mode.eq_ignore_ascii_case(mode)))
                    .ok_or_else(|| {
                        AutomationError::LoginFailed(format!("unsupported ssl mode '{mode}'"))
                    })?;

                if spec.needs_cert && options.ca_certificate.is_none() {
                    return Err(AutomationError::LoginFailed(format!(
                        "ssl mode '{mode}' requires a CA certificate"
                    )));
                }
                if !spec.should_succeed {
                    return Err(AutomationError::LoginFailed(format!(
                        "ssl handshake failed in mode '{mode}'"
                    )));
                }

                !is_disabled_mode(mode)
            }
            None => false,
        };

        let mut state = self.lock();
        if state.session.is_some() {
            return Err(AutomationError::LoginFailed(
                "a session is already active".to_string(),
            ));
        }

        if !state.databases.contains_key(&fixture.id) {
            let database = seed(&mut state.rng, &fixture);
            state.databases.insert(fixture.id.clone(), database);
        }

        log::debug!("login: '{}' secure={secure}", fixture.id);

        state.session = Some(Session {
            fixture,
            secure,
            view: View::Storage,
            selected: None,
            row_count_input: String::new(),
        });

        Ok(())
    }

    async fn logout(&self) -> Result<(), AutomationError> {
        let session = self
            .lock()
            .session
            .take()
            .ok_or(AutomationError::NotLoggedIn)?;

        log::debug!("logout: '{}'", session.fixture.id);

        Ok(())
    }

    async fn navigate(&self, view: View) -> Result<(), AutomationError> {
        let mut state = self.lock();
        let session = state.session_mut()?;
        log::trace!("navigate: {:?} -> {view:?}", session.view);
        session.view = view;
        Ok(())
    }

    async fn select_table(&self, table: &str) -> Result<(), AutomationError> {
        let mut state = self.lock();
        let (_, database) = state.current()?;
        database.rows(table)?;

        let session = state.session_mut()?;
        session.view = View::Storage;
        session.selected = Some(table.to_string());

        Ok(())
    }

    async fn rendered_rows(&self) -> Result<RenderedTable, AutomationError> {
        let mut state = self.lock();
        let table = state.selected_table()?;
        let (fixture, database) = state.current()?;
        let rows = database.rows(&table)?;

        let columns = rendered_columns(&fixture, &table, rows);
        let mut rendered = RenderedTable::new(columns.iter().cloned());
        for (_, row) in rows {
            rendered.push(
                columns
                    .iter()
                    .map(|x| row.get(x).cloned().unwrap_or_default()),
            );
        }

        Ok(rendered)
    }

    async fn add_row(&self, values: &Row) -> Result<(), AutomationError> {
        let mut state = self.lock();
        let table = state.selected_table()?;
        let generated_key = random_uuid(&mut state.rng);
        let (fixture, database) = state.current()?;
        let existing = database.rows(&table)?;

        let mut row = Row::new();

        if let Some(config) = fixture.table_config(&table) {
            let sql = fixture.category == DatabaseCategory::Sql;

            for (name, value) in values {
                match config.columns.get(name) {
                    Some(column) if sql => {
                        row.insert(name.clone(), coerce(column, value)?);
                    }
                    None if sql => {
                        return Err(AutomationError::Rejected(format!(
                            "column \"{name}\" of relation \"{table}\" does not exist"
                        )));
                    }
                    _ => {
                        row.insert(name.clone(), value.clone());
                    }
                }
            }

            if let Some(key) = config.columns.primary_key() {
                let value = row.get(&key.name).filter(|x| !x.is_empty()).cloned();
                match value {
                    Some(value) => {
                        if existing.iter().any(|(_, x)| x.get(&key.name) == Some(&value)) {
                            return Err(AutomationError::Rejected(format!(
                                "duplicate key value violates unique constraint: {}={value}",
                                key.name
                            )));
                        }
                    }
                    None => {
                        let next = if ValueKind::detect(&key.data_type).is_integer() {
                            existing
                                .iter()
                                .filter_map(|(_, x)| x.get(&key.name)?.parse::<i64>().ok())
                                .max()
                                .map_or(1, |x| x + 1)
                                .to_string()
                        } else {
                            generated_key
                        };
                        row.insert(key.name.clone(), next);
                    }
                }
            }

            for name in config.columns.names() {
                row.entry(name.to_string()).or_default();
            }
        } else {
            row.clone_from(values);
        }

        log::debug!("add_row: '{}.{table}' {row:?}", fixture.id);

        let id = database.next_id();
        database.mutate(
            fixture.mutation_delay,
            Mutation::Insert { table, id, row },
        );

        Ok(())
    }

    async fn update_row(
        &self,
        row: usize,
        column: &str,
        value: &str,
    ) -> Result<(), AutomationError> {
        let mut state = self.lock();
        let table = state.selected_table()?;
        let (fixture, database) = state.current()?;
        let (id, _) = database
            .rows(&table)?
            .get(row)
            .ok_or(AutomationError::RowNotFound(row))?;
        let id = *id;

        let value = match fixture.table_config(&table) {
            Some(config) if fixture.category == DatabaseCategory::Sql => {
                let descriptor = config.columns.get(column).ok_or_else(|| {
                    AutomationError::Rejected(format!(
                        "column \"{column}\" of relation \"{table}\" does not exist"
                    ))
                })?;
                coerce(descriptor, value)?
            }
            _ => value.to_string(),
        };

        log::debug!("update_row: '{}.{table}' row {row} {column}={value}", fixture.id);

        database.mutate(
            fixture.mutation_delay,
            Mutation::Update {
                table,
                id,
                column: column.to_string(),
                value,
            },
        );

        Ok(())
    }

    async fn delete_row(&self, row: usize) -> Result<(), AutomationError> {
        let mut state = self.lock();
        let table = state.selected_table()?;
        let (fixture, database) = state.current()?;
        let (id, _) = database
            .rows(&table)?
            .get(row)
            .ok_or(AutomationError::RowNotFound(row))?;
        let id = *id;

        log::debug!("delete_row: '{}.{table}' row {row}", fixture.id);

        database.mutate(fixture.mutation_delay, Mutation::Delete { table, id });

        Ok(())
    }

    async fn export(&self, request: &ExportRequest) -> Result<ExportExchange, AutomationError> {
        let mut state = self.lock();
        let (fixture, database) = state.current()?;
        let stored = database.rows(&request.storage_unit)?;

        let columns = rendered_columns(&fixture, &request.storage_unit, stored);
        let rows = request.selected_rows.clone().unwrap_or_else(|| {
            stored.iter().map(|(_, row)| row.clone()).collect()
        });

        let body = export_body(request, &columns, &rows)?;
        let filename = request.filename();

        log::debug!(
            "export: '{}' {} row(s) as {filename}",
            fixture.id,
            rows.len()
        );

        Ok(ExportExchange {
            request_body: serde_json::to_value(request)?,
            response: ExportResponse {
                status: 200,
                headers: BTreeMap::from([
                    (
                        "content-type".to_string(),
                        request.format.content_type().to_string(),
                    ),
                    (
                        "content-disposition".to_string(),
                        format!("attachment; filename=\"{filename}\""),
                    ),
                    (
                        "cache-control".to_string(),
                        "no-cache, no-store, must-revalidate".to_string(),
                    ),
                ]),
                body,
            },
        })
    }

    async fn secure_connection_indicator(&self) -> Result<bool, AutomationError> {
        Ok(self.lock().session()?.secure)
    }

    async fn graph_topology(&self) -> Result<BTreeMap<String, Vec<String>>, AutomationError> {
        let fixture = self.lock().session()?.fixture.clone();
        let graph = DependencyGraph::from_fixture(&fixture);

        Ok(fixture
            .tables
            .keys()
            .map(|table| {
                let neighbors = graph
                    .foreign_keys_of(table)
                    .map(|x| x.parent_table.clone())
                    .collect::<BTreeSet<_>>();
                (table.clone(), neighbors.into_iter().collect())
            })
            .collect())
    }

    async fn set_mock_row_count(&self, input: &str) -> Result<String, AutomationError> {
        let mut state = self.lock();
        let session = state.session_mut()?;
        session.row_count_input = parse_row_count_input(input).to_string();
        Ok(session.row_count_input.clone())
    }

    async fn mock_data_preview(
        &self,
        table: &str,
        rows: u32,
    ) -> Result<DependencyPreview, AutomationError> {
        let fixture = self.lock().session()?.fixture.clone();
        self.policy.check(table)?;
        fixture
            .table_config(table)
            .ok_or_else(|| AutomationError::TableNotFound(table.to_string()))?;

        let plan = DependencyGraph::from_fixture(&fixture).plan(table, rows)?;

        Ok(plan.preview())
    }

    async fn generate_mock_data(
        &self,
        table: &str,
        rows: u32,
    ) -> Result<BTreeMap<String, usize>, AutomationError> {
        self.policy.check(table)?;

        let mut state = self.lock();
        let (fixture, database) = state.current()?;
        fixture
            .table_config(table)
            .ok_or_else(|| AutomationError::TableNotFound(table.to_string()))?;

        let graph = DependencyGraph::from_fixture(&fixture);
        let plan = graph.plan(table, rows)?;
        let existing = database.snapshot();

        let State { rng, databases, .. } = &mut *state;
        let generated = generate(rng, &plan, &graph, &fixture.tables, &existing)?;
        let database = databases
            .get_mut(&fixture.id)
            .ok_or(AutomationError::NotLoggedIn)?;

        let mut counts = BTreeMap::new();
        for (table, rows) in generated.tables {
            counts.insert(table.clone(), rows.len());
            for row in rows {
                let id = database.next_id();
                database.mutate(
                    fixture.mutation_delay,
                    Mutation::Insert {
                        table: table.clone(),
                        id,
                        row,
                    },
                );
            }
        }

        log::debug!("generate_mock_data: '{}' {counts:?}", fixture.id);

        Ok(counts)
    }

    async fn table_rows(&self, table: &str) -> Result<Vec<Row>, AutomationError> {
        let mut state = self.lock();
        let (_, database) = state.current()?;

        Ok(database
            .rows(table)?
            .iter()
            .map(|(_, row)| row.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use dbmatrix_fixtures::parse_fixture;
    use pretty_assertions::assert_eq;

    use super::*;

    fn store() -> Arc<FixtureStore> {
        let postgres = parse_fixture(
            "postgres",
            r#"{
                type: "Postgres",
                category: "sql",
                connection: { host: "localhost", port: 5432 },
                schema: "test_schema",
                tables: {
                    users: { columns: { id: { type: "integer", primaryKey: true }, name: "varchar(16)" } },
                    orders: { columns: { id: { type: "integer", primaryKey: true }, user_id: "integer" } },
                    data_types: {
                        columns: { id: { type: "serial", primaryKey: true }, integer_col: "integer", boolean_col: "boolean" },
                        testData: { typeTests: { integer_col: { type: "integer", addValue: "42" } } },
                    },
                },
                mockData: {
                    relationships: [
                        { table: "orders", column: "user_id", parentTable: "users", parentColumn: "id" },
                    ],
                },
                ssl: {
                    modes: [
                        { mode: "require", needsCert: false, shouldSucceed: true },
                        { mode: "verify-ca", needsCert: true, shouldSucceed: true },
                        { mode: "disabled", shouldSucceed: true },
                    ],
                },
            }"#,
        )
        .unwrap();
        let mongo = parse_fixture(
            "mongodb",
            r#"{ type: "MongoDB", category: "document", mutationDelay: 500,
                 tables: { users: { columns: { _id: "string", name: "string" } } } }"#,
        )
        .unwrap();

        Arc::new(FixtureStore::new([postgres, mongo]).unwrap())
    }

    async fn login(browser: &SimulatedBrowser, id: &str) {
        let store = store();
        browser
            .login(store.get(id).unwrap(), &LoginOptions::default())
            .await
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn seeds_tables_without_type_tests() {
        let browser = SimulatedBrowser::new(store());
        login(&browser, "postgres").await;

        assert_eq!(browser.table_rows("users").await.unwrap().len(), 5);
        assert_eq!(browser.table_rows("orders").await.unwrap().len(), 3);
        assert!(browser.table_rows("data_types").await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn add_find_delete_round() {
        let browser = SimulatedBrowser::new(store());
        login(&browser, "postgres").await;
        browser.select_table("data_types").await.unwrap();

        browser
            .add_row(&Row::from([("integer_col".to_string(), "42".to_string())]))
            .await
            .unwrap();

        let rendered = browser.rendered_rows().await.unwrap();
        assert_eq!(rendered.headers, vec!["", "id", "integer_col", "boolean_col"]);
        assert_eq!(rendered.find_rows(2, "42"), vec![0]);
        assert_eq!(rendered.cell(0, 1), Some("1"));

        browser.delete_row(0).await.unwrap();
        assert!(browser.rendered_rows().await.unwrap().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn sql_values_are_coerced_or_rejected() {
        let browser = SimulatedBrowser::new(store());
        login(&browser, "postgres").await;
        browser.select_table("data_types").await.unwrap();

        browser
            .add_row(&Row::from([
                ("integer_col".to_string(), " 41.6 ".to_string()),
                ("boolean_col".to_string(), "yes".to_string()),
            ]))
            .await
            .unwrap();

        let rendered = browser.rendered_rows().await.unwrap();
        assert_eq!(rendered.cell(0, 2), Some("42"));
        assert_eq!(rendered.cell(0, 3), Some("true"));

        let rejected = browser
            .add_row(&Row::from([("integer_col".to_string(), "abc".to_string())]))
            .await;
        assert!(matches!(rejected, Err(AutomationError::Rejected(_))));

        let unknown = browser
            .add_row(&Row::from([("nope".to_string(), "1".to_string())]))
            .await;
        assert!(matches!(unknown, Err(AutomationError::Rejected(_))));
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn writes_become_visible_after_mutation_delay() {
        let browser = SimulatedBrowser::new(store());
        login(&browser, "mongodb").await;
        browser.select_table("users").await.unwrap();
        let before = browser.rendered_rows().await.unwrap().len();

        browser
            .add_row(&Row::from([("name".to_string(), "delayed".to_string())]))
            .await
            .unwrap();

        assert_eq!(browser.rendered_rows().await.unwrap().len(), before);

        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(browser.rendered_rows().await.unwrap().len(), before + 1);
    }

    #[test_log::test(tokio::test(start_paused = true))]
    async fn generated_document_keys_follow_the_seed() {
        let mut tables = vec![];

        for _ in 0..2 {
            let browser = SimulatedBrowser::new(store()).with_seed(3);
            login(&browser, "mongodb").await;
            browser.select_table("users").await.unwrap();
            browser
                .add_row(&Row::from([("name".to_string(), "seeded".to_string())]))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(500)).await;

            tables.push(browser.table_rows("users").await.unwrap());
        }

        let added = tables[0].iter().find(|x| x["name"] == "seeded").unwrap();
        assert!(!added["_id"].is_empty());
        assert_eq!(tables[0], tables[1]);
    }

    #[test_log::test(tokio::test)]
    async fn ssl_modes_drive_the_indicator() {
        let store = store();
        let postgres = store.get("postgres").unwrap();
        let browser = SimulatedBrowser::new(store.clone());

        browser
            .login(postgres, &LoginOptions::default().ssl_mode("require"))
            .await
            .unwrap();
        assert!(browser.secure_connection_indicator().await.unwrap());
        browser.logout().await.unwrap();

        browser
            .login(postgres, &LoginOptions::default().ssl_mode("disabled"))
            .await
            .unwrap();
        assert!(!browser.secure_connection_indicator().await.unwrap());
        browser.logout().await.unwrap();

        let missing_cert = browser
            .login(postgres, &LoginOptions::default().ssl_mode("verify-ca"))
            .await;
        assert!(matches!(missing_cert, Err(AutomationError::LoginFailed(_))));
    }

    #[test_log::test(tokio::test)]
    async fn unreachable_backends_refuse_connections() {
        let store = store();
        let browser = SimulatedBrowser::new(store.clone()).with_unreachable("postgres");

        let error = browser
            .login(store.get("postgres").unwrap(), &LoginOptions::default())
            .await
            .unwrap_err();

        assert!(error.is_environment());
        assert_eq!(
            error.to_string(),
            "Connection to 'localhost:5432' refused: connection refused"
        );
    }

    #[test_log::test(tokio::test)]
    async fn csv_export_uses_delimiter_and_schema_filename() {
        let browser = SimulatedBrowser::new(store());
        login(&browser, "postgres").await;

        let exchange = browser
            .export(
                &ExportRequest::new("users", ExportFormat::Csv)
                    .schema("test_schema")
                    .delimiter("|"),
            )
            .await
            .unwrap();

        assert_eq!(exchange.request_body["delimiter"], "|");
        assert_eq!(
            exchange.response.filename().as_deref(),
            Some("test_schema_users.csv")
        );
        let text = exchange.response.text();
        assert!(text.starts_with("id|name\n"), "{text}");
        assert_eq!(text.lines().count(), 6);
    }

    #[test_log::test(tokio::test)]
    async fn graph_topology_follows_foreign_keys() {
        let browser = SimulatedBrowser::new(store());
        login(&browser, "postgres").await;

        let topology = browser.graph_topology().await.unwrap();

        assert_eq!(topology["orders"], vec!["users".to_string()]);
        assert!(topology["users"].is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn mock_data_preview_matches_generation() {
        let browser = SimulatedBrowser::new(store());
        login(&browser, "postgres").await;

        assert_eq!(browser.set_mock_row_count("500").await.unwrap(), "200");

        let preview = browser.mock_data_preview("orders", 2).await.unwrap();
        let counts = browser.generate_mock_data("orders", 2).await.unwrap();

        assert_eq!(counts["orders"], preview.rows as usize);
        assert_eq!(counts["users"], preview.parent_rows("users").unwrap() as usize);
    }

    #[test_log::test(tokio::test)]
    async fn disabled_generation_is_rejected() {
        let browser =
            SimulatedBrowser::new(store()).with_policy(GenerationPolicy::parse("orders"));
        login(&browser, "postgres").await;

        assert!(matches!(
            browser.generate_mock_data("orders", 1).await,
            Err(AutomationError::MockData(_))
        ));
    }
}
