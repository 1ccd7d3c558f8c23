use std::collections::{BTreeMap, BTreeSet};

use dbmatrix_fixtures::{ColumnDescriptor, TableConfig};
use rand::Rng;

use crate::{
    DependencyGraph, GenerationPlan, MockDataError, NULL_PROBABILITY, PlannedTable,
    patterns::ColumnPattern,
    values::{ValueKind, random_value},
};

/// Column name to rendered value. An empty value stands for `NULL`.
pub type Row = BTreeMap<String, String>;

const MAX_KEY_ATTEMPTS: usize = 32;

/// Rows created by one [`generate`] call, keyed by table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedData {
    pub tables: BTreeMap<String, Vec<Row>>,
}

impl GeneratedData {
    #[must_use]
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }

    #[must_use]
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }
}

/// Executes `plan`, generating parents before the tables that reference them.
///
/// Primary keys never collide with `existing` rows. Every foreign-key value is drawn
/// from the parent's keys, existing and generated alike; a self-reference draws from
/// rows of the same table and is left empty when there are none yet. A foreign key
/// that is also the primary key takes each parent key at most once. Nullable columns
/// other than the primary key are left empty with [`NULL_PROBABILITY`].
///
/// # Errors
///
/// * If a planned table has no config in `tables`
/// * If a parent table ends up without any rows to reference
/// * If the primary key runs out of unique values
pub fn generate(
    rng: &mut impl Rng,
    plan: &GenerationPlan,
    graph: &DependencyGraph,
    tables: &BTreeMap<String, TableConfig>,
    existing: &BTreeMap<String, Vec<Row>>,
) -> Result<GeneratedData, MockDataError> {
    let mut generated = GeneratedData::default();

    for step in plan.steps() {
        let rows = generate_table(rng, step, graph, tables, existing, &generated)?;
        log::debug!("generate: {} row(s) for '{}'", rows.len(), step.table);
        generated.tables.insert(step.table.clone(), rows);
    }

    Ok(generated)
}

fn generate_table(
    rng: &mut impl Rng,
    step: &PlannedTable,
    graph: &DependencyGraph,
    tables: &BTreeMap<String, TableConfig>,
    existing: &BTreeMap<String, Vec<Row>>,
    generated: &GeneratedData,
) -> Result<Vec<Row>, MockDataError> {
    let config = tables
        .get(&step.table)
        .ok_or_else(|| MockDataError::UnknownTable(step.table.clone()))?;
    let current = existing.get(&step.table).map_or(&[][..], Vec::as_slice);

    let mut keys = KeyGenerator::new(config.columns.primary_key(), current);

    let mut pools = BTreeMap::new();
    for relation in graph.foreign_keys_of(&step.table) {
        if relation.parent_table == step.table {
            continue;
        }
        let mut pool = values_of(
            existing
                .get(&relation.parent_table)
                .into_iter()
                .flatten()
                .chain(generated.rows(&relation.parent_table)),
            &relation.parent_column,
        );
        if keys.is_key_name(&relation.column) {
            pool.retain(|x| !keys.used.contains(x));
        }
        if pool.is_empty() {
            return Err(MockDataError::NoParentRows {
                table: relation.table.clone(),
                column: relation.column.clone(),
                parent: relation.parent_table.clone(),
            });
        }
        pools.insert(relation.column.as_str(), pool);
    }

    let self_references = graph
        .foreign_keys_of(&step.table)
        .filter(|x| x.parent_table == step.table)
        .map(|x| (x.column.as_str(), x.parent_column.as_str()))
        .collect::<BTreeMap<_, _>>();

    let exhausted = |column: &ColumnDescriptor| MockDataError::KeySpaceExhausted {
        table: step.table.clone(),
        column: column.name.clone(),
    };

    let mut rows: Vec<Row> = Vec::with_capacity(step.rows as usize);

    for _ in 0..step.rows {
        let mut row = Row::new();

        for column in &config.columns {
            let value = if keys.is_key(column) {
                if let Some(pool) = pools.get_mut(column.name.as_str()) {
                    if pool.is_empty() {
                        return Err(exhausted(column));
                    }
                    let key = pool.swap_remove(rng.random_range(0..pool.len()));
                    keys.claim(key)
                } else {
                    keys.next(rng).ok_or_else(|| exhausted(column))?
                }
            } else if column.nullable && rng.random_bool(NULL_PROBABILITY) {
                String::new()
            } else if let Some(pool) = pools.get(column.name.as_str()) {
                pool[rng.random_range(0..pool.len())].clone()
            } else if let Some(parent_column) = self_references.get(column.name.as_str()) {
                let pool = values_of(current.iter().chain(&rows), parent_column);
                if pool.is_empty() {
                    String::new()
                } else {
                    pool[rng.random_range(0..pool.len())].clone()
                }
            } else {
                column_value(rng, column)
            };

            row.insert(column.name.clone(), value);
        }

        rows.push(row);
    }

    Ok(rows)
}

/// Random value for a plain column, shaped by its name when the name is telling.
fn column_value(rng: &mut impl Rng, column: &ColumnDescriptor) -> String {
    let kind = ValueKind::detect(&column.data_type);

    match ColumnPattern::detect(&column.name) {
        Some(pattern) if pattern.fits(kind) => {
            let max_len = match kind {
                ValueKind::Text { max_len } => max_len,
                _ => None,
            };
            pattern.generate(rng, max_len)
        }
        _ => random_value(rng, kind),
    }
}

/// Distinct non-empty values of `column`, in first-seen order.
fn values_of<'a>(rows: impl IntoIterator<Item = &'a Row>, column: &str) -> Vec<String> {
    let mut seen = BTreeSet::new();

    rows.into_iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_empty() && seen.insert(value.as_str()))
        .cloned()
        .collect()
}

struct KeyGenerator<'a> {
    column: Option<&'a ColumnDescriptor>,
    kind: ValueKind,
    used: BTreeSet<String>,
    next_integer: i64,
}

impl<'a> KeyGenerator<'a> {
    fn new(column: Option<&'a ColumnDescriptor>, existing: &[Row]) -> Self {
        let kind = column.map_or(ValueKind::Integer, |x| ValueKind::detect(&x.data_type));
        let used = column
            .map(|x| values_of(existing, &x.name))
            .unwrap_or_default()
            .into_iter()
            .collect::<BTreeSet<_>>();
        let next_integer = used
            .iter()
            .filter_map(|x| x.parse::<i64>().ok())
            .max()
            .map_or(1, |x| x.saturating_add(1));

        Self {
            column,
            kind,
            used,
            next_integer,
        }
    }

    fn is_key(&self, column: &ColumnDescriptor) -> bool {
        self.is_key_name(&column.name)
    }

    fn is_key_name(&self, name: &str) -> bool {
        self.column.is_some_and(|x| x.name == name)
    }

    fn claim(&mut self, key: String) -> String {
        self.used.insert(key.clone());
        key
    }

    /// Next unused key, or `None` once random draws keep colliding with used keys.
    fn next(&mut self, rng: &mut impl Rng) -> Option<String> {
        let key = match self.kind {
            ValueKind::Integer => {
                let key = self.next_integer;
                self.next_integer = self.next_integer.saturating_add(1);
                key.to_string()
            }
            kind => (0..MAX_KEY_ATTEMPTS)
                .map(|_| random_value(rng, kind))
                .find(|x| !self.used.contains(x))?,
        };

        Some(self.claim(key))
    }
}

#[cfg(test)]
mod tests {
    use dbmatrix_fixtures::{ForeignKeyRelation, parse_fixture};
    use pretty_assertions::assert_eq;
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;
    use crate::check_referential_integrity;

    const SHOP: &str = r#"{
        type: "Postgres",
        category: "sql",
        tables: {
            users: { columns: { id: { type: "integer", primaryKey: true }, name: "varchar(32)" } },
            orders: { columns: { id: { type: "integer", primaryKey: true }, user_id: "integer", total: "numeric(10,2)" } },
            employees: { columns: { code: { type: "varchar(6)", primaryKey: true }, manager: "varchar(6)" } },
        },
        mockData: {
            supportedTable: "users",
            fkTable: "orders",
            relationships: [
                { table: "orders", column: "user_id", parentTable: "users", parentColumn: "id" },
                { table: "employees", column: "manager", parentTable: "employees", parentColumn: "code" },
            ],
        },
    }"#;

    fn fixture() -> dbmatrix_fixtures::DatabaseFixture {
        parse_fixture("postgres", SHOP).unwrap()
    }

    fn relations(graph: &DependencyGraph) -> Vec<ForeignKeyRelation> {
        graph.relations().to_vec()
    }

    #[test_log::test]
    fn low_counts_generate_parents_and_children() {
        let fixture = fixture();
        let graph = DependencyGraph::from_fixture(&fixture);
        let mut rng = StdRng::seed_from_u64(42);

        for requested in 1..=3 {
            let plan = graph.plan("orders", requested).unwrap();
            let data =
                generate(&mut rng, &plan, &graph, &fixture.tables, &BTreeMap::new()).unwrap();

            assert_eq!(data.row_count("orders"), requested as usize);
            assert!(data.row_count("users") >= 1);
            assert!(check_referential_integrity(&relations(&graph), &data.tables).is_ok());
        }
    }

    #[test_log::test]
    fn generated_counts_match_preview() {
        let fixture = fixture();
        let graph = DependencyGraph::from_fixture(&fixture);
        let plan = graph.plan("orders", 120).unwrap();
        let preview = plan.preview();

        let data = generate(
            &mut StdRng::seed_from_u64(1),
            &plan,
            &graph,
            &fixture.tables,
            &BTreeMap::new(),
        )
        .unwrap();

        assert_eq!(data.row_count("orders"), preview.rows as usize);
        assert_eq!(
            data.row_count("users"),
            preview.parent_rows("users").unwrap() as usize
        );
        assert_eq!(data.total_rows(), preview.total_rows() as usize);
    }

    #[test_log::test]
    fn integer_keys_continue_after_existing_rows() {
        let fixture = fixture();
        let graph = DependencyGraph::from_fixture(&fixture);
        let plan = graph.plan("users", 2).unwrap();
        let existing = BTreeMap::from([(
            "users".to_string(),
            vec![Row::from([
                ("id".to_string(), "7".to_string()),
                ("name".to_string(), "seed".to_string()),
            ])],
        )]);

        let data = generate(
            &mut StdRng::seed_from_u64(5),
            &plan,
            &graph,
            &fixture.tables,
            &existing,
        )
        .unwrap();

        assert_eq!(
            data.rows("users")
                .iter()
                .map(|x| x["id"].as_str())
                .collect::<Vec<_>>(),
            vec!["8", "9"]
        );
    }

    #[test_log::test]
    fn text_keys_are_unique_and_self_references_resolve() {
        let fixture = fixture();
        let graph = DependencyGraph::from_fixture(&fixture);
        let plan = graph.plan("employees", 40).unwrap();

        let data = generate(
            &mut StdRng::seed_from_u64(9),
            &plan,
            &graph,
            &fixture.tables,
            &BTreeMap::new(),
        )
        .unwrap();

        let rows = data.rows("employees");
        let codes = rows.iter().map(|x| x["code"].as_str()).collect::<BTreeSet<_>>();
        assert_eq!(codes.len(), rows.len());
        assert_eq!(rows[0]["manager"], "");
        assert!(check_referential_integrity(&relations(&graph), &data.tables).is_ok());
    }

    const PROFILES: &str = r#"{
        type: "Postgres",
        category: "sql",
        tables: {
            users: { columns: { id: { type: "integer", primaryKey: true }, email: "varchar(64)" } },
            profiles: { columns: { user_id: { type: "integer", primaryKey: true }, bio: "text" } },
            codes: { columns: { code: { type: "char(1)", primaryKey: true } } },
            pairs: { columns: { code: { type: "char(2)", primaryKey: true } } },
            notes: {
                columns: {
                    id: { type: "integer", primaryKey: true },
                    body: "text",
                    title: { type: "varchar(20)", nullable: false },
                },
            },
        },
        mockData: {
            relationships: [
                { table: "profiles", column: "user_id", parentTable: "users", parentColumn: "id" },
            ],
        },
    }"#;

    fn profiles() -> dbmatrix_fixtures::DatabaseFixture {
        parse_fixture("postgres", PROFILES).unwrap()
    }

    fn generate_fresh(
        fixture: &dbmatrix_fixtures::DatabaseFixture,
        table: &str,
        rows: u32,
        seed: u64,
    ) -> Result<GeneratedData, MockDataError> {
        let graph = DependencyGraph::from_fixture(fixture);
        let plan = graph.plan(table, rows).unwrap();

        generate(
            &mut StdRng::seed_from_u64(seed),
            &plan,
            &graph,
            &fixture.tables,
            &BTreeMap::new(),
        )
    }

    #[test_log::test]
    fn key_foreign_keys_reference_each_parent_once() {
        let fixture = profiles();

        for requested in [1, 2, 3, 20, 200] {
            let data = generate_fresh(&fixture, "profiles", requested, 3).unwrap();

            let rows = data.rows("profiles");
            let keys = rows.iter().map(|x| x["user_id"].as_str()).collect::<BTreeSet<_>>();
            assert_eq!(rows.len(), requested as usize);
            assert_eq!(keys.len(), rows.len(), "duplicate keys in {rows:?}");
            assert!(
                check_referential_integrity(
                    DependencyGraph::from_fixture(&fixture).relations(),
                    &data.tables
                )
                .is_ok()
            );
        }
    }

    #[test_log::test]
    fn key_foreign_keys_skip_parents_already_referenced() {
        let fixture = profiles();
        let graph = DependencyGraph::from_fixture(&fixture);
        let plan = graph.plan("profiles", 5).unwrap();
        let existing = BTreeMap::from([
            (
                "users".to_string(),
                vec![Row::from([("id".to_string(), "1".to_string())])],
            ),
            (
                "profiles".to_string(),
                vec![Row::from([("user_id".to_string(), "1".to_string())])],
            ),
        ]);

        let data = generate(
            &mut StdRng::seed_from_u64(8),
            &plan,
            &graph,
            &fixture.tables,
            &existing,
        )
        .unwrap();

        assert!(data.rows("profiles").iter().all(|x| x["user_id"] != "1"));
    }

    #[test_log::test]
    fn exhausted_key_space_is_an_error() {
        assert!(matches!(
            generate_fresh(&profiles(), "codes", 100, 0),
            Err(MockDataError::KeySpaceExhausted { table, column })
                if table == "codes" && column == "code"
        ));
    }

    #[test_log::test]
    fn short_text_keys_stay_unique_and_within_length() {
        let data = generate_fresh(&profiles(), "pairs", 200, 0).unwrap();

        let rows = data.rows("pairs");
        let codes = rows.iter().map(|x| x["code"].as_str()).collect::<BTreeSet<_>>();
        assert_eq!(codes.len(), 200);
        assert!(codes.iter().all(|x| x.len() <= 2), "{codes:?}");
    }

    #[test_log::test]
    fn only_nullable_columns_are_left_empty() {
        let data = generate_fresh(&profiles(), "notes", 200, 12).unwrap();

        let rows = data.rows("notes");
        assert!(rows.iter().any(|x| x["body"].is_empty()));
        assert!(rows.iter().all(|x| !x["title"].is_empty()));
        assert!(rows.iter().all(|x| !x["id"].is_empty()));
    }

    #[test_log::test]
    fn nullable_foreign_keys_may_be_null() {
        let data = generate_fresh(&fixture(), "orders", 200, 21).unwrap();

        assert!(data.rows("orders").iter().any(|x| x["user_id"].is_empty()));
        assert!(
            check_referential_integrity(
                DependencyGraph::from_fixture(&fixture()).relations(),
                &data.tables
            )
            .is_ok()
        );
    }

    #[test_log::test]
    fn named_columns_get_matching_values() {
        let data = generate_fresh(&profiles(), "users", 50, 2).unwrap();

        let emails = data
            .rows("users")
            .iter()
            .map(|x| x["email"].as_str())
            .filter(|x| !x.is_empty())
            .collect::<Vec<_>>();
        assert!(!emails.is_empty());
        assert!(emails.iter().all(|x| x.contains('@')), "{emails:?}");
    }

    #[test_log::test]
    fn unknown_table_is_an_error() {
        let fixture = fixture();
        let graph = DependencyGraph::from_fixture(&fixture);
        let plan = graph.plan("missing", 1).unwrap();

        assert!(matches!(
            generate(
                &mut StdRng::seed_from_u64(0),
                &plan,
                &graph,
                &fixture.tables,
                &BTreeMap::new()
            ),
            Err(MockDataError::UnknownTable(table)) if table == "missing"
        ));
    }
}
