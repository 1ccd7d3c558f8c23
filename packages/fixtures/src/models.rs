//! Fixture document model.
//!
//! Field names follow the camelCase spelling used in the fixture files.

use std::{collections::BTreeMap, fmt, time::Duration};

use serde::{
    Deserialize, Deserializer,
    de::{self, MapAccess, Visitor},
};
use strum::{AsRefStr, EnumString};

/// Number of fixed leading columns (the row selection checkbox) rendered before the
/// first data column of a table.
pub const LEADING_COLUMN_OFFSET: usize = 1;

/// Closed set of database categories a fixture can belong to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumString, AsRefStr, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DatabaseCategory {
    /// Relational engines (Postgres, MySQL, SQLite, ...)
    Sql,
    /// Document stores (MongoDB, Elasticsearch, ...)
    Document,
    /// Key-value stores (Redis, Memcached, ...)
    KeyValue,
}

impl fmt::Display for DatabaseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Connection parameters used to log into a fixture's backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: String,
    /// Driver specific options, passed through untouched
    #[serde(default)]
    pub advanced: BTreeMap<String, String>,
}

/// Declared feature tags of a fixture.
///
/// Keeps the difference between a tag that was never mentioned and a tag that was
/// explicitly set to `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "FeaturesRepr")]
pub struct Features(BTreeMap<String, bool>);

#[derive(Deserialize)]
#[serde(untagged)]
enum FeaturesRepr {
    Map(BTreeMap<String, bool>),
    List(Vec<String>),
}

impl From<FeaturesRepr> for Features {
    fn from(value: FeaturesRepr) -> Self {
        match value {
            FeaturesRepr::Map(map) => Self(map),
            FeaturesRepr::List(tags) => tags.into_iter().map(|tag| (tag, true)).collect(),
        }
    }
}

impl FromIterator<(String, bool)> for Features {
    fn from_iter<T: IntoIterator<Item = (String, bool)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Features {
    /// Returns the declared value of `tag`, or `None` if it was never declared.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<bool> {
        self.0.get(tag).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(tag, enabled)| (tag.as_str(), *enabled))
    }
}

/// Table names scenarios use by default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "TestTablesRepr")]
pub struct TestTables {
    pub default: Option<String>,
    /// Table holding the values of the type-casting scenarios
    pub type_casting: Option<String>,
    /// Table carrying foreign keys
    pub foreign_key: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TestTablesRepr {
    Name(String),
    Detailed(TestTablesFields),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TestTablesFields {
    #[serde(default)]
    default: Option<String>,
    #[serde(default)]
    type_casting: Option<String>,
    #[serde(default)]
    foreign_key: Option<String>,
}

impl From<TestTablesRepr> for TestTables {
    fn from(value: TestTablesRepr) -> Self {
        match value {
            TestTablesRepr::Name(name) => Self {
                default: Some(name),
                ..Self::default()
            },
            TestTablesRepr::Detailed(fields) => Self {
                default: fields.default,
                type_casting: fields.type_casting,
                foreign_key: fields.foreign_key,
            },
        }
    }
}

/// A single column of a [`TableConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub primary_key: bool,
    pub nullable: bool,
}

/// Columns of a table in declaration order.
///
/// The order matches the visual column order of the rendered table, so
/// `index_of(column) + LEADING_COLUMN_OFFSET` is the cell position of a column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns(Vec<ColumnDescriptor>);

impl Columns {
    #[must_use]
    pub const fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self(columns)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnDescriptor> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|column| column.name.as_str())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.0.iter().find(|column| column.name == name)
    }

    /// Position of `name` among the declared columns.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|column| column.name == name)
    }

    /// Position of `name`'s cell within a rendered row, accounting for the leading
    /// selection column.
    #[must_use]
    pub fn cell_index(&self, name: &str) -> Option<usize> {
        self.index_of(name).map(|index| index + LEADING_COLUMN_OFFSET)
    }

    /// The column flagged as primary key, falling back to a column named `id` or `_id`.
    #[must_use]
    pub fn primary_key(&self) -> Option<&ColumnDescriptor> {
        self.0
            .iter()
            .find(|column| column.primary_key)
            .or_else(|| self.get("id"))
            .or_else(|| self.get("_id"))
    }
}

impl<'a> IntoIterator for &'a Columns {
    type Item = &'a ColumnDescriptor;
    type IntoIter = std::slice::Iter<'a, ColumnDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnSpec {
    Type(String),
    Detailed(ColumnFields),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ColumnFields {
    #[serde(rename = "type")]
    data_type: String,
    #[serde(default)]
    primary_key: bool,
    #[serde(default)]
    nullable: Option<bool>,
}

impl<'de> Deserialize<'de> for Columns {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ColumnsVisitor;

        impl<'de> Visitor<'de> for ColumnsVisitor {
            type Value = Columns;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to column type")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut columns = Vec::<ColumnDescriptor>::new();

                while let Some((name, spec)) = map.next_entry::<String, ColumnSpec>()? {
                    if columns.iter().any(|column| column.name == name) {
                        return Err(de::Error::custom(format!("duplicate column '{name}'")));
                    }

                    columns.push(match spec {
                        ColumnSpec::Type(data_type) => ColumnDescriptor {
                            name,
                            data_type,
                            primary_key: false,
                            nullable: true,
                        },
                        ColumnSpec::Detailed(fields) => ColumnDescriptor {
                            name,
                            data_type: fields.data_type,
                            primary_key: fields.primary_key,
                            nullable: fields.nullable.unwrap_or(!fields.primary_key),
                        },
                    });
                }

                Ok(Columns(columns))
            }
        }

        deserializer.deserialize_map(ColumnsVisitor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    /// Type label the client is expected to show for the table
    #[serde(default)]
    pub type_label: Option<String>,
    /// Whether the client is expected to report the table's size
    #[serde(default)]
    pub has_size: bool,
}

/// Per-column CRUD fixture.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeTest {
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(deserialize_with = "stringly")]
    pub add_value: String,
    #[serde(default, deserialize_with = "stringly_opt")]
    pub original_value: Option<String>,
    #[serde(default, deserialize_with = "stringly_opt")]
    pub update_value: Option<String>,
}

/// A value typed into a column and the value the backend is expected to store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CastCase {
    #[serde(deserialize_with = "stringly")]
    pub input: String,
    #[serde(deserialize_with = "stringly")]
    pub expected: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    #[serde(default)]
    pub type_tests: BTreeMap<String, TypeTest>,
    #[serde(default, deserialize_with = "stringly_map")]
    pub new_row: BTreeMap<String, String>,
    #[serde(default)]
    pub type_casting: BTreeMap<String, Vec<CastCase>>,
}

/// Schema and canned data of one table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableConfig {
    #[serde(default)]
    pub columns: Columns,
    #[serde(default)]
    pub metadata: TableMetadata,
    #[serde(default)]
    pub test_data: TestData,
}

/// A foreign key from `table.column` to `parent_table.parent_column`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeignKeyRelation {
    pub table: String,
    pub column: String,
    pub parent_table: String,
    pub parent_column: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockDataConfig {
    /// Table without foreign keys that mock data can be generated for
    #[serde(default)]
    pub supported_table: Option<String>,
    /// Table whose generation requires parent rows
    #[serde(default)]
    pub fk_table: Option<String>,
    #[serde(default)]
    pub relationships: Vec<ForeignKeyRelation>,
}

/// One entry of a fixture's SSL mode matrix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslModeSpec {
    pub mode: String,
    #[serde(default)]
    pub needs_cert: bool,
    #[serde(default = "default_true")]
    pub should_succeed: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SslConfig {
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub ca_cert_path: Option<String>,
    #[serde(default)]
    pub modes: Vec<SslModeSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GraphConfig {
    /// Node name to the names of its neighbors
    #[serde(default)]
    pub expected: BTreeMap<String, Vec<String>>,
}

/// Declarative description of one database backend under test.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseFixture {
    /// Unique logical name. Filled from the file name when omitted.
    #[serde(default)]
    pub id: String,
    /// Driver/display name
    #[serde(rename = "type")]
    pub database_type: String,
    pub category: DatabaseCategory,
    #[serde(default)]
    pub connection: Connection,
    #[serde(default)]
    pub features: Features,
    /// Minimum wait before a write is visible to subsequent reads
    #[serde(default, deserialize_with = "millis")]
    pub mutation_delay: Duration,
    #[serde(default)]
    pub test_table: TestTables,
    #[serde(default)]
    pub tables: BTreeMap<String, TableConfig>,
    #[serde(default)]
    pub mock_data: Option<MockDataConfig>,
    #[serde(default)]
    pub ssl: Option<SslConfig>,
    #[serde(default)]
    pub graph: Option<GraphConfig>,
    /// Schema/namespace the test tables live in
    #[serde(default)]
    pub schema: Option<String>,
}

impl DatabaseFixture {
    /// The default test table name, if declared.
    #[must_use]
    pub fn default_table(&self) -> Option<&str> {
        self.test_table.default.as_deref()
    }
}

const fn default_true() -> bool {
    true
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

fn value_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(value) => value,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn stringly<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(value_to_string)
}

fn stringly_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<serde_json::Value>::deserialize(deserializer).map(|x| x.map(value_to_string))
}

fn stringly_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, serde_json::Value>::deserialize(deserializer).map(|map| {
        map.into_iter()
            .map(|(key, value)| (key, value_to_string(value)))
            .collect()
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn columns_keep_declaration_order() {
        let table: TableConfig = json5::from_str(
            r#"{
                columns: {
                    zeta: "text",
                    id: { type: "integer", primaryKey: true },
                    alpha: "boolean",
                },
            }"#,
        )
        .unwrap();

        assert_eq!(
            table.columns.names().collect::<Vec<_>>(),
            vec!["zeta", "id", "alpha"]
        );
        assert_eq!(table.columns.index_of("alpha"), Some(2));
        assert_eq!(table.columns.cell_index("zeta"), Some(1));
        assert_eq!(table.columns.primary_key().unwrap().name, "id");
        assert!(!table.columns.get("id").unwrap().nullable);
        assert!(table.columns.get("zeta").unwrap().nullable);
    }

    #[test_log::test]
    fn duplicate_column_is_rejected() {
        let result = json5::from_str::<TableConfig>(r#"{ columns: { a: "text", a: "int" } }"#);

        assert!(result.is_err());
    }

    #[test_log::test]
    fn primary_key_falls_back_to_id_column() {
        let table: TableConfig =
            json5::from_str(r#"{ columns: { name: "text", _id: "objectid" } }"#).unwrap();

        assert_eq!(table.columns.primary_key().unwrap().name, "_id");
    }

    #[test_log::test]
    fn features_accept_list_and_map_forms() {
        let listed: Features = json5::from_str(r#"["export", "graph"]"#).unwrap();
        let mapped: Features = json5::from_str(r"{ export: true, graph: false }").unwrap();

        assert_eq!(listed.get("graph"), Some(true));
        assert_eq!(mapped.get("graph"), Some(false));
        assert_eq!(mapped.get("mockData"), None);
    }

    #[test_log::test]
    fn test_table_accepts_bare_name() {
        let bare: TestTables = json5::from_str(r#""users""#).unwrap();
        let detailed: TestTables =
            json5::from_str(r#"{ default: "users", foreignKey: "orders" }"#).unwrap();

        assert_eq!(bare.default.as_deref(), Some("users"));
        assert_eq!(bare.foreign_key, None);
        assert_eq!(detailed.foreign_key.as_deref(), Some("orders"));
    }

    #[test_log::test]
    fn test_data_values_are_stringified() {
        let data: TestData = json5::from_str(
            r#"{
                typeTests: {
                    integer_col: { type: "integer", addValue: 42, updateValue: "43" },
                },
                newRow: { active: true, count: 7, name: "x" },
            }"#,
        )
        .unwrap();

        let integer = &data.type_tests["integer_col"];
        assert_eq!(integer.add_value, "42");
        assert_eq!(integer.update_value.as_deref(), Some("43"));
        assert_eq!(integer.original_value, None);
        assert_eq!(data.new_row["active"], "true");
        assert_eq!(data.new_row["count"], "7");
    }

    #[test_log::test]
    fn unknown_category_is_an_error() {
        let result = json5::from_str::<DatabaseFixture>(r#"{ type: "Neo4j", category: "graph" }"#);

        assert!(result.is_err());
    }

    #[test_log::test]
    fn category_round_trips_through_strings() {
        assert_eq!(
            "keyvalue".parse::<DatabaseCategory>().unwrap(),
            DatabaseCategory::KeyValue
        );
        assert_eq!(DatabaseCategory::Document.to_string(), "document");
    }

    #[test_log::test]
    fn ssl_mode_defaults_to_should_succeed() {
        let mode: SslModeSpec = json5::from_str(r#"{ mode: "disabled" }"#).unwrap();

        assert!(mode.should_succeed);
        assert!(!mode.needs_cert);
    }
}
