//! Loading fixtures from disk.
//!
//! A fixture directory contains a manifest named `databases.json5` (or `.json`) that lists
//! the fixture ids in declaration order, plus one `<id>.json5` (or `<id>.json`) document
//! per id:
//!
//! ```text
//! fixtures/
//! ├── databases.json5   { databases: ["postgres", "mongodb"] }
//! ├── postgres.json5
//! └── mongodb.json
//! ```

use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{DatabaseFixture, FixtureError, FixtureStore};

/// File stem of the fixture manifest.
pub const MANIFEST_FILENAME: &str = "databases";

#[derive(Debug, Deserialize)]
struct Manifest {
    databases: Vec<String>,
}

/// Get the path to a fixture file, preferring .json5 but also checking .json
fn get_fixture_file_path(dir: &Path, filename: &str) -> Option<PathBuf> {
    let json5_path = dir.join(format!("{filename}.json5"));
    if json5_path.exists() {
        return Some(json5_path);
    }

    let json_path = dir.join(format!("{filename}.json"));
    if json_path.exists() {
        return Some(json_path);
    }

    None
}

fn read_file(path: &Path) -> Result<String, FixtureError> {
    fs::read_to_string(path).map_err(|source| FixtureError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses a fixture document.
///
/// A document without an `id` takes `id`; a document declaring a different id is
/// rejected.
///
/// # Errors
///
/// * If the content is not a valid fixture document
/// * If the document declares an id other than `id`
pub fn parse_fixture(id: &str, content: &str) -> Result<DatabaseFixture, FixtureError> {
    let mut fixture: DatabaseFixture =
        json5::from_str(content).map_err(|source| FixtureError::Parse {
            id: id.to_string(),
            source,
        })?;

    if fixture.id.is_empty() {
        fixture.id = id.to_string();
    } else if fixture.id != id {
        return Err(FixtureError::IdMismatch {
            expected: id.to_string(),
            actual: fixture.id,
        });
    }

    Ok(fixture)
}

/// Loads a single fixture file, using its file stem as the fixture id.
///
/// # Errors
///
/// * If the file cannot be read
/// * If the file is not a valid fixture document
pub fn load_fixture(path: &Path) -> Result<DatabaseFixture, FixtureError> {
    let id = path
        .file_stem()
        .and_then(|x| x.to_str())
        .ok_or(FixtureError::MissingId)?;

    parse_fixture(id, &read_file(path)?)
}

/// Loads every fixture listed in `dir`'s manifest, in manifest order.
///
/// # Errors
///
/// * If the manifest is missing or malformed
/// * If a listed fixture file is missing, unreadable or malformed
/// * If the manifest lists an id twice
pub fn load_store(dir: &Path) -> Result<FixtureStore, FixtureError> {
    let manifest_path = get_fixture_file_path(dir, MANIFEST_FILENAME)
        .ok_or_else(|| FixtureError::ManifestNotFound(dir.to_path_buf()))?;

    let manifest: Manifest =
        json5::from_str(&read_file(&manifest_path)?).map_err(|source| FixtureError::Parse {
            id: MANIFEST_FILENAME.to_string(),
            source,
        })?;

    log::debug!(
        "load_store: manifest {} lists {:?}",
        manifest_path.display(),
        manifest.databases
    );

    let fixtures = manifest
        .databases
        .iter()
        .map(|id| {
            let path =
                get_fixture_file_path(dir, id).ok_or_else(|| FixtureError::FixtureNotFound {
                    id: id.clone(),
                    dir: dir.to_path_buf(),
                })?;
            parse_fixture(id, &read_file(&path)?)
        })
        .collect::<Result<Vec<_>, _>>()?;

    FixtureStore::new(fixtures)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test_log::test]
    fn loads_store_in_manifest_order() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "databases.json5",
            r#"{ databases: ["redis", "postgres"] }"#,
        );
        write(
            dir.path(),
            "postgres.json5",
            r#"{ type: "Postgres", category: "sql" }"#,
        );
        write(
            dir.path(),
            "redis.json",
            r#"{ "type": "Redis", "category": "keyvalue" }"#,
        );

        let store = load_store(dir.path()).unwrap();

        assert_eq!(
            store.iter().map(|x| x.id.as_str()).collect::<Vec<_>>(),
            vec!["redis", "postgres"]
        );
    }

    #[test_log::test]
    fn missing_manifest_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            load_store(dir.path()),
            Err(FixtureError::ManifestNotFound(_))
        ));
    }

    #[test_log::test]
    fn missing_fixture_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "databases.json5", r#"{ databases: ["mysql"] }"#);

        assert!(matches!(
            load_store(dir.path()),
            Err(FixtureError::FixtureNotFound { id, .. }) if id == "mysql"
        ));
    }

    #[test_log::test]
    fn unknown_category_fails_loading_with_fixture_id() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "databases.json5", r#"{ databases: ["neo4j"] }"#);
        write(
            dir.path(),
            "neo4j.json5",
            r#"{ type: "Neo4j", category: "graph" }"#,
        );

        assert!(matches!(
            load_store(dir.path()),
            Err(FixtureError::Parse { id, .. }) if id == "neo4j"
        ));
    }

    #[test_log::test]
    fn declared_id_must_match_file() {
        let result = parse_fixture(
            "postgres",
            r#"{ id: "mysql", type: "MySQL", category: "sql" }"#,
        );

        assert!(matches!(result, Err(FixtureError::IdMismatch { .. })));
    }

    #[test_log::test]
    fn load_fixture_uses_file_stem() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "sqlite3.json5",
            r#"{ type: "Sqlite3", category: "sql", mutationDelay: 250 }"#,
        );

        let fixture = load_fixture(&dir.path().join("sqlite3.json5")).unwrap();

        assert_eq!(fixture.id, "sqlite3");
        assert_eq!(fixture.mutation_delay, std::time::Duration::from_millis(250));
    }
}
