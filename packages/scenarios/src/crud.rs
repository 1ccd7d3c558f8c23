//! Row add, update and delete through the storage view.
//!
//! Sql fixtures run one case per `typeTests` column; document and key-value
//! fixtures insert and remove their `newRow`.

use std::collections::BTreeMap;

use dbmatrix_automation::View;
use dbmatrix_fixtures::{DatabaseCategory, DatabaseFixture, TypeTest};
use dbmatrix_matrix::{
    CategoryFilter, Matrix, MatrixError, MatrixOptions, Registrar, RegistrationError,
    ScenarioContext, ScenarioError, SkipReason, ensure, ensure_eq,
};
use dbmatrix_mock_data::Row;

use crate::support::{matching_rows, wait_for_rows};

pub const GROUP: &str = "crud";

/// # Errors
///
/// * If registration fails for any fixture
pub fn register(matrix: &mut Matrix) -> Result<(), MatrixError> {
    matrix.for_each_database(
        GROUP,
        CategoryFilter::All,
        &MatrixOptions::new(),
        |fixture, registrar| match fixture.category {
            DatabaseCategory::Sql => register_type_tests(fixture, registrar),
            DatabaseCategory::Document | DatabaseCategory::KeyValue => {
                register_new_row(fixture, registrar)
            }
        },
    )
}

fn register_type_tests(
    fixture: &DatabaseFixture,
    registrar: &mut Registrar,
) -> Result<(), RegistrationError> {
    let mut registered = false;

    for (table, config) in &fixture.tables {
        for (column, test) in &config.test_data.type_tests {
            if config.columns.get(column).is_none() {
                return Err(RegistrationError::Invalid(format!(
                    "typeTests column '{column}' is not a column of '{table}'"
                )));
            }

            let table = table.clone();
            let column = column.clone();
            let test = test.clone();
            registrar.test(format!("{table}.{column}"), move |ctx| {
                add_update_delete(ctx, table.clone(), column.clone(), test.clone())
            })?;
            registered = true;
        }
    }

    if !registered {
        registrar.skip(
            "type tests",
            SkipReason::MissingFixtureData(format!("no typeTests in '{}'", fixture.id)),
        )?;
    }

    Ok(())
}

async fn add_update_delete(
    ctx: ScenarioContext,
    table: String,
    column: String,
    test: TypeTest,
) -> Result<(), ScenarioError> {
    let automation = ctx.automation();
    let config = ctx.table_config(&table)?;
    let index = config
        .columns
        .cell_index(&column)
        .ok_or_else(|| ScenarioError::missing_data(format!("no column '{column}'")))?;

    automation.navigate(View::Storage).await?;
    automation.select_table(&table).await?;

    let before = automation.rendered_rows().await?;
    ensure_eq!(
        before.header_index(&column),
        Some(index),
        "rendered position of '{column}'"
    );

    let shown = test.original_value.as_deref().unwrap_or(&test.add_value);
    let existing = before.find_rows(index, shown).len();

    automation
        .add_row(&Row::from([(column.clone(), test.add_value.clone())]))
        .await?;
    ctx.settle().await;

    let added = wait_for_rows(&ctx, "added row", |rows| {
        let found = rows.find_rows(index, shown);
        (found.len() > existing).then(|| found.last().copied()).flatten()
    })
    .await?;

    let Some(update) = test.update_value.as_deref() else {
        return remove_row(&ctx, added).await;
    };

    let existing = automation.rendered_rows().await?.find_rows(index, update).len();
    automation.update_row(added, &column, update).await?;
    ctx.settle().await;

    let updated = wait_for_rows(&ctx, "updated row", |rows| {
        let found = rows.find_rows(index, update);
        (found.len() > existing).then_some(found)
    })
    .await?;
    ensure!(
        updated.contains(&added),
        "row {added} does not show '{update}' in '{column}' after the update"
    );

    remove_row(&ctx, added).await
}

/// Deletes rendered row `row` and checks exactly one row disappeared.
pub(crate) async fn remove_row(ctx: &ScenarioContext, row: usize) -> Result<(), ScenarioError> {
    let automation = ctx.automation();
    let count = automation.rendered_rows().await?.len();

    automation.delete_row(row).await?;
    ctx.settle().await;

    let after = wait_for_rows(ctx, "deleted row", |rows| {
        (rows.len() < count).then_some(rows.len())
    })
    .await?;
    ensure_eq!(after, count - 1, "row count after delete");

    Ok(())
}

fn register_new_row(
    fixture: &DatabaseFixture,
    registrar: &mut Registrar,
) -> Result<(), RegistrationError> {
    let Some(table) = fixture.default_table() else {
        return registrar.skip(
            "new row",
            SkipReason::MissingFixtureData(format!("no default test table in '{}'", fixture.id)),
        );
    };

    let new_row = fixture
        .table_config(table)
        .map(|x| x.test_data.new_row.clone())
        .unwrap_or_default();
    if new_row.is_empty() {
        return registrar.skip(
            "new row",
            SkipReason::MissingFixtureData(format!("no newRow for '{table}'")),
        );
    }

    let table = table.to_string();
    registrar.test("new row", move |ctx| {
        insert_and_remove(ctx, table.clone(), new_row.clone())
    })
}

async fn insert_and_remove(
    ctx: ScenarioContext,
    table: String,
    new_row: BTreeMap<String, String>,
) -> Result<(), ScenarioError> {
    let automation = ctx.automation();
    let config = ctx.table_config(&table)?;

    // Identify the row by its key when the fixture provides one
    let (field, value) = config
        .columns
        .primary_key()
        .and_then(|key| new_row.get_key_value(&key.name))
        .or_else(|| new_row.iter().next())
        .map(|(field, value)| (field.clone(), value.clone()))
        .ok_or_else(|| ScenarioError::missing_data("empty newRow"))?;

    automation.select_table(&table).await?;
    let existing = matching_rows(&automation.rendered_rows().await?, &field, &value).len();

    automation.add_row(&new_row).await?;
    ctx.settle().await;

    let added = wait_for_rows(&ctx, "inserted row", |rows| {
        let found = matching_rows(rows, &field, &value);
        (found.len() > existing).then(|| found.last().copied()).flatten()
    })
    .await?;

    let rendered = automation.rendered_rows().await?;
    for (column, expected) in &new_row {
        let cell = rendered
            .header_index(column)
            .and_then(|index| rendered.cell(added, index));
        ensure_eq!(
            cell.map(str::trim),
            Some(expected.trim()),
            "'{column}' of the inserted row"
        );
    }

    remove_row(&ctx, added).await
}
