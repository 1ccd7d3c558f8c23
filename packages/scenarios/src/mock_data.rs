//! Mock-data generation: row count clamping, dependency preview, and referential
//! integrity of what gets generated.

use std::collections::{BTreeMap, BTreeSet};

use dbmatrix_fixtures::{Feature, ForeignKeyRelation};
use dbmatrix_matrix::{
    CategoryFilter, Matrix, MatrixError, MatrixOptions, ScenarioContext, ScenarioError,
    SkipReason, ensure, ensure_eq,
};
use dbmatrix_mock_data::{MAX_ROW_COUNT, check_referential_integrity};

pub const GROUP: &str = "mock_data";

const PREVIEW_ROWS: u32 = 20;
const INTEGRITY_ROWS: u32 = 10;

/// # Errors
///
/// * If registration fails for any fixture
pub fn register(matrix: &mut Matrix) -> Result<(), MatrixError> {
    matrix.for_each_database(
        GROUP,
        CategoryFilter::All,
        &MatrixOptions::new().feature(Feature::MockData),
        |fixture, registrar| {
            let Some(mock_data) = &fixture.mock_data else {
                return registrar.skip(
                    "generation",
                    SkipReason::MissingFixtureData(format!("no mockData block in '{}'", fixture.id)),
                );
            };

            registrar.test("row count clamp", |ctx| async move {
                let automation = ctx.automation();
                let max = MAX_ROW_COUNT.to_string();

                for (input, expected) in [
                    ("5", "5"),
                    (max.as_str(), max.as_str()),
                    ("201", max.as_str()),
                    ("100000", max.as_str()),
                ] {
                    let shown = automation.set_mock_row_count(input).await?;
                    ensure_eq!(shown, expected, "row count input after typing '{input}'");

                    // Clamping what is already clamped changes nothing
                    let again = automation.set_mock_row_count(&shown).await?;
                    ensure_eq!(again, shown, "row count input after retyping '{shown}'");
                }
                Ok(())
            })?;

            if let Some(table) = mock_data.supported_table.clone() {
                registrar.test("supported table", move |ctx| {
                    let table = table.clone();
                    async move {
                        let preview = ctx.automation().mock_data_preview(&table, PREVIEW_ROWS).await?;
                        ensure!(
                            preview.parents.is_empty(),
                            "'{table}' unexpectedly depends on {:?}",
                            preview.parents
                        );

                        let counts = ctx.automation().generate_mock_data(&table, PREVIEW_ROWS).await?;
                        ensure_eq!(
                            counts,
                            BTreeMap::from([(table.clone(), PREVIEW_ROWS as usize)]),
                            "generated rows"
                        );
                        Ok(())
                    }
                })?;
            }

            let Some(table) = mock_data.fk_table.clone() else {
                return registrar.skip(
                    "foreign keys",
                    SkipReason::MissingFixtureData(format!("no mockData.fkTable in '{}'", fixture.id)),
                );
            };
            let relations = mock_data.relationships.clone();

            {
                let table = table.clone();
                registrar.test("preview matches generation", move |ctx| {
                    preview_matches_generation(ctx, table.clone())
                })?;
            }
            {
                let table = table.clone();
                registrar.test("low row counts", move |ctx| low_row_counts(ctx, table.clone()))?;
            }
            registrar.test("referential integrity", move |ctx| {
                referential_integrity(ctx, table.clone(), relations.clone())
            })
        },
    )
}

async fn preview_matches_generation(
    ctx: ScenarioContext,
    table: String,
) -> Result<(), ScenarioError> {
    let automation = ctx.automation();

    let preview = automation.mock_data_preview(&table, PREVIEW_ROWS).await?;
    ensure!(
        !preview.parents.is_empty(),
        "'{table}' has no parent tables in the preview"
    );

    let counts = automation.generate_mock_data(&table, PREVIEW_ROWS).await?;

    let expected = preview
        .parents
        .iter()
        .map(|(parent, rows)| (parent.clone(), *rows as usize))
        .chain(std::iter::once((table.clone(), preview.rows as usize)))
        .collect::<BTreeMap<_, _>>();
    ensure_eq!(counts, expected, "generated rows per table");
    ensure_eq!(
        counts.values().sum::<usize>(),
        preview.total_rows() as usize,
        "total generated rows"
    );

    Ok(())
}

async fn low_row_counts(ctx: ScenarioContext, table: String) -> Result<(), ScenarioError> {
    let automation = ctx.automation();

    for rows in 1..=3 {
        let preview = automation.mock_data_preview(&table, rows).await?;
        let counts = automation.generate_mock_data(&table, rows).await?;

        ensure!(
            counts.get(&table).is_some_and(|x| *x >= 1),
            "requesting {rows} row(s) generated {counts:?}"
        );
        for (parent, _) in &preview.parents {
            ensure!(
                counts.get(parent).is_some_and(|x| *x >= 1),
                "requesting {rows} row(s) of '{table}' generated no '{parent}' rows"
            );
        }
    }

    Ok(())
}

async fn referential_integrity(
    ctx: ScenarioContext,
    table: String,
    relations: Vec<ForeignKeyRelation>,
) -> Result<(), ScenarioError> {
    let automation = ctx.automation();

    automation.generate_mock_data(&table, INTEGRITY_ROWS).await?;
    ctx.settle().await;

    let involved = relations
        .iter()
        .flat_map(|x| [x.table.as_str(), x.parent_table.as_str()])
        .collect::<BTreeSet<_>>();

    let mut tables = BTreeMap::new();
    for name in involved {
        tables.insert(name.to_string(), automation.table_rows(name).await?);
    }

    ensure!(
        tables.get(&table).is_some_and(|x| !x.is_empty()),
        "no rows in '{table}' after generation"
    );

    let nulls = relations
        .iter()
        .filter_map(|x| Some((tables.get(&x.table)?, x.column.as_str())))
        .map(|(rows, column)| {
            rows.iter()
                .filter(|row| row.get(column).is_none_or(String::is_empty))
                .count()
        })
        .sum::<usize>();
    log::debug!("referential_integrity: {nulls} NULL foreign key value(s) after generating '{table}'");

    check_referential_integrity(&relations, &tables).map_err(|violations| {
        ScenarioError::assertion(
            violations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    })
}
