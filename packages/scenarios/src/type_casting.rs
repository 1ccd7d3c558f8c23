//! Values typed into a column are stored the way the backend casts them.
//!
//! Undeclared `typeCasting` counts as supported here; only an explicit `false` skips.

use std::sync::Arc;

use dbmatrix_automation::View;
use dbmatrix_fixtures::{CastCase, DatabaseFixture, Feature, LEADING_COLUMN_OFFSET};
use dbmatrix_matrix::{
    CategoryFilter, Matrix, MatrixError, MatrixOptions, Registrar, RegistrationError,
    ScenarioContext, ScenarioError, SkipReason,
};
use dbmatrix_mock_data::Row;

use crate::{crud, support::wait_for_rows};

pub const GROUP: &str = "type_casting";

/// # Errors
///
/// * If registration fails for any fixture
pub fn register(matrix: &mut Matrix) -> Result<(), MatrixError> {
    matrix.for_each_database(
        GROUP,
        CategoryFilter::Sql,
        &MatrixOptions::new(),
        register_fixture,
    )
}

fn register_fixture(
    fixture: &Arc<DatabaseFixture>,
    registrar: &mut Registrar,
) -> Result<(), RegistrationError> {
    let support = fixture.has_feature(Feature::TypeCasting);
    if !support.or_assume_supported() {
        return registrar.skip(
            "casts",
            SkipReason::UnsupportedFeature {
                feature: Feature::TypeCasting.to_string(),
                support,
            },
        );
    }

    let table = fixture.test_table.type_casting.clone().or_else(|| {
        fixture
            .tables
            .iter()
            .find(|(_, config)| !config.test_data.type_casting.is_empty())
            .map(|(name, _)| name.clone())
    });
    let Some((table, config)) = table.and_then(|x| fixture.table_config(&x).map(|c| (x, c)))
    else {
        return registrar.skip(
            "casts",
            SkipReason::MissingFixtureData(format!("no typeCasting table in '{}'", fixture.id)),
        );
    };

    if config.test_data.type_casting.is_empty() {
        return registrar.skip(
            "casts",
            SkipReason::MissingFixtureData(format!("no typeCasting data for '{table}'")),
        );
    }

    for (column, cases) in &config.test_data.type_casting {
        let table = table.clone();
        let column = column.clone();
        let cases = cases.clone();
        registrar.test(format!("{table}.{column}"), move |ctx| {
            cast(ctx, table.clone(), column.clone(), cases.clone())
        })?;
    }

    Ok(())
}

async fn cast(
    ctx: ScenarioContext,
    table: String,
    column: String,
    cases: Vec<CastCase>,
) -> Result<(), ScenarioError> {
    let automation = ctx.automation();
    let index = ctx
        .table_config(&table)?
        .columns
        .index_of(&column)
        .ok_or_else(|| ScenarioError::missing_data(format!("no column '{column}' in '{table}'")))?
        + LEADING_COLUMN_OFFSET;

    automation.navigate(View::Storage).await?;
    automation.select_table(&table).await?;

    for case in &cases {
        log::debug!("cast: {table}.{column} '{}' -> '{}'", case.input, case.expected);

        let existing = automation
            .rendered_rows()
            .await?
            .find_rows(index, &case.expected)
            .len();

        automation
            .add_row(&Row::from([(column.clone(), case.input.clone())]))
            .await?;
        ctx.settle().await;

        let what = format!("'{}' stored as '{}'", case.input, case.expected);
        let row = wait_for_rows(&ctx, &what, |rows| {
            let found = rows.find_rows(index, &case.expected);
            (found.len() > existing).then(|| found.last().copied()).flatten()
        })
        .await?;

        crud::remove_row(&ctx, row).await?;
    }

    Ok(())
}
