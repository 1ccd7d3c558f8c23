//! Table export in every supported format.

use dbmatrix_automation::{
    AutomationError, ExportExchange, ExportFormat, ExportRequest, export::file_extension,
};
use dbmatrix_fixtures::{DatabaseFixture, Feature};
use dbmatrix_matrix::{
    CategoryFilter, Matrix, MatrixError, MatrixOptions, ScenarioContext, ScenarioError,
    SkipReason, ensure, ensure_eq,
};

pub const GROUP: &str = "export";

const PIPE: &str = "|";
const SELECTED_ROWS: usize = 2;

/// # Errors
///
/// * If registration fails for any fixture
pub fn register(matrix: &mut Matrix) -> Result<(), MatrixError> {
    matrix.for_each_database(
        GROUP,
        CategoryFilter::All,
        &MatrixOptions::new().feature(Feature::Export),
        |fixture, registrar| {
            if fixture.default_table().is_none() {
                return registrar.skip(
                    "export",
                    SkipReason::MissingFixtureData(format!(
                        "no default test table in '{}'",
                        fixture.id
                    )),
                );
            }

            registrar.test("csv with pipe delimiter", |ctx| async move {
                let request = request(ctx.fixture(), ExportFormat::Csv)?.delimiter(PIPE);
                let exchange = exchange(&ctx, &request).await?;

                ensure_eq!(exchange.request_body["delimiter"], PIPE, "request delimiter");

                let columns = ctx.default_table()?.1.columns.len();
                let text = exchange.response.text();
                let header = text.lines().next().unwrap_or_default();
                ensure_eq!(
                    header.split(PIPE).count(),
                    columns.max(1),
                    "header fields of '{header}'"
                );
                Ok(())
            })?;

            registrar.test("excel", |ctx| async move {
                let request = request(ctx.fixture(), ExportFormat::Excel)?;
                let exchange = exchange(&ctx, &request).await?;

                ensure!(
                    exchange.request_body.get("delimiter").is_none(),
                    "excel request carries a delimiter: {}",
                    exchange.request_body
                );
                Ok(())
            })?;

            registrar.test("ndjson", |ctx| async move {
                let request = request(ctx.fixture(), ExportFormat::Ndjson)?;
                let exchange = exchange(&ctx, &request).await?;

                for line in exchange.response.text().lines().filter(|x| !x.is_empty()) {
                    let value = serde_json::from_str::<serde_json::Value>(line)
                        .map_err(|e| ScenarioError::assertion(format!("'{line}': {e}")))?;
                    ensure!(value.is_object(), "ndjson line is not an object: {line}");
                }
                Ok(())
            })?;

            registrar.test("csv of selected rows", |ctx| async move {
                let (table, _) = ctx.default_table()?;
                let rows = ctx
                    .automation()
                    .table_rows(table)
                    .await?
                    .into_iter()
                    .take(SELECTED_ROWS)
                    .collect::<Vec<_>>();
                if rows.is_empty() {
                    return Err(ScenarioError::missing_data(format!(
                        "no rows in '{table}' to select"
                    )));
                }

                let count = rows.len();
                let request = request(ctx.fixture(), ExportFormat::Csv)?.selected_rows(rows);
                let exchange = exchange(&ctx, &request).await?;

                let selected = exchange.request_body["selectedRows"]
                    .as_array()
                    .map_or(0, Vec::len);
                ensure_eq!(selected, count, "selectedRows in the request");
                ensure_eq!(
                    exchange.response.text().lines().count(),
                    count + 1,
                    "exported lines (header included)"
                );
                Ok(())
            })?;

            registrar.test("formula delimiter is rejected", |ctx| async move {
                let request = request(ctx.fixture(), ExportFormat::Csv)?.delimiter("=");

                match ctx.automation().export(&request).await {
                    Err(AutomationError::InvalidDelimiter { .. }) => Ok(()),
                    Err(e) => Err(e.into()),
                    Ok(_) => Err(ScenarioError::assertion("export with '=' delimiter succeeded")),
                }
            })
        },
    )
}

fn request(fixture: &DatabaseFixture, format: ExportFormat) -> Result<ExportRequest, ScenarioError> {
    let table = fixture
        .default_table()
        .ok_or_else(|| ScenarioError::missing_data("no default test table"))?;

    let request = ExportRequest::new(table, format);

    Ok(match &fixture.schema {
        Some(schema) => request.schema(schema),
        None => request,
    })
}

/// Runs the export and checks the parts every format shares: the request format,
/// the response status and the downloaded file name.
async fn exchange(
    ctx: &ScenarioContext,
    request: &ExportRequest,
) -> Result<ExportExchange, ScenarioError> {
    let exchange = ctx.automation().export(request).await?;

    ensure_eq!(
        exchange.request_body["format"],
        request.format.as_ref(),
        "request format"
    );
    ensure_eq!(exchange.response.status, 200, "export status");

    let filename = exchange
        .response
        .filename()
        .ok_or_else(|| ScenarioError::assertion("no Content-Disposition filename"))?;
    ensure_eq!(
        file_extension(&filename),
        Some(request.format.extension()),
        "extension of '{filename}'"
    );
    ensure_eq!(filename, request.filename(), "export filename");

    Ok(exchange)
}
