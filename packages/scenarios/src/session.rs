//! Logging in, switching away and back, and moving between views.

use dbmatrix_automation::{AutomationError, LoginOptions, View, with_session};
use dbmatrix_fixtures::Feature;
use dbmatrix_matrix::{
    CategoryFilter, Matrix, MatrixError, MatrixOptions, ScenarioContext, ScenarioError, ensure,
};

pub const GROUP: &str = "session";

/// # Errors
///
/// * If registration fails for any fixture
pub fn register(matrix: &mut Matrix) -> Result<(), MatrixError> {
    matrix.for_each_database(
        GROUP,
        CategoryFilter::All,
        &MatrixOptions::new().login(false),
        |_, registrar| {
            registrar.test("switch and return", switch_and_return)?;
            registrar.test("views", views)
        },
    )
}

async fn switch_and_return(ctx: ScenarioContext) -> Result<(), ScenarioError> {
    let automation = ctx.automation();
    let fixture = ctx.fixture();
    let options = LoginOptions::default();

    let first = with_session(automation, fixture, &options, || async {
        read_default_table(&ctx).await
    })
    .await?;

    match automation.logout().await {
        Err(AutomationError::NotLoggedIn) => {}
        Err(e) => return Err(e.into()),
        Ok(()) => return Err(ScenarioError::assertion("logout succeeded without a session")),
    }

    let second = with_session(automation, fixture, &options, || async {
        read_default_table(&ctx).await
    })
    .await?;

    ensure!(
        first == second,
        "default table rendered {first:?} rows before switching away and {second:?} after"
    );

    Ok(())
}

/// Row count of the fixture's default table, if it has one.
async fn read_default_table(ctx: &ScenarioContext) -> Result<Option<usize>, ScenarioError> {
    let Some(table) = ctx.fixture().default_table() else {
        return Ok(None);
    };

    let automation = ctx.automation();
    automation.select_table(table).await?;
    Ok(Some(automation.rendered_rows().await?.len()))
}

async fn views(ctx: ScenarioContext) -> Result<(), ScenarioError> {
    let automation = ctx.automation();
    let fixture = ctx.fixture();

    // Graph and scratchpad are opt-in
    let views = [
        (View::Graph, Feature::Graph),
        (View::Scratchpad, Feature::Scratchpad),
    ]
    .into_iter()
    .filter(|(_, feature)| fixture.has_feature(feature).is_supported())
    .map(|(view, _)| view)
    .chain([View::Storage]);

    with_session(automation, fixture, &LoginOptions::default(), || async {
        for view in views {
            log::debug!("views: '{}' -> {}", fixture.id, view.as_ref());
            automation.navigate(view).await?;
        }
        Ok(())
    })
    .await
}
