use std::collections::BTreeMap;

use dbmatrix_automation::View;
use dbmatrix_fixtures::Feature;
use dbmatrix_matrix::{
    CategoryFilter, Matrix, MatrixError, MatrixOptions, ScenarioError, SkipReason, ensure_eq,
};

pub const GROUP: &str = "graph";

/// # Errors
///
/// * If registration fails for any fixture
pub fn register(matrix: &mut Matrix) -> Result<(), MatrixError> {
    matrix.for_each_database(
        GROUP,
        CategoryFilter::All,
        &MatrixOptions::new().feature(Feature::Graph),
        |fixture, registrar| {
            let Some(graph) = &fixture.graph else {
                return registrar.skip(
                    "topology",
                    SkipReason::MissingFixtureData(format!("no graph block in '{}'", fixture.id)),
                );
            };

            let expected = normalize(graph.expected.clone());
            registrar.test("topology", move |ctx| {
                let expected = expected.clone();
                async move {
                    let automation = ctx.automation();
                    automation.navigate(View::Graph).await?;

                    let observed = normalize(automation.graph_topology().await?);
                    ensure_eq!(observed, expected, "graph topology");

                    automation.navigate(View::Storage).await?;
                    Ok::<_, ScenarioError>(())
                }
            })
        },
    )
}

/// Neighbor lists sorted and deduplicated, so they compare regardless of order.
fn normalize(topology: BTreeMap<String, Vec<String>>) -> BTreeMap<String, Vec<String>> {
    topology
        .into_iter()
        .map(|(node, mut neighbors)| {
            neighbors.sort();
            neighbors.dedup();
            (node, neighbors)
        })
        .collect()
}
