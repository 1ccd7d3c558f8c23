//! Helpers shared by the scenario bodies.

use dbmatrix_automation::{RenderedTable, wait_for};
use dbmatrix_matrix::{ScenarioContext, ScenarioError};

/// Polls the selected table until `check` accepts what is rendered.
///
/// # Errors
///
/// * If `check` does not accept the table within the context's wait bounds
/// * If reading the rendered rows fails
pub async fn wait_for_rows<T, F>(
    ctx: &ScenarioContext,
    what: &str,
    check: F,
) -> Result<T, ScenarioError>
where
    F: Fn(&RenderedTable) -> Option<T>,
{
    let automation = ctx.automation();
    let check = &check;

    Ok(wait_for(ctx.wait_options(), what, move || async move {
        Ok(check(&automation.rendered_rows().await?))
    })
    .await?)
}

/// Indexes of the rendered rows whose `column` cell equals `value`.
#[must_use]
pub fn matching_rows(table: &RenderedTable, column: &str, value: &str) -> Vec<usize> {
    table
        .header_index(column)
        .map(|index| table.find_rows(index, value))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn missing_columns_match_nothing() {
        let mut table = RenderedTable::new(["key", "value"]);
        table.push(["a", "1"]);
        table.push(["b", " 1 "]);

        assert_eq!(matching_rows(&table, "value", "1"), vec![0, 1]);
        assert!(matching_rows(&table, "other", "1").is_empty());
    }
}
