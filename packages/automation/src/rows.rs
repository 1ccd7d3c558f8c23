use dbmatrix_fixtures::LEADING_COLUMN_OFFSET;

/// A table as rendered by the client.
///
/// The first [`LEADING_COLUMN_OFFSET`] cells of the header and of every row belong to
/// the selection column; data cells follow in declared column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RenderedTable {
    #[must_use]
    pub fn new(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            headers: std::iter::repeat_n(String::new(), LEADING_COLUMN_OFFSET)
                .chain(columns.into_iter().map(Into::into))
                .collect(),
            rows: vec![],
        }
    }

    pub fn push(&mut self, values: impl IntoIterator<Item = impl Into<String>>) {
        self.rows.push(
            std::iter::repeat_n(String::new(), LEADING_COLUMN_OFFSET)
                .chain(values.into_iter().map(Into::into))
                .collect(),
        );
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Data column names, without the selection column.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.headers
            .iter()
            .skip(LEADING_COLUMN_OFFSET)
            .map(String::as_str)
    }

    /// Position of the header named `column`, counting the selection column.
    #[must_use]
    pub fn header_index(&self, column: &str) -> Option<usize> {
        self.headers
            .iter()
            .skip(LEADING_COLUMN_OFFSET)
            .position(|x| x == column)
            .map(|x| x + LEADING_COLUMN_OFFSET)
    }

    #[must_use]
    pub fn cell(&self, row: usize, index: usize) -> Option<&str> {
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    /// Indexes of the rows whose cell at `index` equals `value` once trimmed.
    #[must_use]
    pub fn find_rows(&self, index: usize, value: &str) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.get(index).is_some_and(|x| x.trim() == value.trim()))
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn table() -> RenderedTable {
        let mut table = RenderedTable::new(["id", "integer_col"]);
        table.push(["1", " 42 "]);
        table.push(["2", "7"]);
        table
    }

    #[test_log::test]
    fn rows_carry_leading_selection_cell() {
        let table = table();

        assert_eq!(table.headers, vec!["", "id", "integer_col"]);
        assert_eq!(table.cell(0, 0), Some(""));
        assert_eq!(table.cell(0, 1), Some("1"));
        assert_eq!(table.columns().collect::<Vec<_>>(), vec!["id", "integer_col"]);
    }

    #[test_log::test]
    fn find_rows_compares_trimmed_cells() {
        let table = table();
        let index = table.header_index("integer_col").unwrap();

        assert_eq!(index, 2);
        assert_eq!(table.find_rows(index, "42"), vec![0]);
        assert!(table.find_rows(index, "43").is_empty());
    }
}
