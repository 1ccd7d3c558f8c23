//! Foreign-key dependency resolution.

use std::collections::{BTreeMap, BTreeSet};

use dbmatrix_fixtures::{DatabaseFixture, ForeignKeyRelation};

use crate::{MAX_ROW_COUNT, MIN_PARENT_ROWS, MockDataError, ROWS_PER_PARENT, clamp_row_count};

/// Foreign-key relationships between the tables of one fixture.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    relations: Vec<ForeignKeyRelation>,
    /// Table to its primary-key column
    keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanRole {
    /// Generated so that the target's foreign keys have something to reference
    Parent,
    /// The table generation was requested for
    Target,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTable {
    pub table: String,
    pub rows: u32,
    pub role: PlanRole,
}

/// Ordered generation steps, parents before the tables referencing them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPlan {
    pub requested: u32,
    pub parents: Vec<PlannedTable>,
    pub target: PlannedTable,
}

/// What a generation will create, as reported before it runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyPreview {
    pub table: String,
    pub rows: u32,
    /// Parent table to the number of rows it will receive, in generation order
    pub parents: Vec<(String, u32)>,
}

impl DependencyPreview {
    #[must_use]
    pub fn parent_rows(&self, table: &str) -> Option<u32> {
        self.parents
            .iter()
            .find(|(parent, _)| parent == table)
            .map(|(_, rows)| *rows)
    }

    #[must_use]
    pub fn total_rows(&self) -> u32 {
        self.rows + self.parents.iter().map(|(_, rows)| rows).sum::<u32>()
    }
}

impl GenerationPlan {
    /// Every step in generation order, ending with the target.
    pub fn steps(&self) -> impl Iterator<Item = &PlannedTable> {
        self.parents.iter().chain(std::iter::once(&self.target))
    }

    #[must_use]
    pub fn rows_for(&self, table: &str) -> Option<u32> {
        self.steps()
            .find(|step| step.table == table)
            .map(|step| step.rows)
    }

    #[must_use]
    pub fn preview(&self) -> DependencyPreview {
        DependencyPreview {
            table: self.target.table.clone(),
            rows: self.target.rows,
            parents: self
                .parents
                .iter()
                .map(|step| (step.table.clone(), step.rows))
                .collect(),
        }
    }
}

/// Rows a parent needs so that `child_rows` rows can reference it.
const fn parent_rows_for(child_rows: u32) -> u32 {
    let rows = child_rows.div_ceil(ROWS_PER_PARENT);
    let rows = if rows < MIN_PARENT_ROWS {
        MIN_PARENT_ROWS
    } else {
        rows
    };

    if rows > MAX_ROW_COUNT {
        MAX_ROW_COUNT
    } else {
        rows
    }
}

impl DependencyGraph {
    #[must_use]
    pub fn new(relations: impl IntoIterator<Item = ForeignKeyRelation>) -> Self {
        Self {
            relations: relations.into_iter().collect(),
            keys: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn from_fixture(fixture: &DatabaseFixture) -> Self {
        let graph = fixture
            .mock_data
            .as_ref()
            .map_or_else(Self::default, |x| Self::new(x.relationships.iter().cloned()));

        fixture.tables.iter().fold(graph, |graph, (table, config)| {
            match config.columns.primary_key() {
                Some(key) => graph.with_key(table, &key.name),
                None => graph,
            }
        })
    }

    /// Declares `column` as the primary key of `table`.
    #[must_use]
    pub fn with_key(mut self, table: &str, column: &str) -> Self {
        self.keys.insert(table.to_string(), column.to_string());
        self
    }

    /// Whether `column` is the primary key of `table`.
    #[must_use]
    pub fn is_key(&self, table: &str, column: &str) -> bool {
        self.keys.get(table).is_some_and(|x| x == column)
    }

    #[must_use]
    pub fn relations(&self) -> &[ForeignKeyRelation] {
        &self.relations
    }

    /// Foreign keys declared on `table`.
    pub fn foreign_keys_of<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a ForeignKeyRelation> + 'a {
        self.relations.iter().filter(move |x| x.table == table)
    }

    /// Distinct tables `table` references, excluding itself.
    fn parents_of<'a>(&'a self, table: &'a str) -> BTreeSet<&'a str> {
        self.foreign_keys_of(table)
            .filter(|x| x.parent_table != table)
            .map(|x| x.parent_table.as_str())
            .collect()
    }

    /// Whether generating rows for `table` requires rows in other tables.
    #[must_use]
    pub fn has_dependencies(&self, table: &str) -> bool {
        !self.parents_of(table).is_empty()
    }

    /// Plans the generation of `requested` rows (clamped to [`MAX_ROW_COUNT`]) for
    /// `table` together with every table it transitively depends on.
    ///
    /// # Errors
    ///
    /// * If the foreign keys reachable from `table` form a cycle
    pub fn plan(&self, table: &str, requested: u32) -> Result<GenerationPlan, MockDataError> {
        let rows = clamp_row_count(requested);

        let mut order = vec![];
        self.visit(table, &mut BTreeSet::new(), &mut BTreeSet::new(), &mut order)?;

        let mut counts = BTreeMap::<&str, u32>::new();
        counts.insert(table, rows);

        // Reverse post-order lists every table before the parents it references, so a
        // parent's count is final once it is reached.
        for child in order.iter().rev() {
            let child_rows = counts.get(child).copied().unwrap_or_default();
            for relation in self.foreign_keys_of(child) {
                if relation.parent_table == *child {
                    continue;
                }
                // A foreign key that is also the primary key references each parent
                // row at most once.
                let needed = if self.is_key(child, &relation.column) {
                    parent_rows_for(child_rows).max(child_rows)
                } else {
                    parent_rows_for(child_rows)
                };
                let entry = counts.entry(relation.parent_table.as_str()).or_default();
                *entry = (*entry).max(needed);
            }
        }

        // The root of a post-order walk is always emitted last.
        let parents = order
            .iter()
            .filter(|name| **name != table)
            .map(|name| PlannedTable {
                table: (*name).to_string(),
                rows: counts.get(name).copied().unwrap_or_default(),
                role: PlanRole::Parent,
            })
            .collect::<Vec<_>>();

        log::debug!("plan: table={table} requested={requested} rows={rows} parents={parents:?}");

        Ok(GenerationPlan {
            requested,
            parents,
            target: PlannedTable {
                table: table.to_string(),
                rows,
                role: PlanRole::Target,
            },
        })
    }

    fn visit<'a>(
        &'a self,
        table: &'a str,
        visiting: &mut BTreeSet<&'a str>,
        visited: &mut BTreeSet<&'a str>,
        order: &mut Vec<&'a str>,
    ) -> Result<(), MockDataError> {
        if visited.contains(table) {
            return Ok(());
        }
        if !visiting.insert(table) {
            return Err(MockDataError::Cycle(table.to_string()));
        }

        for parent in self.parents_of(table) {
            self.visit(parent, visiting, visited, order)?;
        }

        visiting.remove(table);
        visited.insert(table);
        order.push(table);

        Ok(())
    }
}
