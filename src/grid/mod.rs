mod layout;

pub use layout::{place_forest, place_tree};

use std::collections::BTreeMap;

/// Sparse two-dimensional placement of values.
///
/// Rows and columns start at 0. A cell nobody wrote to is empty, which is different
/// from a cell holding a node that has no build yet. `rows()` and `columns()` are one
/// past the largest occupied row and column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid<T> {
    cells: BTreeMap<usize, BTreeMap<usize, T>>,
    rows: usize,
    columns: usize,
}

impl<T> Default for Grid<T> {
    fn default() -> Self {
        Self {
            cells: BTreeMap::new(),
            rows: 0,
            columns: 0,
        }
    }
}

impl<T> Grid<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<&T> {
        self.cells.get(&row)?.get(&column)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.values().map(BTreeMap::len).sum()
    }

    /// Occupied cells as `(row, column, value)`, row by row, left to right.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &T)> {
        self.cells
            .iter()
            .flat_map(|(&row, columns)| columns.iter().map(move |(&col, value)| (row, col, value)))
    }

    /// First row at or below `from_row` with nothing placed at `column` or to its right.
    ///
    /// May return a row past the current height.
    pub fn next_available_row(&self, from_row: usize, column: usize) -> usize {
        (from_row..)
            .find(|&row| !self.has_data_at_or_right(row, column))
            .unwrap_or(from_row)
    }

    fn has_data_at_or_right(&self, row: usize, column: usize) -> bool {
        self.cells
            .get(&row)
            .is_some_and(|columns| columns.range(column..).next().is_some())
    }

    /// Places `value` at an empty cell.
    ///
    /// # Panics
    ///
    /// Panics if the cell is already occupied. The layout never does that, so hitting
    /// it means the placement itself is broken.
    fn set(&mut self, row: usize, column: usize, value: T) {
        let previous = self.cells.entry(row).or_default().insert(column, value);
        assert!(
            previous.is_none(),
            "grid cell ({row}, {column}) was placed twice"
        );

        self.rows = self.rows.max(row + 1);
        self.columns = self.columns.max(column + 1);
    }
}
