use super::Grid;
use crate::pipeline::{PipelineNode, ProjectNode};

/// A tree node that can be laid out on a [`Grid`].
pub trait GridNode: Sized {
    /// Child nodes, in display order.
    fn children(&self) -> &[Self];
}

impl GridNode for PipelineNode {
    fn children(&self) -> &[Self] {
        &self.downstream
    }
}

impl GridNode for ProjectNode {
    fn children(&self) -> &[Self] {
        &self.downstream
    }
}

/// Lays out a single tree with its root at `(0, 0)`.
///
/// Each node sits directly left of its first child. Later children cascade into the
/// rows below, always one column right of their parent, and a row that already holds
/// anything at or right of the target column is skipped.
pub fn place_tree<N: GridNode>(root: &N) -> Grid<&N> {
    let mut grid = Grid::new();
    place(&mut grid, 0, 0, root);
    grid
}

/// Lays out several trees in one grid, each starting in column 0 on the first row
/// below the trees placed before it.
pub fn place_forest<'a, N, I>(roots: I) -> Grid<&'a N>
where
    N: GridNode + 'a,
    I: IntoIterator<Item = &'a N>,
{
    let mut grid = Grid::new();
    for root in roots {
        let row = grid.rows();
        place(&mut grid, row, 0, root);
    }
    grid
}

fn place<'a, N: GridNode>(grid: &mut Grid<&'a N>, starting_row: usize, column: usize, node: &'a N) {
    let mut row = grid.next_available_row(starting_row, column);
    grid.set(row, column, node);

    for child in node.children() {
        place(grid, row, column + 1, child);
        row += 1;
    }
}
