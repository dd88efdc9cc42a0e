use mapx_common::{MapError, Result};

use crate::chunk::STILL_WATER;

/// What the map needs to know about one block column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnSummary {
    /// Surface block id, 0 for air or unexplored terrain.
    pub block_id: u8,
    /// Height of the surface block.
    pub height: u8,
    /// Consecutive water blocks above the surface block.
    pub water_depth: u8,
}

impl ColumnSummary {
    pub fn new(block_id: u8, height: u8, water_depth: u8) -> Self {
        ColumnSummary {
            block_id,
            height,
            water_depth,
        }
    }

    pub fn is_submerged(&self) -> bool {
        self.water_depth > 0
    }

    /// The id seen from above: water for submerged columns, the surface block
    /// otherwise.
    pub fn visible_id(&self) -> u8 {
        if self.is_submerged() {
            STILL_WATER
        } else {
            self.block_id
        }
    }
}

/// Row-major grid of column summaries, indexed `x + z * width`.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryGrid {
    width: usize,
    height: usize,
    cells: Vec<ColumnSummary>,
}

impl SummaryGrid {
    /// A grid of unexplored columns.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let len = width.checked_mul(height).ok_or_else(|| MapError::InvalidDimensions {
            expected: "a grid that fits in memory".to_string(),
            actual: format!("{}x{}", width, height),
        })?;
        Ok(SummaryGrid {
            width,
            height,
            cells: vec![ColumnSummary::default(); len],
        })
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<ColumnSummary>) -> Result<Self> {
        if width.checked_mul(height) != Some(cells.len()) {
            return Err(MapError::InvalidDimensions {
                expected: format!("{}x{} = {} cells", width, height, width.saturating_mul(height)),
                actual: format!("{} cells", cells.len()),
            });
        }
        Ok(SummaryGrid {
            width,
            height,
            cells,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[ColumnSummary] {
        &self.cells
    }

    pub fn get(&self, x: usize, z: usize) -> ColumnSummary {
        self.cells[x + z * self.width]
    }

    pub fn set(&mut self, x: usize, z: usize, summary: ColumnSummary) {
        self.cells[x + z * self.width] = summary;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_new_grid_is_unexplored() {
        let grid = SummaryGrid::new(3, 2).unwrap();
        assert_eq!(grid.cells().len(), 6);
        assert!(grid.cells().iter().all(|c| *c == ColumnSummary::default()));
    }

    #[test]
    fn test_set_get_row_major() {
        let mut grid = SummaryGrid::new(4, 4).unwrap();
        grid.set(3, 1, ColumnSummary::new(1, 64, 0));
        assert_eq!(grid.cells()[3 + 4].block_id, 1);
        assert_eq!(grid.get(3, 1).height, 64);
    }

    #[test]
    fn test_from_cells_checks_length() {
        assert_matches!(
            SummaryGrid::from_cells(2, 2, vec![ColumnSummary::default(); 3]),
            Err(MapError::InvalidDimensions { .. })
        );
    }

    #[test]
    fn test_submerged_columns_look_like_water() {
        assert_eq!(ColumnSummary::new(12, 50, 3).visible_id(), STILL_WATER);
        assert_eq!(ColumnSummary::new(12, 50, 0).visible_id(), 12);
    }
}
