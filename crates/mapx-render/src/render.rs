//! Downsamples a column summary grid into a shaded 128x128 map.

use log::debug;
use mapx_common::{MapColors, MapError, Result, MAP_LEN, MAP_SIZE};
use mapx_region::SummaryGrid;

use crate::category::BlockCategory;
use crate::palette::Palette;

/// Index drawn for cells with no recognizable terrain. It is the fourth shade
/// slot of stone, which the renderer never emits for real blocks.
pub const UNKNOWN_TERRAIN_INDEX: u8 = 47;

/// Largest zoom level a map item can carry.
pub const MAX_SCALE: u8 = 4;

// Height shading.
pub const LIGHT_THRESHOLD: f64 = 0.6;
pub const DARK_THRESHOLD: f64 = -0.6;
pub const CHECKER_WEIGHT: f64 = 0.4;

// Water shading.
pub const WATER_DEPTH_WEIGHT: f64 = 0.1;
pub const WATER_CHECKER_WEIGHT: f64 = 0.2;
pub const WATER_LIGHT_BELOW: f64 = 0.5;
pub const WATER_DARK_ABOVE: f64 = 0.9;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shade {
    Dark = 0,
    Normal = 1,
    Light = 2,
}

impl Shade {
    fn from_slope(height: f64, previous: f64, scale: u8, checker: u8) -> Shade {
        let d = (height - previous) * 4.0 / (scale as f64 + 4.0) + (checker as f64 - 0.5) * CHECKER_WEIGHT;
        if d > LIGHT_THRESHOLD {
            Shade::Light
        } else if d < DARK_THRESHOLD {
            Shade::Dark
        } else {
            Shade::Normal
        }
    }

    fn from_water_depth(depth: f64, checker: u8) -> Shade {
        let d = depth * WATER_DEPTH_WEIGHT + checker as f64 * WATER_CHECKER_WEIGHT;
        if d < WATER_LIGHT_BELOW {
            Shade::Light
        } else if d > WATER_DARK_ABOVE {
            Shade::Dark
        } else {
            Shade::Normal
        }
    }
}

/// Aggregate of the source columns behind one map cell.
struct Cell {
    height: f64,
    water_depth: f64,
    block_id: u8,
}

/// Renders a `(128 << scale)` square grid into map colour indices, stored
/// `x + z * 128`.
pub fn render(grid: &SummaryGrid, scale: u8, palette: &Palette) -> Result<MapColors> {
    if scale > MAX_SCALE {
        return Err(MapError::InvalidDimensions {
            expected: format!("scale at most {}", MAX_SCALE),
            actual: format!("scale {}", scale),
        });
    }
    let side = MAP_SIZE << scale;
    if grid.width() != side || grid.height() != side {
        return Err(MapError::InvalidDimensions {
            expected: format!("{}x{} columns", side, side),
            actual: format!("{}x{} columns", grid.width(), grid.height()),
        });
    }

    let mut colors = [0u8; MAP_LEN];
    for x in 0..MAP_SIZE {
        let mut previous_height = None;
        for z in 0..MAP_SIZE {
            let cell = aggregate(grid, scale, x, z);
            let checker = ((x + z) & 1) as u8;
            let category = BlockCategory::of(cell.block_id);

            let index = if category == BlockCategory::Unknown {
                UNKNOWN_TERRAIN_INDEX
            } else {
                let shade = if category.is_water() {
                    Shade::from_water_depth(cell.water_depth, checker)
                } else {
                    Shade::from_slope(cell.height, previous_height.unwrap_or(cell.height), scale, checker)
                };
                (category.base_color() * 4 + shade as usize) as u8
            };
            if index as usize >= palette.len() {
                return Err(MapError::MissingPaletteEntry(index as usize));
            }

            colors[x + z * MAP_SIZE] = index;
            previous_height = Some(cell.height);
        }
    }

    debug!("Rendered {0}x{0} columns at scale {1}", side, scale);
    Ok(colors)
}

fn aggregate(grid: &SummaryGrid, scale: u8, x: usize, z: usize) -> Cell {
    let block = 1usize << scale;
    let mut votes = [0u32; 256];
    let mut height_sum = 0u64;
    let mut depth_sum = 0u64;

    for dz in 0..block {
        for dx in 0..block {
            let column = grid.get(x * block + dx, z * block + dz);
            votes[column.visible_id() as usize] += 1;
            height_sum += column.height as u64 + 1;
            depth_sum += column.water_depth as u64;
        }
    }

    let count = (block * block) as f64;
    Cell {
        height: height_sum as f64 / count,
        water_depth: depth_sum as f64 / count,
        block_id: majority(&votes),
    }
}

/// Most frequent id; equal counts go to the lowest id.
fn majority(votes: &[u32; 256]) -> u8 {
    let mut best = 0;
    for id in 1..votes.len() {
        if votes[id] > votes[best] {
            best = id;
        }
    }
    best as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mapx_region::ColumnSummary;

    fn flat(scale: u8, summary: ColumnSummary) -> SummaryGrid {
        let side = MAP_SIZE << scale;
        SummaryGrid::from_cells(side, side, vec![summary; side * side]).unwrap()
    }

    #[test]
    fn test_flat_stone_is_normal_shade() {
        let colors = render(&flat(0, ColumnSummary::new(1, 64, 0)), 0, &Palette::classic()).unwrap();
        // zero slope with the checker term stays within +-0.2
        assert!(colors.iter().all(|&c| c == 11 * 4 + Shade::Normal as u8));
    }

    #[test]
    fn test_empty_grid_uses_unknown_index() {
        let colors = render(&flat(0, ColumnSummary::default()), 0, &Palette::classic()).unwrap();
        assert!(colors.iter().all(|&c| c == UNKNOWN_TERRAIN_INDEX));
    }

    #[test]
    fn test_unknown_terrain_differs_from_stone() {
        let mut grid = flat(0, ColumnSummary::new(1, 64, 0));
        for z in 0..MAP_SIZE {
            grid.set(0, z, ColumnSummary::default());
        }
        let colors = render(&grid, 0, &Palette::classic()).unwrap();
        for z in 0..MAP_SIZE {
            assert_eq!(colors[z * MAP_SIZE], UNKNOWN_TERRAIN_INDEX);
            assert_ne!(colors[1 + z * MAP_SIZE], UNKNOWN_TERRAIN_INDEX);
        }
    }

    #[test]
    fn test_slopes_shade_light_and_dark() {
        let side = MAP_SIZE;
        let mut grid = flat(0, ColumnSummary::new(2, 60, 0));
        // a step up at z = 10 and back down at z = 11, on column x = 3
        grid.set(3, 10, ColumnSummary::new(2, 70, 0));
        let colors = render(&grid, 0, &Palette::classic()).unwrap();
        assert_eq!(colors[3 + 10 * side], 4 + Shade::Light as u8);
        assert_eq!(colors[3 + 11 * side], 4 + Shade::Dark as u8);
        assert_eq!(colors[3 + 12 * side], 4 + Shade::Normal as u8);
    }

    #[test]
    fn test_water_depth_shading() {
        let shallow = render(&flat(0, ColumnSummary::new(12, 50, 1)), 0, &Palette::classic()).unwrap();
        // depth 0.1 plus checker 0 or 0.2 is always below 0.5
        assert!(shallow.iter().all(|&c| c == 12 * 4 + Shade::Light as u8));

        let deep = render(&flat(0, ColumnSummary::new(12, 40, 20)), 0, &Palette::classic()).unwrap();
        assert!(deep.iter().all(|&c| c == 12 * 4 + Shade::Dark as u8));

        let medium = render(&flat(0, ColumnSummary::new(12, 40, 6)), 0, &Palette::classic()).unwrap();
        assert_eq!(medium[0], 12 * 4 + Shade::Normal as u8);
        assert_eq!(medium[1], 12 * 4 + Shade::Normal as u8);
    }

    #[test]
    fn test_majority_vote_three_of_four() {
        let mut grid = flat(1, ColumnSummary::new(1, 64, 0));
        grid.set(0, 0, ColumnSummary::new(2, 64, 0));
        let colors = render(&grid, 1, &Palette::classic()).unwrap();
        assert_eq!(colors[0], 11 * 4 + Shade::Normal as u8);
    }

    #[test]
    fn test_majority_tie_goes_to_lowest_id() {
        let mut votes = [0u32; 256];
        votes[17] = 2;
        votes[3] = 2;
        votes[200] = 1;
        assert_eq!(majority(&votes), 3);

        let mut grid = flat(1, ColumnSummary::new(17, 64, 0));
        grid.set(0, 0, ColumnSummary::new(3, 64, 0));
        grid.set(1, 0, ColumnSummary::new(3, 64, 0));
        let colors = render(&grid, 1, &Palette::classic()).unwrap();
        assert_eq!(colors[0], 10 * 4 + Shade::Normal as u8);
    }

    #[test]
    fn test_wrong_grid_size() {
        let grid = flat(0, ColumnSummary::default());
        assert_matches!(
            render(&grid, 1, &Palette::classic()),
            Err(MapError::InvalidDimensions { .. })
        );
        assert_matches!(
            render(&grid, 5, &Palette::classic()),
            Err(MapError::InvalidDimensions { .. })
        );
    }

    #[test]
    fn test_short_palette_is_missing_entry() {
        let palette = Palette::new(Palette::classic().colors()[..40].to_vec()).unwrap();
        assert_matches!(
            render(&flat(0, ColumnSummary::new(1, 64, 0)), 0, &palette),
            Err(MapError::MissingPaletteEntry(45))
        );
    }
}
