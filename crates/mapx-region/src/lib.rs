pub mod chunk;
pub mod region;
pub mod summary;

use std::path::Path;

use log::{debug, warn};
use mapx_common::{MapError, Result};

pub use chunk::{read_sections, scan_column, summarize_chunk, ChunkSection};
pub use region::{region_path, ChunkLocation, RegionFile, RegionWriter};
pub use summary::{ColumnSummary, SummaryGrid};

use chunk::CHUNK_WIDTH;
use region::REGION_WIDTH;

/// Summarizes the block columns of the rectangle starting at world column
/// (`x`, `z`) and extending `width` by `height` columns.
///
/// Missing region files and chunks leave their columns unexplored. A chunk
/// or region that fails to read is logged and skipped, so the result is
/// always a complete grid.
pub fn read_area<P: AsRef<Path>>(region_dir: P, x: i32, z: i32, width: usize, height: usize) -> Result<SummaryGrid> {
    let mut grid = SummaryGrid::new(width, height)?;
    if width == 0 || height == 0 {
        return Ok(grid);
    }

    let last_x = last_column(x, width)?;
    let last_z = last_column(z, height)?;

    for region_z in (z >> 9)..=(last_z >> 9) {
        for region_x in (x >> 9)..=(last_x >> 9) {
            let path = region_path(&region_dir, region_x, region_z);
            if !path.exists() {
                debug!("No region file at {}", path.display());
                continue;
            }

            let mut region = match RegionFile::open(&path) {
                Ok(region) => region,
                Err(err) => {
                    warn!("Skipping region {}: {}", path.display(), err);
                    continue;
                }
            };

            for local_z in 0..REGION_WIDTH {
                for local_x in 0..REGION_WIDTH {
                    let chunk_x = region_x * REGION_WIDTH as i32 + local_x as i32;
                    let chunk_z = region_z * REGION_WIDTH as i32 + local_z as i32;
                    if chunk_x < x >> 4 || chunk_x > last_x >> 4 || chunk_z < z >> 4 || chunk_z > last_z >> 4 {
                        continue;
                    }

                    let sections = match region
                        .read_chunk(local_x, local_z)
                        .and_then(|payload| payload.map(|p| read_sections(&p)).transpose())
                    {
                        Ok(Some(sections)) => sections,
                        Ok(None) => continue,
                        Err(err) => {
                            warn!("Skipping chunk ({}, {}) in {}: {}", chunk_x, chunk_z, path.display(), err);
                            continue;
                        }
                    };

                    copy_chunk(&mut grid, &summarize_chunk(&sections), chunk_x, chunk_z, x, z);
                }
            }
        }
    }

    Ok(grid)
}

fn last_column(start: i32, extent: usize) -> Result<i32> {
    i32::try_from(extent - 1)
        .ok()
        .and_then(|offset| start.checked_add(offset))
        .ok_or_else(|| MapError::InvalidDimensions {
            expected: "an area inside the world coordinate range".to_string(),
            actual: format!("{} columns from {}", extent, start),
        })
}

/// Copies the chunk's columns that fall inside the grid.
fn copy_chunk(grid: &mut SummaryGrid, columns: &[ColumnSummary], chunk_x: i32, chunk_z: i32, x: i32, z: i32) {
    for local_z in 0..CHUNK_WIDTH {
        let grid_z = (chunk_z as i64 * 16 + local_z as i64) - z as i64;
        if grid_z < 0 || grid_z >= grid.height() as i64 {
            continue;
        }
        for local_x in 0..CHUNK_WIDTH {
            let grid_x = (chunk_x as i64 * 16 + local_x as i64) - x as i64;
            if grid_x < 0 || grid_x >= grid.width() as i64 {
                continue;
            }
            grid.set(grid_x as usize, grid_z as usize, columns[local_x + local_z * CHUNK_WIDTH]);
        }
    }
}
