//! Block sections of a single chunk and the top-down surface scan.

use mapx_common::{MapError, Result};
use mapx_nbt::{NbtReader, TagKind};

use crate::summary::ColumnSummary;

pub const AIR: u8 = 0;
pub const FLOWING_WATER: u8 = 8;
pub const STILL_WATER: u8 = 9;

/// Blocks in one 16x16x16 section.
pub const SECTION_VOLUME: usize = 4096;
/// Sections stacked in a chunk.
pub const SECTIONS_PER_CHUNK: i8 = 16;
pub const CHUNK_WIDTH: usize = 16;

const SECTIONS_TAG: &str = "Sections";
// Root -> Level -> Sections in every known layout.
const SEARCH_DEPTH: usize = 4;

pub fn is_water(id: u8) -> bool {
    id == FLOWING_WATER || id == STILL_WATER
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSection {
    pub y: i8,
    /// Block ids in YZX order.
    pub blocks: Vec<u8>,
}

impl ChunkSection {
    pub fn new(y: i8, blocks: Vec<u8>) -> Result<Self> {
        if blocks.len() != SECTION_VOLUME {
            return Err(MapError::InvalidDimensions {
                expected: format!("{} blocks", SECTION_VOLUME),
                actual: format!("{} blocks", blocks.len()),
            });
        }
        Ok(ChunkSection { y, blocks })
    }

    pub fn block(&self, x: usize, y: usize, z: usize) -> u8 {
        self.blocks[y * 256 + z * 16 + x]
    }
}

/// Extracts the block sections from an uncompressed chunk tag, ordered from
/// the highest section down.
///
/// Only the "Sections" list is materialized; everything else is skipped in
/// place. Sections outside 0..16 or without a full block array are ignored.
pub fn read_sections(buf: &[u8]) -> Result<Vec<ChunkSection>> {
    let mut reader = NbtReader::new(buf);
    let (kind, _) = reader.read_tag_header()?;
    if kind != TagKind::Compound {
        return Err(MapError::malformed(0, format!("chunk root is {}, not a compound", kind)));
    }

    let mut sections = Vec::new();
    find_sections(&mut reader, 0, &mut sections)?;
    sections.sort_by(|a, b| b.y.cmp(&a.y));
    Ok(sections)
}

fn find_sections(reader: &mut NbtReader, depth: usize, out: &mut Vec<ChunkSection>) -> Result<()> {
    loop {
        let (kind, name) = reader.read_tag_header()?;
        match kind {
            TagKind::End => return Ok(()),
            TagKind::List if name == SECTIONS_TAG => read_section_list(reader, out)?,
            TagKind::Compound if depth < SEARCH_DEPTH => find_sections(reader, depth + 1, out)?,
            other => reader.skip_value(other)?,
        }
    }
}

fn read_section_list(reader: &mut NbtReader, out: &mut Vec<ChunkSection>) -> Result<()> {
    let offset = reader.position();
    let (element, count) = reader.read_list_header()?;
    if count == 0 {
        return Ok(());
    }
    if element != TagKind::Compound {
        return Err(MapError::malformed(
            offset,
            format!("{} holds {} instead of compounds", SECTIONS_TAG, element),
        ));
    }

    for _ in 0..count {
        if let Some(section) = read_section(reader)? {
            out.push(section);
        }
    }
    Ok(())
}

fn read_section(reader: &mut NbtReader) -> Result<Option<ChunkSection>> {
    let mut y = None;
    let mut blocks = None;

    loop {
        let offset = reader.position();
        let (kind, name) = reader.read_tag_header()?;
        match (kind, name.as_ref()) {
            (TagKind::End, _) => break,
            (TagKind::Byte, "Y") => y = Some(reader.read_i8()?),
            (TagKind::ByteArray, "Blocks") => {
                let array = reader.read_byte_array()?;
                if array.len() != SECTION_VOLUME {
                    return Err(MapError::malformed(
                        offset,
                        format!("section holds {} blocks, expected {}", array.len(), SECTION_VOLUME),
                    ));
                }
                blocks = Some(array);
            }
            (other, _) => reader.skip_value(other)?,
        }
    }

    match (y, blocks) {
        (Some(y), Some(blocks)) if (0..SECTIONS_PER_CHUNK).contains(&y) => Ok(Some(ChunkSection {
            y,
            blocks: blocks.to_vec(),
        })),
        _ => Ok(None),
    }
}

/// Scans one column from the top of the highest section downwards.
///
/// The first solid block is the surface. Water on the way down is counted
/// into the depth while it is contiguous; a column that is water all the way
/// down reports the lowest water block as its surface.
pub fn scan_column(sections: &[ChunkSection], x: usize, z: usize) -> ColumnSummary {
    let mut depth: u8 = 0;
    let mut depth_closed = false;
    let mut lowest_water: Option<(u8, u8)> = None;
    let mut previous_y: Option<i8> = None;

    for section in sections {
        // a missing section between two present ones is all air
        if previous_y.map_or(false, |above| i32::from(above) - i32::from(section.y) > 1) {
            depth_closed |= lowest_water.is_some();
        }
        previous_y = Some(section.y);
        for local_y in (0..CHUNK_WIDTH).rev() {
            let id = section.block(x, local_y, z);
            let height = (i32::from(section.y) * 16 + local_y as i32).clamp(0, 255) as u8;
            if id == AIR {
                depth_closed |= lowest_water.is_some();
            } else if is_water(id) {
                lowest_water = Some((id, height));
                if !depth_closed {
                    depth = depth.saturating_add(1);
                }
            } else {
                return ColumnSummary::new(id, height, depth);
            }
        }
    }

    match lowest_water {
        Some((id, height)) => ColumnSummary::new(id, height, depth),
        None => ColumnSummary::default(),
    }
}

/// Summaries of all 256 columns, indexed `x + z * 16`.
pub fn summarize_chunk(sections: &[ChunkSection]) -> Vec<ColumnSummary> {
    let mut columns = Vec::with_capacity(CHUNK_WIDTH * CHUNK_WIDTH);
    for z in 0..CHUNK_WIDTH {
        for x in 0..CHUNK_WIDTH {
            columns.push(scan_column(sections, x, z));
        }
    }
    columns
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mapx_nbt::{NbtFile, Tag};

    pub(crate) fn section(y: i8, fill: impl Fn(usize, usize, usize) -> u8) -> ChunkSection {
        let mut blocks = vec![0u8; SECTION_VOLUME];
        for ly in 0..16 {
            for z in 0..16 {
                for x in 0..16 {
                    blocks[ly * 256 + z * 16 + x] = fill(x, ly, z);
                }
            }
        }
        ChunkSection::new(y, blocks).unwrap()
    }

    pub(crate) fn chunk_tag(sections: &[ChunkSection]) -> NbtFile {
        let list = sections
            .iter()
            .map(|s| {
                Tag::Compound(vec![
                    ("Y".to_string(), Tag::Byte(s.y)),
                    ("Blocks".to_string(), Tag::ByteArray(s.blocks.clone())),
                    ("Data".to_string(), Tag::ByteArray(vec![0; 2048])),
                ])
            })
            .collect();
        NbtFile::new(
            "",
            Tag::Compound(vec![(
                "Level".to_string(),
                Tag::Compound(vec![
                    ("xPos".to_string(), Tag::Int(0)),
                    ("LastUpdate".to_string(), Tag::Long(7)),
                    ("HeightMap".to_string(), Tag::IntArray(vec![0; 256])),
                    ("Sections".to_string(), Tag::List(TagKind::Compound, list)),
                    ("Entities".to_string(), Tag::List(TagKind::End, vec![])),
                ]),
            )]),
        )
    }

    #[test]
    fn test_read_sections_skips_unrelated_fields_and_sorts() {
        let low = section(0, |_, y, _| if y < 4 { 1 } else { 0 });
        let high = section(3, |_, _, _| 0);
        let bytes = chunk_tag(&[low.clone(), high.clone()]).to_bytes().unwrap();

        let sections = read_sections(&bytes).unwrap();
        assert_eq!(sections, vec![high, low]);
    }

    #[test]
    fn test_sections_out_of_range_are_ignored() {
        let bytes = chunk_tag(&[section(16, |_, _, _| 1), section(-1, |_, _, _| 1)])
            .to_bytes()
            .unwrap();
        assert!(read_sections(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_short_block_array_is_malformed() {
        let file = NbtFile::new(
            "",
            Tag::Compound(vec![(
                "Sections".to_string(),
                Tag::List(
                    TagKind::Compound,
                    vec![Tag::Compound(vec![
                        ("Y".to_string(), Tag::Byte(0)),
                        ("Blocks".to_string(), Tag::ByteArray(vec![1; 100])),
                    ])],
                ),
            )]),
        );
        assert_matches!(
            read_sections(&file.to_bytes().unwrap()),
            Err(MapError::MalformedData { .. })
        );
    }

    #[test]
    fn test_truncated_chunk_is_malformed() {
        let bytes = chunk_tag(&[section(0, |_, _, _| 1)]).to_bytes().unwrap();
        assert_matches!(
            read_sections(&bytes[..bytes.len() / 2]),
            Err(MapError::MalformedData { .. })
        );
    }

    #[test]
    fn test_non_compound_root_is_malformed() {
        let bytes = NbtFile::new("", Tag::Int(3)).to_bytes().unwrap();
        assert_matches!(read_sections(&bytes), Err(MapError::MalformedData { offset: 0, .. }));
    }

    #[test]
    fn test_surface_is_first_solid_block() {
        let sections = vec![section(1, |_, _, _| 0), section(0, |_, y, _| if y <= 5 { 2 } else { 0 })];
        assert_eq!(scan_column(&sections, 3, 7), ColumnSummary::new(2, 5, 0));
    }

    #[test]
    fn test_water_depth_above_floor() {
        // stone up to y=3, water from 4 to 6, air above
        let sections = vec![section(0, |_, y, _| match y {
            0..=3 => 1,
            4..=6 => STILL_WATER,
            _ => AIR,
        })];
        let summary = scan_column(&sections, 0, 0);
        assert_eq!(summary, ColumnSummary::new(1, 3, 3));
        assert!(summary.is_submerged());
    }

    #[test]
    fn test_all_water_column_keeps_lowest_water() {
        let sections = vec![section(0, |_, _, _| FLOWING_WATER)];
        assert_eq!(scan_column(&sections, 0, 0), ColumnSummary::new(FLOWING_WATER, 0, 16));
    }

    #[test]
    fn test_missing_section_ends_water_run() {
        // water at the bottom of section 3, sections 2 and 1 absent, then water over stone in section 0
        let upper = section(3, |_, y, _| if y <= 1 { STILL_WATER } else { AIR });
        let lower = section(0, |_, y, _| match y {
            14..=15 => STILL_WATER,
            13 => 1,
            _ => AIR,
        });
        assert_eq!(scan_column(&[upper, lower], 0, 0), ColumnSummary::new(1, 13, 2));
    }

    #[test]
    fn test_empty_column_is_default() {
        assert_eq!(scan_column(&[], 0, 0), ColumnSummary::default());
        assert_eq!(scan_column(&[section(2, |_, _, _| 0)], 0, 0), ColumnSummary::default());
    }

    #[test]
    fn test_summarize_chunk_layout() {
        let sections = vec![section(0, |x, y, z| if y == 0 { (x + z * 16) as u8 } else { 0 })];
        let columns = summarize_chunk(&sections);
        assert_eq!(columns.len(), 256);
        assert_eq!(columns[5 + 2 * 16].block_id, (5 + 32) as u8);
    }
}
