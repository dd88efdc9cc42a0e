//! The map item file: a gzip-framed tag tree around one colour plane.

use std::fs;
use std::path::Path;

use log::debug;
use mapx_common::{Dimension, MapColors, MapError, Result, MAP_LEN, MAP_SIZE};
use mapx_nbt::compression::{compress_framed, decompress, Framing, BEST_COMPRESSION};
use mapx_nbt::{write_tag, NbtReader, Tag, TagKind};
use serde::{Deserialize, Serialize};

/// Uncompressed size of a map item written by `save`.
pub const MAP_ITEM_LEN: usize = 16_480;

/// Zoom level used when nothing else is known.
pub const DEFAULT_SCALE: i8 = 3;

/// The scalar fields stored next to the colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapMeta {
    pub scale: i8,
    pub dimension: Dimension,
    pub height: i16,
    pub width: i16,
    pub x_center: i32,
    pub z_center: i32,
}

impl Default for MapMeta {
    fn default() -> Self {
        MapMeta {
            scale: DEFAULT_SCALE,
            dimension: Dimension::Overworld,
            height: MAP_SIZE as i16,
            width: MAP_SIZE as i16,
            x_center: 0,
            z_center: 0,
        }
    }
}

impl MapMeta {
    fn to_tag(self, colors: &MapColors) -> Tag {
        Tag::Compound(vec![(
            "data".to_string(),
            Tag::Compound(vec![
                ("scale".to_string(), Tag::Byte(self.scale)),
                ("dimension".to_string(), Tag::Byte(self.dimension as i8)),
                ("height".to_string(), Tag::Short(self.height)),
                ("width".to_string(), Tag::Short(self.width)),
                ("xCenter".to_string(), Tag::Int(self.x_center)),
                ("zCenter".to_string(), Tag::Int(self.z_center)),
                ("colors".to_string(), Tag::ByteArray(colors.to_vec())),
            ]),
        )])
    }
}

/// Serializes a map item into its fixed-size uncompressed form.
pub fn to_bytes(meta: &MapMeta, colors: &MapColors) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; MAP_ITEM_LEN];
    let end = write_tag(&mut buffer, "", &meta.to_tag(colors), 0)?;
    if end != MAP_ITEM_LEN {
        return Err(MapError::malformed(
            end,
            format!("map item ended at {} instead of {}", end, MAP_ITEM_LEN),
        ));
    }
    Ok(buffer)
}

/// Parses an uncompressed map item, copying its colours into `colors`.
///
/// Only the root compound and its "data" compound are walked; unrecognized
/// fields are skipped in place.
pub fn from_bytes(bytes: &[u8], colors: &mut MapColors) -> Result<MapMeta> {
    let mut reader = NbtReader::new(bytes);
    let (kind, _) = reader.read_tag_header()?;
    if kind != TagKind::Compound {
        return Err(MapError::malformed(0, format!("map root is {}, not a compound", kind)));
    }

    let mut found = None;
    loop {
        let (kind, name) = reader.read_tag_header()?;
        match kind {
            TagKind::End => break,
            TagKind::Compound if name == "data" && found.is_none() => {
                found = Some(read_data(&mut reader, colors)?);
            }
            other => reader.skip_value(other)?,
        }
    }

    found.ok_or_else(|| MapError::malformed(reader.position(), "no \"data\" compound in map item"))
}

fn read_data(reader: &mut NbtReader, colors: &mut MapColors) -> Result<MapMeta> {
    let mut meta = MapMeta::default();
    let mut have_colors = false;

    loop {
        let offset = reader.position();
        let (kind, name) = reader.read_tag_header()?;
        match (kind, name.as_ref()) {
            (TagKind::End, _) => break,
            (TagKind::ByteArray, "colors") => {
                let data = reader.read_byte_array()?;
                if data.len() != MAP_LEN {
                    return Err(MapError::malformed(
                        offset,
                        format!("colors holds {} bytes, expected {}", data.len(), MAP_LEN),
                    ));
                }
                colors.copy_from_slice(data);
                have_colors = true;
            }
            (TagKind::Byte, "scale") => meta.scale = reader.read_i8()?,
            (TagKind::Byte, "dimension") => {
                let id = reader.read_i8()?;
                meta.dimension = Dimension::from_i8(id)
                    .ok_or_else(|| MapError::malformed(offset, format!("unknown dimension {}", id)))?;
            }
            (TagKind::Short, "height") => meta.height = reader.read_i16()?,
            (TagKind::Short, "width") => meta.width = reader.read_i16()?,
            (TagKind::Int, "xCenter") => meta.x_center = reader.read_i32()?,
            (TagKind::Int, "zCenter") => meta.z_center = reader.read_i32()?,
            (other, _) => reader.skip_value(other)?,
        }
    }

    if !have_colors {
        return Err(MapError::malformed(reader.position(), "map item has no colors"));
    }
    Ok(meta)
}

/// Writes a gzip-framed map item.
pub fn save<P: AsRef<Path>>(path: P, meta: &MapMeta, colors: &MapColors) -> Result<()> {
    save_framed(path, meta, colors, Framing::Gzip, BEST_COMPRESSION)
}

pub fn save_framed<P: AsRef<Path>>(
    path: P,
    meta: &MapMeta,
    colors: &MapColors,
    framing: Framing,
    level: u32,
) -> Result<()> {
    let packed = compress_framed(&to_bytes(meta, colors)?, level, framing)?;
    fs::write(&path, &packed)?;
    debug!("Saved map item to {} ({} bytes)", path.as_ref().display(), packed.len());
    Ok(())
}

/// Reads a map item in either framing and returns its metadata.
pub fn load<P: AsRef<Path>>(path: P, colors: &mut MapColors) -> Result<MapMeta> {
    let packed = fs::read(&path)?;
    let bytes = decompress(&packed[..], Framing::detect(&packed))?;
    let meta = from_bytes(&bytes, colors)?;
    debug!("Loaded map item from {}: {:?}", path.as_ref().display(), meta);
    Ok(meta)
}
