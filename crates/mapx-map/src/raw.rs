//! Bare colour planes: the compressed 16,384 bytes with no tag wrapper.

use std::fs;
use std::path::Path;

use log::debug;
use mapx_common::{MapColors, MapError, Result, MAP_LEN};
use mapx_nbt::compression::{compress, decompress, Framing, BEST_COMPRESSION};

pub fn save_raw<P: AsRef<Path>>(path: P, colors: &MapColors) -> Result<()> {
    let packed = compress(colors, BEST_COMPRESSION)?;
    fs::write(&path, &packed)?;
    debug!("Saved raw map to {}", path.as_ref().display());
    Ok(())
}

pub fn load_raw<P: AsRef<Path>>(path: P, colors: &mut MapColors) -> Result<()> {
    let packed = fs::read(path)?;
    let raw = decompress(&packed[..], Framing::detect(&packed))?;
    if raw.len() != MAP_LEN {
        return Err(MapError::malformed(
            raw.len().min(MAP_LEN),
            format!("raw map holds {} bytes, expected {}", raw.len(), MAP_LEN),
        ));
    }
    colors.copy_from_slice(&raw);
    Ok(())
}
