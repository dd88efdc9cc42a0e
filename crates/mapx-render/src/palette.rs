use std::fs;
use std::path::Path;

use log::debug;
use mapx_common::{MapError, Result, Rgb, FIRST_COLOR_INDEX};
use mapx_nbt::compression::{compress_framed, decompress, Framing, BEST_COMPRESSION};

/// Most entries a byte index can address.
pub const MAX_ENTRIES: usize = 256;

/// Base colours of the classic map palette, one per terrain class.
pub const CLASSIC_BASE_COLORS: [Rgb; 14] = [
    Rgb::new(0, 0, 0),
    Rgb::new(127, 178, 56),
    Rgb::new(247, 233, 163),
    Rgb::new(199, 199, 199),
    Rgb::new(255, 0, 0),
    Rgb::new(160, 160, 255),
    Rgb::new(167, 167, 167),
    Rgb::new(0, 124, 0),
    Rgb::new(255, 255, 255),
    Rgb::new(164, 168, 184),
    Rgb::new(183, 106, 47),
    Rgb::new(112, 112, 112),
    Rgb::new(64, 64, 255),
    Rgb::new(104, 83, 50),
];

/// Brightness of the four shades of each base colour, out of 255.
pub const SHADE_MULTIPLIERS: [u32; 4] = [180, 220, 255, 135];

/// An ordered, immutable list of colours. Entries 0 to 3 are placeholders for
/// "no data" and never take part in colour matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Palette {
    pub fn new(colors: Vec<Rgb>) -> Result<Self> {
        if colors.len() > MAX_ENTRIES {
            return Err(MapError::InvalidDimensions {
                expected: format!("at most {} palette entries", MAX_ENTRIES),
                actual: format!("{} entries", colors.len()),
            });
        }
        Ok(Palette { colors })
    }

    /// The 56-entry palette the game ships with.
    pub fn classic() -> Self {
        let colors = CLASSIC_BASE_COLORS
            .iter()
            .flat_map(|base| {
                SHADE_MULTIPLIERS.iter().map(move |&m| {
                    let shade = |c: u8| (c as u32 * m / 255) as u8;
                    Rgb::new(shade(base.r), shade(base.g), shade(base.b))
                })
            })
            .collect();
        Palette { colors }
    }

    /// Parses one `R,G,B` entry per line, starting at index 0. Blank lines are
    /// skipped.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut colors = Vec::new();
        let mut offset = 0;
        for line in text.split_inclusive('\n') {
            let entry = line.trim();
            if !entry.is_empty() {
                colors.push(parse_entry(entry).ok_or_else(|| {
                    MapError::malformed(offset, format!("expected R,G,B but found {:?}", entry))
                })?);
            }
            offset += line.len();
        }
        Self::new(colors)
    }

    pub fn load_text<P: AsRef<Path>>(path: P) -> Result<Self> {
        let palette = Self::from_text(&fs::read_to_string(&path)?)?;
        debug!("Loaded {} colours from {}", palette.len(), path.as_ref().display());
        Ok(palette)
    }

    /// Decodes the compressed binary form: consecutive RGB byte triples.
    pub fn from_binary(bytes: &[u8]) -> Result<Self> {
        let raw = decompress(bytes, Framing::detect(bytes))?;
        if raw.len() % 3 != 0 {
            return Err(MapError::malformed(
                raw.len() - raw.len() % 3,
                format!("{} bytes is not a whole number of colours", raw.len()),
            ));
        }
        Self::new(raw.chunks_exact(3).map(|c| Rgb::new(c[0], c[1], c[2])).collect())
    }

    pub fn to_binary(&self) -> Result<Vec<u8>> {
        let raw: Vec<u8> = self.colors.iter().flat_map(|c| c.to_array()).collect();
        compress_framed(&raw, BEST_COMPRESSION, Framing::Gzip)
    }

    pub fn load_binary<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_binary(&fs::read(path)?)
    }

    pub fn save_binary<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path, self.to_binary()?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Whether any entry past the placeholders exists.
    pub fn has_real_entries(&self) -> bool {
        self.colors.len() > FIRST_COLOR_INDEX
    }

    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn get(&self, index: usize) -> Result<Rgb> {
        self.colors.get(index).copied().ok_or(MapError::MissingPaletteEntry(index))
    }
}

fn parse_entry(entry: &str) -> Option<Rgb> {
    let mut parts = entry.split(',').map(|p| p.trim().parse::<u8>());
    let color = Rgb::new(parts.next()?.ok()?, parts.next()?.ok()?, parts.next()?.ok()?);
    match parts.next() {
        None => Some(color),
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_classic_palette_layout() {
        let palette = Palette::classic();
        assert_eq!(palette.len(), 56);
        assert_eq!(palette.get(0).unwrap(), Rgb::new(0, 0, 0));
        // grass, light shade is the base colour itself
        assert_eq!(palette.get(6).unwrap(), Rgb::new(127, 178, 56));
        assert_eq!(palette.get(4).unwrap(), Rgb::new(89, 125, 39));
        assert_eq!(palette.get(45).unwrap(), Rgb::new(96, 96, 96));
    }

    #[test]
    fn test_from_text() {
        let palette = Palette::from_text("0,0,0\n1, 2, 3\r\n\n255,255,255\n").unwrap();
        assert_eq!(
            palette.colors(),
            &[Rgb::new(0, 0, 0), Rgb::new(1, 2, 3), Rgb::new(255, 255, 255)]
        );
    }

    #[test]
    fn test_from_text_reports_line_offset() {
        let err = Palette::from_text("1,2,3\n4,5\n").unwrap_err();
        assert_matches!(err, MapError::MalformedData { offset: 6, .. });
        assert_matches!(
            Palette::from_text("1,2,300\n"),
            Err(MapError::MalformedData { offset: 0, .. })
        );
        assert_matches!(
            Palette::from_text("1,2,3,4\n"),
            Err(MapError::MalformedData { .. })
        );
    }

    #[test]
    fn test_binary_round_trip() {
        let palette = Palette::classic();
        let packed = palette.to_binary().unwrap();
        assert_eq!(Framing::detect(&packed), Framing::Gzip);
        assert_eq!(Palette::from_binary(&packed).unwrap(), palette);
    }

    #[test]
    fn test_binary_with_partial_colour_is_malformed() {
        let packed = compress_framed(&[1, 2, 3, 4], 9, Framing::Gzip).unwrap();
        assert_matches!(Palette::from_binary(&packed), Err(MapError::MalformedData { offset: 3, .. }));
    }

    #[test]
    fn test_too_many_entries() {
        assert_matches!(
            Palette::new(vec![Rgb::default(); 257]),
            Err(MapError::InvalidDimensions { .. })
        );
    }

    #[test]
    fn test_missing_entry() {
        assert_matches!(Palette::classic().get(56), Err(MapError::MissingPaletteEntry(56)));
    }
}
