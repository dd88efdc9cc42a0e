use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, crate::error::MapError>;

/// Side length of a map item in pixels.
pub const MAP_SIZE: usize = 128;

/// Number of cells in a map item color plane.
pub const MAP_LEN: usize = MAP_SIZE * MAP_SIZE;

/// Palette-indexed 128x128 map, row-major (`x + z * 128`).
pub type MapColors = [u8; MAP_LEN];

/// Indices below this value are "no data" markers and never carry a color.
pub const FIRST_COLOR_INDEX: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[u8; 3]> for Rgb {
    fn from(c: [u8; 3]) -> Self {
        Rgb::new(c[0], c[1], c[2])
    }
}

/// Game dimension a map was drawn in.
#[repr(i8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Nether = -1,
    #[default]
    Overworld = 0,
    End = 1,
}

impl Dimension {
    pub fn from_i8(id: i8) -> Option<Self> {
        match id {
            -1 => Some(Dimension::Nether),
            0 => Some(Dimension::Overworld),
            1 => Some(Dimension::End),
            _ => None,
        }
    }
}
