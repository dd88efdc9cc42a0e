use once_cell::sync::Lazy;

/// Terrain classes a block id can be drawn as. The discriminant is the base
/// colour of the class in the classic palette.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BlockCategory {
    #[default]
    Unknown = 0,
    Grass = 1,
    Sand = 2,
    Cloth = 3,
    Fire = 4,
    Ice = 5,
    Iron = 6,
    Foliage = 7,
    Snow = 8,
    Clay = 9,
    Dirt = 10,
    Stone = 11,
    Water = 12,
    Wood = 13,
}

const GROUPS: [(BlockCategory, &[u8]); 13] = [
    (BlockCategory::Grass, &[2, 110]),
    (BlockCategory::Sand, &[12, 13, 88]),
    (BlockCategory::Cloth, &[19, 26, 30, 35]),
    (BlockCategory::Fire, &[10, 11, 46]),
    (BlockCategory::Ice, &[79]),
    (BlockCategory::Iron, &[41, 42, 57, 71, 101, 117, 118]),
    (
        BlockCategory::Foliage,
        &[6, 18, 31, 32, 37, 38, 39, 40, 59, 81, 83, 86, 91, 103, 104, 105, 106, 111, 115, 122],
    ),
    (BlockCategory::Snow, &[78, 80]),
    (BlockCategory::Clay, &[82, 97]),
    (BlockCategory::Dirt, &[3, 60]),
    (
        BlockCategory::Stone,
        &[
            1, 4, 7, 14, 15, 16, 21, 22, 23, 24, 29, 33, 34, 36, 43, 44, 45, 48, 49, 52, 56, 61, 67, 70, 73, 87,
            113, 114, 116, 121,
        ],
    ),
    (BlockCategory::Water, &[8, 9]),
    (
        BlockCategory::Wood,
        &[5, 17, 25, 47, 53, 54, 58, 63, 64, 68, 72, 84, 85, 95, 96, 99, 100, 107],
    ),
];

static CATEGORIES: Lazy<[BlockCategory; 256]> = Lazy::new(|| {
    let mut table = [BlockCategory::Unknown; 256];
    for (category, ids) in GROUPS {
        for &id in ids {
            table[id as usize] = category;
        }
    }
    table
});

impl BlockCategory {
    pub fn of(block_id: u8) -> BlockCategory {
        CATEGORIES[block_id as usize]
    }

    pub fn base_color(self) -> usize {
        self as usize
    }

    pub fn is_water(self) -> bool {
        self == BlockCategory::Water
    }
}
