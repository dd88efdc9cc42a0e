pub mod item;
pub mod raw;

pub use item::{from_bytes, load, save, save_framed, to_bytes, MapMeta, MAP_ITEM_LEN};
pub use raw::{load_raw, save_raw};
