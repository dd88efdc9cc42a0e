pub mod category;
pub mod palette;
pub mod quantize;
pub mod render;

pub use category::BlockCategory;
pub use palette::Palette;
pub use quantize::{diffusion_targets, Metric, PixelView, Quantizer};
pub use render::{render, Shade, UNKNOWN_TERRAIN_INDEX};
