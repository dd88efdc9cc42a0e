//! Image files in and out of the map pipeline.

use std::path::Path;

use anyhow::Context;
use image::{RgbImage, RgbaImage};
use mapx_common::{MapColors, MapError, FIRST_COLOR_INDEX, MAP_LEN, MAP_SIZE};
use mapx_render::{Palette, PixelView, Quantizer};

/// Grey levels of the backdrop drawn under "no data" cells.
pub const CHECKER_LIGHT: u8 = 0xFF;
pub const CHECKER_DARK: u8 = 0xAA;
/// Side of one backdrop square in pixels.
pub const CHECKER_CELL: u32 = 4;

/// Colours a map plane, drawing a grey checkerboard where there is no data.
pub fn to_image(colors: &MapColors, palette: &Palette) -> mapx_common::Result<RgbImage> {
    let mut image = RgbImage::new(MAP_SIZE as u32, MAP_SIZE as u32);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let index = colors[x as usize + y as usize * MAP_SIZE] as usize;
        *pixel = if index < FIRST_COLOR_INDEX {
            let grey = checker(x, y);
            image::Rgb([grey, grey, grey])
        } else {
            image::Rgb(palette.get(index)?.to_array())
        };
    }
    Ok(image)
}

fn checker(x: u32, y: u32) -> u8 {
    let (x, y) = (x / CHECKER_CELL, y / CHECKER_CELL);
    if (x + y) % 2 == 1 {
        CHECKER_LIGHT
    } else {
        CHECKER_DARK
    }
}

pub fn export_png(path: &Path, colors: &MapColors, palette: &Palette) -> anyhow::Result<()> {
    to_image(colors, palette)?
        .save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Writing {}", path.display()))
}

pub fn open_image(path: &Path) -> anyhow::Result<RgbaImage> {
    let image = image::open(path).with_context(|| format!("Decoding {}", path.display()))?;
    Ok(image.to_rgba8())
}

/// Quantizes an image down to one map plane.
pub fn quantize_image(image: &RgbaImage, quantizer: &Quantizer, dither: bool) -> mapx_common::Result<MapColors> {
    let view = PixelView::packed(image.as_raw(), image.width() as usize, image.height() as usize, 4)?;
    let indices = quantizer.quantize(&view, MAP_SIZE, MAP_SIZE, dither)?;
    indices.try_into().map_err(|v: Vec<u8>| MapError::InvalidDimensions {
        expected: format!("{} indices", MAP_LEN),
        actual: format!("{} indices", v.len()),
    })
}
