//! Matching arbitrary pixels against a palette, with optional error diffusion.

use mapx_common::{MapError, Result, Rgb, FIRST_COLOR_INDEX};
use serde::{Deserialize, Serialize};

use crate::palette::Palette;

/// Error share (out of 16) pushed to the next cell of the column, then to the
/// next column one row up, level and one row down. Cells are visited column by
/// column, so every target is still ahead of the scan.
pub const DIFFUSION_NEXT: f32 = 7.0 / 16.0;
pub const DIFFUSION_ACROSS_UP: f32 = 3.0 / 16.0;
pub const DIFFUSION_ACROSS: f32 = 5.0 / 16.0;
pub const DIFFUSION_ACROSS_DOWN: f32 = 1.0 / 16.0;

/// Index written for fully transparent pixels.
pub const TRANSPARENT_INDEX: u8 = 0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Euclidean distance in RGB.
    #[default]
    Rgb,
    /// Euclidean distance in YUV, closer to perceived difference.
    Yuv,
}

impl Metric {
    fn coordinates(self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        match self {
            Metric::Rgb => [r, g, b],
            Metric::Yuv => {
                let (r, g, b) = (r / 255.0, g / 255.0, b / 255.0);
                [
                    0.299 * r + 0.587 * g + 0.114 * b,
                    -0.14713 * r - 0.28886 * g + 0.436 * b,
                    0.615 * r - 0.51499 * g - 0.0001 * b,
                ]
            }
        }
    }
}

/// Borrowed RGB or RGBA pixel rows.
#[derive(Debug, Clone, Copy)]
pub struct PixelView<'a> {
    data: &'a [u8],
    width: usize,
    height: usize,
    stride: usize,
    channels: usize,
}

impl<'a> PixelView<'a> {
    pub fn new(data: &'a [u8], width: usize, height: usize, stride: usize, channels: usize) -> Result<Self> {
        let invalid = |expected: String| MapError::InvalidDimensions {
            expected,
            actual: format!(
                "{}x{} pixels, {} channels, stride {}, {} bytes",
                width,
                height,
                channels,
                stride,
                data.len()
            ),
        };

        if channels != 3 && channels != 4 {
            return Err(invalid("3 or 4 channels".to_string()));
        }
        let row = width.checked_mul(channels).ok_or_else(|| invalid("a row that fits in memory".to_string()))?;
        if stride < row {
            return Err(invalid(format!("a stride of at least {}", row)));
        }
        if height > 0 {
            let needed = stride
                .checked_mul(height - 1)
                .and_then(|n| n.checked_add(row))
                .ok_or_else(|| invalid("a buffer that fits in memory".to_string()))?;
            if data.len() < needed {
                return Err(invalid(format!("at least {} bytes", needed)));
            }
        }

        Ok(PixelView {
            data,
            width,
            height,
            stride,
            channels,
        })
    }

    /// Tightly packed rows.
    pub fn packed(data: &'a [u8], width: usize, height: usize, channels: usize) -> Result<Self> {
        Self::new(data, width, height, width.saturating_mul(channels), channels)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> &'a [u8] {
        let start = y * self.stride + x * self.channels;
        &self.data[start..start + self.channels]
    }

    fn is_transparent(&self, pixel: &[u8]) -> bool {
        self.channels == 4 && pixel[3] == 0
    }
}

/// Nearest-colour search over the real entries of a palette.
#[derive(Debug)]
pub struct Quantizer {
    metric: Metric,
    // entries FIRST_COLOR_INDEX.. as RGB and in metric coordinates
    colors: Vec<[f32; 3]>,
    entries: Vec<[f32; 3]>,
}

impl Quantizer {
    pub fn new(palette: &Palette, metric: Metric) -> Result<Self> {
        if !palette.has_real_entries() {
            return Err(MapError::MissingPaletteEntry(FIRST_COLOR_INDEX));
        }
        let colors: Vec<[f32; 3]> = palette.colors()[FIRST_COLOR_INDEX..].iter().map(|c| to_f32(*c)).collect();
        let entries = colors.iter().map(|c| metric.coordinates(*c)).collect();
        Ok(Quantizer {
            metric,
            colors,
            entries,
        })
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn nearest(&self, color: Rgb) -> u8 {
        self.search(to_f32(color), None)
    }

    /// The runner-up to `nearest`, or the nearest itself when the palette has a
    /// single real entry.
    pub fn second_nearest(&self, color: Rgb) -> u8 {
        let color = to_f32(color);
        let first = self.search(color, None);
        if self.entries.len() < 2 {
            return first;
        }
        self.search(color, Some(first))
    }

    /// Lowest index at minimal distance, optionally excluding one index.
    fn search(&self, color: [f32; 3], exclude: Option<u8>) -> u8 {
        let target = self.metric.coordinates(color);
        let mut best = None;
        let mut best_distance = f32::INFINITY;
        for (offset, entry) in self.entries.iter().enumerate() {
            let index = (offset + FIRST_COLOR_INDEX) as u8;
            if exclude == Some(index) {
                continue;
            }
            let distance = squared_distance(&target, entry);
            if distance < best_distance {
                best_distance = distance;
                best = Some(index);
            }
        }
        best.unwrap_or(FIRST_COLOR_INDEX as u8)
    }

    /// Resamples `view` to `out_width` by `out_height` and maps every pixel to
    /// a palette index, stored `x + y * out_width`.
    pub fn quantize(&self, view: &PixelView, out_width: usize, out_height: usize, dither: bool) -> Result<Vec<u8>> {
        let len = out_width.checked_mul(out_height).ok_or_else(|| MapError::InvalidDimensions {
            expected: "an output that fits in memory".to_string(),
            actual: format!("{}x{}", out_width, out_height),
        })?;
        if len > 0 && (view.width() == 0 || view.height() == 0) {
            return Err(MapError::InvalidDimensions {
                expected: "a non-empty source image".to_string(),
                actual: format!("{}x{}", view.width(), view.height()),
            });
        }

        let mut working = Vec::with_capacity(len);
        let mut transparent = Vec::with_capacity(len);
        for y in 0..out_height {
            for x in 0..out_width {
                let pixel = view.pixel(x * view.width() / out_width, y * view.height() / out_height);
                working.push([pixel[0] as f32, pixel[1] as f32, pixel[2] as f32]);
                transparent.push(view.is_transparent(pixel));
            }
        }

        let mut out = vec![TRANSPARENT_INDEX; len];
        for x in 0..out_width {
            for y in 0..out_height {
                let at = x + y * out_width;
                if transparent[at] {
                    continue;
                }
                let index = self.search(working[at], None);
                out[at] = index;
                if !dither {
                    continue;
                }

                let matched = self.colors[index as usize - FIRST_COLOR_INDEX];
                let error = [
                    working[at][0] - matched[0],
                    working[at][1] - matched[1],
                    working[at][2] - matched[2],
                ];
                for (tx, ty, weight) in diffusion_targets(x, y, out_width, out_height) {
                    let target = tx + ty * out_width;
                    if transparent[target] {
                        continue;
                    }
                    for channel in 0..3 {
                        let value = working[target][channel] + error[channel] * weight;
                        working[target][channel] = value.clamp(0.0, 255.0);
                    }
                }
            }
        }
        Ok(out)
    }
}

/// Neighbours of (`x`, `y`) that receive a share of its error, with their
/// weights. Neighbours outside the image are left out.
pub fn diffusion_targets(x: usize, y: usize, width: usize, height: usize) -> Vec<(usize, usize, f32)> {
    let mut targets = Vec::with_capacity(4);
    if y + 1 < height {
        targets.push((x, y + 1, DIFFUSION_NEXT));
    }
    if x + 1 < width {
        if y > 0 {
            targets.push((x + 1, y - 1, DIFFUSION_ACROSS_UP));
        }
        targets.push((x + 1, y, DIFFUSION_ACROSS));
        if y + 1 < height {
            targets.push((x + 1, y + 1, DIFFUSION_ACROSS_DOWN));
        }
    }
    targets
}

fn to_f32(color: Rgb) -> [f32; 3] {
    [color.r as f32, color.g as f32, color.b as f32]
}

fn squared_distance(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    a.iter().zip(b).map(|(p, q)| (p - q) * (p - q)).sum()
}
