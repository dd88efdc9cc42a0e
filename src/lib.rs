pub mod cli;
pub mod config;
pub mod export;

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use log::{info, LevelFilter};
use mapx_common::{MapColors, MAP_LEN, MAP_SIZE};
use mapx_map::MapMeta;
use mapx_render::Quantizer;

use crate::cli::{Cli, Command};
use crate::config::Config;

pub fn run() -> anyhow::Result<()> {
    let args = Cli::parse();
    // a logger installed by an embedding process is kept
    let _ = mapx_logger::init(log_level(&args));

    let config = Config::discover(args.config.as_deref())?;
    match args.command {
        Command::Render {
            region_dir,
            x_center,
            z_center,
            scale,
            palette,
            output,
        } => {
            let side = MAP_SIZE << scale;
            let half = (side / 2) as i32;
            let (x, z) = (x_center.saturating_sub(half), z_center.saturating_sub(half));
            info!("Reading {0}x{0} columns from {1} at ({2}, {3})", side, region_dir.display(), x, z);
            let grid = mapx_region::read_area(&region_dir, x, z, side, side)
                .with_context(|| format!("Reading regions in {}", region_dir.display()))?;

            let palette = config.palette(palette.as_deref())?;
            let colors = mapx_render::render(&grid, scale, &palette).with_context(|| "Rendering map")?;
            let meta = MapMeta {
                scale: scale as i8,
                dimension: config.dimension,
                x_center,
                z_center,
                ..MapMeta::default()
            };
            save_item(&config, &output, &meta, &colors)
        }
        Command::Convert {
            image,
            dither,
            metric,
            palette,
            raw,
            output,
        } => {
            let palette = config.palette(palette.as_deref())?;
            let metric = metric.map(Into::into).unwrap_or(config.metric);
            let quantizer = Quantizer::new(&palette, metric).with_context(|| "Preparing palette")?;

            let source = export::open_image(&image)?;
            info!("Quantizing {} ({}x{})", image.display(), source.width(), source.height());
            let colors = export::quantize_image(&source, &quantizer, dither || config.dither)
                .with_context(|| format!("Quantizing {}", image.display()))?;

            if raw {
                mapx_map::save_raw(&output, &colors).with_context(|| format!("Writing {}", output.display()))
            } else {
                let meta = MapMeta {
                    dimension: config.dimension,
                    ..MapMeta::default()
                };
                save_item(&config, &output, &meta, &colors)
            }
        }
        Command::Export {
            input,
            raw,
            palette,
            output,
        } => {
            let palette = config.palette(palette.as_deref())?;
            let colors = if raw { load_raw(&input)? } else { load_item(&input)?.1 };
            export::export_png(&output, &colors, &palette)?;
            info!("Exported {} to {}", input.display(), output.display());
            Ok(())
        }
        Command::Pack { input, output } => {
            let colors = load_raw(&input)?;
            let meta = MapMeta {
                dimension: config.dimension,
                ..MapMeta::default()
            };
            save_item(&config, &output, &meta, &colors)
        }
        Command::Unpack { input, output } => {
            let (meta, colors) = load_item(&input)?;
            info!("Unpacking {} ({:?})", input.display(), meta);
            mapx_map::save_raw(&output, &colors).with_context(|| format!("Writing {}", output.display()))
        }
    }
}

fn log_level(args: &Cli) -> LevelFilter {
    match (args.quiet, args.verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => mapx_logger::level_from_env(LevelFilter::Info),
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    }
}

fn save_item(config: &Config, path: &Path, meta: &MapMeta, colors: &MapColors) -> anyhow::Result<()> {
    mapx_map::save_framed(path, meta, colors, config.framing.into(), config.compression_level)
        .with_context(|| format!("Writing {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(())
}

fn load_item(path: &Path) -> anyhow::Result<(MapMeta, MapColors)> {
    let mut colors = [0u8; MAP_LEN];
    let meta = mapx_map::load(path, &mut colors).with_context(|| format!("Reading {}", path.display()))?;
    Ok((meta, colors))
}

fn load_raw(path: &Path) -> anyhow::Result<MapColors> {
    let mut colors = [0u8; MAP_LEN];
    mapx_map::load_raw(path, &mut colors).with_context(|| format!("Reading {}", path.display()))?;
    Ok(colors)
}
