use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use mapx_render::Metric;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mapx", author, version, about = "Turn world saves and images into map items")]
pub struct Cli {
    /// Settings file (./mapx.json is used when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// More log output; repeat for trace
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Draw the terrain around a world position into a map item
    Render {
        /// Directory holding r.<x>.<z>.mca files
        region_dir: PathBuf,
        /// Block x at the centre of the map
        #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
        x_center: i32,
        /// Block z at the centre of the map
        #[arg(long, allow_hyphen_values = true, default_value_t = 0)]
        z_center: i32,
        /// Zoom level, each step doubles the covered area
        #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=4))]
        scale: u8,
        /// Palette file (text or .bin)
        #[arg(long)]
        palette: Option<PathBuf>,
        /// Output map item
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Quantize an image into a map item
    Convert {
        /// PNG, JPEG or GIF input
        image: PathBuf,
        /// Diffuse quantization error to neighbouring pixels
        #[arg(long)]
        dither: bool,
        /// Colour distance
        #[arg(long, value_enum)]
        metric: Option<MetricArg>,
        /// Palette file (text or .bin)
        #[arg(long)]
        palette: Option<PathBuf>,
        /// Write a bare compressed colour plane instead of a map item
        #[arg(long)]
        raw: bool,
        /// Output file
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Render a map item (or raw plane) to PNG
    Export {
        /// Map item to read
        input: PathBuf,
        /// Input is a bare compressed colour plane
        #[arg(long)]
        raw: bool,
        /// Palette file (text or .bin)
        #[arg(long)]
        palette: Option<PathBuf>,
        /// Output PNG
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Wrap a raw colour plane into a map item
    Pack {
        input: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Extract the colour plane of a map item
    Unpack {
        input: PathBuf,
        #[arg(long, short)]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MetricArg {
    Rgb,
    Yuv,
}

impl From<MetricArg> for Metric {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Rgb => Metric::Rgb,
            MetricArg::Yuv => Metric::Yuv,
        }
    }
}
