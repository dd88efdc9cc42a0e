use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::debug;
use mapx_common::Dimension;
use mapx_nbt::compression::{Framing, BEST_COMPRESSION};
use mapx_render::{Metric, Palette};
use serde::{Deserialize, Serialize};

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "mapx.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFraming {
    #[default]
    Gzip,
    Zlib,
}

impl From<OutputFraming> for Framing {
    fn from(framing: OutputFraming) -> Self {
        match framing {
            OutputFraming::Gzip => Framing::Gzip,
            OutputFraming::Zlib => Framing::Zlib,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Palette used when the command line names none.
    pub palette: Option<PathBuf>,
    pub dither: bool,
    pub metric: Metric,
    pub compression_level: u32,
    pub dimension: Dimension,
    pub framing: OutputFraming,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            palette: None,
            dither: false,
            metric: Metric::Rgb,
            compression_level: BEST_COMPRESSION,
            dimension: Dimension::Overworld,
            framing: OutputFraming::Gzip,
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        anyhow::ensure!(
            config.compression_level <= BEST_COMPRESSION,
            "compression_level must be between 0 and {}",
            BEST_COMPRESSION
        );
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("Parsing {}", path.display()))
    }

    /// The explicitly named file, else `mapx.json` if it exists, else defaults.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(DEFAULT_CONFIG_FILE),
            None => {
                debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(Config::default())
            }
        }
    }

    /// Palette from `override_path`, the configured file, or the classic colours.
    pub fn palette(&self, override_path: Option<&Path>) -> anyhow::Result<Palette> {
        match override_path.or(self.palette.as_deref()) {
            Some(path) => load_palette(path),
            None => Ok(Palette::classic()),
        }
    }
}

/// Reads a palette, picking the binary form for `.bin` files.
pub fn load_palette(path: &Path) -> anyhow::Result<Palette> {
    let palette = match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => Palette::load_binary(path),
        _ => Palette::load_text(path),
    };
    palette.with_context(|| format!("Loading palette {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(Config::from_json("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_json(
            r#"{
                "palette": "colors.bin",
                "dither": true,
                "metric": "yuv",
                "compression_level": 6,
                "dimension": "nether",
                "framing": "zlib"
            }"#,
        )
        .unwrap();
        assert_eq!(config.palette.as_deref(), Some(Path::new("colors.bin")));
        assert!(config.dither);
        assert_eq!(config.metric, Metric::Yuv);
        assert_eq!(config.dimension, Dimension::Nether);
        assert_eq!(Framing::from(config.framing), Framing::Zlib);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Config::from_json(r#"{"compression_level": 12}"#).is_err());
        assert!(Config::from_json(r#"{"metric": "lab"}"#).is_err());
        assert!(Config::from_json(r#"{"colour": "red"}"#).is_err());
    }

    #[test]
    fn test_palette_falls_back_to_classic() {
        assert_eq!(Config::default().palette(None).unwrap(), Palette::classic());
    }

    #[test]
    fn test_palette_file_formats() {
        let dir = std::env::temp_dir();
        let text = dir.join(format!("mapx-palette-{}.txt", std::process::id()));
        let binary = dir.join(format!("mapx-palette-{}.bin", std::process::id()));
        fs::write(&text, "0,0,0\n0,0,0\n0,0,0\n0,0,0\n10,20,30\n").unwrap();
        Palette::classic().save_binary(&binary).unwrap();

        let from_text = load_palette(&text).unwrap();
        let from_binary = Config::default().palette(Some(&binary)).unwrap();
        fs::remove_file(&text).unwrap();
        fs::remove_file(&binary).unwrap();

        assert_eq!(from_text.len(), 5);
        assert_eq!(from_binary, Palette::classic());
    }
}
