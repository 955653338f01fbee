use std::path::PathBuf;
use std::time::Duration;

use image::Rgba;
use log::{debug, info};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// Setting enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReadingDirection {
    Ltr,
    Rtl,
}

impl ReadingDirection {
    pub fn is_ltr(self) -> bool {
        self == ReadingDirection::Ltr
    }
}

/// How a page image is initially fitted into the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleType {
    FitScreen,
    FitWidth,
    FitHeight,
    Original,
}

/// Horizontal edge the initial framing and landscape zoom gravitate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZoomAnchor {
    /// Follow the reading direction: left for LTR, right for RTL.
    Automatic,
    Left,
    Right,
    Center,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReaderBackground {
    White,
    Black,
    Smart,
    SmartDark,
}

impl ReaderBackground {
    /// Fill behind merged spreads where the two pages' heights differ.
    /// Only the pure black theme fills black; the smart themes match the
    /// page color later in the display layer and get white here.
    pub fn merge_fill(self) -> Rgba<u8> {
        match self {
            ReaderBackground::Black => Rgba([0, 0, 0, 255]),
            _ => Rgba([255, 255, 255, 255]),
        }
    }
}

// ---------------------------------------------------------------------------
// ReaderConfigFile — deserialized from TOML (all fields optional)
// ---------------------------------------------------------------------------

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ReaderConfigFile {
    pub direction: Option<ReadingDirection>,
    pub split_wide_pages: Option<bool>,
    pub landscape_zoom: Option<bool>,
    pub zoom_anchor: Option<ZoomAnchor>,
    pub background: Option<ReaderBackground>,
    pub crop_borders: Option<bool>,
    pub scale_type: Option<ScaleType>,
    #[serde(default)]
    pub pipeline: PipelineConfigFile,
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct PipelineConfigFile {
    pub progress_interval_ms: Option<u64>,
    pub read_chunk_bytes: Option<usize>,
    pub max_composite_pixels: Option<u64>,
}

// ---------------------------------------------------------------------------
// ReaderConfig — resolved (all fields concrete)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReaderConfig {
    pub direction: ReadingDirection,
    pub split_wide_pages: bool,
    pub landscape_zoom: bool,
    pub zoom_anchor: ZoomAnchor,
    pub background: ReaderBackground,
    pub crop_borders: bool,
    pub scale_type: ScaleType,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub progress_interval: Duration,
    pub read_chunk_bytes: usize,
    pub max_composite_pixels: u64,
}

impl ReaderConfigFile {
    /// Resolve to a ReaderConfig by applying defaults to missing fields.
    pub fn resolve(self) -> ReaderConfig {
        let config = ReaderConfig {
            direction: self.direction.unwrap_or(ReadingDirection::Ltr),
            split_wide_pages: self.split_wide_pages.unwrap_or(false),
            landscape_zoom: self.landscape_zoom.unwrap_or(true),
            zoom_anchor: self.zoom_anchor.unwrap_or(ZoomAnchor::Automatic),
            background: self.background.unwrap_or(ReaderBackground::Smart),
            crop_borders: self.crop_borders.unwrap_or(false),
            scale_type: self.scale_type.unwrap_or(ScaleType::FitScreen),
            pipeline: PipelineConfig {
                progress_interval: Duration::from_millis(
                    self.pipeline.progress_interval_ms.unwrap_or(100),
                ),
                read_chunk_bytes: self.pipeline.read_chunk_bytes.unwrap_or(64 * 1024),
                max_composite_pixels: self
                    .pipeline
                    .max_composite_pixels
                    .unwrap_or(64 * 1024 * 1024),
            },
        };
        info!(
            "config: resolved direction={:?}, split_wide_pages={}, \
             landscape_zoom={}, zoom_anchor={:?}, background={:?}, \
             crop_borders={}, scale_type={:?}, progress_interval={}ms, \
             read_chunk={}B, max_composite={}px",
            config.direction,
            config.split_wide_pages,
            config.landscape_zoom,
            config.zoom_anchor,
            config.background,
            config.crop_borders,
            config.scale_type,
            config.pipeline.progress_interval.as_millis(),
            config.pipeline.read_chunk_bytes,
            config.pipeline.max_composite_pixels,
        );
        config
    }
}

/// Resolve the XDG config path for mihiraki.
fn config_path() -> Option<PathBuf> {
    let config_dir = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config"))
        })?;
    Some(config_dir.join("mihiraki").join("config.toml"))
}

/// Load config file. Returns `ReaderConfigFile::default()` if no file exists.
/// Returns an error if the file exists but cannot be parsed.
pub fn load_config() -> anyhow::Result<ReaderConfigFile> {
    let path = match config_path() {
        Some(p) => p,
        None => {
            info!("config: no HOME or XDG_CONFIG_HOME set, using defaults");
            return Ok(ReaderConfigFile::default());
        }
    };
    debug!("config: looking for {}", path.display());
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            info!("config: loaded from {}", path.display());
            let cfg: ReaderConfigFile = toml::from_str(&text)
                .map_err(|e| anyhow::anyhow!("failed to parse {}: {e}", path.display()))?;
            Ok(cfg)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("config: {} not found, using defaults", path.display());
            Ok(ReaderConfigFile::default())
        }
        Err(e) => Err(anyhow::anyhow!("failed to read {}: {e}", path.display())),
    }
}
