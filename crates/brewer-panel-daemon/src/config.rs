//! Configuration management.

use anyhow::{Context, Result};
use brewer_panel_hw::lcd::{colors, parse_hex_color};
use brewer_panel_hw::PanelDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Display refresh rate in milliseconds
    #[serde(default = "default_refresh")]
    pub refresh: u64,

    /// Panel configuration
    #[serde(default)]
    pub panel: PanelConfig,

    /// Font configuration
    #[serde(default)]
    pub font: FontConfig,

    /// Color configuration
    #[serde(default)]
    pub colors: ColorConfig,

    /// Simulated brew configuration
    #[serde(default)]
    pub brew: BrewConfig,
}

/// Where frames are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelBackend {
    /// Linux spidev with GPIO character device lines
    #[default]
    Spidev,
    /// In-memory panel, for dry runs
    Simulated,
}

/// Panel wiring and transfer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Panel backend
    #[serde(default)]
    pub backend: PanelBackend,

    /// SPI device node
    #[serde(default = "default_spidev")]
    pub spidev: PathBuf,

    /// GPIO chip holding the D/C and reset lines
    #[serde(default = "default_gpiochip")]
    pub gpiochip: PathBuf,

    /// D/C line offset
    #[serde(default = "default_dc_line")]
    pub dc_line: u32,

    /// Reset line offset
    #[serde(default = "default_reset_line")]
    pub reset_line: u32,

    /// Column offset of the visible area
    #[serde(default)]
    pub offset_x: u16,

    /// Row offset of the visible area
    #[serde(default)]
    pub offset_y: u16,

    /// SPI clock in Hz
    #[serde(default = "default_spi_clock")]
    pub spi_clock_hz: u32,

    /// SPI transaction queue depth
    #[serde(default = "default_queue_size")]
    pub queue_size: u8,

    /// Largest sub-region scratch buffer in bytes
    #[serde(default = "default_scratch_limit")]
    pub scratch_limit: usize,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            backend: PanelBackend::default(),
            spidev: default_spidev(),
            gpiochip: default_gpiochip(),
            dc_line: default_dc_line(),
            reset_line: default_reset_line(),
            offset_x: 0,
            offset_y: 0,
            spi_clock_hz: default_spi_clock(),
            queue_size: default_queue_size(),
            scratch_limit: default_scratch_limit(),
        }
    }
}

impl PanelConfig {
    /// Builds the panel descriptor for these settings.
    pub fn descriptor(&self) -> PanelDescriptor {
        PanelDescriptor {
            offset_x: self.offset_x,
            offset_y: self.offset_y,
            spi_clock_hz: self.spi_clock_hz,
            queue_size: self.queue_size,
            ..PanelDescriptor::default()
        }
    }
}

/// Font configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// Path to a TTF/OTF file
    #[serde(default = "default_font_path")]
    pub path: PathBuf,

    /// Pixel size to rasterize at
    #[serde(default = "default_font_size")]
    pub size: f32,

    /// Columns between characters
    #[serde(default = "default_spacing")]
    pub spacing: u16,

    /// Give all digits the same width
    #[serde(default = "default_true")]
    pub normalize_digits: bool,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: default_font_path(),
            size: default_font_size(),
            spacing: default_spacing(),
            normalize_digits: default_true(),
        }
    }
}

/// Colors as hex strings (e.g. "#FFFFFF").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorConfig {
    #[serde(default = "default_background")]
    pub background: String,

    #[serde(default = "default_text")]
    pub text: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            background: default_background(),
            text: default_text(),
        }
    }
}

impl ColorConfig {
    /// Background as RGB565, black if unparseable.
    pub fn background_rgb565(&self) -> u16 {
        parse_hex_color(&self.background).unwrap_or(colors::BLACK)
    }

    /// Text color as RGB565, white if unparseable.
    pub fn text_rgb565(&self) -> u16 {
        parse_hex_color(&self.text).unwrap_or(colors::WHITE)
    }
}

/// Simulated brew session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrewConfig {
    /// Brew time in seconds
    #[serde(default = "default_brew_time")]
    pub brew_time: u16,

    /// Bloom time in seconds
    #[serde(default = "default_bloom_time")]
    pub bloom_time: u16,

    /// Target water temperature in degrees Celsius
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Button sensitivity (0-7)
    #[serde(default = "default_button_sensitivity")]
    pub button_sensitivity: u8,
}

impl Default for BrewConfig {
    fn default() -> Self {
        Self {
            brew_time: default_brew_time(),
            bloom_time: default_bloom_time(),
            temperature: default_temperature(),
            button_sensitivity: default_button_sensitivity(),
        }
    }
}

// Default value functions
fn default_refresh() -> u64 {
    250
}

fn default_spidev() -> PathBuf {
    PathBuf::from("/dev/spidev0.0")
}

fn default_gpiochip() -> PathBuf {
    PathBuf::from("/dev/gpiochip0")
}

fn default_dc_line() -> u32 {
    25
}

fn default_reset_line() -> u32 {
    27
}

fn default_spi_clock() -> u32 {
    60_000_000
}

fn default_queue_size() -> u8 {
    7
}

fn default_scratch_limit() -> usize {
    brewer_panel_hw::lcd::protocol::FRAME_BYTES
}

fn default_font_path() -> PathBuf {
    PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf")
}

fn default_font_size() -> f32 {
    24.0
}

fn default_spacing() -> u16 {
    2
}

fn default_true() -> bool {
    true
}

fn default_background() -> String {
    "#000000".to_string()
}

fn default_text() -> String {
    "#FFFFFF".to_string()
}

fn default_brew_time() -> u16 {
    150
}

fn default_bloom_time() -> u16 {
    30
}

fn default_temperature() -> f32 {
    93.0
}

fn default_button_sensitivity() -> u8 {
    4
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    #[allow(dead_code)]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh: default_refresh(),
            panel: PanelConfig::default(),
            font: FontConfig::default(),
            colors: ColorConfig::default(),
            brew: BrewConfig::default(),
        }
    }
}
