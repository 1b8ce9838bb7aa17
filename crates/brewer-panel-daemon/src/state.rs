//! Application state and frame rendering.

use anyhow::{Context, Result};
use brewer_panel_hw::lcd::colors::{GRAY, WHITE};
use brewer_panel_hw::lcd::TransferStats;
use brewer_panel_hw::Display;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use tracing::{debug, info, warn};

use crate::brew::{BrewSnapshot, BrewStage, Quantity, SimulatedBrew};
use crate::config::Config;
use crate::rendering::{draw_text, Font, TextStyle};
use crate::widgets::{bar_adjuster, progress_bar, ProgressBackground};

/// Screen positions.
const CENTER_X: u16 = 120;
const STAGE_Y: u16 = 16;
const TIME_Y: u16 = 56;
const TEMPERATURE_Y: u16 = 96;
const PROGRESS_CY: u16 = 150;
const ADJUSTER_CY: u16 = 244;

/// Outcome of one rendered frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    pub snapshot: BrewSnapshot,
    pub stats: TransferStats,
    /// Whether the whole screen was redrawn.
    pub full_redraw: bool,
}

/// Application state.
pub struct AppState<SPI, DC, RST> {
    /// Configuration
    config: Config,

    /// Display controller
    display: Display<SPI, DC, RST>,

    /// Font for all text
    font: Font,

    /// Text appearance
    text_style: TextStyle,

    /// Progress bar background
    progress_background: ProgressBackground,

    /// Brew cycle being shown
    brew: SimulatedBrew,

    /// Stage shown on the last frame
    last_stage: Option<BrewStage>,
}

impl<SPI, DC, RST> AppState<SPI, DC, RST>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
{
    /// Initializes the panel behind `display` and opens the font.
    pub fn new(
        config: Config,
        mut display: Display<SPI, DC, RST>,
        delay: &mut impl DelayNs,
        font: Font,
    ) -> Result<Self> {
        display.init(delay).context("Failed to initialize panel")?;

        if let Err(e) = font.open() {
            // Text is skipped until the font opens
            warn!("Font {:?} unavailable: {}", config.font.path, e);
        }

        let text_style = TextStyle {
            color: config.colors.text_rgb565(),
            spacing: config.font.spacing,
            normalize_digits: config.font.normalize_digits,
        };
        let brew = SimulatedBrew::new(
            config.brew.brew_time,
            config.brew.bloom_time,
            config.brew.temperature,
        )
        .with_button_sensitivity(config.brew.button_sensitivity);

        Ok(Self {
            config,
            display,
            font,
            text_style,
            progress_background: ProgressBackground::plain(WHITE, GRAY),
            brew,
            last_stage: None,
        })
    }

    /// Refresh interval in milliseconds.
    pub fn refresh_interval_ms(&self) -> u64 {
        self.config.refresh
    }

    /// Renders the brew state `since_start_ms` into the session.
    pub fn render_frame(&mut self, since_start_ms: u32) -> Result<FrameReport> {
        let snapshot = self.brew.snapshot(since_start_ms);
        self.display.reset_stats();

        let full_redraw = self.last_stage != Some(snapshot.stage);
        if full_redraw {
            self.redraw_static(&snapshot)?;
            self.last_stage = Some(snapshot.stage);
            info!("Brew stage: {}", snapshot.stage);
        }

        self.text_line(TIME_Y, &snapshot.remaining_text())?;
        self.text_line(
            TEMPERATURE_Y,
            &format!("{:.1}C", snapshot.container_temperature),
        )?;
        progress_bar(
            &mut self.display,
            CENTER_X,
            PROGRESS_CY,
            &self.progress_background.image()?,
            snapshot.bind(Quantity::BrewElapsed),
        )
        .context("Failed to draw progress bar")?;

        let stats = self.display.stats();
        debug!(
            "Frame at {} ms: {} regions, {} chunks, {} bytes",
            since_start_ms, stats.regions, stats.chunks, stats.bytes
        );
        Ok(FrameReport {
            snapshot,
            stats,
            full_redraw,
        })
    }

    /// Clears the screen and draws elements that only change with the stage.
    fn redraw_static(&mut self, snapshot: &BrewSnapshot) -> Result<()> {
        let background = self.config.colors.background_rgb565();
        self.display.framebuffer_mut().fill_all(background);
        if let Ok(asset) = self.font.open() {
            if STAGE_Y + asset.height() <= self.display.framebuffer().height() {
                draw_text(
                    self.display.framebuffer_mut(),
                    &self.font,
                    snapshot.stage.label(),
                    CENTER_X,
                    STAGE_Y,
                    &self.text_style,
                )?;
            }
        }
        self.display
            .send_entire_buffer()
            .context("Failed to send full frame")?;

        bar_adjuster(
            &mut self.display,
            CENTER_X,
            ADJUSTER_CY,
            snapshot.bind(Quantity::ButtonSensitivity),
        )
        .context("Failed to draw bar adjuster")?;
        Ok(())
    }

    /// Replaces one full-width text line and sends it.
    fn text_line(&mut self, y: u16, text: &str) -> Result<()> {
        let Ok(asset) = self.font.open() else {
            return Ok(());
        };
        let bottom = y + asset.height();
        let width = self.display.framebuffer().width();
        let background = self.config.colors.background_rgb565();

        let fb = self.display.framebuffer_mut();
        fb.fill_region(0, y, width, bottom, background)?;
        draw_text(fb, &self.font, text, CENTER_X, y, &self.text_style)?;
        self.display.send_region(0, y, width, bottom)?;
        Ok(())
    }

    /// Returns the display, for inspection.
    #[cfg(test)]
    pub fn display(&self) -> &Display<SPI, DC, RST> {
        &self.display
    }
}
