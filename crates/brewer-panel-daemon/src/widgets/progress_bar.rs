//! Brew progress bar with slanted caps.

use brewer_panel_hw::lcd::colors::{BLACK, GRAY};
use brewer_panel_hw::lcd::to_panel_order;
use brewer_panel_hw::{Display, Framebuffer, Image};
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use tracing::debug;

use super::{centered, WidgetError};
use crate::brew::BoundQuantity;

const WIDGET: &str = "progress bar";

const LENGTH: u16 = 160;
const HEIGHT: u16 = 10;
const X_PAD: u16 = 5;
const Y_PAD: u16 = 4;
/// Rows in each slanted cap.
const ANGLE: u16 = HEIGHT / 3;
const MIDSECTION: u16 = HEIGHT - 2 * ANGLE;

/// Smallest background the bar fits on.
pub const MIN_BACKGROUND_WIDTH: u16 = LENGTH + 2 * X_PAD;
pub const MIN_BACKGROUND_HEIGHT: u16 = HEIGHT + 2 * Y_PAD;

/// Fraction of the brew completed, clamped to `[0, 1]`.
pub fn progress(elapsed_ms: u32, brew_time_s: u16) -> f32 {
    if brew_time_s == 0 {
        return 0.0;
    }
    (elapsed_ms as f32 / (f32::from(brew_time_s) * 1000.0)).clamp(0.0, 1.0)
}

/// Columns of solid bar between the caps.
fn filled(progress: f32) -> u16 {
    let raw = f32::from(LENGTH) * progress - f32::from(2 * ANGLE);
    if raw <= 1.0 {
        2
    } else {
        raw as u16
    }
}

/// Owned background image for the bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressBackground {
    width: u16,
    height: u16,
    pixels: Vec<u16>,
}

impl ProgressBackground {
    /// Minimum-size background: `fill` with a one-pixel `border`.
    pub fn plain(fill: u16, border: u16) -> Self {
        let (width, height) = (MIN_BACKGROUND_WIDTH, MIN_BACKGROUND_HEIGHT);
        let pixels = (0..height)
            .flat_map(|y| (0..width).map(move |x| (x, y)))
            .map(|(x, y)| {
                if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                    border
                } else {
                    fill
                }
            })
            .collect();
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn image(&self) -> brewer_panel_hw::Result<Image<'_>> {
        Image::new(self.width, self.height, &self.pixels)
    }
}

/// Draws the bar over `background`, centered on `(cx, cy)`, and sends the
/// background's box to the panel.
pub fn progress_bar<SPI, DC, RST>(
    display: &mut Display<SPI, DC, RST>,
    cx: u16,
    cy: u16,
    background: &Image<'_>,
    binding: BoundQuantity,
) -> Result<(), WidgetError>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
{
    let BoundQuantity::BrewElapsed {
        elapsed_ms,
        brew_time_s,
    } = binding
    else {
        return Err(WidgetError::UnsupportedBinding {
            widget: WIDGET,
            quantity: binding.quantity(),
        });
    };

    let (x1, y1) = paint(
        display.framebuffer_mut(),
        cx,
        cy,
        background,
        progress(elapsed_ms, brew_time_s),
    )?;
    display.send_region(
        x1,
        y1,
        x1 + background.width(),
        y1 + background.height(),
    )?;
    Ok(())
}

/// Paints background and bar, returning the background's top-left corner.
fn paint(
    fb: &mut Framebuffer,
    cx: u16,
    cy: u16,
    background: &Image<'_>,
    progress: f32,
) -> Result<(u16, u16), WidgetError> {
    if background.width() < MIN_BACKGROUND_WIDTH || background.height() < MIN_BACKGROUND_HEIGHT {
        return Err(WidgetError::BackgroundTooSmall {
            width: background.width(),
            height: background.height(),
            min_width: MIN_BACKGROUND_WIDTH,
            min_height: MIN_BACKGROUND_HEIGHT,
        });
    }

    let (left, top) = centered(fb, cx, cy, background.width(), background.height())?;
    fb.blit_image(left, top, background)?;

    let fill = filled(progress);
    let dark = to_panel_order(BLACK);
    let light = to_panel_order(GRAY);
    let bar_x = left + X_PAD;
    let bar_y = top + Y_PAD;
    debug!("Progress {:.3} -> {} filled columns", progress, fill);

    for h in 0..HEIGHT {
        let y = bar_y + h;
        if (ANGLE..ANGLE + MIDSECTION).contains(&h) {
            for l in 0..fill + 2 * ANGLE {
                fb.set_raw(bar_x + l, y, dark)?;
            }
            continue;
        }

        // Distance from the outer edge of the bar
        let r = if h < ANGLE { h } else { HEIGHT - 1 - h };
        let edge = if r == ANGLE / 2 { dark } else { light };
        fb.set_raw(bar_x + ANGLE - r - 1, y, edge)?;
        for l in ANGLE - r..ANGLE + fill + r {
            fb.set_raw(bar_x + l, y, dark)?;
        }
        fb.set_raw(bar_x + ANGLE + fill + r, y, edge)?;
    }
    Ok((left, top))
}
