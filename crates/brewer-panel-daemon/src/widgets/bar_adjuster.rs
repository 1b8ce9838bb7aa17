//! Stacked-bar level selector, filled from the bottom.

use brewer_panel_hw::lcd::colors::{BLACK, WHITE};
use brewer_panel_hw::Display;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;

use super::{centered, WidgetError};
use crate::brew::{BoundQuantity, BUTTON_SENSITIVITY_MAX, BUTTON_SENSITIVITY_MIN};

const WIDGET: &str = "bar adjuster";

const BARS: u16 = 8;
const BAR_WIDTH: u16 = 100;
const BAR_HEIGHT: u16 = 8;
const BAR_SPACING: u16 = 12;
const TOTAL_HEIGHT: u16 = BARS * BAR_HEIGHT + BAR_SPACING * (BARS - 1);

/// Draws one bar per level centered on `(cx, cy)` and sends the bars' box.
///
/// With value `v`, the bottom `v + 1` bars are lit.
pub fn bar_adjuster<SPI, DC, RST>(
    display: &mut Display<SPI, DC, RST>,
    cx: u16,
    cy: u16,
    binding: BoundQuantity,
) -> Result<(), WidgetError>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
{
    let BoundQuantity::ButtonSensitivity(value) = binding else {
        return Err(WidgetError::UnsupportedBinding {
            widget: WIDGET,
            quantity: binding.quantity(),
        });
    };
    if !(BUTTON_SENSITIVITY_MIN..=BUTTON_SENSITIVITY_MAX).contains(&value) {
        return Err(WidgetError::OutOfRange {
            widget: WIDGET,
            value: i64::from(value),
            min: i64::from(BUTTON_SENSITIVITY_MIN),
            max: i64::from(BUTTON_SENSITIVITY_MAX),
        });
    }

    let active = u16::from(value) + 1;
    let fb = display.framebuffer_mut();
    let (left, top) = centered(fb, cx, cy, BAR_WIDTH, TOTAL_HEIGHT)?;
    let right = left.checked_add(BAR_WIDTH).unwrap_or(u16::MAX);
    let bottom = top.checked_add(TOTAL_HEIGHT).unwrap_or(u16::MAX);
    fb.region(left, top, right, bottom)?;

    for b in 0..BARS {
        let color = if BARS - b <= active { WHITE } else { BLACK };
        let y = top + b * (BAR_HEIGHT + BAR_SPACING);
        fb.fill_region(left, y, right, y + BAR_HEIGHT, color)?;
    }
    display.send_region(left, top, right, bottom)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use brewer_panel_hw::lcd::colors::GRAY;
    use brewer_panel_hw::lcd::sim::{SimPin, SimSpi, SimulatedPanel};
    use brewer_panel_hw::PanelDescriptor;

    fn display(panel: &SimulatedPanel) -> Display<SimSpi, SimPin, SimPin> {
        Display::new(
            panel.spi(),
            panel.dc_pin(),
            panel.reset_pin(),
            PanelDescriptor::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_lit_bars_from_bottom() {
        let panel = SimulatedPanel::new();
        let mut d = display(&panel);
        d.framebuffer_mut().fill_all(GRAY);
        bar_adjuster(&mut d, 120, 160, BoundQuantity::ButtonSensitivity(2)).unwrap();

        let fb = d.framebuffer();
        // Box is (70, 86)-(170, 234); bars start every 20 rows
        for b in 0..8u16 {
            let y = 86 + b * 20;
            let expected = if b >= 5 { WHITE } else { BLACK };
            assert_eq!(fb.get_pixel(70, y), Some(expected), "bar {}", b);
            assert_eq!(fb.get_pixel(169, y + 7), Some(expected), "bar {}", b);
            // Gap below each bar keeps the old contents
            if b < 7 {
                assert_eq!(fb.get_pixel(70, y + 8), Some(GRAY));
            }
        }
        assert_eq!(fb.get_pixel(69, 86), Some(GRAY));
        assert_eq!(fb.get_pixel(170, 86), Some(GRAY));

        let log = panel.command_log();
        assert_eq!(log[0], (0x2A, vec![0, 70, 0, 169]));
        assert_eq!(log[1], (0x2B, vec![0, 86, 0, 233]));
        assert_eq!(panel.pixels_written(), 100 * 148);
    }

    #[test]
    fn test_extremes() {
        let panel = SimulatedPanel::new();
        let mut d = display(&panel);
        bar_adjuster(&mut d, 120, 160, BoundQuantity::ButtonSensitivity(0)).unwrap();
        assert_eq!(d.framebuffer().get_pixel(70, 86 + 7 * 20), Some(WHITE));
        assert_eq!(d.framebuffer().get_pixel(70, 86 + 6 * 20), Some(BLACK));

        bar_adjuster(&mut d, 120, 160, BoundQuantity::ButtonSensitivity(7)).unwrap();
        assert_eq!(d.framebuffer().get_pixel(70, 86), Some(WHITE));
    }

    #[test]
    fn test_out_of_range() {
        let panel = SimulatedPanel::new();
        let mut d = display(&panel);
        let before = d.framebuffer().clone();
        assert!(matches!(
            bar_adjuster(&mut d, 120, 160, BoundQuantity::ButtonSensitivity(8)),
            Err(WidgetError::OutOfRange { value: 8, .. })
        ));
        assert!(*d.framebuffer() == before);
        assert_eq!(panel.transactions(), 0);
    }

    #[test]
    fn test_unsupported_bindings() {
        let panel = SimulatedPanel::new();
        let mut d = display(&panel);
        let before = d.framebuffer().clone();
        for binding in [
            BoundQuantity::ContainerTemperature(92.0),
            BoundQuantity::FunnelWaterLevel(50),
            BoundQuantity::BrewElapsed {
                elapsed_ms: 0,
                brew_time_s: 100,
            },
        ] {
            assert!(matches!(
                bar_adjuster(&mut d, 120, 160, binding),
                Err(WidgetError::UnsupportedBinding { .. })
            ));
        }
        assert!(*d.framebuffer() == before);
        assert_eq!(panel.transactions(), 0);
    }

    #[test]
    fn test_box_must_fit() {
        let panel = SimulatedPanel::new();
        let mut d = display(&panel);
        let before = d.framebuffer().clone();
        assert!(matches!(
            bar_adjuster(&mut d, 120, 300, BoundQuantity::ButtonSensitivity(3)),
            Err(WidgetError::Panel(_))
        ));
        assert!(*d.framebuffer() == before);
    }
}
