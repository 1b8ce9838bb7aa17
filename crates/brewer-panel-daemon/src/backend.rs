//! Panel backends.
//!
//! The hardware backend talks to the panel through Linux spidev and a GPIO
//! character device. The simulated backend keeps the panel in memory.

use anyhow::{Context, Result};
use brewer_panel_hw::lcd::sim::{SimPin, SimSpi, SimulatedPanel};
use brewer_panel_hw::Display;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use linux_embedded_hal::gpio_cdev::{Chip, LineRequestFlags};
use linux_embedded_hal::spidev::{SpiModeFlags, SpidevOptions};
use linux_embedded_hal::{CdevPin, SpidevDevice};
use tracing::info;

use crate::config::PanelConfig;

/// Display on spidev with D/C and reset on GPIO lines.
pub type SpidevDisplay = Display<SpidevDevice, CdevPin, CdevPin>;

/// Display over the in-memory panel.
pub type SimulatedDisplay = Display<SimSpi, SimPin, SimPin>;

/// Opens the SPI device and GPIO lines named in `config`.
pub fn open_spidev(config: &PanelConfig) -> Result<SpidevDisplay> {
    let mut spi = SpidevDevice::open(&config.spidev)
        .with_context(|| format!("Failed to open SPI device {}", config.spidev.display()))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(config.spi_clock_hz)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options)
        .with_context(|| format!("Failed to configure SPI device {}", config.spidev.display()))?;

    let mut chip = Chip::new(&config.gpiochip)
        .with_context(|| format!("Failed to open GPIO chip {}", config.gpiochip.display()))?;
    let dc = output_line(&mut chip, config.dc_line, "brewer-panel-dc")?;
    // Held low until init releases reset
    let rst = output_line(&mut chip, config.reset_line, "brewer-panel-rst")?;

    info!(
        "Opened panel on {} at {} Hz (D/C line {}, reset line {})",
        config.spidev.display(),
        config.spi_clock_hz,
        config.dc_line,
        config.reset_line
    );
    build(config, spi, dc, rst)
}

/// Builds a display over a fresh simulated panel.
pub fn simulated(config: &PanelConfig) -> Result<(SimulatedDisplay, SimulatedPanel)> {
    let panel = SimulatedPanel::new();
    let display = build(config, panel.spi(), panel.dc_pin(), panel.reset_pin())?;
    info!("Using simulated panel");
    Ok((display, panel))
}

fn output_line(chip: &mut Chip, offset: u32, consumer: &str) -> Result<CdevPin> {
    let handle = chip
        .get_line(offset)
        .with_context(|| format!("Failed to get GPIO line {}", offset))?
        .request(LineRequestFlags::OUTPUT, 0, consumer)
        .with_context(|| format!("Failed to request GPIO line {} as {}", offset, consumer))?;
    CdevPin::new(handle).with_context(|| format!("Failed to create pin for GPIO line {}", offset))
}

fn build<SPI, DC, RST>(
    config: &PanelConfig,
    spi: SPI,
    dc: DC,
    rst: RST,
) -> Result<Display<SPI, DC, RST>>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
{
    let display = Display::new(spi, dc, rst, config.descriptor())
        .context("Failed to create display")?
        .with_scratch_limit(config.scratch_limit);
    Ok(display)
}
