//! SPI byte transport with a data/command select line.
//!
//! The D/C line idles in data mode. Commands pull it low for exactly one
//! byte and put it back afterwards, even when the write fails.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use tracing::error;

use super::protocol::Command;
use crate::{Error, Result};

/// Level of the data/command select line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataOrCommand {
    Command,
    Data,
}

/// Command/data framing over an SPI device.
///
/// Chip select is driven by the `SpiDevice` implementation.
pub struct Transport<SPI, DC> {
    spi: SPI,
    dc: DC,
}

impl<SPI, DC> Transport<SPI, DC>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
{
    /// Wraps the bus and D/C pin, putting the line in data mode.
    pub fn new(spi: SPI, mut dc: DC) -> Result<Self> {
        dc.set_high().map_err(Error::pin)?;
        Ok(Self { spi, dc })
    }

    /// Transmits a byte run in the current D/C mode.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() {
            error!("Tried to send 0 bytes to screen");
            return Err(Error::EmptyTransfer);
        }
        self.spi.write(bytes).map_err(Error::spi)
    }

    /// Sends a single opcode byte with D/C low.
    pub fn send_command(&mut self, byte: u8) -> Result<()> {
        self.set_mode(DataOrCommand::Command)?;
        let sent = self.send(&[byte]);
        let restored = self.set_mode(DataOrCommand::Data);
        if sent.is_err() {
            error!("Could not write command 0x{:02X} to panel", byte);
        }
        sent.and(restored)
    }

    /// Sends a single parameter byte.
    pub fn send_data(&mut self, byte: u8) -> Result<()> {
        self.send(&[byte]).inspect_err(|_| {
            error!("Could not write data byte 0x{:02X} to panel", byte);
        })
    }

    /// Sends a command and, if present, its parameter bytes.
    pub fn write_command(&mut self, command: Command, params: &[u8]) -> Result<()> {
        self.send_command(command.opcode())?;
        if !params.is_empty() {
            self.send(params)?;
        }
        Ok(())
    }

    fn set_mode(&mut self, mode: DataOrCommand) -> Result<()> {
        match mode {
            DataOrCommand::Command => self.dc.set_low(),
            DataOrCommand::Data => self.dc.set_high(),
        }
        .map_err(Error::pin)
    }
}
