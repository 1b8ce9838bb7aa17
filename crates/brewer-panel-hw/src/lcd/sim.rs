//! In-memory ILI9341 model.
//!
//! `SimulatedPanel` hands out an SPI device, D/C and reset pins and a delay
//! source that all feed one shared panel model. The model decodes the
//! command stream, keeps a mirror of panel GRAM, and records every
//! transaction so tests and the dry-run daemon can inspect what was sent.
//! Failures can be injected on chosen transactions.

use std::cell::RefCell;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType as PinErrorType, OutputPin};
use embedded_hal::spi::{self, ErrorKind, ErrorType as SpiErrorType, Operation, SpiDevice};

use super::protocol::Command;
use crate::{LCD_HEIGHT, LCD_WIDTH};

/// Error returned by an injected transfer failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

impl spi::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

#[derive(Debug)]
struct PanelState {
    width: u16,
    height: u16,
    gram: Vec<u16>,
    dc_data: bool,
    reset_high: bool,
    current: Option<u8>,
    params: Vec<u8>,
    log: Vec<(u8, Vec<u8>)>,
    columns: (u16, u16),
    pages: (u16, u16),
    cursor: (u16, u16),
    pending: Option<u8>,
    pixels_written: usize,
    transfer_sizes: Vec<usize>,
    attempts: usize,
    fail_at: Option<usize>,
    delays_ms: Vec<u32>,
}

impl PanelState {
    fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            gram: vec![0; width as usize * height as usize],
            dc_data: true,
            reset_high: false,
            current: None,
            params: Vec::new(),
            log: Vec::new(),
            columns: (0, width - 1),
            pages: (0, height - 1),
            cursor: (0, 0),
            pending: None,
            pixels_written: 0,
            transfer_sizes: Vec::new(),
            attempts: 0,
            fail_at: None,
            delays_ms: Vec::new(),
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if self.dc_data {
                self.data(byte);
            } else {
                self.command(byte);
            }
        }
    }

    fn command(&mut self, opcode: u8) {
        self.current = Some(opcode);
        self.params.clear();
        self.pending = None;
        if opcode == Command::WriteRam.opcode() {
            self.cursor = (self.columns.0, self.pages.0);
        }
        self.log.push((opcode, Vec::new()));
    }

    fn data(&mut self, byte: u8) {
        match self.current {
            Some(op) if op == Command::WriteRam.opcode() => self.pixel_byte(byte),
            Some(op) => {
                self.params.push(byte);
                if let Some((_, params)) = self.log.last_mut() {
                    params.push(byte);
                }
                if self.params.len() == 4 {
                    let start = u16::from_be_bytes([self.params[0], self.params[1]]);
                    let end = u16::from_be_bytes([self.params[2], self.params[3]]);
                    if op == Command::ColumnAddr.opcode() {
                        self.columns = (start, end);
                    } else if op == Command::PageAddr.opcode() {
                        self.pages = (start, end);
                    }
                }
            }
            None => {}
        }
    }

    fn pixel_byte(&mut self, byte: u8) {
        let Some(hi) = self.pending.take() else {
            self.pending = Some(byte);
            return;
        };
        let color = u16::from_be_bytes([hi, byte]);
        let (x, y) = self.cursor;
        if x < self.width && y < self.height {
            self.gram[y as usize * self.width as usize + x as usize] = color;
        }
        self.pixels_written += 1;

        self.cursor = if x >= self.columns.1 {
            (self.columns.0, y + 1)
        } else {
            (x + 1, y)
        };
    }
}

/// Shared handle to the simulated panel.
#[derive(Clone)]
pub struct SimulatedPanel {
    state: Rc<RefCell<PanelState>>,
}

impl Default for SimulatedPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedPanel {
    /// Creates a panel with the ILI9341 geometry.
    pub fn new() -> Self {
        Self::with_dimensions(LCD_WIDTH, LCD_HEIGHT)
    }

    /// Creates a panel with custom dimensions.
    pub fn with_dimensions(width: u16, height: u16) -> Self {
        Self {
            state: Rc::new(RefCell::new(PanelState::new(width, height))),
        }
    }

    /// SPI device feeding this panel.
    pub fn spi(&self) -> SimSpi {
        SimSpi {
            state: Rc::clone(&self.state),
        }
    }

    /// Data/command select pin.
    pub fn dc_pin(&self) -> SimPin {
        SimPin {
            state: Rc::clone(&self.state),
            role: PinRole::DataCommand,
        }
    }

    /// Reset pin.
    pub fn reset_pin(&self) -> SimPin {
        SimPin {
            state: Rc::clone(&self.state),
            role: PinRole::Reset,
        }
    }

    /// Delay source that records requested waits.
    pub fn delay(&self) -> SimDelay {
        SimDelay {
            state: Rc::clone(&self.state),
        }
    }

    /// Makes the next SPI transaction fail.
    pub fn fail_next_transfer(&self) {
        self.fail_after(0);
    }

    /// Lets `successful` transactions through, then fails one.
    pub fn fail_after(&self, successful: usize) {
        let mut state = self.state.borrow_mut();
        state.fail_at = Some(state.attempts + successful);
    }

    /// Commands received so far with their parameter bytes.
    ///
    /// Pixel data after WRITE_RAM is not included.
    pub fn command_log(&self) -> Vec<(u8, Vec<u8>)> {
        self.state.borrow().log.clone()
    }

    /// Number of successful SPI transactions.
    pub fn transactions(&self) -> usize {
        self.state.borrow().transfer_sizes.len()
    }

    /// Byte count of every successful SPI transaction.
    pub fn transfer_sizes(&self) -> Vec<usize> {
        self.state.borrow().transfer_sizes.clone()
    }

    /// Pixels streamed into GRAM.
    pub fn pixels_written(&self) -> usize {
        self.state.borrow().pixels_written
    }

    /// Waits requested through the delay source, in milliseconds.
    pub fn delays_ms(&self) -> Vec<u32> {
        self.state.borrow().delays_ms.clone()
    }

    /// Whether the D/C line is in data mode.
    pub fn dc_is_data(&self) -> bool {
        self.state.borrow().dc_data
    }

    /// Whether the reset line is released.
    pub fn reset_is_high(&self) -> bool {
        self.state.borrow().reset_high
    }

    /// Native-order color stored in panel GRAM.
    pub fn gram_pixel(&self, x: u16, y: u16) -> Option<u16> {
        let state = self.state.borrow();
        if x < state.width && y < state.height {
            Some(state.gram[y as usize * state.width as usize + x as usize])
        } else {
            None
        }
    }

    /// Clears recorded traffic, keeping GRAM contents.
    pub fn clear_log(&self) {
        let mut state = self.state.borrow_mut();
        state.log.clear();
        state.transfer_sizes.clear();
        state.pixels_written = 0;
        state.delays_ms.clear();
    }
}

/// SPI device side of [`SimulatedPanel`].
pub struct SimSpi {
    state: Rc<RefCell<PanelState>>,
}

impl SpiErrorType for SimSpi {
    type Error = SimError;
}

impl SpiDevice<u8> for SimSpi {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), SimError> {
        let mut state = self.state.borrow_mut();
        let attempt = state.attempts;
        state.attempts += 1;
        if state.fail_at == Some(attempt) {
            state.fail_at = None;
            return Err(SimError);
        }

        let mut written = 0;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => {
                    state.write(bytes);
                    written += bytes.len();
                }
                Operation::Transfer(read, write) => {
                    state.write(write);
                    written += write.len();
                    read.fill(0);
                }
                Operation::TransferInPlace(buf) => {
                    state.write(buf);
                    written += buf.len();
                    buf.fill(0);
                }
                Operation::Read(buf) => buf.fill(0),
                Operation::DelayNs(_) => {}
            }
        }
        state.transfer_sizes.push(written);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum PinRole {
    DataCommand,
    Reset,
}

/// Control pin side of [`SimulatedPanel`].
pub struct SimPin {
    state: Rc<RefCell<PanelState>>,
    role: PinRole,
}

impl SimPin {
    fn set(&mut self, high: bool) {
        let mut state = self.state.borrow_mut();
        match self.role {
            PinRole::DataCommand => state.dc_data = high,
            PinRole::Reset => state.reset_high = high,
        }
    }
}

impl PinErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }
}

/// Delay side of [`SimulatedPanel`]. Returns immediately.
pub struct SimDelay {
    state: Rc<RefCell<PanelState>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.state.borrow_mut().delays_ms.push(ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_and_pixel_stream() {
        let panel = SimulatedPanel::with_dimensions(4, 4);
        let mut spi = panel.spi();
        let mut dc = panel.dc_pin();

        fn cmd(spi: &mut SimSpi, dc: &mut SimPin, op: u8, data: &[u8]) {
            dc.set_low().unwrap();
            spi.write(&[op]).unwrap();
            dc.set_high().unwrap();
            if !data.is_empty() {
                spi.write(data).unwrap();
            }
        }
        cmd(&mut spi, &mut dc, 0x2A, &[0, 1, 0, 2]);
        cmd(&mut spi, &mut dc, 0x2B, &[0, 1, 0, 2]);
        cmd(&mut spi, &mut dc, 0x2C, &[0xF8, 0x00, 0x07, 0xE0, 0x00, 0x1F, 0xFF, 0xFF]);

        assert_eq!(panel.gram_pixel(1, 1), Some(0xF800));
        assert_eq!(panel.gram_pixel(2, 1), Some(0x07E0));
        assert_eq!(panel.gram_pixel(1, 2), Some(0x001F));
        assert_eq!(panel.gram_pixel(2, 2), Some(0xFFFF));
        assert_eq!(panel.gram_pixel(0, 0), Some(0));
        assert_eq!(panel.pixels_written(), 4);
    }

    #[test]
    fn test_injected_failure_is_not_recorded() {
        let panel = SimulatedPanel::new();
        let mut spi = panel.spi();
        panel.fail_after(1);
        spi.write(&[0x00]).unwrap();
        assert!(spi.write(&[0x00]).is_err());
        spi.write(&[0x00]).unwrap();
        assert_eq!(panel.transactions(), 2);
    }
}
