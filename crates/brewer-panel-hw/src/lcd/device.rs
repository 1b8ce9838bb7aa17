//! ILI9341 display over SPI.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::SpiDevice;
use tracing::{debug, error, info, warn};

use super::framebuffer::{Framebuffer, Region};
use super::protocol::{
    build_window_params, chunk_plan, full_frame_chunks, Command, InitStep, BYTES_PER_PIXEL,
    FRAME_BYTES, INIT_SEQUENCE, MAX_TRANSACTION_BYTES, RESET_SETTLE_MS,
};
use super::transport::Transport;
use crate::{Error, Result, LCD_HEIGHT, LCD_MODEL, LCD_WIDTH};

/// Text rendering defaults recorded with the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextDefaults {
    pub direction: u16,
    pub fill: bool,
    pub fill_color: u16,
    pub underline: bool,
    pub underline_color: u16,
}

/// Static description of the attached panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelDescriptor {
    pub model: u16,
    pub width: u16,
    pub height: u16,
    /// Added to every column address.
    pub offset_x: u16,
    /// Added to every page address.
    pub offset_y: u16,
    /// Bus clock, for diagnostics only. The SPI device owns the real setting.
    pub spi_clock_hz: u32,
    pub queue_size: u8,
    pub text: TextDefaults,
}

impl Default for PanelDescriptor {
    fn default() -> Self {
        Self {
            model: LCD_MODEL,
            width: LCD_WIDTH,
            height: LCD_HEIGHT,
            offset_x: 0,
            offset_y: 0,
            spi_clock_hz: 60_000_000,
            queue_size: 7,
            text: TextDefaults::default(),
        }
    }
}

/// Bus traffic counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransferStats {
    /// Region sends started, full frames included.
    pub regions: usize,
    /// Pixel data transactions.
    pub chunks: usize,
    /// Pixel bytes transmitted.
    pub bytes: usize,
}

/// Display controller.
///
/// Owns the transport, the reset line, the framebuffer and the scratch
/// buffer used to pack sub-regions.
pub struct Display<SPI, DC, RST> {
    transport: Transport<SPI, DC>,
    rst: RST,
    descriptor: PanelDescriptor,
    framebuffer: Framebuffer,
    scratch: Vec<u8>,
    scratch_limit: usize,
    stats: TransferStats,
}

impl<SPI, DC, RST> Display<SPI, DC, RST>
where
    SPI: SpiDevice<u8>,
    DC: OutputPin,
    RST: OutputPin,
{
    /// Creates a display. The panel is not touched beyond setting D/C.
    pub fn new(spi: SPI, dc: DC, rst: RST, descriptor: PanelDescriptor) -> Result<Self> {
        let transport = Transport::new(spi, dc)?;
        let framebuffer = Framebuffer::with_dimensions(descriptor.width, descriptor.height);
        let scratch_limit = framebuffer.data().len() * BYTES_PER_PIXEL;
        Ok(Self {
            transport,
            rst,
            descriptor,
            framebuffer,
            scratch: Vec::new(),
            scratch_limit,
            stats: TransferStats::default(),
        })
    }

    /// Caps the scratch buffer used for sub-region sends.
    pub fn with_scratch_limit(mut self, limit: usize) -> Self {
        self.scratch_limit = limit;
        self
    }

    /// Releases reset and replays the initialization sequence.
    pub fn init(&mut self, delay: &mut impl DelayNs) -> Result<()> {
        self.rst.set_high().map_err(Error::pin)?;
        delay.delay_ms(RESET_SETTLE_MS);

        for step in INIT_SEQUENCE {
            match *step {
                InitStep::Command(command, params) => {
                    self.transport
                        .write_command(command, params)
                        .inspect_err(|e| error!("Init step {:?} failed: {}", command, e))?;
                }
                InitStep::Delay(ms) => delay.delay_ms(ms),
            }
        }

        info!(
            "Panel {:04X} initialized ({}x{}, offset {},{}, {} Hz, queue {})",
            self.descriptor.model,
            self.descriptor.width,
            self.descriptor.height,
            self.descriptor.offset_x,
            self.descriptor.offset_y,
            self.descriptor.spi_clock_hz,
            self.descriptor.queue_size
        );
        Ok(())
    }

    /// Returns the panel description.
    pub fn descriptor(&self) -> &PanelDescriptor {
        &self.descriptor
    }

    /// Returns the framebuffer.
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Returns the framebuffer for drawing.
    pub fn framebuffer_mut(&mut self) -> &mut Framebuffer {
        &mut self.framebuffer
    }

    /// Returns traffic counters since creation or the last reset.
    pub fn stats(&self) -> TransferStats {
        self.stats
    }

    /// Clears the traffic counters.
    pub fn reset_stats(&mut self) {
        self.stats = TransferStats::default();
    }

    /// Sets the panel address window to a half-open region and starts a
    /// memory write.
    fn set_window(&mut self, region: Region) -> Result<()> {
        let off_x = self.descriptor.offset_x;
        let off_y = self.descriptor.offset_y;
        let columns = build_window_params(
            region.x1.saturating_add(off_x),
            (region.x2 - 1).saturating_add(off_x),
        );
        let pages = build_window_params(
            region.y1.saturating_add(off_y),
            (region.y2 - 1).saturating_add(off_y),
        );

        self.transport.write_command(Command::ColumnAddr, &columns)?;
        self.transport.write_command(Command::PageAddr, &pages)?;
        self.transport.write_command(Command::WriteRam, &[])
    }

    /// Sends the whole framebuffer.
    pub fn send_entire_buffer(&mut self) -> Result<()> {
        let region = self.framebuffer.full_region();
        self.set_window(region)
            .inspect_err(|e| error!("Failed to set full-screen window: {}", e))?;

        let bytes = self.framebuffer.as_bytes();
        let chunks: Vec<_> = if bytes.len() == FRAME_BYTES {
            full_frame_chunks().collect()
        } else {
            chunk_plan(bytes.len(), MAX_TRANSACTION_BYTES)
        };

        for chunk in &chunks {
            self.transport
                .send(&bytes[chunk.clone()])
                .inspect_err(|e| error!("Full-frame chunk at byte {} failed: {}", chunk.start, e))?;
        }

        self.stats.regions += 1;
        self.stats.chunks += chunks.len();
        self.stats.bytes += bytes.len();
        debug!("Full redraw completed ({} chunks)", chunks.len());
        Ok(())
    }

    /// Sends the half-open rectangle `[x1, x2) x [y1, y2)` of the framebuffer.
    ///
    /// A full-screen rectangle takes the full-frame path. Anything smaller is
    /// packed into the scratch buffer first and split into transactions of at
    /// most [`MAX_TRANSACTION_BYTES`].
    pub fn send_region(&mut self, x1: u16, y1: u16, x2: u16, y2: u16) -> Result<()> {
        let region = self.framebuffer.region(x1, y1, x2, y2)?;
        if region.is_empty() {
            return Err(Error::EmptyRegion { x1, y1, x2, y2 });
        }
        if region == self.framebuffer.full_region() {
            return self.send_entire_buffer();
        }

        let requested = region.pixel_count() * BYTES_PER_PIXEL;
        self.reserve_scratch(requested)?;
        self.framebuffer.pack_region(region, &mut self.scratch);

        self.set_window(region)
            .inspect_err(|e| error!("Failed to set window for ({}, {})-({}, {}): {}", x1, y1, x2, y2, e))?;

        let chunks = chunk_plan(requested, MAX_TRANSACTION_BYTES);
        for chunk in &chunks {
            self.transport
                .send(&self.scratch[chunk.clone()])
                .inspect_err(|e| error!("Region chunk at byte {} failed: {}", chunk.start, e))?;
        }

        self.stats.regions += 1;
        self.stats.chunks += chunks.len();
        self.stats.bytes += requested;
        debug!(
            "Sent region ({}, {})-({}, {}): {} bytes in {} chunks",
            x1,
            y1,
            x2,
            y2,
            requested,
            chunks.len()
        );
        Ok(())
    }

    fn reserve_scratch(&mut self, requested: usize) -> Result<()> {
        if requested > self.scratch_limit {
            warn!(
                "Region needs {} bytes of scratch, limit is {}",
                requested, self.scratch_limit
            );
            return Err(Error::ScratchAllocation { requested });
        }
        self.scratch.clear();
        self.scratch.try_reserve(requested).map_err(|e| {
            warn!("Could not reserve {} bytes of scratch: {}", requested, e);
            Error::ScratchAllocation { requested }
        })
    }
}
