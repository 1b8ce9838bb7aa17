//! Error types for the brewer panel hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when drawing into the framebuffer or talking to the panel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A transfer of zero bytes was requested.
    #[error("Tried to send 0 bytes to the panel")]
    EmptyTransfer,

    /// SPI bus transaction failed.
    #[error("SPI error: {0}")]
    Spi(embedded_hal::spi::ErrorKind),

    /// A control line (reset, data/command) could not be driven.
    #[error("Control pin error: {0}")]
    Pin(embedded_hal::digital::ErrorKind),

    /// Rectangle reaches outside the framebuffer.
    #[error("Area ({x1}, {y1})-({x2}, {y2}) outside screen bounds {width}x{height}")]
    OutOfBounds {
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        width: u16,
        height: u16,
    },

    /// Rectangle corners are swapped.
    #[error("Invalid buffer area ({x1}, {y1})-({x2}, {y2})")]
    InvertedRegion { x1: u16, y1: u16, x2: u16, y2: u16 },

    /// Rectangle covers no pixels where at least one is required.
    #[error("Area ({x1}, {y1})-({x2}, {y2}) is empty")]
    EmptyRegion { x1: u16, y1: u16, x2: u16, y2: u16 },

    /// Image pixel data does not match its declared dimensions, or the image
    /// does not fit the target area.
    #[error("Image size mismatch: expected {expected} pixels, got {actual}")]
    ImageSize { expected: usize, actual: usize },

    /// Text is longer than the layout scratch space.
    #[error("Text of {len} characters exceeds layout capacity of {capacity}")]
    TextTooLong { len: usize, capacity: usize },

    /// Frame border does not fit inside its rectangle.
    #[error("Frame thickness {thickness} invalid (must be 1..={max})")]
    InvalidThickness { thickness: u16, max: u16 },

    /// Scratch memory for a region send could not be obtained.
    #[error("Could not allocate {requested} bytes of scratch buffer")]
    ScratchAllocation { requested: usize },
}

impl Error {
    /// Wraps an SPI driver error.
    pub fn spi<E: embedded_hal::spi::Error>(e: E) -> Self {
        Self::Spi(e.kind())
    }

    /// Wraps a GPIO driver error.
    pub fn pin<E: embedded_hal::digital::Error>(e: E) -> Self {
        Self::Pin(e.kind())
    }
}
