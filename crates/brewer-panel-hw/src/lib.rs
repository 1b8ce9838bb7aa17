//! Brewer Panel Hardware Library
//!
//! Provides the framebuffer, drawing primitives and SPI transport for the
//! ILI9341 240x320 TFT panel on the coffee brewer controller.

pub mod error;
pub mod lcd;

pub use error::{Error, Result};
pub use lcd::{Display, Framebuffer, Image, PanelDescriptor};

/// LCD display dimensions
pub const LCD_WIDTH: u16 = 240;
pub const LCD_HEIGHT: u16 = 320;

/// Panel model identifier.
pub const LCD_MODEL: u16 = 0x9341;
