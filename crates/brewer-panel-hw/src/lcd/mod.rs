//! LCD display module.
//!
//! Provides control over the 240x320 RGB565 ILI9341 panel via SPI.

mod device;
mod transport;

pub mod framebuffer;
pub mod protocol;
pub mod sim;

pub use device::{Display, PanelDescriptor, TextDefaults, TransferStats};
pub use framebuffer::{
    colors, from_panel_order, parse_hex_color, rgb888_to_rgb565, to_panel_order, Framebuffer, Image,
    Region,
};
pub use protocol::{Command, InitStep};
pub use transport::Transport;
