//! Font loading and text rendering.

#![allow(dead_code)]

mod font;
mod text;

pub use font::{Font, FontAsset, FontError, FontSource, GlyphMetrics};
pub use text::{draw_text, TextStyle};
