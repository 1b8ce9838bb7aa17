//! Shade-strip font assets.
//!
//! A font asset is one wide grayscale strip: every raster line of every
//! glyph sits side by side, `stride` bytes per line, after a left margin of
//! `origin` columns. Glyphs are addressed by their column in the strip.
//! Strips are built from TTF data with fontdue, or supplied prebuilt.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use fontdue::FontSettings;
use thiserror::Error;
use tracing::{debug, info};

/// First character stored in rasterized strips.
const FIRST_CHAR: u8 = b' ';
/// Last character stored in rasterized strips.
const LAST_CHAR: u8 = b'~';

/// Errors raised while opening a font.
#[derive(Error, Debug)]
pub enum FontError {
    #[error("Failed to read font {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse font: {0}")]
    Parse(&'static str),

    #[error("Font has no horizontal metrics at {0}px")]
    NoLineMetrics(f32),

    #[error("Invalid font asset: {0}")]
    InvalidAsset(String),
}

/// Placement of one glyph inside the strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphMetrics {
    /// Column of the glyph's first pixel, relative to the strip origin.
    pub x_pos: u16,
    pub width: u16,
    /// Horizontal bearing of the outline within its cell.
    pub x_offset: i16,
}

/// Rasterized font in strip form.
#[derive(Debug, Clone)]
pub struct FontAsset {
    height: u16,
    stride: usize,
    origin: usize,
    first_char: u8,
    glyphs: Vec<GlyphMetrics>,
    bitmap: Vec<u8>,
    normalized_digit_width: u16,
}

impl FontAsset {
    /// Builds an asset from raw strip data.
    ///
    /// `glyphs[i]` describes character `first_char + i`. Every glyph must lie
    /// inside the strip.
    pub fn new(
        height: u16,
        stride: usize,
        origin: usize,
        first_char: u8,
        glyphs: Vec<GlyphMetrics>,
        bitmap: Vec<u8>,
    ) -> Result<Self, FontError> {
        if bitmap.len() < stride * height as usize {
            return Err(FontError::InvalidAsset(format!(
                "bitmap has {} bytes, {} rows of {} need {}",
                bitmap.len(),
                height,
                stride,
                stride * height as usize
            )));
        }
        if let Some((i, g)) = glyphs
            .iter()
            .enumerate()
            .find(|(_, g)| origin + g.x_pos as usize + g.width as usize > stride)
        {
            return Err(FontError::InvalidAsset(format!(
                "glyph {} at column {} (width {}) overruns stride {}",
                i, g.x_pos, g.width, stride
            )));
        }

        let mut asset = Self {
            height,
            stride,
            origin,
            first_char,
            glyphs,
            bitmap,
            normalized_digit_width: 0,
        };
        asset.normalized_digit_width = ('0'..='9')
            .filter_map(|c| asset.glyph(c))
            .map(|g| g.width)
            .max()
            .unwrap_or(0);
        Ok(asset)
    }

    /// Rasterizes printable ASCII from TTF/OTF data at `size` pixels.
    pub fn from_ttf(data: &[u8], size: f32) -> Result<Self, FontError> {
        let font =
            fontdue::Font::from_bytes(data, FontSettings::default()).map_err(FontError::Parse)?;
        let line = font
            .horizontal_line_metrics(size)
            .ok_or(FontError::NoLineMetrics(size))?;
        let ascent = line.ascent.ceil() as i32;
        let height = (line.ascent - line.descent).ceil().max(1.0) as usize;

        let rasterized: Vec<_> = (FIRST_CHAR..=LAST_CHAR)
            .map(|c| font.rasterize(c as char, size))
            .collect();

        let mut glyphs = Vec::with_capacity(rasterized.len());
        let mut x_pos = 0usize;
        for (metrics, _) in &rasterized {
            let ink = metrics.xmin.max(0) as usize + metrics.width;
            let width = ink.max(metrics.advance_width.round() as usize);
            glyphs.push(GlyphMetrics {
                x_pos: x_pos as u16,
                width: width as u16,
                x_offset: metrics.xmin as i16,
            });
            x_pos += width;
        }

        let stride = x_pos;
        let mut bitmap = vec![0u8; stride * height];
        for ((metrics, coverage), glyph) in rasterized.iter().zip(&glyphs) {
            // Rows measured down from the top of the line box
            let top = ascent - (metrics.ymin + metrics.height as i32);
            let left = glyph.x_pos as usize + metrics.xmin.max(0) as usize;
            for gy in 0..metrics.height {
                let row = top + gy as i32;
                if row < 0 || row as usize >= height {
                    continue;
                }
                let dst = row as usize * stride + left;
                let src = &coverage[gy * metrics.width..(gy + 1) * metrics.width];
                bitmap[dst..dst + metrics.width].copy_from_slice(src);
            }
        }

        debug!(
            "Rasterized {} glyphs at {}px into a {}x{} strip",
            glyphs.len(),
            size,
            stride,
            height
        );
        Self::new(height as u16, stride, 0, FIRST_CHAR, glyphs, bitmap)
    }

    /// Height of every glyph in raster lines.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Widest digit, used as the cell width for normalized digits.
    pub fn normalized_digit_width(&self) -> u16 {
        self.normalized_digit_width
    }

    /// Looks up a character's placement.
    pub fn glyph(&self, ch: char) -> Option<GlyphMetrics> {
        let code = u32::from(ch).checked_sub(u32::from(self.first_char))?;
        self.glyphs.get(code as usize).copied()
    }

    /// Shade at `row` and strip `column` (relative to the origin).
    pub fn shade(&self, row: u16, column: usize) -> u8 {
        self.bitmap
            .get(self.stride * row as usize + self.origin + column)
            .copied()
            .unwrap_or(0)
    }
}

/// Where a font comes from.
#[derive(Debug, Clone)]
pub enum FontSource {
    /// TTF/OTF file rasterized at the given pixel size.
    File { path: PathBuf, size: f32 },
    /// Ready-made strip.
    Asset(FontAsset),
}

impl FontSource {
    fn load(&self) -> Result<FontAsset, FontError> {
        match self {
            FontSource::File { path, size } => {
                let data = std::fs::read(path).map_err(|source| FontError::Io {
                    path: path.clone(),
                    source,
                })?;
                FontAsset::from_ttf(&data, *size)
            }
            FontSource::Asset(asset) => Ok(asset.clone()),
        }
    }
}

/// Lazily opened font. Once opened the asset is kept for the font's lifetime.
#[derive(Debug)]
pub struct Font {
    source: FontSource,
    asset: OnceLock<FontAsset>,
}

impl Font {
    pub fn new(source: FontSource) -> Self {
        Self {
            source,
            asset: OnceLock::new(),
        }
    }

    /// Font read from a file on first use.
    pub fn from_path(path: impl AsRef<Path>, size: f32) -> Self {
        Self::new(FontSource::File {
            path: path.as_ref().to_path_buf(),
            size,
        })
    }

    /// Font wrapping a prebuilt asset.
    pub fn from_asset(asset: FontAsset) -> Self {
        Self::new(FontSource::Asset(asset))
    }

    /// Opens the font if needed. A failed open is retried on the next call.
    pub fn open(&self) -> Result<&FontAsset, FontError> {
        if let Some(asset) = self.asset.get() {
            return Ok(asset);
        }
        let asset = self.source.load()?;
        info!(
            "Opened font ({} px high, digit width {})",
            asset.height(),
            asset.normalized_digit_width()
        );
        Ok(self.asset.get_or_init(|| asset))
    }

    /// Whether the asset has been loaded.
    pub fn is_open(&self) -> bool {
        self.asset.get().is_some()
    }
}
