//! RGB565 framebuffer and drawing primitives.
//!
//! Pixels are stored in panel byte order (big-endian in memory) so the
//! buffer can be streamed to the panel without conversion. All rectangles
//! are half-open: `(x1, y1)` is included, `(x2, y2)` is not.

use crate::{Error, Result, LCD_HEIGHT, LCD_WIDTH};

/// Total pixel count for the display.
pub const PIXEL_COUNT: usize = LCD_WIDTH as usize * LCD_HEIGHT as usize;

/// Common colors (native RGB565).
pub mod colors {
    pub const BLACK: u16 = 0x0000;
    pub const WHITE: u16 = 0xFFFF;
    pub const GRAY: u16 = 0x8410;
    pub const RED: u16 = 0xF800;
    pub const GREEN: u16 = 0x07E0;
    pub const BLUE: u16 = 0x001F;
}

/// Converts a native RGB565 color to the order the panel expects in memory.
#[inline]
pub fn to_panel_order(color: u16) -> u16 {
    u16::from_ne_bytes(color.to_be_bytes())
}

/// Converts a stored pixel back to a native RGB565 color.
#[inline]
pub fn from_panel_order(pixel: u16) -> u16 {
    u16::from_be_bytes(pixel.to_ne_bytes())
}

/// Read-only image in native RGB565 order.
#[derive(Debug, Clone, Copy)]
pub struct Image<'a> {
    width: u16,
    height: u16,
    data: &'a [u16],
}

impl<'a> Image<'a> {
    /// Wraps pixel data, checking it matches the dimensions.
    pub fn new(width: u16, height: u16, data: &'a [u16]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(Error::ImageSize {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Returns one row of pixels.
    pub fn row(&self, y: u16) -> &'a [u16] {
        let start = y as usize * self.width as usize;
        &self.data[start..start + self.width as usize]
    }
}

/// Validated half-open rectangle inside a framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x1: u16,
    pub y1: u16,
    pub x2: u16,
    pub y2: u16,
}

impl Region {
    pub fn width(&self) -> u16 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u16 {
        self.y2 - self.y1
    }

    pub fn is_empty(&self) -> bool {
        self.x1 == self.x2 || self.y1 == self.y2
    }

    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }
}

/// RGB565 framebuffer for the 240x320 display.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    /// Pixel data in panel byte order.
    data: Vec<u16>,
    /// Width of the framebuffer.
    width: u16,
    /// Height of the framebuffer.
    height: u16,
}

impl std::fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Framebuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Framebuffer {
    /// Creates a new framebuffer initialized to black.
    pub fn new() -> Self {
        Self::with_dimensions(LCD_WIDTH, LCD_HEIGHT)
    }

    /// Creates a framebuffer with custom dimensions.
    pub fn with_dimensions(width: u16, height: u16) -> Self {
        let size = width as usize * height as usize;
        Self {
            data: vec![0; size],
            width,
            height,
        }
    }

    /// Returns the width of the framebuffer.
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Returns the height of the framebuffer.
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Returns the raw pixel data in panel byte order.
    pub fn data(&self) -> &[u16] {
        &self.data
    }

    /// Returns the pixel data as the byte stream the panel expects.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    /// Maps a coordinate to its buffer index.
    #[inline]
    pub fn index(&self, x: u16, y: u16) -> Option<usize> {
        (x < self.width && y < self.height)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Gets the native color of a pixel.
    pub fn get_pixel(&self, x: u16, y: u16) -> Option<u16> {
        self.index(x, y).map(|i| from_panel_order(self.data[i]))
    }

    /// Sets a pixel to a native color.
    pub fn set_pixel(&mut self, x: u16, y: u16, color: u16) -> Result<()> {
        self.set_raw(x, y, to_panel_order(color))
    }

    /// Stores an already byte-order-corrected value.
    pub fn set_raw(&mut self, x: u16, y: u16, raw: u16) -> Result<()> {
        let idx = self.index(x, y).ok_or(Error::OutOfBounds {
            x1: x,
            y1: y,
            x2: x.saturating_add(1),
            y2: y.saturating_add(1),
            width: self.width,
            height: self.height,
        })?;
        self.data[idx] = raw;
        Ok(())
    }

    /// Checks a half-open rectangle against the buffer.
    pub fn region(&self, x1: u16, y1: u16, x2: u16, y2: u16) -> Result<Region> {
        if x2 > self.width || y2 > self.height {
            return Err(Error::OutOfBounds {
                x1,
                y1,
                x2,
                y2,
                width: self.width,
                height: self.height,
            });
        }
        if x1 > x2 || y1 > y2 {
            return Err(Error::InvertedRegion { x1, y1, x2, y2 });
        }
        Ok(Region { x1, y1, x2, y2 })
    }

    /// Returns the region covering the whole buffer.
    pub fn full_region(&self) -> Region {
        Region {
            x1: 0,
            y1: 0,
            x2: self.width,
            y2: self.height,
        }
    }

    /// Fills the entire buffer with a solid color.
    pub fn fill_all(&mut self, color: u16) {
        self.data.fill(to_panel_order(color));
    }

    /// Fills a rectangle with a solid color.
    pub fn fill_region(&mut self, x1: u16, y1: u16, x2: u16, y2: u16, color: u16) -> Result<()> {
        let region = self.region(x1, y1, x2, y2)?;
        self.fill(region, to_panel_order(color));
        Ok(())
    }

    fn fill(&mut self, region: Region, raw: u16) {
        for y in region.y1..region.y2 {
            let row = self.row_mut(y, region.x1, region.x2);
            row.fill(raw);
        }
    }

    fn row_mut(&mut self, y: u16, x1: u16, x2: u16) -> &mut [u16] {
        let base = y as usize * self.width as usize;
        &mut self.data[base + x1 as usize..base + x2 as usize]
    }

    fn row(&self, y: u16, x1: u16, x2: u16) -> &[u16] {
        let base = y as usize * self.width as usize;
        &self.data[base + x1 as usize..base + x2 as usize]
    }

    /// Copies an image with its top-left corner at `(x, y)`.
    pub fn blit_image(&mut self, x: u16, y: u16, image: &Image<'_>) -> Result<()> {
        let x2 = x as u32 + image.width() as u32;
        let y2 = y as u32 + image.height() as u32;
        if x2 > self.width as u32 || y2 > self.height as u32 {
            return Err(Error::OutOfBounds {
                x1: x,
                y1: y,
                x2: x2.min(u16::MAX as u32) as u16,
                y2: y2.min(u16::MAX as u32) as u16,
                width: self.width,
                height: self.height,
            });
        }

        for row in 0..image.height() {
            let dst = self.row_mut(y + row, x, x + image.width());
            for (px, &src) in dst.iter_mut().zip(image.row(row)) {
                *px = to_panel_order(src);
            }
        }
        Ok(())
    }

    /// Replaces the whole buffer with a screen-sized image.
    pub fn blit_full(&mut self, image: &Image<'_>) -> Result<()> {
        if image.width() != self.width || image.height() != self.height {
            return Err(Error::ImageSize {
                expected: self.data.len(),
                actual: image.width() as usize * image.height() as usize,
            });
        }
        self.blit_image(0, 0, image)
    }

    /// Draws a filled rectangle with a border of `thickness` pixels.
    ///
    /// The border must leave at least one interior pixel in each direction.
    #[allow(clippy::too_many_arguments)]
    pub fn frame(
        &mut self,
        x1: u16,
        y1: u16,
        x2: u16,
        y2: u16,
        thickness: u16,
        frame_color: u16,
        area_color: u16,
    ) -> Result<()> {
        let region = self.region(x1, y1, x2, y2)?;
        let shorter = region.width().min(region.height());
        let max = shorter.saturating_sub(1) / 2;
        if thickness == 0 || thickness > max {
            return Err(Error::InvalidThickness { thickness, max });
        }

        let frame_raw = to_panel_order(frame_color);
        self.fill(region, to_panel_order(area_color));

        // Top and bottom bands: paint one row, replicate it
        self.row_mut(y1, x1, x2).fill(frame_raw);
        let band = self.row_range(y1, x1, x2);
        for y in (y1 + 1..y1 + thickness).chain(y2 - thickness..y2) {
            let dst = self.row_range(y, x1, x2).start;
            self.data.copy_within(band.clone(), dst);
        }

        // Side bands: paint the first interior row, replicate it down
        let side_y = y1 + thickness;
        let side = self.row_mut(side_y, x1, x2);
        let len = side.len();
        side[..thickness as usize].fill(frame_raw);
        side[len - thickness as usize..].fill(frame_raw);
        let side_row = self.row_range(side_y, x1, x2);
        for y in side_y + 1..y2 - thickness {
            let dst = self.row_range(y, x1, x2).start;
            self.data.copy_within(side_row.clone(), dst);
        }
        Ok(())
    }

    fn row_range(&self, y: u16, x1: u16, x2: u16) -> std::ops::Range<usize> {
        let base = y as usize * self.width as usize;
        base + x1 as usize..base + x2 as usize
    }

    /// Packs a region into `out` as panel-order bytes, row after row.
    ///
    /// `out` is cleared first and must already have capacity for the region.
    pub fn pack_region(&self, region: Region, out: &mut Vec<u8>) {
        out.clear();
        for y in region.y1..region.y2 {
            out.extend_from_slice(bytemuck::cast_slice(self.row(y, region.x1, region.x2)));
        }
    }
}

/// Converts RGB888 to RGB565.
#[inline]
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    let r5 = (r >> 3) as u16;
    let g6 = (g >> 2) as u16;
    let b5 = (b >> 3) as u16;
    (r5 << 11) | (g6 << 5) | b5
}

/// Parses a hex color string to RGB565.
pub fn parse_hex_color(hex: &str) -> Option<u16> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
    let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
    let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
    Some(rgb888_to_rgb565(r, g, b))
}

#[cfg(test)]
mod tests {
    use super::colors::*;
    use super::*;

    fn small() -> Framebuffer {
        Framebuffer::with_dimensions(16, 12)
    }

    #[test]
    fn test_rgb565_conversion() {
        assert_eq!(rgb888_to_rgb565(255, 0, 0), 0xF800);
        assert_eq!(rgb888_to_rgb565(0, 255, 0), 0x07E0);
        assert_eq!(rgb888_to_rgb565(0, 0, 255), 0x001F);
        assert_eq!(rgb888_to_rgb565(255, 255, 255), 0xFFFF);
        assert_eq!(rgb888_to_rgb565(0, 0, 0), 0x0000);
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF0000"), Some(0xF800));
        assert_eq!(parse_hex_color("00FF00"), Some(0x07E0));
        assert_eq!(parse_hex_color("#000000"), Some(0x0000));
        assert_eq!(parse_hex_color("#FFFFFF"), Some(0xFFFF));
        assert_eq!(parse_hex_color("invalid"), None);
        // Six bytes but not six hex digits
        assert_eq!(parse_hex_color("aé123"), None);
        assert_eq!(parse_hex_color("#ff€0"), None);
        assert_eq!(parse_hex_color("+1+2+3"), None);
    }

    #[test]
    fn test_panel_byte_order() {
        let mut fb = small();
        fb.set_pixel(0, 0, 0xF81F).unwrap();
        assert_eq!(&fb.as_bytes()[..2], &[0xF8, 0x1F]);
        assert_eq!(fb.get_pixel(0, 0), Some(0xF81F));
        assert_eq!(from_panel_order(to_panel_order(0x1234)), 0x1234);
    }

    #[test]
    fn test_framebuffer_ops() {
        let mut fb = Framebuffer::new();
        assert_eq!(fb.width(), 240);
        assert_eq!(fb.height(), 320);
        assert_eq!(fb.data().len(), PIXEL_COUNT);

        fb.set_pixel(10, 20, RED).unwrap();
        assert_eq!(fb.get_pixel(10, 20), Some(RED));
        assert!(fb.set_pixel(240, 0, RED).is_err());
        assert_eq!(fb.get_pixel(0, 320), None);

        fb.fill_all(WHITE);
        assert_eq!(fb.get_pixel(0, 0), Some(WHITE));
        assert_eq!(fb.get_pixel(239, 319), Some(WHITE));
    }

    #[test]
    fn test_fill_region_only_touches_rectangle() {
        let mut fb = small();
        fb.fill_all(BLUE);
        fb.fill_region(3, 2, 7, 5, RED).unwrap();
        for y in 0..fb.height() {
            for x in 0..fb.width() {
                let inside = (3..7).contains(&x) && (2..5).contains(&y);
                let expected = if inside { RED } else { BLUE };
                assert_eq!(fb.get_pixel(x, y), Some(expected), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_fill_all_black_matches_fill_region() {
        let mut a = Framebuffer::new();
        let mut b = Framebuffer::new();
        a.fill_all(GREEN);
        b.fill_all(GREEN);
        a.fill_all(BLACK);
        b.fill_region(0, 0, 240, 320, BLACK).unwrap();
        assert!(a == b);
    }

    #[test]
    fn test_fill_region_rejects_without_mutation() {
        let mut fb = small();
        fb.fill_all(GREEN);
        let before = fb.clone();

        assert!(matches!(
            fb.fill_region(0, 0, 17, 4, RED),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            fb.fill_region(0, 0, 4, 13, RED),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            fb.fill_region(8, 0, 4, 4, RED),
            Err(Error::InvertedRegion { .. })
        ));
        assert!(matches!(
            fb.fill_region(0, 6, 4, 5, RED),
            Err(Error::InvertedRegion { .. })
        ));
        assert!(fb == before);

        // Empty rectangles are accepted and change nothing
        fb.fill_region(4, 4, 4, 9, RED).unwrap();
        assert!(fb == before);
    }

    #[test]
    fn test_blit_image() {
        let mut fb = small();
        let pixels = [RED, GREEN, BLUE, WHITE, GRAY, RED];
        let image = Image::new(3, 2, &pixels).unwrap();
        fb.blit_image(13, 10, &image).unwrap();
        assert_eq!(fb.get_pixel(13, 10), Some(RED));
        assert_eq!(fb.get_pixel(15, 10), Some(BLUE));
        assert_eq!(fb.get_pixel(13, 11), Some(WHITE));
        assert_eq!(fb.get_pixel(15, 11), Some(RED));
        assert_eq!(fb.get_pixel(12, 10), Some(BLACK));

        let before = fb.clone();
        assert!(fb.blit_image(14, 10, &image).is_err());
        assert!(fb.blit_image(0, 11, &image).is_err());
        assert!(fb == before);
    }

    #[test]
    fn test_image_size_checked() {
        let pixels = [0u16; 5];
        assert!(matches!(
            Image::new(3, 2, &pixels),
            Err(Error::ImageSize {
                expected: 6,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_blit_full_requires_screen_size() {
        let mut fb = small();
        let pixels = vec![GRAY; 16 * 12];
        let image = Image::new(16, 12, &pixels).unwrap();
        fb.blit_full(&image).unwrap();
        assert_eq!(fb.get_pixel(15, 11), Some(GRAY));

        let wrong = Image::new(12, 16, &pixels).unwrap();
        assert!(fb.blit_full(&wrong).is_err());
    }

    #[test]
    fn test_frame() {
        let mut fb = small();
        fb.frame(2, 1, 12, 9, 2, RED, WHITE).unwrap();
        for y in 0..fb.height() {
            for x in 0..fb.width() {
                let inside = (2..12).contains(&x) && (1..9).contains(&y);
                let border = inside && (x < 4 || x >= 10 || y < 3 || y >= 7);
                let expected = if border {
                    RED
                } else if inside {
                    WHITE
                } else {
                    BLACK
                };
                assert_eq!(fb.get_pixel(x, y), Some(expected), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_frame_rejects_bad_thickness() {
        let mut fb = small();
        let before = fb.clone();
        assert!(matches!(
            fb.frame(0, 0, 8, 6, 0, RED, WHITE),
            Err(Error::InvalidThickness { .. })
        ));
        // 6 rows cannot hold two 3-pixel bands and an interior
        assert!(matches!(
            fb.frame(0, 0, 8, 6, 3, RED, WHITE),
            Err(Error::InvalidThickness { thickness: 3, max: 2 })
        ));
        assert!(matches!(
            fb.frame(0, 0, 17, 6, 1, RED, WHITE),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(fb == before);
    }

    #[test]
    fn test_pack_region() {
        let mut fb = small();
        fb.set_pixel(1, 1, 0x1234).unwrap();
        fb.set_pixel(2, 2, 0xABCD).unwrap();
        let region = fb.region(1, 1, 3, 3).unwrap();
        let mut out = Vec::with_capacity(8);
        fb.pack_region(region, &mut out);
        assert_eq!(out, vec![0x12, 0x34, 0, 0, 0, 0, 0xAB, 0xCD]);
    }
}
