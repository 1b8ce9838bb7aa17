//! Anti-aliased text rendering from shade-strip fonts.

use brewer_panel_hw::lcd::colors::{BLACK, WHITE};
use brewer_panel_hw::{Error, Framebuffer, Result};
use heapless::Vec;
use tracing::warn;

use super::font::{Font, FontAsset, GlyphMetrics};

/// Longest text a single call can lay out.
pub const MAX_TEXT_LEN: usize = 32;

/// Text appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextStyle {
    /// RGB565 text color.
    pub color: u16,
    /// Columns between characters.
    pub spacing: u16,
    /// Give every digit the same cell width.
    pub normalize_digits: bool,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: WHITE,
            spacing: 2,
            normalize_digits: true,
        }
    }
}

/// Layout record for one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharInfo {
    pub glyph: GlyphMetrics,
    /// Columns the character occupies, padding included.
    pub cell: u16,
}

impl CharInfo {
    /// Blank columns before and after the glyph. The odd column goes first.
    fn padding(&self) -> (u16, u16) {
        let pad = self.cell - self.glyph.width;
        (pad / 2 + pad % 2, pad / 2)
    }
}

/// Measured text ready to paint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayout {
    pub chars: Vec<CharInfo, MAX_TEXT_LEN>,
    /// Width of the whole text box.
    pub width: u16,
}

/// Measures `text`. Unknown characters use '?' or, failing that, zero width.
pub fn layout(asset: &FontAsset, text: &str, style: &TextStyle) -> Result<TextLayout> {
    let len = text.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(Error::TextTooLong {
            len,
            capacity: MAX_TEXT_LEN,
        });
    }

    let mut chars = Vec::new();
    let mut width: u32 = 0;
    for ch in text.chars() {
        let glyph = asset
            .glyph(ch)
            .or_else(|| asset.glyph('?'))
            .unwrap_or_default();
        let cell = if style.normalize_digits && ch.is_ascii_digit() {
            glyph.width.max(asset.normalized_digit_width())
        } else {
            glyph.width
        };
        width += u32::from(cell);
        chars
            .push(CharInfo { glyph, cell })
            .map_err(|_| Error::TextTooLong {
                len,
                capacity: MAX_TEXT_LEN,
            })?;
    }
    width += u32::from(style.spacing) * (len.saturating_sub(1) as u32);

    Ok(TextLayout {
        chars,
        width: width.min(u32::from(u16::MAX)) as u16,
    })
}

/// Shade-weighted color for one text pixel, or `None` when the pixel stays
/// untouched.
///
/// Black text fades from white; any other color fades toward black.
pub fn blend(color: u16, shade: u8) -> Option<u16> {
    match shade {
        0 => None,
        255 => Some(color),
        s => {
            let (base, scale) = if color == BLACK {
                (WHITE, 1.0 - f64::from(s) / 255.0)
            } else {
                (color, f64::from(s) / 255.0)
            };
            let r = (f64::from((base >> 11) & 0x1F) * scale) as u16;
            let g = (f64::from((base >> 5) & 0x3F) * scale) as u16;
            let b = (f64::from(base & 0x1F) * scale) as u16;
            Some(((r << 11) & 0xF800) | ((g << 5) & 0x07E0) | (b & 0x001F))
        }
    }
}

/// Draws `text` horizontally centered on `x`, with its top row at `y`.
///
/// Nothing is painted if the font cannot be opened; the failure is logged
/// and the font retried on the next call. The text box must fit inside the
/// framebuffer.
pub fn draw_text(
    fb: &mut Framebuffer,
    font: &Font,
    text: &str,
    x: u16,
    y: u16,
    style: &TextStyle,
) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    let asset = match font.open() {
        Ok(asset) => asset,
        Err(e) => {
            warn!("Could not open font, skipping text {:?}: {}", text, e);
            return Ok(());
        }
    };

    let layout = layout(asset, text, style)?;
    let start = i32::from(x) - i32::from(layout.width / 2);
    let end = start + i32::from(layout.width);
    let bottom = u32::from(y) + u32::from(asset.height());
    if start < 0 || end > i32::from(fb.width()) || bottom > u32::from(fb.height()) {
        return Err(Error::OutOfBounds {
            x1: start.max(0) as u16,
            y1: y,
            x2: end.clamp(0, i32::from(u16::MAX)) as u16,
            y2: bottom.min(u32::from(u16::MAX)) as u16,
            width: fb.width(),
            height: fb.height(),
        });
    }

    let last = layout.chars.len() - 1;
    for row in 0..asset.height() {
        let mut cursor = start as u16;
        for (i, info) in layout.chars.iter().enumerate() {
            let (lead, trail) = info.padding();
            cursor += lead;
            for w in 0..info.glyph.width {
                let shade = asset.shade(row, usize::from(info.glyph.x_pos + w));
                if let Some(color) = blend(style.color, shade) {
                    fb.set_pixel(cursor + w, y + row, color)?;
                }
            }
            cursor += info.glyph.width + trail;
            if i != last {
                cursor += style.spacing;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::font::tests::test_asset;
    use brewer_panel_hw::lcd::colors::{BLUE, GRAY, RED};

    fn style(color: u16) -> TextStyle {
        TextStyle {
            color,
            spacing: 1,
            normalize_digits: true,
        }
    }

    #[test]
    fn test_blend_boundaries() {
        assert_eq!(blend(RED, 0), None);
        assert_eq!(blend(RED, 255), Some(RED));
        assert_eq!(blend(BLACK, 255), Some(BLACK));
        assert_eq!(blend(RED, 128), Some(0x7800));
        // Dark text: 31 * 0.498 = 15, 63 * 0.498 = 31
        assert_eq!(blend(BLACK, 128), Some(0x7BEF));
        assert_eq!(blend(WHITE, 1), Some(0x0000));
    }

    #[test]
    fn test_layout_width_and_padding() {
        let asset = test_asset();
        // '1' is padded to the 2-column digit cell
        let l = layout(&asset, "10A", &style(WHITE)).unwrap();
        assert_eq!(l.chars.len(), 3);
        assert_eq!(l.chars[0].cell, 2);
        assert_eq!(l.chars[0].padding(), (1, 0));
        assert_eq!(l.width, 2 + 2 + 4 + 2);

        let plain = TextStyle {
            normalize_digits: false,
            ..style(WHITE)
        };
        let l = layout(&asset, "10A", &plain).unwrap();
        assert_eq!(l.width, 1 + 2 + 4 + 2);
    }

    #[test]
    fn test_unknown_chars_fall_back() {
        let asset = test_asset();
        let l = layout(&asset, "~", &style(WHITE)).unwrap();
        assert_eq!(l.chars[0].glyph.x_pos, 3);
        assert_eq!(l.width, 3);
    }

    #[test]
    fn test_text_too_long() {
        let asset = test_asset();
        let text = "0".repeat(MAX_TEXT_LEN + 1);
        assert_eq!(
            layout(&asset, &text, &style(WHITE)),
            Err(Error::TextTooLong {
                len: 33,
                capacity: 32
            })
        );
        assert!(layout(&asset, &"0".repeat(MAX_TEXT_LEN), &style(WHITE)).is_ok());

        // Capacity counts characters, not bytes
        let full = layout(&asset, &"é".repeat(MAX_TEXT_LEN), &style(WHITE)).unwrap();
        assert_eq!(full.chars.len(), MAX_TEXT_LEN);
        assert!(full.chars.is_full());
        assert!(matches!(
            layout(&asset, &"é".repeat(MAX_TEXT_LEN + 1), &style(WHITE)),
            Err(Error::TextTooLong { len: 33, .. })
        ));
    }

    #[test]
    fn test_draw_text_centered() {
        let font = Font::from_asset(test_asset());
        let mut fb = Framebuffer::with_dimensions(20, 10);
        fb.fill_all(BLUE);
        // "A0" is 4 + 1 + 2 = 7 wide, so it starts at 10 - 3
        draw_text(&mut fb, &font, "A0", 10, 2, &style(RED)).unwrap();

        assert_eq!(fb.get_pixel(7, 2), Some(RED));
        assert_eq!(fb.get_pixel(8, 3), Some(BLUE));
        assert_eq!(fb.get_pixel(10, 4), Some(RED));
        // Spacing column
        assert_eq!(fb.get_pixel(11, 2), Some(BLUE));
        assert_eq!(fb.get_pixel(12, 2), Some(RED));
        assert_eq!(fb.get_pixel(13, 4), Some(RED));
        assert_eq!(fb.get_pixel(6, 2), Some(BLUE));
        assert_eq!(fb.get_pixel(14, 2), Some(BLUE));
        assert_eq!(fb.get_pixel(7, 5), Some(BLUE));
    }

    #[test]
    fn test_draw_text_blends_partial_shades() {
        let font = Font::from_asset(test_asset());
        let mut fb = Framebuffer::with_dimensions(20, 10);
        draw_text(&mut fb, &font, "?", 10, 0, &style(RED)).unwrap();
        // '?' is 3 wide starting at 9; only the middle column has ink
        assert_eq!(fb.get_pixel(9, 0), Some(BLACK));
        assert_eq!(fb.get_pixel(10, 0), Some(0x7800));
        assert_eq!(fb.get_pixel(11, 1), Some(BLACK));
    }

    #[test]
    fn test_draw_text_out_of_bounds_untouched() {
        let font = Font::from_asset(test_asset());
        let mut fb = Framebuffer::with_dimensions(20, 10);
        fb.fill_all(GRAY);
        let before = fb.clone();

        assert!(matches!(
            draw_text(&mut fb, &font, "AAAA", 2, 0, &style(RED)),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            draw_text(&mut fb, &font, "AAAA", 18, 0, &style(RED)),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            draw_text(&mut fb, &font, "A", 10, 8, &style(RED)),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(fb == before);
    }

    #[test]
    fn test_draw_text_empty_and_missing_font() {
        let mut fb = Framebuffer::with_dimensions(20, 10);
        let before = fb.clone();

        let font = Font::from_asset(test_asset());
        draw_text(&mut fb, &font, "", 10, 0, &style(RED)).unwrap();

        let missing = Font::from_path("/nonexistent/brewer-font.ttf", 16.0);
        draw_text(&mut fb, &missing, "10", 10, 0, &style(RED)).unwrap();
        assert!(fb == before);
    }
}
