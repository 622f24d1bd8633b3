use std::collections::HashMap;

use image::RgbaImage;
use serde::Deserialize;

use super::text::{FontMetrics, GlyphSource, RasterizedGlyph};
use crate::error::FontError;

#[derive(Clone, Copy, Debug, Deserialize)]
struct AtlasEntry {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// [`GlyphSource`] backed by a pre-rendered glyph sheet.
///
/// The glyph map is **atlas JSON**: each key is a single character, each
/// value a pixel rectangle in the sheet:
///
/// ```json
/// { "A": { "x": 0, "y": 0, "w": 16, "h": 24 }, ... }
/// ```
///
/// Coverage is alpha times brightness, so both white-on-transparent and
/// white-on-black sheets work. Glyphs are top aligned in their cells and
/// advance by their cell width.
pub struct BitmapFontSource {
    sheet: RgbaImage,
    glyphs: HashMap<u32, AtlasEntry>,
    line_height: u32,
}

impl BitmapFontSource {
    pub fn new(sheet: RgbaImage, glyph_map_json: &str) -> Result<Self, FontError> {
        let raw: HashMap<String, AtlasEntry> = serde_json::from_str(glyph_map_json)?;

        let glyphs: HashMap<u32, AtlasEntry> = raw
            .into_iter()
            .filter_map(|(key, entry)| {
                // Only accept single-character keys.
                let mut chars = key.chars();
                let ch = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Some((ch as u32, entry))
            })
            .collect();

        let line_height = glyphs.values().map(|e| e.h).max().unwrap_or(0);
        Ok(Self { sheet, glyphs, line_height })
    }

    /// Decode a PNG sheet and parse its glyph map.
    pub fn from_png(png_bytes: &[u8], glyph_map_json: &str) -> Result<Self, FontError> {
        let sheet = image::load_from_memory(png_bytes)?.to_rgba8();
        Self::new(sheet, glyph_map_json)
    }

    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

impl GlyphSource for BitmapFontSource {
    fn metrics(&self) -> FontMetrics {
        let h = self.line_height.min(i16::MAX as u32) as i16;
        FontMetrics { ascent: h, descent: 0, line_height: h as u16 }
    }

    fn rasterize(&mut self, code_point: u32) -> Option<RasterizedGlyph> {
        let e = *self.glyphs.get(&code_point)?;
        let w = e.w.min(self.sheet.width().saturating_sub(e.x));
        let h = e.h.min(self.sheet.height().saturating_sub(e.y));

        let mut coverage = Vec::with_capacity((w * h) as usize);
        for y in 0..h {
            for x in 0..w {
                let [r, g, b, a] = self.sheet.get_pixel(e.x + x, e.y + y).0;
                let bright = r.max(g).max(b) as u16;
                coverage.push((a as u16 * bright / 255) as u8);
            }
        }

        Some(RasterizedGlyph {
            width: w,
            height: h,
            coverage,
            advance: e.w.min(u16::MAX as u32) as u16,
            bearing: 0,
            bitmap_top: self.metrics().ascent,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
