use std::collections::HashMap;
use std::io::Write;

use image::{Rgba, RgbaImage};

use pakgfx::config::GfxConfig;
use pakgfx::error::FontError;
use pakgfx::renderer::GfxContext;
use pakgfx::renderer::backend::MemoryBackend;
use pakgfx::renderer::bitmap_font::BitmapFontSource;
use pakgfx::renderer::text::*;

// ── helpers ───────────────────────────────────────────────────────────────────

/// Synthetic font: every listed code point is a solid `w × h` box.
struct BoxFont {
    glyphs: HashMap<u32, (u32, u32, u16)>,
}

impl BoxFont {
    /// Code points 0..=0x80 except space: 'n' advances 7 px, everything
    /// else 6 px.
    fn ascii() -> Self {
        let mut glyphs = HashMap::new();
        for cp in 0..=0x80u32 {
            if cp == ' ' as u32 {
                continue;
            }
            let advance = if cp == 'n' as u32 { 7 } else { 6 };
            glyphs.insert(cp, (advance as u32 - 1, 10, advance));
        }
        Self { glyphs }
    }

    fn with(mut self, cp: u32, w: u32, h: u32, advance: u16) -> Self {
        self.glyphs.insert(cp, (w, h, advance));
        self
    }

    fn without(mut self, cp: u32) -> Self {
        self.glyphs.remove(&cp);
        self
    }
}

impl GlyphSource for BoxFont {
    fn metrics(&self) -> FontMetrics {
        FontMetrics { ascent: 12, descent: -3, line_height: 16 }
    }

    fn rasterize(&mut self, code_point: u32) -> Option<RasterizedGlyph> {
        let &(width, height, advance) = self.glyphs.get(&code_point)?;
        Some(RasterizedGlyph {
            width,
            height,
            coverage: vec![128; (width * height) as usize],
            advance,
            bearing: 1,
            bitmap_top: 10,
        })
    }
}

fn load(source: &mut impl GlyphSource) -> Result<(Font, GfxContext<MemoryBackend>), FontError> {
    let config = GfxConfig { max_code_point: 0x30FF, ..GfxConfig::default() };
    let mut ctx = GfxContext::new(config, MemoryBackend::default()).unwrap();
    let font = ctx.load_font(source)?;
    Ok((font, ctx))
}

// ── Loading ───────────────────────────────────────────────────────────────────

#[test]
fn sixty_four_glyphs_is_a_load_failure() {
    let mut src = BoxFont { glyphs: (0x40..0x80).map(|cp| (cp, (4, 4, 5))).collect() };
    match load(&mut src) {
        Err(FontError::TooFewGlyphs { found, required }) => {
            assert_eq!(found, 0x40);
            assert_eq!(required, 0x80);
        }
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("font with 64 glyphs must not load"),
    }
}

#[test]
fn absent_glyphs_use_glyph_zero_metrics() {
    let mut src = BoxFont::ascii().with(0, 3, 9, 4).with(0x3050, 9, 11, 12);
    let (font, _) = load(&mut src).unwrap();

    for cp in [0x90u32, 0x2000, 0x304F, 0xFFFFF] {
        assert_eq!(font.advance(cp), 4, "advance of U+{cp:04X}");
        assert_eq!(font.width(cp), 3, "width of U+{cp:04X}");
        assert_eq!(font.height(cp), 9, "height of U+{cp:04X}");
    }
    assert_eq!(font.advance('A' as u32), 6);
}

#[test]
fn table_shrinks_to_last_bitmap() {
    let mut src = BoxFont::ascii().with(0x0400, 5, 5, 6);
    let (font, _) = load(&mut src).unwrap();
    assert_eq!(font.glyph_count(), 0x0401);
    assert!(font.raw_glyph(0x0401).is_none());
}

#[test]
fn missing_space_borrows_the_advance_of_n() {
    let (font, _) = load(&mut BoxFont::ascii()).unwrap();
    let space = font.raw_glyph(' ' as u32).unwrap();
    assert_eq!(space.advance, Some(7));
    assert_eq!((space.width, space.height), (0, 0));
    assert_eq!(space.sheet_index, None);
}

#[test]
fn missing_space_and_n_fall_back_to_glyph_zero() {
    let mut src = BoxFont::ascii().without('n' as u32).with(0, 2, 2, 3).with(0x81, 4, 4, 5);
    let (font, _) = load(&mut src).unwrap();
    assert_eq!(font.raw_glyph(' ' as u32).unwrap().advance, Some(3));
}

#[test]
fn ideographic_space_borrows_its_neighbour() {
    let mut src = BoxFont::ascii().with(0x3001, 4, 4, 14);
    let (font, _) = load(&mut src).unwrap();
    let ideo = font.raw_glyph(IDEOGRAPHIC_SPACE).unwrap();
    assert_eq!(ideo.advance, Some(14));
    assert_eq!((ideo.width, ideo.top), (0, 0));
}

#[test]
fn present_ideographic_space_is_kept() {
    let mut src = BoxFont::ascii().with(0x3000, 2, 2, 16).with(0x3001, 4, 4, 14);
    let (font, _) = load(&mut src).unwrap();
    assert_eq!(font.advance(IDEOGRAPHIC_SPACE), 16);
}

#[test]
fn top_is_measured_from_the_ascent_line() {
    let (font, _) = load(&mut BoxFont::ascii()).unwrap();
    assert_eq!(font.top('A' as u32), 12 - 10);
    assert_eq!(font.bearing('A' as u32), 1);
}

// ── Atlas ─────────────────────────────────────────────────────────────────────

#[test]
fn glyphs_are_laid_out_in_assignment_order() {
    let (font, _) = load(&mut BoxFont::ascii()).unwrap();
    // Code points 0..0x20 all have bitmaps, space does not.
    assert_eq!(font.glyph(0).sheet_index, Some(0));
    assert_eq!(font.glyph(0x1F).sheet_index, Some(0x1F));
    assert_eq!(font.glyph('!' as u32).sheet_index, Some(0x20));
    assert_eq!(font.atlas_cell(0x20), (0, 32));
    assert_eq!(font.atlas_cell(33), (32, 32));
}

#[test]
fn atlas_is_white_with_gamma_corrected_coverage() {
    let (font, ctx) = load(&mut BoxFont::ascii()).unwrap();
    let atlas = ctx.backend().texture(font.texture()).unwrap();
    assert_eq!(atlas.dimensions(), font.atlas_size());
    assert_eq!(atlas.width(), 32 * 32);

    let (x, y) = font.atlas_cell(font.glyph('A' as u32).sheet_index.unwrap());
    assert_eq!(atlas.get_pixel(x, y).0, [255, 255, 255, gamma_table()[128]]);
    assert_eq!(atlas.get_pixel(x + 5, y).0[3], 0, "outside the 5 px bitmap");
}

#[test]
fn atlas_taller_than_a_texture_fails_to_load() {
    // 0x2001 bitmaps in rows of 32 need 257 rows of 32 px.
    let mut src = BoxFont { glyphs: (0..=0x2000).map(|cp| (cp, (4, 4, 5))).collect() };
    match load(&mut src) {
        Err(FontError::AtlasTooLarge { width, height, max }) => {
            assert_eq!((width, height, max), (1024, 257 * 32, 4096));
        }
        Err(e) => panic!("unexpected error {e}"),
        Ok(_) => panic!("atlas must not exceed the texture limit"),
    }
}

#[test]
fn oversized_glyph_is_clipped_to_its_cell() {
    let mut src = BoxFont::ascii().with(0x100, 40, 50, 41);
    let (font, _) = load(&mut src).unwrap();
    assert_eq!((font.width(0x100), font.height(0x100)), (32, 32));
    assert_eq!(font.advance(0x100), 41);
}

// ── Measuring and meshing ─────────────────────────────────────────────────────

#[test]
fn text_width_sums_advances_of_the_widest_line() {
    let (font, _) = load(&mut BoxFont::ascii()).unwrap();
    assert_eq!(font.text_width("nAn"), 7 + 6 + 7);
    assert_eq!(font.text_width("AA\nnnn"), 21);
    assert_eq!(font.text_width(""), 0);
}

#[test]
fn mesh_has_four_vertices_per_visible_glyph() {
    let (font, _) = load(&mut BoxFont::ascii()).unwrap();
    let (verts, idx) = generate_text_mesh("A B", &font, [10.0, 20.0]);
    assert_eq!(verts.len(), 8, "space has no quad");
    assert_eq!(idx, vec![0, 1, 2, 1, 3, 2, 4, 5, 6, 5, 7, 6]);

    // 'A' at pen x=10 with bearing 1 and top 2.
    assert_eq!(verts[0].position, [11.0, 22.0]);
    // 'B' after 'A' (6) and space (7).
    assert_eq!(verts[4].position, [10.0 + 13.0 + 1.0, 22.0]);
}

#[test]
fn mesh_newline_moves_down_one_line() {
    let (font, _) = load(&mut BoxFont::ascii()).unwrap();
    let (verts, _) = generate_text_mesh("A\nA", &font, [0.0, 0.0]);
    assert_eq!(verts[4].position[1] - verts[0].position[1], 16.0);
    assert_eq!(verts[4].position[0], verts[0].position[0]);
}

// ── Bitmap font source ────────────────────────────────────────────────────────

#[test]
fn bitmap_font_from_png_and_glyph_map() {
    // 16 columns x 8 rows of 8x8 cells, one per ASCII code point.
    let mut sheet = RgbaImage::new(128, 64);
    let mut map = serde_json::Map::new();
    for cp in 0u32..0x80 {
        let (cx, cy) = ((cp % 16) * 8, (cp / 16) * 8);
        sheet.put_pixel(cx, cy, Rgba([255, 255, 255, 255]));
        if let Some(ch) = char::from_u32(cp) {
            map.insert(ch.to_string(), serde_json::json!({ "x": cx, "y": cy, "w": 8, "h": 8 }));
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let png_path = dir.path().join("font.png");
    sheet.save(&png_path).unwrap();
    let mut json = tempfile::NamedTempFile::new_in(dir.path()).unwrap();
    write!(json, "{}", serde_json::Value::Object(map)).unwrap();

    let png = std::fs::read(&png_path).unwrap();
    let glyph_map = std::fs::read_to_string(json.path()).unwrap();
    let mut src = BitmapFontSource::from_png(&png, &glyph_map).unwrap();
    assert_eq!(src.glyph_count(), 0x80);

    let (font, ctx) = load(&mut src).unwrap();
    assert_eq!(font.advance('W' as u32), 8);
    assert_eq!(font.top('W' as u32), 0);
    let atlas = ctx.backend().texture(font.texture()).unwrap();
    let (x, y) = font.atlas_cell(font.glyph('W' as u32).sheet_index.unwrap());
    assert_eq!(atlas.get_pixel(x, y).0, [255, 255, 255, 255]);
    assert_eq!(atlas.get_pixel(x + 1, y).0[3], 0);
}
