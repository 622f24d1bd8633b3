use image::{Rgba, RgbaImage};

use super::backend::{TextureBackend, TextureId};
use crate::config::GfxConfig;
use crate::error::FontError;

/// A font with fewer glyphs than this is unusable.
pub const MIN_GLYPHS: usize = 0x80;
/// U+3000 IDEOGRAPHIC SPACE.
pub const IDEOGRAPHIC_SPACE: u32 = 0x3000;

/// Exponent of the coverage curve; thin strokes look too faint with
/// linear coverage.
const COVERAGE_GAMMA: f64 = 0.75;

// ── Vec2 / Vertex ─────────────────────────────────────────────────────────────

/// Screen-space 2D position `[x, y]` in pixels.
pub type Vec2 = [f32; 2];

/// A single vertex produced by [`generate_text_mesh`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// Screen-space position in pixels.
    pub position: [f32; 2],
    /// Normalised atlas texture coordinates in `[0, 1]`.
    pub tex_coords: [f32; 2],
}

// ── Glyph sources ─────────────────────────────────────────────────────────────

/// Vertical font metrics in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FontMetrics {
    /// Baseline distance from the top of the line.
    pub ascent: i16,
    /// Extent below the baseline, usually negative.
    pub descent: i16,
    pub line_height: u16,
}

/// One glyph as rendered by a font backend.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    /// Row-major 8-bit coverage, `width * height` bytes.
    pub coverage: Vec<u8>,
    pub advance: u16,
    pub bearing: i16,
    /// Height of the bitmap top above the baseline.
    pub bitmap_top: i16,
}

/// Anything that can render single code points into coverage bitmaps.
pub trait GlyphSource {
    fn metrics(&self) -> FontMetrics;

    /// Render `code_point`, or `None` when the font has no glyph for it.
    fn rasterize(&mut self, code_point: u32) -> Option<RasterizedGlyph>;
}

// ── Glyph ────────────────────────────────────────────────────────────────────

/// Metrics and atlas cell of one code point.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Glyph {
    pub width: u32,
    pub height: u32,
    /// `None` marks an absent glyph; lookups fall back to glyph 0.
    pub advance: Option<u16>,
    pub bearing: i16,
    /// Offset of the bitmap top below the ascent line.
    pub top: i16,
    /// Cell in the glyph atlas, `None` when there is no bitmap.
    pub sheet_index: Option<u32>,
}

impl Glyph {
    pub fn is_present(&self) -> bool {
        self.advance.is_some()
    }
}

/// `round((a / 255) ^ 0.75 * 255)` for every coverage value.
pub fn gamma_table() -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (a, out) in lut.iter_mut().enumerate() {
        *out = ((a as f64 / 255.0).powf(COVERAGE_GAMMA) * 255.0).round() as u8;
    }
    lut
}

// ── Font ─────────────────────────────────────────────────────────────────────

/// A rasterized font packed into one fixed-grid atlas texture.
pub struct Font {
    glyphs: Vec<Glyph>,
    metrics: FontMetrics,
    texture: TextureId,
    atlas_width: u32,
    atlas_height: u32,
    cell_size: u32,
    cells_per_row: u32,
}

impl Font {
    /// Rasterize every code point up to `config.max_code_point` and upload
    /// the glyph atlas.
    pub fn load<S: GlyphSource, B: TextureBackend>(
        source: &mut S,
        config: &GfxConfig,
        backend: &mut B,
    ) -> Result<Self, FontError> {
        let metrics = source.metrics();
        let lut = gamma_table();
        let cell_size = config.glyph_cell_size;
        let cells_per_row = config.glyph_cells_per_row;

        let mut glyphs = vec![Glyph::default(); config.max_code_point as usize + 1];
        let mut bitmaps: Vec<(usize, RasterizedGlyph)> = Vec::new();
        let mut present = 0usize;

        for cp in 0..=config.max_code_point {
            let Some(mut r) = source.rasterize(cp) else { continue };
            present += 1;
            for a in r.coverage.iter_mut() {
                *a = lut[*a as usize];
            }
            glyphs[cp as usize] = Glyph {
                width: r.width,
                height: r.height,
                advance: Some(r.advance),
                bearing: r.bearing,
                top: metrics.ascent - r.bitmap_top,
                sheet_index: None,
            };
            if r.width > 0 && r.height > 0 {
                bitmaps.push((cp as usize, r));
            }
        }

        if present < MIN_GLYPHS {
            return Err(FontError::TooFewGlyphs { found: present, required: MIN_GLYPHS });
        }

        // Compatibility fixups for fonts missing common blanks.
        let ideo = IDEOGRAPHIC_SPACE as usize;
        if ideo + 1 < glyphs.len() && !glyphs[ideo].is_present() && glyphs[ideo + 1].is_present() {
            glyphs[ideo] = Glyph { advance: glyphs[ideo + 1].advance, ..Glyph::default() };
        }
        let space = ' ' as usize;
        if !glyphs[space].is_present() {
            let n = glyphs['n' as usize].advance.or(glyphs[0].advance);
            glyphs[space] = Glyph { advance: n, ..Glyph::default() };
        }

        let last_bitmap = bitmaps.last().map_or(0, |(cp, _)| *cp);
        glyphs.truncate(last_bitmap.max(space) + 1);

        // Grid layout in assignment order.
        let rows = (bitmaps.len() as u32).div_ceil(cells_per_row).max(1);
        let atlas_width = cell_size.saturating_mul(cells_per_row);
        let atlas_height = cell_size.saturating_mul(rows);
        let max = backend.max_texture_size();
        if atlas_width > max || atlas_height > max {
            return Err(FontError::AtlasTooLarge { width: atlas_width, height: atlas_height, max });
        }
        let mut atlas = RgbaImage::new(atlas_width, atlas_height);

        for (index, (cp, r)) in bitmaps.iter().enumerate() {
            let index = index as u32;
            let (cx, cy) = cell_origin(index, cell_size, cells_per_row);
            let w = r.width.min(cell_size);
            let h = r.height.min(cell_size);
            if w < r.width || h < r.height {
                log::warn!(
                    "glyph U+{cp:04X} is {}x{}, clipped to the {cell_size} px cell",
                    r.width,
                    r.height
                );
            }
            for y in 0..h {
                for x in 0..w {
                    let alpha = r.coverage.get((y * r.width + x) as usize).copied().unwrap_or(0);
                    atlas.put_pixel(cx + x, cy + y, Rgba([255, 255, 255, alpha]));
                }
            }
            let glyph = &mut glyphs[*cp];
            glyph.width = w;
            glyph.height = h;
            glyph.sheet_index = Some(index);
        }

        let texture = backend.create_texture("glyph_atlas", atlas_width, atlas_height, atlas.as_raw());
        log::info!(
            "font loaded: {present} glyphs ({} with bitmaps), {} code points, atlas {atlas_width}x{atlas_height}",
            bitmaps.len(),
            glyphs.len()
        );

        Ok(Self { glyphs, metrics, texture, atlas_width, atlas_height, cell_size, cells_per_row })
    }

    /// Glyph for `c`, or glyph 0 when `c` is absent or past the table.
    pub fn glyph(&self, c: u32) -> &Glyph {
        match self.glyphs.get(c as usize) {
            Some(g) if g.is_present() => g,
            _ => &self.glyphs[0],
        }
    }

    /// The stored entry for `c` without fallback.
    pub fn raw_glyph(&self, c: u32) -> Option<&Glyph> {
        self.glyphs.get(c as usize)
    }

    pub fn advance(&self, c: u32) -> u16 {
        self.glyph(c).advance.unwrap_or(0)
    }

    pub fn width(&self, c: u32) -> u32 {
        self.glyph(c).width
    }

    pub fn height(&self, c: u32) -> u32 {
        self.glyph(c).height
    }

    pub fn top(&self, c: u32) -> i16 {
        self.glyph(c).top
    }

    pub fn bearing(&self, c: u32) -> i16 {
        self.glyph(c).bearing
    }

    /// Pixel width of the widest line of `text`.
    pub fn text_width(&self, text: &str) -> u32 {
        text.split('\n')
            .map(|line| line.chars().map(|ch| self.advance(ch as u32) as u32).sum::<u32>())
            .max()
            .unwrap_or(0)
    }

    /// Top-left pixel of atlas cell `index`.
    pub fn atlas_cell(&self, index: u32) -> (u32, u32) {
        cell_origin(index, self.cell_size, self.cells_per_row)
    }

    /// Size of the glyph table after shrinking.
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn atlas_size(&self) -> (u32, u32) {
        (self.atlas_width, self.atlas_height)
    }
}

fn cell_origin(index: u32, cell_size: u32, cells_per_row: u32) -> (u32, u32) {
    ((index % cells_per_row) * cell_size, (index / cells_per_row) * cell_size)
}

// ── generate_text_mesh ────────────────────────────────────────────────────────

/// Convert `text` into a flat vertex + index buffer at the font's pixel size.
///
/// Each glyph with a bitmap produces 4 vertices and 6 indices (two
/// counter-clockwise triangles, Y down):
///
/// ```text
/// 0──1
/// │ /│
/// 2──3
/// triangles: (0,1,2) and (1,3,2)
/// ```
///
/// `'\n'` returns to `start_pos.x` one line height lower. Blank glyphs only
/// advance the cursor.
pub fn generate_text_mesh(text: &str, font: &Font, start_pos: Vec2) -> (Vec<Vertex>, Vec<u32>) {
    let tw = font.atlas_width as f32;
    let th = font.atlas_height as f32;

    let mut vertices: Vec<Vertex> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();

    let mut current_x = start_pos[0];
    let mut current_y = start_pos[1];

    for ch in text.chars() {
        if ch == '\n' {
            current_x = start_pos[0];
            current_y += font.metrics.line_height as f32;
            continue;
        }

        let glyph = font.glyph(ch as u32);
        if let Some(cell) = glyph.sheet_index {
            let (ax, ay) = font.atlas_cell(cell);
            let quad_x = current_x + glyph.bearing as f32;
            let quad_y = current_y + glyph.top as f32;
            let quad_w = glyph.width as f32;
            let quad_h = glyph.height as f32;

            let uv_x0 = ax as f32 / tw;
            let uv_y0 = ay as f32 / th;
            let uv_x1 = (ax + glyph.width) as f32 / tw;
            let uv_y1 = (ay + glyph.height) as f32 / th;

            let base = vertices.len() as u32;

            vertices.push(Vertex { position: [quad_x,          quad_y         ], tex_coords: [uv_x0, uv_y0] });
            vertices.push(Vertex { position: [quad_x + quad_w, quad_y         ], tex_coords: [uv_x1, uv_y0] });
            vertices.push(Vertex { position: [quad_x,          quad_y + quad_h], tex_coords: [uv_x0, uv_y1] });
            vertices.push(Vertex { position: [quad_x + quad_w, quad_y + quad_h], tex_coords: [uv_x1, uv_y1] });

            indices.extend_from_slice(&[base, base + 1, base + 2, base + 1, base + 3, base + 2]);
        }

        current_x += glyph.advance.unwrap_or(0) as f32;
    }

    (vertices, indices)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gamma_table_endpoints() {
        let lut = gamma_table();
        assert_eq!(lut[0], 0);
        assert_eq!(lut[255], 255);
    }

    #[test]
    fn gamma_brightens_midtones() {
        let lut = gamma_table();
        // (128/255)^0.75 * 255 = 152.0…
        assert_eq!(lut[128], 152);
        assert!(lut.windows(2).all(|w| w[0] <= w[1]), "table is monotonic");
    }

    #[test]
    fn cells_fill_rows_of_the_grid() {
        assert_eq!(cell_origin(0, 32, 32), (0, 0));
        assert_eq!(cell_origin(31, 32, 32), (31 * 32, 0));
        assert_eq!(cell_origin(33, 32, 32), (32, 32));
    }
}
