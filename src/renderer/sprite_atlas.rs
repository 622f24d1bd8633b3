use image::RgbaImage;

use super::backend::{TextureBackend, TextureId};
use crate::error::GfxError;

// ── Sheets ───────────────────────────────────────────────────────────────────

/// One shared atlas texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextureSheet {
    pub texture: TextureId,
    pub width: u32,
    pub height: u32,
}

/// Where a sprite ended up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Placement {
    pub texture: TextureId,
    /// Top-left pixel inside `texture`.
    pub x: u32,
    pub y: u32,
    /// Index into the shared sheets, `None` for a dedicated texture.
    pub sheet: Option<usize>,
}

impl Placement {
    pub fn is_dedicated(&self) -> bool {
        self.sheet.is_none()
    }
}

/// Shelf cursor: next free position on sheet `sheet`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PackCursor {
    pub sheet: usize,
    pub x: u32,
    pub y: u32,
}

// ── SheetPacker ──────────────────────────────────────────────────────────────

/// Shelf packer over a fixed number of square sheets.
///
/// Rows are exactly one raster cell high. Sprites at least that tall do not
/// fit a row and get a texture of their own. Sheets are allocated the first
/// time the cursor reaches them; only the placed region is ever uploaded
/// afterwards.
pub struct SheetPacker {
    max_size: u32,
    max_sheets: usize,
    sheets: Vec<TextureSheet>,
    cursor: PackCursor,
}

impl SheetPacker {
    pub fn new(max_size: u32, max_sheets: usize) -> Self {
        Self { max_size, max_sheets, sheets: Vec::new(), cursor: PackCursor::default() }
    }

    /// Place `pixels` and upload them. `raster` is the row height and the
    /// oversized threshold.
    pub fn place<B: TextureBackend>(
        &mut self,
        backend: &mut B,
        pixels: &RgbaImage,
        raster: u32,
    ) -> Result<Placement, GfxError> {
        let (w, h) = pixels.dimensions();

        if h >= raster {
            let texture = backend.create_texture("sprite", w, h, pixels.as_raw());
            log::debug!("dedicated {w}x{h} texture {texture:?}");
            return Ok(Placement { texture, x: 0, y: 0, sheet: None });
        }

        let mut next = self.cursor;
        if next.x + w > self.max_size {
            next.x = 0;
            next.y += raster;
        }
        if next.y + raster > self.max_size {
            next = PackCursor { sheet: next.sheet + 1, x: 0, y: 0 };
            log::debug!("sheet {} full, moving to sheet {}", next.sheet - 1, next.sheet);
        }

        let texture = self.sheet_texture(backend, next.sheet)?;
        backend.update_region(texture, next.x, next.y, w, h, pixels.as_raw());

        let placement = Placement { texture, x: next.x, y: next.y, sheet: Some(next.sheet) };
        next.x += w;
        self.cursor = next;
        Ok(placement)
    }

    /// Texture of sheet `index`, allocating it (and any skipped before it)
    /// on first use.
    fn sheet_texture<B: TextureBackend>(&mut self, backend: &mut B, index: usize) -> Result<TextureId, GfxError> {
        if index >= self.max_sheets {
            return Err(GfxError::SheetsExhausted { max: self.max_sheets });
        }
        while self.sheets.len() <= index {
            let size = self.max_size;
            let zeroed = vec![0u8; size as usize * size as usize * 4];
            let label = format!("sheet{}", self.sheets.len());
            let texture = backend.create_texture(&label, size, size, &zeroed);
            log::info!("allocated {label} ({size}x{size}) as {texture:?}");
            self.sheets.push(TextureSheet { texture, width: size, height: size });
        }
        Ok(self.sheets[index].texture)
    }

    pub fn cursor(&self) -> PackCursor {
        self.cursor
    }

    /// Move the cursor back to a checkpoint taken with [`cursor`](Self::cursor).
    /// Allocated sheets are kept and written over.
    pub fn rewind(&mut self, cursor: PackCursor) {
        log::debug!("packer rewound to {cursor:?}");
        self.cursor = cursor;
    }

    pub fn sheets(&self) -> &[TextureSheet] {
        &self.sheets
    }

    pub fn max_size(&self) -> u32 {
        self.max_size
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;
    use crate::geometry::Rect;
    use crate::renderer::backend::MemoryBackend;

    fn sprite(w: u32, h: u32, fill: u8) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([fill, fill, fill, 255]))
    }

    fn rect(p: &Placement, img: &RgbaImage) -> Rect {
        Rect::new(p.x as i32, p.y as i32, img.width(), img.height())
    }

    // ── place() correctness ───────────────────────────────────────────────

    #[test]
    fn first_sprite_lands_at_origin_of_sheet_zero() {
        let mut backend = MemoryBackend::new(64);
        let mut packer = SheetPacker::new(64, 4);
        let p = packer.place(&mut backend, &sprite(10, 8, 1), 16).unwrap();
        assert_eq!((p.x, p.y, p.sheet), (0, 0, Some(0)));
        assert_eq!(packer.sheets().len(), 1);
    }

    #[test]
    fn sprites_fill_a_row_left_to_right() {
        let mut backend = MemoryBackend::new(64);
        let mut packer = SheetPacker::new(64, 4);
        let xs: Vec<u32> = (0..4)
            .map(|_| packer.place(&mut backend, &sprite(16, 8, 1), 16).unwrap().x)
            .collect();
        assert_eq!(xs, vec![0, 16, 32, 48]);
    }

    #[test]
    fn wraps_to_next_row_one_raster_down() {
        let mut backend = MemoryBackend::new(64);
        let mut packer = SheetPacker::new(64, 4);
        packer.place(&mut backend, &sprite(40, 4, 1), 16).unwrap();
        let p = packer.place(&mut backend, &sprite(40, 4, 1), 16).unwrap();
        assert_eq!((p.x, p.y), (0, 16), "row height is the raster, not the sprite");
    }

    #[test]
    fn exact_fit_does_not_wrap() {
        let mut backend = MemoryBackend::new(64);
        let mut packer = SheetPacker::new(64, 4);
        packer.place(&mut backend, &sprite(32, 4, 1), 16).unwrap();
        let p = packer.place(&mut backend, &sprite(32, 4, 1), 16).unwrap();
        assert_eq!((p.x, p.y), (32, 0));
    }

    #[test]
    fn moves_to_next_sheet_when_rows_run_out() {
        let mut backend = MemoryBackend::new(32);
        let mut packer = SheetPacker::new(32, 4);
        // Two rows of 16 per 32 px sheet, one 32 px sprite per row.
        for _ in 0..2 {
            packer.place(&mut backend, &sprite(32, 8, 1), 16).unwrap();
        }
        let p = packer.place(&mut backend, &sprite(32, 8, 1), 16).unwrap();
        assert_eq!((p.x, p.y, p.sheet), (0, 0, Some(1)));
        assert_eq!(packer.sheets().len(), 2);
    }

    #[test]
    fn partial_last_row_is_skipped() {
        // 40 px sheet, 16 px rows: a row starting at y=32 would spill over.
        let mut backend = MemoryBackend::new(40);
        let mut packer = SheetPacker::new(40, 4);
        packer.place(&mut backend, &sprite(40, 8, 1), 16).unwrap();
        packer.place(&mut backend, &sprite(40, 8, 1), 16).unwrap();
        let p = packer.place(&mut backend, &sprite(40, 8, 1), 16).unwrap();
        assert_eq!(p.sheet, Some(1));
    }

    #[test]
    fn oversized_sprite_gets_dedicated_texture() {
        let mut backend = MemoryBackend::new(64);
        let mut packer = SheetPacker::new(64, 4);
        let before = packer.cursor();
        let img = sprite(20, 16, 7);
        let p = packer.place(&mut backend, &img, 16).unwrap();
        assert!(p.is_dedicated());
        assert_eq!((p.x, p.y), (0, 0));
        assert_eq!(backend.texture(p.texture).unwrap(), &img);
        assert_eq!(packer.cursor(), before, "shared cursor untouched");
        assert!(packer.sheets().is_empty(), "no sheet allocated for oversized sprites");
    }

    #[test]
    fn running_out_of_sheets_is_fatal() {
        let mut backend = MemoryBackend::new(16);
        let mut packer = SheetPacker::new(16, 2);
        packer.place(&mut backend, &sprite(16, 4, 1), 16).unwrap();
        packer.place(&mut backend, &sprite(16, 4, 1), 16).unwrap();
        let err = packer.place(&mut backend, &sprite(16, 4, 1), 16).unwrap_err();
        assert!(matches!(err, GfxError::SheetsExhausted { max: 2 }), "{err}");
    }

    #[test]
    fn placements_never_overlap() {
        let mut backend = MemoryBackend::new(128);
        let mut packer = SheetPacker::new(128, 8);
        let mut placed: Vec<(Option<usize>, Rect)> = Vec::new();
        for i in 0..60u32 {
            let img = sprite(5 + (i * 7) % 27, 1 + i % 15, i as u8);
            let p = packer.place(&mut backend, &img, 16).unwrap();
            let r = rect(&p, &img);
            assert!(Rect::new(0, 0, 128, 128).contains(&r), "sprite {i} leaves its sheet: {r:?}");
            for (sheet, other) in &placed {
                assert!(
                    *sheet != p.sheet || !other.intersects(&r),
                    "sprite {i} at {r:?} overlaps {other:?} on sheet {sheet:?}"
                );
            }
            placed.push((p.sheet, r));
        }
    }

    #[test]
    fn upload_keeps_neighbours_intact() {
        let mut backend = MemoryBackend::new(64);
        let mut packer = SheetPacker::new(64, 4);
        let a = packer.place(&mut backend, &sprite(8, 8, 10), 16).unwrap();
        let b = packer.place(&mut backend, &sprite(8, 8, 20), 16).unwrap();
        let sheet = backend.texture(a.texture).unwrap();
        assert_eq!(sheet.get_pixel(a.x + 7, 7).0, [10, 10, 10, 255]);
        assert_eq!(sheet.get_pixel(b.x, 0).0, [20, 20, 20, 255]);
        assert_eq!(sheet.get_pixel(b.x + 8, 0).0, [0, 0, 0, 0], "untouched space stays zeroed");
        assert_eq!(sheet.get_pixel(0, 8).0, [0, 0, 0, 0], "rows below the sprite stay zeroed");
    }

    // ── Checkpoints ───────────────────────────────────────────────────────

    #[test]
    fn rewind_reuses_space_and_sheets() {
        let mut backend = MemoryBackend::new(32);
        let mut packer = SheetPacker::new(32, 4);
        packer.place(&mut backend, &sprite(32, 8, 1), 16).unwrap();
        let mark = packer.cursor();
        for _ in 0..3 {
            packer.place(&mut backend, &sprite(32, 8, 1), 16).unwrap();
        }
        assert_eq!(packer.sheets().len(), 2);

        packer.rewind(mark);
        let p = packer.place(&mut backend, &sprite(32, 8, 2), 16).unwrap();
        assert_eq!((p.x, p.y, p.sheet), (0, 16, Some(0)));

        packer.place(&mut backend, &sprite(32, 8, 2), 16).unwrap();
        assert_eq!(packer.sheets().len(), 2, "sheet 1 is reused, not reallocated");
        assert_eq!(backend.live_textures(), 2);
    }
}
