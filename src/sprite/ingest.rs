//! Offline authoring path: RGBA sprite sheets to 32-bit raw sprites.

use image::RgbaImage;

use super::{PixelData, RawSprite};
use crate::geometry::Rect;

/// Legacy 24-bit marker color for "transparent" in old sprite sheets.
pub const LEGACY_TRANSPARENT: u32 = 0xE7FFFF;

/// Pixels with less alpha than this count as transparent when cropping.
const MIN_VISIBLE_ALPHA: u32 = 2;

#[inline]
fn to_argb(px: [u8; 4]) -> u32 {
    let rgb = (px[0] as u32) << 16 | (px[1] as u32) << 8 | px[2] as u32;
    if rgb == LEGACY_TRANSPARENT {
        0
    } else {
        (px[3] as u32) << 24 | rgb
    }
}

/// Convert the `cell` area of `image` into a raw sprite cropped to its
/// visible pixels. The crop origin relative to the cell becomes the sprite
/// offset; a cell without visible pixels yields a zero-sized sprite.
pub fn sprite_from_rgba(image: &RgbaImage, cell: Rect) -> RawSprite {
    let x0 = cell.x.max(0) as u32;
    let y0 = cell.y.max(0) as u32;
    let x1 = (cell.right().max(0) as u32).min(image.width());
    let y1 = (cell.bottom().max(0) as u32).min(image.height());

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in y0..y1 {
        for x in x0..x1 {
            if to_argb(image.get_pixel(x, y).0) >> 24 < MIN_VISIBLE_ALPHA {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((l, t, r, b)) => (l.min(x), t.min(y), r.max(x), b.max(y)),
            });
        }
    }

    let Some((left, top, right, bottom)) = bounds else {
        return RawSprite::new(0, 0, PixelData::Argb32(Vec::new()));
    };

    let width = right - left + 1;
    let height = bottom - top + 1;
    let mut words = Vec::with_capacity((width * height) as usize);
    for y in top..=bottom {
        for x in left..=right {
            words.push(to_argb(image.get_pixel(x, y).0));
        }
    }

    RawSprite::new(width, height, PixelData::Argb32(words))
        .with_offset(left as i32 - cell.x, top as i32 - cell.y)
}

/// Full `cell_size` cells of a sprite sheet in row-major order.
pub fn split_cells(image: &RgbaImage, cell_size: u32) -> Vec<Rect> {
    if cell_size == 0 {
        return Vec::new();
    }
    let cols = image.width() / cell_size;
    let rows = image.height() / cell_size;
    (0..rows)
        .flat_map(|row| {
            (0..cols).map(move |col| {
                Rect::new((col * cell_size) as i32, (row * cell_size) as i32, cell_size, cell_size)
            })
        })
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
