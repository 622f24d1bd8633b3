use image::RgbaImage;

use pakgfx::config::GfxConfig;
use pakgfx::error::GfxError;
use pakgfx::geometry::Rect;
use pakgfx::renderer::GfxContext;
use pakgfx::renderer::backend::MemoryBackend;
use pakgfx::renderer::registry::ImageHandle;
use pakgfx::sprite::{PixelData, RawSprite};

// ── helpers ───────────────────────────────────────────────────────────────────

/// 128 px sheets, 16 px raster.
fn small_config() -> GfxConfig {
    GfxConfig {
        base_raster_width: 16,
        max_texture_size: 128,
        max_sheets: 4,
        ..GfxConfig::default()
    }
}

fn context(config: GfxConfig) -> GfxContext<MemoryBackend> {
    let backend = MemoryBackend::new(config.max_texture_size);
    GfxContext::new(config, backend).unwrap()
}

/// Solid 32-bit sprite.
fn solid(w: u32, h: u32, argb: u32) -> RawSprite {
    RawSprite::new(w, h, PixelData::Argb32(vec![argb; (w * h) as usize]))
}

fn placed_rect(ctx: &GfxContext<MemoryBackend>, h: ImageHandle) -> Rect {
    let info = ctx.sprite(h).unwrap();
    Rect::new(info.sheet_x as i32, info.sheet_y as i32, info.width, info.height)
}

// ── Registration ──────────────────────────────────────────────────────────────

#[test]
fn handles_are_dense_from_first() {
    let mut ctx = context(small_config());
    let a = ctx.register(&solid(4, 4, 0xFF00_0000)).unwrap();
    let b = ctx.register(&solid(4, 4, 0xFF00_0000)).unwrap();
    assert_eq!(a, ImageHandle::FIRST);
    assert_eq!(b, ImageHandle(2));
}

#[test]
fn zero_height_sprite_is_empty_and_takes_no_space() {
    let mut ctx = context(small_config());
    let cursor = ctx.packer().cursor();
    let h = ctx.register(&RawSprite::new(8, 0, PixelData::Argb32(Vec::new()))).unwrap();
    assert_eq!(h, ImageHandle::EMPTY);
    assert_eq!(ctx.image_count(), 0, "no pixel storage");
    assert!(ctx.packer().sheets().is_empty(), "no sheet allocated");
    assert_eq!(ctx.packer().cursor(), cursor);
    assert_eq!(ctx.backend().live_textures(), 0);
}

#[test]
fn malformed_sprite_does_not_stop_the_batch() {
    let mut ctx = context(small_config());
    let raws = vec![
        solid(4, 4, 0xFFFF_FFFF),
        RawSprite::new(4, 1, PixelData::Rle16(vec![0, 9, 1])),
        solid(4, 4, 0xFFFF_FFFF),
    ];
    let handles = ctx.register_all(&raws).unwrap();
    assert_eq!(handles, vec![ImageHandle(1), ImageHandle::EMPTY, ImageHandle(2)]);
}

#[test]
fn sprite_larger_than_a_texture_is_rejected() {
    let mut ctx = context(small_config());
    let h = ctx.register(&solid(200, 2, 0xFF00_0000)).unwrap();
    assert_eq!(h, ImageHandle::EMPTY);
}

#[test]
fn postprocess_runs_before_upload() {
    let mut ctx = context(small_config());
    let h = ctx
        .register_with(&solid(2, 2, 0xFF00_0000), |img: &mut RgbaImage| {
            img.put_pixel(1, 1, image::Rgba([1, 2, 3, 4]));
        })
        .unwrap();
    let info = ctx.sprite(h).unwrap();
    let sheet = ctx.backend().texture(info.texture).unwrap();
    assert_eq!(sheet.get_pixel(info.sheet_x + 1, info.sheet_y + 1).0, [1, 2, 3, 4]);
}

#[test]
fn postprocess_resize_sets_the_drawn_size() {
    let mut ctx = context(small_config());
    let h = ctx
        .register_with(&solid(2, 2, 0xFF00_0000).with_offset(1, 2), |img: &mut RgbaImage| {
            *img = RgbaImage::new(6, 3);
        })
        .unwrap();
    assert_eq!(ctx.base_offset(h), Some(Rect::new(1, 2, 6, 3)));

    let rect = placed_rect(&ctx, h);
    assert_eq!((rect.w, rect.h), (6, 3));
    assert!(Rect::new(0, 0, 128, 128).contains(&rect));
}

#[test]
fn image_table_overflow_is_fatal() {
    let mut ctx = context(GfxConfig { max_images: 3, ..small_config() });
    for _ in 0..3 {
        ctx.register(&solid(2, 2, 0xFF00_0000)).unwrap();
    }
    let err = ctx.register(&solid(2, 2, 0xFF00_0000)).unwrap_err();
    assert!(matches!(err, GfxError::ImageTableFull { max: 3 }), "{err}");
}

// ── Packing ───────────────────────────────────────────────────────────────────

#[test]
fn shared_sprites_go_left_to_right_without_overlap() {
    let mut ctx = context(small_config());
    let handles: Vec<ImageHandle> = (0..40)
        .map(|i| ctx.register(&solid(6 + i % 11, 3 + i % 12, 0xFF00_0000 | i)).unwrap())
        .collect();

    let rects: Vec<(u32, Rect)> = handles
        .iter()
        .map(|&h| (ctx.sprite(h).unwrap().texture.0, placed_rect(&ctx, h)))
        .collect();

    for (i, (tex, r)) in rects.iter().enumerate() {
        assert!(Rect::new(0, 0, 128, 128).contains(r), "sprite {i} outside its sheet");
        for (other_tex, other) in &rects[..i] {
            assert!(tex != other_tex || !r.intersects(other), "sprite {i} overlaps {other:?}");
        }
    }

    // Within the first row the x coordinates increase.
    let row0: Vec<i32> = rects.iter().filter(|(_, r)| r.y == 0).map(|(_, r)| r.x).collect();
    assert!(row0.windows(2).all(|w| w[0] < w[1]), "{row0:?}");
}

#[test]
fn neighbours_survive_later_uploads() {
    let mut ctx = context(small_config());
    let a = ctx.register(&solid(4, 4, 0xFFFF_0000)).unwrap();
    let _b = ctx.register(&solid(4, 4, 0xFF00_FF00)).unwrap();
    let info = ctx.sprite(a).unwrap();
    let sheet = ctx.backend().texture(info.texture).unwrap();
    assert_eq!(sheet.get_pixel(3, 3).0, [255, 0, 0, 255]);
    assert_eq!(sheet.get_pixel(4, 0).0, [0, 255, 0, 255]);
}

#[test]
fn tall_sprite_gets_its_own_texture() {
    let mut ctx = context(small_config());
    let h = ctx.register(&solid(8, 16, 0xFF12_3456)).unwrap();
    let info = ctx.sprite(h).unwrap();
    assert_eq!((info.sheet_x, info.sheet_y), (0, 0));
    let tex = ctx.backend().texture(info.texture).unwrap();
    assert_eq!(tex.dimensions(), (8, 16));
    assert!(ctx.packer().sheets().is_empty());
}

#[test]
fn running_out_of_sheets_is_fatal() {
    let mut ctx = context(GfxConfig { max_sheets: 1, ..small_config() });
    // 8 rows of one full-width sprite fill the only sheet.
    for _ in 0..8 {
        ctx.register(&solid(128, 4, 0xFF00_0000)).unwrap();
    }
    let err = ctx.register(&solid(128, 4, 0xFF00_0000)).unwrap_err();
    assert!(matches!(err, GfxError::SheetsExhausted { max: 1 }), "{err}");
}

// ── Bulk removal ──────────────────────────────────────────────────────────────

#[test]
fn free_all_above_rewinds_and_reuses_space() {
    let mut ctx = context(small_config());
    let keep = ctx.register(&solid(10, 4, 0xFF00_0000)).unwrap();
    let first_dropped = ctx.register(&solid(10, 4, 0xFF00_0000)).unwrap();
    let dropped_rect = placed_rect(&ctx, first_dropped);
    ctx.register(&solid(10, 4, 0xFF00_0000)).unwrap();
    ctx.register(&solid(8, 20, 0xFF00_0000)).unwrap(); // dedicated
    assert_eq!(ctx.backend().live_textures(), 2);

    ctx.free_all_images_above(first_dropped);
    assert_eq!(ctx.image_count(), 1);
    assert!(ctx.sprite(first_dropped).is_none());
    assert!(ctx.sprite(keep).is_some());
    assert_eq!(ctx.backend().live_textures(), 1, "dedicated texture destroyed");

    let again = ctx.register(&solid(10, 4, 0xFF00_0000)).unwrap();
    assert_eq!(again, first_dropped, "handles continue from the limit");
    assert_eq!(placed_rect(&ctx, again), dropped_rect, "space is reused");
}

#[test]
fn freeing_everything_starts_from_the_origin() {
    let mut ctx = context(small_config());
    for _ in 0..20 {
        ctx.register(&solid(30, 4, 0xFF00_0000)).unwrap();
    }
    ctx.free_all_images_above(ImageHandle::FIRST);
    assert_eq!(ctx.image_count(), 0);
    let h = ctx.register(&solid(30, 4, 0xFF00_0000)).unwrap();
    assert_eq!(h, ImageHandle::FIRST);
    let info = ctx.sprite(h).unwrap();
    assert_eq!((info.sheet_x, info.sheet_y), (0, 0));
    assert_eq!(info.texture, ctx.packer().sheets()[0].texture, "first sheet reused");
}

#[test]
fn base_offset_reports_authoring_offset() {
    let mut ctx = context(small_config());
    let h = ctx.register(&solid(4, 5, 0xFF00_0000).with_offset(-3, 7)).unwrap();
    assert_eq!(ctx.base_offset(h), Some(Rect::new(-3, 7, 4, 5)));
    assert_eq!(ctx.base_offset(ImageHandle(99)), None);
}
