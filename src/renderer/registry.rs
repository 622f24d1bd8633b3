use image::RgbaImage;

use super::backend::TextureId;
use super::sprite_atlas::{PackCursor, Placement};
use crate::error::GfxError;
use crate::geometry::Rect;
use crate::zoom::ZoomState;

/// Handle table entries are reserved this many at a time.
pub const GROWTH_BLOCK: usize = 512;

// ── ImageHandle ──────────────────────────────────────────────────────────────

/// Stable id of a registered image. Dense, starting at [`FIRST`](Self::FIRST).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageHandle(pub u32);

impl ImageHandle {
    /// Drawn as nothing. Returned for every rejected sprite.
    pub const EMPTY: Self = Self(0);
    pub const FIRST: Self = Self(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn is_empty(self) -> bool {
        self == Self::EMPTY
    }
}

// ── ImageDesc ────────────────────────────────────────────────────────────────

/// Everything known about one registered image.
#[derive(Debug)]
pub struct ImageDesc {
    /// Unzoomed offset and size.
    pub base: Rect,
    pub zoomable: bool,
    pub pixels: RgbaImage,
    pub placement: Placement,
    /// Packer cursor before this image was placed.
    pub checkpoint: PackCursor,
}

/// What the renderer needs to draw a handle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SpriteInfo {
    pub texture: TextureId,
    pub sheet_x: u32,
    pub sheet_y: u32,
    pub width: u32,
    pub height: u32,
}

// ── ImageRegistry ────────────────────────────────────────────────────────────

/// Owns the pixels and metadata of every registered image.
///
/// Slot 0 is the [`ImageHandle::EMPTY`] placeholder and never holds data,
/// so a handle is its own index into the table.
#[derive(Debug)]
pub struct ImageRegistry {
    images: Vec<Option<ImageDesc>>,
    max_images: usize,
}

impl ImageRegistry {
    pub fn new(max_images: usize) -> Self {
        let mut images = Vec::with_capacity(GROWTH_BLOCK);
        images.push(None);
        Self { images, max_images }
    }

    /// Handle the next successful registration will receive.
    pub fn next_handle(&self) -> ImageHandle {
        ImageHandle(self.images.len() as u32)
    }

    /// Store `desc` under the next handle. Fails once the table would exceed
    /// `max_images`; nothing is stored then.
    pub fn insert(&mut self, desc: ImageDesc) -> Result<ImageHandle, GfxError> {
        let handle = self.next_handle();
        if handle.index() > self.max_images {
            return Err(GfxError::ImageTableFull { max: self.max_images });
        }
        if self.images.len() == self.images.capacity() {
            self.images.reserve_exact(GROWTH_BLOCK);
            log::debug!("image table grown to {} slots", self.images.capacity());
        }
        self.images.push(Some(desc));
        Ok(handle)
    }

    pub fn get(&self, handle: ImageHandle) -> Option<&ImageDesc> {
        self.images.get(handle.index())?.as_ref()
    }

    /// Unzoomed offset and size.
    pub fn base_offset(&self, handle: ImageHandle) -> Option<Rect> {
        self.get(handle).map(|d| d.base)
    }

    /// Offset and size at the current zoom. Non-zoomable images report their
    /// base values.
    pub fn offset(&self, handle: ImageHandle, zoom: &ZoomState) -> Option<Rect> {
        let desc = self.get(handle)?;
        if !desc.zoomable {
            return Some(desc.base);
        }
        let b = desc.base;
        Some(Rect::new(
            zoom.scale(b.x),
            zoom.scale(b.y),
            zoom.scale(b.w as i32).max(0) as u32,
            zoom.scale(b.h as i32).max(0) as u32,
        ))
    }

    pub fn sprite(&self, handle: ImageHandle) -> Option<SpriteInfo> {
        self.get(handle).map(|d| SpriteInfo {
            texture: d.placement.texture,
            sheet_x: d.placement.x,
            sheet_y: d.placement.y,
            width: d.base.w,
            height: d.base.h,
        })
    }

    /// Registered images, the empty placeholder not counted.
    pub fn image_count(&self) -> usize {
        self.images.len() - 1
    }

    /// Drop every image with a handle `>= limit` and hand them back in
    /// handle order. `EMPTY` is never removed.
    pub fn truncate(&mut self, limit: ImageHandle) -> Vec<ImageDesc> {
        let keep = limit.index().max(ImageHandle::FIRST.index());
        if keep >= self.images.len() {
            return Vec::new();
        }
        self.images.drain(keep..).flatten().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ImageHandle, &ImageDesc)> {
        self.images
            .iter()
            .enumerate()
            .filter_map(|(i, d)| d.as_ref().map(|d| (ImageHandle(i as u32), d)))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
