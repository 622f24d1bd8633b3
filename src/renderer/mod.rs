pub mod backend;
pub mod bitmap_font;
pub mod quad;
pub mod registry;
pub mod sprite_atlas;
pub mod text;
pub mod wgpu_backend;

use image::RgbaImage;
use rayon::prelude::*;

use backend::TextureBackend;
use quad::{DrawMode, SpriteQuad};
use registry::{ImageDesc, ImageHandle, ImageRegistry, SpriteInfo};
use sprite_atlas::SheetPacker;
use text::{Font, GlyphSource};

use crate::config::GfxConfig;
use crate::error::{DecodeError, FontError, GfxError};
use crate::geometry::Rect;
use crate::palette::Palette;
use crate::sprite::{self, RawSprite};
use crate::zoom::ZoomState;

/// Owns everything between raw sprites and GPU textures: palette, zoom,
/// image table, sheet packer and the texture backend.
///
/// Mutation happens on the thread that owns the backend; only decoding in
/// [`register_all`](Self::register_all) fans out to worker threads.
pub struct GfxContext<B: TextureBackend> {
    config: GfxConfig,
    palette: Palette,
    zoom: ZoomState,
    registry: ImageRegistry,
    packer: SheetPacker,
    backend: B,
}

impl<B: TextureBackend> GfxContext<B> {
    pub fn new(mut config: GfxConfig, backend: B) -> Result<Self, GfxError> {
        config.clamp_texture_size(backend.max_texture_size());
        config.validate()?;

        let zoom = ZoomState::new(config.zoom_table.clone(), config.zoom_level, config.base_raster_width);
        let registry = ImageRegistry::new(config.max_images);
        let packer = SheetPacker::new(config.max_texture_size, config.max_sheets);
        log::info!(
            "gfx context: raster {} px, sheets {}x{} (max {}), up to {} images",
            config.base_raster_width,
            config.max_texture_size,
            config.max_texture_size,
            config.max_sheets,
            config.max_images
        );

        Ok(Self { config, palette: Palette::new(), zoom, registry, packer, backend })
    }

    // ── Registration ─────────────────────────────────────────────────────

    /// Decode, place and store a sprite.
    ///
    /// Bad sprites are logged and yield [`ImageHandle::EMPTY`]; only
    /// exhausted sheets or handles are errors.
    pub fn register(&mut self, raw: &RawSprite) -> Result<ImageHandle, GfxError> {
        self.register_with(raw, |_| {})
    }

    /// [`register`](Self::register) with a hook that edits the decoded
    /// pixels before they are uploaded.
    pub fn register_with<F>(&mut self, raw: &RawSprite, postprocess: F) -> Result<ImageHandle, GfxError>
    where
        F: FnOnce(&mut RgbaImage),
    {
        if let Some(reason) = self.rejection(raw) {
            return Ok(self.reject(&reason));
        }
        match sprite::decode(raw, &self.palette) {
            Ok(pixels) => self.store(raw, pixels, postprocess),
            Err(e) => Ok(self.reject(&e.to_string())),
        }
    }

    /// Register a batch, decoding in parallel. Handles come back in input
    /// order.
    pub fn register_all(&mut self, raws: &[RawSprite]) -> Result<Vec<ImageHandle>, GfxError> {
        let checks: Vec<Option<String>> = raws.iter().map(|raw| self.rejection(raw)).collect();
        let palette = &self.palette;
        let decoded: Vec<Result<RgbaImage, String>> = raws
            .par_iter()
            .zip(checks.par_iter())
            .map(|(raw, check)| match check {
                Some(reason) => Err(reason.clone()),
                None => sprite::decode(raw, palette).map_err(|e: DecodeError| e.to_string()),
            })
            .collect();

        let mut handles = Vec::with_capacity(raws.len());
        for (raw, result) in raws.iter().zip(decoded) {
            let handle = match result {
                Ok(pixels) => self.store(raw, pixels, |_| {})?,
                Err(reason) => self.reject(&reason),
            };
            handles.push(handle);
        }
        Ok(handles)
    }

    fn rejection(&self, raw: &RawSprite) -> Option<String> {
        let max = self.config.max_texture_size;
        if raw.is_empty() {
            Some(format!("empty image ({}x{}, {} words)", raw.width, raw.height, raw.data.len()))
        } else if raw.width > max || raw.height > max {
            Some(format!("{}x{} exceeds the {max} px texture limit", raw.width, raw.height))
        } else {
            None
        }
    }

    fn reject(&self, reason: &str) -> ImageHandle {
        log::warn!("image {}: {reason}; registered as empty", self.registry.next_handle().0);
        ImageHandle::EMPTY
    }

    fn store<F>(&mut self, raw: &RawSprite, mut pixels: RgbaImage, postprocess: F) -> Result<ImageHandle, GfxError>
    where
        F: FnOnce(&mut RgbaImage),
    {
        postprocess(&mut pixels);
        if self.registry.next_handle().index() > self.config.max_images {
            return Err(GfxError::ImageTableFull { max: self.config.max_images });
        }

        let checkpoint = self.packer.cursor();
        let raster = self.zoom.base_raster_width();
        let placement = self.packer.place(&mut self.backend, &pixels, raster)?;
        // The hook may resize the buffer; the placed size is what gets drawn.
        let (width, height) = pixels.dimensions();
        if (width, height) != (raw.width, raw.height) {
            log::debug!("postprocess resized image from {}x{} to {width}x{height}", raw.width, raw.height);
        }
        self.registry.insert(ImageDesc {
            base: Rect::new(raw.x, raw.y, width, height),
            zoomable: raw.zoomable,
            pixels,
            placement,
            checkpoint,
        })
    }

    /// Drop every image with handle `>= limit`, destroy their dedicated
    /// textures and rewind the packer so the freed sheet space is reused.
    pub fn free_all_images_above(&mut self, limit: ImageHandle) {
        let removed = self.registry.truncate(limit);
        let Some(first) = removed.first() else { return };
        let checkpoint = first.checkpoint;
        for desc in &removed {
            if desc.placement.is_dedicated() {
                self.backend.destroy_texture(desc.placement.texture);
            }
        }
        self.packer.rewind(checkpoint);
        log::info!("freed {} images from handle {}", removed.len(), limit.0);
    }

    // ── Lookups ──────────────────────────────────────────────────────────

    pub fn base_offset(&self, handle: ImageHandle) -> Option<Rect> {
        self.registry.base_offset(handle)
    }

    pub fn offset(&self, handle: ImageHandle) -> Option<Rect> {
        self.registry.offset(handle, &self.zoom)
    }

    pub fn sprite(&self, handle: ImageHandle) -> Option<SpriteInfo> {
        self.registry.sprite(handle)
    }

    pub fn image_count(&self) -> usize {
        self.registry.image_count()
    }

    pub fn sprite_quad(&self, handle: ImageHandle, x: i32, y: i32, mode: DrawMode) -> Option<SpriteQuad> {
        quad::sprite_quad(self, handle, x, y, mode)
    }

    // ── Fonts ────────────────────────────────────────────────────────────

    pub fn load_font<S: GlyphSource>(&mut self, source: &mut S) -> Result<Font, FontError> {
        Font::load(source, &self.config, &mut self.backend)
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn config(&self) -> &GfxConfig {
        &self.config
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Player color changes only affect sprites registered afterwards.
    pub fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    pub fn zoom(&self) -> &ZoomState {
        &self.zoom
    }

    pub fn zoom_mut(&mut self) -> &mut ZoomState {
        &mut self.zoom
    }

    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }

    pub fn packer(&self) -> &SheetPacker {
        &self.packer
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}
