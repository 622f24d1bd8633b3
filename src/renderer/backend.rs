use std::collections::HashMap;
use std::path::Path;

use image::RgbaImage;

/// Opaque handle of a texture owned by a [`TextureBackend`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Where textures live. Every texture is RGBA8, `4 * width` bytes per row.
pub trait TextureBackend {
    /// Create a texture initialised from `pixels` (`width * height * 4` bytes).
    fn create_texture(&mut self, label: &str, width: u32, height: u32, pixels: &[u8]) -> TextureId;

    /// Overwrite the `width × height` region at `(x, y)`. Pixels outside the
    /// region are left untouched.
    fn update_region(&mut self, id: TextureId, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]);

    fn destroy_texture(&mut self, id: TextureId);

    /// Largest texture edge the backend accepts.
    fn max_texture_size(&self) -> u32;
}

// ── MemoryBackend ─────────────────────────────────────────────────────────────

struct MemoryTexture {
    label: String,
    image: RgbaImage,
}

/// Keeps every texture on the CPU. Used by tooling that writes atlases to
/// disk and by tests.
pub struct MemoryBackend {
    textures: HashMap<TextureId, MemoryTexture>,
    next_id: u32,
    max_texture_size: u32,
    uploads: usize,
}

impl MemoryBackend {
    pub fn new(max_texture_size: u32) -> Self {
        Self { textures: HashMap::new(), next_id: 1, max_texture_size, uploads: 0 }
    }

    pub fn texture(&self, id: TextureId) -> Option<&RgbaImage> {
        self.textures.get(&id).map(|t| &t.image)
    }

    pub fn label(&self, id: TextureId) -> Option<&str> {
        self.textures.get(&id).map(|t| t.label.as_str())
    }

    /// Ids of live textures in creation order.
    pub fn texture_ids(&self) -> Vec<TextureId> {
        let mut ids: Vec<TextureId> = self.textures.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Number of `update_region` calls so far.
    pub fn upload_count(&self) -> usize {
        self.uploads
    }

    pub fn save_png(&self, id: TextureId, path: impl AsRef<Path>) -> image::ImageResult<()> {
        match self.texture(id) {
            Some(img) => img.save(path),
            None => Err(image::ImageError::Parameter(image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::Generic(format!("no texture {id:?}")),
            ))),
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(crate::config::TEXTURE_SIZE_CAP)
    }
}

impl TextureBackend for MemoryBackend {
    fn create_texture(&mut self, label: &str, width: u32, height: u32, pixels: &[u8]) -> TextureId {
        let id = TextureId(self.next_id);
        self.next_id += 1;
        let image = RgbaImage::from_raw(width, height, pixels.to_vec())
            .unwrap_or_else(|| RgbaImage::new(width, height));
        log::debug!("memory texture {id:?} '{label}' {width}x{height}");
        self.textures.insert(id, MemoryTexture { label: label.to_string(), image });
        id
    }

    fn update_region(&mut self, id: TextureId, x: u32, y: u32, width: u32, height: u32, pixels: &[u8]) {
        let Some(tex) = self.textures.get_mut(&id) else {
            log::warn!("update_region on unknown texture {id:?}");
            return;
        };
        self.uploads += 1;
        let img = &mut tex.image;
        let w = width.min(img.width().saturating_sub(x));
        let h = height.min(img.height().saturating_sub(y));
        let stride = img.width() as usize * 4;
        let src_stride = width as usize * 4;
        let buf: &mut [u8] = img;
        for row in 0..h as usize {
            let dst = (y as usize + row) * stride + x as usize * 4;
            let src = row * src_stride;
            let len = w as usize * 4;
            if let Some(src_row) = pixels.get(src..src + len) {
                buf[dst..dst + len].copy_from_slice(src_row);
            }
        }
    }

    fn destroy_texture(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_region_leaves_neighbours_intact() {
        let mut backend = MemoryBackend::new(64);
        let id = backend.create_texture("t", 4, 2, &[9; 4 * 2 * 4]);
        backend.update_region(id, 1, 0, 2, 1, &[1; 2 * 4]);
        let img = backend.texture(id).unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [9; 4]);
        assert_eq!(img.get_pixel(1, 0).0, [1; 4]);
        assert_eq!(img.get_pixel(2, 0).0, [1; 4]);
        assert_eq!(img.get_pixel(3, 0).0, [9; 4]);
        assert_eq!(img.get_pixel(1, 1).0, [9; 4]);
        assert_eq!(backend.upload_count(), 1);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut backend = MemoryBackend::default();
        let a = backend.create_texture("a", 1, 1, &[0; 4]);
        backend.destroy_texture(a);
        let b = backend.create_texture("b", 1, 1, &[0; 4]);
        assert_ne!(a, b);
        assert_eq!(backend.live_textures(), 1);
        assert!(backend.texture(a).is_none());
    }
}
