use thiserror::Error;

/// A single sprite's pixel data could not be decoded.
///
/// These are data errors: the registry logs them and registers the sprite as
/// [`ImageHandle::EMPTY`](crate::renderer::registry::ImageHandle::EMPTY)
/// instead of aborting the whole load.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum DecodeError {
    /// The record declares a bit depth other than 16 or 32.
    #[error("unsupported pixel format: {0} bits per pixel")]
    UnsupportedDepth(u8),
    /// The raw byte run does not divide into whole words.
    #[error("pixel data length {len} is not a multiple of {word} bytes")]
    OddByteCount { len: usize, word: usize },
    /// The word stream ended before scanline `line` was terminated.
    #[error("run-length stream truncated in scanline {line}")]
    Truncated { line: u32 },
    /// A span in scanline `line` reaches past the right edge of the sprite.
    #[error("span overruns scanline {line}: pixel {end} exceeds width {width}")]
    Overrun { line: u32, end: u32, width: u32 },
    /// A 32-bit sprite carries fewer words than `width * height`.
    #[error("32-bit pixel data too short: expected {expected} words, got {actual}")]
    TooShort { expected: usize, actual: usize },
}

/// Unrecoverable conditions: the data set and the engine configuration do
/// not match. Callers are expected to log and stop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GfxError {
    /// Every shared sheet slot is in use; raise `max_sheets`.
    #[error("out of texture sheets (limit {max}); raise max_sheets")]
    SheetsExhausted { max: usize },
    /// The handle table hit its hard maximum; raise `max_images`.
    #[error("out of images (more than {max})")]
    ImageTableFull { max: usize },
    #[error("invalid configuration: {0}")]
    Config(#[from] crate::config::ConfigError),
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
}

/// Font loading failures. The caller falls back to a bundled default font.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FontError {
    /// The font rendered too few glyphs to be usable.
    #[error("font is unusable: only {found} glyphs rasterized, need at least {required}")]
    TooFewGlyphs { found: usize, required: usize },
    /// The glyph atlas would exceed the largest texture the backend accepts.
    #[error("glyph atlas {width}x{height} exceeds the {max} px texture limit")]
    AtlasTooLarge { width: u32, height: u32, max: u32 },
    #[error("failed to decode glyph image: {0}")]
    Image(#[from] image::ImageError),
    #[error("failed to parse glyph map: {0}")]
    GlyphMap(#[from] serde_json::Error),
}
