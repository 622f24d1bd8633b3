pub mod ingest;
pub mod rle;

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

use crate::error::DecodeError;
use crate::palette::Palette;

// ── PixelData ─────────────────────────────────────────────────────────────────

/// Pixel payload of a sprite record, tagged by bit depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PixelData {
    /// Run-length encoded 16-bit words, see [`rle`].
    Rle16(Vec<u16>),
    /// One ARGB word per pixel, row-major.
    Argb32(Vec<u32>),
}

impl PixelData {
    /// Split a little-endian record payload into words of the given depth.
    pub fn from_le_bytes(bits_per_pixel: u8, bytes: &[u8]) -> Result<Self, DecodeError> {
        match bits_per_pixel {
            16 => {
                if bytes.len() % 2 != 0 {
                    return Err(DecodeError::OddByteCount { len: bytes.len(), word: 2 });
                }
                Ok(Self::Rle16(
                    bytes.chunks_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]])).collect(),
                ))
            }
            32 => {
                if bytes.len() % 4 != 0 {
                    return Err(DecodeError::OddByteCount { len: bytes.len(), word: 4 });
                }
                Ok(Self::Argb32(
                    bytes
                        .chunks_exact(4)
                        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        .collect(),
                ))
            }
            other => Err(DecodeError::UnsupportedDepth(other)),
        }
    }

    pub fn bits_per_pixel(&self) -> u8 {
        match self {
            Self::Rle16(_) => 16,
            Self::Argb32(_) => 32,
        }
    }

    /// Number of words.
    pub fn len(&self) -> usize {
        match self {
            Self::Rle16(w) => w.len(),
            Self::Argb32(w) => w.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ── RawSprite ─────────────────────────────────────────────────────────────────

/// A sprite as produced by the authoring pipeline, before decoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawSprite {
    /// Offset of the drawn area within the nominal tile cell.
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Whether draw-time offsets follow the zoom level.
    pub zoomable: bool,
    pub data: PixelData,
}

impl RawSprite {
    pub fn new(width: u32, height: u32, data: PixelData) -> Self {
        Self { x: 0, y: 0, width, height, zoomable: true, data }
    }

    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_zoomable(mut self, zoomable: bool) -> Self {
        self.zoomable = zoomable;
        self
    }

    /// Degenerate sprites register as the empty image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }
}

// ── Decoding ──────────────────────────────────────────────────────────────────

/// Expand a raw sprite into a `width × height` RGBA buffer.
///
/// Pixels not covered by any span stay transparent black.
pub fn decode(raw: &RawSprite, palette: &Palette) -> Result<RgbaImage, DecodeError> {
    match &raw.data {
        PixelData::Argb32(words) => decode_argb32(words, raw.width, raw.height),
        PixelData::Rle16(words) => decode_rle16(words, raw.width, raw.height, palette),
    }
}

/// [`decode`] over many sprites in parallel. Results keep input order.
pub fn decode_all(raws: &[RawSprite], palette: &Palette) -> Vec<Result<RgbaImage, DecodeError>> {
    raws.par_iter().map(|raw| decode(raw, palette)).collect()
}

fn decode_argb32(words: &[u32], width: u32, height: u32) -> Result<RgbaImage, DecodeError> {
    let expected = width as usize * height as usize;
    if words.len() < expected {
        return Err(DecodeError::TooShort { expected, actual: words.len() });
    }
    let mut img = RgbaImage::new(width, height);
    for (dst, &argb) in img.pixels_mut().zip(words) {
        *dst = Rgba([(argb >> 16) as u8, (argb >> 8) as u8, argb as u8, (argb >> 24) as u8]);
    }
    Ok(img)
}

fn decode_rle16(words: &[u16], width: u32, height: u32, palette: &Palette) -> Result<RgbaImage, DecodeError> {
    let mut img = RgbaImage::new(width, height);
    for (y, line) in rle::Scanlines::new(words, height).enumerate() {
        let y = y as u32;
        let mut x = 0u32;
        for span in line? {
            x = x.saturating_add(span.skip as u32);
            if x > width {
                return Err(DecodeError::Overrun { line: y, end: x, width });
            }
            if span.words.is_empty() {
                continue;
            }
            let end = x.saturating_add(span.words.len() as u32);
            if end > width {
                return Err(DecodeError::Overrun { line: y, end, width });
            }
            for (i, &word) in span.words.iter().enumerate() {
                let px = match span.kind {
                    rle::RunKind::Opaque => rle::opaque_pixel(word, palette),
                    rle::RunKind::Lighting => rle::lighting_pixel(word, palette),
                };
                img.put_pixel(x + i as u32, y, Rgba(px));
            }
            x = end;
        }
    }
    Ok(img)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
