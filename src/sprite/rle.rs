//! The 16-bit run-length sprite stream.
//!
//! Each scanline is a sequence of spans terminated by a zero skip word:
//!
//! ```text
//! skip, header, word × n, skip, header, word × n, …, 0
//! ```
//!
//! `skip` advances the cursor over transparent pixels (bit 15 is ignored, so
//! `0x8000` encodes an empty skip that does not end the line). `header` is the
//! span length; with bit 15 set the span holds semi-transparent lighting
//! words, otherwise opaque color words. The first skip of a line may be zero.

use crate::error::DecodeError;
use crate::palette::Palette;

/// Flag bit of skip and run header words.
pub const TRANSPARENT_RUN: u16 = 0x8000;
/// Opaque words at or above this value index the sprite special table.
pub const SPECIAL_COLOR_BASE: u16 = 0x8000;
/// Lighting words below this value are special colors at full opacity.
pub const LIGHTING_BASE: u16 = 0x8020;
/// Alpha steps of an encoded lighting word.
const ALPHA_STEPS: u16 = 31;

// ── Pixel words ───────────────────────────────────────────────────────────────

/// RGB555 to RGBA. Low three bits of each channel stay zero.
#[inline]
pub fn rgb555_to_rgba(c: u16) -> [u8; 4] {
    [
        ((c >> 7) & 0xF8) as u8,
        ((c >> 2) & 0xF8) as u8,
        ((c << 3) & 0xF8) as u8,
        255,
    ]
}

/// RGB343 to RGB.
#[inline]
pub fn rgb343_to_rgb(v: u16) -> [u8; 3] {
    [
        ((v >> 2) & 0xE0) as u8,
        ((v << 1) & 0xF0) as u8,
        ((v << 5) & 0xE0) as u8,
    ]
}

/// Resolve a word of an opaque span.
#[inline]
pub fn opaque_pixel(c: u16, palette: &Palette) -> [u8; 4] {
    if c >= SPECIAL_COLOR_BASE {
        palette.sprite_special(c).to_rgba(255)
    } else {
        rgb555_to_rgba(c)
    }
}

/// Resolve a word of a lighting span.
///
/// `alpha = ((aux % 31) + 1) << 3` gives 8..=248, never fully transparent.
#[inline]
pub fn lighting_pixel(c: u16, palette: &Palette) -> [u8; 4] {
    if c < LIGHTING_BASE {
        return palette.sprite_special(c).to_rgba(255);
    }
    let aux = c.wrapping_sub(LIGHTING_BASE + ALPHA_STEPS * ALPHA_STEPS);
    let alpha = (((aux % ALPHA_STEPS) + 1) << 3) as u8;
    let [r, g, b] = rgb343_to_rgb((aux / ALPHA_STEPS) & 0x3FF);
    [r, g, b, alpha]
}

/// Encode a lighting word from an RGB343 color and an alpha step in `0..31`.
pub fn lighting_word(rgb343: u16, alpha_step: u16) -> u16 {
    let aux = (rgb343 & 0x3FF) * ALPHA_STEPS + alpha_step.min(ALPHA_STEPS - 1);
    aux.wrapping_add(LIGHTING_BASE + ALPHA_STEPS * ALPHA_STEPS)
}

// ── Spans ─────────────────────────────────────────────────────────────────────

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RunKind {
    Opaque,
    Lighting,
}

/// One `skip, header, words` group of a scanline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Span<'a> {
    /// Transparent pixels before the run, flag bit removed.
    pub skip: u16,
    pub kind: RunKind,
    pub words: &'a [u16],
}

impl Span<'_> {
    /// Pixels covered by the skip plus the run.
    pub fn extent(&self) -> u32 {
        self.skip as u32 + self.words.len() as u32
    }
}

/// Iterator over the scanlines of a run-length stream, yielding each line's
/// spans without expanding them.
///
/// Stops after `height` lines; anything left in the stream is ignored.
pub struct Scanlines<'a> {
    words: &'a [u16],
    pos: usize,
    line: u32,
    height: u32,
}

impl<'a> Scanlines<'a> {
    pub fn new(words: &'a [u16], height: u32) -> Self {
        Self { words, pos: 0, line: 0, height }
    }

    /// Words consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn next_word(&mut self) -> Result<u16, DecodeError> {
        let w = *self
            .words
            .get(self.pos)
            .ok_or(DecodeError::Truncated { line: self.line })?;
        self.pos += 1;
        Ok(w)
    }

    fn parse_line(&mut self) -> Result<Vec<Span<'a>>, DecodeError> {
        let mut spans = Vec::new();
        let mut skip = self.next_word()?;
        loop {
            let header = self.next_word()?;
            let kind = if header & TRANSPARENT_RUN != 0 { RunKind::Lighting } else { RunKind::Opaque };
            let len = (header & !TRANSPARENT_RUN) as usize;
            let words = self
                .words
                .get(self.pos..self.pos + len)
                .ok_or(DecodeError::Truncated { line: self.line })?;
            self.pos += len;
            spans.push(Span { skip: skip & !TRANSPARENT_RUN, kind, words });

            skip = self.next_word()?;
            if skip == 0 {
                return Ok(spans);
            }
        }
    }
}

impl<'a> Iterator for Scanlines<'a> {
    type Item = Result<Vec<Span<'a>>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.line >= self.height {
            return None;
        }
        let line = self.parse_line();
        self.line += 1;
        if line.is_err() {
            // A broken line leaves the stream position meaningless.
            self.height = self.line;
        }
        Some(line)
    }
}

// ── Encoder ───────────────────────────────────────────────────────────────────

/// Builds run-length streams with the structure [`Scanlines`] reads.
///
/// ```
/// use pakgfx::sprite::rle::{RleEncoder, RunKind};
///
/// let mut enc = RleEncoder::new();
/// enc.span(3, RunKind::Opaque, &[0x7C00, 0x03E0]).end_line();
/// assert_eq!(enc.finish(), vec![3, 2, 0x7C00, 0x03E0, 0]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RleEncoder {
    words: Vec<u16>,
    spans_in_line: usize,
}

impl RleEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a span to the current line. Skips and runs are limited to
    /// 15 bits; a zero skip after the first span is written as `0x8000`.
    pub fn span(&mut self, skip: u16, kind: RunKind, words: &[u16]) -> &mut Self {
        let skip = skip & !TRANSPARENT_RUN;
        let len = words.len().min(TRANSPARENT_RUN as usize - 1);
        let skip_word = if skip == 0 && self.spans_in_line > 0 { TRANSPARENT_RUN } else { skip };
        let header = match kind {
            RunKind::Opaque => len as u16,
            RunKind::Lighting => len as u16 | TRANSPARENT_RUN,
        };
        self.words.push(skip_word);
        self.words.push(header);
        self.words.extend_from_slice(&words[..len]);
        self.spans_in_line += 1;
        self
    }

    /// Terminate the current line. A line without spans becomes a single
    /// empty opaque span.
    pub fn end_line(&mut self) -> &mut Self {
        if self.spans_in_line == 0 {
            self.span(0, RunKind::Opaque, &[]);
        }
        self.words.push(0);
        self.spans_in_line = 0;
        self
    }

    /// Append a whole parsed line.
    pub fn line(&mut self, spans: &[Span<'_>]) -> &mut Self {
        for span in spans {
            self.span(span.skip, span.kind, span.words);
        }
        self.end_line()
    }

    /// Encode a row of optional opaque words; `None` is transparent.
    pub fn opaque_row(&mut self, row: &[Option<u16>]) -> &mut Self {
        let mut i = 0;
        while i < row.len() {
            let skip_start = i;
            while i < row.len() && row[i].is_none() {
                i += 1;
            }
            let run_start = i;
            while i < row.len() && row[i].is_some() {
                i += 1;
            }
            if run_start == i {
                break;
            }
            let words: Vec<u16> = row[run_start..i].iter().flatten().copied().collect();
            self.span((run_start - skip_start) as u16, RunKind::Opaque, &words);
        }
        self.end_line()
    }

    pub fn finish(self) -> Vec<u16> {
        self.words
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
