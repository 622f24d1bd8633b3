use glam::IVec2;
use serde::Deserialize;

/// A zoom step expressed as an integer fraction `num / den`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ZoomRatio {
    pub num: u32,
    pub den: u32,
}

impl ZoomRatio {
    pub const fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }
}

/// Curated zoom steps, most magnified first. Not monotonic in the ratio
/// between neighbours; each entry is a ratio that keeps tiles crisp.
pub const DEFAULT_ZOOM_TABLE: [ZoomRatio; 10] = [
    ZoomRatio::new(2, 1),
    ZoomRatio::new(3, 2),
    ZoomRatio::new(4, 3),
    ZoomRatio::new(1, 1),
    ZoomRatio::new(3, 4),
    ZoomRatio::new(5, 8),
    ZoomRatio::new(1, 2),
    ZoomRatio::new(3, 8),
    ZoomRatio::new(1, 4),
    ZoomRatio::new(1, 8),
];

/// Index of the 1/1 entry in [`DEFAULT_ZOOM_TABLE`].
pub const ZOOM_NEUTRAL: usize = 3;

/// The zoomed raster width never drops below this many pixels.
pub const MIN_RASTER_WIDTH: u32 = 4;

/// Tile size that sprite offsets and heights are authored against.
const AUTHORED_TILE_WIDTH: i32 = 64;

// ── ZoomState ─────────────────────────────────────────────────────────────────

/// Zoom level and raster widths.
///
/// The only place the zoom ratio lives. Placement code reads it through the
/// [`GfxContext`](crate::renderer::GfxContext) that owns it rather than
/// caching its own copy.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoomState {
    table: Vec<ZoomRatio>,
    level: usize,
    base_raster_width: u32,
    raster_width: u32,
}

impl ZoomState {
    /// Create a zoom state at `level`. A level that is outside the table or
    /// below the raster floor falls back to the nearest valid level,
    /// preferring the more magnified one. An empty table is replaced by a
    /// single 1/1 entry.
    pub fn new(mut table: Vec<ZoomRatio>, level: usize, base_raster_width: u32) -> Self {
        if table.is_empty() {
            table.push(ZoomRatio::new(1, 1));
        }
        let mut zoom = Self {
            table,
            level: 0,
            base_raster_width,
            raster_width: base_raster_width,
        };
        let start = zoom.nearest_valid_level(level).unwrap_or(0);
        if start != level {
            log::warn!("zoom level {level} rejected at startup, using level {start}");
        }
        zoom.level = start;
        zoom.raster_width = zoom.raster_for(start).unwrap_or(base_raster_width);
        zoom
    }

    fn raster_for(&self, level: usize) -> Option<u32> {
        let ratio = self.table.get(level)?;
        if ratio.den == 0 {
            return None;
        }
        Some(self.base_raster_width * ratio.num / ratio.den)
    }

    fn is_valid_level(&self, level: usize) -> bool {
        matches!(self.raster_for(level), Some(raster) if raster >= MIN_RASTER_WIDTH)
    }

    /// Closest level to `level` whose raster meets the floor. Ties go to the
    /// lower (more magnified) index.
    fn nearest_valid_level(&self, level: usize) -> Option<usize> {
        let last = self.table.len() - 1;
        let level = level.min(last);
        (0..=last).find_map(|d| {
            [level.checked_sub(d), Some(level + d).filter(|&l| l <= last)]
                .into_iter()
                .flatten()
                .find(|&l| self.is_valid_level(l))
        })
    }

    /// Switch to `level`. Levels outside the table, or whose raster width
    /// would fall below [`MIN_RASTER_WIDTH`], leave the state untouched.
    ///
    /// Returns the level that was active before the call.
    pub fn set_zoom_level(&mut self, level: usize) -> usize {
        let previous = self.level;
        match self.raster_for(level) {
            Some(raster) if self.is_valid_level(level) => {
                self.level = level;
                self.raster_width = raster;
                let ratio = self.table[level];
                log::debug!(
                    "zoom level now {level} ({}/{}) -> raster {raster}",
                    ratio.num,
                    ratio.den
                );
            }
            _ => log::debug!("zoom level {level} rejected, staying at {previous}"),
        }
        previous
    }

    /// Step one entry toward the start of the table (magnify).
    /// Returns `false` when already at the first entry.
    pub fn zoom_in(&mut self) -> bool {
        if self.level == 0 {
            return false;
        }
        self.set_zoom_level(self.level - 1);
        true
    }

    /// Step one entry toward the end of the table (shrink).
    /// Returns `false` when already at the last entry.
    pub fn zoom_out(&mut self) -> bool {
        if self.level + 1 >= self.table.len() {
            return false;
        }
        self.set_zoom_level(self.level + 1);
        true
    }

    /// Change the unzoomed raster width (e.g. after switching to a sprite
    /// set with a different native tile size) and re-derive the zoomed one.
    ///
    /// When the active level would fall below the raster floor, the nearest
    /// valid level is selected instead. A width that leaves no valid level
    /// is ignored.
    ///
    /// Returns the previous base width.
    pub fn set_base_raster_width(&mut self, width: u32) -> u32 {
        let previous = self.base_raster_width;
        self.base_raster_width = width;
        match self.nearest_valid_level(self.level) {
            Some(level) => {
                if level != self.level {
                    log::debug!("zoom level {} below the raster floor at base {width}, now {level}", self.level);
                }
                self.level = level;
                self.raster_width = self.raster_for(level).unwrap_or(width);
            }
            None => {
                log::warn!("base raster width {width} leaves no zoom level of {MIN_RASTER_WIDTH} px, keeping {previous}");
                self.base_raster_width = previous;
            }
        }
        previous
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn fraction(&self) -> ZoomRatio {
        self.table[self.level]
    }

    pub fn base_raster_width(&self) -> u32 {
        self.base_raster_width
    }

    /// Raster width at the current zoom level.
    pub fn raster_width(&self) -> u32 {
        self.raster_width
    }

    pub fn is_neutral(&self) -> bool {
        let ratio = self.fraction();
        ratio.num == ratio.den
    }

    /// Scale an unzoomed pixel length to the current zoom.
    pub fn scale(&self, v: i32) -> i32 {
        let ratio = self.fraction();
        v * ratio.num as i32 / ratio.den as i32
    }

    /// Inverse of [`scale`](Self::scale): zoomed screen pixels back to
    /// unzoomed ones.
    pub fn unscale(&self, v: i32) -> i32 {
        let ratio = self.fraction();
        v * ratio.den as i32 / ratio.num as i32
    }

    /// Scale an offset authored against a 64 px tile to the current raster.
    pub fn tile_raster_scale(&self, v: i32) -> i32 {
        v * self.raster_width as i32 / AUTHORED_TILE_WIDTH
    }

    /// Screen position of the top corner of isometric tile `(i, j)` raised by
    /// `height` authored pixels.
    ///
    /// ```text
    /// x = (i - j) * raster / 2
    /// y = (i + j) * raster / 4 - scaled(height)
    /// ```
    pub fn tile_to_screen(&self, i: i32, j: i32, height: i32) -> IVec2 {
        let rw = self.raster_width as i32;
        IVec2::new(
            (i - j) * rw / 2,
            (i + j) * rw / 4 - self.tile_raster_scale(height),
        )
    }
}

impl Default for ZoomState {
    fn default() -> Self {
        Self::new(DEFAULT_ZOOM_TABLE.to_vec(), ZOOM_NEUTRAL, 64)
    }
}
