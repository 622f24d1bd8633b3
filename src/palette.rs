use std::ops::Range;

// ── Rgb / Color ───────────────────────────────────────────────────────────────

/// 8-bit RGB triple as stored in the palette tables.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// `0xRRGGBB`.
    pub const fn from_hex(rgb: u32) -> Self {
        Self::new((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub const fn to_rgba(self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }
}

/// Linear RGBA color in `[0, 1]`, as handed to the GPU.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Color(pub [f32; 4]);

impl Color {
    pub const WHITE: Self = Self([1.0, 1.0, 1.0, 1.0]);
    pub const BLACK: Self = Self([0.0, 0.0, 0.0, 1.0]);
    pub const TRANSPARENT: Self = Self([0.0, 0.0, 0.0, 0.0]);
    /// Tint applied at full night.
    pub const NIGHT: Self = Self([0.3, 0.4, 0.6, 1.0]);

    pub fn from_rgb(rgb: Rgb, alpha: f32) -> Self {
        Self([
            rgb.r as f32 / 255.0,
            rgb.g as f32 / 255.0,
            rgb.b as f32 / 255.0,
            alpha,
        ])
    }

    /// Mix `self` toward `other` by `t`. The result is always opaque.
    pub fn blend(self, other: Self, t: f32) -> Self {
        let [r1, g1, b1, _] = self.0;
        let [r2, g2, b2, _] = other.0;
        Self([
            r1 * (1.0 - t) + r2 * t,
            g1 * (1.0 - t) + g2 * t,
            b1 * (1.0 - t) + b2 * t,
            1.0,
        ])
    }
}

// ── Tables ────────────────────────────────────────────────────────────────────

/// Shades per color ramp.
pub const RAMP_LEN: usize = 8;
/// Number of 8-shade ramps in the special table.
pub const RAMP_COUNT: usize = 28;
/// Entries of the special (ramp) table.
pub const SPECIAL_COLOR_COUNT: usize = RAMP_LEN * RAMP_COUNT;
/// Entries of the light tables following the special table.
pub const LIGHT_COUNT: usize = 15;
/// Special colors addressable from sprite pixel data: two player ramps
/// followed by the lights.
pub const SPRITE_SPECIAL_COUNT: usize = 2 * RAMP_LEN + LIGHT_COUNT;
/// Light indices of the menu greys that ignore day/night darkening.
pub const NON_DARKENING_GREYS: Range<usize> = 5..10;

const fn rgb(r: u8, g: u8, b: u8) -> Rgb {
    Rgb::new(r, g, b)
}

/// Player colors and colors for simple drawing operations; every 8 entries
/// form one ramp from dark to light.
static SPECIAL_PALETTE: [Rgb; SPECIAL_COLOR_COUNT] = [
    rgb( 36,  75, 103), rgb( 57,  94, 124), rgb( 76, 113, 145), rgb( 96, 132, 167), rgb(116, 151, 189), rgb(136, 171, 211), rgb(156, 190, 233), rgb(176, 210, 255),
    rgb( 88,  88,  88), rgb(107, 107, 107), rgb(125, 125, 125), rgb(144, 144, 144), rgb(162, 162, 162), rgb(181, 181, 181), rgb(200, 200, 200), rgb(219, 219, 219),
    rgb( 17,  55, 133), rgb( 27,  71, 150), rgb( 37,  86, 167), rgb( 48, 102, 185), rgb( 58, 117, 202), rgb( 69, 133, 220), rgb( 79, 149, 237), rgb( 90, 165, 255),
    rgb(123,  88,   3), rgb(142, 111,   4), rgb(161, 134,   5), rgb(180, 157,   7), rgb(198, 180,   8), rgb(217, 203,  10), rgb(236, 226,  11), rgb(255, 249,  13),
    rgb( 86,  32,  14), rgb(110,  40,  16), rgb(134,  48,  18), rgb(158,  57,  20), rgb(182,  65,  22), rgb(206,  74,  24), rgb(230,  82,  26), rgb(255,  91,  28),
    rgb( 34,  59,  10), rgb( 44,  80,  14), rgb( 53, 101,  18), rgb( 63, 122,  22), rgb( 77, 143,  29), rgb( 92, 164,  37), rgb(106, 185,  44), rgb(121, 207,  52),
    rgb(  0,  86,  78), rgb(  0, 108,  98), rgb(  0, 130, 118), rgb(  0, 152, 138), rgb(  0, 174, 158), rgb(  0, 196, 178), rgb(  0, 218, 198), rgb(  0, 241, 219),
    rgb( 74,   7, 122), rgb( 95,  21, 139), rgb(116,  37, 156), rgb(138,  53, 173), rgb(160,  69, 191), rgb(181,  85, 208), rgb(203, 101, 225), rgb(225, 117, 243),
    rgb( 59,  41,   0), rgb( 83,  55,   0), rgb(107,  69,   0), rgb(131,  84,   0), rgb(155,  98,   0), rgb(179, 113,   0), rgb(203, 128,   0), rgb(227, 143,   0),
    rgb( 87,   0,  43), rgb(111,  11,  69), rgb(135,  28,  92), rgb(159,  45, 115), rgb(183,  62, 138), rgb(230,  74, 174), rgb(245, 121, 194), rgb(255, 156, 209),
    rgb( 20,  48,  10), rgb( 44,  74,  28), rgb( 68,  99,  45), rgb( 93, 124,  62), rgb(118, 149,  79), rgb(143, 174,  96), rgb(168, 199, 113), rgb(193, 225, 130),
    rgb( 54,  19,  29), rgb( 82,  44,  44), rgb(110,  69,  58), rgb(139,  95,  72), rgb(168, 121,  86), rgb(197, 147, 101), rgb(226, 173, 115), rgb(255, 199, 130),
    rgb(  8,  11, 100), rgb( 14,  22, 116), rgb( 20,  33, 139), rgb( 26,  44, 162), rgb( 41,  74, 185), rgb( 57, 104, 208), rgb( 76, 132, 231), rgb( 96, 160, 255),
    rgb( 43,  30,  46), rgb( 68,  50,  85), rgb( 93,  70, 110), rgb(118,  91, 130), rgb(143, 111, 170), rgb(168, 132, 190), rgb(193, 153, 210), rgb(219, 174, 230),
    rgb( 63,  18,  12), rgb( 90,  38,  30), rgb(117,  58,  42), rgb(145,  78,  55), rgb(172,  98,  67), rgb(200, 118,  80), rgb(227, 138,  92), rgb(255, 159, 105),
    rgb( 11,  68,  30), rgb( 33,  94,  56), rgb( 54, 120,  81), rgb( 76, 147, 106), rgb( 98, 174, 131), rgb(120, 201, 156), rgb(142, 228, 181), rgb(164, 255, 207),
    rgb( 64,   0,   0), rgb( 96,   0,   0), rgb(128,   0,   0), rgb(192,   0,   0), rgb(255,   0,   0), rgb(255,  64,  64), rgb(255,  96,  96), rgb(255, 128, 128),
    rgb(  0, 128,   0), rgb(  0, 196,   0), rgb(  0, 225,   0), rgb(  0, 240,   0), rgb(  0, 255,   0), rgb( 64, 255,  64), rgb( 94, 255,  94), rgb(128, 255, 128),
    rgb(  0,   0, 128), rgb(  0,   0, 192), rgb(  0,   0, 224), rgb(  0,   0, 255), rgb(  0,  64, 255), rgb(  0,  94, 255), rgb(  0, 106, 255), rgb(  0, 128, 255),
    rgb(128,  64,   0), rgb(193,  97,   0), rgb(215, 107,   0), rgb(235, 118,   0), rgb(255, 128,   0), rgb(255, 149,  43), rgb(255, 170,  85), rgb(255, 193, 132),
    rgb(  8,  52,   0), rgb( 16,  64,   0), rgb( 32,  80,   4), rgb( 48,  96,   4), rgb( 64, 112,  12), rgb( 84, 132,  20), rgb(104, 148,  28), rgb(128, 168,  44),
    rgb(164, 164,   0), rgb(180, 180,   0), rgb(193, 193,   0), rgb(215, 215,   0), rgb(235, 235,   0), rgb(255, 255,   0), rgb(255, 255,  64), rgb(255, 255, 128),
    rgb( 32,   4,   0), rgb( 64,  20,   8), rgb( 84,  28,  16), rgb(108,  44,  28), rgb(128,  56,  40), rgb(148,  72,  56), rgb(168,  92,  76), rgb(184, 108,  88),
    rgb( 64,   0,   0), rgb( 96,   8,   0), rgb(112,  16,   0), rgb(120,  32,   8), rgb(138,  64,  16), rgb(156,  72,  32), rgb(174,  96,  48), rgb(192, 128,  64),
    rgb( 32,  32,   0), rgb( 64,  64,   0), rgb( 96,  96,   0), rgb(128, 128,   0), rgb(144, 144,   0), rgb(172, 172,   0), rgb(192, 192,   0), rgb(224, 224,   0),
    rgb( 64,  96,   8), rgb( 80, 108,  32), rgb( 96, 120,  48), rgb(112, 144,  56), rgb(128, 172,  64), rgb(150, 210,  68), rgb(172, 238,  80), rgb(192, 255,  96),
    rgb( 32,  32,  32), rgb( 48,  48,  48), rgb( 64,  64,  64), rgb( 80,  80,  80), rgb( 96,  96,  96), rgb(172, 172, 172), rgb(236, 236, 236), rgb(255, 255, 255),
    rgb( 41,  41,  54), rgb( 60,  45,  70), rgb( 75,  62, 108), rgb( 95,  77, 136), rgb(113, 105, 150), rgb(135, 120, 176), rgb(165, 145, 218), rgb(198, 191, 232),
];

/// Light colors during daytime.
static DAY_LIGHTS: [Rgb; LIGHT_COUNT] = [
    rgb(0x57, 0x65, 0x6F), // dark windows, lit yellowish at night
    rgb(0x7F, 0x9B, 0xF1), // lighter windows, lit blueish at night
    rgb(0xFF, 0xFF, 0x53), // yellow light
    rgb(0xFF, 0x21, 0x1D), // red light
    rgb(0x01, 0xDD, 0x01), // green light
    rgb(0x6B, 0x6B, 0x6B), // non-darkening grey 1 (menus)
    rgb(0x9B, 0x9B, 0x9B), // non-darkening grey 2
    rgb(0xB3, 0xB3, 0xB3), // non-darkening grey 3
    rgb(0xC9, 0xC9, 0xC9), // non-darkening grey 4
    rgb(0xDF, 0xDF, 0xDF), // non-darkening grey 5
    rgb(0xE3, 0xE3, 0xFF), // nearly white light at day, yellowish at night
    rgb(0xC1, 0xB1, 0xD1), // windows, lit yellow
    rgb(0x4D, 0x4D, 0x4D), // windows, lit yellow
    rgb(0xE1, 0x00, 0xE1), // purple signal light
    rgb(0x01, 0x01, 0xFF), // blue light
];

/// Light colors during nighttime.
static NIGHT_LIGHTS: [Rgb; LIGHT_COUNT] = [
    rgb(0xD3, 0xC3, 0x80),
    rgb(0x80, 0xC3, 0xD3),
    rgb(0xFF, 0xFF, 0x53),
    rgb(0xFF, 0x21, 0x1D),
    rgb(0x01, 0xDD, 0x01),
    rgb(0x6B, 0x6B, 0x6B),
    rgb(0x9B, 0x9B, 0x9B),
    rgb(0xB3, 0xB3, 0xB3),
    rgb(0xC9, 0xC9, 0xC9),
    rgb(0xDF, 0xDF, 0xDF),
    rgb(0xFF, 0xFF, 0xE3),
    rgb(0xD3, 0xC3, 0x80),
    rgb(0xD3, 0xC3, 0x80),
    rgb(0xE1, 0x00, 0xE1),
    rgb(0x01, 0x01, 0xFF),
];

// ── PlayerColors ──────────────────────────────────────────────────────────────

/// Which special-table ramps feed the two player-color slots of sprites.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PlayerColors {
    pub primary: u8,
    pub secondary: u8,
}

impl Default for PlayerColors {
    fn default() -> Self {
        Self { primary: 0, secondary: 3 }
    }
}

// ── Palette ───────────────────────────────────────────────────────────────────

/// Index → color resolution for the engine's fixed palette.
///
/// Two views of the same data:
/// - [`color`](Self::color): the 256-index table used by drawing code
///   (224 ramp entries, 15 lights, black past the end);
/// - [`sprite_special`](Self::sprite_special): the 31 special colors that
///   sprite pixel data can reference (primary ramp, secondary ramp, lights).
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    player: PlayerColors,
    sprite_specials: [Rgb; SPRITE_SPECIAL_COUNT],
}

impl Default for Palette {
    fn default() -> Self {
        Self::with_player_colors(PlayerColors::default())
    }
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_player_colors(player: PlayerColors) -> Self {
        let mut palette = Self { player, sprite_specials: [Rgb::BLACK; SPRITE_SPECIAL_COUNT] };
        palette.set_player_colors(player.primary, player.secondary);
        palette
    }

    /// Select the ramps used for sprite player colors. Ramp indices past the
    /// table wrap around.
    pub fn set_player_colors(&mut self, primary: u8, secondary: u8) {
        let primary = primary as usize % RAMP_COUNT;
        let secondary = secondary as usize % RAMP_COUNT;
        self.player = PlayerColors { primary: primary as u8, secondary: secondary as u8 };

        let (ramps, lights) = self.sprite_specials.split_at_mut(2 * RAMP_LEN);
        ramps[..RAMP_LEN].copy_from_slice(ramp(primary));
        ramps[RAMP_LEN..].copy_from_slice(ramp(secondary));
        lights.copy_from_slice(&DAY_LIGHTS);
    }

    pub fn player_colors(&self) -> PlayerColors {
        self.player
    }

    /// Resolve a drawing color index. Indices past the lights are black.
    pub fn color(&self, idx: u8) -> Rgb {
        let idx = idx as usize;
        if idx < SPECIAL_COLOR_COUNT {
            SPECIAL_PALETTE[idx]
        } else if idx < SPECIAL_COLOR_COUNT + LIGHT_COUNT {
            DAY_LIGHTS[idx - SPECIAL_COLOR_COUNT]
        } else {
            Rgb::BLACK
        }
    }

    /// [`color`](Self::color) as a GPU color with `transparent_percent`
    /// (0 = opaque, 100 = invisible).
    pub fn color_rgba(&self, idx: u8, transparent_percent: u8) -> Color {
        let idx_usize = idx as usize;
        if idx_usize >= SPECIAL_COLOR_COUNT + LIGHT_COUNT {
            return Color::BLACK;
        }
        let alpha = 1.0 - transparent_percent.min(100) as f32 / 100.0;
        Color::from_rgb(self.color(idx), alpha)
    }

    /// Resolve the special color a sprite pixel word refers to. Only the low
    /// byte of `code` is significant; indices past the table are black.
    pub fn sprite_special(&self, code: u16) -> Rgb {
        self.sprite_specials
            .get((code & 0xFF) as usize)
            .copied()
            .unwrap_or(Rgb::BLACK)
    }

    /// Light color `idx` for day or night. Out-of-range indices are black.
    pub fn light(&self, idx: usize, night: bool) -> Rgb {
        let table = if night { &NIGHT_LIGHTS } else { &DAY_LIGHTS };
        table.get(idx).copied().unwrap_or(Rgb::BLACK)
    }

    /// Whether light `idx` keeps its color regardless of time of day.
    pub fn is_non_darkening(idx: usize) -> bool {
        NON_DARKENING_GREYS.contains(&idx)
    }

    /// Global tint for the day/night cycle; `night` runs from 0 (day) to 1.
    pub fn day_night_tint(night: f32) -> Color {
        Color::WHITE.blend(Color::NIGHT, night.clamp(0.0, 1.0))
    }
}

fn ramp(index: usize) -> &'static [Rgb] {
    let start = index * RAMP_LEN;
    &SPECIAL_PALETTE[start..start + RAMP_LEN]
}

// ── Tests ──────────────────────────────────────────────────────────────────────
