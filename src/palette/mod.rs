// Paletted texture model and the team-color remapping pipeline.
//
// Remap-capable textures are identified purely by file name. Their palette
// carries three anchor indices (low/mid/high); recoloring rotates the hue of
// the [low, mid] range (top color) and the (mid, high] range (bottom color)
// while preserving each entry's value and saturation.

use anyhow::{bail, Result};

pub const PALETTE_ENTRIES: usize = 256;
pub const PALETTE_CHANNELS: usize = 3;
pub const PALETTE_SIZE: usize = PALETTE_ENTRIES * PALETTE_CHANNELS;

const DM_BASE_NAME: &str = "DM_Base.bmp";
const REMAP_PREFIX: &str = "Remap";

const SIMPLE_REMAP_LENGTH: usize = 18;
const FULL_REMAP_LENGTH: usize = 22;

const LOW_OFFSET: usize = 7;
const MID_OFFSET: usize = 11;
const HIGH_OFFSET: usize = 15;
const VALUE_LENGTH: usize = 3;

/// An 8-bit indexed image with its own 256-entry RGB palette.
#[derive(Debug, Clone)]
pub struct PaletteTexture {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub palette: Vec<u8>,
}

impl PaletteTexture {
    /// Builds a texture from raw indexed pixels and a palette.
    ///
    /// The palette must be exactly 256*3 bytes and the pixel buffer must
    /// match width*height. Pixel indices are always valid against a full
    /// 256-entry palette, so they need no range check.
    pub fn new(
        name: impl Into<String>,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        palette: Vec<u8>,
    ) -> Result<Self> {
        if palette.len() != PALETTE_SIZE {
            bail!(
                "palette must be {} bytes, got {}",
                PALETTE_SIZE,
                palette.len()
            );
        }
        if pixels.len() != (width as usize) * (height as usize) {
            bail!(
                "pixel buffer is {} bytes for {}x{} image",
                pixels.len(),
                width,
                height
            );
        }
        Ok(Self {
            name: name.into(),
            width,
            height,
            pixels,
            palette,
        })
    }

    /// Expands the indexed pixels into a packed 24-bit RGB buffer.
    /// Straight palette lookup: no interpolation, no gamma handling.
    pub fn to_rgb(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * PALETTE_CHANNELS);
        for &index in &self.pixels {
            let base = index as usize * PALETTE_CHANNELS;
            out.extend_from_slice(&self.palette[base..base + PALETTE_CHANNELS]);
        }
        out
    }
}

/// The three anchor palette indices of a remap-capable texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemapColors {
    pub low: i32,
    pub mid: i32,
    pub high: i32,
}

/// Detects whether a texture participates in run-time recolorable skins,
/// purely from its declared file name.
///
/// Exact-length match against the `Remap` prefix (case-insensitive):
/// - length 18: "simple" remap; the character after the prefix must be
///   `c`/`C`; low/mid parsed from offsets 7/11, high stays 0.
/// - length 22: "full" remap; low/mid/high parsed from offsets 7/11/15.
/// - the distinguished base name `DM_Base.bmp` maps to 160/191/223.
///
/// Unparsable digit fields leave that anchor at 0 instead of failing, which
/// matches the lenient parsing the original engine shipped with.
pub fn try_get_remap_colors(file_name: &str) -> Option<RemapColors> {
    if file_name.len() == DM_BASE_NAME.len() && file_name.eq_ignore_ascii_case(DM_BASE_NAME) {
        return Some(RemapColors {
            low: 160,
            mid: 191,
            high: 223,
        });
    }

    if (file_name.len() == SIMPLE_REMAP_LENGTH || file_name.len() == FULL_REMAP_LENGTH)
        && file_name
            .get(..REMAP_PREFIX.len())
            .is_some_and(|p| p.eq_ignore_ascii_case(REMAP_PREFIX))
    {
        let bytes = file_name.as_bytes();
        let mut colors = RemapColors::default();

        if file_name.len() == SIMPLE_REMAP_LENGTH {
            let index = bytes[REMAP_PREFIX.len()];
            if index != b'c' && index != b'C' {
                return None;
            }
        } else {
            colors.high = parse_anchor(&bytes[HIGH_OFFSET..HIGH_OFFSET + VALUE_LENGTH]);
        }

        colors.low = parse_anchor(&bytes[LOW_OFFSET..LOW_OFFSET + VALUE_LENGTH]);
        colors.mid = parse_anchor(&bytes[MID_OFFSET..MID_OFFSET + VALUE_LENGTH]);

        return Some(colors);
    }

    None
}

/// Parses the leading decimal digits of a fixed 3-byte field; no digits = 0.
fn parse_anchor(field: &[u8]) -> i32 {
    let digits = field.iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        return 0;
    }
    std::str::from_utf8(&field[..digits])
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Rotates the hue of the inclusive palette index range [start, end] to
/// `new_hue` (0..=255, scaled to 0..360 degrees), preserving each entry's
/// value and saturation.
///
/// Pure black entries have no defined hue (the reconstruction divides by the
/// max channel); they are left unchanged.
pub fn palette_hue_replace(palette: &mut [u8], new_hue: i32, start: usize, end: usize) {
    let hue = new_hue as f32 * (360.0 / 255.0) as f32;

    for i in start..=end.min(PALETTE_ENTRIES - 1) {
        let entry = &mut palette[i * PALETTE_CHANNELS..i * PALETTE_CHANNELS + PALETTE_CHANNELS];

        let mut r = entry[0] as f32;
        let mut g = entry[1] as f32;
        let mut b = entry[2] as f32;

        let maxcol = r.max(g).max(b) / 255.0;
        let mincol = r.min(g).min(b) / 255.0;

        if maxcol == 0.0 {
            continue;
        }

        let val = maxcol;
        let sat = (maxcol - mincol) / maxcol;
        let mincol = val * (1.0 - sat);

        if hue <= 120.0 {
            b = mincol;
            if hue < 60.0 {
                r = val;
                g = mincol + hue * (val - mincol) / (120.0 - hue);
            } else {
                g = val;
                r = mincol + (120.0 - hue) * (val - mincol) / hue;
            }
        } else if hue <= 240.0 {
            r = mincol;
            if hue < 180.0 {
                g = val;
                b = mincol + (hue - 120.0) * (val - mincol) / (240.0 - hue);
            } else {
                b = val;
                g = mincol + (240.0 - hue) * (val - mincol) / (hue - 120.0);
            }
        } else {
            g = mincol;
            if hue < 300.0 {
                b = val;
                r = mincol + (hue - 240.0) * (val - mincol) / (360.0 - hue);
            } else {
                r = val;
                b = mincol + (360.0 - hue) * (val - mincol) / (hue - 240.0);
            }
        }

        entry[0] = (r * 255.0) as u8;
        entry[1] = (g * 255.0) as u8;
        entry[2] = (b * 255.0) as u8;
    }
}

/// Swaps rows top-for-bottom in a packed 24-bit RGB buffer. Used when the
/// image source has inverted row order relative to the rendering convention.
pub fn flip_image_vertically(width: usize, height: usize, data: &mut [u8]) {
    debug_assert_eq!(data.len(), width * height * 3);

    for y in height / 2..height {
        for x in 0..width {
            for i in 0..3 {
                data.swap(
                    (x + y * width) * 3 + i,
                    (x + (height - y - 1) * width) * 3 + i,
                );
            }
        }
    }
}

/// A remap-capable texture: the pristine palette is retained so hue changes
/// always restart from the authored colors instead of compounding.
#[derive(Debug, Clone)]
pub struct RemapTexture {
    pub texture: PaletteTexture,
    pub colors: RemapColors,
    base_palette: Vec<u8>,
}

impl RemapTexture {
    /// Wraps a texture whose name was detected by [`try_get_remap_colors`].
    pub fn new(texture: PaletteTexture, colors: RemapColors) -> Self {
        let base_palette = texture.palette.clone();
        Self {
            texture,
            colors,
            base_palette,
        }
    }

    /// Detects from the texture's own name; None when not a remap texture.
    pub fn detect(texture: PaletteTexture) -> Option<Self> {
        let colors = try_get_remap_colors(&texture.name)?;
        Some(Self::new(texture, colors))
    }

    /// Recolors from the pristine palette: the top hue drives [low, mid] and,
    /// for full remaps (high anchor present), the bottom hue drives
    /// (mid, high].
    pub fn apply_hues(&mut self, top: i32, bottom: i32) {
        self.texture.palette.copy_from_slice(&self.base_palette);

        palette_hue_replace(
            &mut self.texture.palette,
            top,
            self.colors.low as usize,
            self.colors.mid as usize,
        );

        if self.colors.high > self.colors.mid {
            palette_hue_replace(
                &mut self.texture.palette,
                bottom,
                self.colors.mid as usize + 1,
                self.colors.high as usize,
            );
        }
    }
}
