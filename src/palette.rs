/// RGBA color
#[repr(C)]
#[derive(Clone, Copy, Default, PartialEq, Eq, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub(crate) fn to_f32(self) -> [f32; 4] {
        [self.r as f32, self.g as f32, self.b as f32, self.a as f32]
    }
}

/// Color palette generated by quantization.
///
/// Index `i` in a remapped buffer refers to `entries[i]`. Entry order is
/// stable for the life of the owning result: fixed colors come first, then
/// selected colors, and the reserved transparent entry (if any) is last.
#[repr(C)]
pub struct Palette {
    /// The number of colors in the palette
    pub count: u32,
    /// The palette colors; only the first `count` are meaningful
    pub entries: [Color; 256],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            count: 0,
            entries: [Color::default(); 256],
        }
    }
}

impl Palette {
    /// Returns the meaningful entries as a slice of length `count`.
    pub fn as_slice(&self) -> &[Color] {
        &self.entries[..self.count as usize]
    }
}

impl From<&[[f32; 4]]> for Palette {
    fn from(colors: &[[f32; 4]]) -> Self {
        let mut palette = Self::default();
        palette.count = colors.len() as u32;

        for (i, c) in colors.iter().enumerate() {
            palette.entries[i].r = c[0].round().clamp(0.0, 255.0) as u8;
            palette.entries[i].g = c[1].round().clamp(0.0, 255.0) as u8;
            palette.entries[i].b = c[2].round().clamp(0.0, 255.0) as u8;
            palette.entries[i].a = c[3].round().clamp(0.0, 255.0) as u8;
        }

        palette
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_f32_rounds_and_clamps() {
        let colors: &[[f32; 4]] = &[[255.6, -3.0, 127.4, 255.0]];
        let palette = Palette::from(colors);

        assert_eq!(palette.count, 1);
        assert_eq!(palette.entries[0], Color::new(255, 0, 127, 255));
        assert_eq!(palette.as_slice().len(), 1);
    }
}
