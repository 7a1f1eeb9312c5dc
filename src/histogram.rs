use std::collections::HashMap;

use crate::attributes::Attributes;
use crate::error::Error;
use crate::image::Image;
use crate::palette::Color;
use crate::quantize::QuantizeResult;

/// One quantized-color bucket: an RGBA color and the number of sampled
/// pixels that fell into it. Passed to [`crate::PaletteSelector`]
/// implementations.
#[derive(Clone, Copy, Debug)]
pub struct HistogramEntry {
    pub color: [u8; 4],
    pub weight: u32,
}

fn hist_key(c: [u8; 4]) -> u32 {
    u32::from_le_bytes(c)
}

/// Discards the lowest `bits` of a channel, replicating the kept high bits
/// downward so the channel still spans the full 0..=255 range.
fn posterize(c: u8, bits: u32) -> u8 {
    if bits == 0 {
        return c;
    }

    let kept = c & (0xFFu8 << bits);
    kept | (kept >> (8 - bits))
}

/// Color statistics accumulated from one or more images.
///
/// A histogram keeps only quantized-color weights, never pixel buffers, so
/// it may outlive the images it was built from. Use it when one palette must
/// serve several images; a single image can be quantized directly via
/// [`Image::quantize`].
pub struct Histogram {
    map: HashMap<u32, HistogramEntry>,
    fixed_colors: Vec<Color>,
    has_transparency: bool,
    released: bool,
}

impl Histogram {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            fixed_colors: Vec::new(),
            has_transparency: false,
            released: false,
        }
    }

    /// Learns colors from the image. The image may be released afterwards;
    /// the histogram keeps derived statistics only. Fixed colors added to
    /// the image are folded in as always-kept entries.
    ///
    /// Sampling honors the attributes: speeds above 3 scan a subset of
    /// pixels (bucket weights are scaled to compensate), each channel is
    /// posterized by `min_posterization` bits (one more at speed 9 and up),
    /// and alpha below `min_opacity` collapses into the transparent bucket.
    ///
    /// Returns [`Error::UseAfterRelease`] if this histogram or the image was
    /// released.
    pub fn add_image(&mut self, attr: &Attributes, image: &Image) -> Result<(), Error> {
        if self.released {
            return Err(Error::UseAfterRelease);
        }
        let data = image.shared()?;

        let stride = match attr.speed() {
            ..=3 => 1usize,
            4..=6 => 2,
            7..=8 => 3,
            _ => 4,
        };
        let mut bits = attr.min_posterization() as u32;
        if attr.speed() >= 9 {
            bits = (bits + 1).min(4);
        }
        let min_opacity = attr.min_opacity() as u8;

        for ind in (0..data.width * data.height).step_by(stride) {
            let pix = &data.pixels[ind * 4..ind * 4 + 4];

            let mut color = [
                posterize(pix[0], bits),
                posterize(pix[1], bits),
                posterize(pix[2], bits),
                posterize(pix[3], bits),
            ];
            if color[3] < min_opacity || color[3] == 0 {
                color = [0, 0, 0, 0];
                self.has_transparency = true;
            }

            self.bump(color, stride as u32);
        }

        for &fixed in image.fixed_colors() {
            if !self.fixed_colors.contains(&fixed) {
                self.fixed_colors.push(fixed);
            }
            self.bump([fixed.r, fixed.g, fixed.b, fixed.a], 1);
        }

        Ok(())
    }

    /// Generates a palette from the accumulated statistics. The returned
    /// result carries no image binding; remap it with
    /// [`QuantizeResult::remap_into`].
    ///
    /// Returns [`Error::InvalidArgument`] on an empty histogram,
    /// [`Error::UseAfterRelease`] on a released one, and
    /// [`Error::QualityTooLow`] when no palette under the color budget
    /// reaches the configured minimum quality.
    pub fn quantize(&self, attr: &Attributes) -> Result<QuantizeResult, Error> {
        if self.released {
            return Err(Error::UseAfterRelease);
        }

        QuantizeResult::from_histogram(self, attr)
    }

    /// Like [`Histogram::quantize`], but with a caller-supplied palette
    /// selector instead of the built-in median cut.
    pub fn quantize_with(
        &self,
        attr: &Attributes,
        selector: &dyn crate::selector::PaletteSelector,
    ) -> Result<QuantizeResult, Error> {
        if self.released {
            return Err(Error::UseAfterRelease);
        }

        QuantizeResult::from_histogram_with(self, attr, selector)
    }

    /// Drops the accumulated statistics. Idempotent. Results already
    /// produced from this histogram stay valid; they own their palette.
    pub fn release(&mut self) {
        self.map = HashMap::new();
        self.fixed_colors = Vec::new();
        self.released = true;
    }

    fn bump(&mut self, color: [u8; 4], weight: u32) {
        self.map
            .entry(hist_key(color))
            .and_modify(|e| e.weight += weight)
            .or_insert(HistogramEntry { color, weight });
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Entries in deterministic order; palette selection must not depend on
    /// hash-map iteration order.
    pub(crate) fn entries(&self) -> Vec<HistogramEntry> {
        let mut entries: Vec<HistogramEntry> = self.map.values().copied().collect();
        entries.sort_unstable_by_key(|e| hist_key(e.color));
        entries
    }

    pub(crate) fn fixed_colors(&self) -> &[Color] {
        &self.fixed_colors
    }

    pub(crate) fn has_transparency(&self) -> bool {
        self.has_transparency
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}
