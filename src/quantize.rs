use std::sync::{Arc, Weak};

use crate::attributes::Attributes;
use crate::colormap::Colormap;
use crate::error::Error;
use crate::histogram::Histogram;
use crate::image::{Image, ImageData, SRGB_GAMMA};
use crate::palette::Palette;
use crate::selector::{MedianCut, PaletteSelector};

/// Largest possible mean squared RGBA distance (four channels, 0..=255).
const MAX_MSE: f64 = 4.0 * 255.0 * 255.0;

/// Maps a mean-squared-error value to the 0..=100 quality scale shared with
/// [`Attributes::set_quality`]: `(1 - rms / max_rms) * 100`, so 100 means a
/// lossless palette and lower is worse.
pub(crate) fn quality_from_mse(mse: f64) -> f64 {
    ((1.0 - (mse / MAX_MSE).sqrt()) * 100.0).clamp(0.0, 100.0)
}

/// Result of quantization: an owned palette plus quality metrics, and the
/// machinery to remap pixels to palette indices.
///
/// Both error metrics are the weighted mean squared Euclidean distance in
/// 8-bit RGBA space between source colors and their palette entries
/// (0 ..= 4·255²); see [`QuantizeResult::quantization_quality`] for the
/// 0..=100 mapping. The palette entry order is fixed for the life of the
/// result.
///
/// A result produced from an [`Image`] holds a non-owning reference back to
/// its pixels; releasing that image makes [`write_remapped_image`] fail with
/// [`Error::UseAfterRelease`] while the palette itself stays usable. A
/// result produced from a [`Histogram`] has no bound image and can only be
/// remapped via [`remap_into`].
///
/// [`write_remapped_image`]: QuantizeResult::write_remapped_image
/// [`remap_into`]: QuantizeResult::remap_into
pub struct QuantizeResult {
    palette: Palette,
    colormap: Colormap,
    quantization_error: f64,
    remapping_error: Option<f64>,
    dithering_level: f32,
    output_gamma: f64,
    transparent_index: Option<u8>,
    image: Option<Weak<ImageData>>,
    width: usize,
    height: usize,
}

impl QuantizeResult {
    pub(crate) fn from_histogram(hist: &Histogram, attr: &Attributes) -> Result<Self, Error> {
        Self::from_histogram_with(hist, attr, &MedianCut)
    }

    pub(crate) fn from_histogram_with(
        hist: &Histogram,
        attr: &Attributes,
        selector: &dyn PaletteSelector,
    ) -> Result<Self, Error> {
        if hist.is_empty() {
            return Err(Error::InvalidArgument("histogram is empty"));
        }

        let max_colors = attr.max_colors() as usize;
        let fixed = hist.fixed_colors();

        let Some(budget) = max_colors.checked_sub(fixed.len()) else {
            return Err(Error::InvalidArgument(
                "more fixed colors than the color budget",
            ));
        };

        let reserve_transparent = attr.last_index_transparent() && hist.has_transparency();
        let budget = if reserve_transparent {
            let Some(budget) = budget.checked_sub(1) else {
                return Err(Error::InvalidArgument(
                    "fixed colors leave no room for the transparent index",
                ));
            };
            budget
        } else {
            budget
        };

        let mut entries = hist.entries();
        if reserve_transparent {
            entries.retain(|e| e.color[3] != 0);
        }
        if !fixed.is_empty() {
            // Fixed colors enter the palette verbatim; clustering them again
            // would duplicate entries.
            entries.retain(|e| {
                let c = crate::palette::Color::new(e.color[0], e.color[1], e.color[2], e.color[3]);
                !fixed.contains(&c)
            });
        }

        let selected = selector.select(&entries, budget, attr);

        let mut colors: Vec<[f32; 4]> = fixed.iter().map(|c| c.to_f32()).collect();
        colors.extend_from_slice(&selected);
        if reserve_transparent {
            colors.push([0.0, 0.0, 0.0, 0.0]);
        }

        let palette = Palette::from(colors.as_slice());
        let colormap = Colormap::from_palette(&palette);

        // Measure against the rounded palette the caller will actually get.
        let mut error_sum = 0f64;
        let mut weight_sum = 0u64;
        for e in hist.entries() {
            let color = [
                e.color[0] as f32,
                e.color[1] as f32,
                e.color[2] as f32,
                e.color[3] as f32,
            ];
            let (ind, dist) = colormap.nearest_ind(&color);
            if !(e.color[3] == 0 && colormap.color(ind)[3] == 0.0) {
                error_sum += dist as f64 * e.weight as f64;
            }
            weight_sum += e.weight as u64;
        }
        let quantization_error = error_sum / weight_sum as f64;

        if quality_from_mse(quantization_error) < attr.min_quality() as f64 {
            return Err(Error::QualityTooLow);
        }

        let transparent_index = if reserve_transparent {
            Some((palette.count - 1) as u8)
        } else {
            None
        };

        Ok(Self {
            palette,
            colormap,
            quantization_error,
            remapping_error: None,
            dithering_level: 1.0,
            output_gamma: SRGB_GAMMA,
            transparent_index,
            image: None,
            width: 0,
            height: 0,
        })
    }

    pub(crate) fn bind_image(&mut self, data: &Arc<ImageData>) {
        self.width = data.width;
        self.height = data.height;
        self.output_gamma = data.gamma;
        self.image = Some(Arc::downgrade(data));
    }

    /// Returns the generated [`Palette`]. Index `i` in a remapped buffer
    /// refers to entry `i`.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Index of the reserved fully transparent palette entry, present when
    /// [`Attributes::set_last_index_transparent`] was enabled and the input
    /// contained transparent pixels.
    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent_index
    }

    /// Sets the dithering strength used by the remap step: 0.0 remaps each
    /// pixel to its nearest palette entry, values up to 1.0 diffuse the
    /// remaining error to neighboring pixels to reduce banding.
    ///
    /// Returns [`Error::InvalidArgument`] if `level` is outside `0.0..=1.0`
    pub fn set_dithering_level(&mut self, level: f32) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&level) {
            return Err(Error::InvalidArgument(
                "dithering level must be in 0.0..=1.0",
            ));
        }

        self.dithering_level = level;

        Ok(())
    }

    pub fn dithering_level(&self) -> f32 {
        self.dithering_level
    }

    /// Sets the gamma the remapped output should be interpreted with; pass
    /// `0.0` for the sRGB default. Defaults to the bound image's gamma.
    ///
    /// Returns [`Error::InvalidArgument`] if `gamma` is outside `0.0..=1.0`
    pub fn set_output_gamma(&mut self, gamma: f64) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&gamma) {
            return Err(Error::InvalidArgument("gamma must be in 0.0..=1.0"));
        }

        self.output_gamma = if gamma == 0.0 { SRGB_GAMMA } else { gamma };

        Ok(())
    }

    pub fn output_gamma(&self) -> f64 {
        self.output_gamma
    }

    /// Width and height of the bound image, or `None` for histogram-derived
    /// results. Dimensions are cached at quantization time, so they remain
    /// available after the image is released.
    pub fn image_dimensions(&self) -> Option<(usize, usize)> {
        self.image.as_ref().map(|_| (self.width, self.height))
    }

    /// Mean squared error of the palette against the source statistics.
    /// Lower is better; 0.0 means every source color is in the palette.
    pub fn quantization_error(&self) -> f64 {
        self.quantization_error
    }

    /// [`quantization_error`](QuantizeResult::quantization_error) mapped to
    /// the 0..=100 quality scale of [`Attributes::set_quality`].
    pub fn quantization_quality(&self) -> f64 {
        quality_from_mse(self.quantization_error)
    }

    /// Mean squared error of the most recent remap, measured between the
    /// original pixels and their assigned palette entries. `None` before the
    /// first remap. With dithering this usually differs from
    /// [`quantization_error`](QuantizeResult::quantization_error).
    pub fn remapping_error(&self) -> Option<f64> {
        self.remapping_error
    }

    pub fn remapping_quality(&self) -> Option<f64> {
        self.remapping_error.map(quality_from_mse)
    }

    /// Remaps the bound image into a freshly allocated buffer of
    /// `width * height` palette indices, row-major.
    ///
    /// Returns [`Error::InvalidArgument`] on a histogram-derived result,
    /// [`Error::UseAfterRelease`] if the bound image was released, and
    /// [`Error::OutOfMemory`] if the index buffer cannot be allocated.
    pub fn write_remapped_image(&mut self) -> Result<Vec<u8>, Error> {
        let weak = self
            .image
            .as_ref()
            .ok_or(Error::InvalidArgument("result is not bound to an image"))?;
        let data = weak.upgrade().ok_or(Error::UseAfterRelease)?;

        let size = data.width * data.height;
        let mut buf = Vec::new();
        buf.try_reserve_exact(size).map_err(|_| Error::OutOfMemory)?;
        buf.resize(size, 0);

        self.remap(&data, &mut buf);

        Ok(buf)
    }

    /// Remaps an explicitly supplied image into a caller-owned buffer. This
    /// is the remap path for histogram-derived results; the image does not
    /// have to be one the histogram was built from.
    ///
    /// Returns [`Error::BufferTooSmall`] if `buf` is shorter than
    /// `width * height` and [`Error::UseAfterRelease`] on a released image.
    pub fn remap_into(&mut self, image: &Image, buf: &mut [u8]) -> Result<(), Error> {
        let data = image.shared()?;

        if buf.len() < data.width * data.height {
            return Err(Error::BufferTooSmall);
        }

        self.remap(&data, buf);

        Ok(())
    }

    fn remap(&mut self, data: &ImageData, buf: &mut [u8]) {
        let error_sum = if self.dithering_level > 0.0 {
            self.remap_dither(data, buf)
        } else {
            self.remap_no_dither(data, buf)
        };

        self.remapping_error = Some(error_sum / (data.width * data.height) as f64);
    }

    /// Squared distance charged to the remap error for one pixel. Mapping a
    /// fully transparent pixel to a fully transparent entry is free; the
    /// entry's RGB is meaningless there.
    fn pixel_error(&self, pix: &[f32; 4], ind: usize) -> f64 {
        let pal = self.colormap.color(ind);
        if pix[3] == 0.0 && pal[3] == 0.0 {
            return 0.0;
        }

        ((pix[0] - pal[0]).powi(2)
            + (pix[1] - pal[1]).powi(2)
            + (pix[2] - pal[2]).powi(2)
            + (pix[3] - pal[3]).powi(2)) as f64
    }

    fn remap_no_dither(&self, data: &ImageData, buf: &mut [u8]) -> f64 {
        let mut error_sum = 0f64;

        for point in 0..data.width * data.height {
            let pix = &data.pixels[point * 4..point * 4 + 4];
            let pix = [pix[0] as f32, pix[1] as f32, pix[2] as f32, pix[3] as f32];

            let ind = match self.transparent_index {
                Some(ti) if pix[3] == 0.0 => ti as usize,
                _ => self.colormap.nearest_ind(&pix).0,
            };

            buf[point] = ind as u8;
            error_sum += self.pixel_error(&pix, ind);
        }

        error_sum
    }

    /// Serpentine error diffusion with a 7/3/5/1 kernel. Carried and emitted
    /// errors larger than the quantization error are damped to keep noisy
    /// areas from smearing.
    fn remap_dither(&self, data: &ImageData, buf: &mut [u8]) -> f64 {
        let error_size = data.width + 2;
        let mut error_curr = vec![[0f32; 4]; error_size];
        let mut error_next = vec![[0f32; 4]; error_size];

        let dithering_coeff = self.dithering_level * 15.0 / 16.0 / 16.0;
        let err_threshold = self.quantization_error as f32;

        let mut error_sum = 0f64;
        let mut x_reverse = true;

        for y in 0..data.height {
            x_reverse = !x_reverse;

            let mut x = match x_reverse {
                false => 0,
                true => data.width - 1,
            };

            loop {
                let point = data.width * y + x;
                let data_point = point * 4;

                let err_ind = x + 1;
                let err_inds = match x_reverse {
                    false => [err_ind - 1, err_ind, err_ind + 1],
                    true => [err_ind + 1, err_ind, err_ind - 1],
                };

                let pix = &data.pixels[data_point..data_point + 4];
                let pix = [pix[0] as f32, pix[1] as f32, pix[2] as f32, pix[3] as f32];

                if let Some(ti) = self.transparent_index {
                    if pix[3] == 0.0 {
                        // Transparent pixels take the reserved index and
                        // neither receive nor emit dithering error.
                        buf[point] = ti;

                        if x_reverse {
                            if x == 0 {
                                break;
                            }
                            x -= 1;
                        } else {
                            x += 1;
                            if x >= data.width {
                                break;
                            }
                        }
                        continue;
                    }
                }

                let err_pix = &mut error_curr[err_ind];

                let err_total =
                    err_pix[0].powi(2) + err_pix[1].powi(2) + err_pix[2].powi(2) + err_pix[3].powi(2);
                if err_total > err_threshold {
                    for e in err_pix.iter_mut() {
                        *e *= 0.8;
                    }
                }

                let dith_pix = [
                    pix[0] + err_pix[0],
                    pix[1] + err_pix[1],
                    pix[2] + err_pix[2],
                    pix[3] + err_pix[3],
                ];

                let (ind, _) = self.colormap.nearest_ind(&dith_pix);
                buf[point] = ind as u8;
                error_sum += self.pixel_error(&pix, ind);

                let pal_pix = self.colormap.color(ind);
                let mut err = [
                    dith_pix[0] - pal_pix[0],
                    dith_pix[1] - pal_pix[1],
                    dith_pix[2] - pal_pix[2],
                    dith_pix[3] - pal_pix[3],
                ];

                let err_total = err[0].powi(2) + err[1].powi(2) + err[2].powi(2) + err[3].powi(2);
                if err_total > err_threshold {
                    for e in err.iter_mut() {
                        *e *= 0.75;
                    }
                }

                for e in err.iter_mut() {
                    *e *= dithering_coeff;
                }

                for ch in 0..4 {
                    error_next[err_inds[0]][ch] += err[ch] * 3.0;
                    error_next[err_inds[1]][ch] += err[ch] * 5.0;
                    error_next[err_inds[2]][ch] += err[ch] * 1.0;
                    error_curr[err_inds[2]][ch] += err[ch] * 7.0;
                }

                if x_reverse {
                    if x == 0 {
                        break;
                    }
                    x -= 1;
                } else {
                    x += 1;
                    if x >= data.width {
                        break;
                    }
                }
            }

            std::mem::swap(&mut error_curr, &mut error_next);
            error_next.fill_with(|| [0f32; 4]);
        }

        error_sum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_scale_endpoints() {
        assert_eq!(quality_from_mse(0.0), 100.0);
        assert_eq!(quality_from_mse(MAX_MSE), 0.0);
        assert_eq!(quality_from_mse(MAX_MSE * 2.0), 0.0);

        let mid = quality_from_mse(MAX_MSE / 4.0);
        assert!((mid - 50.0).abs() < 1e-9);
    }
}
