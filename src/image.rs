use std::sync::Arc;

use crate::attributes::Attributes;
use crate::error::Error;
use crate::histogram::Histogram;
use crate::palette::Color;
use crate::quantize::QuantizeResult;

pub(crate) const SRGB_GAMMA: f64 = 0.45455;

/// Pixel storage shared between an [`Image`] and the results bound to it.
///
/// Results hold only a [`std::sync::Weak`] reference, so releasing the image
/// frees the buffer even while results are alive; a later remap attempt
/// fails to upgrade the reference instead of touching freed memory.
pub(crate) struct ImageData {
    pub pixels: Vec<u8>,
    pub width: usize,
    pub height: usize,
    pub gamma: f64,
}

/// An RGBA raster owned by the pipeline; the unit of quantization and
/// remapping.
pub struct Image {
    data: Option<Arc<ImageData>>,
    width: usize,
    height: usize,
    fixed_colors: Vec<Color>,
}

impl Image {
    /// Creates an [`Image`] from a buffer of `width * height` RGBA pixels,
    /// row-major, alpha last (0 = transparent, 255 = opaque). The buffer is
    /// moved into the image; it is freed by [`Image::release`] or on drop.
    ///
    /// `gamma` must be in `0.0..=1.0`; pass `0.0` for the sRGB default.
    ///
    /// Returns [`Error::InvalidArgument`] if a dimension is zero, the buffer
    /// length does not equal `width * height * 4`, or gamma is out of range.
    pub fn new(pixels: Vec<u8>, width: usize, height: usize, gamma: f64) -> Result<Self, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidArgument("image dimensions must be nonzero"));
        }
        if pixels.len() != width * height * 4 {
            return Err(Error::InvalidArgument(
                "pixel buffer length must equal width * height * 4",
            ));
        }
        if !(0.0..=1.0).contains(&gamma) {
            return Err(Error::InvalidArgument("gamma must be in 0.0..=1.0"));
        }

        let gamma = if gamma == 0.0 { SRGB_GAMMA } else { gamma };

        Ok(Self {
            data: Some(Arc::new(ImageData {
                pixels,
                width,
                height,
                gamma,
            })),
            width,
            height,
            fixed_colors: Vec::new(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Adds a color that must appear verbatim in any palette built from this
    /// image. Fixed colors count against the color budget.
    ///
    /// Returns [`Error::InvalidArgument`] once 256 fixed colors are present
    /// and [`Error::UseAfterRelease`] on a released image.
    pub fn add_fixed_color(&mut self, color: Color) -> Result<(), Error> {
        if self.data.is_none() {
            return Err(Error::UseAfterRelease);
        }
        if self.fixed_colors.len() >= 256 {
            return Err(Error::InvalidArgument("at most 256 fixed colors"));
        }

        if !self.fixed_colors.contains(&color) {
            self.fixed_colors.push(color);
        }

        Ok(())
    }

    pub fn fixed_colors(&self) -> &[Color] {
        &self.fixed_colors
    }

    /// Performs palette generation from this image alone, equivalent to
    /// feeding a fresh histogram with it and quantizing that. The returned
    /// result is bound to this image for remapping.
    ///
    /// Returns [`Error::UseAfterRelease`] on a released image.
    pub fn quantize(&self, attr: &Attributes) -> Result<QuantizeResult, Error> {
        let data = self.shared()?;

        let mut hist = Histogram::new();
        hist.add_image(attr, self)?;

        let mut result = hist.quantize(attr)?;
        result.bind_image(&data);

        Ok(result)
    }

    /// Frees the owned pixel buffer. Idempotent; any later operation on this
    /// image, or remap through a result bound to it, fails with
    /// [`Error::UseAfterRelease`]. Dropping the image without calling this
    /// releases the buffer as well.
    pub fn release(&mut self) {
        self.data.take();
    }

    pub(crate) fn shared(&self) -> Result<Arc<ImageData>, Error> {
        self.data.clone().ok_or(Error::UseAfterRelease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_buffers() {
        assert!(Image::new(vec![0; 16], 2, 2, 0.0).is_ok());
        assert!(Image::new(vec![0; 15], 2, 2, 0.0).is_err());
        assert!(Image::new(vec![0; 17], 2, 2, 0.0).is_err());
        assert!(Image::new(vec![], 0, 2, 0.0).is_err());
        assert!(Image::new(vec![0; 16], 2, 2, 1.5).is_err());
    }

    #[test]
    fn zero_gamma_means_srgb() {
        let image = Image::new(vec![0; 4], 1, 1, 0.0).unwrap();
        assert_eq!(image.shared().unwrap().gamma, SRGB_GAMMA);
    }

    #[test]
    fn release_is_idempotent() {
        let mut image = Image::new(vec![0; 4], 1, 1, 0.0).unwrap();
        image.release();
        image.release();
        assert!(matches!(image.shared(), Err(Error::UseAfterRelease)));
        assert!(matches!(
            image.add_fixed_color(Color::new(0, 0, 0, 255)),
            Err(Error::UseAfterRelease)
        ));
    }
}
