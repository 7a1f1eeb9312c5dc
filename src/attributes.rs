use crate::error::Error;
use crate::histogram::Histogram;
use crate::image::Image;

pub const COLORS_MIN: i32 = 2;
pub const COLORS_MAX: i32 = 256;

pub const QUALITY_MIN: i32 = 0;
pub const QUALITY_MAX: i32 = 100;

pub const SPEED_SLOWEST: i32 = 1;
pub const SPEED_DEFAULT: i32 = 3;
pub const SPEED_FASTEST: i32 = 10;

/// Process-independent quantization settings.
///
/// An [`Attributes`] instance is the entry point of the pipeline: it
/// validates every knob and acts as the factory for [`Image`] and
/// [`Histogram`] objects. Setters either fully apply or fully reject, so a
/// failed call never leaves the configuration half-updated.
pub struct Attributes {
    max_colors: i32,
    quality_min: i32,
    quality_max: i32,
    speed: i32,
    min_opacity: i32,
    min_posterization: i32,
    last_index_transparent: bool,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            max_colors: COLORS_MAX,
            quality_min: QUALITY_MIN,
            quality_max: QUALITY_MAX,
            speed: SPEED_DEFAULT,
            min_opacity: 0,
            min_posterization: 0,
            last_index_transparent: false,
        }
    }
}

impl Attributes {
    /// Creates an [`Attributes`] with default settings.
    ///
    /// Returns [`Error::UnsupportedPlatform`] if a processing context cannot
    /// be created. The pure-Rust pipeline has no platform requirements, so
    /// this build never returns it; the variant is part of the contract for
    /// callers that must handle it generically.
    pub fn new() -> Result<Self, Error> {
        Ok(Self::default())
    }

    /// Sets the maximum number of colors in the generated palette.
    ///
    /// Returns [`Error::InvalidArgument`] if `colors` is not in `2..=256`
    pub fn set_max_colors(&mut self, colors: i32) -> Result<(), Error> {
        if !(COLORS_MIN..=COLORS_MAX).contains(&colors) {
            return Err(Error::InvalidArgument("max_colors must be in 2..=256"));
        }

        self.max_colors = colors;

        Ok(())
    }

    pub fn max_colors(&self) -> i32 {
        self.max_colors
    }

    /// Sets the acceptable quality range, both bounds in `0..=100`.
    ///
    /// Quantization fails with [`Error::QualityTooLow`] when no palette
    /// under the color budget reaches `minimum`; the selector stops adding
    /// colors once `maximum` is reached. Returns [`Error::InvalidArgument`]
    /// without touching either stored bound if the range is invalid.
    pub fn set_quality(&mut self, minimum: i32, maximum: i32) -> Result<(), Error> {
        if !(QUALITY_MIN..=QUALITY_MAX).contains(&minimum)
            || !(QUALITY_MIN..=QUALITY_MAX).contains(&maximum)
        {
            return Err(Error::InvalidArgument("quality must be in 0..=100"));
        }
        if minimum > maximum {
            return Err(Error::InvalidArgument(
                "minimum quality must not exceed maximum quality",
            ));
        }

        self.quality_min = minimum;
        self.quality_max = maximum;

        Ok(())
    }

    pub fn min_quality(&self) -> i32 {
        self.quality_min
    }

    pub fn max_quality(&self) -> i32 {
        self.quality_max
    }

    /// Sets the speed/quality tradeoff: 1 is slowest and most thorough, 10
    /// is fastest. Speeds above 3 sample fewer pixels for statistics; speeds
    /// below 4 add palette refinement passes.
    ///
    /// Returns [`Error::InvalidArgument`] if `speed` is not in `1..=10`
    pub fn set_speed(&mut self, speed: i32) -> Result<(), Error> {
        if !(SPEED_SLOWEST..=SPEED_FASTEST).contains(&speed) {
            return Err(Error::InvalidArgument("speed must be in 1..=10"));
        }

        self.speed = speed;

        Ok(())
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    /// Sets the alpha floor in `0..=255`. Sampled colors with alpha below
    /// the floor are folded into the fully transparent bucket instead of
    /// being kept distinct.
    pub fn set_min_opacity(&mut self, min: i32) -> Result<(), Error> {
        if !(0..=255).contains(&min) {
            return Err(Error::InvalidArgument("min_opacity must be in 0..=255"));
        }

        self.min_opacity = min;

        Ok(())
    }

    pub fn min_opacity(&self) -> i32 {
        self.min_opacity
    }

    /// Sets how many low bits per channel are discarded before clustering,
    /// in `0..=4`. Nonzero values deliberately coarsen the palette.
    pub fn set_min_posterization(&mut self, bits: i32) -> Result<(), Error> {
        if !(0..=4).contains(&bits) {
            return Err(Error::InvalidArgument(
                "min_posterization must be in 0..=4",
            ));
        }

        self.min_posterization = bits;

        Ok(())
    }

    pub fn min_posterization(&self) -> i32 {
        self.min_posterization
    }

    /// Reserves the last palette index for a fully transparent entry
    /// whenever the quantized input contains transparent pixels.
    pub fn set_last_index_transparent(&mut self, is_last: bool) {
        self.last_index_transparent = is_last;
    }

    pub fn last_index_transparent(&self) -> bool {
        self.last_index_transparent
    }

    /// Creates an empty [`Histogram`] for building a palette shared between
    /// several images.
    pub fn new_histogram(&self) -> Histogram {
        Histogram::new()
    }

    /// Creates an [`Image`] from a buffer of RGBA pixels. See
    /// [`Image::new`].
    pub fn new_image(
        &self,
        pixels: Vec<u8>,
        width: usize,
        height: usize,
        gamma: f64,
    ) -> Result<Image, Error> {
        Image::new(pixels, width, height, gamma)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let attr = Attributes::new().unwrap();
        assert_eq!(attr.max_colors(), 256);
        assert_eq!(attr.min_quality(), 0);
        assert_eq!(attr.max_quality(), 100);
        assert_eq!(attr.speed(), SPEED_DEFAULT);
        assert_eq!(attr.min_opacity(), 0);
        assert_eq!(attr.min_posterization(), 0);
        assert!(!attr.last_index_transparent());
    }

    #[test]
    fn setters_validate_range() {
        let mut attr = Attributes::default();

        assert!(attr.set_max_colors(1).is_err());
        assert!(attr.set_max_colors(257).is_err());
        assert!(attr.set_max_colors(2).is_ok());

        assert!(attr.set_speed(0).is_err());
        assert!(attr.set_speed(11).is_err());
        assert!(attr.set_speed(10).is_ok());

        assert!(attr.set_min_opacity(256).is_err());
        assert!(attr.set_min_posterization(5).is_err());
    }

    #[test]
    fn quality_setter_is_atomic() {
        let mut attr = Attributes::default();
        attr.set_quality(10, 90).unwrap();

        assert!(attr.set_quality(80, 20).is_err());
        assert_eq!(attr.min_quality(), 10);
        assert_eq!(attr.max_quality(), 90);

        assert!(attr.set_quality(-1, 50).is_err());
        assert!(attr.set_quality(0, 101).is_err());
        assert_eq!(attr.min_quality(), 10);
        assert_eq!(attr.max_quality(), 90);
    }
}
