//! Reduces full-color RGBA rasters to indexed images with palettes of at
//! most 256 colors, with optional error-diffusion dithering during remap.
//!
//! The pipeline is [`Attributes`] → ([`Histogram`] | [`Image`]) →
//! [`QuantizeResult`]: configure once, learn color statistics from one or
//! more images (or quantize a single image directly), then remap pixels to
//! palette indices.
//!
//! ```
//! use palquant::Attributes;
//!
//! # fn main() -> Result<(), palquant::Error> {
//! let mut attr = Attributes::new()?;
//! attr.set_max_colors(16)?;
//!
//! let pixels = vec![0u8; 8 * 8 * 4];
//! let image = attr.new_image(pixels, 8, 8, 0.0)?;
//!
//! let mut result = image.quantize(&attr)?;
//! result.set_dithering_level(1.0)?;
//!
//! let indexes = result.write_remapped_image()?;
//! let palette = result.palette();
//! assert_eq!(indexes.len(), 8 * 8);
//! assert!(palette.count <= 16);
//! # Ok(())
//! # }
//! ```

mod attributes;
mod cluster;
mod colormap;
mod error;
mod histogram;
mod image;
mod palette;
mod quantize;
mod selector;

pub use attributes::{
    Attributes, COLORS_MAX, COLORS_MIN, QUALITY_MAX, QUALITY_MIN, SPEED_DEFAULT, SPEED_FASTEST,
    SPEED_SLOWEST,
};
pub use error::Error;
pub use histogram::{Histogram, HistogramEntry};
pub use image::Image;
pub use palette::{Color, Palette};
pub use quantize::QuantizeResult;
pub use selector::{MedianCut, PaletteSelector};
