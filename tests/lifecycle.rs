use palquant::{Attributes, Error, Image};

fn checker_image(width: usize, height: usize) -> Image {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            if (x + y) % 2 == 0 {
                pixels.extend_from_slice(&[255, 255, 255, 255]);
            } else {
                pixels.extend_from_slice(&[0, 0, 0, 255]);
            }
        }
    }
    Image::new(pixels, width, height, 0.0).unwrap()
}

#[test]
fn remap_after_image_release_fails_cleanly() {
    let attr = Attributes::new().unwrap();
    let mut image = checker_image(8, 8);

    let mut result = image.quantize(&attr).unwrap();
    image.release();

    assert!(matches!(
        result.write_remapped_image(),
        Err(Error::UseAfterRelease)
    ));

    // The palette was computed before the release and stays valid.
    assert_eq!(result.palette().count, 2);
    assert!(result.quantization_error().is_finite());
    assert_eq!(result.image_dimensions(), Some((8, 8)));
}

#[test]
fn release_is_idempotent() {
    let attr = Attributes::new().unwrap();
    let mut image = checker_image(4, 4);
    image.release();
    image.release();

    assert!(matches!(image.quantize(&attr), Err(Error::UseAfterRelease)));

    let mut hist = attr.new_histogram();
    hist.release();
    hist.release();
    assert!(matches!(hist.quantize(&attr), Err(Error::UseAfterRelease)));
}

#[test]
fn released_image_cannot_feed_a_histogram() {
    let attr = Attributes::new().unwrap();
    let mut image = checker_image(4, 4);
    image.release();

    let mut hist = attr.new_histogram();
    assert!(matches!(
        hist.add_image(&attr, &image),
        Err(Error::UseAfterRelease)
    ));
}

#[test]
fn histogram_results_outlive_the_histogram() {
    let attr = Attributes::new().unwrap();
    let image = checker_image(8, 8);

    let mut hist = attr.new_histogram();
    hist.add_image(&attr, &image).unwrap();

    let mut result = hist.quantize(&attr).unwrap();
    hist.release();

    assert_eq!(result.palette().count, 2);

    // Histogram-derived results carry no image binding; remapping needs an
    // explicitly supplied image.
    assert!(matches!(
        result.write_remapped_image(),
        Err(Error::InvalidArgument(_))
    ));
    assert_eq!(result.image_dimensions(), None);

    let mut buf = vec![0u8; 8 * 8];
    result.remap_into(&image, &mut buf).unwrap();
    assert!(buf.iter().all(|&i| i < 2));
}

#[test]
fn undersized_remap_buffer_is_rejected() {
    let attr = Attributes::new().unwrap();
    let image = checker_image(8, 8);

    let mut hist = attr.new_histogram();
    hist.add_image(&attr, &image).unwrap();
    let mut result = hist.quantize(&attr).unwrap();

    let mut buf = vec![0u8; 8 * 8 - 1];
    assert!(matches!(
        result.remap_into(&image, &mut buf),
        Err(Error::BufferTooSmall)
    ));
}

#[test]
fn empty_histogram_cannot_be_quantized() {
    let attr = Attributes::new().unwrap();
    let hist = attr.new_histogram();

    assert!(matches!(
        hist.quantize(&attr),
        Err(Error::InvalidArgument(_))
    ));
}
