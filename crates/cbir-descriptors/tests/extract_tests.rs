use image::{DynamicImage, GrayImage, Rgb, RgbImage};

use cbir_core::types::{
    COLOR_HISTOGRAM_LEN, DOMINANT_COLORS_LEN, GABOR_FILTERS_LEN, GLCM_FEATURES_LEN,
    HU_MOMENTS_LEN, SHAPE_DESCRIPTORS_LEN,
};
use cbir_descriptors::{extract, shape::shape_features};

fn solid(width: u32, height: u32, value: u8) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([value, value, value])))
}

fn assert_bundle_shape(img: &DynamicImage) {
    let bundle = extract(img);
    assert_eq!(bundle.color.histogram.len(), COLOR_HISTOGRAM_LEN);
    assert_eq!(bundle.color.dominant_colors.len(), DOMINANT_COLORS_LEN);
    assert_eq!(bundle.texture.gabor_filters.len(), GABOR_FILTERS_LEN);
    assert_eq!(bundle.texture.glcm_features.len(), GLCM_FEATURES_LEN);
    assert_eq!(bundle.shape.hu_moments.len(), HU_MOMENTS_LEN);
    assert_eq!(bundle.shape.shape_descriptors.len(), SHAPE_DESCRIPTORS_LEN);
}

#[test]
fn fixed_lengths_for_valid_and_degenerate_inputs() {
    assert_bundle_shape(&solid(16, 16, 0));
    assert_bundle_shape(&solid(16, 16, 255));
    assert_bundle_shape(&solid(1, 1, 40));

    let mut gradient = RgbImage::new(32, 8);
    for (x, _, px) in gradient.enumerate_pixels_mut() {
        *px = Rgb([(x * 8) as u8, 128, 255 - (x * 8) as u8]);
    }
    assert_bundle_shape(&DynamicImage::ImageRgb8(gradient));
}

#[test]
fn histogram_channels_each_sum_to_one() {
    let bundle = extract(&solid(24, 24, 90));
    for channel in bundle.color.histogram.chunks(256) {
        let sum: f64 = channel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6, "channel sum {}", sum);
    }
    // A solid value-90 image puts all mass in bin 90.
    assert!((bundle.color.histogram[90] - 1.0).abs() < 1e-6);
}

#[test]
fn dominant_color_fractions_sum_to_one() {
    let bundle = extract(&solid(16, 16, 200));
    let fractions = &bundle.color.dominant_colors[9..];
    let sum: f64 = fractions.iter().sum();
    assert!((sum - 1.0).abs() < 1e-9, "fraction sum {}", sum);
    // Clustering a solid image can only place centers on the one color.
    for center in bundle.color.dominant_colors[..9].chunks(3) {
        for &c in center {
            assert!((c - 200.0).abs() < 1e-9, "center value {}", c);
        }
    }
}

#[test]
fn contour_less_image_yields_zero_shape_vectors() {
    // Everything at or below the threshold is background.
    let bundle = extract(&solid(20, 20, 0));
    assert!(bundle.shape.hu_moments.iter().all(|&v| v == 0.0));
    assert!(bundle.shape.shape_descriptors.iter().all(|&v| v == 0.0));
}

#[test]
fn gabor_of_black_image_is_zero() {
    let bundle = extract(&solid(24, 24, 0));
    for &r in &bundle.texture.gabor_filters {
        assert!(r.abs() < 1e-9, "response {}", r);
    }
}

#[test]
fn constant_image_glcm_statistics() {
    let value = 200.0;
    let bundle = extract(&solid(24, 24, 200));
    // Every co-occurring pair is (200, 200): no contrast, correlation at
    // value^2, energy concentrated in a single cell.
    for angle in bundle.texture.glcm_features.chunks(3) {
        assert!(angle[0].abs() < 1e-6, "contrast {}", angle[0]);
        assert!((angle[1] - value * value).abs() < 1e-3, "correlation {}", angle[1]);
        assert!((angle[2] - 1.0).abs() < 1e-6, "energy {}", angle[2]);
    }
}

#[test]
fn white_rectangle_shape_descriptors() {
    let bundle = extract(&solid(20, 10, 255));
    let sd = &bundle.shape.shape_descriptors;
    // Bounding box is the full 20x10 image; the boundary polygon through
    // pixel centers encloses 19x9.
    assert!((sd[0] - 2.0).abs() < 1e-9, "aspect ratio {}", sd[0]);
    let expected_area = 19.0 * 9.0;
    assert!((sd[2] - expected_area).abs() < 1e-6, "area {}", sd[2]);
    assert!((sd[1] - expected_area / 200.0).abs() < 1e-6, "extent {}", sd[1]);
}

#[test]
fn hu_moments_are_translation_invariant() {
    let square = |ox: u32, oy: u32| {
        let mut img = GrayImage::new(48, 48);
        for y in 0..10 {
            for x in 0..10 {
                img.put_pixel(ox + x, oy + y, image::Luma([255]));
            }
        }
        shape_features(&img)
    };

    let a = square(3, 3);
    let b = square(30, 20);
    for (va, vb) in a.hu_moments.iter().zip(&b.hu_moments) {
        assert!((va - vb).abs() < 1e-9, "hu {} vs {}", va, vb);
    }
    // Same square, same descriptors.
    assert_eq!(a.shape_descriptors, b.shape_descriptors);
}
