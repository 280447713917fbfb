use cbir_core::types::{
    ColorFeatures, DescriptorBundle, ShapeFeatures, TextureFeatures, WeightTree,
    COLOR_HISTOGRAM_LEN, DOMINANT_COLORS_LEN, GABOR_FILTERS_LEN, GLCM_FEATURES_LEN,
};
use cbir_distance::{blended_distance, distance, global_distance, NEUTRAL_DISTANCE};

/// Deterministic pseudo-random fill so symmetry is exercised on busy
/// vectors without pulling in an RNG.
fn wavy(len: usize, phase: f64) -> Vec<f64> {
    (0..len).map(|i| ((i as f64 * 0.37 + phase).sin() + 1.0) * 50.0).collect()
}

fn bundle(phase: f64) -> DescriptorBundle {
    DescriptorBundle {
        color: ColorFeatures {
            histogram: wavy(COLOR_HISTOGRAM_LEN, phase),
            dominant_colors: wavy(DOMINANT_COLORS_LEN, phase + 1.0),
        },
        texture: TextureFeatures {
            gabor_filters: wavy(GABOR_FILTERS_LEN, phase + 2.0),
            glcm_features: wavy(GLCM_FEATURES_LEN, phase + 3.0),
        },
        shape: ShapeFeatures::zeroed(),
    }
}

#[test]
fn self_distance_is_zero() {
    let b = bundle(0.4);
    let d = distance(&b, &b);
    assert!(d.abs() < 1e-12, "self distance {}", d);

    // Also with degenerate all-zero shape vectors on both sides.
    let z = DescriptorBundle {
        color: ColorFeatures {
            histogram: vec![0.0; COLOR_HISTOGRAM_LEN],
            dominant_colors: vec![0.0; DOMINANT_COLORS_LEN],
        },
        texture: TextureFeatures {
            gabor_filters: vec![0.0; GABOR_FILTERS_LEN],
            glcm_features: vec![0.0; GLCM_FEATURES_LEN],
        },
        shape: ShapeFeatures::zeroed(),
    };
    assert!(distance(&z, &z).abs() < 1e-12);
}

#[test]
fn distance_is_symmetric() {
    let a = bundle(0.1);
    let b = bundle(2.7);
    let ab = distance(&a, &b);
    let ba = distance(&b, &a);
    assert_eq!(ab, ba, "blend of symmetric terms must be exactly symmetric");
    assert!(ab > 0.0);
}

#[test]
fn mismatched_or_empty_vectors_score_neutral() {
    assert_eq!(blended_distance(&[1.0, 2.0], &[1.0]), NEUTRAL_DISTANCE);
    assert_eq!(blended_distance(&[], &[]), NEUTRAL_DISTANCE);
    assert_eq!(blended_distance(&[f64::NAN, 1.0], &[0.5, 1.0]), NEUTRAL_DISTANCE);
}

#[test]
fn color_only_difference_ranks_by_color() {
    let query = bundle(0.0);

    // Two candidates identical to the query except in the color histogram.
    let mut near = query.clone();
    near.color.histogram = wavy(COLOR_HISTOGRAM_LEN, 0.05);
    let mut far = query.clone();
    far.color.histogram = wavy(COLOR_HISTOGRAM_LEN, 1.5);

    let weights = WeightTree::default();
    let d_near = global_distance(&query, &near, &weights);
    let d_far = global_distance(&query, &far, &weights);

    let h_near = blended_distance(&query.color.histogram, &near.color.histogram);
    let h_far = blended_distance(&query.color.histogram, &far.color.histogram);
    assert!(h_near < h_far, "fixture ordering");
    assert!(d_near < d_far, "global ranking must follow the color distance");

    // The non-color modalities contribute nothing when identical.
    let expected = weights.color.weight * (weights.color.histogram * h_near / 2.0)
        / (weights.color.weight + weights.texture.weight + weights.shape.weight + 1e-10);
    assert!((d_near - expected).abs() < 1e-9);
}

#[test]
fn weights_shift_the_ranking() {
    let query = bundle(0.0);
    let mut color_twin = bundle(3.0);
    color_twin.color = query.color.clone();
    let mut texture_twin = bundle(5.0);
    texture_twin.texture = query.texture.clone();

    // Color-dominant weights prefer the color twin...
    let mut color_heavy = WeightTree::default();
    color_heavy.color.weight = 10.0;
    color_heavy.texture.weight = 0.01;
    assert!(
        global_distance(&query, &color_twin, &color_heavy)
            < global_distance(&query, &texture_twin, &color_heavy)
    );

    // ...texture-dominant weights prefer the texture twin.
    let mut texture_heavy = WeightTree::default();
    texture_heavy.color.weight = 0.01;
    texture_heavy.texture.weight = 10.0;
    assert!(
        global_distance(&query, &texture_twin, &texture_heavy)
            < global_distance(&query, &color_twin, &texture_heavy)
    );
}
