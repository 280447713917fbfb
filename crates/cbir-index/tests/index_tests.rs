use std::fs;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use cbir_core::error::Error;
use cbir_index::{cache, CorpusIndex};

fn write_image(dir: &std::path::Path, name: &str, value: u8) -> std::path::PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(6, 6, Rgb([value, value / 2, 255 - value]))
        .save(&path)
        .expect("save image");
    path
}

#[test]
fn load_computes_and_persists_cache() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    write_image(&data_dir, "a.png", 30);
    write_image(&data_dir, "b.png", 220);
    let cache_path = tmp.path().join("descriptors.json");

    let index = CorpusIndex::load(&data_dir, &cache_path).expect("load");
    assert_eq!(index.len(), 2);
    assert!(cache_path.exists(), "snapshot persisted");

    // A second load restores from the snapshot and reproduces every numeric
    // sub-vector within floating tolerance.
    let reloaded = CorpusIndex::load(&data_dir, &cache_path).expect("reload");
    assert_eq!(reloaded.len(), 2);
    for (id, bundle) in index.ids().iter().zip(index.bundles()) {
        let restored = reloaded.lookup(id).expect("cached entry");
        for (x, y) in bundle.flatten().iter().zip(restored.flatten()) {
            assert!((x - y).abs() < 1e-9, "{} vs {}", x, y);
        }
    }
}

#[test]
fn lookup_unknown_id_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    write_image(&data_dir, "a.png", 120);

    let index = CorpusIndex::load(&data_dir, &tmp.path().join("cache.json")).unwrap();
    let err = index.lookup("no-such-image.png").unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[test]
fn cache_is_authoritative_when_files_disappear() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    let a = write_image(&data_dir, "a.png", 10);
    write_image(&data_dir, "b.png", 99);
    let cache_path = tmp.path().join("cache.json");

    let first = CorpusIndex::load(&data_dir, &cache_path).unwrap();
    assert_eq!(first.len(), 2);

    fs::remove_file(&a).unwrap();
    let second = CorpusIndex::load(&data_dir, &cache_path).unwrap();
    assert_eq!(second.len(), 2, "cached entry outlives its source file");
    assert!(second.lookup(&a.to_string_lossy()).is_ok());
}

#[test]
fn unreadable_images_are_skipped_not_fatal() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    write_image(&data_dir, "good.png", 77);
    fs::write(data_dir.join("broken.png"), b"definitely not a png").unwrap();

    let index = CorpusIndex::load(&data_dir, &tmp.path().join("cache.json")).unwrap();
    assert_eq!(index.len(), 1, "only the decodable image is indexed");
}

#[test]
fn snapshot_round_trips_numeric_arrays() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    fs::create_dir_all(&data_dir).unwrap();
    write_image(&data_dir, "a.png", 150);
    let cache_path = tmp.path().join("cache.json");

    CorpusIndex::load(&data_dir, &cache_path).unwrap();
    let snapshot = cache::read_snapshot(&cache_path).unwrap();
    cache::write_snapshot(&cache_path, &snapshot).unwrap();
    let again = cache::read_snapshot(&cache_path).unwrap();

    for (id, bundle) in &snapshot {
        let other = &again[id];
        assert_eq!(bundle.flatten(), other.flatten());
    }
}
