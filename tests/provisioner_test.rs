use std::fs;
use std::sync::atomic::Ordering;

use tempfile::TempDir;

use neural_style_rs::{mocks::CountingSource, NeuralStyleError, Provisioner, Style};

#[test]
fn test_second_call_is_a_cache_hit() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let exported = temp_dir.path().join("exported.onnx");
    fs::write(&exported, b"graph bytes")?;
    let cache_dir = temp_dir.path().join("cache");

    let source = CountingSource::new(&exported);
    let fetches = source.counter();
    let provisioner = Provisioner::new(&cache_dir, Box::new(source));

    let first = provisioner.ensure_artifact(Style::Mosaic)?;
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(first, cache_dir.join("mosaic.onnx"));
    assert_eq!(fs::read(&first)?, b"graph bytes");
    let written_at = fs::metadata(&first)?.modified()?;

    let second = provisioner.ensure_artifact(Style::Mosaic)?;
    assert_eq!(second, first);
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(fs::metadata(&second)?.modified()?, written_at);
    assert!(!cache_dir.join("mosaic.onnx.part").exists());
    Ok(())
}

#[test]
fn test_cache_survives_new_provisioner() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let exported = temp_dir.path().join("exported.onnx");
    fs::write(&exported, b"graph")?;
    let cache_dir = temp_dir.path().join("cache");

    Provisioner::new(&cache_dir, Box::new(CountingSource::new(&exported)))
        .ensure_artifact(Style::Candy)?;

    let source = CountingSource::new(&exported);
    let fetches = source.counter();
    Provisioner::new(&cache_dir, Box::new(source)).ensure_artifact(Style::Candy)?;
    assert_eq!(fetches.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_styles_are_cached_separately() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let exported = temp_dir.path().join("exported.onnx");
    fs::write(&exported, b"graph")?;

    let source = CountingSource::new(&exported);
    let fetches = source.counter();
    let provisioner = Provisioner::new(temp_dir.path().join("cache"), Box::new(source));

    for style in Style::ALL {
        provisioner.ensure_artifact(style)?;
    }
    assert_eq!(fetches.load(Ordering::SeqCst), Style::ALL.len());
    Ok(())
}

#[test]
fn test_missing_model_is_unavailable() {
    let temp_dir = TempDir::new().unwrap();
    let source = CountingSource::new(temp_dir.path().join("absent.onnx"));
    let provisioner = Provisioner::new(temp_dir.path().join("cache"), Box::new(source));

    let err = provisioner.ensure_artifact(Style::Udnie).unwrap_err();
    assert!(matches!(
        err,
        NeuralStyleError::ModelUnavailable {
            style: Style::Udnie,
            fallback: None,
            ..
        }
    ));
}

#[test]
fn test_unwritable_cache_is_artifact_write_failure() {
    let temp_dir = TempDir::new().unwrap();
    let exported = temp_dir.path().join("exported.onnx");
    fs::write(&exported, b"graph").unwrap();
    // A regular file where the cache directory should be.
    let cache_dir = temp_dir.path().join("cache");
    fs::write(&cache_dir, b"not a directory").unwrap();

    let provisioner = Provisioner::new(&cache_dir, Box::new(CountingSource::new(&exported)));
    let err = provisioner.ensure_artifact(Style::Mosaic).unwrap_err();
    assert!(matches!(err, NeuralStyleError::ArtifactWriteFailed { .. }));
}

#[test]
fn test_corrupt_artifact_fails_to_load() {
    let temp_dir = TempDir::new().unwrap();
    let exported = temp_dir.path().join("exported.onnx");
    fs::write(&exported, b"definitely not onnx").unwrap();

    let provisioner = Provisioner::new(temp_dir.path().join("cache"), Box::new(CountingSource::new(&exported)));
    let err = provisioner
        .ensure_ready(Style::Mosaic, Default::default())
        .unwrap_err();
    assert!(matches!(err, NeuralStyleError::ArtifactLoadFailed { .. }));
}
