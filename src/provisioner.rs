use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use hf_hub::api::sync::Api;

use crate::{
    errors::{NeuralStyleError, Result},
    model::{OnnxSession, SessionOptions},
    style::Style,
    traits::ModelSource,
};

/// Downloads `<style>.onnx` from a Hugging Face model repository.
#[derive(Debug, Clone)]
pub struct HubSource {
    repo: String,
}

impl HubSource {
    pub fn new(repo: impl Into<String>) -> Self {
        Self { repo: repo.into() }
    }
}

impl ModelSource for HubSource {
    fn describe(&self) -> String {
        format!("hub:{}", self.repo)
    }

    fn fetch(&self, style: Style) -> anyhow::Result<PathBuf> {
        let filename = style.artifact_file_name();
        let span = tracing::info_span!("hf_download", repo = %self.repo, filename = %filename);
        let _enter = span.enter();

        let api = Api::new().context("failed to build HF Hub client")?;
        api.model(self.repo.clone())
            .get(&filename)
            .with_context(|| format!("failed to download {filename} from {}", self.repo))
    }
}

/// Reads `<style>.onnx` from a directory of graphs exported ahead of time.
#[derive(Debug, Clone)]
pub struct LocalDirSource {
    dir: PathBuf,
}

impl LocalDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ModelSource for LocalDirSource {
    fn describe(&self) -> String {
        format!("dir:{}", self.dir.display())
    }

    fn fetch(&self, style: Style) -> anyhow::Result<PathBuf> {
        let path = style.artifact_path(&self.dir);
        anyhow::ensure!(path.is_file(), "{} does not exist", path.display());
        Ok(path)
    }
}

/// A single substitute graph used for every style.
///
/// Only consulted when explicitly configured, and every use is logged: the
/// substitute does not produce the requested style.
#[derive(Debug, Clone)]
pub struct FallbackModel {
    path: PathBuf,
}

impl FallbackModel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ModelSource for FallbackModel {
    fn describe(&self) -> String {
        format!("fallback:{}", self.path.display())
    }

    fn fetch(&self, _style: Style) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(
            self.path.is_file(),
            "{} does not exist",
            self.path.display()
        );
        Ok(self.path.clone())
    }
}

/// Placeholder primary source when neither a model directory nor a hub
/// repository was given. Cached artifacts still load; a cache miss fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unconfigured;

impl ModelSource for Unconfigured {
    fn describe(&self) -> String {
        "unconfigured".to_string()
    }

    fn fetch(&self, style: Style) -> anyhow::Result<PathBuf> {
        anyhow::bail!(
            "no cached {} and no model source configured; pass --model-dir or --model-repo",
            style.artifact_file_name()
        )
    }
}

/// Resolves a style to a cached graph on disk and loads it.
pub struct Provisioner {
    cache_dir: PathBuf,
    primary: Box<dyn ModelSource>,
    fallback: Option<Box<dyn ModelSource>>,
}

impl Provisioner {
    pub fn new(cache_dir: impl Into<PathBuf>, primary: Box<dyn ModelSource>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            primary,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: Box<dyn ModelSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Returns the graph to load for `style`, fetching and caching it on
    /// first use.
    ///
    /// The cache is keyed only by file existence; delete the file to force a
    /// new fetch. A fallback graph is never cached: it is returned from where
    /// it lives, and the warning is logged on every run that uses it.
    pub fn ensure_artifact(&self, style: Style) -> Result<PathBuf> {
        let artifact = style.artifact_path(&self.cache_dir);
        if artifact.is_file() {
            tracing::debug!(path = %artifact.display(), "artifact cache hit");
            return Ok(artifact);
        }

        let primary = match self.primary.fetch(style) {
            Ok(fetched) => {
                self.persist(&fetched, &artifact)?;
                tracing::info!(%style, path = %artifact.display(), "artifact cached");
                return Ok(artifact);
            }
            Err(err) => format!("{}: {err:#}", self.primary.describe()),
        };
        tracing::error!(%style, error = %primary, "primary model source failed");

        self.fetch_fallback(style, primary)
    }

    /// Ensures the artifact exists and loads it into an inference session.
    pub fn ensure_ready(&self, style: Style, options: SessionOptions) -> Result<OnnxSession> {
        let artifact = self.ensure_artifact(style)?;
        OnnxSession::load(&artifact, options)
    }

    fn fetch_fallback(&self, style: Style, primary: String) -> Result<PathBuf> {
        let Some(fallback) = &self.fallback else {
            return Err(NeuralStyleError::ModelUnavailable {
                style,
                primary,
                fallback: None,
            });
        };

        let path = fallback
            .fetch(style)
            .map_err(|err| NeuralStyleError::ModelUnavailable {
                style,
                primary,
                fallback: Some(format!("{}: {err:#}", fallback.describe())),
            })?;
        tracing::warn!(
            %style,
            source = %fallback.describe(),
            "using fallback model; output will not match the requested style"
        );
        Ok(path)
    }

    fn persist(&self, fetched: &Path, artifact: &Path) -> Result<()> {
        let write_error = |path: &Path, source| NeuralStyleError::ArtifactWriteFailed {
            path: path.to_path_buf(),
            source,
        };

        fs::create_dir_all(&self.cache_dir).map_err(|e| write_error(&self.cache_dir, e))?;

        let partial = artifact.with_extension("onnx.part");
        fs::copy(fetched, &partial).map_err(|e| write_error(&partial, e))?;
        fs::rename(&partial, artifact).map_err(|e| {
            let _ = fs::remove_file(&partial);
            write_error(artifact, e)
        })
    }
}

impl std::fmt::Debug for Provisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provisioner")
            .field("cache_dir", &self.cache_dir)
            .field("primary", &self.primary.describe())
            .field("fallback", &self.fallback.as_ref().map(|s| s.describe()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_dir_source_missing_file() {
        let dir = TempDir::new().unwrap();
        let source = LocalDirSource::new(dir.path());
        assert!(source.fetch(Style::Udnie).is_err());

        fs::write(dir.path().join("udnie.onnx"), b"graph").unwrap();
        assert_eq!(
            source.fetch(Style::Udnie).unwrap(),
            dir.path().join("udnie.onnx")
        );
    }

    #[test]
    fn test_fallback_is_not_used_unless_configured() {
        let cache = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        let provisioner = Provisioner::new(cache.path(), Box::new(LocalDirSource::new(empty.path())));

        let err = provisioner.ensure_artifact(Style::Candy).unwrap_err();
        assert!(matches!(
            err,
            NeuralStyleError::ModelUnavailable { fallback: None, .. }
        ));
        assert!(!Style::Candy.artifact_path(cache.path()).exists());
    }

    #[test]
    fn test_fallback_failure_is_reported_separately() {
        let cache = TempDir::new().unwrap();
        let empty = TempDir::new().unwrap();
        let provisioner = Provisioner::new(cache.path(), Box::new(LocalDirSource::new(empty.path())))
            .with_fallback(Box::new(FallbackModel::new(empty.path().join("generic.onnx"))));

        match provisioner.ensure_artifact(Style::Mosaic) {
            Err(NeuralStyleError::ModelUnavailable {
                primary,
                fallback: Some(fallback),
                ..
            }) => {
                assert!(primary.contains("mosaic.onnx"));
                assert!(fallback.contains("generic.onnx"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_fallback_used_when_primary_fails() {
        let cache = TempDir::new().unwrap();
        let models = TempDir::new().unwrap();
        let generic = models.path().join("generic.onnx");
        fs::write(&generic, b"generic graph").unwrap();

        let provisioner = Provisioner::new(cache.path(), Box::new(LocalDirSource::new(cache.path().join("none"))))
            .with_fallback(Box::new(FallbackModel::new(&generic)));

        let artifact = provisioner.ensure_artifact(Style::Udnie).unwrap();
        assert_eq!(artifact, generic);
        assert!(!Style::Udnie.artifact_path(cache.path()).exists());
    }

    #[test]
    fn test_fallback_is_not_remembered_by_later_runs() {
        let cache = TempDir::new().unwrap();
        let models = TempDir::new().unwrap();
        let generic = models.path().join("generic.onnx");
        fs::write(&generic, b"generic graph").unwrap();
        let missing = models.path().join("exported");

        Provisioner::new(cache.path(), Box::new(LocalDirSource::new(&missing)))
            .with_fallback(Box::new(FallbackModel::new(&generic)))
            .ensure_artifact(Style::Candy)
            .unwrap();

        let err = Provisioner::new(cache.path(), Box::new(LocalDirSource::new(&missing)))
            .ensure_artifact(Style::Candy)
            .unwrap_err();
        assert!(matches!(
            err,
            NeuralStyleError::ModelUnavailable { fallback: None, .. }
        ));
    }

    #[test]
    fn test_unconfigured_source_only_serves_the_cache() {
        let cache = TempDir::new().unwrap();
        let provisioner = Provisioner::new(cache.path(), Box::new(Unconfigured));

        match provisioner.ensure_artifact(Style::Mosaic) {
            Err(NeuralStyleError::ModelUnavailable { primary, fallback: None, .. }) => {
                assert!(primary.contains("--model-dir"));
            }
            other => panic!("unexpected result: {other:?}"),
        }

        fs::write(Style::Mosaic.artifact_path(cache.path()), b"graph").unwrap();
        assert_eq!(
            provisioner.ensure_artifact(Style::Mosaic).unwrap(),
            Style::Mosaic.artifact_path(cache.path())
        );
    }
}
