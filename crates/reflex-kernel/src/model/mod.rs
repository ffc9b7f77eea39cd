//! Model adapter - opaque inference artifacts behind a `predict` contract.

mod keyword;
mod linear;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use reflex_core::{ActionId, EncodedInput};
use serde::Deserialize;

use crate::error::{InferenceError, ModelLoadError};

pub use keyword::{KeywordModel, KeywordRule};
pub use linear::LinearModel;

/// A loaded inference backend.
///
/// Implementations may block; the runtime calls them off the async workers.
pub trait Model: Send + Sync + 'static {
    fn predict(&self, input: &EncodedInput) -> Result<ActionId, InferenceError>;

    /// Short backend tag for logs.
    fn backend(&self) -> &'static str {
        "custom"
    }
}

/// Turns a filesystem path into a backend.
pub trait ModelLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<Box<dyn Model>, ModelLoadError>;
}

/// Available artifact backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelBackend {
    Linear,
    Keyword,
}

impl ModelBackend {
    /// Parse backend from name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "linear" => Some(Self::Linear),
            "keyword" => Some(Self::Keyword),
            _ => None,
        }
    }

    /// Get backend name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Keyword => "keyword",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
enum Artifact {
    Linear(LinearModel),
    Keyword(KeywordModel),
}

/// Loads JSON artifacts tagged with a `backend` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactLoader;

impl ArtifactLoader {
    /// Parse an artifact that is already in memory.
    pub fn parse(path: &Path, content: &str) -> Result<Box<dyn Model>, ModelLoadError> {
        let artifact: Artifact =
            serde_json::from_str(content).map_err(|e| ModelLoadError::Malformed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let rejected = |reason: String| ModelLoadError::Rejected {
            path: path.to_path_buf(),
            reason,
        };

        match artifact {
            Artifact::Linear(model) => {
                model.validate().map_err(rejected)?;
                Ok(Box::new(model))
            }
            Artifact::Keyword(model) => {
                model.validate().map_err(rejected)?;
                Ok(Box::new(model))
            }
        }
    }
}

impl ModelLoader for ArtifactLoader {
    fn load(&self, path: &Path) -> Result<Box<dyn Model>, ModelLoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ModelLoadError::Missing {
                    path: path.to_path_buf(),
                    source,
                }
            } else {
                ModelLoadError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::parse(path, &content)
    }
}

struct LoadedModel {
    model: Box<dyn Model>,
    source: PathBuf,
    generation: u64,
    loaded_at: DateTime<Utc>,
}

impl Drop for LoadedModel {
    fn drop(&mut self) {
        tracing::debug!(
            generation = self.generation,
            path = %self.source.display(),
            "Model released"
        );
    }
}

/// Shared reference to one loaded model.
///
/// Handles are never mutated. A task clones the current handle once and keeps
/// using it even if a reload publishes a newer one meanwhile; the backend is
/// freed when the last clone goes away.
#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<LoadedModel>,
}

impl ModelHandle {
    fn new(model: Box<dyn Model>, source: &Path, generation: u64) -> Self {
        Self {
            inner: Arc::new(LoadedModel {
                model,
                source: source.to_path_buf(),
                generation,
                loaded_at: Utc::now(),
            }),
        }
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation
    }

    pub fn source(&self) -> &Path {
        &self.inner.source
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.inner.loaded_at
    }

    pub fn backend(&self) -> &'static str {
        self.inner.model.backend()
    }

    /// Run the model. Empty input is rejected before reaching the backend.
    pub fn predict(&self, input: &EncodedInput) -> Result<ActionId, InferenceError> {
        if input.is_empty() {
            return Err(InferenceError::EmptyInput);
        }
        self.inner.model.predict(input)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("generation", &self.inner.generation)
            .field("source", &self.inner.source)
            .field("backend", &self.backend())
            .finish()
    }
}

/// Owns the active handle and its reload lifecycle.
pub struct ModelAdapter {
    loader: Arc<dyn ModelLoader>,
    active: RwLock<ModelHandle>,
    generations: AtomicU64,
}

impl ModelAdapter {
    /// Load the initial model. Fatal at startup.
    pub fn load(loader: Arc<dyn ModelLoader>, path: &Path) -> Result<Self, ModelLoadError> {
        let model = loader.load(path)?;
        let handle = ModelHandle::new(model, path, 1);
        tracing::info!(
            path = %path.display(),
            backend = handle.backend(),
            "Model loaded"
        );
        Ok(Self {
            loader,
            active: RwLock::new(handle),
            generations: AtomicU64::new(1),
        })
    }

    /// The handle future tasks should use.
    pub fn current(&self) -> ModelHandle {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Load `path` and publish it as the active handle.
    ///
    /// The new handle only becomes visible once fully loaded. On failure the
    /// previous handle stays active. In-flight predictions keep whichever
    /// handle they captured.
    pub fn reload(&self, path: &Path) -> Result<ModelHandle, ModelLoadError> {
        let model = match self.loader.load(path) {
            Ok(model) => model,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to reload model");
                return Err(e);
            }
        };

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let handle = ModelHandle::new(model, path, generation);

        let previous = {
            let mut active = self.active.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *active, handle.clone())
        };
        // Drop outside the lock; may be the last reference.
        drop(previous);

        tracing::info!(
            path = %path.display(),
            generation,
            backend = handle.backend(),
            "Model reloaded"
        );
        Ok(handle)
    }

    /// Predict with whatever handle is active right now.
    pub fn predict(&self, input: &EncodedInput) -> Result<ActionId, InferenceError> {
        self.current().predict(input)
    }
}

impl std::fmt::Debug for ModelAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelAdapter")
            .field("active", &self.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u32);

    impl Model for Fixed {
        fn predict(&self, _input: &EncodedInput) -> Result<ActionId, InferenceError> {
            Ok(ActionId(self.0))
        }
    }

    struct FixedLoader;

    impl ModelLoader for FixedLoader {
        fn load(&self, path: &Path) -> Result<Box<dyn Model>, ModelLoadError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            match name.parse::<u32>() {
                Ok(id) => Ok(Box::new(Fixed(id))),
                Err(_) => Err(ModelLoadError::Rejected {
                    path: path.to_path_buf(),
                    reason: "not a number".into(),
                }),
            }
        }
    }

    fn input() -> EncodedInput {
        EncodedInput::from(b"state".as_slice())
    }

    #[test]
    fn backend_names_roundtrip() {
        for backend in [ModelBackend::Linear, ModelBackend::Keyword] {
            assert_eq!(ModelBackend::from_name(backend.name()), Some(backend));
        }
        assert_eq!(ModelBackend::from_name("Linear"), Some(ModelBackend::Linear));
        assert_eq!(ModelBackend::from_name("torchscript"), None);
    }

    #[test]
    fn empty_input_never_reaches_the_backend() {
        let adapter = ModelAdapter::load(Arc::new(FixedLoader), Path::new("3")).unwrap();
        assert_eq!(
            adapter.predict(&EncodedInput::default()),
            Err(InferenceError::EmptyInput)
        );
        assert_eq!(adapter.predict(&input()), Ok(ActionId(3)));
    }

    #[test]
    fn reload_swaps_without_touching_captured_handles() {
        let adapter = ModelAdapter::load(Arc::new(FixedLoader), Path::new("1")).unwrap();
        let captured = adapter.current();

        let fresh = adapter.reload(Path::new("2")).unwrap();
        assert_eq!(fresh.generation(), 2);
        assert_eq!(adapter.current().generation(), 2);

        assert_eq!(captured.predict(&input()), Ok(ActionId(1)));
        assert_eq!(adapter.predict(&input()), Ok(ActionId(2)));
    }

    #[test]
    fn failed_reload_keeps_previous_handle() {
        let adapter = ModelAdapter::load(Arc::new(FixedLoader), Path::new("4")).unwrap();

        let err = adapter.reload(Path::new("not-a-model")).unwrap_err();
        assert!(matches!(err, ModelLoadError::Rejected { .. }));

        assert_eq!(adapter.current().generation(), 1);
        assert_eq!(adapter.predict(&input()), Ok(ActionId(4)));
    }

    #[test]
    fn artifact_loader_reports_missing_files() {
        let err = ArtifactLoader
            .load(Path::new("/definitely/not/here/model.json"))
            .err().unwrap();
        assert!(matches!(err, ModelLoadError::Missing { .. }));
    }

    #[test]
    fn artifact_loader_rejects_unknown_backends() {
        let err = ArtifactLoader::parse(Path::new("m.json"), r#"{"backend":"torchscript"}"#)
            .err().unwrap();
        assert!(matches!(err, ModelLoadError::Malformed { .. }));
    }
}
