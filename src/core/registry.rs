//! Loads the model asset by name and keeps track of the active version.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};
use tokio::sync::broadcast;

use super::{
    hash,
    inference::{CatalogModel, SimilarityModel},
};
use crate::{
    error::{AppError, Result},
    models::catalog::ReferenceCatalog,
};

/// Describes the model currently in use.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    /// Name the asset was loaded under.
    pub asset_name: String,
    /// Fingerprint of the asset file.
    pub version: String,
    /// When this version was loaded.
    pub loaded_at: DateTime<Utc>,
    /// Size of the reference image set.
    pub reference_count: usize,
}

/// A loaded model together with its metadata.
#[derive(Debug)]
pub struct LoadedModel {
    /// Metadata for this version.
    pub info: ModelInfo,
    /// The model itself.
    pub model: Arc<dyn SimilarityModel>,
}

/// Emitted to subscribers whenever the active model changes.
#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// A new version was loaded and is now active.
    Reloaded(ModelInfo),
}

/// Owns the active model and swaps it on reload.
///
/// Queries clone the `Arc` of the current model, so a reload never disturbs
/// an inference that is already running.
#[derive(Debug)]
pub struct ModelRegistry {
    asset_dir: PathBuf,
    asset_name: String,
    current: RwLock<Option<Arc<LoadedModel>>>,
    events: broadcast::Sender<ModelEvent>,
}

impl ModelRegistry {
    /// Creates an empty registry for `<asset_dir>/<asset_name>.json`.
    pub fn new<P: Into<PathBuf>>(asset_dir: P, asset_name: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            asset_dir: asset_dir.into(),
            asset_name: asset_name.into(),
            current: RwLock::new(None),
            events,
        }
    }

    /// Path of the asset file this registry loads.
    pub fn asset_path(&self) -> PathBuf {
        self.asset_dir.join(format!("{}.json", self.asset_name))
    }

    /// Name of the asset this registry loads.
    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }

    /// Reads, validates and activates the asset.
    ///
    /// On failure the previously active model, if any, stays in place.
    pub fn load(&self) -> Result<ModelInfo> {
        let path = self.asset_path();
        let loaded = Arc::new(self.build(&path)?);
        let info = loaded.info.clone();

        let mut current = self
            .current
            .write()
            .map_err(|_| AppError::Internal("model registry lock poisoned".to_string()))?;
        *current = Some(loaded);

        log::info!(
            "Loaded model '{}' version {} ({} reference images)",
            info.asset_name,
            info.version,
            info.reference_count
        );
        Ok(info)
    }

    /// Loads the asset again.
    ///
    /// Subscribers get [`ModelEvent::Reloaded`] only when the version changed.
    pub fn reload(&self) -> Result<ModelInfo> {
        let previous = self.current_version();
        match self.load() {
            Ok(info) => {
                if previous.as_deref() == Some(info.version.as_str()) {
                    log::debug!("Model '{}' unchanged after reload", info.asset_name);
                } else {
                    log::info!("Model reloaded");
                    if self.events.send(ModelEvent::Reloaded(info.clone())).is_err() {
                        log::debug!("No subscribers for model events");
                    }
                }
                Ok(info)
            }
            Err(e) => {
                log::warn!("Reload of '{}' failed, keeping previous model: {}", self.asset_name, e);
                Err(e)
            }
        }
    }

    /// The active model.
    pub fn current(&self) -> Result<Arc<LoadedModel>> {
        self.current
            .read()
            .map_err(|_| AppError::Internal("model registry lock poisoned".to_string()))?
            .clone()
            .ok_or_else(|| AppError::NotFound("No model available".to_string()))
    }

    /// Version of the active model, if one is loaded.
    pub fn current_version(&self) -> Option<String> {
        self.current().ok().map(|m| m.info.version.clone())
    }

    /// Receives an event after every reload that changed the version.
    pub fn subscribe(&self) -> broadcast::Receiver<ModelEvent> {
        self.events.subscribe()
    }

    fn build(&self, path: &Path) -> Result<LoadedModel> {
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => {
                AppError::NotFound(format!("model asset {}", path.display()))
            }
            _ => AppError::Io(e),
        })?;
        let version = hash::compute_sha3_256(&bytes);

        let json = std::str::from_utf8(&bytes).map_err(|e| {
            AppError::Validation(format!("model asset {} is not UTF-8: {}", path.display(), e))
        })?;
        let catalog = ReferenceCatalog::from_json(json)?;
        let model = CatalogModel::from_catalog(catalog, path)?;

        let info = ModelInfo {
            asset_name: self.asset_name.clone(),
            version,
            loaded_at: Utc::now(),
            reference_count: model.reference_count(),
        };
        Ok(LoadedModel {
            info,
            model: Arc::new(model),
        })
    }
}
