use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use facetrace_core::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};
use facetrace_core::shared::model_resolver;

/// Where the landmark model is in its background resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    Resolving { downloaded: u64, total: u64 },
    Ready(PathBuf),
    Failed(String),
}

/// Resolves the landmark model on a background thread at startup so the
/// UI can poll it from its tick without blocking.
pub struct ModelCache {
    status: Arc<Mutex<ModelStatus>>,
}

impl ModelCache {
    pub fn new() -> Self {
        let status = Arc::new(Mutex::new(ModelStatus::Resolving {
            downloaded: 0,
            total: 0,
        }));

        let slot = Arc::clone(&status);
        thread::spawn(move || {
            let progress_slot = Arc::clone(&slot);
            let result = model_resolver::resolve(
                YOLO_MODEL_NAME,
                YOLO_MODEL_URL,
                None,
                Some(Box::new(move |downloaded, total| {
                    *lock(&progress_slot) = ModelStatus::Resolving { downloaded, total };
                })),
            );
            let status = match result {
                Ok(path) => {
                    log::info!("Landmark model ready: {}", path.display());
                    ModelStatus::Ready(path)
                }
                Err(e) => {
                    log::error!("Model resolution failed: {e}");
                    ModelStatus::Failed(e.to_string())
                }
            };
            *lock(&slot) = status;
        });

        Self { status }
    }

    pub fn status(&self) -> ModelStatus {
        lock(&self.status).clone()
    }

    pub fn ready_path(&self) -> Option<PathBuf> {
        match &*lock(&self.status) {
            ModelStatus::Ready(path) => Some(path.clone()),
            _ => None,
        }
    }
}

fn lock(status: &Mutex<ModelStatus>) -> std::sync::MutexGuard<'_, ModelStatus> {
    status.lock().unwrap_or_else(PoisonError::into_inner)
}
