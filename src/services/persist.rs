use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CaptureError, CaptureResult};

use super::PersistenceBackend;

/// Copies saved segments into `<library>/<collection>/`.
pub struct DirectoryPersistence {
    library: PathBuf,
}

impl DirectoryPersistence {
    pub fn new(library: impl Into<PathBuf>) -> Self {
        Self { library: library.into() }
    }
}

#[async_trait]
impl PersistenceBackend for DirectoryPersistence {
    async fn save(&self, path: &str, collection: &str) -> CaptureResult<String> {
        let source = Path::new(path);
        let file_name = source
            .file_name()
            .ok_or_else(|| CaptureError::PersistenceFailure(format!("not a file path: {}", path)))?;

        let dest_dir = self.library.join(collection);
        tokio::fs::create_dir_all(&dest_dir)
            .await
            .map_err(|e| CaptureError::PersistenceFailure(format!("{}: {}", dest_dir.display(), e)))?;

        let dest = dest_dir.join(file_name);
        tokio::fs::copy(source, &dest)
            .await
            .map_err(|e| CaptureError::PersistenceFailure(format!("{} -> {}: {}", path, dest.display(), e)))?;

        info!(from = path, to = %dest.display(), "segment copied to library");
        Ok(dest.display().to_string())
    }
}
