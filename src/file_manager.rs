use std::path::{Component, Path, PathBuf};

use tokio::fs;

use crate::error::WriteError;

/// Writes files under the output root, creating directories on demand.
///
/// Nothing touches the disk until the first write, so a clone that fails
/// before its entry page is saved leaves no output behind.
#[derive(Clone, Debug)]
pub struct FileManager {
    base_dir: PathBuf,
}

impl FileManager {
    pub fn new(base_dir: &Path) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Absolute location of a `/`-separated path relative to the root.
    /// Empty, `.` and `..` segments are dropped so nothing escapes the root.
    pub fn path_for(&self, local_path: &str) -> PathBuf {
        let mut path = self.base_dir.clone();
        for segment in local_path.split('/') {
            if matches!(Path::new(segment).components().next(), Some(Component::Normal(_))) {
                path.push(segment);
            }
        }
        path
    }

    pub async fn save_file(&self, local_path: &str, content: &[u8]) -> Result<PathBuf, WriteError> {
        let file_path = self.path_for(local_path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| WriteError {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&file_path, content).await.map_err(|source| WriteError {
            path: file_path.clone(),
            source,
        })?;

        Ok(file_path)
    }
}
