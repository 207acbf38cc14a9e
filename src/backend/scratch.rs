use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use uuid::Uuid;

/// Owns one execution's throwaway directory. Removal happens in `Drop`
/// (synchronously, via `std::fs`) so the directory is reclaimed even when
/// the supervisor abandons the execute future on timeout.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub async fn create(root: &Path) -> io::Result<Self> {
        let path = root.join(format!("run_{}", Uuid::new_v4()));
        fs::create_dir_all(&path).await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn join(&self, file_name: &str) -> PathBuf {
        self.path.join(file_name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        // Best effort; a leftover dir must not fail the execution result.
        let _ = std::fs::remove_dir_all(&self.path);
    }
}
