//! Download trigger: saves fetched artifact content under the name the
//! service supplied.
//!
//! Content is written to a temporary file in the target directory and then
//! persisted under its final name. The temporary file never outlives the call:
//! it is either renamed into place or removed on drop.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use tracing::info;

use crate::error::WorkflowError;
use crate::models::ArtifactContent;

/// Turns fetched content into a saved file.
pub trait DownloadTrigger: Send + Sync {
    /// Save `content` as `suggested_name`. Returns where it landed.
    fn trigger_download(
        &self,
        content: &ArtifactContent,
        suggested_name: &str,
    ) -> Result<PathBuf, WorkflowError>;
}

/// Saves artifacts into a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryDownloader {
    dir: PathBuf,
}

impl DirectoryDownloader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadTrigger for DirectoryDownloader {
    fn trigger_download(
        &self,
        content: &ArtifactContent,
        suggested_name: &str,
    ) -> Result<PathBuf, WorkflowError> {
        validate_file_name(suggested_name)?;

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            WorkflowError::DownloadInitiation(format!(
                "cannot create {}: {}",
                self.dir.display(),
                e
            ))
        })?;

        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| WorkflowError::DownloadInitiation(format!("temp file: {}", e)))?;
        temp.write_all(content.as_bytes())
            .map_err(|e| WorkflowError::DownloadInitiation(format!("write failed: {}", e)))?;
        temp.flush()
            .map_err(|e| WorkflowError::DownloadInitiation(format!("write failed: {}", e)))?;

        let target = self.dir.join(suggested_name);
        temp.persist(&target)
            .map_err(|e| WorkflowError::DownloadInitiation(format!("persist failed: {}", e.error)))?;

        info!(
            path = %target.display(),
            bytes = content.len(),
            "Artifact saved"
        );
        Ok(target)
    }
}

/// The name is used verbatim, but it must stay a plain file name.
fn validate_file_name(name: &str) -> Result<(), WorkflowError> {
    let path = Path::new(name);
    let mut components = path.components();
    let plain = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if name.is_empty() || !plain || name.contains('/') || name.contains('\\') {
        return Err(WorkflowError::DownloadInitiation(format!(
            "Invalid file name: {:?}",
            name
        )));
    }
    Ok(())
}
