use std::path::{Path, PathBuf};

use shared::domain::{file_extension, FileKind};

/// A local file picked for upload or conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size_bytes: u64,
    pub kind: FileKind,
    pub path: PathBuf,
}

impl SelectedFile {
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            kind: FileKind::from_file_name(&name),
            name,
            size_bytes: metadata.len(),
            path: path.to_path_buf(),
        })
    }

    /// Upper-cased extension shown next to the file name, e.g. `XLSX`.
    pub fn type_label(&self) -> String {
        file_extension(&self.name)
            .map(|ext| ext.to_ascii_uppercase())
            .unwrap_or_default()
    }
}
