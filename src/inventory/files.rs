//! Reading per-host and per-site YAML documents from disk.

use serde_yaml::Value;
use std::path::{Path, PathBuf};

use crate::error::{Fault, InventoryError};

/// A parsed document and where it came from.
#[derive(Debug, Clone)]
pub struct Document {
    /// File stem; the host or site name.
    pub name: String,
    pub path: PathBuf,
    pub value: Value,
}

/// Name a document by its file stem (`c0021.yaml` -> `c0021`).
pub fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy())
        .and_then(|f| f.split('.').next().map(str::to_string))
        .unwrap_or_default()
}

/// All `*.yaml` files in `dir`, sorted by path.
pub fn yaml_files(dir: &Path) -> Result<Vec<PathBuf>, InventoryError> {
    let entries = std::fs::read_dir(dir).map_err(|source| InventoryError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| InventoryError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "yaml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Read and parse one file.
pub fn read_document(path: &Path) -> Result<Document, InventoryError> {
    let text = std::fs::read_to_string(path).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let value = serde_yaml::from_str(&text).map_err(|source| InventoryError::Yaml {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Document {
        name: document_name(path),
        path: path.to_path_buf(),
        value,
    })
}

/// Parse every YAML file in `dir`.
///
/// Files named in `skip_files` are not opened. A file that cannot be read or
/// parsed becomes a [`Fault`] and the rest of the directory is still loaded;
/// only a missing or unreadable directory is an error.
pub fn load_documents(
    dir: &Path,
    skip_files: &[String],
) -> Result<(Vec<Document>, Vec<Fault>), InventoryError> {
    let mut documents = Vec::new();
    let mut faults = Vec::new();

    for path in yaml_files(dir)? {
        let file_name = path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_default();
        if skip_files.contains(&file_name) {
            log::info!("Skipping {file_name} (skip list)");
            continue;
        }

        match read_document(&path) {
            Ok(doc) => {
                log::debug!("Parsed {}", path.display());
                documents.push(doc);
            }
            Err(e) => {
                log::warn!("Malformed document {}: {e}", path.display());
                faults.push(Fault::new(&document_name(&path), e));
            }
        }
    }

    log::info!(
        "Loaded {} documents from {} ({} faults)",
        documents.len(),
        dir.display(),
        faults.len()
    );
    Ok((documents, faults))
}
