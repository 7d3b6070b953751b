//! Host-to-site link directory.
//!
//! Each entry is a symlink named after a host whose target names the site,
//! e.g. `c0021.yaml -> ../site/cs_b240.yaml`.

use std::collections::BTreeMap;
use std::path::Path;

use super::files::document_name;
use crate::error::InventoryError;

/// Map host name -> site name for every symlink in `dir`.
///
/// Entries that are not symlinks are ignored.
pub fn read_links(dir: &Path) -> Result<BTreeMap<String, String>, InventoryError> {
    let io_err = |source| InventoryError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut links = BTreeMap::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let meta = std::fs::symlink_metadata(&path).map_err(|source| InventoryError::Io {
            path: path.clone(),
            source,
        })?;
        if !meta.file_type().is_symlink() {
            log::debug!("Not a link, ignored: {}", path.display());
            continue;
        }
        let target = std::fs::read_link(&path).map_err(|source| InventoryError::Io {
            path: path.clone(),
            source,
        })?;
        let host = document_name(&path);
        let site = document_name(&target);
        log::trace!("link {host} -> {site}");
        links.insert(host, site);
    }

    log::info!("Read {} host links from {}", links.len(), dir.display());
    Ok(links)
}
