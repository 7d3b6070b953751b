//! Loading the fleet inventory from disk.
//!
//! - [`files`] - YAML document discovery and parsing
//! - [`links`] - host-to-site symlink directory
//!
//! Every per-document problem becomes a [`Fault`]; the batch always completes.

mod files;
mod links;

pub use files::{document_name, load_documents, read_document, yaml_files, Document};
pub use links::read_links;

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{ExtractorConfig, Settings};
use crate::error::{Fault, InventoryError};
use crate::extract::{extract_host, extract_site};
use crate::models::{HostRecord, SiteRecord};

/// Extracted hosts and sites plus every fault met on the way.
#[derive(Debug, Default)]
pub struct Inventory {
    /// Sorted by host name.
    pub hosts: Vec<HostRecord>,
    pub sites: BTreeMap<String, SiteRecord>,
    pub faults: Vec<Fault>,
}

/// Turn host documents into records; malformed ones become faults.
///
/// A document whose name repeats an earlier one (`c1.yaml`, `c1.old.yaml`)
/// is a fault and the first document is kept.
pub fn extract_hosts(docs: &[Document], cfg: &ExtractorConfig) -> (Vec<HostRecord>, Vec<Fault>) {
    let mut hosts = Vec::new();
    let mut faults = Vec::new();
    let mut seen = BTreeSet::new();
    for doc in docs {
        if !seen.insert(doc.name.as_str()) {
            faults.push(duplicate(doc));
            continue;
        }
        match extract_host(&doc.name, &doc.value, cfg) {
            Ok(host) => {
                log::debug!(
                    "host {}: {} bmc, {} primary",
                    host.name,
                    host.bmc.len(),
                    host.primary.len()
                );
                hosts.push(host);
            }
            Err(e) => {
                log::warn!("Excluding host: {e}");
                faults.push(Fault::new(&doc.name, e));
            }
        }
    }
    hosts.sort_by(|a, b| a.name.cmp(&b.name));
    (hosts, faults)
}

/// Turn site documents into records.
///
/// Sites whose masks are shorter than `cfg.min_prefix_len` or are not a
/// contiguous prefix are rejected, so every subnet in the table is a CIDR
/// block small enough to enumerate. A repeated site name is a fault and the
/// first document is kept.
pub fn extract_sites(
    docs: &[Document],
    cfg: &ExtractorConfig,
) -> (BTreeMap<String, SiteRecord>, Vec<Fault>) {
    let mut sites = BTreeMap::new();
    let mut faults = Vec::new();
    let mut seen = BTreeSet::new();
    'docs: for doc in docs {
        if !seen.insert(doc.name.as_str()) {
            faults.push(duplicate(doc));
            continue;
        }
        let site = match extract_site(&doc.name, &doc.value, cfg) {
            Ok(site) => site,
            Err(e) => {
                log::warn!("Excluding site: {e}");
                faults.push(Fault::new(&doc.name, e));
                continue;
            }
        };

        for (family, mask) in &site.masks {
            let error = if !mask.is_contiguous() {
                InventoryError::NonContiguousMask { mask: *mask }
            } else if mask.prefix_len() < cfg.min_prefix_len {
                InventoryError::DegenerateMask {
                    mask: *mask,
                    min: cfg.min_prefix_len,
                }
            } else {
                continue;
            };
            log::warn!("Excluding site {} ({family}): {error}", site.name);
            faults.push(Fault::new(&doc.name, error));
            continue 'docs;
        }

        log::debug!("site {}: {:?}", site.name, site.masks);
        sites.insert(site.name.clone(), site);
    }
    (sites, faults)
}

fn duplicate(doc: &Document) -> Fault {
    log::warn!(
        "Excluding {}: name {} already loaded",
        doc.path.display(),
        doc.name
    );
    Fault::new(
        &doc.name,
        InventoryError::DuplicateName {
            path: doc.path.clone(),
        },
    )
}

/// Load, parse and extract every host and site document named by `settings`.
///
/// # Errors
/// Only when a node or site directory cannot be listed.
pub fn load_inventory(settings: &Settings) -> Result<Inventory, InventoryError> {
    log::info!(
        "#Start load_inventory() data_dir={}",
        settings.data_dir.display()
    );

    let (site_docs, mut faults) = load_documents(&settings.site_path(), &settings.skip_files)?;
    let (node_docs, node_faults) = load_documents(&settings.node_path(), &settings.skip_files)?;
    faults.extend(node_faults);

    let (sites, site_faults) = extract_sites(&site_docs, &settings.extractor);
    let (hosts, host_faults) = extract_hosts(&node_docs, &settings.extractor);
    faults.extend(site_faults);
    faults.extend(host_faults);

    log::info!(
        "Inventory: {} hosts, {} sites, {} faults",
        hosts.len(),
        sites.len(),
        faults.len()
    );
    Ok(Inventory {
        hosts,
        sites,
        faults,
    })
}
