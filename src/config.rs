//! Run settings.
//!
//! Defaults carry the fleet's conventions (interface field codes, site table,
//! file layout). A YAML file can replace any of them; `INVENTORY_*`
//! environment variables override the data and link directories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::InventoryError;

/// Settings file looked up in the working directory when none is given.
pub const DEFAULT_SETTINGS_FILE: &str = "inventory.yml";
pub const ENV_DATA_DIR: &str = "INVENTORY_DATA_DIR";
pub const ENV_LINK_DIR: &str = "INVENTORY_LINK_DIR";

/// Where the per-interface config fragments live inside a node document.
pub const INTERFACE_FILE_PREFIX: &str = "/etc/sysconfig/network-scripts/ifcfg-";

/// Field codes that may hold addresses, per interface.
const INTERFACE_CODES: &[(&str, &[&str])] = &[
    ("vxlan123", &["0601", "1200"]),
    ("eth0", &["0600", "0601", "0604", "0605", "171"]),
    ("eth1", &["0600", "0601"]),
    ("eth2", &["0600", "0601"]),
    ("bond0", &["0601", "110"]),
    ("ib0", &["0602", "0600"]),
    ("br0", &["0601"]),
    ("bond0.5", &["110", "050"]),
];

/// The only interfaces whose site fragments carry a usable mask.
const SITE_LABELS: &[&str] = &["eth0", "bond0", "br0"];
const SITE_MASK_CODES: &[&str] = &["0701", "0700"];

const SITE_TABLE: &[(&str, &str)] = &[
    ("0", "wid"),
    ("1", "cs_b240"),
    ("2", "cs_2360"),
    ("3", "cs_3370a"),
    ("4", "oneneck"),
];

/// Position of the site digit in host names, counted from the end.
const SITE_CHAR_FROM_END: usize = 4;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InterfaceCodes {
    pub interface: String,
    pub codes: Vec<String>,
}

/// How the record extractor finds addresses and masks in documents.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ExtractorConfig {
    pub interface_file_prefix: String,
    /// Probed in order; order is kept in the extracted address list.
    pub interface_codes: Vec<InterfaceCodes>,
    pub site_labels: Vec<String>,
    pub site_mask_codes: Vec<String>,
    /// Values that stand in for an unset address.
    pub placeholder_values: Vec<String>,
    /// Site masks shorter than this are rejected.
    pub min_prefix_len: u8,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            interface_file_prefix: INTERFACE_FILE_PREFIX.to_string(),
            interface_codes: INTERFACE_CODES
                .iter()
                .map(|(interface, codes)| InterfaceCodes {
                    interface: interface.to_string(),
                    codes: codes.iter().map(|c| c.to_string()).collect(),
                })
                .collect(),
            site_labels: SITE_LABELS.iter().map(|l| l.to_string()).collect(),
            site_mask_codes: SITE_MASK_CODES.iter().map(|c| c.to_string()).collect(),
            placeholder_values: vec!["overwriteme".to_string()],
            min_prefix_len: 8,
        }
    }
}

/// Which part of a host name selects its site.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Discriminator {
    /// The character `n` positions from the end (1 = last).
    CharFromEnd(usize),
    /// First capture group of a regular expression.
    Pattern(String),
}

/// Host-to-site resolution policy.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum ResolverConfig {
    Table {
        discriminator: Discriminator,
        sites: BTreeMap<String, String>,
    },
    Links { link_dir: PathBuf },
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig::Table {
            discriminator: Discriminator::CharFromEnd(SITE_CHAR_FROM_END),
            sites: SITE_TABLE
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Whether subnet enumeration keeps the network and broadcast addresses.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct EnumerationPolicy {
    pub include_network: bool,
    pub include_broadcast: bool,
}

impl Default for EnumerationPolicy {
    fn default() -> Self {
        EnumerationPolicy {
            include_network: true,
            include_broadcast: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub node_dir: String,
    pub site_dir: String,
    /// File names (with extension) never parsed.
    pub skip_files: Vec<String>,
    pub extractor: ExtractorConfig,
    pub resolver: ResolverConfig,
    pub enumeration: EnumerationPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            data_dir: PathBuf::from("data"),
            node_dir: "node".to_string(),
            site_dir: "site".to_string(),
            skip_files: vec![],
            extractor: ExtractorConfig::default(),
            resolver: ResolverConfig::default(),
            enumeration: EnumerationPolicy::default(),
        }
    }
}

impl Settings {
    /// Parse settings from YAML, reporting the key path of a bad value.
    pub fn from_yaml(yaml: &str) -> Result<Settings, InventoryError> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml);
        serde_path_to_error::deserialize(deserializer).map_err(|e| {
            InventoryError::Config(format!("path={} error={}", e.path(), e.inner()))
        })
    }

    /// Read `path`; when `path` is None, fall back to [`DEFAULT_SETTINGS_FILE`]
    /// if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Settings, InventoryError> {
        let path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(InventoryError::Config(format!(
                        "settings file does not exist: {}",
                        p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => {
                let default = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if !default.exists() {
                    log::debug!("No {DEFAULT_SETTINGS_FILE}, using built-in settings");
                    return Ok(Settings::default());
                }
                default
            }
        };

        log::info!("Reading settings from {}", path.display());
        let yaml = std::fs::read_to_string(&path).map_err(|source| InventoryError::Io {
            path: path.clone(),
            source,
        })?;
        Settings::from_yaml(&yaml)
    }

    /// Apply `INVENTORY_DATA_DIR` / `INVENTORY_LINK_DIR` if set.
    pub fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            log::info!("{ENV_DATA_DIR}={dir}");
            self.data_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var(ENV_LINK_DIR) {
            log::info!("{ENV_LINK_DIR}={dir}");
            self.resolver = ResolverConfig::Links {
                link_dir: PathBuf::from(dir),
            };
        }
    }

    pub fn node_path(&self) -> PathBuf {
        self.data_dir.join(&self.node_dir)
    }

    pub fn site_path(&self) -> PathBuf {
        self.data_dir.join(&self.site_dir)
    }
}
