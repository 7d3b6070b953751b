//! JSON export of the reconciled table.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::net::Ipv4Addr;
use std::path::Path;

use crate::error::{Fault, InventoryError};
use crate::processing::{Audit, SubnetSummary, UnlinkedHost, UsageTable};

#[derive(Serialize, Debug)]
pub struct Export {
    pub generated: DateTime<Local>,
    pub subnets: Vec<SubnetSummary>,
    pub miscellaneous: Vec<Ipv4Addr>,
    pub unlinked: Vec<UnlinkedHost>,
    /// `name: reason` per fault.
    pub faults: Vec<String>,
    pub audit: Audit,
}

impl Export {
    pub fn new(table: &UsageTable, faults: &[Fault]) -> Export {
        Export {
            generated: Local::now(),
            subnets: table.summaries(),
            miscellaneous: table.miscellaneous().iter().copied().collect(),
            unlinked: table.unlinked().to_vec(),
            faults: faults.iter().map(|f| f.to_string()).collect(),
            audit: table.audit().clone(),
        }
    }
}

pub fn to_json(export: &Export) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(export)
}

/// Write the export to `path`, replacing any existing file.
pub fn write_json(export: &Export, path: &Path) -> Result<(), InventoryError> {
    log::info!("#Start write_json() {}", path.display());
    let json = match to_json(export) {
        Ok(json) => json,
        Err(e) => return Err(InventoryError::Config(format!("json export: {e}"))),
    };
    std::fs::write(path, json).map_err(|source| InventoryError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnumerationPolicy;
    use crate::models::{HostRecord, InterfaceAddr, InterfaceFamily, SiteRecord};
    use crate::processing::{build_usage_table, LinkResolver};
    use std::collections::BTreeMap;

    #[test]
    fn test_export_json() {
        let site = SiteRecord::new("wid")
            .with_mask(InterfaceFamily::Primary, "255.255.255.0".parse().unwrap());
        let hosts = vec![HostRecord {
            name: "c1".to_string(),
            bmc: vec![],
            primary: vec![InterfaceAddr {
                interface: "eth0".to_string(),
                addr: Ipv4Addr::new(10, 0, 0, 1),
            }],
        }];
        let resolver = LinkResolver::new(BTreeMap::from([("c1".to_string(), "wid".to_string())]));
        let table = build_usage_table(
            &hosts,
            &BTreeMap::from([("wid".to_string(), site)]),
            &resolver,
            EnumerationPolicy::default(),
        );

        let json = to_json(&Export::new(&table, &[])).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["subnets"][0]["network"], "10.0.0.0/24");
        assert_eq!(value["subnets"][0]["mask"], "255.255.255.0");
        assert_eq!(value["subnets"][0]["used"], 1);
        assert_eq!(value["subnets"][0]["total"], 256);
        assert_eq!(value["subnets"][0]["first_unused"], "10.0.0.0");
        assert_eq!(value["audit"]["inserted"], 1);
        assert!(value["generated"].is_string());
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        let table = build_usage_table(
            &[],
            &BTreeMap::new(),
            &LinkResolver::default(),
            EnumerationPolicy::default(),
        );
        write_json(&Export::new(&table, &[]), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"subnets\": []"));
    }
}
