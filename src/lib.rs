//! Subnet inventory: reconcile per-host network config against per-site
//! subnet masks and report used and unused IPv4 addresses.
//!
//! - [`models`] - addresses, masks, host and site records
//! - [`extract`] - host and site documents to records
//! - [`inventory`] - loading documents from disk, fault collection
//! - [`processing`] - site resolution and the usage table
//! - [`output`] - reports and JSON export

pub mod config;
pub mod error;
pub mod extract;
pub mod inventory;
pub mod models;
pub mod output;
pub mod processing;

use std::net::Ipv4Addr;

use crate::error::FormatError;
use crate::models::{parse_addr, Ipv4, SubnetMask};

pub use config::Settings;
pub use error::{Fault, InventoryError, NotFound};
pub use inventory::{load_inventory, Inventory};
pub use processing::{build_resolver, build_usage_table, UsageTable};

/// Load the inventory named by `settings` and reconcile it into a usage table.
///
/// Malformed documents end up in `Inventory::faults`; only an unreadable
/// directory or a broken resolver setting fails the whole run.
pub fn reconcile(settings: &Settings) -> Result<(Inventory, UsageTable), InventoryError> {
    log::info!("#Start reconcile()");
    let inventory = load_inventory(settings)?;
    let resolver = build_resolver(&settings.resolver)?;
    let table = build_usage_table(
        &inventory.hosts,
        &inventory.sites,
        resolver.as_ref(),
        settings.enumeration,
    );
    Ok((inventory, table))
}

/// Subnets of `table` matching a `-s` query.
///
/// `a.b.c.d/len` names one block exactly; a bare `a.b.c.d` matches every
/// subnet that contains the address.
pub fn select_subnets(
    table: &UsageTable,
    query: &str,
) -> Result<Vec<(SubnetMask, Ipv4Addr)>, FormatError> {
    if query.contains('/') {
        let block = Ipv4::new(query)?;
        Ok(table
            .locate(block.lo())
            .into_iter()
            .filter(|(mask, _)| mask.prefix_len() == block.mask)
            .collect())
    } else {
        Ok(table.locate(parse_addr(query)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnumerationPolicy;
    use crate::models::{HostRecord, InterfaceAddr, InterfaceFamily, SiteRecord};
    use crate::processing::LinkResolver;
    use std::collections::BTreeMap;

    fn table() -> UsageTable {
        let site = SiteRecord::new("wid")
            .with_mask(InterfaceFamily::Primary, "255.255.255.0".parse().unwrap())
            .with_mask(InterfaceFamily::Bmc, "255.255.0.0".parse().unwrap());
        let hosts = vec![HostRecord {
            name: "c1".to_string(),
            bmc: vec![Ipv4Addr::new(10, 0, 9, 9)],
            primary: vec![InterfaceAddr {
                interface: "eth0".to_string(),
                addr: Ipv4Addr::new(10, 0, 0, 1),
            }],
        }];
        let resolver = LinkResolver::new(BTreeMap::from([("c1".to_string(), "wid".to_string())]));
        build_usage_table(
            &hosts,
            &BTreeMap::from([("wid".to_string(), site)]),
            &resolver,
            EnumerationPolicy::default(),
        )
    }

    #[test]
    fn test_select_subnets_by_address() {
        let slash24: SubnetMask = "255.255.255.0".parse().unwrap();
        let slash16: SubnetMask = "255.255.0.0".parse().unwrap();
        let found = select_subnets(&table(), "10.0.0.77").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.contains(&(slash24, Ipv4Addr::new(10, 0, 0, 0))));
        assert!(found.contains(&(slash16, Ipv4Addr::new(10, 0, 0, 0))));
    }

    #[test]
    fn test_select_subnets_by_cidr() {
        let slash16: SubnetMask = "255.255.0.0".parse().unwrap();
        let found = select_subnets(&table(), "10.0.0.0/16").unwrap();
        assert_eq!(found, vec![(slash16, Ipv4Addr::new(10, 0, 0, 0))]);
        assert!(select_subnets(&table(), "10.1.0.0/16").unwrap().is_empty());
        assert!(select_subnets(&table(), "10.0.0/24").is_err());
        assert!(select_subnets(&table(), "10.0.0.0/40").is_err());
    }
}
