//! Subnet usage reconciliation.
//!
//! Builds the mask -> network -> used-address table from linked host records
//! and answers used/unused queries against it. The table is immutable once
//! [`build_usage_table`] returns.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use super::resolver::{SiteLink, SiteResolver};
use crate::config::EnumerationPolicy;
use crate::error::NotFound;
use crate::models::{
    enumerate_addresses, split_addr, HostRecord, InterfaceFamily, Ipv4, SiteRecord, SubnetMask,
};

type Networks = BTreeMap<Ipv4Addr, BTreeSet<Ipv4Addr>>;

/// A host left out of reconciliation.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UnlinkedHost {
    pub host: String,
    /// Site the resolver named when no such site was loaded.
    pub unknown_site: Option<String>,
}

/// Insert accounting, checked after the build.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Audit {
    /// Sum of address counts over linked and miscellaneous hosts.
    pub expected: usize,
    /// Inserts into the per-subnet table.
    pub inserted: usize,
    /// Addresses of a family the host's site has no mask for.
    pub skipped_without_mask: usize,
    /// Inserts into the miscellaneous bucket.
    pub miscellaneous: usize,
    /// Distinct addresses held in the table and the bucket.
    pub distinct: usize,
}

impl Audit {
    pub fn is_balanced(&self) -> bool {
        self.inserted + self.skipped_without_mask + self.miscellaneous == self.expected
    }

    /// Inserts that repeated an address already tracked (shared gateways).
    pub fn duplicates(&self) -> usize {
        (self.inserted + self.miscellaneous).saturating_sub(self.distinct)
    }
}

/// Per-subnet figures for reports.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SubnetSummary {
    pub mask: SubnetMask,
    pub network: Ipv4,
    pub used: usize,
    pub total: u64,
    pub first_unused: Option<Ipv4Addr>,
}

/// Used addresses per (mask, network), plus the miscellaneous bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsageTable {
    subnets: BTreeMap<SubnetMask, Networks>,
    miscellaneous: BTreeSet<Ipv4Addr>,
    unlinked: Vec<UnlinkedHost>,
    enumeration: EnumerationPolicy,
    audit: Audit,
}

/// Reconcile `hosts` against `sites`, linking each host through `resolver`.
///
/// Every primary address goes under its site's primary mask and every BMC
/// address under its BMC mask. A family without a mask is skipped for that
/// host only.
///
/// # Panics
/// If an inserted address does not belong to its network key; that means the
/// codec is broken, not that the input is bad.
pub fn build_usage_table(
    hosts: &[HostRecord],
    sites: &BTreeMap<String, SiteRecord>,
    resolver: &dyn SiteResolver,
    enumeration: EnumerationPolicy,
) -> UsageTable {
    log::info!(
        "#Start build_usage_table() hosts={} sites={}",
        hosts.len(),
        sites.len()
    );
    let mut table = UsageTable {
        subnets: BTreeMap::new(),
        miscellaneous: BTreeSet::new(),
        unlinked: Vec::new(),
        enumeration,
        audit: Audit::default(),
    };

    for host in hosts {
        let site = match resolver.resolve(&host.name) {
            SiteLink::Site(name) => match sites.get(&name) {
                Some(site) => site,
                None => {
                    log::warn!("{}: site '{name}' not loaded, host excluded", host.name);
                    table.unlinked.push(UnlinkedHost {
                        host: host.name.clone(),
                        unknown_site: Some(name),
                    });
                    continue;
                }
            },
            SiteLink::Miscellaneous => {
                log::debug!(
                    "{}: no site, {} addresses to miscellaneous",
                    host.name,
                    host.address_count()
                );
                table.audit.expected += host.address_count();
                for family in InterfaceFamily::ALL {
                    for addr in host.addresses(family) {
                        table.miscellaneous.insert(addr);
                        table.audit.miscellaneous += 1;
                    }
                }
                continue;
            }
            SiteLink::Unlinked => {
                log::warn!("{}: no site link, host excluded", host.name);
                table.unlinked.push(UnlinkedHost {
                    host: host.name.clone(),
                    unknown_site: None,
                });
                continue;
            }
        };

        table.audit.expected += host.address_count();
        for family in InterfaceFamily::ALL {
            let addrs = host.addresses(family);
            match site.mask(family) {
                Some(mask) => {
                    for addr in addrs {
                        table.insert(mask, addr);
                    }
                }
                None => {
                    if !addrs.is_empty() {
                        log::debug!(
                            "{}: site {} has no {family} mask, {} addresses skipped",
                            host.name,
                            site.name,
                            addrs.len()
                        );
                    }
                    table.audit.skipped_without_mask += addrs.len();
                }
            }
        }
    }

    table.audit.distinct = table
        .subnets
        .values()
        .flat_map(|networks| networks.values())
        .map(|used| used.len())
        .sum::<usize>()
        + table.miscellaneous.len();

    if table.audit.is_balanced() {
        log::info!(
            "Usage table: {} subnets, {} addresses ({} duplicate), {} miscellaneous, {} unlinked",
            table.list_subnets().len(),
            table.audit.distinct,
            table.audit.duplicates(),
            table.miscellaneous.len(),
            table.unlinked.len()
        );
    } else {
        log::error!("Usage table audit does not balance: {:?}", table.audit);
    }
    table
}

impl UsageTable {
    fn insert(&mut self, mask: SubnetMask, addr: Ipv4Addr) {
        let (network, _) = split_addr(addr, mask);
        assert!(
            u32::from(addr) & mask.bits() == u32::from(network),
            "address {addr} does not belong to network {network} under {mask}"
        );
        self.subnets
            .entry(mask)
            .or_default()
            .entry(network)
            .or_default()
            .insert(addr);
        self.audit.inserted += 1;
    }

    fn networks(
        &self,
        mask: SubnetMask,
        network: Ipv4Addr,
    ) -> Result<&BTreeSet<Ipv4Addr>, NotFound> {
        self.subnets
            .get(&mask)
            .and_then(|networks| networks.get(&network))
            .ok_or(NotFound::Subnet { mask, network })
    }

    /// Every (mask, network) pair present, ordered by mask then network.
    pub fn list_subnets(&self) -> Vec<(SubnetMask, Ipv4Addr)> {
        self.subnets
            .iter()
            .flat_map(|(mask, networks)| networks.keys().map(move |net| (*mask, *net)))
            .collect()
    }

    pub fn used_for(
        &self,
        mask: SubnetMask,
        network: Ipv4Addr,
    ) -> Result<&BTreeSet<Ipv4Addr>, NotFound> {
        self.networks(mask, network)
    }

    /// The subnet's full address space under the enumeration policy.
    pub fn all_for(
        &self,
        mask: SubnetMask,
        network: Ipv4Addr,
    ) -> Result<impl Iterator<Item = Ipv4Addr>, NotFound> {
        self.networks(mask, network)?;
        Ok(all_addresses(mask, network, self.enumeration))
    }

    /// Lazily yields the addresses of `all_for` that are not used, ascending.
    ///
    /// An existing subnet with nothing free yields an empty sequence; an
    /// unknown subnet is `NotFound::Subnet`.
    pub fn unused_for(
        &self,
        mask: SubnetMask,
        network: Ipv4Addr,
    ) -> Result<impl Iterator<Item = Ipv4Addr> + '_, NotFound> {
        let used = self.networks(mask, network)?;
        let all = all_addresses(mask, network, self.enumeration);
        Ok(all.filter(move |addr| !used.contains(addr)))
    }

    /// Lowest unused address; stops at the first hit.
    pub fn first_unused(
        &self,
        mask: SubnetMask,
        network: Ipv4Addr,
    ) -> Result<Ipv4Addr, NotFound> {
        self.unused_for(mask, network)?
            .next()
            .ok_or(NotFound::NoFreeAddress { mask, network })
    }

    /// Every (mask, network) in the table whose block holds `addr`.
    pub fn locate(&self, addr: Ipv4Addr) -> Vec<(SubnetMask, Ipv4Addr)> {
        self.subnets
            .iter()
            .filter_map(|(mask, networks)| {
                let (network, _) = split_addr(addr, *mask);
                networks.contains_key(&network).then_some((*mask, network))
            })
            .collect()
    }

    /// Miscellaneous-bucket addresses that fall inside a subnet's block.
    ///
    /// They do not count as used for that subnet, but reports flag them.
    pub fn miscellaneous_in(&self, mask: SubnetMask, network: Ipv4Addr) -> Vec<Ipv4Addr> {
        let block = Ipv4::from_mask(network, mask);
        self.miscellaneous
            .iter()
            .filter(|addr| block.contains(**addr))
            .copied()
            .collect()
    }

    pub fn summary(&self, mask: SubnetMask, network: Ipv4Addr) -> Result<SubnetSummary, NotFound> {
        let used = self.used_for(mask, network)?;
        Ok(SubnetSummary {
            mask,
            network: Ipv4::from_mask(network, mask),
            used: used.len(),
            total: address_count(mask, self.enumeration),
            first_unused: self.first_unused(mask, network).ok(),
        })
    }

    pub fn summaries(&self) -> Vec<SubnetSummary> {
        self.list_subnets()
            .into_iter()
            .filter_map(|(mask, network)| self.summary(mask, network).ok())
            .collect()
    }

    pub fn miscellaneous(&self) -> &BTreeSet<Ipv4Addr> {
        &self.miscellaneous
    }

    pub fn unlinked(&self) -> &[UnlinkedHost] {
        &self.unlinked
    }

    pub fn audit(&self) -> &Audit {
        &self.audit
    }
}

/// Network and broadcast exclusions only apply to blocks of 4 or more.
fn excludes_ends(prefix: u8) -> bool {
    prefix <= 30
}

/// The block of `network` under `mask`, minus the excluded ends.
pub fn all_addresses(
    mask: SubnetMask,
    network: Ipv4Addr,
    policy: EnumerationPolicy,
) -> impl Iterator<Item = Ipv4Addr> {
    let prefix = mask.prefix_len();
    let block = Ipv4::from_mask(network, mask);
    let (lo, hi) = (block.lo(), block.hi());
    let skip_lo = excludes_ends(prefix) && !policy.include_network;
    let skip_hi = excludes_ends(prefix) && !policy.include_broadcast;
    enumerate_addresses(network, prefix)
        .filter(move |addr| !(skip_lo && *addr == lo) && !(skip_hi && *addr == hi))
}

/// Size of what [`all_addresses`] yields.
pub fn address_count(mask: SubnetMask, policy: EnumerationPolicy) -> u64 {
    let prefix = mask.prefix_len();
    let mut total = 1u64 << (32 - u32::from(prefix));
    if excludes_ends(prefix) {
        total -= u64::from(!policy.include_network) + u64::from(!policy.include_broadcast);
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Discriminator;
    use crate::models::InterfaceAddr;
    use crate::processing::resolver::{LinkResolver, TableResolver};

    fn mask(s: &str) -> SubnetMask {
        s.parse().unwrap()
    }

    fn ip(s: &str) -> Ipv4Addr {
        s.parse().unwrap()
    }

    fn host(name: &str, primary: &[&str], bmc: &[&str]) -> HostRecord {
        HostRecord {
            name: name.to_string(),
            bmc: bmc.iter().map(|a| ip(a)).collect(),
            primary: primary
                .iter()
                .map(|a| InterfaceAddr {
                    interface: "eth0".to_string(),
                    addr: ip(a),
                })
                .collect(),
        }
    }

    fn sites() -> BTreeMap<String, SiteRecord> {
        let wid = SiteRecord::new("wid")
            .with_mask(InterfaceFamily::Primary, mask("255.255.255.0"))
            .with_mask(InterfaceFamily::Bmc, mask("255.255.255.252"));
        let lab = SiteRecord::new("lab").with_mask(InterfaceFamily::Primary, mask("255.255.0.0"));
        BTreeMap::from([("wid".to_string(), wid), ("lab".to_string(), lab)])
    }

    fn links(pairs: &[(&str, &str)]) -> LinkResolver {
        LinkResolver::new(
            pairs
                .iter()
                .map(|(h, s)| (h.to_string(), s.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_single_host_scenario() {
        let hosts = vec![host("c1", &["10.0.0.5"], &[])];
        let table = build_usage_table(
            &hosts,
            &sites(),
            &links(&[("c1", "wid")]),
            EnumerationPolicy::default(),
        );
        let m = mask("255.255.255.0");
        let net = ip("10.0.0.0");
        assert_eq!(table.list_subnets(), vec![(m, net)]);
        assert_eq!(table.used_for(m, net).unwrap().len(), 1);
        let unused: Vec<Ipv4Addr> = table.unused_for(m, net).unwrap().collect();
        assert_eq!(unused.len(), 255);
        assert!(!unused.contains(&ip("10.0.0.5")));
        assert_eq!(unused[0], ip("10.0.0.0"));
        assert_eq!(table.first_unused(m, net).unwrap(), ip("10.0.0.0"));
    }

    #[test]
    fn test_exclusion_policy() {
        let hosts = vec![host("c1", &["10.0.0.5"], &[])];
        let policy = EnumerationPolicy {
            include_network: false,
            include_broadcast: false,
        };
        let table = build_usage_table(&hosts, &sites(), &links(&[("c1", "wid")]), policy);
        let m = mask("255.255.255.0");
        let net = ip("10.0.0.0");
        let unused: Vec<Ipv4Addr> = table.unused_for(m, net).unwrap().collect();
        assert_eq!(unused.len(), 253);
        assert_eq!(table.first_unused(m, net).unwrap(), ip("10.0.0.1"));
        assert_eq!(address_count(m, policy), 254);
        // /31 keeps both addresses whatever the policy.
        assert_eq!(address_count(mask("255.255.255.254"), policy), 2);
    }

    #[test]
    fn test_full_slash30_has_no_free_address() {
        let hosts = vec![
            host("c1", &[], &["10.9.0.0", "10.9.0.1"]),
            host("c2", &[], &["10.9.0.2", "10.9.0.3"]),
        ];
        let table = build_usage_table(
            &hosts,
            &sites(),
            &links(&[("c1", "wid"), ("c2", "wid")]),
            EnumerationPolicy::default(),
        );
        let m = mask("255.255.255.252");
        let net = ip("10.9.0.0");
        assert_eq!(table.unused_for(m, net).unwrap().count(), 0);
        assert_eq!(
            table.first_unused(m, net),
            Err(NotFound::NoFreeAddress {
                mask: m,
                network: net
            })
        );
        assert_eq!(
            table.first_unused(m, ip("10.9.0.4")),
            Err(NotFound::Subnet {
                mask: m,
                network: ip("10.9.0.4")
            })
        );
    }

    #[test]
    fn test_partition_property() {
        let hosts = vec![
            host("c1", &["10.0.0.5", "10.0.1.9"], &["10.9.0.1"]),
            host("c2", &["10.0.0.200"], &["10.9.0.6"]),
            host("l1", &["172.16.4.4"], &["10.9.0.7"]),
        ];
        let table = build_usage_table(
            &hosts,
            &sites(),
            &links(&[("c1", "wid"), ("c2", "wid"), ("l1", "lab")]),
            EnumerationPolicy::default(),
        );
        for (m, net) in table.list_subnets() {
            let used = table.used_for(m, net).unwrap();
            let unused: BTreeSet<Ipv4Addr> = table.unused_for(m, net).unwrap().collect();
            let all: BTreeSet<Ipv4Addr> = table.all_for(m, net).unwrap().collect();
            assert!(used.is_disjoint(&unused), "{m} {net}");
            let union: BTreeSet<Ipv4Addr> = used.union(&unused).copied().collect();
            assert_eq!(union, all, "{m} {net}");
        }
        // lab has no BMC mask: l1's BMC address is skipped.
        assert_eq!(table.audit().skipped_without_mask, 1);
        assert_eq!(table.list_subnets().len(), 5);
    }

    #[test]
    fn test_unlinked_and_miscellaneous() {
        let hosts = vec![
            host("c1", &["10.0.0.5"], &[]),
            host("c2", &["10.0.0.6"], &[]),
            host("c3", &["10.0.0.7"], &[]),
        ];
        let discriminator = Discriminator::Pattern("^(c1|c2)$".to_string());
        let by_key = BTreeMap::from([
            ("c1".to_string(), "wid".to_string()),
            ("c2".to_string(), "gone".to_string()),
        ]);
        let resolver = TableResolver::new(&discriminator, by_key).unwrap();
        let table = build_usage_table(&hosts, &sites(), &resolver, EnumerationPolicy::default());

        assert_eq!(
            table.unlinked(),
            &[UnlinkedHost {
                host: "c2".to_string(),
                unknown_site: Some("gone".to_string())
            }]
        );
        assert!(table.miscellaneous().contains(&ip("10.0.0.7")));
        let m = mask("255.255.255.0");
        let net = ip("10.0.0.0");
        assert_eq!(table.used_for(m, net).unwrap().len(), 1);
        assert_eq!(table.miscellaneous_in(m, net), vec![ip("10.0.0.7")]);
        assert!(table.audit().is_balanced());
        assert_eq!(table.audit().expected, 2);
    }

    #[test]
    fn test_audit_counts_duplicates() {
        let hosts = vec![
            host("c1", &["10.0.0.5"], &["10.9.0.1", "10.9.0.2"]),
            host("c2", &["10.0.0.6"], &["10.9.0.5", "10.9.0.2"]),
        ];
        let table = build_usage_table(
            &hosts,
            &sites(),
            &links(&[("c1", "wid"), ("c2", "wid")]),
            EnumerationPolicy::default(),
        );
        let audit = table.audit();
        assert_eq!(audit.expected, 6);
        assert_eq!(audit.inserted, 6);
        assert_eq!(audit.distinct, 5);
        assert_eq!(audit.duplicates(), 1);
        assert!(audit.is_balanced());
    }

    #[test]
    fn test_idempotent_rebuild() {
        let hosts = vec![
            host("c2", &["10.0.0.200"], &["10.9.0.6"]),
            host("c1", &["10.0.0.5"], &["10.9.0.1"]),
        ];
        let resolver = links(&[("c1", "wid"), ("c2", "wid")]);
        let a = build_usage_table(&hosts, &sites(), &resolver, EnumerationPolicy::default());
        let b = build_usage_table(&hosts, &sites(), &resolver, EnumerationPolicy::default());
        let mut reversed = hosts.clone();
        reversed.reverse();
        let c = build_usage_table(&reversed, &sites(), &resolver, EnumerationPolicy::default());
        assert_eq!(a, b);
        assert_eq!(a.list_subnets(), c.list_subnets());
        assert_eq!(a.summaries(), c.summaries());
    }

    #[test]
    fn test_locate_and_summary() {
        let hosts = vec![host("c1", &["10.0.0.5"], &["10.9.0.1"])];
        let table = build_usage_table(
            &hosts,
            &sites(),
            &links(&[("c1", "wid")]),
            EnumerationPolicy::default(),
        );
        assert_eq!(
            table.locate(ip("10.0.0.99")),
            vec![(mask("255.255.255.0"), ip("10.0.0.0"))]
        );
        assert!(table.locate(ip("192.168.0.1")).is_empty());

        let m = mask("255.255.255.252");
        let summary = table.summary(m, ip("10.9.0.0")).unwrap();
        assert_eq!(summary.network.to_string(), "10.9.0.0/30");
        assert_eq!(summary.used, 1);
        assert_eq!(summary.total, 4);
        assert_eq!(summary.first_unused, Some(ip("10.9.0.0")));
    }

    #[test]
    fn test_large_subnet_first_unused_is_lazy() {
        let hosts = vec![host("l1", &["172.16.0.0"], &[])];
        let table = build_usage_table(
            &hosts,
            &sites(),
            &links(&[("l1", "lab")]),
            EnumerationPolicy::default(),
        );
        let m = mask("255.255.0.0");
        let network = ip("172.16.0.0");
        assert_eq!(table.first_unused(m, network).unwrap(), ip("172.16.0.1"));
        assert_eq!(table.unused_for(m, network).unwrap().count(), 65535);
    }
}
