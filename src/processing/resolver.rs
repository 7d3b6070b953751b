//! Host-to-site resolution.
//!
//! Two interchangeable policies: a static table keyed by part of the host
//! name, and a directory of per-host symlinks pointing at site documents.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

use crate::config::{Discriminator, ResolverConfig};
use crate::error::InventoryError;
use crate::inventory::read_links;

/// Outcome of resolving one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteLink {
    /// Governed by the named site.
    Site(String),
    /// Known to be in use but not attributable to a site.
    Miscellaneous,
    /// No link at all; the host is left out of reconciliation.
    Unlinked,
}

pub trait SiteResolver {
    fn resolve(&self, host: &str) -> SiteLink;

    /// Short description for logs.
    fn describe(&self) -> String;
}

/// Site lookup by a discriminator taken from the host name.
///
/// Hosts whose discriminator is missing or not in the table land in the
/// miscellaneous bucket.
#[derive(Debug)]
pub struct TableResolver {
    discriminator: Discriminator,
    pattern: Option<Regex>,
    sites: BTreeMap<String, String>,
}

impl TableResolver {
    pub fn new(
        discriminator: &Discriminator,
        sites: BTreeMap<String, String>,
    ) -> Result<TableResolver, InventoryError> {
        let pattern = match discriminator {
            Discriminator::Pattern(re) => match Regex::new(re) {
                Ok(compiled) => Some(compiled),
                Err(e) => {
                    let msg = format!("bad discriminator '{re}': {e}");
                    return Err(InventoryError::Config(msg));
                }
            },
            Discriminator::CharFromEnd(0) => {
                return Err(InventoryError::Config("char_from_end counts from 1".to_string()));
            }
            Discriminator::CharFromEnd(_) => None,
        };
        Ok(TableResolver {
            discriminator: discriminator.clone(),
            pattern,
            sites,
        })
    }

    /// The part of `host` used as the table key.
    pub fn key(&self, host: &str) -> Option<String> {
        match (&self.discriminator, &self.pattern) {
            (_, Some(re)) => re.captures(host).and_then(|caps| {
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| m.as_str().to_string())
            }),
            (Discriminator::CharFromEnd(n), None) => {
                host.chars().rev().nth(n - 1).map(|c| c.to_string())
            }
            (Discriminator::Pattern(_), None) => None,
        }
    }
}

impl SiteResolver for TableResolver {
    fn resolve(&self, host: &str) -> SiteLink {
        match self.key(host).and_then(|k| self.sites.get(&k)) {
            Some(site) => SiteLink::Site(site.clone()),
            None => SiteLink::Miscellaneous,
        }
    }

    fn describe(&self) -> String {
        format!(
            "table {:?} over {} sites",
            self.discriminator,
            self.sites.len()
        )
    }
}

/// Site lookup through a host -> site link map.
#[derive(Debug, Default)]
pub struct LinkResolver {
    links: BTreeMap<String, String>,
}

impl LinkResolver {
    pub fn new(links: BTreeMap<String, String>) -> LinkResolver {
        LinkResolver { links }
    }

    pub fn from_dir(dir: &Path) -> Result<LinkResolver, InventoryError> {
        read_links(dir).map(LinkResolver::new)
    }
}

impl SiteResolver for LinkResolver {
    fn resolve(&self, host: &str) -> SiteLink {
        match self.links.get(host) {
            Some(site) => SiteLink::Site(site.clone()),
            None => SiteLink::Unlinked,
        }
    }

    fn describe(&self) -> String {
        format!("links for {} hosts", self.links.len())
    }
}

/// Build the resolver selected by `cfg`.
pub fn build_resolver(cfg: &ResolverConfig) -> Result<Box<dyn SiteResolver>, InventoryError> {
    let resolver: Box<dyn SiteResolver> = match cfg {
        ResolverConfig::Table {
            discriminator,
            sites,
        } => Box::new(TableResolver::new(discriminator, sites.clone())?),
        ResolverConfig::Links { link_dir } => Box::new(LinkResolver::from_dir(link_dir)?),
    };
    log::info!("Site resolver: {}", resolver.describe());
    Ok(resolver)
}
