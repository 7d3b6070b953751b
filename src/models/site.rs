//! Site record model.

use super::{InterfaceFamily, SubnetMask};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A site and the subnet mask it declares per interface family.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct SiteRecord {
    /// Site name (document file stem).
    pub name: String,
    pub masks: BTreeMap<InterfaceFamily, SubnetMask>,
}

impl SiteRecord {
    pub fn new(name: &str) -> SiteRecord {
        SiteRecord {
            name: name.to_string(),
            masks: BTreeMap::new(),
        }
    }

    pub fn with_mask(mut self, family: InterfaceFamily, mask: SubnetMask) -> SiteRecord {
        self.masks.insert(family, mask);
        self
    }

    pub fn mask(&self, family: InterfaceFamily) -> Option<SubnetMask> {
        self.masks.get(&family).copied()
    }

    pub fn primary_mask(&self) -> Option<SubnetMask> {
        self.mask(InterfaceFamily::Primary)
    }

    pub fn bmc_mask(&self) -> Option<SubnetMask> {
        self.mask(InterfaceFamily::Bmc)
    }
}
