//! Host record model.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Interface family a site declares a mask for.
#[derive(
    Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceFamily {
    /// Data-plane interfaces (ethN, bondN, br0, ...).
    Primary,
    /// Baseboard management controller LAN.
    Bmc,
}

impl InterfaceFamily {
    pub const ALL: [InterfaceFamily; 2] = [InterfaceFamily::Primary, InterfaceFamily::Bmc];

    pub fn label(&self) -> &'static str {
        match self {
            InterfaceFamily::Primary => "primary",
            InterfaceFamily::Bmc => "bmc",
        }
    }
}

impl fmt::Display for InterfaceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A data-plane address and the interface it was found on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddr {
    pub interface: String,
    pub addr: Ipv4Addr,
}

/// One node's addresses, as extracted from its configuration document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct HostRecord {
    /// Host name (document file stem).
    pub name: String,
    /// Management address, then gateway; either may be absent.
    pub bmc: Vec<Ipv4Addr>,
    pub primary: Vec<InterfaceAddr>,
}

impl HostRecord {
    pub fn new(name: &str) -> HostRecord {
        HostRecord {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Addresses of one family, in document order.
    pub fn addresses(&self, family: InterfaceFamily) -> Vec<Ipv4Addr> {
        match family {
            InterfaceFamily::Primary => self.primary.iter().map(|p| p.addr).collect(),
            InterfaceFamily::Bmc => self.bmc.clone(),
        }
    }

    pub fn address_count(&self) -> usize {
        self.primary.len() + self.bmc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.address_count() == 0
    }
}
