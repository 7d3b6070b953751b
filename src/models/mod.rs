//! Domain models for the address inventory.
//!
//! This module contains the core data structures used throughout the application:
//! - [`Ipv4`], [`SubnetMask`] and the address codec functions
//! - [`HostRecord`] - addresses scraped from one node document
//! - [`SiteRecord`] - masks declared by one site document

mod host;
mod ipv4;
mod site;

// Re-export public types
pub use host::{HostRecord, InterfaceAddr, InterfaceFamily};
pub use ipv4::{
    apply_mask, broadcast_addr, count_set_bits, cut_addr, enumerate_addresses, get_cidr_mask,
    parse_addr, split_addr, AddressRange, Ipv4, SubnetMask, MAX_LENGTH,
};
pub use site::SiteRecord;
