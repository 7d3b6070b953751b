//! Inventory processing logic.
//!
//! This module contains the business logic applied to extracted records:
//! - [`resolver`] - linking hosts to the site that governs them
//! - [`reconcile`] - building and querying the subnet usage table

mod reconcile;
mod resolver;

// Re-export public functions
pub use reconcile::{
    address_count, all_addresses, build_usage_table, Audit, SubnetSummary, UnlinkedHost,
    UsageTable,
};
pub use resolver::{build_resolver, LinkResolver, SiteLink, SiteResolver, TableResolver};
