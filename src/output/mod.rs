//! Reporting over the reconciled inventory.
//!
//! - [`report`] - subnet, host and fault listings, subnet summary table
//! - [`json`] - JSON export for downstream tools
//! - [`terminal`] - field formatting helpers

mod json;
mod report;
mod terminal;

pub use json::{to_json, write_json, Export};
pub use report::{
    print_faults, print_summary, render_all, render_banner, render_faults, render_hosts,
    render_subnet, summary_rows, ReportOptions,
};
pub use terminal::format_field;
