//! Plain-text reports over the usage table.

use chrono::{DateTime, Local};
use colored::Colorize;
use itertools::Itertools;
use std::net::Ipv4Addr;

use super::terminal::format_field;
use crate::error::{Fault, NotFound};
use crate::models::{HostRecord, SubnetMask};
use crate::processing::UsageTable;

const FAULT_BANNER: &str = "Found malformed YAML files. List of IP addresses is likely incomplete.";
const SUMMARY_HEADER: &str =
    r#"           "network",             "mask",           "usage",     "first_free""#;

/// What a subnet report lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Only the first unused address.
    pub first_only: bool,
    /// Append the used addresses.
    pub show_used: bool,
    /// Append the number of used addresses.
    pub count_used: bool,
}

/// Each line followed by a newline.
fn block(lines: Vec<String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}

/// Report header line stamped with the generation time.
pub fn render_banner(generated: DateTime<Local>, hosts: usize, sites: usize) -> String {
    format!(
        "# Subnet inventory {} ({hosts} hosts, {sites} sites)\n",
        generated.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Unused (and optionally used) addresses of one subnet.
///
/// # Errors
/// `NotFound::Subnet` for an unknown subnet; with `first_only`,
/// `NotFound::NoFreeAddress` when every address is used.
pub fn render_subnet(
    table: &UsageTable,
    mask: SubnetMask,
    network: Ipv4Addr,
    opts: &ReportOptions,
) -> Result<String, NotFound> {
    let bits = mask.prefix_len();
    let mut lines = vec![format!("Available IPs for {network}/{bits}")];
    if opts.first_only {
        lines.push(table.first_unused(mask, network)?.to_string());
        return Ok(block(lines));
    }
    let unused = table.unused_for(mask, network)?;
    lines.extend(unused.map(|addr| addr.to_string()));

    let used = table.used_for(mask, network)?;
    if opts.show_used {
        lines.push(format!("Used IPs for {network}/{bits}"));
        lines.extend(used.iter().map(|addr| addr.to_string()));
    }
    if opts.count_used {
        lines.push(format!("Used count for {network}/{bits}: {}", used.len()));
    }

    let stray = table.miscellaneous_in(mask, network);
    if !stray.is_empty() {
        lines.push(format!(
            "# {} address(es) of hosts without a site fall in {network}/{bits}: {}",
            stray.len(),
            stray.iter().join(", ")
        ));
    }
    Ok(block(lines))
}

/// Reports for every subnet in the table, in table order.
pub fn render_all(table: &UsageTable, opts: &ReportOptions) -> String {
    table
        .list_subnets()
        .into_iter()
        .map(|(mask, network)| match render_subnet(table, mask, network, opts) {
            Ok(text) => text,
            Err(e) => format!("# {e}\n"),
        })
        .join("")
}

/// Each host's BMC and data addresses.
pub fn render_hosts(hosts: &[HostRecord]) -> String {
    let mut lines = Vec::new();
    for host in hosts {
        lines.push(format!("---{}---", host.name));
        if !host.bmc.is_empty() {
            lines.push("BMC Networks:".to_string());
            lines.extend(host.bmc.iter().map(|addr| format!("    {addr}")));
        }
        lines.push("Data Networks:".to_string());
        for p in &host.primary {
            lines.push(format!("    {} ({})", p.addr, p.interface));
        }
    }
    block(lines)
}

/// Fault banner and one `name: reason` line per fault; empty when clean.
pub fn render_faults(faults: &[Fault]) -> String {
    if faults.is_empty() {
        return String::new();
    }
    let mut lines = vec![FAULT_BANNER.to_string()];
    lines.extend(faults.iter().map(|fault| fault.to_string()));
    block(lines)
}

/// One row per subnet: network, mask, used/total, first free address.
pub fn summary_rows(table: &UsageTable) -> Vec<String> {
    table
        .summaries()
        .iter()
        .map(|s| {
            format!(
                "{network},{mask},{usage},{first}",
                network = format_field(s.network, 20),
                mask = format_field(s.mask, 18),
                usage = format_field(format!("{}/{}_used", s.used, s.total), 16),
                first = format_field(
                    s.first_unused
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "full".to_string()),
                    18
                ),
            )
        })
        .collect()
}

/// Print the subnet summary and table audit to stdout.
pub fn print_summary(table: &UsageTable) {
    log::info!("#Start print_summary()");
    println!("{SUMMARY_HEADER}");
    for row in summary_rows(table) {
        println!("{row}");
    }

    let audit = table.audit();
    let status = if audit.is_balanced() {
        "OK".on_green()
    } else {
        "MISMATCH".on_red()
    };
    println!(
        "#{status}# {} addresses tracked ({} duplicate), {} miscellaneous, {} unlinked hosts",
        audit.distinct,
        audit.duplicates(),
        table.miscellaneous().len(),
        table.unlinked().len()
    );
}

/// Print the fault banner, highlighted, to stdout.
pub fn print_faults(faults: &[Fault]) {
    if faults.is_empty() {
        return;
    }
    println!("#{}#", "WARNING".on_red());
    print!("{}", render_faults(faults));
}
