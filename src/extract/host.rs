//! Host document dialects.

use serde_yaml::Value;

use super::{address_field, child, descend, fragment_entries, fragment_value, is_unset, join};
use crate::config::ExtractorConfig;
use crate::error::{SchemaError, SchemaViolation};
use crate::models::{parse_addr, HostRecord, InterfaceAddr};

/// The document layouts host records are found in.
///
/// Every dialect whose marker key is present contributes; results are
/// concatenated in [`HostDialect::ALL`] order.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HostDialect {
    /// `bmc.lan.{ip_address,default_gateway_ip}`.
    Bmc,
    /// Older nodes: `network.default_gateway`, `network.bridge_static.br0`.
    Legacy,
    /// Newer nodes: `file.<ifcfg path>.content.<field code>` fragments.
    Fragments,
}

impl HostDialect {
    pub const ALL: [HostDialect; 3] = [
        HostDialect::Bmc,
        HostDialect::Legacy,
        HostDialect::Fragments,
    ];

    /// Top-level key whose presence selects the dialect.
    pub fn marker(&self) -> &'static str {
        match self {
            HostDialect::Bmc => "bmc",
            HostDialect::Legacy => "network",
            HostDialect::Fragments => "file",
        }
    }

    /// Addresses this dialect finds in `doc`, or None when its marker is absent.
    pub fn extract(
        &self,
        name: &str,
        doc: &Value,
        cfg: &ExtractorConfig,
    ) -> Result<Option<HostRecord>, SchemaViolation> {
        let Some(section) = child(doc, "", self.marker())? else {
            return Ok(None);
        };
        let path = self.marker();
        let mut record = HostRecord::new(name);
        match self {
            HostDialect::Bmc => bmc_addrs(section, path, &mut record)?,
            HostDialect::Legacy => legacy_addrs(section, path, &mut record)?,
            HostDialect::Fragments => fragment_addrs(section, path, cfg, &mut record)?,
        }
        Ok(Some(record))
    }
}

/// Build one host's record from its parsed document.
///
/// # Errors
/// A [`SchemaError`] naming the host when the document is not a mapping, a
/// field has the wrong shape, or no dialect marker is present at all.
pub fn extract_host(
    name: &str,
    doc: &Value,
    cfg: &ExtractorConfig,
) -> Result<HostRecord, SchemaError> {
    if !doc.is_mapping() {
        return Err(SchemaError::new(
            name,
            SchemaViolation::WrongType {
                path: "<root>".to_string(),
                expected: "mapping",
            },
        ));
    }

    let mut record = HostRecord::new(name);
    let mut matched = 0;
    for dialect in HostDialect::ALL {
        match dialect.extract(name, doc, cfg) {
            Ok(Some(part)) => {
                log::trace!(
                    "{name}: {dialect:?} gave {} bmc, {} primary",
                    part.bmc.len(),
                    part.primary.len()
                );
                record.bmc.extend(part.bmc);
                record.primary.extend(part.primary);
                matched += 1;
            }
            Ok(None) => log::trace!("{name}: no '{}' section", dialect.marker()),
            Err(violation) => return Err(SchemaError::new(name, violation)),
        }
    }

    if matched == 0 {
        return Err(SchemaError::new(name, SchemaViolation::NoDialect));
    }
    Ok(record)
}

fn bmc_addrs(bmc: &Value, path: &str, record: &mut HostRecord) -> Result<(), SchemaViolation> {
    let Some(lan) = child(bmc, path, "lan")? else {
        return Ok(());
    };
    let lan_path = join(path, "lan");
    // Management address first, gateway second.
    for key in ["ip_address", "default_gateway_ip"] {
        if let Some(value) = child(lan, &lan_path, key)? {
            if let Some(addr) = address_field(value, &join(&lan_path, key))? {
                record.bmc.push(addr);
            }
        }
    }
    Ok(())
}

fn legacy_addrs(
    network: &Value,
    path: &str,
    record: &mut HostRecord,
) -> Result<(), SchemaViolation> {
    if let Some(value) = child(network, path, "default_gateway")? {
        if let Some(addr) = address_field(value, &join(path, "default_gateway"))? {
            record.primary.push(InterfaceAddr {
                interface: "default_gateway".to_string(),
                addr,
            });
        }
    }

    let Some((br0, br0_path)) = descend(network, path, &["bridge_static", "br0"])? else {
        return Ok(());
    };
    for key in ["ipaddress", "gateway"] {
        if let Some(value) = child(br0, &br0_path, key)? {
            if let Some(addr) = address_field(value, &join(&br0_path, key))? {
                record.primary.push(InterfaceAddr {
                    interface: "br0".to_string(),
                    addr,
                });
            }
        }
    }
    Ok(())
}

fn fragment_addrs(
    files: &Value,
    path: &str,
    cfg: &ExtractorConfig,
    record: &mut HostRecord,
) -> Result<(), SchemaViolation> {
    for iface in &cfg.interface_codes {
        let file_key = format!("{}{}", cfg.interface_file_prefix, iface.interface);
        let Some(file) = child(files, path, &file_key)? else {
            continue;
        };
        let file_path = join(path, &file_key);
        let Some(content) = child(file, &file_path, "content")? else {
            continue;
        };
        let content_path = join(&file_path, "content");

        for code in &iface.codes {
            let Some(value) = child(content, &content_path, code)? else {
                continue;
            };
            if is_unset(value) {
                continue;
            }
            let code_path = join(&content_path, code);
            for entry in fragment_entries(value, &code_path)? {
                let raw = fragment_value(entry, &code_path)?;
                if raw.is_empty() || cfg.placeholder_values.iter().any(|p| p == raw) {
                    continue;
                }
                let addr = parse_addr(raw).map_err(|error| SchemaViolation::BadAddress {
                    path: code_path.clone(),
                    error,
                })?;
                record.primary.push(InterfaceAddr {
                    interface: iface.interface.clone(),
                    addr,
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    const FRAGMENT_NODE: &str = r#"
bmc:
  lan:
    ip_address: 10.9.0.21
    default_gateway_ip: 10.9.0.1
file:
  /etc/sysconfig/network-scripts/ifcfg-eth0:
    content:
      "0601":
        - IPADDR=10.0.0.21
      "0600": false
  /etc/sysconfig/network-scripts/ifcfg-ib0:
    content:
      "0602":
        - IPADDR=overwriteme
      "0600":
        - IPADDR=192.168.50.21
"#;

    #[test]
    fn test_extract_fragment_dialect() {
        let cfg = ExtractorConfig::default();
        let host = extract_host("c0021", &yaml(FRAGMENT_NODE), &cfg).unwrap();
        assert_eq!(host.name, "c0021");
        assert_eq!(
            host.bmc,
            vec![Ipv4Addr::new(10, 9, 0, 21), Ipv4Addr::new(10, 9, 0, 1)]
        );
        assert_eq!(
            host.primary,
            vec![
                InterfaceAddr {
                    interface: "eth0".to_string(),
                    addr: Ipv4Addr::new(10, 0, 0, 21)
                },
                InterfaceAddr {
                    interface: "ib0".to_string(),
                    addr: Ipv4Addr::new(192, 168, 50, 21)
                },
            ]
        );
    }

    #[test]
    fn test_extract_legacy_dialect() {
        let doc = yaml(
            r#"
network:
  default_gateway: 10.1.0.1
  bridge_static:
    br0:
      ipaddress: 10.1.0.40
      gateway: ""
"#,
        );
        let host = extract_host("old7", &doc, &ExtractorConfig::default()).unwrap();
        assert!(host.bmc.is_empty());
        let addrs: Vec<Ipv4Addr> = host.primary.iter().map(|p| p.addr).collect();
        assert_eq!(
            addrs,
            vec![Ipv4Addr::new(10, 1, 0, 1), Ipv4Addr::new(10, 1, 0, 40)]
        );
        assert_eq!(host.primary[1].interface, "br0");
    }

    #[test]
    fn test_bmc_gateway_only() {
        let doc = yaml("bmc:\n  lan:\n    default_gateway_ip: 10.9.0.1\n");
        let host = extract_host("n1", &doc, &ExtractorConfig::default()).unwrap();
        assert_eq!(host.bmc, vec![Ipv4Addr::new(10, 9, 0, 1)]);
        assert!(host.primary.is_empty());
    }

    #[test]
    fn test_dialects_union() {
        let doc = yaml(
            r#"
network:
  default_gateway: 10.1.0.1
file:
  /etc/sysconfig/network-scripts/ifcfg-bond0:
    content:
      "110": [IPADDR=10.1.0.77]
"#,
        );
        let host = extract_host("mixed", &doc, &ExtractorConfig::default()).unwrap();
        assert_eq!(host.primary.len(), 2);
        assert_eq!(host.primary[1].interface, "bond0");
    }

    #[test]
    fn test_wrong_type_is_schema_error() {
        let doc = yaml("bmc:\n  lan: 42\n");
        let err = extract_host("bad1", &doc, &ExtractorConfig::default()).unwrap_err();
        assert_eq!(err.source_name, "bad1");
        assert_eq!(
            err.violation,
            SchemaViolation::WrongType {
                path: "bmc.lan".to_string(),
                expected: "mapping"
            }
        );
    }

    #[test]
    fn test_bad_address_is_schema_error() {
        let doc = yaml("network:\n  default_gateway: 10.1.0\n");
        let err = extract_host("bad2", &doc, &ExtractorConfig::default()).unwrap_err();
        assert!(matches!(err.violation, SchemaViolation::BadAddress { .. }));
    }

    #[test]
    fn test_no_dialect() {
        let cfg = ExtractorConfig::default();
        let err = extract_host("odd", &yaml("hostname: odd\n"), &cfg).unwrap_err();
        assert_eq!(err.violation, SchemaViolation::NoDialect);
        let err = extract_host("scalar", &yaml("just text"), &cfg).unwrap_err();
        assert!(matches!(err.violation, SchemaViolation::WrongType { .. }));
    }

    #[test]
    fn test_fragment_without_equals() {
        let doc = yaml(
            r#"
file:
  /etc/sysconfig/network-scripts/ifcfg-eth1:
    content:
      "0600": [IPADDR]
"#,
        );
        let err = extract_host("frag", &doc, &ExtractorConfig::default()).unwrap_err();
        assert!(matches!(err.violation, SchemaViolation::BadFragment { .. }));
    }
}
