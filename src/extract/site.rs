//! Site document extraction.

use serde_yaml::Value;

use super::{child, descend, fragment_entries, fragment_value, is_unset, join};
use crate::config::ExtractorConfig;
use crate::error::{SchemaError, SchemaViolation};
use crate::models::{InterfaceFamily, SiteRecord, SubnetMask};

/// Build one site's record: the primary mask from the first configured
/// interface label that carries one, the BMC mask from `bmc.lan.subnet_mask`.
///
/// # Errors
/// A [`SchemaError`] naming the site when a field has the wrong shape, a mask
/// does not parse, or the document yields no mask at all.
pub fn extract_site(
    name: &str,
    doc: &Value,
    cfg: &ExtractorConfig,
) -> Result<SiteRecord, SchemaError> {
    if !doc.is_mapping() {
        return Err(SchemaError::new(
            name,
            SchemaViolation::WrongType {
                path: "<root>".to_string(),
                expected: "mapping",
            },
        ));
    }

    let mut site = SiteRecord::new(name);
    let fail = |violation| SchemaError::new(name, violation);

    if let Some(mask) = primary_mask(doc, cfg).map_err(fail)? {
        site.masks.insert(InterfaceFamily::Primary, mask);
    }
    if let Some(mask) = bmc_mask(doc).map_err(fail)? {
        site.masks.insert(InterfaceFamily::Bmc, mask);
    } else {
        log::debug!("{name}: no BMC mask");
    }

    if site.masks.is_empty() {
        return Err(fail(SchemaViolation::NoDialect));
    }
    Ok(site)
}

fn primary_mask(
    doc: &Value,
    cfg: &ExtractorConfig,
) -> Result<Option<SubnetMask>, SchemaViolation> {
    let Some(files) = child(doc, "", "file")? else {
        return Ok(None);
    };

    for label in &cfg.site_labels {
        let file_key = format!("{}{}", cfg.interface_file_prefix, label);
        let keys = [file_key.as_str(), "content"];
        let Some((content, content_path)) = descend(files, "file", &keys)? else {
            continue;
        };
        for code in &cfg.site_mask_codes {
            let Some(value) = child(content, &content_path, code)? else {
                continue;
            };
            if is_unset(value) {
                continue;
            }
            let code_path = join(&content_path, code);
            if let Some(entry) = fragment_entries(value, &code_path)?.first() {
                let raw = fragment_value(entry, &code_path)?;
                return parse_mask(raw, &code_path).map(Some);
            }
        }
    }
    Ok(None)
}

fn bmc_mask(doc: &Value) -> Result<Option<SubnetMask>, SchemaViolation> {
    let Some((value, path)) = descend(doc, "", &["bmc", "lan", "subnet_mask"])? else {
        return Ok(None);
    };
    if is_unset(value) {
        return Ok(None);
    }
    let raw = value.as_str().ok_or(SchemaViolation::WrongType {
        path: path.clone(),
        expected: "string",
    })?;
    parse_mask(raw, &path).map(Some)
}

fn parse_mask(raw: &str, path: &str) -> Result<SubnetMask, SchemaViolation> {
    raw.parse().map_err(|error| SchemaViolation::BadAddress {
        path: path.to_string(),
        error,
    })
}
