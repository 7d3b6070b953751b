//! Error types for the inventory pipeline.
//!
//! Extraction faults are recovered per record and collected as [`Fault`]s;
//! query misses are reported as [`NotFound`] so callers can tell an unknown
//! subnet apart from one with no free addresses.

use std::fmt;
use std::net::Ipv4Addr;
use std::path::PathBuf;

use crate::models::SubnetMask;

/// A dotted-decimal address or mask that does not parse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("'{input}' has {count} octets, expected 4")]
    WrongOctetCount { input: String, count: usize },
    #[error("'{input}': octet '{octet}' is not numeric")]
    NonNumeric { input: String, octet: String },
    #[error("'{input}': octet {octet} is out of range 0-255")]
    OutOfRange { input: String, octet: u64 },
    #[error("'{input}': prefix length must be 0-32")]
    BadPrefix { input: String },
}

/// What was wrong with a document that otherwise parsed as YAML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// A value at `path` had the wrong shape.
    WrongType {
        path: String,
        expected: &'static str,
    },
    /// A `KEY=value` fragment without the `=`.
    BadFragment { path: String, entry: String },
    /// An address or mask field that does not parse.
    BadAddress { path: String, error: FormatError },
    /// None of the known dialect markers are present.
    NoDialect,
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaViolation::WrongType { path, expected } => {
                write!(f, "{path}: expected {expected}")
            }
            SchemaViolation::BadFragment { path, entry } => {
                write!(f, "{path}: '{entry}' is not KEY=value")
            }
            SchemaViolation::BadAddress { path, error } => write!(f, "{path}: {error}"),
            SchemaViolation::NoDialect => write!(f, "no known dialect matched"),
        }
    }
}

/// A host or site document that does not fit any extraction dialect.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_name}: {violation}")]
pub struct SchemaError {
    pub source_name: String,
    pub violation: SchemaViolation,
}

impl SchemaError {
    pub fn new(source_name: &str, violation: SchemaViolation) -> SchemaError {
        SchemaError {
            source_name: source_name.to_string(),
            violation,
        }
    }
}

/// A query against the usage table that has no answer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotFound {
    #[error("no subnet {network} with mask {mask} in the table")]
    Subnet { mask: SubnetMask, network: Ipv4Addr },
    #[error("subnet {network} with mask {mask} has no unused address")]
    NoFreeAddress { mask: SubnetMask, network: Ipv4Addr },
}

#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("mask {mask} (/{}) is shorter than the minimum /{min}", .mask.prefix_len())]
    DegenerateMask { mask: SubnetMask, min: u8 },
    #[error("mask {mask} is not a contiguous prefix")]
    NonContiguousMask { mask: SubnetMask },
    #[error("{} repeats an already loaded name", .path.display())]
    DuplicateName { path: PathBuf },
    #[error("reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("config: {0}")]
    Config(String),
}

/// One entry of the batch-level fault list.
#[derive(Debug)]
pub struct Fault {
    /// Host or site name (file stem).
    pub name: String,
    pub error: InventoryError,
}

impl Fault {
    pub fn new(name: &str, error: impl Into<InventoryError>) -> Fault {
        Fault {
            name: name.to_string(),
            error: error.into(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_error_names_source() {
        let err = SchemaError::new(
            "node42",
            SchemaViolation::WrongType {
                path: "bmc.lan".to_string(),
                expected: "mapping",
            },
        );
        assert_eq!(err.to_string(), "node42: bmc.lan: expected mapping");
    }

    #[test]
    fn test_fault_display() {
        let fault = Fault::new(
            "node7",
            FormatError::WrongOctetCount {
                input: "10.0.0".to_string(),
                count: 3,
            },
        );
        assert_eq!(
            fault.to_string(),
            "node7: '10.0.0' has 3 octets, expected 4"
        );
    }

    #[test]
    fn test_mask_faults_display() {
        let mask: SubnetMask = "255.255.0.255".parse().unwrap();
        let fault = Fault::new("wid", InventoryError::NonContiguousMask { mask });
        assert_eq!(
            fault.to_string(),
            "wid: mask 255.255.0.255 is not a contiguous prefix"
        );

        let fault = Fault::new(
            "wid",
            InventoryError::DuplicateName {
                path: PathBuf::from("site/wid.old.yaml"),
            },
        );
        assert_eq!(
            fault.to_string(),
            "wid: site/wid.old.yaml repeats an already loaded name"
        );
    }
}
