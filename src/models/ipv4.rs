//! IPv4 address and subnet mask arithmetic.
//!
//! Addresses arrive as dotted-decimal strings scraped from host documents and
//! are validated once into [`Ipv4Addr`]. Masks are kept as [`SubnetMask`] and
//! operated on as 32-bit values.

use serde::de;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::FormatError;

/// Maximum length for an IPv4 subnet mask (32 bits).
pub const MAX_LENGTH: u8 = 32;

/// Parse a dotted-decimal address, requiring exactly 4 octets in `0..=255`.
pub fn parse_addr(input: &str) -> Result<Ipv4Addr, FormatError> {
    let trimmed = input.trim();
    let parts: Vec<&str> = trimmed.split('.').collect();
    if parts.len() != 4 {
        return Err(FormatError::WrongOctetCount {
            input: trimmed.to_string(),
            count: parts.len(),
        });
    }

    let mut octets = [0u8; 4];
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FormatError::NonNumeric {
                input: trimmed.to_string(),
                octet: part.to_string(),
            });
        }
        let value: u64 = part.parse().map_err(|_| FormatError::NonNumeric {
            input: trimmed.to_string(),
            octet: part.to_string(),
        })?;
        octets[i] = u8::try_from(value).map_err(|_| FormatError::OutOfRange {
            input: trimmed.to_string(),
            octet: value,
        })?;
    }
    Ok(Ipv4Addr::from(octets))
}

/// Convert a CIDR prefix length to a subnet mask as u32.
///
/// # Examples
/// ```
/// use subnet_inventory::models::get_cidr_mask;
/// assert_eq!(get_cidr_mask(24), Some(0xFFFFFF00));
/// assert_eq!(get_cidr_mask(33), None);
/// ```
pub fn get_cidr_mask(len: u8) -> Option<u32> {
    if len > MAX_LENGTH {
        None
    } else {
        let right_len = MAX_LENGTH - len;
        let all_bits = u32::MAX as u64;

        let mask = (all_bits >> right_len) << right_len;

        Some(mask as u32)
    }
}

/// Get the network address for a given IP and prefix length.
pub fn cut_addr(addr: Ipv4Addr, len: u8) -> Option<Ipv4Addr> {
    get_cidr_mask(len).map(|mask| Ipv4Addr::from(u32::from(addr) & mask))
}

/// Calculate the broadcast address for a given IP and prefix length.
pub fn broadcast_addr(addr: Ipv4Addr, len: u8) -> Option<Ipv4Addr> {
    get_cidr_mask(len).map(|mask| Ipv4Addr::from((u32::from(addr) & mask) | !mask))
}

/// Number of 1-bits across all 32 bits of `mask`.
///
/// Equals the prefix length for contiguous masks. Non-contiguous masks give a
/// count that has no CIDR meaning; see [`SubnetMask::is_contiguous`].
pub fn count_set_bits(mask: Ipv4Addr) -> u8 {
    u32::from(mask).count_ones() as u8
}

/// Split `addr` into its (network, host) portions under `mask`.
pub fn split_addr(addr: Ipv4Addr, mask: SubnetMask) -> (Ipv4Addr, Ipv4Addr) {
    let bits = u32::from(addr);
    let mask_bits = mask.bits();
    (
        Ipv4Addr::from(bits & mask_bits),
        Ipv4Addr::from(bits & !mask_bits),
    )
}

/// Dotted-decimal form of [`split_addr`]: validates both inputs first.
pub fn apply_mask(addr: &str, mask: &str) -> Result<(Ipv4Addr, Ipv4Addr), FormatError> {
    let addr = parse_addr(addr)?;
    let mask: SubnetMask = mask.parse()?;
    Ok(split_addr(addr, mask))
}

/// Every address sharing the high `prefix_bits` bits of `addr`, ascending.
///
/// The range holds no shared state: calling this again yields a fresh
/// sequence. A prefix of 0 walks all 2^32 addresses, so callers reject
/// degenerate masks before enumerating.
pub fn enumerate_addresses(addr: Ipv4Addr, prefix_bits: u8) -> AddressRange {
    assert!(
        prefix_bits <= MAX_LENGTH,
        "prefix_bits[{prefix_bits}] > 32 should never happen."
    );
    let host_bits = u32::from(MAX_LENGTH - prefix_bits);
    let start = (u64::from(u32::from(addr)) >> host_bits) << host_bits;
    AddressRange {
        next: start,
        end: start + (1u64 << host_bits),
    }
}

/// Lazy ascending walk over a block of addresses. O(1) memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    next: u64,
    end: u64,
}

impl AddressRange {
    /// Addresses not yet yielded.
    pub fn remaining(&self) -> u64 {
        self.end - self.next
    }
}

impl Iterator for AddressRange {
    type Item = Ipv4Addr;

    fn next(&mut self) -> Option<Ipv4Addr> {
        if self.next >= self.end {
            return None;
        }
        let addr = Ipv4Addr::from(self.next as u32);
        self.next += 1;
        Some(addr)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match usize::try_from(self.remaining()) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

/// A subnet mask such as `255.255.255.0`.
///
/// Stored as the mask address itself, not the prefix length, so that a
/// non-contiguous mask read from a site document is kept as written.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubnetMask(Ipv4Addr);

impl SubnetMask {
    pub fn from_prefix(len: u8) -> Option<SubnetMask> {
        get_cidr_mask(len).map(|bits| SubnetMask(Ipv4Addr::from(bits)))
    }

    pub fn bits(&self) -> u32 {
        u32::from(self.0)
    }

    /// Prefix length, counted as set bits.
    pub fn prefix_len(&self) -> u8 {
        count_set_bits(self.0)
    }

    /// True when the 1-bits form one run from the top.
    pub fn is_contiguous(&self) -> bool {
        let bits = self.bits();
        bits.leading_ones() + bits.trailing_zeros() == u32::from(MAX_LENGTH)
    }
}

impl FromStr for SubnetMask {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<SubnetMask, FormatError> {
        parse_addr(s).map(SubnetMask)
    }
}

impl fmt::Display for SubnetMask {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for SubnetMask {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SubnetMask {
    fn deserialize<D>(deserializer: D) -> Result<SubnetMask, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// IPv4 address with CIDR notation support.
#[derive(Eq, Ord, Debug, Copy, Clone, Hash)]
pub struct Ipv4 {
    /// The IPv4 address.
    pub addr: Ipv4Addr,
    /// The subnet mask length (0-32).
    pub mask: u8,
}

impl Serialize for Ipv4 {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        let cidr = format!("{}/{}", self.addr, self.mask);
        serializer.serialize_str(&cidr)
    }
}

impl Ipv4 {
    /// Create a new [`Ipv4`] from a CIDR string (e.g., "10.0.0.0/24").
    pub fn new(addr_cidr: &str) -> Result<Ipv4, FormatError> {
        let addr_cidr = addr_cidr.trim();
        let (addr, mask) = addr_cidr.split_once('/').ok_or(FormatError::BadPrefix {
            input: addr_cidr.to_string(),
        })?;
        let addr = parse_addr(addr)?;
        let mask: u8 = mask
            .parse()
            .ok()
            .filter(|len| *len <= MAX_LENGTH)
            .ok_or(FormatError::BadPrefix {
                input: addr_cidr.to_string(),
            })?;
        Ok(Ipv4 { addr, mask })
    }

    /// The network covering `addr` under `mask`.
    pub fn from_mask(addr: Ipv4Addr, mask: SubnetMask) -> Ipv4 {
        let (network, _) = split_addr(addr, mask);
        Ipv4 {
            addr: network,
            mask: mask.prefix_len(),
        }
    }

    /// Get the highest (broadcast) address in the subnet.
    pub fn hi(&self) -> Ipv4Addr {
        broadcast_addr(self.addr, self.mask).unwrap_or(self.addr)
    }

    /// Get the lowest (network) address in the subnet.
    pub fn lo(&self) -> Ipv4Addr {
        cut_addr(self.addr, self.mask).unwrap_or(self.addr)
    }

    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        self.lo() <= ip && ip <= self.hi()
    }
}

impl std::fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.mask)
    }
}

impl PartialEq for Ipv4 {
    fn eq(&self, other: &Ipv4) -> bool {
        self.addr == other.addr && self.mask == other.mask
    }
}

impl PartialOrd for Ipv4 {
    fn partial_cmp(&self, other: &Ipv4) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
