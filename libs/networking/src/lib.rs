//! Networking utilities for mock compute nodes.
//!
//! This library provides helpers for:
//! - Parsing the mock OUI prefix shared by all nodes of one mock host
//! - Deriving deterministic MAC addresses from (OUI, node index, NIC sequence)
//!
//! ## MAC layout
//!
//! ```text
//! aa:bb:cc : ii:ii : ss
//! \______/   \___/   \/
//!   OUI      index   NIC sequence
//! ```
//!
//! The node index is written big-endian as two octets, so every NIC of a
//! node shares octets 3–4 and differs only in the last octet.

use std::str::FromStr;

use thiserror::Error;

/// Networking errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The OUI prefix is not three colon-separated hex octets.
    #[error("invalid OUI: {0}")]
    InvalidOui(String),

    /// Invalid MAC address.
    #[error("invalid MAC address: {0}")]
    InvalidMac(String),

    /// The node index does not fit in the two index octets.
    #[error("node index {0} exceeds {max}", max = u16::MAX)]
    IndexOutOfRange(u32),

    /// More NICs than the sequence octet can number.
    #[error("NIC sequence space exhausted for node index {0}")]
    SequenceExhausted(u16),
}

// ============================================================================
// OUI
// ============================================================================

/// Organizationally unique identifier used as the MAC prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MockOui([u8; 3]);

impl MockOui {
    /// Create from raw octets.
    pub const fn new(octets: [u8; 3]) -> Self {
        Self(octets)
    }

    /// Parse from `aa:bb:cc` notation (hex digits in either case).
    pub fn parse(s: &str) -> Result<Self, NetworkError> {
        let octets = parse_octets::<3>(s.trim())
            .ok_or_else(|| NetworkError::InvalidOui(s.to_string()))?;
        Ok(Self(octets))
    }

    /// Get the raw octets.
    pub fn octets(&self) -> [u8; 3] {
        self.0
    }
}

impl FromStr for MockOui {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for MockOui {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02x}:{:02x}:{:02x}", self.0[0], self.0[1], self.0[2])
    }
}

// ============================================================================
// MAC Address
// ============================================================================

/// A 48-bit MAC address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Derive the MAC for NIC number `seq` of the node with `node_index`.
    pub fn for_nic(oui: MockOui, node_index: u32, seq: u8) -> Result<Self, NetworkError> {
        let index =
            u16::try_from(node_index).map_err(|_| NetworkError::IndexOutOfRange(node_index))?;
        let [o0, o1, o2] = oui.octets();
        let [hi, lo] = index.to_be_bytes();
        Ok(Self([o0, o1, o2, hi, lo, seq]))
    }

    /// Get the raw octets.
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// The OUI portion.
    pub fn oui(&self) -> MockOui {
        MockOui([self.0[0], self.0[1], self.0[2]])
    }

    /// The node index encoded in octets 3–4.
    pub fn node_index(&self) -> u16 {
        u16::from_be_bytes([self.0[3], self.0[4]])
    }

    /// The NIC sequence number in the last octet.
    pub fn sequence(&self) -> u8 {
        self.0[5]
    }
}

impl FromStr for MacAddress {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_octets::<6>(s)
            .map(Self)
            .ok_or_else(|| NetworkError::InvalidMac(s.to_string()))
    }
}

impl std::fmt::Display for MacAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let o = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            o[0], o[1], o[2], o[3], o[4], o[5]
        )
    }
}

/// Parse exactly `N` colon-separated two-digit hex octets.
fn parse_octets<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut out = [0u8; N];
    let mut parts = s.split(':');
    for slot in out.iter_mut() {
        let part = parts.next()?;
        if part.len() != 2 {
            return None;
        }
        *slot = u8::from_str_radix(part, 16).ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(out)
}

// ============================================================================
// Per-node MAC allocation
// ============================================================================

/// Sequential MAC allocator for the NICs of one node.
#[derive(Debug)]
pub struct NicMacAllocator {
    /// Shared OUI prefix.
    oui: MockOui,

    /// Node index placed in octets 3–4.
    node_index: u16,

    /// Next sequence number; `None` once 0xff has been handed out.
    next_seq: Option<u8>,
}

impl NicMacAllocator {
    /// Create an allocator starting at sequence 0.
    pub fn new(oui: MockOui, node_index: u32) -> Result<Self, NetworkError> {
        let node_index =
            u16::try_from(node_index).map_err(|_| NetworkError::IndexOutOfRange(node_index))?;
        Ok(Self {
            oui,
            node_index,
            next_seq: Some(0),
        })
    }

    /// Allocate the next MAC address.
    pub fn allocate(&mut self) -> Result<MacAddress, NetworkError> {
        let seq = self
            .next_seq
            .ok_or(NetworkError::SequenceExhausted(self.node_index))?;
        self.next_seq = seq.checked_add(1);
        MacAddress::for_nic(self.oui, u32::from(self.node_index), seq)
    }

    /// Get the node index being allocated for.
    pub fn node_index(&self) -> u16 {
        self.node_index
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_oui_parse() {
        let oui = MockOui::parse("90:B8:D0").unwrap();
        assert_eq!(oui.octets(), [0x90, 0xb8, 0xd0]);
        assert_eq!(oui.to_string(), "90:b8:d0");

        // Metadata output may carry a trailing newline.
        assert!(MockOui::parse("90:b8:d0\n").is_ok());

        assert!(MockOui::parse("90:b8").is_err());
        assert!(MockOui::parse("90:b8:d0:00").is_err());
        assert!(MockOui::parse("90:b8:zz").is_err());
        assert!(MockOui::parse("9:b8:d0").is_err());
    }

    #[test]
    fn test_mac_layout() {
        let oui = MockOui::new([0x90, 0xb8, 0xd0]);
        let mac = MacAddress::for_nic(oui, 0x0102, 3).unwrap();
        assert_eq!(mac.to_string(), "90:b8:d0:01:02:03");
        assert_eq!(mac.oui(), oui);
        assert_eq!(mac.node_index(), 0x0102);
        assert_eq!(mac.sequence(), 3);
    }

    #[test]
    fn test_mac_index_zero_padded() {
        let oui = MockOui::new([0x90, 0xb8, 0xd0]);
        let mac = MacAddress::for_nic(oui, 7, 0).unwrap();
        assert_eq!(mac.to_string(), "90:b8:d0:00:07:00");
    }

    #[test]
    fn test_mac_index_out_of_range() {
        let oui = MockOui::new([0, 0, 0]);
        assert_eq!(
            MacAddress::for_nic(oui, 0x1_0000, 0),
            Err(NetworkError::IndexOutOfRange(0x1_0000))
        );
    }

    #[test]
    fn test_mac_parse() {
        let mac: MacAddress = "90:b8:d0:00:2a:01".parse().unwrap();
        assert_eq!(mac.node_index(), 42);
        assert!("90:b8:d0:00:2a".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_allocator_unique_same_index() {
        let oui = MockOui::new([0x90, 0xb8, 0xd0]);
        let mut allocator = NicMacAllocator::new(oui, 5).unwrap();

        let macs: Vec<_> = (0..4).map(|_| allocator.allocate().unwrap()).collect();
        let unique: HashSet<_> = macs.iter().collect();

        assert_eq!(unique.len(), 4);
        assert!(macs.iter().all(|m| m.node_index() == 5));
        assert_eq!(macs[0].sequence(), 0);
        assert_eq!(macs[3].sequence(), 3);
    }

    #[test]
    fn test_allocator_exhaustion() {
        let oui = MockOui::new([0, 0, 0]);
        let mut allocator = NicMacAllocator::new(oui, 1).unwrap();
        for _ in 0..=u8::MAX {
            allocator.allocate().unwrap();
        }
        assert_eq!(
            allocator.allocate(),
            Err(NetworkError::SequenceExhausted(1))
        );
    }
}
