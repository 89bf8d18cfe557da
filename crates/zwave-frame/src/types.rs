//! Common data types used in the protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One-byte network address of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u8);

impl NodeId {
    /// Returns the raw address byte.
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for NodeId {
    fn from(id: u8) -> Self {
        NodeId(id)
    }
}

/// Protocol information the network layer learns when a node joins.
///
/// This is everything a node needs to exist before its capabilities are
/// discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeProtocolInfo {
    /// Basic device class.
    pub basic_device_class: u8,
    /// Generic device class.
    pub generic_device_class: u8,
    /// Specific device class.
    pub specific_device_class: u8,
    /// Whether the node is always powered and reachable.
    pub listening: bool,
}

impl NodeProtocolInfo {
    /// Create protocol info for a node.
    pub fn new(basic: u8, generic: u8, specific: u8, listening: bool) -> Self {
        NodeProtocolInfo {
            basic_device_class: basic,
            generic_device_class: generic,
            specific_device_class: specific,
            listening,
        }
    }
}

/// Contents of a node information frame.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeInfo {
    /// Basic device class.
    pub basic_device_class: u8,
    /// Generic device class.
    pub generic_device_class: u8,
    /// Specific device class.
    pub specific_device_class: u8,
    /// Command class ids the node reports as supported.
    pub command_classes: Vec<u8>,
}

/// Formats a byte the way diagnostics print ids: `0x86`.
pub fn hex_byte(b: u8) -> String {
    format!("0x{:02X}", b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_display() {
        assert_eq!(NodeId(7).to_string(), "7");
        assert_eq!(NodeId::from(200).as_u8(), 200);
    }

    #[test]
    fn test_hex_byte() {
        assert_eq!(hex_byte(0x86), "0x86");
        assert_eq!(hex_byte(0x05), "0x05");
    }
}
