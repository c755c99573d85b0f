//! Chain identification and the network-name table.
//!
//! The x402 V1 wire format identifies blockchains by human-readable network
//! name (e.g., `"base-sepolia"`), while operators configure the gate with a
//! numeric EIP-155 chain ID (e.g., `84532`). This module maps between the
//! two.
//!
//! A [`NetworkTable`] is built once at startup and passed by reference into
//! the gate constructor. It is deliberately not a process global, so
//! multiple gates with different (or extended) tables can coexist.

use std::collections::HashMap;

/// A known network definition with its chain ID and wire-format name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkInfo {
    /// Numeric EIP-155 chain ID (e.g., `84532` for Base Sepolia)
    pub chain_id: u64,
    /// Wire-format network name (e.g., `"base-sepolia"`)
    pub name: &'static str,
}

/// Chains supported out of the box.
pub const KNOWN_NETWORKS: &[NetworkInfo] = &[
    NetworkInfo { chain_id: 1, name: "ethereum" },
    NetworkInfo { chain_id: 11_155_111, name: "sepolia" },
    NetworkInfo { chain_id: 8453, name: "base" },
    NetworkInfo { chain_id: 84_532, name: "base-sepolia" },
    NetworkInfo { chain_id: 10, name: "optimism" },
    NetworkInfo { chain_id: 11_155_420, name: "optimism-sepolia" },
    NetworkInfo { chain_id: 42_161, name: "arbitrum" },
    NetworkInfo { chain_id: 421_614, name: "arbitrum-sepolia" },
    NetworkInfo { chain_id: 137, name: "polygon" },
    NetworkInfo { chain_id: 80_002, name: "polygon-amoy" },
    NetworkInfo { chain_id: 43_114, name: "avalanche" },
    NetworkInfo { chain_id: 43_113, name: "avalanche-fuji" },
    NetworkInfo { chain_id: 59_144, name: "linea" },
    NetworkInfo { chain_id: 59_141, name: "linea-sepolia" },
    NetworkInfo { chain_id: 324, name: "zksync" },
    NetworkInfo { chain_id: 300, name: "zksync-sepolia" },
];

/// Table that maps numeric chain IDs to wire-format network names.
///
/// Built from one or more `&[NetworkInfo]` slices. Every chain ID an
/// operator configures a gate with must resolve here; an absent entry is a
/// construction-time configuration error, never a per-request one.
///
/// # Example
///
/// ```
/// use signpay::networks::{NetworkInfo, NetworkTable};
///
/// let table = NetworkTable::known()
///     .with_networks(&[NetworkInfo { chain_id: 31_337, name: "anvil" }]);
///
/// assert_eq!(table.name_by_chain_id(84_532), Some("base-sepolia"));
/// assert_eq!(table.name_by_chain_id(31_337), Some("anvil"));
/// ```
#[derive(Debug, Clone)]
pub struct NetworkTable {
    by_chain_id: HashMap<u64, &'static str>,
}

impl NetworkTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            by_chain_id: HashMap::new(),
        }
    }

    /// Creates a table pre-populated with [`KNOWN_NETWORKS`].
    #[must_use]
    pub fn known() -> Self {
        Self::from_networks(KNOWN_NETWORKS)
    }

    /// Creates a table from a network info slice.
    #[must_use]
    pub fn from_networks(networks: &[NetworkInfo]) -> Self {
        let mut table = Self {
            by_chain_id: HashMap::with_capacity(networks.len()),
        };
        table.register(networks);
        table
    }

    /// Registers additional networks into this table.
    pub fn register(&mut self, networks: &[NetworkInfo]) {
        for info in networks {
            self.by_chain_id.insert(info.chain_id, info.name);
        }
    }

    /// Builder-style method: registers additional networks and returns `self`.
    #[must_use]
    pub fn with_networks(mut self, networks: &[NetworkInfo]) -> Self {
        self.register(networks);
        self
    }

    /// Looks up the wire-format network name for a chain ID.
    #[must_use]
    pub fn name_by_chain_id(&self, chain_id: u64) -> Option<&'static str> {
        self.by_chain_id.get(&chain_id).copied()
    }

    /// Returns the number of registered networks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_chain_id.len()
    }

    /// Returns `true` if no networks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_chain_id.is_empty()
    }
}

impl Default for NetworkTable {
    fn default() -> Self {
        Self::known()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_table_resolves_every_documented_chain() {
        let table = NetworkTable::known();
        for info in KNOWN_NETWORKS {
            assert_eq!(table.name_by_chain_id(info.chain_id), Some(info.name));
        }
        assert_eq!(table.len(), KNOWN_NETWORKS.len());
    }

    #[test]
    fn unknown_chain_is_absent() {
        let table = NetworkTable::known();
        assert_eq!(table.name_by_chain_id(999_999), None);
    }

    #[test]
    fn custom_networks_extend_the_known_set() {
        let table = NetworkTable::known().with_networks(&[NetworkInfo {
            chain_id: 31_337,
            name: "anvil",
        }]);
        assert_eq!(table.name_by_chain_id(31_337), Some("anvil"));
        assert_eq!(table.name_by_chain_id(8453), Some("base"));
    }

    #[test]
    fn empty_table_has_no_entries() {
        let table = NetworkTable::new();
        assert!(table.is_empty());
        assert_eq!(table.name_by_chain_id(1), None);
    }
}
