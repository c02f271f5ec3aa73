//! Anchor identities and their short addresses

use core::fmt;

/// Short address of the network side of every exchange, as it appears on air
pub const NETWORK_ADDRESS: [u8; 2] = *b"WA";

/// One of the three fixed anchors of the deployment.
///
/// Each anchor owns a distinct short address. A poll for an anchor carries
/// `NETWORK_ADDRESS` as destination and the anchor's address as source; the
/// response swaps the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnchorId {
    A1,
    A2,
    A3,
}

impl AnchorId {
    /// All anchors in round-robin order
    pub const ALL: [AnchorId; 3] = [AnchorId::A1, AnchorId::A2, AnchorId::A3];

    /// Number of anchors in the deployment
    pub const COUNT: usize = 3;

    /// Position of this anchor in `ALL`, used to index per-anchor state
    pub const fn index(self) -> usize {
        match self {
            AnchorId::A1 => 0,
            AnchorId::A2 => 1,
            AnchorId::A3 => 2,
        }
    }

    /// Try to convert an index back to an anchor
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Next anchor in the cycle, wrapping A3 back to A1
    pub const fn next(self) -> Self {
        match self {
            AnchorId::A1 => AnchorId::A2,
            AnchorId::A2 => AnchorId::A3,
            AnchorId::A3 => AnchorId::A1,
        }
    }

    /// Short address bytes in on-air order
    pub const fn address(self) -> [u8; 2] {
        match self {
            AnchorId::A1 => *b"VE",
            AnchorId::A2 => *b"DM",
            AnchorId::A3 => *b"DH",
        }
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnchorId::A1 => f.write_str("A1"),
            AnchorId::A2 => f.write_str("A2"),
            AnchorId::A3 => f.write_str("A3"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps() {
        assert_eq!(AnchorId::A1.next(), AnchorId::A2);
        assert_eq!(AnchorId::A2.next(), AnchorId::A3);
        assert_eq!(AnchorId::A3.next(), AnchorId::A1);
    }

    #[test]
    fn test_index_round_trip() {
        for anchor in AnchorId::ALL {
            assert_eq!(AnchorId::from_index(anchor.index()), Some(anchor));
        }
        assert_eq!(AnchorId::from_index(3), None);
    }

    #[test]
    fn test_addresses_are_distinct() {
        let addresses = AnchorId::ALL.map(|a| a.address());
        assert_ne!(addresses[0], addresses[1]);
        assert_ne!(addresses[1], addresses[2]);
        assert_ne!(addresses[0], addresses[2]);
        for address in addresses {
            assert_ne!(address, NETWORK_ADDRESS);
        }
    }
}
