//! Link message types.

use crate::netlink::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Interface info message (struct ifinfomsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct IfInfoMsg {
    /// Address family.
    pub ifi_family: u8,
    /// Padding.
    pub ifi_pad: u8,
    /// Device type (ARPHRD_*).
    pub ifi_type: u16,
    /// Interface index.
    pub ifi_index: i32,
    /// Device flags (IFF_*).
    pub ifi_flags: u32,
    /// Change mask for `ifi_flags`.
    pub ifi_change: u32,
}

impl IfInfoMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a new interface info message.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interface index.
    pub fn with_index(mut self, index: i32) -> Self {
        self.ifi_index = index;
        self
    }

    /// Set flags and the mask of flags the kernel should change.
    pub fn with_flags(mut self, flags: u32, change: u32) -> Self {
        self.ifi_flags = flags;
        self.ifi_change = change;
        self
    }

    /// Parse from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from_prefix(data)
            .map(|(r, _)| r)
            .map_err(|_| Error::Truncated {
                expected: Self::SIZE,
                actual: data.len(),
            })
    }
}

/// Interface is administratively up.
pub const IFF_UP: u32 = 0x1;

/// Link attributes (IFLA_*).
pub mod ifla {
    pub const IFNAME: u16 = 3;
    pub const MTU: u16 = 4;
    pub const LINKINFO: u16 = 18;
    pub const NET_NS_FD: u16 = 28;
}

/// Nested IFLA_LINKINFO attributes.
pub mod ifla_info {
    pub const KIND: u16 = 1;
    pub const DATA: u16 = 2;
}

/// Nested IFLA_INFO_DATA attributes for veth.
pub mod veth {
    /// Peer description: an `ifinfomsg` followed by IFLA_* attributes.
    pub const INFO_PEER: u16 = 1;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size() {
        assert_eq!(IfInfoMsg::SIZE, 16);
    }

    #[test]
    fn test_with_flags() {
        let msg = IfInfoMsg::new().with_index(4).with_flags(0, IFF_UP);
        assert_eq!(msg.ifi_index, 4);
        assert_eq!(msg.ifi_flags, 0);
        assert_eq!(msg.ifi_change, IFF_UP);
        let parsed = IfInfoMsg::from_bytes(msg.as_bytes()).unwrap();
        assert_eq!(parsed.ifi_change, 1);
    }
}
