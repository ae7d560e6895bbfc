//! Route message types.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Routing message (struct rtmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct RtMsg {
    /// Address family.
    pub rtm_family: u8,
    /// Destination prefix length.
    pub rtm_dst_len: u8,
    /// Source prefix length.
    pub rtm_src_len: u8,
    /// TOS filter.
    pub rtm_tos: u8,
    /// Routing table id (RT_TABLE_*).
    pub rtm_table: u8,
    /// Routing protocol (RTPROT_*).
    pub rtm_protocol: u8,
    /// Distance to destination (RT_SCOPE_*).
    pub rtm_scope: u8,
    /// Route type (RTN_*).
    pub rtm_type: u8,
    /// Route flags (RTM_F_*).
    pub rtm_flags: u32,
}

impl RtMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// Route attributes (RTA_*).
pub mod rta {
    pub const DST: u16 = 1;
    pub const OIF: u16 = 4;
    pub const GATEWAY: u16 = 5;
}

/// Main routing table.
pub const RT_TABLE_MAIN: u8 = 254;
/// Route installed during boot (what `ip route add` uses).
pub const RTPROT_BOOT: u8 = 3;
/// Global route, reached through a gateway.
pub const RT_SCOPE_UNIVERSE: u8 = 0;
/// Destination is directly attached to the link.
pub const RT_SCOPE_LINK: u8 = 253;
/// Gateway or direct route.
pub const RTN_UNICAST: u8 = 1;
