//! Traffic control message types.
//!
//! Only the structures needed for the netem/tbf shaping chain are defined.

use crate::netlink::error::{Error, Result};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Traffic control message (struct tcmsg).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct TcMsg {
    /// Address family (AF_UNSPEC).
    pub tcm_family: u8,
    /// Padding.
    pub tcm_pad1: u8,
    /// Padding.
    pub tcm_pad2: u16,
    /// Interface index.
    pub tcm_ifindex: i32,
    /// Qdisc handle.
    pub tcm_handle: u32,
    /// Parent handle.
    pub tcm_parent: u32,
    /// Info (unused for qdiscs).
    pub tcm_info: u32,
}

impl TcMsg {
    /// Size of this structure.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Create a new tcmsg.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interface index.
    pub fn with_ifindex(mut self, ifindex: i32) -> Self {
        self.tcm_ifindex = ifindex;
        self
    }

    /// Set the handle.
    pub fn with_handle(mut self, handle: u32) -> Self {
        self.tcm_handle = handle;
        self
    }

    /// Set the parent.
    pub fn with_parent(mut self, parent: u32) -> Self {
        self.tcm_parent = parent;
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

/// TC attributes (TCA_*).
pub mod tca {
    pub const KIND: u16 = 1;
    pub const OPTIONS: u16 = 2;
}

/// Root of the egress hierarchy.
pub const TC_H_ROOT: u32 = 0xFFFF_FFFF;

/// Build a handle from major and minor numbers (`major:minor`).
pub const fn tc_handle(major: u16, minor: u16) -> u32 {
    ((major as u32) << 16) | minor as u32
}

/// Major part of a handle.
pub const fn tc_major(handle: u32) -> u16 {
    (handle >> 16) as u16
}

/// Minor part of a handle.
pub const fn tc_minor(handle: u32) -> u16 {
    (handle & 0xFFFF) as u16
}

/// Rate specification (struct tc_ratespec).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct TcRateSpec {
    pub cell_log: u8,
    pub linklayer: u8,
    pub overhead: u16,
    pub cell_align: i16,
    pub mpu: u16,
    pub rate: u32,
}

/// Link layer for rate tables computed by the kernel.
pub const TC_LINKLAYER_ETHERNET: u8 = 1;

impl TcRateSpec {
    /// Ethernet rate spec for a byte rate, saturated to `u32`.
    pub fn ethernet(bytes_per_sec: u64) -> Self {
        Self {
            linklayer: TC_LINKLAYER_ETHERNET,
            rate: bytes_per_sec.min(u32::MAX as u64) as u32,
            ..Default::default()
        }
    }
}

/// Scheduler clock granularity: one psched tick is 64 ns.
pub const PSCHED_SHIFT: u32 = 6;

/// Convert nanoseconds to psched ticks, saturated to `u32`.
pub fn ns_to_ticks(ns: u64) -> u32 {
    (ns >> PSCHED_SHIFT).min(u32::MAX as u64) as u32
}

pub mod netem {
    use super::*;

    /// Netem base options (struct tc_netem_qopt).
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
    pub struct TcNetemQopt {
        /// Added delay in psched ticks.
        pub latency: u32,
        /// Queue limit in packets.
        pub limit: u32,
        /// Random loss probability (0 = none, u32::MAX = 100%).
        pub loss: u32,
        /// Re-ordering gap.
        pub gap: u32,
        /// Random duplication probability.
        pub duplicate: u32,
        /// Random jitter in psched ticks.
        pub jitter: u32,
    }

    /// `tc`'s default netem queue limit in packets.
    pub const DEFAULT_LIMIT: u32 = 1000;

    pub const TCA_NETEM_LATENCY64: u16 = 10;
    pub const TCA_NETEM_JITTER64: u16 = 11;

    /// Convert a probability in `0.0..=1.0` to the kernel's fixed-point form.
    pub fn prob_to_u32(p: f64) -> u32 {
        (p.clamp(0.0, 1.0) * u32::MAX as f64).round() as u32
    }
}

pub mod tbf {
    use super::*;

    /// Token bucket options (struct tc_tbf_qopt).
    #[repr(C)]
    #[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
    pub struct TcTbfQopt {
        pub rate: TcRateSpec,
        pub peakrate: TcRateSpec,
        /// Queue limit in bytes.
        pub limit: u32,
        /// Bucket size in psched ticks.
        pub buffer: u32,
        pub mtu: u32,
    }

    pub const TCA_TBF_PARMS: u16 = 1;
    pub const TCA_TBF_RATE64: u16 = 4;
    pub const TCA_TBF_BURST: u16 = 6;
}
