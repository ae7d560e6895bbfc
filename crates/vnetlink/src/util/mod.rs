//! Shared utilities for vnetlink.

pub mod addr;
pub mod ifname;
pub mod rate;

pub use addr::{ipv4_is_network, ipv4_mask};
