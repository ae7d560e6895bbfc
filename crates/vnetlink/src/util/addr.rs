//! IPv4 prefix helpers.

use std::net::Ipv4Addr;

use crate::netlink::{Error, Result};

/// Netmask for a prefix length. Lengths above 32 are rejected.
pub fn ipv4_mask(prefix_len: u8) -> Result<u32> {
    match prefix_len {
        0 => Ok(0),
        1..=32 => Ok(!0u32 << (32 - prefix_len)),
        _ => Err(Error::InvalidPrefixLength(prefix_len)),
    }
}

/// Check that `addr` has no bits set outside its `prefix_len` leading bits.
pub fn ipv4_is_network(addr: Ipv4Addr, prefix_len: u8) -> Result<bool> {
    let mask = ipv4_mask(prefix_len)?;
    Ok(u32::from(addr) & !mask == 0)
}
