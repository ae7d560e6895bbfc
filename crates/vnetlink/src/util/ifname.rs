//! Interface name validation.

use crate::netlink::{Error, Result};

/// Maximum interface name length (including null terminator).
pub const IFNAMSIZ: usize = 16;

fn invalid(name: &str, reason: &'static str) -> Error {
    Error::InvalidName {
        name: name.to_string(),
        reason,
    }
}

/// Validate an interface name.
pub fn validate(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(invalid(name, "empty name"));
    }

    if name.len() >= IFNAMSIZ {
        return Err(invalid(name, "name too long (max 15 bytes)"));
    }

    if name.contains('/') || name.contains('\0') {
        return Err(invalid(name, "name contains invalid characters"));
    }

    if name.chars().any(|c| c.is_whitespace()) {
        return Err(invalid(name, "name contains whitespace"));
    }

    Ok(())
}

/// Copy a validated name into a NUL-padded `ifr_name` buffer.
pub fn to_ifr_name(name: &str) -> Result<[u8; IFNAMSIZ]> {
    validate(name)?;
    let mut buf = [0u8; IFNAMSIZ];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    Ok(buf)
}
