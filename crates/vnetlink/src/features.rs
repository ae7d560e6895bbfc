//! Interface and namespace toggles outside route netlink.
//!
//! GRO goes through the legacy ethtool ioctl. The ioctl is issued on a
//! netlink socket, so the interface name resolves in the namespace that
//! socket was created in. IPv4 forwarding is a sysctl of the calling
//! thread's namespace.

use std::fs;
use std::io;
use std::os::unix::io::RawFd;

use tracing::debug;

use crate::netlink::{Error, Result};
use crate::util::ifname;

const SIOCETHTOOL: libc::c_ulong = 0x8946;
const ETHTOOL_GGRO: u32 = 0x0000_002b;
const ETHTOOL_SGRO: u32 = 0x0000_002c;

const IP_FORWARD: &str = "/proc/sys/net/ipv4/ip_forward";

/// `struct ethtool_value`.
#[repr(C)]
#[derive(Debug, Default)]
struct EthtoolValue {
    cmd: u32,
    data: u32,
}

fn ethtool(fd: RawFd, name: &str, value: &mut EthtoolValue) -> Result<()> {
    let ifr_name = ifname::to_ifr_name(name)?;

    // SAFETY: ifreq is plain old data; all-zero is a valid value.
    let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in ifr.ifr_name.iter_mut().zip(ifr_name) {
        *dst = src as libc::c_char;
    }
    ifr.ifr_ifru.ifru_data = (value as *mut EthtoolValue).cast();

    // SAFETY: `ifr` carries a NUL-terminated name and points at `value`,
    // which outlives the call; SIOCETHTOOL reads and writes only that struct.
    let ret = unsafe { libc::ioctl(fd, SIOCETHTOOL as _, &mut ifr) };
    if ret < 0 {
        return Err(Error::Syscall {
            call: "ioctl(SIOCETHTOOL)",
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

/// Enable or disable generic receive offload on `name`.
///
/// Setting the current value again is not an error.
pub fn set_gro(fd: RawFd, name: &str, enabled: bool) -> Result<()> {
    let mut value = EthtoolValue {
        cmd: ETHTOOL_SGRO,
        data: enabled as u32,
    };
    ethtool(fd, name, &mut value)?;
    debug!(interface = name, enabled, "set GRO");
    Ok(())
}

/// Whether generic receive offload is enabled on `name`.
pub fn gro(fd: RawFd, name: &str) -> Result<bool> {
    let mut value = EthtoolValue {
        cmd: ETHTOOL_GGRO,
        data: 0,
    };
    ethtool(fd, name, &mut value)?;
    Ok(value.data != 0)
}

/// Turn IPv4 forwarding of the current namespace on or off.
pub fn set_ipv4_forwarding(enabled: bool) -> Result<()> {
    fs::write(IP_FORWARD, if enabled { "1\n" } else { "0\n" })?;
    debug!(enabled, "set ipv4 forwarding");
    Ok(())
}

/// Whether IPv4 forwarding is on in the current namespace.
pub fn ipv4_forwarding() -> Result<bool> {
    parse_sysctl_bool(&fs::read_to_string(IP_FORWARD)?)
}

fn parse_sysctl_bool(raw: &str) -> Result<bool> {
    match raw.trim() {
        "0" => Ok(false),
        "1" => Ok(true),
        other => Err(Error::InvalidMessage(format!(
            "unexpected {IP_FORWARD} value {other:?}"
        ))),
    }
}
