//! IPv4 address requests.

use std::net::Ipv4Addr;

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{NLM_F_CREATE, NLM_F_EXCL, NLM_F_REQUEST, NlMsgType};
use super::types::addr::{IfAddrMsg, ifa};

/// An IPv4 address to assign to an interface.
///
/// ```
/// use std::net::Ipv4Addr;
/// use vnetlink::netlink::addr::Ipv4AddressConfig;
///
/// let config = Ipv4AddressConfig::new(3, Ipv4Addr::new(10, 0, 0, 1), 24)
///     .broadcast(Ipv4Addr::new(10, 0, 0, 255));
/// assert_eq!(config.prefix_len, 24);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4AddressConfig {
    /// Interface index.
    pub ifindex: u32,
    /// Local address.
    pub address: Ipv4Addr,
    /// Prefix length (0-32).
    pub prefix_len: u8,
    /// Broadcast address.
    pub broadcast: Option<Ipv4Addr>,
    /// Anycast address.
    pub anycast: Option<Ipv4Addr>,
}

impl Ipv4AddressConfig {
    /// Create a new address configuration.
    pub fn new(ifindex: u32, address: Ipv4Addr, prefix_len: u8) -> Self {
        Self {
            ifindex,
            address,
            prefix_len,
            broadcast: None,
            anycast: None,
        }
    }

    /// Set the broadcast address. `0.0.0.0` leaves it unset.
    pub fn broadcast(mut self, addr: Ipv4Addr) -> Self {
        self.broadcast = (!addr.is_unspecified()).then_some(addr);
        self
    }

    /// Set the anycast address. `0.0.0.0` leaves it unset.
    pub fn anycast(mut self, addr: Ipv4Addr) -> Self {
        self.anycast = (!addr.is_unspecified()).then_some(addr);
        self
    }

    /// Build an RTM_NEWADDR request.
    pub fn build(&self) -> Result<MessageBuilder> {
        if self.prefix_len > 32 {
            return Err(Error::InvalidPrefixLength(self.prefix_len));
        }

        let mut builder =
            MessageBuilder::new(NlMsgType::RTM_NEWADDR, NLM_F_REQUEST | NLM_F_CREATE | NLM_F_EXCL);
        builder.append(&IfAddrMsg::ipv4(self.ifindex).with_prefix_len(self.prefix_len));

        // A point-to-point peer would go in IFA_ADDRESS; here both are local.
        builder.append_attr(ifa::LOCAL, &self.address.octets());
        builder.append_attr(ifa::ADDRESS, &self.address.octets());

        if let Some(brd) = self.broadcast {
            builder.append_attr(ifa::BROADCAST, &brd.octets());
        }
        if let Some(any) = self.anycast {
            builder.append_attr(ifa::ANYCAST, &any.octets());
        }

        Ok(builder)
    }
}

/// Build an RTM_DELADDR request removing the first IPv4 address on `ifindex`.
///
/// Only the family and interface are given, so the kernel picks the first
/// matching address.
pub fn del_first_ipv4(ifindex: u32) -> MessageBuilder {
    let mut builder = MessageBuilder::new(NlMsgType::RTM_DELADDR, NLM_F_REQUEST);
    builder.append(&IfAddrMsg::ipv4(ifindex));
    builder
}
