//! IPv4 route requests.

use std::net::Ipv4Addr;

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{NLM_F_CREATE, NLM_F_EXCL, NLM_F_REQUEST, NlMsgType};
use super::types::route::{
    RT_SCOPE_LINK, RT_SCOPE_UNIVERSE, RT_TABLE_MAIN, RTN_UNICAST, RTPROT_BOOT, RtMsg, rta,
};
use crate::util::addr::ipv4_is_network;

/// A static IPv4 route in the main table.
///
/// ```
/// use std::net::Ipv4Addr;
/// use vnetlink::netlink::route::Ipv4RouteConfig;
///
/// let route = Ipv4RouteConfig::new(Ipv4Addr::new(10, 2, 0, 0), 16)
///     .gateway(Ipv4Addr::new(10, 1, 0, 1))
///     .oif(4);
/// assert!(route.validate().is_ok());
///
/// let bad = Ipv4RouteConfig::new(Ipv4Addr::new(10, 2, 0, 1), 16);
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4RouteConfig {
    /// Destination network.
    pub destination: Ipv4Addr,
    /// Destination prefix length.
    pub prefix_len: u8,
    /// Next hop; `None` for a directly attached destination.
    pub gateway: Option<Ipv4Addr>,
    /// Output interface index.
    pub oif: Option<u32>,
}

impl Ipv4RouteConfig {
    /// Create a route to `destination/prefix_len`.
    pub fn new(destination: Ipv4Addr, prefix_len: u8) -> Self {
        Self {
            destination,
            prefix_len,
            gateway: None,
            oif: None,
        }
    }

    /// Set the gateway. `0.0.0.0` means no gateway.
    pub fn gateway(mut self, gateway: Ipv4Addr) -> Self {
        self.gateway = (!gateway.is_unspecified()).then_some(gateway);
        self
    }

    /// Set the output interface.
    pub fn oif(mut self, ifindex: u32) -> Self {
        self.oif = Some(ifindex);
        self
    }

    /// Reject prefixes above 32 and destinations with host bits set.
    ///
    /// The destination is never masked on the caller's behalf.
    pub fn validate(&self) -> Result<()> {
        if ipv4_is_network(self.destination, self.prefix_len)? {
            Ok(())
        } else {
            Err(Error::InvalidRoute {
                destination: self.destination,
                prefix_len: self.prefix_len,
            })
        }
    }

    /// Validate and build an RTM_NEWROUTE request.
    pub fn build(&self) -> Result<MessageBuilder> {
        self.validate()?;

        let rtmsg = RtMsg {
            rtm_family: libc::AF_INET as u8,
            rtm_dst_len: self.prefix_len,
            rtm_table: RT_TABLE_MAIN,
            rtm_protocol: RTPROT_BOOT,
            rtm_scope: if self.gateway.is_some() {
                RT_SCOPE_UNIVERSE
            } else {
                RT_SCOPE_LINK
            },
            rtm_type: RTN_UNICAST,
            ..Default::default()
        };

        let mut builder =
            MessageBuilder::new(NlMsgType::RTM_NEWROUTE, NLM_F_REQUEST | NLM_F_CREATE | NLM_F_EXCL);
        builder.append(&rtmsg);

        if self.prefix_len > 0 {
            builder.append_attr(rta::DST, &self.destination.octets());
        }
        if let Some(gw) = self.gateway {
            builder.append_attr(rta::GATEWAY, &gw.octets());
        }
        if let Some(oif) = self.oif {
            builder.append_attr_u32(rta::OIF, oif);
        }

        Ok(builder)
    }
}
