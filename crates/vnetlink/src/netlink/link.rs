//! Link requests: veth pair creation, admin state, lookup by name.

use std::os::unix::io::RawFd;

use super::builder::MessageBuilder;
use super::error::Result;
use super::message::{NLM_F_CREATE, NLM_F_EXCL, NLM_F_REQUEST, NlMsgType};
use super::parse::{FromNetlink, PResult, cut, parse_attr, parse_header, parse_string_from_bytes};
use super::types::link::{IFF_UP, IfInfoMsg, ifla, ifla_info, veth};
use crate::util::ifname;

/// Build an RTM_NEWLINK request creating a veth pair.
///
/// `name` is created in the namespace of the socket the request is sent on;
/// `peer` is moved into the namespace referred to by `peer_ns_fd`.
pub fn new_veth_pair(name: &str, peer: &str, peer_ns_fd: RawFd) -> Result<MessageBuilder> {
    ifname::validate(name)?;
    ifname::validate(peer)?;

    let mut builder =
        MessageBuilder::new(NlMsgType::RTM_NEWLINK, NLM_F_REQUEST | NLM_F_CREATE | NLM_F_EXCL);
    builder.append(&IfInfoMsg::new());
    builder.append_attr_str(ifla::IFNAME, name);

    let linkinfo = builder.nest_start(ifla::LINKINFO);
    builder.append_attr_str(ifla_info::KIND, "veth");
    let data = builder.nest_start(ifla_info::DATA);
    let peer_info = builder.nest_start(veth::INFO_PEER);
    builder.append(&IfInfoMsg::new());
    builder.append_attr_str(ifla::IFNAME, peer);
    builder.append_attr_u32(ifla::NET_NS_FD, peer_ns_fd as u32);
    builder.nest_end(peer_info);
    builder.nest_end(data);
    builder.nest_end(linkinfo);

    Ok(builder)
}

/// Build an RTM_SETLINK request changing only the `IFF_UP` flag.
pub fn set_admin_state(name: &str, up: bool) -> Result<MessageBuilder> {
    ifname::validate(name)?;

    let flags = if up { IFF_UP } else { 0 };
    let mut builder = MessageBuilder::new(NlMsgType::RTM_SETLINK, NLM_F_REQUEST);
    builder.append(&IfInfoMsg::new().with_flags(flags, IFF_UP));
    builder.append_attr_str(ifla::IFNAME, name);
    Ok(builder)
}

/// Build an RTM_GETLINK request for a single interface by name.
pub fn get_link(name: &str) -> Result<MessageBuilder> {
    ifname::validate(name)?;

    let mut builder = MessageBuilder::new(NlMsgType::RTM_GETLINK, NLM_F_REQUEST);
    builder.append(&IfInfoMsg::new());
    builder.append_attr_str(ifla::IFNAME, name);
    Ok(builder)
}

/// Interface as reported by RTM_NEWLINK.
#[derive(Debug, Clone, Default)]
pub struct LinkInfo {
    /// Interface index.
    pub index: u32,
    /// Device flags (IFF_*).
    pub flags: u32,
    /// Interface name.
    pub name: Option<String>,
    /// MTU.
    pub mtu: Option<u32>,
    /// Link kind from IFLA_LINKINFO (e.g. "veth").
    pub kind: Option<String>,
}

impl LinkInfo {
    /// Check if the interface is administratively up.
    pub fn is_up(&self) -> bool {
        self.flags & IFF_UP != 0
    }
}

impl FromNetlink for LinkInfo {
    fn parse(input: &mut &[u8]) -> PResult<Self> {
        let header = parse_header(input, IfInfoMsg::SIZE)?;
        let header = IfInfoMsg::from_bytes(header).map_err(|_| cut())?;

        let mut info = LinkInfo {
            index: header.ifi_index as u32,
            flags: header.ifi_flags,
            ..Default::default()
        };

        while !input.is_empty() {
            let (attr_type, data) = parse_attr(input)?;
            match attr_type {
                ifla::IFNAME => info.name = Some(parse_string_from_bytes(data)),
                ifla::MTU if data.len() >= 4 => {
                    info.mtu = Some(u32::from_ne_bytes([data[0], data[1], data[2], data[3]]));
                }
                ifla::LINKINFO => info.kind = parse_link_kind(data),
                _ => {}
            }
        }

        Ok(info)
    }
}

fn parse_link_kind(mut data: &[u8]) -> Option<String> {
    while !data.is_empty() {
        let (attr_type, payload) = parse_attr(&mut data).ok()?;
        if attr_type == ifla_info::KIND {
            return Some(parse_string_from_bytes(payload));
        }
    }
    None
}
