//! Route netlink client: wire format, request builders and transport.
//!
//! Builders in [`link`], [`addr`], [`route`] and [`tc`] are pure: they turn
//! typed parameters into a [`MessageBuilder`] and never touch a socket. A
//! [`Transport`] stamps and sends them, and waits for the kernel's verdict
//! when asked to.
//!
//! # Example
//!
//! ```ignore
//! use std::net::Ipv4Addr;
//! use vnetlink::netlink::{Delivery, Transport, addr::Ipv4AddressConfig};
//!
//! let transport = Transport::new(std::time::Duration::from_secs(5))?;
//! let request = Ipv4AddressConfig::new(2, Ipv4Addr::new(10, 0, 0, 1), 24).build()?;
//! transport.send(request, Delivery::Acked).await?;
//! ```

pub mod addr;
pub mod attr;
pub mod builder;
mod error;
pub mod link;
pub mod message;
pub mod parse;
pub mod route;
mod socket;
pub mod tc;
pub mod transport;
pub mod types;

pub use attr::{AttrIter, NlAttr};
pub use builder::{MessageBuilder, NestToken};
pub use error::{Error, ErrorKind, Result};
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use parse::FromNetlink;
pub use socket::NetlinkSocket;
pub use transport::{Delivery, Transport};
