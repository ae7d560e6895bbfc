//! Netlink control of Linux virtual networks.
//!
//! `vnetlink` builds isolated topologies for testbeds and simulators: named
//! network namespaces, veth pairs between them, IPv4 addresses and routes,
//! and per-interface egress shaping (delay, jitter, loss, rate). Requests go
//! straight to the kernel over route netlink; nothing shells out to `ip` or
//! `tc`.
//!
//! # Threading
//!
//! Namespace switches act on the calling thread, so [`NetControl`] and
//! every [`NamespaceContext`] stay on the thread that created them. Use a
//! current-thread runtime:
//!
//! ```ignore
//! use std::net::Ipv4Addr;
//! use vnetlink::netlink::addr::Ipv4AddressConfig;
//! use vnetlink::{Delivery, NetConfig, NetControl, ShapingConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> vnetlink::Result<()> {
//!     let mut net = NetControl::init(NetConfig::default())?;
//!     let red = net.open_namespace("red", true)?;
//!     let blue = net.open_namespace("blue", true)?;
//!
//!     net.create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked).await?;
//!     let ifindex = net.interface_index(&red, "red0").await?;
//!     let addr = Ipv4AddressConfig::new(ifindex, Ipv4Addr::new(10, 0, 0, 1), 24);
//!     net.add_address_v4(&red, &addr, Delivery::Acked).await?;
//!     net.set_interface_up(&red, "red0", true, Delivery::Acked).await?;
//!
//!     let shaping = ShapingConfig::new()
//!         .delay(std::time::Duration::from_millis(20))
//!         .rate_mbit(5.0);
//!     net.set_egress_shaping(&red, ifindex, &shaping, Delivery::Acked).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `serde` - `Serialize`/`Deserialize` for [`NetConfig`], [`ShapingConfig`]
//!   and [`logging::LogLevel`]

pub mod config;
pub mod control;
pub mod features;
pub mod logging;
pub mod namespace;
pub mod netlink;
pub mod shaping;
pub mod util;

pub use config::NetConfig;
pub use control::NetControl;
pub use namespace::{ActiveNamespace, NamespaceContext, OpenError};
pub use netlink::{Delivery, Error, ErrorKind, Result};
pub use shaping::ShapingConfig;
