//! The process-wide controller.
//!
//! [`NetControl`] owns the active-namespace state and the initial
//! namespace's transport. Every other operation goes through a
//! [`NamespaceContext`], whose transport scopes the request to that
//! context's namespace.
//!
//! # Example
//!
//! ```ignore
//! use vnetlink::{Delivery, NetConfig, NetControl, ShapingConfig};
//!
//! let mut net = NetControl::init(NetConfig::default())?;
//! let red = net.open_namespace("red", true)?;
//! let blue = net.open_namespace("blue", true)?;
//!
//! net.create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked).await?;
//! let ifindex = net.interface_index(&red, "red0").await?;
//! net.set_egress_shaping(&red, ifindex, &ShapingConfig::new().rate_mbit(5.0), Delivery::Acked)
//!     .await?;
//! ```

use std::marker::PhantomData;
use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::config::NetConfig;
use crate::features;
use crate::namespace::{ActiveNamespace, NamespaceContext, NamespaceManager, OpenError};
use crate::netlink::addr::{self, Ipv4AddressConfig};
use crate::netlink::link::{self, LinkInfo};
use crate::netlink::route::Ipv4RouteConfig;
use crate::netlink::tc::{self, QdiscInfo};
use crate::netlink::{Delivery, Error, FromNetlink, NlMsgType, Result};
use crate::shaping::{ShapingConfig, ShapingPlan};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Controller for namespaces, links, addresses, routes and shaping.
///
/// At most one exists per process. It is neither `Send` nor `Sync`: the
/// namespace it tracks belongs to the thread that created it.
#[derive(Debug)]
pub struct NetControl {
    config: NetConfig,
    namespaces: NamespaceManager,
    initial: NamespaceContext,
    _not_send: PhantomData<*const ()>,
}

impl NetControl {
    /// Validate `config`, claim the process-wide slot, and open the initial
    /// namespace's netlink socket.
    ///
    /// Must run inside a tokio runtime, on the thread that will make every
    /// later call.
    pub fn init(config: NetConfig) -> Result<Self> {
        config.validate()?;

        if INITIALIZED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::AlreadyInitialized);
        }

        let initial = match NamespaceContext::current(config.ack_timeout) {
            Ok(ctx) => ctx,
            Err(e) => {
                INITIALIZED.store(false, Ordering::Release);
                return Err(e);
            }
        };

        info!(prefix = %config.namespace_prefix.display(), "network control initialized");
        Ok(Self {
            namespaces: NamespaceManager::new(&config.namespace_prefix, config.ack_timeout),
            config,
            initial,
            _not_send: PhantomData,
        })
    }

    /// The configuration this controller was created with.
    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    /// The namespace the thread currently operates in.
    pub fn active_namespace(&self) -> &ActiveNamespace {
        self.namespaces.active()
    }

    /// Context of the namespace the thread was in at init.
    pub fn initial_namespace(&self) -> &NamespaceContext {
        &self.initial
    }

    // Namespaces

    /// Open or create the namespace `name` and switch into it.
    ///
    /// With `exclusive`, an already registered name fails with
    /// [`Error::NamespaceExists`] and the active namespace is left alone.
    ///
    /// On success the active namespace is `name`. A failure may leave the
    /// thread in a different namespace than before the call; the error's
    /// `active` field says which. Switch to a known context before going on.
    pub fn open_namespace(
        &mut self,
        name: &str,
        exclusive: bool,
    ) -> std::result::Result<NamespaceContext, OpenError> {
        self.namespaces.open(name, exclusive)
    }

    /// Release a context. The namespace stays registered and active.
    pub fn close_namespace(&self, ctx: NamespaceContext) {
        debug!(namespace = ?ctx.name(), "closing namespace context");
        drop(ctx);
    }

    /// Remove the registry entry of `name`.
    ///
    /// Processes and contexts still in the namespace keep it alive.
    pub fn delete_namespace(&mut self, name: &str) -> Result<()> {
        self.namespaces.delete(name)
    }

    /// Switch to `ctx`, or to the PID default namespace when `None`.
    pub fn switch_namespace(&mut self, ctx: Option<&NamespaceContext>) -> Result<()> {
        self.namespaces.switch(ctx)
    }

    /// Switch back to the namespace the thread was in at init.
    pub fn switch_to_initial(&mut self) -> Result<()> {
        self.namespaces.switch(Some(&self.initial))
    }

    /// Registered namespace names, sorted.
    pub fn list_namespaces(&self) -> Result<Vec<String>> {
        self.namespaces.list()
    }

    /// Whether `name` is registered.
    pub fn namespace_exists(&self, name: &str) -> bool {
        self.namespaces.exists(name)
    }

    // Links

    /// Create the veth pair `name`/`peer`, with `name` in `ctx` and `peer`
    /// in `peer_ctx`.
    pub async fn create_veth_pair(
        &self,
        name: &str,
        peer: &str,
        ctx: &NamespaceContext,
        peer_ctx: &NamespaceContext,
        delivery: Delivery,
    ) -> Result<()> {
        let request = link::new_veth_pair(name, peer, peer_ctx.as_raw_fd())?;
        ctx.transport()
            .send(request, delivery)
            .await
            .map_err(|e| e.with_context(format!("creating veth pair {name}/{peer}")))?;
        debug!(name, peer, "veth pair requested");
        Ok(())
    }

    /// Look up the index of interface `name` in `ctx`.
    pub async fn interface_index(&self, ctx: &NamespaceContext, name: &str) -> Result<u32> {
        let reply = ctx
            .transport()
            .request(link::get_link(name)?, NlMsgType::RTM_NEWLINK)
            .await
            .map_err(|e| e.with_context(format!("looking up {name}")))?;
        Ok(LinkInfo::from_bytes(&reply)?.index)
    }

    /// Bring interface `name` administratively up or down.
    pub async fn set_interface_up(
        &self,
        ctx: &NamespaceContext,
        name: &str,
        up: bool,
        delivery: Delivery,
    ) -> Result<()> {
        ctx.transport()
            .send(link::set_admin_state(name, up)?, delivery)
            .await
            .map_err(|e| {
                let state = if up { "up" } else { "down" };
                e.with_context(format!("setting {name} {state}"))
            })
    }

    // Addresses and routes

    /// Add an IPv4 address.
    pub async fn add_address_v4(
        &self,
        ctx: &NamespaceContext,
        config: &Ipv4AddressConfig,
        delivery: Delivery,
    ) -> Result<()> {
        ctx.transport()
            .send(config.build()?, delivery)
            .await
            .map_err(|e| {
                e.with_context(format!(
                    "adding {}/{} on ifindex {}",
                    config.address, config.prefix_len, config.ifindex
                ))
            })
    }

    /// Remove the first IPv4 address of `ifindex`.
    pub async fn del_address_v4(
        &self,
        ctx: &NamespaceContext,
        ifindex: u32,
        delivery: Delivery,
    ) -> Result<()> {
        ctx.transport()
            .send(addr::del_first_ipv4(ifindex), delivery)
            .await
            .map_err(|e| e.with_context(format!("deleting address on ifindex {ifindex}")))
    }

    /// Add a static IPv4 route to the main table.
    ///
    /// A destination with bits set outside its prefix fails with
    /// [`Error::InvalidRoute`] and nothing is sent.
    pub async fn add_route_v4(
        &self,
        ctx: &NamespaceContext,
        route: &Ipv4RouteConfig,
        delivery: Delivery,
    ) -> Result<()> {
        let request = route.build()?;
        ctx.transport()
            .send(request, delivery)
            .await
            .map_err(|e| {
                e.with_context(format!(
                    "adding route {}/{}",
                    route.destination, route.prefix_len
                ))
            })
    }

    // Shaping

    /// Shape egress traffic of `ifindex`.
    ///
    /// Replaces the netem root and either replaces or removes the tbf child,
    /// so the interface ends up with exactly the chain `config` describes.
    pub async fn set_egress_shaping(
        &self,
        ctx: &NamespaceContext,
        ifindex: u32,
        config: &ShapingConfig,
        delivery: Delivery,
    ) -> Result<()> {
        let plan = config.plan()?;
        let transport = ctx.transport();

        let netem = tc::replace_qdisc(ShapingPlan::netem_placement(ifindex), &plan.netem)?;
        transport
            .send(netem, delivery)
            .await
            .map_err(|e| e.with_context(format!("installing netem on ifindex {ifindex}")))?;

        let rate_placement = ShapingPlan::rate_placement(ifindex);
        match plan.rate {
            Some(tbf) => {
                let request = tc::replace_qdisc(rate_placement, &tbf)?;
                transport
                    .send(request, delivery)
                    .await
                    .map_err(|e| e.with_context(format!("installing tbf on ifindex {ifindex}")))?;
            }
            None => match transport.send(tc::delete_qdisc(rate_placement), delivery).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    return Err(e.with_context(format!("removing tbf on ifindex {ifindex}")));
                }
            },
        }

        debug!(ifindex, ?config, "egress shaping applied");
        Ok(())
    }

    /// Qdiscs attached to `ifindex`.
    pub async fn qdiscs(&self, ctx: &NamespaceContext, ifindex: u32) -> Result<Vec<QdiscInfo>> {
        let payloads = ctx
            .transport()
            .dump(tc::dump_qdiscs(ifindex), NlMsgType::RTM_NEWQDISC)
            .await?;

        let mut qdiscs = Vec::new();
        for payload in payloads {
            let info = QdiscInfo::from_bytes(&payload)?;
            // The kernel dumps every device regardless of tcm_ifindex.
            if info.ifindex == ifindex {
                qdiscs.push(info);
            }
        }
        Ok(qdiscs)
    }

    // Feature toggles

    /// Enable or disable GRO on interface `name` in `ctx`.
    pub fn set_interface_gro(
        &self,
        ctx: &NamespaceContext,
        name: &str,
        enabled: bool,
    ) -> Result<()> {
        features::set_gro(ctx.transport().as_raw_fd(), name, enabled)
    }

    /// Whether GRO is enabled on interface `name` in `ctx`.
    pub fn interface_gro(&self, ctx: &NamespaceContext, name: &str) -> Result<bool> {
        features::gro(ctx.transport().as_raw_fd(), name)
    }

    /// Turn IPv4 forwarding of the active namespace on or off.
    pub fn set_forwarding(&self, enabled: bool) -> Result<()> {
        features::set_ipv4_forwarding(enabled)
    }

    /// Whether IPv4 forwarding is on in the active namespace.
    pub fn forwarding(&self) -> Result<bool> {
        features::ipv4_forwarding()
    }
}

impl Drop for NetControl {
    fn drop(&mut self) {
        INITIALIZED.store(false, Ordering::Release);
    }
}
