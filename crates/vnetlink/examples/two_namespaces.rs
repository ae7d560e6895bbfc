//! Two namespaces joined by a shaped veth pair.
//!
//! Creates `vnl-red` and `vnl-blue`, links them with `red0`/`blue0`,
//! addresses both ends, and shapes `red0` to 20 ms +/- 5 ms, 1% loss and
//! 5 Mbit/s. Pass `--keep` to leave the namespaces in place for poking at
//! with `ip netns exec`.
//!
//! Run with: sudo -E cargo run -p vnetlink --example two_namespaces
//!
//! Requires root privileges.

use std::env;
use std::net::Ipv4Addr;
use std::time::Duration;

use vnetlink::logging::{LogConfig, LogLevel};
use vnetlink::netlink::addr::Ipv4AddressConfig;
use vnetlink::netlink::types::tc::{TC_H_ROOT, tc_major, tc_minor};
use vnetlink::{Delivery, NamespaceContext, NetConfig, NetControl, Result, ShapingConfig};

const RED: &str = "vnl-red";
const BLUE: &str = "vnl-blue";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let _log = LogConfig::new().threshold(LogLevel::Debug).init()?;
    let keep = env::args().any(|a| a == "--keep");

    let mut net = NetControl::init(NetConfig::default())?;
    let red = net.open_namespace(RED, false)?;
    let blue = net.open_namespace(BLUE, false)?;

    net.create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked)
        .await?;
    configure_end(&net, &red, "red0", Ipv4Addr::new(10, 0, 0, 1)).await?;
    configure_end(&net, &blue, "blue0", Ipv4Addr::new(10, 0, 0, 2)).await?;

    let red0 = net.interface_index(&red, "red0").await?;
    let shaping = ShapingConfig::new()
        .delay(Duration::from_millis(20))
        .jitter(Duration::from_millis(5))
        .loss(0.01)
        .rate_mbit(5.0);
    net.set_egress_shaping(&red, red0, &shaping, Delivery::Acked)
        .await?;

    for qdisc in net.qdiscs(&red, red0).await? {
        let parent = if qdisc.parent == TC_H_ROOT {
            "root".to_string()
        } else {
            format!("{:x}:{:x}", tc_major(qdisc.parent), tc_minor(qdisc.parent))
        };
        println!(
            "red0: {} {:x}: parent {parent}",
            qdisc.kind,
            tc_major(qdisc.handle)
        );
    }

    net.switch_to_initial()?;
    if keep {
        println!("namespaces {RED} and {BLUE} left in place");
    } else {
        net.close_namespace(red);
        net.close_namespace(blue);
        net.delete_namespace(RED)?;
        net.delete_namespace(BLUE)?;
    }

    Ok(())
}

async fn configure_end(
    net: &NetControl,
    ctx: &NamespaceContext,
    name: &str,
    address: Ipv4Addr,
) -> Result<()> {
    let ifindex = net.interface_index(ctx, name).await?;
    let config =
        Ipv4AddressConfig::new(ifindex, address, 24).broadcast(Ipv4Addr::new(10, 0, 0, 255));
    net.add_address_v4(ctx, &config, Delivery::Acked).await?;
    net.set_interface_up(ctx, name, true, Delivery::Acked).await?;
    net.set_interface_gro(ctx, name, false)?;
    Ok(())
}
