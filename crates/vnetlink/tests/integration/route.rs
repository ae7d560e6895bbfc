//! IPv4 route integration tests.

use std::net::Ipv4Addr;

use vnetlink::netlink::addr::Ipv4AddressConfig;
use vnetlink::netlink::route::Ipv4RouteConfig;
use vnetlink::{Delivery, Error, NamespaceContext, Result};

use crate::common::{TestNet, ip_in};

/// `red0` up with 10.1.0.1/24, its peer up in a second namespace.
async fn routed_setup(t: &mut TestNet) -> Result<(NamespaceContext, NamespaceContext, u32)> {
    let red = t.open("rred")?;
    let blue = t.open("rblue")?;
    t.net
        .create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked)
        .await?;

    let ifindex = t.net.interface_index(&red, "red0").await?;
    let addr = Ipv4AddressConfig::new(ifindex, Ipv4Addr::new(10, 1, 0, 1), 24);
    t.net.add_address_v4(&red, &addr, Delivery::Acked).await?;
    t.net
        .set_interface_up(&red, "red0", true, Delivery::Acked)
        .await?;
    t.net
        .set_interface_up(&blue, "blue0", true, Delivery::Acked)
        .await?;

    Ok((red, blue, ifindex))
}

#[tokio::test]
async fn test_add_route_via_gateway() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = routed_setup(&mut t).await?;

    let route = Ipv4RouteConfig::new(Ipv4Addr::new(10, 2, 0, 0), 16)
        .gateway(Ipv4Addr::new(10, 1, 0, 254))
        .oif(ifindex);
    t.net.add_route_v4(&red, &route, Delivery::Acked).await?;

    let out = ip_in(t.name(0), &["-4", "route", "show"]);
    assert!(out.contains("10.2.0.0/16 via 10.1.0.254 dev red0"), "{out}");

    Ok(())
}

#[tokio::test]
async fn test_add_direct_route() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = routed_setup(&mut t).await?;

    let route = Ipv4RouteConfig::new(Ipv4Addr::new(172, 16, 0, 0), 12).oif(ifindex);
    t.net.add_route_v4(&red, &route, Delivery::Acked).await?;

    let out = ip_in(t.name(0), &["-4", "route", "show"]);
    assert!(out.contains("172.16.0.0/12 dev red0"), "{out}");
    assert!(out.contains("scope link"), "{out}");

    Ok(())
}

#[tokio::test]
async fn test_host_bits_rejected_without_request() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = routed_setup(&mut t).await?;
    let before = red.requests_sent();

    for (dst, len) in [
        (Ipv4Addr::new(10, 2, 0, 1), 16),
        (Ipv4Addr::new(10, 2, 3, 0), 16),
        (Ipv4Addr::new(10, 2, 0, 0), 33),
    ] {
        let route = Ipv4RouteConfig::new(dst, len).oif(ifindex);
        let err = t
            .net
            .add_route_v4(&red, &route, Delivery::Acked)
            .await
            .unwrap_err();
        assert!(err.is_validation(), "{dst}/{len}: {err}");
    }
    assert_eq!(red.requests_sent(), before);

    let route = Ipv4RouteConfig::new(Ipv4Addr::new(10, 2, 0, 1), 16);
    let err = t
        .net
        .add_route_v4(&red, &route, Delivery::FireAndForget)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRoute { .. }));
    assert_eq!(red.requests_sent(), before);

    Ok(())
}

#[tokio::test]
async fn test_unreachable_gateway_is_kernel_error() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = routed_setup(&mut t).await?;

    let route = Ipv4RouteConfig::new(Ipv4Addr::new(10, 3, 0, 0), 16)
        .gateway(Ipv4Addr::new(192, 0, 2, 1))
        .oif(ifindex);
    let err = t
        .net
        .add_route_v4(&red, &route, Delivery::Acked)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), vnetlink::ErrorKind::Kernel);
    assert!(err.errno().is_some());

    // The same request without waiting reports success.
    t.net
        .add_route_v4(&red, &route, Delivery::FireAndForget)
        .await?;

    Ok(())
}
