//! IPv4 address integration tests.

use std::net::Ipv4Addr;

use vnetlink::netlink::addr::Ipv4AddressConfig;
use vnetlink::{Delivery, NamespaceContext, Result};

use crate::common::{TestNet, ip_in};

/// A veth pair between two fresh namespaces; returns both contexts and
/// the index of `red0`.
async fn veth_setup(t: &mut TestNet) -> Result<(NamespaceContext, NamespaceContext, u32)> {
    let red = t.open("ared")?;
    let blue = t.open("ablue")?;
    t.net
        .create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked)
        .await?;
    let ifindex = t.net.interface_index(&red, "red0").await?;
    Ok((red, blue, ifindex))
}

#[tokio::test]
async fn test_add_address() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = veth_setup(&mut t).await?;

    let config = Ipv4AddressConfig::new(ifindex, Ipv4Addr::new(10, 0, 0, 1), 24)
        .broadcast(Ipv4Addr::new(10, 0, 0, 255));
    t.net.add_address_v4(&red, &config, Delivery::Acked).await?;

    let out = ip_in(t.name(0), &["-o", "-4", "addr", "show", "dev", "red0"]);
    assert!(out.contains("inet 10.0.0.1/24"), "{out}");
    assert!(out.contains("brd 10.0.0.255"), "{out}");

    // Adding the same address again is rejected by the kernel.
    let err = t
        .net
        .add_address_v4(&red, &config, Delivery::Acked)
        .await
        .unwrap_err();
    assert!(err.is_already_exists(), "{err}");

    Ok(())
}

#[tokio::test]
async fn test_delete_first_address() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = veth_setup(&mut t).await?;

    let config = Ipv4AddressConfig::new(ifindex, Ipv4Addr::new(192, 168, 50, 1), 24);
    t.net.add_address_v4(&red, &config, Delivery::Acked).await?;

    t.net.del_address_v4(&red, ifindex, Delivery::Acked).await?;
    let out = ip_in(t.name(0), &["-o", "-4", "addr", "show", "dev", "red0"]);
    assert!(!out.contains("192.168.50.1"), "{out}");

    // Nothing left to delete.
    let err = t
        .net
        .del_address_v4(&red, ifindex, Delivery::Acked)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), vnetlink::ErrorKind::Kernel);

    Ok(())
}

#[tokio::test]
async fn test_address_in_other_namespace() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (_red, blue, _) = veth_setup(&mut t).await?;
    let blue0 = t.net.interface_index(&blue, "blue0").await?;

    let config = Ipv4AddressConfig::new(blue0, Ipv4Addr::new(10, 0, 0, 2), 24);
    t.net.add_address_v4(&blue, &config, Delivery::Acked).await?;

    let out = ip_in(t.name(1), &["-o", "-4", "addr", "show", "dev", "blue0"]);
    assert!(out.contains("inet 10.0.0.2/24"), "{out}");

    Ok(())
}
