//! Link integration tests.

use vnetlink::{Delivery, Result};

use crate::common::{TestNet, ip_in, link_flags};

#[tokio::test]
async fn test_create_veth_pair_across_namespaces() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let red = t.open("vred")?;
    let blue = t.open("vblue")?;

    t.net
        .create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked)
        .await?;

    let red0 = t.net.interface_index(&red, "red0").await?;
    let blue0 = t.net.interface_index(&blue, "blue0").await?;
    assert!(red0 > 1);
    assert!(blue0 > 1);

    // Each end lives only in its own namespace.
    let err = t.net.interface_index(&red, "blue0").await.unwrap_err();
    assert!(err.is_not_found());
    let err = t.net.interface_index(&blue, "red0").await.unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

#[tokio::test]
async fn test_set_interface_up_down() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let red = t.open("upred")?;
    let blue = t.open("upblue")?;
    let red_name = t.name(0).to_string();

    t.net
        .create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked)
        .await?;
    let flags = link_flags(&ip_in(&red_name, &["-o", "link", "show", "red0"]));
    assert!(!flags.iter().any(|f| f == "UP"));

    t.net
        .set_interface_up(&red, "red0", true, Delivery::Acked)
        .await?;
    let flags = link_flags(&ip_in(&red_name, &["-o", "link", "show", "red0"]));
    assert!(flags.iter().any(|f| f == "UP"), "{flags:?}");

    t.net
        .set_interface_up(&red, "red0", false, Delivery::Acked)
        .await?;
    let flags = link_flags(&ip_in(&red_name, &["-o", "link", "show", "red0"]));
    assert!(!flags.iter().any(|f| f == "UP"), "{flags:?}");

    Ok(())
}

#[tokio::test]
async fn test_rejected_request_fire_and_forget() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let red = t.open("ffred")?;
    let blue = t.open("ffblue")?;

    t.net
        .create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked)
        .await?;

    // Same names again: the kernel refuses, but nobody waits to hear it.
    t.net
        .create_veth_pair("red0", "blue0", &red, &blue, Delivery::FireAndForget)
        .await?;

    // The stale error is skipped; this call sees its own verdict.
    let err = t
        .net
        .create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked)
        .await
        .unwrap_err();
    assert!(err.is_already_exists(), "{err}");
    assert!(!err.is_transport());

    Ok(())
}

#[tokio::test]
async fn test_acked_call_after_many_rejected_fire_and_forget() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let red = t.open("flood")?;

    for _ in 0..5000 {
        t.net
            .set_interface_up(&red, "vnl-missing0", true, Delivery::FireAndForget)
            .await?;
    }

    t.net
        .set_interface_up(&red, "lo", true, Delivery::Acked)
        .await?;
    t.net
        .set_interface_up(&red, "lo", true, Delivery::Acked)
        .await?;

    let flags = link_flags(&ip_in(t.name(0), &["-o", "link", "show", "lo"]));
    assert!(flags.iter().any(|f| f == "UP"), "{flags:?}");

    Ok(())
}

#[tokio::test]
async fn test_interface_index_of_loopback() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let ctx = t.open("lo")?;
    assert_eq!(t.net.interface_index(&ctx, "lo").await?, 1);

    let err = t.net.interface_index(&ctx, "bad/name").await.unwrap_err();
    assert!(err.is_validation());

    Ok(())
}
