//! GRO and forwarding toggle integration tests.

use vnetlink::{Delivery, Result};

use crate::common::TestNet;

#[tokio::test]
async fn test_gro_toggle_is_idempotent() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let red = t.open("gred")?;
    let blue = t.open("gblue")?;
    t.net
        .create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked)
        .await?;

    t.net.set_interface_gro(&red, "red0", true)?;
    assert!(t.net.interface_gro(&red, "red0")?);
    t.net.set_interface_gro(&red, "red0", true)?;
    assert!(t.net.interface_gro(&red, "red0")?);

    t.net.set_interface_gro(&red, "red0", false)?;
    assert!(!t.net.interface_gro(&red, "red0")?);

    // The name resolves in the context's namespace, not the active one.
    t.net.switch_namespace(Some(&red))?;
    let err = t.net.set_interface_gro(&blue, "red0", true).unwrap_err();
    assert!(err.is_not_found(), "{err}");

    Ok(())
}

#[tokio::test]
async fn test_forwarding_follows_active_namespace() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let red = t.open("fred")?;
    let blue = t.open("fblue")?;

    t.net.switch_namespace(Some(&red))?;
    t.net.set_forwarding(true)?;
    t.net.switch_namespace(Some(&blue))?;
    t.net.set_forwarding(false)?;

    t.net.switch_namespace(Some(&red))?;
    assert!(t.net.forwarding()?);
    t.net.switch_namespace(Some(&blue))?;
    assert!(!t.net.forwarding()?);

    t.net.switch_namespace(Some(&red))?;
    t.net.set_forwarding(false)?;
    assert!(!t.net.forwarding()?);

    Ok(())
}
