//! Egress shaping integration tests.

use std::time::Duration;

use vnetlink::netlink::tc::QdiscInfo;
use vnetlink::netlink::types::tc::{TC_H_ROOT, tc_handle};
use vnetlink::{Delivery, NamespaceContext, Result, ShapingConfig};

use crate::common::TestNet;

async fn veth(t: &mut TestNet) -> Result<(NamespaceContext, NamespaceContext, u32)> {
    let red = t.open("sred")?;
    let blue = t.open("sblue")?;
    t.net
        .create_veth_pair("red0", "blue0", &red, &blue, Delivery::Acked)
        .await?;
    let ifindex = t.net.interface_index(&red, "red0").await?;
    Ok((red, blue, ifindex))
}

fn by_kind<'a>(qdiscs: &'a [QdiscInfo], kind: &str) -> Vec<&'a QdiscInfo> {
    qdiscs.iter().filter(|q| q.kind == kind).collect()
}

#[tokio::test]
async fn test_zero_rate_installs_netem_only() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = veth(&mut t).await?;

    let config = ShapingConfig::new()
        .delay(Duration::from_millis(20))
        .jitter(Duration::from_millis(5))
        .loss(0.1);
    t.net
        .set_egress_shaping(&red, ifindex, &config, Delivery::Acked)
        .await?;

    let qdiscs = t.net.qdiscs(&red, ifindex).await?;
    let netem = by_kind(&qdiscs, "netem");
    assert_eq!(netem.len(), 1);
    assert_eq!(netem[0].parent, TC_H_ROOT);
    assert_eq!(netem[0].handle, tc_handle(1, 0));
    assert!(by_kind(&qdiscs, "tbf").is_empty());

    Ok(())
}

#[tokio::test]
async fn test_rate_adds_tbf_child() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = veth(&mut t).await?;

    let config = ShapingConfig::new()
        .delay(Duration::from_millis(10))
        .rate_mbit(5.0);
    t.net
        .set_egress_shaping(&red, ifindex, &config, Delivery::Acked)
        .await?;

    let qdiscs = t.net.qdiscs(&red, ifindex).await?;
    assert_eq!(by_kind(&qdiscs, "netem").len(), 1);
    let tbf = by_kind(&qdiscs, "tbf");
    assert_eq!(tbf.len(), 1);
    assert_eq!(tbf[0].parent, tc_handle(1, 1));
    assert_eq!(tbf[0].handle, tc_handle(10, 0));

    let parms = tbf[0].tbf_qopt().expect("tbf parameters");
    assert_eq!(parms.rate.rate, 625_000);

    Ok(())
}

#[tokio::test]
async fn test_reapply_replaces_chain() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = veth(&mut t).await?;

    let shaped = ShapingConfig::new().rate_mbit(5.0);
    t.net
        .set_egress_shaping(&red, ifindex, &shaped, Delivery::Acked)
        .await?;
    t.net
        .set_egress_shaping(&red, ifindex, &shaped.rate_mbit(2.0), Delivery::Acked)
        .await?;

    let qdiscs = t.net.qdiscs(&red, ifindex).await?;
    assert_eq!(by_kind(&qdiscs, "netem").len(), 1);
    assert_eq!(by_kind(&qdiscs, "tbf").len(), 1);

    // Dropping the rate removes the child.
    let unlimited = ShapingConfig::new().delay(Duration::from_millis(1));
    t.net
        .set_egress_shaping(&red, ifindex, &unlimited, Delivery::Acked)
        .await?;
    let qdiscs = t.net.qdiscs(&red, ifindex).await?;
    assert_eq!(by_kind(&qdiscs, "netem").len(), 1);
    assert!(by_kind(&qdiscs, "tbf").is_empty());

    // And again, with nothing left to remove.
    t.net
        .set_egress_shaping(&red, ifindex, &unlimited, Delivery::Acked)
        .await?;

    Ok(())
}

#[tokio::test]
async fn test_queue_len() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = veth(&mut t).await?;

    t.net
        .set_egress_shaping(
            &red,
            ifindex,
            &ShapingConfig::new().queue_len(50),
            Delivery::Acked,
        )
        .await?;
    let qdiscs = t.net.qdiscs(&red, ifindex).await?;
    let qopt = by_kind(&qdiscs, "netem")[0].netem_qopt().expect("netem options");
    assert_eq!(qopt.limit, 50);

    t.net
        .set_egress_shaping(&red, ifindex, &ShapingConfig::new(), Delivery::Acked)
        .await?;
    let qdiscs = t.net.qdiscs(&red, ifindex).await?;
    let qopt = by_kind(&qdiscs, "netem")[0].netem_qopt().expect("netem options");
    assert_eq!(qopt.limit, 1000);

    Ok(())
}

#[tokio::test]
async fn test_invalid_shaping_sends_nothing() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let (red, _blue, ifindex) = veth(&mut t).await?;
    let before = red.requests_sent();

    for config in [
        ShapingConfig::new().loss(-0.1),
        ShapingConfig::new().loss(1.01),
        ShapingConfig::new().rate_mbit(f64::NAN),
        ShapingConfig::new().rate_mbit(-1.0),
    ] {
        let err = t
            .net
            .set_egress_shaping(&red, ifindex, &config, Delivery::Acked)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }
    assert_eq!(red.requests_sent(), before);

    Ok(())
}
