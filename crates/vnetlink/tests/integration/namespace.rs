//! Namespace lifecycle integration tests.

use vnetlink::{ActiveNamespace, Error, Result};

use crate::common::{TestNet, unique_ns_name};

#[tokio::test]
async fn test_open_switches_and_publishes() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let ctx = t.open("open")?;
    let name = t.name(0).to_string();

    assert_eq!(ctx.name(), Some(name.as_str()));
    assert_eq!(
        t.net.active_namespace(),
        &ActiveNamespace::Named(name.clone())
    );
    assert!(t.net.namespace_exists(&name));
    assert!(t.net.list_namespaces()?.contains(&name));

    Ok(())
}

#[tokio::test]
async fn test_exclusive_open_twice_fails() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let _ctx = t.open("excl")?;
    let name = t.name(0).to_string();

    let err = t.net.open_namespace(&name, true).unwrap_err();
    assert!(matches!(err.source, Error::NamespaceExists { .. }));
    // Still in the namespace the first open created.
    assert_eq!(err.active, ActiveNamespace::Named(name.clone()));
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::Named(name));

    Ok(())
}

#[tokio::test]
async fn test_close_keeps_namespace() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let ctx = t.open("close")?;
    let name = t.name(0).to_string();

    t.net.close_namespace(ctx);
    assert!(t.net.namespace_exists(&name));
    assert!(t.net.list_namespaces()?.contains(&name));
    assert_eq!(
        t.net.active_namespace(),
        &ActiveNamespace::Named(name.clone())
    );

    // Reopening without `exclusive` attaches to the same namespace.
    t.net.switch_to_initial()?;
    let again = t.net.open_namespace(&name, false)?;
    assert_eq!(again.name(), Some(name.as_str()));
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::Named(name));

    Ok(())
}

#[tokio::test]
async fn test_switch_between_contexts() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let red = t.open("swr")?;
    let blue = t.open("swb")?;
    let blue_name = t.name(1).to_string();
    assert_eq!(
        t.net.active_namespace(),
        &ActiveNamespace::Named(blue_name)
    );

    t.net.switch_namespace(Some(&red))?;
    assert_eq!(t.net.active_namespace(), red.identity());

    t.net.switch_namespace(None)?;
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::PidDefault);

    t.net.switch_namespace(Some(&blue))?;
    assert_eq!(t.net.active_namespace().name(), blue.name());

    t.net.switch_to_initial()?;
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::Initial);

    Ok(())
}

#[tokio::test]
async fn test_delete_active_unpublishes() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let ctx = t.open("del")?;
    let name = t.name(0).to_string();

    t.net.delete_namespace(&name)?;
    assert!(!t.net.namespace_exists(&name));
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::Unpublished);

    // The context still pins the namespace and can be used.
    let lo = t.net.interface_index(&ctx, "lo").await?;
    assert_eq!(lo, 1);

    let err = t.net.delete_namespace(&name).unwrap_err();
    assert!(matches!(err, Error::NamespaceNotFound { .. }));

    Ok(())
}

#[tokio::test]
async fn test_switch_to_context_of_deleted_name() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let old = t.open("stale")?;
    let name = t.name(0).to_string();

    t.net.delete_namespace(&name)?;
    t.net.switch_to_initial()?;
    t.net.switch_namespace(Some(&old))?;
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::Unpublished);

    // Same name, different namespace.
    t.net.switch_to_initial()?;
    let new = t.net.open_namespace(&name, true)?;
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::Named(name.clone()));

    t.net.switch_namespace(Some(&old))?;
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::Unpublished);
    t.net.switch_namespace(Some(&new))?;
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::Named(name));

    Ok(())
}

#[tokio::test]
async fn test_delete_unknown_is_not_found() -> Result<()> {
    require_root!();

    let mut t = TestNet::new()?;
    let err = t
        .net
        .delete_namespace(&unique_ns_name("ghost"))
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(t.net.active_namespace(), &ActiveNamespace::Initial);

    Ok(())
}
