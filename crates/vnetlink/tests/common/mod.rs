//! Common test utilities for integration tests.
//!
//! Only one `NetControl` may exist per process, so every test takes the
//! `TestNet` lock for its whole run. Namespaces opened through `TestNet`
//! are deleted when it drops.

use std::process::Command;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use vnetlink::{NamespaceContext, NetConfig, NetControl, Result};

/// Serializes tests; each one owns the process-wide controller.
static SERIAL: Mutex<()> = Mutex::new(());

/// Global counter for unique namespace names.
static NAMESPACE_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Generate a unique namespace name for this test.
pub fn unique_ns_name(prefix: &str) -> String {
    let id = NAMESPACE_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("vnl-{}-{}-{}", prefix, std::process::id(), id)
}

/// A controller plus the namespaces a test created.
pub struct TestNet {
    // Declared first so it drops before the lock is released.
    pub net: NetControl,
    created: Vec<String>,
    _serial: MutexGuard<'static, ()>,
}

impl TestNet {
    pub fn new() -> Result<Self> {
        let serial = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        let net = NetControl::init(NetConfig::default())?;
        Ok(Self {
            net,
            created: Vec::new(),
            _serial: serial,
        })
    }

    /// Create a fresh namespace named after `prefix`; the thread switches
    /// into it.
    pub fn open(&mut self, prefix: &str) -> Result<NamespaceContext> {
        let name = unique_ns_name(prefix);
        let ctx = self.net.open_namespace(&name, true)?;
        self.created.push(name);
        Ok(ctx)
    }

    /// Name of the `n`th namespace opened through [`TestNet::open`].
    #[allow(dead_code)]
    pub fn name(&self, n: usize) -> &str {
        &self.created[n]
    }
}

impl Drop for TestNet {
    fn drop(&mut self) {
        let _ = self.net.switch_to_initial();
        for name in &self.created {
            let _ = self.net.delete_namespace(name);
        }
    }
}

/// Run `ip` inside the registered namespace `ns` and return stdout.
#[allow(dead_code)]
pub fn ip_in(ns: &str, args: &[&str]) -> String {
    let output = Command::new("ip")
        .args(["netns", "exec", ns, "ip"])
        .args(args)
        .output()
        .expect("failed to run ip");
    assert!(
        output.status.success(),
        "ip {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Link flags from `ip -o link show` output, e.g. `["BROADCAST", "UP"]`.
#[allow(dead_code)]
pub fn link_flags(ip_output: &str) -> Vec<String> {
    let Some(start) = ip_output.find('<') else {
        return Vec::new();
    };
    let Some(end) = ip_output[start..].find('>') else {
        return Vec::new();
    };
    ip_output[start + 1..start + end]
        .split(',')
        .map(str::to_string)
        .collect()
}

/// Check if running as root.
pub fn is_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

/// Skip the test if not running as root.
///
/// Use this at the beginning of integration tests that require root privileges.
#[macro_export]
macro_rules! require_root {
    () => {
        if !crate::common::is_root() {
            eprintln!("Skipping test: requires root");
            return Ok(());
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ns_name() {
        let name1 = unique_ns_name("test");
        let name2 = unique_ns_name("test");
        assert_ne!(name1, name2);
        assert!(name1.starts_with("vnl-test-"));
    }

    #[test]
    fn test_link_flags() {
        let line = "4: red0@if5: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500";
        assert_eq!(link_flags(line), ["BROADCAST", "MULTICAST", "UP", "LOWER_UP"]);
        assert!(link_flags("garbage").is_empty());
    }
}
