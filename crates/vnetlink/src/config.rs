//! Controller configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::namespace::NETNS_RUN_DIR;
use crate::netlink::{Error, Result};

/// Default deadline for acknowledged requests.
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for [`NetControl::init`](crate::NetControl::init).
///
/// ```
/// use std::time::Duration;
/// use vnetlink::NetConfig;
///
/// let config = NetConfig::new()
///     .namespace_prefix("/run/testbed/netns")
///     .ack_timeout(Duration::from_secs(2));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct NetConfig {
    /// Directory where named namespaces are published.
    pub namespace_prefix: PathBuf,
    /// How long an acknowledged request waits for the kernel.
    pub ack_timeout: Duration,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            namespace_prefix: PathBuf::from(NETNS_RUN_DIR),
            ack_timeout: DEFAULT_ACK_TIMEOUT,
        }
    }
}

impl NetConfig {
    /// Defaults: `/var/run/netns`, 5 second acknowledgment timeout.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn namespace_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.namespace_prefix = prefix.into();
        self
    }

    pub fn ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }

    /// Reject settings no namespace path could be built from.
    ///
    /// The prefix plus a maximal namespace name must stay below `PATH_MAX`.
    pub fn validate(&self) -> Result<()> {
        let prefix = self.namespace_prefix.as_os_str();
        if prefix.is_empty() {
            return Err(Error::InvalidConfig("namespace prefix is empty".into()));
        }
        if prefix.as_encoded_bytes().contains(&0) {
            return Err(Error::InvalidConfig(
                "namespace prefix contains NUL".into(),
            ));
        }
        // "/" plus a 255 byte name plus the terminating NUL.
        if prefix.len() + 257 > libc::PATH_MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "namespace prefix too long ({} bytes)",
                prefix.len()
            )));
        }
        if self.ack_timeout.is_zero() {
            return Err(Error::InvalidConfig("ack timeout must be positive".into()));
        }
        Ok(())
    }
}
