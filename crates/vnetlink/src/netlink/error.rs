//! Error types for netlink, namespace and shaping operations.

use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::namespace::OpenError;

/// Result type for vnetlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`].
///
/// Callers use this to tell "the kernel rejected the request" apart from
/// "we do not know what the kernel did".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed caller input; no request reached the kernel.
    Validation,
    /// Socket failure, timeout or undecodable response.
    Transport,
    /// The kernel answered with an error code.
    Kernel,
    /// A syscall or filesystem operation outside netlink failed.
    System,
}

/// Errors that can occur while configuring virtual networks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Netlink socket creation, send or receive failed.
    #[error("netlink socket error: {0}")]
    Socket(#[source] io::Error),

    /// No acknowledgment arrived in time.
    #[error("no response to request {seq} within {timeout:?}")]
    Timeout {
        /// Sequence number of the request.
        seq: u32,
        /// The configured deadline.
        timeout: Duration,
    },

    /// A response carried the awaited sequence number but was not the
    /// expected kind of message.
    #[error("unexpected response to request {seq}: message type {msg_type}")]
    UnexpectedResponse {
        /// Sequence number of the request.
        seq: u32,
        /// Netlink message type that arrived.
        msg_type: u16,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Kernel error with operation context.
    #[error("{operation}: {message} (errno {errno})")]
    KernelWithContext {
        /// The operation that failed.
        operation: String,
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Route destination has bits set outside its prefix.
    #[error("route destination {destination}/{prefix_len} has host bits set")]
    InvalidRoute {
        /// The destination as given.
        destination: Ipv4Addr,
        /// The prefix length as given.
        prefix_len: u8,
    },

    /// IPv4 prefix length above 32.
    #[error("invalid IPv4 prefix length: {0}")]
    InvalidPrefixLength(u8),

    /// Shaping parameters out of range.
    #[error("invalid shaping parameters: {0}")]
    InvalidShaping(String),

    /// Interface or namespace name rejected before use.
    #[error("invalid name '{name}': {reason}")]
    InvalidName {
        /// The offending name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// Configuration rejected during init.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error from filesystem operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A namespace or device syscall failed.
    #[error("{call} failed: {source}")]
    Syscall {
        /// The syscall, e.g. "setns".
        call: &'static str,
        /// The OS error.
        #[source]
        source: io::Error,
    },

    /// A namespace with that name is already registered.
    #[error("namespace already exists: {name}")]
    NamespaceExists {
        /// The namespace name.
        name: String,
    },

    /// Namespace not found.
    #[error("namespace not found: {name}")]
    NamespaceNotFound {
        /// The namespace name that was not found.
        name: String,
    },

    /// A second controller was requested while one is alive.
    #[error("network control is already initialized in this process")]
    AlreadyInitialized,

    /// Opening a namespace failed part way through.
    #[error(transparent)]
    Open(Box<OpenError>),
}

impl From<OpenError> for Error {
    fn from(err: OpenError) -> Self {
        Self::Open(Box::new(err))
    }
}

impl Error {
    /// Create a kernel error from a (negative) netlink error value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::Kernel {
            errno: -errno,
            message,
        }
    }

    /// Create a kernel error with operation context.
    pub fn from_errno_with_context(errno: i32, operation: impl Into<String>) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::KernelWithContext {
            operation: operation.into(),
            errno: -errno,
            message,
        }
    }

    /// Capture `errno` after a failed libc call.
    pub(crate) fn last_os_error(call: &'static str) -> Self {
        Self::Syscall {
            call,
            source: io::Error::last_os_error(),
        }
    }

    /// Add context to this error.
    ///
    /// Wraps kernel errors with operation context. Other errors are returned unchanged.
    pub fn with_context(self, operation: impl Into<String>) -> Self {
        match self {
            Self::Kernel { errno, message } => Self::KernelWithContext {
                operation: operation.into(),
                errno,
                message,
            },
            other => other,
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Socket(_)
            | Self::Timeout { .. }
            | Self::UnexpectedResponse { .. }
            | Self::Truncated { .. }
            | Self::InvalidMessage(_) => ErrorKind::Transport,
            Self::Kernel { .. } | Self::KernelWithContext { .. } => ErrorKind::Kernel,
            Self::InvalidRoute { .. }
            | Self::InvalidPrefixLength(_)
            | Self::InvalidShaping(_)
            | Self::InvalidName { .. }
            | Self::InvalidConfig(_) => ErrorKind::Validation,
            Self::Open(err) => err.source.kind(),
            Self::Io(_)
            | Self::Syscall { .. }
            | Self::NamespaceExists { .. }
            | Self::NamespaceNotFound { .. }
            | Self::AlreadyInitialized => ErrorKind::System,
        }
    }

    /// Check if this is a validation error.
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }

    /// Check if this is a transport error.
    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, etc.).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                matches!(*errno, libc::ENOENT | libc::ENODEV)
            }
            Self::Syscall { source, .. } => {
                matches!(source.raw_os_error(), Some(libc::ENOENT | libc::ENODEV))
            }
            Self::NamespaceNotFound { .. } => true,
            Self::Open(err) => err.source.is_not_found(),
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                matches!(*errno, libc::EPERM | libc::EACCES)
            }
            Self::Syscall { source, .. } => {
                matches!(source.raw_os_error(), Some(libc::EPERM | libc::EACCES))
            }
            Self::Io(e) | Self::Socket(e) => e.kind() == io::ErrorKind::PermissionDenied,
            Self::Open(err) => err.source.is_permission_denied(),
            _ => false,
        }
    }

    /// Check if this is an "already exists" error (EEXIST or a registered namespace).
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                *errno == libc::EEXIST
            }
            Self::NamespaceExists { .. } => true,
            Self::Open(err) => err.source.is_already_exists(),
            _ => false,
        }
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}
