//! Named network namespaces.
//!
//! Namespaces are published the way `ip netns` does it: an empty file
//! under the registry directory (`/var/run/netns` by default) with the
//! namespace bind-mounted on top. The file keeps the namespace alive after
//! every process left it, and any tool that knows the name can enter it.
//!
//! `setns(2)` and `unshare(2)` act on the calling thread only. Everything
//! here assumes the thread that owns the [`NamespaceManager`] is the only
//! one issuing requests, which is what a current-thread tokio runtime
//! gives you.

use std::ffi::CString;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::marker::PhantomData;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::MetadataExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::netlink::{Error, Result, Transport};

/// Default registry directory, shared with iproute2.
pub const NETNS_RUN_DIR: &str = "/var/run/netns";

/// Namespace file of the calling thread.
const THREAD_NETNS: &str = "/proc/thread-self/ns/net";

/// Namespace of the PID namespace's init process.
const PID_DEFAULT_NETNS: &str = "/proc/1/ns/net";

/// Maximum namespace name length.
const MAX_NAME_LEN: usize = 255;

/// The namespace the owning thread currently operates in.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActiveNamespace {
    /// The namespace the thread was in when the manager was created.
    #[default]
    Initial,
    /// The default namespace of the PID namespace (`/proc/1/ns/net`).
    PidDefault,
    /// A namespace published in the registry.
    Named(String),
    /// A namespace without a registry entry: either its entry was deleted
    /// while active, or a create failed after `unshare`.
    Unpublished,
}

impl ActiveNamespace {
    /// The registry name, if the active namespace has one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for ActiveNamespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initial => f.write_str("initial namespace"),
            Self::PidDefault => f.write_str("pid default namespace"),
            Self::Named(name) => write!(f, "namespace {name}"),
            Self::Unpublished => f.write_str("unpublished namespace"),
        }
    }
}

/// A failed open, with the namespace the thread ended up in.
///
/// Open may fail after the thread already left the caller's namespace, so
/// `active` is not necessarily what it was before the call. Switch to a
/// known namespace before issuing further requests.
#[derive(Debug, thiserror::Error)]
#[error("cannot open namespace {name}: {source} (now in {active})")]
pub struct OpenError {
    /// The namespace name passed to open.
    pub name: String,
    /// What went wrong.
    #[source]
    pub source: Error,
    /// The active namespace after the failure.
    pub active: ActiveNamespace,
}

/// A handle to a network namespace.
///
/// Holds the namespace file open, which pins the namespace, and a netlink
/// transport created inside it. Dropping the handle closes both; it never
/// deletes the namespace and never changes the active namespace.
#[derive(Debug)]
pub struct NamespaceContext {
    identity: ActiveNamespace,
    file: File,
    transport: Transport,
    _not_send: PhantomData<*const ()>,
}

impl NamespaceContext {
    /// Bind a context to the calling thread's current namespace.
    pub(crate) fn current(timeout: Duration) -> Result<Self> {
        let file = File::open(THREAD_NETNS)?;
        let transport = Transport::new(timeout)?;
        Ok(Self::from_parts(ActiveNamespace::Initial, file, transport))
    }

    fn from_parts(identity: ActiveNamespace, file: File, transport: Transport) -> Self {
        Self {
            identity,
            file,
            transport,
            _not_send: PhantomData,
        }
    }

    /// The registry name; `None` for the initial namespace.
    pub fn name(&self) -> Option<&str> {
        self.identity.name()
    }

    /// The identity recorded when the context was opened.
    ///
    /// This is not updated when the registry entry is deleted or re-created
    /// afterwards. [`NamespaceManager::switch`] checks the registry and
    /// reports such a context as [`ActiveNamespace::Unpublished`].
    pub fn identity(&self) -> &ActiveNamespace {
        &self.identity
    }

    /// The netlink transport scoped to this namespace.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Requests sent through this context so far.
    pub fn requests_sent(&self) -> u64 {
        self.transport.requests_sent()
    }
}

impl AsRawFd for NamespaceContext {
    /// The namespace file descriptor (not the netlink socket).
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

/// Check a namespace name before it becomes a registry path.
pub fn validate_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        "namespace name cannot be empty"
    } else if name.len() > MAX_NAME_LEN {
        "namespace name too long"
    } else if name.contains('/') || name.contains('\0') {
        "namespace name cannot contain '/' or NUL"
    } else if name == "." || name == ".." {
        "invalid namespace name"
    } else {
        return Ok(());
    };

    Err(Error::InvalidName {
        name: name.to_string(),
        reason,
    })
}

/// Registry of named namespaces plus the active-namespace state.
#[derive(Debug)]
pub struct NamespaceManager {
    dir: PathBuf,
    timeout: Duration,
    active: ActiveNamespace,
}

impl NamespaceManager {
    /// Manage namespaces published under `dir`.
    ///
    /// `timeout` bounds acknowledgments on the transports of opened contexts.
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout,
            active: ActiveNamespace::Initial,
        }
    }

    /// The namespace the thread currently operates in.
    pub fn active(&self) -> &ActiveNamespace {
        &self.active
    }

    /// Registry path of `name`.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Whether `name` has a registry entry.
    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.path(name).exists()
    }

    /// Names of all registered namespaces, sorted.
    ///
    /// A missing registry directory is an empty registry.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Open `name`, creating it unless it is already registered.
    ///
    /// With `exclusive`, an existing entry is an error and the thread stays
    /// where it was. Without it, an existing namespace is entered and bound
    /// to a new context.
    ///
    /// On success the active namespace is `name`. On failure the returned
    /// [`OpenError`] reports where the thread ended up.
    pub fn open(
        &mut self,
        name: &str,
        exclusive: bool,
    ) -> std::result::Result<NamespaceContext, OpenError> {
        let result = self.open_inner(name, exclusive);
        result.map_err(|source| {
            warn!(namespace = name, active = %self.active, error = %source, "namespace open failed");
            OpenError {
                name: name.to_string(),
                source,
                active: self.active.clone(),
            }
        })
    }

    fn open_inner(&mut self, name: &str, exclusive: bool) -> Result<NamespaceContext> {
        validate_name(name)?;
        let path = self.path(name);

        if path.exists() {
            if exclusive {
                return Err(Error::NamespaceExists {
                    name: name.to_string(),
                });
            }
            return self.attach(name, &path);
        }

        self.create(name, &path)
    }

    fn attach(&mut self, name: &str, path: &Path) -> Result<NamespaceContext> {
        let file = File::open(path)?;
        enter(&file)?;
        self.active = ActiveNamespace::Named(name.to_string());
        debug!(namespace = name, "attached to existing namespace");

        let transport = Transport::new(self.timeout)?;
        Ok(NamespaceContext::from_parts(
            self.active.clone(),
            file,
            transport,
        ))
    }

    fn create(&mut self, name: &str, path: &Path) -> Result<NamespaceContext> {
        self.ensure_dir()?;

        // The mount point must exist before the bind mount.
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .map_err(|e| {
                if e.kind() == io::ErrorKind::AlreadyExists {
                    Error::NamespaceExists {
                        name: name.to_string(),
                    }
                } else {
                    Error::Io(e)
                }
            })?;

        // SAFETY: unshare only detaches the calling thread from its network
        // namespace; no memory is involved.
        if unsafe { libc::unshare(libc::CLONE_NEWNET) } < 0 {
            let err = Error::last_os_error("unshare");
            let _ = fs::remove_file(path);
            return Err(err);
        }
        self.active = ActiveNamespace::Unpublished;

        if let Err(err) = bind_mount(Path::new(THREAD_NETNS), path) {
            let _ = fs::remove_file(path);
            return Err(err);
        }
        self.active = ActiveNamespace::Named(name.to_string());
        info!(namespace = name, "created network namespace");

        let file = File::open(path)?;
        let transport = Transport::new(self.timeout)?;
        Ok(NamespaceContext::from_parts(
            self.active.clone(),
            file,
            transport,
        ))
    }

    /// Create the registry directory and make it a shared mount point.
    ///
    /// Sharing lets mounts made here show up in other mount namespaces,
    /// as `ip netns` arranges. Failing to share only costs that visibility.
    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let dir = c_path(&self.dir)?;

        let mut bound = false;
        loop {
            // SAFETY: `dir` is a valid NUL-terminated path; the null source
            // and data pointers are accepted by a propagation-only mount.
            let ret = unsafe {
                libc::mount(
                    c"none".as_ptr(),
                    dir.as_ptr(),
                    c"none".as_ptr(),
                    libc::MS_SHARED | libc::MS_REC,
                    std::ptr::null(),
                )
            };
            if ret == 0 {
                return Ok(());
            }

            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINVAL) || bound {
                warn!(dir = %self.dir.display(), error = %err, "cannot make namespace directory shared");
                return Ok(());
            }

            // EINVAL: not a mount point yet. Bind it onto itself and retry.
            bind_mount(&self.dir, &self.dir)?;
            bound = true;
        }
    }

    /// Remove the registry entry of `name`.
    ///
    /// The namespace itself lives on while any process or open context
    /// still references it. Deleting the active namespace leaves the thread
    /// in it, now unpublished.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        validate_name(name)?;
        let path = self.path(name);
        if !path.exists() {
            return Err(Error::NamespaceNotFound {
                name: name.to_string(),
            });
        }

        let c = c_path(&path)?;
        // SAFETY: `c` is a valid NUL-terminated path. A failed unmount is
        // reported by remove_file below when the entry is still busy.
        if unsafe { libc::umount2(c.as_ptr(), libc::MNT_DETACH) } < 0 {
            debug!(namespace = name, error = %io::Error::last_os_error(), "umount2 failed");
        }
        fs::remove_file(&path)?;

        if self.active.name() == Some(name) {
            warn!(namespace = name, "deleted the active namespace; it stays active unpublished");
            self.active = ActiveNamespace::Unpublished;
        }
        info!(namespace = name, "deleted network namespace");
        Ok(())
    }

    /// Switch the thread into `ctx`'s namespace, or into the PID default
    /// namespace when `ctx` is `None`.
    ///
    /// The active namespace only changes on success. A context whose name
    /// no longer publishes its namespace (deleted, or re-created as a
    /// different namespace) makes the active namespace `Unpublished`.
    pub fn switch(&mut self, ctx: Option<&NamespaceContext>) -> Result<()> {
        let target = match ctx {
            Some(ctx) => {
                enter(&ctx.file)?;
                self.published_identity(ctx)
            }
            None => {
                let file = File::open(PID_DEFAULT_NETNS)?;
                enter(&file)?;
                ActiveNamespace::PidDefault
            }
        };

        debug!(from = %self.active, to = %target, "switched namespace");
        self.active = target;
        Ok(())
    }

    fn published_identity(&self, ctx: &NamespaceContext) -> ActiveNamespace {
        let ActiveNamespace::Named(name) = &ctx.identity else {
            return ctx.identity.clone();
        };
        if same_inode(&ctx.file, &self.path(name)) {
            ctx.identity.clone()
        } else {
            debug!(namespace = %name, "context outlived its registry entry");
            ActiveNamespace::Unpublished
        }
    }
}

/// Whether `path` currently resolves to the namespace held open by `file`.
fn same_inode(file: &File, path: &Path) -> bool {
    match (file.metadata(), fs::metadata(path)) {
        (Ok(held), Ok(published)) => held.dev() == published.dev() && held.ino() == published.ino(),
        _ => false,
    }
}

/// `setns` the calling thread into the namespace behind `file`.
fn enter(file: &File) -> Result<()> {
    // SAFETY: the fd belongs to an open namespace file and CLONE_NEWNET
    // restricts the call to network namespaces.
    if unsafe { libc::setns(file.as_raw_fd(), libc::CLONE_NEWNET) } < 0 {
        return Err(Error::last_os_error("setns"));
    }
    Ok(())
}

fn bind_mount(source: &Path, target: &Path) -> Result<()> {
    let src = c_path(source)?;
    let dst = c_path(target)?;
    // SAFETY: both paths are valid NUL-terminated strings; a bind mount
    // ignores the filesystem type and data arguments.
    let ret = unsafe {
        libc::mount(
            src.as_ptr(),
            dst.as_ptr(),
            c"none".as_ptr(),
            libc::MS_BIND | libc::MS_REC,
            std::ptr::null(),
        )
    };
    if ret < 0 {
        return Err(Error::last_os_error("mount"));
    }
    Ok(())
}

fn c_path(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| Error::InvalidConfig(format!("path contains NUL: {}", path.display())))
}
