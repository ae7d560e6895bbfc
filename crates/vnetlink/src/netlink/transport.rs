//! Request/acknowledge plumbing over a [`NetlinkSocket`].
//!
//! A [`Transport`] stamps each outgoing message with the socket's next
//! sequence number and port id, sends it, and, depending on [`Delivery`],
//! waits for the kernel's ACK or ERROR carrying that sequence number.
//! Replies to other sequence numbers are dropped: they are late errors of
//! fire-and-forget requests or leftovers of an earlier timed-out request.
//! Whatever is still queued is discarded before each new request, so those
//! replies never accumulate in the socket's receive buffer.

use std::cell::Cell;
use std::os::unix::io::{AsRawFd, RawFd};
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::builder::MessageBuilder;
use super::error::{Error, Result};
use super::message::{MessageIter, NlMsgError, NlMsgType};
use super::socket::NetlinkSocket;

/// Whether a request waits for the kernel's verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delivery {
    /// Set `NLM_F_ACK` and wait for the ACK or ERROR reply.
    #[default]
    Acked,
    /// Send without `NLM_F_ACK` and return as soon as the kernel took the
    /// message. Kernel-side failures are not reported.
    FireAndForget,
}

impl Delivery {
    /// Map a "wait for the kernel" flag to a delivery mode.
    pub fn from_sync(sync: bool) -> Self {
        if sync {
            Self::Acked
        } else {
            Self::FireAndForget
        }
    }

    fn is_acked(self) -> bool {
        self == Self::Acked
    }
}

/// Netlink transport bound to one namespace.
#[derive(Debug)]
pub struct Transport {
    socket: NetlinkSocket,
    timeout: Duration,
    sent: Cell<u64>,
}

impl Transport {
    /// Open a route socket in the calling thread's current namespace.
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new()?,
            timeout,
            sent: Cell::new(0),
        })
    }

    /// Number of requests handed to the kernel through this transport.
    pub fn requests_sent(&self) -> u64 {
        self.sent.get()
    }

    /// Send a request, optionally waiting for its acknowledgment.
    pub async fn send(&self, mut builder: MessageBuilder, delivery: Delivery) -> Result<()> {
        builder.set_ack(delivery.is_acked());
        let seq = self.transmit(builder).await?;

        match delivery {
            Delivery::FireAndForget => Ok(()),
            Delivery::Acked => self.await_reply(seq, |data| find_ack(data, seq)).await,
        }
    }

    /// Send a query and return the payload of the matching reply of type `reply_type`.
    pub async fn request(&self, builder: MessageBuilder, reply_type: u16) -> Result<Vec<u8>> {
        // No NLM_F_ACK: the kernel answers with data on success and ERROR on failure.
        let seq = self.transmit(builder).await?;
        self.await_reply(seq, |data| find_reply(data, seq, reply_type))
            .await
    }

    /// Send a dump request and collect every payload of type `reply_type`.
    pub async fn dump(&self, builder: MessageBuilder, reply_type: u16) -> Result<Vec<Vec<u8>>> {
        let seq = self.transmit(builder).await?;
        let mut payloads = Vec::new();
        self.await_reply(seq, |data| collect_dump(data, seq, reply_type, &mut payloads))
            .await?;
        Ok(payloads)
    }

    async fn transmit(&self, mut builder: MessageBuilder) -> Result<u32> {
        self.discard_pending()?;

        let seq = self.socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());
        let msg_type = builder.msg_type();

        let msg = builder.finish();
        self.socket.send(&msg).await?;
        self.sent.set(self.sent.get() + 1);

        trace!(seq, msg_type, len = msg.len(), "netlink request sent");
        Ok(seq)
    }

    /// Drop every datagram already queued on the socket.
    fn discard_pending(&self) -> Result<()> {
        loop {
            match self.socket.try_recv_msg() {
                Ok(Some(data)) => log_discarded(&data),
                Ok(None) => return Ok(()),
                Err(e) if is_overrun(&e) => {
                    warn!("netlink receive buffer overran; late replies were lost");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Read datagrams until `scan` reports a verdict or the deadline passes.
    async fn await_reply<T>(
        &self,
        seq: u32,
        mut scan: impl FnMut(&[u8]) -> Option<Result<T>>,
    ) -> Result<T> {
        let wait = async {
            loop {
                let data = match self.socket.recv_msg().await {
                    Ok(data) => data,
                    // The kernel dropped some replies; ours may still come.
                    Err(e) if is_overrun(&e) => {
                        warn!(seq, "netlink receive buffer overran while awaiting reply");
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                if let Some(verdict) = scan(&data) {
                    return verdict;
                }
            }
        };

        tokio::time::timeout(self.timeout, wait)
            .await
            .map_err(|_| Error::Timeout {
                seq,
                timeout: self.timeout,
            })?
    }
}

impl AsRawFd for Transport {
    fn as_raw_fd(&self) -> RawFd {
        self.socket.as_raw_fd()
    }
}

fn is_overrun(err: &Error) -> bool {
    matches!(err, Error::Socket(e) if e.raw_os_error() == Some(libc::ENOBUFS))
}

fn log_discarded(data: &[u8]) {
    for (header, payload) in MessageIter::new(data).map_while(|r| r.ok()) {
        let errno = if header.is_error() {
            NlMsgError::from_bytes(payload).ok().map(|e| -e.error)
        } else {
            None
        };
        debug!(
            seq = header.nlmsg_seq,
            msg_type = header.nlmsg_type,
            ?errno,
            "discarding late netlink reply"
        );
    }
}

fn skip_stale(msg_seq: u32, seq: u32, msg_type: u16) {
    debug!(
        seq = msg_seq,
        awaiting = seq,
        msg_type,
        "discarding netlink message for another request"
    );
}

fn kernel_verdict(payload: &[u8]) -> Result<()> {
    let err = NlMsgError::from_bytes(payload)?;
    if err.is_ack() {
        Ok(())
    } else {
        Err(Error::from_errno(err.error))
    }
}

/// Scan one datagram for the ACK/ERROR of request `seq`.
///
/// Returns `None` when the datagram holds nothing for `seq`.
pub(crate) fn find_ack(data: &[u8], seq: u32) -> Option<Result<()>> {
    for result in MessageIter::new(data) {
        let (header, payload) = match result {
            Ok(msg) => msg,
            Err(e) => return Some(Err(e)),
        };

        if header.nlmsg_seq != seq {
            skip_stale(header.nlmsg_seq, seq, header.nlmsg_type);
            continue;
        }

        if !header.is_error() {
            return Some(Err(Error::UnexpectedResponse {
                seq,
                msg_type: header.nlmsg_type,
            }));
        }

        return Some(kernel_verdict(payload));
    }
    None
}

/// Scan one datagram for the data reply to query `seq`.
pub(crate) fn find_reply(data: &[u8], seq: u32, reply_type: u16) -> Option<Result<Vec<u8>>> {
    for result in MessageIter::new(data) {
        let (header, payload) = match result {
            Ok(msg) => msg,
            Err(e) => return Some(Err(e)),
        };

        if header.nlmsg_seq != seq {
            skip_stale(header.nlmsg_seq, seq, header.nlmsg_type);
            continue;
        }

        if header.nlmsg_type == reply_type {
            return Some(Ok(payload.to_vec()));
        }

        return Some(match header.nlmsg_type {
            NlMsgType::ERROR => kernel_verdict(payload).and(Err(Error::UnexpectedResponse {
                seq,
                msg_type: NlMsgType::ERROR,
            })),
            other => Err(Error::UnexpectedResponse {
                seq,
                msg_type: other,
            }),
        });
    }
    None
}

/// Collect dump payloads from one datagram.
///
/// Returns `Some(Ok(()))` once `NLMSG_DONE` for `seq` is seen.
pub(crate) fn collect_dump(
    data: &[u8],
    seq: u32,
    reply_type: u16,
    out: &mut Vec<Vec<u8>>,
) -> Option<Result<()>> {
    for result in MessageIter::new(data) {
        let (header, payload) = match result {
            Ok(msg) => msg,
            Err(e) => return Some(Err(e)),
        };

        if header.nlmsg_seq != seq {
            skip_stale(header.nlmsg_seq, seq, header.nlmsg_type);
            continue;
        }

        match header.nlmsg_type {
            NlMsgType::DONE => return Some(Ok(())),
            NlMsgType::ERROR => {
                if let Err(e) = kernel_verdict(payload) {
                    return Some(Err(e));
                }
            }
            NlMsgType::NOOP => {}
            t if t == reply_type => out.push(payload.to_vec()),
            other => {
                return Some(Err(Error::UnexpectedResponse {
                    seq,
                    msg_type: other,
                }));
            }
        }
    }
    None
}
