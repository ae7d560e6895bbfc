//! Egress shaping: a netem root qdisc with an optional tbf child.
//!
//! ```text
//! root ── 1: netem (delay, jitter, loss, queue limit)
//!           └── 1:1 ── 10: tbf (rate)      only when rate_mbit > 0
//! ```
//!
//! The netem stage is always installed so the tbf stage has a fixed parent.
//! Applying a new [`ShapingConfig`] replaces both stages in place: netem is
//! replaced at `1:`, tbf is replaced at `10:` or deleted when the new
//! configuration has no rate limit.

use std::time::Duration;

use crate::netlink::builder::MessageBuilder;
use crate::netlink::tc::{QdiscConfig, QdiscPlacement};
use crate::netlink::types::tc::{
    TC_H_ROOT, TcRateSpec, netem, ns_to_ticks,
    tbf::{self, TcTbfQopt},
    tc_handle,
};
use crate::netlink::{Error, Result};
use crate::util::rate::{mbit_to_bytes, xmit_time_ns};

/// Handle of the netem root qdisc (`1:`).
pub const NETEM_HANDLE: u32 = tc_handle(1, 0);
/// The netem class the tbf stage hangs off (`1:1`).
pub const NETEM_CLASS: u32 = tc_handle(1, 1);
/// Handle of the tbf child qdisc (`10:`).
pub const TBF_HANDLE: u32 = tc_handle(10, 0);

/// Smallest token bucket, enough for one full-size frame plus headroom.
const MIN_BURST: u64 = 1600;

/// Shaping parameters for one interface.
///
/// ```
/// use std::time::Duration;
/// use vnetlink::shaping::ShapingConfig;
///
/// let config = ShapingConfig::new()
///     .delay(Duration::from_millis(20))
///     .loss(0.01)
///     .rate_mbit(5.0);
/// let plan = config.plan().unwrap();
/// assert!(plan.rate.is_some());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ShapingConfig {
    /// Fixed added delay.
    pub delay: Duration,
    /// Random deviation around `delay`.
    pub jitter: Duration,
    /// Loss probability, 0.0 to 1.0.
    pub loss: f64,
    /// Rate limit in Mbit/s; 0.0 means unlimited.
    pub rate_mbit: f64,
    /// Queue limit in packets; 0 keeps the default.
    pub queue_len: u32,
}

impl ShapingConfig {
    /// No delay, no loss, no rate limit, default queue.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn loss(mut self, loss: f64) -> Self {
        self.loss = loss;
        self
    }

    pub fn rate_mbit(mut self, rate_mbit: f64) -> Self {
        self.rate_mbit = rate_mbit;
        self
    }

    pub fn queue_len(mut self, packets: u32) -> Self {
        self.queue_len = packets;
        self
    }

    /// Check ranges without touching the kernel.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.loss) {
            return Err(Error::InvalidShaping(format!(
                "loss {} outside 0.0-1.0",
                self.loss
            )));
        }
        if !self.rate_mbit.is_finite() || self.rate_mbit < 0.0 {
            return Err(Error::InvalidShaping(format!(
                "rate {} Mbit/s is not a finite non-negative number",
                self.rate_mbit
            )));
        }
        if self.rate_mbit > 0.0 && mbit_to_bytes(self.rate_mbit) == 0 {
            return Err(Error::InvalidShaping(format!(
                "rate {} Mbit/s is below one byte per second",
                self.rate_mbit
            )));
        }
        Ok(())
    }

    /// Translate into the qdisc chain to install.
    pub fn plan(&self) -> Result<ShapingPlan> {
        self.validate()?;

        let netem = NetemStage {
            latency: self.delay,
            jitter: self.jitter,
            loss: self.loss,
            limit: (self.queue_len > 0).then_some(self.queue_len),
        };

        let rate = (self.rate_mbit > 0.0).then(|| TbfStage::new(mbit_to_bytes(self.rate_mbit)));

        Ok(ShapingPlan { netem, rate })
    }
}

/// The qdisc chain for one [`ShapingConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ShapingPlan {
    /// Root stage.
    pub netem: NetemStage,
    /// Rate stage; `None` removes any existing one.
    pub rate: Option<TbfStage>,
}

impl ShapingPlan {
    /// Where the netem root goes on `ifindex`.
    pub fn netem_placement(ifindex: u32) -> QdiscPlacement {
        QdiscPlacement {
            ifindex,
            parent: TC_H_ROOT,
            handle: NETEM_HANDLE,
        }
    }

    /// Where the tbf child goes on `ifindex`.
    pub fn rate_placement(ifindex: u32) -> QdiscPlacement {
        QdiscPlacement {
            ifindex,
            parent: NETEM_CLASS,
            handle: TBF_HANDLE,
        }
    }
}

/// Delay/jitter/loss emulation stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetemStage {
    pub latency: Duration,
    pub jitter: Duration,
    pub loss: f64,
    /// Queue limit in packets. `None` leaves the limit at tc's default.
    pub limit: Option<u32>,
}

impl NetemStage {
    fn qopt(&self) -> netem::TcNetemQopt {
        netem::TcNetemQopt {
            latency: ns_to_ticks(duration_ns(self.latency)),
            // The struct has no "unset" value; write what tc would.
            limit: self.limit.unwrap_or(netem::DEFAULT_LIMIT),
            loss: netem::prob_to_u32(self.loss),
            gap: 0,
            duplicate: 0,
            jitter: ns_to_ticks(duration_ns(self.jitter)),
        }
    }
}

impl QdiscConfig for NetemStage {
    fn kind(&self) -> &'static str {
        "netem"
    }

    fn write_options(&self, builder: &mut MessageBuilder) -> Result<()> {
        builder.append(&self.qopt());
        // Exact values; the ticks in the base struct lose precision.
        builder.append_attr_i64(netem::TCA_NETEM_LATENCY64, duration_ns(self.latency) as i64);
        builder.append_attr_i64(netem::TCA_NETEM_JITTER64, duration_ns(self.jitter) as i64);
        Ok(())
    }

    fn nested_options(&self) -> bool {
        false
    }
}

/// Token bucket rate stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TbfStage {
    /// Rate in bytes per second.
    pub rate: u64,
    /// Bucket size in bytes.
    pub burst: u32,
    /// Queue limit in bytes.
    pub limit: u32,
}

impl TbfStage {
    /// Size the bucket for 4 ms of traffic and the queue for another 50 ms.
    pub fn new(rate: u64) -> Self {
        let burst = (rate / 250).max(MIN_BURST);
        let limit = burst.saturating_add(rate / 20);
        Self {
            rate,
            burst: burst.min(u32::MAX as u64) as u32,
            limit: limit.min(u32::MAX as u64) as u32,
        }
    }
}

impl QdiscConfig for TbfStage {
    fn kind(&self) -> &'static str {
        "tbf"
    }

    fn write_options(&self, builder: &mut MessageBuilder) -> Result<()> {
        let qopt = TcTbfQopt {
            rate: TcRateSpec::ethernet(self.rate),
            peakrate: TcRateSpec::default(),
            limit: self.limit,
            buffer: ns_to_ticks(xmit_time_ns(self.burst as u64, self.rate)),
            mtu: 0,
        };
        builder.append_attr(tbf::TCA_TBF_PARMS, zerocopy::IntoBytes::as_bytes(&qopt));

        if self.rate > u32::MAX as u64 {
            builder.append_attr_u64(tbf::TCA_TBF_RATE64, self.rate);
        }
        builder.append_attr_u32(tbf::TCA_TBF_BURST, self.burst);
        Ok(())
    }
}

fn duration_ns(d: Duration) -> u64 {
    d.as_nanos().min(i64::MAX as u128) as u64
}
