//! Rate conversion utilities.
//!
//! ```
//! use vnetlink::util::rate;
//!
//! assert_eq!(rate::mbit_to_bytes(1.0), 125_000);
//! assert_eq!(rate::mbit_to_bytes(0.5), 62_500);
//! ```

/// Convert megabits per second to bytes per second.
///
/// Fractional megabits are kept; the result is rounded down.
#[inline]
pub fn mbit_to_bytes(mbit: f64) -> u64 {
    (mbit * 1_000_000.0 / 8.0) as u64
}

/// Nanoseconds needed to send `size` bytes at `bytes_per_sec`.
///
/// Returns `u64::MAX` for a zero rate.
pub fn xmit_time_ns(size: u64, bytes_per_sec: u64) -> u64 {
    if bytes_per_sec == 0 {
        return u64::MAX;
    }
    let ns = size as u128 * 1_000_000_000 / bytes_per_sec as u128;
    ns.min(u64::MAX as u128) as u64
}
