//! The genlock: a monotonic, cross-process-comparable nanosecond clock.
//!
//! `std::time::Instant` is explicitly *not* guaranteed comparable across
//! processes on every platform. `CLOCK_MONOTONIC` is the same clock source
//! for every process on the machine, which is the one property every
//! cross-thread ordering decision in this system relies on.

/// Returns the current `CLOCK_MONOTONIC` time in nanoseconds.
pub fn monotonic_now_ns() -> u64 {
    let mut ts = libc::timespec { tv_sec: 0, tv_nsec: 0 };
    // SAFETY: `ts` is a valid, exclusively-owned stack timespec; CLOCK_MONOTONIC
    // is supported on every platform this crate targets.
    let rc = unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    assert_eq!(rc, 0, "clock_gettime(CLOCK_MONOTONIC) failed");
    ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic_across_consecutive_calls() {
        let a = monotonic_now_ns();
        let b = monotonic_now_ns();
        assert!(b >= a);
    }
}
