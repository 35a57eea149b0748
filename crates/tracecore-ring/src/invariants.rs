//! Debug-only invariant checks for the ring buffer protocol. Compiled out
//! entirely in release builds; never used for control flow.

/// `0 <= tail - head <= capacity` must hold after every producer or consumer step.
macro_rules! debug_assert_bounded_count {
    ($head:expr, $tail:expr, $capacity:expr) => {
        #[cfg(debug_assertions)]
        {
            let count = ($tail).wrapping_sub($head);
            debug_assert!(
                count as usize <= $capacity,
                "ring count {} exceeds capacity {}",
                count,
                $capacity
            );
        }
    };
}

/// Consumer's view of `head` must never run past the producer's `tail`.
macro_rules! debug_assert_head_not_past_tail {
    ($head:expr, $tail:expr) => {
        #[cfg(debug_assertions)]
        {
            debug_assert!(
                ($tail).wrapping_sub($head) as i64 >= 0,
                "head {} has passed tail {}",
                $head,
                $tail
            );
        }
    };
}

/// Sequence numbers only move forward; `new >= old` for whichever side owns them.
macro_rules! debug_assert_monotonic {
    ($old:expr, $new:expr) => {
        #[cfg(debug_assertions)]
        {
            debug_assert!($new >= $old, "sequence number regressed: {} -> {}", $old, $new);
        }
    };
}

/// A reservation must never straddle the ring's wraparound boundary.
macro_rules! debug_assert_no_wrap {
    ($idx:expr, $len:expr, $capacity:expr) => {
        #[cfg(debug_assertions)]
        {
            debug_assert!(
                $idx + $len <= $capacity,
                "reservation [{}, {}) crosses ring boundary {}",
                $idx,
                $idx + $len,
                $capacity
            );
        }
    };
}

/// A slot read via `assume_init` must fall strictly within `[head, tail)`.
macro_rules! debug_assert_initialized_read {
    ($pos:expr, $head:expr, $tail:expr) => {
        #[cfg(debug_assertions)]
        {
            let pos_off = ($pos).wrapping_sub($head);
            let span = ($tail).wrapping_sub($head);
            debug_assert!(
                pos_off < span,
                "read at {} outside initialized window [{}, {})",
                $pos,
                $head,
                $tail
            );
        }
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_initialized_read;
pub(crate) use debug_assert_monotonic;
pub(crate) use debug_assert_no_wrap;
