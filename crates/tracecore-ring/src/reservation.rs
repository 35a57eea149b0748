use crate::Ring;
use std::mem::MaybeUninit;

/// Zero-copy handle into a producer-reserved span of ring slots. Write into
/// the slice, then call [`Reservation::commit`] to publish the records to
/// the consumer.
///
/// A reservation may hold fewer than the requested `n` items if the request
/// would have wrapped past the end of the buffer; always check
/// `as_mut_slice().len()`.
pub struct Reservation<'a, T> {
    slice: &'a mut [MaybeUninit<T>],
    ring_ptr: *const Ring<T>,
    len: usize,
}

impl<'a, T> Reservation<'a, T> {
    pub(crate) fn new(slice: &'a mut [MaybeUninit<T>], ring_ptr: *const Ring<T>) -> Self {
        let len = slice.len();
        Self { slice, ring_ptr, len }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [MaybeUninit<T>] {
        self.slice
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Commits every reserved slot.
    pub fn commit(self) {
        let len = self.len;
        self.commit_n(len);
    }

    /// Commits `n` of the reserved slots.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the number of reserved slots.
    pub fn commit_n(self, n: usize) {
        assert!(n <= self.len, "cannot commit more than reserved");
        // SAFETY: ring_ptr was derived from a live `&Ring<T>` in `Ring::reserve`,
        // which outlives this reservation (it is the referent of the slice's
        // lifetime `'a`).
        unsafe {
            let ring = &*self.ring_ptr;
            ring.commit_internal(n);
        }
    }
}
