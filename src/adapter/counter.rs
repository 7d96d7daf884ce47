//! Byte quota tracking between hardware reseeds.

/// Running total of bytes produced since the last hardware reseed.
///
/// The counter is owned by one adapter instance. It is reset only at
/// the start of a request, and only once the total has gone past the
/// maximum; it is never clamped to the maximum itself. Right after
/// [`record`](Self::record) the total lies in `[0, max + request]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteQuotaCounter {
    total: u64,
    max: u64,
}

impl ByteQuotaCounter {
    /// Creates a counter that starts a fresh cycle once `max` is exceeded.
    pub fn new(max: u64) -> Self {
        Self { total: 0, max }
    }

    /// Starts a request; returns true if a hardware reseed is due.
    ///
    /// A total above the maximum is reset to zero first, so a reseed is
    /// due on the first request of every cycle.
    pub fn begin_request(&mut self) -> bool {
        if self.total > self.max {
            self.total = 0;
        }
        self.total == 0
    }

    /// Adds a request's size to the running total.
    pub fn record(&mut self, len: usize) {
        self.total = self.total.saturating_add(len as u64);
    }

    /// Returns true if the total has gone past the maximum.
    pub fn exceeded(&self) -> bool {
        self.total > self.max
    }

    /// Returns the running total.
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Returns the per-reseed maximum.
    #[inline]
    pub fn max(&self) -> u64 {
        self.max
    }
}
