//! Bounded lock-free buffer for completed samples.
//!
//! The buffer is a single-producer/single-consumer queue: the acquisition
//! pass pushes, an observer drains. Pushes never block; a full buffer
//! rejects the sample and the caller decides what the loss means (the
//! array raises the sticky `OVERFLOW` status bit).

use crossbeam::queue::ArrayQueue;

/// Usable buffer slots. The device models a 16-slot hardware ring with one
/// slot reserved as the full/empty discriminator, so 15 samples fit.
pub const SAMPLE_BUFFER_SLOTS: usize = 15;

/// Lock-free FIFO of completed sensor samples.
#[derive(Debug)]
pub struct SampleBuffer {
    queue: ArrayQueue<i32>,
}

impl SampleBuffer {
    /// Create an empty buffer with [`SAMPLE_BUFFER_SLOTS`] capacity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: ArrayQueue::new(SAMPLE_BUFFER_SLOTS),
        }
    }

    /// Push a sample.
    ///
    /// # Errors
    ///
    /// Returns `Err(sample)` when the buffer is full; the sample is not
    /// stored.
    #[inline]
    pub fn push(&self, sample: i32) -> Result<(), i32> {
        self.queue.push(sample)
    }

    /// Pop the oldest sample, or `None` when empty.
    #[inline]
    pub fn pop(&self) -> Option<i32> {
        self.queue.pop()
    }

    /// Current occupancy.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when no samples are buffered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Discard every buffered sample.
    pub fn clear(&self) {
        while self.queue.pop().is_some() {}
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new()
    }
}
