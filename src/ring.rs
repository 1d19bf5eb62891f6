//! N-buffered uniform storage gated by a counting semaphore.
//!
//! The CPU must never overwrite a uniform buffer the GPU is still reading.
//! [`UniformRing`] keeps `N` equally sized slots and a [`FrameSemaphore`]
//! initialised to `N`. Every [`acquire_next`](UniformRing::acquire_next)
//! takes one permit and returns the next slot in strict rotation; the GPU
//! completion callback of the frame that used the slot gives the permit
//! back through a [`RingSignal`].
//!
//! ```text
//!   acquire ──▶ slot 0 ──▶ slot 1 ──▶ slot 2 ──▶ (blocks until a release)
//!   release ◀── frame 0 completed ◀── ...
//! ```
//!
//! Because completions arrive in submission order, the slot handed out after
//! a release is always the oldest one.

use crate::backend::{BufferHandle, GraphicsBackend};
use crate::error::{RenderError, Result};
use crate::uniforms::DrawUniforms;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Interval between backend polls while waiting on a starved ring.
const PUMP_INTERVAL: Duration = Duration::from_millis(1);

/// A counting semaphore that never holds more than its initial permits.
#[derive(Debug)]
pub struct FrameSemaphore {
    permits: Mutex<usize>,
    limit: usize,
    available: Condvar,
}

impl FrameSemaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            limit: permits,
            available: Condvar::new(),
        }
    }

    /// Blocks until a permit is available, then takes it.
    pub fn acquire(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.available.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// Takes a permit if one is available right now.
    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Waits up to `timeout` for a permit. Returns false on timeout.
    pub fn acquire_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut permits = self.permits.lock();
        while *permits == 0 {
            if self
                .available
                .wait_until(&mut permits, deadline)
                .timed_out()
            {
                break;
            }
        }
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    /// Returns one permit and wakes a single waiter.
    ///
    /// A release with every permit already returned is ignored.
    pub fn release(&self) {
        let mut permits = self.permits.lock();
        if *permits >= self.limit {
            log::warn!("Ignoring release of a semaphore with all {} permits free", self.limit);
            return;
        }
        *permits += 1;
        self.available.notify_one();
    }

    /// Permits currently available.
    pub fn available(&self) -> usize {
        *self.permits.lock()
    }
}

/// Thread-safe handle that returns one permit to a ring.
///
/// Cloned into GPU completion callbacks, which may run on another thread.
#[derive(Clone, Debug)]
pub struct RingSignal {
    semaphore: Arc<FrameSemaphore>,
}

impl RingSignal {
    /// Marks one in-flight slot as consumed by the GPU.
    pub fn release(&self) {
        self.semaphore.release();
    }
}

/// A slot handed out by [`UniformRing::acquire_next`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotHandle {
    /// Position of the slot in the rotation.
    pub index: usize,
    /// Backend buffer backing the slot.
    pub buffer: BufferHandle,
}

/// N-buffered uniform slots with in-flight accounting.
#[derive(Debug)]
pub struct UniformRing {
    slots: Vec<BufferHandle>,
    slot_size: u64,
    next: usize,
    semaphore: Arc<FrameSemaphore>,
}

impl UniformRing {
    /// Allocates `count` uniform buffers of `slot_size` bytes through `backend`.
    ///
    /// A `count` of zero is raised to one.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        label: &str,
        count: usize,
        slot_size: u64,
    ) -> Result<Self> {
        let count = count.max(1);
        let slots = (0..count)
            .map(|i| backend.create_uniform_buffer(&format!("{} Slot {}", label, i), slot_size))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_slots(slots, slot_size))
    }

    /// A ring sized for one [`DrawUniforms`] block per slot.
    pub fn for_draws(backend: &mut dyn GraphicsBackend, label: &str, count: usize) -> Result<Self> {
        Self::new(backend, label, count, DrawUniforms::SIZE as u64)
    }

    /// Wraps already allocated buffers.
    ///
    /// # Panics
    ///
    /// Panics if `slots` is empty.
    pub fn from_slots(slots: Vec<BufferHandle>, slot_size: u64) -> Self {
        assert!(!slots.is_empty(), "a uniform ring needs at least one slot");
        let semaphore = Arc::new(FrameSemaphore::new(slots.len()));
        Self {
            slots,
            slot_size,
            next: 0,
            semaphore,
        }
    }

    /// Number of slots (the in-flight limit).
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot_size(&self) -> u64 {
        self.slot_size
    }

    /// Slots acquired and not yet released.
    pub fn in_flight(&self) -> usize {
        self.capacity().saturating_sub(self.semaphore.available())
    }

    /// A handle for the completion side.
    pub fn signal(&self) -> RingSignal {
        RingSignal {
            semaphore: Arc::clone(&self.semaphore),
        }
    }

    /// Blocks until a slot is free, then returns it.
    ///
    /// Blocks forever if completions stop arriving; prefer
    /// [`acquire_next_timeout`](Self::acquire_next_timeout) when the
    /// completion source is not trusted.
    pub fn acquire_next(&mut self) -> SlotHandle {
        self.semaphore.acquire();
        self.advance()
    }

    /// Returns a slot if one is free right now.
    pub fn try_acquire_next(&mut self) -> Option<SlotHandle> {
        self.semaphore.try_acquire().then(|| self.advance())
    }

    /// Waits up to `timeout` for a free slot.
    pub fn acquire_next_timeout(&mut self, timeout: Duration) -> Result<SlotHandle> {
        if self.semaphore.acquire_timeout(timeout) {
            Ok(self.advance())
        } else {
            Err(RenderError::FrameDropped { waited: timeout })
        }
    }

    /// Waits for a free slot, calling `pump` between short waits.
    ///
    /// Backends that only deliver completion callbacks while being polled
    /// pass their poll here so the wait can make progress on the render
    /// thread. `timeout` of `None` waits indefinitely.
    pub fn acquire_next_pumped(
        &mut self,
        timeout: Option<Duration>,
        mut pump: impl FnMut(),
    ) -> Result<SlotHandle> {
        let start = Instant::now();
        loop {
            if let Some(slot) = self.try_acquire_next() {
                return Ok(slot);
            }
            pump();
            let wait = match timeout {
                Some(limit) => {
                    let elapsed = start.elapsed();
                    if elapsed >= limit {
                        return Err(RenderError::FrameDropped { waited: elapsed });
                    }
                    PUMP_INTERVAL.min(limit - elapsed)
                }
                None => PUMP_INTERVAL,
            };
            if self.semaphore.acquire_timeout(wait) {
                return Ok(self.advance());
            }
        }
    }

    /// Hands back a slot acquired for a frame that was never submitted.
    ///
    /// The rotation rewinds onto `slot`, so the next acquire returns it again
    /// instead of the oldest in-flight slot. Cancel slots newest first.
    pub fn cancel(&mut self, slot: SlotHandle) {
        self.next = slot.index;
        self.semaphore.release();
    }

    /// Writes one draw's uniforms into `slot`.
    pub fn write(
        &self,
        backend: &mut dyn GraphicsBackend,
        slot: SlotHandle,
        uniforms: &DrawUniforms,
    ) -> Result<()> {
        debug_assert!(DrawUniforms::SIZE as u64 <= self.slot_size);
        backend.write_buffer(slot.buffer, 0, uniforms.as_bytes())
    }

    fn advance(&mut self) -> SlotHandle {
        let index = self.next;
        self.next = (self.next + 1) % self.slots.len();
        SlotHandle {
            index,
            buffer: self.slots[index],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::thread;

    fn ring(count: usize) -> UniformRing {
        let slots = (0..count).map(BufferHandle).collect();
        UniformRing::from_slots(slots, DrawUniforms::SIZE as u64)
    }

    #[test]
    fn slots_rotate_modulo_capacity() {
        let mut ring = ring(3);
        let indices: Vec<usize> = (0..3).map(|_| ring.acquire_next().index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(ring.in_flight(), 3);

        ring.signal().release();
        assert_eq!(ring.acquire_next().index, 0);
    }

    #[test]
    fn exhausted_ring_refuses_without_release() {
        let mut ring = ring(2);
        ring.acquire_next();
        ring.acquire_next();
        assert!(ring.try_acquire_next().is_none());
        let err = ring
            .acquire_next_timeout(Duration::from_millis(20))
            .unwrap_err();
        assert!(matches!(err, RenderError::FrameDropped { .. }));
        assert_eq!(ring.in_flight(), 2);
    }

    #[test]
    fn blocked_acquire_resumes_on_release_from_another_thread() {
        let mut ring = ring(3);
        for _ in 0..3 {
            ring.acquire_next();
        }
        let signal = ring.signal();
        let (tx, rx) = mpsc::channel();

        let waiter = thread::spawn(move || {
            let slot = ring.acquire_next();
            tx.send(slot.index).unwrap();
            ring
        });

        // Still starved: nothing arrives within the bounded wait.
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

        signal.release();
        let index = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("acquire should unblock after release");
        assert_eq!(index, 0);

        let ring = waiter.join().unwrap();
        assert_eq!(ring.in_flight(), 3);
    }

    #[test]
    fn pumped_acquire_makes_progress_through_pump() {
        let mut ring = ring(1);
        ring.acquire_next();
        let signal = ring.signal();
        let mut pumps = 0;

        let slot = ring
            .acquire_next_pumped(Some(Duration::from_secs(5)), || {
                pumps += 1;
                if pumps == 3 {
                    signal.release();
                }
            })
            .unwrap();

        assert_eq!(slot.index, 0);
        assert!(pumps >= 3);
    }

    #[test]
    fn pumped_acquire_times_out() {
        let mut ring = ring(1);
        ring.acquire_next();
        let result = ring.acquire_next_pumped(Some(Duration::from_millis(10)), || {});
        assert!(matches!(result, Err(RenderError::FrameDropped { .. })));
    }

    #[test]
    fn cancelled_slot_is_handed_out_again() {
        let mut ring = ring(3);
        let first = ring.acquire_next();
        let second = ring.acquire_next();
        let abandoned = ring.acquire_next();
        assert_eq!(abandoned.index, 2);

        ring.cancel(abandoned);
        assert_eq!(ring.in_flight(), 2);
        // slots 0 and 1 are still in flight and must not come back yet
        let next = ring.try_acquire_next().unwrap();
        assert_eq!(next, abandoned);
        assert_ne!(next, first);
        assert_ne!(next, second);
        assert!(ring.try_acquire_next().is_none());
    }

    #[test]
    fn extra_release_does_not_raise_capacity() {
        let mut ring = ring(1);
        ring.signal().release();
        assert_eq!(ring.in_flight(), 0);

        ring.acquire_next();
        assert_eq!(ring.in_flight(), 1);
        assert!(ring.try_acquire_next().is_none());
    }

    #[test]
    fn semaphore_counts_permits() {
        let sem = FrameSemaphore::new(2);
        assert!(sem.try_acquire());
        assert!(sem.try_acquire());
        assert!(!sem.try_acquire());
        assert!(!sem.acquire_timeout(Duration::from_millis(5)));
        sem.release();
        assert_eq!(sem.available(), 1);
        assert!(sem.acquire_timeout(Duration::from_millis(5)));

        sem.release();
        sem.release();
        sem.release();
        assert_eq!(sem.available(), 2);
    }
}
