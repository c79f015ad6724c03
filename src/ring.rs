//! Interrupt-fed receive queue.
//!
//! The UART receive interrupt produces bytes, the packet parser consumes
//! them; [`RxQueue::split`] hands out one half for each side so that the
//! single-producer/single-consumer discipline is enforced by the type
//! system rather than by convention.

use core::cell::UnsafeCell;
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering};

/// Capacity of the receive queue in bytes.
///
/// Command acks are a dozen bytes; this leaves ample headroom for a full
/// data packet arriving while the parser is briefly behind.
pub const RX_CAPACITY: usize = 256;

/// Storage for the interrupt-fed byte queue.
///
/// Create one (typically with `'static` lifetime), then [`split`] it into a
/// [`Producer`] for the receive interrupt handler and a [`Consumer`] for the
/// driver. The cursors are free-running and wrap modulo the capacity; a full
/// queue drops incoming bytes and counts them rather than overwriting unread
/// data.
///
/// [`split`]: RxQueue::split
pub struct RxQueue {
    buf: UnsafeCell<[u8; RX_CAPACITY]>,
    /// Advanced only by the producer.
    head: AtomicUsize,
    /// Advanced only by the consumer.
    tail: AtomicUsize,
    /// Bytes discarded because the queue was full. Written only by the
    /// producer.
    dropped: AtomicUsize,
}

// The buffer cell is only written through the Producer and only read through
// the Consumer, and split() hands out at most one of each.
unsafe impl Sync for RxQueue {}

impl RxQueue {
    pub const fn new() -> Self {
        Self {
            buf: UnsafeCell::new([0u8; RX_CAPACITY]),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
        }
    }

    /// Splits the queue into its producer and consumer halves.
    ///
    /// Taking `&mut self` guarantees there is never more than one of each
    /// half alive at a time.
    pub fn split(&mut self) -> (Producer<'_>, Consumer<'_>) {
        let queue: &RxQueue = self;
        (Producer { queue }, Consumer { queue })
    }
}

impl Default for RxQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RxQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RxQueue")
            .field("head", &self.head.load(Ordering::Relaxed))
            .field("tail", &self.tail.load(Ordering::Relaxed))
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish()
    }
}

/// The write half of the queue; owned by the receive interrupt handler.
pub struct Producer<'a> {
    queue: &'a RxQueue,
}

// A Producer may be moved into an interrupt handler or reader thread; the
// queue itself is Sync and the half is exclusive.
unsafe impl Send for Producer<'_> {}

impl Producer<'_> {
    /// Appends a byte at the producer cursor.
    ///
    /// Returns `false` and increments the drop counter if the queue is full.
    /// Atomic load/store only, so this builds for targets without atomic
    /// read-modify-write instructions.
    pub fn push(&mut self, byte: u8) -> bool {
        let head = self.queue.head.load(Ordering::Relaxed);
        let tail = self.queue.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) == RX_CAPACITY {
            let dropped = self.queue.dropped.load(Ordering::Relaxed);
            self.queue
                .dropped
                .store(dropped.wrapping_add(1), Ordering::Relaxed);
            return false;
        }
        unsafe {
            (*self.queue.buf.get())[head % RX_CAPACITY] = byte;
        }
        self.queue.head.store(head.wrapping_add(1), Ordering::Release);
        true
    }
}

impl fmt::Debug for Producer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer").field("queue", &self.queue).finish()
    }
}

/// The read half of the queue; owned by the driver's packet assembler.
pub struct Consumer<'a> {
    queue: &'a RxQueue,
}

unsafe impl Send for Consumer<'_> {}

impl Consumer<'_> {
    /// True iff the producer and consumer cursors are level.
    pub fn is_empty(&self) -> bool {
        self.queue.head.load(Ordering::Acquire) == self.queue.tail.load(Ordering::Relaxed)
    }

    /// Takes the byte at the consumer cursor, in arrival order.
    pub fn pop(&mut self) -> Option<u8> {
        let tail = self.queue.tail.load(Ordering::Relaxed);
        let head = self.queue.head.load(Ordering::Acquire);
        if head == tail {
            return None;
        }
        let byte = unsafe { (*self.queue.buf.get())[tail % RX_CAPACITY] };
        self.queue.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(byte)
    }

    /// Number of received bytes discarded because the queue was full.
    pub fn overflow_count(&self) -> usize {
        self.queue.dropped.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for Consumer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer").field("queue", &self.queue).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_push_order() {
        let mut queue = RxQueue::new();
        let (mut producer, mut consumer) = queue.split();

        for i in 0..100u8 {
            assert!(producer.push(i));
        }
        for i in 0..100u8 {
            assert_eq!(consumer.pop(), Some(i));
        }
        assert_eq!(consumer.pop(), None);
    }

    #[test]
    fn empty_after_draining() {
        let mut queue = RxQueue::new();
        let (mut producer, mut consumer) = queue.split();

        assert!(consumer.is_empty());
        producer.push(0xEF);
        assert!(!consumer.is_empty());
        consumer.pop();
        assert!(consumer.is_empty());
    }

    #[test]
    fn wraps_around_capacity() {
        let mut queue = RxQueue::new();
        let (mut producer, mut consumer) = queue.split();

        // Walk the cursors most of the way around, then fill across the
        // wrap point.
        for lap in 0..3 {
            for i in 0..200u8 {
                assert!(producer.push(i.wrapping_add(lap)));
            }
            for i in 0..200u8 {
                assert_eq!(consumer.pop(), Some(i.wrapping_add(lap)));
            }
        }
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let mut queue = RxQueue::new();
        let (mut producer, mut consumer) = queue.split();

        for i in 0..RX_CAPACITY {
            assert!(producer.push(i as u8));
        }
        assert!(!producer.push(0xAA));
        assert!(!producer.push(0xBB));
        assert_eq!(consumer.overflow_count(), 2);

        // The first-written bytes survive intact.
        assert_eq!(consumer.pop(), Some(0));
        assert_eq!(consumer.pop(), Some(1));
    }
}
