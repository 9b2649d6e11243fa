//! FIFO queues of packed positions backed by a shared segment pool.
//!
//! Queues store their entries in fixed size segments borrowed from a
//! [`QueuePool`]. Recycling a queue hands its segments back to the pool instead
//! of freeing them, so once the pool has grown to the working set of a typical
//! update no further allocation happens.

use super::packed_pos::PackedPos;

/// Number of entries in a single segment.
pub const SEGMENT_LEN: usize = 1024;

/// A fixed block of queue storage.
#[derive(Debug)]
struct Segment {
    data: Box<[u64; SEGMENT_LEN]>,
    len: usize,
}

impl Segment {
    fn new() -> Self {
        Self {
            data: Box::new([0; SEGMENT_LEN]),
            len: 0,
        }
    }

    #[inline]
    fn is_full(&self) -> bool {
        self.len == SEGMENT_LEN
    }
}

/// Free list of queue segments shared by all queues of one engine.
#[derive(Debug, Default)]
pub struct QueuePool {
    free: Vec<Segment>,
    segments_created: usize,
}

impl QueuePool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pool with `segments` segments ready for use.
    #[must_use]
    pub fn with_segments(segments: usize) -> Self {
        let mut pool = Self {
            free: Vec::with_capacity(segments),
            segments_created: 0,
        };
        for _ in 0..segments {
            pool.free.push(Segment::new());
            pool.segments_created += 1;
        }
        pool
    }

    /// Total number of segments this pool ever allocated.
    #[must_use]
    pub fn segments_created(&self) -> usize {
        self.segments_created
    }

    /// Number of segments currently sitting in the free list.
    #[must_use]
    pub fn free_segments(&self) -> usize {
        self.free.len()
    }

    fn take(&mut self) -> Segment {
        if let Some(segment) = self.free.pop() {
            segment
        } else {
            self.segments_created += 1;
            Segment::new()
        }
    }

    fn give_back(&mut self, mut segment: Segment) {
        segment.len = 0;
        self.free.push(segment);
    }
}

/// A FIFO queue of packed positions.
///
/// Entries are appended with [`PooledQueue::push`] and consumed in order with
/// [`PooledQueue::pop`]. Consumed storage is only returned to the pool by
/// [`PooledQueue::recycle`].
#[derive(Debug, Default)]
pub struct PooledQueue {
    segments: Vec<Segment>,
    read_segment: usize,
    read_index: usize,
    len: usize,
}

impl PooledQueue {
    /// Creates an empty queue holding no segments.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, borrowing a segment from `pool` when the tail is full.
    #[inline]
    pub fn push(&mut self, pool: &mut QueuePool, pos: PackedPos) {
        let needs_segment = self.segments.last().is_none_or(Segment::is_full);
        if needs_segment {
            self.segments.push(pool.take());
        }
        if let Some(tail) = self.segments.last_mut() {
            tail.data[tail.len] = pos.raw();
            tail.len += 1;
            self.len += 1;
        }
    }

    /// Removes and returns the oldest entry.
    #[inline]
    pub fn pop(&mut self) -> Option<PackedPos> {
        if self.len == 0 {
            return None;
        }
        let mut segment = &self.segments[self.read_segment];
        if self.read_index == segment.len {
            self.read_segment += 1;
            self.read_index = 0;
            segment = &self.segments[self.read_segment];
        }
        let raw = segment.data[self.read_index];
        self.read_index += 1;
        self.len -= 1;
        Some(PackedPos::from_raw(raw))
    }

    /// Number of entries not yet popped.
    #[must_use]
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks if there is nothing left to pop.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of segments currently held by this queue.
    #[must_use]
    pub fn held_segments(&self) -> usize {
        self.segments.len()
    }

    /// Drops every entry and hands all segments back to `pool`.
    pub fn recycle(&mut self, pool: &mut QueuePool) {
        for segment in self.segments.drain(..) {
            pool.give_back(segment);
        }
        self.read_segment = 0;
        self.read_index = 0;
        self.len = 0;
    }
}
