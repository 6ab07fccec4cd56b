//! Reusable byte buffers for streaming reads.

use std::sync::Mutex;

/// Initial capacity of a freshly allocated buffer.
const DEFAULT_BUFFER_CAPACITY: usize = 8 * 1024;

/// Buffers that grew past this capacity are dropped instead of pooled, so a
/// single oversized stream cannot pin memory for the client's lifetime.
const MAX_POOLED_CAPACITY: usize = 64 * 1024;

/// Pool of byte buffers shared by all streams of one client.
///
/// Each buffer is owned by exactly one stream at a time; the lock only guards
/// the free list. Acquired buffers come back cleared.
pub struct BufferPool {
    buffers: Mutex<Vec<Vec<u8>>>,
    max_buffers: usize,
}

impl BufferPool {
    pub fn new(max_buffers: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            max_buffers,
        }
    }

    /// Take a cleared buffer from the pool, or allocate a default-sized one.
    pub fn acquire(&self) -> Vec<u8> {
        let mut buffers = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        buffers
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(DEFAULT_BUFFER_CAPACITY))
    }

    /// Return a buffer for reuse. Oversized buffers and returns beyond the
    /// pool's capacity are dropped.
    pub fn release(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() > MAX_POOLED_CAPACITY {
            return;
        }
        buffer.clear();
        let mut buffers = self.buffers.lock().unwrap_or_else(|e| e.into_inner());
        if buffers.len() < self.max_buffers {
            buffers.push(buffer);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.buffers.lock().unwrap().len()
    }
}
