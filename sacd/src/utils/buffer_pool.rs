use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::structs::scarlet_book::MAX_DST_SIZE;

/// A thread-safe pool of reusable byte buffers.
///
/// DST frames are reassembled into buffers taken from here so a long
/// extraction does not allocate once per frame.
#[derive(Debug, Clone)]
pub struct BufferPool {
    pool: Arc<Mutex<VecDeque<Vec<u8>>>>,
    max_size: usize,
    buffer_capacity: usize,
}

impl BufferPool {
    /// Creates a new buffer pool.
    ///
    /// # Arguments
    ///
    /// * `max_size` - Maximum number of idle buffers kept in the pool
    /// * `buffer_capacity` - Initial capacity of freshly allocated buffers
    pub fn new(max_size: usize, buffer_capacity: usize) -> Self {
        Self {
            pool: Arc::new(Mutex::new(VecDeque::with_capacity(max_size))),
            max_size,
            buffer_capacity,
        }
    }

    /// Takes an empty buffer from the pool, allocating one if none is idle.
    pub fn acquire(&self) -> Vec<u8> {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        pool.pop_front()
            .unwrap_or_else(|| Vec::with_capacity(self.buffer_capacity))
    }

    /// Hands a buffer back for reuse. Buffers beyond `max_size` are dropped.
    pub fn release(&self, mut buffer: Vec<u8>) {
        buffer.clear();

        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        if pool.len() < self.max_size {
            pool.push_back(buffer);
        }
    }

    pub fn idle(&self) -> usize {
        self.pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(8, MAX_DST_SIZE)
    }
}

#[test]
fn test_buffer_pool_reuse() {
    let pool = BufferPool::new(1, 32);

    let mut a = pool.acquire();
    assert!(a.capacity() >= 32);
    a.extend_from_slice(&[1, 2, 3]);
    pool.release(a);
    assert_eq!(pool.idle(), 1);

    let b = pool.acquire();
    assert!(b.is_empty());
    assert_eq!(pool.idle(), 0);

    pool.release(b);
    pool.release(Vec::new());
    assert_eq!(pool.idle(), 1);
}
