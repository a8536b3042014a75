use std::sync::OnceLock;

use bytes::BytesMut;
use parking_lot::Mutex;

/// Slab classes, smallest to largest. `acquire` picks the smallest class
/// that satisfies the caller's size hint; anything larger than the top
/// class is allocated fresh and simply dropped (not returned to a slab) on
/// release.
const CLASS_SIZES: [usize; 5] = [4 * 1024, 32 * 1024, 256 * 1024, 1024 * 1024, 4 * 1024 * 1024];

/// A process-wide, thread-safe pool of reusable scratch buffers, organized
/// into size classes so a caller copying a 4 KiB part header doesn't get
/// handed (and later return) a 4 MiB buffer.
pub struct ScratchPool {
    slabs: [Mutex<Vec<BytesMut>>; CLASS_SIZES.len()],
}

impl ScratchPool {
    fn new() -> Self {
        Self {
            slabs: Default::default(),
        }
    }

    /// The process-wide instance. Every restoration and multipart code path
    /// acquires scratch buffers from here rather than allocating per call.
    pub fn global() -> &'static ScratchPool {
        static POOL: OnceLock<ScratchPool> = OnceLock::new();
        POOL.get_or_init(ScratchPool::new)
    }

    fn class_for(hint: usize) -> usize {
        CLASS_SIZES
            .iter()
            .position(|&sz| sz >= hint)
            .unwrap_or(CLASS_SIZES.len() - 1)
    }

    /// Acquire a buffer sized at least `hint` bytes. The returned `PooledBuf`
    /// releases itself back to its slab class on drop.
    pub fn acquire(&'static self, hint: usize) -> PooledBuf {
        let class = Self::class_for(hint);
        let mut buf = {
            let mut slab = self.slabs[class].lock();
            slab.pop()
        }
        .unwrap_or_else(|| BytesMut::with_capacity(CLASS_SIZES[class]));
        buf.clear();
        if buf.capacity() < hint {
            buf.reserve(hint - buf.capacity());
        }
        PooledBuf {
            buf: Some(buf),
            class,
            pool: self,
        }
    }
}

/// A scratch buffer on loan from a [`ScratchPool`]. Derefs to `BytesMut`;
/// returned to its slab class automatically when dropped.
pub struct PooledBuf {
    buf: Option<BytesMut>,
    class: usize,
    pool: &'static ScratchPool,
}

impl std::ops::Deref for PooledBuf {
    type Target = BytesMut;
    fn deref(&self) -> &BytesMut {
        self.buf.as_ref().expect("buffer taken before drop")
    }
}

impl std::ops::DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut BytesMut {
        self.buf.as_mut().expect("buffer taken before drop")
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        if let Some(mut buf) = self.buf.take() {
            buf.clear();
            self.pool.slabs[self.class].lock().push(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_returns_buffer_of_sufficient_capacity() {
        let pool = ScratchPool::global();
        let buf = pool.acquire(10_000);
        assert!(buf.capacity() >= 10_000);
    }

    #[test]
    fn buffer_is_cleared_on_acquire() {
        let pool = ScratchPool::global();
        {
            let mut buf = pool.acquire(64);
            buf.extend_from_slice(&[1, 2, 3, 4]);
        }
        let buf2 = pool.acquire(64);
        assert!(buf2.is_empty());
    }
}
