use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

#[derive(Default)]
struct Inner {
    segments: Vec<Bytes>,
    size: usize,
}

/// A growable, append-only list of byte segments with a `new_reader`
/// factory yielding an independent reader over the bytes accumulated so
/// far. Several readers may exist at once; releasing the list while a
/// reader is open does not invalidate that reader (each reader holds its
/// own clone of the segment list, and `Bytes` clones are reference-counted,
/// so the underlying memory survives) — callers should still treat a
/// released list's readers as a one-shot snapshot rather than a live view.
#[derive(Clone, Default)]
pub struct SegmentList {
    inner: Arc<Mutex<Inner>>,
}

impl SegmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_hint(_hint: usize) -> Self {
        Self::default()
    }

    pub fn push(&self, data: Bytes) {
        if data.is_empty() {
            return;
        }
        let mut inner = self.inner.lock();
        inner.size += data.len();
        inner.segments.push(data);
    }

    pub fn size(&self) -> usize {
        self.inner.lock().size
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Snapshot the segments accumulated so far into an independent reader.
    pub fn new_reader(&self) -> SegmentReader {
        let segments = self.inner.lock().segments.clone();
        SegmentReader {
            segments,
            seg_idx: 0,
            seg_pos: 0,
        }
    }

    /// Release this handle's contribution to the backing bytes. Existing
    /// readers created via `new_reader` keep their own clones and are
    /// unaffected.
    pub fn free(&self) {
        let mut inner = self.inner.lock();
        inner.segments.clear();
        inner.size = 0;
    }

    /// Boxes a clone of this handle as a trait object, for callers (e.g. the
    /// peer-exchange writer registry) that hold writers behind
    /// `Box<dyn AsyncWrite + Send + Unpin>`.
    pub fn boxed(&self) -> Box<dyn AsyncWrite + Send + Unpin> {
        Box::new(self.clone())
    }

    /// Drains the current snapshot into one contiguous `Bytes`, for callers
    /// that need the whole payload rather than a streaming reader.
    pub async fn to_bytes(&self) -> Bytes {
        let mut reader = self.new_reader();
        let mut buf = Vec::with_capacity(self.size());
        tokio::io::AsyncReadExt::read_to_end(&mut reader, &mut buf)
            .await
            .expect("reading an in-memory segment snapshot never fails");
        Bytes::from(buf)
    }
}

impl AsyncWrite for SegmentList {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        self.push(Bytes::copy_from_slice(buf));
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// An independent, sequential reader over a [`SegmentList`] snapshot.
pub struct SegmentReader {
    segments: Vec<Bytes>,
    seg_idx: usize,
    seg_pos: usize,
}

impl AsyncRead for SegmentReader {
    fn poll_read(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        while self.seg_idx < self.segments.len() {
            let seg = &self.segments[self.seg_idx];
            if self.seg_pos >= seg.len() {
                self.seg_idx += 1;
                self.seg_pos = 0;
                continue;
            }
            let remaining = &seg[self.seg_pos..];
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            self.seg_pos += n;
            return Poll::Ready(Ok(()));
        }
        Poll::Ready(Ok(()))
    }
}
