//! Process-wide buffer pooling: fixed-size scratch buffers for copy loops
//! and growable, multi-reader segment lists for variable-size composition.
//!
//! Mirrors the role the teacher's in-memory staging layer plays for
//! short-lived I/O buffers, generalized here into two pools per spec.md
//! §4.2: `ScratchPool` (slab-classed `BytesMut` buffers) and `SegmentList`
//! (an append-only list of `Bytes` segments with independent readers).

mod scratch;
mod segment;

pub use scratch::{PooledBuf, ScratchPool};
pub use segment::{SegmentList, SegmentReader};
