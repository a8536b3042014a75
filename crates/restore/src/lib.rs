//! Per-mountpath restore orchestration: discovers surviving replicas or
//! shards for an erasure-coded object and reconstructs it (spec.md §5),
//! grounded in `getjogger.go`.

pub mod context;
pub mod digest;
pub mod discovery;
pub mod error;
pub mod mode;
pub mod orchestrator;
pub mod persist;
pub mod restore_ops;
pub mod sink;

pub use context::RestoreIoCtx;
pub use error::{Error, Result};
pub use mode::RestoreMode;
pub use orchestrator::{RestoreOrchestrator, RestoreOutcome, RestoreRequest};
