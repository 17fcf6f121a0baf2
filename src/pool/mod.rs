//! Slab Pool Manager
//!
//! Serves fixed-size blocks from per-size-class pools. A slab is created
//! lazily the first time its size is allocated, and freed blocks are
//! always reused before new memory is requested.
//!
//! # Architecture
//!
//! ```text
//! PoolManager
//!   ├─→ Slab(16B)  → Free: []          Allocated: {H4}
//!   ├─→ Slab(32B)  → Free: [H3]        Allocated: {H1, H2}
//!   └─→ Slab(64B)  → Free: [H6, H5]    Allocated: {}
//!
//! MemorySource (HeapSource by default)
//!   └─→ H1..H6 → owned byte buffers, released at teardown
//! ```
//!
//! Each block is in exactly one of its slab's two collections until the
//! manager is dropped.

pub mod handle;
pub mod manager;
pub mod memory;
pub mod metrics;
pub mod slab;
pub mod status;

pub use handle::BlockHandle;
pub use manager::{CycleReport, DeallocOutcome, PoolManager, TeardownSummary};
pub use memory::{HeapSource, MemorySource};
pub use slab::Slab;
pub use status::{PoolStats, SizeClassStats, StatusReport};
