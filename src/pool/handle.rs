//! Block handles handed out by the pool manager

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identity of one fixed-size block
///
/// Handles are compared by identity only. The pool logic never looks
/// inside a block through its handle; byte access goes through the
/// [`MemorySource`](super::MemorySource) that owns the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockHandle(u64);

impl BlockHandle {
    /// Wrap a raw identity value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw identity value
    pub const fn as_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#014x}", self.0)
    }
}
