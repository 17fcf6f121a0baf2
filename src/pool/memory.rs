//! Backing memory for pooled blocks
//!
//! The pool manager decides *when* a block is created or released; the
//! memory source owns the bytes. Keeping the two apart lets tests count
//! every acquire/release without touching real allocator state.

use super::handle::BlockHandle;
use std::collections::HashMap;
use tracing::trace;

/// First identity handed out by [`HeapSource`]
///
/// Nonzero so that handles print like plausible addresses.
const HEAP_HANDLE_BASE: u64 = 0x5000_0000;

/// Provider of raw fixed-size blocks
pub trait MemorySource {
    /// Obtain a fresh zeroed block of exactly `size` bytes
    ///
    /// Allocation failure aborts the process; there is no fallback.
    fn acquire(&mut self, size: usize) -> BlockHandle;

    /// Give a block's memory back
    ///
    /// Returns `false` if the source holds no live block for `handle`.
    fn release(&mut self, handle: BlockHandle) -> bool;

    /// Bytes of a live block
    fn bytes(&self, handle: BlockHandle) -> Option<&[u8]>;

    /// Mutable bytes of a live block
    fn bytes_mut(&mut self, handle: BlockHandle) -> Option<&mut [u8]>;

    /// Number of blocks acquired and not yet released
    fn live_blocks(&self) -> usize;
}

/// Heap-backed memory source
#[derive(Debug)]
pub struct HeapSource {
    blocks: HashMap<BlockHandle, Box<[u8]>>,
    next_id: u64,
}

impl HeapSource {
    pub fn new() -> Self {
        Self {
            blocks: HashMap::new(),
            next_id: HEAP_HANDLE_BASE,
        }
    }

    /// Total bytes held by live blocks
    pub fn live_bytes(&self) -> usize {
        self.blocks.values().map(|b| b.len()).sum()
    }
}

impl Default for HeapSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySource for HeapSource {
    fn acquire(&mut self, size: usize) -> BlockHandle {
        let handle = BlockHandle::from_raw(self.next_id);
        // Step by the block size so consecutive handles read like addresses
        self.next_id += size.max(1) as u64;
        self.blocks.insert(handle, vec![0u8; size].into_boxed_slice());
        trace!(%handle, size, "Acquired heap block");
        handle
    }

    fn release(&mut self, handle: BlockHandle) -> bool {
        let released = self.blocks.remove(&handle).is_some();
        trace!(%handle, released, "Released heap block");
        released
    }

    fn bytes(&self, handle: BlockHandle) -> Option<&[u8]> {
        self.blocks.get(&handle).map(|b| &b[..])
    }

    fn bytes_mut(&mut self, handle: BlockHandle) -> Option<&mut [u8]> {
        self.blocks.get_mut(&handle).map(|b| &mut b[..])
    }

    fn live_blocks(&self) -> usize {
        self.blocks.len()
    }
}
