//! Per-size-class slab

use super::handle::BlockHandle;
use std::collections::HashSet;

/// A slab pools the blocks of one size class
///
/// Every block the slab knows about sits in exactly one of two
/// collections: the allocated set or the free stack.
#[derive(Debug)]
pub struct Slab {
    /// Object size served by this slab (bytes)
    pub object_size: usize,
    /// Recycled blocks, most recently freed on top
    free_blocks: Vec<BlockHandle>,
    /// Blocks currently lent out to callers
    allocated_blocks: HashSet<BlockHandle>,
}

impl Slab {
    /// Create an empty slab
    pub fn new(object_size: usize) -> Self {
        Self {
            object_size,
            free_blocks: Vec::new(),
            allocated_blocks: HashSet::new(),
        }
    }

    /// Take the most recently freed block and mark it allocated
    pub fn reuse(&mut self) -> Option<BlockHandle> {
        let handle = self.free_blocks.pop()?;
        self.allocated_blocks.insert(handle);
        Some(handle)
    }

    /// Track a freshly acquired block as allocated
    pub fn track_new(&mut self, handle: BlockHandle) {
        debug_assert!(!self.contains(handle), "block {handle} tracked twice");
        self.allocated_blocks.insert(handle);
    }

    /// Move an allocated block onto the free stack
    ///
    /// Returns `false` and leaves the slab untouched if the block is not
    /// currently allocated here.
    pub fn recycle(&mut self, handle: BlockHandle) -> bool {
        if !self.allocated_blocks.remove(&handle) {
            return false;
        }
        self.free_blocks.push(handle);
        true
    }

    pub fn is_allocated(&self, handle: BlockHandle) -> bool {
        self.allocated_blocks.contains(&handle)
    }

    pub fn is_free(&self, handle: BlockHandle) -> bool {
        self.free_blocks.contains(&handle)
    }

    /// Whether the slab tracks the block in either collection
    pub fn contains(&self, handle: BlockHandle) -> bool {
        self.is_allocated(handle) || self.is_free(handle)
    }

    pub fn allocated_count(&self) -> usize {
        self.allocated_blocks.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_blocks.len()
    }

    /// Free blocks in reuse order (next to be handed out first)
    pub fn free_blocks(&self) -> impl Iterator<Item = BlockHandle> + '_ {
        self.free_blocks.iter().rev().copied()
    }

    pub fn allocated_blocks(&self) -> impl Iterator<Item = BlockHandle> + '_ {
        self.allocated_blocks.iter().copied()
    }

    /// Empty both collections, yielding every tracked block once
    pub fn drain(&mut self) -> impl Iterator<Item = BlockHandle> + '_ {
        self.allocated_blocks.drain().chain(self.free_blocks.drain(..))
    }
}
