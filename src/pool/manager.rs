//! Pool manager implementation

use super::handle::BlockHandle;
use super::memory::{HeapSource, MemorySource};
use super::metrics;
use super::slab::Slab;
use super::status::{PoolStats, SizeClassStats, StatusReport};
use std::collections::HashMap;
use tracing::{debug, error, info, warn};

/// Result of a deallocation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeallocOutcome {
    /// The block moved to its slab's free stack
    Freed,
    /// The slab does not list the block as allocated
    ///
    /// `released` tells whether the block's memory was returned to the
    /// memory source. Memory still tracked by some slab stays with that
    /// slab and is released at teardown.
    Unmanaged { released: bool },
    /// No slab exists for the requested size; nothing was touched
    NoSuchSlab,
}

impl DeallocOutcome {
    pub fn is_freed(&self) -> bool {
        matches!(self, Self::Freed)
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Freed => "freed",
            Self::Unmanaged { .. } => "unmanaged",
            Self::NoSuchSlab => "no_such_slab",
        }
    }
}

/// What one scripted allocate/deallocate cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub allocated: BlockHandle,
    pub deallocated: Option<(BlockHandle, DeallocOutcome)>,
    pub status: StatusReport,
}

/// Returned by [`PoolManager::teardown`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownSummary {
    pub size_classes: usize,
    pub released_blocks: usize,
}

/// Slab pool manager
///
/// Owns one [`Slab`] per object size and, through the memory source,
/// every block it has ever handed out. Handles given to callers are
/// borrowed identities: dropping the manager releases all memory whether
/// or not callers gave their handles back.
#[derive(Debug)]
pub struct PoolManager<S: MemorySource = HeapSource> {
    slabs: HashMap<usize, Slab>,
    source: S,
}

impl PoolManager<HeapSource> {
    /// Create a manager backed by the heap
    pub fn new() -> Self {
        Self::with_source(HeapSource::new())
    }
}

impl Default for PoolManager<HeapSource> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: MemorySource> PoolManager<S> {
    /// Create a manager over a custom memory source
    pub fn with_source(source: S) -> Self {
        Self {
            slabs: HashMap::new(),
            source,
        }
    }

    /// Slab for `size`, created empty on first use
    pub fn get_or_create_slab(&mut self, size: usize) -> &mut Slab {
        slab_entry(&mut self.slabs, size)
    }

    pub fn get_slab(&self, size: usize) -> Option<&Slab> {
        self.slabs.get(&size)
    }

    /// Allocate a block of `size` bytes
    ///
    /// Reuses the most recently freed block of this size class if there is
    /// one; only otherwise asks the memory source for new memory.
    pub fn allocate(&mut self, size: usize) -> BlockHandle {
        let slab = slab_entry(&mut self.slabs, size);

        if let Some(handle) = slab.reuse() {
            debug!(%handle, size, "Reused free block");
            metrics::record_allocation("reuse");
            return handle;
        }

        let handle = self.source.acquire(size);
        slab.track_new(handle);
        debug!(%handle, size, "Allocated new block");
        metrics::record_allocation("grow");
        metrics::set_live_blocks(self.source.live_blocks());
        handle
    }

    /// Return a block to the slab for `size`
    ///
    /// `size` must be the size the block was allocated with; the handle
    /// alone does not identify its size class.
    pub fn deallocate(&mut self, handle: BlockHandle, size: usize) -> DeallocOutcome {
        let outcome = match self.slabs.get_mut(&size) {
            None => {
                error!(%handle, size, "Attempting to deallocate from a non-existent slab");
                DeallocOutcome::NoSuchSlab
            }
            Some(slab) => {
                if slab.recycle(handle) {
                    debug!(%handle, size, "Freed block");
                    DeallocOutcome::Freed
                } else {
                    self.release_unmanaged(handle, size)
                }
            }
        };

        metrics::record_deallocation(outcome.label());
        outcome
    }

    fn release_unmanaged(&mut self, handle: BlockHandle, size: usize) -> DeallocOutcome {
        let released = match self.owner_of(handle) {
            Some(owner) => {
                warn!(
                    %handle,
                    size,
                    owner,
                    "Attempted to deallocate unmanaged object; block stays with its owning slab"
                );
                false
            }
            None => {
                let released = self.source.release(handle);
                warn!(%handle, size, released, "Attempted to deallocate unmanaged object");
                if released {
                    metrics::record_released(1);
                    metrics::set_live_blocks(self.source.live_blocks());
                }
                released
            }
        };
        DeallocOutcome::Unmanaged { released }
    }

    /// Size class whose slab tracks `handle`, allocated or free
    fn owner_of(&self, handle: BlockHandle) -> Option<usize> {
        self.slabs
            .iter()
            .find(|(_, slab)| slab.contains(handle))
            .map(|(&size, _)| size)
    }

    /// Current counts for one size class
    pub fn status(&self, size: usize) -> StatusReport {
        match self.slabs.get(&size) {
            None => StatusReport::NoSlab { size },
            Some(slab) => StatusReport::Slab {
                size,
                allocated: slab.allocated_count(),
                free: slab.free_count(),
            },
        }
    }

    /// Allocate one block, then immediately give back the most recently
    /// tracked one, then take the status
    pub fn simulate_one_cycle(
        &mut self,
        size: usize,
        tracked: &mut Vec<BlockHandle>,
    ) -> CycleReport {
        let allocated = self.allocate(size);
        tracked.push(allocated);

        let deallocated = tracked
            .pop()
            .map(|handle| (handle, self.deallocate(handle, size)));

        CycleReport {
            allocated,
            deallocated,
            status: self.status(size),
        }
    }

    /// Whether any slab currently lends `handle` out
    pub fn is_allocated(&self, handle: BlockHandle) -> bool {
        self.slabs.values().any(|slab| slab.is_allocated(handle))
    }

    /// Bytes of an allocated block
    pub fn block(&self, handle: BlockHandle) -> Option<&[u8]> {
        if !self.is_allocated(handle) {
            return None;
        }
        self.source.bytes(handle)
    }

    /// Mutable bytes of an allocated block
    pub fn block_mut(&mut self, handle: BlockHandle) -> Option<&mut [u8]> {
        if !self.is_allocated(handle) {
            return None;
        }
        self.source.bytes_mut(handle)
    }

    /// Known size classes, ascending
    pub fn size_classes(&self) -> Vec<usize> {
        let mut sizes: Vec<_> = self.slabs.keys().copied().collect();
        sizes.sort_unstable();
        sizes
    }

    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats::default();

        for size in self.size_classes() {
            let slab = &self.slabs[&size];
            let class_stats = SizeClassStats {
                size: slab.object_size,
                allocated: slab.allocated_count(),
                free: slab.free_count(),
            };
            stats.total_allocated += class_stats.allocated;
            stats.total_free += class_stats.free;
            stats.retained_bytes +=
                (class_stats.allocated + class_stats.free) * slab.object_size;
            stats.size_classes.push(class_stats);
        }

        stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Release every tracked block and drop all slabs
    pub fn teardown(mut self) -> TeardownSummary {
        self.release_all()
    }

    fn release_all(&mut self) -> TeardownSummary {
        let mut summary = TeardownSummary {
            size_classes: self.slabs.len(),
            released_blocks: 0,
        };

        for (size, mut slab) in self.slabs.drain() {
            for handle in slab.drain() {
                if self.source.release(handle) {
                    summary.released_blocks += 1;
                } else {
                    warn!(%handle, size, "Tracked block was not live at teardown");
                }
            }
        }

        if summary.size_classes > 0 {
            info!(
                size_classes = summary.size_classes,
                released = summary.released_blocks,
                "Pool manager torn down"
            );
            metrics::record_released(summary.released_blocks as u64);
            metrics::set_live_blocks(self.source.live_blocks());
        }
        summary
    }
}

impl<S: MemorySource> Drop for PoolManager<S> {
    fn drop(&mut self) {
        self.release_all();
    }
}

fn slab_entry(slabs: &mut HashMap<usize, Slab>, size: usize) -> &mut Slab {
    slabs.entry(size).or_insert_with(|| {
        debug!(size, "Creating slab");
        Slab::new(size)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_creates_slab_lazily() {
        let mut pool = PoolManager::new();
        assert!(pool.get_slab(32).is_none());

        let handle = pool.allocate(32);
        let slab = pool.get_slab(32).expect("slab created on first allocate");
        assert!(slab.is_allocated(handle));
        assert_eq!(pool.size_classes(), vec![32]);
    }

    #[test]
    fn test_get_or_create_slab_is_idempotent() {
        let mut pool = PoolManager::new();
        pool.get_or_create_slab(24);
        let handle = pool.allocate(24);
        assert!(pool.get_or_create_slab(24).is_allocated(handle));
        assert_eq!(pool.size_classes(), vec![24]);
    }

    #[test]
    fn test_reuse_before_growth() {
        let mut pool = PoolManager::new();
        let h1 = pool.allocate(32);
        let h2 = pool.allocate(32);
        assert_ne!(h1, h2);

        assert_eq!(pool.deallocate(h1, 32), DeallocOutcome::Freed);
        assert_eq!(pool.allocate(32), h1);
        assert_eq!(pool.source().live_blocks(), 2);
    }

    #[test]
    fn test_deallocate_without_slab_creates_nothing() {
        let mut pool = PoolManager::new();
        let stray = BlockHandle::from_raw(0xdead);

        assert_eq!(pool.deallocate(stray, 16), DeallocOutcome::NoSuchSlab);
        assert!(pool.get_slab(16).is_none());
        assert_eq!(pool.status(16), StatusReport::NoSlab { size: 16 });
    }

    #[test]
    fn test_double_free_is_unmanaged_and_not_duplicated() {
        let mut pool = PoolManager::new();
        let h = pool.allocate(8);

        assert_eq!(pool.deallocate(h, 8), DeallocOutcome::Freed);
        assert_eq!(
            pool.deallocate(h, 8),
            DeallocOutcome::Unmanaged { released: false }
        );
        assert_eq!(pool.status(8).counts(), Some((0, 1)));
    }

    #[test]
    fn test_wrong_size_does_not_touch_owning_slab() {
        let mut pool = PoolManager::new();
        let a = pool.allocate(32);
        pool.allocate(64);

        assert_eq!(
            pool.deallocate(a, 64),
            DeallocOutcome::Unmanaged { released: false }
        );
        assert_eq!(pool.status(32).counts(), Some((1, 0)));
        assert_eq!(pool.status(64).counts(), Some((1, 0)));
        assert!(pool.block(a).is_some());
    }

    #[test]
    fn test_block_access_only_while_allocated() {
        let mut pool = PoolManager::new();
        let h = pool.allocate(4);
        pool.block_mut(h).unwrap().copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(pool.block(h), Some(&[1u8, 2, 3, 4][..]));

        pool.deallocate(h, 4);
        assert!(pool.block(h).is_none());
        assert!(pool.block_mut(h).is_none());
    }

    #[test]
    fn test_simulate_one_cycle_round_trip() {
        let mut pool = PoolManager::new();
        let mut tracked = Vec::new();

        let first = pool.simulate_one_cycle(32, &mut tracked);
        assert_eq!(
            first.deallocated,
            Some((first.allocated, DeallocOutcome::Freed))
        );
        assert!(tracked.is_empty());
        assert_eq!(first.status.counts(), Some((0, 1)));

        // Second cycle reuses the block freed by the first
        let second = pool.simulate_one_cycle(32, &mut tracked);
        assert_eq!(second.allocated, first.allocated);
        assert_eq!(second.status.counts(), Some((0, 1)));
    }

    #[test]
    fn test_stats_cover_all_classes() {
        let mut pool = PoolManager::new();
        let a = pool.allocate(64);
        pool.allocate(64);
        pool.allocate(16);
        pool.deallocate(a, 64);

        let stats = pool.stats();
        assert_eq!(
            stats.size_classes,
            vec![
                SizeClassStats {
                    size: 16,
                    allocated: 1,
                    free: 0
                },
                SizeClassStats {
                    size: 64,
                    allocated: 1,
                    free: 1
                },
            ]
        );
        assert_eq!(stats.total_allocated, 2);
        assert_eq!(stats.total_free, 1);
        assert_eq!(stats.retained_bytes, 16 + 2 * 64);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let mut pool = PoolManager::new();
        let a = pool.allocate(32);
        pool.allocate(32);
        pool.allocate(128);
        pool.deallocate(a, 32);

        let summary = pool.teardown();
        assert_eq!(
            summary,
            TeardownSummary {
                size_classes: 2,
                released_blocks: 3
            }
        );
    }
}
