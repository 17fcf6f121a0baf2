//! Teardown and release accounting for the pool manager
//!
//! Uses a recording memory source so every acquire/release is counted
//! even after the manager itself has been dropped.

use slabsim::pool::{BlockHandle, DeallocOutcome, HeapSource, MemorySource, PoolManager};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Ledger {
    acquired: Vec<BlockHandle>,
    releases: HashMap<BlockHandle, usize>,
    failed_releases: usize,
}

#[derive(Debug)]
struct RecordingSource {
    heap: HeapSource,
    ledger: Rc<RefCell<Ledger>>,
}

impl RecordingSource {
    fn new() -> (Self, Rc<RefCell<Ledger>>) {
        let ledger = Rc::new(RefCell::new(Ledger::default()));
        let source = Self {
            heap: HeapSource::new(),
            ledger: Rc::clone(&ledger),
        };
        (source, ledger)
    }

    /// Take a live block straight from the heap, bypassing the pool and the ledger
    fn acquire_untracked(&mut self, size: usize) -> BlockHandle {
        self.heap.acquire(size)
    }
}

impl MemorySource for RecordingSource {
    fn acquire(&mut self, size: usize) -> BlockHandle {
        let handle = self.heap.acquire(size);
        self.ledger.borrow_mut().acquired.push(handle);
        handle
    }

    fn release(&mut self, handle: BlockHandle) -> bool {
        let released = self.heap.release(handle);
        let mut ledger = self.ledger.borrow_mut();
        if released {
            *ledger.releases.entry(handle).or_default() += 1;
        } else {
            ledger.failed_releases += 1;
        }
        released
    }

    fn bytes(&self, handle: BlockHandle) -> Option<&[u8]> {
        self.heap.bytes(handle)
    }

    fn bytes_mut(&mut self, handle: BlockHandle) -> Option<&mut [u8]> {
        self.heap.bytes_mut(handle)
    }

    fn live_blocks(&self) -> usize {
        self.heap.live_blocks()
    }
}

#[test]
fn test_drop_releases_every_block_exactly_once() {
    let (source, ledger) = RecordingSource::new();

    {
        let mut pool = PoolManager::with_source(source);
        let a = pool.allocate(32);
        let b = pool.allocate(32);
        pool.allocate(64);
        pool.allocate(128);
        pool.deallocate(a, 32);
        pool.deallocate(b, 32);
        // Reuse must not acquire more memory
        pool.allocate(32);
        assert_eq!(pool.source().live_blocks(), 4);
    }

    let ledger = ledger.borrow();
    assert_eq!(ledger.acquired.len(), 4);
    assert_eq!(ledger.releases.len(), 4);
    assert!(ledger.releases.values().all(|&n| n == 1));
    for handle in &ledger.acquired {
        assert_eq!(ledger.releases.get(handle), Some(&1));
    }
    assert_eq!(ledger.failed_releases, 0);
}

#[test]
fn test_outstanding_handles_are_released_without_deallocate() {
    let (source, ledger) = RecordingSource::new();

    let mut pool = PoolManager::with_source(source);
    let outstanding: Vec<_> = (0..10).map(|_| pool.allocate(16)).collect();
    let summary = pool.teardown();

    assert_eq!(summary.size_classes, 1);
    assert_eq!(summary.released_blocks, outstanding.len());

    let ledger = ledger.borrow();
    for handle in &outstanding {
        assert_eq!(ledger.releases.get(handle), Some(&1));
    }
    // Drop after teardown must not release anything a second time
    assert_eq!(ledger.failed_releases, 0);
}

#[test]
fn test_unmanaged_paths_never_release_tracked_blocks() {
    let (source, ledger) = RecordingSource::new();

    {
        let mut pool = PoolManager::with_source(source);
        let a = pool.allocate(32);
        let b = pool.allocate(64);
        pool.deallocate(b, 64);

        // Wrong size class, then a repeated free
        assert_eq!(
            pool.deallocate(a, 64),
            DeallocOutcome::Unmanaged { released: false }
        );
        assert_eq!(
            pool.deallocate(b, 64),
            DeallocOutcome::Unmanaged { released: false }
        );
        assert!(ledger.borrow().releases.is_empty());
    }

    let ledger = ledger.borrow();
    assert_eq!(ledger.releases.len(), 2);
    assert_eq!(ledger.failed_releases, 0);
}

#[test]
fn test_foreign_handle_release_is_attempted_once() {
    let (source, ledger) = RecordingSource::new();
    let mut pool = PoolManager::with_source(source);
    pool.allocate(8);

    let foreign = BlockHandle::from_raw(0x0bad_0000);
    assert_eq!(
        pool.deallocate(foreign, 8),
        DeallocOutcome::Unmanaged { released: false }
    );
    assert_eq!(ledger.borrow().failed_releases, 1);
    assert!(!pool.get_slab(8).unwrap().contains(foreign));

    let summary = pool.teardown();
    assert_eq!(summary.released_blocks, 1);
    assert_eq!(ledger.borrow().failed_releases, 1);
}

#[test]
fn test_no_such_slab_touches_nothing() {
    let (source, ledger) = RecordingSource::new();
    let mut pool = PoolManager::with_source(source);

    assert_eq!(
        pool.deallocate(BlockHandle::from_raw(1), 16),
        DeallocOutcome::NoSuchSlab
    );
    assert!(pool.size_classes().is_empty());

    let summary = pool.teardown();
    assert_eq!(summary.released_blocks, 0);
    let ledger = ledger.borrow();
    assert!(ledger.acquired.is_empty());
    assert_eq!(ledger.failed_releases, 0);
}

#[test]
fn test_untracked_live_block_is_released_immediately() {
    let (mut source, ledger) = RecordingSource::new();
    let stray = source.acquire_untracked(24);

    let mut pool = PoolManager::with_source(source);
    pool.allocate(32);
    assert_eq!(pool.source().live_blocks(), 2);

    assert_eq!(
        pool.deallocate(stray, 32),
        DeallocOutcome::Unmanaged { released: true }
    );
    assert_eq!(pool.source().live_blocks(), 1);
    assert_eq!(ledger.borrow().releases.get(&stray), Some(&1));
    assert!(!pool.get_slab(32).unwrap().contains(stray));

    let summary = pool.teardown();
    assert_eq!(summary.released_blocks, 1);

    let ledger = ledger.borrow();
    assert_eq!(ledger.releases.get(&stray), Some(&1));
    assert_eq!(ledger.releases.len(), 2);
    assert_eq!(ledger.failed_releases, 0);
}
