//! Pool metrics
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! embedding process installs a recorder.

use metrics::{counter, describe_counter, describe_gauge, gauge};

pub const ALLOCATIONS_TOTAL: &str = "slabsim_allocations_total";
pub const DEALLOCATIONS_TOTAL: &str = "slabsim_deallocations_total";
pub const RELEASED_BLOCKS_TOTAL: &str = "slabsim_released_blocks_total";
pub const LIVE_BLOCKS: &str = "slabsim_live_blocks";

/// Register metric descriptions with the installed recorder
pub fn describe() {
    describe_counter!(ALLOCATIONS_TOTAL, "Allocations served, by reuse or grow path");
    describe_counter!(DEALLOCATIONS_TOTAL, "Deallocation requests, by outcome");
    describe_counter!(RELEASED_BLOCKS_TOTAL, "Blocks whose memory was released");
    describe_gauge!(LIVE_BLOCKS, "Blocks currently held by the memory source");
}

pub(crate) fn record_allocation(path: &'static str) {
    counter!(ALLOCATIONS_TOTAL, "path" => path).increment(1);
}

pub(crate) fn record_deallocation(outcome: &'static str) {
    counter!(DEALLOCATIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub(crate) fn record_released(count: u64) {
    counter!(RELEASED_BLOCKS_TOTAL).increment(count);
}

pub(crate) fn set_live_blocks(live: usize) {
    gauge!(LIVE_BLOCKS).set(live as f64);
}
