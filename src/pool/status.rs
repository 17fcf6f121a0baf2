//! Status reports and statistics for the pool manager

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of one size class, as returned by
/// [`PoolManager::status`](super::PoolManager::status)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StatusReport {
    /// Nothing has ever been allocated for this size
    NoSlab { size: usize },
    /// Counts for an existing slab
    Slab {
        size: usize,
        allocated: usize,
        free: usize,
    },
}

impl StatusReport {
    pub fn size(&self) -> usize {
        match *self {
            Self::NoSlab { size } | Self::Slab { size, .. } => size,
        }
    }

    /// `(allocated, free)` if the slab exists
    pub fn counts(&self) -> Option<(usize, usize)> {
        match *self {
            Self::NoSlab { .. } => None,
            Self::Slab {
                allocated, free, ..
            } => Some((allocated, free)),
        }
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::NoSlab { size } => {
                write!(f, "No slabs allocated yet for this size ({} bytes).", size)
            }
            Self::Slab {
                size,
                allocated,
                free,
            } => {
                writeln!(f, "Slab Status for Size: {} bytes", size)?;
                writeln!(f, "-------------------------------")?;
                writeln!(f, "Allocated objects: {}", allocated)?;
                writeln!(f, "Free objects:      {}", free)?;
                writeln!(f, "-------------------------------")?;
                writeln!(f)?;
                writeln!(
                    f,
                    "In real memory management systems, slab allocators help efficiently manage"
                )?;
                write!(
                    f,
                    "fixed-size memory chunks, reducing fragmentation and speeding up allocations."
                )
            }
        }
    }
}

/// Statistics for the whole pool manager
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolStats {
    /// One entry per size class, sorted by size
    pub size_classes: Vec<SizeClassStats>,
    /// Blocks currently lent out across all classes
    pub total_allocated: usize,
    /// Blocks waiting for reuse across all classes
    pub total_free: usize,
    /// Bytes retained by the pool (allocated + free blocks)
    pub retained_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeClassStats {
    pub size: usize,
    pub allocated: usize,
    pub free: usize,
}
