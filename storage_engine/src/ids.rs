//! Typed engine handles
//!
//! Handles are allocated from one counter per engine, so ids of different
//! kinds never collide and are never reused.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! engine_id {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u64);

        impl $name {
            pub fn as_raw(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }
    };
}

engine_id!(
    /// An open container file
    FileId,
    "File"
);
engine_id!(
    /// An open dataset inside a container
    DatasetId,
    "Dataset"
);
engine_id!(
    /// A dataspace: an extent plus an optional hyperslab selection
    SpaceId,
    "Space"
);

/// Monotonic handle allocator
#[derive(Debug)]
pub(crate) struct IdAllocator(AtomicU64);

impl IdAllocator {
    pub(crate) fn new() -> Self {
        Self(AtomicU64::new(1))
    }

    pub(crate) fn next<T: From<u64>>(&self) -> T {
        T::from(self.0.fetch_add(1, Ordering::Relaxed))
    }
}
