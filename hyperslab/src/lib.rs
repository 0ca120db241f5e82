//! # Hyperslab Selector
//!
//! Pure selection math for regularly-shaped sub-regions of N-dimensional
//! arrays.
//!
//! ## Philosophy
//!
//! - **Validate, never clamp**: a request that reaches past the extent is an
//!   error naming the offending dimension.
//! - **No shared state**: every function here is a computation over its
//!   arguments and is safe to call from any number of threads.
//! - **Engines move runs, not indices**: selections are lowered to
//!   contiguous row-major runs so byte copies stay large.
//!
//! ## Key Types
//!
//! - [`Selection`]: offset/stride/count/block per dimension
//! - [`SelectionRequest`]: a range along dimension 0 or an explicit hyperslab
//! - [`SelectionPlan`]: a validated selection with its memory layout and size
//! - [`Runs`]: a selection lowered to contiguous element runs

pub mod error;
pub mod plan;
pub mod runs;
pub mod selection;

pub use error::{BoundsError, SelectionError};
pub use plan::{compute_selection, SelectionPlan, SelectionRequest};
pub use runs::{pair_runs, PairRuns, Run, Runs, Segment};
pub use selection::Selection;
