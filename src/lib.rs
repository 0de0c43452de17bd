//! Cache-optimized ternary element-wise application over strided ndarray views.
//!
//! This crate implements the traversal engine behind `output = f(x, y, z)` for
//! four multidimensional array views of identical shape, each described by a
//! buffer, shape, per-dimension strides, a starting offset, and a memory order.
//! The engine never copies or allocates element storage: it reads through the
//! three input views and writes through the output view, choosing among several
//! iteration strategies to keep memory access as sequential as possible.
//!
//! # Core Types
//!
//! - [`View`] / [`ViewMut`]: Zero-copy strided descriptors over existing data
//! - [`Accessor`] / [`AccessorMut`]: get/set protocol for buffers that cannot
//!   be indexed directly (bit-packed, interleaved, ...)
//! - [`MemoryOrder`]: row-major or column-major linear-index decomposition
//!
//! # Primary API
//!
//! - [`apply_ternary`]: apply a callback element-wise across three inputs,
//!   writing results into the destination view
//!
//! # Example
//!
//! ```rust
//! use strided_ternary::{apply_ternary, MemoryOrder, View, ViewMut};
//!
//! let x = vec![1.0, 2.0, 3.0, 4.0];
//! let y = vec![1.0; 4];
//! let z = vec![2.0; 4];
//! let mut out = vec![0.0; 4];
//!
//! let shape = [4usize];
//! let strides = [1isize];
//! let xv = View::new(&x, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
//! let yv = View::new(&y, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
//! let zv = View::new(&z, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
//! let mut ov = ViewMut::new(&mut out, &shape, &strides, 0, MemoryOrder::RowMajor).unwrap();
//!
//! apply_ternary(&mut ov, &xv, &yv, &zv, |a, b, c| a + b + c).unwrap();
//! assert_eq!(out, vec![4.0, 5.0, 6.0, 7.0]);
//! ```
//!
//! # Dispatch
//!
//! A single call classifies the four views by rank, contiguity, stride
//! direction, and memory-order agreement, then runs exactly one kernel:
//!
//! - fully contiguous views collapse to a single linear scan
//! - views with a shared memory order run unrolled fixed-rank loops with the
//!   fastest-varying dimension innermost (loop interchange)
//! - disagreeing or indeterminate layouts run cache-blocked tiled loops with
//!   a compromise iteration order ([`BLOCK_MEMORY_SIZE`] working-set target)
//! - ranks above [`MAX_KERNEL_RANK`] fall back to per-element index
//!   decomposition honoring each view's own memory order
//!
//! All paths produce identical results; only the traversal order differs, and
//! callers must not rely on any particular visitation order.

mod apply;
mod block;
mod kernel;
mod order;
mod stride_math;
mod validate;
pub mod view;

pub use apply::apply_ternary;
pub use stride_math::{
    index_to_offset, iteration_order, min_max_index, strides_order, StrideClass,
};
pub use view::{Accessor, AccessorMut, MemoryOrder, Storage, StorageMut, View, ViewMut};

// ============================================================================
// Constants
// ============================================================================

/// Block memory size for cache-optimized iteration (L1 cache target).
///
/// Tiled iteration bounds the working set touched by the innermost loops to
/// this many bytes across all four views.
pub const BLOCK_MEMORY_SIZE: usize = 32 * 1024;

/// Cache line size in bytes, used for memory region estimates during block
/// size computation.
pub const CACHE_LINE_SIZE: usize = 64;

/// Highest rank served by the specialized (fixed-rank and blocked) kernels.
///
/// Views of higher rank are handled by the generic per-element fallback.
pub const MAX_KERNEL_RANK: usize = 10;

// ============================================================================
// Error types
// ============================================================================

/// Errors that can occur during strided ternary application.
///
/// Rank and shape errors are reported before any callback invocation; once a
/// kernel starts iterating there is no recovery, and a panicking callback
/// unwinds with the output partially written.
#[derive(Debug, thiserror::Error)]
pub enum StridedError {
    /// The four views do not share a common rank.
    ///
    /// Ranks are reported destination first, then the three inputs.
    #[error("rank mismatch across views: {0:?}")]
    RankMismatch([usize; 4]),

    /// The four views share a rank but differ in one dimension's extent.
    ///
    /// Extents are reported destination first, then the three inputs.
    #[error("shape mismatch in dimension {dim}: {extents:?}")]
    ShapeMismatch { dim: usize, extents: [usize; 4] },

    /// Shape and stride arrays of a view have different lengths.
    #[error("stride and shape length mismatch: {shape_len} vs {strides_len}")]
    StrideLengthMismatch {
        shape_len: usize,
        strides_len: usize,
    },

    /// A view's reachable index range escapes its buffer.
    #[error("view reaches index {index} outside buffer of length {len}")]
    OutOfBounds { index: isize, len: usize },

    /// A linear index exceeded the element count during index decomposition.
    ///
    /// Seeing this after shape validation passed indicates an internal
    /// invariant violation in the generic kernel.
    #[error("linear index {index} out of range for {numel} elements")]
    IndexOutOfBounds { index: usize, numel: usize },
}

/// Result type for strided ternary operations.
pub type Result<T> = std::result::Result<T, StridedError>;
