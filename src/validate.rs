//! Rank and shape agreement checks across the four views of a call.
//!
//! Validation runs to completion before any kernel is selected, so every
//! failure is reported with zero callback invocations and zero writes.

use crate::{Result, StridedError};

/// Aggregate facts about the shared shape, collected in one scan.
#[derive(Debug)]
pub(crate) struct ShapeInfo {
    /// Product of extents; zero when any dimension is empty.
    pub(crate) numel: usize,
    /// Number of size-1 dimensions.
    pub(crate) singletons: usize,
}

/// Confirm the four views (destination first) share rank and per-dimension
/// extents, accumulating element and singleton counts along the way.
pub(crate) fn check_shapes(shapes: [&[usize]; 4]) -> Result<ShapeInfo> {
    let ranks = [
        shapes[0].len(),
        shapes[1].len(),
        shapes[2].len(),
        shapes[3].len(),
    ];
    if ranks[1] != ranks[0] || ranks[2] != ranks[0] || ranks[3] != ranks[0] {
        return Err(StridedError::RankMismatch(ranks));
    }

    let mut numel = 1usize;
    let mut singletons = 0usize;
    for i in 0..ranks[0] {
        let d = shapes[0][i];
        if shapes[1][i] != d || shapes[2][i] != d || shapes[3][i] != d {
            return Err(StridedError::ShapeMismatch {
                dim: i,
                extents: [shapes[0][i], shapes[1][i], shapes[2][i], shapes[3][i]],
            });
        }
        numel = numel.saturating_mul(d);
        if d == 1 {
            singletons += 1;
        }
    }
    Ok(ShapeInfo { numel, singletons })
}
