//! Pure stride arithmetic: scan direction, reachable index range, layout
//! classification, and linear-index decomposition.
//!
//! Everything here is allocation-free and operates on the raw
//! shape/strides/offset triple of a single view; the dispatcher combines the
//! answers across the four views of a call.

use crate::view::MemoryOrder;
use crate::{Result, StridedError};

/// Layout classification of a stride array.
///
/// A view is row-major consistent when stride magnitudes never increase from
/// the first dimension to the last (last dimension fastest), column-major
/// consistent when they never decrease. Both flags are set for layouts that
/// satisfy both (rank 0/1, tied magnitudes); neither flag means the strides
/// are not monotone in either direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrideClass {
    pub row_major: bool,
    pub col_major: bool,
}

impl StrideClass {
    /// Layouts compatible with both classifications.
    pub const BOTH: StrideClass = StrideClass {
        row_major: true,
        col_major: true,
    };

    /// Intersection of two classifications.
    #[inline]
    pub fn meet(self, other: StrideClass) -> StrideClass {
        StrideClass {
            row_major: self.row_major && other.row_major,
            col_major: self.col_major && other.col_major,
        }
    }

    /// Whether the classification admits at least one shared order.
    #[inline]
    pub fn is_ordered(self) -> bool {
        self.row_major || self.col_major
    }
}

/// Scan direction of a stride array.
///
/// Returns `1` when every stride is positive (iterating the view visits
/// buffer addresses in ascending order), `-1` when every stride is negative,
/// and `0` when signs are mixed or any stride is zero. A zero stride makes
/// the direction indeterminate: the same buffer address is revisited, so the
/// view cannot be reduced to a single linear scan.
pub fn iteration_order(strides: &[isize]) -> i8 {
    let mut positive = 0usize;
    let mut negative = 0usize;
    for &s in strides {
        if s > 0 {
            positive += 1;
        } else if s < 0 {
            negative += 1;
        } else {
            return 0;
        }
    }
    if negative == 0 {
        1
    } else if positive == 0 {
        -1
    } else {
        0
    }
}

/// Minimum and maximum buffer index reachable by a view.
///
/// Per dimension, a positive stride pushes the maximum out by
/// `(extent - 1) * stride` while a negative stride pulls the minimum down,
/// all relative to `offset`. Dimensions of extent zero contribute nothing;
/// callers short-circuit empty views before dereferencing anything.
pub fn min_max_index(shape: &[usize], strides: &[isize], offset: usize) -> (isize, isize) {
    let mut min = offset as isize;
    let mut max = offset as isize;
    for (&d, &s) in shape.iter().zip(strides.iter()) {
        if d == 0 {
            continue;
        }
        let span = (d as isize - 1) * s;
        if span < 0 {
            min += span;
        } else {
            max += span;
        }
    }
    (min, max)
}

/// Classify a stride array as row-major and/or column-major consistent.
///
/// Comparison uses stride magnitudes, so reversed (negative-stride) views
/// classify the same as their forward counterparts.
pub fn strides_order(strides: &[isize]) -> StrideClass {
    if strides.len() < 2 {
        return StrideClass::BOTH;
    }
    let mut row_major = true;
    let mut col_major = true;
    let mut prev = strides[0].unsigned_abs();
    for &s in &strides[1..] {
        let cur = s.unsigned_abs();
        if cur > prev {
            row_major = false;
        }
        if cur < prev {
            col_major = false;
        }
        prev = cur;
    }
    StrideClass {
        row_major,
        col_major,
    }
}

/// Convert a flat index in `[0, numel)` into a buffer offset.
///
/// The flat index is decomposed into per-dimension coordinates according to
/// `order` (row-major: last dimension fastest; column-major: first dimension
/// fastest), then folded through the strides. Fails with
/// [`StridedError::IndexOutOfBounds`] when `linear` is not below the element
/// count, which keeps every decomposed coordinate within `shape[i] - 1`.
pub fn index_to_offset(
    shape: &[usize],
    strides: &[isize],
    offset: usize,
    order: MemoryOrder,
    linear: usize,
) -> Result<isize> {
    let numel: usize = shape.iter().product();
    if linear >= numel {
        return Err(StridedError::IndexOutOfBounds {
            index: linear,
            numel,
        });
    }
    let mut rem = linear;
    let mut off = offset as isize;
    match order {
        MemoryOrder::RowMajor => {
            for i in (0..shape.len()).rev() {
                let coord = rem % shape[i];
                rem /= shape[i];
                off += coord as isize * strides[i];
            }
        }
        MemoryOrder::ColMajor => {
            for i in 0..shape.len() {
                let coord = rem % shape[i];
                rem /= shape[i];
                off += coord as isize * strides[i];
            }
        }
    }
    Ok(off)
}

/// Relative rank of each stride among the others, by magnitude.
///
/// `result[i]` is 1 plus the number of non-zero strides with strictly smaller
/// magnitude than `strides[i]`; zero strides rank first. Used by the loop
/// ordering and block size computations.
pub(crate) fn index_order(strides: &[isize]) -> Vec<usize> {
    let mut result = vec![1usize; strides.len()];
    for (i, &si) in strides.iter().enumerate() {
        let si = si.unsigned_abs();
        if si == 0 {
            continue;
        }
        let mut k = 1usize;
        for &s in strides {
            if s != 0 && s.unsigned_abs() < si {
                k += 1;
            }
        }
        result[i] = k;
    }
    result
}
