//! Loop interchange: choosing one iteration order for four views at once.
//!
//! Each view would prefer its own smallest-stride dimension innermost; when
//! the four layouts disagree a compromise is needed. Dimensions are ranked by
//! an importance score that bit-packs each view's stride order, with the
//! destination weighted twice (writes are costlier to scatter than reads).
//! The resulting permutation lists dimensions innermost first.

use crate::stride_math::index_order;

/// Compute the compromise iteration order for the four views.
///
/// `strides4` is destination first. Returns a permutation of dimension
/// indices with `order[0]` the innermost (fastest-varying) loop. Size-1
/// dimensions score zero importance and sink to the outermost positions.
pub(crate) fn compute_order(dims: &[usize], strides4: &[&[isize]; 4]) -> Vec<usize> {
    let rank = dims.len();
    if rank == 0 {
        return Vec::new();
    }

    // Bits per view in the packed score: enough to keep the four per-view
    // ranks from carrying into each other when summed.
    let g = (usize::BITS - (strides4.len() + 1).leading_zeros()) as u64;

    let mut importance = vec![0u64; rank];
    for (k, strides) in strides4.iter().enumerate() {
        let ranks = index_order(strides);
        let weight = if k == 0 { 2u64 } else { 1 };
        for i in 0..rank {
            importance[i] += weight << (g * (rank - ranks[i]) as u64);
        }
    }
    for i in 0..rank {
        if dims[i] <= 1 {
            importance[i] = 0;
        }
    }

    let mut order: Vec<usize> = (0..rank).collect();
    order.sort_by(|&a, &b| importance[b].cmp(&importance[a]).then_with(|| a.cmp(&b)));
    order
}
