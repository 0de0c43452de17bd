//! Block size computation for cache-friendly tiled iteration.
//!
//! Given dimensions in iteration order and the byte strides of the four
//! views, pick per-dimension block extents so the memory region touched by
//! one tile stays within [`BLOCK_MEMORY_SIZE`]. The estimate is cache-line
//! aware: strides below a cache line extend a contiguous run, larger strides
//! multiply the number of distinct lines touched. Element size enters as a
//! parameter, so wider dtypes get proportionally smaller tiles.

use crate::stride_math::index_order;
use crate::{BLOCK_MEMORY_SIZE, CACHE_LINE_SIZE};

/// Compute block sizes, in iteration order, for tiled traversal.
///
/// `dims` are the original dimensions, `order` the iteration permutation
/// (innermost first), `strides4` the per-view stride arrays (destination
/// first), and `elem_size` the byte width of one element.
pub(crate) fn compute_block_sizes(
    dims: &[usize],
    order: &[usize],
    strides4: &[&[isize]; 4],
    elem_size: usize,
) -> Vec<usize> {
    if order.is_empty() {
        return Vec::new();
    }

    let ordered_dims: Vec<usize> = order.iter().map(|&i| dims[i]).collect();

    // Byte strides in iteration order, one row per view.
    let byte_strides: Vec<Vec<isize>> = strides4
        .iter()
        .map(|strides| {
            order
                .iter()
                .map(|&i| strides[i] * elem_size as isize)
                .collect()
        })
        .collect();

    let stride_orders: Vec<Vec<usize>> = byte_strides.iter().map(|bs| index_order(bs)).collect();

    let reordered: Vec<Vec<isize>> = strides4
        .iter()
        .map(|strides| order.iter().map(|&i| strides[i]).collect())
        .collect();
    let costs = compute_costs(&reordered);

    let byte_refs: Vec<&[isize]> = byte_strides.iter().map(|s| s.as_slice()).collect();
    let order_refs: Vec<&[usize]> = stride_orders.iter().map(|s| s.as_slice()).collect();

    compute_blocks(&ordered_dims, &costs, &byte_refs, &order_refs, BLOCK_MEMORY_SIZE)
}

/// Iterative block reduction.
///
/// If the full working set fits the target, tiles are the whole dimensions.
/// A leading dimension that is the smallest stride in every view is kept
/// whole and the reduction recurses on the rest. Otherwise dimensions are
/// halved (then decremented) by cost-weighted argmax until the estimated
/// region fits.
fn compute_blocks(
    dims: &[usize],
    costs: &[isize],
    byte_strides: &[&[isize]],
    stride_orders: &[&[usize]],
    block_size: usize,
) -> Vec<usize> {
    let n = dims.len();
    if n == 0 {
        return Vec::new();
    }

    if total_memory_region(dims, byte_strides) <= block_size {
        return dims.to_vec();
    }

    let min_order = stride_orders
        .iter()
        .filter_map(|orders| orders.iter().min().copied())
        .min()
        .unwrap_or(1);

    if stride_orders
        .iter()
        .all(|orders| !orders.is_empty() && orders[0] == min_order)
    {
        // Innermost dimension is the smallest stride everywhere: keep it
        // whole and shrink the outer dimensions instead.
        let tail_bytes: Vec<&[isize]> = byte_strides.iter().map(|s| &s[1..]).collect();
        let tail_orders: Vec<&[usize]> = stride_orders.iter().map(|s| &s[1..]).collect();
        let tail = compute_blocks(&dims[1..], &costs[1..], &tail_bytes, &tail_orders, block_size);

        let mut result = Vec::with_capacity(n);
        result.push(dims[0]);
        result.extend(tail);
        return result;
    }

    let min_stride = byte_strides
        .iter()
        .filter_map(|s| s.iter().map(|x| x.unsigned_abs()).min())
        .min()
        .unwrap_or(0);
    if min_stride > block_size {
        return vec![1; n];
    }

    let mut blocks = dims.to_vec();

    // Halve until within 2x of the target.
    while total_memory_region(&blocks, byte_strides) >= 2 * block_size {
        match last_argmax_weighted(&blocks, costs) {
            Some(i) => blocks[i] = (blocks[i] + 1) / 2,
            None => break,
        }
    }

    // Decrement the rest of the way.
    while total_memory_region(&blocks, byte_strides) > block_size {
        match last_argmax_weighted(&blocks, costs) {
            Some(i) => blocks[i] -= 1,
            None => break,
        }
    }

    blocks
}

/// Estimate the bytes a tile of the given extents touches across all views.
///
/// Per view, strides below a cache line grow one contiguous run; strides of
/// a cache line or more multiply the count of separate line blocks.
fn total_memory_region(dims: &[usize], byte_strides: &[&[isize]]) -> usize {
    let mut memory_region = 0usize;

    for strides in byte_strides {
        let mut contiguous_bytes = 0usize;
        let mut line_blocks = 1usize;

        for (&d, &s) in dims.iter().zip(strides.iter()) {
            let s_abs = s.unsigned_abs();
            if s_abs < CACHE_LINE_SIZE {
                contiguous_bytes += d.saturating_sub(1) * s_abs;
            } else {
                line_blocks *= d;
            }
        }

        let contiguous_lines = contiguous_bytes / CACHE_LINE_SIZE + 1;
        memory_region += CACHE_LINE_SIZE * contiguous_lines * line_blocks;
    }

    memory_region
}

/// Last index maximizing `(block - 1) * cost`, skipping exhausted dimensions.
fn last_argmax_weighted(blocks: &[usize], costs: &[isize]) -> Option<usize> {
    let mut max_score = 0isize;
    let mut max_idx = None;
    for (i, (&b, &c)) in blocks.iter().zip(costs.iter()).enumerate() {
        if b <= 1 {
            continue;
        }
        let score = (b as isize - 1) * c;
        if score >= max_score {
            max_score = score;
            max_idx = Some(i);
        }
    }
    max_idx
}

/// Per-dimension reduction cost: the minimum stride magnitude across views,
/// with zero mapped to 1 and everything else doubled.
fn compute_costs(strides_rows: &[Vec<isize>]) -> Vec<isize> {
    let n = strides_rows.first().map_or(0, |s| s.len());
    let mut costs = vec![isize::MAX; n];
    for strides in strides_rows {
        for (cost, &s) in costs.iter_mut().zip(strides.iter()) {
            *cost = (*cost).min(s.abs());
        }
    }
    for cost in &mut costs {
        *cost = if *cost == 0 { 1 } else { *cost * 2 };
    }
    costs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_region_contiguous() {
        // 100 f64s: 99 * 8 = 792 contiguous bytes -> 13 cache lines.
        let dims = [100usize];
        let strides = [8isize];
        let byte_strides: Vec<&[isize]> = vec![&strides];
        assert_eq!(total_memory_region(&dims, &byte_strides), 832);
    }

    #[test]
    fn test_memory_region_strided() {
        // Stride of two cache lines: every element its own line block.
        let dims = [10usize];
        let strides = [128isize];
        let byte_strides: Vec<&[isize]> = vec![&strides];
        assert_eq!(total_memory_region(&dims, &byte_strides), 640);
    }

    #[test]
    fn test_blocks_fit_in_cache() {
        let dims = [10usize, 10];
        let costs = [2isize, 2];
        let strides = [8isize, 80];
        let orders = [1usize, 2];
        let byte_strides: Vec<&[isize]> = vec![&strides];
        let stride_orders: Vec<&[usize]> = vec![&orders];
        let blocks = compute_blocks(&dims, &costs, &byte_strides, &stride_orders, BLOCK_MEMORY_SIZE);
        assert_eq!(blocks, vec![10, 10]);
    }

    #[test]
    fn test_blocks_reduced_for_large_arrays() {
        let dims = [1000usize, 1000];
        let costs = [2isize, 2];
        let strides = [8isize, 8000];
        let orders = [1usize, 2];
        let byte_strides: Vec<&[isize]> = vec![&strides];
        let stride_orders: Vec<&[usize]> = vec![&orders];
        let blocks = compute_blocks(&dims, &costs, &byte_strides, &stride_orders, BLOCK_MEMORY_SIZE);
        assert!(blocks[0] >= 1 && blocks[0] <= 1000);
        assert!(blocks[1] >= 1 && blocks[1] <= 1000);
        assert!(blocks[0] * blocks[1] < 1000 * 1000);
    }

    #[test]
    fn test_last_argmax_weighted() {
        // (10-1)*1=9, (20-1)*1=19, (5-1)*2=8 -> index 1; ties pick the last.
        assert_eq!(last_argmax_weighted(&[10, 20, 5], &[1, 1, 2]), Some(1));
        assert_eq!(last_argmax_weighted(&[10, 10], &[1, 1]), Some(1));
        assert_eq!(last_argmax_weighted(&[1, 1], &[1, 1]), None);
    }

    #[test]
    fn test_compute_costs() {
        let rows = vec![vec![1isize, 4, 0], vec![2isize, 1, 0]];
        assert_eq!(compute_costs(&rows), vec![2, 2, 1]);
    }

    #[test]
    fn test_compute_block_sizes_pipeline() {
        let dims = [100usize, 100];
        let order = [0usize, 1];
        let s = [1isize, 100];
        let blocks = compute_block_sizes(&dims, &order, &[&s, &s, &s, &s], 8);
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0] >= 1 && blocks[0] <= 100);
        assert!(blocks[1] >= 1 && blocks[1] <= 100);
    }
}
