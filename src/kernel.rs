//! The rank-parameterized traversal core shared by the fixed-rank and
//! blocked kernels.
//!
//! Dimensions arrive with an iteration-order permutation (innermost first)
//! and per-dimension block extents. The walker maintains one running offset
//! per view and hands the innermost runs to a callback as
//! `(offsets, block_len, inner_strides)`; the caller supplies the per-element
//! loop (direct pointer walk or accessor get/set). Ranks 1-4 are unrolled,
//! higher ranks use a recursive level walker. When `block == dims` the block
//! loops collapse to plain nested loops, so the same code serves both the
//! untiled fixed-rank path and the cache-blocked path.

use crate::{block, order, Result};

/// Iteration order plus block extents, both innermost first.
pub(crate) struct KernelPlan {
    /// Permutation of dimension indices; `order[0]` is the innermost loop.
    pub(crate) order: Vec<usize>,
    /// Block extent per ordered dimension.
    pub(crate) block: Vec<usize>,
}

/// Plan for the cache-blocked path: compromise iteration order across the
/// four views, then tile extents fitting the cache target.
pub(crate) fn build_plan(
    dims: &[usize],
    strides4: &[&[isize]; 4],
    elem_size: usize,
) -> KernelPlan {
    let order = order::compute_order(dims, strides4);
    let block = block::compute_block_sizes(dims, &order, strides4, elem_size);
    KernelPlan { order, block }
}

/// Plan for the fixed-rank path: pure loop interchange, no tiling.
///
/// All four views share a memory-order classification, so the innermost loop
/// is the last dimension for row-major layouts and the first for
/// column-major. Blocks equal the full extents.
pub(crate) fn interchange_plan(dims: &[usize], row_major: bool) -> KernelPlan {
    let rank = dims.len();
    let order: Vec<usize> = if row_major {
        (0..rank).rev().collect()
    } else {
        (0..rank).collect()
    };
    let block: Vec<usize> = order.iter().map(|&d| dims[d]).collect();
    KernelPlan { order, block }
}

/// Per-dimension stride quad, destination first.
type Quad = [isize; 4];

#[inline]
fn advance(offsets: &mut Quad, strides: &Quad, n: isize) {
    for k in 0..4 {
        offsets[k] += n * strides[k];
    }
}

/// Walk all blocks, invoking `f` once per innermost run.
///
/// `f` receives the current offset quad (relative to each view's base
/// offset), the number of elements in the run, and the innermost stride
/// quad; it must visit exactly `len` elements.
#[inline]
pub(crate) fn for_each_inner_block<F>(
    dims: &[usize],
    plan: &KernelPlan,
    strides4: &[&[isize]; 4],
    mut f: F,
) -> Result<()>
where
    F: FnMut(&Quad, usize, &Quad) -> Result<()>,
{
    let rank = dims.len();
    if rank == 0 {
        return f(&[0; 4], 1, &[0; 4]);
    }

    let ordered_dims: Vec<usize> = plan.order.iter().map(|&d| dims[d]).collect();
    let quads: Vec<Quad> = plan
        .order
        .iter()
        .map(|&d| {
            [
                strides4[0][d],
                strides4[1][d],
                strides4[2][d],
                strides4[3][d],
            ]
        })
        .collect();

    let mut offsets: Quad = [0; 4];

    match rank {
        1 => kernel_1d(&ordered_dims, &plan.block, &quads, &mut offsets, &mut f),
        2 => kernel_2d(&ordered_dims, &plan.block, &quads, &mut offsets, &mut f),
        3 => kernel_3d(&ordered_dims, &plan.block, &quads, &mut offsets, &mut f),
        4 => kernel_4d(&ordered_dims, &plan.block, &quads, &mut offsets, &mut f),
        _ => kernel_nd_level(
            rank - 1,
            &ordered_dims,
            &plan.block,
            &quads,
            &quads[0],
            &mut offsets,
            &mut f,
        ),
    }
}

#[inline]
fn kernel_1d<F>(
    dims: &[usize],
    blocks: &[usize],
    s: &[Quad],
    offsets: &mut Quad,
    f: &mut F,
) -> Result<()>
where
    F: FnMut(&Quad, usize, &Quad) -> Result<()>,
{
    let d0 = dims[0];
    let b0 = blocks[0].clamp(1, d0);

    let mut j0 = 0usize;
    while j0 < d0 {
        let blen = b0.min(d0 - j0);
        f(offsets, blen, &s[0])?;
        advance(offsets, &s[0], blen as isize);
        j0 += blen;
    }
    advance(offsets, &s[0], -(d0 as isize));
    Ok(())
}

/// Loop nesting: outer = dim 1 (largest stride), inner run = dim 0.
#[inline]
fn kernel_2d<F>(
    dims: &[usize],
    blocks: &[usize],
    s: &[Quad],
    offsets: &mut Quad,
    f: &mut F,
) -> Result<()>
where
    F: FnMut(&Quad, usize, &Quad) -> Result<()>,
{
    let d0 = dims[0];
    let d1 = dims[1];
    let b0 = blocks[0].clamp(1, d0);
    let b1 = blocks[1].clamp(1, d1);

    let mut j1 = 0usize;
    while j1 < d1 {
        let blen1 = b1.min(d1 - j1);

        let mut j0 = 0usize;
        while j0 < d0 {
            let blen0 = b0.min(d0 - j0);

            for _ in 0..blen1 {
                f(offsets, blen0, &s[0])?;
                advance(offsets, &s[1], 1);
            }
            advance(offsets, &s[1], -(blen1 as isize));
            advance(offsets, &s[0], blen0 as isize);
            j0 += blen0;
        }
        advance(offsets, &s[0], -(d0 as isize));
        advance(offsets, &s[1], blen1 as isize);
        j1 += blen1;
    }
    advance(offsets, &s[1], -(d1 as isize));
    Ok(())
}

/// Loop nesting: outer = dim 2, mid = dim 1, inner run = dim 0.
#[inline]
fn kernel_3d<F>(
    dims: &[usize],
    blocks: &[usize],
    s: &[Quad],
    offsets: &mut Quad,
    f: &mut F,
) -> Result<()>
where
    F: FnMut(&Quad, usize, &Quad) -> Result<()>,
{
    let d0 = dims[0];
    let d1 = dims[1];
    let d2 = dims[2];
    let b0 = blocks[0].clamp(1, d0);
    let b1 = blocks[1].clamp(1, d1);
    let b2 = blocks[2].clamp(1, d2);

    let mut j2 = 0usize;
    while j2 < d2 {
        let blen2 = b2.min(d2 - j2);

        let mut j1 = 0usize;
        while j1 < d1 {
            let blen1 = b1.min(d1 - j1);

            let mut j0 = 0usize;
            while j0 < d0 {
                let blen0 = b0.min(d0 - j0);

                for _ in 0..blen2 {
                    for _ in 0..blen1 {
                        f(offsets, blen0, &s[0])?;
                        advance(offsets, &s[1], 1);
                    }
                    advance(offsets, &s[1], -(blen1 as isize));
                    advance(offsets, &s[2], 1);
                }
                advance(offsets, &s[2], -(blen2 as isize));
                advance(offsets, &s[0], blen0 as isize);
                j0 += blen0;
            }
            advance(offsets, &s[0], -(d0 as isize));
            advance(offsets, &s[1], blen1 as isize);
            j1 += blen1;
        }
        advance(offsets, &s[1], -(d1 as isize));
        advance(offsets, &s[2], blen2 as isize);
        j2 += blen2;
    }
    advance(offsets, &s[2], -(d2 as isize));
    Ok(())
}

/// Loop nesting: outer = dim 3, then 2, 1, inner run = dim 0.
#[inline]
fn kernel_4d<F>(
    dims: &[usize],
    blocks: &[usize],
    s: &[Quad],
    offsets: &mut Quad,
    f: &mut F,
) -> Result<()>
where
    F: FnMut(&Quad, usize, &Quad) -> Result<()>,
{
    let d0 = dims[0];
    let d1 = dims[1];
    let d2 = dims[2];
    let d3 = dims[3];
    let b0 = blocks[0].clamp(1, d0);
    let b1 = blocks[1].clamp(1, d1);
    let b2 = blocks[2].clamp(1, d2);
    let b3 = blocks[3].clamp(1, d3);

    let mut j3 = 0usize;
    while j3 < d3 {
        let blen3 = b3.min(d3 - j3);

        let mut j2 = 0usize;
        while j2 < d2 {
            let blen2 = b2.min(d2 - j2);

            let mut j1 = 0usize;
            while j1 < d1 {
                let blen1 = b1.min(d1 - j1);

                let mut j0 = 0usize;
                while j0 < d0 {
                    let blen0 = b0.min(d0 - j0);

                    for _ in 0..blen3 {
                        for _ in 0..blen2 {
                            for _ in 0..blen1 {
                                f(offsets, blen0, &s[0])?;
                                advance(offsets, &s[1], 1);
                            }
                            advance(offsets, &s[1], -(blen1 as isize));
                            advance(offsets, &s[2], 1);
                        }
                        advance(offsets, &s[2], -(blen2 as isize));
                        advance(offsets, &s[3], 1);
                    }
                    advance(offsets, &s[3], -(blen3 as isize));
                    advance(offsets, &s[0], blen0 as isize);
                    j0 += blen0;
                }
                advance(offsets, &s[0], -(d0 as isize));
                advance(offsets, &s[1], blen1 as isize);
                j1 += blen1;
            }
            advance(offsets, &s[1], -(d1 as isize));
            advance(offsets, &s[2], blen2 as isize);
            j2 += blen2;
        }
        advance(offsets, &s[2], -(d2 as isize));
        advance(offsets, &s[3], blen3 as isize);
        j3 += blen3;
    }
    advance(offsets, &s[3], -(d3 as isize));
    Ok(())
}

/// Recursive walker for ranks above 4.
///
/// `level` counts down from `rank - 1` (outermost) to 0 (the innermost run).
fn kernel_nd_level<F>(
    level: usize,
    dims: &[usize],
    blocks: &[usize],
    s: &[Quad],
    inner: &Quad,
    offsets: &mut Quad,
    f: &mut F,
) -> Result<()>
where
    F: FnMut(&Quad, usize, &Quad) -> Result<()>,
{
    let d = dims[level];
    let b = blocks[level].clamp(1, d);

    if level == 0 {
        let mut j = 0usize;
        while j < d {
            let blen = b.min(d - j);
            f(offsets, blen, inner)?;
            advance(offsets, &s[0], blen as isize);
            j += blen;
        }
        advance(offsets, &s[0], -(d as isize));
        return Ok(());
    }

    let mut j = 0usize;
    while j < d {
        let blen = b.min(d - j);
        for _ in 0..blen {
            kernel_nd_level(level - 1, dims, blocks, s, inner, offsets, f)?;
            advance(offsets, &s[level], 1);
        }
        j += blen;
    }
    advance(offsets, &s[level], -(d as isize));
    Ok(())
}
