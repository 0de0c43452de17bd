//! Ternary dispatch: shape validation, fast-path detection, kernel selection.
//!
//! One call classifies the four views by rank, singleton structure, scan
//! direction, memory-order agreement, and contiguity, then runs exactly one
//! kernel. The direct (all-slice) paths walk raw pointers; if any view is
//! accessor-backed the same traversal drives `get`/`set` at computed buffer
//! indices instead. Collapsed fast paths operate on local derived
//! descriptors, never on the caller's views.

use crate::kernel::{self, KernelPlan};
use crate::stride_math::{
    index_to_offset, iteration_order, min_max_index, strides_order, StrideClass,
};
use crate::validate::check_shapes;
use crate::view::{Storage, StorageMut, View, ViewMut};
use crate::{Result, MAX_KERNEL_RANK};

/// Apply `f` element-wise across three input views, writing into `dest`.
///
/// All four views must share rank and shape exactly; broadcasting must be
/// resolved by the caller beforehand (zero strides are legal and express
/// pre-broadcast dimensions). On success every destination coordinate has
/// been written exactly once with `f(x, y, z)` of the corresponding input
/// coordinates. Traversal order is unspecified and varies with layout.
///
/// Fails before any callback invocation on rank or shape disagreement;
/// returns immediately (no-op) when the shared shape contains a zero extent.
/// A panic in `f` propagates unmodified and may leave `dest` partially
/// written.
pub fn apply_ternary<T, F>(
    dest: &mut ViewMut<'_, T>,
    x: &View<'_, T>,
    y: &View<'_, T>,
    z: &View<'_, T>,
    f: F,
) -> Result<()>
where
    T: Copy,
    F: Fn(T, T, T) -> T,
{
    let info = check_shapes([dest.shape, x.shape, y.shape, z.shape])?;
    if info.numel == 0 {
        return Ok(());
    }

    let bases = [
        dest.offset as isize,
        x.offset as isize,
        y.offset as isize,
        z.offset as isize,
    ];

    // Rank 0 and all-singleton shapes: one callback application at each
    // view's offset.
    if info.numel == 1 {
        let lin = Linear {
            len: 1,
            strides: [0; 4],
            bases,
        };
        return apply_linear(dest, x, y, z, &lin, &f);
    }

    let rank = dest.rank();
    if rank == 1 {
        let lin = Linear {
            len: dest.shape[0],
            strides: [dest.strides[0], x.strides[0], y.strides[0], z.strides[0]],
            bases,
        };
        return apply_linear(dest, x, y, z, &lin, &f);
    }

    // Exactly one non-singleton dimension: iterate it as 1-D.
    if info.singletons == rank - 1 {
        let dim = dest
            .shape
            .iter()
            .position(|&d| d != 1)
            .unwrap_or(0);
        let lin = Linear {
            len: dest.shape[dim],
            strides: [
                dest.strides[dim],
                x.strides[dim],
                y.strides[dim],
                z.strides[dim],
            ],
            bases,
        };
        return apply_linear(dest, x, y, z, &lin, &f);
    }

    let strides4 = [dest.strides, x.strides, y.strides, z.strides];
    let scans = [
        iteration_order(strides4[0]),
        iteration_order(strides4[1]),
        iteration_order(strides4[2]),
        iteration_order(strides4[3]),
    ];

    if let Some(row_major) = shared_order(&scans, &strides4) {
        // Every view flattens to one linear run: collapse to 1-D, scanning
        // each view in its own direction from its own end of the range.
        if let Some(lin) = collapse_contiguous(dest, x, y, z, info.numel, &scans) {
            return apply_linear(dest, x, y, z, &lin, &f);
        }
        if rank <= MAX_KERNEL_RANK {
            let plan = kernel::interchange_plan(dest.shape, row_major);
            return apply_plan(dest, x, y, z, &plan, &strides4, &f);
        }
        return apply_generic(dest, x, y, z, info.numel, &f);
    }

    // Orders disagree or some scan direction is indeterminate: tiled
    // iteration over a compromise order.
    if rank <= MAX_KERNEL_RANK {
        let plan = kernel::build_plan(dest.shape, &strides4, std::mem::size_of::<T>());
        return apply_plan(dest, x, y, z, &plan, &strides4, &f);
    }

    apply_generic(dest, x, y, z, info.numel, &f)
}

// ============================================================================
// Classification helpers
// ============================================================================

/// Shared memory order of the four views, if one exists.
///
/// Requires every scan direction to be determinate and the intersection of
/// the four layout classifications to be non-empty. Returns whether the
/// shared layout is row-major (the flag only selects loop nesting; both
/// answers are valid for layouts classified as both).
fn shared_order(scans: &[i8; 4], strides4: &[&[isize]; 4]) -> Option<bool> {
    if scans.iter().any(|&s| s == 0) {
        return None;
    }
    let mut class = StrideClass::BOTH;
    for strides in strides4 {
        class = class.meet(strides_order(strides));
    }
    if class.row_major {
        Some(true)
    } else if class.col_major {
        Some(false)
    } else {
        None
    }
}

/// 1-D traversal descriptor derived from collapsed views.
struct Linear {
    len: usize,
    /// Destination first.
    strides: [isize; 4],
    /// Starting buffer index per view.
    bases: [isize; 4],
}

/// Collapse all four views to 1-D when each is fully contiguous.
///
/// A view is contiguous when its reachable index range holds exactly `numel`
/// addresses. The flattened scan runs ascending (stride `1` from the range
/// minimum) or descending (stride `-1` from the maximum) following the
/// view's own scan direction; the shared order classification guarantees the
/// four flat scans enumerate the same coordinates.
fn collapse_contiguous<T>(
    dest: &ViewMut<'_, T>,
    x: &View<'_, T>,
    y: &View<'_, T>,
    z: &View<'_, T>,
    numel: usize,
    scans: &[i8; 4],
) -> Option<Linear> {
    let shapes_strides_offsets = [
        (dest.shape, dest.strides, dest.offset),
        (x.shape, x.strides, x.offset),
        (y.shape, y.strides, y.offset),
        (z.shape, z.strides, z.offset),
    ];

    let mut strides = [0isize; 4];
    let mut bases = [0isize; 4];
    for (k, &(shape, view_strides, offset)) in shapes_strides_offsets.iter().enumerate() {
        let (min, max) = min_max_index(shape, view_strides, offset);
        if (max - min + 1) as usize != numel {
            return None;
        }
        strides[k] = scans[k] as isize;
        bases[k] = if scans[k] == 1 { min } else { max };
    }

    Some(Linear {
        len: numel,
        strides,
        bases,
    })
}

// ============================================================================
// Kernel drivers
// ============================================================================

/// Raw pointers for the direct path, available only when all four storages
/// are dense slices.
fn direct_ptrs<T>(
    dest: &mut ViewMut<'_, T>,
    x: &View<'_, T>,
    y: &View<'_, T>,
    z: &View<'_, T>,
) -> Option<(*mut T, *const T, *const T, *const T)> {
    let d = match &mut dest.data {
        StorageMut::Slice(s) => s.as_mut_ptr(),
        StorageMut::Accessor(_) => return None,
    };
    let px = match x.data {
        Storage::Slice(s) => s.as_ptr(),
        Storage::Accessor(_) => return None,
    };
    let py = match y.data {
        Storage::Slice(s) => s.as_ptr(),
        Storage::Accessor(_) => return None,
    };
    let pz = match z.data {
        Storage::Slice(s) => s.as_ptr(),
        Storage::Accessor(_) => return None,
    };
    Some((d, px, py, pz))
}

/// Run a collapsed 1-D traversal.
fn apply_linear<T, F>(
    dest: &mut ViewMut<'_, T>,
    x: &View<'_, T>,
    y: &View<'_, T>,
    z: &View<'_, T>,
    lin: &Linear,
    f: &F,
) -> Result<()>
where
    T: Copy,
    F: Fn(T, T, T) -> T,
{
    if let Some((dp, xp, yp, zp)) = direct_ptrs(dest, x, y, z) {
        // Bounds were validated at view construction; every index the
        // descriptor reaches lies inside its slice.
        unsafe {
            let mut d = dp.offset(lin.bases[0]);
            let mut px = xp.offset(lin.bases[1]);
            let mut py = yp.offset(lin.bases[2]);
            let mut pz = zp.offset(lin.bases[3]);
            for _ in 0..lin.len {
                *d = f(*px, *py, *pz);
                d = d.offset(lin.strides[0]);
                px = px.offset(lin.strides[1]);
                py = py.offset(lin.strides[2]);
                pz = pz.offset(lin.strides[3]);
            }
        }
        return Ok(());
    }

    let mut idx = lin.bases;
    for _ in 0..lin.len {
        let value = f(
            x.data.load(idx[1] as usize),
            y.data.load(idx[2] as usize),
            z.data.load(idx[3] as usize),
        );
        dest.data.store(idx[0] as usize, value);
        for k in 0..4 {
            idx[k] += lin.strides[k];
        }
    }
    Ok(())
}

/// Run a planned N-D traversal (fixed-rank or blocked).
fn apply_plan<T, F>(
    dest: &mut ViewMut<'_, T>,
    x: &View<'_, T>,
    y: &View<'_, T>,
    z: &View<'_, T>,
    plan: &KernelPlan,
    strides4: &[&[isize]; 4],
    f: &F,
) -> Result<()>
where
    T: Copy,
    F: Fn(T, T, T) -> T,
{
    let dims = dest.shape;
    let bases = [
        dest.offset as isize,
        x.offset as isize,
        y.offset as isize,
        z.offset as isize,
    ];

    if let Some((dp, xp, yp, zp)) = direct_ptrs(dest, x, y, z) {
        return kernel::for_each_inner_block(dims, plan, strides4, |offsets, len, inner| {
            // Bounds were validated at view construction.
            unsafe {
                let mut d = dp.offset(bases[0] + offsets[0]);
                let mut px = xp.offset(bases[1] + offsets[1]);
                let mut py = yp.offset(bases[2] + offsets[2]);
                let mut pz = zp.offset(bases[3] + offsets[3]);
                for _ in 0..len {
                    *d = f(*px, *py, *pz);
                    d = d.offset(inner[0]);
                    px = px.offset(inner[1]);
                    py = py.offset(inner[2]);
                    pz = pz.offset(inner[3]);
                }
            }
            Ok(())
        });
    }

    kernel::for_each_inner_block(dims, plan, strides4, |offsets, len, inner| {
        let mut idx = [
            bases[0] + offsets[0],
            bases[1] + offsets[1],
            bases[2] + offsets[2],
            bases[3] + offsets[3],
        ];
        for _ in 0..len {
            let value = f(
                x.data.load(idx[1] as usize),
                y.data.load(idx[2] as usize),
                z.data.load(idx[3] as usize),
            );
            dest.data.store(idx[0] as usize, value);
            for k in 0..4 {
                idx[k] += inner[k];
            }
        }
        Ok(())
    })
}

/// Per-element fallback for ranks beyond [`MAX_KERNEL_RANK`].
///
/// Each view's buffer offset is recomputed from the flat index through that
/// view's own memory order, which the stride-driven paths cannot honor when
/// the four views decompose indices differently.
fn apply_generic<T, F>(
    dest: &mut ViewMut<'_, T>,
    x: &View<'_, T>,
    y: &View<'_, T>,
    z: &View<'_, T>,
    numel: usize,
    f: &F,
) -> Result<()>
where
    T: Copy,
    F: Fn(T, T, T) -> T,
{
    for i in 0..numel {
        let ix = index_to_offset(x.shape, x.strides, x.offset, x.order, i)?;
        let iy = index_to_offset(y.shape, y.strides, y.offset, y.order, i)?;
        let iz = index_to_offset(z.shape, z.strides, z.offset, z.order, i)?;
        let id = index_to_offset(dest.shape, dest.strides, dest.offset, dest.order, i)?;
        let value = f(
            x.data.load(ix as usize),
            y.data.load(iy as usize),
            z.data.load(iz as usize),
        );
        dest.data.store(id as usize, value);
    }
    Ok(())
}
