//! Strided view descriptors over caller-owned buffers.
//!
//! A view is a read-only description of how logical coordinates map into a
//! linear buffer: shape, per-dimension strides (any sign, zero allowed),
//! a starting offset, and the memory order used when a flat index must be
//! decomposed into coordinates. The engine never takes ownership of data and
//! never mutates a descriptor; dimension-collapsing fast paths work on local
//! derived copies instead.
//!
//! Buffers come in two kinds. A dense slice is indexed directly, which is the
//! fast path. Anything that cannot hand out plain element slots (bit-packed
//! booleans, interleaved complex pairs, memory-mapped stores, ...) instead
//! implements [`Accessor`] / [`AccessorMut`] and is driven through `get`/`set`
//! calls at the same buffer indices.

use crate::stride_math::min_max_index;
use crate::{Result, StridedError};

/// Memory order convention for linear-index decomposition.
///
/// Determines which dimension varies fastest when a flat index in
/// `[0, numel)` is converted to per-dimension coordinates. This matters only
/// when a view cannot be walked by stride arithmetic alone (the generic
/// fallback kernel); stride-driven kernels ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryOrder {
    /// Last dimension varies fastest (C convention).
    RowMajor,
    /// First dimension varies fastest (Fortran convention).
    ColMajor,
}

/// Read access to a buffer that cannot be indexed as a plain slice.
///
/// `idx` is the same linear buffer index that stride arithmetic would use on
/// a dense slice; implementations translate it into their own representation
/// (word/bit split, pair of lanes, ...).
pub trait Accessor<T> {
    /// Read the element at buffer index `idx`.
    fn get(&self, idx: usize) -> T;
}

/// Write access for accessor-backed buffers.
pub trait AccessorMut<T>: Accessor<T> {
    /// Write `value` at buffer index `idx`.
    fn set(&mut self, idx: usize, value: T);
}

/// Read-only element storage behind a view.
///
/// The variant is inspected once per `apply_ternary` call, not per element:
/// if all four views carry `Slice` storage the engine runs direct-indexing
/// kernels with zero per-element dispatch.
#[derive(Clone, Copy)]
pub enum Storage<'a, T> {
    /// Dense contiguous memory, indexed directly.
    Slice(&'a [T]),
    /// Indirect buffer driven through [`Accessor::get`].
    Accessor(&'a dyn Accessor<T>),
}

/// Writable element storage behind the destination view.
pub enum StorageMut<'a, T> {
    /// Dense contiguous memory, indexed directly.
    Slice(&'a mut [T]),
    /// Indirect buffer driven through [`AccessorMut::set`].
    Accessor(&'a mut dyn AccessorMut<T>),
}

impl<T> core::fmt::Debug for Storage<'_, T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Storage::Slice(s) => f.debug_tuple("Slice").field(&s.len()).finish(),
            Storage::Accessor(_) => f.debug_tuple("Accessor").finish(),
        }
    }
}

impl<T: Copy> Storage<'_, T> {
    #[inline]
    pub(crate) fn load(&self, idx: usize) -> T {
        match self {
            Storage::Slice(s) => s[idx],
            Storage::Accessor(a) => a.get(idx),
        }
    }
}

impl<T: Copy> StorageMut<'_, T> {
    #[inline]
    pub(crate) fn store(&mut self, idx: usize, value: T) {
        match self {
            StorageMut::Slice(s) => s[idx] = value,
            StorageMut::Accessor(a) => a.set(idx, value),
        }
    }
}

/// An immutable strided view over caller-owned storage.
///
/// Shape and strides are borrowed from the caller; the engine builds derived
/// descriptors when it collapses dimensions rather than mutating these.
#[derive(Debug)]
pub struct View<'a, T> {
    pub(crate) data: Storage<'a, T>,
    pub(crate) shape: &'a [usize],
    pub(crate) strides: &'a [isize],
    pub(crate) offset: usize,
    pub(crate) order: MemoryOrder,
}

/// A mutable strided view, the write target of [`crate::apply_ternary`].
pub struct ViewMut<'a, T> {
    pub(crate) data: StorageMut<'a, T>,
    pub(crate) shape: &'a [usize],
    pub(crate) strides: &'a [isize],
    pub(crate) offset: usize,
    pub(crate) order: MemoryOrder,
}

/// Check that every reachable buffer index stays inside `[0, len)`.
///
/// `len` is `None` for accessor storage, whose upper bound is unknown; the
/// lower bound still applies because buffer indices are non-negative.
fn validate_bounds(
    len: Option<usize>,
    shape: &[usize],
    strides: &[isize],
    offset: usize,
) -> Result<()> {
    if shape.len() != strides.len() {
        return Err(StridedError::StrideLengthMismatch {
            shape_len: shape.len(),
            strides_len: strides.len(),
        });
    }
    if shape.contains(&0) {
        // Empty view: no index is ever dereferenced.
        return Ok(());
    }
    let (min, max) = min_max_index(shape, strides, offset);
    if min < 0 {
        return Err(StridedError::OutOfBounds {
            index: min,
            len: len.unwrap_or(0),
        });
    }
    if let Some(len) = len {
        if max >= len as isize {
            return Err(StridedError::OutOfBounds { index: max, len });
        }
    }
    Ok(())
}

impl<'a, T> View<'a, T> {
    /// Create a view over a dense slice, validating that every reachable
    /// index lies inside the slice.
    pub fn new(
        data: &'a [T],
        shape: &'a [usize],
        strides: &'a [isize],
        offset: usize,
        order: MemoryOrder,
    ) -> Result<Self> {
        validate_bounds(Some(data.len()), shape, strides, offset)?;
        Ok(Self {
            data: Storage::Slice(data),
            shape,
            strides,
            offset,
            order,
        })
    }

    /// Create a view over an accessor-backed buffer.
    ///
    /// Only the lower index bound is checked; the accessor is responsible for
    /// accepting every index its shape/strides/offset can reach.
    pub fn with_accessor(
        accessor: &'a dyn Accessor<T>,
        shape: &'a [usize],
        strides: &'a [isize],
        offset: usize,
        order: MemoryOrder,
    ) -> Result<Self> {
        validate_bounds(None, shape, strides, offset)?;
        Ok(Self {
            data: Storage::Accessor(accessor),
            shape,
            strides,
            offset,
            order,
        })
    }

    /// Create a view without bounds checking.
    ///
    /// # Safety
    /// The caller must ensure every index reachable through
    /// shape/strides/offset is valid for the storage.
    pub unsafe fn new_unchecked(
        data: Storage<'a, T>,
        shape: &'a [usize],
        strides: &'a [isize],
        offset: usize,
        order: MemoryOrder,
    ) -> Self {
        Self {
            data,
            shape,
            strides,
            offset,
            order,
        }
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Extent of each dimension.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.shape
    }

    /// Buffer-index delta per unit step along each dimension.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.strides
    }

    /// Buffer index of the view's first element.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Memory order used for linear-index decomposition.
    #[inline]
    pub fn order(&self) -> MemoryOrder {
        self.order
    }

    /// Total number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether any dimension has extent zero.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.shape.contains(&0)
    }

    /// Whether element access goes through the accessor protocol.
    #[inline]
    pub fn is_accessor(&self) -> bool {
        matches!(self.data, Storage::Accessor(_))
    }
}

impl<'a, T> ViewMut<'a, T> {
    /// Create a mutable view over a dense slice, validating bounds.
    pub fn new(
        data: &'a mut [T],
        shape: &'a [usize],
        strides: &'a [isize],
        offset: usize,
        order: MemoryOrder,
    ) -> Result<Self> {
        validate_bounds(Some(data.len()), shape, strides, offset)?;
        Ok(Self {
            data: StorageMut::Slice(data),
            shape,
            strides,
            offset,
            order,
        })
    }

    /// Create a mutable view over an accessor-backed buffer.
    pub fn with_accessor(
        accessor: &'a mut dyn AccessorMut<T>,
        shape: &'a [usize],
        strides: &'a [isize],
        offset: usize,
        order: MemoryOrder,
    ) -> Result<Self> {
        validate_bounds(None, shape, strides, offset)?;
        Ok(Self {
            data: StorageMut::Accessor(accessor),
            shape,
            strides,
            offset,
            order,
        })
    }

    /// Create a mutable view without bounds checking.
    ///
    /// # Safety
    /// The caller must ensure every index reachable through
    /// shape/strides/offset is valid for the storage.
    pub unsafe fn new_unchecked(
        data: StorageMut<'a, T>,
        shape: &'a [usize],
        strides: &'a [isize],
        offset: usize,
        order: MemoryOrder,
    ) -> Self {
        Self {
            data,
            shape,
            strides,
            offset,
            order,
        }
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Extent of each dimension.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.shape
    }

    /// Buffer-index delta per unit step along each dimension.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.strides
    }

    /// Buffer index of the view's first element.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Memory order used for linear-index decomposition.
    #[inline]
    pub fn order(&self) -> MemoryOrder {
        self.order
    }

    /// Total number of elements.
    #[inline]
    pub fn numel(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether element access goes through the accessor protocol.
    #[inline]
    pub fn is_accessor(&self) -> bool {
        matches!(self.data, StorageMut::Accessor(_))
    }
}
