//! Strided array descriptors over caller-owned byte buffers.
//!
//! A descriptor maps logical multi-dimensional coordinates to byte offsets
//! in a flat buffer. It never owns the buffer: [`Ndarray`] borrows it
//! shared, [`NdarrayMut`] borrows it exclusively, and dropping either
//! releases only the descriptor record.
//!
//! Strides and the offset are in **bytes** and strides may be negative or
//! zero. Shape, stride, and mode arrays are copied into the descriptor at
//! construction, so the caller's arrays need not outlive it.

use std::sync::Arc;

use crate::dtype::{read_ptr_value, write_ptr_value, DType, Scalar, ScalarValue};
use crate::index_mode::{resolve_index, IndexMode};
use crate::ind::{sub_to_ind, vind_to_bind};
use crate::iter::ElementsIter;
use crate::order::{IterationOrder, Order};
use crate::shape::{
    checked_numel, is_buffer_length_compatible, is_single_segment_compatible, iteration_order,
    strides_to_order,
};
use crate::{NdarrayError, Result};

/// Flag bit: the view is row-major contiguous.
pub const ROW_MAJOR_CONTIGUOUS_FLAG: u32 = 1 << 0;

/// Flag bit: the view is column-major contiguous.
pub const COLUMN_MAJOR_CONTIGUOUS_FLAG: u32 = 1 << 1;

/// Computes the contiguity flag bits for a descriptor.
fn compute_flags(
    dtype: DType,
    shape: &[usize],
    strides: &[isize],
    offset: isize,
    length: usize,
) -> u32 {
    // An empty array stores no data, and an unordered one does not keep
    // adjacent elements next to each other.
    if length == 0 || iteration_order(strides) == IterationOrder::Mixed {
        return 0;
    }
    if !is_single_segment_compatible(dtype, shape, strides, offset) {
        return 0;
    }
    let ord = strides_to_order(strides);
    let mut flags = 0;
    if ord.is_row_major() {
        flags |= ROW_MAJOR_CONTIGUOUS_FLAG;
    }
    if ord.is_column_major() {
        flags |= COLUMN_MAJOR_CONTIGUOUS_FLAG;
    }
    flags
}

/// Validates descriptor inputs and caches the derived fields.
///
/// Returns `(length, bytes_per_element, byte_length, flags)`.
fn validate_and_cache(
    dtype: DType,
    buf_len: usize,
    shape: &[usize],
    strides: &[isize],
    offset: isize,
) -> Result<(usize, usize, usize, u32)> {
    if shape.len() != strides.len() {
        return Err(NdarrayError::StrideLengthMismatch);
    }
    let length = checked_numel(shape)?;
    let bpe = dtype.bytes_per_element();
    let byte_length = length.checked_mul(bpe).ok_or(NdarrayError::Overflow)?;
    if length > 0 && bpe > 0 {
        let elems = buf_len / bpe;
        if !is_buffer_length_compatible(dtype, elems, shape, strides, offset) {
            return Err(NdarrayError::IncompatibleBuffer {
                required: byte_length,
                actual: buf_len,
            });
        }
    }
    let flags = compute_flags(dtype, shape, strides, offset, length);
    Ok((length, bpe, byte_length, flags))
}

fn normalize_submodes(imode: IndexMode, submodes: &[IndexMode]) -> Arc<[IndexMode]> {
    if submodes.is_empty() {
        Arc::from([imode].as_slice())
    } else {
        Arc::from(submodes)
    }
}

/// A shared strided view over a caller-owned byte buffer.
pub struct Ndarray<'a> {
    data: &'a [u8],
    dtype: DType,
    shape: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
    order: Order,
    imode: IndexMode,
    submodes: Arc<[IndexMode]>,
    length: usize,
    bytes_per_element: usize,
    byte_length: usize,
    flags: u32,
}

impl Clone for Ndarray<'_> {
    fn clone(&self) -> Self {
        Self {
            data: self.data,
            dtype: self.dtype,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
            order: self.order,
            imode: self.imode,
            submodes: self.submodes.clone(),
            length: self.length,
            bytes_per_element: self.bytes_per_element,
            byte_length: self.byte_length,
            flags: self.flags,
        }
    }
}

impl std::fmt::Debug for Ndarray<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ndarray")
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("order", &self.order)
            .field("flags", &self.flags)
            .finish()
    }
}

impl<'a> Ndarray<'a> {
    /// Creates a descriptor with [`IndexMode::Error`] for linear and
    /// subscript access.
    ///
    /// `strides` and `offset` are in bytes. Fails with
    /// [`NdarrayError::IncompatibleBuffer`] if the buffer cannot contain
    /// every reachable element.
    pub fn new(
        dtype: DType,
        data: &'a [u8],
        shape: &[usize],
        strides: &[isize],
        offset: isize,
        order: Order,
    ) -> Result<Self> {
        Self::with_modes(
            dtype,
            data,
            shape,
            strides,
            offset,
            order,
            IndexMode::Error,
            &[IndexMode::Error],
        )
    }

    /// Creates a descriptor with explicit index modes.
    ///
    /// `imode` governs linear access; `submodes` govern per-axis subscript
    /// access and are recycled modulo their length. An empty `submodes`
    /// recycles `imode`.
    #[allow(clippy::too_many_arguments)]
    pub fn with_modes(
        dtype: DType,
        data: &'a [u8],
        shape: &[usize],
        strides: &[isize],
        offset: isize,
        order: Order,
        imode: IndexMode,
        submodes: &[IndexMode],
    ) -> Result<Self> {
        let (length, bytes_per_element, byte_length, flags) =
            validate_and_cache(dtype, data.len(), shape, strides, offset)?;
        Ok(Self {
            data,
            dtype,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            offset,
            order,
            imode,
            submodes: normalize_submodes(imode, submodes),
            length,
            bytes_per_element,
            byte_length,
            flags,
        })
    }

    /// The element data type.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The underlying byte buffer.
    #[inline]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// The number of dimensions.
    #[inline]
    pub fn ndims(&self) -> usize {
        self.shape.len()
    }

    /// The per-axis element counts.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The length of dimension `i`.
    #[inline]
    pub fn dimension(&self, i: usize) -> usize {
        self.shape[i]
    }

    /// The per-axis steps in bytes.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// The stride of dimension `i` in bytes.
    #[inline]
    pub fn stride(&self, i: usize) -> isize {
        self.strides[i]
    }

    /// The byte offset of the element at the all-zeros subscript.
    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    /// The declared memory order.
    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    /// The index mode for linear access.
    #[inline]
    pub fn index_mode(&self) -> IndexMode {
        self.imode
    }

    /// The number of subscript modes.
    #[inline]
    pub fn nsubmodes(&self) -> usize {
        self.submodes.len()
    }

    /// The per-axis subscript modes.
    #[inline]
    pub fn submodes(&self) -> &[IndexMode] {
        &self.submodes
    }

    /// The subscript mode of dimension `i`, recycled modulo `nsubmodes`.
    #[inline]
    pub fn submode(&self, i: usize) -> IndexMode {
        self.submodes[i % self.submodes.len()]
    }

    /// The number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the view contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The view size in bytes.
    #[inline]
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// The element width in bytes.
    #[inline]
    pub fn bytes_per_element(&self) -> usize {
        self.bytes_per_element
    }

    /// The flag bit-mask.
    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Whether all of the given flag bits are set.
    #[inline]
    pub fn has_flags(&self, flags: u32) -> bool {
        self.flags & flags == flags
    }

    /// Sets flag bits without validation.
    #[inline]
    pub fn enable_flags(&mut self, flags: u32) {
        self.flags |= flags;
    }

    /// Clears flag bits without validation.
    #[inline]
    pub fn disable_flags(&mut self, flags: u32) {
        self.flags &= !flags;
    }

    /// Resolves subscripts to a byte offset using the subscript modes.
    ///
    /// A subscript list of the wrong length is out of bounds against the
    /// rank.
    fn byte_index_of_sub(&self, sub: &[isize]) -> Result<isize> {
        if sub.len() != self.ndims() {
            return Err(NdarrayError::OutOfBounds(sub.len() as isize, self.ndims()));
        }
        if self.length == 0 {
            return Err(NdarrayError::OutOfBounds(0, 0));
        }
        sub_to_ind(&self.shape, &self.strides, self.offset, sub, &self.submodes)
    }

    /// Resolves a view-linear index to a byte offset using the index mode.
    fn byte_index_of_linear(&self, idx: isize) -> Result<isize> {
        if self.length == 0 {
            return Err(NdarrayError::OutOfBounds(idx, 0));
        }
        // Zero-dimensional arrays hold a single element and ignore the
        // index.
        if self.ndims() == 0 {
            return Ok(self.offset);
        }
        let idx = resolve_index(idx, self.length as isize - 1, self.imode)
            .ok_or(NdarrayError::OutOfBounds(idx, self.length))?;
        // The direct formula holds only when the storage sequence matches
        // the declared order; otherwise the view index must be decomposed.
        let aligned = match self.order {
            Order::RowMajor => ROW_MAJOR_CONTIGUOUS_FLAG,
            Order::ColumnMajor => COLUMN_MAJOR_CONTIGUOUS_FLAG,
        };
        if self.has_flags(aligned) {
            match iteration_order(&self.strides) {
                IterationOrder::Forward => {
                    return Ok(self.offset + idx * self.bytes_per_element as isize)
                }
                IterationOrder::Reverse => {
                    return Ok(self.offset - idx * self.bytes_per_element as isize)
                }
                IterationOrder::Mixed => {}
            }
        }
        vind_to_bind(
            &self.shape,
            &self.strides,
            self.offset,
            self.order,
            idx,
            IndexMode::Error,
        )
    }

    /// Returns a pointer to the first indexed element.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        unsafe { self.data.as_ptr().offset(self.offset) }
    }

    /// Returns a pointer to the element at the given subscripts.
    pub fn get_ptr(&self, sub: &[isize]) -> Result<*const u8> {
        let ind = self.byte_index_of_sub(sub)?;
        Ok(unsafe { self.data.as_ptr().offset(ind) })
    }

    /// Returns the element at the given subscripts.
    ///
    /// Subscripts are resolved by the descriptor's subscript modes. Fails
    /// with [`NdarrayError::OutOfBounds`] under [`IndexMode::Error`] and
    /// with [`NdarrayError::UnknownDType`] for dtypes outside the typed
    /// read/write set.
    pub fn get(&self, sub: &[isize]) -> Result<ScalarValue> {
        let ind = self.byte_index_of_sub(sub)?;
        unsafe { read_ptr_value(self.dtype, self.data.as_ptr().offset(ind)) }
    }

    /// Returns the element at the given subscripts as `T`.
    ///
    /// The caller certifies that `T` matches the descriptor's dtype; no
    /// type check is performed.
    pub fn get_t<T: Scalar>(&self, sub: &[isize]) -> Result<T> {
        let ind = self.byte_index_of_sub(sub)?;
        Ok(unsafe { T::read(self.data.as_ptr().offset(ind)) })
    }

    /// Returns the element at a view-linear index.
    ///
    /// The index is resolved by the descriptor's index mode against
    /// `len - 1`. Zero-dimensional arrays ignore the index.
    pub fn iget(&self, idx: isize) -> Result<ScalarValue> {
        let ind = self.byte_index_of_linear(idx)?;
        unsafe { read_ptr_value(self.dtype, self.data.as_ptr().offset(ind)) }
    }

    /// Returns the element at a view-linear index as `T`.
    ///
    /// The caller certifies that `T` matches the descriptor's dtype; no
    /// type check is performed.
    pub fn iget_t<T: Scalar>(&self, idx: isize) -> Result<T> {
        let ind = self.byte_index_of_linear(idx)?;
        Ok(unsafe { T::read(self.data.as_ptr().offset(ind)) })
    }

    /// Returns an iterator over the elements in view order.
    ///
    /// Fails with [`NdarrayError::UnknownDType`] when the width of `T`
    /// does not match the descriptor's element width.
    pub fn iter<T: Scalar>(&self) -> Result<ElementsIter<'_, 'a, T>> {
        ElementsIter::new(self)
    }
}

/// An exclusive strided view over a caller-owned byte buffer.
///
/// Adds element mutation on top of the [`Ndarray`] surface.
pub struct NdarrayMut<'a> {
    data: &'a mut [u8],
    dtype: DType,
    shape: Arc<[usize]>,
    strides: Arc<[isize]>,
    offset: isize,
    order: Order,
    imode: IndexMode,
    submodes: Arc<[IndexMode]>,
    length: usize,
    bytes_per_element: usize,
    byte_length: usize,
    flags: u32,
}

impl std::fmt::Debug for NdarrayMut<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdarrayMut")
            .field("dtype", &self.dtype)
            .field("shape", &self.shape)
            .field("strides", &self.strides)
            .field("offset", &self.offset)
            .field("order", &self.order)
            .field("flags", &self.flags)
            .finish()
    }
}

impl<'a> NdarrayMut<'a> {
    /// Creates a mutable descriptor with [`IndexMode::Error`] for linear
    /// and subscript access.
    pub fn new(
        dtype: DType,
        data: &'a mut [u8],
        shape: &[usize],
        strides: &[isize],
        offset: isize,
        order: Order,
    ) -> Result<Self> {
        Self::with_modes(
            dtype,
            data,
            shape,
            strides,
            offset,
            order,
            IndexMode::Error,
            &[IndexMode::Error],
        )
    }

    /// Creates a mutable descriptor with explicit index modes.
    #[allow(clippy::too_many_arguments)]
    pub fn with_modes(
        dtype: DType,
        data: &'a mut [u8],
        shape: &[usize],
        strides: &[isize],
        offset: isize,
        order: Order,
        imode: IndexMode,
        submodes: &[IndexMode],
    ) -> Result<Self> {
        let (length, bytes_per_element, byte_length, flags) =
            validate_and_cache(dtype, data.len(), shape, strides, offset)?;
        Ok(Self {
            data,
            dtype,
            shape: Arc::from(shape),
            strides: Arc::from(strides),
            offset,
            order,
            imode,
            submodes: normalize_submodes(imode, submodes),
            length,
            bytes_per_element,
            byte_length,
            flags,
        })
    }

    /// Reborrows as a shared descriptor.
    pub fn as_view(&self) -> Ndarray<'_> {
        Ndarray {
            data: self.data,
            dtype: self.dtype,
            shape: self.shape.clone(),
            strides: self.strides.clone(),
            offset: self.offset,
            order: self.order,
            imode: self.imode,
            submodes: self.submodes.clone(),
            length: self.length,
            bytes_per_element: self.bytes_per_element,
            byte_length: self.byte_length,
            flags: self.flags,
        }
    }

    /// The element data type.
    #[inline]
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// The number of dimensions.
    #[inline]
    pub fn ndims(&self) -> usize {
        self.shape.len()
    }

    /// The per-axis element counts.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The per-axis steps in bytes.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// The byte offset of the element at the all-zeros subscript.
    #[inline]
    pub fn offset(&self) -> isize {
        self.offset
    }

    /// The declared memory order.
    #[inline]
    pub fn order(&self) -> Order {
        self.order
    }

    /// The index mode for linear access.
    #[inline]
    pub fn index_mode(&self) -> IndexMode {
        self.imode
    }

    /// The number of elements in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.length
    }

    /// Whether the view contains no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// The view size in bytes.
    #[inline]
    pub fn byte_length(&self) -> usize {
        self.byte_length
    }

    /// The element width in bytes.
    #[inline]
    pub fn bytes_per_element(&self) -> usize {
        self.bytes_per_element
    }

    /// The flag bit-mask.
    #[inline]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    /// Whether all of the given flag bits are set.
    #[inline]
    pub fn has_flags(&self, flags: u32) -> bool {
        self.flags & flags == flags
    }

    /// Sets flag bits without validation.
    #[inline]
    pub fn enable_flags(&mut self, flags: u32) {
        self.flags |= flags;
    }

    /// Clears flag bits without validation.
    #[inline]
    pub fn disable_flags(&mut self, flags: u32) {
        self.flags &= !flags;
    }

    /// Returns the element at the given subscripts.
    pub fn get(&self, sub: &[isize]) -> Result<ScalarValue> {
        self.as_view().get(sub)
    }

    /// Returns the element at the given subscripts as `T`.
    pub fn get_t<T: Scalar>(&self, sub: &[isize]) -> Result<T> {
        self.as_view().get_t(sub)
    }

    /// Returns the element at a view-linear index.
    pub fn iget(&self, idx: isize) -> Result<ScalarValue> {
        self.as_view().iget(idx)
    }

    /// Returns the element at a view-linear index as `T`.
    pub fn iget_t<T: Scalar>(&self, idx: isize) -> Result<T> {
        self.as_view().iget_t(idx)
    }

    /// Returns a mutable pointer to the first indexed element.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        unsafe { self.data.as_mut_ptr().offset(self.offset) }
    }

    /// Returns a mutable pointer to the buffer start.
    #[inline]
    pub(crate) fn buffer_mut_ptr(&mut self) -> *mut u8 {
        self.data.as_mut_ptr()
    }

    /// Returns a mutable pointer to the element at the given subscripts.
    pub fn get_mut_ptr(&mut self, sub: &[isize]) -> Result<*mut u8> {
        let ind = self.as_view().byte_index_of_sub(sub)?;
        Ok(unsafe { self.data.as_mut_ptr().offset(ind) })
    }

    /// Writes the element at the given subscripts.
    ///
    /// The carried tag of `value` must equal the descriptor's dtype.
    pub fn set(&mut self, sub: &[isize], value: ScalarValue) -> Result<()> {
        let ind = self.as_view().byte_index_of_sub(sub)?;
        unsafe { write_ptr_value(self.dtype, self.data.as_mut_ptr().offset(ind), value) }
    }

    /// Writes the element at the given subscripts as `T`.
    ///
    /// The caller certifies that `T` matches the descriptor's dtype; no
    /// type check is performed.
    pub fn set_t<T: Scalar>(&mut self, sub: &[isize], value: T) -> Result<()> {
        let ind = self.as_view().byte_index_of_sub(sub)?;
        unsafe { T::write(self.data.as_mut_ptr().offset(ind), value) };
        Ok(())
    }

    /// Writes the element at a view-linear index.
    pub fn iset(&mut self, idx: isize, value: ScalarValue) -> Result<()> {
        let ind = self.as_view().byte_index_of_linear(idx)?;
        unsafe { write_ptr_value(self.dtype, self.data.as_mut_ptr().offset(ind), value) }
    }

    /// Writes the element at a view-linear index as `T`.
    pub fn iset_t<T: Scalar>(&mut self, idx: isize, value: T) -> Result<()> {
        let ind = self.as_view().byte_index_of_linear(idx)?;
        unsafe { T::write(self.data.as_mut_ptr().offset(ind), value) };
        Ok(())
    }
}
