//! Conversions between subscripts, view-linear indices, and buffer indices.
//!
//! Strides and offsets keep whatever unit the caller supplies (descriptor
//! code uses bytes). A "view-linear" index enumerates elements `0..numel` in
//! the declared order; a "buffer" index locates an element in the flat
//! buffer underneath the view.

use crate::index_mode::{resolve_index, IndexMode};
use crate::order::Order;
use crate::shape::{max_view_buffer_index, numel};
use crate::{NdarrayError, Result};

/// Converts subscripts to a buffer index.
///
/// Each subscript is resolved by the corresponding mode in `modes`, recycled
/// modulo its length. Fails with [`NdarrayError::OutOfBounds`] when a
/// subscript falls outside its axis under [`IndexMode::Error`].
pub fn sub_to_ind(
    shape: &[usize],
    strides: &[isize],
    offset: isize,
    sub: &[isize],
    modes: &[IndexMode],
) -> Result<isize> {
    let mut ind = offset;
    for i in 0..shape.len() {
        let mode = if modes.is_empty() {
            IndexMode::Error
        } else {
            modes[i % modes.len()]
        };
        let max = shape[i] as isize - 1;
        let s = resolve_index(sub[i], max, mode)
            .ok_or(NdarrayError::OutOfBounds(sub[i], shape[i]))?;
        ind += s * strides[i];
    }
    Ok(ind)
}

/// Applies an index mode to a linear index against `len` elements.
fn resolve_linear(idx: isize, len: usize, mode: IndexMode) -> Result<isize> {
    if len == 0 {
        return Err(NdarrayError::OutOfBounds(idx, len));
    }
    resolve_index(idx, len as isize - 1, mode).ok_or(NdarrayError::OutOfBounds(idx, len))
}

/// Extracts one subscript from a buffer index by truncating division.
///
/// A negative stride means the axis walks the buffer backwards, so the
/// subscript is `dim - 1 + quotient`. A zero stride contributes nothing and
/// its subscript is `0`.
#[inline]
fn decompose_axis(dim: usize, stride: isize, idx: &mut isize) -> isize {
    if stride == 0 {
        return 0;
    }
    let k = *idx / stride;
    *idx -= k * stride;
    if stride < 0 {
        dim as isize - 1 + k
    } else {
        k
    }
}

/// Converts a linear index to subscripts.
///
/// When `offset == 0` the index is treated as a view-linear index and
/// decomposed over `shape` in the declared order: from the perspective of a
/// view, indexing is always contiguous and ordered. When `offset != 0` the
/// index is treated as a buffer index and decomposed using the actual
/// strides.
pub fn ind_to_sub(
    shape: &[usize],
    strides: &[isize],
    offset: isize,
    order: Order,
    idx: isize,
    mode: IndexMode,
    out: &mut [isize],
) -> Result<()> {
    let mut idx = resolve_linear(idx, numel(shape), mode)?;
    if offset == 0 {
        match order {
            Order::ColumnMajor => {
                for i in 0..shape.len() {
                    let s = idx % shape[i] as isize;
                    idx = (idx - s) / shape[i] as isize;
                    out[i] = s;
                }
            }
            Order::RowMajor => {
                for i in (0..shape.len()).rev() {
                    let s = idx % shape[i] as isize;
                    idx = (idx - s) / shape[i] as isize;
                    out[i] = s;
                }
            }
        }
        return Ok(());
    }
    match order {
        Order::ColumnMajor => {
            for i in (0..shape.len()).rev() {
                out[i] = decompose_axis(shape[i], strides[i], &mut idx);
            }
        }
        Order::RowMajor => {
            for i in 0..shape.len() {
                out[i] = decompose_axis(shape[i], strides[i], &mut idx);
            }
        }
    }
    Ok(())
}

/// Converts a view-linear index to a buffer index.
///
/// Decomposes `idx` into subscripts over `shape` in the declared order and
/// plugs them into the stride formula, without materializing the
/// subscripts. The result carries the unit of `strides` and `offset`.
pub fn vind_to_bind(
    shape: &[usize],
    strides: &[isize],
    offset: isize,
    order: Order,
    idx: isize,
    mode: IndexMode,
) -> Result<isize> {
    let mut idx = resolve_linear(idx, numel(shape), mode)?;
    let mut ind = offset;
    match order {
        Order::ColumnMajor => {
            for i in 0..shape.len() {
                let s = idx % shape[i] as isize;
                idx = (idx - s) / shape[i] as isize;
                ind += s * strides[i];
            }
        }
        Order::RowMajor => {
            for i in (0..shape.len()).rev() {
                let s = idx % shape[i] as isize;
                idx = (idx - s) / shape[i] as isize;
                ind += s * strides[i];
            }
        }
    }
    Ok(ind)
}

/// Converts a buffer index to a view-linear index.
///
/// Subscripts are recovered from the buffer index using the signed strides
/// and recomposed with the formula for a view whose strides are all
/// positive and whose offset is zero. The index mode is applied against the
/// largest reachable buffer index. Inverse of [`vind_to_bind`] over a
/// single-segment view.
pub fn bind_to_vind(
    shape: &[usize],
    strides: &[isize],
    offset: isize,
    order: Order,
    idx: isize,
    mode: IndexMode,
) -> Result<isize> {
    let len = numel(shape);
    if len == 0 {
        return Err(NdarrayError::OutOfBounds(idx, len));
    }
    let max = max_view_buffer_index(shape, strides, offset);
    let mut idx = resolve_index(idx, max, mode).ok_or(NdarrayError::OutOfBounds(idx, len))?;
    let mut ind = 0isize;
    match order {
        Order::ColumnMajor => {
            for i in (0..shape.len()).rev() {
                let sub = decompose_axis(shape[i], strides[i], &mut idx);
                ind = ind * shape[i] as isize + sub;
            }
        }
        Order::RowMajor => {
            for i in 0..shape.len() {
                let sub = decompose_axis(shape[i], strides[i], &mut idx);
                ind = ind * shape[i] as isize + sub;
            }
        }
    }
    Ok(ind)
}
