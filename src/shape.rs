//! Pure functions over `(shape, strides, offset)` triples.
//!
//! Shapes are element counts per axis; strides are per-axis steps whose unit
//! (elements or bytes) is the caller's choice and is preserved by every
//! function here. Descriptor code calls these with byte strides.

use crate::dtype::DType;
use crate::order::{IterationOrder, Order, StrideOrder};
use crate::{NdarrayError, Result};

/// Returns the number of elements implied by a shape.
///
/// A rank-0 shape describes a single element.
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Returns the number of elements, failing on arithmetic overflow.
pub fn checked_numel(shape: &[usize]) -> Result<usize> {
    shape
        .iter()
        .try_fold(1usize, |n, &d| n.checked_mul(d))
        .ok_or(NdarrayError::Overflow)
}

/// Generates a stride array from a shape, in element units.
///
/// Row-major strides are `[..., s2, s1, 1]` with `s_k = prod(shape[k+1..])`;
/// column-major strides are the mirror image.
pub fn shape_to_strides(shape: &[usize], order: Order, out: &mut [isize]) {
    let mut s = 1isize;
    match order {
        Order::ColumnMajor => {
            for i in 0..shape.len() {
                out[i] = s;
                s *= shape[i] as isize;
            }
        }
        Order::RowMajor => {
            for i in (0..shape.len()).rev() {
                out[i] = s;
                s *= shape[i] as isize;
            }
        }
    }
}

/// Returns the offset of the first reachable element given a stride array.
///
/// Axes with negative strides contribute `-strides[i] * (shape[i] - 1)`,
/// yielding the nonnegative offset at which the all-zeros subscript lives.
pub fn strides_to_offset(shape: &[usize], strides: &[isize]) -> isize {
    let mut offset = 0isize;
    for (&d, &s) in shape.iter().zip(strides.iter()) {
        if s < 0 {
            offset -= s * (d as isize - 1);
        }
    }
    offset
}

/// Classifies a stride array as row-major, column-major, both, or neither.
///
/// The classification looks only at stride magnitudes; equal adjacent
/// magnitudes are compatible with both orderings.
pub fn strides_to_order(strides: &[isize]) -> StrideOrder {
    if strides.is_empty() {
        return StrideOrder::None;
    }
    let mut row = true;
    let mut column = true;
    let mut s1 = strides[0].unsigned_abs();
    for &s in &strides[1..] {
        let s2 = s.unsigned_abs();
        if column && s2 < s1 {
            column = false;
        } else if row && s2 > s1 {
            row = false;
        }
        if !row && !column {
            return StrideOrder::None;
        }
        s1 = s2;
    }
    match (row, column) {
        (true, true) => StrideOrder::Both,
        (true, false) => StrideOrder::RowMajor,
        (false, true) => StrideOrder::ColumnMajor,
        (false, false) => StrideOrder::None,
    }
}

/// Determines the buffer-walk direction of a stride array.
pub fn iteration_order(strides: &[isize]) -> IterationOrder {
    let negative = strides.iter().filter(|&&s| s < 0).count();
    if negative == 0 {
        IterationOrder::Forward
    } else if negative == strides.len() {
        IterationOrder::Reverse
    } else {
        IterationOrder::Mixed
    }
}

/// Computes the minimum and maximum buffer indices reachable by a view.
///
/// Indices are in the same unit as `strides` and `offset`. If any dimension
/// is zero, both extremes equal `offset`.
pub fn minmax_view_buffer_index(
    shape: &[usize],
    strides: &[isize],
    offset: isize,
) -> (isize, isize) {
    let mut min = offset;
    let mut max = offset;
    for (&d, &s) in shape.iter().zip(strides.iter()) {
        if d == 0 {
            return (offset, offset);
        }
        if s > 0 {
            max += s * (d as isize - 1);
        } else if s < 0 {
            min += s * (d as isize - 1);
        }
    }
    (min, max)
}

/// Computes the maximum buffer index reachable by a view.
pub fn max_view_buffer_index(shape: &[usize], strides: &[isize], offset: isize) -> isize {
    let mut idx = offset;
    for (&d, &s) in shape.iter().zip(strides.iter()) {
        if d == 0 {
            return offset;
        }
        if s > 0 {
            idx += s * (d as isize - 1);
        }
    }
    idx
}

/// Returns the number of singleton dimensions.
pub fn singleton_dimensions(shape: &[usize]) -> usize {
    shape.iter().filter(|&&d| d == 1).count()
}

/// Returns the number of non-singleton dimensions.
pub fn nonsingleton_dimensions(shape: &[usize]) -> usize {
    shape.iter().filter(|&&d| d != 1).count()
}

/// Whether stride magnitudes are monotonically non-increasing.
///
/// Rank-0 arrays have no ordering and report `false`.
pub fn is_row_major(strides: &[isize]) -> bool {
    strides_to_order(strides).is_row_major()
}

/// Whether stride magnitudes are monotonically non-decreasing.
///
/// Rank-0 arrays have no ordering and report `false`.
pub fn is_column_major(strides: &[isize]) -> bool {
    strides_to_order(strides).is_column_major()
}

/// Whether a view covers one contiguous span of buffer bytes with no gaps.
///
/// `strides` and `offset` are in bytes. Empty views are not single-segment
/// compatible.
pub fn is_single_segment_compatible(
    dtype: DType,
    shape: &[usize],
    strides: &[isize],
    offset: isize,
) -> bool {
    let len = numel(shape);
    if len == 0 {
        return false;
    }
    let (min, max) = minmax_view_buffer_index(shape, strides, offset);
    let nbytes = dtype.bytes_per_element() as isize;
    (len as isize) * nbytes == (max - min) + nbytes
}

/// Whether a view is contiguous: uniformly signed strides over one segment.
pub fn is_contiguous(dtype: DType, shape: &[usize], strides: &[isize], offset: isize) -> bool {
    iteration_order(strides) != IterationOrder::Mixed
        && is_single_segment_compatible(dtype, shape, strides, offset)
}

/// Whether a view is row-major contiguous.
pub fn is_row_major_contiguous(
    dtype: DType,
    shape: &[usize],
    strides: &[isize],
    offset: isize,
) -> bool {
    iteration_order(strides) != IterationOrder::Mixed
        && is_row_major(strides)
        && is_single_segment_compatible(dtype, shape, strides, offset)
}

/// Whether a view is column-major contiguous.
pub fn is_column_major_contiguous(
    dtype: DType,
    shape: &[usize],
    strides: &[isize],
    offset: isize,
) -> bool {
    iteration_order(strides) != IterationOrder::Mixed
        && is_column_major(strides)
        && is_single_segment_compatible(dtype, shape, strides, offset)
}

/// Whether a buffer of `len` elements can back the described view.
///
/// `strides` and `offset` are in bytes; the reachable byte extent must fall
/// within `[0, len * bytes_per_element)`.
pub fn is_buffer_length_compatible(
    dtype: DType,
    len: usize,
    shape: &[usize],
    strides: &[isize],
    offset: isize,
) -> bool {
    let nbytes = dtype.bytes_per_element() as isize;
    if nbytes == 0 {
        return false;
    }
    let (min, max) = minmax_view_buffer_index(shape, strides, offset);
    min >= 0 && max / nbytes < len as isize
}

/// Broadcasts a list of shapes to a single shape.
///
/// Shapes are right-aligned; each output axis is the unique non-unit extent
/// among its candidates, or `1` if all are unit. Fails with
/// [`NdarrayError::BroadcastFailure`] when two axes have distinct non-unit
/// extents.
pub fn broadcast_shapes(shapes: &[&[usize]]) -> Result<Vec<usize>> {
    if shapes.is_empty() {
        return Ok(Vec::new());
    }
    if shapes.len() == 1 {
        return Ok(shapes[0].to_vec());
    }
    let ndims = shapes.iter().map(|s| s.len()).max().unwrap_or(0);
    let mut out = vec![0usize; ndims];
    for i in (0..ndims).rev() {
        let mut dim = match (shapes[0].len() + i).checked_sub(ndims) {
            Some(n) => shapes[0][n],
            None => 1,
        };
        for sh in &shapes[1..] {
            let d = match (sh.len() + i).checked_sub(ndims) {
                Some(n) => sh[n],
                None => 1,
            };
            if dim == 1 {
                dim = d;
                continue;
            }
            if d == 1 || dim == d {
                continue;
            }
            return Err(NdarrayError::BroadcastFailure(
                shapes.iter().map(|s| s.to_vec()).collect(),
            ));
        }
        out[i] = dim;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numel() {
        assert_eq!(numel(&[10, 8]), 80);
        assert_eq!(numel(&[2, 3, 10]), 60);
        assert_eq!(numel(&[3, 0, 2]), 0);
        assert_eq!(numel(&[]), 1);
    }

    #[test]
    fn test_checked_numel_overflow() {
        assert!(checked_numel(&[usize::MAX, 2]).is_err());
        assert_eq!(checked_numel(&[4, 5]).unwrap(), 20);
    }

    #[test]
    fn test_shape_to_strides_row_major() {
        let mut out = [0isize; 3];
        shape_to_strides(&[2, 3, 10], Order::RowMajor, &mut out);
        assert_eq!(out, [30, 10, 1]);
    }

    #[test]
    fn test_shape_to_strides_column_major() {
        let mut out = [0isize; 3];
        shape_to_strides(&[2, 3, 10], Order::ColumnMajor, &mut out);
        assert_eq!(out, [1, 2, 6]);
    }

    #[test]
    fn test_strides_to_offset() {
        assert_eq!(strides_to_offset(&[2, 3, 10], &[30, -10, 1]), 20);
        assert_eq!(strides_to_offset(&[2, 3, 10], &[30, 10, 1]), 0);
        assert_eq!(strides_to_offset(&[3], &[-1]), 2);
    }

    #[test]
    fn test_strides_to_order() {
        assert_eq!(strides_to_order(&[2, 1]), StrideOrder::RowMajor);
        assert_eq!(strides_to_order(&[1, 2]), StrideOrder::ColumnMajor);
        assert_eq!(strides_to_order(&[1]), StrideOrder::Both);
        assert_eq!(strides_to_order(&[3, 3]), StrideOrder::Both);
        assert_eq!(strides_to_order(&[1, 4, 2]), StrideOrder::None);
        assert_eq!(strides_to_order(&[]), StrideOrder::None);
        // Classification ignores stride signs.
        assert_eq!(strides_to_order(&[-2, 1]), StrideOrder::RowMajor);
        assert_eq!(strides_to_order(&[1, -2]), StrideOrder::ColumnMajor);
    }

    #[test]
    fn test_iteration_order() {
        assert_eq!(iteration_order(&[2, 1]), IterationOrder::Forward);
        assert_eq!(iteration_order(&[0, 1]), IterationOrder::Forward);
        assert_eq!(iteration_order(&[-2, -1]), IterationOrder::Reverse);
        assert_eq!(iteration_order(&[2, -1]), IterationOrder::Mixed);
        assert_eq!(iteration_order(&[]), IterationOrder::Forward);
    }

    #[test]
    fn test_minmax_view_buffer_index() {
        assert_eq!(minmax_view_buffer_index(&[10, 10], &[10, 1], 0), (0, 99));
        assert_eq!(minmax_view_buffer_index(&[3], &[-1], 2), (0, 2));
        assert_eq!(minmax_view_buffer_index(&[3, 0], &[5, 1], 7), (7, 7));
        assert_eq!(
            minmax_view_buffer_index(&[3, 3], &[-3, 1], 6),
            (0, 8)
        );
    }

    #[test]
    fn test_max_view_buffer_index() {
        assert_eq!(max_view_buffer_index(&[10, 10], &[10, 1], 0), 99);
        assert_eq!(max_view_buffer_index(&[3], &[-1], 2), 2);
        assert_eq!(max_view_buffer_index(&[3, 0], &[5, 1], 7), 7);
    }

    #[test]
    fn test_dimension_counters() {
        assert_eq!(singleton_dimensions(&[10, 1, 3, 1]), 2);
        assert_eq!(nonsingleton_dimensions(&[10, 1, 3, 1]), 2);
        assert_eq!(singleton_dimensions(&[]), 0);
    }

    #[test]
    fn test_single_segment_compatible() {
        // f64, shape [2, 3], byte strides [24, 8]: dense
        assert!(is_single_segment_compatible(
            DType::Float64,
            &[2, 3],
            &[24, 8],
            0
        ));
        // Every other column: gaps
        assert!(!is_single_segment_compatible(
            DType::Float64,
            &[2, 2],
            &[32, 16],
            0
        ));
        // Negative stride over a dense span
        assert!(is_single_segment_compatible(
            DType::Float64,
            &[3],
            &[-8],
            16
        ));
        // Empty views are not single-segment compatible
        assert!(!is_single_segment_compatible(
            DType::Float64,
            &[0, 3],
            &[24, 8],
            0
        ));
    }

    #[test]
    fn test_contiguity_predicates() {
        assert!(is_row_major_contiguous(DType::Float64, &[2, 3], &[24, 8], 0));
        assert!(!is_column_major_contiguous(
            DType::Float64,
            &[2, 3],
            &[24, 8],
            0
        ));
        assert!(is_column_major_contiguous(
            DType::Float64,
            &[2, 3],
            &[8, 16],
            0
        ));
        // Mixed stride signs are never contiguous
        assert!(!is_contiguous(DType::Float64, &[2, 3], &[-24, 8], 40));
        // Rank 1 is both
        assert!(is_row_major_contiguous(DType::Float64, &[4], &[8], 0));
        assert!(is_column_major_contiguous(DType::Float64, &[4], &[8], 0));
    }

    #[test]
    fn test_buffer_length_compatible() {
        assert!(is_buffer_length_compatible(
            DType::Uint8,
            1000,
            &[10, 10],
            &[10, 1],
            0
        ));
        assert!(!is_buffer_length_compatible(
            DType::Uint8,
            10,
            &[10, 10],
            &[10, 1],
            0
        ));
        assert!(is_buffer_length_compatible(
            DType::Float64,
            6,
            &[2, 3],
            &[24, 8],
            0
        ));
        assert!(!is_buffer_length_compatible(
            DType::Float64,
            5,
            &[2, 3],
            &[24, 8],
            0
        ));
        // Negative offset extent
        assert!(!is_buffer_length_compatible(
            DType::Float64,
            6,
            &[3],
            &[-8],
            0
        ));
    }

    #[test]
    fn test_broadcast_shapes() {
        assert_eq!(
            broadcast_shapes(&[&[8, 1, 6, 1], &[7, 1, 5]]).unwrap(),
            vec![8, 7, 6, 5]
        );
        assert_eq!(broadcast_shapes(&[&[5, 4], &[1]]).unwrap(), vec![5, 4]);
        assert_eq!(broadcast_shapes(&[&[5, 4]]).unwrap(), vec![5, 4]);
        assert_eq!(
            broadcast_shapes(&[&[2, 1], &[1, 3], &[1, 1]]).unwrap(),
            vec![2, 3]
        );
        assert!(broadcast_shapes(&[&[3], &[4]]).is_err());
        assert!(broadcast_shapes(&[&[2, 1], &[8, 4, 3]]).is_err());
        assert_eq!(broadcast_shapes(&[]).unwrap(), Vec::<usize>::new());
    }
}
