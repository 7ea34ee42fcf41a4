//! Memory-layout and iteration orders.

/// Memory layout of a multidimensional array.
///
/// The declared order decides which axis the linear-index decomposition
/// treats as fastest-varying: the last axis for [`Order::RowMajor`], the
/// first for [`Order::ColumnMajor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum Order {
    /// Row-major (C-style): the last axis varies fastest.
    #[default]
    RowMajor = 1,
    /// Column-major (Fortran-style): the first axis varies fastest.
    ColumnMajor = 2,
}

/// Layout classification inferred from a stride array.
///
/// Returned by [`strides_to_order`](crate::shape::strides_to_order). A
/// rank-1 stride array is trivially both row- and column-major; a rank-0
/// one is neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum StrideOrder {
    /// Stride magnitudes are neither non-increasing nor non-decreasing.
    None = 0,
    /// Stride magnitudes are monotonically non-increasing.
    RowMajor = 1,
    /// Stride magnitudes are monotonically non-decreasing.
    ColumnMajor = 2,
    /// Stride magnitudes satisfy both orderings.
    Both = 3,
}

impl StrideOrder {
    /// Whether the classification admits a row-major interpretation.
    #[inline]
    pub fn is_row_major(self) -> bool {
        matches!(self, StrideOrder::RowMajor | StrideOrder::Both)
    }

    /// Whether the classification admits a column-major interpretation.
    #[inline]
    pub fn is_column_major(self) -> bool {
        matches!(self, StrideOrder::ColumnMajor | StrideOrder::Both)
    }
}

/// Direction in which a stride array walks the underlying buffer.
///
/// Returned by [`iteration_order`](crate::shape::iteration_order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum IterationOrder {
    /// All strides are nonnegative: left-to-right iteration.
    Forward = 1,
    /// All strides are negative: right-to-left iteration.
    Reverse = -1,
    /// Strides are of mixed sign: unordered.
    Mixed = 0,
}
