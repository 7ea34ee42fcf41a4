//! Strided, typed n-dimensional array descriptors over flat byte buffers.
//!
//! This crate is the view/indexing/iteration core of an ndarray library: a
//! descriptor that maps logical multi-dimensional coordinates to byte
//! offsets in a caller-owned buffer, the shape/stride/order algebra behind
//! it, typed element accessors, and an element-wise unary apply engine with
//! loop interchange and cache-aware blocking.
//!
//! # Core Types
//!
//! - [`Ndarray`] / [`NdarrayMut`]: strided descriptors borrowing a flat byte
//!   buffer (shared and exclusive)
//! - [`DType`]: element data type registry with stable numeric codes,
//!   byte widths, and character codes
//! - [`Order`], [`IndexMode`], [`CastingMode`]: layout, index-resolution,
//!   and cast policies
//!
//! # Modules
//!
//! - [`shape`]: pure shape/stride algebra (`numel`, `shape_to_strides`,
//!   contiguity predicates, `broadcast_shapes`, ...)
//! - [`ind`]: coordinate mapping between subscripts, view-linear indices,
//!   and buffer indices
//! - [`cast`]: the static `SAFE_CASTS`/`SAME_KIND_CASTS` matrices and the
//!   cast-permission predicate
//! - [`unary`]: the element-wise apply engine ([`unary::apply`],
//!   [`unary::apply_blocked`], the two-output family)
//!
//! # Example
//!
//! ```rust
//! use ndarray_base::{unary, DType, Ndarray, NdarrayMut, Order};
//!
//! // A 2x3 row-major f64 view over a little-endian byte buffer.
//! let src_buf: Vec<u8> = [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]
//!     .iter()
//!     .flat_map(|v| v.to_ne_bytes())
//!     .collect();
//! let src = Ndarray::new(DType::Float64, &src_buf, &[2, 3], &[24, 8], 0, Order::RowMajor)?;
//! assert_eq!(src.iget_t::<f64>(4)?, 5.0);
//! assert_eq!(src.get_t::<f64>(&[1, 1])?, 5.0);
//!
//! // Square every element into a fresh buffer.
//! let mut dst_buf = vec![0u8; 48];
//! let mut dst =
//!     NdarrayMut::new(DType::Float64, &mut dst_buf, &[2, 3], &[24, 8], 0, Order::RowMajor)?;
//! unary::apply(&mut dst, &src, |x: f64| x * x)?;
//! assert_eq!(dst.get_t::<f64>(&[1, 1])?, 25.0);
//! # Ok::<(), ndarray_base::NdarrayError>(())
//! ```
//!
//! # Data layout
//!
//! Strides and offsets are in **bytes**; strides may be negative or zero.
//! Complex elements are stored as two same-width floats, real then
//! imaginary ([`num_complex::Complex`] has exactly this layout). Buffers
//! are caller-owned: descriptors borrow and never free them.

mod array;
pub mod cast;
mod dtype;
pub mod ind;
mod index_mode;
mod iter;
mod order;
pub mod shape;
pub mod unary;

pub use array::{
    Ndarray, NdarrayMut, COLUMN_MAJOR_CONTIGUOUS_FLAG, ROW_MAJOR_CONTIGUOUS_FLAG,
};
pub use cast::{is_allowed_data_type_cast, CastingMode, SAFE_CASTS, SAME_KIND_CASTS};
pub use dtype::{
    read_ptr_value, write_ptr_value, DType, DTypeKind, Scalar, ScalarValue, DTYPES, NDTYPES,
    NOTYPE, USER_DEFINED_BASE,
};
pub use index_mode::{clamp_index, resolve_index, wrap_index, IndexMode};
pub use ind::{bind_to_vind, ind_to_sub, sub_to_ind, vind_to_bind};
pub use iter::ElementsIter;
pub use order::{IterationOrder, Order, StrideOrder};

/// Errors that can occur during descriptor and kernel operations.
#[derive(Debug, thiserror::Error)]
pub enum NdarrayError {
    /// An index or subscript fell outside its extent under error mode.
    #[error("index {0} out of bounds for extent {1}")]
    OutOfBounds(isize, usize),

    /// A dtype tag outside the typed read/write set was passed to a typed
    /// routine.
    #[error("unknown or unsupported dtype code {0}")]
    UnknownDType(i16),

    /// Array shapes disagree in rank or extents.
    #[error("shape mismatch: {0:?} vs {1:?}")]
    ShapeMismatch(Vec<usize>, Vec<usize>),

    /// Stride array length doesn't match the shape rank.
    #[error("stride and shape length mismatch")]
    StrideLengthMismatch,

    /// The buffer is too short for the declared view.
    #[error("buffer of {actual} bytes cannot back a view of {required} bytes")]
    IncompatibleBuffer { required: usize, actual: usize },

    /// Two shape axes have distinct non-unit extents.
    #[error("shapes cannot be broadcast together: {0:?}")]
    BroadcastFailure(Vec<Vec<usize>>),

    /// The requested cast is refused under the casting mode.
    #[error("cast from {from:?} to {to:?} is not allowed")]
    CastNotAllowed { from: DType, to: DType },

    /// Integer overflow while computing an extent or offset.
    #[error("overflow while computing view extent")]
    Overflow,
}

/// Result type for descriptor and kernel operations.
pub type Result<T> = std::result::Result<T, NdarrayError>;
