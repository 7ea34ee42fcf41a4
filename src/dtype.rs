//! Element data type registry.
//!
//! Every supported element encoding is identified by a [`DType`] tag with a
//! stable numeric code, a byte width, and a single-letter character code.
//! The numeric codes are part of the ABI for callers bridging to this crate
//! and must not be renumbered.
//!
//! Typed element access goes through the [`Scalar`] trait; the dynamically
//! typed accessors exchange [`ScalarValue`]s and are limited to the dtypes a
//! host scalar type exists for. Tags outside that set (the extended integer
//! widths, `float128`, `binary`, `generic`) still participate in the
//! registry and the casting tables.

use half::{bf16, f16};
use num_complex::{Complex32, Complex64};

use crate::{NdarrayError, Result};

/// Number of data types in the registry.
pub const NDTYPES: usize = 23;

/// Numeric code reserved for an invalid data type.
pub const NOTYPE: i16 = 24;

/// First numeric code reserved for user-defined data types.
pub const USER_DEFINED_BASE: i16 = 256;

/// Element data type tag.
///
/// Discriminants are the stable ABI numeric codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum DType {
    Bool = 0,
    Int8 = 1,
    Uint8 = 2,
    Uint8Clamped = 3,
    Int16 = 4,
    Uint16 = 5,
    Int32 = 6,
    Uint32 = 7,
    Int64 = 8,
    Uint64 = 9,
    Int128 = 10,
    Uint128 = 11,
    Int256 = 12,
    Uint256 = 13,
    Float16 = 14,
    BFloat16 = 15,
    Float32 = 16,
    Float64 = 17,
    Float128 = 18,
    Complex64 = 19,
    Complex128 = 20,
    Binary = 21,
    Generic = 22,
}

/// Broad classification of a data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DTypeKind {
    Boolean,
    SignedInteger,
    UnsignedInteger,
    Float,
    Complex,
    Binary,
    Generic,
}

/// All registry tags in numeric-code order.
pub const DTYPES: [DType; NDTYPES] = [
    DType::Bool,
    DType::Int8,
    DType::Uint8,
    DType::Uint8Clamped,
    DType::Int16,
    DType::Uint16,
    DType::Int32,
    DType::Uint32,
    DType::Int64,
    DType::Uint64,
    DType::Int128,
    DType::Uint128,
    DType::Int256,
    DType::Uint256,
    DType::Float16,
    DType::BFloat16,
    DType::Float32,
    DType::Float64,
    DType::Float128,
    DType::Complex64,
    DType::Complex128,
    DType::Binary,
    DType::Generic,
];

impl DType {
    /// Stable numeric code.
    #[inline]
    pub const fn code(self) -> i16 {
        self as i16
    }

    /// Position in the casting matrices.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Looks up a tag by its numeric code.
    ///
    /// Codes outside the registry (including [`NOTYPE`] and the
    /// user-defined range) resolve to `None`.
    pub const fn from_code(code: i16) -> Option<DType> {
        if code < 0 || code as usize >= NDTYPES {
            return None;
        }
        Some(DTYPES[code as usize])
    }

    /// Number of bytes per element.
    ///
    /// `generic` has no fixed width and reports `0`.
    pub const fn bytes_per_element(self) -> usize {
        match self {
            DType::Bool => 1,
            DType::Int8 => 1,
            DType::Uint8 => 1,
            DType::Uint8Clamped => 1,
            DType::Int16 => 2,
            DType::Uint16 => 2,
            DType::Int32 => 4,
            DType::Uint32 => 4,
            DType::Int64 => 8,
            DType::Uint64 => 8,
            DType::Int128 => 16,
            DType::Uint128 => 16,
            DType::Int256 => 32,
            DType::Uint256 => 32,
            DType::Float16 => 2,
            DType::BFloat16 => 2,
            DType::Float32 => 4,
            DType::Float64 => 8,
            DType::Float128 => 16,
            DType::Complex64 => 8,
            DType::Complex128 => 16,
            DType::Binary => 1,
            DType::Generic => 0,
        }
    }

    /// Single-letter character code.
    ///
    /// Each tag maps to a distinct letter; the mapping is part of the
    /// external contract.
    pub const fn char_code(self) -> char {
        match self {
            DType::Bool => 'x',
            DType::Int8 => 's',
            DType::Uint8 => 'b',
            DType::Uint8Clamped => 'a',
            DType::Int16 => 'k',
            DType::Uint16 => 't',
            DType::Int32 => 'i',
            DType::Uint32 => 'u',
            DType::Int64 => 'l',
            DType::Uint64 => 'v',
            DType::Int128 => 'm',
            DType::Uint128 => 'w',
            DType::Int256 => 'n',
            DType::Uint256 => 'y',
            DType::Float16 => 'h',
            DType::BFloat16 => 'e',
            DType::Float32 => 'f',
            DType::Float64 => 'd',
            DType::Float128 => 'g',
            DType::Complex64 => 'c',
            DType::Complex128 => 'z',
            DType::Binary => 'r',
            DType::Generic => 'o',
        }
    }

    /// Looks up a tag by its character code.
    pub fn from_char(c: char) -> Option<DType> {
        DTYPES.iter().copied().find(|d| d.char_code() == c)
    }

    /// Broad classification of the tag.
    pub const fn kind(self) -> DTypeKind {
        match self {
            DType::Bool => DTypeKind::Boolean,
            DType::Int8 | DType::Int16 | DType::Int32 | DType::Int64 | DType::Int128
            | DType::Int256 => DTypeKind::SignedInteger,
            DType::Uint8 | DType::Uint8Clamped | DType::Uint16 | DType::Uint32 | DType::Uint64
            | DType::Uint128 | DType::Uint256 => DTypeKind::UnsignedInteger,
            DType::Float16 | DType::BFloat16 | DType::Float32 | DType::Float64
            | DType::Float128 => DTypeKind::Float,
            DType::Complex64 | DType::Complex128 => DTypeKind::Complex,
            DType::Binary => DTypeKind::Binary,
            DType::Generic => DTypeKind::Generic,
        }
    }

    /// Whether the tag is an integer type (signed, unsigned, or clamped).
    #[inline]
    pub const fn is_integer(self) -> bool {
        matches!(
            self.kind(),
            DTypeKind::SignedInteger | DTypeKind::UnsignedInteger
        )
    }

    /// Whether the tag is a real floating-point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self.kind(), DTypeKind::Float)
    }

    /// Whether the tag is a complex floating-point type.
    #[inline]
    pub const fn is_complex(self) -> bool {
        matches!(self.kind(), DTypeKind::Complex)
    }
}

// ============================================================================
// Typed element access
// ============================================================================

/// A host scalar type backing a registry tag.
///
/// Reads and writes go through raw byte pointers because descriptor strides
/// are expressed in bytes and need not respect the host alignment of `Self`.
pub trait Scalar: bytemuck::Pod {
    /// The registry tag this type backs.
    const DTYPE: DType;

    /// Reads a value from a byte pointer.
    ///
    /// # Safety
    /// `ptr` must point to at least `size_of::<Self>()` readable bytes.
    #[inline]
    unsafe fn read(ptr: *const u8) -> Self {
        ptr.cast::<Self>().read_unaligned()
    }

    /// Writes a value to a byte pointer.
    ///
    /// # Safety
    /// `ptr` must point to at least `size_of::<Self>()` writable bytes.
    #[inline]
    unsafe fn write(ptr: *mut u8, value: Self) {
        ptr.cast::<Self>().write_unaligned(value);
    }
}

macro_rules! impl_scalar {
    ($($ty:ty => $dtype:expr),* $(,)?) => {
        $(
            impl Scalar for $ty {
                const DTYPE: DType = $dtype;
            }
        )*
    };
}

impl_scalar! {
    i8 => DType::Int8,
    u8 => DType::Uint8,
    i16 => DType::Int16,
    u16 => DType::Uint16,
    i32 => DType::Int32,
    u32 => DType::Uint32,
    i64 => DType::Int64,
    u64 => DType::Uint64,
    f16 => DType::Float16,
    bf16 => DType::BFloat16,
    f32 => DType::Float32,
    f64 => DType::Float64,
    Complex32 => DType::Complex64,
    Complex64 => DType::Complex128,
}

// ============================================================================
// Dynamically typed element access
// ============================================================================

/// A dynamically typed element value.
///
/// Used by the untyped descriptor accessors. Boolean elements are stored as
/// a single byte where any nonzero value reads as `true`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarValue {
    Bool(bool),
    Int8(i8),
    Uint8(u8),
    Uint8Clamped(u8),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float16(f16),
    BFloat16(bf16),
    Float32(f32),
    Float64(f64),
    Complex64(Complex32),
    Complex128(Complex64),
}

impl ScalarValue {
    /// The registry tag of the carried value.
    pub fn dtype(&self) -> DType {
        match self {
            ScalarValue::Bool(_) => DType::Bool,
            ScalarValue::Int8(_) => DType::Int8,
            ScalarValue::Uint8(_) => DType::Uint8,
            ScalarValue::Uint8Clamped(_) => DType::Uint8Clamped,
            ScalarValue::Int16(_) => DType::Int16,
            ScalarValue::Uint16(_) => DType::Uint16,
            ScalarValue::Int32(_) => DType::Int32,
            ScalarValue::Uint32(_) => DType::Uint32,
            ScalarValue::Int64(_) => DType::Int64,
            ScalarValue::Uint64(_) => DType::Uint64,
            ScalarValue::Float16(_) => DType::Float16,
            ScalarValue::BFloat16(_) => DType::BFloat16,
            ScalarValue::Float32(_) => DType::Float32,
            ScalarValue::Float64(_) => DType::Float64,
            ScalarValue::Complex64(_) => DType::Complex64,
            ScalarValue::Complex128(_) => DType::Complex128,
        }
    }
}

/// Reads an element of type `dtype` from a byte pointer.
///
/// Fails with [`NdarrayError::UnknownDType`] when no host scalar type backs
/// `dtype`.
///
/// # Safety
/// `ptr` must point to at least `dtype.bytes_per_element()` readable bytes.
pub unsafe fn read_ptr_value(dtype: DType, ptr: *const u8) -> Result<ScalarValue> {
    let value = match dtype {
        DType::Bool => ScalarValue::Bool(ptr.read() != 0),
        DType::Int8 => ScalarValue::Int8(i8::read(ptr)),
        DType::Uint8 => ScalarValue::Uint8(u8::read(ptr)),
        DType::Uint8Clamped => ScalarValue::Uint8Clamped(u8::read(ptr)),
        DType::Int16 => ScalarValue::Int16(i16::read(ptr)),
        DType::Uint16 => ScalarValue::Uint16(u16::read(ptr)),
        DType::Int32 => ScalarValue::Int32(i32::read(ptr)),
        DType::Uint32 => ScalarValue::Uint32(u32::read(ptr)),
        DType::Int64 => ScalarValue::Int64(i64::read(ptr)),
        DType::Uint64 => ScalarValue::Uint64(u64::read(ptr)),
        DType::Float16 => ScalarValue::Float16(f16::read(ptr)),
        DType::BFloat16 => ScalarValue::BFloat16(bf16::read(ptr)),
        DType::Float32 => ScalarValue::Float32(f32::read(ptr)),
        DType::Float64 => ScalarValue::Float64(f64::read(ptr)),
        DType::Complex64 => ScalarValue::Complex64(Complex32::read(ptr)),
        DType::Complex128 => ScalarValue::Complex128(Complex64::read(ptr)),
        _ => return Err(NdarrayError::UnknownDType(dtype.code())),
    };
    Ok(value)
}

/// Writes an element to a byte pointer.
///
/// The carried tag of `value` must equal `dtype`; a mismatch fails with
/// [`NdarrayError::CastNotAllowed`]. Fails with
/// [`NdarrayError::UnknownDType`] when no host scalar type backs `dtype`.
///
/// # Safety
/// `ptr` must point to at least `dtype.bytes_per_element()` writable bytes.
pub unsafe fn write_ptr_value(dtype: DType, ptr: *mut u8, value: ScalarValue) -> Result<()> {
    if matches!(
        dtype,
        DType::Int128
            | DType::Uint128
            | DType::Int256
            | DType::Uint256
            | DType::Float128
            | DType::Binary
            | DType::Generic
    ) {
        return Err(NdarrayError::UnknownDType(dtype.code()));
    }
    if value.dtype() != dtype {
        return Err(NdarrayError::CastNotAllowed {
            from: value.dtype(),
            to: dtype,
        });
    }
    match value {
        ScalarValue::Bool(v) => ptr.write(v as u8),
        ScalarValue::Int8(v) => i8::write(ptr, v),
        ScalarValue::Uint8(v) => u8::write(ptr, v),
        ScalarValue::Uint8Clamped(v) => u8::write(ptr, v),
        ScalarValue::Int16(v) => i16::write(ptr, v),
        ScalarValue::Uint16(v) => u16::write(ptr, v),
        ScalarValue::Int32(v) => i32::write(ptr, v),
        ScalarValue::Uint32(v) => u32::write(ptr, v),
        ScalarValue::Int64(v) => i64::write(ptr, v),
        ScalarValue::Uint64(v) => u64::write(ptr, v),
        ScalarValue::Float16(v) => f16::write(ptr, v),
        ScalarValue::BFloat16(v) => bf16::write(ptr, v),
        ScalarValue::Float32(v) => f32::write(ptr, v),
        ScalarValue::Float64(v) => f64::write(ptr, v),
        ScalarValue::Complex64(v) => Complex32::write(ptr, v),
        ScalarValue::Complex128(v) => Complex64::write(ptr, v),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(DType::Bool.code(), 0);
        assert_eq!(DType::Int8.code(), 1);
        assert_eq!(DType::Uint8Clamped.code(), 3);
        assert_eq!(DType::Uint256.code(), 13);
        assert_eq!(DType::Float64.code(), 17);
        assert_eq!(DType::Complex128.code(), 20);
        assert_eq!(DType::Generic.code(), 22);
        assert_eq!(NDTYPES, 23);
    }

    #[test]
    fn test_from_code_round_trip() {
        for &d in &DTYPES {
            assert_eq!(DType::from_code(d.code()), Some(d));
        }
        assert_eq!(DType::from_code(-1), None);
        assert_eq!(DType::from_code(NOTYPE), None);
        assert_eq!(DType::from_code(USER_DEFINED_BASE), None);
    }

    #[test]
    fn test_char_codes_distinct() {
        for (i, &a) in DTYPES.iter().enumerate() {
            for &b in &DTYPES[i + 1..] {
                assert_ne!(a.char_code(), b.char_code(), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_char_code_contract() {
        assert_eq!(DType::Float64.char_code(), 'd');
        assert_eq!(DType::Float32.char_code(), 'f');
        assert_eq!(DType::Int32.char_code(), 'i');
        assert_eq!(DType::Uint32.char_code(), 'u');
        assert_eq!(DType::Int64.char_code(), 'l');
        assert_eq!(DType::Complex64.char_code(), 'c');
        assert_eq!(DType::Complex128.char_code(), 'z');
        assert_eq!(DType::Bool.char_code(), 'x');
        assert_eq!(DType::Uint8.char_code(), 'b');
        assert_eq!(DType::Int8.char_code(), 's');
        assert_eq!(DType::Float16.char_code(), 'h');
        assert_eq!(DType::BFloat16.char_code(), 'e');
        assert_eq!(DType::Float128.char_code(), 'g');
        assert_eq!(DType::Binary.char_code(), 'r');
        assert_eq!(DType::Generic.char_code(), 'o');
        assert_eq!(DType::from_char('d'), Some(DType::Float64));
        assert_eq!(DType::from_char('q'), None);
    }

    #[test]
    fn test_bytes_per_element() {
        assert_eq!(DType::Bool.bytes_per_element(), 1);
        assert_eq!(DType::Float16.bytes_per_element(), 2);
        assert_eq!(DType::Float64.bytes_per_element(), 8);
        assert_eq!(DType::Complex64.bytes_per_element(), 8);
        assert_eq!(DType::Complex128.bytes_per_element(), 16);
        assert_eq!(DType::Int256.bytes_per_element(), 32);
        assert_eq!(DType::Generic.bytes_per_element(), 0);
    }

    #[test]
    fn test_ptr_round_trip() {
        let mut buf = [0u8; 16];
        unsafe {
            write_ptr_value(
                DType::Float64,
                buf.as_mut_ptr(),
                ScalarValue::Float64(3.25),
            )
            .unwrap();
            assert_eq!(
                read_ptr_value(DType::Float64, buf.as_ptr()).unwrap(),
                ScalarValue::Float64(3.25)
            );
            write_ptr_value(
                DType::Complex128,
                buf.as_mut_ptr(),
                ScalarValue::Complex128(Complex64::new(1.0, -2.0)),
            )
            .unwrap();
            assert_eq!(
                read_ptr_value(DType::Complex128, buf.as_ptr()).unwrap(),
                ScalarValue::Complex128(Complex64::new(1.0, -2.0))
            );
        }
    }

    #[test]
    fn test_complex_layout_real_then_imag() {
        let mut buf = [0u8; 16];
        unsafe {
            write_ptr_value(
                DType::Complex128,
                buf.as_mut_ptr(),
                ScalarValue::Complex128(Complex64::new(1.0, 2.0)),
            )
            .unwrap();
        }
        assert_eq!(f64::from_le_bytes(buf[0..8].try_into().unwrap()), 1.0);
        assert_eq!(f64::from_le_bytes(buf[8..16].try_into().unwrap()), 2.0);
    }

    #[test]
    fn test_unsupported_dtype_errors() {
        let mut buf = [0u8; 32];
        unsafe {
            assert!(matches!(
                read_ptr_value(DType::Float128, buf.as_ptr()),
                Err(NdarrayError::UnknownDType(_))
            ));
            assert!(matches!(
                write_ptr_value(DType::Generic, buf.as_mut_ptr(), ScalarValue::Uint8(1)),
                Err(NdarrayError::UnknownDType(_))
            ));
            assert!(matches!(
                write_ptr_value(DType::Float64, buf.as_mut_ptr(), ScalarValue::Float32(1.0)),
                Err(NdarrayError::CastNotAllowed { .. })
            ));
        }
    }
}
