//! Casting modes and the static cast-permission matrices.
//!
//! Two `NDTYPES x NDTYPES` matrices are built at compile time:
//! [`SAFE_CASTS`] admits only value-preserving conversions, decided by
//! integer value bits against float significand precision;
//! [`SAME_KIND_CASTS`] additionally admits movement within a kind
//! (integer, float, complex, boolean, binary, generic).

use crate::dtype::{DType, DTYPES, NDTYPES};
use crate::{NdarrayError, Result};

/// Casting rule applied when converting between data types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(i8)]
pub enum CastingMode {
    /// Only identical types.
    No = 0,
    /// Identical types; byte-swapped variants would also qualify, but the
    /// registry carries no byte-order tag, so this coincides with [`No`].
    ///
    /// [`No`]: CastingMode::No
    Equiv = 1,
    /// Only value-preserving casts.
    #[default]
    Safe = 2,
    /// Value-preserving casts and casts within the same kind.
    SameKind = 3,
    /// Any cast.
    Unsafe = 4,
}

/// Number of value bits an integer tag can represent, or `-1`.
const fn int_value_bits(d: DType) -> i32 {
    match d {
        DType::Int8 => 7,
        DType::Uint8 | DType::Uint8Clamped => 8,
        DType::Int16 => 15,
        DType::Uint16 => 16,
        DType::Int32 => 31,
        DType::Uint32 => 32,
        DType::Int64 => 63,
        DType::Uint64 => 64,
        DType::Int128 => 127,
        DType::Uint128 => 128,
        DType::Int256 => 255,
        DType::Uint256 => 256,
        _ => -1,
    }
}

const fn is_signed_int(d: DType) -> bool {
    matches!(
        d,
        DType::Int8 | DType::Int16 | DType::Int32 | DType::Int64 | DType::Int128 | DType::Int256
    )
}

const fn is_unsigned_int(d: DType) -> bool {
    matches!(
        d,
        DType::Uint8
            | DType::Uint8Clamped
            | DType::Uint16
            | DType::Uint32
            | DType::Uint64
            | DType::Uint128
            | DType::Uint256
    )
}

/// `(significand bits, exponent bits)` of a float tag, or `(-1, -1)`.
const fn float_spec(d: DType) -> (i32, i32) {
    match d {
        DType::Float16 => (11, 5),
        DType::BFloat16 => (8, 8),
        DType::Float32 => (24, 8),
        DType::Float64 => (53, 11),
        DType::Float128 => (113, 15),
        _ => (-1, -1),
    }
}

/// The real float tag carried by each part of a complex tag.
const fn complex_part(d: DType) -> DType {
    match d {
        DType::Complex64 => DType::Float32,
        DType::Complex128 => DType::Float64,
        _ => d,
    }
}

/// Whether every value of one float format is representable in another.
const fn float_fits(from: DType, to: DType) -> bool {
    let (fm, fe) = float_spec(from);
    let (tm, te) = float_spec(to);
    fm >= 0 && tm >= fm && te >= fe
}

/// Whether every value of an integer tag is representable in a float tag.
const fn int_fits_float(from: DType, to: DType) -> bool {
    let bits = int_value_bits(from);
    let (mant, _) = float_spec(to);
    bits >= 0 && mant >= bits
}

/// Whether a cast preserves every value.
const fn is_safe_cast_entry(from: DType, to: DType) -> bool {
    if from as i16 == to as i16 {
        return true;
    }
    match (from, to) {
        // Boolean, binary, and generic admit only identity.
        (DType::Bool, _) | (_, DType::Bool) => false,
        (DType::Binary, _) | (_, DType::Binary) => false,
        (DType::Generic, _) | (_, DType::Generic) => false,
        _ => {
            if is_signed_int(from) {
                if is_signed_int(to) {
                    return int_value_bits(to) >= int_value_bits(from);
                }
                if is_unsigned_int(to) {
                    return false;
                }
            } else if is_unsigned_int(from) {
                if is_unsigned_int(to) {
                    return int_value_bits(to) >= int_value_bits(from);
                }
                if is_signed_int(to) {
                    return int_value_bits(to) >= int_value_bits(from);
                }
            }
            if int_value_bits(from) >= 0 {
                if to.is_float() {
                    return int_fits_float(from, to);
                }
                if to.is_complex() {
                    return int_fits_float(from, complex_part(to));
                }
                return false;
            }
            if from.is_float() {
                if to.is_float() {
                    return float_fits(from, to);
                }
                if to.is_complex() {
                    return float_fits(from, complex_part(to));
                }
                return false;
            }
            if from.is_complex() {
                if to.is_complex() {
                    return float_fits(complex_part(from), complex_part(to));
                }
                return false;
            }
            false
        }
    }
}

/// Whether two tags belong to the same kind for same-kind casting.
///
/// Signed, unsigned, and clamped integers form a single kind here.
const fn is_same_kind_entry(from: DType, to: DType) -> bool {
    (from.is_integer() && to.is_integer())
        || (from.is_float() && to.is_float())
        || (from.is_complex() && to.is_complex())
        || matches!((from, to), (DType::Bool, DType::Bool))
        || matches!((from, to), (DType::Binary, DType::Binary))
        || matches!((from, to), (DType::Generic, DType::Generic))
}

const fn build_safe_casts() -> [[bool; NDTYPES]; NDTYPES] {
    let mut table = [[false; NDTYPES]; NDTYPES];
    let mut i = 0;
    while i < NDTYPES {
        let mut j = 0;
        while j < NDTYPES {
            table[i][j] = is_safe_cast_entry(DTYPES[i], DTYPES[j]);
            j += 1;
        }
        i += 1;
    }
    table
}

const fn build_same_kind_casts() -> [[bool; NDTYPES]; NDTYPES] {
    let mut table = [[false; NDTYPES]; NDTYPES];
    let mut i = 0;
    while i < NDTYPES {
        let mut j = 0;
        while j < NDTYPES {
            table[i][j] = is_safe_cast_entry(DTYPES[i], DTYPES[j])
                || is_same_kind_entry(DTYPES[i], DTYPES[j]);
            j += 1;
        }
        i += 1;
    }
    table
}

/// Value-preserving cast matrix, indexed by `[from][to]` numeric codes.
pub static SAFE_CASTS: [[bool; NDTYPES]; NDTYPES] = build_safe_casts();

/// Same-kind cast matrix, indexed by `[from][to]` numeric codes.
pub static SAME_KIND_CASTS: [[bool; NDTYPES]; NDTYPES] = build_same_kind_casts();

/// Whether a cast preserves every value.
#[inline]
pub fn is_safe_data_type_cast(from: DType, to: DType) -> bool {
    SAFE_CASTS[from.index()][to.index()]
}

/// Whether a cast preserves values or stays within the same kind.
#[inline]
pub fn is_same_kind_data_type_cast(from: DType, to: DType) -> bool {
    SAME_KIND_CASTS[from.index()][to.index()]
}

/// Whether a cast is permitted under a casting mode.
pub fn is_allowed_data_type_cast(from: DType, to: DType, casting: CastingMode) -> bool {
    // Anything goes for "unsafe" casting, and identity is always allowed.
    if matches!(casting, CastingMode::Unsafe) || from == to {
        return true;
    }
    match casting {
        CastingMode::No | CastingMode::Equiv => false,
        CastingMode::Safe => is_safe_data_type_cast(from, to),
        _ => is_same_kind_data_type_cast(from, to),
    }
}

/// Checks a cast against a casting mode.
///
/// Fails with [`NdarrayError::CastNotAllowed`] when the mode refuses it.
pub fn check_data_type_cast(from: DType, to: DType, casting: CastingMode) -> Result<()> {
    if is_allowed_data_type_cast(from, to, casting) {
        Ok(())
    } else {
        Err(NdarrayError::CastNotAllowed { from, to })
    }
}
