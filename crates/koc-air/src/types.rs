//! Type predicates over pool ids.

use koc_util::Index;

use crate::pool::{
    Pool, COMPTIME_FLOAT_INDEX, COMPTIME_INT_INDEX, F16_KEY_INDEX, I64_KEY_INDEX, I8_KEY_INDEX,
    ISIZE_KEY_INDEX, U64_KEY_INDEX, U8_KEY_INDEX, USIZE_KEY_INDEX,
};

pub fn is_comptime_int(ty: Index) -> bool {
    ty == COMPTIME_INT_INDEX
}

pub fn is_unsigned_int(ty: Index) -> bool {
    (U8_KEY_INDEX..=USIZE_KEY_INDEX).contains(&ty)
}

pub fn is_signed_int(ty: Index) -> bool {
    (I8_KEY_INDEX..=ISIZE_KEY_INDEX).contains(&ty)
}

pub fn is_int_type(ty: Index) -> bool {
    is_unsigned_int(ty) || is_signed_int(ty) || is_comptime_int(ty)
}

pub fn is_float(ty: Index) -> bool {
    (F16_KEY_INDEX..=COMPTIME_FLOAT_INDEX).contains(&ty)
}

pub fn is_numeric(ty: Index) -> bool {
    is_int_type(ty) || is_float(ty)
}

/// Numbers, string, char, bool, or void: everything with a reserved id.
pub fn is_primitive(ty: Index) -> bool {
    Pool::is_known_key(ty)
}

pub fn are_same(a: Index, b: Index) -> bool {
    a == b
}

/// The implicit widening rules: a fixed-width integer widens to any
/// strictly wider one of either sign, `comptime_int` widens to any
/// integer, and `u64`/`i64`/`usize`/`isize` never widen implicitly.
/// Narrowing always requires an explicit cast.
pub fn can_cast_int(from: Index, to: Index) -> bool {
    debug_assert!(is_int_type(from) && is_int_type(to));

    if from == to || is_comptime_int(from) {
        return true;
    }

    let to_width = widen_target_width(to);
    match int_width(from) {
        Some(from_width) => matches!(to_width, Some(w) if w > from_width),
        // u64, i64, usize, and isize never widen implicitly.
        None => false,
    }
}

/// Bit width of a fixed-width integer type; `None` for `usize`, `isize`,
/// and `comptime_int`.
fn int_width(ty: Index) -> Option<u32> {
    use crate::pool::*;
    match ty {
        U8_KEY_INDEX | I8_KEY_INDEX => Some(8),
        U16_KEY_INDEX | I16_KEY_INDEX => Some(16),
        U32_KEY_INDEX | I32_KEY_INDEX => Some(32),
        // 64-bit types never auto-widen; treated as unwidenable below.
        U64_KEY_INDEX | I64_KEY_INDEX => None,
        _ => None,
    }
}

/// Whether a 64-bit integer type can still be widened INTO. Separate
/// from [`int_width`] because 64-bit types accept widening but do not
/// produce it.
fn widen_target_width(ty: Index) -> Option<u32> {
    match ty {
        U64_KEY_INDEX | I64_KEY_INDEX => Some(64),
        _ => int_width(ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::*;

    #[test]
    fn test_predicates() {
        assert!(is_int_type(U8_KEY_INDEX));
        assert!(is_int_type(ISIZE_KEY_INDEX));
        assert!(is_int_type(COMPTIME_INT_INDEX));
        assert!(!is_int_type(BOOL_KEY_INDEX));
        assert!(!is_int_type(F32_KEY_INDEX));

        assert!(is_unsigned_int(USIZE_KEY_INDEX));
        assert!(!is_unsigned_int(I8_KEY_INDEX));
        assert!(is_signed_int(I64_KEY_INDEX));

        assert!(is_float(F16_KEY_INDEX));
        assert!(is_float(COMPTIME_FLOAT_INDEX));
        assert!(is_numeric(U32_KEY_INDEX));
        assert!(is_numeric(F64_KEY_INDEX));
        assert!(!is_numeric(STR_KEY_INDEX));

        assert!(is_primitive(CHAR_KEY_INDEX));
        assert!(!is_primitive(KNOWN_KEYS_LEN as u32 + 3));
    }

    #[test]
    fn test_widening() {
        assert!(can_cast_int(U8_KEY_INDEX, U32_KEY_INDEX));
        assert!(can_cast_int(U8_KEY_INDEX, I16_KEY_INDEX));
        assert!(can_cast_int(I16_KEY_INDEX, U64_KEY_INDEX));
        assert!(can_cast_int(U32_KEY_INDEX, I64_KEY_INDEX));
        assert!(can_cast_int(COMPTIME_INT_INDEX, U8_KEY_INDEX));
        assert!(can_cast_int(COMPTIME_INT_INDEX, ISIZE_KEY_INDEX));

        // Same type is always fine, narrowing never is.
        assert!(can_cast_int(U32_KEY_INDEX, U32_KEY_INDEX));
        assert!(!can_cast_int(U64_KEY_INDEX, U32_KEY_INDEX));
        assert!(!can_cast_int(U32_KEY_INDEX, U16_KEY_INDEX));

        // 64-bit and pointer-sized types never widen implicitly.
        assert!(!can_cast_int(U64_KEY_INDEX, I64_KEY_INDEX));
        assert!(!can_cast_int(USIZE_KEY_INDEX, U64_KEY_INDEX));
        assert!(!can_cast_int(ISIZE_KEY_INDEX, I64_KEY_INDEX));
    }
}
