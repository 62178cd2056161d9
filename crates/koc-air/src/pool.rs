//! The intern pool: content-addressed canonical types and compile-time
//! values.
//!
//! A pool entry is identified by its [`PoolKey`]; inserting the same key
//! twice yields the same id. The first [`KNOWN_KEYS_LEN`] entries are
//! created at construction in a fixed order, so their indices double as
//! compile-time type tokens throughout sema and AIR.

use koc_kir::{Constant, Ref};
use koc_util::{FxHashMap, Index, Interner, NULL_INDEX};

/// Primitive types stored inline in a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SimpleType {
    Void = 1,
    Bool,
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    U64,
    I64,
    Usize,
    Isize,
    F16,
    F32,
    F64,
    ComptimeInt,
    ComptimeFloat,
    Char,
    Str,
}

impl SimpleType {
    pub fn from_index(value: Index) -> Self {
        use SimpleType::*;
        const TABLE: [SimpleType; 19] = [
            Void, Bool, U8, I8, U16, I16, U32, I32, U64, I64, Usize, Isize, F16, F32, F64,
            ComptimeInt, ComptimeFloat, Char, Str,
        ];
        TABLE[(value - 1) as usize]
    }
}

/// Predefined simple values stored inline in a key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum SimpleValue {
    Zero = 1,
    One,
    NullPtr,
    BoolTrue,
    BoolFalse,
}

impl SimpleValue {
    pub fn from_index(value: Index) -> Self {
        use SimpleValue::*;
        const TABLE: [SimpleValue; 5] = [Zero, One, NullPtr, BoolTrue, BoolFalse];
        TABLE[(value - 1) as usize]
    }
}

/// A type index paired with an index into the pool's value array.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TypeValue {
    pub ty: Index,
    pub val: Index,
}

/// Content key of a pool entry. Equality and hashing are structural.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolKey {
    None,
    SimpleType(SimpleType),
    SimpleValue(SimpleValue),
    /// A byte string of type `ty` starting at `start` in the byte array.
    Bytes { ty: Index, start: Index },
    /// A typed compile-time value.
    TypeValue { ty: Index, val: Index },
    /// An array type.
    ArrType { ty: Index, len: Index },
    /// A typed integer referencing the value array.
    Int { ty: Index, value: Index },
}

/// Serialized key tags; one byte per entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum KeyTag {
    None,
    SimpleType,
    SimpleValue,
    Bytes,
    TypeValue,
    ArrType,
    Int,
}

impl PoolKey {
    pub fn tag(&self) -> KeyTag {
        match self {
            PoolKey::None => KeyTag::None,
            PoolKey::SimpleType(_) => KeyTag::SimpleType,
            PoolKey::SimpleValue(_) => KeyTag::SimpleValue,
            PoolKey::Bytes { .. } => KeyTag::Bytes,
            PoolKey::TypeValue { .. } => KeyTag::TypeValue,
            PoolKey::ArrType { .. } => KeyTag::ArrType,
            PoolKey::Int { .. } => KeyTag::Int,
        }
    }
}

/// The reserved keys, in construction order. Their position in this
/// array is their pool id.
pub const ALL_KEYS: [PoolKey; KNOWN_KEYS_LEN] = [
    PoolKey::None,
    PoolKey::SimpleType(SimpleType::Void),
    PoolKey::SimpleType(SimpleType::Bool),
    PoolKey::SimpleType(SimpleType::Str),
    PoolKey::SimpleType(SimpleType::Char),
    PoolKey::SimpleType(SimpleType::U8),
    PoolKey::SimpleType(SimpleType::U16),
    PoolKey::SimpleType(SimpleType::U32),
    PoolKey::SimpleType(SimpleType::U64),
    PoolKey::SimpleType(SimpleType::Usize),
    PoolKey::SimpleType(SimpleType::I8),
    PoolKey::SimpleType(SimpleType::I16),
    PoolKey::SimpleType(SimpleType::I32),
    PoolKey::SimpleType(SimpleType::I64),
    PoolKey::SimpleType(SimpleType::Isize),
    PoolKey::SimpleType(SimpleType::ComptimeInt),
    PoolKey::SimpleType(SimpleType::F16),
    PoolKey::SimpleType(SimpleType::F32),
    PoolKey::SimpleType(SimpleType::F64),
    PoolKey::SimpleType(SimpleType::ComptimeFloat),
    PoolKey::SimpleValue(SimpleValue::Zero),
    PoolKey::SimpleValue(SimpleValue::One),
    PoolKey::SimpleValue(SimpleValue::NullPtr),
    PoolKey::SimpleValue(SimpleValue::BoolTrue),
    PoolKey::SimpleValue(SimpleValue::BoolFalse),
];

/// Number of reserved entries.
pub const KNOWN_KEYS_LEN: usize = 25;

// Reserved key indices. These are compile-time constants because the
// construction order above is fixed.
pub const NONE_KEY_INDEX: Index = 0;
pub const VOID_KEY_INDEX: Index = 1;
pub const BOOL_KEY_INDEX: Index = 2;
pub const STR_KEY_INDEX: Index = 3;
pub const CHAR_KEY_INDEX: Index = 4;
pub const U8_KEY_INDEX: Index = 5;
pub const U16_KEY_INDEX: Index = 6;
pub const U32_KEY_INDEX: Index = 7;
pub const U64_KEY_INDEX: Index = 8;
pub const USIZE_KEY_INDEX: Index = 9;
pub const I8_KEY_INDEX: Index = 10;
pub const I16_KEY_INDEX: Index = 11;
pub const I32_KEY_INDEX: Index = 12;
pub const I64_KEY_INDEX: Index = 13;
pub const ISIZE_KEY_INDEX: Index = 14;
pub const COMPTIME_INT_INDEX: Index = 15;
pub const F16_KEY_INDEX: Index = 16;
pub const F32_KEY_INDEX: Index = 17;
pub const F64_KEY_INDEX: Index = 18;
pub const COMPTIME_FLOAT_INDEX: Index = 19;
pub const ZERO_KEY_INDEX: Index = 20;
pub const ONE_KEY_INDEX: Index = 21;
pub const NULL_PTR_KEY_INDEX: Index = 22;
pub const TRUE_KEY_INDEX: Index = 23;
pub const FALSE_KEY_INDEX: Index = 24;

// Reserved slots of the value array.
pub const ZERO_VALUE_INDEX: Index = 0;
pub const ONE_VALUE_INDEX: Index = 1;
pub const NULL_PTR_VALUE_INDEX: Index = ZERO_VALUE_INDEX;
pub const FALSE_VALUE_INDEX: Index = ZERO_VALUE_INDEX;
pub const TRUE_VALUE_INDEX: Index = ONE_VALUE_INDEX;

/// Content-addressed store of types and compile-time values.
pub struct Pool {
    /// Raw bytes for string-like values.
    pub bytes: Vec<u8>,
    /// Raw 64-bit bit patterns for integer and float values.
    pub values: Vec<u64>,
    /// Symbol-name interner.
    pub strings: Interner,

    /// Serialized composite key payloads.
    extra: Vec<Index>,
    /// Per-entry payload: an inline enum value for simple keys, an
    /// `extra` start offset otherwise.
    data: Vec<Index>,
    tags: Vec<KeyTag>,

    cache: FxHashMap<PoolKey, Index>,
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}

impl Pool {
    pub fn new() -> Self {
        let mut pool = Self {
            bytes: Vec::new(),
            values: vec![0, 1],
            strings: Interner::new(),
            extra: Vec::new(),
            data: Vec::new(),
            tags: Vec::new(),
            cache: FxHashMap::default(),
        };

        debug_assert_eq!(pool.values[ZERO_VALUE_INDEX as usize], 0);
        debug_assert_eq!(pool.values[ONE_VALUE_INDEX as usize], 1);

        // The NONE key occupies index 0.
        pool.tags.push(KeyTag::None);
        pool.data.push(NULL_INDEX);
        pool.cache.insert(PoolKey::None, NULL_INDEX);

        for key in &ALL_KEYS[1..] {
            pool.put(*key);
        }

        pool
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// True for the reserved keys created at construction.
    pub const fn is_known_key(pool_index: Index) -> bool {
        (pool_index as usize) < KNOWN_KEYS_LEN
    }

    /// Inserts a key, returning the existing id when the key is already
    /// present.
    pub fn put(&mut self, key: PoolKey) -> Index {
        if let Some(&existing) = self.cache.get(&key) {
            return existing;
        }

        self.tags.push(key.tag());
        match key {
            PoolKey::None => unreachable!("the NONE key is seeded at construction"),
            PoolKey::SimpleType(ty) => self.data.push(ty as Index),
            PoolKey::SimpleValue(val) => self.data.push(val as Index),
            PoolKey::Bytes { ty, start } => self.push_extra(&[ty, start]),
            PoolKey::TypeValue { ty, val } => self.push_extra(&[ty, val]),
            PoolKey::ArrType { ty, len } => self.push_extra(&[ty, len]),
            PoolKey::Int { ty, value } => self.push_extra(&[ty, value]),
        }

        let index = (self.data.len() - 1) as Index;
        self.cache.insert(key, index);
        index
    }

    fn push_extra(&mut self, words: &[Index]) {
        let start = self.extra.len() as Index;
        self.extra.extend_from_slice(words);
        self.data.push(start);
    }

    /// Id of a key, or `NULL_INDEX` if it was never inserted.
    pub fn get(&self, key: &PoolKey) -> Index {
        self.cache.get(key).copied().unwrap_or(NULL_INDEX)
    }

    pub fn get_or_put(&mut self, key: PoolKey) -> Index {
        self.put(key)
    }

    pub fn tag_of(&self, pool_index: Index) -> KeyTag {
        self.tags[pool_index as usize]
    }

    /// Reconstructs the key stored at an id.
    pub fn key_of(&self, pool_index: Index) -> PoolKey {
        let data = self.data[pool_index as usize];
        match self.tags[pool_index as usize] {
            KeyTag::None => PoolKey::None,
            KeyTag::SimpleType => PoolKey::SimpleType(SimpleType::from_index(data)),
            KeyTag::SimpleValue => PoolKey::SimpleValue(SimpleValue::from_index(data)),
            KeyTag::Bytes => PoolKey::Bytes {
                ty: self.extra[data as usize],
                start: self.extra[data as usize + 1],
            },
            KeyTag::TypeValue => PoolKey::TypeValue {
                ty: self.extra[data as usize],
                val: self.extra[data as usize + 1],
            },
            KeyTag::ArrType => PoolKey::ArrType {
                ty: self.extra[data as usize],
                len: self.extra[data as usize + 1],
            },
            KeyTag::Int => PoolKey::Int {
                ty: self.extra[data as usize],
                value: self.extra[data as usize + 1],
            },
        }
    }

    /// The type of the entry: itself for a type, the carried type for a
    /// typed value, `NONE_KEY_INDEX` where no type applies.
    pub fn type_of(&self, pool_index: Index) -> Index {
        match self.key_of(pool_index) {
            PoolKey::SimpleType(_) => pool_index,
            PoolKey::Bytes { ty, .. } => ty,
            PoolKey::TypeValue { ty, .. } => ty,
            PoolKey::Int { ty, .. } => ty,
            PoolKey::None | PoolKey::SimpleValue(_) | PoolKey::ArrType { .. } => NONE_KEY_INDEX,
        }
    }

    /// The `{type, value-index}` pair of a typed value entry, or a
    /// `NONE` pair for anything else.
    pub fn type_value_of(&self, pool_index: Index) -> TypeValue {
        match self.key_of(pool_index) {
            PoolKey::TypeValue { ty, val } => TypeValue { ty, val },
            PoolKey::Int { ty, value } => TypeValue { ty, val: value },
            _ => TypeValue {
                ty: NONE_KEY_INDEX,
                val: NONE_KEY_INDEX,
            },
        }
    }

    pub fn add_value(&mut self, value: u64) -> Index {
        self.values.push(value);
        (self.values.len() - 1) as Index
    }

    pub fn value_at(&self, value_index: Index) -> u64 {
        self.values[value_index as usize]
    }

    pub fn add_byte(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Pool type of a KIR constant reference.
    pub fn constant_type(constant: Ref) -> Index {
        debug_assert!(constant.is_constant());

        match constant.to_constant() {
            Constant::None => NONE_KEY_INDEX,
            Constant::Zero | Constant::One => COMPTIME_INT_INDEX,
            Constant::NullValue => NULL_PTR_KEY_INDEX,
            Constant::VoidType => VOID_KEY_INDEX,
            Constant::BoolTrue | Constant::BoolFalse | Constant::BoolType => BOOL_KEY_INDEX,
            Constant::U8Type => U8_KEY_INDEX,
            Constant::I8Type => I8_KEY_INDEX,
            Constant::U16Type => U16_KEY_INDEX,
            Constant::I16Type => I16_KEY_INDEX,
            Constant::U32Type => U32_KEY_INDEX,
            Constant::I32Type => I32_KEY_INDEX,
            Constant::U64Type => U64_KEY_INDEX,
            Constant::I64Type => I64_KEY_INDEX,
            Constant::UsizeType => USIZE_KEY_INDEX,
            Constant::IsizeType => ISIZE_KEY_INDEX,
            Constant::F16Type => F16_KEY_INDEX,
            Constant::F32Type => F32_KEY_INDEX,
            Constant::F64Type => F64_KEY_INDEX,
            Constant::StrType => STR_KEY_INDEX,
            Constant::CharType => CHAR_KEY_INDEX,
        }
    }

    /// Pool type and value index of a KIR value constant. Both sides
    /// are `NULL_INDEX` for type constants.
    pub fn constant_type_value(constant: Ref) -> TypeValue {
        debug_assert!(constant.is_constant());

        if !constant.is_value() {
            return TypeValue {
                ty: NULL_INDEX,
                val: NULL_INDEX,
            };
        }

        match constant.to_constant() {
            Constant::Zero => TypeValue {
                ty: COMPTIME_INT_INDEX,
                val: ZERO_VALUE_INDEX,
            },
            Constant::One => TypeValue {
                ty: COMPTIME_INT_INDEX,
                val: ONE_VALUE_INDEX,
            },
            Constant::NullValue => TypeValue {
                ty: NULL_PTR_KEY_INDEX,
                val: NULL_PTR_VALUE_INDEX,
            },
            Constant::BoolTrue => TypeValue {
                ty: BOOL_KEY_INDEX,
                val: TRUE_VALUE_INDEX,
            },
            Constant::BoolFalse => TypeValue {
                ty: BOOL_KEY_INDEX,
                val: FALSE_VALUE_INDEX,
            },
            _ => unreachable!("is_value covers exactly the five value constants"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_keys_preserved() {
        let pool = Pool::new();
        assert_eq!(pool.len(), KNOWN_KEYS_LEN);
        for (index, key) in ALL_KEYS.iter().enumerate() {
            assert_eq!(pool.get(key), index as Index, "key {:?} moved", key);
            assert!(Pool::is_known_key(index as Index));
        }
        assert!(!Pool::is_known_key(KNOWN_KEYS_LEN as Index));
    }

    #[test]
    fn test_put_idempotent() {
        let mut pool = Pool::new();

        let key = PoolKey::Int { ty: 0, value: 0 };
        let first = pool.put(key);
        let second = pool.put(key);
        assert_eq!(first, second);
        assert_eq!(pool.get(&key), first);
    }

    #[test]
    fn test_distinct_keys_distinct_ids() {
        let mut pool = Pool::new();

        let a = pool.put(PoolKey::Int { ty: 0, value: 0 });
        let b = pool.put(PoolKey::Int { ty: 1, value: 0 });
        let c = pool.put(PoolKey::Int { ty: 2, value: 0 });

        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_eq!(pool.get(&PoolKey::Int { ty: 0, value: 0 }), a);
        assert_eq!(pool.get(&PoolKey::Int { ty: 1, value: 0 }), b);
        assert_eq!(pool.get(&PoolKey::Int { ty: 2, value: 0 }), c);
    }

    #[test]
    fn test_type_of() {
        let mut pool = Pool::new();
        assert_eq!(pool.type_of(U8_KEY_INDEX), U8_KEY_INDEX);

        let val = pool.add_value(300);
        let id = pool.put(PoolKey::TypeValue {
            ty: U32_KEY_INDEX,
            val,
        });
        assert_eq!(pool.type_of(id), U32_KEY_INDEX);
        assert_eq!(pool.type_value_of(id).val, val);
    }

    #[test]
    fn test_constant_round_trips() {
        use koc_kir::Constant;

        assert_eq!(
            Pool::constant_type(Ref::from_const(Constant::U8Type)),
            U8_KEY_INDEX
        );
        let tv = Pool::constant_type_value(Ref::from_const(Constant::One));
        assert_eq!(tv.ty, COMPTIME_INT_INDEX);
        assert_eq!(tv.val, ONE_VALUE_INDEX);

        let none = Pool::constant_type_value(Ref::from_const(Constant::U8Type));
        assert_eq!(none.ty, NULL_INDEX);
    }

    #[test]
    fn test_values_seeded() {
        let pool = Pool::new();
        assert_eq!(pool.value_at(ZERO_VALUE_INDEX), 0);
        assert_eq!(pool.value_at(ONE_VALUE_INDEX), 1);
    }
}
