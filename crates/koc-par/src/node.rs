//! AST node definitions.
//!
//! Nodes are stored as parallel vectors: a tag, a "main token" (the token
//! the node hangs its source location on, also used to smuggle operator
//! discriminants), and a generic `lhs`/`rhs` payload pair. Variable-arity
//! children live in the side `meta` vector; such nodes store a meta start
//! index in `lhs` and a count in `rhs` unless documented otherwise.

use koc_util::{Index, NULL_INDEX};
use static_assertions::assert_eq_size;

/// The generic payload pair of a node. Meaning is tag-dependent and
/// documented on each [`NodeTag`] variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Node {
    pub lhs: Index,
    pub rhs: Index,
}

impl Node {
    pub const fn new(lhs: Index, rhs: Index) -> Self {
        Self { lhs, rhs }
    }
}

assert_eq_size!(Node, u64);

/// Node kinds with their `lhs`/`rhs`/main-token contracts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeTag {
    /// The reserved node 0. Lhs: none. Rhs: none.
    Root,

    /// Lhs: meta (trailing statement nodes). Rhs: count.
    Block,

    /// Lhs: vis. Rhs: the last node belonging to the import.
    Import,

    /// Lhs: `Path` node. Rhs: alias `Ident` token or null.
    ImportPath,

    /// Lhs: first `Ident` token. Rhs: last `Ident` token.
    Path,

    /// Lhs: meta `[type, vis, doc token]`. Rhs: value expression.
    /// Main token: the `const` keyword; the name is the next token.
    Constant,

    /// Lhs: meta `[pattern]`. Rhs: value expression.
    Variable,

    /// Lhs: meta `[type, vis, doc token]`. Rhs: value expression.
    Static,

    /// Lhs: `FnDef` node. Rhs: `Block` node.
    Fn,

    /// Lhs: meta `[return type, modifiers, vis, doc token]`.
    /// Rhs: `FnParams` node. Modifiers: 0 none, 1 `const`.
    FnDef,

    /// Lhs: meta (trailing `FnParam` nodes). Rhs: count.
    FnParams,

    /// Lhs: is-mutable flag. Rhs: type node. Main token: the name.
    FnParam,

    /// Lhs: meta `[vis, doc token, trailing type nodes]`. Rhs: field count.
    Variant,

    /// Lhs: meta `[struct path, trait path]`. Rhs: `ImplBody` node.
    Impl,

    /// Lhs: member count. Rhs: last member node.
    ImplBody,

    /// Lhs: meta `[vis, doc token, trailing field nodes]`. Rhs: field count.
    Struct,

    /// Lhs: meta `[type, vis, doc token]`. Rhs: default value or null.
    StructField,

    /// Lhs: meta `[type, vis, doc token]`. Rhs: value expression.
    StructConst,

    /// Lhs: meta `[type, vis, doc token, trailing field nodes]`.
    /// Rhs: field count.
    Enum,

    /// Lhs: name `Ident` token. Rhs: value expression or null.
    EnumField,

    /// Lhs: meta `[condition, else node]`. Rhs: `Block` node.
    IfStmt,

    /// Lhs: meta `[pattern, iterable, label token]`. Rhs: `Block` node.
    ForStmt,

    /// Lhs: meta `[condition, label token]`. Rhs: `Block` node.
    WhileStmt,

    /// Lhs: meta `[vis, doc token]`. Rhs: last `FnDef` node.
    Trait,

    /// Lhs: literal kind (see [`LITERAL_STRING`] and friends).
    /// Rhs: the literal token.
    Literal,

    /// Lhs: meta (trailing element expressions). Rhs: count.
    Array,

    /// Lhs: size expression. Rhs: element expression.
    ArrayShort,

    /// Lhs: meta (trailing element expressions). Rhs: count.
    Tuple,

    /// Lhs: none. Rhs: discarded expression.
    Discard,

    /// Lhs: none. Rhs: inner expression.
    GroupedExpr,

    /// Lhs: type node. Rhs: value expression.
    CastExpr,

    /// Lhs: meta `[captures, params, return type]`. Rhs: `Block` node.
    ClosureExpr,

    /// Lhs: capture count. Rhs: last `ClosureCapture` node.
    ClosureCaptures,

    /// Lhs: flags (1 mutable, 2 reference). Rhs: captured expression.
    ClosureCapture,

    /// Lhs: packed pointer/reference word (see [`TYPE_PTR_MASK`]).
    /// Rhs: base node (`Path`, `TypeTuple`, `TypeArr`, `TypeDynamic`,
    /// `TypeFn`, or `TypeSlice`).
    Type,

    /// Same layout as [`NodeTag::Type`]; marks a slice element type.
    TypeSlice,

    /// Lhs: element type node. Rhs: length expression.
    TypeArr,

    /// Lhs: meta (trailing type nodes). Rhs: count.
    TypeTuple,

    /// Lhs: meta `[count, trailing parameter types]` or null.
    /// Rhs: return type node or null.
    TypeFn,

    /// Lhs: meta (trailing `Path` nodes). Rhs: count.
    TypeDynamic,

    /// Lhs: none. Rhs: none.
    PatternDiscard,

    /// Lhs: type node or null. Rhs: is-mutable flag.
    /// Main token: the name.
    PatternSingle,

    /// Lhs: meta (trailing pattern nodes). Rhs: count.
    PatternMultiple,

    /// Lhs: `Path` node. Rhs: `Block` of `PatternStructField` nodes.
    PatternStruct,

    /// Lhs: field name token. Rhs: is-mutable flag.
    /// Main token: the binding name.
    PatternStructField,

    /// Lhs: [`SingleOp`] discriminant. Rhs: operand expression.
    SingleOp,

    /// Lhs: none. Rhs: operand expression.
    UnwrapOp,

    /// Lhs: left expression. Rhs: right expression.
    /// Main token slot: the [`Operators`] discriminant.
    BinOp,

    /// Lhs: meta `[from, to]`. Rhs: base expression.
    SliceOp,

    /// Lhs: meta `[count, trailing argument expressions]` or null.
    /// Rhs: callee expression.
    CallOp,

    /// Lhs: flow kind (see [`FLOW_BREAK`]). Rhs: expression or label token.
    FlowOp,

    /// Lhs: `Path` node. Rhs: `StructExprFields` node or null.
    StructExpr,

    /// Lhs: meta (trailing `StructExprField` nodes). Rhs: count.
    StructExprFields,

    /// Lhs: field name token. Rhs: value expression.
    StructExprField,
}

assert_eq_size!(NodeTag, u8);

/// Unary operators, stored in the `lhs` of a [`NodeTag::SingleOp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SingleOp {
    BoolNeg,
    BitNeg,
    GetAddr,
    IntNeg,
    Deref,
}

impl SingleOp {
    pub fn from_index(value: Index) -> Self {
        match value {
            0 => SingleOp::BoolNeg,
            1 => SingleOp::BitNeg,
            2 => SingleOp::GetAddr,
            3 => SingleOp::IntNeg,
            4 => SingleOp::Deref,
            _ => unreachable!("invalid unary operator discriminant"),
        }
    }
}

/// Binary and postfix operators, stored in the main-token slot of a
/// [`NodeTag::BinOp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Operators {
    Invalid = 0,
    Call,
    Access,
    AccessPtr,
    AccessArr,
    Unwrap,
    Mul,
    Mod,
    Div,
    Add,
    Sub,
    Ls,
    Gt,
    LsEq,
    GtEq,
    NotEq,
    EqEq,
    And,
    OrOr,
    AndAnd,
    Or,
    Xor,
    ShiftL,
    ShiftR,
    Eq,
    EqAdd,
    EqSub,
    EqDiv,
    EqMul,
    EqMod,
    EqOr,
    EqAnd,
    EqXor,
}

impl Operators {
    pub fn from_index(value: Index) -> Self {
        use Operators::*;
        const TABLE: [Operators; 33] = [
            Invalid, Call, Access, AccessPtr, AccessArr, Unwrap, Mul, Mod, Div, Add, Sub, Ls, Gt,
            LsEq, GtEq, NotEq, EqEq, And, OrOr, AndAnd, Or, Xor, ShiftL, ShiftR, Eq, EqAdd, EqSub,
            EqDiv, EqMul, EqMod, EqOr, EqAnd, EqXor,
        ];
        TABLE[value as usize]
    }
}

/// Item visibility, one bit eaten before each top-level item.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Vis {
    Local = 0,
    Global = 1,
}

// Packed word in the lhs of a `Type` node: the highest 3 bits are flags,
// the low 29 the pointer depth.
pub const TYPE_FLAGS_COUNT: Index = 3;
pub const TYPE_FLAGS_OFFSET: Index = Index::BITS - TYPE_FLAGS_COUNT;
pub const TYPE_PTR_MASK: Index = (1 << TYPE_FLAGS_OFFSET) - 1;
pub const POINTER_MAX: Index = 8;
pub const TYPE_FLAG_REFERENCE: Index = 1 << TYPE_FLAGS_OFFSET;

// Literal kinds in the lhs of a `Literal` node.
pub const LITERAL_STRING: Index = 1;
pub const LITERAL_CHAR: Index = 2;
pub const LITERAL_NUMBER: Index = 3;
pub const LITERAL_FLOAT: Index = 4;

// Flow kinds in the lhs of a `FlowOp` node.
pub const FLOW_BREAK: Index = 1;
pub const FLOW_CONTINUE: Index = 2;
pub const FLOW_RETURN: Index = 3;

// Closure capture flags.
pub const CAPTURE_FLAG_MUTABLE: Index = 1;
pub const CAPTURE_FLAG_REFERENCE: Index = 2;

// Function modifiers.
pub const FN_MOD_NONE: Index = NULL_INDEX;
pub const FN_MOD_CONST: Index = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_round_trip() {
        for raw in 0..=32 {
            let op = Operators::from_index(raw);
            assert_eq!(op as Index, raw);
        }
    }

    #[test]
    fn test_type_packing() {
        assert_eq!(TYPE_FLAGS_OFFSET, 29);
        assert_eq!(TYPE_PTR_MASK, (1 << 29) - 1);
        let word = TYPE_FLAG_REFERENCE | 3;
        assert_eq!(word & TYPE_PTR_MASK, 3);
        assert_ne!(word & TYPE_FLAG_REFERENCE, 0);
    }
}
