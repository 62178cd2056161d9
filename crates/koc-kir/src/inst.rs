//! KIR instructions.
//!
//! An instruction is a one-byte tag plus a fixed 8-byte payload cell.
//! Tags and payloads live in parallel vectors ([`crate::Kir`]); larger
//! operands are serialized into the `extra` side table and referenced by
//! offset.

use koc_util::Index;
use static_assertions::{assert_eq_size, const_assert_eq};

use crate::ref_inst::Ref;

/// Instruction kinds. The payload shape each tag uses is named in its
/// doc comment; see [`InstData`] for the shapes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum InstTag {
    #[default]
    None,

    // Declarations ------------------------------------------------------
    /// An identifier. `Ref`: string id.
    Ident,
    /// Global item. `Bin`: lhs `extra::Decl` offset, rhs `BlockComptimeInline`.
    Decl,
    /// Function. `Bin`: lhs `extra::DeclFn` offset, rhs `Block` or null.
    DeclFn,
    /// Enum. `Bin`: lhs `extra::DeclEnum` offset, rhs `BlockComptimeInline`.
    DeclEnum,
    /// Struct. `Bin`: lhs `extra::DeclStruct` offset, rhs `BlockComptimeInline`.
    DeclStruct,
    DeclVariant,
    DeclTrait,
    DeclImpl,
    /// Struct field. `NodePl`: payload `extra::DeclStructField` offset.
    StructField,
    /// Reference to a symbol by name. `TokPl`: payload string id.
    DeclRef,
    /// Last path component. `TokPl`: payload `extra::DeclItem` offset.
    DeclItem,
    /// Function parameter. `NodePl`: payload `extra::Param` offset.
    Param,
    /// Enum field. `NodePl`: payload `extra::DeclEnumField` offset.
    EnumField,
    /// Namespace chain of a path. `NodePl`: payload is the extra offset
    /// of `[count, trailing string ids]`.
    Namespace,

    // Blocks -------------------------------------------------------------
    /// Runtime block. `NodePl`: payload `extra::Block` offset.
    Block,
    /// Runtime loop. `NodePl`: payload `extra::Block` offset.
    Loop,
    /// Instructions analyzed in the parent context; yields a value via
    /// `BreakInline`. `NodePl`: payload `extra::Block` offset.
    BlockInline,
    /// Same as `BlockInline`, evaluated at compile time.
    BlockComptimeInline,
    /// Returns a value from an inline block. `Bin`: lhs block
    /// instruction, rhs value.
    BreakInline,
    /// Leaves a runtime block. `NodePl`: payload target loop.
    Break,
    /// Returns from the function. `NodePl`: payload value.
    Return,
    /// Skips the rest of the loop body. `NodePl`: payload target loop.
    Continue,
    /// Short-circuit and. `NodePl`: payload `extra::Bin` offset, rhs
    /// inside an inline block.
    LogicAnd,
    /// Short-circuit or. Same shape as `LogicAnd`.
    LogicOr,
    /// `Ref`.
    Goto,
    /// Restarts the loop. `Ref`: loop instruction.
    Repeat,

    // Memory -------------------------------------------------------------
    /// Stack slot with explicit type. `NodePl`: payload type.
    Alloc,
    AllocMut,
    /// Stack slot with inferred type. `Ref`: AST node.
    AllocInferred,
    AllocMutInferred,
    /// `Bin`: lhs destination, rhs value.
    Store,
    StoreInferred,
    /// Same as `Store` with a source location. `NodePl`: payload
    /// `extra::Bin` offset.
    StoreNode,
    /// `Ref`: source instruction.
    Load,
    /// Length of an indexable value, used by `for` lowering. `Ref`.
    IndexableLen,

    // Checks -------------------------------------------------------------
    /// `Ref`: the discarded value.
    DiscardDestructor,

    // Expressions --------------------------------------------------------
    /// Array literal. `NodePl`: payload extra offset of
    /// `[count, trailing element refs]`.
    ArrInit,
    /// `[value; size]`. `NodePl`: payload `extra::ArrayShortInit` offset.
    ArrShortInit,
    /// Tuple literal. `NodePl`: payload extra offset of
    /// `[count, trailing element refs]`.
    Tuple,
    /// Explicit cast. `Bin`: lhs type, rhs value.
    Cast,
    /// Call. `NodePl`: payload `extra::Call` offset.
    Call,
    /// Conditional branch. `Bin`: lhs condition, rhs `extra::IfData`
    /// offset.
    Condbr,

    // Literals -----------------------------------------------------------
    /// 64-bit integer literal. `Int`.
    Int,
    /// 64-bit float literal. `Float`.
    Float,
    /// String literal. `StrTok`.
    Str,
    /// Character literal. `StrTok`.
    Char,

    // Binary operations: `NodePl`, payload `extra::Bin` offset ----------
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `a[b]`
    ArrEl,
    /// `a.b`. `NodePl`: payload `extra::FieldExpr` offset.
    Field,
    /// `a.b` without a node. `Bin`.
    FieldShort,
    CmpLs,
    CmpGt,
    CmpLse,
    CmpGte,
    CmpEq,
    CmpNeq,
    BitAnd,
    BitOr,
    BitShl,
    BitShr,
    BitXor,

    // Special operations -------------------------------------------------
    /// `|[a; from, to]|`. `NodePl`: payload `extra::Slice` offset.
    SliceFull,
    /// `|[a; from]|`. `NodePl`: payload `extra::Bin` offset.
    SliceStart,
    /// `|[a; _, to]|`. `NodePl`: payload `extra::Bin` offset.
    SliceEnd,
    /// `new A`. `NodePl`: payload path instruction.
    StructInitEmpty,
    /// `new A { ... }`. `NodePl`: payload extra offset of
    /// `[path, count, trailing (name, value) pairs]`.
    StructInit,

    // Unary operations: `NodePl`, payload operand ------------------------
    BoolNeg,
    BitNeg,
    GetAddr,
    Deref,
    IntNeg,
    Unwrap,

    // Types --------------------------------------------------------------
    /// Type coercion. `Bin`: lhs type, rhs value.
    As,
    /// `NodePl`: payload `extra::ArrayType` offset.
    ArrayType,
    /// `NodePl`: payload `extra::PtrType` offset.
    PtrType,
    /// `NodePl`: payload extra offset of `[count, trailing type refs]`.
    TupleType,
    /// `NodePl`: payload extra offset of `[count, trailing path refs]`.
    DynType,
    /// `NodePl`: payload element type.
    RefType,
    /// `NodePl`: payload element type.
    SliceType,
}

assert_eq_size!(InstTag, u8);

/// Binary payload: two refs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bin {
    pub lhs: Ref,
    pub rhs: Ref,
}

/// AST node plus a payload ref.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodePl {
    pub node: Index,
    pub payload: Ref,
}

/// Token plus a payload ref.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TokPl {
    pub token: Index,
    pub payload: Ref,
}

/// String id plus the token it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrTok {
    pub string: Index,
    pub token: Index,
}

/// The fixed 8-byte payload cell.
///
/// The cell is two untyped 32-bit halves; the instruction tag dictates
/// which accessor applies. Constructors and accessors come in matched
/// pairs so a mismatched read is a local bug, not a memory error.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InstData {
    a: u32,
    b: u32,
}

const_assert_eq!(std::mem::size_of::<InstData>(), 8);

impl InstData {
    pub fn bin(lhs: Ref, rhs: Ref) -> Self {
        Self {
            a: lhs.bits(),
            b: rhs.bits(),
        }
    }

    pub fn as_bin(self) -> Bin {
        Bin {
            lhs: Ref::from_bits(self.a),
            rhs: Ref::from_bits(self.b),
        }
    }

    pub fn node_pl(node: Index, payload: Ref) -> Self {
        Self {
            a: node,
            b: payload.bits(),
        }
    }

    pub fn as_node_pl(self) -> NodePl {
        NodePl {
            node: self.a,
            payload: Ref::from_bits(self.b),
        }
    }

    pub fn tok_pl(token: Index, payload: Ref) -> Self {
        Self {
            a: token,
            b: payload.bits(),
        }
    }

    pub fn as_tok_pl(self) -> TokPl {
        TokPl {
            token: self.a,
            payload: Ref::from_bits(self.b),
        }
    }

    pub fn str_tok(string: Index, token: Index) -> Self {
        Self { a: string, b: token }
    }

    pub fn as_str_tok(self) -> StrTok {
        StrTok {
            string: self.a,
            token: self.b,
        }
    }

    pub fn int(value: u64) -> Self {
        Self {
            a: value as u32,
            b: (value >> 32) as u32,
        }
    }

    pub fn as_int(self) -> u64 {
        (self.a as u64) | ((self.b as u64) << 32)
    }

    pub fn float(value: f64) -> Self {
        Self::int(value.to_bits())
    }

    pub fn as_float(self) -> f64 {
        f64::from_bits(self.as_int())
    }

    pub fn ref_(value: Ref) -> Self {
        Self {
            a: value.bits(),
            b: 0,
        }
    }

    pub fn as_ref(self) -> Ref {
        Ref::from_bits(self.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ref_inst::Constant;

    #[test]
    fn test_int_round_trip() {
        for value in [0u64, 1, u32::MAX as u64, u64::MAX, 0xDEAD_BEEF_0BAD_F00D] {
            assert_eq!(InstData::int(value).as_int(), value);
        }
    }

    #[test]
    fn test_float_round_trip() {
        for value in [0.0f64, 1.5, -3.25, f64::MAX] {
            assert_eq!(InstData::float(value).as_float(), value);
        }
    }

    #[test]
    fn test_bin_round_trip() {
        let data = InstData::bin(Ref::from_inst(3), Ref::from_const(Constant::One));
        let bin = data.as_bin();
        assert_eq!(bin.lhs.index(), 3);
        assert!(bin.rhs.is_constant());
        assert_eq!(bin.rhs.to_constant(), Constant::One);
    }
}
