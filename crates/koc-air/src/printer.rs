//! Human-readable AIR dump, one declaration at a time.

use std::fmt::Write;

use koc_util::Index;

use crate::inst::{Air, AirTag};
use crate::pool::{self, Pool, PoolKey};
use crate::symbol::Record;

/// Name of a reserved pool type, or a positional spelling for the rest.
pub fn type_name(ty: Index) -> String {
    match ty {
        pool::NONE_KEY_INDEX => "none".to_owned(),
        pool::VOID_KEY_INDEX => "void".to_owned(),
        pool::BOOL_KEY_INDEX => "bool".to_owned(),
        pool::STR_KEY_INDEX => "str".to_owned(),
        pool::CHAR_KEY_INDEX => "char".to_owned(),
        pool::U8_KEY_INDEX => "u8".to_owned(),
        pool::U16_KEY_INDEX => "u16".to_owned(),
        pool::U32_KEY_INDEX => "u32".to_owned(),
        pool::U64_KEY_INDEX => "u64".to_owned(),
        pool::USIZE_KEY_INDEX => "usize".to_owned(),
        pool::I8_KEY_INDEX => "i8".to_owned(),
        pool::I16_KEY_INDEX => "i16".to_owned(),
        pool::I32_KEY_INDEX => "i32".to_owned(),
        pool::I64_KEY_INDEX => "i64".to_owned(),
        pool::ISIZE_KEY_INDEX => "isize".to_owned(),
        pool::COMPTIME_INT_INDEX => "comptime_int".to_owned(),
        pool::F16_KEY_INDEX => "f16".to_owned(),
        pool::F32_KEY_INDEX => "f32".to_owned(),
        pool::F64_KEY_INDEX => "f64".to_owned(),
        pool::COMPTIME_FLOAT_INDEX => "comptime_float".to_owned(),
        other => format!("pool#{}", other),
    }
}

fn pool_entry(pool: &Pool, index: Index) -> String {
    match pool.key_of(index) {
        PoolKey::None => "none".to_owned(),
        PoolKey::SimpleType(_) => type_name(index),
        PoolKey::SimpleValue(v) => format!("{:?}", v),
        PoolKey::TypeValue { ty, val } | PoolKey::Int { ty, value: val } => {
            format!("{}({})", type_name(ty), pool.value_at(val))
        }
        PoolKey::Bytes { ty, start } => format!("{} bytes@{}", type_name(ty), start),
        PoolKey::ArrType { ty, len } => format!("[{}; #{}]", type_name(ty), len),
    }
}

/// Renders one declaration's AIR.
pub fn print_air(air: &Air, pool: &Pool, record: &Record) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "air `{}` (ty={}):",
        record.name,
        type_name(record.ty)
    );

    for inst in 1..air.len() as Index {
        let data = air.data(inst);
        match air.tag(inst) {
            AirTag::Constant => {
                let _ = writeln!(
                    out,
                    "  %{} = constant({})",
                    inst,
                    pool_entry(pool, data.as_pool_index())
                );
            }
            AirTag::Symbol => {
                let sym = data.as_symbol();
                let _ = writeln!(
                    out,
                    "  %{} = symbol(decl={}, ty={})",
                    inst,
                    sym.decl,
                    type_name(sym.ty)
                );
            }
            AirTag::Load => {
                let op = data.as_ty_op();
                let _ = writeln!(out, "  %{} = load({}, %{})", inst, type_name(op.ty), op.operand);
            }
            AirTag::Cast => {
                let op = data.as_ty_op();
                let _ = writeln!(out, "  %{} = cast({}, %{})", inst, type_name(op.ty), op.operand);
            }
            tag => {
                let bin = data.as_bin_op();
                let name = match tag {
                    AirTag::Add => "add",
                    AirTag::Sub => "sub",
                    AirTag::Mul => "mul",
                    AirTag::Div => "div",
                    AirTag::Mod => "mod",
                    AirTag::BitAnd => "bit_and",
                    AirTag::BitOr => "bit_or",
                    AirTag::BitShl => "bit_shl",
                    AirTag::BitShr => "bit_shr",
                    _ => "bit_xor",
                };
                let _ = writeln!(out, "  %{} = {}(%{}, %{})", inst, name, bin.lhs, bin.rhs);
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(pool::U8_KEY_INDEX), "u8");
        assert_eq!(type_name(pool::COMPTIME_INT_INDEX), "comptime_int");
        assert_eq!(type_name(999), "pool#999");
    }
}
