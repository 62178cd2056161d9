//! Lowering of expressions.

use koc_par::node::{
    Operators, SingleOp, LITERAL_CHAR, LITERAL_FLOAT, LITERAL_NUMBER, LITERAL_STRING,
};
use koc_par::NodeTag;
use koc_util::convert::{parse_f64, parse_u64};
use koc_util::diagnostic::codes;
use koc_util::{is_null, Index, NULL_INDEX};

use crate::extra;
use crate::inst::{InstData, InstTag};
use crate::ref_inst::{Constant, Ref};
use crate::scope::ScopeKind;

use super::KirGen;

impl KirGen<'_> {
    pub(crate) fn gen_expr(&mut self, node: Index) -> Ref {
        match self.node_tag(node) {
            NodeTag::Path => self.gen_path(node),
            NodeTag::Literal => self.gen_literal(node),
            NodeTag::Array => self.gen_array(node),
            NodeTag::ArrayShort => self.gen_array_short(node),
            NodeTag::Tuple => self.gen_tuple(node),
            NodeTag::CastExpr => self.gen_cast(node),
            NodeTag::ClosureExpr => self.gen_closure(node),
            NodeTag::SingleOp => self.gen_single_op(node),
            NodeTag::UnwrapOp => self.gen_unwrap(node),
            NodeTag::BinOp => self.gen_bin_op(node),
            NodeTag::SliceOp => self.gen_slice(node),
            NodeTag::CallOp => self.gen_call(node),
            NodeTag::StructExpr => self.gen_struct_expr(node),
            NodeTag::GroupedExpr => self.gen_expr(self.node(node).rhs),
            _ => unreachable!("parser emits only expression nodes here"),
        }
    }

    /// Resolves a path.
    ///
    /// `A::B::C` becomes a `Namespace` instruction carrying the leading
    /// identifiers plus a `DeclItem` for the last one. A bare identifier
    /// resolves through the scope chain: a local symbol with a bound
    /// instruction loads it, a reference to a top-level declaration or a
    /// forward reference becomes a `DeclRef` resolved later, and a
    /// primitive name collapses to its constant.
    pub(crate) fn gen_path(&mut self, node: Index) -> Ref {
        // PATH stores the first and last identifier tokens; identifiers
        // sit two tokens apart (`a :: b :: c`).
        let path_node = self.node(node);
        let parts_count = (path_node.rhs - path_node.lhs) / 2;
        let last_id = self.str_of_token(path_node.rhs);

        let mut curr_scope = self.curr_scope;
        let extra_start = self.extra_size();

        if parts_count > 0 {
            self.add_to_extra(parts_count);
        }

        // All identifiers except the last one form the namespace chain.
        for i in 0..parts_count {
            let id = self.str_of_token(path_node.lhs + i * 2);
            let scope = self.scope_contains(curr_scope, id.index());

            curr_scope = if is_null(scope) {
                self.create_or_get_scope_custom(ScopeKind::Symbol, curr_scope, id.index(), NULL_INDEX)
            } else {
                scope
            };

            self.add_to_extra(id.bits());
        }

        // A::B::C
        if parts_count > 0 {
            let namespace_inst = self.create_inst(
                InstTag::Namespace,
                InstData::node_pl(node, Ref::from_inst(extra_start)),
            );

            let item_extra = self.create_extra_from(extra::DeclItem {
                name: last_id.bits(),
                namespace_inst,
            });
            let inst = self.create_inst(
                InstTag::DeclItem,
                InstData::tok_pl(path_node.rhs, Ref::from_inst(item_extra)),
            );

            if last_id.is_constant() {
                // A::B::i32
                self.err_at_token(
                    codes::KEYWORD_AS_NAME,
                    "Cannot use a keyword in a path",
                    path_node.rhs,
                );
            }

            return Ref::from_inst(inst);
        }

        // Primitive names collapse to their constants.
        if last_id.is_constant() {
            return last_id;
        }

        let symbol = self.get_symbol_in_scope(last_id.index(), self.curr_scope);
        if is_null(symbol) {
            return Ref::from_inst(self.create_inst(
                InstTag::DeclRef,
                InstData::tok_pl(path_node.rhs, last_id),
            ));
        }

        let symbol_meta = self.symbol_meta_of_scope(symbol);

        // Forward references and references to top-level declarations
        // resolve by name during sema; only bound locals load directly.
        if is_null(symbol_meta.inst) || self.is_top_decl(symbol_meta.inst) {
            Ref::from_inst(self.create_inst(
                InstTag::DeclRef,
                InstData::tok_pl(path_node.rhs, last_id),
            ))
        } else {
            Ref::from_inst(self.create_inst(
                InstTag::Load,
                InstData::ref_(Ref::from_inst(symbol_meta.inst)),
            ))
        }
    }

    /// True if the instruction is a top-level declaration, which sema
    /// resolves through the namespace rather than the local frame.
    fn is_top_decl(&self, inst: Index) -> bool {
        matches!(
            self.kir_tag(inst),
            InstTag::Decl
                | InstTag::DeclFn
                | InstTag::DeclEnum
                | InstTag::DeclStruct
                | InstTag::DeclVariant
        )
    }

    pub(crate) fn gen_literal(&mut self, node: Index) -> Ref {
        let literal_node = self.node(node);
        let content = self.token_content(literal_node.rhs);

        match literal_node.lhs {
            LITERAL_STRING => {
                let inner = content.get(1..content.len().saturating_sub(1)).unwrap_or("");
                let id = self.kir_intern(inner);
                Ref::from_inst(self.create_inst(InstTag::Str, InstData::str_tok(id, literal_node.rhs)))
            }
            LITERAL_CHAR => {
                let inner = content.get(1..content.len().saturating_sub(1)).unwrap_or("");
                let id = self.kir_intern(inner);
                Ref::from_inst(
                    self.create_inst(InstTag::Char, InstData::str_tok(id, literal_node.rhs)),
                )
            }
            LITERAL_FLOAT => match parse_f64(content) {
                Ok(value) => {
                    Ref::from_inst(self.create_inst(InstTag::Float, InstData::float(value)))
                }
                Err(_) => {
                    self.err_at_node(
                        codes::CANNOT_FIT_INT,
                        "Float literal does not fit into f64",
                        node,
                    );
                    Ref::NULL
                }
            },
            LITERAL_NUMBER => match parse_u64(content) {
                Ok(0) => Ref::from_const(Constant::Zero),
                Ok(1) => Ref::from_const(Constant::One),
                Ok(value) => Ref::from_inst(self.create_inst(InstTag::Int, InstData::int(value))),
                Err(_) => {
                    self.err_at_node(
                        codes::CANNOT_FIT_INT,
                        "Integer literal does not fit into 64 bits",
                        node,
                    );
                    Ref::NULL
                }
            },
            _ => unreachable!("parser emits only the four literal kinds"),
        }
    }

    fn gen_array(&mut self, node: Index) -> Ref {
        let arr_node = self.node(node);
        let size = arr_node.rhs;
        let meta = arr_node.lhs;

        let arr_meta = self.reserve_extra(size + 1);
        self.set_extra(arr_meta, size);

        for i in 0..size {
            let element = self.node_meta(meta + i);
            let value = self.gen_expr(element);
            self.set_extra(arr_meta + i + 1, value.bits());
        }

        Ref::from_inst(self.create_inst(
            InstTag::ArrInit,
            InstData::node_pl(node, Ref::from_inst(arr_meta)),
        ))
    }

    fn gen_array_short(&mut self, node: Index) -> Ref {
        let arr_node = self.node(node);
        let size = self.gen_expr(arr_node.lhs);
        let value = self.gen_expr(arr_node.rhs);

        let extra = self.create_extra_from(extra::ArrayShortInit { size, value });
        Ref::from_inst(self.create_inst(
            InstTag::ArrShortInit,
            InstData::node_pl(node, Ref::from_inst(extra)),
        ))
    }

    fn gen_tuple(&mut self, node: Index) -> Ref {
        let tuple_node = self.node(node);
        let size = tuple_node.rhs;

        let extra_start = self.reserve_extra(size + 1);
        self.set_extra(extra_start, size);

        for i in 0..size {
            let element = self.node_meta(tuple_node.lhs + i);
            let value = self.gen_expr(element);
            self.set_extra(extra_start + i + 1, value.bits());
        }

        Ref::from_inst(self.create_inst(
            InstTag::Tuple,
            InstData::node_pl(node, Ref::from_inst(extra_start)),
        ))
    }

    fn gen_cast(&mut self, node: Index) -> Ref {
        let cast_node = self.node(node);
        let ty = self.gen_type(cast_node.lhs);
        let value = self.gen_expr(cast_node.rhs);

        Ref::from_inst(self.create_inst(InstTag::Cast, InstData::bin(ty, value)))
    }

    fn gen_closure(&mut self, node: Index) -> Ref {
        // TODO: closures need capture lowering and a function body
        // instruction of their own
        self.err_at_node(
            codes::UNSUPPORTED_CONSTRUCT,
            "Closures are not supported yet",
            node,
        );
        Ref::NULL
    }

    fn gen_single_op(&mut self, node: Index) -> Ref {
        let op_node = self.node(node);
        let operation = SingleOp::from_index(op_node.lhs);

        let tag = match operation {
            SingleOp::BoolNeg => InstTag::BoolNeg,
            SingleOp::BitNeg => InstTag::BitNeg,
            SingleOp::GetAddr => InstTag::GetAddr,
            SingleOp::IntNeg => InstTag::IntNeg,
            SingleOp::Deref => InstTag::Deref,
        };

        let operand = self.gen_expr(op_node.rhs);
        Ref::from_inst(self.create_inst(tag, InstData::node_pl(node, operand)))
    }

    fn gen_unwrap(&mut self, node: Index) -> Ref {
        let unwrap_node = self.node(node);
        let operand = self.gen_expr(unwrap_node.rhs);
        Ref::from_inst(self.create_inst(InstTag::Unwrap, InstData::node_pl(node, operand)))
    }

    fn gen_slice(&mut self, node: Index) -> Ref {
        let slice_node = self.node(node);
        let base = self.gen_expr(slice_node.rhs);

        let meta_index = slice_node.lhs;
        let from_expr = self.node_meta(meta_index);
        let to_expr = self.node_meta(meta_index + 1);

        if is_null(from_expr) {
            let to = self.gen_expr(to_expr);
            let extra = self.create_extra_from(extra::Bin { lhs: base, rhs: to });
            return Ref::from_inst(self.create_inst(
                InstTag::SliceEnd,
                InstData::node_pl(node, Ref::from_inst(extra)),
            ));
        } else if is_null(to_expr) {
            let from = self.gen_expr(from_expr);
            let extra = self.create_extra_from(extra::Bin {
                lhs: base,
                rhs: from,
            });
            return Ref::from_inst(self.create_inst(
                InstTag::SliceStart,
                InstData::node_pl(node, Ref::from_inst(extra)),
            ));
        }

        let from = self.gen_expr(from_expr);
        let to = self.gen_expr(to_expr);

        let extra = self.create_extra_from(extra::Slice { base, from, to });
        Ref::from_inst(self.create_inst(
            InstTag::SliceFull,
            InstData::node_pl(node, Ref::from_inst(extra)),
        ))
    }

    fn gen_call(&mut self, node: Index) -> Ref {
        let call_node = self.node(node);
        let base = self.gen_expr(call_node.rhs);

        if is_null(call_node.lhs) {
            let extra = self.create_extra_from(extra::Call { base, argc: 0 });
            return Ref::from_inst(self.create_inst(
                InstTag::Call,
                InstData::node_pl(node, Ref::from_inst(extra)),
            ));
        }

        let args_count = self.node_meta(call_node.lhs);

        let call_extra = self.create_extra_from(extra::Call {
            base,
            argc: args_count,
        });
        let reserved_start = self.reserve_extra(args_count);

        for i in 0..args_count {
            let arg = self.node_meta(call_node.lhs + i + 1);
            let value = self.gen_expr(arg);
            self.set_extra(reserved_start + i, value.bits());
        }

        Ref::from_inst(self.create_inst(
            InstTag::Call,
            InstData::node_pl(node, Ref::from_inst(call_extra)),
        ))
    }

    fn gen_struct_expr(&mut self, node: Index) -> Ref {
        let struct_node = self.node(node);

        let struct_path = self.gen_path(struct_node.lhs);

        if is_null(struct_node.rhs) {
            return Ref::from_inst(
                self.create_inst(InstTag::StructInitEmpty, InstData::node_pl(node, struct_path)),
            );
        }

        let fields = self.node(struct_node.rhs);
        let fields_count = fields.rhs;
        let fields_meta = fields.lhs;

        // Path, count, then (name, value) pairs.
        let meta = self.reserve_extra(fields_count * 2 + 2);
        self.set_extra(meta, struct_path.bits());
        self.set_extra(meta + 1, fields_count);

        for i in 0..fields_count {
            let field_index = self.node_meta(fields_meta + i);
            let field = self.node(field_index);

            let name = self.str_of_token(field.lhs);
            self.set_extra(meta + i * 2 + 2, name.bits());
            let value = self.gen_expr(field.rhs);
            self.set_extra(meta + i * 2 + 3, value.bits());
        }

        Ref::from_inst(self.create_inst(
            InstTag::StructInit,
            InstData::node_pl(node, Ref::from_inst(meta)),
        ))
    }

    /// `a.b`: the field name becomes an `Ident` instruction.
    fn gen_field(&mut self, rhs_node: Index, lhs: Ref) -> Ref {
        let path_node = self.node(rhs_node);

        let ident = self.str_of_token(path_node.lhs);
        let inst = self.create_inst(InstTag::Ident, InstData::ref_(ident));

        let extra = self.create_extra_from(extra::FieldExpr {
            base: lhs,
            field: Ref::from_inst(inst),
        });
        Ref::from_inst(self.create_inst(
            InstTag::Field,
            InstData::node_pl(rhs_node, Ref::from_inst(extra)),
        ))
    }

    fn gen_bin_op(&mut self, node: Index) -> Ref {
        use Operators as Op;

        let bin_node = self.node(node);
        let operation = Op::from_index(self.node_token(node));

        // `a && b` and `a || b` put the right side inside an inline
        // block so the left side short-circuits.
        if operation == Op::AndAnd || operation == Op::OrOr {
            let lhs = self.gen_expr(bin_node.lhs);
            let inst = self.prepare_inst();
            self.add_to_cache(inst);

            let block = self.enter_block();
            let rhs = self.gen_expr(bin_node.rhs);
            self.create_block(InstTag::BlockInline, block, bin_node.rhs, rhs);

            let tag = if operation == Op::AndAnd {
                InstTag::LogicAnd
            } else {
                InstTag::LogicOr
            };
            let extra = self.create_extra_from(extra::Bin {
                lhs,
                rhs: Ref::from_inst(block.inst),
            });
            self.set_inst(inst, tag, InstData::node_pl(node, Ref::from_inst(extra)));
            return Ref::from_inst(inst);
        }

        let mut lhs = self.gen_expr(bin_node.lhs);

        if operation == Op::Access {
            return self.gen_field(bin_node.rhs, lhs);
        } else if operation == Op::AccessPtr {
            // a->b is (*a).b
            lhs = Ref::from_inst(self.create_inst(InstTag::Deref, InstData::node_pl(node, lhs)));
            return self.gen_field(bin_node.rhs, lhs);
        }

        let rhs = self.gen_expr(bin_node.rhs);

        let mut store_val = false;
        let tag = match operation {
            Op::EqAdd => {
                store_val = true;
                InstTag::Add
            }
            Op::Add => InstTag::Add,
            Op::EqSub => {
                store_val = true;
                InstTag::Sub
            }
            Op::Sub => InstTag::Sub,
            Op::EqMul => {
                store_val = true;
                InstTag::Mul
            }
            Op::Mul => InstTag::Mul,
            Op::EqDiv => {
                store_val = true;
                InstTag::Div
            }
            Op::Div => InstTag::Div,
            Op::EqMod => {
                store_val = true;
                InstTag::Mod
            }
            Op::Mod => InstTag::Mod,
            Op::AccessArr => InstTag::ArrEl,
            Op::Ls => InstTag::CmpLs,
            Op::Gt => InstTag::CmpGt,
            Op::LsEq => InstTag::CmpLse,
            Op::GtEq => InstTag::CmpGte,
            Op::NotEq => InstTag::CmpNeq,
            Op::EqEq => InstTag::CmpEq,
            Op::EqAnd => {
                store_val = true;
                InstTag::BitAnd
            }
            Op::And => InstTag::BitAnd,
            Op::EqOr => {
                store_val = true;
                InstTag::BitOr
            }
            Op::Or => InstTag::BitOr,
            Op::EqXor => {
                store_val = true;
                InstTag::BitXor
            }
            Op::Xor => InstTag::BitXor,
            Op::ShiftL => InstTag::BitShl,
            Op::ShiftR => InstTag::BitShr,
            Op::Eq => {
                let extra = self.create_extra_from(extra::Bin { lhs, rhs });
                return Ref::from_inst(self.create_inst(
                    InstTag::StoreNode,
                    InstData::node_pl(node, Ref::from_inst(extra)),
                ));
            }
            Op::AndAnd | Op::OrOr | Op::Invalid | Op::Access | Op::AccessPtr | Op::Call
            | Op::Unwrap => {
                unreachable!("handled above or never stored in a BinOp node")
            }
        };

        let extra = self.create_extra_from(extra::Bin { lhs, rhs });
        let inst = self.create_inst(tag, InstData::node_pl(node, Ref::from_inst(extra)));

        if store_val {
            return Ref::from_inst(
                self.create_inst(InstTag::Store, InstData::bin(lhs, Ref::from_inst(inst))),
            );
        }

        Ref::from_inst(inst)
    }
}
