//! Lowering of block-level statements.

use koc_par::node::{FLOW_CONTINUE, FLOW_RETURN};
use koc_par::NodeTag;
use koc_util::diagnostic::codes;
use koc_util::{is_null, Index, NULL_INDEX};

use crate::extra;
use crate::inst::{InstData, InstTag};
use crate::ref_inst::{Constant, Ref};
use crate::scope::{ScopeKind, SymbolMeta};

use super::KirGen;

impl KirGen<'_> {
    /// Lowers a `Block` node's statements into the current block.
    pub(crate) fn gen_raw_block(&mut self, node: Index) {
        let block_node = self.node(node);
        let size = block_node.rhs;
        let meta = block_node.lhs;

        for i in 0..size {
            let node_index = self.node_meta(meta + i);

            match self.node_tag(node_index) {
                NodeTag::Variable => self.gen_var(node_index),
                NodeTag::Discard => self.gen_discard(node_index),
                NodeTag::IfStmt => self.gen_if(node_index),
                NodeTag::Constant => self.gen_const(node_index),
                NodeTag::FlowOp => self.gen_flow(node_index),
                NodeTag::ForStmt => self.gen_for(node_index),
                NodeTag::WhileStmt => self.gen_while(node_index),
                NodeTag::Static => self.gen_static(node_index),
                _ => {
                    self.gen_expr(node_index);
                }
            }
        }
    }

    pub(crate) fn gen_var(&mut self, node: Index) {
        let var_node = self.node(node);

        let pattern_node_index = self.node_meta(var_node.lhs);
        let value_node_index = var_node.rhs;

        let value = self.gen_expr(value_node_index);
        self.gen_pattern(pattern_node_index, value);
    }

    pub(crate) fn gen_pattern(&mut self, node: Index, value: Ref) {
        let pattern_node = self.node(node);

        match self.node_tag(node) {
            // var x = 5;
            NodeTag::PatternSingle => {
                let inst = self.prepare_inst_with_cache();
                let str_id = self.str_of_token(self.node_token(node));

                let has_type = !is_null(pattern_node.lhs);
                let is_mutable = !is_null(pattern_node.rhs);

                const LOOKUP: [InstTag; 4] = [
                    InstTag::AllocInferred,
                    InstTag::AllocMutInferred,
                    InstTag::Alloc,
                    InstTag::AllocMut,
                ];
                let inst_tag = LOOKUP[(is_mutable as usize) + ((has_type as usize) << 1)];

                let symbol_flags = if is_mutable {
                    NULL_INDEX
                } else {
                    SymbolMeta::CONST_FLAG
                };
                let scope = self.curr_scope;
                self.create_symbol(str_id, inst.inst, scope, symbol_flags, node);

                if has_type {
                    let ty = self.gen_type(pattern_node.lhs);
                    self.set_inst(inst.inst, inst_tag, InstData::node_pl(node, ty));
                    self.create_inst(
                        InstTag::Store,
                        InstData::bin(Ref::from_inst(inst.inst), value),
                    );
                } else {
                    self.set_inst(inst.inst, inst_tag, InstData::ref_(Ref::from_inst(node)));
                    self.create_inst(
                        InstTag::StoreInferred,
                        InstData::bin(Ref::from_inst(inst.inst), value),
                    );
                }
            }

            // var (x, y) = (1, 2);
            NodeTag::PatternMultiple => {
                let meta = pattern_node.lhs;
                let size = pattern_node.rhs;

                for i in 0..size {
                    let tmp_inst = self.create_inst(
                        InstTag::FieldShort,
                        InstData::bin(value, Ref::from_inst(i)),
                    );
                    let element = self.node_meta(meta + i);
                    self.gen_pattern(element, Ref::from_inst(tmp_inst));
                }
            }

            // var Vector2{ x -> var_x, y -> var_y } = ...;
            NodeTag::PatternStruct => {
                let path = self.gen_path(pattern_node.lhs);
                let fields_node = self.node(pattern_node.rhs);

                if path.is_constant() {
                    // var i32{ ... } = ...
                    self.err_at_node(
                        codes::KEYWORD_AS_NAME,
                        "Cannot use a keyword as a struct path",
                        node,
                    );
                    return;
                }

                // The value is first coerced to the named struct, then
                // every listed field is bound.
                let as_inst = self.gen_as(value, path);

                for i in 0..fields_node.rhs {
                    let field_node_index = self.node_meta(fields_node.lhs + i);
                    let field_node = self.node(field_node_index);

                    let is_mutable = !is_null(field_node.rhs);

                    let field_id = self.str_of_token(field_node.lhs);
                    let var_id = self.str_of_token(self.node_token(field_node_index));

                    if field_id.is_constant() {
                        self.err_at_node(
                            codes::KEYWORD_AS_NAME,
                            "Cannot use a keyword as a field name",
                            field_node_index,
                        );
                        return;
                    }

                    let field_name_inst =
                        self.create_inst(InstTag::Ident, InstData::ref_(field_id));
                    let access_inst = self.create_inst(
                        InstTag::FieldShort,
                        InstData::bin(as_inst, Ref::from_inst(field_name_inst)),
                    );

                    let (inst_tag, symbol_flags) = if is_mutable {
                        (InstTag::AllocMutInferred, NULL_INDEX)
                    } else {
                        (InstTag::AllocInferred, SymbolMeta::CONST_FLAG)
                    };

                    let alloc_inst = self.create_inst(
                        inst_tag,
                        InstData::ref_(Ref::from_inst(field_node_index)),
                    );
                    self.create_inst(
                        InstTag::StoreInferred,
                        InstData::bin(Ref::from_inst(alloc_inst), Ref::from_inst(access_inst)),
                    );

                    let scope = self.curr_scope;
                    self.create_symbol(var_id, alloc_inst, scope, symbol_flags, field_node_index);
                }
            }

            // var (x, _) = (5, false);
            NodeTag::PatternDiscard => {}
            _ => unreachable!("parser emits only pattern nodes here"),
        }
    }

    /// `_ = expr;` marks a binding as discarded so it may be rebound.
    pub(crate) fn gen_discard(&mut self, node: Index) {
        let discard_node = self.node(node);

        self.reset_prev_symbol();

        let expr_tag = self.node_tag(discard_node.rhs);
        let expr = self.gen_expr(discard_node.rhs);

        if expr.is_constant() {
            self.err_at_node(
                codes::CANNOT_DISCARD,
                "Cannot discard a constant or keyword",
                node,
            );
            return;
        } else if expr_tag != NodeTag::Path {
            return;
        }

        let path_node = self.node(discard_node.rhs);
        let prev_symbol = self.prev_symbol_scope();

        if path_node.lhs != path_node.rhs || is_null(prev_symbol) {
            self.err_at_node(
                codes::CANNOT_DISCARD,
                "Cannot discard an extern variable",
                node,
            );
            return;
        }

        self.mark_symbol_discarded(prev_symbol);
        self.create_inst(InstTag::DiscardDestructor, InstData::ref_(expr));
    }

    /// ```text
    /// if (a) { ... } else { ... }
    /// ---
    /// %1 = as(bool, a)
    /// %2 = condbr(%1, body_len, end)
    /// %3 = block({ ... })
    /// %4 = block({ ... })         else
    /// ```
    pub(crate) fn gen_if(&mut self, node: Index) {
        let if_node = self.node(node);

        let block_node_index = if_node.rhs;
        let cond_node_index = self.node_meta(if_node.lhs);
        let next_if_node = self.node_meta(if_node.lhs + 1);

        let expr = self.gen_expr(cond_node_index);
        let cond_expr = self.gen_as(expr, Ref::from_const(Constant::BoolType));
        let condbr = self.prepare_inst_with_cache();

        let block = self.enter_block();
        self.enter_scope(ScopeKind::Block, NULL_INDEX, NULL_INDEX);

        self.gen_raw_block(block_node_index);

        self.exit_scope();
        self.create_block(InstTag::Block, block, block_node_index, Ref::NULL);

        // Committed blocks are re-cached by hand; create_block flushes
        // them out of the enclosing block's cache.
        self.add_to_cache(block.inst);

        // Body length and continuation, patched below.
        let extra_start = self.reserve_extra(2);
        let body_len = self.inst_count() - condbr.inst - 1;

        self.set_inst(
            condbr.inst,
            InstTag::Condbr,
            InstData::bin(cond_expr, Ref::from_inst(extra_start)),
        );

        let tag = self.node_tag(next_if_node);
        if tag == NodeTag::IfStmt {
            self.gen_if(next_if_node);
        } else if tag == NodeTag::Block {
            let else_block = self.enter_block();
            self.enter_scope(ScopeKind::Block, NULL_INDEX, NULL_INDEX);

            self.gen_raw_block(next_if_node);

            self.exit_scope();
            self.create_block(InstTag::Block, else_block, next_if_node, Ref::NULL);

            self.add_to_cache(else_block.inst);
        }

        let last_inst = self.inst_count() - 1;
        self.set_extra(extra_start, body_len);
        self.set_extra(extra_start + 1, last_inst);
    }

    /// A local constant: the comptime block itself becomes the symbol.
    pub(crate) fn gen_const(&mut self, node: Index) {
        let const_node = self.node(node);
        let str_id = self.str_of_token(self.node_token(node) + 1);

        let type_node = self.node_meta(const_node.lhs);

        let block = self.enter_block();

        let expr = self.gen_expr(const_node.rhs);

        let mut block_return = expr;
        if !is_null(type_node) {
            let type_inst = self.gen_type(type_node);
            block_return = self.gen_as(expr, type_inst);
        }

        self.create_block(InstTag::BlockComptimeInline, block, node, block_return);

        let scope = self.curr_scope;
        self.create_symbol(str_id, block.inst, scope, SymbolMeta::CONST_FLAG, node);
    }

    pub(crate) fn gen_flow(&mut self, node: Index) {
        let flow_node = self.node(node);

        // Label token or return expression.
        let value_index = flow_node.rhs;

        if flow_node.lhs == FLOW_RETURN {
            let value = if is_null(value_index) {
                Ref::NULL
            } else {
                self.gen_expr(value_index)
            };
            self.create_inst(InstTag::Return, InstData::node_pl(node, value));
            return;
        }

        let loop_inst = if is_null(value_index) {
            // An unlabeled break/continue targets the innermost loop.
            self.innermost_label()
        } else {
            let label_id = self.str_of_token(value_index);
            self.find_label(label_id.index())
        };
        if is_null(loop_inst) {
            self.err_at_node(codes::UNKNOWN_LABEL, "Label not found", node);
        }

        let inst_tag = if flow_node.lhs == FLOW_CONTINUE {
            InstTag::Continue
        } else {
            InstTag::Break
        };

        self.create_inst(inst_tag, InstData::node_pl(node, Ref::from_inst(loop_inst)));
    }

    /// ```text
    /// for x in elements { ... }
    /// ---
    /// %1 = indexable_len(elements)
    /// %2 = alloc_mut(usize)
    /// %3 = store(%2, zero)
    /// %4 = loop({
    ///     %5 = load(%2)
    ///     %6 = cmp_ls(%5, %1)
    ///     %7 = condbr(%6, body_len, end)
    ///     %8 = block({
    ///         %9 = arr_el(elements, %2)
    ///         %10 = alloc_mut_inferred()
    ///         %11 = store_inferred(%10, %9)
    ///         ...
    ///         %12 = add(%2, one)
    ///         %13 = store(%2, %12)
    ///         %14 = repeat(%4)
    ///     })
    /// })
    /// ```
    pub(crate) fn gen_for(&mut self, node: Index) {
        let for_node = self.node(node);
        let meta = for_node.lhs;
        let block_node_index = for_node.rhs;

        let pattern_node_index = self.node_meta(meta);
        let iterable_node_index = self.node_meta(meta + 1);
        let label_tok = self.node_meta(meta + 2);

        let elements = self.gen_expr(iterable_node_index);

        let indexable_len = self.create_inst(InstTag::IndexableLen, InstData::ref_(elements));
        let counter = self.create_inst(
            InstTag::AllocMut,
            InstData::node_pl(node, Ref::from_const(Constant::UsizeType)),
        );
        self.create_inst(
            InstTag::Store,
            InstData::bin(Ref::from_inst(counter), Ref::from_const(Constant::Zero)),
        );

        let loop_block = self.enter_block();
        self.push_loop_label(label_tok, loop_block.inst, node);

        let load_inst = self.create_inst(InstTag::Load, InstData::ref_(Ref::from_inst(counter)));
        let cmp_extra = self.create_extra_from(extra::Bin {
            lhs: Ref::from_inst(load_inst),
            rhs: Ref::from_inst(indexable_len),
        });
        let cmp_inst = self.create_inst(
            InstTag::CmpLs,
            InstData::node_pl(node, Ref::from_inst(cmp_extra)),
        );

        let condbr = self.prepare_inst_with_cache();

        let block = self.enter_block();
        self.enter_scope(ScopeKind::Block, NULL_INDEX, NULL_INDEX);

        let access_extra = self.create_extra_from(extra::Bin {
            lhs: elements,
            rhs: Ref::from_inst(counter),
        });
        let access_element = self.create_inst(
            InstTag::ArrEl,
            InstData::node_pl(iterable_node_index, Ref::from_inst(access_extra)),
        );

        self.gen_pattern(pattern_node_index, Ref::from_inst(access_element));
        self.gen_raw_block(block_node_index);

        let add_extra = self.create_extra_from(extra::Bin {
            lhs: Ref::from_inst(counter),
            rhs: Ref::from_const(Constant::One),
        });
        let add = self.create_inst(
            InstTag::Add,
            InstData::node_pl(node, Ref::from_inst(add_extra)),
        );
        self.create_inst(
            InstTag::Store,
            InstData::bin(Ref::from_inst(counter), Ref::from_inst(add)),
        );
        let repeat = self.create_inst(
            InstTag::Repeat,
            InstData::ref_(Ref::from_inst(loop_block.inst)),
        );

        let body_len = self.inst_count() - block.inst;
        let if_extra = self.create_extra_from(extra::IfData {
            body_len,
            end: repeat,
        });
        self.set_inst(
            condbr.inst,
            InstTag::Condbr,
            InstData::bin(Ref::from_inst(cmp_inst), Ref::from_inst(if_extra)),
        );

        self.exit_scope();
        self.create_block(InstTag::Block, block, block_node_index, Ref::NULL);
        self.add_to_cache(block.inst);

        self.pop_loop_label(label_tok);
        self.create_block(InstTag::Loop, loop_block, node, Ref::NULL);
        self.add_to_cache(loop_block.inst);
    }

    /// ```text
    /// while (c) { ... }
    /// ---
    /// %1 = loop({
    ///     %2 = as(bool, c)
    ///     %3 = condbr(%2, body_len, end)
    ///     %4 = block({
    ///         ...
    ///         %5 = repeat(%1)
    ///     })
    /// })
    /// ```
    pub(crate) fn gen_while(&mut self, node: Index) {
        let while_node = self.node(node);
        let meta = while_node.lhs;
        let block_node_index = while_node.rhs;

        let condition_node = self.node_meta(meta);
        let label_tok = self.node_meta(meta + 1);

        let loop_block = self.enter_block();
        self.push_loop_label(label_tok, loop_block.inst, node);

        let condition = self.gen_expr(condition_node);
        let cast_cond = self.gen_as(condition, Ref::from_const(Constant::BoolType));

        let condbr = self.prepare_inst_with_cache();

        let block = self.enter_block();
        self.enter_scope(ScopeKind::Block, NULL_INDEX, NULL_INDEX);

        self.gen_raw_block(block_node_index);

        let repeat = self.create_inst(
            InstTag::Repeat,
            InstData::ref_(Ref::from_inst(loop_block.inst)),
        );

        let body_len = self.inst_count() - block.inst;
        let if_extra = self.create_extra_from(extra::IfData {
            body_len,
            end: repeat,
        });
        self.set_inst(
            condbr.inst,
            InstTag::Condbr,
            InstData::bin(cast_cond, Ref::from_inst(if_extra)),
        );

        self.exit_scope();
        self.create_block(InstTag::Block, block, block_node_index, Ref::NULL);
        self.add_to_cache(block.inst);

        self.pop_loop_label(label_tok);
        self.create_block(InstTag::Loop, loop_block, node, Ref::NULL);
        self.add_to_cache(loop_block.inst);
    }

    pub(crate) fn gen_static(&mut self, node: Index) {
        // TODO: statics need an initialization order pass before they
        // can lower
        self.err_at_node(
            codes::UNSUPPORTED_CONSTRUCT,
            "Static variables are not supported yet",
            node,
        );
    }

    fn push_loop_label(&mut self, label_tok: Index, loop_inst: Index, node: Index) {
        if !is_null(label_tok) {
            let id = self.str_of_token(label_tok);
            self.add_label(id.index(), loop_inst, node);
        } else {
            self.add_anonymous_label(loop_inst);
        }
    }

    fn pop_loop_label(&mut self, _label_tok: Index) {
        self.pop_label();
    }
}
