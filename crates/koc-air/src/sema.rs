//! Per-declaration semantic analysis: KIR to AIR.
//!
//! One [`Sema`] exists per top-level declaration, holding the Air under
//! construction and the dense kir-to-air instruction map for the
//! declaration's KIR range. The [`AirGen`] drives them: analysis of a
//! declaration may recursively analyze the declarations it references,
//! with the `NotAnalyzed → InProgress → Complete` lattice on each
//! record detecting cycles without a stack walk.

use koc_kir::{extra, InstTag, Ref};
use koc_par::Vis;
use koc_util::diagnostic::{codes, Diagnostic, DiagnosticCode, Label};
use koc_util::{is_null, Index, NULL_INDEX};

use crate::inst::{Air, AirData, AirTag};
use crate::module::{Module, SemaSlot};
use crate::pool::{
    Pool, PoolKey, BOOL_KEY_INDEX, FALSE_VALUE_INDEX, NULL_PTR_VALUE_INDEX, ONE_VALUE_INDEX,
    TRUE_VALUE_INDEX, ZERO_VALUE_INDEX,
};
use crate::symbol::{RecordState, SymbolMap};
use crate::types;
use crate::value::{self, CanFit};

/// The arithmetic and bitwise operations sema folds or forwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitShl,
    BitShr,
    BitXor,
}

/// A resolved operand: its pool type and its AIR instruction.
#[derive(Clone, Copy, Debug)]
struct TypeInst {
    ty: Index,
    inst: Index,
}

impl TypeInst {
    const NULL: TypeInst = TypeInst {
        ty: NULL_INDEX,
        inst: NULL_INDEX,
    };
}

/// Per-declaration analysis state.
pub struct Sema {
    mod_id: Index,
    record: Index,

    kir_inst: Index,
    inst_count: Index,
    /// The declaration's root block; a `BreakInline` targeting it ends
    /// the analysis.
    block_inst: Index,
    /// AST node of the root block, the fallback diagnostic location for
    /// instructions that carry no source link of their own.
    fallback_node: Index,

    air: Air,
    /// Dense kir-to-air map over the declaration's instruction range.
    inst_map: Vec<Index>,
}

impl Sema {
    fn new(mod_id: Index, slot: SemaSlot) -> Self {
        Self {
            mod_id,
            record: slot.record,
            kir_inst: slot.kir_inst,
            inst_count: slot.inst_count,
            block_inst: NULL_INDEX,
            fallback_node: NULL_INDEX,
            air: Air::new(),
            inst_map: vec![NULL_INDEX; slot.inst_count as usize],
        }
    }

    fn relative(&self, kir_inst: Index) -> usize {
        debug_assert!(kir_inst >= self.kir_inst - self.inst_count);
        (kir_inst - (self.kir_inst - self.inst_count)) as usize
    }

    fn map_inst(&mut self, kir_inst: Index, air_inst: Index) {
        let at = self.relative(kir_inst);
        self.inst_map[at] = air_inst;
    }

    fn local_air(&self, kir_inst: Index) -> Index {
        self.inst_map[self.relative(kir_inst)]
    }

    fn create_constant(&mut self, kir_inst: Index, pool_index: Index) {
        let air = self.air.push(AirTag::Constant, AirData::pool_index(pool_index));
        self.map_inst(kir_inst, air);
    }

    fn is_constant(&self, air_inst: Index) -> bool {
        self.air.tag(air_inst) == AirTag::Constant
    }

    fn are_constants(&self, a: Index, b: Index) -> bool {
        self.is_constant(a) && self.is_constant(b)
    }
}

/// Drives sema across all modules after KIR generation has quiesced.
pub struct AirGen<'a> {
    pub map: &'a mut SymbolMap,
    pub pool: &'a mut Pool,
    pub modules: &'a mut Vec<Module>,
}

impl AirGen<'_> {
    /// Walks the module's top-level block, creating one sema slot, one
    /// Air, and one placeholder record per declaration. Runs inside the
    /// manager's lock right after KIR generation.
    pub fn prepare_module(map: &mut SymbolMap, module: &mut Module, mod_id: Index) {
        if module.kir.len() < 2 {
            return;
        }

        let top = module.kir.data(1).as_node_pl();
        let top_extra = top.payload.index();
        let decls_count = module.kir.extra_at(top_extra);

        module.airs.reserve(decls_count as usize);
        module.semas.reserve(decls_count as usize);

        // Instruction 0 is the sentinel, 1 the top block.
        let mut start_offset = 2;
        for i in 1..=decls_count {
            let inst_offset = module.kir.extra_at(top_extra + i);

            let decl_bin = module.kir.data(inst_offset).as_bin();
            let decl: extra::Decl = module.kir.read_extra(decl_bin.lhs.index());

            let name_ref = Ref::from_bits(decl.name);
            let name = if name_ref.is_constant() {
                name_ref.to_constant().name().to_owned()
            } else {
                module.kir.str(decl.name).to_owned()
            };
            let vis = if decl.vis == Vis::Global as Index {
                Vis::Global
            } else {
                Vis::Local
            };

            let record = map.create_record(module.namespace, &name, vis, inst_offset, mod_id);

            module.airs.push(Air::new());
            module.semas.push(SemaSlot {
                kir_inst: inst_offset,
                inst_count: inst_offset - start_offset,
                record,
            });

            start_offset = inst_offset;
        }
    }

    /// Analyzes every declaration of every module. Declarations already
    /// pulled in by a reference are skipped by their state guards.
    pub fn analyze_all(&mut self) {
        for mod_id in 0..self.modules.len() {
            for decl_idx in 0..self.modules[mod_id].semas.len() {
                self.analyze(mod_id as Index, decl_idx);
            }
        }
    }

    pub fn analyze(&mut self, mod_id: Index, decl_idx: usize) {
        self.analyze_decl(mod_id, decl_idx);
        self.analyze_body(mod_id, decl_idx);
    }

    /// Signature analysis; for constants this is the whole declaration.
    pub fn analyze_decl(&mut self, mod_id: Index, decl_idx: usize) {
        let slot = self.modules[mod_id as usize].semas[decl_idx];
        if self.map.record(slot.record).status_decl != RecordState::NotAnalyzed {
            return;
        }
        self.map.record_mut(slot.record).status_decl = RecordState::InProgress;

        match self.kir_tag(mod_id, slot.kir_inst) {
            // A constant needs decl and body at once.
            InstTag::Decl => self.analyze_glob_decl(mod_id, decl_idx),
            InstTag::DeclFn => self.analyze_fn_decl(mod_id, decl_idx),
            InstTag::DeclEnum
            | InstTag::DeclStruct
            | InstTag::DeclVariant
            | InstTag::DeclTrait
            | InstTag::DeclImpl => {}
            _ => unreachable!("top-level blocks list only declarations"),
        }

        self.map.record_mut(slot.record).status_decl = RecordState::Complete;
    }

    pub fn analyze_body(&mut self, mod_id: Index, decl_idx: usize) {
        let slot = self.modules[mod_id as usize].semas[decl_idx];
        if self.map.record(slot.record).status_body != RecordState::NotAnalyzed {
            return;
        }
        self.map.record_mut(slot.record).status_body = RecordState::InProgress;

        match self.kir_tag(mod_id, slot.kir_inst) {
            InstTag::Decl => self.analyze_glob_decl(mod_id, decl_idx),
            InstTag::DeclFn => {
                self.analyze_fn_decl(mod_id, decl_idx);
                self.analyze_fn_body(mod_id, decl_idx);
            }
            InstTag::DeclEnum
            | InstTag::DeclStruct
            | InstTag::DeclVariant
            | InstTag::DeclTrait
            | InstTag::DeclImpl => {}
            _ => unreachable!("top-level blocks list only declarations"),
        }

        self.map.record_mut(slot.record).status_body = RecordState::Complete;
    }

    fn analyze_glob_decl(&mut self, mod_id: Index, decl_idx: usize) {
        let slot = self.modules[mod_id as usize].semas[decl_idx];
        if self.map.record(slot.record).status_body == RecordState::Complete {
            return;
        }
        self.map.record_mut(slot.record).status_body = RecordState::InProgress;

        let decl_bin = self.kir_data(mod_id, slot.kir_inst).as_bin();
        let block_inst = decl_bin.rhs.index();

        let mut sema = Sema::new(mod_id, slot);
        sema.block_inst = block_inst;
        sema.fallback_node = self.kir_data(mod_id, block_inst).as_node_pl().node;

        if self.kir_tag(mod_id, block_inst) == InstTag::BlockComptimeInline {
            self.analyze_block(&mut sema, block_inst);
        }
        // Statics share the Decl shape but do not lower yet.

        // The map dies here; only the Air survives the declaration.
        self.modules[mod_id as usize].airs[decl_idx] = sema.air;
        self.map.record_mut(slot.record).status_body = RecordState::Complete;
    }

    fn analyze_fn_decl(&mut self, mod_id: Index, decl_idx: usize) {
        let slot = self.modules[mod_id as usize].semas[decl_idx];
        let fn_decl_extra = self.kir_data(mod_id, slot.kir_inst).as_bin().lhs.index();
        let _fn_decl: extra::DeclFn = self.modules[mod_id as usize].kir.read_extra(fn_decl_extra);

        // TODO: lower the signature (return type block, parameter types)
        // into pool function types
        self.map.record_mut(slot.record).is_comptime = false;
    }

    fn analyze_fn_body(&mut self, _mod_id: Index, _decl_idx: usize) {
        // TODO: body lowering needs runtime block and memory instruction
        // analysis first
    }

    fn analyze_block(&mut self, sema: &mut Sema, block_inst: Index) {
        let block = self.kir_data(sema.mod_id, block_inst).as_node_pl();
        let block_extra = block.payload.index();
        let items_count = self.kir_extra_at(sema.mod_id, block_extra);

        for i in 0..items_count {
            let inst = self.kir_extra_at(sema.mod_id, block_extra + 1 + i);
            self.analyze_inst(sema, inst);
        }
    }

    fn analyze_inst(&mut self, sema: &mut Sema, inst: Index) {
        match self.kir_tag(sema.mod_id, inst) {
            InstTag::None | InstTag::Ident => {}

            // Literals
            InstTag::Int => {
                let raw = self.kir_data(sema.mod_id, inst).as_int();
                let val = self.pool.add_value(raw);
                let pool_index = self.pool.put(PoolKey::TypeValue {
                    ty: crate::pool::COMPTIME_INT_INDEX,
                    val,
                });
                sema.create_constant(inst, pool_index);
            }
            InstTag::Float => {
                let raw = self.kir_data(sema.mod_id, inst).as_float();
                let val = self.pool.add_value(raw.to_bits());
                let pool_index = self.pool.put(PoolKey::TypeValue {
                    ty: crate::pool::COMPTIME_FLOAT_INDEX,
                    val,
                });
                sema.create_constant(inst, pool_index);
            }

            InstTag::DeclRef => self.kir_decl_ref(sema, inst),
            InstTag::BreakInline => self.kir_break_inline(sema, inst),
            InstTag::As => self.kir_as(sema, inst),

            InstTag::Add => self.kir_arithmetic(sema, inst, Operation::Add),
            InstTag::Sub => self.kir_arithmetic(sema, inst, Operation::Sub),
            InstTag::Mul => self.kir_arithmetic(sema, inst, Operation::Mul),
            InstTag::Div => self.kir_arithmetic(sema, inst, Operation::Div),
            InstTag::Mod => self.kir_arithmetic(sema, inst, Operation::Mod),
            InstTag::BitAnd => self.kir_arithmetic(sema, inst, Operation::BitAnd),
            InstTag::BitOr => self.kir_arithmetic(sema, inst, Operation::BitOr),
            InstTag::BitShl => self.kir_arithmetic(sema, inst, Operation::BitShl),
            InstTag::BitShr => self.kir_arithmetic(sema, inst, Operation::BitShr),
            InstTag::BitXor => self.kir_arithmetic(sema, inst, Operation::BitXor),

            // Remaining instruction groups (memory, control flow, paths,
            // aggregates, unary operations, type constructors) reach
            // sema only through function bodies, which do not lower yet.
            _ => {}
        }
    }

    //-- DeclRef --------------------------------------------------------//

    fn kir_decl_ref(&mut self, sema: &mut Sema, inst: Index) {
        let data = self.kir_data(sema.mod_id, inst).as_tok_pl();
        let name = self.modules[sema.mod_id as usize]
            .kir
            .str(data.payload.index())
            .to_owned();

        // Only the module's own top-level declarations are searched.
        let namespace = self.modules[sema.mod_id as usize].namespace;
        let Some(record_id) = self.map.find_decl(namespace, &name) else {
            self.err_at_token(
                sema.mod_id,
                codes::UNKNOWN_SYMBOL,
                &format!("Unknown symbol `{}`", name),
                data.token,
            );
            sema.map_inst(inst, NULL_INDEX);
            return;
        };

        let record = self.map.record(record_id);
        match record.status_decl {
            RecordState::InProgress => {
                self.err_at_token(
                    sema.mod_id,
                    codes::CIRCULAR_DEPENDENCY,
                    &format!("Circular dependency on `{}`", name),
                    data.token,
                );
                sema.map_inst(inst, NULL_INDEX);
                return;
            }
            RecordState::NotAnalyzed => {
                let (target_mod, target_kir) = (record.module, record.kir_inst);
                if let Some(decl_idx) = self.modules[target_mod as usize].find_sema(target_kir) {
                    self.analyze_decl(target_mod, decl_idx);
                }
            }
            RecordState::Complete => {}
        }

        let record = self.map.record(record_id);
        if record.is_comptime {
            if is_null(record.val) {
                // Poisoned by an earlier error; stay silent.
                sema.map_inst(inst, NULL_INDEX);
            } else {
                sema.create_constant(inst, record.val);
            }
        } else {
            let air = sema
                .air
                .push(AirTag::Symbol, AirData::symbol(record_id, record.ty));
            sema.map_inst(inst, air);
        }
    }

    //-- BreakInline ----------------------------------------------------//

    fn kir_break_inline(&mut self, sema: &mut Sema, inst: Index) {
        let bin = self.kir_data(sema.mod_id, inst).as_bin();
        let block_inst = bin.lhs.index();
        let ret = bin.rhs;

        if sema.block_inst != block_inst {
            // TODO: breaks out of nested inline blocks are not defined
            // by the language yet
            return;
        }

        // End of the declaration's analysis.
        let air_inst = if ret.is_constant() {
            let tv = Pool::constant_type_value(ret);
            if is_null(tv.ty) {
                return;
            }
            let pool_index = self.pool.get_or_put(PoolKey::TypeValue {
                ty: tv.ty,
                val: tv.val,
            });
            sema.air.push(AirTag::Constant, AirData::pool_index(pool_index))
        } else {
            sema.local_air(ret.index())
        };

        if is_null(air_inst) {
            return;
        }

        let ty = self.air_type(sema, air_inst);
        let record = self.map.record_mut(sema.record);
        record.ty = ty;
        record.air_inst = air_inst;

        if sema.is_constant(air_inst) {
            record.val = sema.air.data(air_inst).as_pool_index();
        }
    }

    //-- As ---------------------------------------------------------------//

    fn kir_as(&mut self, sema: &mut Sema, inst: Index) {
        let bin = self.kir_data(sema.mod_id, inst).as_bin();
        let type_ref = bin.lhs;
        let value_ref = bin.rhs;

        let type_index = if type_ref.is_constant() {
            Pool::constant_type(type_ref)
        } else {
            self.kir_type(sema, type_ref.index())
        };

        if is_null(type_index) {
            // The type expression failed upstream; the decl is already
            // poisoned.
            return;
        }

        if value_ref.is_constant() {
            self.kir_as_constant(sema, type_index, value_ref, inst);
            return;
        }

        let air_value = sema.local_air(value_ref.index());
        if is_null(air_value) {
            return;
        }
        let value_type = self.air_type(sema, air_value);

        if types::is_comptime_int(value_type) {
            if !types::is_int_type(type_index) {
                self.err_fallback(sema, codes::MISMATCHED_TYPES, "Mismatched types");
                return;
            }

            // The value is a comptime-int constant; re-key it with the
            // target type if it fits.
            let pool_index = sema.air.data(air_value).as_pool_index();
            let tv = self.pool.type_value_of(pool_index);
            let raw = self.pool.value_at(tv.val);

            match value::can_fit_int(type_index, raw) {
                CanFit::Yes => {}
                CanFit::No => {
                    self.err_fallback(
                        sema,
                        codes::CANNOT_FIT_INT,
                        &format!("Cannot fit {} into the target type", raw),
                    );
                    return;
                }
                CanFit::Unimplemented => {
                    self.err_fallback(
                        sema,
                        codes::UNSUPPORTED_CONSTRUCT,
                        "Range checks for usize and isize are not implemented",
                    );
                    return;
                }
            }

            let pool_index = self.pool.get_or_put(PoolKey::TypeValue {
                ty: type_index,
                val: tv.val,
            });
            sema.create_constant(inst, pool_index);
        } else if types::is_int_type(type_index) {
            if !types::is_int_type(value_type) {
                self.err_fallback(sema, codes::MISMATCHED_TYPES, "Mismatched types");
                return;
            }

            if types::are_same(type_index, value_type) {
                sema.map_inst(inst, air_value);
                return;
            }

            if !types::can_cast_int(value_type, type_index) {
                self.err_fallback(
                    sema,
                    codes::CANNOT_CAST,
                    "Cannot implicitly narrow the integer type",
                );
                return;
            }

            if sema.is_constant(air_value) {
                let pool_index = sema.air.data(air_value).as_pool_index();
                let tv = self.pool.type_value_of(pool_index);
                let rekeyed = self.pool.get_or_put(PoolKey::TypeValue {
                    ty: type_index,
                    val: tv.val,
                });
                sema.create_constant(inst, rekeyed);
                return;
            }

            let cast = sema
                .air
                .push(AirTag::Cast, AirData::ty_op(type_index, air_value));
            sema.map_inst(inst, cast);
        } else if types::are_same(type_index, value_type) {
            sema.map_inst(inst, air_value);
        } else {
            self.err_fallback(sema, codes::MISMATCHED_TYPES, "Mismatched types");
        }
    }

    /// Coerces one of the predefined constant refs (0, 1, null, true,
    /// false) directly into a typed pool constant.
    fn kir_as_constant(&mut self, sema: &mut Sema, type_index: Index, val: Ref, inst: Index) {
        if !val.is_value() {
            self.err_fallback(sema, codes::EXPECTED_VALUE, "Expected a value, found a type");
            return;
        }

        let val_type = Pool::constant_type(val);

        if types::is_comptime_int(val_type) {
            if !types::is_numeric(type_index) {
                self.err_fallback(sema, codes::MISMATCHED_TYPES, "Mismatched types");
                return;
            }
            let value_index = if val.to_constant() == koc_kir::Constant::Zero {
                ZERO_VALUE_INDEX
            } else {
                ONE_VALUE_INDEX
            };
            let pool_index = self.pool.get_or_put(PoolKey::TypeValue {
                ty: type_index,
                val: value_index,
            });
            sema.create_constant(inst, pool_index);
        } else if val_type == BOOL_KEY_INDEX {
            if type_index != BOOL_KEY_INDEX {
                self.err_fallback(sema, codes::MISMATCHED_TYPES, "Mismatched types");
                return;
            }
            let value_index = if val.to_constant() == koc_kir::Constant::BoolTrue {
                TRUE_VALUE_INDEX
            } else {
                FALSE_VALUE_INDEX
            };
            let pool_index = self.pool.get_or_put(PoolKey::TypeValue {
                ty: BOOL_KEY_INDEX,
                val: value_index,
            });
            sema.create_constant(inst, pool_index);
        } else {
            // null folds with whatever pointer-like type it is given.
            let pool_index = self.pool.get_or_put(PoolKey::TypeValue {
                ty: type_index,
                val: NULL_PTR_VALUE_INDEX,
            });
            sema.create_constant(inst, pool_index);
        }
    }

    //-- Arithmetic -----------------------------------------------------//

    fn kir_arithmetic(&mut self, sema: &mut Sema, inst: Index, op: Operation) {
        let data = self.kir_data(sema.mod_id, inst).as_node_pl();
        let bin: extra::Bin = self.modules[sema.mod_id as usize]
            .kir
            .read_extra(data.payload.index());

        let mut lhs = self.get_type_value(sema, bin.lhs);
        let mut rhs = self.get_type_value(sema, bin.rhs);

        if is_null(lhs.ty) || is_null(rhs.ty) {
            // One side already failed; nothing more to report here.
            return;
        }

        if !self.try_cast_same_type(sema, &mut lhs, &mut rhs) {
            self.err_at_kir_node(sema, codes::MISMATCHED_TYPES, "Mismatched types", data.node);
            return;
        }

        if matches!(op, Operation::Div | Operation::Mod) && sema.is_constant(rhs.inst) {
            let pool_index = sema.air.data(rhs.inst).as_pool_index();
            let tv = self.pool.type_value_of(pool_index);
            if tv.val == ZERO_VALUE_INDEX {
                self.err_at_kir_node(sema, codes::DIVISION_BY_ZERO, "Division by zero", data.node);
                return;
            }
        }

        // Integer constants fold; floats stay unevaluated.
        if sema.are_constants(lhs.inst, rhs.inst) && types::is_int_type(lhs.ty) {
            self.eval_op(sema, inst, data.node, lhs, rhs, op);
            return;
        }

        let tag = match op {
            Operation::Add => AirTag::Add,
            Operation::Sub => AirTag::Sub,
            Operation::Mul => AirTag::Mul,
            Operation::Div => AirTag::Div,
            Operation::Mod => AirTag::Mod,
            Operation::BitAnd => AirTag::BitAnd,
            Operation::BitOr => AirTag::BitOr,
            Operation::BitShl => AirTag::BitShl,
            Operation::BitShr => AirTag::BitShr,
            Operation::BitXor => AirTag::BitXor,
        };

        let air = sema.air.push(tag, AirData::bin_op(lhs.inst, rhs.inst));
        sema.map_inst(inst, air);
    }

    fn eval_op(
        &mut self,
        sema: &mut Sema,
        inst: Index,
        node: Index,
        lhs: TypeInst,
        rhs: TypeInst,
        op: Operation,
    ) {
        let lhs_tv = self
            .pool
            .type_value_of(sema.air.data(lhs.inst).as_pool_index());
        let rhs_tv = self
            .pool
            .type_value_of(sema.air.data(rhs.inst).as_pool_index());

        let a = self.pool.value_at(lhs_tv.val);
        let b = self.pool.value_at(rhs_tv.val);
        let signed = types::is_signed_int(lhs.ty);

        let result = match op {
            Operation::Add => {
                if signed {
                    value::add_signed(a, b)
                } else {
                    value::add_unsigned(a, b)
                }
            }
            Operation::Sub => {
                if signed {
                    value::sub_signed(a, b)
                } else {
                    value::sub_unsigned(a, b)
                }
            }
            Operation::Mul => {
                if signed {
                    value::mul_signed(a, b)
                } else {
                    value::mul_unsigned(a, b)
                }
            }
            Operation::Div => {
                if signed {
                    value::div_signed(a, b)
                } else {
                    value::div_unsigned(a, b)
                }
            }
            Operation::Mod => {
                if signed {
                    value::mod_signed(a, b)
                } else {
                    value::mod_unsigned(a, b)
                }
            }
            Operation::BitAnd => value::EvalResult::ok(a & b),
            Operation::BitOr => value::EvalResult::ok(a | b),
            Operation::BitXor => value::EvalResult::ok(a ^ b),
            Operation::BitShl => value::shl(a, b, types::is_signed_int(rhs.ty)),
            Operation::BitShr => value::shr(a, b),
        };

        if result.has_err() {
            let msg = match result.state {
                value::ResultState::Overflow => "Overflow during constant evaluation",
                value::ResultState::Underflow => "Underflow during constant evaluation",
                value::ResultState::ShiftNegative => "Cannot shift by a signed amount",
                value::ResultState::Ok => unreachable!(),
            };
            self.err_at_kir_node(sema, codes::CONST_EVAL_OVERFLOW, msg, node);
            return;
        }

        match value::can_fit_int(lhs.ty, result.val) {
            CanFit::Yes => {}
            CanFit::No => {
                self.err_at_kir_node(
                    sema,
                    codes::CANNOT_FIT_INT,
                    "Result does not fit into the operand type",
                    node,
                );
                return;
            }
            CanFit::Unimplemented => {
                self.err_at_kir_node(
                    sema,
                    codes::UNSUPPORTED_CONSTRUCT,
                    "Range checks for usize and isize are not implemented",
                    node,
                );
                return;
            }
        }

        // Zero and one reuse their reserved value slots.
        let result_index = match result.val {
            0 => ZERO_VALUE_INDEX,
            1 => ONE_VALUE_INDEX,
            other => self.pool.add_value(other),
        };

        let pool_index = self.pool.get_or_put(PoolKey::TypeValue {
            ty: lhs.ty,
            val: result_index,
        });
        sema.create_constant(inst, pool_index);
    }

    /// Unifies the operand types, widening the narrower integer side.
    /// A non-constant widened operand gets an explicit `Cast`.
    fn try_cast_same_type(&mut self, sema: &mut Sema, a: &mut TypeInst, b: &mut TypeInst) -> bool {
        if types::are_same(a.ty, b.ty) {
            return true;
        }

        if !types::is_int_type(a.ty) || !types::is_int_type(b.ty) {
            return false;
        }

        let castee = if types::can_cast_int(a.ty, b.ty) {
            a.ty = b.ty;
            a
        } else if types::can_cast_int(b.ty, a.ty) {
            b.ty = a.ty;
            b
        } else {
            // Incompatible widths, e.g. usize vs isize.
            return false;
        };

        if !sema.is_constant(castee.inst) {
            castee.inst = sema
                .air
                .push(AirTag::Cast, AirData::ty_op(castee.ty, castee.inst));
        }

        true
    }

    //-- Shared resolution ----------------------------------------------//

    /// Resolves a KIR ref into its type and AIR instruction, creating a
    /// constant instruction for predefined value refs.
    fn get_type_value(&mut self, sema: &mut Sema, r: Ref) -> TypeInst {
        if r.is_constant() {
            let tv = Pool::constant_type_value(r);
            if is_null(tv.ty) {
                self.err_fallback(sema, codes::EXPECTED_VALUE, "Expected a value, found a type");
                return TypeInst::NULL;
            }

            let pool_index = self.pool.get_or_put(PoolKey::TypeValue {
                ty: tv.ty,
                val: tv.val,
            });
            let inst = sema
                .air
                .push(AirTag::Constant, AirData::pool_index(pool_index));
            return TypeInst { ty: tv.ty, inst };
        }

        let inst = sema.local_air(r.index());
        if is_null(inst) {
            return TypeInst::NULL;
        }

        TypeInst {
            ty: self.air_type(sema, inst),
            inst,
        }
    }

    /// Pool type of an AIR instruction.
    fn air_type(&self, sema: &Sema, air_inst: Index) -> Index {
        match sema.air.tag(air_inst) {
            AirTag::Constant => self.pool.type_of(sema.air.data(air_inst).as_pool_index()),
            AirTag::Symbol => sema.air.data(air_inst).as_symbol().ty,
            AirTag::Load | AirTag::Cast => sema.air.data(air_inst).as_ty_op().ty,
            _ => self.air_type(sema, sema.air.data(air_inst).as_bin_op().lhs),
        }
    }

    /// Pool type of an already-analyzed KIR instruction.
    fn kir_type(&self, sema: &Sema, kir_inst: Index) -> Index {
        let air_inst = sema.local_air(kir_inst);
        if is_null(air_inst) {
            return NULL_INDEX;
        }
        self.air_type(sema, air_inst)
    }

    //-- KIR access -----------------------------------------------------//

    fn kir_tag(&self, mod_id: Index, inst: Index) -> InstTag {
        self.modules[mod_id as usize].kir.tag(inst)
    }

    fn kir_data(&self, mod_id: Index, inst: Index) -> koc_kir::InstData {
        self.modules[mod_id as usize].kir.data(inst)
    }

    fn kir_extra_at(&self, mod_id: Index, at: Index) -> Index {
        self.modules[mod_id as usize].kir.extra_at(at)
    }

    //-- Diagnostics ----------------------------------------------------//

    fn err_at_token(&mut self, mod_id: Index, code: DiagnosticCode, msg: &str, token: Index) {
        let module = &mut self.modules[mod_id as usize];
        let range = module.kir.token_span(token);
        module
            .file
            .add(Diagnostic::error(code, msg).with_label(Label::new("", range)));
    }

    fn err_at_kir_node(&mut self, sema: &Sema, code: DiagnosticCode, msg: &str, node: Index) {
        let module = &mut self.modules[sema.mod_id as usize];
        let range = module.kir.node_span(node);
        module
            .file
            .add(Diagnostic::error(code, msg).with_label(Label::new("", range)));
    }

    /// Errors on instructions with no source link of their own point at
    /// the declaration's value expression.
    fn err_fallback(&mut self, sema: &Sema, code: DiagnosticCode, msg: &str) {
        self.err_at_kir_node(sema, code, msg, sema.fallback_node);
    }
}
