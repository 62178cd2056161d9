//! Human-readable KIR dump.
//!
//! Instructions print as `%N = tag(...)`; predefined constants print as
//! `@name`. Block instructions print their trailing instructions
//! indented.

use std::fmt::Write;

use koc_util::Index;

use crate::extra::{self, ExtraData};
use crate::inst::InstTag;
use crate::ref_inst::Ref;
use crate::Kir;

/// Renders the whole module, starting from the top-level block.
pub fn print_kir(kir: &Kir) -> String {
    let mut printer = Printer {
        kir,
        out: String::new(),
        indent: 0,
    };

    for &import in &kir.imports {
        let _ = writeln!(printer.out, "import \"{}\"", kir.str(import));
    }

    if kir.len() > 1 {
        printer.write_inst(1);
    }

    printer.out
}

struct Printer<'a> {
    kir: &'a Kir,
    out: String,
    indent: usize,
}

impl Printer<'_> {
    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
    }

    fn write_ref(&mut self, r: Ref) {
        if r.is_null() {
            self.out.push_str("none");
        } else if r.is_constant() {
            let _ = write!(self.out, "@{}", r.to_constant().name());
        } else {
            let _ = write!(self.out, "%{}", r.index());
        }
    }

    fn write_str_id(&mut self, id: Index) {
        let _ = write!(self.out, "\"{}\"", self.kir.str(id));
    }

    /// A name slot in the extra vector holds either a string id or the
    /// bits of a constant ref (a primitive name).
    fn write_name(&mut self, bits: Index) {
        let r = Ref::from_bits(bits);
        if r.is_constant() {
            let _ = write!(self.out, "@{}", r.to_constant().name());
        } else {
            self.write_str_id(bits);
        }
    }

    fn write_block_body(&mut self, extra_index: Index) {
        let count = self.kir.extra_at(extra_index);
        self.out.push_str("({\n");
        self.indent += 1;
        for i in 0..count {
            let inst = self.kir.extra_at(extra_index + 1 + i);
            self.write_inst(inst);
        }
        self.indent -= 1;
        self.pad();
        self.out.push_str("})\n");
    }

    fn write_bin_extra(&mut self, name: &str, inst: Index, extra_at: Index) {
        let bin: extra::Bin = self.kir.read_extra(extra_at);
        self.pad();
        let _ = write!(self.out, "%{} = {}(", inst, name);
        self.write_ref(bin.lhs);
        self.out.push_str(", ");
        self.write_ref(bin.rhs);
        self.out.push_str(")\n");
    }

    fn write_unary(&mut self, name: &str, inst: Index) {
        let data = self.kir.data(inst).as_node_pl();
        self.pad();
        let _ = write!(self.out, "%{} = {}(", inst, name);
        self.write_ref(data.payload);
        self.out.push_str(")\n");
    }

    fn write_inst(&mut self, inst: Index) {
        use InstTag::*;

        let tag = self.kir.tag(inst);
        let data = self.kir.data(inst);

        match tag {
            None => {
                self.pad();
                let _ = writeln!(self.out, "%{} = none", inst);
            }
            Ident => {
                self.pad();
                let _ = write!(self.out, "%{} = ident(", inst);
                self.write_name(data.as_ref().bits());
                self.out.push_str(")\n");
            }
            Decl => {
                let bin = data.as_bin();
                let decl: extra::Decl = self.kir.read_extra(bin.lhs.index());
                self.pad();
                let _ = write!(self.out, "%{} = decl(", inst);
                self.write_name(decl.name);
                let _ = write!(self.out, ", vis={}, ", decl.vis);
                self.write_ref(bin.rhs);
                self.out.push_str(")\n");
                self.write_inst(bin.rhs.index());
            }
            DeclFn => {
                let bin = data.as_bin();
                let decl: extra::DeclFn = self.kir.read_extra(bin.lhs.index());
                self.pad();
                let _ = write!(self.out, "%{} = decl_fn(", inst);
                self.write_name(decl.decl_info.name);
                let _ = write!(
                    self.out,
                    ", vis={}, mods={}, ret=%{}, params=%{}, body=",
                    decl.decl_info.vis, decl.modifiers, decl.ret_type_inst, decl.params
                );
                self.write_ref(bin.rhs);
                self.out.push_str(")\n");
                self.write_inst(decl.ret_type_inst);
                self.write_inst(decl.params);
                if !bin.rhs.is_null() {
                    self.write_inst(bin.rhs.index());
                }
            }
            DeclEnum => {
                let bin = data.as_bin();
                let decl: extra::DeclEnum = self.kir.read_extra(bin.lhs.index());
                self.pad();
                let _ = write!(self.out, "%{} = decl_enum(", inst);
                self.write_name(decl.decl_info.name);
                self.out.push_str(", ty=");
                self.write_ref(decl.ty);
                self.out.push_str(")\n");
                self.write_inst(bin.rhs.index());
            }
            DeclStruct => {
                let bin = data.as_bin();
                let decl: extra::DeclStruct = self.kir.read_extra(bin.lhs.index());
                self.pad();
                let _ = write!(self.out, "%{} = decl_struct(", inst);
                self.write_name(decl.decl_info.name);
                self.out.push_str(")\n");
                self.write_inst(bin.rhs.index());
            }
            DeclVariant | DeclTrait | DeclImpl => {
                self.pad();
                let _ = writeln!(self.out, "%{} = {:?}", inst, tag);
            }
            StructField => {
                let pl = data.as_node_pl();
                let field: extra::DeclStructField = self.kir.read_extra(pl.payload.index());
                self.pad();
                let _ = write!(self.out, "%{} = struct_field(", inst);
                self.write_name(field.decl_info.name);
                self.out.push_str(", ty=");
                self.write_ref(field.ty);
                self.out.push_str(", default=");
                self.write_ref(field.default_value);
                self.out.push_str(")\n");
            }
            DeclRef => {
                let pl = data.as_tok_pl();
                self.pad();
                let _ = write!(self.out, "%{} = decl_ref(", inst);
                self.write_name(pl.payload.bits());
                self.out.push_str(")\n");
            }
            DeclItem => {
                let pl = data.as_tok_pl();
                let item: extra::DeclItem = self.kir.read_extra(pl.payload.index());
                self.pad();
                let _ = write!(self.out, "%{} = decl_item(", inst);
                self.write_name(item.name);
                let _ = write!(self.out, ", ns=%{})", item.namespace_inst);
                self.out.push('\n');
            }
            Param => {
                let pl = data.as_node_pl();
                let param: extra::Param = self.kir.read_extra(pl.payload.index());
                self.pad();
                let _ = write!(self.out, "%{} = param(", inst);
                self.write_name(param.name);
                self.out.push_str(", ");
                self.write_ref(param.ty);
                self.out.push_str(")\n");
            }
            EnumField => {
                let pl = data.as_node_pl();
                let field: extra::DeclEnumField = self.kir.read_extra(pl.payload.index());
                self.pad();
                let _ = write!(self.out, "%{} = enum_field(", inst);
                self.write_name(field.name);
                self.out.push_str(", ");
                self.write_ref(field.value);
                self.out.push_str(")\n");
            }
            Namespace => {
                let pl = data.as_node_pl();
                let at = pl.payload.index();
                let count = self.kir.extra_at(at);
                self.pad();
                let _ = write!(self.out, "%{} = namespace(", inst);
                for i in 0..count {
                    if i > 0 {
                        self.out.push_str("::");
                    }
                    let id = self.kir.extra_at(at + 1 + i);
                    let _ = write!(self.out, "{}", self.kir.str(id));
                }
                self.out.push_str(")\n");
            }
            Block | Loop | BlockInline | BlockComptimeInline => {
                let pl = data.as_node_pl();
                let name = match tag {
                    Block => "block",
                    Loop => "loop",
                    BlockInline => "block_inline",
                    _ => "block_comptime_inline",
                };
                self.pad();
                let _ = write!(self.out, "%{} = {}", inst, name);
                self.write_block_body(pl.payload.index());
            }
            BreakInline => {
                let bin = data.as_bin();
                self.pad();
                let _ = write!(self.out, "%{} = break_inline(", inst);
                self.write_ref(bin.lhs);
                self.out.push_str(", ");
                self.write_ref(bin.rhs);
                self.out.push_str(")\n");
            }
            Break => self.write_unary("break", inst),
            Return => self.write_unary("return", inst),
            Continue => self.write_unary("continue", inst),
            LogicAnd => {
                let pl = data.as_node_pl();
                self.write_bin_extra("logic_and", inst, pl.payload.index());
            }
            LogicOr => {
                let pl = data.as_node_pl();
                self.write_bin_extra("logic_or", inst, pl.payload.index());
            }
            Goto | Repeat => {
                self.pad();
                let name = if tag == Goto { "goto" } else { "repeat" };
                let _ = write!(self.out, "%{} = {}(", inst, name);
                self.write_ref(data.as_ref());
                self.out.push_str(")\n");
            }
            Alloc | AllocMut => {
                let pl = data.as_node_pl();
                self.pad();
                let name = if tag == Alloc { "alloc" } else { "alloc_mut" };
                let _ = write!(self.out, "%{} = {}(", inst, name);
                self.write_ref(pl.payload);
                self.out.push_str(")\n");
            }
            AllocInferred | AllocMutInferred => {
                self.pad();
                let name = if tag == AllocInferred {
                    "alloc_inferred"
                } else {
                    "alloc_mut_inferred"
                };
                let _ = writeln!(self.out, "%{} = {}()", inst, name);
            }
            Store | StoreInferred => {
                let bin = data.as_bin();
                self.pad();
                let name = if tag == Store { "store" } else { "store_inferred" };
                let _ = write!(self.out, "%{} = {}(", inst, name);
                self.write_ref(bin.lhs);
                self.out.push_str(", ");
                self.write_ref(bin.rhs);
                self.out.push_str(")\n");
            }
            StoreNode => {
                let pl = data.as_node_pl();
                self.write_bin_extra("store_node", inst, pl.payload.index());
            }
            Load | IndexableLen | DiscardDestructor => {
                self.pad();
                let name = match tag {
                    Load => "load",
                    IndexableLen => "indexable_len",
                    _ => "discard_destructor",
                };
                let _ = write!(self.out, "%{} = {}(", inst, name);
                self.write_ref(data.as_ref());
                self.out.push_str(")\n");
            }
            ArrInit | Tuple | TupleType | DynType => {
                let pl = data.as_node_pl();
                let at = pl.payload.index();
                let count = self.kir.extra_at(at);
                let name = match tag {
                    ArrInit => "arr_init",
                    Tuple => "tuple",
                    TupleType => "tuple_type",
                    _ => "dyn_type",
                };
                self.pad();
                let _ = write!(self.out, "%{} = {}(", inst, name);
                for i in 0..count {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.write_ref(Ref::from_bits(self.kir.extra_at(at + 1 + i)));
                }
                self.out.push_str(")\n");
            }
            ArrShortInit => {
                let pl = data.as_node_pl();
                let init: extra::ArrayShortInit = self.kir.read_extra(pl.payload.index());
                self.pad();
                let _ = write!(self.out, "%{} = arr_short_init(size=", inst);
                self.write_ref(init.size);
                self.out.push_str(", value=");
                self.write_ref(init.value);
                self.out.push_str(")\n");
            }
            Cast | As => {
                let bin = data.as_bin();
                self.pad();
                let name = if tag == Cast { "cast" } else { "as" };
                let _ = write!(self.out, "%{} = {}(", inst, name);
                self.write_ref(bin.lhs);
                self.out.push_str(", ");
                self.write_ref(bin.rhs);
                self.out.push_str(")\n");
            }
            Call => {
                let pl = data.as_node_pl();
                let at = pl.payload.index();
                let call: extra::Call = self.kir.read_extra(at);
                self.pad();
                let _ = write!(self.out, "%{} = call(", inst);
                self.write_ref(call.base);
                for i in 0..call.argc {
                    self.out.push_str(", ");
                    let arg = self.kir.extra_at(at + extra::Call::WORDS as Index + i);
                    self.write_ref(Ref::from_bits(arg));
                }
                self.out.push_str(")\n");
            }
            Condbr => {
                let bin = data.as_bin();
                let if_data: extra::IfData = self.kir.read_extra(bin.rhs.index());
                self.pad();
                let _ = write!(self.out, "%{} = condbr(", inst);
                self.write_ref(bin.lhs);
                let _ = write!(self.out, ", body_len={}, end=%{})", if_data.body_len, if_data.end);
                self.out.push('\n');
            }
            Int => {
                self.pad();
                let _ = writeln!(self.out, "%{} = int({})", inst, data.as_int());
            }
            Float => {
                self.pad();
                let _ = writeln!(self.out, "%{} = float({})", inst, data.as_float());
            }
            Str | Char => {
                let st = data.as_str_tok();
                self.pad();
                let name = if tag == Str { "str" } else { "char" };
                let _ = write!(self.out, "%{} = {}(", inst, name);
                self.write_str_id(st.string);
                self.out.push_str(")\n");
            }
            Add | Sub | Mul | Div | Mod | ArrEl | CmpLs | CmpGt | CmpLse | CmpGte | CmpEq
            | CmpNeq | BitAnd | BitOr | BitShl | BitShr | BitXor => {
                let pl = data.as_node_pl();
                let name = match tag {
                    Add => "add",
                    Sub => "sub",
                    Mul => "mul",
                    Div => "div",
                    Mod => "mod",
                    ArrEl => "arr_el",
                    CmpLs => "cmp_ls",
                    CmpGt => "cmp_gt",
                    CmpLse => "cmp_lse",
                    CmpGte => "cmp_gte",
                    CmpEq => "cmp_eq",
                    CmpNeq => "cmp_neq",
                    BitAnd => "bit_and",
                    BitOr => "bit_or",
                    BitShl => "bit_shl",
                    BitShr => "bit_shr",
                    _ => "bit_xor",
                };
                self.write_bin_extra(name, inst, pl.payload.index());
            }
            Field => {
                let pl = data.as_node_pl();
                let field: extra::FieldExpr = self.kir.read_extra(pl.payload.index());
                self.pad();
                let _ = write!(self.out, "%{} = field(", inst);
                self.write_ref(field.base);
                self.out.push_str(", ");
                self.write_ref(field.field);
                self.out.push_str(")\n");
            }
            FieldShort => {
                let bin = data.as_bin();
                self.pad();
                let _ = write!(self.out, "%{} = field_short(", inst);
                self.write_ref(bin.lhs);
                let _ = write!(self.out, ", {})", bin.rhs.bits());
                self.out.push('\n');
            }
            SliceFull => {
                let pl = data.as_node_pl();
                let slice: extra::Slice = self.kir.read_extra(pl.payload.index());
                self.pad();
                let _ = write!(self.out, "%{} = slice(", inst);
                self.write_ref(slice.base);
                self.out.push_str(", from=");
                self.write_ref(slice.from);
                self.out.push_str(", to=");
                self.write_ref(slice.to);
                self.out.push_str(")\n");
            }
            SliceStart => {
                let pl = data.as_node_pl();
                self.write_bin_extra("slice_start", inst, pl.payload.index());
            }
            SliceEnd => {
                let pl = data.as_node_pl();
                self.write_bin_extra("slice_end", inst, pl.payload.index());
            }
            StructInitEmpty => self.write_unary("struct_init_empty", inst),
            StructInit => {
                let pl = data.as_node_pl();
                let at = pl.payload.index();
                let path = self.kir.extra_at(at);
                let count = self.kir.extra_at(at + 1);
                self.pad();
                let _ = write!(self.out, "%{} = struct_init(", inst);
                self.write_ref(Ref::from_bits(path));
                for i in 0..count {
                    self.out.push_str(", ");
                    self.write_name(self.kir.extra_at(at + 2 + i * 2));
                    self.out.push('=');
                    self.write_ref(Ref::from_bits(self.kir.extra_at(at + 3 + i * 2)));
                }
                self.out.push_str(")\n");
            }
            BoolNeg => self.write_unary("bool_neg", inst),
            BitNeg => self.write_unary("bit_neg", inst),
            GetAddr => self.write_unary("get_addr", inst),
            Deref => self.write_unary("deref", inst),
            IntNeg => self.write_unary("int_neg", inst),
            Unwrap => self.write_unary("unwrap", inst),
            ArrayType => {
                let pl = data.as_node_pl();
                let arr: extra::ArrayType = self.kir.read_extra(pl.payload.index());
                self.pad();
                let _ = write!(self.out, "%{} = array_type(size=", inst);
                self.write_ref(arr.size);
                self.out.push_str(", ty=");
                self.write_ref(arr.ty);
                self.out.push_str(")\n");
            }
            PtrType => {
                let pl = data.as_node_pl();
                let ptr: extra::PtrType = self.kir.read_extra(pl.payload.index());
                self.pad();
                let _ = write!(self.out, "%{} = ptr_type(count={}, ty=", inst, ptr.count);
                self.write_ref(ptr.ty);
                self.out.push_str(")\n");
            }
            RefType => self.write_unary("ref_type", inst),
            SliceType => self.write_unary("slice_type", inst),
        }
    }
}
