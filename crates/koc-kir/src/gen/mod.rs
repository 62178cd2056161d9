//! AST to KIR lowering.
//!
//! Instructions are emitted in program order. Control-flow constructs
//! emit block instructions wrapping their body; a block's trailing
//! instruction indices are flushed from a scratch cache into the extra
//! vector when the block is committed.

mod exprs;
mod stmts;

use koc_par::{Ast, NodeTag};
use koc_util::diagnostic::{codes, Diagnostic, DiagnosticCode, Label};
use koc_util::{is_null, Index, SourceFile, NULL_INDEX};

use crate::extra::{self, ExtraData};
use crate::inst::{InstData, InstTag};
use crate::ref_inst::{Constant, Ref};
use crate::scope::{Scope, ScopeKind, SymbolMeta};
use crate::Kir;

/// Joins a `Path` node's identifiers into a filesystem-style import
/// path (`a::b::c` becomes `a/b/c`).
pub fn path_node_to_file_path(node: Index, tree: &Ast, src: &str) -> String {
    let path_node = tree.node(node);

    let mut path = tree.tokens.content(src, path_node.lhs).to_owned();
    let mut tok = path_node.lhs + 2;
    while tok <= path_node.rhs {
        path.push('/');
        path.push_str(tree.tokens.content(src, tok));
        tok += 2;
    }

    path
}

struct LabelEntry {
    inst: Index,
    name: Index,
}

/// A reserved instruction together with the cache length at reservation
/// time, used for blocks whose operands are only known after their body
/// is emitted.
#[derive(Clone, Copy)]
pub(crate) struct InstCache {
    pub inst: Index,
    pub cache: Index,
}

/// Lower a parsed file into `kir`, reporting problems into the file's
/// diagnostic sink.
pub fn generate(kir: &mut Kir, tree: &Ast, file: &mut SourceFile) {
    let content = std::mem::take(&mut file.content);
    {
        let mut gen = KirGen::new(kir, tree, &content, file);
        gen.run();
    }
    file.content = content;

    // Keep the source mapping alive past the AST for sema diagnostics.
    kir.node_tokens = tree.node_tokens.clone();
    kir.token_locs = tree.tokens.locs.clone();
}

pub struct KirGen<'a> {
    kir: &'a mut Kir,
    tree: &'a Ast,
    src: &'a str,
    file: &'a mut SourceFile,

    scopes: Vec<Scope>,
    symbol_meta: Vec<SymbolMeta>,
    labels: Vec<LabelEntry>,
    cache: Vec<Index>,

    /// The scope of the symbol the last `gen_path` resolved, consumed
    /// by discard handling.
    prev_symbol: Index,
    curr_scope: Index,
}

impl<'a> KirGen<'a> {
    const GLOBAL_SCOPE_INDEX: Index = 1;

    fn new(kir: &'a mut Kir, tree: &'a Ast, src: &'a str, file: &'a mut SourceFile) -> Self {
        kir.inst.reserve(tree.len());
        kir.tags.reserve(tree.len());
        kir.extra.reserve(tree.len());
        kir.imports.reserve(tree.imports.len());

        // Reserve the 0 index.
        kir.inst.push(InstData::default());
        kir.tags.push(InstTag::None);

        let mut gen = Self {
            kir,
            tree,
            src,
            file,
            scopes: Vec::new(),
            symbol_meta: Vec::new(),
            labels: Vec::new(),
            cache: Vec::new(),
            prev_symbol: NULL_INDEX,
            curr_scope: Self::GLOBAL_SCOPE_INDEX,
        };

        // Null scope, then the global scope.
        gen.scopes
            .push(Scope::new(ScopeKind::Top, NULL_INDEX, NULL_INDEX, NULL_INDEX));
        gen.scopes
            .push(Scope::new(ScopeKind::Top, NULL_INDEX, NULL_INDEX, NULL_INDEX));
        gen.create_symbol_meta(NULL_INDEX, NULL_INDEX);

        gen
    }

    fn run(&mut self) {
        self.collect_imports();

        let top_block = self.enter_block();

        for top_stmt in self.tree.top.clone() {
            match self.tree.tag(top_stmt) {
                NodeTag::Constant => self.gen_glob_const(top_stmt),
                NodeTag::Fn => self.gen_fn(top_stmt),
                NodeTag::Variant => self.gen_variant(top_stmt),
                NodeTag::Struct => self.gen_struct(top_stmt),
                NodeTag::Enum => self.gen_enum(top_stmt),
                NodeTag::Impl => self.gen_impl(top_stmt),
                NodeTag::Trait => self.gen_trait(top_stmt),
                _ => unreachable!("parser only produces declarations at the top level"),
            }
        }

        self.create_block(InstTag::Block, top_block, NULL_INDEX, Ref::NULL);
    }

    fn collect_imports(&mut self) {
        for import_node_index in self.tree.imports.clone() {
            let import_node = self.tree.node(import_node_index);

            // The first ImportPath node directly follows the import node.
            let mut index = import_node_index + 1;

            // With multiple paths, the base path node sits between the
            // first ImportPath and the rest.
            let mut base = String::new();
            if import_node.rhs != index + 1 {
                base = path_node_to_file_path(index + 1, self.tree, self.src);
                index += 2;
            }

            while index < import_node.rhs {
                let import_path = self.tree.node(index);
                let mut path = path_node_to_file_path(import_path.lhs, self.tree, self.src);

                if !base.is_empty() {
                    path = format!("{}/{}", base, path);
                }

                let id = self.kir.strings.get_or_intern(&path);
                self.kir.imports.push(id);

                if !is_null(import_path.rhs) {
                    // TODO: resolve import aliases once namespaces can
                    // carry renamed entries
                    self.err_at_node(
                        codes::UNSUPPORTED_CONSTRUCT,
                        "Import aliases are not supported yet",
                        index,
                    );
                }

                index += 2;
            }
        }
    }

    //-- Instructions ---------------------------------------------------//

    pub(crate) fn prepare_inst(&mut self) -> Index {
        let index = self.kir.inst.len() as Index;
        self.kir.inst.push(InstData::default());
        self.kir.tags.push(InstTag::None);
        index
    }

    pub(crate) fn prepare_inst_with_cache(&mut self) -> InstCache {
        let index = self.prepare_inst();
        self.add_to_cache(index);
        InstCache {
            inst: index,
            cache: self.cache.len() as Index,
        }
    }

    pub(crate) fn set_inst(&mut self, inst: Index, tag: InstTag, data: InstData) {
        self.kir.inst[inst as usize] = data;
        self.kir.tags[inst as usize] = tag;
    }

    /// Creates an instruction and records it in the scratch cache so the
    /// enclosing block picks it up.
    pub(crate) fn create_inst(&mut self, tag: InstTag, data: InstData) -> Index {
        let index = self.kir.inst.len() as Index;
        self.kir.inst.push(data);
        self.kir.tags.push(tag);
        self.add_to_cache(index);
        index
    }

    pub(crate) fn inst_count(&self) -> Index {
        self.kir.inst.len() as Index
    }

    //-- Extra ----------------------------------------------------------//

    pub(crate) fn create_extra_from<T: ExtraData>(&mut self, value: T) -> Index {
        let index = self.kir.extra.len() as Index;
        value.write(&mut self.kir.extra);
        index
    }

    pub(crate) fn extra_size(&self) -> Index {
        self.kir.extra.len() as Index
    }

    pub(crate) fn add_to_extra(&mut self, value: Index) {
        self.kir.extra.push(value);
    }

    pub(crate) fn reserve_extra(&mut self, size: Index) -> Index {
        let start = self.extra_size();
        self.kir.extra.resize((start + size) as usize, NULL_INDEX);
        start
    }

    pub(crate) fn set_extra(&mut self, index: Index, value: Index) {
        self.kir.extra[index as usize] = value;
    }

    pub(crate) fn add_to_cache(&mut self, value: Index) {
        self.cache.push(value);
    }

    fn create_extra_from_cache(&mut self, start: Index) -> Index {
        let index = self.kir.extra.len() as Index;
        self.kir.extra.extend_from_slice(&self.cache[start as usize..]);
        self.cache.truncate(start as usize);
        index
    }

    //-- Blocks ---------------------------------------------------------//

    /// Reserves a block instruction and a cache slot for its trailing
    /// instruction count.
    pub(crate) fn enter_block(&mut self) -> InstCache {
        let inst = self.prepare_inst();
        let cache = self.cache.len() as Index;

        // Placeholder for the instruction count.
        self.add_to_cache(0);

        InstCache { inst, cache }
    }

    /// Commits a block: fixes up the trailing count, optionally emits
    /// the `BreakInline` carrying the block's value, and flushes the
    /// cached instruction indices into the extra vector.
    pub(crate) fn create_block(&mut self, tag: InstTag, block: InstCache, node: Index, return_value: Ref) {
        let null_adjust = return_value.is_null() as Index;
        let inst_count = self.cache.len() as Index - block.cache - null_adjust;
        self.cache[block.cache as usize] = inst_count;

        if !return_value.is_null() {
            self.create_inst(
                InstTag::BreakInline,
                InstData::bin(Ref::from_inst(block.inst), return_value),
            );
        }

        let extra = self.create_extra_from_cache(block.cache);
        self.set_inst(block.inst, tag, InstData::node_pl(node, Ref::from_inst(extra)));
    }

    //-- Strings --------------------------------------------------------//

    /// Interns a string, or resolves it to the matching predefined
    /// constant when it names a primitive.
    pub(crate) fn get_or_create_str(&mut self, text: &str) -> Ref {
        match Constant::from_name(text) {
            Some(constant) => Ref::from_const(constant),
            None => Ref::from_inst(self.kir.strings.get_or_intern(text)),
        }
    }

    pub(crate) fn str_of_token(&mut self, token: Index) -> Ref {
        let text = self.tree.tokens.content(self.src, token);
        self.get_or_create_str(text)
    }

    /// Interns a string unconditionally, without the primitive-name
    /// collapse of [`KirGen::get_or_create_str`].
    pub(crate) fn kir_intern(&mut self, text: &str) -> Index {
        self.kir.strings.get_or_intern(text)
    }

    //-- Tree access ----------------------------------------------------//

    /// Source text of a token. The returned slice borrows the source,
    /// not the generator, so it stays usable across mutations.
    pub(crate) fn token_content(&self, token: Index) -> &'a str {
        self.tree.tokens.content(self.src, token)
    }

    pub(crate) fn kir_tag(&self, inst: Index) -> InstTag {
        self.kir.tags[inst as usize]
    }

    pub(crate) fn node(&self, node: Index) -> koc_par::Node {
        self.tree.node(node)
    }

    pub(crate) fn node_token(&self, node: Index) -> Index {
        self.tree.token_of(node)
    }

    pub(crate) fn node_meta(&self, meta_index: Index) -> Index {
        self.tree.meta_at(meta_index)
    }

    pub(crate) fn node_tag(&self, node: Index) -> NodeTag {
        self.tree.tag(node)
    }

    //-- Diagnostics ----------------------------------------------------//

    fn node_range(&self, node: Index) -> std::ops::Range<usize> {
        let token = self.tree.token_of(node);
        if is_null(token) {
            return 0..0;
        }
        self.tree.tokens.start(token)..self.tree.tokens.end(token)
    }

    pub(crate) fn err_at_node(&mut self, code: DiagnosticCode, msg: &str, node: Index) {
        let range = self.node_range(node);
        self.file
            .add(Diagnostic::error(code, msg).with_label(Label::new("", range)));
    }

    pub(crate) fn err_at_token(&mut self, code: DiagnosticCode, msg: &str, token: Index) {
        let range = self.tree.tokens.start(token)..self.tree.tokens.end(token);
        self.file
            .add(Diagnostic::error(code, msg).with_label(Label::new("", range)));
    }

    //-- Scopes and symbols ---------------------------------------------//

    pub(crate) fn create_symbol_meta(&mut self, inst: Index, flags: Index) -> Index {
        self.symbol_meta.push(SymbolMeta::new(inst, flags));
        (self.symbol_meta.len() - 1) as Index
    }

    pub(crate) fn create_or_get_scope_custom(
        &mut self,
        kind: ScopeKind,
        parent: Index,
        name: Index,
        meta: Index,
    ) -> Index {
        let new_scope = self.scopes.len() as Index;

        // Anonymous scopes are always fresh.
        if is_null(name) {
            self.scopes[parent as usize].add_child(new_scope);
            self.scopes.push(Scope::new(kind, name, meta, parent));
            return new_scope;
        }

        let existing = self.scopes[parent as usize].contains(name);
        if is_null(existing) {
            self.scopes[parent as usize].add_named_child(name, new_scope);
            self.scopes.push(Scope::new(kind, name, meta, parent));
            new_scope
        } else {
            existing
        }
    }

    pub(crate) fn create_or_get_scope(&mut self, kind: ScopeKind, name: Index, meta: Index) -> Index {
        self.create_or_get_scope_custom(kind, self.curr_scope, name, meta)
    }

    /// Resolves a name in the scope chain: the walk crosses `Block`
    /// scopes only and stops after the first `Top` or `Symbol` scope.
    pub(crate) fn get_symbol_in_scope(&mut self, name: Index, scope: Index) -> Index {
        let mut curr = scope;
        let mut symbol;

        loop {
            let scope_ref = &self.scopes[curr as usize];
            symbol = scope_ref.contains(name);
            curr = scope_ref.parent;
            if scope_ref.kind != ScopeKind::Block || !is_null(symbol) {
                break;
            }
        }

        self.prev_symbol = symbol;
        symbol
    }

    /// Binds `identifier` to `decl` in `scope`. Rebinding is an error
    /// unless the previous binding was explicitly discarded.
    pub(crate) fn create_symbol(&mut self, identifier: Ref, decl: Index, scope: Index, flags: Index, node: Index) {
        if identifier.is_constant() {
            self.err_at_node(codes::KEYWORD_AS_NAME, "Cannot use a keyword as a name", node);
            return;
        }

        let symbol = self.scopes[scope as usize].contains(identifier.index());
        if is_null(symbol) {
            let meta = self.create_symbol_meta(decl, flags);
            self.prev_symbol =
                self.create_or_get_scope_custom(ScopeKind::Symbol, scope, identifier.index(), meta);
            return;
        }

        let symbol_scope = &self.scopes[symbol as usize];
        if symbol_scope.kind != ScopeKind::Symbol {
            self.err_at_node(codes::DUPLICATE_SYMBOL, "Redeclaration of the symbol", node);
            return;
        }

        let meta_index = symbol_scope.meta;
        let meta = &mut self.symbol_meta[meta_index as usize];

        if !is_null(meta.inst) && !meta.is_discarded() {
            self.err_at_node(codes::DUPLICATE_SYMBOL, "Redeclaration of the symbol", node);
            return;
        }

        meta.inst = decl;
        meta.flags = flags;
        self.prev_symbol = symbol;
    }

    pub(crate) fn enter_scope(&mut self, kind: ScopeKind, name: Index, meta: Index) {
        if !is_null(name) && !is_null(self.scopes[self.curr_scope as usize].contains(name)) {
            // The name clash was already reported by create_symbol; the
            // body still gets its own anonymous scope.
            self.curr_scope = self.create_or_get_scope(kind, NULL_INDEX, meta);
        } else {
            self.curr_scope = self.create_or_get_scope(kind, name, meta);
        }
    }

    pub(crate) fn exit_scope(&mut self) {
        self.curr_scope = self.scopes[self.curr_scope as usize].parent;
    }

    pub(crate) fn set_current_scope_meta(&mut self, meta: Index) {
        self.scopes[self.curr_scope as usize].meta = meta;
    }

    pub(crate) fn symbol_meta_of_scope(&self, scope: Index) -> SymbolMeta {
        self.symbol_meta[self.scopes[scope as usize].meta as usize]
    }

    pub(crate) fn scope_contains(&self, scope: Index, name: Index) -> Index {
        self.scopes[scope as usize].contains(name)
    }

    pub(crate) fn reset_prev_symbol(&mut self) {
        self.prev_symbol = NULL_INDEX;
    }

    pub(crate) fn prev_symbol_scope(&self) -> Index {
        self.prev_symbol
    }

    pub(crate) fn mark_symbol_discarded(&mut self, symbol_scope: Index) {
        let meta = self.scopes[symbol_scope as usize].meta;
        self.symbol_meta[meta as usize].flags |= SymbolMeta::DISCARDED_FLAG;
    }

    //-- Labels ---------------------------------------------------------//

    pub(crate) fn add_label(&mut self, name: Index, inst: Index, node: Index) {
        let found = self.find_label(name);
        self.labels.push(LabelEntry { inst, name });

        if !is_null(found) {
            self.err_at_node(codes::DUPLICATE_LABEL, "Duplicate label", node);
        }
    }

    /// Unlabeled loops still participate in the stack so a bare
    /// `break`/`continue` can target the innermost one.
    pub(crate) fn add_anonymous_label(&mut self, inst: Index) {
        self.labels.push(LabelEntry {
            inst,
            name: NULL_INDEX,
        });
    }

    pub(crate) fn innermost_label(&self) -> Index {
        self.labels.last().map_or(NULL_INDEX, |label| label.inst)
    }

    pub(crate) fn pop_label(&mut self) {
        self.labels.pop();
    }

    pub(crate) fn find_label(&self, name: Index) -> Index {
        self.labels
            .iter()
            .rev()
            .find(|label| label.name == name)
            .map_or(NULL_INDEX, |label| label.inst)
    }

    //-- Top-level statements -------------------------------------------//

    /// ```text
    /// const A : u8 = 1;
    /// ---
    /// %4 = decl("A", %1 = comptime {
    ///     %2 = as(u8, one)
    ///     %3 = break_inline(%1, %2)
    /// })
    /// ```
    fn gen_glob_const(&mut self, node: Index) {
        let name_tok = self.node_token(node) + 1;
        let str_id = self.str_of_token(name_tok);
        let node_ref = self.node(node);

        let node_meta = node_ref.lhs;
        let type_node = self.node_meta(node_meta);
        let vis = self.node_meta(node_meta + 1);
        let doc_str = self.node_meta(node_meta + 2);

        let block = self.enter_block();

        let expr_inst = self.gen_expr(node_ref.rhs);
        let type_inst = self.gen_type(type_node);
        let value_inst = self.gen_as(expr_inst, type_inst);

        self.create_block(InstTag::BlockComptimeInline, block, node_ref.rhs, value_inst);

        let extra = self.create_extra_from(extra::Decl {
            vis,
            doc_str,
            name: str_id.bits(),
        });
        let decl = self.create_inst(
            InstTag::Decl,
            InstData::bin(Ref::from_inst(extra), Ref::from_inst(block.inst)),
        );

        let scope = self.curr_scope;
        self.create_symbol(str_id, decl, scope, SymbolMeta::CONST_FLAG, node);
    }

    fn gen_fn(&mut self, node: Index) {
        // The node is either a bare FnDef (trait member) or a full Fn.
        let mut fn_def_index = node;
        let mut fn_block_index = NULL_INDEX;

        if self.node_tag(node) == NodeTag::Fn {
            let fn_node = self.node(node);
            fn_def_index = fn_node.lhs;
            fn_block_index = fn_node.rhs;
        }

        let fn_def = self.node(fn_def_index);

        let return_type = self.node_meta(fn_def.lhs);
        let modifiers = self.node_meta(fn_def.lhs + 1);
        let vis = self.node_meta(fn_def.lhs + 2);
        let doc_tok = self.node_meta(fn_def.lhs + 3);
        let doc_str = self.str_of_token(doc_tok);

        let fn_id = self.str_of_token(self.node_token(fn_def_index) + 1);

        // Return type block.
        let return_type_block = self.enter_block();
        let mut return_type_inst = Ref::from_const(Constant::VoidType);

        if !is_null(return_type) {
            return_type_inst = self.gen_type(return_type);
        }

        self.create_block(InstTag::BlockInline, return_type_block, return_type, return_type_inst);

        self.enter_scope(ScopeKind::Symbol, fn_id.index(), NULL_INDEX);

        // Parameter block.
        let param_block = self.enter_block();
        let params_node = self.node(fn_def.rhs);
        let params_count = params_node.rhs;

        for i in 0..params_count {
            let param_index = self.node_meta(params_node.lhs + i);
            let param_node = self.node(param_index);
            let param_id = self.str_of_token(self.node_token(param_index));

            let param_type = self.gen_type(param_node.rhs);
            let param_flags = if is_null(param_node.lhs) {
                SymbolMeta::CONST_FLAG
            } else {
                NULL_INDEX
            };

            let extra = self.create_extra_from(extra::Param {
                name: param_id.bits(),
                ty: param_type,
            });
            let param_inst = self.create_inst(
                InstTag::Param,
                InstData::node_pl(param_index, Ref::from_inst(extra)),
            );

            let scope = self.curr_scope;
            self.create_symbol(param_id, param_inst, scope, param_flags, param_index);
        }

        self.create_block(InstTag::BlockInline, param_block, fn_def.rhs, Ref::NULL);

        // Body block.
        let mut block_inst = Ref::NULL;
        if !is_null(fn_block_index) {
            let body_block = self.enter_block();
            self.gen_raw_block(fn_block_index);
            self.create_block(InstTag::Block, body_block, fn_block_index, Ref::NULL);

            block_inst = Ref::from_inst(body_block.inst);
        }

        let extra = self.create_extra_from(extra::DeclFn {
            decl_info: extra::Decl {
                vis,
                doc_str: doc_str.bits(),
                name: fn_id.bits(),
            },
            ret_type_inst: return_type_block.inst,
            modifiers,
            params: param_block.inst,
        });

        let decl = self.create_inst(InstTag::DeclFn, InstData::bin(Ref::from_inst(extra), block_inst));

        let meta = self.create_symbol_meta(decl, SymbolMeta::CONST_FLAG);
        self.set_current_scope_meta(meta);
        self.exit_scope();
    }

    fn gen_enum(&mut self, node: Index) {
        let enum_node = self.node(node);
        let fields_count = enum_node.rhs;

        let type_node = self.node_meta(enum_node.lhs);
        let vis = self.node_meta(enum_node.lhs + 1);
        let doc_tok = self.node_meta(enum_node.lhs + 2);
        let doc_str = self.str_of_token(doc_tok);
        let fields_start = enum_node.lhs + 3;

        let enum_id = self.str_of_token(self.node_token(node) + 1);

        let enum_block = self.enter_block();
        self.enter_scope(ScopeKind::Symbol, enum_id.index(), NULL_INDEX);

        let ty = if is_null(type_node) {
            Ref::from_const(Constant::U8Type)
        } else {
            self.gen_type(type_node)
        };

        // A field without an explicit value continues from the previous
        // one; the first defaults to zero.
        let mut prev_value = Ref::NULL;
        for i in 0..fields_count {
            let field_index = self.node_meta(fields_start + i);
            let field_node = self.node(field_index);
            let field_id = self.str_of_token(field_node.lhs);

            if !is_null(field_node.rhs) {
                prev_value = self.gen_expr(field_node.rhs);
            } else if !prev_value.is_null() {
                let extra = self.create_extra_from(extra::Bin {
                    lhs: prev_value,
                    rhs: Ref::from_const(Constant::One),
                });
                prev_value = Ref::from_inst(self.create_inst(
                    InstTag::Add,
                    InstData::node_pl(field_index, Ref::from_inst(extra)),
                ));
            } else {
                prev_value = Ref::from_const(Constant::Zero);
            }

            let extra = self.create_extra_from(extra::DeclEnumField {
                value: prev_value,
                name: field_id.bits(),
            });
            let field = self.create_inst(
                InstTag::EnumField,
                InstData::node_pl(field_index, Ref::from_inst(extra)),
            );

            let scope = self.curr_scope;
            self.create_symbol(field_id, field, scope, SymbolMeta::CONST_FLAG, field_index);
        }

        self.create_block(InstTag::BlockComptimeInline, enum_block, node, Ref::NULL);

        let extra = self.create_extra_from(extra::DeclEnum {
            decl_info: extra::Decl {
                vis,
                doc_str: doc_str.bits(),
                name: enum_id.bits(),
            },
            ty,
        });
        let decl_enum = self.create_inst(
            InstTag::DeclEnum,
            InstData::bin(Ref::from_inst(extra), Ref::from_inst(enum_block.inst)),
        );

        let meta = self.create_symbol_meta(decl_enum, SymbolMeta::CONST_FLAG);
        self.set_current_scope_meta(meta);
        self.exit_scope();
    }

    fn gen_struct(&mut self, node: Index) {
        let struct_node = self.node(node);
        let node_meta = struct_node.lhs;
        let fields_count = struct_node.rhs;

        let vis = self.node_meta(node_meta);
        let doc_tok = self.node_meta(node_meta + 1);
        let doc_str = self.str_of_token(doc_tok);
        let fields_start = node_meta + 2;

        let struct_id = self.str_of_token(self.node_token(node) + 1);

        let struct_block = self.enter_block();
        self.enter_scope(ScopeKind::Symbol, struct_id.index(), NULL_INDEX);

        for i in 0..fields_count {
            let field_index = self.node_meta(fields_start + i);
            let field_node = self.node(field_index);
            let tag = self.node_tag(field_index);

            let field_id = self.str_of_token(self.node_token(field_index));

            let field_type_index = self.node_meta(field_node.lhs);
            let field_vis = self.node_meta(field_node.lhs + 1);
            let field_doc = self.node_meta(field_node.lhs + 2);
            let field_doc_str = self.str_of_token(field_doc);

            let field_type = self.gen_type(field_type_index);
            let field_val = if is_null(field_node.rhs) {
                Ref::NULL
            } else {
                self.gen_expr(field_node.rhs)
            };

            let extra = self.create_extra_from(extra::DeclStructField {
                decl_info: extra::Decl {
                    vis: field_vis,
                    doc_str: field_doc_str.bits(),
                    name: field_id.bits(),
                },
                ty: field_type,
                default_value: field_val,
            });
            let field_inst = self.create_inst(
                InstTag::StructField,
                InstData::node_pl(field_index, Ref::from_inst(extra)),
            );

            let flags = if tag == NodeTag::StructConst {
                SymbolMeta::CONST_FLAG
            } else {
                NULL_INDEX
            };
            let scope = self.curr_scope;
            self.create_symbol(field_id, field_inst, scope, flags, field_index);
        }

        self.create_block(InstTag::BlockComptimeInline, struct_block, node, Ref::NULL);

        let extra = self.create_extra_from(extra::DeclStruct {
            decl_info: extra::Decl {
                vis,
                doc_str: doc_str.bits(),
                name: struct_id.bits(),
            },
        });
        let decl_struct = self.create_inst(
            InstTag::DeclStruct,
            InstData::bin(Ref::from_inst(extra), Ref::from_inst(struct_block.inst)),
        );

        let meta = self.create_symbol_meta(decl_struct, SymbolMeta::CONST_FLAG);
        self.set_current_scope_meta(meta);
        self.exit_scope();
    }

    // Variant, trait, and impl lowering stop at the KIR surface.
    fn gen_variant(&mut self, _node: Index) {}
    fn gen_impl(&mut self, _node: Index) {}
    fn gen_trait(&mut self, _node: Index) {}

    //-- Types ----------------------------------------------------------//

    pub(crate) fn gen_type(&mut self, node: Index) -> Ref {
        let type_node = self.node(node);
        let type_tag = self.node_tag(type_node.rhs);

        let mut inst = match type_tag {
            // [type; size]
            NodeTag::TypeArr => {
                let arr_node = self.node(type_node.rhs);
                let arr_type = self.gen_type(arr_node.lhs);
                let arr_size = self.gen_expr(arr_node.rhs);

                let extra = self.create_extra_from(extra::ArrayType {
                    size: arr_size,
                    ty: arr_type,
                });
                Ref::from_inst(self.create_inst(
                    InstTag::ArrayType,
                    InstData::node_pl(type_node.rhs, Ref::from_inst(extra)),
                ))
            }
            // (type, type, ...)
            NodeTag::TypeTuple => {
                let tuple_node = self.node(type_node.rhs);
                let extra_start = self.reserve_extra(tuple_node.rhs + 1);
                self.set_extra(extra_start, tuple_node.rhs);

                for i in 0..tuple_node.rhs {
                    let element = self.node_meta(tuple_node.lhs + i);
                    let ty = self.gen_type(element);
                    self.set_extra(extra_start + i + 1, ty.bits());
                }

                Ref::from_inst(self.create_inst(
                    InstTag::TupleType,
                    InstData::node_pl(type_node.rhs, Ref::from_inst(extra_start)),
                ))
            }
            // dyn<trait + trait + ...>
            NodeTag::TypeDynamic => {
                let dyn_node = self.node(type_node.rhs);
                let extra_start = self.reserve_extra(dyn_node.rhs + 1);
                self.set_extra(extra_start, dyn_node.rhs);

                for i in 0..dyn_node.rhs {
                    let element = self.node_meta(dyn_node.lhs + i);
                    let path = self.gen_path(element);
                    self.set_extra(extra_start + i + 1, path.bits());
                }

                Ref::from_inst(self.create_inst(
                    InstTag::DynType,
                    InstData::node_pl(type_node.rhs, Ref::from_inst(extra_start)),
                ))
            }
            // fn(type, type, ...) -> type
            NodeTag::TypeFn => {
                // TODO: function types need a signature payload shared
                // with closures
                self.err_at_node(
                    codes::UNSUPPORTED_CONSTRUCT,
                    "Function types are not supported yet",
                    node,
                );
                Ref::NULL
            }
            // |[type]|
            NodeTag::TypeSlice => {
                let base = self.gen_type(type_node.rhs);
                Ref::from_inst(
                    self.create_inst(InstTag::SliceType, InstData::node_pl(type_node.rhs, base)),
                )
            }
            NodeTag::Path => self.gen_path(type_node.rhs),
            _ => unreachable!("parser emits only type bases under a Type node"),
        };

        let type_meta = type_node.lhs;
        let ptrs_count = type_meta & koc_par::node::TYPE_PTR_MASK;
        let modifiers = type_meta & !koc_par::node::TYPE_PTR_MASK;

        if modifiers & koc_par::node::TYPE_FLAG_REFERENCE != 0 {
            inst = Ref::from_inst(self.create_inst(InstTag::RefType, InstData::node_pl(node, inst)));
        }

        if ptrs_count > 0 {
            let extra = self.create_extra_from(extra::PtrType {
                count: ptrs_count,
                ty: inst,
            });
            inst = Ref::from_inst(self.create_inst(
                InstTag::PtrType,
                InstData::node_pl(node, Ref::from_inst(extra)),
            ));
        }

        inst
    }

    pub(crate) fn gen_as(&mut self, expression: Ref, ty: Ref) -> Ref {
        Ref::from_inst(self.create_inst(InstTag::As, InstData::bin(ty, expression)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::print_kir;

    fn lower(src: &str) -> (Kir, SourceFile) {
        let mut file = SourceFile::new("test.k", src);
        let ast = koc_par::parse(&mut file);
        assert_eq!(file.error_count(), 0, "parse errors in {:?}", src);

        let mut kir = Kir::new();
        generate(&mut kir, &ast, &mut file);
        (kir, file)
    }

    fn lower_clean(src: &str) -> Kir {
        let (kir, file) = lower(src);
        assert_eq!(file.error_count(), 0, "kir errors in {:?}", src);
        kir
    }

    #[test]
    fn test_glob_const_golden() {
        // const A : u8 = 1; lowers to a decl wrapping a comptime inline
        // block that coerces `one` to u8 and breaks with the result.
        let kir = lower_clean("const A : u8 = 1;");

        assert_eq!(
            kir.tags,
            vec![
                InstTag::None,
                InstTag::Block,
                InstTag::BlockComptimeInline,
                InstTag::As,
                InstTag::BreakInline,
                InstTag::Decl,
            ]
        );

        let as_bin = kir.data(3).as_bin();
        assert_eq!(as_bin.lhs, Ref::from_const(Constant::U8Type));
        assert_eq!(as_bin.rhs, Ref::from_const(Constant::One));

        let brk = kir.data(4).as_bin();
        assert_eq!(brk.lhs.index(), 2);
        assert_eq!(brk.rhs.index(), 3);

        let decl = kir.data(5).as_bin();
        assert_eq!(decl.rhs.index(), 2);

        // The top block lists exactly the decl.
        let top = kir.data(1).as_node_pl();
        assert_eq!(kir.extra_at(top.payload.index()), 1);
        assert_eq!(kir.extra_at(top.payload.index() + 1), 5);
    }

    #[test]
    fn test_pattern_allocs() {
        let kir = lower_clean("fn x() { var x : i32 = 5; var y = 8; }");

        assert!(kir.tags.contains(&InstTag::Alloc));
        assert!(kir.tags.contains(&InstTag::Store));
        assert!(kir.tags.contains(&InstTag::AllocInferred));
        assert!(kir.tags.contains(&InstTag::StoreInferred));
    }

    #[test]
    fn test_struct_pattern_bindings() {
        let kir = lower_clean(
            "fn x() { var (a, b) = (5, 6); var A{ field_x -> c, field_y -> d } = something; }",
        );

        let field_shorts = kir.tags.iter().filter(|t| **t == InstTag::FieldShort).count();
        // Two tuple elements plus two struct fields.
        assert_eq!(field_shorts, 4);
        let allocs = kir
            .tags
            .iter()
            .filter(|t| matches!(t, InstTag::AllocInferred | InstTag::AllocMutInferred))
            .count();
        assert_eq!(allocs, 4);
    }

    #[test]
    fn test_enum_value_fallthrough() {
        let kir = lower_clean("enum E { A, B = 5, C }");

        let fields: Vec<extra::DeclEnumField> = kir
            .tags
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == InstTag::EnumField)
            .map(|(i, _)| {
                let pl = kir.data(i as Index).as_node_pl();
                kir.read_extra(pl.payload.index())
            })
            .collect();

        assert_eq!(fields.len(), 3);
        // A defaults to zero, B is the literal 5, C is B + 1.
        assert_eq!(fields[0].value, Ref::from_const(Constant::Zero));
        assert_eq!(kir.tag(fields[1].value.index()), InstTag::Int);
        assert_eq!(kir.tag(fields[2].value.index()), InstTag::Add);
    }

    #[test]
    fn test_imports_collected() {
        let kir = lower_clean("import a::b;\nimport a::{c, d::e};\nconst A : u8 = 1;");

        let paths: Vec<&str> = kir.imports.iter().map(|id| kir.str(*id)).collect();
        assert_eq!(paths, vec!["a/b", "a/c", "a/d/e"]);
    }

    #[test]
    fn test_duplicate_label_reported() {
        let (_, file) = lower(
            "fn f() { while 1 : outer { while 1 : outer { continue outer; } } }",
        );
        assert!(file
            .errors()
            .iter()
            .any(|d| d.message == "Duplicate label"));
    }

    #[test]
    fn test_unknown_label_reported() {
        let (_, file) = lower("fn f() { break missing; }");
        assert!(file.errors().iter().any(|d| d.message == "Label not found"));
    }

    #[test]
    fn test_unlabeled_break_targets_innermost_loop() {
        let kir = lower_clean("fn f() { while 1 { break; } }");
        let brk = kir
            .tags
            .iter()
            .position(|t| *t == InstTag::Break)
            .expect("break lowered") as Index;
        let target = kir.data(brk).as_node_pl().payload.index();
        assert_eq!(kir.tag(target), InstTag::Loop);
    }

    #[test]
    fn test_duplicate_symbol_reported() {
        let (_, file) = lower("fn f() { var x = 1; var x = 2; }");
        assert!(file
            .errors()
            .iter()
            .any(|d| d.message == "Redeclaration of the symbol"));
    }

    #[test]
    fn test_nested_blocks_allow_shadowing() {
        // The inner block is its own scope, so the rebinding is not a
        // redeclaration, and the load inside resolves to the innermost
        // binding.
        let kir = lower_clean("fn f() { var x = 5; if (x) { var x = 8; var y = x; } }");

        let allocs = kir
            .tags
            .iter()
            .filter(|t| **t == InstTag::AllocInferred)
            .count();
        assert_eq!(allocs, 3);

        // The last load (for y) reads the inner x, not the outer one.
        let loads: Vec<Index> = kir
            .tags
            .iter()
            .enumerate()
            .filter(|(_, t)| **t == InstTag::Load)
            .map(|(i, _)| kir.data(i as Index).as_ref().index())
            .collect();
        assert_eq!(loads.len(), 2);
        assert!(loads[1] > loads[0], "inner load targets the inner alloc");
    }

    #[test]
    fn test_discard_allows_rebinding() {
        let kir = lower_clean("fn f() { var x = 1; _ = x; var x = 2; }");
        assert!(kir.tags.contains(&InstTag::DiscardDestructor));
    }

    #[test]
    fn test_keyword_as_name_reported() {
        let (_, file) = lower("const u8 : u8 = 1;");
        assert!(file
            .errors()
            .iter()
            .any(|d| d.message == "Cannot use a keyword as a name"));
    }

    #[test]
    fn test_logic_ops_short_circuit_blocks() {
        let kir = lower_clean("fn f() { var x = a && b || c; }");
        assert!(kir.tags.contains(&InstTag::LogicAnd));
        assert!(kir.tags.contains(&InstTag::LogicOr));
        // Each logic op wraps its rhs in an inline block.
        let inline_blocks = kir
            .tags
            .iter()
            .filter(|t| **t == InstTag::BlockInline)
            .count();
        assert!(inline_blocks >= 2);
    }

    #[test]
    fn test_for_desugars_to_counter_loop() {
        let kir = lower_clean("fn f() { for x in items { } }");

        for tag in [
            InstTag::IndexableLen,
            InstTag::AllocMut,
            InstTag::Loop,
            InstTag::CmpLs,
            InstTag::Condbr,
            InstTag::ArrEl,
            InstTag::Add,
            InstTag::Repeat,
        ] {
            assert!(kir.tags.contains(&tag), "missing {:?}", tag);
        }
    }

    #[test]
    fn test_printer_golden() {
        let kir = lower_clean("const A : u8 = 1;");
        let dump = print_kir(&kir);

        assert!(dump.contains("block_comptime_inline"), "{}", dump);
        assert!(dump.contains("as(@u8, @one)"), "{}", dump);
        assert!(dump.contains("break_inline(%2, %3)"), "{}", dump);
        assert!(dump.contains("decl(\"A\""), "{}", dump);
    }
}
