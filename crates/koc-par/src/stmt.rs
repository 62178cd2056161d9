//! Statement parsing.

use koc_lex::TokenTag;
use koc_util::{is_null, Index, NULL_INDEX};

use crate::node::{NodeTag, Vis, FLOW_BREAK, FLOW_CONTINUE, FLOW_RETURN, FN_MOD_CONST, FN_MOD_NONE};
use crate::Parser;

impl Parser<'_> {
    /// `{ statement* }`
    pub(crate) fn block_stmt(&mut self) -> Index {
        let start = self.ast.tokens.eat(TokenTag::CurlyL);
        if is_null(start) {
            self.err_unexpected("Expected `{`");
            return NULL_INDEX;
        }

        let node = self.reserve_node(NodeTag::Block, start);
        let cache_index = self.cache_len();
        let mut size = 0;

        while !self.ast.tokens.expect(TokenTag::CurlyR) {
            self.doc_tok = self.ast.tokens.eat_doc_comments();

            let item = match self.ast.tokens.current() {
                // _ = expression
                TokenTag::Underscore => {
                    let tok = self.ast.tokens.eat_any();
                    let item = self.reserve_node(NodeTag::Discard, tok);

                    if !self.ast.tokens.expect(TokenTag::Eq) {
                        self.err_unexpected("Expected `=`");
                        return NULL_INDEX;
                    }

                    let expr = self.expr();
                    if is_null(expr) {
                        return NULL_INDEX;
                    }

                    self.insert_data(item, expr);
                    self.expect_semicolon();
                    item
                }
                TokenTag::KVar => self.var_stmt(),
                TokenTag::KConst => self.constant_stmt(),
                TokenTag::KBreak => {
                    let tok = self.ast.tokens.eat_any();
                    let label = self.ast.tokens.eat(TokenTag::Ident);
                    let item = self.create_node(NodeTag::FlowOp, FLOW_BREAK, label, tok);
                    self.expect_semicolon();
                    item
                }
                TokenTag::KContinue => {
                    let tok = self.ast.tokens.eat_any();
                    let label = self.ast.tokens.eat(TokenTag::Ident);
                    let item = self.create_node(NodeTag::FlowOp, FLOW_CONTINUE, label, tok);
                    self.expect_semicolon();
                    item
                }
                TokenTag::KReturn => {
                    let tok = self.ast.tokens.eat_any();
                    let item = self.reserve_node(NodeTag::FlowOp, tok);

                    if self.ast.tokens.expect(TokenTag::Semi) {
                        self.set_node(item, FLOW_RETURN, NULL_INDEX);
                    } else {
                        let expr = self.expr();
                        if is_null(expr) {
                            return NULL_INDEX;
                        }
                        self.set_node(item, FLOW_RETURN, expr);
                        self.expect_semicolon();
                    }
                    item
                }
                TokenTag::KIf => self.if_stmt(),
                TokenTag::KFor => self.for_stmt(),
                TokenTag::KWhile => self.while_stmt(),
                TokenTag::KStatic => self.static_stmt(),
                _ => self.expr_stmt(),
            };

            if is_null(item) {
                return NULL_INDEX;
            }
            self.add_to_cache(item);
            size += 1;
        }

        let meta = self.create_meta_from_cache(cache_index);
        self.set_node(node, meta, size);
        node
    }

    /// ```text
    /// import ident (:: ident)* (= ident)? ;
    /// import ident (:: ident)* :: { path (= ident)? (, path (= ident)?)* } ;
    /// ```
    pub(crate) fn import_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::Import, tok);
        self.ast.imports.push(node);

        if self.vis != Vis::Local as Index {
            let vis = self.vis;
            self.insert_meta(node, &[vis]);
        }

        let path_start = self.ast.tokens.eat(TokenTag::Ident);
        if is_null(path_start) {
            self.err_unexpected("Expected identifier");
            return NULL_INDEX;
        }

        let mut import_multiple_start = NULL_INDEX;
        // base path
        while self.ast.tokens.expect(TokenTag::Colon2) {
            if !self.ast.tokens.expect(TokenTag::Ident) {
                import_multiple_start = self.ast.tokens.eat(TokenTag::CurlyL);
                if is_null(import_multiple_start) {
                    self.err_unexpected("Expected `{`");
                    return NULL_INDEX;
                }
                break;
            }
        }

        let path_end = self.ast.tokens.current_index() - 1;
        let mut alias_tok = NULL_INDEX;

        let import_path = self.reserve_node(NodeTag::ImportPath, path_start);

        // single import?
        if is_null(import_multiple_start) {
            // = ident
            if self.ast.tokens.expect(TokenTag::Eq) {
                alias_tok = self.ast.tokens.eat(TokenTag::Ident);
                if is_null(alias_tok) {
                    self.err_unexpected("Expected identifier");
                    return NULL_INDEX;
                }
            }

            let path = self.create_node(NodeTag::Path, path_start, path_end, path_start);
            self.set_node(import_path, path, alias_tok);
            let last = (self.ast.nodes.len() - 1) as Index;
            self.insert_data(node, last);

            self.expect_semicolon();
            return node;
        }

        let base_path = self.create_node(NodeTag::Path, path_start, path_end - 2, path_start);
        self.set_node(import_path, base_path, alias_tok);

        while !self.ast.tokens.expect(TokenTag::CurlyR) {
            alias_tok = NULL_INDEX;
            let import_path = self.reserve_node(NodeTag::ImportPath, self.ast.tokens.current_index());

            if !self.ast.tokens.peek(TokenTag::Ident, 0) {
                self.err_unexpected("Expected identifier");
                return NULL_INDEX;
            }
            let path = self.path_expr();

            // = alias
            if self.ast.tokens.expect(TokenTag::Eq) {
                alias_tok = self.ast.tokens.eat(TokenTag::Ident);
                if is_null(alias_tok) {
                    self.err_unexpected("Expected identifier");
                    return NULL_INDEX;
                }
            }

            self.set_node(import_path, path, alias_tok);

            if !self.ast.tokens.expect(TokenTag::Comma) && self.ast.tokens.peek(TokenTag::Ident, 0) {
                self.err_unexpected("Expected `,`");
            }
        }

        let last = (self.ast.nodes.len() - 1) as Index;
        self.insert_data(node, last);
        self.expect_semicolon();
        node
    }

    /// `const ident : type = expr ;`
    pub(crate) fn constant_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::Constant, tok);

        if !self.ast.tokens.expect(TokenTag::Ident) {
            self.err_unexpected("Expected constant name");
            return NULL_INDEX;
        }
        if !self.ast.tokens.expect(TokenTag::Colon) {
            self.err_unexpected("Expected `:`");
            return NULL_INDEX;
        }

        let ty = self.parse_type();
        if is_null(ty) {
            return NULL_INDEX;
        }

        if !self.ast.tokens.expect(TokenTag::Eq) {
            self.err_unexpected("Expected `=`");
            return NULL_INDEX;
        }

        let expr = self.expr();
        if is_null(expr) {
            return NULL_INDEX;
        }

        self.expect_semicolon();

        self.insert_data(node, expr);
        let (vis, doc) = (self.vis, self.doc_tok);
        self.insert_meta(node, &[ty, vis, doc]);
        node
    }

    /// `static ident (: type)? = expr ;`
    pub(crate) fn static_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::Static, tok);

        if !self.ast.tokens.expect(TokenTag::Ident) {
            self.err_unexpected("Expected identifier");
            return NULL_INDEX;
        }

        let mut ty = NULL_INDEX;
        if self.ast.tokens.expect(TokenTag::Colon) {
            ty = self.parse_type();
            if is_null(ty) {
                return NULL_INDEX;
            }
        }

        if !self.ast.tokens.expect(TokenTag::Eq) {
            self.err_unexpected("Expected `=`");
            return NULL_INDEX;
        }

        let expr = self.expr();
        if is_null(expr) {
            return NULL_INDEX;
        }

        self.expect_semicolon();

        self.insert_data(node, expr);
        let (vis, doc) = (self.vis, self.doc_tok);
        self.insert_meta(node, &[ty, vis, doc]);
        node
    }

    /// `var pattern = expr ;`
    pub(crate) fn var_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::Variable, tok);

        let pattern = self.parse_pattern();
        if is_null(pattern) {
            return NULL_INDEX;
        }

        self.insert_meta(node, &[pattern]);

        if !self.ast.tokens.expect(TokenTag::Eq) {
            self.err_unexpected("Expected '='");
            return NULL_INDEX;
        }

        let expr = self.expr();
        if is_null(expr) {
            return NULL_INDEX;
        }

        self.insert_data(node, expr);
        self.expect_semicolon();
        node
    }

    /// `fnDef { statement* }`
    pub(crate) fn fn_stmt(&mut self) -> Index {
        let node = self.reserve_node(NodeTag::Fn, NULL_INDEX);

        let fn_def = self.fn_def();
        if is_null(fn_def) {
            return NULL_INDEX;
        }

        let body = self.block_stmt();
        if is_null(body) {
            return NULL_INDEX;
        }

        self.set_node(node, fn_def, body);
        node
    }

    /// `fn ident params const? (: type)?`
    pub(crate) fn fn_def(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::FnDef, tok);
        let mut mods = FN_MOD_NONE;
        let mut return_type = NULL_INDEX;

        if !self.ast.tokens.expect(TokenTag::Ident) {
            self.err_unexpected("Expected name of function");
            return NULL_INDEX;
        }

        if !self.ast.tokens.peek(TokenTag::ParenL, 0) {
            self.err_unexpected("Expected `(`");
            return NULL_INDEX;
        }

        let params = self.params();
        if is_null(params) {
            return NULL_INDEX;
        }
        self.insert_data(node, params);

        // const?
        if self.ast.tokens.expect(TokenTag::KConst) {
            mods |= FN_MOD_CONST;
        }

        // (: type)?
        if self.ast.tokens.expect(TokenTag::Colon) {
            return_type = self.parse_type();
            if is_null(return_type) {
                return NULL_INDEX;
            }
        }

        let (vis, doc) = (self.vis, self.doc_tok);
        self.insert_meta(node, &[return_type, mods, vis, doc]);
        node
    }

    /// `( (mut? ident : type) (, mut? ident : type)* )`
    pub(crate) fn params(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let params = self.reserve_node(NodeTag::FnParams, tok);
        let cache_index = self.cache_len();
        let mut size = 0;

        if !self.ast.tokens.expect(TokenTag::ParenR) {
            loop {
                let is_mut = self.ast.tokens.expect(TokenTag::KMut);
                let ident = self.ast.tokens.eat(TokenTag::Ident);
                if is_null(ident) {
                    self.err_unexpected("Expected name of parameter");
                    return NULL_INDEX;
                }
                let param = self.reserve_node(NodeTag::FnParam, ident);

                if !self.ast.tokens.expect(TokenTag::Colon) {
                    self.err_unexpected("Expected `:`");
                    return NULL_INDEX;
                }

                let ty = self.parse_type();
                if is_null(ty) {
                    return NULL_INDEX;
                }

                self.set_node(param, is_mut as Index, ty);
                size += 1;
                self.add_to_cache(param);

                if !self.ast.tokens.expect(TokenTag::Comma) {
                    break;
                }
            }

            if !self.ast.tokens.expect(TokenTag::ParenR) {
                self.err_unexpected("Expected `)`");
                return NULL_INDEX;
            }
        }

        let meta = self.create_meta_from_cache(cache_index);
        self.set_node(params, meta, size);
        params
    }

    /// `variant ident { type (, type)* }`
    pub(crate) fn variant_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::Variant, tok);

        if !self.ast.tokens.expect(TokenTag::Ident) {
            self.err_unexpected("Expected name of variant");
            return NULL_INDEX;
        }
        if !self.ast.tokens.expect(TokenTag::CurlyL) {
            self.err_unexpected("Expected `{`");
            return NULL_INDEX;
        }

        let cache_index = self.cache_len();
        let (vis, doc) = (self.vis, self.doc_tok);
        self.add_to_cache(vis);
        self.add_to_cache(doc);

        let mut size = 0;
        loop {
            if self.ast.tokens.peek(TokenTag::CurlyR, 0) {
                break;
            }

            let field = self.parse_type();
            if is_null(field) {
                return NULL_INDEX;
            }
            size += 1;
            self.add_to_cache(field);

            if !self.ast.tokens.expect(TokenTag::Comma) {
                break;
            }
        }

        if !self.ast.tokens.expect(TokenTag::CurlyR) {
            self.err_unexpected("Expected `}`");
            return NULL_INDEX;
        }

        let meta = self.create_meta_from_cache(cache_index);
        self.set_node(node, meta, size);
        node
    }

    /// `enum ident (< type >)? { ident (= expr)? (, ident (= expr)?)* }`
    pub(crate) fn enum_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::Enum, tok);

        if !self.ast.tokens.expect(TokenTag::Ident) {
            self.err_unexpected("Expected name of the enum");
            return NULL_INDEX;
        }

        let mut ty = NULL_INDEX;
        // (< type >)?
        if self.ast.tokens.expect(TokenTag::Ls) {
            ty = self.parse_type();
            if is_null(ty) {
                return NULL_INDEX;
            }
            if !self.ast.tokens.expect(TokenTag::Gt) {
                self.err_unexpected("Expected `>`");
                return NULL_INDEX;
            }
        }

        if !self.ast.tokens.expect(TokenTag::CurlyL) {
            self.err_unexpected("Expected `{`");
            return NULL_INDEX;
        }

        let cache_index = self.cache_len();
        let (vis, doc) = (self.vis, self.doc_tok);
        self.add_to_cache(ty);
        self.add_to_cache(vis);
        self.add_to_cache(doc);

        let mut fields_count = 0;
        loop {
            let ident = self.ast.tokens.eat(TokenTag::Ident);
            if is_null(ident) {
                break;
            }

            let field = self.reserve_node(NodeTag::EnumField, ident);

            let mut expr = NULL_INDEX;
            // (= expr)?
            if self.ast.tokens.expect(TokenTag::Eq) {
                expr = self.expr();
                if is_null(expr) {
                    return NULL_INDEX;
                }
            }

            self.set_node(field, ident, expr);
            fields_count += 1;
            self.add_to_cache(field);

            if !self.ast.tokens.expect(TokenTag::Comma) {
                break;
            }
        }

        if !self.ast.tokens.expect(TokenTag::CurlyR) {
            self.err_unexpected("Expected `}`");
            return NULL_INDEX;
        }

        let meta = self.create_meta_from_cache(cache_index);
        self.set_node(node, meta, fields_count);
        node
    }

    /// ```text
    /// struct ident { (structItem ;)+ }
    ///
    /// structItem:
    ///     pub? const ident : type = expr
    ///     pub? ident : type (= expr)?
    /// ```
    pub(crate) fn struct_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::Struct, tok);

        let ident = self.ast.tokens.eat(TokenTag::Ident);
        if is_null(ident) {
            self.err_unexpected("Expected name of a struct");
            return NULL_INDEX;
        }

        if !self.ast.tokens.expect(TokenTag::CurlyL) {
            self.err_unexpected("Expected `{`");
            return NULL_INDEX;
        }

        let cache_index = self.cache_len();
        let (vis, doc) = (self.vis, self.doc_tok);
        self.add_to_cache(vis);
        self.add_to_cache(doc);

        let mut fields_count = 0;
        loop {
            self.doc_tok = self.ast.tokens.eat_doc_comments();
            self.vis = self.eat_vis();

            let field = if self.ast.tokens.expect(TokenTag::KConst) {
                let field_ident = self.ast.tokens.eat(TokenTag::Ident);
                let field = self.reserve_node(NodeTag::StructConst, field_ident);

                if is_null(field_ident) {
                    self.err_unexpected("Expected name of a constant");
                    return NULL_INDEX;
                }
                if !self.ast.tokens.expect(TokenTag::Colon) {
                    self.err_unexpected("Expected `:`");
                    return NULL_INDEX;
                }

                let ty = self.parse_type();
                if is_null(ty) {
                    return NULL_INDEX;
                }

                if !self.ast.tokens.expect(TokenTag::Eq) {
                    self.err_unexpected("Expected `=`");
                    return NULL_INDEX;
                }

                let expr = self.expr();
                if is_null(expr) {
                    return NULL_INDEX;
                }

                self.insert_data(field, expr);
                let (vis, doc) = (self.vis, self.doc_tok);
                self.insert_meta(field, &[ty, vis, doc]);
                field
            } else if self.ast.tokens.peek(TokenTag::Ident, 0) {
                let field_tok = self.ast.tokens.eat_any();
                let field = self.reserve_node(NodeTag::StructField, field_tok);

                if !self.ast.tokens.expect(TokenTag::Colon) {
                    self.err_unexpected("Expected `:`");
                    return NULL_INDEX;
                }

                let ty = self.parse_type();
                if is_null(ty) {
                    return NULL_INDEX;
                }

                let mut expr = NULL_INDEX;
                // (= expr)?
                if self.ast.tokens.expect(TokenTag::Eq) {
                    expr = self.expr();
                    if is_null(expr) {
                        return NULL_INDEX;
                    }
                }

                self.insert_data(field, expr);
                let (vis, doc) = (self.vis, self.doc_tok);
                self.insert_meta(field, &[ty, vis, doc]);
                field
            } else {
                self.err_unexpected("Expected `const` or identifier");
                return NULL_INDEX;
            };

            self.add_to_cache(field);
            fields_count += 1;
            self.expect_semicolon();

            if self.ast.tokens.expect(TokenTag::CurlyR) {
                break;
            }
        }

        let meta = self.create_meta_from_cache(cache_index);
        self.set_node(node, meta, fields_count);
        node
    }

    /// `if ( expr ) blockStmt (else (ifStmt | blockStmt))?`
    pub(crate) fn if_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::IfStmt, tok);

        if !self.ast.tokens.expect(TokenTag::ParenL) {
            self.err_unexpected("Expected `(`");
            return NULL_INDEX;
        }

        let cond = self.expr();
        if is_null(cond) {
            return NULL_INDEX;
        }

        if !self.ast.tokens.expect(TokenTag::ParenR) {
            self.err_unexpected("Expected `)`");
            return NULL_INDEX;
        }

        let block = self.block_stmt();
        if is_null(block) {
            return NULL_INDEX;
        }

        let mut next = NULL_INDEX;
        if self.ast.tokens.expect(TokenTag::KElse) {
            next = if self.ast.tokens.peek(TokenTag::KIf, 0) {
                self.if_stmt()
            } else {
                self.block_stmt()
            };
            if is_null(next) {
                return NULL_INDEX;
            }
        }

        self.insert_data(node, block);
        self.insert_meta(node, &[cond, next]);
        node
    }

    /// `trait ident { (fnDef ;)+ }`
    pub(crate) fn trait_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::Trait, tok);

        let ident = self.ast.tokens.eat(TokenTag::Ident);
        if is_null(ident) {
            self.err_unexpected("Expected name of a trait");
            return NULL_INDEX;
        }

        if !self.ast.tokens.expect(TokenTag::CurlyL) {
            self.err_unexpected("Expected `{`");
            return NULL_INDEX;
        }

        let mut end_node;
        loop {
            end_node = self.fn_def();
            if is_null(end_node) {
                return NULL_INDEX;
            }
            self.expect_semicolon();

            if self.ast.tokens.expect(TokenTag::CurlyR) {
                break;
            }
        }

        self.insert_data(node, end_node);
        let (vis, doc) = (self.vis, self.doc_tok);
        self.insert_meta(node, &[vis, doc]);
        node
    }

    /// `impl pathExpr (: pathExpr)? { fnStmt+ }`
    pub(crate) fn impl_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::Impl, tok);

        let path = self.path_expr();
        if is_null(path) {
            return NULL_INDEX;
        }

        let mut trait_path = NULL_INDEX;
        if self.ast.tokens.expect(TokenTag::Colon) {
            trait_path = self.path_expr();
            if is_null(trait_path) {
                return NULL_INDEX;
            }
        }

        if !self.ast.tokens.expect(TokenTag::CurlyL) {
            self.err_unexpected("Expected `{`");
            return NULL_INDEX;
        }

        self.insert_meta(node, &[path, trait_path]);

        let body = self.reserve_node(NodeTag::ImplBody, NULL_INDEX);
        let mut size = 0;
        let mut end_node;

        self.vis = Vis::Local as Index;
        loop {
            self.doc_tok = self.ast.tokens.eat_doc_comments();

            end_node = self.fn_stmt();
            if is_null(end_node) {
                return NULL_INDEX;
            }
            size += 1;

            if self.ast.tokens.expect(TokenTag::CurlyR) {
                break;
            }
        }

        self.set_node(body, size, end_node);
        self.insert_data(node, body);
        node
    }

    /// `expr ;`
    pub(crate) fn expr_stmt(&mut self) -> Index {
        let node = self.expr();
        if is_null(node) {
            return NULL_INDEX;
        }
        self.expect_semicolon();
        node
    }

    /// `for pattern in expr (: label)? blockStmt`
    pub(crate) fn for_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::ForStmt, tok);

        let pattern = self.parse_pattern();
        if is_null(pattern) {
            return NULL_INDEX;
        }

        if !self.ast.tokens.expect(TokenTag::KIn) {
            self.err_unexpected("Expected `in`");
            return NULL_INDEX;
        }

        let expr = self.expr();
        if is_null(expr) {
            return NULL_INDEX;
        }

        let mut label = NULL_INDEX;
        if self.ast.tokens.expect(TokenTag::Colon) {
            label = self.ast.tokens.eat(TokenTag::Ident);
            if is_null(label) {
                self.err_unexpected("Expected label name");
                return NULL_INDEX;
            }
        }

        let block = self.block_stmt();
        if is_null(block) {
            return NULL_INDEX;
        }

        self.insert_data(node, block);
        self.insert_meta(node, &[pattern, expr, label]);
        node
    }

    /// `while expr (: label)? blockStmt`
    pub(crate) fn while_stmt(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::WhileStmt, tok);

        let expr = self.expr();
        if is_null(expr) {
            return NULL_INDEX;
        }

        let mut label = NULL_INDEX;
        if self.ast.tokens.expect(TokenTag::Colon) {
            label = self.ast.tokens.eat(TokenTag::Ident);
            if is_null(label) {
                self.err_unexpected("Expected label name");
                return NULL_INDEX;
            }
        }

        let block = self.block_stmt();
        if is_null(block) {
            return NULL_INDEX;
        }

        self.insert_data(node, block);
        self.insert_meta(node, &[expr, label]);
        node
    }
}

#[cfg(test)]
mod tests {
    use crate::node::NodeTag;
    use crate::tests::parse_clean;

    #[test]
    fn test_import_statement() {
        let ast = parse_clean(
            "import a::a;\n\
             import a::b = c;\n\
             import a::{\n\
                 b,\n\
                 c = C,\n\
                 d::e,\n\
                 f::g = G\n\
             };",
        );
        assert_eq!(ast.imports.len(), 3);
        assert_eq!(ast.top.len(), 3);
    }

    #[test]
    fn test_constant_statement() {
        let ast = parse_clean(
            "const A : u32 = 4;\n\
             const B : (u32, u32) = (5, 5);\n\
             const C : [u32;A] = [10;A];",
        );
        assert_eq!(ast.top.len(), 3);
        assert!(ast.top.iter().all(|n| ast.tag(*n) == NodeTag::Constant));
    }

    #[test]
    fn test_function_statement() {
        parse_clean(
            "fn name() {}\n\
             fn name(a : i32) {}\n\
             fn name(a : i32, b : i32) : i32 {}\n\
             pub fn name(a : i32) const : i32 {}\n\
             pub fn name(a : i32) const : i32 {}\n\
             fn name(a : T) {}",
        );
    }

    #[test]
    fn test_variant_statement() {
        parse_clean(
            "variant A { i32 }\n\
             variant B { i32, i64, u32 }\n\
             variant C { T }\n\
             variant D { T,E }\n\
             variant E { E }\n",
        );
    }

    #[test]
    fn test_enum_statement() {
        parse_clean(
            "enum A { A, B, C }\n\
             enum B { A = 5, B, C = 8 }\n\
             enum C<u32> { A, B, C }\n\
             enum D<(u32,u32)> { T = (0,0),E = (1,1) }\n",
        );
    }

    #[test]
    fn test_struct_statement() {
        parse_clean(
            "struct A { value : i32 = 5; }\n\
             struct B\n\
             {\n\
                 pub const MIN : isize = 5;\n\
                 pub const MAX : isize = 5;\n\
                 pub value : isize;\n\
                 pub default_value : isize = 5;\n\
             }",
        );
    }

    #[test]
    fn test_trait_statement() {
        parse_clean(
            "trait A\n\
             {\n\
                 fn static_method();\n\
                 fn object_method();\n\
             }\n",
        );
    }

    #[test]
    fn test_impl_statement() {
        parse_clean(
            "impl A\n\
             {\n\
                 fn print() {}\n\
             }\n\
             impl B : C\n\
             {\n\
                 fn print() : i32 {}\n\
             }\n",
        );
    }

    #[test]
    fn test_control_flow() {
        parse_clean(
            "fn main() {\n\
                 var i = 0;\n\
                 while (i < 10) : outer {\n\
                     if (i == 5) { break outer; }\n\
                     else if (i == 3) { continue; }\n\
                     else { i += 1; }\n\
                 }\n\
                 for x in items { i += x; }\n\
                 return i;\n\
             }",
        );
    }

    #[test]
    fn test_missing_semicolon_reported() {
        let mut file = koc_util::SourceFile::new("test.k", "const A : u32 = 4");
        let _ = crate::parse(&mut file);
        assert!(file
            .errors()
            .iter()
            .any(|d| d.message == "Missing semicolon"));
    }
}
