//! Type syntax.
//!
//! ```text
//! path (*)* (&)?
//! [ type ; expression ] (*)* (&)?
//! ( type (, type)+ ) (*)* (&)?
//! dyn<path (+ path)*> (*)* (&)?
//! |[ type ]|
//! fn ( (type (, type)*)? ) (-> type)?
//! ```
//!
//! The pointer count and reference flag are packed into the `Type`
//! node's `lhs` word: the highest 3 bits are flags, the low 29 bits the
//! pointer depth (at most [`POINTER_MAX`]).

use koc_lex::TokenTag;
use koc_util::{is_null, Index, NULL_INDEX};

use crate::node::{NodeTag, POINTER_MAX, TYPE_FLAG_REFERENCE, TYPE_PTR_MASK};
use crate::Parser;

impl Parser<'_> {
    pub(crate) fn parse_type(&mut self) -> Index {
        let mut meta = NULL_INDEX;
        let node = self.reserve_node(NodeTag::Type, NULL_INDEX);

        let base = match self.ast.tokens.current() {
            // path
            TokenTag::Ident => {
                let base = self.path_expr();
                if is_null(base) {
                    return NULL_INDEX;
                }
                base
            }
            // [ type ; expression ]
            TokenTag::SquareL => {
                let tok = self.ast.tokens.eat_any();
                let base = self.reserve_node(NodeTag::TypeArr, tok);

                let ty = self.parse_type();
                if is_null(ty) {
                    return NULL_INDEX;
                }

                self.expect_semicolon();

                let expr = self.expr();
                if is_null(expr) {
                    return NULL_INDEX;
                }

                if !self.ast.tokens.expect(TokenTag::SquareR) {
                    self.err_unexpected("Expected `]`");
                    return NULL_INDEX;
                }

                self.set_node(base, ty, expr);
                base
            }
            // ( type (, type)+ )
            TokenTag::ParenL => {
                let tok = self.ast.tokens.eat_any();
                let base = self.reserve_node(NodeTag::TypeTuple, tok);
                let cache_index = self.cache_len();

                let mut size = 1;
                let mut ty = self.parse_type();
                if is_null(ty) {
                    return NULL_INDEX;
                }
                self.add_to_cache(ty);

                loop {
                    if !self.ast.tokens.expect(TokenTag::Comma) {
                        self.err_unexpected("Expected `,`");
                        return NULL_INDEX;
                    }

                    ty = self.parse_type();
                    size += 1;
                    if is_null(ty) {
                        return NULL_INDEX;
                    }
                    self.add_to_cache(ty);

                    if self.ast.tokens.expect(TokenTag::ParenR) {
                        break;
                    }
                }

                let meta_start = self.create_meta_from_cache(cache_index);
                self.set_node(base, meta_start, size);
                base
            }
            // dyn<path (+ path)*>
            TokenTag::KDyn => {
                let tok = self.ast.tokens.eat_any();
                let base = self.reserve_node(NodeTag::TypeDynamic, tok);

                if !self.ast.tokens.expect(TokenTag::Ls) {
                    self.err_unexpected("Expected `<`");
                    return NULL_INDEX;
                }

                let cache_index = self.cache_len();
                let mut size = 0;
                loop {
                    let path = self.path_expr();
                    size += 1;
                    self.add_to_cache(path);
                    if is_null(path) {
                        return NULL_INDEX;
                    }
                    if !self.ast.tokens.expect(TokenTag::Add) {
                        break;
                    }
                }

                if !self.ast.tokens.expect(TokenTag::Gt) {
                    self.err_unexpected("Expected `>`");
                    return NULL_INDEX;
                }

                let meta_start = self.create_meta_from_cache(cache_index);
                self.set_node(base, meta_start, size);
                base
            }
            // |[ type ]|
            TokenTag::Or => {
                self.ast.tokens.skip();

                if !self.ast.tokens.expect(TokenTag::SquareL) {
                    self.err_unexpected("Expected `[`");
                    return NULL_INDEX;
                }

                let base = self.parse_type();
                if is_null(base) {
                    return NULL_INDEX;
                }
                self.ast.node_tags[base as usize] = NodeTag::TypeSlice;

                if !self.ast.tokens.expect(TokenTag::SquareR) {
                    self.err_unexpected("Expected `]`");
                    return NULL_INDEX;
                }
                if !self.ast.tokens.expect(TokenTag::Or) {
                    self.err_unexpected("Expected `|`");
                    return NULL_INDEX;
                }
                base
            }
            // fn ( (type (, type)*)? ) (-> type)?
            TokenTag::KFn => {
                let tok = self.ast.tokens.eat_any();
                let base = self.reserve_node(NodeTag::TypeFn, tok);

                if !self.ast.tokens.expect(TokenTag::ParenL) {
                    self.err_unexpected("Expected `(`");
                    return NULL_INDEX;
                }

                let mut return_type = NULL_INDEX;
                let mut meta_type = NULL_INDEX;
                let mut size = 0;

                if !self.ast.tokens.expect(TokenTag::ParenR) {
                    let cache_index = self.cache_len();
                    // Placeholder for the parameter count.
                    self.add_to_cache(0);

                    loop {
                        let ty = self.parse_type();
                        if is_null(ty) {
                            return NULL_INDEX;
                        }
                        size += 1;
                        self.add_to_cache(ty);
                        if !self.ast.tokens.expect(TokenTag::Comma) {
                            break;
                        }
                    }

                    if !self.ast.tokens.expect(TokenTag::ParenR) {
                        self.err_unexpected("Expected `)`");
                        return NULL_INDEX;
                    }

                    self.set_cache(cache_index, size);
                    meta_type = self.create_meta_from_cache(cache_index);
                }

                if self.ast.tokens.expect(TokenTag::Arrow) {
                    return_type = self.parse_type();
                    if is_null(return_type) {
                        return NULL_INDEX;
                    }
                }

                self.set_node(base, meta_type, return_type);
                self.set_node(node, meta, base);
                return node;
            }
            _ => {
                self.err_unexpected("Expected type");
                return NULL_INDEX;
            }
        };

        // (*)*
        while self.ast.tokens.expect(TokenTag::Star) {
            meta += 1;
            if (meta & TYPE_PTR_MASK) > POINTER_MAX {
                self.err_unexpected("Pointer depth limit exceeded");
                return NULL_INDEX;
            }
        }

        // &?
        if self.ast.tokens.expect(TokenTag::And) {
            meta |= TYPE_FLAG_REFERENCE;
        }

        self.set_node(node, meta, base);
        node
    }
}

#[cfg(test)]
mod tests {
    use crate::node::{NodeTag, TYPE_FLAG_REFERENCE, TYPE_PTR_MASK};
    use crate::tests::parse_clean;

    #[test]
    fn test_type_forms() {
        parse_clean(
            "const A : u32 = 0;\n\
             const B : (u32, u32) = (0, 0);\n\
             const C : [u32;4] = [0;4];\n\
             const D : dyn<T + U> = x;\n\
             const E : |[u8]| = x;\n\
             const F : fn(u32, u32) -> u32 = x;\n\
             const G : fn() = x;",
        );
    }

    #[test]
    fn test_pointer_packing() {
        let ast = parse_clean("const P : u8** & = x;");
        let ty = ast
            .node_tags
            .iter()
            .position(|t| *t == NodeTag::Type)
            .unwrap();
        let word = ast.nodes[ty].lhs;
        assert_eq!(word & TYPE_PTR_MASK, 2);
        assert_ne!(word & TYPE_FLAG_REFERENCE, 0);
    }
}
