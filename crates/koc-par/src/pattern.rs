//! Binding patterns.
//!
//! ```text
//! _                                            discard
//! mut? ident (: type)?                         single
//! ( pattern (, pattern)* )                     multiple
//! path { ident -> mut? ident (, ...) }         struct
//! ```

use koc_lex::TokenTag;
use koc_util::{is_null, Index, NULL_INDEX};

use crate::node::NodeTag;
use crate::Parser;

impl Parser<'_> {
    pub(crate) fn parse_pattern(&mut self) -> Index {
        match self.ast.tokens.current() {
            // _
            TokenTag::Underscore => {
                let tok = self.ast.tokens.eat_any();
                self.create_node(NodeTag::PatternDiscard, NULL_INDEX, NULL_INDEX, tok)
            }
            // ( pattern (, pattern)* )
            TokenTag::ParenL => {
                let tok = self.ast.tokens.eat_any();
                let node = self.reserve_node(NodeTag::PatternMultiple, tok);
                let cache_index = self.cache_len();
                let mut size = 0;

                loop {
                    let pattern = self.parse_pattern();
                    size += 1;
                    if is_null(pattern) {
                        return NULL_INDEX;
                    }
                    self.add_to_cache(pattern);
                    if !self.ast.tokens.expect(TokenTag::Comma) {
                        break;
                    }
                }

                if !self.ast.tokens.expect(TokenTag::ParenR) {
                    self.err_unexpected("Expected `)`");
                    return NULL_INDEX;
                }

                let meta = self.create_meta_from_cache(cache_index);
                self.set_node(node, meta, size);
                node
            }
            // mut? ident (: type)?   or   path { ... }
            TokenTag::KMut | TokenTag::Ident => {
                if self.ast.tokens.peek(TokenTag::CurlyL, 1)
                    || self.ast.tokens.peek(TokenTag::Colon2, 1)
                {
                    return self.struct_pattern();
                }

                let is_mutable = self.ast.tokens.expect(TokenTag::KMut) as Index;
                let ident = self.ast.tokens.eat_any();
                let node = self.reserve_node(NodeTag::PatternSingle, ident);
                let mut ty = NULL_INDEX;

                // : type
                if self.ast.tokens.expect(TokenTag::Colon) {
                    ty = self.parse_type();
                    if is_null(ty) {
                        return NULL_INDEX;
                    }
                }

                self.set_node(node, ty, is_mutable);
                node
            }
            _ => {
                self.err_unexpected("Expected pattern");
                NULL_INDEX
            }
        }
    }

    fn struct_pattern(&mut self) -> Index {
        let node = self.reserve_node(NodeTag::PatternStruct, self.ast.tokens.current_index());

        let path = self.path_expr();
        if is_null(path) {
            return NULL_INDEX;
        }

        let block_node = self.reserve_node(NodeTag::Block, self.ast.tokens.current_index());
        let cache_index = self.cache_len();

        if !self.ast.tokens.expect(TokenTag::CurlyL) {
            self.err_unexpected("Expected `{`");
            return NULL_INDEX;
        }

        let mut size = 0;
        loop {
            let field = self.ast.tokens.current_index();
            if !self.ast.tokens.expect(TokenTag::Ident) {
                self.err_unexpected("Expected field name");
                return NULL_INDEX;
            }

            if !self.ast.tokens.expect(TokenTag::Arrow) {
                self.err_unexpected("Expected `->`");
                return NULL_INDEX;
            }

            let is_mutable = self.ast.tokens.expect(TokenTag::KMut) as Index;

            let ident = self.ast.tokens.current_index();
            if !self.ast.tokens.expect(TokenTag::Ident) {
                self.err_unexpected("Expected variable name");
                return NULL_INDEX;
            }

            let item = self.create_node(NodeTag::PatternStructField, field, is_mutable, ident);
            self.add_to_cache(item);
            size += 1;

            if !self.ast.tokens.expect(TokenTag::Comma) {
                break;
            }
        }

        if !self.ast.tokens.expect(TokenTag::CurlyR) {
            self.err_unexpected("Expected `}`");
            return NULL_INDEX;
        }

        let meta = self.create_meta_from_cache(cache_index);
        self.set_node(block_node, meta, size);
        self.set_node(node, path, block_node);
        node
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::parse_clean;

    #[test]
    fn test_patterns_parse() {
        parse_clean(
            "fn x() { var x : i32 = 5;\n\
             var y = 8;\n\
             var (x : i32, y : u32) = (5, 6);\n\
             var (x, y) = (5, 6);\n\
             var (_, z) = (5, 6);\n\
             var mut m = 1;\n\
             var A{ field_x -> x, field_y -> y } = something;\n\
             var B{ f -> mut g } = something; }",
        );
    }
}
