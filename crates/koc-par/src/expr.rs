//! Expression parsing: a precedence climber with 12 levels.
//!
//! Postfix operators (`()`, `[]`, `?`, `.`, `->`) bind tightest;
//! assignment binds loosest and associates to the right.

use koc_lex::TokenTag;
use koc_util::{is_null, Index, NULL_INDEX};

use crate::node::{
    NodeTag, Operators, SingleOp, CAPTURE_FLAG_MUTABLE, CAPTURE_FLAG_REFERENCE, LITERAL_CHAR,
    LITERAL_FLOAT, LITERAL_NUMBER, LITERAL_STRING,
};
use crate::Parser;

fn is_expr_post(op: Operators) -> bool {
    op == Operators::AccessArr || op == Operators::Call
}

fn is_assignment(op: Operators) -> bool {
    use Operators::*;
    matches!(op, Eq | EqAdd | EqSub | EqDiv | EqMul | EqMod | EqOr | EqAnd | EqXor)
}

pub(crate) fn op_precedence(op: Operators) -> u16 {
    use Operators::*;
    match op {
        Invalid => 0,
        Access | AccessPtr | AccessArr | Unwrap => 12,
        Call => 11,
        Mul | Mod | Div => 10,
        Add | Sub => 9,
        ShiftL | ShiftR => 8,
        Ls | Gt | LsEq | GtEq => 7,
        EqEq | NotEq => 6,
        And => 5,
        Xor => 4,
        Or => 3,
        OrOr | AndAnd => 2,
        Eq | EqAdd | EqSub | EqDiv | EqMul | EqMod | EqOr | EqAnd | EqXor => 1,
    }
}

impl Parser<'_> {
    /// Consumes the operator at the cursor, resolving `<<`, `>>`, `<=`,
    /// and `>=` from their component tokens. Leaves the cursor untouched
    /// and returns [`Operators::Invalid`] when the current token is not
    /// an operator.
    fn get_op(&mut self) -> Operators {
        use Operators as Op;

        let operation = match self.ast.tokens.current() {
            TokenTag::ParenL => Op::Call,
            TokenTag::Dot => Op::Access,
            TokenTag::Arrow => Op::AccessPtr,
            TokenTag::SquareL => Op::AccessArr,
            TokenTag::Question => Op::Unwrap,
            TokenTag::Star => Op::Mul,
            TokenTag::Mod => Op::Mod,
            TokenTag::Div => Op::Div,
            TokenTag::Add => Op::Add,
            TokenTag::Minus => Op::Sub,
            TokenTag::Ls => {
                if self.ast.tokens.peek(TokenTag::Ls, 1) {
                    self.ast.tokens.skip();
                    Op::ShiftL
                } else if self.ast.tokens.peek(TokenTag::Eq, 1) {
                    self.ast.tokens.skip();
                    Op::LsEq
                } else {
                    Op::Ls
                }
            }
            TokenTag::Gt => {
                if self.ast.tokens.peek(TokenTag::Gt, 1) {
                    self.ast.tokens.skip();
                    Op::ShiftR
                } else if self.ast.tokens.peek(TokenTag::Eq, 1) {
                    self.ast.tokens.skip();
                    Op::GtEq
                } else {
                    Op::Gt
                }
            }
            TokenTag::NotEq => Op::NotEq,
            TokenTag::And => Op::And,
            TokenTag::Caret => Op::Xor,
            TokenTag::Or => Op::Or,
            TokenTag::OrOr => Op::OrOr,
            TokenTag::AndAnd => Op::AndAnd,
            TokenTag::EqEq => Op::EqEq,
            TokenTag::Eq => Op::Eq,
            TokenTag::AddEq => Op::EqAdd,
            TokenTag::MinusEq => Op::EqSub,
            TokenTag::StarEq => Op::EqMul,
            TokenTag::DivEq => Op::EqDiv,
            TokenTag::ModEq => Op::EqMod,
            TokenTag::AndEq => Op::EqAnd,
            TokenTag::OrEq => Op::EqOr,
            TokenTag::CaretEq => Op::EqXor,
            _ => return Op::Invalid,
        };

        self.ast.tokens.skip();
        operation
    }

    fn single_op_expr(&mut self, operation: SingleOp) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::SingleOp, tok);

        let val = self.expr_val();
        if is_null(val) {
            return NULL_INDEX;
        }

        if self.ast.tag(val) == NodeTag::SingleOp {
            let tok = self.ast.token_of(val);
            let start = self.ast.tokens.start(tok);
            let end = self.ast.tokens.end(tok);

            self.file.add(
                koc_util::diagnostic::Diagnostic::error(
                    koc_util::diagnostic::codes::MULTIPLE_UNARY_OPS,
                    "Multiple unary operations",
                )
                .with_label(koc_util::diagnostic::Label::new("", start..end)),
            );
            return NULL_INDEX;
        }

        self.set_node(node, operation as Index, val);
        node
    }

    /// A value: literal, path, grouping, collection, unary operation, or
    /// one of the bracketed special forms.
    fn expr_val(&mut self) -> Index {
        self.ast.tokens.eat_doc_comments();

        match self.ast.tokens.current() {
            // struct constructor
            TokenTag::KNew => self.struct_expr(),
            // tuple or grouped expression
            TokenTag::ParenL => {
                let tok = self.ast.tokens.eat_any();
                let node = self.reserve_node(NodeTag::Tuple, tok);
                let mut size = 1;
                let mut expr = self.expr();
                if is_null(expr) {
                    return NULL_INDEX;
                }

                if !self.ast.tokens.expect(TokenTag::Comma) {
                    self.ast.node_tags[node as usize] = NodeTag::GroupedExpr;
                    self.insert_data(node, expr);

                    if !self.ast.tokens.expect(TokenTag::ParenR) {
                        self.err_unexpected("Expected `)`");
                        return NULL_INDEX;
                    }
                    return node;
                }

                let cache_index = self.cache_len();
                self.add_to_cache(expr);

                while !self.ast.tokens.expect(TokenTag::ParenR) {
                    expr = self.expr();
                    size += 1;
                    if is_null(expr) {
                        return NULL_INDEX;
                    }
                    self.add_to_cache(expr);

                    if self.ast.tokens.expect(TokenTag::Comma)
                        && self.ast.tokens.peek(TokenTag::ParenR, 0)
                    {
                        self.err_unexpected("Expected expression");
                        break;
                    }
                }

                let meta = self.create_meta_from_cache(cache_index);
                self.set_node(node, meta, size);
                node
            }
            // array
            TokenTag::SquareL => {
                let tok = self.ast.tokens.eat_any();
                let node = self.reserve_node(NodeTag::Array, tok);

                let expr = self.expr();
                let mut size = 1;
                if is_null(expr) {
                    return NULL_INDEX;
                }

                if self.ast.tokens.expect(TokenTag::Semi) {
                    // [value;size]
                    let count = self.expr();
                    if is_null(count) {
                        return NULL_INDEX;
                    }
                    self.ast.node_tags[node as usize] = NodeTag::ArrayShort;
                    self.set_node(node, count, expr);
                } else {
                    // [value, value, ...]
                    let cache_index = self.cache_len();
                    self.add_to_cache(expr);

                    while self.ast.tokens.expect(TokenTag::Comma) {
                        let expr = self.expr();
                        size += 1;
                        if is_null(expr) {
                            return NULL_INDEX;
                        }
                        self.add_to_cache(expr);
                    }

                    let meta = self.create_meta_from_cache(cache_index);
                    self.set_node(node, meta, size);
                }

                if !self.ast.tokens.expect(TokenTag::SquareR) {
                    self.err_unexpected("Expected `]`");
                    return NULL_INDEX;
                }
                node
            }
            // literals
            TokenTag::StringLit => self.literal(LITERAL_STRING),
            TokenTag::CharLit => self.literal(LITERAL_CHAR),
            TokenTag::NumberLit => self.literal(LITERAL_NUMBER),
            TokenTag::FloatLit => self.literal(LITERAL_FLOAT),
            // paths
            TokenTag::Ident => self.path_expr(),
            // unary operations
            TokenTag::Bang => self.single_op_expr(SingleOp::BoolNeg),
            TokenTag::Tilde => self.single_op_expr(SingleOp::BitNeg),
            TokenTag::And => self.single_op_expr(SingleOp::GetAddr),
            TokenTag::Minus => self.single_op_expr(SingleOp::IntNeg),
            TokenTag::Star => self.single_op_expr(SingleOp::Deref),
            // slice: |[base; from (, to)?]|
            TokenTag::Or => self.slice_expr(),
            // cast < type > ( expr )
            TokenTag::KCast => {
                let tok = self.ast.tokens.eat_any();
                let node = self.reserve_node(NodeTag::CastExpr, tok);

                if !self.ast.tokens.expect(TokenTag::Ls) {
                    self.err_unexpected("Expected `<`");
                    return NULL_INDEX;
                }

                let ty = self.parse_type();
                if is_null(ty) {
                    return NULL_INDEX;
                }

                if !self.ast.tokens.expect(TokenTag::Gt) {
                    self.err_unexpected("Expected `>`");
                    return NULL_INDEX;
                }
                if !self.ast.tokens.expect(TokenTag::ParenL) {
                    self.err_unexpected("Expected `(`");
                    return NULL_INDEX;
                }

                let expr = self.expr();
                if is_null(expr) {
                    return NULL_INDEX;
                }

                if !self.ast.tokens.expect(TokenTag::ParenR) {
                    self.err_unexpected("Expected `)`");
                    return NULL_INDEX;
                }

                self.set_node(node, ty, expr);
                node
            }
            _ => {
                self.err_unexpected("Expected expression");
                NULL_INDEX
            }
        }
    }

    fn literal(&mut self, kind: Index) -> Index {
        let node = self.reserve_node(NodeTag::Literal, self.ast.tokens.current_index());
        let tok = self.ast.tokens.eat_any();
        self.set_node(node, kind, tok);
        node
    }

    /// `|[base; from (, to)?]|` where `from` may be `_`.
    fn slice_expr(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::SliceOp, tok);

        if !self.ast.tokens.expect(TokenTag::SquareL) {
            self.err_unexpected("Expected `[`");
            return NULL_INDEX;
        }

        let base = self.expr();
        if is_null(base) {
            return NULL_INDEX;
        }

        if !self.ast.tokens.expect(TokenTag::Semi) {
            self.err_unexpected("Expected `;`");
            return NULL_INDEX;
        }

        let mut from = NULL_INDEX;
        let mut to = NULL_INDEX;

        if !self.ast.tokens.expect(TokenTag::Underscore) {
            from = self.expr();
            if is_null(from) {
                return NULL_INDEX;
            }
        }

        let comma = self.ast.tokens.eat(TokenTag::Comma);
        // `|[base;_]|` selects nothing and is rejected
        if is_null(from) && is_null(comma) {
            self.err_unexpected("Expected valid range");
            return NULL_INDEX;
        } else if !is_null(comma) {
            to = self.expr();
            if is_null(to) {
                return NULL_INDEX;
            }
        }

        if !self.ast.tokens.expect(TokenTag::SquareR) {
            self.err_unexpected("Expected `]`");
            return NULL_INDEX;
        }
        if !self.ast.tokens.expect(TokenTag::Or) {
            self.err_unexpected("Expected `|`");
            return NULL_INDEX;
        }

        self.insert_data(node, base);
        self.insert_meta(node, &[from, to]);
        node
    }

    /// Applies postfix `[]` and `()` operators to `node`, leaving the
    /// next operator in `op`.
    fn expr_post(&mut self, mut node: Index, op: &mut Operators) -> Index {
        while is_expr_post(*op) {
            match *op {
                Operators::AccessArr => {
                    let expr = self.expr();
                    if is_null(expr) {
                        return NULL_INDEX;
                    }

                    node = self.create_node(
                        NodeTag::BinOp,
                        node,
                        expr,
                        Operators::AccessArr as Index,
                    );

                    if !self.ast.tokens.expect(TokenTag::SquareR) {
                        self.err_unexpected("Expected ']'");
                    }
                }
                Operators::Call => {
                    if self.ast.tokens.expect(TokenTag::ParenR) {
                        // 0 args
                        node = self.create_node(NodeTag::CallOp, NULL_INDEX, node, NULL_INDEX);
                    } else {
                        // 1+ args
                        let call_node = self.reserve_node(NodeTag::CallOp, NULL_INDEX);
                        let cache_index = self.cache_len();

                        // Placeholder for the argument count.
                        self.add_to_cache(0);

                        let mut size = 0;
                        loop {
                            let expr = self.expr();
                            if is_null(expr) {
                                return NULL_INDEX;
                            }
                            size += 1;
                            self.add_to_cache(expr);

                            if !self.ast.tokens.expect(TokenTag::Comma) {
                                break;
                            }
                        }

                        if !self.ast.tokens.expect(TokenTag::ParenR) {
                            self.err_unexpected("Expected `)`");
                            return NULL_INDEX;
                        }

                        self.set_cache(cache_index, size);
                        let meta = self.create_meta_from_cache(cache_index);
                        self.set_node(call_node, meta, node);
                        node = call_node;
                    }
                }
                _ => {}
            }

            *op = self.get_op();
        }

        node
    }

    pub(crate) fn expr(&mut self) -> Index {
        match self.ast.tokens.current() {
            // struct constructor
            TokenTag::KNew => return self.struct_expr(),
            // closure
            TokenTag::KFn => return self.closure_expr(),
            _ => {}
        }

        let mut node = self.expr_val();
        if is_null(node) {
            return NULL_INDEX;
        }

        let mut op = self.get_op();
        if op == Operators::Invalid {
            return node;
        } else if op == Operators::Unwrap {
            node = self.create_node(NodeTag::UnwrapOp, NULL_INDEX, node, NULL_INDEX);
            op = self.get_op();
            if op == Operators::Invalid {
                return node;
            }
        }

        node = self.expr_post(node, &mut op);
        if is_null(node) {
            return NULL_INDEX;
        }

        let mut values = vec![node];
        let mut ops = vec![op];

        while op != Operators::Invalid {
            let mut rhs = self.expr_val();
            if is_null(rhs) {
                return NULL_INDEX;
            }

            op = self.get_op();

            // An expression can look like rhs()().
            rhs = self.expr_post(rhs, &mut op);
            if is_null(rhs) {
                return NULL_INDEX;
            }

            let curr_precedence = op_precedence(op);
            // Assignment folds right-to-left; everything else left-to-right.
            let right_assoc = is_assignment(op);

            while let Some(&top) = ops.last() {
                let top_precedence = op_precedence(top);
                let fold = top_precedence > curr_precedence
                    || (top_precedence == curr_precedence && !right_assoc);
                if !fold {
                    break;
                }
                ops.pop();
                let lhs = values.pop().expect("operator without operand");
                rhs = self.create_node(NodeTag::BinOp, lhs, rhs, top as Index);
            }

            if op == Operators::Unwrap {
                rhs = self.create_node(NodeTag::UnwrapOp, NULL_INDEX, rhs, NULL_INDEX);
                op = self.get_op();
            }

            if op == Operators::Invalid {
                node = rhs;
                break;
            }

            values.push(rhs);
            ops.push(op);
        }

        node
    }

    /// `ident (:: ident)*`
    pub(crate) fn path_expr(&mut self) -> Index {
        let start = self.ast.tokens.eat(TokenTag::Ident);

        while self.ast.tokens.expect(TokenTag::Colon2) {
            if !self.ast.tokens.expect(TokenTag::Ident) {
                self.err_unexpected("Expected identifier");
                return NULL_INDEX;
            }
        }

        let end = self.ast.tokens.current_index() - 1;
        self.create_node(NodeTag::Path, start, end, end)
    }

    /// `new pathExpr ({ ident = expr (, ident = expr)* })?`
    pub(crate) fn struct_expr(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::StructExpr, tok);

        let path = self.path_expr();
        if is_null(path) {
            return NULL_INDEX;
        }

        if !self.ast.tokens.expect(TokenTag::CurlyL) {
            self.set_node(node, path, NULL_INDEX);
            return node;
        }

        let fields = self.reserve_node(NodeTag::StructExprFields, NULL_INDEX);
        let cache_index = self.cache_len();
        let mut size = 0;

        loop {
            let ident = self.ast.tokens.eat(TokenTag::Ident);
            if is_null(ident) {
                self.err_unexpected("Expected `ident = expression`");
                return NULL_INDEX;
            }

            let field = self.reserve_node(NodeTag::StructExprField, ident);
            size += 1;

            if !self.ast.tokens.expect(TokenTag::Eq) {
                self.err_unexpected("Expected `=`");
                return NULL_INDEX;
            }

            let expr = self.expr();
            if is_null(expr) {
                return NULL_INDEX;
            }

            self.set_node(field, ident, expr);
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
        self.set_node(fields, meta, size);
        self.set_node(node, path, fields);
        node
    }

    /// `fn [ (mut? &? expr ,)* ] params (: type)? blockStmt`
    pub(crate) fn closure_expr(&mut self) -> Index {
        let tok = self.ast.tokens.eat_any();
        let node = self.reserve_node(NodeTag::ClosureExpr, tok);

        if !self.ast.tokens.expect(TokenTag::SquareL) {
            self.err_unexpected("Expected `[`");
            return NULL_INDEX;
        }

        let captures = self.reserve_node(NodeTag::ClosureCaptures, NULL_INDEX);
        let mut size = 0;
        let mut end_node = NULL_INDEX;

        if !self.ast.tokens.expect(TokenTag::SquareR) {
            loop {
                let mut flags = 0;
                if self.ast.tokens.expect(TokenTag::KMut) {
                    flags |= CAPTURE_FLAG_MUTABLE;
                }
                if self.ast.tokens.expect(TokenTag::And) {
                    flags |= CAPTURE_FLAG_REFERENCE;
                }

                let value = self.expr();
                if is_null(value) {
                    return NULL_INDEX;
                }

                end_node = self.create_node(NodeTag::ClosureCapture, flags, value, NULL_INDEX);
                size += 1;

                if !self.ast.tokens.expect(TokenTag::Comma) {
                    break;
                }
            }

            if !self.ast.tokens.expect(TokenTag::SquareR) {
                self.err_unexpected("Expected `]`");
                return NULL_INDEX;
            }
        }

        self.set_node(captures, size, end_node);

        if !self.ast.tokens.peek(TokenTag::ParenL, 0) {
            self.err_unexpected("Expected `(`");
            return NULL_INDEX;
        }

        let params = self.params();
        if is_null(params) {
            return NULL_INDEX;
        }

        let mut return_type = NULL_INDEX;
        if self.ast.tokens.expect(TokenTag::Colon) {
            return_type = self.parse_type();
            if is_null(return_type) {
                return NULL_INDEX;
            }
        }

        let block = self.block_stmt();
        if is_null(block) {
            return NULL_INDEX;
        }

        self.insert_data(node, block);
        self.insert_meta(node, &[captures, params, return_type]);
        node
    }
}

#[cfg(test)]
mod tests {
    use crate::node::{NodeTag, Operators};
    use crate::tests::parse_clean;

    #[test]
    fn test_expressions() {
        parse_clean(
            "fn x() { var x = 1 + 2 * 3 / 4 % 5 - 6 << 7;\n\
             var z = a.b.c->d? + e;\n\
             var y = (a?.b.c->d?)? + e; }",
        );
    }

    #[test]
    fn test_expression_statements() {
        parse_clean(
            "fn main() {\n\
                 test();\n\
                 x = 54;\n\
                 x += 4 + 8;\n\
                 x = function();\n\
                 x.y.z %= a.b->c()();\n\
                 x.y->z |= 50;\n\
                 y = new S;\n\
                 z = new S{ x = 5, y = 8 };\n\
             }",
        );
    }

    #[test]
    fn test_slices_and_casts() {
        parse_clean(
            "fn main() {\n\
                 var a = |[items; 1, 5]|;\n\
                 var b = |[items; 1]|;\n\
                 var c = |[items; _, 5]|;\n\
                 var d = cast<u8>(300);\n\
             }",
        );
    }

    #[test]
    fn test_closures() {
        parse_clean(
            "fn main() {\n\
                 var f = fn[](a : i32) : i32 { return a; };\n\
                 var g = fn[x, mut &y](a : i32) { y = a + x; };\n\
             }",
        );
    }

    #[test]
    fn test_multiple_unary_rejected() {
        let mut file = koc_util::SourceFile::new("test.k", "fn f() { var x = --1; }");
        let _ = crate::parse(&mut file);
        assert!(file
            .errors()
            .iter()
            .any(|d| d.message == "Multiple unary operations"));
    }

    #[test]
    fn test_precedence_shape() {
        // 1 + 2 * 3: the addition is the root, multiplication its rhs.
        let ast = parse_clean("const A : u32 = 1 + 2 * 3;");
        let root = (1..ast.len() as u32)
            .rev()
            .find(|n| ast.tag(*n) == NodeTag::BinOp)
            .unwrap();
        assert_eq!(ast.token_of(root), Operators::Add as u32);
        let rhs = ast.node(root).rhs;
        assert_eq!(ast.tag(rhs), NodeTag::BinOp);
        assert_eq!(ast.token_of(rhs), Operators::Mul as u32);
    }

    #[test]
    fn test_assignment_right_associative() {
        let ast = parse_clean("fn f() { a = b = c; }");
        // The outermost assignment's rhs is itself an assignment.
        let root = (1..ast.len() as u32)
            .rev()
            .find(|n| ast.tag(*n) == NodeTag::BinOp && ast.token_of(*n) == Operators::Eq as u32)
            .unwrap();
        let rhs = ast.node(root).rhs;
        assert_eq!(ast.tag(rhs), NodeTag::BinOp);
        assert_eq!(ast.token_of(rhs), Operators::Eq as u32);
        // lhs of the root is the plain path `a`
        assert_eq!(ast.tag(ast.node(root).lhs), NodeTag::Path);
    }
}
