//! koc-par - Parser and AST
//!
//! A hand-written recursive-descent parser with a precedence-climbing
//! layer for expressions. The AST is a flat arena: parallel vectors of
//! tags, main tokens, and `lhs`/`rhs` payload pairs, plus a `meta` side
//! vector for variable-arity children. Node 0 is a sentinel.
//!
//! Errors are reported into the file's diagnostic sink; a failed
//! statement returns `NULL_INDEX` and the parser resynchronizes at the
//! next token that can begin a top-level statement.

pub mod node;

mod expr;
mod pattern;
mod stmt;
mod types;

pub use node::{Node, NodeTag, Operators, SingleOp, Vis};

use koc_lex::{tokenize, TokenList, TokenTag};
use koc_util::diagnostic::{codes, Color, Diagnostic, Label};
use koc_util::{is_null, Index, SourceFile, NULL_INDEX};

/// The parsed file: flat node storage plus the token list it was built
/// from.
///
/// Invariant: every referenced child index precedes its parent, except
/// for reserve-then-fill nodes whose children are created before the
/// parent's payload is committed.
#[derive(Debug, Default)]
pub struct Ast {
    pub node_tags: Vec<NodeTag>,
    pub node_tokens: Vec<Index>,
    pub nodes: Vec<Node>,
    pub meta: Vec<Index>,
    pub imports: Vec<Index>,
    pub top: Vec<Index>,
    pub tokens: TokenList,
}

impl Ast {
    fn new(tokens: TokenList) -> Self {
        let mut ast = Ast {
            tokens,
            ..Default::default()
        };
        // Reserve the 0 index.
        ast.node_tags.push(NodeTag::Root);
        ast.nodes.push(Node::default());
        ast.node_tokens.push(NULL_INDEX);
        ast.meta.push(NULL_INDEX);
        ast
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, index: Index) -> Node {
        self.nodes[index as usize]
    }

    pub fn tag(&self, index: Index) -> NodeTag {
        self.node_tags[index as usize]
    }

    pub fn token_of(&self, index: Index) -> Index {
        self.node_tokens[index as usize]
    }

    pub fn meta_at(&self, index: Index) -> Index {
        self.meta[index as usize]
    }
}

/// Parse a source file into an [`Ast`], tokenizing it first.
pub fn parse(file: &mut SourceFile) -> Ast {
    let tokens = tokenize(file);
    let mut parser = Parser {
        file,
        ast: Ast::new(tokens),
        cache: Vec::new(),
        doc_tok: NULL_INDEX,
        vis: Vis::Local as Index,
    };
    parser.run();
    parser.ast
}

pub(crate) struct Parser<'a> {
    pub(crate) file: &'a mut SourceFile,
    pub(crate) ast: Ast,

    /// Scratch for child indices whose count is unknown while parsing;
    /// flushed into `ast.meta` on commit.
    cache: Vec<Index>,

    pub(crate) doc_tok: Index,
    pub(crate) vis: Index,
}

impl Parser<'_> {
    fn run(&mut self) {
        while self.ast.tokens.current() != TokenTag::EndOfFile {
            self.doc_tok = self.ast.tokens.eat_doc_comments();
            self.vis = self.eat_vis();

            let result = match self.ast.tokens.current() {
                TokenTag::KImport => self.import_stmt(),
                TokenTag::KConst => self.constant_stmt(),
                TokenTag::KFn => self.fn_stmt(),
                TokenTag::KStruct => self.struct_stmt(),
                TokenTag::KVariant => self.variant_stmt(),
                TokenTag::KEnum => self.enum_stmt(),
                TokenTag::KTrait => self.trait_stmt(),
                TokenTag::KImpl => self.impl_stmt(),
                TokenTag::EndOfFile => {
                    self.err_unexpected("Empty file");
                    NULL_INDEX
                }
                _ => {
                    self.err_unexpected("Expected global statement");
                    NULL_INDEX
                }
            };

            if is_null(result) {
                self.recover_top_level();
            } else {
                self.ast.top.push(result);
            }
        }
    }

    /// Skips ahead to the next token that can begin a top-level
    /// statement.
    fn recover_top_level(&mut self) {
        use TokenTag::*;
        loop {
            match self.ast.tokens.current() {
                EndOfFile | KImport | KConst | KFn | KStruct | KVariant | KEnum | KTrait
                | KImpl => return,
                _ => self.ast.tokens.skip(),
            }
        }
    }

    /// Eats an optional `pub` and returns the visibility flag.
    pub(crate) fn eat_vis(&mut self) -> Index {
        if is_null(self.ast.tokens.eat(TokenTag::KPub)) {
            Vis::Local as Index
        } else {
            Vis::Global as Index
        }
    }

    //-- AST building ---------------------------------------------------//

    /// Creates a node whose payload is filled in later.
    pub(crate) fn reserve_node(&mut self, tag: NodeTag, token: Index) -> Index {
        self.ast.nodes.push(Node::default());
        self.ast.node_tags.push(tag);
        self.ast.node_tokens.push(token);
        (self.ast.nodes.len() - 1) as Index
    }

    pub(crate) fn create_node(&mut self, tag: NodeTag, lhs: Index, rhs: Index, token: Index) -> Index {
        self.ast.nodes.push(Node::new(lhs, rhs));
        self.ast.node_tags.push(tag);
        self.ast.node_tokens.push(token);
        (self.ast.nodes.len() - 1) as Index
    }

    pub(crate) fn set_node(&mut self, node: Index, lhs: Index, rhs: Index) {
        self.ast.nodes[node as usize] = Node::new(lhs, rhs);
    }

    /// Stores `values` in the meta vector and points the node's `lhs` at
    /// them.
    pub(crate) fn insert_meta(&mut self, node: Index, values: &[Index]) {
        let start = self.ast.meta.len() as Index;
        self.ast.meta.extend_from_slice(values);
        self.ast.nodes[node as usize].lhs = start;
    }

    pub(crate) fn insert_data(&mut self, node: Index, data: Index) {
        self.ast.nodes[node as usize].rhs = data;
    }

    pub(crate) fn add_to_cache(&mut self, value: Index) {
        self.cache.push(value);
    }

    pub(crate) fn cache_len(&self) -> Index {
        self.cache.len() as Index
    }

    pub(crate) fn set_cache(&mut self, index: Index, value: Index) {
        self.cache[index as usize] = value;
    }

    /// Flushes cached children from `start` into the meta vector and
    /// truncates the scratch, returning the meta start index.
    pub(crate) fn create_meta_from_cache(&mut self, start: Index) -> Index {
        let meta = self.ast.meta.len() as Index;
        self.ast.meta.extend_from_slice(&self.cache[start as usize..]);
        self.cache.truncate(start as usize);
        meta
    }

    //-- Messages -------------------------------------------------------//

    pub(crate) fn err_unexpected(&mut self, msg: &str) {
        let curr = self.ast.tokens.current_index();
        let start = self.ast.tokens.start(curr);
        let end = self.ast.tokens.end(curr);

        self.file.add(
            Diagnostic::error(codes::UNEXPECTED_TOKEN, "Unexpected symbol")
                .with_label(Label::new(msg, start..end).with_color(Color::Red)),
        );
    }

    pub(crate) fn expect_semicolon(&mut self) {
        if is_null(self.ast.tokens.eat(TokenTag::Semi)) {
            let prev = self.ast.tokens.current_index() - 1;
            let end = self.ast.tokens.end(prev);

            self.file.add(
                Diagnostic::error(codes::MISSING_SEMICOLON, "Missing semicolon")
                    .with_label(Label::new("", end..end)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_src(src: &str) -> (Ast, SourceFile) {
        let mut file = SourceFile::new("test.k", src);
        let ast = parse(&mut file);
        (ast, file)
    }

    pub(crate) fn parse_clean(src: &str) -> Ast {
        let (ast, file) = parse_src(src);
        assert_eq!(file.error_count(), 0, "unexpected errors in {:?}", src);
        assert_eq!(file.warning_count(), 0);
        ast
    }

    #[test]
    fn test_empty_file_reports() {
        let (_, file) = parse_src("");
        assert_eq!(file.error_count(), 0, "empty source has no tokens at all");
    }

    #[test]
    fn test_lone_pub_reports_empty_file() {
        let (_, file) = parse_src("pub");
        assert_eq!(file.error_count(), 1);
    }

    #[test]
    fn test_recovery_continues_at_next_top_level() {
        // The malformed const aborts, the following fn still parses.
        let (ast, file) = parse_src("const A u32 = 1;\nfn f() {}");
        assert!(file.has_errors());
        assert_eq!(ast.top.len(), 1);
        assert_eq!(ast.tag(ast.top[0]), NodeTag::Fn);
    }

    #[test]
    fn test_ast_child_first() {
        let ast = parse_clean(
            "const A : u32 = 1 + 2 * 3;\nfn f(a : i32) { var x = a; if (x) { return; } }",
        );

        // Reserve-then-fill parents may precede children; everything a
        // node references through meta must still be a valid index.
        for (index, node) in ast.nodes.iter().enumerate().skip(1) {
            let tag = ast.node_tags[index];
            if let NodeTag::BinOp = tag {
                assert!((node.lhs as usize) < index);
                assert!((node.rhs as usize) < index);
            }
        }
    }
}
