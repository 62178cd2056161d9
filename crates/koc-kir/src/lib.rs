//! koc-kir - The untyped, name-resolved intermediate representation
//!
//! KIR lowers the AST into a register-style instruction stream: a
//! one-byte tag vector parallel to a vector of fixed 8-byte payload
//! cells, an `extra` side table of serialized packed operands, a string
//! interner for identifiers, and the list of import paths discovered in
//! the file.
//!
//! Instruction index 0 is a sentinel; every real instruction index is
//! at least 1, so `NULL_INDEX` never aliases an instruction.

pub mod extra;
pub mod gen;
pub mod inst;
pub mod printer;
pub mod ref_inst;
pub mod scope;

pub use gen::KirGen;
pub use inst::{InstData, InstTag};
pub use printer::print_kir;
pub use ref_inst::{Constant, Ref};

use extra::ExtraData;
use koc_lex::TokenLoc;
use koc_util::{is_null, Index, Interner};

/// A module's KIR buffers.
///
/// The AST itself is discarded once lowering finishes, but diagnostics
/// produced during sema still need byte ranges. The KIR therefore keeps
/// the AST's node-to-main-token map and the token locations; both are
/// flat index vectors, cheap next to the instruction stream.
#[derive(Debug, Default)]
pub struct Kir {
    pub inst: Vec<InstData>,
    pub tags: Vec<InstTag>,
    pub extra: Vec<Index>,
    pub strings: Interner,
    /// String ids of the import paths, in file order.
    pub imports: Vec<Index>,

    /// Main token of each AST node, for source locations after the AST
    /// is gone.
    pub node_tokens: Vec<Index>,
    /// Byte spans of the tokens.
    pub token_locs: Vec<TokenLoc>,
}

impl Kir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.inst.len(), self.tags.len());
        self.inst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inst.is_empty()
    }

    pub fn tag(&self, inst: Index) -> InstTag {
        self.tags[inst as usize]
    }

    pub fn data(&self, inst: Index) -> InstData {
        self.inst[inst as usize]
    }

    pub fn extra_at(&self, index: Index) -> Index {
        self.extra[index as usize]
    }

    /// Deserializes a packed operand struct from the extra vector.
    pub fn read_extra<T: ExtraData>(&self, at: Index) -> T {
        T::read(&self.extra, at as usize)
    }

    pub fn str(&self, id: Index) -> &str {
        self.strings.resolve(id)
    }

    /// Byte range of a token, or an empty range for the null token.
    pub fn token_span(&self, token: Index) -> std::ops::Range<usize> {
        if is_null(token) || token as usize >= self.token_locs.len() {
            return 0..0;
        }
        let loc = self.token_locs[token as usize];
        loc.start as usize..loc.end() as usize
    }

    /// Byte range of an AST node's main token.
    pub fn node_span(&self, node: Index) -> std::ops::Range<usize> {
        let token = self
            .node_tokens
            .get(node as usize)
            .copied()
            .unwrap_or(koc_util::NULL_INDEX);
        self.token_span(token)
    }
}
