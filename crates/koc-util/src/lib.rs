//! koc-util - Core Utilities and Foundation Types
//!
//! This crate provides the fundamental types shared by every phase of the
//! koc compiler: the 32-bit [`Index`] used for all intra-buffer references,
//! the string [`Interner`], the diagnostic sink, source file handling, and
//! numeric literal conversion.
//!
//! # Indices instead of pointers
//!
//! Every cross-referencing structure in the compiler (tokens, AST nodes,
//! KIR/AIR instructions, pool entries, scopes, namespaces, records,
//! modules) is stored in an owning vector and referenced by a plain
//! [`Index`]. Index `0` is reserved in every such vector so that
//! [`NULL_INDEX`] can mean "absent" without an `Option` wrapper, keeping
//! the hot structures at a fixed 8 bytes.

pub mod convert;
pub mod diagnostic;
pub mod intern;
pub mod source;

pub use intern::Interner;
pub use source::SourceFile;

// Re-export commonly used map types
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;

/// Identifier of an element inside an owning vector.
///
/// Indices are never pointers; they are positions in a specific vector and
/// only meaningful together with it.
pub type Index = u32;

/// The reserved "absent" index. Element 0 of every indexed vector is a
/// sentinel so this value never refers to real data.
pub const NULL_INDEX: Index = 0;

/// The largest representable index.
pub const MAX_INDEX: Index = Index::MAX;

/// Number of bits in an [`Index`].
pub const INDEX_BITS: u32 = Index::BITS;

/// Returns true if the index is the null sentinel.
///
/// # Examples
///
/// ```
/// use koc_util::{is_null, NULL_INDEX};
///
/// assert!(is_null(NULL_INDEX));
/// assert!(!is_null(1));
/// ```
#[inline]
pub const fn is_null(index: Index) -> bool {
    index == NULL_INDEX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_index() {
        assert!(is_null(NULL_INDEX));
        assert!(!is_null(1));
        assert!(!is_null(MAX_INDEX));
    }
}
