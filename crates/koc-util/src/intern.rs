//! String interning.
//!
//! Two independent interners exist in the compiler: one per module inside
//! the KIR (identifier ids) and one inside the intern pool (symbol names).
//! Both are instances of [`Interner`].

use crate::{Index, FxHashMap};

/// Maps byte strings to stable small integer ids.
///
/// Interning the same string twice yields the same id, so id equality is
/// string equality. Ids index into [`Interner::strings`].
///
/// # Examples
///
/// ```
/// use koc_util::Interner;
///
/// let mut interner = Interner::new();
/// let a = interner.get_or_intern("foo");
/// let b = interner.get_or_intern("foo");
/// let c = interner.get_or_intern("bar");
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(interner.resolve(a), "foo");
/// ```
#[derive(Debug, Default, Clone)]
pub struct Interner {
    strings: Vec<String>,
    map: FxHashMap<String, Index>,
}

impl Interner {
    /// Create an empty interner.
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a string, returning its id. Returns the existing id if the
    /// string was interned before.
    pub fn get_or_intern(&mut self, string: &str) -> Index {
        if let Some(&id) = self.map.get(string) {
            return id;
        }

        let id = self.strings.len() as Index;
        self.strings.push(string.to_owned());
        self.map.insert(string.to_owned(), id);
        id
    }

    /// Look up a string without interning it.
    pub fn get(&self, string: &str) -> Option<Index> {
        self.map.get(string).copied()
    }

    /// Resolve an id back to its string.
    ///
    /// # Panics
    ///
    /// Panics if the id was not produced by this interner.
    pub fn resolve(&self, id: Index) -> &str {
        &self.strings[id as usize]
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedup() {
        let mut interner = Interner::new();
        let a = interner.get_or_intern("alpha");
        let b = interner.get_or_intern("alpha");
        assert_eq!(a, b);
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_intern_distinct() {
        let mut interner = Interner::new();
        let a = interner.get_or_intern("alpha");
        let b = interner.get_or_intern("beta");
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "alpha");
        assert_eq!(interner.resolve(b), "beta");
    }

    #[test]
    fn test_get_without_intern() {
        let mut interner = Interner::new();
        assert_eq!(interner.get("missing"), None);
        let id = interner.get_or_intern("present");
        assert_eq!(interner.get("present"), Some(id));
    }
}
