//! The global symbol table: namespaces and records.
//!
//! Records and namespaces live in vectors owned by [`SymbolMap`] and
//! reference each other by index only; back-references never imply
//! ownership.

use indexmap::IndexMap;
use koc_par::Vis;
use koc_util::{FxHashMap, Index, NULL_INDEX};

/// Analysis progress of a record's declaration or body. Re-entering an
/// `InProgress` record is the cycle signal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecordState {
    #[default]
    NotAnalyzed,
    InProgress,
    Complete,
}

/// A symbol's compile-time entry.
#[derive(Debug)]
pub struct Record {
    pub id: Index,
    pub name: String,
    pub vis: Vis,

    /// Resolved type (pool id), `NULL_INDEX` until analyzed or on error.
    pub ty: Index,
    /// Resolved comptime value (pool id), `NULL_INDEX` if none.
    pub val: Index,

    /// The declaration's KIR instruction.
    pub kir_inst: Index,
    /// The declaration's value instruction in its own Air.
    pub air_inst: Index,

    /// Owning module id.
    pub module: Index,
    /// Namespace the record lives in.
    pub namespace: Index,

    pub status_decl: RecordState,
    pub status_body: RecordState,

    pub is_comptime: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NamespaceKind {
    Root,
    File,
    Struct,
    Union,
}

/// A node in the tree of file/module/struct scopes.
#[derive(Debug)]
pub struct Namespace {
    pub kind: NamespaceKind,
    pub parent: Index,
    /// Owning module id, or `NULL_INDEX` for plain directory namespaces.
    pub module: Index,
    /// Backing record for struct/union namespaces.
    pub record: Index,

    pub sub_namespaces: FxHashMap<String, Index>,
    /// Declarations in source order; order is user-visible in listings.
    pub decls: IndexMap<String, Index>,
}

impl Namespace {
    pub fn new(kind: NamespaceKind, module: Index) -> Self {
        Self {
            kind,
            parent: NULL_INDEX,
            module,
            record: NULL_INDEX,
            sub_namespaces: FxHashMap::default(),
            decls: IndexMap::new(),
        }
    }
}

/// Namespaces and records across all modules.
#[derive(Debug)]
pub struct SymbolMap {
    namespaces: Vec<Namespace>,
    records: Vec<Record>,
}

impl Default for SymbolMap {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolMap {
    pub fn new() -> Self {
        let mut map = Self {
            namespaces: Vec::new(),
            records: Vec::new(),
        };

        // Record 0 is a sentinel, namespace 0 the root.
        map.records.push(Record {
            id: 0,
            name: String::new(),
            vis: Vis::Local,
            ty: NULL_INDEX,
            val: NULL_INDEX,
            kir_inst: NULL_INDEX,
            air_inst: NULL_INDEX,
            module: NULL_INDEX,
            namespace: NULL_INDEX,
            status_decl: RecordState::NotAnalyzed,
            status_body: RecordState::NotAnalyzed,
            is_comptime: true,
        });
        map.namespaces
            .push(Namespace::new(NamespaceKind::Root, NULL_INDEX));

        map
    }

    /// Creates a record and registers it in the namespace's decls.
    pub fn create_record(
        &mut self,
        namespace: Index,
        name: &str,
        vis: Vis,
        kir_inst: Index,
        module: Index,
    ) -> Index {
        let id = self.records.len() as Index;
        self.records.push(Record {
            id,
            name: name.to_owned(),
            vis,
            ty: NULL_INDEX,
            val: NULL_INDEX,
            kir_inst,
            air_inst: NULL_INDEX,
            module,
            namespace,
            status_decl: RecordState::NotAnalyzed,
            status_body: RecordState::NotAnalyzed,
            is_comptime: true,
        });

        self.namespaces[namespace as usize]
            .decls
            .insert(name.to_owned(), id);
        id
    }

    pub fn create_namespace(
        &mut self,
        name: &str,
        parent: Index,
        module: Index,
        kind: NamespaceKind,
    ) -> Index {
        let index = self.namespaces.len() as Index;
        let mut namespace = Namespace::new(kind, module);
        namespace.parent = parent;
        self.namespaces.push(namespace);

        self.namespaces[parent as usize]
            .sub_namespaces
            .insert(name.to_owned(), index);
        index
    }

    pub fn record(&self, id: Index) -> &Record {
        &self.records[id as usize]
    }

    pub fn record_mut(&mut self, id: Index) -> &mut Record {
        &mut self.records[id as usize]
    }

    pub fn namespace(&self, id: Index) -> &Namespace {
        &self.namespaces[id as usize]
    }

    pub fn namespace_mut(&mut self, id: Index) -> &mut Namespace {
        &mut self.namespaces[id as usize]
    }

    /// The module owning a namespace, `NULL_INDEX` if none.
    pub fn module_of(&self, namespace: Index) -> Index {
        self.namespaces[namespace as usize].module
    }

    /// Looks up a declaration by name in a namespace.
    pub fn find_decl(&self, namespace: Index, name: &str) -> Option<Index> {
        self.namespaces[namespace as usize].decls.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_creation() {
        let mut map = SymbolMap::new();
        let ns = map.create_namespace("a", 0, NULL_INDEX, NamespaceKind::File);
        let rec = map.create_record(ns, "X", Vis::Global, 5, 1);

        assert_eq!(map.find_decl(ns, "X"), Some(rec));
        assert_eq!(map.find_decl(ns, "Y"), None);
        assert_eq!(map.record(rec).kir_inst, 5);
        assert_eq!(map.record(rec).status_decl, RecordState::NotAnalyzed);
    }

    #[test]
    fn test_namespace_tree() {
        let mut map = SymbolMap::new();
        let a = map.create_namespace("a", 0, NULL_INDEX, NamespaceKind::File);
        let b = map.create_namespace("b", a, NULL_INDEX, NamespaceKind::File);

        assert_eq!(map.namespace(0).sub_namespaces.get("a"), Some(&a));
        assert_eq!(map.namespace(a).sub_namespaces.get("b"), Some(&b));
        assert_eq!(map.namespace(b).parent, a);
    }

    #[test]
    fn test_decl_order_preserved() {
        let mut map = SymbolMap::new();
        let ns = map.create_namespace("m", 0, NULL_INDEX, NamespaceKind::File);
        for name in ["zeta", "alpha", "mid"] {
            map.create_record(ns, name, Vis::Local, 1, 1);
        }

        let names: Vec<&str> = map
            .namespace(ns)
            .decls
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }
}
