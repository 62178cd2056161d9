//! koc-air - Semantic analysis and the typed IR
//!
//! This crate owns everything downstream of the KIR: the content-
//! addressed intern pool of types and compile-time values, the global
//! symbol table (namespaces and records), the per-declaration sema
//! driver that lowers KIR to AIR with constant folding and overflow
//! checks, and the AIR printer.
//!
//! Analysis is lazy per declaration: a reference pulls in the referenced
//! declaration's signature first, and the tri-state record lattice turns
//! re-entry into a "circular dependency" diagnostic instead of an
//! unbounded recursion.

pub mod inst;
pub mod module;
pub mod pool;
pub mod printer;
pub mod sema;
pub mod symbol;
pub mod types;
pub mod value;

pub use inst::{Air, AirData, AirTag};
pub use module::{Module, ModuleStatus, SemaSlot};
pub use pool::{Pool, PoolKey, TypeValue};
pub use printer::print_air;
pub use sema::AirGen;
pub use symbol::{Namespace, NamespaceKind, Record, RecordState, SymbolMap};

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use koc_util::{SourceFile, NULL_INDEX};

    use crate::module::{Module, ModuleStatus};
    use crate::pool::{self, Pool};
    use crate::sema::AirGen;
    use crate::symbol::{NamespaceKind, RecordState, SymbolMap};

    /// Runs the full front-end pipeline over one in-memory module and
    /// analyzes everything. Module slot 0 is the usual sentinel, so the
    /// module under test has id 1.
    fn analyze_source(src: &str) -> (SymbolMap, Pool, Vec<Module>) {
        let mut map = SymbolMap::new();
        let mut pool = Pool::new();

        let namespace = map.create_namespace("test", 0, 1, NamespaceKind::File);
        let mut module = Module::new(PathBuf::from("test.k"), namespace);

        module.file = SourceFile::new("test.k", src);
        let ast = koc_par::parse(&mut module.file);
        assert_eq!(module.file.error_count(), 0, "parse errors in {:?}", src);

        koc_kir::gen::generate(&mut module.kir, &ast, &mut module.file);
        assert_eq!(module.file.error_count(), 0, "kir errors in {:?}", src);
        module.status = ModuleStatus::Prepared;

        AirGen::prepare_module(&mut map, &mut module, 1);

        let mut modules = vec![Module::default(), module];
        AirGen {
            map: &mut map,
            pool: &mut pool,
            modules: &mut modules,
        }
        .analyze_all();

        (map, pool, modules)
    }

    fn record_of<'a>(
        map: &'a SymbolMap,
        modules: &[Module],
        name: &str,
    ) -> &'a crate::symbol::Record {
        let ns = modules[1].namespace;
        let id = map.find_decl(ns, name).expect("record exists");
        map.record(id)
    }

    #[test]
    fn test_simple_const_resolves() {
        let (map, pool, modules) = analyze_source("const A : u8 = 1;");

        let record = record_of(&map, &modules, "A");
        assert_eq!(record.status_decl, RecordState::Complete);
        assert_eq!(record.status_body, RecordState::Complete);
        assert_eq!(record.ty, pool::U8_KEY_INDEX);

        let tv = pool.type_value_of(record.val);
        assert_eq!(tv.ty, pool::U8_KEY_INDEX);
        assert_eq!(pool.value_at(tv.val), 1);
        assert_eq!(modules[1].file.error_count(), 0);
    }

    #[test]
    fn test_cannot_fit_int() {
        let (map, _, modules) = analyze_source("const X : u8 = 256;");

        assert!(modules[1]
            .file
            .errors()
            .iter()
            .any(|d| d.code == koc_util::diagnostic::codes::CANNOT_FIT_INT));

        let record = record_of(&map, &modules, "X");
        assert_eq!(record.ty, NULL_INDEX, "errored decl has no type");
        assert_eq!(record.status_body, RecordState::Complete);
    }

    #[test]
    fn test_circular_dependency() {
        let (map, _, modules) = analyze_source("const A : u32 = B;\nconst B : u32 = A;");

        let circular: Vec<_> = modules[1]
            .file
            .errors()
            .iter()
            .filter(|d| d.code == koc_util::diagnostic::codes::CIRCULAR_DEPENDENCY)
            .collect();
        assert_eq!(circular.len(), 1, "exactly one circular diagnostic");
        assert_eq!(modules[1].file.error_count(), 1);

        for name in ["A", "B"] {
            let record = record_of(&map, &modules, name);
            assert_eq!(record.status_decl, RecordState::Complete);
            assert_eq!(record.status_body, RecordState::Complete);
            assert_eq!(record.ty, NULL_INDEX, "{} is error-poisoned", name);
        }
    }

    #[test]
    fn test_forward_reference_analyzed_lazily() {
        let (map, pool, modules) = analyze_source("const C : u32 = D;\nconst D : u32 = 4;");

        assert_eq!(modules[1].file.error_count(), 0);

        let c = record_of(&map, &modules, "C");
        assert_eq!(c.ty, pool::U32_KEY_INDEX);
        let tv = pool.type_value_of(c.val);
        assert_eq!(pool.value_at(tv.val), 4);
    }

    #[test]
    fn test_backward_reference_through_namespace() {
        let (map, pool, modules) = analyze_source("const A : u32 = 4;\nconst C : u32 = A;");

        assert_eq!(modules[1].file.error_count(), 0);
        let c = record_of(&map, &modules, "C");
        assert_eq!(c.ty, pool::U32_KEY_INDEX);
        assert_eq!(pool.value_at(pool.type_value_of(c.val).val), 4);
    }

    #[test]
    fn test_constant_folding() {
        let (map, pool, modules) = analyze_source("const E : u32 = 2 + 3 * 4;");

        assert_eq!(modules[1].file.error_count(), 0);
        let e = record_of(&map, &modules, "E");
        assert_eq!(e.ty, pool::U32_KEY_INDEX);
        assert_eq!(pool.value_at(pool.type_value_of(e.val).val), 14);
    }

    #[test]
    fn test_constant_folding_overflow() {
        let (_, _, modules) =
            analyze_source("const F : u64 = 18446744073709551615 + 1;");

        assert!(modules[1]
            .file
            .errors()
            .iter()
            .any(|d| d.code == koc_util::diagnostic::codes::CONST_EVAL_OVERFLOW));
    }

    #[test]
    fn test_division_by_zero() {
        let (_, _, modules) = analyze_source("const G : u32 = 4 / 0;");

        assert!(modules[1]
            .file
            .errors()
            .iter()
            .any(|d| d.code == koc_util::diagnostic::codes::DIVISION_BY_ZERO));
    }

    #[test]
    fn test_unknown_symbol() {
        let (_, _, modules) = analyze_source("const I : u32 = missing;");

        assert!(modules[1]
            .file
            .errors()
            .iter()
            .any(|d| d.code == koc_util::diagnostic::codes::UNKNOWN_SYMBOL));
    }

    #[test]
    fn test_array_length_pulls_in_dependency() {
        // Analyzing C forces A (the array length) through its DeclRef.
        let (map, _, modules) =
            analyze_source("const C : [u32;A] = [10;A];\nconst A : u32 = 4;");

        assert_eq!(modules[1].file.error_count(), 0);
        let a = record_of(&map, &modules, "A");
        assert_eq!(a.status_decl, RecordState::Complete);
        assert_eq!(a.status_body, RecordState::Complete);
    }

    #[test]
    fn test_fn_record_is_not_comptime() {
        let (map, _, modules) = analyze_source("fn f(a : i32) : i32 { return a; }");

        let record = record_of(&map, &modules, "f");
        assert!(!record.is_comptime);
        assert_eq!(record.status_body, RecordState::Complete);
    }

    #[test]
    fn test_air_printer_output() {
        let (map, pool, modules) = analyze_source("const A : u8 = 1;");
        let ns = modules[1].namespace;
        let id = map.find_decl(ns, "A").unwrap();
        let record = map.record(id);

        let decl_idx = modules[1].find_sema(record.kir_inst).unwrap();
        let dump = crate::print_air(&modules[1].airs[decl_idx], &pool, record);

        assert!(dump.contains("air `A` (ty=u8)"), "{}", dump);
        assert!(dump.contains("constant(u8(1))"), "{}", dump);
    }

    #[test]
    fn test_inst_map_index_space() {
        // Two declarations get disjoint KIR ranges; analysis of the
        // second must not touch the first's instructions.
        let (map, pool, modules) =
            analyze_source("const A : u8 = 2;\nconst B : u16 = 300;");

        let a = record_of(&map, &modules, "A");
        let b = record_of(&map, &modules, "B");
        assert_eq!(a.ty, pool::U8_KEY_INDEX);
        assert_eq!(b.ty, pool::U16_KEY_INDEX);
        assert_eq!(pool.value_at(pool.type_value_of(a.val).val), 2);
        assert_eq!(pool.value_at(pool.type_value_of(b.val).val), 300);
    }
}
