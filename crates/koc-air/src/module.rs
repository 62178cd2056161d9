//! Modules: one source file with its KIR, per-declaration AIRs, and
//! namespace slot.

use std::path::PathBuf;

use koc_kir::Kir;
use koc_util::{Index, SourceFile, NULL_INDEX};

use crate::inst::Air;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModuleStatus {
    #[default]
    NotLoaded,
    InProgress,
    Prepared,
    Done,
    NotExists,
    Error,
}

/// Analysis bookkeeping for one top-level declaration: the KIR range it
/// owns and the record standing for it.
#[derive(Clone, Copy, Debug)]
pub struct SemaSlot {
    /// The declaration's KIR instruction.
    pub kir_inst: Index,
    /// Number of instructions in `[kir_inst - inst_count, kir_inst)`.
    pub inst_count: Index,
    /// Record id in the symbol map.
    pub record: Index,
}

/// A single source file under compilation.
#[derive(Debug, Default)]
pub struct Module {
    pub status: ModuleStatus,
    /// Resolved filesystem path.
    pub system_path: PathBuf,
    pub file: SourceFile,

    /// The namespace this module resides in.
    pub namespace: Index,
    /// Module ids of followed imports.
    pub imports: Vec<Index>,

    /// One Air per top-level declaration, parallel to `semas`.
    pub airs: Vec<Air>,
    pub semas: Vec<SemaSlot>,

    pub kir: Kir,
}

impl Module {
    pub fn new(system_path: PathBuf, namespace: Index) -> Self {
        Self {
            status: ModuleStatus::NotLoaded,
            system_path,
            file: SourceFile::default(),
            namespace,
            imports: Vec::new(),
            airs: Vec::new(),
            semas: Vec::new(),
            kir: Kir::default(),
        }
    }

    /// Finds the sema slot owning a declaration instruction. Slots are
    /// sorted by `kir_inst`, so this is a binary search.
    pub fn find_sema(&self, kir_inst: Index) -> Option<usize> {
        self.semas
            .binary_search_by_key(&kir_inst, |slot| slot.kir_inst)
            .ok()
    }

    /// Record id for a declaration instruction.
    pub fn record_of(&self, kir_inst: Index) -> Index {
        self.find_sema(kir_inst)
            .map_or(NULL_INDEX, |slot| self.semas[slot].record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_sema() {
        let mut module = Module::new(PathBuf::from("a.k"), 1);
        for (kir_inst, record) in [(4, 1), (9, 2), (15, 3)] {
            module.semas.push(SemaSlot {
                kir_inst,
                inst_count: 0,
                record,
            });
        }

        assert_eq!(module.find_sema(9), Some(1));
        assert_eq!(module.find_sema(4), Some(0));
        assert_eq!(module.find_sema(5), None);
        assert_eq!(module.record_of(15), 3);
        assert_eq!(module.record_of(2), NULL_INDEX);
    }
}
