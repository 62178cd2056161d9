//! koc-drv - Compiler Driver
//!
//! The module manager owns the global symbol map, the intern pool, the
//! module table, and a thread pool. KIR generation runs as one parallel
//! job per file: the job reads the file, tokenizes, parses, and lowers
//! it, then enqueues the imports it discovered. A single mutex guards
//! the shared state across lookup, insert, and enqueue, so module
//! resolution is race-free. Sema runs single-threaded after the pool
//! has drained.

pub mod config;
pub mod error;
pub mod thread_pool;

pub use config::{BuildKind, Command, Config, OptLevel, Target};
pub use error::{DriverError, Result};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use koc_air::{AirGen, Module, ModuleStatus, NamespaceKind, Pool, SymbolMap};
use koc_kir::Kir;
use koc_util::diagnostic::{codes, Diagnostic};
use koc_util::{is_null, FxHashMap, Index, SourceFile, NULL_INDEX};

use thread_pool::{PoolHandle, ThreadPool};

/// Everything the parallel jobs share.
pub struct Shared {
    pub config: Config,
    include_paths: Vec<PathBuf>,
    pub state: Mutex<CompState>,
}

/// The mutable compilation state: module table, symbol map, intern
/// pool. Guarded by one mutex for the whole resolve-insert-enqueue
/// sequence.
pub struct CompState {
    pub map: SymbolMap,
    pub pool: Pool,
    /// Module slot 0 is a sentinel so module ids never collide with
    /// `NULL_INDEX`.
    pub modules: Vec<Module>,
    /// Canonical path to module id; diamond imports reuse one module no
    /// matter which namespace discovered them.
    path_index: FxHashMap<PathBuf, Index>,
}

impl CompState {
    fn new() -> Self {
        Self {
            map: SymbolMap::new(),
            pool: Pool::new(),
            modules: vec![Module::default()],
            path_index: FxHashMap::default(),
        }
    }
}

pub struct ModuleManager {
    shared: Arc<Shared>,
    pool: ThreadPool,
}

impl ModuleManager {
    pub fn new(config: Config) -> Self {
        let mut include_paths = vec![config.working_dir.clone()];
        include_paths.extend(config.import_paths.iter().cloned());

        Self {
            shared: Arc::new(Shared {
                config,
                include_paths,
                state: Mutex::new(CompState::new()),
            }),
            pool: ThreadPool::with_default_size(),
        }
    }

    /// Creates the entry module, runs the parallel KIR pipeline over it
    /// and everything it transitively imports, and waits for
    /// quiescence. Returns the entry module id.
    pub fn gen_kir(&self) -> Option<Index> {
        let stem = self.shared.config.input.file_stem()?.to_string_lossy().into_owned();

        let entry = get_or_add_file(&self.shared, &self.pool.handle(), &stem, NULL_INDEX);
        self.pool.wait();
        entry
    }

    /// Runs a single file through the KIR pipeline without following
    /// its imports, for the `kir` subcommand.
    pub fn kir_single_file(&self) -> Index {
        let module_id = {
            let mut state = self.shared.state.lock();
            let id = push_module(
                &mut state,
                self.shared.config.input.clone(),
                NULL_INDEX,
            );
            state.modules[id as usize].status = ModuleStatus::InProgress;
            state.modules[id as usize].file.path =
                self.shared.config.input.display().to_string();
            id
        };

        kir_job(&self.shared, None, module_id);
        module_id
    }

    /// Analyzes every declaration of every module. Must run after
    /// [`ModuleManager::gen_kir`] has returned; by then no further KIR
    /// writes occur.
    pub fn gen_air(&self) {
        let mut state = self.shared.state.lock();
        let CompState {
            map,
            pool,
            modules,
            ..
        } = &mut *state;

        debug!(modules = modules.len() - 1, "starting sema");
        AirGen {
            map,
            pool,
            modules,
        }
        .analyze_all();
    }

    /// True if any module failed or any error diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        let state = self.shared.state.lock();
        state
            .modules
            .iter()
            .any(|m| m.status == ModuleStatus::Error || m.file.has_errors())
    }

    /// Prints all diagnostics, grouped per file, errors before warnings
    /// before notes.
    pub fn print_diagnostics(&self, out: &mut impl Write) -> std::io::Result<()> {
        let state = self.shared.state.lock();
        for module in state.modules.iter().skip(1) {
            module.file.print_diagnostics(out)?;
        }
        Ok(())
    }

    /// Read access to the compilation state, for reporting and tests.
    pub fn with_state<R>(&self, f: impl FnOnce(&CompState) -> R) -> R {
        f(&self.shared.state.lock())
    }
}

fn push_module(state: &mut CompState, system_path: PathBuf, namespace: Index) -> Index {
    let id = state.modules.len() as Index;
    state.modules.push(Module::new(system_path, namespace));
    id
}

/// Creates a module for a file, or returns the one already created for
/// the same canonical path.
fn intern_module(
    state: &mut CompState,
    system_path: PathBuf,
    namespace: Index,
    display_path: &Path,
) -> Index {
    let canonical = fs::canonicalize(&system_path).unwrap_or_else(|_| system_path.clone());
    if let Some(&existing) = state.path_index.get(&canonical) {
        return existing;
    }

    let id = push_module(state, system_path, namespace);
    state.modules[id as usize].file.path = display_path.display().to_string();
    state.path_index.insert(canonical, id);
    id
}

/// Resolves `filepath_without_ext` against one search root, creating
/// the namespace chain and the module slot on the way. Prefers
/// `<path>/mod.k` when the path is a directory, `<path>.k` otherwise.
fn create_module_with_namespace(
    state: &mut CompState,
    namespace_index: Index,
    filepath_without_ext: &Path,
    search_path: &Path,
) -> Option<Index> {
    let filepath = if search_path.join(filepath_without_ext).is_dir() {
        filepath_without_ext.join("mod.k")
    } else {
        filepath_without_ext.with_extension("k")
    };

    if !search_path.join(&filepath).is_file() {
        return None;
    }

    let mut curr_namespace = namespace_index;
    let mut curr_path = search_path.to_path_buf();
    let mut module_id = NULL_INDEX;

    for part in filepath.iter() {
        curr_path.push(part);
        let part_str = part.to_string_lossy();

        // `mod.k` belongs to the directory namespace itself.
        if part_str == "mod.k" {
            module_id = state.map.module_of(curr_namespace);
            if is_null(module_id) {
                module_id = intern_module(state, curr_path.clone(), curr_namespace, &filepath);
                state.map.namespace_mut(curr_namespace).module = module_id;
            }
            break;
        }

        let stem = Path::new(part)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| part_str.into_owned());
        let has_extension = Path::new(part).extension().is_some();

        let found = state
            .map
            .namespace(curr_namespace)
            .sub_namespaces
            .get(&stem)
            .copied();

        match found {
            Some(existing) => {
                curr_namespace = existing;
                if has_extension {
                    module_id = state.map.module_of(curr_namespace);
                }
            }
            None => {
                let parent = curr_namespace;
                curr_namespace =
                    state
                        .map
                        .create_namespace(&stem, parent, NULL_INDEX, NamespaceKind::File);

                if has_extension {
                    module_id = intern_module(state, curr_path.clone(), curr_namespace, &filepath);
                    state.map.namespace_mut(curr_namespace).module = module_id;
                }
            }
        }
    }

    if is_null(module_id) {
        None
    } else {
        Some(module_id)
    }
}

/// Resolves an import path to a module, creating and enqueueing it on
/// first sight. The search order is the importing namespace's own
/// directory, then each include path.
pub fn get_or_add_file(
    shared: &Arc<Shared>,
    pool: &PoolHandle,
    filepath_raw: &str,
    namespace_index: Index,
) -> Option<Index> {
    let mut state = shared.state.lock();
    let filepath_without_ext = PathBuf::from(filepath_raw);

    let mut module_id = None;

    // Search the importing module's own directory first.
    let parent_mod = state.map.module_of(namespace_index);
    if !is_null(parent_mod) {
        let parent_dir = state.modules[parent_mod as usize]
            .system_path
            .parent()
            .map(Path::to_path_buf);
        if let Some(dir) = parent_dir {
            module_id =
                create_module_with_namespace(&mut state, namespace_index, &filepath_without_ext, &dir);
        }
    }

    if module_id.is_none() {
        for path in &shared.include_paths {
            module_id = create_module_with_namespace(
                &mut state,
                NULL_INDEX,
                &filepath_without_ext,
                path,
            );
            if module_id.is_some() {
                break;
            }
        }
    }

    let module_id = module_id?;

    if state.modules[module_id as usize].status == ModuleStatus::NotLoaded {
        state.modules[module_id as usize].status = ModuleStatus::InProgress;

        let shared = shared.clone();
        let nested = pool.clone();
        pool.spawn(move || kir_job(&shared, Some(&nested), module_id));
    }

    Some(module_id)
}

/// The per-file job: read, tokenize, parse, lower to KIR, pre-create
/// the sema slots, and enqueue the file's imports. Without a pool
/// handle, imports are not followed (single-file mode).
pub fn kir_job(shared: &Arc<Shared>, pool: Option<&PoolHandle>, module_id: Index) {
    let path = {
        shared.state.lock().modules[module_id as usize]
            .system_path
            .clone()
    };
    debug!(path = %path.display(), "kir job");

    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read module");
            let mut state = shared.state.lock();
            state.modules[module_id as usize].status = ModuleStatus::NotExists;
            return;
        }
    };

    let display_path = {
        let state = shared.state.lock();
        let known = &state.modules[module_id as usize].file.path;
        if known.is_empty() {
            path.display().to_string()
        } else {
            known.clone()
        }
    };

    let mut file = SourceFile::new(display_path, content);
    let ast = koc_par::parse(&mut file);

    // A parser failure aborts the file before lowering.
    if file.has_errors() {
        let mut state = shared.state.lock();
        let module = &mut state.modules[module_id as usize];
        module.file = file;
        module.status = ModuleStatus::Error;
        return;
    }

    let mut kir = Kir::new();
    koc_kir::gen::generate(&mut kir, &ast, &mut file);
    drop(ast);

    let imports: Vec<String> = kir.imports.iter().map(|id| kir.str(*id).to_owned()).collect();

    let namespace = {
        let mut state = shared.state.lock();
        let module = &mut state.modules[module_id as usize];
        module.file = file;
        module.kir = kir;
        module.status = ModuleStatus::Prepared;

        let namespace = module.namespace;

        let CompState { map, modules, .. } = &mut *state;
        AirGen::prepare_module(map, &mut modules[module_id as usize], module_id);
        namespace
    };

    // Single-file mode stops before import resolution.
    let Some(pool) = pool else {
        return;
    };

    for import in imports {
        match get_or_add_file(shared, pool, &import, namespace) {
            None => {
                let mut state = shared.state.lock();
                state.modules[module_id as usize].file.add(Diagnostic::error(
                    codes::UNKNOWN_IMPORT,
                    format!("Module not found \"{}\"", import),
                ));
            }
            Some(imported) if imported == module_id => {
                let mut state = shared.state.lock();
                state.modules[module_id as usize].file.add(Diagnostic::error(
                    codes::SELF_IMPORT,
                    format!("A module cannot import itself: \"{}\"", import),
                ));
            }
            Some(imported) => {
                let mut state = shared.state.lock();
                state.modules[module_id as usize].imports.push(imported);
            }
        }
    }
}
