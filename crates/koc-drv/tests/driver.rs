//! Module manager integration tests over real temporary directories.

use std::fs;
use std::path::Path;

use koc_air::ModuleStatus;
use koc_drv::{BuildKind, Config, ModuleManager};
use tempfile::TempDir;

fn write_file(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn manager_for(dir: &TempDir, entry: &str) -> ModuleManager {
    let config = Config::build(BuildKind::Bin, dir.path().join(entry));
    ModuleManager::new(config)
}

#[test]
fn test_single_file_project() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.k", "const A : u8 = 1;\nconst B : u32 = A + 2;\n");

    let manager = manager_for(&dir, "main.k");
    let entry = manager.gen_kir().expect("entry resolves");
    manager.gen_air();

    assert!(!manager.has_errors());
    manager.with_state(|state| {
        assert_eq!(state.modules[entry as usize].status, ModuleStatus::Prepared);
        // Two records plus the sentinel.
        let ns = state.modules[entry as usize].namespace;
        assert_eq!(state.map.namespace(ns).decls.len(), 2);
    });
}

#[test]
fn test_imports_are_followed() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.k", "import util;\nconst A : u8 = 1;\n");
    write_file(dir.path(), "util.k", "const U : u8 = 2;\n");

    let manager = manager_for(&dir, "main.k");
    let entry = manager.gen_kir().expect("entry resolves");
    manager.gen_air();

    assert!(!manager.has_errors());
    manager.with_state(|state| {
        // Sentinel + main + util.
        assert_eq!(state.modules.len(), 3);
        assert_eq!(state.modules[entry as usize].imports.len(), 1);
        let imported = state.modules[entry as usize].imports[0];
        assert_eq!(state.modules[imported as usize].status, ModuleStatus::Prepared);
    });
}

#[test]
fn test_directory_module_resolution() {
    // `import a` resolves to a/mod.k when a is a directory.
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.k", "import a;\nconst M : u8 = 1;\n");
    write_file(dir.path(), "a/mod.k", "const InA : u8 = 1;\n");

    let manager = manager_for(&dir, "main.k");
    let entry = manager.gen_kir().expect("entry resolves");

    assert!(!manager.has_errors());
    manager.with_state(|state| {
        assert_eq!(state.modules[entry as usize].imports.len(), 1);
        let imported = state.modules[entry as usize].imports[0];
        assert!(state.modules[imported as usize]
            .system_path
            .ends_with("a/mod.k"));
    });
}

#[test]
fn test_nested_import_paths() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.k", "import a::b;\nconst M : u8 = 1;\n");
    write_file(dir.path(), "a/b.k", "const InB : u8 = 1;\n");

    let manager = manager_for(&dir, "main.k");
    let entry = manager.gen_kir().expect("entry resolves");

    assert!(!manager.has_errors());
    manager.with_state(|state| {
        assert_eq!(state.modules[entry as usize].imports.len(), 1);
    });
}

#[test]
fn test_transitive_imports() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.k", "import a;\nconst M : u8 = 1;\n");
    write_file(dir.path(), "a.k", "import b;\nconst A : u8 = 1;\n");
    write_file(dir.path(), "b.k", "const B : u8 = 1;\n");

    let manager = manager_for(&dir, "main.k");
    manager.gen_kir().expect("entry resolves");

    assert!(!manager.has_errors());
    manager.with_state(|state| {
        // Sentinel + three modules, all prepared.
        assert_eq!(state.modules.len(), 4);
        assert!(state
            .modules
            .iter()
            .skip(1)
            .all(|m| m.status == ModuleStatus::Prepared));
    });
}

#[test]
fn test_missing_import_is_nonfatal() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.k", "import nowhere;\nconst A : u8 = 1;\n");

    let manager = manager_for(&dir, "main.k");
    let entry = manager.gen_kir().expect("entry resolves");
    manager.gen_air();

    // The import failure is reported but the module still compiles.
    manager.with_state(|state| {
        assert_eq!(state.modules[entry as usize].status, ModuleStatus::Prepared);
        assert!(state.modules[entry as usize]
            .file
            .errors()
            .iter()
            .any(|d| d.code == koc_util::diagnostic::codes::UNKNOWN_IMPORT));
    });
    assert!(manager.has_errors());
}

#[test]
fn test_self_import_is_reported() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.k", "import main;\nconst A : u8 = 1;\n");

    let manager = manager_for(&dir, "main.k");
    let entry = manager.gen_kir().expect("entry resolves");

    manager.with_state(|state| {
        assert_eq!(state.modules[entry as usize].status, ModuleStatus::Prepared);
        assert!(state.modules[entry as usize]
            .file
            .errors()
            .iter()
            .any(|d| d.code == koc_util::diagnostic::codes::SELF_IMPORT));
    });
}

#[test]
fn test_parse_error_marks_module() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.k", "const A u8 = 1;\n");

    let manager = manager_for(&dir, "main.k");
    let entry = manager.gen_kir().expect("entry resolves");

    manager.with_state(|state| {
        assert_eq!(state.modules[entry as usize].status, ModuleStatus::Error);
    });
    assert!(manager.has_errors());
}

#[test]
fn test_import_dedup() {
    // Two files importing the same module share one instance.
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "main.k", "import a;\nimport b;\nconst M : u8 = 1;\n");
    write_file(dir.path(), "a.k", "import shared;\nconst A : u8 = 1;\n");
    write_file(dir.path(), "b.k", "import shared;\nconst B : u8 = 1;\n");
    write_file(dir.path(), "shared.k", "const S : u8 = 1;\n");

    let manager = manager_for(&dir, "main.k");
    manager.gen_kir().expect("entry resolves");

    assert!(!manager.has_errors());
    manager.with_state(|state| {
        // Sentinel + main + a + b + shared, not five plus a duplicate.
        assert_eq!(state.modules.len(), 5);
    });
}

#[test]
fn test_sema_runs_across_modules() {
    let dir = TempDir::new().unwrap();
    write_file(
        dir.path(),
        "main.k",
        "const A : u32 = B;\nconst B : u32 = 4;\n",
    );

    let manager = manager_for(&dir, "main.k");
    let entry = manager.gen_kir().expect("entry resolves");
    manager.gen_air();

    assert!(!manager.has_errors());
    manager.with_state(|state| {
        let ns = state.modules[entry as usize].namespace;
        let a = state.map.find_decl(ns, "A").unwrap();
        assert_eq!(
            state.map.record(a).ty,
            koc_air::pool::U32_KEY_INDEX
        );
    });
}
