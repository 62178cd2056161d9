//! Compiler configuration.
//!
//! The configuration is built once by the CLI and injected into the
//! module manager; nothing in the compiler reads it as ambient state.

use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BuildKind {
    #[default]
    Bin,
    Lib,
    Clib,
    Dylib,
    Cdylib,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Command {
    #[default]
    None,
    Build(BuildKind),
    /// Dump the KIR of a single file without following imports.
    ShowKir,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Target {
    X86,
    #[default]
    X86_64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptLevel {
    #[default]
    O0,
    O1,
    O2,
    Os,
}

#[derive(Clone, Debug, Default)]
pub struct Config {
    pub command: Command,
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    /// `-I` directories, searched after the working directory.
    pub import_paths: Vec<PathBuf>,
    pub working_dir: PathBuf,
    pub target: Target,
    pub optimize: OptLevel,
    pub debug: bool,
    pub test: bool,
    pub color: bool,
}

impl Config {
    /// A build configuration rooted at the input file's directory.
    pub fn build(kind: BuildKind, input: PathBuf) -> Self {
        let working_dir = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            command: Command::Build(kind),
            input,
            working_dir,
            color: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_working_dir_from_input() {
        let config = Config::build(BuildKind::Bin, PathBuf::from("src/main.k"));
        assert_eq!(config.working_dir, PathBuf::from("src"));

        let config = Config::build(BuildKind::Bin, PathBuf::from("main.k"));
        assert_eq!(config.working_dir, PathBuf::from("."));
    }
}
