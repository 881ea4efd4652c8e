//! Common test utilities for docpack integration tests

#![allow(dead_code)]

use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// Temporary project directory with markdown fixtures
pub struct TestWorkspace {
    #[allow(dead_code)]
    pub temp: TempDir,
    pub path: PathBuf,
}

impl TestWorkspace {
    /// Create a new empty project directory
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let path = dunce::canonicalize(temp.path()).expect("Failed to canonicalize temp path");
        Self { temp, path }
    }

    /// Write a file relative to the project root, creating parent directories
    pub fn write_file(&self, path: &str, content: &str) {
        let full_path = self.path.join(path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
    }

    /// Read a file relative to the project root
    pub fn read_file(&self, path: &str) -> String {
        std::fs::read_to_string(self.path.join(path)).expect("Failed to read file")
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.path.join(path).exists()
    }

    /// A small documentation tree:
    ///
    /// guide.md -> docs/setup.md -> docs/deep/internals.md -> docs/deep/more.md
    /// guide.md -> README.md
    /// guide.md -> img/logo.png
    pub fn with_docs(self) -> Self {
        self.write_file(
            "guide.md",
            "---\ntitle: Guide\ndescription: How to get going\n---\n\n# Guide\n\n\
             Start with [setup](docs/setup.md) and the [readme](README.md).\n\n\
             ![logo](img/logo.png)\n",
        );
        self.write_file(
            "docs/setup.md",
            "# Setup\n\nSee [internals](deep/internals.md) and [home](../guide.md).\n",
        );
        self.write_file(
            "docs/deep/internals.md",
            "# Internals\n\nEven [more](more.md).\n",
        );
        self.write_file("docs/deep/more.md", "# More\n");
        self.write_file("README.md", "# Readme\n");
        self.write_file("img/logo.png", "png");
        self
    }

    /// docpack invocation rooted in this workspace
    pub fn docpack(&self) -> Command {
        let mut cmd = docpack_cmd();
        cmd.current_dir(&self.path);
        cmd
    }
}

impl Default for TestWorkspace {
    fn default() -> Self {
        Self::new()
    }
}

/// Path to the compiled docpack binary
pub fn docpack_bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_docpack"))
}

/// docpack command with logging filters from the environment removed
pub fn docpack_cmd() -> Command {
    let mut cmd = Command::new(docpack_bin());
    cmd.env_remove("RUST_LOG");
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_creation() {
        let workspace = TestWorkspace::new();
        assert!(workspace.path.exists());
    }

    #[test]
    fn test_workspace_file_operations() {
        let workspace = TestWorkspace::new();
        workspace.write_file("test/file.md", "hello");
        assert!(workspace.file_exists("test/file.md"));
        assert_eq!(workspace.read_file("test/file.md"), "hello");
    }
}
