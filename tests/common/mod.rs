//! Common test utilities

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A temporary workspace holding a document and a rules directory
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Workspace {
            dir: TempDir::new().unwrap(),
        }
    }

    /// Write the document under test and return its path
    pub fn write_document(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    /// Write a rule into the workspace's rules directory
    pub fn write_rule(&self, identifier: &str, content: &str) -> PathBuf {
        let rules = self.rules_dir();
        fs::create_dir_all(&rules).unwrap();
        let path = rules.join(format!("{identifier}.yaml"));
        fs::write(&path, content).unwrap();
        path
    }

    pub fn rules_dir(&self) -> PathBuf {
        self.dir.path().join("rules")
    }

    /// Count lines of a marker file commands append to
    pub fn count_lines(&self, name: &str) -> usize {
        match fs::read_to_string(self.dir.path().join(name)) {
            Ok(contents) => contents.lines().count(),
            Err(_) => 0,
        }
    }
}

/// A rule whose single command appends one line to passes.txt
pub const APPEND_RULE: &str = r#"
identifier: append
name: Append
commands:
  - command: "'echo pass >> passes.txt'"
arguments: []
"#;
