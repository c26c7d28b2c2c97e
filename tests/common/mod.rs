//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Manifest served from the seeded session cache so tests stay offline.
pub const CONTENT_JSON: &str = r#"{
  "CDS": {
    "model-files": ["cds-model.yml", "cds-model-props.yml", "cds-cde-map.json"],
    "readme-file": "README.md",
    "current-version": "6.0.2",
    "release-notes": "release-notes.md",
    "versions": ["6.0.2", "5.0.4"],
    "model-navigator-logo": "cds-logo.png",
    "model-navigator-config": {
      "facetFilterSearchData": [
        {"groupName": "Category", "datafield": "category", "checkboxItems": [{"name": "Study"}, {"name": "Case"}]},
        {"groupName": "Inclusion", "checkboxItems": [{"name": "Required"}]}
      ]
    }
  }
}"#;

/// Temporary workspace with a session directory and input files.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    pub fn session_dir(&self) -> PathBuf {
        self.path("session")
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent directory");
        }
        std::fs::write(&path, contents.as_bytes()).expect("write file");
        path
    }

    /// Seed the session cache the way a prior `cdex manifest` would have.
    pub fn seed_manifest(&self) {
        self.write("session/manifest.cache", CONTENT_JSON);
    }

    /// Run `cdex` against this workspace's session dir with an unreachable repo.
    pub fn cdex(&self, args: &[&str]) -> Output {
        let mut command = Command::new(env!("CARGO_BIN_EXE_cdex"));
        command
            .arg("--session-dir")
            .arg(self.session_dir())
            .args(["--repo-root", "http://127.0.0.1:9", "--timeout", "2"])
            .args(args)
            .env_remove("CDEX_REPO_ROOT")
            .env_remove("CDEX_TIER")
            .env_remove("CDEX_SESSION_DIR")
            .env("RUST_LOG", "info");
        command.output().expect("run cdex")
    }
}

pub fn stdout_json(output: &Output) -> serde_json::Value {
    assert!(
        output.status.success(),
        "cdex failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("parse stdout JSON")
}

#[allow(dead_code)]
pub fn read_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("read JSON file");
    serde_json::from_str(&content).expect("parse JSON file")
}
