//! Session-scoped string cache.
//!
//! The manifest and release notes are fetched at most once per session. The
//! cache is an injected trait so the CLI can persist entries in a directory
//! while tests run against an in-memory map.
use anyhow::{Context, Result};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Well-known key holding the raw `content.json` body.
pub const MANIFEST_KEY: &str = "manifest";
/// Key prefix for cached release notes (`releaseNotes:<model>:<version>`).
pub const RELEASE_NOTES_KEY: &str = "releaseNotes";

/// String-keyed get/set/clear surface scoped to one session.
pub trait SessionCache {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Drop every entry; called on session teardown, never by the fetch path.
    fn clear(&self) -> Result<()>;
}

/// In-process cache; the session ends when the value is dropped.
#[derive(Debug, Default)]
pub struct MemorySessionCache {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionCache for MemorySessionCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries.borrow_mut().clear();
        Ok(())
    }
}

/// Escape a key into a file name: ASCII alphanumerics, `-` and `.` pass
/// through, every other byte (including `_`) becomes `_XX` hex, so distinct
/// keys never share a file.
fn encode_key(key: &str) -> String {
    let mut name = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("_{byte:02X}"));
        }
    }
    name
}

/// Directory-backed cache so separate CLI invocations share one session.
///
/// Each key is stored as `<dir>/<sanitized key>.cache`.
#[derive(Debug, Clone)]
pub struct FileSessionCache {
    dir: PathBuf,
}

impl FileSessionCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.cache", encode_key(key)))
    }
}

impl SessionCache for FileSessionCache {
    fn get(&self, key: &str) -> Option<String> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => None,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "session cache read failed");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("create session dir {}", self.dir.display()))?;
        let path = self.entry_path(key);
        // Write then rename so a reader never sees a half-written entry.
        let tmp = path.with_extension("cache.tmp");
        fs::write(&tmp, value.as_bytes()).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("publish {}", path.display()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if !self.dir.exists() {
            return Ok(());
        }
        for entry in
            fs::read_dir(&self.dir).with_context(|| format!("read {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "cache") {
                fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
            }
        }
        Ok(())
    }
}
