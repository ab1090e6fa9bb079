//! File-system illusions for the declaration pipeline.
//!
//! The type checker and the declaration merge pass each need a different
//! view of "the filesystem": one where virtual files and freshly
//! generated code shadow what is on disk, and one fully sandboxed view
//! that serves nothing but declaration outputs. Rather than a universal
//! virtual-filesystem abstraction, both views share one narrow interface,
//! [`FileAccess`], and differ only in fallback wiring.

use std::fs;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::pattern::normalize_lexical;

// =============================================================================
// FileAccess
// =============================================================================

/// The narrow file-system contract handed to external compile passes.
///
/// `write` captures compiler outputs in memory; nothing an external pass
/// does through this interface touches the real filesystem.
pub trait FileAccess {
    /// Whether a file exists in this view.
    fn exists(&self, path: &Path) -> bool;

    /// Read a file's content from this view, if present.
    fn read(&self, path: &Path) -> Option<String>;

    /// Capture an output file into this view.
    fn write(&mut self, path: &Path, contents: String);
}

// =============================================================================
// OverlayFs
// =============================================================================

/// An in-memory file map with configurable real-filesystem fallthrough.
///
/// With fallthrough enabled this is the type-check host's view: seeded
/// virtual files and the in-memory generated source take priority, and
/// everything else (hand-written siblings, library declarations) comes
/// from disk. Without fallthrough it is the merge pass's sandbox: only
/// seeded and written entries exist.
#[derive(Default, Clone)]
pub struct OverlayFs {
    files: FxHashMap<PathBuf, String>,
    fallthrough: bool,
}

impl OverlayFs {
    /// Create an overlay that falls through to the real filesystem for
    /// paths it does not know.
    pub fn with_fallthrough() -> Self {
        Self {
            files: FxHashMap::default(),
            fallthrough: true,
        }
    }

    /// Create a fully sandboxed view with no disk access.
    pub fn sandbox() -> Self {
        Self::default()
    }

    /// Re-wire this view as a sandbox, keeping its contents.
    pub fn into_sandbox(mut self) -> Self {
        self.fallthrough = false;
        self
    }

    /// Seed the view with a file. Paths are normalized so later lookups
    /// under an equivalent spelling hit the same entry.
    pub fn seed(&mut self, path: &Path, contents: impl Into<String>) {
        self.files.insert(normalize_lexical(path), contents.into());
    }

    /// Get an in-memory entry without consulting the disk.
    pub fn get(&self, path: &Path) -> Option<&str> {
        self.files.get(&normalize_lexical(path)).map(String::as_str)
    }

    /// Iterate over all in-memory entries.
    pub fn entries(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.files.iter().map(|(p, c)| (p.as_path(), c.as_str()))
    }

    /// Number of in-memory entries.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the view holds no in-memory entries.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FileAccess for OverlayFs {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(&normalize_lexical(path)) || (self.fallthrough && path.is_file())
    }

    fn read(&self, path: &Path) -> Option<String> {
        if let Some(contents) = self.files.get(&normalize_lexical(path)) {
            return Some(contents.clone());
        }
        if self.fallthrough {
            fs::read_to_string(path).ok()
        } else {
            None
        }
    }

    fn write(&mut self, path: &Path, contents: String) {
        self.files.insert(normalize_lexical(path), contents);
    }
}
