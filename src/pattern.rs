//! Generator-file naming convention and owner identity.
//!
//! A generating file is recognized by its name: the `.gen` marker
//! immediately before a recognized source extension, optionally followed
//! by a `?`/`&` query fragment used for cache busting or resolution
//! disambiguation. Query fragments are stripped before any filesystem or
//! cache-key operation, but preserved through resolution so the host
//! bundler's de-duplication by specifier still works.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

/// Matches a generating file: `.gen` marker, then one of the supported
/// source extension spellings, then an optional trailing query fragment.
static INCLUDE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.gen\.[mc]?[jt]sx?([&?].+)?$").unwrap());

/// Matches a trailing query fragment.
static QUERY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[?&][^.]*$").unwrap());

/// Matches any recognizable trailing extension.
static EXTENSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.[^?/\\.&]+$").unwrap());

/// Matches the source extension a declaration path is derived from.
static SOURCE_EXT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.[mc]?[jt]sx?$").unwrap());

/// Suffix of the on-disk declaration artifact. Composite on purpose: it
/// cannot collide with a hand-authored `.d.ts` for the same base name.
pub const ARTIFACT_SUFFIX: &str = "&gen.d.ts";

/// Whether `path` names a generating file.
pub fn is_generator_path(path: &str) -> bool {
    INCLUDE.is_match(path)
}

/// Strip a trailing query fragment, returning the prefix.
pub fn strip_query(path: &str) -> &str {
    match QUERY.find(path) {
        Some(m) => &path[..m.start()],
        None => path,
    }
}

/// Whether the path ends in a recognizable extension. Resolution only
/// re-attaches a stripped query fragment when this holds.
pub fn has_extension(path: &str) -> bool {
    EXTENSION.is_match(path)
}

/// The owner identity of a (possibly query-suffixed) resolved id: query
/// stripped, path lexically normalized. All registry and cache lookups
/// key off this form.
pub fn owner_identity(id: &str) -> PathBuf {
    normalize_lexical(Path::new(strip_query(id)))
}

/// Swap the source extension for `.d.ts`, the compiler's declaration
/// output naming.
pub fn to_decl_path(path: &str) -> String {
    SOURCE_EXT.replace(path, ".d.ts").into_owned()
}

/// Swap the source extension for the sibling artifact suffix.
pub fn to_artifact_path(path: &str) -> String {
    SOURCE_EXT.replace(path, ARTIFACT_SUFFIX).into_owned()
}

/// Normalize a path lexically: resolve `.` and `..` components without
/// touching the filesystem. Virtual paths never exist on disk, so
/// `canonicalize` is not an option; lexical form is enough because every
/// path flowing through the subsystem is derived from one resolved owner
/// path.
pub fn normalize_lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
