//! Host bundler capability contract.
//!
//! The subsystem never talks to a concrete bundler. Everything it needs
//! (resolving a specifier, watching a file, emitting a chunk, structured
//! reporting) goes through [`HostContext`], implemented by the embedding
//! application and by in-process fakes in the test suite.
//!
//! Fatal errors do not flow through a reporting method: hook entry points
//! return `Result`, and the host maps the `Err` arm onto its own
//! abort-the-build channel. That is the Rust rendering of a bundler
//! context whose `error()` never returns.

use std::path::Path;

use crate::error::Result;
use crate::registry::SideEffects;
use crate::token::Token;

// =============================================================================
// HostContext
// =============================================================================

/// Capabilities the host bundler provides to the subsystem.
pub trait HostContext {
    /// Resolve `source` against the host's module resolution, optionally
    /// relative to `importer`. Returns the resolved module id, or `None`
    /// when the host cannot resolve it.
    fn resolve(&self, source: &str, importer: Option<&str>) -> Result<Option<String>>;

    /// Register `path` as a build dependency; edits to it trigger a
    /// rebuild in watch mode.
    fn add_watch_file(&self, path: &Path);

    /// Ask the host to emit an independent output chunk for a registered
    /// virtual file. Returns the host's reference id for the chunk.
    fn emit_chunk(&self, chunk: &ChunkSpec<'_>) -> Result<String>;

    /// Report a warning.
    fn warn(&self, message: &str);

    /// Report an informational message.
    fn info(&self, message: &str);

    /// Report a debug-level message.
    fn debug(&self, message: &str);

    /// Whether this build runs in watch mode.
    fn watch_mode(&self) -> bool;
}

/// Arguments for [`HostContext::emit_chunk`].
#[derive(Debug, Clone, Copy)]
pub struct ChunkSpec<'a> {
    /// The virtual file's token, used as the chunk's entry specifier.
    pub id: &'a str,
    /// The generating file that emitted the chunk.
    pub importer: &'a Path,
    /// Optional human-readable chunk name hint.
    pub name: Option<&'a str>,
}

// =============================================================================
// Hook outputs
// =============================================================================

/// Opaque metadata attached to a resolution so the matching load hook can
/// recognize the module without re-running matching logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleMeta {
    /// The module is a generating file; carries the resolved specifier
    /// with any query fragment preserved.
    Generator {
        /// Resolved source specifier, query fragment included.
        resolved_source: String,
    },
    /// The module is a registry-owned virtual file.
    Virtual {
        /// The registry key it was resolved under.
        token: Token,
    },
}

/// Output of a resolve hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The resolved module id the host should use.
    pub id: String,
    /// Side-effect flag forwarded to the host's module metadata.
    pub side_effects: SideEffects,
    /// Tag for the matching load hook.
    pub meta: ModuleMeta,
}

/// Output of a load hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    /// Module source text.
    pub code: String,
    /// Side-effect flag for the module.
    pub side_effects: SideEffects,
}
