//! Crate error type.
//!
//! Every fatal condition in the subsystem surfaces as one [`Error`] value
//! propagated out of a hook entry point; the embedding host routes it into
//! its own abort channel. Non-fatal conditions (a missing declaration
//! output, a stale cache entry) never appear here; they are reported
//! through the host's `warn`/`debug` channels and handled in place.

use std::path::PathBuf;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for generation, caching, and declaration bundling failures.
///
/// The variants follow the failure taxonomy of the subsystem:
/// configuration mistakes carry a remediation hint, generator failures
/// carry the owning file, and internal-consistency violations are named
/// as such. No variant is retried anywhere; every failure is treated as
/// deterministic given the same inputs.
#[derive(Debug, Error)]
pub enum Error {
    /// The generator module has the wrong shape (missing or non-callable
    /// entry point). A user mistake, not a transient condition.
    #[error("{message}\nhint: {hint}")]
    Configuration {
        /// What is wrong.
        message: String,
        /// How to fix it.
        hint: String,
    },

    /// The generator's own logic failed while producing code.
    #[error("failed to generate module {}: {message}", owner.display())]
    Generation {
        /// The generating file whose build is aborted.
        owner: PathBuf,
        /// The underlying failure.
        message: String,
    },

    /// A token escaped the registry that produced it, or a cache replay
    /// went wrong. Internal consistency bug.
    #[error("could not resolve virtual file with id {specifier}")]
    UnknownVirtualFile {
        /// The specifier that was requested.
        specifier: String,
    },

    /// The load hook was asked for a module tagged as registry-owned that
    /// the registry does not know.
    #[error("could not load virtual file with id {}", id.display())]
    VirtualFileLoad {
        /// The synthetic path that was requested.
        id: PathBuf,
    },

    /// The external transpile step failed for a generator source file.
    #[error("failed to transpile generator {}: {message}", owner.display())]
    Transpile {
        /// The generating file.
        owner: PathBuf,
        /// Transpiler-reported failure.
        message: String,
    },

    /// The declaration merge pass produced an ambiguous result.
    #[error(
        "declaration bundle for {} produced {chunks} chunks, expected exactly one",
        owner.display()
    )]
    DeclarationMerge {
        /// The generating file.
        owner: PathBuf,
        /// Number of chunks the bundler returned.
        chunks: usize,
    },

    /// The merge pass tried to load a module outside its sandboxed view.
    #[error("tried to load non-virtual file during declaration bundle: {}", id.display())]
    SandboxEscape {
        /// The offending path.
        id: PathBuf,
    },

    /// The same owner file was generated twice within one non-watch build.
    #[error(
        "internal invariant violated: {} was requested twice within one build",
        owner.display()
    )]
    Reentrancy {
        /// The generating file.
        owner: PathBuf,
    },

    /// A cache entry path exists but is not a regular file.
    #[error("cache file path {} is not a file", path.display())]
    CacheNotAFile {
        /// The offending path.
        path: PathBuf,
    },

    /// A cache entry could not be decoded.
    #[error("cache entry {} is unreadable: {message}", path.display())]
    CacheCorrupt {
        /// The cache entry path.
        path: PathBuf,
        /// Decoder failure.
        message: String,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a configuration error with a remediation hint.
    pub fn configuration(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create a generation error for the given owner file.
    pub fn generation(owner: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Generation {
            owner: owner.into(),
            message: message.into(),
        }
    }

    /// Whether this error is an internal-consistency bug rather than a
    /// user-facing configuration or generation problem.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::UnknownVirtualFile { .. } | Self::Reentrancy { .. } | Self::SandboxEscape { .. }
        )
    }
}
