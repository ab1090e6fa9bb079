//! Content cache.
//!
//! One JSON entry per generating file and build mode records the
//! generated code plus the ordered list of virtual-file emissions, so a
//! later build can reconstruct an equivalent module graph without
//! re-executing the generator. Watch-mode and one-shot builds persist to
//! disjoint roots (`watch/` vs `build/`).
//!
//! # Replay
//!
//! Token values are minted fresh on every registration, so a cache hit
//! cannot reuse the persisted ones. [`replay`] re-registers each emission
//! in its original order, and after each one rewrites every
//! not-yet-replayed emission's content (and finally the generated code),
//! substituting the old tokens resolved so far with their replacements.
//! Order matters: a later emission may reference an earlier emission's
//! token inside its content.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::CacheMode;
use crate::error::{Error, Result};
use crate::host::HostContext;
use crate::registry::{EmitChunkArgs, EmitFileArgs, SideEffects};
use crate::token::{Token, substitute_tokens};

/// Cache schema version. A persisted entry with any other value is
/// discarded and regenerated.
pub const SCHEMA_VERSION: u32 = 3;

/// Longest legalized-path fragment kept in an entry file name. The tail
/// is the readable part; the hash disambiguates.
const MAX_LEGAL_LEN: usize = 100;

// =============================================================================
// Cache entry
// =============================================================================

/// One `emitFile`/`emitChunk` call captured for later replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Emission {
    /// A plain virtual file emission.
    File {
        /// Token assigned at original generation time.
        token: Token,
        /// Original emit arguments.
        #[serde(flatten)]
        args: EmitFileArgs,
    },
    /// A virtual file additionally emitted as an independent chunk.
    Chunk {
        /// Token (host reference id) assigned at original generation time.
        token: Token,
        /// Original emit arguments.
        #[serde(flatten)]
        args: EmitChunkArgs,
    },
}

impl Emission {
    /// The token assigned when the emission originally happened.
    pub fn token(&self) -> &Token {
        match self {
            Self::File { token, .. } | Self::Chunk { token, .. } => token,
        }
    }

    fn content_mut(&mut self) -> &mut String {
        match self {
            Self::File { args, .. } => &mut args.content,
            Self::Chunk { args, .. } => &mut args.content,
        }
    }
}

/// A persisted record of one generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Schema version; a mismatch invalidates the entire entry.
    pub version: u32,
    /// The generated source text for the owning real file.
    pub code: String,
    /// Side-effect flag for that code.
    pub side_effects: SideEffects,
    /// Ordered emission records.
    pub emissions: Vec<Emission>,
}

impl CacheEntry {
    /// Create an entry at the current schema version.
    pub fn new(code: String, side_effects: SideEffects, emissions: Vec<Emission>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            code,
            side_effects,
            emissions,
        }
    }
}

// =============================================================================
// Cache key derivation
// =============================================================================

/// Map a string onto an identifier-safe form.
fn make_legal_identifier(s: &str) -> String {
    let mut out: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '$' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Filesystem-safe entry file name for a normalized owner path.
///
/// The legalized path fragment keeps entries recognizable when poking at
/// the cache directory; the xxh3 hash of the full path keeps two owners
/// that legalize identically from colliding.
pub fn entry_file_name(owner: &Path) -> String {
    let normalized = owner.to_string_lossy();
    let hash = xxhash_rust::xxh3::xxh3_64(normalized.as_bytes());
    let mut legal = make_legal_identifier(&normalized);
    if legal.len() > MAX_LEGAL_LEN {
        legal = legal[legal.len() - MAX_LEGAL_LEN..].to_owned();
    }
    format!("{legal}.{hash:016x}.json")
}

// =============================================================================
// ContentCache
// =============================================================================

/// The per-run content cache, bound to one resolved root and mode.
pub struct ContentCache {
    mode: CacheMode,
    root: PathBuf,
}

impl ContentCache {
    /// Resolve the cache for one run. The root gains a `watch`/`build`
    /// subdirectory depending on the build mode, created eagerly when the
    /// cache is enabled.
    pub fn new(cache_root: &Path, mode: CacheMode, watch: bool) -> Result<Self> {
        let root = cache_root.join(if watch { "watch" } else { "build" });
        if mode == CacheMode::Filesystem {
            fs::create_dir_all(&root)?;
        }
        Ok(Self { mode, root })
    }

    /// This run's cache mode.
    pub fn mode(&self) -> CacheMode {
        self.mode
    }

    /// The entry path for a normalized owner path.
    pub fn entry_path(&self, owner: &Path) -> PathBuf {
        self.root.join(entry_file_name(owner))
    }

    /// Look up the entry for `owner`.
    ///
    /// A stale schema version deletes the entry and reports a miss
    /// (self-healing). An entry path that is not a regular file, or an
    /// entry that cannot be read or decoded, is fatal.
    pub fn load(&self, host: &dyn HostContext, owner: &Path) -> Result<Option<CacheEntry>> {
        if self.mode == CacheMode::Off {
            return Ok(None);
        }
        let path = self.entry_path(owner);
        if !path.exists() {
            host.debug(&format!("cache miss for {}", owner.display()));
            return Ok(None);
        }
        if !path.is_file() {
            return Err(Error::CacheNotAFile { path });
        }
        let raw = fs::read_to_string(&path)?;
        let entry: CacheEntry =
            serde_json::from_str(&raw).map_err(|e| Error::CacheCorrupt {
                path: path.clone(),
                message: e.to_string(),
            })?;
        if entry.version != SCHEMA_VERSION {
            host.warn(&format!(
                "cache file version mismatch for {}, removing",
                path.display()
            ));
            fs::remove_file(&path)?;
            return Ok(None);
        }
        tracing::debug!(owner = %owner.display(), entry = %path.display(), "cache hit");
        host.debug(&format!(
            "cache hit for {} at {}",
            owner.display(),
            path.display()
        ));
        Ok(Some(entry))
    }

    /// Persist `entry` for `owner`, overwriting any prior entry. Only
    /// called after a fresh generation completed successfully; a no-op
    /// when the cache is off.
    pub fn store(&self, owner: &Path, entry: &CacheEntry) -> Result<()> {
        if self.mode == CacheMode::Off {
            return Ok(());
        }
        let path = self.entry_path(owner);
        let raw = serde_json::to_string(entry).map_err(|e| Error::CacheCorrupt {
            path: path.clone(),
            message: e.to_string(),
        })?;
        fs::write(&path, raw)?;
        Ok(())
    }
}

// =============================================================================
// Replay
// =============================================================================

/// Replay a cache entry's emissions, producing the generated code with
/// every persisted token remapped to a freshly minted one.
///
/// `register` performs the actual re-registration, routing `File`
/// emissions through the registry and `Chunk` emissions additionally
/// through the host, and returns the replacement token.
pub fn replay(
    mut entry: CacheEntry,
    register: &mut dyn FnMut(&Emission) -> Result<Token>,
) -> Result<(String, SideEffects)> {
    let mut renames: Vec<(Token, Token)> = Vec::with_capacity(entry.emissions.len());
    let count = entry.emissions.len();
    for i in 0..count {
        let replacement = register(&entry.emissions[i])?;
        let original = entry.emissions[i].token().clone();
        renames.push((original, replacement));
        // Later emissions may embed any token resolved so far.
        for emission in entry.emissions.iter_mut().skip(i + 1) {
            let content = emission.content_mut();
            *content = substitute_tokens(content, &renames);
        }
    }
    let code = substitute_tokens(&entry.code, &renames);
    Ok((code, entry.side_effects))
}
