//! Virtual file registry.
//!
//! One table owns every virtual file minted during a build: token →
//! record. Resolve/load hooks, cache replay, and both declaration passes
//! all consult it. The table lives inside the plugin value and is shared
//! by reference with every hook and sub-pass (dependency injection, not
//! global state), and uses a [`parking_lot::RwLock`] so hook methods take
//! `&self` and concurrent registrations from different owner files are
//! independent inserts.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::host::{ModuleMeta, Resolution};
use crate::token::Token;

/// Extension given to a virtual file when the emitting generator does not
/// pick one.
pub const DEFAULT_EXTENSION: &str = "ts";

// =============================================================================
// SideEffects
// =============================================================================

/// Module side-effect flag forwarded to the host bundler.
///
/// Tri-state: [`SideEffects::Inherit`] leaves the decision to the host's
/// own analysis; the other two variants override it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideEffects {
    /// No explicit flag; the host decides.
    #[default]
    Inherit,
    /// The module has side effects and must not be tree-shaken away.
    True,
    /// The module is side-effect free.
    False,
}

// =============================================================================
// Emit arguments
// =============================================================================

/// Arguments for emitting a virtual file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmitFileArgs {
    /// File extension without the leading dot. Defaults to `ts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Human-readable fragment worked into the synthetic file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_hint: Option<String>,
    /// Side-effect flag for the virtual module.
    #[serde(default)]
    pub side_effects: SideEffects,
    /// Content of the virtual file, fixed at registration time.
    pub content: String,
}

/// Arguments for emitting a virtual file that is also an independent
/// output chunk. Chunks carry no side-effect override; the host treats
/// them as entry points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmitChunkArgs {
    /// File extension without the leading dot. Defaults to `ts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Human-readable fragment worked into the synthetic file name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_hint: Option<String>,
    /// Content of the virtual file.
    pub content: String,
}

// =============================================================================
// VirtualFile
// =============================================================================

/// A synthetic module record.
///
/// Created during a generator invocation or cache replay, never mutated,
/// never explicitly destroyed; it lives as long as the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualFile {
    /// The identity the record is registered under.
    pub token: Token,
    /// Synthetic path, placed next to the owning real file.
    pub path: PathBuf,
    /// Immutable UTF-8 source text.
    pub content: String,
    /// Resolved path of the real file that produced this virtual file.
    pub owner: PathBuf,
    /// Side-effect flag forwarded to the host.
    pub side_effects: SideEffects,
}

// =============================================================================
// VirtualFileRegistry
// =============================================================================

/// Process-wide table of virtual files, keyed by token.
///
/// Iteration order is registration order, which downstream consumers
/// (the declaration alias table, owner queries) rely on.
#[derive(Default)]
pub struct VirtualFileRegistry {
    files: RwLock<IndexMap<Token, VirtualFile>>,
}

impl VirtualFileRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint a fresh token and register a virtual file for `owner`.
    ///
    /// The synthetic path lands in `owner`'s directory and is built from
    /// the token, the optional name hint, and the extension. Never fails;
    /// token uniqueness guarantees no collision.
    pub fn register(&self, args: &EmitFileArgs, owner: &Path) -> Token {
        let token = Token::mint();
        let extension = args.extension.as_deref().unwrap_or(DEFAULT_EXTENSION);
        let name = match args.name_hint.as_deref().filter(|h| !h.is_empty()) {
            Some(hint) => format!("{token}_{hint}.{extension}"),
            None => format!("{token}.{extension}"),
        };
        let path = owner.parent().unwrap_or_else(|| Path::new("")).join(name);
        let file = VirtualFile {
            token: token.clone(),
            path,
            content: args.content.clone(),
            owner: owner.to_path_buf(),
            side_effects: args.side_effects,
        };
        self.files.write().insert(token.clone(), file);
        token
    }

    /// Re-register an emitted chunk's record under the host bundler's
    /// reference id, so the chunk is addressable by the identifier the
    /// generator received.
    pub fn register_alias(&self, alias: Token, mut file: VirtualFile) {
        file.token = alias.clone();
        self.files.write().insert(alias, file);
    }

    /// Whether `specifier` is a registered token.
    pub fn contains(&self, specifier: &str) -> bool {
        self.files.read().contains_key(specifier)
    }

    /// Look up a record by token.
    pub fn get(&self, token: &Token) -> Option<VirtualFile> {
        self.files.read().get(token).cloned()
    }

    /// Resolve a token to its synthetic path, tagged so the load hook
    /// recognizes the module as registry-owned.
    pub fn resolve(&self, specifier: &str) -> Result<Resolution> {
        let files = self.files.read();
        let file = files
            .get(specifier)
            .ok_or_else(|| Error::UnknownVirtualFile {
                specifier: specifier.to_owned(),
            })?;
        Ok(Resolution {
            id: file.path.to_string_lossy().into_owned(),
            side_effects: file.side_effects,
            meta: ModuleMeta::Virtual {
                token: file.token.clone(),
            },
        })
    }

    /// The immutable content registered for a token.
    pub fn content_of(&self, token: &Token) -> Result<String> {
        self.files
            .read()
            .get(token)
            .map(|file| file.content.clone())
            .ok_or_else(|| Error::UnknownVirtualFile {
                specifier: token.to_string(),
            })
    }

    /// Whether `owner` produced any virtual files.
    pub fn has_virtual_files(&self, owner: &Path) -> bool {
        self.files.read().values().any(|file| file.owner == owner)
    }

    /// All records produced by `owner`, in registration order. A chunk
    /// emission appears twice: under its minted token and under the
    /// host's reference id, both pointing at the same synthetic path.
    pub fn virtual_files_of(&self, owner: &Path) -> Vec<VirtualFile> {
        self.files
            .read()
            .values()
            .filter(|file| file.owner == owner)
            .cloned()
            .collect()
    }

    /// Number of distinct synthetic paths `owner` produced. Decides
    /// whether the declaration merge pass runs.
    pub fn distinct_virtual_paths_of(&self, owner: &Path) -> usize {
        let files = self.files.read();
        let mut paths: Vec<&Path> = files
            .values()
            .filter(|file| file.owner == owner)
            .map(|file| file.path.as_path())
            .collect();
        paths.sort_unstable();
        paths.dedup();
        paths.len()
    }

    /// Build the synthetic-path → token reverse index, used by the
    /// declaration host to recognize a filesystem path as a virtual file.
    pub fn reverse_index(&self) -> FxHashMap<PathBuf, Token> {
        self.files
            .read()
            .iter()
            .map(|(token, file)| (file.path.clone(), token.clone()))
            .collect()
    }

    /// The resolution alias table: every token mapped to the synthetic
    /// paths it may resolve to. Lets bare-token import specifiers resolve
    /// during declaration-only compiles without a real resolution step.
    pub fn path_aliases(&self) -> Vec<(Token, Vec<PathBuf>)> {
        self.files
            .read()
            .iter()
            .map(|(token, file)| (token.clone(), vec![file.path.clone()]))
            .collect()
    }

    /// Number of registered records.
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(content: &str) -> EmitFileArgs {
        EmitFileArgs {
            content: content.to_owned(),
            ..EmitFileArgs::default()
        }
    }

    #[test]
    fn test_register_places_file_next_to_owner() {
        let registry = VirtualFileRegistry::new();
        let owner = Path::new("/proj/src/data.gen.ts");
        let token = registry.register(&args("export {};"), owner);

        let file = registry.get(&token).unwrap();
        assert_eq!(file.path.parent(), Some(Path::new("/proj/src")));
        assert_eq!(
            file.path.file_name().unwrap().to_str().unwrap(),
            format!("{token}.ts")
        );
        assert_eq!(file.owner, owner);
    }

    #[test]
    fn test_register_with_hint_and_extension() {
        let registry = VirtualFileRegistry::new();
        let owner = Path::new("/proj/src/data.gen.ts");
        let token = registry.register(
            &EmitFileArgs {
                extension: Some("tsx".to_owned()),
                name_hint: Some("widget".to_owned()),
                ..args("export {};")
            },
            owner,
        );

        let file = registry.get(&token).unwrap();
        assert_eq!(
            file.path.file_name().unwrap().to_str().unwrap(),
            format!("{token}_widget.tsx")
        );
    }

    #[test]
    fn test_resolve_unknown_token_fails() {
        let registry = VirtualFileRegistry::new();
        assert!(matches!(
            registry.resolve("nosuchtokn"),
            Err(Error::UnknownVirtualFile { .. })
        ));
    }

    #[test]
    fn test_resolve_tags_virtual_meta() {
        let registry = VirtualFileRegistry::new();
        let owner = Path::new("/proj/a.gen.ts");
        let token = registry.register(&args("x"), owner);

        let resolution = registry.resolve(token.as_str()).unwrap();
        assert_eq!(resolution.meta, ModuleMeta::Virtual { token });
    }

    #[test]
    fn test_owner_queries() {
        let registry = VirtualFileRegistry::new();
        let a = Path::new("/proj/a.gen.ts");
        let b = Path::new("/proj/b.gen.ts");
        registry.register(&args("1"), a);
        registry.register(&args("2"), a);

        assert!(registry.has_virtual_files(a));
        assert!(!registry.has_virtual_files(b));
        assert_eq!(registry.virtual_files_of(a).len(), 2);
        assert_eq!(registry.distinct_virtual_paths_of(a), 2);
    }

    #[test]
    fn test_alias_shares_path_in_distinct_count() {
        let registry = VirtualFileRegistry::new();
        let owner = Path::new("/proj/a.gen.ts");
        let token = registry.register(&args("1"), owner);
        let file = registry.get(&token).unwrap();
        registry.register_alias(Token::from_raw("hostref$$1"), file);

        assert_eq!(registry.virtual_files_of(owner).len(), 2);
        assert_eq!(registry.distinct_virtual_paths_of(owner), 1);
    }

    #[test]
    fn test_reverse_index_and_aliases() {
        let registry = VirtualFileRegistry::new();
        let owner = Path::new("/proj/a.gen.ts");
        let token = registry.register(&args("1"), owner);
        let file = registry.get(&token).unwrap();

        let reverse = registry.reverse_index();
        assert_eq!(reverse.get(&file.path), Some(&token));

        let aliases = registry.path_aliases();
        assert_eq!(aliases.len(), 1);
        assert_eq!(aliases[0].0, token);
        assert_eq!(aliases[0].1, vec![file.path]);
    }
}
