//! # genmod
//!
//! A code-generation layer for module bundlers. Files matching the
//! `*.gen.<ext>` naming convention are treated not as source but as small
//! programs whose execution produces the real source text at build time.
//! While producing code for file A, a generator may synthesize additional
//! unnamed "virtual" source files and register them as first-class
//! importable modules inside the build graph; a separate compiler-driven
//! pipeline assembles a merged type-declaration sibling from the same
//! virtual graph.
//!
//! The crate provides:
//!
//! - **Virtual file registry**: synthetic, collision-resistant identities
//!   for generator-produced content, threaded through module resolution
//!   and loading as if they were real files on disk.
//! - **Content cache**: per-file, per-build-mode persistence of generated
//!   code plus emissions, with versioned invalidation and a replay that
//!   re-derives consistent fresh identities without re-executing the
//!   generator.
//! - **Declaration pipeline**: a declaration-only compile against a
//!   virtual-file-aware host, plus a merge pass stitching many
//!   per-virtual-file declaration outputs into one.
//!
//! The host bundler, the generator transpiler/runtime, the type checker,
//! and the declaration bundler are all consumed through narrow traits
//! (see [`host`] and [`toolchain`]); the embedding application supplies
//! the real implementations.
//!
//! ## Quick Start
//!
//! ```ignore
//! use genmod::{GenmodPlugin, Options, Toolchain};
//!
//! let plugin = GenmodPlugin::new(
//!     Options::builder().build()?,
//!     Toolchain::new(my_transpiler, my_runtime, my_compiler, my_dts_bundler),
//! );
//!
//! // Wire into the host bundler:
//! // - build start        → plugin.build_start(&host)
//! // - resolve hook       → plugin.resolve_id(source, importer, &host)
//! //                        then plugin.resolve_virtual(source)
//! // - load hook          → plugin.load(id, meta, &host)
//! //                        then plugin.load_virtual(id, meta)
//! ```
//!
//! ## Trust boundary
//!
//! Generators run with full language power: reading sibling files,
//! computing hashes, branching on file content. No sandboxing is
//! attempted; a generator author is trusted to the same degree as
//! hand-written build configuration.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
mod decl;
pub mod error;
pub mod generate;
pub mod host;
pub mod pattern;
pub mod plugin;
pub mod registry;
pub mod token;
pub mod toolchain;
pub mod vfs;

// =============================================================================
// Prelude - import commonly used items with a single `use`
// =============================================================================

/// Prelude module for convenient imports.
///
/// ```ignore
/// use genmod::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::{CacheMode, Options, OptionsBuilder};
    pub use crate::error::{Error, Result};
    pub use crate::generate::GeneratorScope;
    pub use crate::host::{HostContext, Loaded, ModuleMeta, Resolution};
    pub use crate::plugin::GenmodPlugin;
    pub use crate::registry::{
        EmitChunkArgs, EmitFileArgs, SideEffects, VirtualFileRegistry,
    };
    pub use crate::token::Token;
    pub use crate::toolchain::{
        DeclarationBundler, GeneratorModule, GeneratorRuntime, Toolchain, Transpiler,
        TypeCompiler,
    };
}

// =============================================================================
// Crate-root re-exports
// =============================================================================

pub use config::{CacheMode, Options, OptionsBuilder};
pub use error::{Error, Result};
pub use generate::GeneratorScope;
pub use host::{ChunkSpec, HostContext, Loaded, ModuleMeta, Resolution};
pub use plugin::GenmodPlugin;
pub use registry::{
    EmitChunkArgs, EmitFileArgs, SideEffects, VirtualFile, VirtualFileRegistry,
};
pub use token::Token;
pub use toolchain::{
    DeclarationBundler, GeneratorModule, GeneratorRuntime, MergePilot, MergeResolution,
    ModuleFormat, Platform, Toolchain, Transpiler, TranspileOptions, TranspileOutput,
    TranspileRequest, TypeCompiler,
};
pub use vfs::{FileAccess, OverlayFs};
