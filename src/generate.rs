//! Generator invocation engine.
//!
//! A generating file's on-disk content is a program, not the final
//! source. Invocation compiles that program with the external transpiler,
//! loads the result through the generator runtime, validates its shape,
//! and calls its entry point with a [`GeneratorScope`] capability object.
//! The call returns the source text that replaces the owner file; every
//! virtual file it emitted along the way is captured, in call order, for
//! cache persistence.

use std::path::{Path, PathBuf};

use crate::cache::Emission;
use crate::error::{Error, Result};
use crate::host::{ChunkSpec, HostContext};
use crate::registry::{
    EmitChunkArgs, EmitFileArgs, SideEffects, VirtualFileRegistry,
};
use crate::toolchain::{Toolchain, TranspileRequest};
use crate::token::Token;

/// File name of the transpiled generator inside its scratch directory.
const COMPILED_NAME: &str = "generator.cjs";

// =============================================================================
// GeneratorScope
// =============================================================================

/// The capability object passed to a generator's entry point.
///
/// Generators run as ordinary program code with full language power; this
/// scope is the only sanctioned channel back into the build: structured
/// logging, watch-file registration, and virtual-file emission.
pub struct GeneratorScope<'a> {
    host: &'a dyn HostContext,
    registry: &'a VirtualFileRegistry,
    owner: &'a Path,
    emissions: Vec<Emission>,
}

impl<'a> GeneratorScope<'a> {
    pub(crate) fn new(
        host: &'a dyn HostContext,
        registry: &'a VirtualFileRegistry,
        owner: &'a Path,
    ) -> Self {
        Self {
            host,
            registry,
            owner,
            emissions: Vec::new(),
        }
    }

    /// Base name of the owning file.
    pub fn filename(&self) -> &str {
        self.owner
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    /// Directory of the owning file.
    pub fn dirname(&self) -> &Path {
        self.owner.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Report an informational message.
    pub fn info(&self, message: &str) {
        self.host.info(message);
    }

    /// Report a warning.
    pub fn warn(&self, message: &str) {
        self.host.warn(message);
    }

    /// Report a debug-level message.
    pub fn debug(&self, message: &str) {
        self.host.debug(message);
    }

    /// Build the fatal error that aborts this file's build. Generators
    /// raise it by returning the value:
    ///
    /// ```ignore
    /// return Err(scope.error("sibling config file is missing"));
    /// ```
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::generation(self.owner, message)
    }

    /// Register an extra file dependency for watch mode.
    pub fn watch(&self, path: &Path) {
        self.host.add_watch_file(path);
    }

    /// Emit a virtual file scoped to the owning file. Returns a unique
    /// import specifier that references it.
    pub fn emit_file(&mut self, args: EmitFileArgs) -> Token {
        let token = self.registry.register(&args, self.owner);
        self.emissions.push(Emission::File {
            token: token.clone(),
            args,
        });
        token
    }

    /// Emit a virtual file that the host additionally treats as an
    /// independent output chunk: an entry point of its own, importable
    /// both statically and dynamically.
    pub fn emit_chunk(&mut self, args: EmitChunkArgs) -> Result<Token> {
        let token = emit_chunk_raw(self.host, self.registry, &args, self.owner)?;
        self.emissions.push(Emission::Chunk {
            token: token.clone(),
            args,
        });
        Ok(token)
    }

    fn into_emissions(self) -> Vec<Emission> {
        self.emissions
    }
}

/// Register a chunk emission: a registry entry, a host chunk, and an
/// alias record under the host's reference id. The reference id is what
/// the generator (or cache replay) gets back.
pub(crate) fn emit_chunk_raw(
    host: &dyn HostContext,
    registry: &VirtualFileRegistry,
    args: &EmitChunkArgs,
    owner: &Path,
) -> Result<Token> {
    let file_args = EmitFileArgs {
        extension: args.extension.clone(),
        name_hint: args.name_hint.clone(),
        side_effects: SideEffects::Inherit,
        content: args.content.clone(),
    };
    let token = registry.register(&file_args, owner);
    let reference = host.emit_chunk(&ChunkSpec {
        id: token.as_str(),
        importer: owner,
        name: args.name_hint.as_deref(),
    })?;
    let alias = Token::from_raw(reference);
    let file = registry
        .get(&token)
        .ok_or_else(|| Error::UnknownVirtualFile {
            specifier: token.to_string(),
        })?;
    registry.register_alias(alias.clone(), file);
    Ok(alias)
}

// =============================================================================
// Invocation
// =============================================================================

/// Result of one generator invocation.
#[derive(Debug)]
pub struct Invoked {
    /// Source text that replaces the owner file.
    pub code: String,
    /// Side-effect flag the generator exported for that code.
    pub side_effects: SideEffects,
    /// Captured emissions, in call order.
    pub emissions: Vec<Emission>,
}

/// Compile, load, validate, and run the generator for `owner`.
#[tracing::instrument(level = "debug", skip_all, fields(owner = %owner.display()))]
pub(crate) fn invoke(
    host: &dyn HostContext,
    owner: &Path,
    options: &crate::config::Options,
    toolchain: &Toolchain,
    registry: &VirtualFileRegistry,
) -> Result<Invoked> {
    let scratch = tempfile::Builder::new()
        .prefix("genmod.")
        .tempdir()
        .map_err(Error::Io)?;
    let outfile: PathBuf = scratch.path().join(COMPILED_NAME);

    let mut transpile_options = options.transpile_options_for(owner);
    // The engine depends on these regardless of user overrides.
    transpile_options.bundle = true;
    transpile_options.minify = false;
    transpile_options.format = crate::toolchain::ModuleFormat::CommonJs;
    transpile_options.platform = crate::toolchain::Platform::Server;

    let watch = host.watch_mode();
    let output = toolchain.transpiler.transpile(&TranspileRequest {
        entry: owner,
        outfile: &outfile,
        options: transpile_options,
        want_manifest: watch,
    })?;

    if watch {
        let Some(manifest) = output.manifest else {
            return Err(Error::Transpile {
                owner: owner.to_path_buf(),
                message: "transpile input manifest is missing in watch mode".to_owned(),
            });
        };
        for path in &manifest {
            host.add_watch_file(path);
        }
    }

    let mut module = toolchain.runtime.load(&outfile)?;
    let exports = module.exports();
    if exports.len() == 1 && exports[0] == "default" {
        module = module.unwrap_default();
    }
    if !module.exports().iter().any(|name| name == "generate") {
        host.warn("read the docs for the args passed to the generator function");
        return Err(Error::configuration(
            format!(
                "the generator {} must have a named export \"generate\"",
                owner.display()
            ),
            "export a function named `generate` (or default-export an object with one)",
        ));
    }

    let mut scope = GeneratorScope::new(host, registry, owner);
    let code = match module.generate(&mut scope) {
        Ok(code) => code,
        Err(err @ Error::Generation { .. }) => return Err(err),
        Err(other) => return Err(Error::generation(owner, other.to_string())),
    };
    let side_effects = module.side_effects();

    // `scratch` drops here; the transpiled module is gone. Failed cleanup
    // costs disk hygiene, not correctness.
    Ok(Invoked {
        code,
        side_effects,
        emissions: scope.into_emissions(),
    })
}
