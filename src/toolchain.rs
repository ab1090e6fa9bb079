//! External collaborator contracts.
//!
//! The subsystem drives three external tools and one runtime, all as
//! black boxes: an ahead-of-time transpiler that turns a generator source
//! file into an executable module, a runtime that loads and calls that
//! module, a type compiler that runs declaration-only emission against a
//! file-system view, and a declaration bundler for the merge pass. Each
//! is a trait here; the embedding application supplies real
//! implementations and the test suite supplies in-process fakes.
//!
//! Loading freshly compiled generator code is a deliberate trust
//! boundary: there is no sandbox, and a generator can do anything the
//! execution environment permits. The generator author is trusted to the
//! same degree as hand-written build configuration.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::generate::GeneratorScope;
use crate::registry::SideEffects;
use crate::token::Token;
use crate::vfs::FileAccess;

// =============================================================================
// Transpiler
// =============================================================================

/// Output module format requested from the transpiler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModuleFormat {
    /// CommonJS-compatible output, loadable by the generator runtime.
    #[default]
    CommonJs,
    /// Native ES modules.
    EsModule,
}

/// Platform assumptions for the transpile step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Platform {
    /// Server-side execution environment.
    #[default]
    Server,
    /// Browser execution environment.
    Browser,
}

/// Options forwarded to the transpile step.
///
/// User overrides are merged first; the invocation engine then forces the
/// fields generation depends on (bundled, unminified, CommonJS, server
/// platform) regardless of what the override said.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranspileOptions {
    /// Bundle the entry with its imports into one file.
    pub bundle: bool,
    /// Minify the output.
    pub minify: bool,
    /// Output module format.
    pub format: ModuleFormat,
    /// Platform assumptions.
    pub platform: Platform,
    /// Emit an inline source map for generator stack traces.
    pub inline_sourcemap: bool,
    /// Compile-time constant replacements.
    pub define: BTreeMap<String, String>,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            bundle: true,
            minify: false,
            format: ModuleFormat::CommonJs,
            platform: Platform::Server,
            inline_sourcemap: true,
            define: BTreeMap::new(),
        }
    }
}

/// One transpile invocation.
#[derive(Debug)]
pub struct TranspileRequest<'a> {
    /// The generator source file to compile.
    pub entry: &'a Path,
    /// Where the executable output must be written.
    pub outfile: &'a Path,
    /// Merged options.
    pub options: TranspileOptions,
    /// Whether the caller needs the input-file manifest (watch mode).
    pub want_manifest: bool,
}

/// Result of a transpile invocation.
#[derive(Debug, Default)]
pub struct TranspileOutput {
    /// Every input file the transpile step touched, when requested.
    /// Registered as watch dependencies so edits to transitively-imported
    /// generator helpers trigger regeneration.
    pub manifest: Option<Vec<PathBuf>>,
}

/// The external ahead-of-time compiler that turns a generator source file
/// into an executable module.
pub trait Transpiler: Send + Sync {
    /// Compile `request.entry` to `request.outfile`.
    fn transpile(&self, request: &TranspileRequest<'_>) -> Result<TranspileOutput>;
}

// =============================================================================
// Generator runtime
// =============================================================================

/// Loads a transpiled generator module for execution.
pub trait GeneratorRuntime: Send + Sync {
    /// Load the executable module at `compiled`.
    fn load(&self, compiled: &Path) -> Result<Box<dyn GeneratorModule>>;
}

/// A loaded generator module.
pub trait GeneratorModule {
    /// Names of the module's top-level exports.
    fn exports(&self) -> Vec<String>;

    /// Unwrap a default-export-only module to its default export. Modules
    /// without a default export return themselves.
    fn unwrap_default(self: Box<Self>) -> Box<dyn GeneratorModule>;

    /// Invoke the module's generation entry point with the capability
    /// scope, returning the source text that replaces the owner file.
    fn generate(&self, scope: &mut GeneratorScope<'_>) -> Result<String>;

    /// Module side-effect flag the generator exported for its generated
    /// code, if any.
    fn side_effects(&self) -> SideEffects {
        SideEffects::Inherit
    }
}

// =============================================================================
// Type compiler
// =============================================================================

/// The external type checker, consumed as a black box: it sees the world
/// only through the [`FileAccess`] view and the token alias table, runs a
/// declaration-only compile of `entry`, and writes every declaration
/// output back through the view.
pub trait TypeCompiler: Send + Sync {
    /// Run declaration-only emission for the program rooted at `entry`.
    ///
    /// `aliases` maps bare token specifiers to the synthetic paths they
    /// resolve to, standing in for a real module-resolution step.
    fn emit_declarations(
        &self,
        entry: &Path,
        aliases: &[(Token, Vec<PathBuf>)],
        fs: &mut dyn FileAccess,
    ) -> Result<()>;
}

// =============================================================================
// Declaration bundler
// =============================================================================

/// How the merge pass resolves one import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeResolution {
    /// The synthetic root declaration, the only legitimate entry.
    Entry,
    /// A virtual file's own declaration inside the sandboxed view.
    Virtual(PathBuf),
    /// A genuine external or relative reference the consuming project
    /// resolves itself; passes through untouched.
    External(String),
    /// Anything else: silently excluded from the bundle, never an error.
    Excluded,
}

/// Resolution and loading callbacks the merge-pass bundler must route
/// every module request through. Implemented by the subsystem; the
/// bundler sees no filesystem.
pub trait MergePilot {
    /// Resolve an import specifier.
    fn resolve(&self, source: &str, importer: Option<&Path>, is_entry: bool) -> MergeResolution;

    /// Load a resolved module's declaration text.
    fn load(&self, id: &Path) -> Result<String>;
}

/// The external bundler driving the declaration merge pass.
pub trait DeclarationBundler: Send + Sync {
    /// Bundle the declaration graph rooted at `entry`, resolving and
    /// loading exclusively through `pilot`. Returns the output chunks;
    /// anything but exactly one chunk is rejected by the caller.
    fn bundle(&self, entry: &Path, pilot: &dyn MergePilot) -> Result<Vec<String>>;
}

// =============================================================================
// Toolchain
// =============================================================================

/// The full set of external collaborators, injected into the plugin at
/// construction time.
pub struct Toolchain {
    /// Generator source → executable module.
    pub transpiler: Box<dyn Transpiler>,
    /// Executable module → loaded generator.
    pub runtime: Box<dyn GeneratorRuntime>,
    /// Declaration-only compiles.
    pub compiler: Box<dyn TypeCompiler>,
    /// Declaration merge pass.
    pub declaration_bundler: Box<dyn DeclarationBundler>,
}

impl Toolchain {
    /// Bundle the four collaborators into a toolchain.
    pub fn new(
        transpiler: impl Transpiler + 'static,
        runtime: impl GeneratorRuntime + 'static,
        compiler: impl TypeCompiler + 'static,
        declaration_bundler: impl DeclarationBundler + 'static,
    ) -> Self {
        Self {
            transpiler: Box::new(transpiler),
            runtime: Box::new(runtime),
            compiler: Box::new(compiler),
            declaration_bundler: Box::new(declaration_bundler),
        }
    }
}
