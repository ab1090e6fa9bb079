//! Shared harness for the integration suite: in-process fakes for the
//! host bundler and the external toolchain, plus small fixture helpers.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use genmod::pattern;
use genmod::prelude::*;
use genmod::token::TOKEN_ALPHABET;
use genmod::vfs::FileAccess;
use genmod::{ChunkSpec, MergePilot, MergeResolution, TranspileOutput, TranspileRequest};

// =============================================================================
// FakeHost
// =============================================================================

/// Host bundler stand-in: identity resolution, recorded reporting.
#[derive(Default)]
pub struct FakeHost {
    pub watch: bool,
    pub warnings: Mutex<Vec<String>>,
    pub infos: Mutex<Vec<String>>,
    pub debugs: Mutex<Vec<String>>,
    pub watched: Mutex<Vec<PathBuf>>,
    pub chunks: Mutex<Vec<String>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn watching() -> Self {
        Self {
            watch: true,
            ..Self::default()
        }
    }

    pub fn warning_matching(&self, needle: &str) -> bool {
        self.warnings
            .lock()
            .unwrap()
            .iter()
            .any(|w| w.contains(needle))
    }
}

impl HostContext for FakeHost {
    fn resolve(&self, source: &str, _importer: Option<&str>) -> Result<Option<String>> {
        Ok(Some(source.to_owned()))
    }

    fn add_watch_file(&self, path: &Path) {
        self.watched.lock().unwrap().push(path.to_path_buf());
    }

    fn emit_chunk(&self, chunk: &ChunkSpec<'_>) -> Result<String> {
        let mut chunks = self.chunks.lock().unwrap();
        let reference = format!("chunkref{:02}", chunks.len());
        chunks.push(chunk.id.to_owned());
        Ok(reference)
    }

    fn warn(&self, message: &str) {
        self.warnings.lock().unwrap().push(message.to_owned());
    }

    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_owned());
    }

    fn debug(&self, message: &str) {
        self.debugs.lock().unwrap().push(message.to_owned());
    }

    fn watch_mode(&self) -> bool {
        self.watch
    }
}

// =============================================================================
// FakeTranspiler
// =============================================================================

/// Transpiler stand-in: the "compiled module" is just the entry path,
/// which [`FakeRuntime`] uses to look up the registered generator.
#[derive(Default, Clone)]
pub struct FakeTranspiler {
    pub extra_inputs: Vec<PathBuf>,
}

impl Transpiler for FakeTranspiler {
    fn transpile(&self, request: &TranspileRequest<'_>) -> Result<TranspileOutput> {
        assert!(request.options.bundle);
        assert!(!request.options.minify);
        fs::write(request.outfile, request.entry.to_string_lossy().as_bytes())?;
        let manifest = request.want_manifest.then(|| {
            let mut inputs = vec![request.entry.to_path_buf()];
            inputs.extend(self.extra_inputs.iter().cloned());
            inputs
        });
        Ok(TranspileOutput { manifest })
    }
}

// =============================================================================
// FakeRuntime
// =============================================================================

pub type Gen = Arc<dyn Fn(&mut GeneratorScope<'_>) -> Result<String> + Send + Sync>;

/// Build a shareable generator closure.
pub fn gen_fn(
    f: impl Fn(&mut GeneratorScope<'_>) -> Result<String> + Send + Sync + 'static,
) -> Gen {
    Arc::new(f)
}

/// Export surface and behavior of one fake generator module.
#[derive(Clone)]
pub struct ModuleSpec {
    pub exports: Vec<String>,
    pub wrap_default: bool,
    pub side_effects: SideEffects,
    pub generate: Option<Gen>,
}

impl ModuleSpec {
    pub fn generator(r#gen: Gen) -> Self {
        Self {
            exports: vec!["generate".to_owned()],
            wrap_default: false,
            side_effects: SideEffects::Inherit,
            generate: Some(r#gen),
        }
    }
}

/// Generator runtime stand-in, keyed by owner path.
#[derive(Default, Clone)]
pub struct FakeRuntime {
    specs: Arc<Mutex<HashMap<PathBuf, ModuleSpec>>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, owner: impl Into<PathBuf>, r#gen: Gen) {
        self.register_spec(owner, ModuleSpec::generator(r#gen));
    }

    pub fn register_spec(&self, owner: impl Into<PathBuf>, spec: ModuleSpec) {
        self.specs.lock().unwrap().insert(owner.into(), spec);
    }
}

struct FakeModule {
    spec: ModuleSpec,
}

impl GeneratorModule for FakeModule {
    fn exports(&self) -> Vec<String> {
        if self.spec.wrap_default {
            vec!["default".to_owned()]
        } else {
            self.spec.exports.clone()
        }
    }

    fn unwrap_default(self: Box<Self>) -> Box<dyn GeneratorModule> {
        if self.spec.wrap_default {
            Box::new(FakeModule {
                spec: ModuleSpec {
                    wrap_default: false,
                    ..self.spec
                },
            })
        } else {
            self
        }
    }

    fn generate(&self, scope: &mut GeneratorScope<'_>) -> Result<String> {
        match &self.spec.generate {
            Some(f) => f(scope),
            None => Err(scope.error("no generator registered for this owner")),
        }
    }

    fn side_effects(&self) -> SideEffects {
        self.spec.side_effects
    }
}

impl GeneratorRuntime for FakeRuntime {
    fn load(&self, compiled: &Path) -> Result<Box<dyn GeneratorModule>> {
        let owner = PathBuf::from(fs::read_to_string(compiled)?);
        let spec = self
            .specs
            .lock()
            .unwrap()
            .get(&owner)
            .cloned()
            .ok_or_else(|| {
                Error::generation(owner.clone(), "no fake generator registered for this owner")
            })?;
        Ok(Box::new(FakeModule { spec }))
    }
}

// =============================================================================
// FakeCompiler
// =============================================================================

/// Extract the specifier from an `export * from "spec";` line.
pub fn export_star_specifier(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("export * from ")?;
    let rest = rest.trim().trim_end_matches(';').trim();
    rest.strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .or_else(|| rest.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))
}

fn infer_type(value: &str) -> &'static str {
    if value.starts_with('"') || value.starts_with('\'') || value.starts_with('`') {
        "string"
    } else if value == "true" || value == "false" {
        "boolean"
    } else if value.parse::<f64>().is_ok() {
        "number"
    } else {
        "unknown"
    }
}

/// Parse `NAME: TYPE = VALUE;` / `NAME = VALUE;` after `export const `.
fn parse_const(rest: &str) -> Option<(String, String)> {
    let (head, value) = rest.split_once('=')?;
    let head = head.trim();
    let value = value.trim().trim_end_matches(';').trim();
    match head.split_once(':') {
        Some((name, ty)) => Some((name.trim().to_owned(), ty.trim().to_owned())),
        None => Some((head.to_owned(), infer_type(value).to_owned())),
    }
}

/// Type-compiler stand-in: a naive declaration emitter. Walks the module
/// graph from the entry (following `export * from` through the alias
/// table), and for every visited file writes a `.d.ts` next to it into
/// the captured view: kept import lines, kept `export *` lines, one
/// `declare const` per exported constant, and an `export { ... };`
/// summary line.
pub struct FakeCompiler;

impl TypeCompiler for FakeCompiler {
    fn emit_declarations(
        &self,
        entry: &Path,
        aliases: &[(Token, Vec<PathBuf>)],
        fs: &mut dyn FileAccess,
    ) -> Result<()> {
        let alias_map: HashMap<&str, &Path> = aliases
            .iter()
            .filter_map(|(token, paths)| {
                paths.first().map(|p| (token.as_str(), p.as_path()))
            })
            .collect();

        let mut queue = VecDeque::from([entry.to_path_buf()]);
        let mut visited: HashSet<PathBuf> = HashSet::new();
        while let Some(path) = queue.pop_front() {
            if !visited.insert(path.clone()) {
                continue;
            }
            let Some(code) = fs.read(&path) else { continue };

            let mut imports: Vec<String> = Vec::new();
            let mut stars: Vec<String> = Vec::new();
            let mut declares: Vec<String> = Vec::new();
            let mut names: Vec<String> = Vec::new();
            for raw in code.lines() {
                let line = raw.trim();
                if line.is_empty() {
                    continue;
                }
                if line.starts_with("import ") {
                    imports.push(line.to_owned());
                    continue;
                }
                if let Some(spec) = export_star_specifier(line) {
                    stars.push(line.to_owned());
                    if let Some(target) = alias_map.get(spec) {
                        queue.push_back(target.to_path_buf());
                    }
                    continue;
                }
                if let Some(rest) = line.strip_prefix("export const ")
                    && let Some((name, ty)) = parse_const(rest)
                {
                    declares.push(format!("declare const {name}: {ty};"));
                    names.push(name);
                }
            }

            let mut out = String::new();
            for import in &imports {
                out.push_str(import);
                out.push('\n');
            }
            for star in &stars {
                out.push_str(star);
                out.push('\n');
            }
            for declare in &declares {
                out.push_str(declare);
                out.push('\n');
            }
            if !names.is_empty() {
                out.push_str(&format!("export {{ {} }};\n", names.join(", ")));
            } else if stars.is_empty() && imports.is_empty() {
                out.push_str("export {};\n");
            }
            let decl = pattern::to_decl_path(&path.to_string_lossy());
            fs.write(Path::new(&decl), out);
        }
        Ok(())
    }
}

// =============================================================================
// FakeDtsBundler
// =============================================================================

/// Declaration-bundler stand-in: flattens `export * from` re-exports into
/// one chunk by inlining each virtual declaration in resolution order.
#[derive(Default, Clone)]
pub struct FakeDtsBundler {
    pub calls: Arc<AtomicUsize>,
    pub force_chunks: Option<usize>,
}

impl FakeDtsBundler {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn absorb(
    importer: &Path,
    code: &str,
    pilot: &dyn MergePilot,
    imports: &mut Vec<String>,
    declares: &mut Vec<String>,
    names: &mut Vec<String>,
) -> Result<()> {
    for raw in code.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("import ") {
            if !imports.iter().any(|i| i == line) {
                imports.push(line.to_owned());
            }
            continue;
        }
        if let Some(spec) = export_star_specifier(line) {
            match pilot.resolve(spec, Some(importer), false) {
                MergeResolution::Virtual(path) => {
                    let code = pilot.load(&path)?;
                    absorb(&path, &code, pilot, imports, declares, names)?;
                }
                MergeResolution::External(source) => {
                    imports.push(format!("export * from \"{source}\";"));
                }
                MergeResolution::Entry | MergeResolution::Excluded => {}
            }
            continue;
        }
        if line.starts_with("declare const ") {
            declares.push(line.to_owned());
            if let Some(name) = line
                .strip_prefix("declare const ")
                .and_then(|rest| rest.split(':').next())
            {
                names.push(name.trim().to_owned());
            }
        }
        // `export { ... };` summary lines are rebuilt from the collected
        // declares, not copied.
    }
    Ok(())
}

impl DeclarationBundler for FakeDtsBundler {
    fn bundle(&self, entry: &Path, pilot: &dyn MergePilot) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(count) = self.force_chunks {
            return Ok(vec![String::new(); count]);
        }
        let root = pilot.load(entry)?;
        let mut imports = Vec::new();
        let mut declares = Vec::new();
        let mut names = Vec::new();
        absorb(entry, &root, pilot, &mut imports, &mut declares, &mut names)?;

        let mut out = String::new();
        for import in &imports {
            out.push_str(import);
            out.push('\n');
        }
        for declare in &declares {
            out.push_str(declare);
            out.push('\n');
        }
        if names.is_empty() {
            out.push_str("export {};\n");
        } else {
            out.push_str(&format!("export {{ {} }};\n", names.join(", ")));
        }
        Ok(vec![out])
    }
}

// =============================================================================
// Fixture helpers
// =============================================================================

/// Assemble a plugin from fakes.
pub fn build_plugin(options: Options, runtime: FakeRuntime) -> GenmodPlugin {
    GenmodPlugin::new(
        options,
        Toolchain::new(
            FakeTranspiler::default(),
            runtime,
            FakeCompiler,
            FakeDtsBundler::default(),
        ),
    )
}

/// Assemble a plugin with explicit transpiler/bundler fakes.
pub fn build_plugin_with(
    options: Options,
    transpiler: FakeTranspiler,
    runtime: FakeRuntime,
    bundler: FakeDtsBundler,
) -> GenmodPlugin {
    GenmodPlugin::new(
        options,
        Toolchain::new(transpiler, runtime, FakeCompiler, bundler),
    )
}

/// Options tuned for the suite: no banner, no cache, declarations on.
pub fn test_options() -> OptionsBuilder {
    Options::builder()
        .declaration_banner("")
        .build_cache(CacheMode::Off)
        .watch_cache(CacheMode::Off)
}

/// Run resolve + load for one owner path, returning the loaded module.
pub fn resolve_and_load(
    plugin: &GenmodPlugin,
    host: &FakeHost,
    source: &str,
) -> Result<Loaded> {
    let resolution = plugin
        .resolve_id(source, None, host)?
        .expect("source should resolve as a generating file");
    let loaded = plugin
        .load(&resolution.id, Some(&resolution.meta), host)?
        .expect("resolved generating file should load");
    Ok(loaded)
}

/// Distinct token-shaped words in `text`, in first-appearance order.
pub fn extract_tokens(text: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for word in text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$')) {
        if word.len() == genmod::token::TOKEN_LEN
            && word.bytes().all(|b| TOKEN_ALPHABET.contains(&b))
            && !out.iter().any(|w| w == word)
        {
            out.push(word.to_owned());
        }
    }
    out
}

/// Rewrite `text` under a positional token mapping.
pub fn rename_tokens(text: &str, from: &[String], to: &[String]) -> String {
    let mut out = text.to_owned();
    for (old, new) in from.iter().zip(to) {
        out = out.replace(old, new);
    }
    out
}
