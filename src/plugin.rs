//! Plugin hook surface.
//!
//! [`GenmodPlugin`] is what the embedding host wires into its build: a
//! resolve/load pair for generating files and a second resolve/load pair
//! for the virtual files they emit. The second pair exists because the
//! host invokes resolution independently of the invocation that created
//! the registry entries; the [`crate::host::ModuleMeta`] tag attached at
//! resolve time is the only channel between them.

use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashSet;

use crate::cache::{self, CacheEntry, ContentCache, Emission};
use crate::config::{CacheMode, Options};
use crate::decl;
use crate::error::{Error, Result};
use crate::generate;
use crate::host::{HostContext, Loaded, ModuleMeta, Resolution};
use crate::pattern;
use crate::registry::{SideEffects, VirtualFileRegistry};
use crate::toolchain::Toolchain;

// =============================================================================
// GenmodPlugin
// =============================================================================

/// The code-generation plugin.
///
/// Construct one per build pipeline and route the host's hooks into it.
/// All state is behind locks, so hooks for different owner files may run
/// from different threads.
pub struct GenmodPlugin {
    options: Options,
    toolchain: Toolchain,
    registry: VirtualFileRegistry,
    cache: RwLock<Option<ContentCache>>,
    /// Owners already generated in this run; guards the one-generation-
    /// per-build invariant.
    generated: Mutex<FxHashSet<PathBuf>>,
}

impl GenmodPlugin {
    /// Create a plugin with the given options and external toolchain.
    pub fn new(options: Options, toolchain: Toolchain) -> Self {
        Self {
            options,
            toolchain,
            registry: VirtualFileRegistry::new(),
            cache: RwLock::new(None),
            generated: Mutex::new(FxHashSet::default()),
        }
    }

    /// The virtual file registry backing this plugin.
    pub fn registry(&self) -> &VirtualFileRegistry {
        &self.registry
    }

    /// Build-start hook: reset per-run state and resolve the cache root
    /// for this build mode.
    pub fn build_start(&self, host: &dyn HostContext) -> Result<()> {
        self.generated.lock().clear();
        let watch = host.watch_mode();
        let mode = if watch {
            self.options.watch_cache
        } else {
            self.options.build_cache
        };
        let cache = ContentCache::new(&self.options.cache_root, mode, watch)?;
        *self.cache.write() = Some(cache);
        Ok(())
    }

    // =========================================================================
    // Generating-file hooks
    // =========================================================================

    /// Resolve hook for generating files.
    ///
    /// The query fragment is stripped before asking the host to resolve,
    /// then re-attached for matching so `foo.gen.ts?x=1` is recognized,
    /// and preserved in the tag so the host's de-duplication by specifier
    /// is not defeated.
    pub fn resolve_id(
        &self,
        source: &str,
        importer: Option<&str>,
        host: &dyn HostContext,
    ) -> Result<Option<Resolution>> {
        let stripped_source = pattern::strip_query(source);
        let Some(resolved) = host.resolve(stripped_source, importer)? else {
            return Ok(None);
        };
        let resolved_source = if pattern::has_extension(&resolved) {
            format!("{resolved}{}", &source[stripped_source.len()..])
        } else {
            source.to_owned()
        };
        if !pattern::is_generator_path(&resolved_source)
            || self.options.is_excluded(&resolved_source)
        {
            return Ok(None);
        }
        Ok(Some(Resolution {
            id: resolved,
            side_effects: SideEffects::Inherit,
            meta: ModuleMeta::Generator { resolved_source },
        }))
    }

    /// Load hook for generating files.
    ///
    /// Serves the generated code from the cache when possible, otherwise
    /// invokes the generator; on a fresh generation with declarations
    /// enabled, also runs the declaration pipeline and writes the sibling
    /// artifact.
    pub fn load(
        &self,
        id: &str,
        meta: Option<&ModuleMeta>,
        host: &dyn HostContext,
    ) -> Result<Option<Loaded>> {
        let Some(ModuleMeta::Generator { resolved_source }) = meta else {
            return Ok(None);
        };
        tracing::trace!(id, "generating-file load hook");
        let owner = pattern::owner_identity(resolved_source);
        let (fresh, loaded) = self.transform(host, &owner)?;
        if self.options.emit_declarations && fresh {
            decl::emit_for(
                host,
                &owner,
                &loaded.code,
                &self.registry,
                &self.toolchain,
                &self.options,
            )?;
        }
        Ok(Some(loaded))
    }

    /// Produce the generated code for `owner`, from cache or fresh.
    /// Returns whether the generation was fresh.
    #[tracing::instrument(level = "debug", skip_all, fields(owner = %owner.display()))]
    fn transform(&self, host: &dyn HostContext, owner: &Path) -> Result<(bool, Loaded)> {
        let cache_guard = self.cache.read();
        let Some(cache) = cache_guard.as_ref() else {
            return Err(Error::configuration(
                "load hook ran before build_start",
                "call GenmodPlugin::build_start from the host's build-start hook",
            ));
        };

        let watch = host.watch_mode();
        {
            // Check-then-act under one guard: no suspension point splits
            // the re-entrancy check from the insert.
            let mut generated = self.generated.lock();
            if watch {
                // Watch the generator input file regardless of cache mode.
                host.add_watch_file(owner);
            } else if generated.contains(owner) {
                return Err(Error::Reentrancy {
                    owner: owner.to_path_buf(),
                });
            }
            generated.insert(owner.to_path_buf());
        }

        if cache.mode() == CacheMode::Filesystem
            && let Some(entry) = cache.load(host, owner)?
        {
            let (code, side_effects) = cache::replay(entry, &mut |emission| match emission {
                Emission::File { args, .. } => Ok(self.registry.register(args, owner)),
                Emission::Chunk { args, .. } => {
                    generate::emit_chunk_raw(host, &self.registry, args, owner)
                }
            })?;
            return Ok((false, Loaded { code, side_effects }));
        }

        let invoked = generate::invoke(host, owner, &self.options, &self.toolchain, &self.registry)?;
        let entry = CacheEntry::new(
            invoked.code.clone(),
            invoked.side_effects,
            invoked.emissions,
        );
        cache.store(owner, &entry)?;
        Ok((
            true,
            Loaded {
                code: invoked.code,
                side_effects: invoked.side_effects,
            },
        ))
    }

    // =========================================================================
    // Virtual-file hooks
    // =========================================================================

    /// Resolve hook for virtual files: recognizes registered tokens used
    /// as import specifiers.
    pub fn resolve_virtual(&self, source: &str) -> Result<Option<Resolution>> {
        if !self.registry.contains(source) {
            return Ok(None);
        }
        self.registry.resolve(source).map(Some)
    }

    /// Load hook for virtual files: serves modules tagged as
    /// registry-owned at resolve time.
    pub fn load_virtual(&self, id: &str, meta: Option<&ModuleMeta>) -> Result<Option<Loaded>> {
        let Some(ModuleMeta::Virtual { token }) = meta else {
            return Ok(None);
        };
        let Some(file) = self.registry.get(token) else {
            return Err(Error::VirtualFileLoad {
                id: PathBuf::from(id),
            });
        };
        Ok(Some(Loaded {
            code: file.content,
            side_effects: file.side_effects,
        }))
    }
}
