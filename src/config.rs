//! Plugin options.
//!
//! Use [`Options::builder`] for the fluent form:
//!
//! ```ignore
//! use genmod::config::{CacheMode, Options};
//!
//! let options = Options::builder()
//!     .emit_declarations(true)
//!     .exclude(["**/legacy/**"])
//!     .declaration_banner("/* eslint-disable */")
//!     .build_cache(CacheMode::Filesystem)
//!     .build()?;
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{Error, Result};
use crate::toolchain::TranspileOptions;

/// Default banner prepended to declaration artifacts.
pub const DEFAULT_DECLARATION_BANNER: &str = "/* eslint-disable */";

/// Default cache root, relative to the project root.
pub const DEFAULT_CACHE_ROOT: &str = "node_modules/.genmod-cache";

// =============================================================================
// CacheMode
// =============================================================================

/// Content cache strategy for one build mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Read and write persisted entries under the cache root.
    Filesystem,
    /// Never consult or write the cache.
    Off,
}

// =============================================================================
// Transpile overrides
// =============================================================================

/// Per-file transpile option overrides: a static object or a callback.
pub enum TranspileOverrides {
    /// The same options for every generating file.
    Static(TranspileOptions),
    /// Options computed per generating file.
    PerFile(Box<dyn Fn(&Path) -> TranspileOptions + Send + Sync>),
}

impl Default for TranspileOverrides {
    fn default() -> Self {
        Self::Static(TranspileOptions::default())
    }
}

impl fmt::Debug for TranspileOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(options) => f.debug_tuple("Static").field(options).finish(),
            Self::PerFile(_) => f.debug_tuple("PerFile").field(&"..").finish(),
        }
    }
}

// =============================================================================
// Options
// =============================================================================

/// Recognized plugin options.
#[derive(Debug)]
pub struct Options {
    /// Emit a declaration artifact next to each generating file.
    /// Default `true`.
    pub emit_declarations: bool,
    /// Paths matching any of these globs are never treated as generating
    /// files, even when they match the naming convention.
    pub(crate) exclude: Option<GlobSet>,
    /// Transpile option overrides for the generator compile step.
    pub transpile: TranspileOverrides,
    /// Banner prepended to declaration artifacts. Empty disables it.
    pub declaration_banner: String,
    /// Cache root, relative to the project root.
    pub cache_root: PathBuf,
    /// Cache strategy for watch-mode builds. Default filesystem.
    pub watch_cache: CacheMode,
    /// Cache strategy for one-shot builds. Default off.
    pub build_cache: CacheMode,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            emit_declarations: true,
            exclude: None,
            transpile: TranspileOverrides::default(),
            declaration_banner: DEFAULT_DECLARATION_BANNER.to_owned(),
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            watch_cache: CacheMode::Filesystem,
            build_cache: CacheMode::Off,
        }
    }
}

impl Options {
    /// Start building options fluently.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    /// Whether `path` is excluded from generation.
    pub(crate) fn is_excluded(&self, path: &str) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|set| set.is_match(Path::new(path)))
    }

    /// The transpile options to use for `id`.
    pub(crate) fn transpile_options_for(&self, id: &Path) -> TranspileOptions {
        match &self.transpile {
            TranspileOverrides::Static(options) => options.clone(),
            TranspileOverrides::PerFile(f) => f(id),
        }
    }
}

// =============================================================================
// OptionsBuilder
// =============================================================================

/// Fluent builder for [`Options`].
#[derive(Default)]
pub struct OptionsBuilder {
    emit_declarations: Option<bool>,
    exclude: Vec<String>,
    transpile: Option<TranspileOverrides>,
    declaration_banner: Option<String>,
    cache_root: Option<PathBuf>,
    watch_cache: Option<CacheMode>,
    build_cache: Option<CacheMode>,
}

impl OptionsBuilder {
    /// Toggle declaration emission. Default `true`.
    pub fn emit_declarations(mut self, emit: bool) -> Self {
        self.emit_declarations = Some(emit);
        self
    }

    /// Add glob patterns for files that must never be treated as
    /// generating files.
    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude
            .extend(patterns.into_iter().map(|p| p.as_ref().to_owned()));
        self
    }

    /// Use the same transpile options for every generating file.
    pub fn transpile_options(mut self, options: TranspileOptions) -> Self {
        self.transpile = Some(TranspileOverrides::Static(options));
        self
    }

    /// Compute transpile options per generating file.
    pub fn transpile_options_with(
        mut self,
        f: impl Fn(&Path) -> TranspileOptions + Send + Sync + 'static,
    ) -> Self {
        self.transpile = Some(TranspileOverrides::PerFile(Box::new(f)));
        self
    }

    /// Set the declaration banner. An empty string disables the banner.
    pub fn declaration_banner(mut self, banner: impl Into<String>) -> Self {
        self.declaration_banner = Some(banner.into());
        self
    }

    /// Set the cache root path.
    pub fn cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Set the watch-mode cache strategy. Default filesystem.
    pub fn watch_cache(mut self, mode: CacheMode) -> Self {
        self.watch_cache = Some(mode);
        self
    }

    /// Set the one-shot build cache strategy. Default off.
    pub fn build_cache(mut self, mode: CacheMode) -> Self {
        self.build_cache = Some(mode);
        self
    }

    /// Build the options, compiling the exclusion matcher.
    pub fn build(self) -> Result<Options> {
        let defaults = Options::default();
        let exclude = if self.exclude.is_empty() {
            None
        } else {
            let mut set = GlobSetBuilder::new();
            for pattern in &self.exclude {
                let glob = Glob::new(pattern).map_err(|e| {
                    Error::configuration(
                        format!("invalid exclude pattern {pattern:?}: {e}"),
                        "exclude patterns use glob syntax, e.g. \"**/legacy/**\"",
                    )
                })?;
                set.add(glob);
            }
            Some(set.build().map_err(|e| {
                Error::configuration(
                    format!("could not compile exclude patterns: {e}"),
                    "exclude patterns use glob syntax, e.g. \"**/legacy/**\"",
                )
            })?)
        };
        Ok(Options {
            emit_declarations: self
                .emit_declarations
                .unwrap_or(defaults.emit_declarations),
            exclude,
            transpile: self.transpile.unwrap_or_default(),
            declaration_banner: self
                .declaration_banner
                .unwrap_or(defaults.declaration_banner),
            cache_root: self.cache_root.unwrap_or(defaults.cache_root),
            watch_cache: self.watch_cache.unwrap_or(defaults.watch_cache),
            build_cache: self.build_cache.unwrap_or(defaults.build_cache),
        })
    }
}
