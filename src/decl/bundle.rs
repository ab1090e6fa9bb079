//! Declaration merge pass.
//!
//! When an owner produced more than one virtual file, its no-bundle
//! declaration is a thin list of `export * from <token>` re-exports. This
//! pass runs the external declaration bundler over a fully sandboxed view
//! of the no-bundle outputs so those re-exports resolve to each virtual
//! file's own declaration, producing one merged file.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::host::HostContext;
use crate::pattern;
use crate::registry::VirtualFileRegistry;
use crate::toolchain::{DeclarationBundler, MergePilot, MergeResolution};
use crate::vfs::{FileAccess, OverlayFs};

// =============================================================================
// DeclMergePilot
// =============================================================================

/// The interception plugin for the merge pass: the synthetic root is the
/// only legitimate entry, token specifiers map to declaration paths
/// inside the sandbox, genuine relative references pass through
/// untouched, and everything else is silently excluded.
struct DeclMergePilot {
    entry: PathBuf,
    view: OverlayFs,
    aliases: FxHashMap<String, PathBuf>,
}

impl MergePilot for DeclMergePilot {
    fn resolve(&self, source: &str, importer: Option<&Path>, is_entry: bool) -> MergeResolution {
        if Path::new(source) == self.entry {
            return MergeResolution::Entry;
        }
        if importer.is_none() || is_entry {
            // Nothing but the synthetic root may enter the graph.
            return MergeResolution::Excluded;
        }
        if let Some(target) = self.aliases.get(source) {
            return MergeResolution::Virtual(target.clone());
        }
        if source.starts_with('.') {
            // A hand-written sibling the consuming project resolves.
            return MergeResolution::External(source.to_owned());
        }
        MergeResolution::Excluded
    }

    fn load(&self, id: &Path) -> Result<String> {
        self.view.read(id).ok_or_else(|| Error::SandboxEscape {
            id: id.to_path_buf(),
        })
    }
}

// =============================================================================
// Merge pass
// =============================================================================

/// Bundle the declaration graph rooted at `entry` into one chunk.
pub(crate) fn merge_pass(
    host: &dyn HostContext,
    owner: &Path,
    entry: &Path,
    outputs: OverlayFs,
    registry: &VirtualFileRegistry,
    bundler: &dyn DeclarationBundler,
) -> Result<String> {
    // Token → the virtual file's own declaration path. Every virtual file
    // was compiled alongside the owner in the no-bundle pass, so the
    // target is resolvable through the sandboxed view.
    let aliases: FxHashMap<String, PathBuf> = registry
        .path_aliases()
        .into_iter()
        .filter_map(|(token, paths)| {
            let path = paths.into_iter().next()?;
            let decl = pattern::to_decl_path(&path.to_string_lossy());
            Some((token.to_string(), PathBuf::from(decl)))
        })
        .collect();

    let pilot = DeclMergePilot {
        entry: entry.to_path_buf(),
        view: outputs.into_sandbox(),
        aliases,
    };
    let mut chunks = bundler.bundle(entry, &pilot)?;
    if chunks.len() != 1 {
        return Err(Error::DeclarationMerge {
            owner: owner.to_path_buf(),
            chunks: chunks.len(),
        });
    }
    host.debug(&format!(
        "merged declaration bundle for {}",
        owner.display()
    ));
    Ok(chunks.pop().unwrap_or_default())
}
