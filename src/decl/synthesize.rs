//! Declaration synthesis (no-bundle pass).
//!
//! One declaration-only compile of the owner against a file-system view
//! where the in-memory generated source shadows the owner path (the
//! on-disk content is the *generator*, not its output) and every
//! registered virtual file is readable at its synthetic path. Everything
//! else falls through to the real filesystem. Compiler outputs are
//! captured in the same view, never written to disk.

use std::path::Path;

use crate::error::Result;
use crate::registry::VirtualFileRegistry;
use crate::toolchain::TypeCompiler;
use crate::vfs::OverlayFs;

/// Run the declaration-only compile for `owner` and return the captured
/// view: seeded sources plus every declaration output the compiler wrote.
pub(crate) fn no_bundle_pass(
    owner: &Path,
    code: &str,
    registry: &VirtualFileRegistry,
    compiler: &dyn TypeCompiler,
) -> Result<OverlayFs> {
    let mut view = OverlayFs::with_fallthrough();
    for (path, token) in registry.reverse_index() {
        view.seed(&path, registry.content_of(&token)?);
    }
    view.seed(owner, code);

    let aliases = registry.path_aliases();
    compiler.emit_declarations(owner, &aliases, &mut view)?;
    Ok(view)
}
