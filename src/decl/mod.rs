//! Declaration pipeline.
//!
//! After a fresh generation, the owner's type signatures are synthesized
//! in two stages: a declaration-only compile against a virtual-file-aware
//! host ([`synthesize`]), and, only when the owner produced more than one
//! virtual file, a merge pass that stitches the per-virtual-file
//! declaration outputs into one ([`bundle`]). The result is written
//! directly to disk as a sibling artifact, outside the host bundler's
//! output pipeline.

mod bundle;
mod synthesize;

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::Options;
use crate::error::Result;
use crate::host::HostContext;
use crate::pattern;
use crate::registry::VirtualFileRegistry;
use crate::toolchain::Toolchain;

/// Run the declaration pipeline for a freshly generated owner and write
/// the sibling artifact.
#[tracing::instrument(level = "debug", skip_all, fields(owner = %owner.display()))]
pub(crate) fn emit_for(
    host: &dyn HostContext,
    owner: &Path,
    code: &str,
    registry: &VirtualFileRegistry,
    toolchain: &Toolchain,
    options: &Options,
) -> Result<()> {
    let owner_str = owner.to_string_lossy();
    let outputs = synthesize::no_bundle_pass(owner, code, registry, &*toolchain.compiler)?;
    let decl_entry = PathBuf::from(pattern::to_decl_path(&owner_str));

    let text = if registry.distinct_virtual_paths_of(owner) > 1 {
        bundle::merge_pass(
            host,
            owner,
            &decl_entry,
            outputs,
            registry,
            &*toolchain.declaration_bundler,
        )?
    } else {
        // Single-virtual-file (or none): the no-bundle output is the
        // declaration, verbatim.
        match outputs.get(&decl_entry) {
            Some(text) => text.to_owned(),
            None => {
                // Degraded but survivable: an empty declaration.
                host.warn(&format!(
                    "no declaration output emitted for {}",
                    owner.display()
                ));
                let mut written: Vec<String> = outputs
                    .entries()
                    .map(|(path, _)| path.display().to_string())
                    .collect();
                written.sort();
                host.debug(&format!(
                    "declaration compile for {} produced: [{}]",
                    owner.display(),
                    written.join(", ")
                ));
                String::new()
            }
        }
    };

    let artifact = pattern::to_artifact_path(&owner_str);
    let banner = &options.declaration_banner;
    let contents = if banner.is_empty() {
        text
    } else {
        format!("{banner}\n{text}")
    };
    fs::write(&artifact, contents)?;
    tracing::debug!(artifact = %artifact, "declaration artifact written");
    Ok(())
}
