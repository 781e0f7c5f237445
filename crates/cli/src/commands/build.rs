//! Build-time manifest injection.

use crate::args::InjectArgs;
use anyhow::{Context, Result};
use snipshelf_client::manifest::{PrecacheManifest, inject as inject_manifest, scan_dist};

/// Scan the build output, build the manifest, and write the worker into it.
pub fn inject(args: InjectArgs) -> Result<()> {
    let outputs = scan_dist(&args.dist)?;
    let manifest = PrecacheManifest::build(&outputs, &args.base);

    let source = std::fs::read_to_string(&args.worker)
        .with_context(|| format!("failed to read worker source {}", args.worker.display()))?;
    let injection = inject_manifest(&source, &manifest);

    let target = args.dist.join(&injection.artifact.file_name);
    std::fs::write(&target, &injection.artifact.source)
        .with_context(|| format!("failed to write {}", target.display()))?;

    if let Some(path) = &args.manifest_out {
        std::fs::write(path, manifest.to_json()).with_context(|| format!("failed to write {}", path.display()))?;
    }

    println!("{} ({} entries)", target.display(), manifest.len());
    Ok(())
}
