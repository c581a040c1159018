//! Writing the flat arrays to disk for the kernel-dispatch side.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rtbvh::{Bvh, BvhStats};

/// Write `boxes.bin`, `nodes.bin`, `primitives.bin` and `stats.json` into `dir`.
///
/// The binaries are the raw in-memory records (little-endian on every
/// platform we upload from): 6 f32 per box, 5 i32 per node, 1 u32 per primitive.
pub fn write_arrays(bvh: &Bvh<'_>, stats: &BvhStats, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    write_bytes(&dir.join("boxes.bin"), bytemuck::cast_slice(bvh.box_floats()))?;
    write_bytes(&dir.join("nodes.bin"), bytemuck::cast_slice(bvh.node_words()))?;
    write_bytes(
        &dir.join("primitives.bin"),
        bytemuck::cast_slice(bvh.primitive_indices()),
    )?;

    let json = serde_json::to_string_pretty(stats)?;
    write_bytes(&dir.join("stats.json"), json.as_bytes())?;

    log::info!("Wrote BVH arrays to {}", dir.display());
    Ok(())
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    log::debug!("{}: {} bytes", path.display(), bytes.len());
    Ok(())
}
