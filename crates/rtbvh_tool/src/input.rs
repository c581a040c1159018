//! Triangle-soup sources: OBJ files and generated test lattices.

use std::path::Path;

use anyhow::{bail, Context, Result};
use rtbvh_math::Vec3;

/// Load every model in an OBJ file and expand it into a triangle soup.
///
/// Faces are triangulated; indexed vertices are duplicated per triangle.
pub fn load_obj_soup<P: AsRef<Path>>(path: P) -> Result<Vec<Vec3>> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        },
    )
    .with_context(|| format!("Failed to load OBJ file {}", path.display()))?;

    if models.is_empty() {
        bail!("No models found in OBJ file");
    }

    let mut vertices = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        let vertex_count = mesh.positions.len() / 3;

        for face in mesh.indices.chunks_exact(3) {
            for &idx in face {
                let i = idx as usize;
                if i >= vertex_count {
                    bail!(
                        "Model '{}' references vertex {} but has only {}",
                        model.name,
                        i,
                        vertex_count
                    );
                }
                vertices.push(Vec3::from_slice(&mesh.positions[i * 3..i * 3 + 3]));
            }
        }

        log::info!(
            "Loaded model '{}': {} vertices, {} triangles",
            model.name,
            vertex_count,
            mesh.indices.len() / 3
        );
    }

    Ok(vertices)
}

/// An `n x n x n` lattice of small right triangles, one per cell.
pub fn grid_soup(n: usize) -> Vec<Vec3> {
    let mut vertices = Vec::with_capacity(n * n * n * 3);

    for x in 0..n {
        for y in 0..n {
            for z in 0..n {
                let o = Vec3::new(x as f32, y as f32, z as f32) * 2.0;
                vertices.extend([o, o + Vec3::X, o + Vec3::Y]);
            }
        }
    }

    vertices
}
