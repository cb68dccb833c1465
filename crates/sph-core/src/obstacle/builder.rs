use std::collections::HashMap;

use glam::{Affine3A, IVec3, Vec3};

use super::model_3ds::Model3ds;
use super::ObstacleMesh;

/// A mesh in a transform hierarchy. `local_transform` places the node in
/// its parent's space.
#[derive(Clone, Debug, Default)]
pub struct MeshNode {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub local_transform: Affine3A,
    pub children: Vec<MeshNode>,
}

impl MeshNode {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
            local_transform: Affine3A::IDENTITY,
            children: Vec::new(),
        }
    }

    /// Node with no geometry of its own.
    pub fn group() -> Self {
        Self::default()
    }

    pub fn with_transform(mut self, transform: Affine3A) -> Self {
        self.local_transform = transform;
        self
    }

    pub fn with_child(mut self, child: MeshNode) -> Self {
        self.children.push(child);
        self
    }
}

impl From<Model3ds> for MeshNode {
    fn from(model: Model3ds) -> Self {
        MeshNode::new(model.vertices, model.faces)
    }
}

/// What the builder had to drop or merge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuildDiagnostics {
    pub input_triangles: usize,
    pub output_triangles: usize,
    /// Triangles referencing a vertex that does not exist.
    pub invalid_index_triangles: usize,
    /// Triangles with a NaN/Inf vertex after transformation.
    pub non_finite_triangles: usize,
    /// Triangles that collapsed to zero area after simplification.
    pub degenerate_triangles: usize,
    /// Vertices folded into another by clustering.
    pub merged_vertices: usize,
}

#[derive(Clone, Debug)]
pub struct ObstacleBuild {
    pub mesh: ObstacleMesh,
    pub diagnostics: BuildDiagnostics,
}

/// Flatten a node hierarchy into one indexed mesh in the root's space.
///
/// The root's own `local_transform` is not applied; each descendant is
/// placed by the product of the transforms from the root's child down to
/// it. Triangles whose indices fall outside their node's vertex list are
/// dropped and counted.
pub fn combine_meshes(root: &MeshNode) -> (Vec<Vec3>, Vec<[u32; 3]>, usize) {
    let mut vertices = Vec::new();
    let mut triangles = Vec::new();
    let mut invalid = 0;

    let mut stack = vec![(root, Affine3A::IDENTITY)];
    while let Some((node, to_root)) = stack.pop() {
        let base = vertices.len() as u32;
        let n = node.vertices.len() as u32;
        vertices.extend(node.vertices.iter().map(|&v| to_root.transform_point3(v)));
        for tri in &node.triangles {
            if tri.iter().any(|&i| i >= n) {
                invalid += 1;
                continue;
            }
            triangles.push(tri.map(|i| i + base));
        }
        // Reverse so children are emitted in declaration order.
        for child in node.children.iter().rev() {
            stack.push((child, to_root * child.local_transform));
        }
    }

    (vertices, triangles, invalid)
}

/// Merge vertices that fall in the same `tolerance`-sized grid cell and
/// drop triangles that collapse.
///
/// Each cluster is replaced by the mean of its members. A non-positive
/// tolerance disables clustering, leaving only the degenerate-triangle
/// filter. Returns the new vertex list, the surviving triangles, and the
/// merged and degenerate counts.
pub fn simplify_triangles(
    vertices: &[Vec3],
    triangles: &[[u32; 3]],
    tolerance: f32,
) -> (Vec<Vec3>, Vec<[u32; 3]>, usize, usize) {
    let (out_vertices, remap) = if tolerance > 0.0 && tolerance.is_finite() {
        let inv = 1.0 / tolerance;
        let mut clusters: HashMap<IVec3, u32> = HashMap::new();
        let mut sums: Vec<(Vec3, u32)> = Vec::new();
        let remap: Vec<u32> = vertices
            .iter()
            .map(|&v| {
                let key = (v * inv).floor().as_ivec3();
                let id = *clusters.entry(key).or_insert_with(|| {
                    sums.push((Vec3::ZERO, 0));
                    (sums.len() - 1) as u32
                });
                let slot = &mut sums[id as usize];
                slot.0 += v;
                slot.1 += 1;
                id
            })
            .collect();
        let merged: Vec<Vec3> = sums.iter().map(|&(s, n)| s / n as f32).collect();
        (merged, remap)
    } else {
        (vertices.to_vec(), (0..vertices.len() as u32).collect())
    };
    let merged = vertices.len() - out_vertices.len();

    let mut degenerate = 0;
    let out_triangles: Vec<[u32; 3]> = triangles
        .iter()
        .filter_map(|tri| {
            if tri.iter().any(|&i| i as usize >= remap.len()) {
                degenerate += 1;
                return None;
            }
            let [a, b, c] = tri.map(|i| remap[i as usize]);
            let (pa, pb, pc) = (
                out_vertices[a as usize],
                out_vertices[b as usize],
                out_vertices[c as usize],
            );
            if a == b || b == c || a == c || (pb - pa).cross(pc - pa).length_squared() <= 0.0 {
                degenerate += 1;
                None
            } else {
                Some([a, b, c])
            }
        })
        .collect();

    (out_vertices, out_triangles, merged, degenerate)
}

/// Build the world-space collision mesh for a model hierarchy.
///
/// Combines every node into the root's space, applies `world_transform`,
/// then simplifies with `tolerance` (world units). Bad input never fails
/// the build: offending triangles are dropped, counted in the returned
/// diagnostics and logged.
pub fn build_obstacle(root: &MeshNode, world_transform: Affine3A, tolerance: f32) -> ObstacleBuild {
    let (local, triangles, invalid) = combine_meshes(root);
    let mut diagnostics = BuildDiagnostics {
        input_triangles: triangles.len() + invalid,
        invalid_index_triangles: invalid,
        ..Default::default()
    };

    let world: Vec<Vec3> = local.iter().map(|&v| world_transform.transform_point3(v)).collect();
    let finite: Vec<[u32; 3]> = triangles
        .into_iter()
        .filter(|tri| tri.iter().all(|&i| world[i as usize].is_finite()))
        .collect();
    diagnostics.non_finite_triangles =
        diagnostics.input_triangles - invalid - finite.len();

    let (vertices, simplified, merged, degenerate) = simplify_triangles(&world, &finite, tolerance);
    diagnostics.merged_vertices = merged;
    diagnostics.degenerate_triangles = degenerate;
    diagnostics.output_triangles = simplified.len();

    let mesh = ObstacleMesh::from_triangles(
        simplified
            .iter()
            .map(|tri| tri.map(|i| vertices[i as usize])),
    );

    if mesh.is_empty() {
        log::warn!(
            "obstacle mesh is empty ({} input triangles)",
            diagnostics.input_triangles
        );
    } else if invalid + diagnostics.non_finite_triangles > 0 {
        log::warn!(
            "obstacle mesh dropped {} triangles with bad indices and {} with non-finite vertices",
            invalid,
            diagnostics.non_finite_triangles
        );
    }
    log::info!(
        "built obstacle mesh: {} -> {} triangles ({} vertices merged)",
        diagnostics.input_triangles,
        diagnostics.output_triangles,
        merged
    );

    ObstacleBuild { mesh, diagnostics }
}
