//! Static triangle obstacles: storage, collision queries, mesh building
//! and a minimal 3DS model reader.

pub mod builder;
pub mod collision;
pub mod model_3ds;

use glam::Vec3;

use crate::error::SimError;
pub use collision::{is_sphere_intersecting, sphere_triangle_hit, TriangleHit};

/// World-space triangle soup; triangle `k` is `vertices[3k..3k + 3]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObstacleMesh {
    vertices: Vec<Vec3>,
    min: Vec3,
    max: Vec3,
}

impl ObstacleMesh {
    pub fn new(vertices: Vec<Vec3>) -> Result<Self, SimError> {
        if vertices.len() % 3 != 0 {
            return Err(SimError::TriangleArrayLength(vertices.len()));
        }
        Ok(Self::from_triangles(
            vertices.chunks_exact(3).map(|t| [t[0], t[1], t[2]]),
        ))
    }

    pub fn from_triangles(triangles: impl IntoIterator<Item = [Vec3; 3]>) -> Self {
        let vertices: Vec<Vec3> = triangles.into_iter().flatten().collect();
        let (min, max) = vertices.iter().fold(
            (Vec3::splat(f32::INFINITY), Vec3::splat(f32::NEG_INFINITY)),
            |(lo, hi), &v| (lo.min(v), hi.max(v)),
        );
        Self { vertices, min, max }
    }

    /// Mesh with no triangles; every query misses.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn triangle_count(&self) -> usize {
        self.vertices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        self.vertices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    /// Bounding box of all vertices, `None` when the mesh is empty.
    pub fn aabb(&self) -> Option<(Vec3, Vec3)> {
        (!self.is_empty()).then_some((self.min, self.max))
    }

    /// First triangle, in storage order, touched by the sphere.
    pub fn first_hit(&self, center: Vec3, radius: f32) -> Option<TriangleHit> {
        if self.is_empty() {
            return None;
        }
        // Whole-mesh reject before walking the triangles.
        let pad = Vec3::splat(radius);
        if center.cmplt(self.min - pad).any() || center.cmpgt(self.max + pad).any() {
            return None;
        }
        self.triangles().enumerate().find_map(|(triangle, [a, b, c])| {
            sphere_triangle_hit(center, radius, a, b, c).map(|(normal, distance)| TriangleHit {
                normal,
                distance,
                triangle,
            })
        })
    }

    /// True when the sphere touches any triangle.
    pub fn intersects(&self, center: Vec3, radius: f32) -> bool {
        self.first_hit(center, radius).is_some()
    }
}
