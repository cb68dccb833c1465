use glam::Vec3;

/// Contact between a particle sphere and one triangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleHit {
    /// Triangle normal, flipped to point toward the sphere center.
    pub normal: Vec3,
    /// Distance from the sphere center to the triangle plane (>= 0).
    pub distance: f32,
    /// Index of the triangle in the mesh.
    pub triangle: usize,
}

/// Sphere vs triangle test.
///
/// 1. Reject if the plane distance exceeds `radius`.
/// 2. Project the center onto the plane.
/// 3. Accept if the projection's barycentric coordinates satisfy
///    `u >= 0, v >= 0, u + v < 1`.
///
/// Only the triangle interior counts; edge and vertex contacts whose
/// projection falls outside the triangle are not reported. Degenerate
/// triangles never report a hit.
pub fn sphere_triangle_hit(center: Vec3, radius: f32, a: Vec3, b: Vec3, c: Vec3) -> Option<(Vec3, f32)> {
    let ab = b - a;
    let ac = c - a;
    let n = ab.cross(ac).try_normalize()?;

    let signed = n.dot(center - a);
    let distance = signed.abs();
    if distance > radius {
        return None;
    }

    let p = center - signed * n;

    let v0 = ac;
    let v1 = ab;
    let v2 = p - a;
    let dot00 = v0.dot(v0);
    let dot01 = v0.dot(v1);
    let dot02 = v0.dot(v2);
    let dot11 = v1.dot(v1);
    let dot12 = v1.dot(v2);

    let denom = dot00 * dot11 - dot01 * dot01;
    if denom.abs() <= f32::EPSILON * dot00 * dot11 {
        return None;
    }
    let inv_denom = 1.0 / denom;
    let u = (dot11 * dot02 - dot01 * dot12) * inv_denom;
    let v = (dot00 * dot12 - dot01 * dot02) * inv_denom;

    if u >= 0.0 && v >= 0.0 && u + v < 1.0 {
        let normal = if signed < 0.0 { -n } else { n };
        Some((normal, distance))
    } else {
        None
    }
}

/// True when the sphere touches any triangle in a flat vertex list.
pub fn is_sphere_intersecting(center: Vec3, radius: f32, triangles: &[Vec3]) -> bool {
    triangles
        .chunks_exact(3)
        .any(|t| sphere_triangle_hit(center, radius, t[0], t[1], t[2]).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    const B: Vec3 = Vec3::new(1.0, 0.0, 0.0);
    const C: Vec3 = Vec3::new(0.0, 0.0, 1.0);

    #[test]
    fn test_hit_above_interior() {
        let hit = sphere_triangle_hit(Vec3::new(0.2, 0.05, 0.2), 0.1, A, B, C);
        let (normal, distance) = hit.expect("sphere above interior should hit");
        assert!((distance - 0.05).abs() < 1e-6);
        assert!(normal.y > 0.99, "normal should face the sphere: {normal}");
    }

    #[test]
    fn test_normal_flips_below_plane() {
        let (normal, _) = sphere_triangle_hit(Vec3::new(0.2, -0.05, 0.2), 0.1, A, B, C).unwrap();
        assert!(normal.y < -0.99);
    }

    #[test]
    fn test_miss_when_far_from_plane() {
        assert!(sphere_triangle_hit(Vec3::new(0.2, 0.5, 0.2), 0.1, A, B, C).is_none());
    }

    #[test]
    fn test_miss_outside_triangle() {
        assert!(sphere_triangle_hit(Vec3::new(0.9, 0.01, 0.9), 0.1, A, B, C).is_none());
        assert!(sphere_triangle_hit(Vec3::new(-0.5, 0.0, 0.2), 0.1, A, B, C).is_none());
    }

    #[test]
    fn test_degenerate_triangle_never_hits() {
        let d = Vec3::new(2.0, 0.0, 0.0);
        assert!(sphere_triangle_hit(Vec3::new(0.5, 0.0, 0.0), 1.0, A, B, d).is_none());
    }

    #[test]
    fn test_any_triangle_in_list() {
        let far = [Vec3::splat(10.0), Vec3::new(11.0, 10.0, 10.0), Vec3::new(10.0, 10.0, 11.0)];
        let mut tris = far.to_vec();
        tris.extend_from_slice(&[A, B, C]);
        // The hit is on the last triangle; earlier misses must not mask it.
        assert!(is_sphere_intersecting(Vec3::new(0.2, 0.01, 0.2), 0.05, &tris));
        tris.truncate(3);
        assert!(!is_sphere_intersecting(Vec3::new(0.2, 0.01, 0.2), 0.05, &tris));
    }
}
