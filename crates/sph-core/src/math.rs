use glam::Vec3;
use std::f32::consts::TAU;

/// Cheap float hash to [0, 1).
pub fn hash11(p: f32) -> f32 {
    let mut p = (p * 0.1031).fract();
    p *= p + 33.33;
    p *= p + p;
    p.fract()
}

/// Hash a pair of particle indices to [0,1].
pub fn hash_pair(a: u32, b: u32) -> f32 {
    let x = (a.wrapping_mul(73856093) ^ b.wrapping_mul(19349663)) % 65_521;
    hash11(x as f32 + 0.5)
}

/// Deterministic unit vector for two coincident particles.
///
/// The result depends only on the unordered pair and flips sign with the
/// order, so `fallback_direction(i, j) == -fallback_direction(j, i)` and
/// the resulting pair forces cancel.
pub fn fallback_direction(i: usize, j: usize) -> Vec3 {
    let (lo, hi, sign) = if i < j { (i, j, 1.0) } else { (j, i, -1.0) };
    let u = hash_pair(lo as u32, hi as u32);
    let v = hash_pair(hi as u32, lo as u32);
    let theta = u * TAU;
    let z = v * 2.0 - 1.0;
    let s = (1.0 - z * z).max(0.0).sqrt();
    let dir = Vec3::new(s * theta.cos(), s * theta.sin(), z);
    dir.try_normalize().unwrap_or(Vec3::X) * sign
}
