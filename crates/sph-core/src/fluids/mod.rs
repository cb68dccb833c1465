//! Smoothing kernels and the per-particle SPH stages built on them.
//!
//! All kernels have compact support: they return `0.0` whenever
//! `distance >= radius`. The radius is validated `> 0` by `SimSettings`, so
//! none of these functions guard against a non-positive `h`.

pub mod density;
pub mod pressure;
pub mod reference;
pub mod viscosity;

use glam::Vec3;
use std::f32::consts::PI;

/// Densities below this are treated as "no support" by the force stages.
pub const DENSITY_EPSILON: f32 = 1e-6;

/// Poly6 smoothing kernel for SPH density estimation.
///
/// Returns `W(r, h) = 315 / (64 * PI * h^9) * (h^2 - r^2)^3` when `r < h`,
/// and `0.0` when `r >= h`.
#[inline]
pub fn poly6(r: f32, h: f32) -> f32 {
    if r >= h {
        return 0.0;
    }
    let h2 = h * h;
    let diff = h2 - r * r;
    let h9 = h2 * h2 * h2 * h2 * h;
    let coeff = 315.0 / (64.0 * PI * h9);
    coeff * diff * diff * diff
}

/// Spiky kernel, used for near-density.
///
/// Returns `15 / (PI * h^6) * (h - r)^3` inside the support.
#[inline]
pub fn spiky(r: f32, h: f32) -> f32 {
    if r >= h {
        return 0.0;
    }
    let h3 = h * h * h;
    let diff = h - r;
    15.0 / (PI * h3 * h3) * diff * diff * diff
}

/// First derivative of the spiky kernel: `-45 / (PI * h^6) * (h - r)^2`.
///
/// Always `<= 0`; the pressure stage turns it into a repulsive force.
#[inline]
pub fn spiky_grad1(r: f32, h: f32) -> f32 {
    if r >= h {
        return 0.0;
    }
    let h3 = h * h * h;
    let diff = h - r;
    -45.0 / (PI * h3 * h3) * diff * diff
}

/// Second derivative of the spiky kernel: `90 / (PI * h^6) * (h - r)`.
#[inline]
pub fn spiky_grad2(r: f32, h: f32) -> f32 {
    if r >= h {
        return 0.0;
    }
    let h3 = h * h * h;
    90.0 / (PI * h3 * h3) * (h - r)
}

/// Spiky kernel gradient as a vector.
///
/// Returns `(r / r_len) * spiky_grad1(r_len, h)` when `r_len < h` and
/// `r_len > 1e-6`, and `Vec3::ZERO` otherwise.
#[inline]
pub fn spiky_gradient(r: Vec3, r_len: f32, h: f32) -> Vec3 {
    if r_len >= h || r_len <= 1e-6 {
        return Vec3::ZERO;
    }
    (r / r_len) * spiky_grad1(r_len, h)
}
