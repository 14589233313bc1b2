pub mod cohesion;
pub mod viscosity;
pub mod vorticity;

use glam::Vec3;
use std::f32::consts::PI;

/// SPH kernel set for one smoothing radius h.
///
/// All coefficients are evaluated once at construction; the per-pair
/// evaluations are branch-plus-polynomial only. Distances are passed
/// squared where the kernel allows it so callers can defer the sqrt.
#[derive(Clone, Copy, Debug)]
pub struct SphKernel {
    h: f32,
    h2: f32,
    half_h: f32,
    /// 315 / (64 pi h^9)
    poly6_coeff: f32,
    /// -45 / (pi h^6)
    spiky_coeff: f32,
    /// 32 / (pi h^9), the cohesion spline scale.
    cohesion_coeff: f32,
    /// h^6 / 64 times the spline scale, the near-field offset.
    cohesion_offset: f32,
}

impl SphKernel {
    pub fn new(h: f32) -> Self {
        let h2 = h * h;
        let h3 = h2 * h;
        let h6 = h3 * h3;
        let h9 = h6 * h3;
        let cohesion_coeff = 32.0 / (PI * h9);
        Self {
            h,
            h2,
            half_h: h * 0.5,
            poly6_coeff: 315.0 / (64.0 * PI * h9),
            spiky_coeff: -45.0 / (PI * h6),
            cohesion_coeff,
            cohesion_offset: cohesion_coeff * h6 / 64.0,
        }
    }

    /// Smoothing radius this kernel was built for.
    #[inline]
    pub fn radius(&self) -> f32 {
        self.h
    }

    /// Squared smoothing radius (support bound for `poly6`).
    #[inline]
    pub fn radius_sq(&self) -> f32 {
        self.h2
    }

    /// Density kernel `W(r) = C * (h^2 - r^2)^3`, zero outside support.
    ///
    /// Reference: Mueller, Charypar & Gross, "Particle-Based Fluid
    /// Simulation for Interactive Applications", SCA 2003.
    #[inline]
    pub fn poly6(&self, r2: f32) -> f32 {
        if r2 > self.h2 {
            return 0.0;
        }
        let diff = self.h2 - r2;
        self.poly6_coeff * diff * diff * diff
    }

    /// Gradient of the spiky kernel along `v`, with `r2 = |v|^2`.
    ///
    /// Returns zero at the origin (the gradient is singular there) and
    /// outside support. The coefficient is negative, so the result points
    /// from the neighbour toward the evaluation point being repelled.
    #[inline]
    pub fn spiky_gradient(&self, v: Vec3, r2: f32) -> Vec3 {
        if r2 > self.h2 || r2 <= 1.0e-12 {
            return Vec3::ZERO;
        }
        let r = r2.sqrt();
        let diff = self.h - r;
        v * (self.spiky_coeff * diff * diff / r)
    }

    /// Akinci cohesion spline C(r): attractive in the outer half of the
    /// support, repulsive-leaning (offset) in the inner half, zero at the
    /// origin and beyond h.
    ///
    /// Reference: Akinci, Akinci & Teschner, "Versatile Surface Tension and
    /// Adhesion for SPH Fluids", SIGGRAPH Asia 2013.
    #[inline]
    pub fn cohesion(&self, r: f32) -> f32 {
        if r <= 0.0 || r >= self.h {
            return 0.0;
        }
        let t = (self.h - r) * r;
        let spline = self.cohesion_coeff * t * t * t;
        if r >= self.half_h {
            spline
        } else {
            2.0 * spline - self.cohesion_offset
        }
    }
}
