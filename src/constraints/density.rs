use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::fluids::SphKernel;
use crate::grid::SpatialGrid;
use crate::particle::is_fluid;

/// Fraction of the smoothing radius used as the sCorr reference distance.
const SCORR_DQ_FACTOR: f32 = 0.03;

pub struct FluidParams {
    pub rest_density: f32,
    pub relaxation_eps: f32,
    pub scorr_k: f32,
    pub scorr_n: i32,
    /// Akinci cohesion mode: clamp the constraint to positive pressure and
    /// drop sCorr (cohesion supplies the attraction instead).
    pub cohesion: bool,
}

/// Lambda pass of the PBF density constraint.
///
/// For every fluid particle: SPH density over all neighbours (solids
/// contribute boundary density), the constraint C = rho/rho_0 - 1, and
/// lambda = -C / (sum of squared constraint gradients + relaxation).
/// Solid particles get lambda 0 so the position pass can read neighbour
/// lambdas unconditionally.
///
/// Reference: Macklin & Mueller, "Position Based Fluids", SIGGRAPH 2013.
pub fn compute_lambdas(
    lambda: &mut [f32],
    density: &mut [f32],
    grid: &SpatialGrid,
    kernel: &SphKernel,
    predicted: &[Vec3],
    mass: &[f32],
    phase: &[i32],
    params: &FluidParams,
    cell_range: i32,
) {
    let inv_rho0 = 1.0 / params.rest_density;

    let solve = |i: usize| -> (f32, f32) {
        if !is_fluid(phase[i]) {
            return (0.0, 0.0);
        }
        let p_i = predicted[i];

        let mut rho = 0.0_f32;
        let mut grad_sum_sq = 0.0_f32;
        let mut grad_self = Vec3::ZERO;

        grid.for_each_neighbour(p_i, cell_range, |j| {
            let r = p_i - predicted[j];
            let r2 = r.length_squared();
            if r2 > kernel.radius_sq() {
                return;
            }
            rho += mass[j] * kernel.poly6(r2);
            if j != i {
                let grad_j = kernel.spiky_gradient(r, r2) * inv_rho0;
                grad_sum_sq += grad_j.length_squared();
                grad_self += grad_j;
            }
        });
        grad_sum_sq += grad_self.length_squared();

        let mut c = rho * inv_rho0 - 1.0;
        if params.cohesion {
            c = c.max(0.0);
        }
        (-c / (grad_sum_sq + params.relaxation_eps), rho)
    };

    #[cfg(feature = "parallel")]
    lambda
        .par_iter_mut()
        .zip(density.par_iter_mut())
        .enumerate()
        .for_each(|(i, (l, d))| (*l, *d) = solve(i));

    #[cfg(not(feature = "parallel"))]
    for (i, (l, d)) in lambda.iter_mut().zip(density.iter_mut()).enumerate() {
        (*l, *d) = solve(i);
    }
}

/// Position pass of the PBF density constraint.
///
/// delta_p_i = (1/rho_0) * sum_j (lambda_i + lambda_j + sCorr) * gradW.
/// sCorr is the anti-clustering pressure of the PBF paper; it is omitted
/// in cohesion mode, where the Akinci tension pass owns surface
/// attraction. Writes into `out` (must not alias `predicted`); the caller
/// swaps buffers afterwards.
pub fn project_density(
    out: &mut [Vec3],
    grid: &SpatialGrid,
    kernel: &SphKernel,
    predicted: &[Vec3],
    lambda: &[f32],
    phase: &[i32],
    params: &FluidParams,
    cell_range: i32,
) {
    let inv_rho0 = 1.0 / params.rest_density;
    let scorr_enabled = !params.cohesion;
    let dq = SCORR_DQ_FACTOR * kernel.radius();
    let poly6_dq = kernel.poly6(dq * dq);

    let solve = |i: usize| -> Vec3 {
        let p_i = predicted[i];
        if !is_fluid(phase[i]) {
            return p_i;
        }
        let lambda_i = lambda[i];
        let mut delta_p = Vec3::ZERO;

        grid.for_each_neighbour(p_i, cell_range, |j| {
            if j == i {
                return;
            }
            let r = p_i - predicted[j];
            let r2 = r.length_squared();
            if r2 > kernel.radius_sq() {
                return;
            }
            let s_corr = if scorr_enabled {
                let ratio = kernel.poly6(r2) / poly6_dq;
                -params.scorr_k * ratio.powi(params.scorr_n)
            } else {
                0.0
            };
            delta_p += kernel.spiky_gradient(r, r2) * (lambda_i + lambda[j] + s_corr);
        });

        p_i + delta_p * inv_rho0
    };

    #[cfg(feature = "parallel")]
    out.par_iter_mut()
        .enumerate()
        .for_each(|(i, o)| *o = solve(i));

    #[cfg(not(feature = "parallel"))]
    for (i, o) in out.iter_mut().enumerate() {
        *o = solve(i);
    }
}
