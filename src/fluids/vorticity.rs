use glam::Vec3;

use crate::fluids::SphKernel;
use crate::grid::SpatialGrid;
use crate::particle::is_fluid;

/// Normalizing eta below this squared magnitude would amplify noise.
const ETA_EPS_SQ: f32 = 1.0e-3;

/// Curl of the velocity field at each fluid particle:
/// omega_i = sum_j (v_j - v_i) x gradW(p_i - p_j).
pub fn compute_vorticity(
    omega: &mut [Vec3],
    grid: &SpatialGrid,
    kernel: &SphKernel,
    position: &[Vec3],
    velocity: &[Vec3],
    phase: &[i32],
    cell_range: i32,
) {
    for i in 0..omega.len() {
        if !is_fluid(phase[i]) {
            omega[i] = Vec3::ZERO;
            continue;
        }
        let p_i = position[i];
        let v_i = velocity[i];
        let mut curl = Vec3::ZERO;

        grid.for_each_neighbour(p_i, cell_range, |j| {
            if j == i || !is_fluid(phase[j]) {
                return;
            }
            let r = p_i - position[j];
            let r2 = r.length_squared();
            if r2 <= kernel.radius_sq() {
                curl += (velocity[j] - v_i).cross(kernel.spiky_gradient(r, r2));
            }
        });

        omega[i] = curl;
    }
}

/// Vorticity confinement: push each fluid particle along the gradient of
/// vorticity magnitude, re-injecting the rotational energy the iterated
/// projection dissipates.
///
/// Reads cached `omega` and positions only, so the velocity update is
/// done in place.
///
/// Reference: Macklin & Mueller, "Position Based Fluids", SIGGRAPH 2013.
pub fn apply_confinement(
    velocity: &mut [Vec3],
    grid: &SpatialGrid,
    kernel: &SphKernel,
    position: &[Vec3],
    omega: &[Vec3],
    phase: &[i32],
    vorticity_eps: f32,
    dt: f32,
    cell_range: i32,
) {
    for i in 0..velocity.len() {
        if !is_fluid(phase[i]) {
            continue;
        }
        let omega_i = omega[i];
        if omega_i.length_squared() <= 0.0 {
            continue;
        }
        let p_i = position[i];

        // eta = gradient of |omega| estimated over the neighbourhood.
        let mut eta = Vec3::ZERO;
        grid.for_each_neighbour(p_i, cell_range, |j| {
            if j == i || !is_fluid(phase[j]) {
                return;
            }
            let r = p_i - position[j];
            let r2 = r.length_squared();
            if r2 <= kernel.radius_sq() {
                eta += omega[j].length() * kernel.spiky_gradient(r, r2);
            }
        });

        let eta_sq = eta.length_squared();
        if eta_sq <= ETA_EPS_SQ {
            continue;
        }
        let n = eta / eta_sq.sqrt();
        velocity[i] += n.cross(omega_i) * (vorticity_eps * dt);
    }
}
