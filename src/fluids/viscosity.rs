use glam::Vec3;

use crate::fluids::SphKernel;
use crate::grid::SpatialGrid;
use crate::particle::is_fluid;

/// XSPH velocity smoothing: blend each fluid velocity toward its
/// kernel-weighted neighbourhood, v_i += c * sum_j (v_j - v_i) * W.
///
/// The blend reads neighbour velocities, so corrections are gathered into
/// `scratch` first and applied afterwards; updating in place would bias
/// later particles with already-smoothed neighbours.
pub fn apply_xsph(
    velocity: &mut [Vec3],
    scratch: &mut [Vec3],
    grid: &SpatialGrid,
    kernel: &SphKernel,
    position: &[Vec3],
    phase: &[i32],
    xsph_c: f32,
    cell_range: i32,
) {
    for i in 0..scratch.len() {
        if !is_fluid(phase[i]) {
            scratch[i] = Vec3::ZERO;
            continue;
        }
        let p_i = position[i];
        let v_i = velocity[i];
        let mut blend = Vec3::ZERO;

        grid.for_each_neighbour(p_i, cell_range, |j| {
            if j == i || !is_fluid(phase[j]) {
                return;
            }
            let r2 = p_i.distance_squared(position[j]);
            if r2 <= kernel.radius_sq() {
                blend += (velocity[j] - v_i) * kernel.poly6(r2);
            }
        });

        scratch[i] = blend * xsph_c;
    }

    for i in 0..velocity.len() {
        velocity[i] += scratch[i];
    }
}
