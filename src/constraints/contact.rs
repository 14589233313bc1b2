use glam::Vec3;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::constraints::friction_correction;
use crate::grid::SpatialGrid;
use crate::particle::solids_collide;

pub struct ContactParams {
    pub radius: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,
}

/// Project pairwise non-penetration for solid particles.
///
/// One gather per particle over the 3x3x3 neighbour cells: normal
/// corrections are mass-split with the height-scaled inverse masses and
/// summed Jacobi-style; friction corrections are averaged over the number
/// of contacts that produced them (summing them diverges for packed
/// granular piles). Fluids and untouched solids pass through unchanged.
///
/// `out` must not alias `predicted`; the caller swaps the buffers after
/// the pass. Requires grid cells at least one particle diameter wide.
pub fn project_contacts(
    out: &mut [Vec3],
    grid: &SpatialGrid,
    position: &[Vec3],
    predicted: &[Vec3],
    inv_scaled_mass: &[f32],
    phase: &[i32],
    params: &ContactParams,
) {
    let diameter = 2.0 * params.radius;
    let diameter_sq = diameter * diameter;
    // Friction only engages once a contact actually moved the particle.
    let threshold_sq = {
        let t = 0.001 * params.radius;
        t * t
    };

    let solve = |i: usize| -> Vec3 {
        let p_i = predicted[i];
        let phase_i = phase[i];
        if phase_i < 0 {
            return p_i;
        }
        let w_i = inv_scaled_mass[i];

        let mut sum_delta = Vec3::ZERO;
        let mut sum_friction = Vec3::ZERO;
        let mut friction_count = 0u32;

        grid.for_each_neighbour(p_i, 1, |j| {
            if j == i || !solids_collide(phase_i, phase[j]) {
                return;
            }
            let delta = p_i - predicted[j];
            let dist_sq = delta.length_squared();
            if dist_sq >= diameter_sq || dist_sq <= 1.0e-12 {
                return;
            }
            let w_sum = w_i + inv_scaled_mass[j];
            if w_sum <= 0.0 {
                return;
            }
            let dist = dist_sq.sqrt();
            let weight_i = w_i / w_sum;
            let weight_j = inv_scaled_mass[j] / w_sum;

            let projection = delta * (diameter / dist - 1.0);
            let corr_i = projection * weight_i;
            sum_delta += corr_i;

            if corr_i.length_squared() > threshold_sq {
                let normal = delta / dist;
                // Relative motion of the two projected endpoints over the
                // sub-step decides stick vs slip.
                let moved_i = p_i + corr_i - position[i];
                let moved_j = predicted[j] - projection * weight_j - position[j];
                let correction = friction_correction(
                    moved_i - moved_j,
                    normal,
                    diameter - dist,
                    params.static_friction,
                    params.dynamic_friction,
                );
                sum_friction -= correction * weight_i;
                friction_count += 1;
            }
        });

        let mut projected = p_i + sum_delta;
        if friction_count > 0 {
            projected += sum_friction / friction_count as f32;
        }
        projected
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
