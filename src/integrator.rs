use glam::Vec3;

use crate::particle::is_fluid;

/// Gravity into velocities. Pinned particles (inverse mass zero) are left
/// untouched by every integration op.
pub fn apply_forces(velocity: &mut [Vec3], inv_mass: &[f32], gravity: Vec3, dt: f32) {
    for (v, &w) in velocity.iter_mut().zip(inv_mass) {
        if w > 0.0 {
            *v += gravity * dt;
        }
    }
}

/// Explicit Euler position prediction into the projection buffer.
pub fn predict_positions(
    new_position: &mut [Vec3],
    position: &[Vec3],
    velocity: &[Vec3],
    inv_mass: &[f32],
    dt: f32,
) {
    for i in 0..new_position.len() {
        new_position[i] = if inv_mass[i] > 0.0 {
            position[i] + velocity[i] * dt
        } else {
            position[i]
        };
    }
}

/// Height-scaled inverse masses: 1 / (m * exp(-k * y)) = inv_mass * exp(k * y).
/// Higher particles become effectively lighter, which keeps tall stacks of
/// contact constraints from oscillating.
pub fn compute_inv_scaled_masses(
    inv_scaled_mass: &mut [f32],
    inv_mass: &[f32],
    position: &[Vec3],
    k: f32,
) {
    if k == 0.0 {
        inv_scaled_mass.copy_from_slice(inv_mass);
        return;
    }
    for i in 0..inv_scaled_mass.len() {
        inv_scaled_mass[i] = inv_mass[i] * (k * position[i].y).exp();
    }
}

/// Reconstruct velocities from the projected position delta.
pub fn update_velocities(
    velocity: &mut [Vec3],
    position: &[Vec3],
    new_position: &[Vec3],
    inv_mass: &[f32],
    dt: f32,
) {
    let inv_dt = 1.0 / dt;
    for i in 0..velocity.len() {
        if inv_mass[i] > 0.0 {
            velocity[i] = (new_position[i] - position[i]) * inv_dt;
        }
    }
}

/// Commit projected positions. Fluids always move; solids move only when
/// the sub-step displacement clears the sleep threshold, which suppresses
/// resting jitter.
pub fn commit_positions(
    position: &mut [Vec3],
    new_position: &[Vec3],
    phase: &[i32],
    sleep_epsilon: f32,
) {
    let threshold_sq = sleep_epsilon * sleep_epsilon;
    for i in 0..position.len() {
        if is_fluid(phase[i])
            || position[i].distance_squared(new_position[i]) >= threshold_sq
        {
            position[i] = new_position[i];
        }
    }
}
