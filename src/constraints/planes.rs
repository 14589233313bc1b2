use glam::Vec3;

use crate::constraints::friction_correction;

/// Infinite half-space. Points with `dot(n, x - o) >= 0` are inside.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    origin: Vec3,
    normal: Vec3,
}

impl Plane {
    /// The normal is normalized here so penetration depths are metric.
    pub fn new(origin: Vec3, normal: Vec3) -> Self {
        Self {
            origin,
            normal: normal.normalize(),
        }
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }

    /// Signed sphere penetration depth; positive means overlapping.
    #[inline]
    fn penetration(&self, x: Vec3, radius: f32) -> f32 {
        (self.origin - x).dot(self.normal) + radius
    }
}

/// Pre-solve stabilization: push penetrating particles out of the plane in
/// both the committed and the predicted position, so the later velocity
/// reconstruction does not turn depenetration into outward speed.
pub fn stabilize(
    plane: &Plane,
    position: &mut [Vec3],
    new_position: &mut [Vec3],
    inv_mass: &[f32],
    radius: f32,
) {
    for i in 0..position.len() {
        if inv_mass[i] <= 0.0 {
            continue;
        }
        let d = plane.penetration(position[i], radius);
        if d > 0.0 {
            let push = plane.normal() * d;
            position[i] += push;
            new_position[i] += push;
        }
    }
}

/// Collision projection against predicted positions, with Coulomb friction
/// applied to the tangential part of this sub-step's displacement.
pub fn project(
    plane: &Plane,
    position: &[Vec3],
    new_position: &mut [Vec3],
    inv_mass: &[f32],
    radius: f32,
    static_friction: f32,
    dynamic_friction: f32,
) {
    let n = plane.normal();
    for i in 0..new_position.len() {
        if inv_mass[i] <= 0.0 {
            continue;
        }
        let d = plane.penetration(new_position[i], radius);
        if d <= 0.0 {
            continue;
        }
        new_position[i] += n * d;
        let displacement = new_position[i] - position[i];
        new_position[i] -= friction_correction(displacement, n, d, static_friction, dynamic_friction);
    }
}
