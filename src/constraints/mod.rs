pub mod contact;
pub mod density;
pub mod planes;
pub mod shape_matching;

use glam::Vec3;

/// Positional Coulomb friction shared by plane and particle contacts.
///
/// `displacement` is how far the contact point moved this sub-step and
/// `penetration` the resolved overlap depth. Returns the tangential
/// correction to subtract from the projected position: all of the
/// tangential motion when it is small enough to stick, a dynamically
/// scaled part of it otherwise.
pub(crate) fn friction_correction(
    displacement: Vec3,
    normal: Vec3,
    penetration: f32,
    static_friction: f32,
    dynamic_friction: f32,
) -> Vec3 {
    let tangential = displacement - normal * displacement.dot(normal);
    let t_len = tangential.length();
    if t_len <= 1.0e-9 {
        return Vec3::ZERO;
    }
    if t_len < static_friction * penetration {
        tangential
    } else {
        tangential * (dynamic_friction * penetration / t_len).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_friction_sticks() {
        // Tiny tangential slide, deep penetration: the whole slide is removed.
        let delta = Vec3::new(0.001, -0.05, 0.0);
        let correction = friction_correction(delta, Vec3::Y, 0.05, 0.5, 0.3);
        assert!((correction.x - 0.001).abs() < 1e-7, "stick should remove all tangential motion");
        assert_eq!(correction.y, 0.0, "friction must act tangentially only");
    }

    #[test]
    fn test_dynamic_friction_scales() {
        // Large slide relative to penetration: only a mu_d-scaled part goes.
        let delta = Vec3::new(1.0, -0.01, 0.0);
        let correction = friction_correction(delta, Vec3::Y, 0.01, 0.5, 0.3);
        let expected = 0.3 * 0.01; // mu_d * d, well below |t|
        assert!(
            (correction.x - expected).abs() < 1e-6,
            "slip should scale tangential motion by mu_d * d / |t|, got {}",
            correction.x
        );
    }

    #[test]
    fn test_zero_coefficients_disable_friction() {
        let delta = Vec3::new(0.4, -0.02, 0.1);
        let correction = friction_correction(delta, Vec3::Y, 0.02, 0.0, 0.0);
        assert_eq!(correction, Vec3::ZERO);
    }
}
