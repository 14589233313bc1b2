use std::ops::Range;

use glam::{Mat3, Quat, Vec3};

use crate::error::SolverError;

/// Admission tolerance for the rest-pose centroid.
const CENTROID_EPS: f32 = 1.0e-4;

/// Convergence thresholds of the rotation extraction loop.
const OMEGA_EPS_SQ: f32 = 1.0e-9;
const DENOM_EPS: f32 = 1.0e-9;

/// Rigid body: a contiguous particle block matched against a rest pose.
///
/// The rest offsets are stored with their centroid at the origin (checked
/// at admission), so the current centroid of the block is the only
/// translation state and the rotation quaternion the only orientation
/// state. The quaternion persists across steps and warm-starts the next
/// rotation extraction.
pub struct RigidCluster {
    pub particles: Range<usize>,
    rest_offsets: Vec<Vec3>,
    rotation: Quat,
    center_of_mass: Vec3,
}

impl RigidCluster {
    pub fn new(particles: Range<usize>, rest_offsets: Vec<Vec3>) -> Self {
        debug_assert_eq!(particles.len(), rest_offsets.len());
        Self {
            particles,
            rest_offsets,
            rotation: Quat::IDENTITY,
            center_of_mass: Vec3::ZERO,
        }
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn center_of_mass(&self) -> Vec3 {
        self.center_of_mass
    }

    pub fn rest_offsets(&self) -> &[Vec3] {
        &self.rest_offsets
    }
}

/// Check a rest pose before admission: non-empty and centered on the
/// origin. Off-center rest poses would smuggle a translation into every
/// rotation extraction.
pub fn validate_rest_pose(rest_offsets: &[Vec3]) -> Result<(), SolverError> {
    if rest_offsets.is_empty() {
        return Err(SolverError::PreconditionViolated("empty rigid rest pose"));
    }
    let centroid = rest_offsets.iter().copied().sum::<Vec3>() / rest_offsets.len() as f32;
    if centroid.length() > CENTROID_EPS {
        return Err(SolverError::PreconditionViolated(
            "rigid rest pose centroid must be at the origin",
        ));
    }
    Ok(())
}

/// Shape matching with full stiffness: every cluster particle is snapped
/// to its rotated rest offset about the current centroid.
///
/// Reference: Mueller, Heidelberger, Teschner & Gross, "Meshless
/// Deformations Based on Shape Matching", SIGGRAPH 2005; rotation
/// extraction per Mueller, Bender, Chentanez & Macklin, "A Robust Method
/// to Extract the Rotational Part of Deformations", MIG 2016.
pub fn match_shapes(clusters: &mut [RigidCluster], new_position: &mut [Vec3], max_iterations: u32) {
    for cluster in clusters {
        let range = cluster.particles.clone();
        let count = range.len();
        if count == 0 {
            continue;
        }

        let mut com = Vec3::ZERO;
        for i in range.clone() {
            com += new_position[i];
        }
        com /= count as f32;
        cluster.center_of_mass = com;

        // Moment matrix A = sum of (current offset) * (rest offset)^T.
        let mut moment = Mat3::ZERO;
        for (k, i) in range.clone().enumerate() {
            moment += outer(new_position[i] - com, cluster.rest_offsets[k]);
        }

        extract_rotation(&moment, &mut cluster.rotation, max_iterations);

        let rotation = Mat3::from_quat(cluster.rotation);
        for (k, i) in range.enumerate() {
            new_position[i] = rotation * cluster.rest_offsets[k] + com;
        }
    }
}

/// Warm-started iterative rotation extraction from a moment matrix.
///
/// Each iteration rotates `q` by the axis that best aligns the rotation's
/// columns with the moment columns, stopping early once the angular
/// update underflows. Unlike polar decomposition this never reflects and
/// degrades gracefully for flat or degenerate clusters.
pub fn extract_rotation(moment: &Mat3, q: &mut Quat, max_iterations: u32) {
    for _ in 0..max_iterations {
        let r = Mat3::from_quat(*q);
        let numerator = r.x_axis.cross(moment.x_axis)
            + r.y_axis.cross(moment.y_axis)
            + r.z_axis.cross(moment.z_axis);
        let denominator = (r.x_axis.dot(moment.x_axis)
            + r.y_axis.dot(moment.y_axis)
            + r.z_axis.dot(moment.z_axis))
        .abs()
            + DENOM_EPS;
        let omega = numerator / denominator;

        let angle_sq = omega.length_squared();
        if angle_sq <= OMEGA_EPS_SQ {
            break;
        }
        let angle = angle_sq.sqrt();
        *q = (Quat::from_axis_angle(omega / angle, angle) * *q).normalize();
    }
}

/// Outer product a * b^T.
fn outer(a: Vec3, b: Vec3) -> Mat3 {
    Mat3::from_cols(a * b.x, a * b.y, a * b.z)
}
