use std::f32::consts::PI;

use approx::assert_relative_eq;
use glam::{UVec3, Vec3};
use pbd_unified::config::GridConfig;
use pbd_unified::constraints::density::{compute_lambdas, project_density, FluidParams};
use pbd_unified::fluids::viscosity::apply_xsph;
use pbd_unified::fluids::vorticity::{apply_confinement, compute_vorticity};
use pbd_unified::fluids::{cohesion, SphKernel};
use pbd_unified::grid::SpatialGrid;
use pbd_unified::sort::SortScratch;

fn fluid_grid(positions: &[Vec3], cell_size: f32) -> SpatialGrid {
    let config = GridConfig {
        dims: UVec3::splat(32),
        cell_size,
        origin: Vec3::splat(-1.0),
    };
    let mut grid = SpatialGrid::new(&config, positions.len().max(1), 64).expect("grid");
    let mut scratch = SortScratch::new();
    grid.update(positions, &mut scratch);
    grid
}

fn params(rest_density: f32, cohesion: bool) -> FluidParams {
    FluidParams {
        rest_density,
        relaxation_eps: 300.0,
        scorr_k: 1.0e-4,
        scorr_n: 4,
        cohesion,
    }
}

// ---------------------------------------------------------------------------
// Kernel tests
// ---------------------------------------------------------------------------

#[test]
fn test_poly6_peak_at_zero() {
    let h = 0.1_f32;
    let kernel = SphKernel::new(h);
    let expected = 315.0 / (64.0 * PI * h.powi(3));
    assert_relative_eq!(kernel.poly6(0.0), expected, max_relative = 1e-5);
}

#[test]
fn test_poly6_support_bound() {
    let h = 0.1_f32;
    let kernel = SphKernel::new(h);
    assert_eq!(kernel.poly6(h * h), 0.0, "value at the boundary is zero");
    assert_eq!(kernel.poly6(h * h * 1.1), 0.0, "no support beyond h");
    let mid = kernel.poly6(0.25 * h * h);
    assert!(mid > 0.0 && mid < kernel.poly6(0.0));
}

#[test]
fn test_spiky_gradient_direction_and_support() {
    let h = 0.1_f32;
    let kernel = SphKernel::new(h);

    let v = Vec3::new(0.05, 0.0, 0.0);
    let grad = kernel.spiky_gradient(v, v.length_squared());
    // Negative coefficient: the gradient points back toward the neighbour.
    assert!(grad.x < 0.0, "gradient x should be negative, got {}", grad.x);
    assert!(grad.y.abs() < 1e-10 && grad.z.abs() < 1e-10);

    let at_h = Vec3::new(h, 0.0, 0.0);
    assert_eq!(kernel.spiky_gradient(at_h, h * h), Vec3::ZERO);
    let tiny = Vec3::new(1e-7, 0.0, 0.0);
    assert_eq!(
        kernel.spiky_gradient(tiny, tiny.length_squared()),
        Vec3::ZERO,
        "singular origin must be cut off"
    );
}

#[test]
fn test_cohesion_spline_shape() {
    let h = 0.1_f32;
    let kernel = SphKernel::new(h);

    assert_eq!(kernel.cohesion(0.0), 0.0);
    assert_eq!(kernel.cohesion(h), 0.0);
    assert!(kernel.cohesion(0.75 * h) > 0.0, "outer half attracts");

    // The two branches meet at h/2.
    let below = kernel.cohesion(0.5 * h - 1e-5);
    let above = kernel.cohesion(0.5 * h + 1e-5);
    let scale = kernel.cohesion(0.75 * h);
    assert!(
        (below - above).abs() < scale * 1e-2,
        "spline discontinuous at h/2: {} vs {}",
        below,
        above
    );
}

// ---------------------------------------------------------------------------
// Density constraint tests
// ---------------------------------------------------------------------------

/// Tightly packed fluid particles are over-dense: the constraint must be
/// positive, so every lambda comes out negative.
#[test]
fn test_lambda_negative_under_compression() {
    let h = 0.2_f32;
    let spacing = 0.3 * h;
    let n = 3_usize;
    let count = n * n * n;

    let mut positions = Vec::with_capacity(count);
    for ix in 0..n {
        for iy in 0..n {
            for iz in 0..n {
                positions.push(Vec3::new(
                    ix as f32 * spacing,
                    iy as f32 * spacing,
                    iz as f32 * spacing,
                ));
            }
        }
    }

    let kernel = SphKernel::new(h);
    let grid = fluid_grid(&positions, h);
    let mass = vec![1.0_f32; count];
    let phase = vec![-1_i32; count];
    let mut lambda = vec![0.0_f32; count];
    let mut density = vec![0.0_f32; count];

    // Rest density far below what the packing produces.
    let p = params(10.0, false);
    compute_lambdas(
        &mut lambda, &mut density, &grid, &kernel, &positions, &mass, &phase, &p, 1,
    );

    for i in 0..count {
        assert!(density[i] > 0.0, "particle {} has zero density", i);
        assert!(
            lambda[i] < 0.0,
            "over-dense particle {} should get negative lambda, got {}",
            i,
            lambda[i]
        );
    }
}

#[test]
fn test_cohesion_mode_clamps_negative_pressure() {
    // A lone pair is far under rest density: C < 0. Cohesion mode clamps
    // the constraint to zero, plain mode keeps the negative pressure.
    let h = 0.2_f32;
    let positions = vec![Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0)];
    let kernel = SphKernel::new(h);
    let grid = fluid_grid(&positions, h);
    let mass = vec![1.0_f32; 2];
    let phase = vec![-1_i32; 2];
    let mut lambda = vec![0.0_f32; 2];
    let mut density = vec![0.0_f32; 2];

    compute_lambdas(
        &mut lambda,
        &mut density,
        &grid,
        &kernel,
        &positions,
        &mass,
        &phase,
        &params(1.0e6, true),
        1,
    );
    assert_eq!(lambda[0], 0.0, "clamped constraint must yield zero lambda");

    compute_lambdas(
        &mut lambda,
        &mut density,
        &grid,
        &kernel,
        &positions,
        &mass,
        &phase,
        &params(1.0e6, false),
        1,
    );
    assert!(
        lambda[0] > 0.0,
        "unclamped under-dense constraint should pull, got {}",
        lambda[0]
    );
}

#[test]
fn test_projection_pushes_overdense_pair_apart() {
    let h = 0.2_f32;
    let positions = vec![Vec3::ZERO, Vec3::new(0.05, 0.0, 0.0)];
    let kernel = SphKernel::new(h);
    let grid = fluid_grid(&positions, h);
    let mass = vec![1.0_f32; 2];
    let phase = vec![-1_i32; 2];
    let mut lambda = vec![0.0_f32; 2];
    let mut density = vec![0.0_f32; 2];
    let mut out = vec![Vec3::ZERO; 2];

    let p = params(10.0, false);
    compute_lambdas(
        &mut lambda, &mut density, &grid, &kernel, &positions, &mass, &phase, &p, 1,
    );
    project_density(&mut out, &grid, &kernel, &positions, &lambda, &phase, &p, 1);

    let before = positions[0].distance(positions[1]);
    let after = out[0].distance(out[1]);
    assert!(
        after > before,
        "over-dense pair should separate: before={}, after={}",
        before,
        after
    );
}

#[test]
fn test_scorr_omitted_in_cohesion_mode() {
    // With all lambdas zero the projection reduces to the sCorr term, so
    // cohesion mode must leave positions untouched while plain mode moves.
    let h = 0.2_f32;
    let positions = vec![Vec3::ZERO, Vec3::new(0.1, 0.0, 0.0)];
    let kernel = SphKernel::new(h);
    let grid = fluid_grid(&positions, h);
    let phase = vec![-1_i32; 2];
    let lambda = vec![0.0_f32; 2];
    let mut out = vec![Vec3::ZERO; 2];

    project_density(
        &mut out,
        &grid,
        &kernel,
        &positions,
        &lambda,
        &phase,
        &params(1000.0, true),
        1,
    );
    assert_eq!(out[0], positions[0], "cohesion mode must not apply sCorr");

    project_density(
        &mut out,
        &grid,
        &kernel,
        &positions,
        &lambda,
        &phase,
        &params(1000.0, false),
        1,
    );
    assert!(
        out[0] != positions[0],
        "plain mode applies the anti-clustering correction"
    );
}

#[test]
fn test_solid_neighbours_keep_zero_lambda() {
    let h = 0.2_f32;
    let positions = vec![Vec3::ZERO, Vec3::new(0.05, 0.0, 0.0)];
    let kernel = SphKernel::new(h);
    let grid = fluid_grid(&positions, h);
    let mass = vec![1.0_f32; 2];
    let phase = vec![-1_i32, 3]; // fluid next to a solid
    let mut lambda = vec![9.0_f32; 2];
    let mut density = vec![0.0_f32; 2];

    let p = params(10.0, false);
    compute_lambdas(
        &mut lambda, &mut density, &grid, &kernel, &positions, &mass, &phase, &p, 1,
    );

    assert_eq!(lambda[1], 0.0, "solid particles carry zero lambda");
    assert!(lambda[0] < 0.0, "fluid still sees the solid's density");
}

// ---------------------------------------------------------------------------
// Post-pass tests
// ---------------------------------------------------------------------------

#[test]
fn test_xsph_reduces_velocity_difference() {
    let h = 0.2_f32;
    let positions = vec![Vec3::ZERO, Vec3::new(0.05, 0.0, 0.0)];
    let grid = fluid_grid(&positions, h);
    let kernel = SphKernel::new(h);
    let phase = vec![-1_i32; 2];
    let mut velocity = vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(-1.0, 0.0, 0.0)];
    let mut scratch = vec![Vec3::ZERO; 2];

    let before = (velocity[0] - velocity[1]).length();
    apply_xsph(
        &mut velocity,
        &mut scratch,
        &grid,
        &kernel,
        &positions,
        &phase,
        2.0e-4,
        1,
    );
    let after = (velocity[0] - velocity[1]).length();

    assert!(
        after < before,
        "XSPH should smooth opposing velocities: before={}, after={}",
        before,
        after
    );
}

#[test]
fn test_vorticity_shear_field_is_finite_and_curls() {
    let h = 0.2_f32;
    let n = 3_usize;
    let count = n * n * n;
    let spacing = 0.4 * h;

    let mut positions = Vec::with_capacity(count);
    let mut velocity = Vec::with_capacity(count);
    for ix in 0..n {
        for iy in 0..n {
            for iz in 0..n {
                positions.push(Vec3::new(
                    ix as f32 * spacing,
                    iy as f32 * spacing,
                    iz as f32 * spacing,
                ));
                // Shear along x with height: non-zero curl about z.
                velocity.push(Vec3::new(iy as f32 * 0.5, 0.0, 0.0));
            }
        }
    }

    let grid = fluid_grid(&positions, h);
    let kernel = SphKernel::new(h);
    let phase = vec![-1_i32; count];
    let mut omega = vec![Vec3::ZERO; count];

    compute_vorticity(
        &mut omega, &grid, &kernel, &positions, &velocity, &phase, 1,
    );
    let center = count / 2;
    assert!(
        omega[center].length() > 0.0,
        "shear flow should produce curl at the block center"
    );

    apply_confinement(
        &mut velocity,
        &grid,
        &kernel,
        &positions,
        &omega,
        &phase,
        1.0e-3,
        1.0 / 60.0,
        1,
    );
    for (i, v) in velocity.iter().enumerate() {
        assert!(
            v.is_finite(),
            "velocity {} not finite after confinement: {:?}",
            i,
            v
        );
    }
}

#[test]
fn test_fluid_normals_mark_the_surface() {
    // Three particles in a row: the end normals are opposed along the row
    // axis and the interior normal nearly cancels.
    let h = 0.2_f32;
    let positions = vec![
        Vec3::new(-0.05, 0.0, 0.0),
        Vec3::ZERO,
        Vec3::new(0.05, 0.0, 0.0),
    ];
    let grid = fluid_grid(&positions, h);
    let kernel = SphKernel::new(h);
    let phase = vec![-1_i32; 3];
    let density = vec![1000.0_f32; 3];
    let mut normal = vec![Vec3::ZERO; 3];

    cohesion::compute_normals(
        &mut normal, &grid, &kernel, &positions, &density, &phase, 1,
    );

    assert!(
        normal[0].x * normal[2].x < 0.0,
        "end normals should oppose along the row: {} vs {}",
        normal[0].x,
        normal[2].x
    );
    assert!(
        normal[1].length() < normal[0].length(),
        "interior normal should be shorter than surface normals"
    );
}

#[test]
fn test_tension_pulls_separated_pair_together() {
    // Two particles in the attractive outer half of the spline.
    let h = 0.2_f32;
    let positions = vec![Vec3::ZERO, Vec3::new(0.15, 0.0, 0.0)];
    let grid = fluid_grid(&positions, h);
    let kernel = SphKernel::new(h);
    let phase = vec![-1_i32; 2];
    let density = vec![1000.0_f32; 2];
    let normal = vec![Vec3::ZERO; 2];
    let mut velocity = vec![Vec3::ZERO; 2];
    let mut scratch = vec![Vec3::ZERO; 2];

    cohesion::apply_tension(
        &mut velocity,
        &mut scratch,
        &grid,
        &kernel,
        &positions,
        &normal,
        &density,
        &phase,
        1000.0,
        0.6,
        1.0 / 60.0,
        1,
    );

    assert!(
        velocity[0].x > 0.0 && velocity[1].x < 0.0,
        "cohesion should pull the pair together, got {:?} / {:?}",
        velocity[0],
        velocity[1]
    );
}
