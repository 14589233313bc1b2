use glam::{UVec3, Vec3};

/// Uniform grid geometry: a fixed block of `dims` cells of side `cell_size`
/// anchored at `origin`. Positions outside the block still map to valid
/// cells by positive modulo, so the grid never rejects a particle; callers
/// size the block to cover expected motion.
#[derive(Clone, Copy, Debug)]
pub struct GridConfig {
    pub dims: UVec3,
    pub cell_size: f32,
    pub origin: Vec3,
}

impl GridConfig {
    pub fn cell_count(&self) -> usize {
        self.dims.x as usize * self.dims.y as usize * self.dims.z as usize
    }
}

/// All solver tunables. Capacities and grid geometry are fixed at
/// construction; the scalar knobs may be adjusted between steps.
#[derive(Clone, Debug)]
pub struct SolverConfig {
    /// Particle arena bound. Admission fails once reached.
    pub max_particles: usize,
    /// Rigid cluster arena bound.
    pub max_rigid_bodies: usize,
    pub grid: GridConfig,

    /// Particle radius r used by contacts and plane offsets.
    pub particle_radius: f32,
    /// SPH smoothing radius h.
    pub kernel_radius: f32,
    pub gravity: Vec3,
    /// Fluid rest density rho_0.
    pub rest_density: f32,

    /// Static (stick) friction coefficient. 0 disables sticking.
    pub static_friction: f32,
    /// Dynamic (slip) friction coefficient. 0 disables slip damping.
    pub dynamic_friction: f32,
    /// Mass scaling exponent k: effective mass is m * exp(-k * y), making
    /// stacked particles lighter with height. 0 disables scaling.
    pub mass_scale_k: f32,
    /// Solid particles move only if the sub-step displacement exceeds this
    /// threshold, suppressing rest jitter. 0 commits every move.
    pub sleep_epsilon: f32,

    /// Neighbour scans stop after this many particles per cell.
    /// Over-dense cells are silently truncated.
    pub max_particles_per_cell: usize,
    /// Largest admissible rigid cluster.
    pub max_particles_per_body: usize,

    /// Epsilon added to the lambda denominator (constraint relaxation).
    pub relaxation_eps: f32,
    /// Anti-clustering correction magnitude (sCorr k).
    pub scorr_k: f32,
    /// Anti-clustering correction exponent (sCorr n).
    pub scorr_n: i32,
    /// Vorticity confinement strength.
    pub vorticity_eps: f32,
    /// Akinci surface tension coefficient sigma.
    pub surface_tension: f32,
    /// XSPH velocity smoothing coefficient.
    pub xsph_c: f32,
    /// Akinci cohesion/tension mode. When on, the density constraint is
    /// clamped to positive pressure and sCorr is omitted; the two would
    /// otherwise double-count surface attraction.
    pub cohesion: bool,

    /// Plane stabilization rounds per sub-step.
    pub stabilization_passes: u32,
    /// Outer projection iterations; each rebuilds the grid.
    pub grid_iterations: u32,
    /// Inner projection iterations per grid rebuild.
    pub solver_iterations: u32,
    /// Iteration cap for shape-matching rotation extraction.
    pub rotation_iterations: u32,
    /// Run the particle-particle contact pass in the inner loop.
    pub particle_collisions: bool,
}

impl SolverConfig {
    /// Baseline configuration for a given scene size. Grid geometry and
    /// arena bounds are the only required inputs; everything else starts
    /// from the defaults below.
    pub fn new(max_particles: usize, max_rigid_bodies: usize, grid: GridConfig) -> Self {
        Self {
            max_particles,
            max_rigid_bodies,
            grid,
            particle_radius: 0.05,
            kernel_radius: 0.115,
            gravity: Vec3::new(0.0, -9.8, 0.0),
            rest_density: 1000.0,
            static_friction: 0.0,
            dynamic_friction: 0.0,
            mass_scale_k: 0.0,
            sleep_epsilon: 0.0,
            max_particles_per_cell: 64,
            max_particles_per_body: 64,
            relaxation_eps: 300.0,
            scorr_k: 1.0e-4,
            scorr_n: 4,
            vorticity_eps: 1.0e-3,
            surface_tension: 0.6,
            xsph_c: 2.0e-4,
            cohesion: false,
            stabilization_passes: 2,
            grid_iterations: 1,
            solver_iterations: 2,
            rotation_iterations: 20,
            particle_collisions: true,
        }
    }
}
