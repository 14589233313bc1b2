use std::ops::Range;

use glam::{Quat, Vec3};
use log::{debug, info};

use crate::config::SolverConfig;
use crate::constraints::contact::{self, ContactParams};
use crate::constraints::density::{self, FluidParams};
use crate::constraints::planes::{self, Plane};
use crate::constraints::shape_matching::{self, RigidCluster};
use crate::error::SolverError;
use crate::fluids::{cohesion, viscosity, vorticity, SphKernel};
use crate::grid::SpatialGrid;
use crate::integrator;
use crate::particle::{ParticleStore, FLUID_PHASE};

/// Host-controlled particle pin: held in place during the step and
/// overwritten with the given state afterwards.
#[derive(Clone, Copy, Debug)]
pub struct PickedParticle {
    pub index: usize,
    pub position: Vec3,
    pub velocity: Vec3,
}

/// Unified PBD solver: one particle population carrying fluids, rigid
/// clusters and granulars through a single projection pipeline.
///
/// Admission appends particle blocks and assigns phases; `step` advances
/// the simulation; `positions` exposes the committed state for rendering
/// between steps.
pub struct Solver {
    config: SolverConfig,
    particles: ParticleStore,
    clusters: Vec<RigidCluster>,
    planes: Vec<Plane>,
    grid: SpatialGrid,
    kernel: SphKernel,
    fluid_particles: usize,
    solid_particles: usize,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Result<Self, SolverError> {
        if !(config.particle_radius > 0.0) || !(config.kernel_radius > 0.0) {
            return Err(SolverError::PreconditionViolated(
                "particle and kernel radii must be positive",
            ));
        }
        if config.grid.cell_count() == 0 || !(config.grid.cell_size > 0.0) {
            return Err(SolverError::PreconditionViolated(
                "grid must have positive dimensions and cell size",
            ));
        }

        let grid = SpatialGrid::new(
            &config.grid,
            config.max_particles,
            config.max_particles_per_cell,
        )?;
        let particles = ParticleStore::with_capacity(config.max_particles)?;
        let mut clusters = Vec::new();
        clusters
            .try_reserve_exact(config.max_rigid_bodies)
            .map_err(|_| SolverError::AllocationFailed("rigid cluster table"))?;

        info!(
            "solver created: {} particle / {} body capacity, grid {}x{}x{} @ {}",
            config.max_particles,
            config.max_rigid_bodies,
            config.grid.dims.x,
            config.grid.dims.y,
            config.grid.dims.z,
            config.grid.cell_size,
        );

        Ok(Self {
            kernel: SphKernel::new(config.kernel_radius),
            particles,
            clusters,
            planes: Vec::new(),
            grid,
            fluid_particles: 0,
            solid_particles: 0,
            config,
        })
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Scalar knobs may be tuned between steps; capacities and grid
    /// geometry are fixed at construction and must not be changed here.
    pub fn config_mut(&mut self) -> &mut SolverConfig {
        &mut self.config
    }

    pub fn add_plane(&mut self, origin: Vec3, normal: Vec3) {
        self.planes.push(Plane::new(origin, normal));
    }

    /// Admit granular particles: every particle gets its own solid phase,
    /// so all pairs among them collide.
    pub fn admit_granulars(
        &mut self,
        positions: &[Vec3],
        mass_per_particle: f32,
    ) -> Result<Range<usize>, SolverError> {
        let first_phase = self.particles.alloc_solid_phases(positions.len());
        let range = self
            .particles
            .admit_block(positions, mass_per_particle, |k| first_phase + k as i32)?;
        self.solid_particles += range.len();
        debug!("admitted {} granular particles", range.len());
        Ok(range)
    }

    /// Admit a rigid body: a contiguous particle block sharing one solid
    /// phase, shape-matched against `rest_offsets` (centroid must sit at
    /// the origin). Returns the cluster id.
    pub fn admit_rigid_body(
        &mut self,
        world_positions: &[Vec3],
        rest_offsets: &[Vec3],
        mass_per_particle: f32,
    ) -> Result<usize, SolverError> {
        if world_positions.len() != rest_offsets.len() {
            return Err(SolverError::PreconditionViolated(
                "rigid body world and rest blocks must have equal length",
            ));
        }
        if world_positions.len() > self.config.max_particles_per_body {
            return Err(SolverError::CapacityExceeded {
                what: "rigid cluster size",
                requested: world_positions.len(),
                capacity: self.config.max_particles_per_body,
            });
        }
        if self.clusters.len() >= self.config.max_rigid_bodies {
            return Err(SolverError::CapacityExceeded {
                what: "rigid bodies",
                requested: self.clusters.len() + 1,
                capacity: self.config.max_rigid_bodies,
            });
        }
        shape_matching::validate_rest_pose(rest_offsets)?;

        let phase = self.particles.alloc_solid_phases(1);
        let range = self
            .particles
            .admit_block(world_positions, mass_per_particle, |_| phase)?;
        self.solid_particles += range.len();
        self.clusters
            .push(RigidCluster::new(range.clone(), rest_offsets.to_vec()));
        debug!(
            "admitted rigid body {} with {} particles",
            self.clusters.len() - 1,
            range.len()
        );
        Ok(self.clusters.len() - 1)
    }

    /// Admit fluid particles (all share the fluid phase).
    pub fn admit_fluid(
        &mut self,
        positions: &[Vec3],
        mass_per_particle: f32,
    ) -> Result<Range<usize>, SolverError> {
        let range = self
            .particles
            .admit_block(positions, mass_per_particle, |_| FLUID_PHASE)?;
        self.fluid_particles += range.len();
        debug!("admitted {} fluid particles", range.len());
        Ok(range)
    }

    /// Advance the simulation by `dt`, split into `substeps` sub-steps.
    ///
    /// Each sub-step: forces and prediction, plane stabilization, grid
    /// rebuild, iterated projection (planes, fluid density, contacts,
    /// shape matching), velocity reconstruction, position commit, then the
    /// fluid post-passes (vorticity, optional Akinci tension, XSPH).
    pub fn step(&mut self, substeps: u32, dt: f32, picked: Option<PickedParticle>) {
        let n = self.particles.len();
        if n == 0 || substeps == 0 || !(dt > 0.0) {
            return;
        }
        let sub_dt = dt / substeps as f32;
        let fluid_cells = (self.kernel.radius() / self.config.grid.cell_size).ceil() as i32;
        let radius = self.config.particle_radius;

        let fluid_params = FluidParams {
            rest_density: self.config.rest_density,
            relaxation_eps: self.config.relaxation_eps,
            scorr_k: self.config.scorr_k,
            scorr_n: self.config.scorr_n,
            cohesion: self.config.cohesion,
        };
        let contact_params = ContactParams {
            radius,
            static_friction: self.config.static_friction,
            dynamic_friction: self.config.dynamic_friction,
        };

        for _ in 0..substeps {
            integrator::apply_forces(
                &mut self.particles.velocity,
                &self.particles.inv_mass,
                self.config.gravity,
                sub_dt,
            );
            if let Some(pick) = picked {
                if pick.index < n {
                    self.particles.position[pick.index] = pick.position;
                    self.particles.velocity[pick.index] = Vec3::ZERO;
                }
            }
            integrator::predict_positions(
                &mut self.particles.new_position,
                &self.particles.position,
                &self.particles.velocity,
                &self.particles.inv_mass,
                sub_dt,
            );
            integrator::compute_inv_scaled_masses(
                &mut self.particles.inv_scaled_mass,
                &self.particles.inv_mass,
                &self.particles.position,
                self.config.mass_scale_k,
            );

            for _ in 0..self.config.stabilization_passes {
                for plane in &self.planes {
                    planes::stabilize(
                        plane,
                        &mut self.particles.position,
                        &mut self.particles.new_position,
                        &self.particles.inv_mass,
                        radius,
                    );
                }
            }

            for _ in 0..self.config.grid_iterations {
                self.grid.update(
                    &self.particles.new_position,
                    &mut self.particles.sort_scratch,
                );

                for _ in 0..self.config.solver_iterations {
                    for plane in &self.planes {
                        planes::project(
                            plane,
                            &self.particles.position,
                            &mut self.particles.new_position,
                            &self.particles.inv_mass,
                            radius,
                            self.config.static_friction,
                            self.config.dynamic_friction,
                        );
                    }

                    if self.fluid_particles > 0 {
                        density::compute_lambdas(
                            &mut self.particles.lambda,
                            &mut self.particles.density,
                            &self.grid,
                            &self.kernel,
                            &self.particles.new_position,
                            &self.particles.mass,
                            &self.particles.phase,
                            &fluid_params,
                            fluid_cells,
                        );
                        density::project_density(
                            &mut self.particles.new_position_next,
                            &self.grid,
                            &self.kernel,
                            &self.particles.new_position,
                            &self.particles.lambda,
                            &self.particles.phase,
                            &fluid_params,
                            fluid_cells,
                        );
                        std::mem::swap(
                            &mut self.particles.new_position,
                            &mut self.particles.new_position_next,
                        );
                    }

                    if self.config.particle_collisions && self.solid_particles > 0 {
                        contact::project_contacts(
                            &mut self.particles.new_position_next,
                            &self.grid,
                            &self.particles.position,
                            &self.particles.new_position,
                            &self.particles.inv_scaled_mass,
                            &self.particles.phase,
                            &contact_params,
                        );
                        std::mem::swap(
                            &mut self.particles.new_position,
                            &mut self.particles.new_position_next,
                        );
                    }

                    if !self.clusters.is_empty() {
                        shape_matching::match_shapes(
                            &mut self.clusters,
                            &mut self.particles.new_position,
                            self.config.rotation_iterations,
                        );
                    }
                }
            }

            integrator::update_velocities(
                &mut self.particles.velocity,
                &self.particles.position,
                &self.particles.new_position,
                &self.particles.inv_mass,
                sub_dt,
            );
            integrator::commit_positions(
                &mut self.particles.position,
                &self.particles.new_position,
                &self.particles.phase,
                self.config.sleep_epsilon,
            );

            if self.fluid_particles > 0 {
                vorticity::compute_vorticity(
                    &mut self.particles.omega,
                    &self.grid,
                    &self.kernel,
                    &self.particles.position,
                    &self.particles.velocity,
                    &self.particles.phase,
                    fluid_cells,
                );
                vorticity::apply_confinement(
                    &mut self.particles.velocity,
                    &self.grid,
                    &self.kernel,
                    &self.particles.position,
                    &self.particles.omega,
                    &self.particles.phase,
                    self.config.vorticity_eps,
                    sub_dt,
                    fluid_cells,
                );

                if self.config.cohesion {
                    cohesion::compute_normals(
                        &mut self.particles.normal,
                        &self.grid,
                        &self.kernel,
                        &self.particles.position,
                        &self.particles.density,
                        &self.particles.phase,
                        fluid_cells,
                    );
                    cohesion::apply_tension(
                        &mut self.particles.velocity,
                        &mut self.particles.velocity_scratch,
                        &self.grid,
                        &self.kernel,
                        &self.particles.position,
                        &self.particles.normal,
                        &self.particles.density,
                        &self.particles.phase,
                        self.config.rest_density,
                        self.config.surface_tension,
                        sub_dt,
                        fluid_cells,
                    );
                }

                viscosity::apply_xsph(
                    &mut self.particles.velocity,
                    &mut self.particles.velocity_scratch,
                    &self.grid,
                    &self.kernel,
                    &self.particles.position,
                    &self.particles.phase,
                    self.config.xsph_c,
                    fluid_cells,
                );
            }
        }

        if let Some(pick) = picked {
            if pick.index < n {
                self.particles.position[pick.index] = pick.position;
                self.particles.new_position[pick.index] = pick.position;
                self.particles.velocity[pick.index] = pick.velocity;
            }
        }
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    pub fn fluid_count(&self) -> usize {
        self.fluid_particles
    }

    pub fn body_count(&self) -> usize {
        self.clusters.len()
    }

    /// Committed positions, written in place every step; renderers read
    /// this between steps.
    pub fn positions(&self) -> &[Vec3] {
        &self.particles.position
    }

    pub fn velocities(&self) -> &[Vec3] {
        &self.particles.velocity
    }

    pub fn phases(&self) -> &[i32] {
        &self.particles.phase
    }

    /// Last densities computed by the fluid constraint pass.
    pub fn densities(&self) -> &[f32] {
        &self.particles.density
    }

    pub fn particle_position(&self, index: usize) -> Vec3 {
        self.particles.position[index]
    }

    pub fn particle_velocity(&self, index: usize) -> Vec3 {
        self.particles.velocity[index]
    }

    /// Overwrite one particle's state.
    pub fn set_particle(&mut self, index: usize, position: Vec3, velocity: Vec3) {
        self.particles.position[index] = position;
        self.particles.new_position[index] = position;
        self.particles.velocity[index] = velocity;
    }

    pub fn body_rotation(&self, body: usize) -> Quat {
        self.clusters[body].rotation()
    }

    pub fn body_center_of_mass(&self, body: usize) -> Vec3 {
        self.clusters[body].center_of_mass()
    }
}
