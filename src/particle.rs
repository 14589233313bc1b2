use std::ops::Range;

use glam::Vec3;

use crate::error::SolverError;
use crate::sort::SortScratch;

/// Phase tag assigned to every fluid particle.
pub const FLUID_PHASE: i32 = -1;

/// Fluid particles carry a negative phase.
#[inline]
pub fn is_fluid(phase: i32) -> bool {
    phase < 0
}

/// Two particles contact as solids iff both are solid and belong to
/// different phase groups (equal non-negative phases mean same body).
#[inline]
pub fn solids_collide(a: i32, b: i32) -> bool {
    a >= 0 && b >= 0 && a != b
}

/// SoA particle arena. Every array is reserved up-front to the configured
/// bound; admission appends contiguous blocks and nothing is ever removed.
///
/// Buffers ending in `_next`/`_scratch` are the write side of the double
/// buffers used by projections whose output would otherwise alias their
/// input; the owner swaps them after each such pass.
pub struct ParticleStore {
    capacity: usize,
    pub position: Vec<Vec3>,
    /// Predicted/projected positions for the current sub-step.
    pub new_position: Vec<Vec3>,
    /// Write target for aliasing projection passes.
    pub new_position_next: Vec<Vec3>,
    pub velocity: Vec<Vec3>,
    /// Write target for aliasing velocity passes (XSPH, tension).
    pub velocity_scratch: Vec<Vec3>,
    pub mass: Vec<f32>,
    pub inv_mass: Vec<f32>,
    /// Height-scaled inverse mass, refreshed each sub-step.
    pub inv_scaled_mass: Vec<f32>,
    pub phase: Vec<i32>,
    /// Cached vorticity (fluid only).
    pub omega: Vec<Vec3>,
    /// Cached surface normal (fluid only, cohesion mode).
    pub normal: Vec<Vec3>,
    /// Density constraint multiplier (fluid scratch; zero for solids).
    pub lambda: Vec<f32>,
    pub density: Vec<f32>,
    /// Temp storage for the grid's pair sort; grows monotonically.
    pub sort_scratch: SortScratch,
    next_solid_phase: i32,
}

impl ParticleStore {
    pub fn with_capacity(capacity: usize) -> Result<Self, SolverError> {
        Ok(Self {
            capacity,
            position: reserved(capacity, "positions")?,
            new_position: reserved(capacity, "predicted positions")?,
            new_position_next: reserved(capacity, "projected positions")?,
            velocity: reserved(capacity, "velocities")?,
            velocity_scratch: reserved(capacity, "velocity scratch")?,
            mass: reserved(capacity, "masses")?,
            inv_mass: reserved(capacity, "inverse masses")?,
            inv_scaled_mass: reserved(capacity, "scaled inverse masses")?,
            phase: reserved(capacity, "phases")?,
            omega: reserved(capacity, "vorticity")?,
            normal: reserved(capacity, "fluid normals")?,
            lambda: reserved(capacity, "lambda")?,
            density: reserved(capacity, "density")?,
            sort_scratch: SortScratch::new(),
            next_solid_phase: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.position.len()
    }

    pub fn is_empty(&self) -> bool {
        self.position.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Claim `count` consecutive unused solid phase group ids, returning
    /// the first.
    pub fn alloc_solid_phases(&mut self, count: usize) -> i32 {
        let first = self.next_solid_phase;
        self.next_solid_phase += count as i32;
        first
    }

    /// Append a contiguous particle block. `phase_of` receives the index
    /// within the block, letting callers assign per-particle or shared
    /// phases. Mass must be positive; infinite mass admits a pinned
    /// particle (inverse mass zero).
    pub fn admit_block(
        &mut self,
        positions: &[Vec3],
        mass_per_particle: f32,
        mut phase_of: impl FnMut(usize) -> i32,
    ) -> Result<Range<usize>, SolverError> {
        if positions.is_empty() {
            return Err(SolverError::PreconditionViolated("empty particle block"));
        }
        if !(mass_per_particle > 0.0) {
            return Err(SolverError::PreconditionViolated(
                "particle mass must be positive",
            ));
        }
        let first = self.len();
        let last = first + positions.len();
        if last > self.capacity {
            return Err(SolverError::CapacityExceeded {
                what: "particles",
                requested: last,
                capacity: self.capacity,
            });
        }

        let inv_mass = if mass_per_particle.is_finite() {
            1.0 / mass_per_particle
        } else {
            0.0
        };
        for (k, &p) in positions.iter().enumerate() {
            self.position.push(p);
            self.new_position.push(p);
            self.new_position_next.push(p);
            self.velocity.push(Vec3::ZERO);
            self.velocity_scratch.push(Vec3::ZERO);
            self.mass.push(mass_per_particle);
            self.inv_mass.push(inv_mass);
            self.inv_scaled_mass.push(inv_mass);
            self.phase.push(phase_of(k));
            self.omega.push(Vec3::ZERO);
            self.normal.push(Vec3::ZERO);
            self.lambda.push(0.0);
            self.density.push(0.0);
        }
        Ok(first..last)
    }
}

fn reserved<T: Clone + Default>(n: usize, what: &'static str) -> Result<Vec<T>, SolverError> {
    let mut v = Vec::new();
    v.try_reserve_exact(n)
        .map_err(|_| SolverError::AllocationFailed(what))?;
    Ok(v)
}
