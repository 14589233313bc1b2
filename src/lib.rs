//! Unified position-based dynamics particle solver.
//!
//! One flat particle population simultaneously represents incompressible
//! fluid (position-based fluids), rigid bodies (shape-matched clusters)
//! and granular material, all projected through a single constraint
//! pipeline over a uniform spatial grid that is rebuilt every sub-step.
//!
//! The material class of a particle is its signed `phase`: negative for
//! fluid, non-negative for solids, where equal non-negative phases mean
//! same body (no pairwise collision). Constraint kernels branch on the
//! phase inline; there is no per-particle dispatch.
//!
//! Enable the `parallel` cargo feature to run the heavy projection passes
//! on rayon.

pub mod config;
pub mod constraints;
pub mod error;
pub mod fluids;
pub mod grid;
pub mod integrator;
pub mod particle;
pub mod solver;
pub mod sort;

pub use config::{GridConfig, SolverConfig};
pub use error::SolverError;
pub use solver::{PickedParticle, Solver};
