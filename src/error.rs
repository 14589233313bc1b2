use thiserror::Error;

/// Errors surfaced by solver construction and particle admission.
///
/// The step path itself is infallible: numerical trouble is damped by
/// design (mass scaling, averaged friction, early-out in rotation
/// extraction) rather than reported.
#[derive(Debug, Error)]
pub enum SolverError {
    /// An admission would grow past a configured arena bound.
    #[error("{what} capacity exceeded: requested {requested}, capacity {capacity}")]
    CapacityExceeded {
        what: &'static str,
        requested: usize,
        capacity: usize,
    },

    /// Admission input violates a documented precondition
    /// (non-positive mass, rest centroid off origin, mismatched lengths).
    #[error("precondition violated: {0}")]
    PreconditionViolated(&'static str),

    /// A backing buffer could not be reserved at construction.
    /// The solver instance is not usable after this.
    #[error("buffer allocation failed: {0}")]
    AllocationFailed(&'static str),
}
