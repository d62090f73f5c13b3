//! Error types for contact set construction.

use thiserror::Error;

/// Errors raised while building or seeding a contact set.
///
/// All of these are caller contract violations. They are reported before
/// the first relaxation sweep so that no NaN ever reaches body state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error(
        "contact {contact} references local body {index}, but the set only has {body_count} bodies"
    )]
    BodyIndexOutOfRange {
        contact: usize,
        index: usize,
        body_count: usize,
    },

    #[error("contact {contact} joins local body {index} to itself")]
    SelfContact { contact: usize, index: usize },

    #[error("body handle {0} is not present in the arena")]
    MissingBody(String),

    #[error("body handle {handle} appears at local indices {first} and {second}")]
    DuplicateBody {
        handle: String,
        first: usize,
        second: usize,
    },

    #[error("contact {contact} is between two immovable bodies")]
    ImmovablePair { contact: usize },

    #[error("contact {contact} has a singular effective mass (det = {determinant})")]
    SingularEffectiveMass { contact: usize, determinant: f32 },

    #[error("contact {contact} has a tangent frame that is not orthonormal")]
    InvalidTangentFrame { contact: usize },

    #[error("warm start expects {expected} impulses, got {actual}")]
    WarmStartLength { expected: usize, actual: usize },
}
