//! Contact constraint solver for rigid bodies.
//!
//! # Architecture
//!
//! Each timestep the solver runs on contacts produced by collision detection:
//!
//! 1. Select a friction frame per contact ([`tangent`])
//! 2. Precompute Jacobians, effective mass and bias ([`constraint`])
//! 3. Group contacts that share bodies into a [`ContactSet`]
//! 4. Relax each set with a fixed number of projected Gauss-Seidel sweeps
//! 5. Apply the accumulated impulses to body velocities ([`ContactSolver`])
//!
//! Bodies are never owned by the solver. They live in a [`BodyArena`] and are
//! referenced by handle; a set only reads them at construction and writes
//! them once when its impulses are applied.

pub mod constraint;
pub mod contact;
pub mod contact_set;
pub mod rigid_body;
pub mod solver;
pub mod tangent;

pub use constraint::{ContactConstraint, Jacobian};
pub use contact::{BodyContactLink, ContactDescriptor, ContactPoint, TangentFrame};
pub use contact_set::{ContactSet, ContactSetBuilder};
pub use rigid_body::{BodyArena, BodyHandle, BodySet, RigidBody};
pub use solver::{solve_contacts, ContactSolver, FrictionCombine, SetReport, SolverConfig};
pub use tangent::select_frame;

pub type Result<T> = std::result::Result<T, crate::error::SolverError>;
