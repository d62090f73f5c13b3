//! Rein contact solver
//!
//! Resolves non-penetration and friction contacts between rigid bodies with a
//! sequential impulse (projected Gauss-Seidel) solver over a boxed LCP.
//!
//! # Architecture
//!
//! 1. **physics** - Body state, contact data, constraint setup, contact sets and the
//!    timestep driver
//! 2. **ecs** - hecs integration (feature = "ecs")
//! 3. **error** - Construction-time errors
//!
//! Sweeps over independent contact sets run on a rayon pool with the
//! `parallel` feature.

pub mod error;
pub mod physics;

#[cfg(feature = "ecs")]
pub mod ecs;

pub use error::SolverError;

pub use physics::{
    select_frame, solve_contacts, BodyArena, BodyContactLink, BodyHandle, BodySet,
    ContactConstraint, ContactDescriptor, ContactPoint, ContactSet, ContactSetBuilder,
    ContactSolver, FrictionCombine, Jacobian, RigidBody, SetReport, SolverConfig, TangentFrame,
};

#[cfg(feature = "ecs")]
pub use ecs::prelude::*;

// Re-export glam for convenience
pub use glam;
