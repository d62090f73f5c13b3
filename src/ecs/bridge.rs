//! Bridge between the contact solver and hecs.

use glam::Vec3;

use crate::physics::contact::ContactPoint;
use crate::physics::contact_set::ContactSetBuilder;
use crate::physics::rigid_body::{BodyArena, RigidBody};
use crate::physics::solver::{relax, SetReport, SolverConfig};
use crate::physics::Result;

impl BodyArena for hecs::World {
    type Handle = hecs::Entity;

    fn body(&self, entity: hecs::Entity) -> Option<RigidBody> {
        self.get::<&RigidBody>(entity).ok().map(|rb| *rb)
    }

    fn apply_point_impulse(&mut self, entity: hecs::Entity, point: Vec3, impulse: Vec3) -> bool {
        match self.get::<&mut RigidBody>(entity) {
            Ok(mut rb) => {
                rb.apply_point_impulse(point, impulse);
                true
            }
            Err(_) => false,
        }
    }
}

/// Solve one group of narrow-phase contacts between entities in `world`.
///
/// Entities without a `RigidBody` component make the call fail before any
/// velocity is written.
pub fn solve_world_contacts(
    world: &mut hecs::World,
    contacts: &[ContactPoint<hecs::Entity>],
    config: &SolverConfig,
    dt: f32,
) -> Result<SetReport> {
    let mut builder = ContactSetBuilder::new();
    for contact in contacts {
        builder.add_contact(*contact);
    }
    let mut set = builder.build(&*world, config)?;
    let (sweeps, last_delta) = relax(&mut set, dt, config.iterations, config.convergence_tolerance);
    let lambdas = set.apply_impulses(world)?;
    Ok(SetReport {
        sweeps,
        last_delta,
        lambdas,
    })
}
