//! Scene builders shared by the solver benchmarks.

use anyhow::{Context, Result};
use rein_contact::glam::Vec3;
use rein_contact::{
    select_frame, BodyArena, BodyHandle, BodySet, ContactDescriptor, ContactPoint, ContactSet,
    RigidBody, SolverConfig,
};

/// Fixed timestep used by every bench.
pub const DT: f32 = 1.0 / 60.0;

/// An arena with the handles and contacts of one set.
pub type Scene = (BodySet, Vec<BodyHandle>, Vec<ContactDescriptor>);

/// One island: its handles and its single contact.
pub type Island = (Vec<BodyHandle>, ContactDescriptor);

/// Columns of `height` boxes on a shared static ground, four corner contacts per layer.
///
/// Returns the arena, the local handles and the contacts of one set.
pub fn box_stacks(columns: usize, height: usize) -> Result<Scene> {
    let mut bodies = BodySet::with_capacity(1 + columns * height);
    let ground = bodies.insert(RigidBody::new_static());
    let mut handles = vec![ground];
    let mut contacts = Vec::with_capacity(columns * height * 4);

    for column in 0..columns {
        let x = column as f32 * 2.0;
        let mut below = 0usize;
        for level in 0..height {
            let handle = bodies.insert(
                RigidBody::dynamic_box(1.0, Vec3::splat(0.5))
                    .with_position(Vec3::new(x, 0.5 + level as f32, 0.0))
                    .with_velocity(Vec3::new(0.05, -9.81 * DT, 0.0), Vec3::ZERO),
            );
            handles.push(handle);
            let local = handles.len() - 1;

            let body_a = bodies.body(handles[below]).context("missing body below")?;
            let body_b = bodies.body(handle).context("missing stacked body")?;
            for corner in [
                Vec3::new(-0.5, 0.0, -0.5),
                Vec3::new(0.5, 0.0, -0.5),
                Vec3::new(0.5, 0.0, 0.5),
                Vec3::new(-0.5, 0.0, 0.5),
            ] {
                let point = corner + Vec3::new(x, level as f32, 0.0);
                let frame = select_frame(&body_a, &body_b, point, Vec3::Y, 1e-8);
                contacts.push(ContactDescriptor::new(point, frame, below, local));
            }
            below = local;
        }
    }

    Ok((bodies, handles, contacts))
}

/// Build a ready-to-relax contact set over a stacked scene.
pub fn stacked_set(columns: usize, height: usize) -> Result<(BodySet, ContactSet<BodyHandle>)> {
    let (bodies, handles, contacts) = box_stacks(columns, height)?;
    let set = ContactSet::new(&bodies, handles, &contacts, &SolverConfig::default())?;
    Ok((bodies, set))
}

/// Independent ground/sphere pairs, one contact each, as separate sets.
pub fn sphere_islands(count: usize) -> Result<(BodySet, Vec<Island>)> {
    let mut bodies = BodySet::with_capacity(count * 2);
    let mut islands = Vec::with_capacity(count);
    for i in 0..count {
        let x = i as f32 * 3.0;
        let ground =
            bodies.insert(RigidBody::new_static().with_position(Vec3::new(x, -0.5, 0.0)));
        let ball = bodies.insert(
            RigidBody::dynamic_sphere(1.0, 0.5)
                .with_position(Vec3::new(x, 0.5, 0.0))
                .with_velocity(Vec3::new(0.5, -2.0, 0.0), Vec3::ZERO),
        );
        let point = Vec3::new(x, 0.0, 0.0);
        let frame = select_frame(
            &bodies.body(ground).context("missing ground")?,
            &bodies.body(ball).context("missing ball")?,
            point,
            Vec3::Y,
            1e-8,
        );
        islands.push((vec![ground, ball], ContactDescriptor::new(point, frame, 0, 1)));
    }
    Ok((bodies, islands))
}

/// The same stacked scene as hecs entities plus the narrow-phase contacts between them.
pub fn ecs_stack(height: usize) -> (hecs::World, Vec<ContactPoint<hecs::Entity>>) {
    let mut world = hecs::World::new();
    let mut below = world.spawn((RigidBody::new_static(),));
    let mut contacts = Vec::with_capacity(height * 4);
    for level in 0..height {
        let entity = world.spawn((RigidBody::dynamic_box(1.0, Vec3::splat(0.5))
            .with_position(Vec3::new(0.0, 0.5 + level as f32, 0.0))
            .with_velocity(Vec3::new(0.0, -9.81 * DT, 0.0), Vec3::ZERO),));
        for corner in [
            Vec3::new(-0.5, 0.0, -0.5),
            Vec3::new(0.5, 0.0, -0.5),
            Vec3::new(0.5, 0.0, 0.5),
            Vec3::new(-0.5, 0.0, 0.5),
        ] {
            contacts.push(ContactPoint {
                body_a: below,
                body_b: entity,
                position: corner + Vec3::new(0.0, level as f32, 0.0),
                normal: Vec3::Y,
                penetration: 0.0,
            });
        }
        below = entity;
    }
    (world, contacts)
}
