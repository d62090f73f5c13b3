//! Headless demo: a row of spheres dropped onto a static ground.
//!
//! Collision detection and integration are deliberately minimal here; the
//! interesting part is the contact solve between them.
//!
//! Run with `RUST_LOG=info cargo run --manifest-path rein-app/Cargo.toml`.

use rein_contact::glam::Vec3;
use rein_contact::{solve_world_contacts, ContactPoint, RigidBody, SolverConfig};

const GRAVITY: Vec3 = Vec3::new(0.0, -9.81, 0.0);
const DT: f32 = 1.0 / 60.0;
const RADIUS: f32 = 0.5;
const SECONDS: u32 = 3;

struct Ball;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut world = hecs::World::new();
    let ground = world.spawn((RigidBody::new_static().with_friction(0.6),));

    for i in 0..5 {
        let x = i as f32 * 1.5;
        world.spawn((
            Ball,
            RigidBody::dynamic_sphere(1.0 + i as f32, RADIUS)
                .with_position(Vec3::new(x, 1.0 + i as f32, 0.0))
                .with_velocity(Vec3::new(0.5 * i as f32, 0.0, 0.0), Vec3::ZERO)
                .with_friction(0.4 + 0.1 * i as f32),
        ));
    }

    let config = SolverConfig::default();
    log::info!("solver config: {config:?}");

    for frame in 0..SECONDS * 60 {
        // Integrate velocities.
        for (_, rb) in world.query_mut::<hecs::With<&mut RigidBody, &Ball>>() {
            rb.linear_velocity += GRAVITY * DT;
        }

        // Sphere vs ground plane (y = 0).
        let contacts: Vec<_> = world
            .query::<hecs::With<&RigidBody, &Ball>>()
            .iter()
            .filter_map(|(entity, rb)| {
                let penetration = RADIUS - rb.position.y;
                (penetration > 0.0).then(|| ContactPoint {
                    body_a: ground,
                    body_b: entity,
                    position: Vec3::new(rb.position.x, 0.0, rb.position.z),
                    normal: Vec3::Y,
                    penetration,
                })
            })
            .collect();

        if !contacts.is_empty() {
            let report = solve_world_contacts(&mut world, &contacts, &config, DT)?;
            log::debug!(
                "frame {frame}: {} contacts, last sweep delta {:.2e}",
                report.lambdas.len(),
                report.last_delta
            );
        }

        // Integrate positions.
        for (_, rb) in world.query_mut::<hecs::With<&mut RigidBody, &Ball>>() {
            let velocity = rb.linear_velocity;
            let spin = rb.angular_velocity;
            rb.position += velocity * DT;
            if spin.length_squared() > 1e-10 {
                let delta = rein_contact::glam::Quat::from_scaled_axis(spin * DT);
                rb.orientation = (delta * rb.orientation).normalize();
            }
        }

        if (frame + 1) % 60 == 0 {
            for (entity, rb) in world.query::<hecs::With<&RigidBody, &Ball>>().iter() {
                log::info!(
                    "t={:.1}s {:?}: position {:.3} velocity {:.3}",
                    (frame + 1) as f32 * DT,
                    entity,
                    rb.position,
                    rb.linear_velocity
                );
            }
        }
    }

    Ok(())
}
