//! hecs integration: entities carrying a [`RigidBody`](crate::physics::RigidBody)
//! component can be solved directly out of a `hecs::World`.

pub mod bridge;

pub mod prelude {
    pub use super::bridge::solve_world_contacts;
}
