//! Rigid body state as seen by the contact solver, and the arena that owns it.

use std::fmt;
use std::hash::Hash;

use glam::{Mat3, Quat, Vec3};

/// Default static friction coefficient for new bodies.
pub const DEFAULT_FRICTION: f32 = 0.5;

/// Velocity state and mass properties of a single rigid body.
///
/// A body with zero inverse mass and zero inverse inertia is immovable. The
/// solver never special-cases it; the algebra yields no velocity change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigidBody {
    pub inverse_mass: f32,
    /// Inverse inertia tensor in the body's local (principal) frame.
    pub inverse_inertia_local: Mat3,
    /// Center of mass in world space.
    pub position: Vec3,
    pub orientation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Static friction coefficient of the body's material.
    pub static_friction: f32,
}

impl RigidBody {
    /// Create a dynamic body from its mass and the diagonal of its local inertia tensor.
    ///
    /// Zero entries are treated as locked axes (infinite inertia).
    pub fn new_dynamic(mass: f32, inertia_diagonal: Vec3) -> Self {
        let recip = |x: f32| if x > 0.0 { 1.0 / x } else { 0.0 };
        Self {
            inverse_mass: recip(mass),
            inverse_inertia_local: Mat3::from_diagonal(Vec3::new(
                recip(inertia_diagonal.x),
                recip(inertia_diagonal.y),
                recip(inertia_diagonal.z),
            )),
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            static_friction: DEFAULT_FRICTION,
        }
    }

    /// Create a solid sphere of uniform density.
    pub fn dynamic_sphere(mass: f32, radius: f32) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self::new_dynamic(mass, Vec3::splat(i))
    }

    /// Create a solid box of uniform density from its half extents.
    pub fn dynamic_box(mass: f32, half_extents: Vec3) -> Self {
        let s = half_extents * 2.0;
        let k = mass / 12.0;
        Self::new_dynamic(
            mass,
            Vec3::new(
                k * (s.y * s.y + s.z * s.z),
                k * (s.x * s.x + s.z * s.z),
                k * (s.x * s.x + s.y * s.y),
            ),
        )
    }

    /// Create an immovable body at rest.
    pub fn new_static() -> Self {
        Self {
            inverse_mass: 0.0,
            inverse_inertia_local: Mat3::ZERO,
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            static_friction: DEFAULT_FRICTION,
        }
    }

    /// Create an immovable body that moves with a prescribed velocity.
    pub fn new_kinematic(linear_velocity: Vec3, angular_velocity: Vec3) -> Self {
        Self {
            linear_velocity,
            angular_velocity,
            ..Self::new_static()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn with_velocity(mut self, linear: Vec3, angular: Vec3) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    pub fn with_friction(mut self, static_friction: f32) -> Self {
        self.static_friction = static_friction;
        self
    }

    /// Inverse inertia rotated into world space: `R · I⁻¹ · Rᵗ`.
    pub fn inverse_inertia_world(&self) -> Mat3 {
        let r = Mat3::from_quat(self.orientation);
        r * self.inverse_inertia_local * r.transpose()
    }

    /// World-space velocity of the material point at `point`.
    pub fn velocity_at(&self, point: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(point - self.position)
    }

    /// The 6-DOF velocity as (linear, angular).
    pub fn generalized_velocity(&self) -> (Vec3, Vec3) {
        (self.linear_velocity, self.angular_velocity)
    }

    pub fn is_immovable(&self) -> bool {
        self.inverse_mass == 0.0 && self.inverse_inertia_local == Mat3::ZERO
    }

    /// Apply an impulse at a world-space point.
    pub fn apply_point_impulse(&mut self, point: Vec3, impulse: Vec3) {
        self.linear_velocity += impulse * self.inverse_mass;
        self.angular_velocity +=
            self.inverse_inertia_world() * (point - self.position).cross(impulse);
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::dynamic_sphere(1.0, 0.5)
    }
}

/// Storage the contact solver reads bodies from and writes impulses into.
///
/// Contact sets only hold handles, so the owner of the bodies decides how they
/// are stored. Reads happen once at construction; writes only in
/// `ContactSet::apply_impulses`.
pub trait BodyArena {
    type Handle: Copy + Eq + Hash + fmt::Debug;

    /// Snapshot of the body behind `handle`, if it exists.
    fn body(&self, handle: Self::Handle) -> Option<RigidBody>;

    /// Apply an impulse at a world-space point. Returns `false` if the handle is stale.
    fn apply_point_impulse(&mut self, handle: Self::Handle, point: Vec3, impulse: Vec3)
        -> bool;
}

/// Index of a body inside a [`BodySet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

impl BodyHandle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Dense body arena.
#[derive(Debug, Clone, Default)]
pub struct BodySet {
    bodies: Vec<RigidBody>,
}

impl BodySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bodies: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, body: RigidBody) -> BodyHandle {
        let handle = BodyHandle(self.bodies.len() as u32);
        self.bodies.push(body);
        handle
    }

    pub fn get(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle.index())
    }

    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle.index())
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> {
        self.bodies
            .iter()
            .enumerate()
            .map(|(i, b)| (BodyHandle(i as u32), b))
    }

    /// Total linear momentum of all bodies with finite mass.
    pub fn linear_momentum(&self) -> Vec3 {
        self.bodies
            .iter()
            .filter(|b| b.inverse_mass > 0.0)
            .map(|b| b.linear_velocity / b.inverse_mass)
            .sum()
    }
}

impl BodyArena for BodySet {
    type Handle = BodyHandle;

    fn body(&self, handle: BodyHandle) -> Option<RigidBody> {
        self.get(handle).copied()
    }

    fn apply_point_impulse(&mut self, handle: BodyHandle, point: Vec3, impulse: Vec3) -> bool {
        match self.get_mut(handle) {
            Some(body) => {
                body.apply_point_impulse(point, impulse);
                true
            }
            None => false,
        }
    }
}
