//! Contact set: the projected Gauss-Seidel state for one group of contacts.
//!
//! A set is built fresh every timestep, relaxed a fixed number of times and
//! then consumed by [`ContactSet::apply_impulses`].

use std::collections::HashMap;
use std::hash::Hash;

use glam::Vec3;
use tracing::{debug, trace, warn};

use crate::error::SolverError;

use super::constraint::ContactConstraint;
use super::contact::{BodyContactLink, ContactDescriptor, ContactPoint};
use super::rigid_body::{BodyArena, RigidBody};
use super::solver::SolverConfig;
use super::tangent::select_frame;
use super::Result;

/// Tolerance used to validate caller-provided tangent frames.
const FRAME_TOLERANCE: f32 = 1e-3;

/// Solver state for a group of contacts sharing bodies.
#[derive(Debug, Clone)]
pub struct ContactSet<H> {
    handles: Vec<H>,
    links: Vec<Vec<BodyContactLink>>,
    constraints: Vec<ContactConstraint>,
    lambda: Vec<Vec3>,
    baumgarte: f32,
    penetration_slop: f32,
}

impl<H: Copy + Eq + Hash + std::fmt::Debug> ContactSet<H> {
    /// Build a set from arena handles and contacts indexing into `handles`.
    ///
    /// Bodies are read once here; the sweeps never look at the arena again.
    /// Each handle may appear only once.
    pub fn new<A>(
        arena: &A,
        handles: Vec<H>,
        contacts: &[ContactDescriptor],
        config: &SolverConfig,
    ) -> Result<Self>
    where
        A: BodyArena<Handle = H>,
    {
        let bodies = read_bodies(arena, &handles)
            .inspect_err(|err| warn!(error = %err, "rejecting contact set"))?;

        let body_count = bodies.len();
        let mut links = vec![Vec::new(); body_count];
        let mut constraints = Vec::with_capacity(contacts.len());

        for (i, contact) in contacts.iter().enumerate() {
            let constraint = build_constraint(i, contact, &bodies, config)
                .inspect_err(|err| warn!(contact = i, error = %err, "rejecting contact"))?;
            constraints.push(constraint);

            links[contact.body_a].push(BodyContactLink {
                contact_index: i,
                is_second_body: false,
            });
            links[contact.body_b].push(BodyContactLink {
                contact_index: i,
                is_second_body: true,
            });
        }

        debug!(
            bodies = body_count,
            contacts = constraints.len(),
            "built contact set"
        );

        Ok(Self {
            handles,
            links,
            lambda: vec![Vec3::ZERO; constraints.len()],
            constraints,
            baumgarte: config.baumgarte,
            penetration_slop: config.penetration_slop,
        })
    }

    /// Seed the multipliers with impulses from a previous timestep.
    ///
    /// Each seed is projected into the contact's box before use.
    pub fn warm_start(&mut self, previous: &[Vec3]) -> Result<()> {
        if previous.len() != self.lambda.len() {
            return Err(SolverError::WarmStartLength {
                expected: self.lambda.len(),
                actual: previous.len(),
            });
        }
        for ((lambda, seed), c) in self.lambda.iter_mut().zip(previous).zip(&self.constraints) {
            *lambda = project(*seed, c.friction);
        }
        Ok(())
    }

    /// Run one Gauss-Seidel sweep over all contacts in index order.
    ///
    /// Returns the largest change of any multiplier component during the sweep.
    pub fn solve_iteration(&mut self, dt: f32) -> f32 {
        let mut max_delta = 0.0f32;

        for i in 0..self.constraints.len() {
            let c = &self.constraints[i];
            let (lin_a, ang_a) = self.accumulated(c.body_a);
            let (lin_b, ang_b) = self.accumulated(c.body_b);

            let mut residual = c.mass_weighted_a.mul_velocity(lin_a, ang_a)
                + c.mass_weighted_b.mul_velocity(lin_b, ang_b)
                + c.bias;

            if self.baumgarte > 0.0 && dt > 0.0 && c.penetration > self.penetration_slop {
                residual.x -= self.baumgarte / dt * (c.penetration - self.penetration_slop);
            }

            let previous = self.lambda[i];
            let lambda = project(previous - c.inv_effective_mass * residual, c.friction);
            self.lambda[i] = lambda;

            max_delta = max_delta.max((lambda - previous).abs().max_element());
        }

        trace!(contacts = self.constraints.len(), max_delta, "contact sweep");
        max_delta
    }

    /// Velocity change of a body, in its generalized coordinates scaled by mass,
    /// from every impulse currently committed to its contacts: `Σ Jᵗ λ`.
    fn accumulated(&self, body: usize) -> (Vec3, Vec3) {
        self.links[body]
            .iter()
            .fold((Vec3::ZERO, Vec3::ZERO), |(lin, ang), link| {
                let jacobian = self.constraints[link.contact_index].jacobian(link.is_second_body);
                let (l, a) = jacobian.transpose_mul(self.lambda[link.contact_index]);
                (lin + l, ang + a)
            })
    }

    /// Write the accumulated impulses into the bodies and end the set's life.
    ///
    /// Body A of each contact receives `-B·λ`, body B receives `+B·λ`. Returns
    /// the final multipliers so the caller can warm start the next timestep.
    pub fn apply_impulses<A>(self, arena: &mut A) -> Result<Vec<Vec3>>
    where
        A: BodyArena<Handle = H>,
    {
        if let Some(h) = self.missing_handle(&*arena) {
            return Err(SolverError::MissingBody(format!("{h:?}")));
        }

        for (c, &lambda) in self.constraints.iter().zip(&self.lambda) {
            let impulse = c.world_impulse(lambda);
            arena.apply_point_impulse(self.handles[c.body_a], c.contact_point, -impulse);
            arena.apply_point_impulse(self.handles[c.body_b], c.contact_point, impulse);
        }

        Ok(self.lambda)
    }

    /// First handle of this set that `arena` no longer holds.
    pub fn missing_handle<A>(&self, arena: &A) -> Option<H>
    where
        A: BodyArena<Handle = H>,
    {
        self.handles.iter().copied().find(|&h| arena.body(h).is_none())
    }

    pub fn lambdas(&self) -> &[Vec3] {
        &self.lambda
    }

    pub fn constraints(&self) -> &[ContactConstraint] {
        &self.constraints
    }

    pub fn handles(&self) -> &[H] {
        &self.handles
    }

    /// Contacts touching the local body `body`, in insertion order.
    pub fn body_links(&self, body: usize) -> Option<&[BodyContactLink]> {
        self.links.get(body).map(Vec::as_slice)
    }

    pub fn body_count(&self) -> usize {
        self.handles.len()
    }

    pub fn contact_count(&self) -> usize {
        self.constraints.len()
    }
}

/// Snapshot every body, rejecting stale and repeated handles.
fn read_bodies<A>(arena: &A, handles: &[A::Handle]) -> Result<Vec<RigidBody>>
where
    A: BodyArena,
{
    let mut seen = HashMap::with_capacity(handles.len());
    let mut bodies = Vec::with_capacity(handles.len());
    for (local, &h) in handles.iter().enumerate() {
        if let Some(first) = seen.insert(h, local) {
            return Err(SolverError::DuplicateBody {
                handle: format!("{h:?}"),
                first,
                second: local,
            });
        }
        let body = arena
            .body(h)
            .ok_or_else(|| SolverError::MissingBody(format!("{h:?}")))?;
        bodies.push(body);
    }
    Ok(bodies)
}

/// Validate contact `index` against the local body list and precompute it.
fn build_constraint(
    index: usize,
    contact: &ContactDescriptor,
    bodies: &[RigidBody],
    config: &SolverConfig,
) -> Result<ContactConstraint> {
    let body_count = bodies.len();
    for local in [contact.body_a, contact.body_b] {
        if local >= body_count {
            return Err(SolverError::BodyIndexOutOfRange {
                contact: index,
                index: local,
                body_count,
            });
        }
    }
    if contact.body_a == contact.body_b {
        return Err(SolverError::SelfContact {
            contact: index,
            index: contact.body_a,
        });
    }
    if !contact.frame.is_orthonormal(FRAME_TOLERANCE) {
        return Err(SolverError::InvalidTangentFrame { contact: index });
    }

    let body_a = &bodies[contact.body_a];
    let body_b = &bodies[contact.body_b];
    if body_a.is_immovable() && body_b.is_immovable() {
        return Err(SolverError::ImmovablePair { contact: index });
    }

    let friction = config
        .friction_combine
        .combine(body_a.static_friction, body_b.static_friction)
        .max(0.0);
    ContactConstraint::new(index, contact, body_a, body_b, friction)
}

/// Box projection: the normal only pushes, friction stays within `µ·λₙ`.
#[inline]
fn project(mut lambda: Vec3, friction: f32) -> Vec3 {
    lambda.x = lambda.x.max(0.0);
    let limit = friction * lambda.x;
    lambda.y = lambda.y.max(-limit).min(limit);
    lambda.z = lambda.z.max(-limit).min(limit);
    lambda
}

/// Collects narrow-phase contacts between arena bodies and remaps them to a
/// dense local body list.
#[derive(Debug, Clone)]
pub struct ContactSetBuilder<H> {
    handles: Vec<H>,
    local: HashMap<H, usize>,
    contacts: Vec<(usize, usize, ContactPoint<H>)>,
}

impl<H> Default for ContactSetBuilder<H> {
    fn default() -> Self {
        Self {
            handles: Vec::new(),
            local: HashMap::new(),
            contacts: Vec::new(),
        }
    }
}

impl<H: Copy + Eq + Hash + std::fmt::Debug> ContactSetBuilder<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local index of `handle`, registering it on first use.
    pub fn add_body(&mut self, handle: H) -> usize {
        *self.local.entry(handle).or_insert_with(|| {
            self.handles.push(handle);
            self.handles.len() - 1
        })
    }

    pub fn add_contact(&mut self, contact: ContactPoint<H>) -> &mut Self {
        let a = self.add_body(contact.body_a);
        let b = self.add_body(contact.body_b);
        self.contacts.push((a, b, contact));
        self
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Select tangent frames from current body velocities and build the set.
    pub fn build<A>(self, arena: &A, config: &SolverConfig) -> Result<ContactSet<H>>
    where
        A: BodyArena<Handle = H>,
    {
        let mut descriptors = Vec::with_capacity(self.contacts.len());
        for (a, b, contact) in &self.contacts {
            let body_a = arena
                .body(contact.body_a)
                .ok_or_else(|| SolverError::MissingBody(format!("{:?}", contact.body_a)))?;
            let body_b = arena
                .body(contact.body_b)
                .ok_or_else(|| SolverError::MissingBody(format!("{:?}", contact.body_b)))?;

            let frame = select_frame(
                &body_a,
                &body_b,
                contact.position,
                contact.normal,
                config.tangent_epsilon,
            );
            descriptors.push(
                ContactDescriptor::new(contact.position, frame, *a, *b)
                    .with_penetration(contact.penetration),
            );
        }

        ContactSet::new(arena, self.handles, &descriptors, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::contact::TangentFrame;
    use crate::physics::rigid_body::{BodyHandle, BodySet};
    use crate::physics::solver::FrictionCombine;

    const DT: f32 = 1.0 / 60.0;

    fn config() -> SolverConfig {
        SolverConfig::default()
    }

    /// Unit sphere resting on a static ground at z = 0 with the given velocity.
    fn sphere_on_ground(
        velocity: Vec3,
        friction: f32,
    ) -> (BodySet, Vec<BodyHandle>, ContactDescriptor) {
        let mut bodies = BodySet::new();
        let ground = bodies.insert(RigidBody::new_static().with_friction(friction));
        let sphere = bodies.insert(
            RigidBody::dynamic_sphere(1.0, 0.5)
                .with_position(Vec3::new(0.0, 0.0, 0.5))
                .with_velocity(velocity, Vec3::ZERO)
                .with_friction(friction),
        );
        let a = bodies.body(ground).unwrap();
        let b = bodies.body(sphere).unwrap();
        let frame = select_frame(&a, &b, Vec3::ZERO, Vec3::Z, 1e-8);
        let contact = ContactDescriptor::new(Vec3::ZERO, frame, 0, 1);
        (bodies, vec![ground, sphere], contact)
    }

    /// Three boxes stacked on a static ground, all falling at one step of gravity.
    fn falling_stack(friction: f32) -> (BodySet, Vec<BodyHandle>, Vec<ContactDescriptor>) {
        let mut bodies = BodySet::new();
        let mut handles = vec![bodies.insert(RigidBody::new_static().with_friction(friction))];
        for level in 0..3 {
            let z = 0.5 + level as f32;
            handles.push(
                bodies.insert(
                    RigidBody::dynamic_box(1.0, Vec3::splat(0.5))
                        .with_position(Vec3::new(0.05 * level as f32, 0.0, z))
                        .with_velocity(
                            Vec3::new(0.3, -0.2 * level as f32, -9.81 * DT),
                            Vec3::new(0.0, 0.1, 0.0),
                        )
                        .with_friction(friction),
                ),
            );
        }

        let mut contacts = Vec::new();
        for level in 0..3usize {
            for corner in [
                Vec3::new(-0.5, -0.5, 0.0),
                Vec3::new(0.5, -0.5, 0.0),
                Vec3::new(0.5, 0.5, 0.0),
                Vec3::new(-0.5, 0.5, 0.0),
            ] {
                let point = corner + Vec3::new(0.05 * level as f32, 0.0, level as f32);
                let a = bodies.body(handles[level]).unwrap();
                let b = bodies.body(handles[level + 1]).unwrap();
                let frame = select_frame(&a, &b, point, Vec3::Z, 1e-8);
                contacts.push(ContactDescriptor::new(point, frame, level, level + 1));
            }
        }
        (bodies, handles, contacts)
    }

    #[test]
    fn test_construction_builds_links() {
        let (bodies, handles, contacts) = falling_stack(0.5);
        let set = ContactSet::new(&bodies, handles, &contacts, &config()).unwrap();

        assert_eq!(set.body_count(), 4);
        assert_eq!(set.contact_count(), 12);
        let links = |body| set.body_links(body).unwrap();
        assert_eq!(links(0).len(), 4);
        assert_eq!(links(1).len(), 8);
        assert_eq!(links(3).len(), 4);
        assert!(links(0).iter().all(|l| !l.is_second_body));
        assert!(links(3).iter().all(|l| l.is_second_body));
        assert_eq!(
            links(1)[4],
            BodyContactLink {
                contact_index: 4,
                is_second_body: false
            }
        );
        assert!(set.body_links(4).is_none());
        assert!(set.lambdas().iter().all(|l| *l == Vec3::ZERO));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let (bodies, handles, mut contact) = sphere_on_ground(Vec3::ZERO, 0.5);
        contact.body_b = 5;
        let err = ContactSet::new(&bodies, handles, &[contact], &config()).unwrap_err();
        assert_eq!(
            err,
            SolverError::BodyIndexOutOfRange {
                contact: 0,
                index: 5,
                body_count: 2
            }
        );
    }

    #[test]
    fn test_immovable_pair_rejected() {
        let mut bodies = BodySet::new();
        let a = bodies.insert(RigidBody::new_static());
        let b = bodies.insert(RigidBody::new_kinematic(Vec3::X, Vec3::ZERO));
        let contact = ContactDescriptor::new(Vec3::ZERO, TangentFrame::from_normal(Vec3::Z), 0, 1);

        let err = ContactSet::new(&bodies, vec![a, b], &[contact], &config()).unwrap_err();
        assert_eq!(err, SolverError::ImmovablePair { contact: 0 });
    }

    #[test]
    fn test_missing_body_rejected() {
        let bodies = BodySet::new();
        let err = ContactSet::new(&bodies, vec![BodyHandle(2)], &[], &config()).unwrap_err();
        assert!(matches!(err, SolverError::MissingBody(_)), "{err:?}");
    }

    #[test]
    fn test_repeated_handle_rejected() {
        // Two contacts reaching the same ball through different local indices
        // would push it twice.
        let mut bodies = BodySet::new();
        let ground = bodies.insert(RigidBody::new_static());
        let ball = bodies.insert(
            RigidBody::dynamic_sphere(1.0, 0.5)
                .with_position(Vec3::new(0.0, 0.0, 0.5))
                .with_velocity(Vec3::new(0.0, 0.0, -1.0), Vec3::ZERO),
        );
        let frame = TangentFrame::from_normal(Vec3::Z);
        let contacts = [
            ContactDescriptor::new(Vec3::ZERO, frame, 0, 1),
            ContactDescriptor::new(Vec3::ZERO, frame, 0, 2),
        ];

        let err = ContactSet::new(&bodies, vec![ground, ball, ball], &contacts, &config())
            .unwrap_err();
        assert_eq!(
            err,
            SolverError::DuplicateBody {
                handle: format!("{ball:?}"),
                first: 1,
                second: 2,
            }
        );
        assert_eq!(
            bodies.body(ball).unwrap().linear_velocity,
            Vec3::new(0.0, 0.0, -1.0)
        );
    }

    #[test]
    fn test_bad_frame_rejected() {
        let (bodies, handles, mut contact) = sphere_on_ground(Vec3::ZERO, 0.5);
        contact.frame.tangent *= 2.0;
        let err = ContactSet::new(&bodies, handles, &[contact], &config()).unwrap_err();
        assert_eq!(err, SolverError::InvalidTangentFrame { contact: 0 });
    }

    #[test]
    fn test_self_contact_rejected() {
        let (bodies, handles, mut contact) = sphere_on_ground(Vec3::ZERO, 0.5);
        contact.body_a = 1;
        let err = ContactSet::new(&bodies, handles, &[contact], &config()).unwrap_err();
        assert_eq!(err, SolverError::SelfContact { contact: 0, index: 1 });
    }

    #[test]
    fn test_resting_contact_stays_zero() {
        let (mut bodies, handles, contact) = sphere_on_ground(Vec3::ZERO, 0.5);
        let mut set = ContactSet::new(&bodies, handles.clone(), &[contact], &config()).unwrap();

        set.solve_iteration(DT);
        assert_eq!(set.lambdas()[0], Vec3::ZERO);

        let before = bodies.body(handles[1]).unwrap();
        set.apply_impulses(&mut bodies).unwrap();
        assert_eq!(bodies.body(handles[1]).unwrap(), before);
    }

    #[test]
    fn test_zero_input_stack_converges_in_one_sweep() {
        let (bodies, handles, mut contacts) = falling_stack(0.5);
        let mut resting = BodySet::new();
        for (_, body) in bodies.iter() {
            resting.insert(body.with_velocity(Vec3::ZERO, Vec3::ZERO));
        }
        for c in &mut contacts {
            c.frame = TangentFrame::from_normal(Vec3::Z);
        }

        let mut set = ContactSet::new(&resting, handles, &contacts, &config()).unwrap();
        let delta = set.solve_iteration(DT);
        assert_eq!(delta, 0.0);
        assert!(set.lambdas().iter().all(|l| *l == Vec3::ZERO));
    }

    #[test]
    fn test_normal_and_friction_bounds_hold_every_sweep() {
        let (bodies, handles, contacts) = falling_stack(0.4);
        let mut set = ContactSet::new(&bodies, handles, &contacts, &config()).unwrap();

        for sweep in 0..20 {
            set.solve_iteration(DT);
            for (i, (l, c)) in set.lambdas().iter().zip(set.constraints()).enumerate() {
                assert!(l.x >= 0.0, "sweep {sweep} contact {i}: normal {}", l.x);
                let limit = c.friction * l.x;
                assert!(l.y.abs() <= limit, "sweep {sweep} contact {i}: {l} limit {limit}");
                assert!(l.z.abs() <= limit, "sweep {sweep} contact {i}: {l} limit {limit}");
            }
        }
    }

    #[test]
    fn test_frictionless_tangents_stay_zero() {
        let (bodies, handles, contacts) = falling_stack(0.0);
        let mut set = ContactSet::new(&bodies, handles, &contacts, &config()).unwrap();

        for _ in 0..10 {
            set.solve_iteration(DT);
            for l in set.lambdas() {
                assert_eq!(l.y, 0.0);
                assert_eq!(l.z, 0.0);
            }
        }
    }

    #[test]
    fn test_separating_contact_does_not_pull() {
        let (bodies, handles, contact) = sphere_on_ground(Vec3::new(0.0, 0.0, 2.0), 0.5);
        let mut set = ContactSet::new(&bodies, handles, &[contact], &config()).unwrap();
        set.solve_iteration(DT);
        assert_eq!(set.lambdas()[0], Vec3::ZERO);
    }

    #[test]
    fn test_falling_sphere_stops_on_ground() {
        let (mut bodies, handles, contact) = sphere_on_ground(Vec3::new(0.0, 0.0, -3.0), 0.5);
        let mut set = ContactSet::new(&bodies, handles.clone(), &[contact], &config()).unwrap();
        for _ in 0..4 {
            set.solve_iteration(DT);
        }
        let lambdas = set.apply_impulses(&mut bodies).unwrap();

        assert!((lambdas[0].x - 3.0).abs() < 1e-4, "normal impulse {}", lambdas[0].x);
        let v = bodies.body(handles[1]).unwrap().linear_velocity;
        assert!(v.length() < 1e-4, "sphere velocity {v}");
    }

    #[test]
    fn test_sliding_sphere_is_slowed_by_friction() {
        let (mut bodies, handles, contact) = sphere_on_ground(Vec3::new(2.0, 0.0, -1.0), 0.5);
        assert!(contact.frame.tangent.abs_diff_eq(Vec3::NEG_X, 1e-6));

        let mut set = ContactSet::new(&bodies, handles.clone(), &[contact], &config()).unwrap();
        for _ in 0..10 {
            set.solve_iteration(DT);
        }
        let lambda = set.lambdas()[0];
        // Sliding needs more than µ·λₙ to stop, so friction saturates.
        assert!((lambda.y.abs() - 0.5 * lambda.x).abs() < 1e-4, "{lambda}");

        set.apply_impulses(&mut bodies).unwrap();
        let sphere = bodies.body(handles[1]).unwrap();
        assert!(sphere.linear_velocity.x < 2.0);
        assert!(sphere.linear_velocity.x > 0.0);
        assert!(sphere.linear_velocity.z.abs() < 1e-4);
    }

    #[test]
    fn test_penetration_adds_separating_velocity() {
        let (bodies, handles, contact) = sphere_on_ground(Vec3::ZERO, 0.5);
        let contact = contact.with_penetration(0.1);
        let mut set = ContactSet::new(&bodies, handles, &[contact], &config()).unwrap();
        set.solve_iteration(DT);

        let expected = 0.2 / DT * (0.1 - 0.005);
        assert!((set.lambdas()[0].x - expected).abs() < 1e-3, "{}", set.lambdas()[0].x);
    }

    #[test]
    fn test_apply_impulses_conserves_momentum() {
        let mut bodies = BodySet::new();
        let a = bodies.insert(
            RigidBody::new_dynamic(2.0, Vec3::new(0.3, 0.5, 0.7))
                .with_velocity(Vec3::new(0.5, 0.0, 1.0), Vec3::new(0.2, -0.4, 0.0)),
        );
        let b = bodies.insert(
            RigidBody::new_dynamic(1.0, Vec3::new(0.2, 0.2, 0.4))
                .with_position(Vec3::new(0.1, 0.0, 1.0))
                .with_velocity(Vec3::new(-0.5, 0.2, -1.0), Vec3::ZERO),
        );
        let point = Vec3::new(0.05, 0.0, 0.5);
        let frame = select_frame(
            &bodies.body(a).unwrap(),
            &bodies.body(b).unwrap(),
            point,
            Vec3::Z,
            1e-8,
        );
        let contact = ContactDescriptor::new(point, frame, 0, 1);
        let mut set = ContactSet::new(&bodies, vec![a, b], &[contact], &config()).unwrap();
        for _ in 0..8 {
            set.solve_iteration(DT);
        }

        let before = bodies.linear_momentum();
        let lambdas = set.apply_impulses(&mut bodies).unwrap();
        assert!(lambdas[0].x > 0.0);
        let after = bodies.linear_momentum();
        assert!((after - before).length() < 1e-5, "{before} -> {after}");
    }

    #[test]
    fn test_solve_is_deterministic() {
        let run = || {
            let (mut bodies, handles, contacts) = falling_stack(0.6);
            let mut set = ContactSet::new(&bodies, handles, &contacts, &config()).unwrap();
            for _ in 0..7 {
                set.solve_iteration(DT);
            }
            let lambdas = set.apply_impulses(&mut bodies).unwrap();
            let velocities: Vec<_> = bodies
                .iter()
                .map(|(_, b)| (b.linear_velocity.to_array(), b.angular_velocity.to_array()))
                .collect();
            (lambdas, velocities)
        };

        let (l1, v1) = run();
        let (l2, v2) = run();
        let bits = |l: &[Vec3]| {
            l.iter()
                .flat_map(|v| v.to_array().map(f32::to_bits))
                .collect::<Vec<_>>()
        };
        assert_eq!(bits(&l1), bits(&l2));
        assert_eq!(
            format!("{v1:?}"),
            format!("{v2:?}"),
            "velocities differ between runs"
        );
    }

    #[test]
    fn test_warm_start_projects_and_checks_length() {
        let (bodies, handles, contact) = sphere_on_ground(Vec3::ZERO, 0.5);
        let mut set = ContactSet::new(&bodies, handles, &[contact], &config()).unwrap();

        assert_eq!(
            set.warm_start(&[]),
            Err(SolverError::WarmStartLength {
                expected: 1,
                actual: 0
            })
        );

        set.warm_start(&[Vec3::new(2.0, 5.0, -5.0)]).unwrap();
        assert_eq!(set.lambdas()[0], Vec3::new(2.0, 1.0, -1.0));

        set.warm_start(&[Vec3::new(-1.0, 1.0, 0.0)]).unwrap();
        assert_eq!(set.lambdas()[0], Vec3::ZERO);
    }

    #[test]
    fn test_friction_combine_rule_applies() {
        let mut bodies = BodySet::new();
        let ground = bodies.insert(RigidBody::new_static().with_friction(0.2));
        let sphere = bodies.insert(
            RigidBody::dynamic_sphere(1.0, 0.5)
                .with_position(Vec3::new(0.0, 0.0, 0.5))
                .with_friction(0.8),
        );
        let contact = ContactDescriptor::new(Vec3::ZERO, TangentFrame::from_normal(Vec3::Z), 0, 1);

        let min = ContactSet::new(&bodies, vec![ground, sphere], &[contact], &config()).unwrap();
        assert!((min.constraints()[0].friction - 0.2).abs() < 1e-6);

        let max_config = SolverConfig {
            friction_combine: FrictionCombine::Max,
            ..config()
        };
        let max = ContactSet::new(&bodies, vec![ground, sphere], &[contact], &max_config).unwrap();
        assert!((max.constraints()[0].friction - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_builder_remaps_handles() {
        let mut bodies = BodySet::new();
        let _unused = bodies.insert(RigidBody::default());
        let ground = bodies.insert(RigidBody::new_static());
        let ball = bodies.insert(
            RigidBody::dynamic_sphere(1.0, 0.5)
                .with_position(Vec3::new(0.0, 0.0, 0.5))
                .with_velocity(Vec3::new(1.0, 0.0, -1.0), Vec3::ZERO),
        );

        let mut builder = ContactSetBuilder::new();
        builder.add_contact(ContactPoint {
            body_a: ground,
            body_b: ball,
            position: Vec3::ZERO,
            normal: Vec3::Z,
            penetration: 0.0,
        });
        assert_eq!(builder.add_body(ball), 1);
        assert_eq!(builder.contact_count(), 1);

        let set = builder.build(&bodies, &config()).unwrap();
        assert_eq!(set.handles(), &[ground, ball]);
        let c = &set.constraints()[0];
        assert_eq!((c.body_a, c.body_b), (0, 1));
        // Ball slides along +X relative to the ground, so the tangent is -X.
        assert!(c.basis.y_axis.abs_diff_eq(Vec3::NEG_X, 1e-6), "{}", c.basis.y_axis);
    }
}
