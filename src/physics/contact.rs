//! Contact data structures for collision response.

use glam::{Mat3, Vec3};

/// Orthonormal constraint basis of a contact.
///
/// `normal` points from body A towards body B. The triple is right-handed:
/// `normal × tangent = bitangent`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TangentFrame {
    pub normal: Vec3,
    pub tangent: Vec3,
    pub bitangent: Vec3,
}

impl TangentFrame {
    /// Complete a unit normal into an arbitrary right-handed basis.
    pub fn from_normal(normal: Vec3) -> Self {
        let tangent = normal.any_orthonormal_vector();
        Self {
            normal,
            tangent,
            bitangent: normal.cross(tangent),
        }
    }

    /// Basis matrix with columns (normal, tangent, bitangent).
    pub fn basis(&self) -> Mat3 {
        Mat3::from_cols(self.normal, self.tangent, self.bitangent)
    }

    /// Express a constraint-space vector in world space.
    pub fn to_world(&self, local: Vec3) -> Vec3 {
        self.normal * local.x + self.tangent * local.y + self.bitangent * local.z
    }

    /// Whether the three axes are unit length, mutually orthogonal and right-handed.
    pub fn is_orthonormal(&self, eps: f32) -> bool {
        let unit = |v: Vec3| (v.length_squared() - 1.0).abs() <= eps;
        unit(self.normal)
            && unit(self.tangent)
            && unit(self.bitangent)
            && self.normal.dot(self.tangent).abs() <= eps
            && self.normal.dot(self.bitangent).abs() <= eps
            && self.tangent.dot(self.bitangent).abs() <= eps
            && self.normal.cross(self.tangent).dot(self.bitangent) > 0.0
    }
}

/// A contact handed to a [`ContactSet`](super::contact_set::ContactSet).
///
/// `body_a` and `body_b` index the set's local body list, not the arena.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactDescriptor {
    /// Contact position in world space.
    pub contact_point: Vec3,
    pub frame: TangentFrame,
    pub body_a: usize,
    pub body_b: usize,
    /// Penetration depth along the normal. Zero disables position correction.
    pub penetration: f32,
}

impl ContactDescriptor {
    pub fn new(contact_point: Vec3, frame: TangentFrame, body_a: usize, body_b: usize) -> Self {
        Self {
            contact_point,
            frame,
            body_a,
            body_b,
            penetration: 0.0,
        }
    }

    pub fn with_penetration(mut self, penetration: f32) -> Self {
        self.penetration = penetration;
        self
    }
}

/// One entry of a body's contact adjacency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyContactLink {
    pub contact_index: usize,
    /// `true` when the body is `body_b` of the contact.
    pub is_second_body: bool,
}

/// Raw narrow-phase output between two arena bodies.
#[derive(Debug, Clone, Copy)]
pub struct ContactPoint<H> {
    pub body_a: H,
    pub body_b: H,
    /// Contact position in world space.
    pub position: Vec3,
    /// Contact normal (from A to B).
    pub normal: Vec3,
    /// Penetration depth.
    pub penetration: f32,
}
