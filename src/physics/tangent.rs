//! Friction basis selection.
//!
//! One friction axis is aligned with the sliding direction so that the box
//! approximation of the friction cone touches the true cone where it matters.

use glam::Vec3;

use super::contact::TangentFrame;
use super::rigid_body::RigidBody;

/// Squared length below which the sliding direction is considered degenerate.
pub const DEFAULT_TANGENT_EPSILON: f32 = 1e-8;

/// Choose the (normal, tangent, bitangent) frame for a contact.
///
/// `normal` must be unit length. When the bodies do not slide relative to each
/// other at `point`, an arbitrary stable completion of the normal is returned.
pub fn select_frame(
    body_a: &RigidBody,
    body_b: &RigidBody,
    point: Vec3,
    normal: Vec3,
    epsilon: f32,
) -> TangentFrame {
    let relative_velocity = body_a.velocity_at(point) - body_b.velocity_at(point);
    let bitangent = normal.cross(relative_velocity);

    if bitangent.length_squared() < epsilon {
        return TangentFrame::from_normal(normal);
    }

    let bitangent = bitangent.normalize();
    TangentFrame {
        normal,
        tangent: bitangent.cross(normal),
        bitangent,
    }
}
