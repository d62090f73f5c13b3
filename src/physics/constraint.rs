//! Per-contact constraint precomputation.
//!
//! A contact couples the 6-DOF velocities of two bodies to a 3-DOF constraint
//! space spanned by (normal, tangent, bitangent). The 3x6 Jacobians are kept
//! as a linear and an angular 3x3 block.

use glam::{Mat3, Vec3};

use crate::error::SolverError;

use super::contact::ContactDescriptor;
use super::rigid_body::RigidBody;

/// Relative determinant below which the effective mass is treated as singular.
const SINGULAR_TOLERANCE: f32 = 1e-7;

/// Skew-symmetric matrix with `cross_matrix(v) * x == v.cross(x)`.
pub fn cross_matrix(v: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, v.z, -v.y),
        Vec3::new(-v.z, 0.0, v.x),
        Vec3::new(v.y, -v.x, 0.0),
    )
}

/// A 3x6 matrix acting on a (linear, angular) body velocity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Jacobian {
    pub linear: Mat3,
    pub angular: Mat3,
}

impl Jacobian {
    /// `J · (v, ω)`.
    #[inline]
    pub fn mul_velocity(&self, linear: Vec3, angular: Vec3) -> Vec3 {
        self.linear * linear + self.angular * angular
    }

    /// `Jᵗ · λ` as a (linear, angular) pair.
    #[inline]
    pub fn transpose_mul(&self, lambda: Vec3) -> (Vec3, Vec3) {
        (
            self.linear.transpose() * lambda,
            self.angular.transpose() * lambda,
        )
    }

    /// `J · diag(m⁻¹ I₃, I⁻¹)`.
    fn weighted(&self, inverse_mass: f32, inverse_inertia: Mat3) -> Self {
        Self {
            linear: self.linear * inverse_mass,
            angular: self.angular * inverse_inertia,
        }
    }

    /// `self · otherᵗ`, a 3x3 product.
    fn mul_transpose(&self, other: &Self) -> Mat3 {
        self.linear * other.linear.transpose() + self.angular * other.angular.transpose()
    }
}

/// Everything a relaxation sweep needs about one contact, computed once per timestep.
#[derive(Debug, Clone, Copy)]
pub struct ContactConstraint {
    pub body_a: usize,
    pub body_b: usize,
    pub jacobian_a: Jacobian,
    pub jacobian_b: Jacobian,
    pub mass_weighted_a: Jacobian,
    pub mass_weighted_b: Jacobian,
    /// `(MJ_a · J_aᵗ + MJ_b · J_bᵗ)⁻¹`.
    pub inv_effective_mass: Mat3,
    /// Constraint-space relative velocity before the solve.
    pub bias: Vec3,
    /// Columns are (normal, tangent, bitangent).
    pub basis: Mat3,
    pub contact_point: Vec3,
    pub friction: f32,
    pub penetration: f32,
}

impl ContactConstraint {
    /// Build the constraint for contact `index` between `body_a` and `body_b`.
    ///
    /// Inertia is rotated into world space before use, so anisotropic bodies
    /// couple correctly at any orientation.
    pub fn new(
        index: usize,
        contact: &ContactDescriptor,
        body_a: &RigidBody,
        body_b: &RigidBody,
        friction: f32,
    ) -> Result<Self, SolverError> {
        let basis = contact.frame.basis();
        let basis_t = basis.transpose();

        let r_a = contact.contact_point - body_a.position;
        let r_b = contact.contact_point - body_b.position;

        let jacobian_a = Jacobian {
            linear: -basis_t,
            angular: basis_t * cross_matrix(r_a),
        };
        let jacobian_b = Jacobian {
            linear: basis_t,
            angular: -(basis_t * cross_matrix(r_b)),
        };

        let mass_weighted_a =
            jacobian_a.weighted(body_a.inverse_mass, body_a.inverse_inertia_world());
        let mass_weighted_b =
            jacobian_b.weighted(body_b.inverse_mass, body_b.inverse_inertia_world());

        let effective_mass =
            mass_weighted_a.mul_transpose(&jacobian_a) + mass_weighted_b.mul_transpose(&jacobian_b);
        let inv_effective_mass = invert_effective_mass(index, effective_mass)?;

        let (v_a, w_a) = body_a.generalized_velocity();
        let (v_b, w_b) = body_b.generalized_velocity();
        let bias = jacobian_a.mul_velocity(v_a, w_a) + jacobian_b.mul_velocity(v_b, w_b);

        Ok(Self {
            body_a: contact.body_a,
            body_b: contact.body_b,
            jacobian_a,
            jacobian_b,
            mass_weighted_a,
            mass_weighted_b,
            inv_effective_mass,
            bias,
            basis,
            contact_point: contact.contact_point,
            friction,
            penetration: contact.penetration,
        })
    }

    /// The Jacobian for the given side of the contact.
    #[inline]
    pub fn jacobian(&self, is_second_body: bool) -> &Jacobian {
        if is_second_body {
            &self.jacobian_b
        } else {
            &self.jacobian_a
        }
    }

    /// World-space impulse on body B for the multiplier `lambda`. Body A receives the negation.
    #[inline]
    pub fn world_impulse(&self, lambda: Vec3) -> Vec3 {
        self.basis * lambda
    }
}

fn invert_effective_mass(index: usize, k: Mat3) -> Result<Mat3, SolverError> {
    let determinant = k.determinant();
    let scale = (k.x_axis.x + k.y_axis.y + k.z_axis.z) / 3.0;

    if !determinant.is_finite()
        || scale <= 0.0
        || determinant.abs() <= SINGULAR_TOLERANCE * scale * scale * scale
    {
        return Err(SolverError::SingularEffectiveMass {
            contact: index,
            determinant,
        });
    }

    Ok(k.inverse())
}
