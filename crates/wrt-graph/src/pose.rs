//! Rigid-body poses.
//!
//! A [`Pose`] is a rotation plus a translation, equivalent to a 4x4
//! homogeneous matrix whose bottom row is `[0, 0, 0, 1]`.  The rotation is
//! validated once when the pose is built from raw numbers; every [`Pose`]
//! value therefore holds a proper rotation and composing or inverting poses
//! cannot fail.
//!
//! Rotations accepted within the tolerance, and products of rotations, are
//! re-orthonormalized whenever `RᵀR` drifts from the identity by more than
//! [`ORTHONORMAL_DRIFT`], so stored poses always pass validation again.
//!
//! # Example
//!
//! ```rust
//! use wrt_graph::pose::Pose;
//!
//! // table is 2 m along +Y of the world, end effector 1 m along +X of the table.
//! let world_table = Pose::from_translation(0.0, 2.0, 0.0);
//! let table_effector = Pose::from_translation(1.0, 0.0, 0.0);
//!
//! let world_effector = world_table.compose(&table_effector);
//! assert_eq!(world_effector.to_matrix()[1][3], 2.0);
//! assert!(world_effector.compose(&world_effector.inverse()).approx_eq(&Pose::identity(), 1e-12));
//! ```

use nalgebra::{Matrix3, Rotation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use wrt_types::{DEFAULT_TOLERANCE, POSE_FLOATS, WrtError};

/// Largest `max |RᵀR - I|` a stored rotation may carry.
pub const ORTHONORMAL_DRIFT: f64 = 1e-14;

const REFINE_STEPS: usize = 16;

/// Row-major 4x4 homogeneous matrix.
pub type Matrix4x4 = [[f64; 4]; 4];

/// An immutable rigid transform: rotate by `rotation`, then add `translation`.
///
/// Serializes as its row-major 4x4 matrix and validates on deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "Matrix4x4", try_from = "Matrix4x4")]
pub struct Pose {
    rotation: Rotation3<f64>,
    translation: Vector3<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// The identity transform.
    pub fn identity() -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// A pure translation.
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            rotation: Rotation3::identity(),
            translation: Vector3::new(x, y, z),
        }
    }

    /// Rotation of `angle` radians about the X axis.
    pub fn rotation_x(angle: f64) -> Self {
        Self::from_rotation(Rotation3::from_axis_angle(&Vector3::x_axis(), angle))
    }

    /// Rotation of `angle` radians about the Y axis.
    pub fn rotation_y(angle: f64) -> Self {
        Self::from_rotation(Rotation3::from_axis_angle(&Vector3::y_axis(), angle))
    }

    /// Rotation of `angle` radians about the Z axis.
    pub fn rotation_z(angle: f64) -> Self {
        Self::from_rotation(Rotation3::from_axis_angle(&Vector3::z_axis(), angle))
    }

    /// A pure rotation.
    pub fn from_rotation(rotation: Rotation3<f64>) -> Self {
        Self {
            rotation,
            translation: Vector3::zeros(),
        }
    }

    /// Same rotation, translation replaced by `(x, y, z)`.
    pub fn with_translation(self, x: f64, y: f64, z: f64) -> Self {
        Self {
            rotation: self.rotation,
            translation: Vector3::new(x, y, z),
        }
    }

    /// Build a pose from a rotation matrix and a translation, checking the
    /// rotation with [`DEFAULT_TOLERANCE`].
    pub fn from_parts(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Result<Self, WrtError> {
        Self::from_parts_with_tolerance(rotation, translation, DEFAULT_TOLERANCE)
    }

    /// Build a pose from a rotation matrix and a translation.
    ///
    /// # Errors
    ///
    /// [`WrtError::InvalidTransform`] when any entry is not finite, when
    /// `RᵀR` deviates from the identity by more than `tolerance`, or when
    /// `det(R)` is not `+1` within `tolerance`.
    pub fn from_parts_with_tolerance(
        rotation: Matrix3<f64>,
        translation: Vector3<f64>,
        tolerance: f64,
    ) -> Result<Self, WrtError> {
        if translation.iter().any(|v| !v.is_finite()) {
            return Err(WrtError::InvalidTransform(
                "translation has a non-finite component".to_string(),
            ));
        }
        check_rotation(&rotation, tolerance)?;
        Ok(Self {
            rotation: settled(Rotation3::from_matrix_unchecked(rotation)),
            translation,
        })
    }

    /// Parse a row-major 4x4 homogeneous matrix using [`DEFAULT_TOLERANCE`].
    pub fn from_matrix(m: Matrix4x4) -> Result<Self, WrtError> {
        Self::from_matrix_with_tolerance(m, DEFAULT_TOLERANCE)
    }

    /// Parse a row-major 4x4 homogeneous matrix.
    ///
    /// # Errors
    ///
    /// [`WrtError::InvalidTransform`] when the bottom row is not
    /// `[0, 0, 0, 1]` within `tolerance`, or when the upper-left 3x3 block is
    /// not a proper rotation (see [`Pose::from_parts_with_tolerance`]).
    pub fn from_matrix_with_tolerance(m: Matrix4x4, tolerance: f64) -> Result<Self, WrtError> {
        let bottom = m[3];
        let expected = [0.0, 0.0, 0.0, 1.0];
        let bottom_ok = bottom
            .iter()
            .zip(expected)
            .all(|(v, e)| v.is_finite() && (v - e).abs() <= tolerance);
        if !bottom_ok {
            return Err(WrtError::InvalidTransform(format!(
                "bottom row must be [0, 0, 0, 1], got {bottom:?}"
            )));
        }

        let rotation = Matrix3::new(
            m[0][0], m[0][1], m[0][2],
            m[1][0], m[1][1], m[1][2],
            m[2][0], m[2][1], m[2][2],
        );
        let translation = Vector3::new(m[0][3], m[1][3], m[2][3]);
        Self::from_parts_with_tolerance(rotation, translation, tolerance)
    }

    /// Row-major 4x4 homogeneous matrix.
    pub fn to_matrix(&self) -> Matrix4x4 {
        let r = self.rotation.matrix();
        let t = &self.translation;
        [
            [r[(0, 0)], r[(0, 1)], r[(0, 2)], t.x],
            [r[(1, 0)], r[(1, 1)], r[(1, 2)], t.y],
            [r[(2, 0)], r[(2, 1)], r[(2, 2)], t.z],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }

    /// Storage layout: row-major rotation followed by the translation.
    pub fn to_floats(&self) -> [f64; POSE_FLOATS] {
        let r = self.rotation.matrix();
        let t = &self.translation;
        [
            r[(0, 0)], r[(0, 1)], r[(0, 2)],
            r[(1, 0)], r[(1, 1)], r[(1, 2)],
            r[(2, 0)], r[(2, 1)], r[(2, 2)],
            t.x, t.y, t.z,
        ]
    }

    /// Inverse of [`Pose::to_floats`].
    pub fn from_floats(f: &[f64; POSE_FLOATS], tolerance: f64) -> Result<Self, WrtError> {
        let rotation = Matrix3::new(f[0], f[1], f[2], f[3], f[4], f[5], f[6], f[7], f[8]);
        let translation = Vector3::new(f[9], f[10], f[11]);
        Self::from_parts_with_tolerance(rotation, translation, tolerance)
    }

    pub fn rotation(&self) -> &Rotation3<f64> {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// `self ∘ other`: apply `other` first, then `self` (matrix product).
    ///
    /// If `self` = X_AB and `other` = X_BC, the result is X_AC.
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            rotation: settled(self.rotation * other.rotation),
            translation: self.translation + self.rotation * other.translation,
        }
    }

    /// The inverse transform: X_AB becomes X_BA.
    pub fn inverse(&self) -> Pose {
        let rotation = self.rotation.inverse();
        Pose {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// Change the axes the numbers are written in without changing the
    /// physical relationship: both the rotation and the translation are
    /// pre-multiplied by `basis`.
    pub fn reexpressed(&self, basis: &Rotation3<f64>) -> Pose {
        Pose {
            rotation: settled(basis * self.rotation),
            translation: basis * self.translation,
        }
    }

    /// Entry-wise comparison of the homogeneous matrices.
    pub fn approx_eq(&self, other: &Pose, tolerance: f64) -> bool {
        let a = self.to_matrix();
        let b = other.to_matrix();
        a.iter()
            .flatten()
            .zip(b.iter().flatten())
            .all(|(x, y)| (x - y).abs() <= tolerance)
    }
}

/// `max |RᵀR - I|` over all entries.
pub(crate) fn orthonormal_deviation(m: &Matrix3<f64>) -> f64 {
    let gram = m.transpose() * m - Matrix3::identity();
    gram.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
}

/// Project `rotation` back onto the rotation group once it has drifted past
/// [`ORTHONORMAL_DRIFT`]; rotations already within it are returned as is.
fn settled(rotation: Rotation3<f64>) -> Rotation3<f64> {
    if orthonormal_deviation(rotation.matrix()) <= ORTHONORMAL_DRIFT {
        return rotation;
    }
    // The unit quaternion is a proper rotation close to the input; a bounded
    // number of refinement steps then moves it onto the nearest one.
    let guess = UnitQuaternion::from_rotation_matrix(&rotation).to_rotation_matrix();
    Rotation3::from_matrix_eps(rotation.matrix(), f64::EPSILON, REFINE_STEPS, guess)
}

fn check_rotation(m: &Matrix3<f64>, tolerance: f64) -> Result<(), WrtError> {
    if m.iter().any(|v| !v.is_finite()) {
        return Err(WrtError::InvalidTransform(
            "rotation has a non-finite entry".to_string(),
        ));
    }

    let deviation = orthonormal_deviation(m);
    if deviation > tolerance {
        return Err(WrtError::InvalidTransform(format!(
            "rotation block is not orthonormal (max |RᵀR - I| = {deviation:e})"
        )));
    }

    let det = m.determinant();
    if (det - 1.0).abs() > tolerance {
        return Err(WrtError::InvalidTransform(format!(
            "rotation determinant is {det}, expected +1"
        )));
    }
    Ok(())
}

impl From<Pose> for Matrix4x4 {
    fn from(pose: Pose) -> Self {
        pose.to_matrix()
    }
}

impl TryFrom<Matrix4x4> for Pose {
    type Error = WrtError;

    fn try_from(m: Matrix4x4) -> Result<Self, Self::Error> {
        Pose::from_matrix(m)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
