//! Plain value types for positions and orientations in tabletop space.
//!
//! `y` is the vertical (elevation) axis; the tabletop plane is `x`/`z`. The
//! wire shapes are `{x, y, z}` and `{x, y, z, order}`. Rotation math is done
//! with `glam` double-precision types and converted back at the boundary.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use std::ops::{Add, Sub};

use glam::{DQuat, DVec3, EulerRot};
use serde::{Deserialize, Serialize};

/// A point or offset in tabletop space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    /// The origin.
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0, z: 0.0 };

    #[must_use]
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Rotate this vector by `euler`, as if it were a child of a rotated parent.
    #[must_use]
    pub fn apply_euler(self, euler: &Euler) -> Self {
        Self::from(euler.to_quat() * DVec3::from(self))
    }
}

impl Add for Vector3 {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

impl From<Vector3> for DVec3 {
    fn from(v: Vector3) -> Self {
        DVec3::new(v.x, v.y, v.z)
    }
}

impl From<DVec3> for Vector3 {
    fn from(v: DVec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

/// Round to the nearest integer with halves going towards positive infinity,
/// so `-2.5` becomes `-2`. Every peer must quantize identically.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 { floor + 1.0 } else { floor }
}

/// Axis order in which Euler angles are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EulerOrder {
    #[default]
    #[serde(rename = "XYZ")]
    Xyz,
    #[serde(rename = "XZY")]
    Xzy,
    #[serde(rename = "YXZ")]
    Yxz,
    #[serde(rename = "YZX")]
    Yzx,
    #[serde(rename = "ZXY")]
    Zxy,
    #[serde(rename = "ZYX")]
    Zyx,
}

/// An orientation as three angles in radians plus an application order.
///
/// Older saves wrote the fields as `_x`, `_y`, `_z`, `_order`; those names are
/// accepted on input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Euler {
    #[serde(alias = "_x")]
    pub x: f64,
    #[serde(alias = "_y")]
    pub y: f64,
    #[serde(alias = "_z")]
    pub z: f64,
    #[serde(default, alias = "_order")]
    pub order: EulerOrder,
}

impl Euler {
    /// No rotation, XYZ order.
    pub const NONE: Self = Self { x: 0.0, y: 0.0, z: 0.0, order: EulerOrder::Xyz };

    #[must_use]
    pub fn new(x: f64, y: f64, z: f64, order: EulerOrder) -> Self {
        Self { x, y, z, order }
    }

    /// A rotation about the vertical axis only.
    #[must_use]
    pub fn about_y(y: f64) -> Self {
        Self { y, ..Self::NONE }
    }

    /// The same order with every angle negated.
    ///
    /// This is an exact inverse only for single-axis rotations, which is all a
    /// map ever carries.
    #[must_use]
    pub fn reversed(&self) -> Self {
        Self { x: -self.x, y: -self.y, z: -self.z, order: self.order }
    }

    /// Component-wise sum, keeping this rotation's order.
    #[must_use]
    pub fn compose(&self, parent: &Euler) -> Self {
        Self { x: self.x + parent.x, y: self.y + parent.y, z: self.z + parent.z, order: self.order }
    }

    #[must_use]
    pub fn to_quat(&self) -> DQuat {
        match self.order {
            EulerOrder::Xyz => DQuat::from_euler(EulerRot::XYZ, self.x, self.y, self.z),
            EulerOrder::Xzy => DQuat::from_euler(EulerRot::XZY, self.x, self.z, self.y),
            EulerOrder::Yxz => DQuat::from_euler(EulerRot::YXZ, self.y, self.x, self.z),
            EulerOrder::Yzx => DQuat::from_euler(EulerRot::YZX, self.y, self.z, self.x),
            EulerOrder::Zxy => DQuat::from_euler(EulerRot::ZXY, self.z, self.x, self.y),
            EulerOrder::Zyx => DQuat::from_euler(EulerRot::ZYX, self.z, self.y, self.x),
        }
    }
}
