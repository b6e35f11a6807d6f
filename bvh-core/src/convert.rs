//! Coordinate conversion between the left-handed Y-up source space and BVH
//!
//! Mirroring across the YZ plane turns a left-handed position into a
//! right-handed one. Rotations are mirrored by negating the X component and
//! then inverted so their handedness matches the mirrored positions.

use glam::{EulerRot, Quat, Vec3};
use std::fmt::Write;

/// Decimal places used for every number in a BVH file
pub const DECIMALS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateConverter {
    pub right_handed: bool,
}

impl Default for CoordinateConverter {
    fn default() -> Self {
        Self { right_handed: true }
    }
}

impl CoordinateConverter {
    pub fn new(right_handed: bool) -> Self {
        Self { right_handed }
    }

    pub fn position(&self, position: Vec3) -> Vec3 {
        if self.right_handed {
            Vec3::new(-position.x, position.y, position.z)
        } else {
            position
        }
    }

    pub fn rotation(&self, rotation: Quat) -> Quat {
        if self.right_handed {
            Quat::from_xyzw(-rotation.x, rotation.y, rotation.z, rotation.w).inverse()
        } else {
            rotation
        }
    }
}

/// Euler angles in degrees for the Z-then-X-then-Y composition
/// (`q = Ry * Rx * Rz`), returned as `(y, x, z)` in `[0, 360)`.
pub fn euler_yxz_degrees(rotation: Quat) -> (f32, f32, f32) {
    let (y, x, z) = rotation.normalize().to_euler(EulerRot::YXZ);
    (
        normalize_degrees(y.to_degrees()),
        normalize_degrees(x.to_degrees()),
        normalize_degrees(z.to_degrees()),
    )
}

fn normalize_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can land exactly on 360 for tiny negative inputs
    let wrapped = if wrapped >= 360.0 { wrapped - 360.0 } else { wrapped };
    // collapse -0.0 so it never prints with a sign
    wrapped + 0.0
}

/// Append `value` with [`DECIMALS`] places
pub fn push_number(out: &mut String, value: f32) {
    let value = if value == 0.0 { 0.0 } else { value };
    let _ = write!(out, "{:.*}", DECIMALS, value);
}

/// `x y z` with [`DECIMALS`] places each
pub fn format_vec3(v: Vec3) -> String {
    let mut out = String::new();
    push_number(&mut out, v.x);
    out.push(' ');
    push_number(&mut out, v.y);
    out.push(' ');
    push_number(&mut out, v.z);
    out
}
