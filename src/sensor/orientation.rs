//! Quaternion to Euler decoding in the gimbal's ZXY order.
//!
//! The gimbal stacks its joints yaw (Z) first, then roll (X), then pitch (Y),
//! so the camera orientation is `Rz(yaw) * Rx(roll) * Ry(pitch)`. Only the five
//! rotation matrix entries needed to recover the three angles are computed.

use crate::error::GimbalError;

/// Orientation sample as delivered by the IMU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion { w: 1.0, x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Builds the orientation reached by rotating `yaw` about Z, then `roll`
    /// about the new X, then `pitch` about the new Y.
    pub fn from_zxy(yaw: f64, roll: f64, pitch: f64) -> Self {
        let (sz, cz) = (yaw * 0.5).sin_cos();
        let (sx, cx) = (roll * 0.5).sin_cos();
        let (sy, cy) = (pitch * 0.5).sin_cos();

        Self {
            w: cz * cx * cy - sz * sx * sy,
            x: cz * sx * cy - sz * cx * sy,
            y: cz * cx * sy + sz * sx * cy,
            z: cz * sx * sy + sz * cx * cy,
        }
    }

    pub fn norm(&self) -> f64 {
        (self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Unit-length copy. Fails for zero-length or non-finite samples.
    pub fn normalized(&self) -> Result<Self, GimbalError> {
        let n = self.norm();
        if !n.is_finite() || n < f64::EPSILON {
            return Err(GimbalError::NumericDomain(format!(
                "quaternion ({:.4}, {:.4}, {:.4}, {:.4}) has norm {}",
                self.w, self.x, self.y, self.z, n
            )));
        }
        Ok(Self {
            w: self.w / n,
            x: self.x / n,
            y: self.y / n,
            z: self.z / n,
        })
    }

    /// Decodes this orientation into ZXY Euler angles.
    pub fn to_zxy(&self) -> EulerAngles {
        let Quaternion { w, x, y, z } = *self;
        three_axis_rot(
            -2.0 * (x * y - w * z),
            w * w - x * x + y * y - z * z,
            2.0 * (y * z + w * x),
            -2.0 * (x * z - w * y),
            w * w - x * x - y * y + z * z,
        )
    }
}

/// Euler angles in radians.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EulerAngles {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl EulerAngles {
    pub fn is_finite(&self) -> bool {
        self.roll.is_finite() && self.pitch.is_finite() && self.yaw.is_finite()
    }
}

/// Recovers the angles from the matrix entries.
///
/// `r21` is clamped before `asin`: near gimbal lock rounding pushes it past
/// ±1 and the result would otherwise be NaN.
pub fn three_axis_rot(r11: f64, r12: f64, r21: f64, r31: f64, r32: f64) -> EulerAngles {
    EulerAngles {
        yaw: r11.atan2(r12),
        roll: r21.clamp(-1.0, 1.0).asin(),
        pitch: r31.atan2(r32),
    }
}

/// Normalizes then decodes a raw IMU sample.
pub fn decode(sample: &Quaternion) -> Result<EulerAngles, GimbalError> {
    let euler = sample.normalized()?.to_zxy();
    if !euler.is_finite() {
        return Err(GimbalError::NumericDomain(format!("decoded angles {:?}", euler)));
    }
    Ok(euler)
}
