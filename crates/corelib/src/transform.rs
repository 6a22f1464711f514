use crate::{EulerRot, Mat4, Quat, Vec3};

/// Placement of an entity: origin plus Euler angles in degrees (XYZ order).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub origin: Vec3,
    /// Degrees, each axis kept in [-180, 180) by the physics sync.
    pub angles: Vec3,
    pub scale: Vec3,
}

impl Transform {
    #[inline]
    pub const fn identity() -> Self {
        Self {
            origin: Vec3::ZERO,
            angles: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn new(origin: Vec3, angles: Vec3) -> Self {
        Self {
            origin,
            angles,
            scale: Vec3::ONE,
        }
    }

    #[inline]
    pub fn rotation(&self) -> Quat {
        Quat::from_euler(
            EulerRot::XYZ,
            self.angles.x.to_radians(),
            self.angles.y.to_radians(),
            self.angles.z.to_radians(),
        )
    }

    /// Build matrix = T * R * S (column-major Mat4 per glam).
    #[inline]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation(), self.origin)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Wrap an angle in degrees into [-180, 180).
pub fn normalize_degrees(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = (angle + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs.
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else if wrapped < -180.0 {
        wrapped + 360.0
    } else {
        wrapped
    }
}

#[inline]
pub fn normalize_angles(angles: Vec3) -> Vec3 {
    Vec3::new(
        normalize_degrees(angles.x),
        normalize_degrees(angles.y),
        normalize_degrees(angles.z),
    )
}

/// Convert an orientation to normalized XYZ Euler degrees.
pub fn angles_from_quat(orientation: Quat) -> Vec3 {
    let (x, y, z) = orientation.normalize().to_euler(EulerRot::XYZ);
    normalize_angles(Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_range(a: f32) -> bool {
        (-180.0..180.0).contains(&a)
    }

    #[test]
    fn normalize_wraps_into_half_open_range() {
        assert_eq!(normalize_degrees(0.0), 0.0);
        assert_eq!(normalize_degrees(180.0), -180.0);
        assert_eq!(normalize_degrees(-180.0), -180.0);
        assert_eq!(normalize_degrees(540.0), -180.0);
        assert!((normalize_degrees(370.0) - 10.0).abs() < 1e-4);
        assert!((normalize_degrees(-190.0) - 170.0).abs() < 1e-4);
    }

    #[test]
    fn normalize_handles_large_and_tiny_inputs() {
        for a in [1.0e9, -1.0e9, 123_456.7, -1.0e-7, 1.0e-7, 179.99999, -180.00001] {
            assert!(in_range(normalize_degrees(a)), "{a} -> {}", normalize_degrees(a));
        }
        assert_eq!(normalize_degrees(f32::NAN), 0.0);
    }

    #[test]
    fn quat_angles_round_trip() {
        let t = Transform::new(Vec3::ZERO, Vec3::new(30.0, -45.0, 60.0));
        let back = angles_from_quat(t.rotation());
        assert!((back - t.angles).abs().max_element() < 1e-3, "{back:?}");
    }

    #[test]
    fn translate_then_scale_matrix() {
        let mut t = Transform::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO);
        t.scale = Vec3::splat(2.0);
        let m = t.matrix().to_cols_array();
        assert!((m[12] - 1.0).abs() < 1e-6);
        assert!((m[13] - 2.0).abs() < 1e-6);
        assert!((m[14] - 3.0).abs() < 1e-6);
        assert!((m[0] - 2.0).abs() < 1e-6);
        assert!((m[5] - 2.0).abs() < 1e-6);
        assert!((m[10] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn identity_transform_is_identity_matrix() {
        assert_eq!(Transform::identity().matrix(), Mat4::IDENTITY);
    }
}
