use glam::{DMat4, DQuat, DVec3, EulerRot};

use crate::sdf::Value;

/// Local transform of a scene node, either a full matrix or a TRS triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// `xformOp:transform`, takes precedence over TRS.
    pub matrix: Option<DMat4>,
    pub translation: DVec3,
    /// Euler angles in degrees, as authored.
    pub rotation: DVec3,
    pub orientation: DQuat,
    pub scale: DVec3,
    /// Set once any translate, rotate or scale op is seen.
    pub has_trs: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            matrix: None,
            translation: DVec3::ZERO,
            rotation: DVec3::ZERO,
            orientation: DQuat::IDENTITY,
            scale: DVec3::ONE,
            has_trs: false,
        }
    }
}

impl Transform {
    /// Apply an `xformOp:*` attribute. Returns `false` if the op or value kind isn't handled.
    pub fn apply(&mut self, op: &str, value: &Value) -> bool {
        match op {
            "xformOp:transform" => {
                let matrix = match value {
                    Value::Matrix4d(matrix) => *matrix,
                    Value::Matrix4dArray(matrices) => match matrices.first() {
                        Some(matrix) => *matrix,
                        None => return false,
                    },
                    _ => return false,
                };

                self.matrix = Some(matrix);
            }
            "xformOp:translate" => {
                let Some(translation) = vec3(value) else {
                    return false;
                };

                self.translation = translation;
                self.has_trs = true;
            }
            "xformOp:rotateXYZ" | "xformOp:rotate" => {
                let Some(rotation) = vec3(value) else {
                    return false;
                };

                self.rotation = rotation;
                self.orientation = euler_to_quat(rotation);
                self.has_trs = true;
            }
            "xformOp:scale" => {
                let Some(scale) = vec3(value) else {
                    return false;
                };

                self.scale = scale;
                self.has_trs = true;
            }
            _ => return false,
        }

        true
    }

    /// Local matrix: the authored matrix, else the TRS composition, else identity.
    pub fn to_matrix(&self) -> DMat4 {
        if let Some(matrix) = self.matrix {
            return matrix;
        }

        if self.has_trs {
            return DMat4::from_scale_rotation_translation(self.scale, self.orientation, self.translation);
        }

        DMat4::IDENTITY
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        self.to_matrix() == DMat4::IDENTITY
    }
}

/// Vector ops are authored as double or float triples.
fn vec3(value: &Value) -> Option<DVec3> {
    match value {
        Value::Vec3d(_) | Value::Vec3f(_) => value.as_dvec3(),
        _ => None,
    }
}

/// Euler angles in degrees (applied X, then Y, then Z) to a quaternion.
pub fn euler_to_quat(degrees: DVec3) -> DQuat {
    DQuat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}
