use glam::{DMat2, DMat3, DMat4, DQuat, DVec2, DVec3, DVec4, IVec2, IVec3, IVec4, Quat, Vec2, Vec3, Vec4};
use half::f16;
use strum::IntoStaticStr;

use super::*;

/// Value is a closed set of the SDF types a scene is built from.
///
/// Suffixes:
/// - d: double
/// - f: float
/// - h: half
/// - i: int
///
/// Matrices are stored the way glam expects them: each row of the on-disk
/// (row-major, row-vector) matrix becomes a glam column.
#[derive(Debug, Clone, PartialEq, IntoStaticStr)]
pub enum Value {
    Bool(bool),
    Uchar(u8),
    Int(i32),
    Uint(u32),
    Int64(i64),
    Uint64(u64),

    Half(f16),
    Float(f32),
    Double(f64),

    String(String),
    Token(String),
    AssetPath(String),

    Specifier(Specifier),
    Permission(Permission),
    Variability(Variability),

    Quatd(DQuat),
    Quatf(Quat),

    Vec2d(DVec2),
    Vec2f(Vec2),
    Vec2i(IVec2),

    Vec3d(DVec3),
    Vec3f(Vec3),
    Vec3h([f16; 3]),
    Vec3i(IVec3),

    Vec4d(DVec4),
    Vec4f(Vec4),
    Vec4i(IVec4),

    Matrix2d(DMat2),
    Matrix3d(DMat3),
    Matrix4d(DMat4),

    IntArray(Vec<i32>),
    UintArray(Vec<u32>),
    Int64Array(Vec<i64>),
    Uint64Array(Vec<u64>),
    HalfArray(Vec<f16>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),

    TokenArray(Vec<String>),
    AssetPathArray(Vec<String>),

    Vec2fArray(Vec<Vec2>),
    Vec3fArray(Vec<Vec3>),
    Vec3dArray(Vec<DVec3>),
    Vec3hArray(Vec<[f16; 3]>),
    Vec3iArray(Vec<IVec3>),
    Vec4fArray(Vec<Vec4>),
    Matrix4dArray(Vec<DMat4>),

    TokenVector(Vec<String>),
    PathVector(Vec<Path>),

    /// Recognized type whose contents are not decoded (dictionaries, list ops, time samples, ...).
    Opaque(String),
}

impl Value {
    /// Variant name, for diagnostics.
    #[inline]
    pub fn kind(&self) -> &'static str {
        self.into()
    }

    /// String-like payload of tokens, strings and asset paths.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(str) | Value::Token(str) | Value::AssetPath(str) => Some(str.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Scalar of any floating point width as `f32`.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Half(value) => Some(value.to_f32()),
            Value::Float(value) => Some(*value),
            Value::Double(value) => Some(*value as f32),
            _ => None,
        }
    }

    /// 3-component vector of any width as `DVec3`.
    pub fn as_dvec3(&self) -> Option<DVec3> {
        match self {
            Value::Vec3d(vec) => Some(*vec),
            Value::Vec3f(vec) => Some(vec.as_dvec3()),
            Value::Vec3h(vec) => Some(DVec3::from_array(vec.map(f64::from))),
            Value::Vec3i(vec) => Some(vec.as_dvec3()),
            _ => None,
        }
    }

    pub fn as_int_slice(&self) -> Option<&[i32]> {
        match self {
            Value::IntArray(vec) => Some(vec.as_slice()),
            _ => None,
        }
    }

    pub fn as_vec3f_slice(&self) -> Option<&[Vec3]> {
        match self {
            Value::Vec3fArray(vec) => Some(vec.as_slice()),
            _ => None,
        }
    }

    pub fn as_vec2f_slice(&self) -> Option<&[Vec2]> {
        match self {
            Value::Vec2fArray(vec) => Some(vec.as_slice()),
            _ => None,
        }
    }

    /// Any list of strings: token arrays, token vectors, path vectors or a single string.
    pub fn to_string_list(&self) -> Vec<String> {
        match self {
            Value::String(str) | Value::Token(str) | Value::AssetPath(str) => vec![str.clone()],
            Value::TokenArray(vec) | Value::AssetPathArray(vec) | Value::TokenVector(vec) => vec.clone(),
            Value::PathVector(paths) => paths.iter().map(|path| path.to_string()).collect(),
            _ => Vec::new(),
        }
    }
}
