//! Field value unpacking.
//!
//! A [ValueRep] either carries the value in its 6 payload bytes (inlined) or
//! points to the file offset where the value is stored.

use std::io;

use anyhow::{ensure, Result};
use bytemuck::Pod;
use glam::{
    dvec2, dvec3, dvec4, ivec2, ivec3, ivec4, vec2, vec3, vec4, DMat2, DMat3, DMat4, DQuat, DVec2, DVec3, DVec4, IVec2, IVec3,
    IVec4, Quat, Vec2, Vec3, Vec4,
};
use half::f16;
use tracing::trace;

use crate::sdf::{self, Value};

use super::{coding::Int, CrateFile, CrateReader, Error, Type, ValueRep};

/// Arrays shorter than this are stored raw even when flagged as compressed.
const MIN_COMPRESSED_ARRAY_SIZE: usize = 16;

/// Compressed floating point array holding integer-coded values.
const CODE_INTS: u8 = b'i';
/// Compressed floating point array holding a lookup table and integer-coded indices.
const CODE_LUT: u8 = b't';

impl<R: io::Read + io::Seek> CrateFile<R> {
    /// Decode a field value.
    pub fn value(&mut self, rep: ValueRep) -> Result<Value> {
        let ty = rep.ty()?;
        ensure!(ty != Type::Invalid, Error::format("Invalid value type"));

        let value = if rep.is_inlined() {
            ensure!(
                !rep.is_array() && !rep.is_compressed(),
                Error::unsupported(format!("Inlined {} value can't be an array or compressed: {:?}", ty, rep))
            );

            self.inlined_value(ty, rep.payload())?
        } else if rep.is_array() {
            // Empty arrays have no payload.
            if rep.payload() == 0 {
                return Ok(empty_array(ty));
            }

            self.set_position(rep.payload())?;
            self.array_value(ty, rep.is_compressed())?
        } else {
            ensure!(
                !rep.is_compressed(),
                Error::unsupported(format!("Scalar {} value can't be compressed: {:?}", ty, rep))
            );

            self.set_position(rep.payload())?;
            self.scalar_value(ty)?
        };

        trace!("{:?} => {}", rep, value.kind());

        Ok(value)
    }

    fn inlined_value(&self, ty: Type, payload: u64) -> Result<Value> {
        let bits = payload as u32;

        // Small vectors and matrices are packed as signed bytes.
        let bytes = payload.to_le_bytes().map(|b| b as i8);
        let byte = |i: usize| bytes[i] as f32;
        let byte_d = |i: usize| bytes[i] as f64;

        let value = match ty {
            Type::Bool => Value::Bool(payload != 0),
            Type::Uchar => Value::Uchar(payload as u8),
            Type::Int => Value::Int(bits as i32),
            Type::Uint => Value::Uint(bits),
            Type::Int64 => Value::Int64(bits as i32 as i64),
            Type::Uint64 => Value::Uint64(bits as u64),
            Type::Half => Value::Half(f16::from_bits(payload as u16)),
            Type::Float => Value::Float(f32::from_bits(bits)),
            // Stored as float.
            Type::Double => Value::Double(f32::from_bits(bits) as f64),

            Type::Token => Value::Token(self.token(bits as usize)?.to_string()),
            Type::AssetPath => Value::AssetPath(self.token(bits as usize)?.to_string()),
            Type::String => Value::String(self.string(bits as usize)?),

            Type::Specifier => Value::Specifier(
                sdf::Specifier::from_repr(bits as i32)
                    .ok_or_else(|| Error::format(format!("Unable to parse SDF specifier: {}", bits)))?,
            ),
            Type::Permission => Value::Permission(
                sdf::Permission::from_repr(bits as i32)
                    .ok_or_else(|| Error::format(format!("Unable to parse permission: {}", bits)))?,
            ),
            Type::Variability => Value::Variability(
                sdf::Variability::from_repr(bits as i32)
                    .ok_or_else(|| Error::format(format!("Unable to parse variability: {}", bits)))?,
            ),

            Type::Vec2f => Value::Vec2f(vec2(byte(0), byte(1))),
            Type::Vec2d => Value::Vec2d(dvec2(byte_d(0), byte_d(1))),
            Type::Vec2i => Value::Vec2i(ivec2(bytes[0] as i32, bytes[1] as i32)),
            Type::Vec3f => Value::Vec3f(vec3(byte(0), byte(1), byte(2))),
            Type::Vec3d => Value::Vec3d(dvec3(byte_d(0), byte_d(1), byte_d(2))),
            Type::Vec3h => Value::Vec3h([0, 1, 2].map(|i| f16::from_f32(byte(i)))),
            Type::Vec3i => Value::Vec3i(ivec3(bytes[0] as i32, bytes[1] as i32, bytes[2] as i32)),
            Type::Vec4f => Value::Vec4f(vec4(byte(0), byte(1), byte(2), byte(3))),
            Type::Vec4d => Value::Vec4d(dvec4(byte_d(0), byte_d(1), byte_d(2), byte_d(3))),
            Type::Vec4i => Value::Vec4i(ivec4(
                bytes[0] as i32,
                bytes[1] as i32,
                bytes[2] as i32,
                bytes[3] as i32,
            )),

            // Only the diagonal is stored.
            Type::Matrix2d => Value::Matrix2d(DMat2::from_diagonal(dvec2(byte_d(0), byte_d(1)))),
            Type::Matrix3d => Value::Matrix3d(DMat3::from_diagonal(dvec3(byte_d(0), byte_d(1), byte_d(2)))),
            Type::Matrix4d => Value::Matrix4d(DMat4::from_diagonal(dvec4(
                byte_d(0),
                byte_d(1),
                byte_d(2),
                byte_d(3),
            ))),

            _ => Value::Opaque(ty.to_string()),
        };

        Ok(value)
    }

    fn scalar_value(&mut self, ty: Type) -> Result<Value> {
        let value = match ty {
            Type::Bool => Value::Bool(self.reader.read_pod::<u8>()? != 0),
            Type::Uchar => Value::Uchar(self.reader.read_pod()?),
            Type::Int => Value::Int(self.reader.read_pod()?),
            Type::Uint => Value::Uint(self.reader.read_pod()?),
            Type::Int64 => Value::Int64(self.reader.read_pod()?),
            Type::Uint64 => Value::Uint64(self.reader.read_pod()?),
            Type::Half => Value::Half(self.reader.read_pod()?),
            Type::Float => Value::Float(self.reader.read_pod()?),
            Type::Double => Value::Double(self.reader.read_pod()?),

            Type::Token => {
                let index = self.reader.read_pod::<u32>()?;
                Value::Token(self.token(index as usize)?.to_string())
            }
            Type::AssetPath => {
                let index = self.reader.read_pod::<u32>()?;
                Value::AssetPath(self.token(index as usize)?.to_string())
            }
            Type::String => {
                let index = self.reader.read_pod::<u32>()?;
                Value::String(self.string(index as usize)?)
            }

            Type::Vec2f => Value::Vec2f(Vec2::from_array(self.reader.read_pod()?)),
            Type::Vec2d => Value::Vec2d(DVec2::from_array(self.reader.read_pod()?)),
            Type::Vec2i => Value::Vec2i(IVec2::from_array(self.reader.read_pod()?)),
            Type::Vec3f => Value::Vec3f(Vec3::from_array(self.reader.read_pod()?)),
            Type::Vec3d => Value::Vec3d(DVec3::from_array(self.reader.read_pod()?)),
            Type::Vec3h => Value::Vec3h(self.reader.read_pod()?),
            Type::Vec3i => Value::Vec3i(IVec3::from_array(self.reader.read_pod()?)),
            Type::Vec4f => Value::Vec4f(Vec4::from_array(self.reader.read_pod()?)),
            Type::Vec4d => Value::Vec4d(DVec4::from_array(self.reader.read_pod()?)),
            Type::Vec4i => Value::Vec4i(IVec4::from_array(self.reader.read_pod()?)),

            // Imaginary part first, real part last.
            Type::Quatf => Value::Quatf(Quat::from_array(self.reader.read_pod()?)),
            Type::Quatd => Value::Quatd(DQuat::from_array(self.reader.read_pod()?)),

            Type::Matrix2d => Value::Matrix2d(DMat2::from_cols_array(&self.reader.read_pod()?)),
            Type::Matrix3d => Value::Matrix3d(DMat3::from_cols_array(&self.reader.read_pod()?)),
            Type::Matrix4d => Value::Matrix4d(DMat4::from_cols_array(&self.reader.read_pod()?)),

            Type::TokenVector => {
                let indices = self.reader.read_vec::<u32>()?;
                Value::TokenVector(self.tokens_at(&indices)?)
            }
            Type::PathVector => {
                let indices = self.reader.read_vec::<u32>()?;
                let paths = indices
                    .iter()
                    .map(|index| {
                        self.paths.get(*index as usize).cloned().ok_or_else(|| {
                            Error::format(format!("Path index {} is out of range ({})", index, self.paths.len()))
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                Value::PathVector(paths)
            }

            _ => Value::Opaque(ty.to_string()),
        };

        Ok(value)
    }

    fn array_value(&mut self, ty: Type, compressed: bool) -> Result<Value> {
        let value = match ty {
            Type::Int => Value::IntArray(self.read_numeric_array::<i32, i32>(compressed, false, |v| v)?),
            Type::Uint => Value::UintArray(self.read_numeric_array::<u32, i32>(compressed, false, |v| v as u32)?),
            Type::Int64 => Value::Int64Array(self.read_numeric_array::<i64, i64>(compressed, false, |v| v)?),
            Type::Uint64 => Value::Uint64Array(self.read_numeric_array::<u64, i64>(compressed, false, |v| v as u64)?),
            Type::Half => Value::HalfArray(self.read_numeric_array::<f16, i32>(compressed, true, |v| {
                f16::from_f32(v as f32)
            })?),
            Type::Float => Value::FloatArray(self.read_numeric_array::<f32, i32>(compressed, true, |v| v as f32)?),
            Type::Double => Value::DoubleArray(self.read_numeric_array::<f64, i32>(compressed, true, |v| v as f64)?),

            Type::Token | Type::AssetPath => {
                ensure_raw(ty, compressed)?;

                let indices = self.reader.read_vec::<u32>()?;
                let tokens = self.tokens_at(&indices)?;

                if ty == Type::Token {
                    Value::TokenArray(tokens)
                } else {
                    Value::AssetPathArray(tokens)
                }
            }

            Type::Vec2f => Value::Vec2fArray(self.read_raw_array::<[f32; 2], _>(ty, compressed, Vec2::from_array)?),
            Type::Vec3f => Value::Vec3fArray(self.read_raw_array::<[f32; 3], _>(ty, compressed, Vec3::from_array)?),
            Type::Vec3d => Value::Vec3dArray(self.read_raw_array::<[f64; 3], _>(ty, compressed, DVec3::from_array)?),
            Type::Vec3h => Value::Vec3hArray(self.read_raw_array::<[f16; 3], _>(ty, compressed, |v| v)?),
            Type::Vec3i => Value::Vec3iArray(self.read_raw_array::<[i32; 3], _>(ty, compressed, IVec3::from_array)?),
            Type::Vec4f => Value::Vec4fArray(self.read_raw_array::<[f32; 4], _>(ty, compressed, Vec4::from_array)?),
            Type::Matrix4d => Value::Matrix4dArray(self.read_raw_array::<[f64; 16], _>(ty, compressed, |m| {
                DMat4::from_cols_array(&m)
            })?),

            _ => Value::Opaque(format!("{ty}[]")),
        };

        Ok(value)
    }

    /// Array length prefix, its width depends on the file version.
    fn read_array_len(&mut self) -> Result<usize> {
        if self.version().has_32bit_array_sizes() {
            Ok(self.reader.read_pod::<u32>()? as usize)
        } else {
            self.reader.read_count()
        }
    }

    /// `u64` count followed by plain elements.
    fn read_raw_array<T: Pod, V>(&mut self, ty: Type, compressed: bool, map: impl Fn(T) -> V) -> Result<Vec<V>> {
        ensure_raw(ty, compressed)?;

        let elements = self.reader.read_vec::<T>()?;
        Ok(elements.into_iter().map(map).collect())
    }

    /// Numeric array: raw, integer-coded or lookup table coded.
    ///
    /// Integer arrays carry integer-coded data right after the length. Floating
    /// point arrays store a code byte first (`i` or `t`).
    fn read_numeric_array<T: Pod, I: Int>(
        &mut self,
        compressed: bool,
        coded: bool,
        from_int: impl Fn(I) -> T,
    ) -> Result<Vec<T>> {
        let count = self.read_array_len()?;

        if !compressed || count < MIN_COMPRESSED_ARRAY_SIZE {
            return self.reader.read_array::<T>(count);
        }

        if !coded {
            let ints = self.reader.read_encoded_ints::<I>(count)?;
            return Ok(ints.into_iter().map(from_int).collect());
        }

        let code = self.reader.read_pod::<u8>()?;

        match code {
            CODE_INTS => {
                let ints = self.reader.read_encoded_ints::<I>(count)?;
                Ok(ints.into_iter().map(from_int).collect())
            }
            CODE_LUT => {
                let lut_size = self.reader.read_pod::<u32>()? as usize;
                let lut = self.reader.read_array::<T>(lut_size)?;
                let indices = self.reader.read_encoded_ints::<i32>(count)?;

                indices
                    .into_iter()
                    .map(|index| {
                        usize::try_from(index)
                            .ok()
                            .and_then(|index| lut.get(index))
                            .copied()
                            .ok_or_else(|| {
                                anyhow::Error::from(Error::format(format!(
                                    "Lookup table index {} is out of range ({})",
                                    index,
                                    lut.len()
                                )))
                            })
                    })
                    .collect()
            }
            code => Err(Error::format(format!("Unknown array compression code {code:#x}")).into()),
        }
    }

    /// Resolve a string index through the STRINGS table.
    fn string(&self, index: usize) -> Result<String> {
        let token = self.strings.get(index).copied().ok_or_else(|| {
            Error::format(format!("String index {} is out of range ({})", index, self.strings.len()))
        })?;

        Ok(self.token(token)?.to_string())
    }

    fn tokens_at(&self, indices: &[u32]) -> Result<Vec<String>> {
        indices
            .iter()
            .map(|index| self.token(*index as usize).map(str::to_string))
            .collect()
    }
}

fn empty_array(ty: Type) -> Value {
    match ty {
        Type::Int => Value::IntArray(Vec::new()),
        Type::Uint => Value::UintArray(Vec::new()),
        Type::Int64 => Value::Int64Array(Vec::new()),
        Type::Uint64 => Value::Uint64Array(Vec::new()),
        Type::Half => Value::HalfArray(Vec::new()),
        Type::Float => Value::FloatArray(Vec::new()),
        Type::Double => Value::DoubleArray(Vec::new()),
        Type::Token => Value::TokenArray(Vec::new()),
        Type::AssetPath => Value::AssetPathArray(Vec::new()),
        Type::Vec2f => Value::Vec2fArray(Vec::new()),
        Type::Vec3f => Value::Vec3fArray(Vec::new()),
        Type::Vec3d => Value::Vec3dArray(Vec::new()),
        Type::Vec3h => Value::Vec3hArray(Vec::new()),
        Type::Vec3i => Value::Vec3iArray(Vec::new()),
        Type::Vec4f => Value::Vec4fArray(Vec::new()),
        Type::Matrix4d => Value::Matrix4dArray(Vec::new()),
        _ => Value::Opaque(format!("{ty}[]")),
    }
}

fn ensure_raw(ty: Type, compressed: bool) -> Result<()> {
    ensure!(
        !compressed,
        Error::unsupported(format!("{ty} arrays can't be compressed"))
    );

    Ok(())
}
