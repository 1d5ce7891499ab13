//! Integer coding.
//!
//! Integers are stored as deltas from the previous value. A 2-bit code per
//! integer says whether the delta is the most common one (stored once up front)
//! or a small, medium or large signed integer that follows in the data area.
//!
//! Layout: `common: Int`, `ceil(count * 2 / 8)` code bytes, then packed deltas.
//!
//! See <https://github.com/PixarAnimationStudios/OpenUSD/blob/0b18ad3f840c24eb25e16b795a5b0821cf05126e/pxr/usd/usd/integerCoding.cpp#L40>

use std::{io, mem};

use anyhow::{bail, ensure, Result};
use bytemuck::Pod;
use num_traits::{PrimInt, WrappingAdd};

use super::{CrateReader, Error};

const COMMON: u8 = 0;
const SMALL: u8 = 1;
const MEDIUM: u8 = 2;
const LARGE: u8 = 3;

/// Integer width supported by the codec.
///
/// 32-bit streams use `i8`/`i16`/`i32` deltas, 64-bit streams use `i16`/`i32`/`i64`.
pub trait Int: PrimInt + WrappingAdd + Pod + Default {
    const SIZE: usize = mem::size_of::<Self>();

    fn read_small(reader: &mut impl io::Read) -> Result<Self>;
    fn read_medium(reader: &mut impl io::Read) -> Result<Self>;
}

impl Int for i32 {
    fn read_small(reader: &mut impl io::Read) -> Result<Self> {
        Ok(reader.read_pod::<i8>()? as i32)
    }

    fn read_medium(reader: &mut impl io::Read) -> Result<Self> {
        Ok(reader.read_pod::<i16>()? as i32)
    }
}

impl Int for i64 {
    fn read_small(reader: &mut impl io::Read) -> Result<Self> {
        Ok(reader.read_pod::<i16>()? as i64)
    }

    fn read_medium(reader: &mut impl io::Read) -> Result<Self> {
        Ok(reader.read_pod::<i32>()? as i64)
    }
}

/// Upper bound of the encoded representation of `count` integers.
///
/// `size_of::<T>() + ceil(count * 2 / 8) + size_of::<T>() * count`, or 0 for no integers.
pub fn encoded_buffer_size<T: PrimInt>(count: usize) -> usize {
    if count == 0 {
        0
    } else {
        let sz = mem::size_of::<T>();
        sz.saturating_add(count.saturating_mul(2).saturating_add(7) / 8)
            .saturating_add(sz.saturating_mul(count))
    }
}

/// Decode exactly `count` integers from an encoded buffer.
pub fn decode<T: Int>(data: &[u8], count: usize) -> Result<Vec<T>> {
    if count == 0 {
        return Ok(Vec::new());
    }

    let num_code_bytes = count.saturating_mul(2).saturating_add(7) / 8;
    let ints_offset = T::SIZE.saturating_add(num_code_bytes);

    ensure!(
        data.len() >= ints_offset,
        Error::format(format!(
            "Integer stream too short: {} bytes for {} integers",
            data.len(),
            count
        ))
    );

    let mut codes_reader = io::Cursor::new(&data[..ints_offset]);
    let mut ints_reader = io::Cursor::new(&data[ints_offset..]);

    let common_value = codes_reader.read_pod::<T>()?;

    let mut prev = T::zero();
    let mut ints_left = count;
    let mut output = Vec::with_capacity(count);

    while ints_left > 0 {
        let n = ints_left.min(4);
        ints_left -= n;

        // Code byte stores integer types for the next 4 integers.
        let code_byte = codes_reader.read_pod::<u8>()?;

        for i in 0..n {
            let delta = match (code_byte >> (2 * i)) & 3 {
                COMMON => common_value,
                SMALL => T::read_small(&mut ints_reader)?,
                MEDIUM => T::read_medium(&mut ints_reader)?,
                LARGE => ints_reader.read_pod::<T>()?,
                ty => bail!("Unexpected integer code: {}", ty),
            };

            prev = prev.wrapping_add(&delta);
            output.push(prev);
        }
    }

    Ok(output)
}

/// Decode 32-bit integers.
#[inline]
pub fn decode32(data: &[u8], count: usize) -> Result<Vec<i32>> {
    decode::<i32>(data, count)
}
