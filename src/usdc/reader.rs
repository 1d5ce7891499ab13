//! Various `io::Read` extensions to simplify reading crate files.

use std::{any::type_name, io, io::Read, mem::size_of};

use anyhow::{ensure, Result};
use bytemuck::{bytes_of_mut, pod_collect_to_vec, Pod};

use super::{
    coding::{self, Int},
    compress, Error,
};

pub trait CrateReader {
    /// Read a single "size" or "count" value encoded as `u64`.
    fn read_count(&mut self) -> Result<usize>;

    fn read_pod<T: Pod>(&mut self) -> Result<T>;

    /// Read exactly `count` plain elements.
    fn read_array<T: Pod>(&mut self, count: usize) -> Result<Vec<T>>;

    /// Read a `u64` count followed by that many plain elements.
    fn read_vec<T: Pod>(&mut self) -> Result<Vec<T>> {
        let count = self.read_count()?;
        self.read_array(count)
    }

    /// Read `size` raw bytes.
    fn read_bytes(&mut self, size: usize) -> Result<Vec<u8>>;

    /// Reads lz4 compressed data and returns decompressed raw bytes.
    ///
    /// # Format:
    /// - u64 compressed size
    /// - compressed block(s) of data.
    ///
    /// `capacity` is the largest size the uncompressed data may have.
    fn read_compressed(&mut self, capacity: usize) -> Result<Vec<u8>> {
        let compressed_size = self.read_count()?;

        ensure!(
            compressed_size <= compress::compressed_buffer_size(capacity).max(1),
            Error::format(format!(
                "Compressed block of {} bytes can't hold at most {} bytes",
                compressed_size, capacity
            ))
        );

        let input = self.read_bytes(compressed_size)?;

        // LZ4 can't expand input by more than ~255x.
        let capacity = capacity.min(input.len().saturating_mul(255).saturating_add(16));
        compress::decompress_bounded(&input, capacity)
    }

    /// Reads a compressed sequence of exactly `count` integers.
    fn read_encoded_ints<T: Int>(&mut self, count: usize) -> Result<Vec<T>> {
        let buffer = self.read_compressed(coding::encoded_buffer_size::<T>(count))?;
        let ints = coding::decode::<T>(&buffer, count)?;

        ensure!(
            ints.len() == count,
            Error::format(format!("Expected {} integers, decoded {}", count, ints.len()))
        );

        Ok(ints)
    }
}

impl<R: io::Read> CrateReader for R {
    fn read_count(&mut self) -> Result<usize> {
        let count = self.read_pod::<u64>()?;
        Ok(count as usize)
    }

    fn read_pod<T: Pod>(&mut self) -> Result<T> {
        let mut object = T::zeroed();

        self.read_exact(bytes_of_mut(&mut object))
            .map_err(|err| Error::truncated(type_name::<T>(), err))?;

        Ok(object)
    }

    fn read_array<T: Pod>(&mut self, count: usize) -> Result<Vec<T>> {
        let size = count.checked_mul(size_of::<T>()).ok_or_else(|| {
            Error::format(format!("Array of {count} x {} is too large", type_name::<T>()))
        })?;

        let buffer = self.read_bytes(size)?;
        Ok(pod_collect_to_vec(&buffer))
    }

    fn read_bytes(&mut self, size: usize) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.by_ref().take(size as u64).read_to_end(&mut buffer)?;

        ensure!(
            buffer.len() == size,
            Error::truncated(
                format!("{size} bytes"),
                io::Error::from(io::ErrorKind::UnexpectedEof)
            )
        );

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usdc::testing;

    #[test]
    fn test_read_pod_truncated() {
        let mut data: &[u8] = &[1, 2, 3];
        let err = data.read_pod::<u32>().unwrap_err();

        let err = err.downcast_ref::<Error>().unwrap();
        assert!(matches!(err, Error::Truncated { .. }));
    }

    #[test]
    fn test_read_vec() {
        let mut data = Vec::new();
        data.extend_from_slice(&3_u64.to_le_bytes());
        for value in [10_u32, 20, 30] {
            data.extend_from_slice(&value.to_le_bytes());
        }

        let mut cursor = io::Cursor::new(data);
        assert_eq!(cursor.read_vec::<u32>().unwrap(), vec![10, 20, 30]);
    }

    #[test]
    fn test_read_encoded_ints() {
        let values = [0, 3, 3, 3, -7, 1_000_000, 12, 12, 13];

        let mut data = Vec::new();
        testing::write_compressed(&mut data, &testing::encode_ints(&values));

        let mut cursor = io::Cursor::new(data);
        let ints = cursor.read_encoded_ints::<i32>(values.len()).unwrap();

        assert_eq!(ints, values);
    }

    #[test]
    fn test_read_encoded_ints_count_mismatch() {
        let mut data = Vec::new();
        testing::write_compressed(&mut data, &testing::encode_ints(&[1, 2, 3]));

        // Declared count larger than what the stream holds.
        let mut cursor = io::Cursor::new(data);
        assert!(cursor.read_encoded_ints::<i32>(40).is_err());
    }
}
