//! LZ4 block decompression as used by crate files.
//!
//! A compressed buffer starts with a chunk count byte. Zero means a single LZ4
//! block follows. Otherwise each chunk is prefixed by its `i32` compressed size.
//!
//! See <https://github.com/PixarAnimationStudios/OpenUSD/blob/0b18ad3f840c24eb25e16b795a5b0821cf05126e/pxr/base/tf/fastCompression.cpp#L108>

use anyhow::{ensure, Context, Result};

use super::{CrateReader, Error};

/// Largest input a single LZ4 block can hold.
pub const MAX_INPUT_SIZE: usize = 0x7E00_0000;

/// Largest input the chunked format can hold.
pub const MAX_CHUNKED_INPUT_SIZE: usize = 127 * MAX_INPUT_SIZE;

/// Worst case LZ4 block size for `size` input bytes, 0 when a single block can't hold it.
#[inline]
pub fn compress_bound(size: usize) -> usize {
    if size > MAX_INPUT_SIZE {
        0
    } else {
        size + size / 255 + 16
    }
}

/// Worst case size of a compressed buffer (chunk header included) for `input_size` bytes.
pub fn compressed_buffer_size(input_size: usize) -> usize {
    if input_size > MAX_CHUNKED_INPUT_SIZE {
        return 0;
    }

    if input_size <= MAX_INPUT_SIZE {
        return compress_bound(input_size) + 1;
    }

    let whole_chunks = input_size / MAX_INPUT_SIZE;
    let part_chunk = input_size % MAX_INPUT_SIZE;

    let mut size = 1 + whole_chunks * (compress_bound(MAX_INPUT_SIZE) + 4);
    if part_chunk > 0 {
        size += compress_bound(part_chunk) + 4;
    }

    size
}

/// Decompress into a buffer of at most `capacity` bytes, returning what was produced.
pub fn decompress_bounded(input: &[u8], capacity: usize) -> Result<Vec<u8>> {
    if capacity == 0 {
        return Ok(Vec::new());
    }

    let mut output = vec![0_u8; capacity];
    let size = decompress_into(input, &mut output)?;
    output.truncate(size);

    Ok(output)
}

/// Decompress to exactly `expected_size` bytes.
pub fn decompress(input: &[u8], expected_size: usize) -> Result<Vec<u8>> {
    let output = decompress_bounded(input, expected_size)?;

    ensure!(
        output.len() == expected_size,
        Error::format(format!(
            "Decompressed size mismatch (expected {}, got {})",
            expected_size,
            output.len()
        ))
    );

    Ok(output)
}

fn decompress_into(mut input: &[u8], output: &mut [u8]) -> Result<usize> {
    let chunks = input
        .read_pod::<u8>()
        .context("Unable to read lz4 chunk count")? as usize;

    if chunks == 0 {
        return lz4_flex::decompress_into(input, output)
            .map_err(|err| Error::format(format!("Failed to decompress data, possibly corrupt? {err}")).into());
    }

    let mut written = 0;

    for index in 0..chunks {
        let chunk_size = input
            .read_pod::<i32>()
            .with_context(|| format!("Unable to read lz4 chunk {index} size"))?;

        ensure!(
            chunk_size >= 0 && chunk_size as usize <= input.len(),
            Error::format(format!("Invalid lz4 chunk {index} size: {chunk_size}"))
        );

        let (chunk, rest) = input.split_at(chunk_size as usize);
        input = rest;

        written += lz4_flex::decompress_into(chunk, &mut output[written..])
            .map_err(|err| Error::format(format!("Failed to decompress lz4 chunk {index}: {err}")))?;
    }

    Ok(written)
}
