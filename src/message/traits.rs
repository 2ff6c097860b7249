//! Serialization interfaces for the wire formats.

use std::convert::TryInto;

use anyhow::anyhow;

use crate::message::DecodeError;

/// An interface for serializable wire types.
///
/// See also [`FromBytes`] for deserialization.
pub trait ToBytes {
    /// The length of the buffer for encoding the type.
    fn buffer_length(&self) -> usize;

    /// Serializes the type into the given buffer.
    ///
    /// # Panics
    /// This method may panic if the given buffer is too small. Thus,
    /// [`buffer_length()`] must be called prior to calling this, and a large
    /// enough buffer must be provided.
    ///
    /// [`buffer_length()`]: ToBytes::buffer_length
    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T);

    /// Serializes the type into a freshly allocated buffer.
    fn to_vec(&self) -> Vec<u8> {
        let mut buffer = vec![0_u8; self.buffer_length()];
        self.to_bytes(&mut buffer);
        buffer
    }
}

/// An interface for deserializable wire types.
///
/// See also [`ToBytes`] for serialization.
pub trait FromBytes: Sized {
    /// Deserializes the type from the given buffer.
    ///
    /// # Errors
    /// Fails on truncated, trailing or otherwise invalid wire data.
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError>;
}

/// Reads a big-endian `u32` at `*offset`, advancing the offset.
pub(crate) fn read_u32(bytes: &[u8], offset: &mut usize) -> Result<u32, DecodeError> {
    let slice = read_slice(bytes, offset, 4)?;
    // UNWRAP_SAFE: the slice is exactly 4 bytes long
    Ok(u32::from_be_bytes(slice.try_into().unwrap()))
}

/// Reads `len` bytes at `*offset`, advancing the offset.
pub(crate) fn read_slice<'a>(
    bytes: &'a [u8],
    offset: &mut usize,
    len: usize,
) -> Result<&'a [u8], DecodeError> {
    let end = offset
        .checked_add(len)
        .ok_or_else(|| anyhow!("length overflow"))?;
    let slice = bytes
        .get(*offset..end)
        .ok_or_else(|| anyhow!("buffer exhausted: need {} bytes at offset {}", len, offset))?;
    *offset = end;
    Ok(slice)
}
