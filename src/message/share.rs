//! Serialization of Shamir shares.
//!
//! See the [message module] documentation since this is a private module
//! anyways.
//!
//! [message module]: crate::message

use std::io::{Cursor, Write};

use anyhow::{anyhow, Context};

use crate::{
    field::FieldElement,
    message::{
        traits::{read_slice, read_u32, FromBytes, ToBytes},
        DecodeError,
    },
    sharing::ShamirShare,
};

/// `[u32 index][u32 value_len]` precede the value bytes.
const HEADER_LENGTH: usize = 8;

impl ToBytes for ShamirShare {
    fn buffer_length(&self) -> usize {
        HEADER_LENGTH + FieldElement::LENGTH
    }

    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T) {
        let mut writer = Cursor::new(buffer.as_mut());
        // UNWRAP_SAFE: the buffer is large enough per buffer_length()
        writer.write_all(&self.index.to_be_bytes()).unwrap();
        writer
            .write_all(&(FieldElement::LENGTH as u32).to_be_bytes())
            .unwrap();
        writer.write_all(&self.value.to_bytes()).unwrap();
    }
}

impl ShamirShare {
    /// Parses one share at `*offset`, advancing the offset past it.
    pub(crate) fn parse(bytes: &[u8], offset: &mut usize) -> Result<Self, DecodeError> {
        let index = read_u32(bytes, offset).context("invalid share index field")?;
        let value_len = read_u32(bytes, offset).context("invalid share value length field")? as usize;
        if value_len != FieldElement::LENGTH {
            return Err(anyhow!(
                "invalid share value length: {} (expected {})",
                value_len,
                FieldElement::LENGTH
            ));
        }
        let value_bytes = read_slice(bytes, offset, value_len).context("truncated share value")?;
        let value = FieldElement::from_bytes(value_bytes)
            .ok_or_else(|| anyhow!("share value is not a canonical field element"))?;
        Ok(ShamirShare { index, value })
    }
}

impl FromBytes for ShamirShare {
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        let bytes = buffer.as_ref();
        let mut offset = 0;
        let share = Self::parse(bytes, &mut offset).context("invalid share")?;
        if offset != bytes.len() {
            return Err(anyhow!("invalid share: trailing bytes"));
        }
        Ok(share)
    }
}
