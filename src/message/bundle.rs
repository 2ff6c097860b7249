//! Serialization of share bundles, unmask responses and the SecAgg+
//! pre-seal share pair.
//!
//! See the [message module] documentation since this is a private module
//! anyways.
//!
//! [message module]: crate::message

use std::io::{Cursor, Write};

use anyhow::{anyhow, Context};

use crate::{
    message::{
        traits::{read_u32, FromBytes, ToBytes},
        DecodeError,
    },
    sharing::ShamirShare,
};

/// The smallest possible encoding of one share, used to bound decoded counts.
const MIN_SHARE_LENGTH: usize = 8;

/// The per-participant share lists produced by one sharing run, in
/// participant order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareBundle(pub Vec<Vec<ShamirShare>>);

impl ToBytes for ShareBundle {
    fn buffer_length(&self) -> usize {
        4 + self
            .0
            .iter()
            .map(|list| 4 + list.iter().map(ToBytes::buffer_length).sum::<usize>())
            .sum::<usize>()
    }

    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T) {
        let mut writer = Cursor::new(buffer.as_mut());
        // UNWRAP_SAFE: the buffer is large enough per buffer_length()
        writer
            .write_all(&(self.0.len() as u32).to_be_bytes())
            .unwrap();
        for list in &self.0 {
            writer
                .write_all(&(list.len() as u32).to_be_bytes())
                .unwrap();
            for share in list {
                writer.write_all(&share.to_vec()).unwrap();
            }
        }
    }
}

impl FromBytes for ShareBundle {
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        let bytes = buffer.as_ref();
        let mut offset = 0;

        let participant_count =
            read_u32(bytes, &mut offset).context("invalid participant count field")? as usize;
        if participant_count > bytes.len() / 4 {
            return Err(anyhow!(
                "invalid share bundle: participant count {} exceeds buffer capacity",
                participant_count
            ));
        }

        let mut lists = Vec::with_capacity(participant_count);
        for participant in 0..participant_count {
            let share_count = read_u32(bytes, &mut offset)
                .with_context(|| format!("invalid share count field of participant {}", participant))?
                as usize;
            if share_count > bytes.len() / MIN_SHARE_LENGTH {
                return Err(anyhow!(
                    "invalid share bundle: share count {} exceeds buffer capacity",
                    share_count
                ));
            }
            let mut list = Vec::with_capacity(share_count);
            for _ in 0..share_count {
                list.push(ShamirShare::parse(bytes, &mut offset).context("invalid share bundle")?);
            }
            lists.push(list);
        }

        if offset != bytes.len() {
            return Err(anyhow!("invalid share bundle: trailing bytes"));
        }
        Ok(ShareBundle(lists))
    }
}

/// The unmask response of the basic protocol: a survivor count and the
/// responder's own index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnmaskResponse {
    pub survivor_count: u32,
    pub own_index: u32,
}

impl ToBytes for UnmaskResponse {
    fn buffer_length(&self) -> usize {
        8
    }

    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T) {
        let buffer = buffer.as_mut();
        buffer[0..4].copy_from_slice(&self.survivor_count.to_be_bytes());
        buffer[4..8].copy_from_slice(&self.own_index.to_be_bytes());
    }
}

impl FromBytes for UnmaskResponse {
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        let bytes = buffer.as_ref();
        let mut offset = 0;
        let survivor_count =
            read_u32(bytes, &mut offset).context("invalid survivor count field")?;
        let own_index = read_u32(bytes, &mut offset).context("invalid own index field")?;
        if offset != bytes.len() {
            return Err(anyhow!("invalid unmask response: trailing bytes"));
        }
        Ok(UnmaskResponse {
            survivor_count,
            own_index,
        })
    }
}

/// The plaintext a SecAgg+ participant seals for a peer: the peer's share of
/// the self-mask seed and its share of the pairwise-masking secret key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncryptedSharePair {
    pub rd_share: ShamirShare,
    pub sk1_share: ShamirShare,
}

impl ToBytes for EncryptedSharePair {
    fn buffer_length(&self) -> usize {
        4 + self.rd_share.buffer_length() + self.sk1_share.buffer_length()
    }

    fn to_bytes<T: AsMut<[u8]>>(&self, buffer: &mut T) {
        let mut writer = Cursor::new(buffer.as_mut());
        // UNWRAP_SAFE: the buffer is large enough per buffer_length()
        writer
            .write_all(&(self.rd_share.buffer_length() as u32).to_be_bytes())
            .unwrap();
        writer.write_all(&self.rd_share.to_vec()).unwrap();
        writer.write_all(&self.sk1_share.to_vec()).unwrap();
    }
}

impl FromBytes for EncryptedSharePair {
    fn from_bytes<T: AsRef<[u8]>>(buffer: &T) -> Result<Self, DecodeError> {
        let bytes = buffer.as_ref();
        let mut offset = 0;

        let rd_share_len =
            read_u32(bytes, &mut offset).context("invalid seed share length field")? as usize;
        let rd_end = offset
            .checked_add(rd_share_len)
            .filter(|&end| end <= bytes.len())
            .ok_or_else(|| anyhow!("invalid seed share length {}", rd_share_len))?;

        let rd_share = ShamirShare::parse(bytes, &mut offset).context("invalid seed share")?;
        if offset != rd_end {
            return Err(anyhow!(
                "invalid seed share length: expected {}, parsed {}",
                rd_share_len,
                offset - 4
            ));
        }

        let sk1_share = ShamirShare::parse(bytes, &mut offset).context("invalid key share")?;
        if offset != bytes.len() {
            return Err(anyhow!("invalid share pair: trailing bytes"));
        }

        Ok(EncryptedSharePair {
            rd_share,
            sk1_share,
        })
    }
}
