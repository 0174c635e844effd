// Copyright (c) 2022-2023 The MobileCoin Foundation

//! BIP-0032 derivation paths

use core::fmt::{Display, Formatter};

use byteorder::{BigEndian, ByteOrder};
use encdec::{DecodeOwned, Encode};
use heapless::Vec;

use crate::ApduError;

/// Hardened derivation flag
pub const HARDENED: u32 = 0x8000_0000;

/// Maximum BIP-0032 path depth
pub const MAX_PATH_DEPTH: usize = 10;

/// Harden a path component
pub const fn h(i: u32) -> u32 {
    i | HARDENED
}

/// BIP-0032 derivation path of 1..=[`MAX_PATH_DEPTH`] components
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     DEPTH     |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /                 COMPONENTS (DEPTH x u32, BE)                  /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct Bip32Path(Vec<u32, MAX_PATH_DEPTH>);

impl Bip32Path {
    /// Create a path from components, `None` if depth is out of range
    pub fn new(components: &[u32]) -> Option<Self> {
        if components.is_empty() {
            return None;
        }

        Vec::from_slice(components).ok().map(Self)
    }

    /// FIO account path `m/44'/235'/account'/0/index`
    pub fn fio(account: u32, index: u32) -> Self {
        let mut v = Vec::new();
        for c in [h(44), h(235), h(account), 0, index] {
            // Fixed depth of 5 < MAX_PATH_DEPTH
            let _ = v.push(c);
        }
        Self(v)
    }

    /// Fetch path components
    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Length of the wire encoding (`1 + 4 * depth`)
    pub fn wire_len(&self) -> usize {
        1 + 4 * self.0.len()
    }
}

impl AsRef<[u32]> for Bip32Path {
    fn as_ref(&self) -> &[u32] {
        &self.0
    }
}

impl Display for Bip32Path {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "m")?;
        for c in self.0.iter() {
            match c & HARDENED != 0 {
                true => write!(f, "/{}'", c & !HARDENED)?,
                false => write!(f, "/{c}")?,
            }
        }
        Ok(())
    }
}

impl Encode for Bip32Path {
    type Error = ApduError;

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let n = self.wire_len();
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        buff[0] = self.0.len() as u8;
        for (i, c) in self.0.iter().enumerate() {
            BigEndian::write_u32(&mut buff[1 + i * 4..], *c);
        }

        Ok(n)
    }

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(self.wire_len())
    }
}

impl DecodeOwned for Bip32Path {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        let depth = *buff.first().ok_or(ApduError::InvalidLength)? as usize;
        if depth == 0 || depth > MAX_PATH_DEPTH {
            return Err(ApduError::InvalidEncoding);
        }

        let n = 1 + 4 * depth;
        if buff.len() < n {
            return Err(ApduError::InvalidLength);
        }

        let mut v = Vec::new();
        for c in buff[1..n].chunks_exact(4) {
            v.push(BigEndian::read_u32(c))
                .map_err(|_| ApduError::InvalidLength)?;
        }

        Ok((Self(v), n))
    }
}
