// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::{Decode, Encode};
use ledger_proto::ApduStatic;

use super::sign_tx_apdu;
use crate::{
    helpers::*, ApduError, Instruction, SignTxStep, FIO_APDU_CLA, MAX_ALLOWED_HASHES, P2_UNUSED,
};

/// Open a bounded loop.
///
/// `SET_DIGEST` commits to the set of iteration shapes that will be
/// presented with each [`TxEndIteration`] (see [`crate::digest::iteration_set_digest`]).
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      MIN      |      MAX      |                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
/// /                          SET_DIGEST                           /
/// /                          (32-bytes)                           /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxStartFor {
    /// Minimum iteration count
    pub min: u8,

    /// Maximum iteration count
    pub max: u8,

    /// Digest over the allowed iteration hashes
    #[encdec(with = "arr")]
    pub set_digest: [u8; 32],
}

sign_tx_apdu!(TxStartFor, StartFor);

impl TxStartFor {
    /// Create a new [`TxStartFor`] request
    pub fn new(min: u8, max: u8, set_digest: [u8; 32]) -> Self {
        Self {
            min,
            max,
            set_digest,
        }
    }
}

/// Finish a loop iteration, presenting the allowed iteration hashes.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   NUM_HASHES  |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /                 HASHES (NUM_HASHES x 32-bytes)                /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct TxEndIteration<'a> {
    hashes: &'a [u8],
}

sign_tx_apdu!(TxEndIteration<'_>, EndIteration);

impl<'a> TxEndIteration<'a> {
    /// Create a new [`TxEndIteration`] from concatenated 32-byte hashes
    pub fn new(hashes: &'a [u8]) -> Result<Self, ApduError> {
        let n = hashes.len() / 32;
        if hashes.len() % 32 != 0 || n == 0 || n > MAX_ALLOWED_HASHES {
            return Err(ApduError::InvalidLength);
        }

        Ok(Self { hashes })
    }

    /// Number of allowed hashes
    pub fn len(&self) -> usize {
        self.hashes.len() / 32
    }

    /// Always false, at least one hash is required
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Concatenated allowed hashes
    pub fn as_bytes(&self) -> &'a [u8] {
        self.hashes
    }

    /// Iterate over allowed hashes
    pub fn hashes(&self) -> impl Iterator<Item = &'a [u8]> {
        self.hashes.chunks_exact(32)
    }

    /// Check whether `digest` is one of the allowed hashes
    pub fn contains(&self, digest: &[u8; 32]) -> bool {
        self.hashes().any(|h| h == &digest[..])
    }
}

impl<'a> Encode for TxEndIteration<'a> {
    type Error = ApduError;

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let d = self.hashes;

        if buff.len() < d.len() + 1 {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;
        buff[index] = self.len() as u8;
        index += 1;

        buff[index..][..d.len()].copy_from_slice(d);
        index += d.len();

        Ok(index)
    }

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1 + self.hashes.len())
    }
}

impl<'a> Decode<'a> for TxEndIteration<'a> {
    type Output = Self;
    type Error = ApduError;

    fn decode(buff: &'a [u8]) -> Result<(Self, usize), ApduError> {
        let n = *buff.first().ok_or(ApduError::InvalidLength)? as usize;
        if n == 0 || n > MAX_ALLOWED_HASHES {
            return Err(ApduError::InvalidLength);
        }

        let l = 1 + n * 32;
        let hashes = buff.get(1..l).ok_or(ApduError::InvalidLength)?;

        Ok((Self { hashes }, l))
    }
}
