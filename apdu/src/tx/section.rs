// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::{DecodeOwned, Encode};
use ledger_proto::ApduStatic;

use super::sign_tx_apdu;
use crate::{helpers::be, ApduError, Instruction, SignTxStep, FIO_APDU_CLA, P2_UNUSED};

/// Open a counted section, declaring the total body length of the fields it contains.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            LENGTH                             |
/// |                         (u64, 8-byte BE)                      |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   TERMINATOR  |
/// +-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct TxStartSection {
    /// Declared section length in bytes
    pub length: u64,
}

sign_tx_apdu!(TxStartSection, StartCountedSection);

impl TxStartSection {
    /// Create a new [`TxStartSection`] request
    pub fn new(length: u64) -> Self {
        Self { length }
    }
}

impl Encode for TxStartSection {
    type Error = ApduError;

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 9 {
            return Err(ApduError::InvalidLength);
        }

        let mut index = be::enc_u64(self.length, buff)?;
        buff[index] = 0;
        index += 1;

        Ok(index)
    }

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(9)
    }
}

impl DecodeOwned for TxStartSection {
    type Output = Self;
    type Error = ApduError;

    fn decode_owned(buff: &[u8]) -> Result<(Self, usize), ApduError> {
        let (length, mut index) = be::dec_u64(buff)?;

        match buff.get(index) {
            Some(0) => index += 1,
            Some(_) => return Err(ApduError::InvalidEncoding),
            None => return Err(ApduError::InvalidLength),
        }

        Ok((Self { length }, index))
    }
}
