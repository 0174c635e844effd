// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::Encode;
use ledger_proto::ApduStatic;

use crate::{
    is_printable, ApduError, DisplayPolicy, Encoding, Instruction, SignTxStep, FIO_APDU_CLA,
    MAX_BODY_LEN, MAX_HEADER_LEN,
};

/// Stream a single transaction field.
///
/// `P2` carries the [`DisplayPolicy`] for the field, so decoding requires
/// the APDU parameters as well as the payload (see [`TxSendData::decode_with_policy`]).
/// Numeric bodies are big-endian and may omit leading zeros.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |   ENCODING    |  HEADER_LEN   |                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
/// /                 HEADER (printable, <= 32 bytes)               /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |       0       |   BODY_LEN    |                               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+                               +
/// /                      BODY (<= 200 bytes)                      /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |       0       |
/// +-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug)]
pub struct TxSendData<'a> {
    /// Display policy (`P2`)
    pub policy: DisplayPolicy,
    /// Body encoding
    pub encoding: Encoding,
    /// Field header (label)
    pub header: &'a str,
    /// Raw field body
    pub body: &'a [u8],
}

/// `P2` carries the display policy, use [`header`][super::header] for framing
impl<'a> ApduStatic for TxSendData<'a> {
    const CLA: u8 = FIO_APDU_CLA;
    const INS: u8 = Instruction::SignTransaction as u8;

    fn p1(&self) -> u8 {
        SignTxStep::SendData as u8
    }

    fn p2(&self) -> u8 {
        self.policy as u8
    }
}

impl<'a> TxSendData<'a> {
    /// Create a new [`TxSendData`] request
    pub fn new(
        policy: DisplayPolicy,
        encoding: Encoding,
        header: &'a str,
        body: &'a [u8],
    ) -> Self {
        Self {
            policy,
            encoding,
            header,
            body,
        }
    }

    /// Decode a [`TxSendData`] APDU payload with the display policy from `P2`
    pub fn decode_with_policy(
        policy: DisplayPolicy,
        buff: &'a [u8],
    ) -> Result<(Self, usize), ApduError> {
        let mut index = 0;

        // Encoding tag
        let encoding = read_u8(buff, index)?;
        let encoding = Encoding::try_from(encoding).map_err(|_| ApduError::InvalidEncoding)?;
        index += 1;

        // Header, printable and zero terminated
        let header = read_terminated(buff, &mut index, MAX_HEADER_LEN)?;
        if !is_printable(header) {
            return Err(ApduError::InvalidEncoding);
        }
        let header = core::str::from_utf8(header).map_err(|_| ApduError::InvalidEncoding)?;

        // Body, zero terminated
        let body = read_terminated(buff, &mut index, MAX_BODY_LEN)?;
        check_body(encoding, body)?;

        Ok((
            Self {
                policy,
                encoding,
                header,
                body,
            },
            index,
        ))
    }
}

/// Check a body is well formed for the provided encoding
pub fn check_body(encoding: Encoding, body: &[u8]) -> Result<(), ApduError> {
    match encoding.width() {
        Some(w) if body.is_empty() || body.len() > w => Err(ApduError::InvalidLength),
        Some(_) => Ok(()),
        None if encoding == Encoding::String && !is_printable(body) => {
            Err(ApduError::InvalidEncoding)
        }
        None => Ok(()),
    }
}

fn read_u8(buff: &[u8], index: usize) -> Result<u8, ApduError> {
    buff.get(index).copied().ok_or(ApduError::InvalidLength)
}

/// Read a `len | data | 0` block, advancing `index`
fn read_terminated<'a>(
    buff: &'a [u8],
    index: &mut usize,
    max: usize,
) -> Result<&'a [u8], ApduError> {
    let len = read_u8(buff, *index)? as usize;
    if len > max {
        return Err(ApduError::InvalidLength);
    }
    *index += 1;

    let data = buff
        .get(*index..*index + len)
        .ok_or(ApduError::InvalidLength)?;
    *index += len;

    match read_u8(buff, *index)? {
        0 => *index += 1,
        _ => return Err(ApduError::InvalidEncoding),
    }

    Ok(data)
}

impl<'a> Encode for TxSendData<'a> {
    type Error = ApduError;

    fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        let h = self.header.as_bytes();
        let b = self.body;

        if h.len() > MAX_HEADER_LEN || b.len() > MAX_BODY_LEN {
            return Err(ApduError::InvalidLength);
        }
        if buff.len() < self.encode_len()? {
            return Err(ApduError::InvalidLength);
        }

        let mut index = 0;

        buff[index] = self.encoding as u8;
        index += 1;

        for d in [h, b] {
            buff[index] = d.len() as u8;
            index += 1;

            buff[index..][..d.len()].copy_from_slice(d);
            index += d.len();

            buff[index] = 0;
            index += 1;
        }

        Ok(index)
    }

    fn encode_len(&self) -> Result<usize, ApduError> {
        Ok(1 + 2 + self.header.len() + 2 + self.body.len())
    }
}
