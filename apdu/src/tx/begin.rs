// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::{Decode, Encode};
use ledger_proto::ApduStatic;

use super::sign_tx_apdu;
use crate::{
    helpers::*, path::Bip32Path, ApduError, Instruction, SignTxStep, FIO_APDU_CLA, P2_UNUSED,
};

/// Begin a signing session, binding the chain id into the content digest.
///
/// Any session in progress is discarded.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           CHAIN_ID                            |
/// |                          (32-bytes)                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxBegin {
    /// Chain identifier
    #[encdec(with = "arr")]
    pub chain_id: [u8; 32],
}

sign_tx_apdu!(TxBegin, Begin);

impl TxBegin {
    /// Create a new [`TxBegin`] request
    pub fn new(chain_id: [u8; 32]) -> Self {
        Self { chain_id }
    }
}

/// Finish a signing session, requesting a signature with the key at `path`
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
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxEnd {
    /// Derivation path for the signing key
    pub path: Bip32Path,
}

sign_tx_apdu!(TxEnd, End);

impl TxEnd {
    /// Create a new [`TxEnd`] request
    pub fn new(path: Bip32Path) -> Self {
        Self { path }
    }
}

/// Signature response, returned on [`TxEnd`] completion.
///
/// The signature is in compact recoverable form, `31 + recovery_id | r | s`.
///
/// ## Encoding:
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    HEADER     |                                               |
/// +-+-+-+-+-+-+-+-+                                               +
/// /                             R | S                             /
/// /                          (64-bytes)                           /
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        CONTENT_DIGEST                         |
/// |                          (32-bytes)                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxSignature {
    /// Recoverable signature
    #[encdec(with = "arr")]
    pub signature: [u8; 65],

    /// Content digest over which the signature was produced
    #[encdec(with = "arr")]
    pub digest: [u8; 32],
}

impl TxSignature {
    /// Recovery id from signature header
    pub fn recovery_id(&self) -> u8 {
        self.signature[0].wrapping_sub(31)
    }

    /// `r` component of signature
    pub fn r(&self) -> &[u8] {
        &self.signature[1..33]
    }

    /// `s` component of signature
    pub fn s(&self) -> &[u8] {
        &self.signature[33..65]
    }
}
