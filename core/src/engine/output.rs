// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::Encode;

use ledger_proto::ApduError;

use super::Value;
use crate::apdu;

/// [`Engine`][super::Engine] outputs (in response to events), typically encoded to response [APDUs][crate::apdu]
#[derive(Clone, PartialEq, Debug)]
pub enum Output<'a> {
    /// Step accepted, empty response
    None,

    /// Field to be displayed before the (empty) response is sent
    Display { header: &'a str, value: Value<'a> },

    /// Signature and the content digest over which it was produced
    Signature {
        signature: [u8; 65],
        digest: [u8; 32],
    },
}

impl<'a> Output<'a> {
    /// Encode an [`Output`] object to a response [APDU]
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn encode(&self, buff: &mut [u8]) -> Result<usize, ApduError> {
        match self {
            Output::None | Output::Display { .. } => Ok(0),
            Output::Signature { signature, digest } => apdu::tx::TxSignature {
                signature: *signature,
                digest: *digest,
            }
            .encode(buff),
        }
    }

    /// Fetch signature for outputs containing this
    pub fn signature(&self) -> Option<&[u8; 65]> {
        match self {
            Output::Signature { signature, .. } => Some(signature),
            _ => None,
        }
    }

    /// Fetch content digest for outputs containing this
    pub fn digest(&self) -> Option<&[u8; 32]> {
        match self {
            Output::Signature { digest, .. } => Some(digest),
            _ => None,
        }
    }
}
