// Copyright (c) 2022-2023 The MobileCoin Foundation

use ledger_proto::ApduError;

/// [Engine][super::Engine] errors, all of which abort the current session
#[derive(Copy, Clone, PartialEq, Debug)]
#[cfg_attr(feature = "thiserror", derive(thiserror::Error))]
#[repr(u8)]
pub enum Error {
    /// Invalid fixed request parameter (`P2`)
    #[cfg_attr(feature = "thiserror", error("invalid request parameter"))]
    RequestParameter = 0x01,

    /// Payload size or encoding mismatch
    #[cfg_attr(feature = "thiserror", error("malformed data"))]
    MalformedData = 0x02,

    /// Section / loop nesting, depth or count violation
    #[cfg_attr(feature = "thiserror", error("invalid protocol state"))]
    ProtocolState = 0x03,

    /// Shape digest not in the template allow-list
    #[cfg_attr(feature = "thiserror", error("untrusted template"))]
    UntrustedTemplate = 0x04,

    /// Unknown step or field encoding
    #[cfg_attr(feature = "thiserror", error("unsupported operation"))]
    UnsupportedOperation = 0x05,

    /// No canonical signature within the retry budget
    #[cfg_attr(feature = "thiserror", error("signing failed"))]
    SigningFailed = 0x06,

    /// Internal invariant violated
    #[cfg_attr(feature = "thiserror", error("internal assertion"))]
    InternalAssertion = 0x07,
}

impl Error {
    /// APDU status word for this error
    pub const fn status_word(&self) -> u16 {
        match self {
            Error::RequestParameter => 0x6e05,
            Error::MalformedData => 0x6e07,
            Error::ProtocolState => 0x6e06,
            Error::UntrustedTemplate => 0x6e08,
            Error::UnsupportedOperation => 0x6e03,
            Error::SigningFailed => 0x6e0c,
            Error::InternalAssertion => 0x4700,
        }
    }
}

/// APDU status word for successful operations
pub const SW_OK: u16 = 0x9000;

impl From<ApduError> for Error {
    fn from(_: ApduError) -> Self {
        Error::MalformedData
    }
}
