// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Protocol / APDU definitions for FIO streaming transaction signing
//!
//! Transactions are never sent to the device whole. Instead the host streams a
//! sequence of small commands, each carried by a [`SignTransaction`][Instruction::SignTransaction]
//! APDU with the step selected via `P1` (see [`SignTxStep`]).
//!
//! ```text
//! Begin
//!   SendData*
//!   StartCountedSection ... EndCountedSection
//!   StartFor (StartIteration ... EndIteration)* EndFor
//! End -> signature | content digest
//! ```
//!
//! Multi-byte integers on this wire are big-endian, strings are printable ASCII
//! followed by a terminating zero. See [`tx`] for the per-step encodings.

#![no_std]

use num_enum::TryFromPrimitive;
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

pub use ledger_proto::{ApduError, ApduReq, ApduStatic};

pub mod digest;
pub mod path;
pub mod prelude;
pub mod tx;

mod helpers;

/// FIO APDU Class
pub const FIO_APDU_CLA: u8 = 0xd7;

/// `P2` value for steps that do not use it
pub const P2_UNUSED: u8 = 0x00;

/// Maximum header length for [`TxSendData`][tx::TxSendData] fields
pub const MAX_HEADER_LEN: usize = 32;

/// Maximum body length for [`TxSendData`][tx::TxSendData] fields
pub const MAX_BODY_LEN: usize = 200;

/// Maximum number of allowed iteration hashes per [`TxEndIteration`][tx::TxEndIteration]
/// (`1 + 32 * n` must fit a single APDU payload)
pub const MAX_ALLOWED_HASHES: usize = 7;

/// FIO APDU instruction codes
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(u8)]
pub enum Instruction {
    /// Streamed transaction signing, step selected by `P1`
    SignTransaction = 0x20,
}

/// Signing steps, carried in `P1` of [`Instruction::SignTransaction`] APDUs
#[derive(
    Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum SignTxStep {
    /// Start a new signing session
    Begin = 0x01,
    /// Finalise the session and sign
    End = 0x06,
    /// Stream a single field
    SendData = 0x07,
    /// Open a length-counted section
    StartCountedSection = 0x09,
    /// Close the innermost counted section
    EndCountedSection = 0x0a,
    /// Open a bounded loop
    StartFor = 0x0b,
    /// Close the innermost loop
    EndFor = 0x0c,
    /// Start a loop iteration
    StartIteration = 0x0d,
    /// Finish a loop iteration
    EndIteration = 0x0e,
}

/// Display policy for [`SignTxStep::SendData`], carried in `P2`
#[derive(
    Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum DisplayPolicy {
    /// Show the field to the user before responding
    Display = 0x01,
    /// Respond without showing the field
    Hidden = 0x02,
}

/// Field body encodings
#[derive(
    Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter, TryFromPrimitive,
)]
#[repr(u8)]
pub enum Encoding {
    /// Printable ASCII text
    String = 150,
    /// Unsigned 8-bit integer
    UInt8 = 151,
    /// Unsigned 16-bit integer
    UInt16 = 152,
    /// Unsigned 32-bit integer
    UInt32 = 153,
    /// Unsigned 64-bit integer
    UInt64 = 154,
    /// Opaque bytes
    Hex = 155,
}

impl Encoding {
    /// Fixed width of numeric encodings, `None` for variable-length encodings
    pub const fn width(&self) -> Option<usize> {
        match self {
            Encoding::UInt8 => Some(1),
            Encoding::UInt16 => Some(2),
            Encoding::UInt32 => Some(4),
            Encoding::UInt64 => Some(8),
            Encoding::String | Encoding::Hex => None,
        }
    }
}

/// Check a byte slice is printable ASCII (as required for headers and string bodies)
pub fn is_printable(b: &[u8]) -> bool {
    b.iter().all(|c| (0x20..=0x7e).contains(c))
}
