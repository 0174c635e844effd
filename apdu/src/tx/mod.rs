// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction signing APDUs, one per [`SignTxStep`].
//!
//! All steps share [`Instruction::SignTransaction`], the step is selected by `P1`
//! and `P2` is unused except for [`TxSendData`] where it carries the [`DisplayPolicy`][crate::DisplayPolicy].
//!
//! See [ledger_fio_core::engine] for interaction and state machines

use encdec::{Decode, Encode};
use ledger_proto::{ApduHeader, ApduStatic};

use crate::{ApduError, Instruction, SignTxStep, FIO_APDU_CLA, P2_UNUSED};

mod begin;
pub use begin::*;

mod data;
pub use data::*;

mod section;
pub use section::*;

mod loops;
pub use loops::*;

/// Implement [`ApduStatic`] for a signing step, with the step in `P1`
macro_rules! sign_tx_apdu {
    ($t:ty, $step:ident) => {
        impl ApduStatic for $t {
            const CLA: u8 = FIO_APDU_CLA;
            const INS: u8 = Instruction::SignTransaction as u8;

            fn p1(&self) -> u8 {
                SignTxStep::$step as u8
            }

            fn p2(&self) -> u8 {
                P2_UNUSED
            }
        }
    };
}

pub(crate) use sign_tx_apdu;

/// Request header for a signing APDU.
///
/// Equivalent to [`ApduReq::header`][ledger_proto::ApduReq::header], and also
/// available for [`TxSendData`] which cannot be decoded without its `P2`.
pub fn header<A: ApduStatic>(apdu: &A) -> ApduHeader {
    ApduHeader {
        cla: A::CLA,
        ins: A::INS,
        p1: apdu.p1(),
        p2: apdu.p2(),
    }
}

/// Close the innermost counted section (0 length APDU)
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxEndSection;

sign_tx_apdu!(TxEndSection, EndCountedSection);

/// Start a loop iteration (0 length APDU)
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxStartIteration;

sign_tx_apdu!(TxStartIteration, StartIteration);

/// Close the innermost loop (0 length APDU)
#[derive(Clone, PartialEq, Debug, Encode, Decode)]
#[encdec(error = "ApduError")]
pub struct TxEndFor;

sign_tx_apdu!(TxEndFor, EndFor);
