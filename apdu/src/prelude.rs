// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Prelude to simplify downstream use of APDU objects
//!

pub use crate::{
    digest::iteration_set_digest,
    path::{h, Bip32Path, HARDENED, MAX_PATH_DEPTH},
    tx::{
        TxBegin, TxEnd, TxEndFor, TxEndIteration, TxEndSection, TxSendData,
        TxSignature, TxStartFor, TxStartIteration, TxStartSection,
    },
    ApduReq, ApduStatic, DisplayPolicy, Encoding, SignTxStep, FIO_APDU_CLA, MAX_ALLOWED_HASHES, MAX_BODY_LEN,
    MAX_HEADER_LEN, P2_UNUSED,
};
