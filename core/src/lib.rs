// Copyright (c) 2022-2023 The MobileCoin Foundation

//! FIO hardware wallet core
//!
//! This provides a common [Engine][engine] supporting streamed transaction signing
//! for execution on hardware wallets that cannot hold (or parse) a whole transaction.
//!
//! Interactions with the [Engine][engine] are performed via [Event][engine::Event]s and [Output][engine::Output]s,
//! see [ledger_fio_apdu] for APDU objects and wire encodings.
//!
//! ## Operations
//!
//! Transactions are streamed field by field. As each field arrives the engine
//! computes two digests:
//!
//! - a _content_ digest over the normalised field values, seeded with the chain id,
//!   which is the message signed on completion.
//! - a _shape_ digest over the structure of the command sequence (field headers,
//!   encodings and lengths, counted sections and loops), which must match one of
//!   a small set of audited templates before the device will sign.
//!
//! ### Executing a transaction
//!
//! 1. Issue [`TxBegin`][ledger_fio_apdu::tx::TxBegin] with the chain id to start a session
//! 2. Stream fields via [`TxSendData`][ledger_fio_apdu::tx::TxSendData], fields marked for
//!    display return an [`Output::Display`][engine::Output::Display] for rendering before
//!    the response is sent
//! 3. Wrap length-prefixed regions in [`TxStartSection`][ledger_fio_apdu::tx::TxStartSection] /
//!    [`TxEndSection`][ledger_fio_apdu::tx::TxEndSection]
//! 4. Wrap repeated regions in [`TxStartFor`][ledger_fio_apdu::tx::TxStartFor] /
//!    [`TxEndFor`][ledger_fio_apdu::tx::TxEndFor], with each iteration delimited by
//!    [`TxStartIteration`][ledger_fio_apdu::tx::TxStartIteration] /
//!    [`TxEndIteration`][ledger_fio_apdu::tx::TxEndIteration]
//! 5. Issue [`TxEnd`][ledger_fio_apdu::tx::TxEnd] with the signing key path to receive a
//!    [`TxSignature`][ledger_fio_apdu::tx::TxSignature] containing the signature and content digest
//!
//! Any error aborts the session, which must then be restarted with `TxBegin`.
//!
//! The [template] module computes template digests and allowed iteration sets,
//! and drives a full command sequence from a template and a set of values.

#![cfg_attr(not(feature = "std"), no_std)]

pub use ledger_fio_apdu::{self as apdu};

pub mod engine;

pub mod template;
