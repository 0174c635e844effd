// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Helpers for computing digests shared between host and device
//!
//! The allowed iteration set digest committed by [`TxStartFor`][crate::tx::TxStartFor]
//! must match the hashes later presented with each [`TxEndIteration`][crate::tx::TxEndIteration].

use sha2::{Digest as _, Sha256};

/// Compute the digest over a set of allowed iteration hashes
/// (`SHA-256(h1 | h2 | .. | hn)`)
pub fn iteration_set_digest<'a>(hashes: impl IntoIterator<Item = &'a [u8]>) -> [u8; 32] {
    let mut d = Sha256::new();
    for h in hashes {
        d.update(h);
    }
    d.finalize().into()
}
