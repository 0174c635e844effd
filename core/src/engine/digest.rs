// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Streaming content and shape digests.
//!
//! Shape records are `0x30 | STEP | ..` where `STEP` is the `P1` code of the
//! signing step, levels are 1-based nesting depths.

use sha2::{Digest as _, Sha256};
use zeroize::Zeroize;

use ledger_fio_apdu::SignTxStep;

/// Tag prefixing every shape record
pub const SHAPE_TAG: u8 = 0x30;

/// Protocol version marker mixed into the shape digest on [`SignTxStep::Begin`]
pub const SHAPE_VERSION: u8 = 0x20;

/// Terminator appended to both digests on completion
const TERMINATOR: [u8; 32] = [0u8; 32];

/// Overwrite a hasher state (including buffered input) with zeros
fn wipe(d: &mut Sha256) {
    // Sha256 state is integers and byte arrays only, with no drop glue
    unsafe { zeroize::zeroize_flat_type(d as *mut Sha256) }
}

/// Check a hasher state has been wiped
#[cfg(test)]
fn is_wiped(d: &Sha256) -> bool {
    let b = unsafe {
        core::slice::from_raw_parts(d as *const Sha256 as *const u8, core::mem::size_of::<Sha256>())
    };
    b.iter().all(|v| *v == 0)
}

/// Finalised session digests
#[derive(Clone, PartialEq, Debug)]
pub struct Digests {
    /// Digest over the normalised transaction content (the signed message)
    pub content: [u8; 32],
    /// Digest over the command sequence structure (the template fingerprint)
    pub shape: [u8; 32],
}

/// Content digest, seeded with the chain id and extended with
/// normalised field bodies
#[derive(Clone)]
pub struct ContentDigest(Sha256);

impl ContentDigest {
    /// Start a content digest for the provided chain
    pub fn new(chain_id: &[u8; 32]) -> Self {
        Self(Sha256::new().chain_update(chain_id))
    }

    /// Append normalised content
    pub fn update(&mut self, b: &[u8]) {
        self.0.update(b);
    }

    /// Append the extension point and terminator, returning the final digest.
    ///
    /// The digest is reset on completion.
    pub fn finalize(&mut self) -> [u8; 32] {
        // No extension points are supported
        self.0.update([0u8]);
        self.0.update(TERMINATOR);
        self.0.finalize_reset().into()
    }
}

/// Shape digest, tracking the structure of the command sequence
#[derive(Clone)]
pub struct ShapeDigest(Sha256);

impl ShapeDigest {
    /// Start a shape digest with the protocol version marker
    pub fn new() -> Self {
        let mut d = Sha256::new();
        d.update([SHAPE_TAG, SignTxStep::Begin as u8, SHAPE_VERSION]);
        Self(d)
    }

    fn record(&mut self, step: SignTxStep, b: &[u8]) {
        self.0.update([SHAPE_TAG, step as u8]);
        self.0.update(b);
    }

    /// Open a counted section at `level`
    pub fn start_section(&mut self, level: u8, length: u64) {
        self.record(SignTxStep::StartCountedSection, &[level]);
        self.0.update(length.to_be_bytes());
    }

    /// Record a field
    pub fn send_data(
        &mut self,
        policy: u8,
        encoding: u8,
        body_len: u8,
        section_level: u8,
        header: &[u8],
    ) {
        self.record(
            SignTxStep::SendData,
            &[policy, encoding, body_len, section_level],
        );
        self.0.update(header);
    }

    /// Close the counted section at `level`
    pub fn end_section(&mut self, level: u8) {
        self.record(SignTxStep::EndCountedSection, &[level]);
    }

    /// Open a loop at `level`, returning the parent digest.
    ///
    /// The working digest is left empty until the next iteration or loop close.
    pub fn start_for(&mut self, level: u8, min: u8, max: u8) -> [u8; 32] {
        self.record(SignTxStep::StartFor, &[level, min, max]);
        self.0.finalize_reset().into()
    }

    /// Start an iteration of the loop at `level`
    pub fn start_iteration(&mut self, parent: &[u8; 32], level: u8) {
        self.0.reset();
        self.0.update(parent);
        self.record(SignTxStep::StartIteration, &[level]);
    }

    /// Finish an iteration of the loop at `level`, returning the iteration digest
    pub fn end_iteration(&mut self, level: u8) -> [u8; 32] {
        self.record(SignTxStep::EndIteration, &[level]);
        self.0.finalize_reset().into()
    }

    /// Close the loop at `level`, folding the loop into a single digest state
    pub fn end_for(&mut self, parent: &[u8; 32], set_digest: &[u8; 32], level: u8) {
        self.0.reset();
        self.0.update(parent);
        self.0.update(set_digest);
        self.record(SignTxStep::EndFor, &[level]);
    }

    /// Append the completion record and terminator, returning the final digest.
    ///
    /// The digest is reset on completion.
    pub fn finalize(&mut self, path_len: u8) -> [u8; 32] {
        self.record(SignTxStep::End, &[path_len]);
        self.0.update(TERMINATOR);
        self.0.finalize_reset().into()
    }
}

impl Zeroize for ContentDigest {
    fn zeroize(&mut self) {
        wipe(&mut self.0);
    }
}

impl Drop for ContentDigest {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl Zeroize for ShapeDigest {
    fn zeroize(&mut self) {
        wipe(&mut self.0);
    }
}

impl Drop for ShapeDigest {
    fn drop(&mut self) {
        self.zeroize();
    }
}

#[cfg(test)]
impl ContentDigest {
    pub(crate) fn is_wiped(&self) -> bool {
        is_wiped(&self.0)
    }
}

#[cfg(test)]
impl ShapeDigest {
    pub(crate) fn is_wiped(&self) -> bool {
        is_wiped(&self.0)
    }
}

impl Default for ShapeDigest {
    fn default() -> Self {
        Self::new()
    }
}
