// Copyright (c) 2022-2023 The MobileCoin Foundation

use strum::{Display, EnumIter, EnumString, EnumVariantNames};
use zeroize::Zeroize;

use ledger_fio_apdu::{
    digest::iteration_set_digest, is_printable, path::Bip32Path, DisplayPolicy, Encoding,
    MAX_ALLOWED_HASHES, MAX_BODY_LEN, MAX_HEADER_LEN,
};

use super::{ContentDigest, Digests, Error, Normalised, ShapeDigest, Structure, Value};

/// FIO mainnet chain id
pub const FIO_MAINNET: [u8; 32] = [
    0x21, 0xdc, 0xae, 0x42, 0xc0, 0x18, 0x22, 0x00, 0xe9, 0x3f, 0x95, 0x4a, 0x07, 0x40, 0x11, 0xf9,
    0x04, 0x8a, 0x76, 0x24, 0xc6, 0xfe, 0x81, 0xd3, 0xc9, 0x54, 0x1a, 0x61, 0x4a, 0x88, 0xbd, 0x1c,
];

/// FIO testnet chain id
pub const FIO_TESTNET: [u8; 32] = [
    0xb2, 0x09, 0x01, 0x38, 0x0a, 0xf4, 0x4e, 0xf5, 0x9c, 0x59, 0x18, 0x43, 0x9a, 0x1f, 0x9a, 0x41,
    0xd8, 0x36, 0x69, 0x02, 0x03, 0x19, 0xa8, 0x05, 0x74, 0xb8, 0x04, 0xa5, 0xf9, 0x5c, 0xbd, 0x7e,
];

/// Network identified by the session chain id
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum Network {
    Mainnet,
    Testnet,
    Unknown,
}

impl Network {
    /// Identify the network for a chain id
    pub fn from_chain_id(chain_id: &[u8; 32]) -> Self {
        match chain_id {
            c if c == &FIO_MAINNET => Network::Mainnet,
            c if c == &FIO_TESTNET => Network::Testnet,
            _ => Network::Unknown,
        }
    }
}

/// Signing session context, owning both digests and the structure stacks
/// for exactly one session.
///
/// Every operation validates before mutating, the caller is expected to
/// discard the session on any error.
pub struct Session {
    content: ContentDigest,
    shape: ShapeDigest,
    structure: Structure,
    network: Network,
}

impl Session {
    /// Begin a session for the provided chain id
    pub fn begin(chain_id: &[u8; 32]) -> Self {
        Self {
            content: ContentDigest::new(chain_id),
            shape: ShapeDigest::new(),
            structure: Structure::new(),
            network: Network::from_chain_id(chain_id),
        }
    }

    /// Network for the session chain id
    pub fn network(&self) -> Network {
        self.network
    }

    /// Current section and loop stacks
    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    /// Open a counted section
    pub fn start_section(&mut self, length: u64) -> Result<(), Error> {
        let level = self.structure.start_section(length)?;
        self.shape.start_section(level, length);
        Ok(())
    }

    /// Add a field, returning the normalised value for display
    pub fn send_data<'a>(
        &mut self,
        policy: DisplayPolicy,
        encoding: Encoding,
        header: &'a str,
        body: &'a [u8],
    ) -> Result<Value<'a>, Error> {
        if header.len() > MAX_HEADER_LEN || !is_printable(header.as_bytes()) {
            return Err(Error::MalformedData);
        }
        if body.len() > MAX_BODY_LEN {
            return Err(Error::MalformedData);
        }

        let n = Normalised::parse(encoding, body)?;

        let section_level = self.structure.add_data(body.len())?;

        n.with_bytes(|b| self.content.update(b));
        self.shape.send_data(
            policy as u8,
            encoding as u8,
            body.len() as u8,
            section_level,
            header.as_bytes(),
        );

        Ok(n.value())
    }

    /// Close the innermost counted section
    pub fn end_section(&mut self) -> Result<(), Error> {
        let level = self.structure.end_section()?;
        self.shape.end_section(level);
        Ok(())
    }

    /// Open a bounded loop
    pub fn start_for(&mut self, min: u8, max: u8, set_digest: &[u8; 32]) -> Result<(), Error> {
        let level = self.structure.check_start_for(min, max)?;

        let parent = self.shape.start_for(level, min, max);
        self.structure.start_for(min, max, parent, *set_digest)?;

        Ok(())
    }

    /// Start an iteration of the innermost loop
    pub fn start_iteration(&mut self) -> Result<(), Error> {
        let l = self.structure.start_iteration()?;
        self.shape.start_iteration(&l.parent, l.level);
        Ok(())
    }

    /// Finish the current iteration, checking the iteration shape is one of
    /// `hashes` and that `hashes` is the set committed when the loop was opened
    pub fn end_iteration(&mut self, hashes: &[u8]) -> Result<(), Error> {
        let n = hashes.len() / 32;
        if hashes.len() % 32 != 0 || n == 0 || n > MAX_ALLOWED_HASHES {
            return Err(Error::MalformedData);
        }

        let l = self.structure.check_end_iteration()?;

        let mut shape = self.shape.clone();
        let digest = shape.end_iteration(l.level);

        if !hashes.chunks_exact(32).any(|h| h == &digest[..]) {
            #[cfg(feature = "log")]
            log::warn!("iteration shape not in allowed set");

            return Err(Error::UntrustedTemplate);
        }

        if iteration_set_digest(hashes.chunks_exact(32)) != l.set_digest {
            #[cfg(feature = "log")]
            log::warn!("allowed set does not match loop commitment");

            return Err(Error::UntrustedTemplate);
        }

        self.structure.end_iteration()?;
        self.shape = shape;

        Ok(())
    }

    /// Close the innermost loop
    pub fn end_for(&mut self) -> Result<(), Error> {
        let l = self.structure.end_for()?;
        self.shape.end_for(&l.parent, &l.set_digest, l.level);
        Ok(())
    }

    /// Finalise both digests, all sections and loops must be closed
    pub fn finish(&mut self, path: &Bip32Path) -> Result<Digests, Error> {
        if !self.structure.is_closed() {
            return Err(Error::ProtocolState);
        }

        Ok(Digests {
            content: self.content.finalize(),
            shape: self.shape.finalize(path.wire_len() as u8),
        })
    }
}

impl Zeroize for Session {
    fn zeroize(&mut self) {
        self.content.zeroize();
        self.shape.zeroize();
        self.structure.zeroize();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.zeroize();
    }
}
