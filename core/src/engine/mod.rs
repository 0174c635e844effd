// Copyright (c) 2022-2023 The MobileCoin Foundation

//! The [Engine] provides streamed transaction signing for hardware wallets.
//!
//! This handles [Event] inputs and returns [Output] responses to the caller,
//! see [apdu][crate::apdu] for APDU protocol and encoding details.

use strum::{Display, EnumIter, EnumString, EnumVariantNames};

use ledger_fio_apdu::{path::Bip32Path, DisplayPolicy};

mod allow_list;
pub use allow_list::{AllowList, ALLOWED_TEMPLATES, TRNSFIOPUBKY};

mod digest;
pub use digest::{ContentDigest, Digests, ShapeDigest, SHAPE_TAG, SHAPE_VERSION};

mod error;
pub use error::{Error, SW_OK};

mod event;
pub use event::Event;

mod field;
pub use field::{Normalised, Value};

mod output;
pub use output::Output;

mod session;
pub use session::{Network, Session, FIO_MAINNET, FIO_TESTNET};

mod signer;
pub use signer::{sign, PrivateKey, MAX_SIGN_ATTEMPTS, RECOVERY_ID_OFFSET};

mod structure;
pub use structure::{CountedSection, ForBlock, Structure};

/// Maximum counted section nesting depth
pub const MAX_SECTION_DEPTH: usize = 6;

/// Maximum loop nesting depth
pub const MAX_LOOP_DEPTH: usize = 4;

// Levels are recorded as single bytes in the shape digest
static_assertions::const_assert!(MAX_SECTION_DEPTH < u8::MAX as usize);
static_assertions::const_assert!(MAX_LOOP_DEPTH < u8::MAX as usize);

/// Engine internal state enumeration
#[derive(Copy, Clone, PartialEq, Debug, EnumString, Display, EnumVariantNames, EnumIter)]
pub enum State {
    /// Idle state, no session running
    Idle,
    /// Session open, accepting fields and structure
    Active,
    /// Transaction signed
    Complete,
    /// Session aborted, must be restarted with [`Event::Begin`]
    Failed,
}

/// [Engine] provides hardware-independent support for FIO transaction signing
pub struct Engine<DRV: Driver> {
    state: State,
    session: Option<Session>,
    templates: AllowList<'static>,
    drv: DRV,
}

/// [`Driver`] trait provides platform support for [`Engine`] instances
pub trait Driver {
    /// BIP32 derivation for secp256k1 keys
    fn secp256k1_derive(&self, path: &[u32]) -> PrivateKey;
}

impl<T: Driver> Driver for &mut T {
    fn secp256k1_derive(&self, path: &[u32]) -> PrivateKey {
        T::secp256k1_derive(self, path)
    }
}

impl<DRV: Driver> Engine<DRV> {
    /// Create a new engine instance with the provided driver,
    /// using the built-in template allow-list
    pub const fn new(drv: DRV) -> Self {
        Self::with_templates(drv, ALLOWED_TEMPLATES)
    }

    /// Create a new engine instance with the provided driver and template allow-list
    pub const fn with_templates(drv: DRV, templates: AllowList<'static>) -> Self {
        Self {
            state: State::Idle,
            session: None,
            templates,
            drv,
        }
    }

    /// Handle incoming signing events.
    ///
    /// Any error aborts the running session.
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn update<'a>(&mut self, evt: &Event<'a>) -> Result<Output<'a>, Error> {
        #[cfg(feature = "log")]
        log::debug!("event: {:02x?}", evt);

        match self.handle(evt) {
            Ok(o) => Ok(o),
            Err(e) => {
                #[cfg(feature = "log")]
                log::error!("{:?} failed in state {}: {:?}", evt.step(), self.state, e);

                self.abort();
                Err(e)
            }
        }
    }

    /// Parse and handle an incoming signing APDU.
    ///
    /// Decode failures abort the running session as any other error.
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn handle_apdu<'a>(
        &mut self,
        ins: u8,
        p1: u8,
        p2: u8,
        buff: &'a [u8],
    ) -> Result<Output<'a>, Error> {
        match Event::parse(ins, p1, p2, buff) {
            Ok(evt) => self.update(&evt),
            Err(e) => {
                #[cfg(feature = "log")]
                log::error!("decode failed for p1 {:02x} p2 {:02x}: {:?}", p1, p2, e);

                self.abort();
                Err(e)
            }
        }
    }

    fn handle<'a>(&mut self, evt: &Event<'a>) -> Result<Output<'a>, Error> {
        // Begin is always accepted and discards any prior session
        if let Event::Begin { chain_id } = evt {
            let s = Session::begin(chain_id);

            #[cfg(feature = "log")]
            log::info!("begin session, network: {}", s.network());

            self.session = Some(s);
            self.state = State::Active;

            return Ok(Output::None);
        }

        if let Event::None = evt {
            return Ok(Output::None);
        }

        if self.state != State::Active {
            return Err(Error::ProtocolState);
        }

        let session = self.session.as_mut().ok_or(Error::InternalAssertion)?;

        match evt {
            Event::StartSection { length } => session.start_section(*length)?,
            Event::SendData {
                policy,
                encoding,
                header,
                body,
            } => {
                let value = session.send_data(*policy, *encoding, *header, *body)?;

                if *policy == DisplayPolicy::Display {
                    return Ok(Output::Display {
                        header: *header,
                        value,
                    });
                }
            }
            Event::EndSection => session.end_section()?,
            Event::StartFor {
                min,
                max,
                set_digest,
            } => session.start_for(*min, *max, set_digest)?,
            Event::StartIteration => session.start_iteration()?,
            Event::EndIteration { hashes } => session.end_iteration(hashes)?,
            Event::EndFor => session.end_for()?,
            Event::End { path } => return self.complete(path),
            Event::Begin { .. } | Event::None => return Err(Error::InternalAssertion),
        }

        Ok(Output::None)
    }

    /// Finalise the session, check the template and sign the content digest
    #[cfg_attr(feature = "noinline", inline(never))]
    fn complete<'a>(&mut self, path: &Bip32Path) -> Result<Output<'a>, Error> {
        let session = self.session.as_mut().ok_or(Error::InternalAssertion)?;
        let digests = session.finish(path)?;

        if !self.templates.contains(&digests.shape) {
            #[cfg(feature = "log")]
            log::warn!("untrusted template: {:02x?}", digests.shape);

            return Err(Error::UntrustedTemplate);
        }

        // Key is wiped on drop
        let key = self.drv.secp256k1_derive(path.components());
        let signature = sign(&key, &digests.content)?;
        drop(key);

        #[cfg(feature = "log")]
        log::debug!("signed with {}", path);

        self.session = None;
        self.state = State::Complete;

        Ok(Output::Signature {
            signature,
            digest: digests.content,
        })
    }

    /// Discard the running session
    fn abort(&mut self) {
        self.session = None;
        self.state = State::Failed;
    }

    /// Reset engine state, discarding any running session
    pub fn reset(&mut self) {
        self.session = None;
        self.state = State::Idle;
    }

    /// Fetch current engine state
    pub fn state(&self) -> State {
        self.state
    }

    /// Fetch network for the running session
    pub fn network(&self) -> Option<Network> {
        self.session.as_ref().map(|s| s.network())
    }

    /// Fetch the template allow-list in use
    pub fn templates(&self) -> &AllowList<'static> {
        &self.templates
    }

    /// Fetch the platform driver
    pub fn driver(&self) -> &DRV {
        &self.drv
    }
}
