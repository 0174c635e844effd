#![allow(unused)]

use std::cell::Cell;

use encdec::Encode;
use k256::ecdsa::{signature::hazmat::PrehashVerifier, RecoveryId, Signature, VerifyingKey};
use ledger_proto::ApduHeader;
use log::{debug, trace};

use ledger_fio_core::{
    apdu::{prelude::*, tx::header, ApduError},
    engine::{Driver, Engine, Error, Event, Output, PrivateKey, RECOVERY_ID_OFFSET, SW_OK},
};

/// Decode a 32-byte hex string
pub fn hex32(s: &str) -> [u8; 32] {
    let mut b = [0u8; 32];
    hex::decode_to_slice(s, &mut b).unwrap();
    b
}

lazy_static::lazy_static! {
    /// Test keys by path, `m/44'/235'/0'/0/{0, 1}`
    pub static ref KEYS: [[u8; 32]; 2] = [
        hex32("4d597899db76e87933e7c6841c2d661810f070bad20487ef20eb84e182695a3a"),
        hex32("90835ae980cd10e9ca7df05d0e3b3c22e0aed0e75527511337f7c53a9d0c6c69"),
    ];
}

pub fn setup() {
    let _ = simplelog::SimpleLogger::init(log::LevelFilter::Debug, Default::default());
}

/// Driver implementation for test use, with fixed keys per path
#[derive(Default)]
pub struct TestDriver {
    /// Number of key derivations requested
    pub derived: Cell<usize>,
}

impl TestDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the test key for a path
    pub fn key(path: &[u32]) -> [u8; 32] {
        match path {
            [a, b, c, 0, i] if *a == h(44) && *b == h(235) && *c == h(0) => KEYS[*i as usize],
            _ => panic!("no test key for path {path:08x?}"),
        }
    }

    /// Fetch the public key for a path
    pub fn public_key(path: &Bip32Path) -> VerifyingKey {
        let sk = k256::ecdsa::SigningKey::from_slice(&Self::key(path.components())).unwrap();
        VerifyingKey::from(&sk)
    }
}

impl Driver for TestDriver {
    fn secp256k1_derive(&self, path: &[u32]) -> PrivateKey {
        self.derived.set(self.derived.get() + 1);
        PrivateKey::from_bytes(Self::key(path))
    }
}

/// Check a signature verifies against and recovers the public key for `path`
pub fn check_signature(path: &Bip32Path, sig: &TxSignature) {
    let vk = TestDriver::public_key(path);

    let s = Signature::from_slice(&sig.signature[1..]).unwrap();
    assert!(s.normalize_s().is_none(), "signature is not low-S");

    vk.verify_prehash(&sig.digest, &s)
        .expect("signature verification failed");

    let recid = RecoveryId::from_byte(sig.signature[0] - RECOVERY_ID_OFFSET).unwrap();
    let recovered = VerifyingKey::recover_from_prehash(&sig.digest, &s, recid).unwrap();
    assert_eq!(recovered, vk, "recovered key mismatch");
}

/// Engine wrapper exchanging encoded APDUs
pub struct TestEngine {
    pub engine: Engine<TestDriver>,
    /// Fields displayed, as `header: value`
    pub displayed: Vec<String>,
}

impl TestEngine {
    pub fn new(engine: Engine<TestDriver>) -> Self {
        Self {
            engine,
            displayed: Vec::new(),
        }
    }

    /// Exchange a raw APDU payload, returning the response or status word
    pub fn exchange_raw(&mut self, ins: u8, p1: u8, p2: u8, req: &[u8]) -> Result<Vec<u8>, u16> {
        trace!("req: {ins:02x} {p1:02x} {p2:02x} {req:02x?}");

        match self.engine.handle_apdu(ins, p1, p2, req) {
            Ok(o) => {
                if let Output::Display { header, value } = &o {
                    debug!("display {header}: {value:?}");
                    self.displayed.push(format!("{header}: {value:?}"));
                }

                let mut buff = [0u8; 256];
                let n = o.encode(&mut buff).unwrap();
                Ok(buff[..n].to_vec())
            }
            Err(e) => {
                debug!("error: {e:?} ({:04x})", e.status_word());
                Err(e.status_word())
            }
        }
    }

    /// Encode and exchange a signing APDU
    pub fn exchange<A>(&mut self, apdu: &A) -> Result<Vec<u8>, u16>
    where
        A: Encode<Error = ApduError> + ApduStatic,
    {
        let mut buff = [0u8; 256];
        let n = apdu.encode(&mut buff).unwrap();

        assert!(n < 250, "encoded command maximum length exceeded ({n} bytes)");

        let h = header(apdu);
        assert_eq!(h.cla, FIO_APDU_CLA);

        self.exchange_raw(h.ins, h.p1, h.p2, &buff[..n])
    }

    /// Event sink for template runs, passing events over the APDU interface
    pub fn sink<'e>(&mut self, evt: &Event<'e>) -> Result<Output<'e>, Error> {
        let mut buff = [0u8; 256];

        let (h, n) = match evt {
            Event::Begin { chain_id } => encode(&mut buff, &TxBegin::new(*chain_id)),
            Event::StartSection { length } => encode(&mut buff, &TxStartSection::new(*length)),
            Event::EndSection => encode(&mut buff, &TxEndSection),
            Event::SendData {
                policy,
                encoding,
                header,
                body,
            } => encode(
                &mut buff,
                &TxSendData::new(*policy, *encoding, header, body),
            ),
            Event::StartFor {
                min,
                max,
                set_digest,
            } => encode(&mut buff, &TxStartFor::new(*min, *max, *set_digest)),
            Event::StartIteration => encode(&mut buff, &TxStartIteration),
            Event::EndIteration { hashes } => {
                encode(&mut buff, &TxEndIteration::new(hashes).unwrap())
            }
            Event::EndFor => encode(&mut buff, &TxEndFor),
            Event::End { path } => encode(&mut buff, &TxEnd::new(path.clone())),
            Event::None => return Ok(Output::None),
        };

        let resp = self
            .exchange_raw(h.ins, h.p1, h.p2, &buff[..n])
            .map_err(|sw| {
                log::warn!("status {sw:04x}");
                error_for(sw)
            })?;

        match resp.len() {
            0 => Ok(Output::None),
            97 => {
                let mut signature = [0u8; 65];
                let mut digest = [0u8; 32];
                signature.copy_from_slice(&resp[..65]);
                digest.copy_from_slice(&resp[65..]);
                Ok(Output::Signature { signature, digest })
            }
            n => panic!("unexpected response length {n}"),
        }
    }
}

fn encode<A: Encode<Error = ApduError> + ApduStatic>(buff: &mut [u8], a: &A) -> (ApduHeader, usize) {
    let n = a.encode(buff).unwrap();
    (header(a), n)
}

/// Map a status word back to the engine error
pub fn error_for(sw: u16) -> Error {
    use Error::*;

    [
        RequestParameter,
        MalformedData,
        ProtocolState,
        UntrustedTemplate,
        UnsupportedOperation,
        SigningFailed,
        InternalAssertion,
    ]
    .into_iter()
    .find(|e| e.status_word() == sw)
    .unwrap_or_else(|| panic!("unknown status word {sw:04x}"))
}
