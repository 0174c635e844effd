// Copyright (c) 2022-2023 The MobileCoin Foundation

use encdec::Decode;

use ledger_fio_apdu::{prelude::*, ApduError, Instruction};

use super::Error;

/// [`Engine`][super::Engine] input events, typically decoded from request [APDUs][crate::apdu]
#[derive(Clone, PartialEq, Debug)]
pub enum Event<'a> {
    None,

    /// Start a new signing session
    Begin { chain_id: [u8; 32] },

    /// Open a counted section
    StartSection { length: u64 },

    /// Stream a field
    SendData {
        policy: DisplayPolicy,
        encoding: Encoding,
        header: &'a str,
        body: &'a [u8],
    },

    /// Close the innermost counted section
    EndSection,

    /// Open a bounded loop
    StartFor {
        min: u8,
        max: u8,
        set_digest: [u8; 32],
    },

    /// Start a loop iteration
    StartIteration,

    /// Finish a loop iteration, with concatenated allowed iteration hashes
    EndIteration { hashes: &'a [u8] },

    /// Close the innermost loop
    EndFor,

    /// Finish the session and sign with the key at `path`
    End { path: Bip32Path },
}

/// Helper for decoding APDUs to events, payloads must be fully consumed
fn decode_event<'a, T>(p2: u8, buff: &'a [u8]) -> Result<Event<'a>, Error>
where
    T: Decode<'a, Error = ApduError>,
    Event<'a>: From<T::Output>,
{
    if p2 != P2_UNUSED {
        return Err(Error::RequestParameter);
    }

    let (v, n) = T::decode(buff)?;
    if n != buff.len() {
        return Err(Error::MalformedData);
    }

    Ok(Event::from(v))
}

impl<'a> Event<'a> {
    /// Parse an incoming APDU to engine event
    #[cfg_attr(feature = "noinline", inline(never))]
    pub fn parse(ins: u8, p1: u8, p2: u8, buff: &'a [u8]) -> Result<Self, Error> {
        if ins != Instruction::SignTransaction as u8 {
            return Err(Error::UnsupportedOperation);
        }

        let step = SignTxStep::try_from(p1).map_err(|_| Error::UnsupportedOperation)?;

        match step {
            SignTxStep::Begin => decode_event::<TxBegin>(p2, buff),
            SignTxStep::StartCountedSection => decode_event::<TxStartSection>(p2, buff),
            SignTxStep::EndCountedSection => decode_event::<TxEndSection>(p2, buff),
            SignTxStep::SendData => {
                let policy = DisplayPolicy::try_from(p2).map_err(|_| Error::RequestParameter)?;

                // Unknown encodings are unsupported rather than malformed
                if let Some(e) = buff.first() {
                    Encoding::try_from(*e).map_err(|_| Error::UnsupportedOperation)?;
                }

                let (v, n) = TxSendData::decode_with_policy(policy, buff)?;
                if n != buff.len() {
                    return Err(Error::MalformedData);
                }

                Ok(Event::from(v))
            }
            SignTxStep::StartFor => decode_event::<TxStartFor>(p2, buff),
            SignTxStep::StartIteration => decode_event::<TxStartIteration>(p2, buff),
            SignTxStep::EndIteration => decode_event::<TxEndIteration>(p2, buff),
            SignTxStep::EndFor => decode_event::<TxEndFor>(p2, buff),
            SignTxStep::End => decode_event::<TxEnd>(p2, buff),
        }
    }

    /// Fetch the signing step for an event
    pub fn step(&self) -> Option<SignTxStep> {
        let s = match self {
            Event::None => return None,
            Event::Begin { .. } => SignTxStep::Begin,
            Event::StartSection { .. } => SignTxStep::StartCountedSection,
            Event::SendData { .. } => SignTxStep::SendData,
            Event::EndSection => SignTxStep::EndCountedSection,
            Event::StartFor { .. } => SignTxStep::StartFor,
            Event::StartIteration => SignTxStep::StartIteration,
            Event::EndIteration { .. } => SignTxStep::EndIteration,
            Event::EndFor => SignTxStep::EndFor,
            Event::End { .. } => SignTxStep::End,
        };
        Some(s)
    }
}

impl<'a> From<TxBegin> for Event<'a> {
    fn from(a: TxBegin) -> Self {
        Event::Begin {
            chain_id: a.chain_id,
        }
    }
}

impl<'a> From<TxStartSection> for Event<'a> {
    fn from(a: TxStartSection) -> Self {
        Event::StartSection { length: a.length }
    }
}

impl<'a> From<TxEndSection> for Event<'a> {
    fn from(_: TxEndSection) -> Self {
        Event::EndSection
    }
}

impl<'a> From<TxSendData<'a>> for Event<'a> {
    fn from(a: TxSendData<'a>) -> Self {
        Event::SendData {
            policy: a.policy,
            encoding: a.encoding,
            header: a.header,
            body: a.body,
        }
    }
}

impl<'a> From<TxStartFor> for Event<'a> {
    fn from(a: TxStartFor) -> Self {
        Event::StartFor {
            min: a.min,
            max: a.max,
            set_digest: a.set_digest,
        }
    }
}

impl<'a> From<TxStartIteration> for Event<'a> {
    fn from(_: TxStartIteration) -> Self {
        Event::StartIteration
    }
}

impl<'a> From<TxEndIteration<'a>> for Event<'a> {
    fn from(a: TxEndIteration<'a>) -> Self {
        Event::EndIteration {
            hashes: a.as_bytes(),
        }
    }
}

impl<'a> From<TxEndFor> for Event<'a> {
    fn from(_: TxEndFor) -> Self {
        Event::EndFor
    }
}

impl<'a> From<TxEnd> for Event<'a> {
    fn from(a: TxEnd) -> Self {
        Event::End { path: a.path }
    }
}

#[cfg(test)]
mod test {
    use encdec::Encode;
    use ledger_fio_apdu::tx::header;

    use super::*;

    const INS: u8 = Instruction::SignTransaction as u8;

    fn parse_apdu<'a, A: Encode<Error = ApduError> + ApduStatic>(
        buff: &'a mut [u8],
        apdu: &A,
    ) -> Result<Event<'a>, Error> {
        let n = apdu.encode(buff).unwrap();
        let h = header(apdu);
        assert_eq!(h.cla, FIO_APDU_CLA);

        Event::parse(h.ins, h.p1, h.p2, &buff[..n])
    }

    #[test]
    fn parse_events() {
        let mut buff = [0u8; 256];

        assert_eq!(
            parse_apdu(&mut buff, &TxBegin::new([0x22; 32])),
            Ok(Event::Begin {
                chain_id: [0x22; 32]
            })
        );
        assert_eq!(
            parse_apdu(&mut buff, &TxStartSection::new(79)),
            Ok(Event::StartSection { length: 79 })
        );
        assert_eq!(
            parse_apdu(&mut buff, &TxEndSection),
            Ok(Event::EndSection)
        );
        assert_eq!(
            parse_apdu(
                &mut buff,
                &TxSendData::new(DisplayPolicy::Display, Encoding::UInt64, "Amount", &[1, 2])
            ),
            Ok(Event::SendData {
                policy: DisplayPolicy::Display,
                encoding: Encoding::UInt64,
                header: "Amount",
                body: &[1, 2]
            })
        );
        assert_eq!(
            parse_apdu(&mut buff, &TxStartFor::new(1, 2, [0x33; 32])),
            Ok(Event::StartFor {
                min: 1,
                max: 2,
                set_digest: [0x33; 32]
            })
        );
        assert_eq!(
            parse_apdu(&mut buff, &TxStartIteration),
            Ok(Event::StartIteration)
        );
        assert_eq!(
            parse_apdu(&mut buff, &TxEndIteration::new(&[0x44; 64]).unwrap()),
            Ok(Event::EndIteration {
                hashes: &[0x44; 64]
            })
        );
        assert_eq!(parse_apdu(&mut buff, &TxEndFor), Ok(Event::EndFor));
        assert_eq!(
            parse_apdu(&mut buff, &TxEnd::new(Bip32Path::fio(0, 0))),
            Ok(Event::End {
                path: Bip32Path::fio(0, 0)
            })
        );
    }

    #[test]
    fn parse_errors() {
        // Unknown instruction and step
        assert_eq!(
            Event::parse(0x21, 0x01, 0x00, &[0u8; 32]),
            Err(Error::UnsupportedOperation)
        );
        assert_eq!(
            Event::parse(0x00, 0x00, 0x00, &[]),
            Err(Error::UnsupportedOperation)
        );
        assert_eq!(
            Event::parse(INS, 0x02, 0x00, &[]),
            Err(Error::UnsupportedOperation)
        );

        // Non-zero P2 outside of SendData
        assert_eq!(
            Event::parse(INS, 0x01, 0x01, &[0u8; 32]),
            Err(Error::RequestParameter)
        );

        // Invalid display policy
        assert_eq!(
            Event::parse(INS, 0x07, 0x00, &[151, 1, b'n', 0, 1, 3, 0]),
            Err(Error::RequestParameter)
        );
        assert_eq!(
            Event::parse(INS, 0x07, 0x03, &[151, 1, b'n', 0, 1, 3, 0]),
            Err(Error::RequestParameter)
        );

        // Unknown encoding
        assert_eq!(
            Event::parse(INS, 0x07, 0x01, &[156, 1, b'n', 0, 1, 3, 0]),
            Err(Error::UnsupportedOperation)
        );

        // Truncated and oversized payloads
        assert_eq!(
            Event::parse(INS, 0x01, 0x00, &[0u8; 31]),
            Err(Error::MalformedData)
        );
        assert_eq!(
            Event::parse(INS, 0x01, 0x00, &[0u8; 33]),
            Err(Error::MalformedData)
        );
        assert_eq!(
            Event::parse(INS, 0x0d, 0x00, &[0]),
            Err(Error::MalformedData)
        );
        assert_eq!(
            Event::parse(INS, 0x07, 0x02, &[151, 1, b'n', 0, 1, 3, 0, 0]),
            Err(Error::MalformedData)
        );

        // Missing section length terminator
        assert_eq!(
            Event::parse(INS, 0x09, 0x00, &[0, 0, 0, 0, 0, 0, 0, 1, 1]),
            Err(Error::MalformedData)
        );
    }
}
