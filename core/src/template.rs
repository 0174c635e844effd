// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Host-side transaction templates.
//!
//! A template is a tree of [`Step`]s describing the fields, counted sections
//! and loops of a transaction. From a template this computes the shape digest
//! listed in the device [`AllowList`][crate::engine::AllowList], the allowed
//! iteration sets sent with each loop, and drives a full command sequence
//! through an [`Engine`][crate::engine::Engine] (or any other event sink).
//!
//! ```
//! use ledger_fio_core::{apdu::path::Bip32Path, engine::TRNSFIOPUBKY, template};
//!
//! let path = Bip32Path::fio(0, 0);
//! let d = template::digest(template::trnsfiopubky(), path.wire_len() as u8).unwrap();
//! assert_eq!(d, TRNSFIOPUBKY);
//! ```

use heapless::Vec;

use ledger_fio_apdu::{
    digest::iteration_set_digest, path::Bip32Path, tx::TxSignature, DisplayPolicy, Encoding,
    MAX_ALLOWED_HASHES,
};

use crate::engine::{Error, Event, Output, ShapeDigest, MAX_LOOP_DEPTH, MAX_SECTION_DEPTH};

/// Template step
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum Step<'a> {
    /// Single field with a fixed wire body length
    Field {
        header: &'a str,
        encoding: Encoding,
        len: u8,
        policy: DisplayPolicy,
    },

    /// Counted section, the declared length is computed from the contents
    Section(&'a [Step<'a>]),

    /// Bounded loop, each iteration matches one of the audited variants
    Loop {
        min: u8,
        max: u8,
        variants: &'a [&'a [Step<'a>]],
    },
}

impl<'a> Step<'a> {
    /// Field shown to the user
    pub const fn display(header: &'a str, encoding: Encoding, len: u8) -> Self {
        Step::Field {
            header,
            encoding,
            len,
            policy: DisplayPolicy::Display,
        }
    }

    /// Field hashed without display
    pub const fn hidden(header: &'a str, encoding: Encoding, len: u8) -> Self {
        Step::Field {
            header,
            encoding,
            len,
            policy: DisplayPolicy::Hidden,
        }
    }

    /// Wire body length of a step, `None` where this depends on the
    /// number of loop iterations or variant selection
    pub fn body_len(&self) -> Option<u64> {
        match self {
            Step::Field { len, .. } => Some(*len as u64),
            Step::Section(steps) => steps_len(steps),
            Step::Loop { min, max, variants } => {
                if min != max {
                    return None;
                }

                let first = match variants.first() {
                    Some(v) => steps_len(v)?,
                    None => 0,
                };
                for v in variants.iter() {
                    if steps_len(v)? != first {
                        return None;
                    }
                }

                first.checked_mul(*min as u64)
            }
        }
    }
}

fn steps_len(steps: &[Step]) -> Option<u64> {
    steps
        .iter()
        .try_fold(0u64, |a, s| a.checked_add(s.body_len()?))
}

/// Allowed iterations for a loop
#[derive(Clone, PartialEq, Debug)]
pub struct IterationSet {
    /// Loop nesting level
    pub level: u8,
    /// Shape digest prior to the loop
    pub parent: [u8; 32],
    /// Iteration digest for each variant, in template order
    pub hashes: Vec<[u8; 32], MAX_ALLOWED_HASHES>,
}

impl IterationSet {
    /// Digest committed to by [`Event::StartFor`]
    pub fn set_digest(&self) -> [u8; 32] {
        iteration_set_digest(self.hashes.iter().map(|h| &h[..]))
    }

    /// Concatenated hashes as sent with [`Event::EndIteration`]
    pub fn to_bytes(&self) -> Result<Vec<u8, { 32 * MAX_ALLOWED_HASHES }>, Error> {
        let mut b = Vec::new();
        for h in self.hashes.iter() {
            b.extend_from_slice(h)
                .map_err(|_| Error::InternalAssertion)?;
        }
        Ok(b)
    }
}

/// Shape tracker, mirroring the device shape digest and nesting levels
#[derive(Clone)]
struct Tracer {
    shape: ShapeDigest,
    section: u8,
    loops: u8,
}

impl Tracer {
    fn new() -> Self {
        Self {
            shape: ShapeDigest::new(),
            section: 0,
            loops: 0,
        }
    }

    fn field(&mut self, header: &str, encoding: Encoding, len: u8, policy: DisplayPolicy) {
        self.shape.send_data(
            policy as u8,
            encoding as u8,
            len,
            self.section,
            header.as_bytes(),
        );
    }

    fn start_section(&mut self, length: u64) -> Result<(), Error> {
        if self.section as usize >= MAX_SECTION_DEPTH {
            return Err(Error::ProtocolState);
        }
        self.section += 1;
        self.shape.start_section(self.section, length);
        Ok(())
    }

    fn end_section(&mut self) {
        self.shape.end_section(self.section);
        self.section = self.section.saturating_sub(1);
    }

    /// Open a loop, returning the loop level and parent digest
    fn start_for(&mut self, min: u8, max: u8) -> Result<(u8, [u8; 32]), Error> {
        if self.loops as usize >= MAX_LOOP_DEPTH {
            return Err(Error::ProtocolState);
        }
        self.loops += 1;
        let parent = self.shape.start_for(self.loops, min, max);
        Ok((self.loops, parent))
    }

    fn end_for(&mut self, parent: &[u8; 32], set_digest: &[u8; 32], level: u8) {
        self.shape.end_for(parent, set_digest, level);
        self.loops = self.loops.saturating_sub(1);
    }

    /// Compute iteration digests for each variant of the loop at `level`
    fn iterations(
        &self,
        level: u8,
        parent: &[u8; 32],
        variants: &[&[Step]],
        visit: &mut dyn FnMut(&IterationSet),
    ) -> Result<IterationSet, Error> {
        let mut set = IterationSet {
            level,
            parent: *parent,
            hashes: Vec::new(),
        };

        for v in variants {
            let mut t = self.clone();
            t.shape.start_iteration(parent, level);
            t.trace(v, visit)?;

            set.hashes
                .push(t.shape.end_iteration(level))
                .map_err(|_| Error::RequestParameter)?;
        }

        if set.hashes.is_empty() {
            return Err(Error::RequestParameter);
        }

        visit(&set);

        Ok(set)
    }

    /// Trace a sequence of steps, visiting the iteration set of each loop
    fn trace(&mut self, steps: &[Step], visit: &mut dyn FnMut(&IterationSet)) -> Result<(), Error> {
        for s in steps {
            match s {
                Step::Field {
                    header,
                    encoding,
                    len,
                    policy,
                } => self.field(header, *encoding, *len, *policy),
                Step::Section(children) => {
                    let length = s.body_len().ok_or(Error::UnsupportedOperation)?;

                    self.start_section(length)?;
                    self.trace(children, visit)?;
                    self.end_section();
                }
                Step::Loop { min, max, variants } => {
                    let (level, parent) = self.start_for(*min, *max)?;
                    let set = self.iterations(level, &parent, variants, visit)?;
                    self.end_for(&parent, &set.set_digest(), level);
                }
            }
        }

        Ok(())
    }
}

/// Compute the shape digest of a template signed with a path of `path_len`
/// wire bytes, as listed in the device allow-list
pub fn digest(steps: &[Step], path_len: u8) -> Result<[u8; 32], Error> {
    let mut t = Tracer::new();
    t.trace(steps, &mut |_| ())?;
    Ok(t.shape.finalize(path_len))
}

/// Visit the allowed iteration set of every loop in a template,
/// innermost loops first
pub fn iteration_sets(steps: &[Step], mut visit: impl FnMut(&IterationSet)) -> Result<(), Error> {
    let mut t = Tracer::new();
    t.trace(steps, &mut visit)
}

/// Field values and iteration selections for [`run`]
pub trait Source<'b> {
    /// Fetch the wire body for the next field
    fn body(&mut self, header: &str) -> Result<&'b [u8], Error>;

    /// Select the variant for the next iteration, `None` to close the loop
    fn iteration(&mut self) -> Result<Option<usize>, Error>;
}

/// [`Source`] over ordered field bodies and iteration selections
#[derive(Clone, Debug)]
pub struct Values<'b> {
    bodies: &'b [&'b [u8]],
    iterations: &'b [Option<usize>],
    body_index: usize,
    iteration_index: usize,
}

impl<'b> Values<'b> {
    /// Create a value source, loops close when `iterations` yields `None`
    /// or is exhausted
    pub fn new(bodies: &'b [&'b [u8]], iterations: &'b [Option<usize>]) -> Self {
        Self {
            bodies,
            iterations,
            body_index: 0,
            iteration_index: 0,
        }
    }

    /// Check whether all provided bodies were used
    pub fn is_consumed(&self) -> bool {
        self.body_index == self.bodies.len()
    }
}

impl<'b> Source<'b> for Values<'b> {
    fn body(&mut self, _header: &str) -> Result<&'b [u8], Error> {
        let b = self
            .bodies
            .get(self.body_index)
            .ok_or(Error::MalformedData)?;
        self.body_index += 1;
        Ok(b)
    }

    fn iteration(&mut self) -> Result<Option<usize>, Error> {
        let i = self.iterations.get(self.iteration_index).copied().flatten();
        self.iteration_index += 1;
        Ok(i)
    }
}

/// Drive a full signing sequence for a template through `sink`,
/// returning the signature produced on [`Event::End`]
pub fn run<'b, S, F>(
    chain_id: &[u8; 32],
    steps: &[Step],
    path: &Bip32Path,
    src: &mut S,
    mut sink: F,
) -> Result<TxSignature, Error>
where
    S: Source<'b>,
    F: for<'e> FnMut(&Event<'e>) -> Result<Output<'e>, Error>,
{
    sink(&Event::Begin {
        chain_id: *chain_id,
    })?;

    let mut r = Runner {
        tracer: Tracer::new(),
        src,
        sink: &mut sink,
    };
    r.steps(steps)?;

    match sink(&Event::End { path: path.clone() })? {
        Output::Signature { signature, digest } => Ok(TxSignature { signature, digest }),
        _o => {
            #[cfg(feature = "log")]
            log::error!("unexpected output on completion: {:?}", _o);

            Err(Error::InternalAssertion)
        }
    }
}

struct Runner<'r, S, F> {
    tracer: Tracer,
    src: &'r mut S,
    sink: &'r mut F,
}

impl<'r, 'b, S, F> Runner<'r, S, F>
where
    S: Source<'b>,
    F: for<'e> FnMut(&Event<'e>) -> Result<Output<'e>, Error>,
{
    fn steps(&mut self, steps: &[Step]) -> Result<(), Error> {
        for s in steps {
            match s {
                Step::Field {
                    header,
                    encoding,
                    len,
                    policy,
                } => {
                    let body = self.src.body(header)?;
                    if body.len() != *len as usize {
                        #[cfg(feature = "log")]
                        log::error!("field {} length {} != {}", header, body.len(), len);

                        return Err(Error::MalformedData);
                    }

                    (self.sink)(&Event::SendData {
                        policy: *policy,
                        encoding: *encoding,
                        header,
                        body,
                    })?;
                    self.tracer.field(header, *encoding, *len, *policy);
                }
                Step::Section(children) => {
                    let length = s.body_len().ok_or(Error::UnsupportedOperation)?;

                    (self.sink)(&Event::StartSection { length })?;
                    self.tracer.start_section(length)?;

                    self.steps(children)?;

                    (self.sink)(&Event::EndSection)?;
                    self.tracer.end_section();
                }
                Step::Loop { min, max, variants } => self.for_loop(*min, *max, variants)?,
            }
        }

        Ok(())
    }

    fn for_loop(&mut self, min: u8, max: u8, variants: &[&[Step]]) -> Result<(), Error> {
        let (level, parent) = self.tracer.start_for(min, max)?;
        let set = self.tracer.iterations(level, &parent, variants, &mut |_| ())?;

        let set_digest = set.set_digest();
        let hashes = set.to_bytes()?;

        (self.sink)(&Event::StartFor {
            min,
            max,
            set_digest,
        })?;

        while let Some(v) = self.src.iteration()? {
            let variant = variants.get(v).ok_or(Error::RequestParameter)?;

            (self.sink)(&Event::StartIteration)?;
            self.tracer.shape.start_iteration(&parent, level);

            self.steps(variant)?;

            (self.sink)(&Event::EndIteration { hashes: &hashes })?;
            self.tracer.shape.end_iteration(level);
        }

        (self.sink)(&Event::EndFor)?;
        self.tracer.end_for(&parent, &set_digest, level);

        Ok(())
    }
}

/// Action data for `trnsfiopubky`, transfer tokens to a public key
static TRANSFER_DATA: [Step<'static>; 6] = [
    Step::hidden("pubkey_len", Encoding::UInt8, 1),
    Step::display("Payee pubkey", Encoding::String, 53),
    Step::display("Amount", Encoding::UInt64, 8),
    Step::display("Max fee", Encoding::UInt64, 8),
    Step::hidden("actor", Encoding::Hex, 8),
    Step::hidden("tpid_len", Encoding::UInt8, 1),
];

static TRANSFER_ACTION: [Step<'static>; 7] = [
    Step::hidden("contract", Encoding::Hex, 8),
    Step::hidden("action", Encoding::Hex, 8),
    Step::hidden("authorizations", Encoding::UInt8, 1),
    Step::hidden("actor", Encoding::Hex, 8),
    Step::hidden("permission", Encoding::Hex, 8),
    Step::hidden("data_len", Encoding::UInt8, 1),
    Step::Section(&TRANSFER_DATA),
];

static TRANSFER_VARIANTS: [&[Step<'static>]; 1] = [&TRANSFER_ACTION];

static TRNSFIOPUBKY: [Step<'static>; 9] = [
    Step::hidden("expiration", Encoding::UInt32, 4),
    Step::hidden("ref_block_num", Encoding::UInt16, 2),
    Step::hidden("ref_block_prefix", Encoding::UInt32, 4),
    Step::hidden("max_net_usage_words", Encoding::UInt8, 1),
    Step::hidden("max_cpu_usage_ms", Encoding::UInt8, 1),
    Step::hidden("delay_sec", Encoding::UInt8, 1),
    Step::hidden("context_free_actions", Encoding::UInt8, 1),
    Step::hidden("actions", Encoding::UInt8, 1),
    Step::Loop {
        min: 1,
        max: 1,
        variants: &TRANSFER_VARIANTS,
    },
];

/// Single-action `trnsfiopubky` transaction template
pub fn trnsfiopubky() -> &'static [Step<'static>] {
    &TRNSFIOPUBKY
}

#[cfg(test)]
mod test {
    extern crate std;

    use crate::engine::TRNSFIOPUBKY as TRNSFIOPUBKY_DIGEST;

    use super::*;

    fn h(s: &str) -> [u8; 32] {
        let mut b = [0u8; 32];
        hex::decode_to_slice(s, &mut b).unwrap();
        b
    }

    #[test]
    fn amount_digest() {
        let steps = [Step::hidden("Amount", Encoding::UInt64, 8)];

        assert_eq!(
            digest(&steps, 21).unwrap(),
            h("1246a2ebf86be6cbc95dda00ac063ddb52b2d0fc846134ec4ed1fb88c75a6e5d")
        );
    }

    #[test]
    fn trnsfiopubky_digest() {
        let path = Bip32Path::fio(0, 0);
        assert_eq!(path.wire_len(), 21);

        assert_eq!(
            digest(trnsfiopubky(), path.wire_len() as u8).unwrap(),
            TRNSFIOPUBKY_DIGEST
        );
    }

    #[test]
    fn trnsfiopubky_iterations() {
        let mut sets = std::vec::Vec::new();
        iteration_sets(trnsfiopubky(), |s| sets.push(s.clone())).unwrap();

        assert_eq!(sets.len(), 1);
        let s = &sets[0];

        assert_eq!(s.level, 1);
        assert_eq!(
            s.parent,
            h("cd6c77215a974312061f5e975addd00a6504c1424dbe49f49cf8bee23fa5ad9a")
        );
        assert_eq!(
            &s.hashes[..],
            &[h("4843ce1e8b022b56251303ff8f5f02e30caef693a95d6c047bdcbf981198d9a7")]
        );
        assert_eq!(
            s.set_digest(),
            h("5979f061db7648fc048bf9c83aa51cd341341f7357eb77ac491b68eaf75cc469")
        );
        assert_eq!(&s.to_bytes().unwrap()[..], &s.hashes[0][..]);
    }

    #[test]
    fn step_lengths() {
        assert_eq!(Step::Section(&TRANSFER_DATA).body_len(), Some(79));
        assert_eq!(TRNSFIOPUBKY[8].body_len(), Some(113));

        let variants: [&[Step]; 2] = [
            &[Step::hidden("a", Encoding::UInt8, 1)],
            &[Step::hidden("b", Encoding::UInt16, 2)],
        ];
        assert_eq!(
            Step::Loop {
                min: 1,
                max: 1,
                variants: &variants
            }
            .body_len(),
            None
        );
        assert_eq!(
            Step::Loop {
                min: 0,
                max: 2,
                variants: &variants[..1]
            }
            .body_len(),
            None
        );
        assert_eq!(
            Step::Loop {
                min: 3,
                max: 3,
                variants: &variants[..1]
            }
            .body_len(),
            Some(3)
        );
    }

    #[test]
    fn shape_ignores_values() {
        // Loop iteration counts do not change the template shape
        let variants: [&[Step]; 1] = [&[Step::hidden("n", Encoding::UInt8, 1)]];
        let steps = [Step::Loop {
            min: 0,
            max: 3,
            variants: &variants,
        }];

        let path = Bip32Path::fio(0, 0);
        let expected = digest(&steps, path.wire_len() as u8).unwrap();

        for n in 0..=3 {
            let bodies: std::vec::Vec<&[u8]> = (0..n).map(|_| &[7u8][..]).collect();
            let iterations: std::vec::Vec<_> = (0..n).map(|_| Some(0)).collect();
            let mut src = Values::new(&bodies, &iterations);

            let mut ended = false;
            let r = run(&[0u8; 32], &steps, &path, &mut src, |e| {
                if let Event::End { .. } = e {
                    ended = true;
                }
                Ok(Output::None)
            });

            // No signature from a plain sink
            assert_eq!(r, Err(Error::InternalAssertion));
            assert!(ended);
            assert!(src.is_consumed());
        }

        // Unsupported variant selection
        let mut src = Values::new(&[], &[Some(1)]);
        assert_eq!(
            run(&[0u8; 32], &steps, &path, &mut src, |_| Ok(Output::None)),
            Err(Error::RequestParameter)
        );
        assert_eq!(digest(&steps, 21), Ok(expected));
    }

    #[test]
    fn depth_limits() {
        static INNER: [Step; 0] = [];
        static S1: [Step; 1] = [Step::Section(&INNER)];
        static S2: [Step; 1] = [Step::Section(&S1)];
        static S3: [Step; 1] = [Step::Section(&S2)];
        static S4: [Step; 1] = [Step::Section(&S3)];
        static S5: [Step; 1] = [Step::Section(&S4)];
        static S6: [Step; 1] = [Step::Section(&S5)];
        static S7: [Step; 1] = [Step::Section(&S6)];

        assert!(digest(&S6, 21).is_ok());
        assert_eq!(digest(&S7, 21), Err(Error::ProtocolState));
    }
}
