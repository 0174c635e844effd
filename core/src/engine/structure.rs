// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Counted section and bounded loop tracking.
//!
//! Checks are always completed before any frame is modified, so a failed
//! operation leaves the structure unchanged.

use heapless::Vec;
use zeroize::Zeroize;

use super::{Error, MAX_LOOP_DEPTH, MAX_SECTION_DEPTH};

/// Declared-length region
#[derive(Clone, PartialEq, Debug, Default)]
pub struct CountedSection {
    /// Length declared on open
    pub declared: u64,
    /// Body bytes received so far (including closed child sections)
    pub accumulated: u64,
    /// 1-based nesting level
    pub level: u8,
    /// Loop depth when opened, loops opened within the section must close first
    pub loop_depth: u8,
}

/// Bounded loop
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ForBlock {
    /// Minimum iteration count
    pub min: u8,
    /// Maximum iteration count
    pub max: u8,
    /// Iterations started so far
    pub count: u8,
    /// Whether an iteration is in progress
    pub in_iteration: bool,
    /// Shape digest prior to the loop
    pub parent: [u8; 32],
    /// Digest over the allowed iteration hashes
    pub set_digest: [u8; 32],
    /// 1-based nesting level
    pub level: u8,
    /// Section depth when opened, sections opened within an iteration must close first
    pub section_depth: u8,
}

/// Section and loop stacks for a signing session
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Structure {
    sections: Vec<CountedSection, MAX_SECTION_DEPTH>,
    loops: Vec<ForBlock, MAX_LOOP_DEPTH>,
}

impl Structure {
    /// Create an empty structure
    pub const fn new() -> Self {
        Self {
            sections: Vec::new(),
            loops: Vec::new(),
        }
    }

    /// Current section depth
    pub fn section_depth(&self) -> u8 {
        self.sections.len() as u8
    }

    /// Current loop depth
    pub fn loop_depth(&self) -> u8 {
        self.loops.len() as u8
    }

    /// Fetch the innermost open section
    pub fn section(&self) -> Option<&CountedSection> {
        self.sections.last()
    }

    /// Fetch the innermost open loop
    pub fn current_loop(&self) -> Option<&ForBlock> {
        self.loops.last()
    }

    /// Check whether no sections or loops remain open
    pub fn is_closed(&self) -> bool {
        self.sections.is_empty() && self.loops.is_empty()
    }

    /// Fields and nested structures may only be added outside loops
    /// or within a running iteration
    fn check_body_allowed(&self) -> Result<(), Error> {
        match self.loops.last() {
            Some(l) if !l.in_iteration => Err(Error::ProtocolState),
            _ => Ok(()),
        }
    }

    /// Open a counted section, returning its level
    pub fn start_section(&mut self, declared: u64) -> Result<u8, Error> {
        self.check_body_allowed()?;

        if self.sections.is_full() {
            return Err(Error::ProtocolState);
        }

        let level = self.section_depth() + 1;
        let s = CountedSection {
            declared,
            accumulated: 0,
            level,
            loop_depth: self.loop_depth(),
        };
        self.sections.push(s).map_err(|_| Error::InternalAssertion)?;

        Ok(level)
    }

    /// Account for a field body, returning the current section level
    pub fn add_data(&mut self, body_len: usize) -> Result<u8, Error> {
        self.check_body_allowed()?;

        let level = self.section_depth();

        if let Some(s) = self.sections.last_mut() {
            let accumulated = s
                .accumulated
                .checked_add(body_len as u64)
                .filter(|a| *a <= s.declared)
                .ok_or(Error::ProtocolState)?;

            s.accumulated = accumulated;
        }

        Ok(level)
    }

    /// Close the innermost counted section, returning its level
    pub fn end_section(&mut self) -> Result<u8, Error> {
        let (s, parent) = match self.sections.len() {
            0 => return Err(Error::ProtocolState),
            1 => (&self.sections[0], None),
            n => (&self.sections[n - 1], Some(&self.sections[n - 2])),
        };

        // Loops opened within the section must be closed
        if s.loop_depth != self.loop_depth() || s.accumulated != s.declared {
            return Err(Error::ProtocolState);
        }

        // Propagate length to parent
        let parent_accumulated = match parent {
            Some(p) => Some(
                p.accumulated
                    .checked_add(s.accumulated)
                    .filter(|a| *a <= p.declared)
                    .ok_or(Error::ProtocolState)?,
            ),
            None => None,
        };

        let level = s.level;

        self.sections.pop();
        if let (Some(p), Some(a)) = (self.sections.last_mut(), parent_accumulated) {
            p.accumulated = a;
        }

        Ok(level)
    }

    /// Check a loop may be opened, returning its level
    pub fn check_start_for(&self, min: u8, max: u8) -> Result<u8, Error> {
        self.check_body_allowed()?;

        if self.loops.is_full() || min > max {
            return Err(Error::ProtocolState);
        }

        Ok(self.loop_depth() + 1)
    }

    /// Open a loop (following [`Structure::check_start_for`])
    pub fn start_for(
        &mut self,
        min: u8,
        max: u8,
        parent: [u8; 32],
        set_digest: [u8; 32],
    ) -> Result<u8, Error> {
        let level = self.check_start_for(min, max)?;

        let l = ForBlock {
            min,
            max,
            count: 0,
            in_iteration: false,
            parent,
            set_digest,
            level,
            section_depth: self.section_depth(),
        };
        self.loops.push(l).map_err(|_| Error::InternalAssertion)?;

        Ok(level)
    }

    /// Start an iteration of the innermost loop
    pub fn start_iteration(&mut self) -> Result<&ForBlock, Error> {
        let l = self.loops.last_mut().ok_or(Error::ProtocolState)?;

        if l.in_iteration || l.count >= l.max {
            return Err(Error::ProtocolState);
        }

        l.count += 1;
        l.in_iteration = true;

        Ok(l)
    }

    /// Check the current iteration of the innermost loop may be finished
    pub fn check_end_iteration(&self) -> Result<&ForBlock, Error> {
        let l = self.loops.last().ok_or(Error::ProtocolState)?;

        // Sections opened within the iteration must be closed
        if !l.in_iteration || l.section_depth != self.section_depth() {
            return Err(Error::ProtocolState);
        }

        Ok(l)
    }

    /// Finish the current iteration (following [`Structure::check_end_iteration`])
    pub fn end_iteration(&mut self) -> Result<(), Error> {
        self.check_end_iteration()?;

        let l = self.loops.last_mut().ok_or(Error::InternalAssertion)?;
        l.in_iteration = false;

        Ok(())
    }

    /// Close the innermost loop, returning the closed frame
    pub fn end_for(&mut self) -> Result<ForBlock, Error> {
        let l = self.loops.last().ok_or(Error::ProtocolState)?;

        if l.in_iteration || l.count < l.min || l.count > l.max {
            return Err(Error::ProtocolState);
        }

        self.loops.pop().ok_or(Error::InternalAssertion)
    }
}

impl Zeroize for Structure {
    fn zeroize(&mut self) {
        for s in self.sections.iter_mut() {
            s.declared.zeroize();
            s.accumulated.zeroize();
        }
        for l in self.loops.iter_mut() {
            l.parent.zeroize();
            l.set_digest.zeroize();
        }
        self.sections.clear();
        self.loops.clear();
    }
}
