// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Audited transaction template digests
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct AllowList<'a>(&'a [[u8; 32]]);

/// Shape digest of a single-action `trnsfiopubky` transaction signed with a
/// depth 5 path, see [`crate::template::trnsfiopubky`]
pub const TRNSFIOPUBKY: [u8; 32] = [
    0xe9, 0xb4, 0x7d, 0xb4, 0x76, 0xb1, 0x05, 0xcb, 0xd6, 0xaa, 0x91, 0x53, 0xe5, 0x5a, 0x4d, 0x6b,
    0x39, 0x70, 0xbc, 0x75, 0x4e, 0x03, 0x96, 0x5a, 0xfa, 0xe1, 0xfc, 0xb2, 0x65, 0xf6, 0xef, 0xfc,
];

/// Built-in template allow-list
pub const ALLOWED_TEMPLATES: AllowList<'static> = AllowList::new(&[TRNSFIOPUBKY]);

impl<'a> AllowList<'a> {
    /// Create an allow-list from a table of template digests
    pub const fn new(digests: &'a [[u8; 32]]) -> Self {
        Self(digests)
    }

    /// Check whether a shape digest is allowed.
    ///
    /// Every entry is compared in full.
    pub fn contains(&self, digest: &[u8; 32]) -> bool {
        self.0
            .iter()
            .fold(false, |found, d| found | (d[..] == digest[..]))
    }

    /// Fetch allowed template digests
    pub fn digests(&self) -> &'a [[u8; 32]] {
        self.0
    }
}

impl Default for AllowList<'static> {
    fn default() -> Self {
        ALLOWED_TEMPLATES
    }
}
