// Copyright (c) 2022-2023 The MobileCoin Foundation

/// Encoding helper for fixed-size byte arrays (pending nightly array constructors)
pub(crate) mod arr {
    use encdec::Error;

    pub fn enc<const N: usize>(d: &[u8; N], buff: &mut [u8]) -> Result<usize, Error> {
        if buff.len() < d.len() {
            return Err(Error::Length);
        }

        buff[..d.len()].copy_from_slice(&d[..]);

        Ok(d.len())
    }

    pub fn enc_len<const N: usize>(d: &[u8; N]) -> Result<usize, Error> {
        Ok(d.len())
    }

    pub fn dec<const N: usize>(buff: &[u8]) -> Result<([u8; N], usize), Error> {
        if buff.len() < N {
            return Err(Error::Length);
        }

        let mut d = [0u8; N];
        d.copy_from_slice(&buff[..N]);

        Ok((d, N))
    }
}

/// Encoding helper for big-endian integers
pub(crate) mod be {
    use byteorder::{BigEndian, ByteOrder};

    use crate::ApduError;

    pub fn enc_u64(v: u64, buff: &mut [u8]) -> Result<usize, ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        BigEndian::write_u64(buff, v);

        Ok(8)
    }

    pub fn dec_u64(buff: &[u8]) -> Result<(u64, usize), ApduError> {
        if buff.len() < 8 {
            return Err(ApduError::InvalidLength);
        }

        Ok((BigEndian::read_u64(buff), 8))
    }
}
