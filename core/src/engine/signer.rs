// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Deterministic secp256k1 signing with canonical (low-S) retry.
//!
//! The first nonce is derived per RFC 6979 from the private key and message
//! digest; retries continue the HMAC-DRBG without the private key.

use hmac::{
    digest::{FixedOutputReset, Output},
    Hmac, Mac,
};
use k256::{
    elliptic_curve::{ops::Reduce, point::AffineCoordinates, scalar::IsHigh, Field, PrimeField},
    FieldBytes, ProjectivePoint, Scalar, U256,
};
use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use super::Error;

type HmacSha256 = Hmac<Sha256>;

/// Maximum number of nonces attempted before signing fails
pub const MAX_SIGN_ATTEMPTS: usize = 64;

/// Recovery id offset for compact signatures (`27 + 4`, compressed keys)
pub const RECOVERY_ID_OFFSET: u8 = 31;

/// secp256k1 private key, wiped on drop
#[derive(Clone)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    /// Create a private key from raw (big-endian) bytes
    pub const fn from_bytes(b: [u8; 32]) -> Self {
        Self(b)
    }

    /// Fetch raw private key bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for PrivateKey {
    fn from(b: [u8; 32]) -> Self {
        Self(b)
    }
}

impl core::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "PrivateKey(..)")
    }
}

impl Zeroize for PrivateKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl Drop for PrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// RFC 6979 HMAC-DRBG nonce generator
struct NonceGenerator {
    k: [u8; 32],
    v: [u8; 32],
}

impl NonceGenerator {
    /// Seed the generator from the private key and reduced message digest
    fn new(x: &[u8], h: &[u8]) -> Result<Self, Error> {
        let mut g = Self {
            k: [0x00; 32],
            v: [0x01; 32],
        };

        g.k = g.mac(&[&g.v, &[0x00], x, h])?;
        g.v = g.mac(&[&g.v])?;
        g.k = g.mac(&[&g.v, &[0x01], x, h])?;
        g.v = g.mac(&[&g.v])?;

        Ok(g)
    }

    fn mac(&self, parts: &[&[u8]]) -> Result<[u8; 32], Error> {
        let mut m = HmacSha256::new_from_slice(&self.k).map_err(|_| Error::InternalAssertion)?;
        for p in parts {
            m.update(p);
        }

        let mut out = [0u8; 32];
        m.finalize_into_reset(Output::<HmacSha256>::from_mut_slice(&mut out));

        // Keyed pads and buffered input (including the private key) remain in the HMAC state
        unsafe { zeroize::zeroize_flat_type(&mut m as *mut HmacSha256) };

        Ok(out)
    }

    /// Step the generator without key material
    fn reseed(&mut self) -> Result<(), Error> {
        self.k = self.mac(&[&self.v, &[0x00]])?;
        self.v = self.mac(&[&self.v])?;
        Ok(())
    }

    /// Generate the next nonce in `[1, n)`
    fn generate(&mut self) -> Result<Zeroizing<Scalar>, Error> {
        for _ in 0..MAX_SIGN_ATTEMPTS {
            self.v = self.mac(&[&self.v])?;

            if let Some(k) = scalar_from_bytes(&self.v) {
                return Ok(k);
            }

            self.reseed()?;
        }

        Err(Error::SigningFailed)
    }
}

impl Drop for NonceGenerator {
    fn drop(&mut self) {
        self.k.zeroize();
        self.v.zeroize();
    }
}

/// Parse a scalar in `[1, n)` from big-endian bytes
fn scalar_from_bytes(b: &[u8; 32]) -> Option<Zeroizing<Scalar>> {
    let mut repr = FieldBytes::default();
    repr.copy_from_slice(b);

    let s = Option::<Scalar>::from(Scalar::from_repr(repr))
        .filter(|s| !bool::from(s.is_zero()))
        .map(Zeroizing::new);

    repr.as_mut_slice().zeroize();

    s
}

/// Sign a 32-byte message digest, returning a compact recoverable
/// signature `31 + recovery_id | r | s` with `s` in the lower half of the order
#[cfg_attr(feature = "noinline", inline(never))]
pub fn sign(key: &PrivateKey, digest: &[u8; 32]) -> Result<[u8; 65], Error> {
    sign_bounded(key, digest, MAX_SIGN_ATTEMPTS)
}

pub(crate) fn sign_bounded(
    key: &PrivateKey,
    digest: &[u8; 32],
    attempts: usize,
) -> Result<[u8; 65], Error> {
    let x = scalar_from_bytes(&key.0).ok_or(Error::InternalAssertion)?;

    let z = <Scalar as Reduce<U256>>::reduce_bytes(&FieldBytes::from(*digest));

    let mut g = NonceGenerator::new(&key.0, &z.to_bytes())?;

    for i in 0..attempts {
        if i > 0 {
            g.reseed()?;
        }

        let k = g.generate()?;

        if let Some(sig) = sign_with_nonce(&x, &z, &k) {
            return Ok(sig);
        }

        #[cfg(feature = "log")]
        log::debug!("non-canonical signature on attempt {}, retrying", i);
    }

    #[cfg(feature = "log")]
    log::warn!("no canonical signature after {} attempts", attempts);

    Err(Error::SigningFailed)
}

/// Compute a signature candidate, `None` if the nonce is unusable or
/// the signature is not canonical
fn sign_with_nonce(x: &Scalar, z: &Scalar, k: &Scalar) -> Option<[u8; 65]> {
    let big_r = (ProjectivePoint::GENERATOR * k).to_affine();

    let r_x = big_r.x();
    let r = <Scalar as Reduce<U256>>::reduce_bytes(&r_x);
    if bool::from(r.is_zero()) {
        return None;
    }

    let k_inv = Option::<Scalar>::from(k.invert()).map(Zeroizing::new)?;
    let s = *k_inv * (*z + r * x);
    if bool::from(s.is_zero()) || bool::from(s.is_high()) {
        return None;
    }

    // Recovery id, y parity and whether x was reduced modulo n
    let x_reduced = r.to_bytes() != r_x;
    let recovery_id = big_r.y_is_odd().unwrap_u8() | (x_reduced as u8) << 1;

    let mut sig = [0u8; 65];
    sig[0] = RECOVERY_ID_OFFSET + recovery_id;
    sig[1..33].copy_from_slice(&r.to_bytes());
    sig[33..].copy_from_slice(&s.to_bytes());

    Some(sig)
}

#[cfg(test)]
mod test {
    use k256::ecdsa::{signature::hazmat::PrehashVerifier, RecoveryId, Signature, VerifyingKey};

    use super::*;

    const KEY: [u8; 32] = [
        0x4d, 0x59, 0x78, 0x99, 0xdb, 0x76, 0xe8, 0x79, 0x33, 0xe7, 0xc6, 0x84, 0x1c, 0x2d, 0x66,
        0x18, 0x10, 0xf0, 0x70, 0xba, 0xd2, 0x04, 0x87, 0xef, 0x20, 0xeb, 0x84, 0xe1, 0x82, 0x69,
        0x5a, 0x3a,
    ];

    fn verify(key: &PrivateKey, digest: &[u8; 32], sig: &[u8; 65]) {
        let sk = k256::ecdsa::SigningKey::from_bytes(&FieldBytes::from(*key.as_bytes())).unwrap();
        let vk = VerifyingKey::from(&sk);

        let s = Signature::from_slice(&sig[1..]).unwrap();
        assert!(s.normalize_s().is_none(), "signature is not low-S");

        vk.verify_prehash(digest, &s).unwrap();

        let recid = RecoveryId::from_byte(sig[0] - RECOVERY_ID_OFFSET).unwrap();
        let recovered = VerifyingKey::recover_from_prehash(digest, &s, recid).unwrap();
        assert_eq!(recovered, vk);
    }

    #[test]
    fn sign_verify_recover() {
        let key = PrivateKey::from_bytes(KEY);

        for i in 0..16u8 {
            let digest = [i; 32];
            let sig = sign(&key, &digest).unwrap();
            verify(&key, &digest, &sig);
        }
    }

    #[test]
    fn deterministic() {
        let key = PrivateKey::from_bytes(KEY);
        let digest = [0xab; 32];

        assert_eq!(sign(&key, &digest), sign(&key, &digest));
        assert_ne!(sign(&key, &digest), sign(&key, &[0xac; 32]));
    }

    #[test]
    fn random_keys() {
        for _ in 0..16 {
            let key = PrivateKey::from_bytes(rand::random());
            let digest: [u8; 32] = rand::random();

            let sig = sign(&key, &digest).unwrap();
            verify(&key, &digest, &sig);
        }
    }

    #[test]
    fn first_attempt_matches_rfc6979() {
        // Signatures accepted on the first attempt use the standard RFC 6979 nonce
        let key = PrivateKey::from_bytes(KEY);
        let sk = k256::ecdsa::SigningKey::from_bytes(&FieldBytes::from(KEY)).unwrap();

        for i in 0..8u8 {
            let digest = [i; 32];
            let (expected, _) = sk.sign_prehash_recoverable(&digest).unwrap();

            if let Ok(sig) = sign_bounded(&key, &digest, 1) {
                assert_eq!(&sig[1..], &expected.to_bytes()[..]);
            }
        }
    }

    #[test]
    fn retry_budget_exhaustion() {
        // The first three nonces for this digest produce high-S signatures
        let key = PrivateKey::from_bytes(KEY);
        let digest = [0x01; 32];

        for attempts in 0..=3 {
            assert_eq!(sign_bounded(&key, &digest, attempts), Err(Error::SigningFailed));
        }
        assert!(sign_bounded(&key, &digest, 4).is_ok());
    }

    #[test]
    fn retry_uses_keyless_reseed() {
        let key = PrivateKey::from_bytes(KEY);
        let digest = [0x01; 32];

        let sig = sign(&key, &digest).unwrap();
        verify(&key, &digest, &sig);

        // Canonical candidate from the fourth nonce
        let expected = hex::decode(concat!(
            "20",
            "cfdaf42931819f7c7b252b01b42b1bab69f490b709c18e292e8c7950c8625828",
            "20c0379ab4210d49a593f47ab9e568403d08c1e573d35d8517ca80f2ac3a8f32",
        ))
        .unwrap();
        assert_eq!(&sig[..], &expected[..]);

        // Not the (normalised) first attempt RFC 6979 signature
        let sk = k256::ecdsa::SigningKey::from_bytes(&FieldBytes::from(KEY)).unwrap();
        let (first, _) = sk.sign_prehash_recoverable(&digest).unwrap();
        assert_ne!(&sig[1..33], &first.r().to_bytes()[..]);
        assert_eq!(
            &first.r().to_bytes()[..],
            &hex::decode("fd3e46474e9ccbe38bcf19687ffd3550b095ae5643848c260285417c44dd6ec1")
                .unwrap()[..]
        );
    }

    #[test]
    fn invalid_keys() {
        assert_eq!(
            sign(&PrivateKey::from_bytes([0u8; 32]), &[0u8; 32]),
            Err(Error::InternalAssertion)
        );
        assert_eq!(
            sign(&PrivateKey::from_bytes([0xff; 32]), &[0u8; 32]),
            Err(Error::InternalAssertion)
        );
    }
}
