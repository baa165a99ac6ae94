// Author: dWallet Labs, LTD.
// SPDX-License-Identifier: Apache-2.0

//! The HPKE (RFC 9180) labeled extract/expand key schedule, restricted to
//! base-nonce derivation in mode `0x00`, under an unregistered ciphersuite.

use std::marker::PhantomData;

use hkdf::Hkdf;
use sha2::Sha256;

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum Error {
    #[error("integer does not fit in the requested encoding width")]
    IntegerTooLarge,

    #[error("requested output length exceeds the two-byte length field")]
    OutputTooLong,

    #[error("key derivation failed")]
    KeyDerivation,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Domain-separation prefix of every labeled derivation.
pub const HPKE_V1_LABEL: &[u8] = b"HPKE-v1";

pub const PSK_ID_HASH_LABEL: &[u8] = b"psk_id_hash";
pub const INFO_HASH_LABEL: &[u8] = b"info_hash";
pub const SECRET_LABEL: &[u8] = b"secret";
pub const BASE_NONCE_LABEL: &[u8] = b"base_nonce";

/// Mode `0x00`: encryption to a public key, without a pre-shared key.
pub const MODE_BASE: u8 = 0x00;

/// Both empty: mode `0x00` uses no pre-shared key.
pub const PSK: &[u8] = &[];
pub const PSK_ID: &[u8] = &[];

/// KEM id of the curve-native DHKEM, deliberately outside the registered
/// range so the suite cannot collide with a standard one.
pub const KEM_ID: u16 = 0xffaa;

/// HKDF-SHA256.
pub const KDF_ID: u16 = 0x0001;

/// ChaCha20Poly1305.
pub const AEAD_ID: u16 = 0x0003;

pub const SUITE_ID_LENGTH: usize = 10;

/// Builds the `"HPKE" || I2OSP(kem, 2) || I2OSP(kdf, 2) || I2OSP(aead, 2)`
/// suite identifier.
pub const fn suite_id(kem_id: u16, kdf_id: u16, aead_id: u16) -> [u8; SUITE_ID_LENGTH] {
    let kem = kem_id.to_be_bytes();
    let kdf = kdf_id.to_be_bytes();
    let aead = aead_id.to_be_bytes();

    [
        b'H', b'P', b'K', b'E', kem[0], kem[1], kdf[0], kdf[1], aead[0], aead[1],
    ]
}

/// The suite identifier of this crate's ciphersuite.
pub const SUITE_ID: [u8; SUITE_ID_LENGTH] = suite_id(KEM_ID, KDF_ID, AEAD_ID);

/// Encodes a non-negative integer big-endian in exactly `length` bytes,
/// failing with [`Error::IntegerTooLarge`] if it does not fit.
pub fn i2osp(value: u64, length: usize) -> Result<Vec<u8>> {
    let be_bytes = value.to_be_bytes();

    if length < be_bytes.len() && value >> (8 * length) != 0 {
        return Err(Error::IntegerTooLarge);
    }

    let mut output = vec![0u8; length];
    if length < be_bytes.len() {
        output.copy_from_slice(&be_bytes[be_bytes.len() - length..]);
    } else {
        output[length - be_bytes.len()..].copy_from_slice(&be_bytes);
    }

    Ok(output)
}

/// The narrow extract-and-expand contract the key schedule consumes.
pub trait HpkeKdf {
    /// `extract(ikm, salt) -> prk`.
    fn extract(ikm: &[u8], salt: Option<&[u8]>) -> Vec<u8>;

    /// `expand(prk, output_length, info)`, producing exactly
    /// `output_length` bytes.
    fn expand(prk: &[u8], output_length: usize, info: Option<&[u8]>) -> Result<Vec<u8>>;
}

/// HKDF over SHA-256.
pub struct HkdfSha256;

impl HpkeKdf for HkdfSha256 {
    fn extract(ikm: &[u8], salt: Option<&[u8]>) -> Vec<u8> {
        let (prk, _) = Hkdf::<Sha256>::extract(salt, ikm);

        prk.to_vec()
    }

    fn expand(prk: &[u8], output_length: usize, info: Option<&[u8]>) -> Result<Vec<u8>> {
        let kdf = Hkdf::<Sha256>::from_prk(prk).map_err(|_| Error::KeyDerivation)?;

        let mut output = vec![0u8; output_length];
        kdf.expand(info.unwrap_or(&[]), &mut output)
            .map_err(|_| Error::KeyDerivation)?;

        Ok(output)
    }
}

/// The labeled extract/expand schedule for a fixed suite identifier.
///
/// Stateless apart from the suite identifier; [`Default`] uses the crate's
/// [`SUITE_ID`]. Tests exercising a different suite construct their own
/// identifier rather than mutating a shared one.
pub struct KeySchedule<K: HpkeKdf = HkdfSha256> {
    suite_id: [u8; SUITE_ID_LENGTH],
    _kdf: PhantomData<K>,
}

impl<K: HpkeKdf> Default for KeySchedule<K> {
    fn default() -> Self {
        Self::new(SUITE_ID)
    }
}

impl<K: HpkeKdf> KeySchedule<K> {
    pub const fn new(suite_id: [u8; SUITE_ID_LENGTH]) -> Self {
        Self {
            suite_id,
            _kdf: PhantomData,
        }
    }

    /// `Extract(salt, "HPKE-v1" || suite_id || label || ikm)`.
    pub fn labeled_extract(&self, label: &[u8], ikm: &[u8], salt: Option<&[u8]>) -> Vec<u8> {
        let labeled_ikm = [HPKE_V1_LABEL, &self.suite_id, label, ikm].concat();

        K::extract(&labeled_ikm, salt)
    }

    /// `Expand(prk, I2OSP(L, 2) || "HPKE-v1" || suite_id || label || info, L)`,
    /// failing with [`Error::OutputTooLong`] when `L` exceeds the two-byte
    /// length field's capacity.
    pub fn labeled_expand(
        &self,
        label: &[u8],
        prk: &[u8],
        output_length: usize,
        info: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        if output_length > 1 << 16 {
            return Err(Error::OutputTooLong);
        }

        let length_prefix = i2osp(output_length as u64, 2)?;
        let labeled_info = [
            length_prefix.as_slice(),
            HPKE_V1_LABEL,
            &self.suite_id,
            label,
            info.unwrap_or(&[]),
        ]
        .concat();

        K::expand(prk, output_length, Some(&labeled_info))
    }

    /// Derives the AEAD base nonce from `shared_secret` per the RFC 9180 key
    /// schedule, specialized to mode `0x00` with empty pre-shared-key
    /// inputs.
    pub fn derive_base_nonce(
        &self,
        shared_secret: &[u8],
        nonce_length: usize,
        info: &[u8],
    ) -> Result<Vec<u8>> {
        let psk_id_hash = self.labeled_extract(PSK_ID_HASH_LABEL, PSK_ID, None);
        let info_hash = self.labeled_extract(INFO_HASH_LABEL, info, None);

        // key_schedule_context = mode || psk_id_hash || info_hash
        let context = [&[MODE_BASE][..], &psk_id_hash, &info_hash].concat();

        let secret = self.labeled_extract(SECRET_LABEL, PSK, Some(shared_secret));

        self.labeled_expand(BASE_NONCE_LABEL, &secret, nonce_length, Some(&context))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn suite_id_layout() {
        assert_eq!(
            SUITE_ID,
            [b'H', b'P', b'K', b'E', 0xff, 0xaa, 0x00, 0x01, 0x00, 0x03]
        );
    }

    #[rstest]
    #[case(0xffaa, 2, &[0xff, 0xaa])]
    #[case(0, 1, &[0x00])]
    #[case(255, 1, &[0xff])]
    #[case(1, 9, &[0, 0, 0, 0, 0, 0, 0, 0, 1])]
    fn i2osp_encodes_fitting_integers(
        #[case] value: u64,
        #[case] length: usize,
        #[case] expected: &[u8],
    ) {
        assert_eq!(i2osp(value, length).unwrap(), expected);
    }

    #[rstest]
    #[case(256, 1)]
    #[case(65536, 2)]
    fn i2osp_rejects_oversized_integers(#[case] value: u64, #[case] length: usize) {
        assert_eq!(i2osp(value, length), Err(Error::IntegerTooLarge));
    }

    #[test]
    fn base_nonce_derivation_matches_the_rfc_9180_test_vector() {
        // The DHKEM(X25519, HKDF-SHA256)/HKDF-SHA256/ChaCha20Poly1305 base
        // setup vector of RFC 9180 appendix A.2.
        let schedule: KeySchedule = KeySchedule::new(suite_id(0x0020, 0x0001, 0x0003));

        let info = b"Ode on a Grecian Urn";
        let shared_secret = [
            0x0b, 0xbe, 0x78, 0x49, 0x04, 0x12, 0xb4, 0xbb, 0xea, 0x48, 0x12, 0x66, 0x6f, 0x79,
            0x16, 0x93, 0x2b, 0x82, 0x8b, 0xba, 0x79, 0x94, 0x24, 0x24, 0xab, 0xb6, 0x52, 0x44,
            0x93, 0x0d, 0x69, 0xa7,
        ];
        let expected_nonce = [
            0x5c, 0x4d, 0x98, 0x15, 0x06, 0x61, 0xb8, 0x48, 0x85, 0x3b, 0x54, 0x7f,
        ];

        assert_eq!(
            schedule
                .derive_base_nonce(&shared_secret, expected_nonce.len(), info)
                .unwrap(),
            expected_nonce
        );
    }

    #[test]
    fn base_nonce_derivation_is_deterministic() {
        let schedule: KeySchedule = KeySchedule::default();

        let first = schedule.derive_base_nonce(&[0x42; 32], 12, &[]).unwrap();
        let second = schedule.derive_base_nonce(&[0x42; 32], 12, &[]).unwrap();

        assert_eq!(first.len(), 12);
        assert_eq!(first, second);
        assert_ne!(first, schedule.derive_base_nonce(&[0x43; 32], 12, &[]).unwrap());
    }

    #[test]
    fn labeled_extract_separates_domains() {
        let schedule: KeySchedule = KeySchedule::default();

        assert_ne!(
            schedule.labeled_extract(PSK_ID_HASH_LABEL, &[], None),
            schedule.labeled_extract(INFO_HASH_LABEL, &[], None)
        );
    }

    #[test]
    fn labeled_expand_rejects_oversized_outputs() {
        let schedule: KeySchedule = KeySchedule::default();
        let prk = schedule.labeled_extract(SECRET_LABEL, &[], None);

        assert_eq!(
            schedule.labeled_expand(BASE_NONCE_LABEL, &prk, 65537, None),
            Err(Error::OutputTooLong)
        );
    }
}
