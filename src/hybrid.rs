// Author: dWallet Labs, LTD.
// SPDX-License-Identifier: Apache-2.0

//! Hybrid public-key encryption requiring the sender to prove knowledge of
//! the encapsulated secret.
//!
//! Plain HPKE only binds the receiver to "someone who knows
//! $g^{\textit{ephemeral}} \cdot g^{\textit{receiver}}$", not to sender
//! knowledge of the ephemeral discrete log. Here the ephemeral secret is
//! carried inside the plaintext and re-checked against the encapsulation on
//! decryption, closing that gap for a few extra plaintext bytes and one
//! extra scalar multiplication.

use std::marker::PhantomData;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use crypto_bigint::{rand_core::CryptoRngCore, Encoding, Uint};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{
    curve::{AffinePoint, TwistedEdwardsCurve},
    field::FieldElement,
    hpke,
    hpke::{HkdfSha256, HpkeKdf, KeySchedule},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Any decryption failure: a malformed encapsulation, an AEAD
    /// authentication failure, or a sender-binding mismatch. Deliberately
    /// indistinguishable so that neither the error content nor its timing
    /// reveals the cause.
    #[error("failed to decrypt")]
    Decryption,

    #[error("failed to encrypt")]
    Encryption,

    #[error("key schedule error")]
    KeySchedule(#[from] hpke::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// The two opaque byte strings produced by [`HybridCipher::encrypt`].
///
/// `encapsulated_secret_bytes` is a fixed-width point encoding of length
/// twice the base field's byte length. There is no version tag; versioning
/// belongs to the calling protocol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HybridCiphertext {
    pub ciphertext_bytes: Vec<u8>,
    pub encapsulated_secret_bytes: Vec<u8>,
}

/// The narrow seal/open contract of the external AEAD.
pub trait AeadScheme {
    const KEY_LENGTH: usize;
    const NONCE_LENGTH: usize;

    /// `seal(key, nonce, plaintext) -> ciphertext || tag`.
    fn seal(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// `open(key, nonce, ciphertext || tag) -> plaintext`, failing on an
    /// authentication failure.
    fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// ChaCha20Poly1305 with a 256-bit key and a 96-bit nonce.
pub struct ChaCha20Poly1305Scheme;

impl AeadScheme for ChaCha20Poly1305Scheme {
    const KEY_LENGTH: usize = 32;
    const NONCE_LENGTH: usize = 12;

    fn seal(key: &[u8], nonce: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        ChaCha20Poly1305::new(Key::from_slice(key))
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|_| Error::Encryption)
    }

    fn open(key: &[u8], nonce: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        ChaCha20Poly1305::new(Key::from_slice(key))
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map(Zeroizing::new)
            .map_err(|_| Error::Decryption)
    }
}

/// Hybrid public-key encryption over a twisted Edwards curve.
///
/// Combines ephemeral key encapsulation on the curve, the HPKE key schedule
/// for nonce derivation and an AEAD for the payload.
pub struct HybridCipher<
    const LIMBS: usize,
    Kdf: HpkeKdf = HkdfSha256,
    Aead: AeadScheme = ChaCha20Poly1305Scheme,
> {
    curve: TwistedEdwardsCurve<LIMBS>,
    ephemeral_secret_entropy_bytes: usize,
    key_schedule: KeySchedule<Kdf>,
    _aead: PhantomData<Aead>,
}

impl<const LIMBS: usize, Kdf: HpkeKdf, Aead: AeadScheme> HybridCipher<LIMBS, Kdf, Aead>
where
    Uint<LIMBS>: Encoding,
{
    /// `ephemeral_secret_entropy_bytes` of fresh randomness are reduced
    /// modulo the scalar field's order to derive each ephemeral secret, so
    /// it must be substantially larger than the scalar field's byte length
    /// for the reduced scalar to be near-uniform (64 bytes for a 32-byte
    /// scalar field).
    pub fn new(curve: TwistedEdwardsCurve<LIMBS>, ephemeral_secret_entropy_bytes: usize) -> Self {
        Self {
            curve,
            ephemeral_secret_entropy_bytes,
            key_schedule: KeySchedule::default(),
            _aead: PhantomData,
        }
    }

    /// Encrypts `message` to `receiver_public_key`, which is the receiver's
    /// secret scalar times the curve's base point.
    pub fn encrypt(
        &self,
        rng: &mut impl CryptoRngCore,
        message: &[u8],
        receiver_public_key: &AffinePoint<LIMBS>,
    ) -> Result<HybridCiphertext> {
        let scalar_field = self.curve.scalar_field();

        // Sample the ephemeral secret from surplus entropy.
        let mut entropy = Zeroizing::new(vec![0u8; self.ephemeral_secret_entropy_bytes]);
        rng.fill_bytes(&mut entropy);
        let ephemeral_secret = scalar_field.from_entropy(&entropy);

        // plaintext = ephemeral secret || message
        let ephemeral_secret_bytes = Zeroizing::new(scalar_field.to_bytes(&ephemeral_secret));
        let mut plaintext =
            Zeroizing::new(Vec::with_capacity(ephemeral_secret_bytes.len() + message.len()));
        plaintext.extend_from_slice(&ephemeral_secret_bytes);
        plaintext.extend_from_slice(message);

        let encapsulated_secret = self
            .curve
            .scalar_mul(&self.curve.base_point(), &ephemeral_secret.value());
        let shared_secret = self
            .curve
            .scalar_mul(receiver_public_key, &ephemeral_secret.value());

        let encapsulated_secret_bytes = self.curve.to_bytes(&encapsulated_secret);
        let shared_secret_bytes = Zeroizing::new(self.curve.to_bytes(&shared_secret));

        let (key, nonce) =
            self.derive_key_and_nonce(&encapsulated_secret_bytes, &shared_secret_bytes)?;
        let ciphertext_bytes = Aead::seal(&key, &nonce, &plaintext)?;

        Ok(HybridCiphertext {
            ciphertext_bytes,
            encapsulated_secret_bytes,
        })
    }

    /// Decrypts `ciphertext` with the receiver's secret scalar, requiring
    /// additionally that the sender knew the discrete log of the
    /// encapsulated point.
    pub fn decrypt(
        &self,
        ciphertext: &HybridCiphertext,
        receiver_private_key: &FieldElement<LIMBS>,
    ) -> Result<Vec<u8>> {
        let scalar_field = self.curve.scalar_field();

        let encapsulated_secret = self
            .curve
            .from_bytes(&ciphertext.encapsulated_secret_bytes)
            .ok_or(Error::Decryption)?;

        let shared_secret = self
            .curve
            .scalar_mul(&encapsulated_secret, &receiver_private_key.value());
        let shared_secret_bytes = Zeroizing::new(self.curve.to_bytes(&shared_secret));

        let (key, nonce) = self
            .derive_key_and_nonce(&ciphertext.encapsulated_secret_bytes, &shared_secret_bytes)
            .map_err(|_| Error::Decryption)?;

        let plaintext = Aead::open(&key, &nonce, &ciphertext.ciphertext_bytes)
            .map_err(|_| Error::Decryption)?;

        if plaintext.len() < scalar_field.num_bytes() {
            return Err(Error::Decryption);
        }
        let (ephemeral_secret_bytes, message) = plaintext.split_at(scalar_field.num_bytes());
        let ephemeral_secret = scalar_field
            .from_bytes(ephemeral_secret_bytes)
            .ok_or(Error::Decryption)?;

        // The sender must have known the discrete log of the encapsulated
        // point, not merely supplied a syntactically valid point.
        let expected_encapsulation = self
            .curve
            .scalar_mul(&self.curve.base_point(), &ephemeral_secret.value());
        if !bool::from(expected_encapsulation.ct_eq(&encapsulated_secret)) {
            return Err(Error::Decryption);
        }

        Ok(message.to_vec())
    }

    // Derives the AEAD key from the unlabeled extract/expand of
    // `encapsulated || shared`, and the nonce from the labeled schedule
    // salted with the shared-secret encoding.
    fn derive_key_and_nonce(
        &self,
        encapsulated_secret_bytes: &[u8],
        shared_secret_bytes: &[u8],
    ) -> Result<(Zeroizing<Vec<u8>>, Vec<u8>)> {
        let mut ikm = Zeroizing::new(Vec::with_capacity(
            encapsulated_secret_bytes.len() + shared_secret_bytes.len(),
        ));
        ikm.extend_from_slice(encapsulated_secret_bytes);
        ikm.extend_from_slice(shared_secret_bytes);

        let prk = Zeroizing::new(Kdf::extract(&ikm, None));
        let key = Zeroizing::new(Kdf::expand(&prk, Aead::KEY_LENGTH, None)?);

        let nonce =
            self.key_schedule
                .derive_base_nonce(shared_secret_bytes, Aead::NONCE_LENGTH, &[])?;

        Ok((key, nonce))
    }
}

#[cfg(test)]
mod tests {
    use crypto_bigint::U256;
    use rand_core::{OsRng, RngCore};
    use rstest::rstest;

    use super::*;
    use crate::curve::baby_jub_jub;

    const LIMBS: usize = U256::LIMBS;

    const ENTROPY_BYTES: usize = 64;

    fn cipher() -> HybridCipher<LIMBS> {
        HybridCipher::new(baby_jub_jub::curve(), ENTROPY_BYTES)
    }

    fn receiver_keypair(
        curve: &TwistedEdwardsCurve<LIMBS>,
    ) -> (FieldElement<LIMBS>, AffinePoint<LIMBS>) {
        let mut entropy = [0u8; ENTROPY_BYTES];
        OsRng.fill_bytes(&mut entropy);

        let private_key = curve.scalar_field().from_entropy(&entropy);
        let public_key = curve.scalar_mul(&curve.base_point(), &private_key.value());

        (private_key, public_key)
    }

    #[test]
    fn encrypts_and_decrypts_messages() {
        let cipher = cipher();
        let (private_key, public_key) = receiver_keypair(&cipher.curve);

        let message = "Kaizoku o ni ore wa naru!".as_bytes();
        let ciphertext = cipher.encrypt(&mut OsRng, message, &public_key).unwrap();

        assert_eq!(
            ciphertext.encapsulated_secret_bytes.len(),
            cipher.curve.encoded_point_length()
        );
        assert_eq!(cipher.decrypt(&ciphertext, &private_key).unwrap(), message);
    }

    #[test]
    fn encrypts_and_decrypts_the_empty_message() {
        let cipher = cipher();
        let (private_key, public_key) = receiver_keypair(&cipher.curve);

        let ciphertext = cipher.encrypt(&mut OsRng, &[], &public_key).unwrap();

        assert_eq!(cipher.decrypt(&ciphertext, &private_key).unwrap(), Vec::<u8>::new());
    }

    #[rstest]
    #[case(0)]
    #[case(16)]
    #[case(40)]
    fn fails_to_decrypt_a_tampered_ciphertext(#[case] index: usize) {
        let cipher = cipher();
        let (private_key, public_key) = receiver_keypair(&cipher.curve);

        let message = b"attack at dawn";
        let mut ciphertext = cipher.encrypt(&mut OsRng, message, &public_key).unwrap();
        ciphertext.ciphertext_bytes[index] ^= 0x01;

        assert!(matches!(
            cipher.decrypt(&ciphertext, &private_key),
            Err(Error::Decryption)
        ));
    }

    #[test]
    fn fails_to_decrypt_the_last_ciphertext_byte_tampered() {
        let cipher = cipher();
        let (private_key, public_key) = receiver_keypair(&cipher.curve);

        let mut ciphertext = cipher.encrypt(&mut OsRng, b"attack at dawn", &public_key).unwrap();
        let last = ciphertext.ciphertext_bytes.len() - 1;
        ciphertext.ciphertext_bytes[last] ^= 0x80;

        assert!(matches!(
            cipher.decrypt(&ciphertext, &private_key),
            Err(Error::Decryption)
        ));
    }

    #[test]
    fn fails_to_decrypt_a_tampered_encapsulation() {
        let cipher = cipher();
        let (private_key, public_key) = receiver_keypair(&cipher.curve);

        let mut ciphertext = cipher.encrypt(&mut OsRng, b"attack at dawn", &public_key).unwrap();
        ciphertext.encapsulated_secret_bytes[0] ^= 0x01;

        assert!(matches!(
            cipher.decrypt(&ciphertext, &private_key),
            Err(Error::Decryption)
        ));
    }

    #[rstest]
    #[case(0)]
    #[case(63)]
    #[case(65)]
    fn fails_to_decrypt_a_truncated_encapsulation(#[case] length: usize) {
        let cipher = cipher();
        let (private_key, public_key) = receiver_keypair(&cipher.curve);

        let mut ciphertext = cipher.encrypt(&mut OsRng, b"attack at dawn", &public_key).unwrap();
        ciphertext.encapsulated_secret_bytes.resize(length, 0);

        assert!(matches!(
            cipher.decrypt(&ciphertext, &private_key),
            Err(Error::Decryption)
        ));
    }

    #[test]
    fn fails_to_decrypt_with_the_wrong_private_key() {
        let cipher = cipher();
        let (_, public_key) = receiver_keypair(&cipher.curve);
        let (other_private_key, _) = receiver_keypair(&cipher.curve);

        let ciphertext = cipher.encrypt(&mut OsRng, b"attack at dawn", &public_key).unwrap();

        assert!(matches!(
            cipher.decrypt(&ciphertext, &other_private_key),
            Err(Error::Decryption)
        ));
    }

    #[test]
    fn fails_to_decrypt_when_the_sender_did_not_know_the_ephemeral_secret() {
        let cipher = cipher();
        let curve = &cipher.curve;
        let scalar_field = curve.scalar_field();
        let (private_key, public_key) = receiver_keypair(curve);

        // A well-formed AEAD payload whose embedded scalar is not the
        // discrete log of the encapsulated point.
        let (ephemeral_secret, _) = receiver_keypair(curve);
        let (unrelated_secret, _) = receiver_keypair(curve);

        let encapsulated = curve.scalar_mul(&curve.base_point(), &ephemeral_secret.value());
        let shared = curve.scalar_mul(&public_key, &ephemeral_secret.value());

        let mut plaintext = scalar_field.to_bytes(&unrelated_secret);
        plaintext.extend_from_slice(b"attack at dawn");

        let encapsulated_secret_bytes = curve.to_bytes(&encapsulated);
        let (key, nonce) = cipher
            .derive_key_and_nonce(&encapsulated_secret_bytes, &curve.to_bytes(&shared))
            .unwrap();
        let ciphertext = HybridCiphertext {
            ciphertext_bytes: ChaCha20Poly1305Scheme::seal(&key, &nonce, &plaintext).unwrap(),
            encapsulated_secret_bytes,
        };

        assert!(matches!(
            cipher.decrypt(&ciphertext, &private_key),
            Err(Error::Decryption)
        ));
    }

    #[test]
    fn ciphertexts_round_trip_through_serde() {
        let cipher = cipher();
        let (private_key, public_key) = receiver_keypair(&cipher.curve);

        let message = b"attack at dawn";
        let ciphertext = cipher.encrypt(&mut OsRng, message, &public_key).unwrap();

        let serialized = serde_json::to_string(&ciphertext).unwrap();
        let deserialized: HybridCiphertext = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized, ciphertext);
        assert_eq!(cipher.decrypt(&deserialized, &private_key).unwrap(), message);
    }
}
