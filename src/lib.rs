// Author: dWallet Labs, LTD.
// SPDX-License-Identifier: Apache-2.0

//! Hybrid public-key encryption over a twisted Edwards curve.
//!
//! The crate is layered bottom-up:
//! - [`field`]: canonical arithmetic over a prime field $\mathbb{Z}_p$,
//!   including Tonelli-Shanks square roots and fixed-width codecs.
//! - [`curve`]: the affine twisted Edwards group law over a pair of prime
//!   fields, with constant-time and variable-time scalar multiplication,
//!   instantiated for Baby Jubjub in [`curve::baby_jub_jub`].
//! - [`hpke`]: the HPKE labeled extract/expand key schedule, under an
//!   unregistered suite identifier.
//! - [`hybrid`]: ephemeral key encapsulation on the curve combined with the
//!   key schedule and an AEAD into `encrypt`/`decrypt`, where decryption
//!   additionally verifies that the sender knew the encapsulated secret.

pub mod curve;
pub mod field;
pub mod hpke;
pub mod hybrid;

pub use curve::{AffinePoint, TwistedEdwardsCurve};
pub use field::{FieldElement, PrimeField};
pub use hybrid::{HybridCipher, HybridCiphertext};
