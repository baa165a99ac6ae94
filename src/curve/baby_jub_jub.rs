// Author: dWallet Labs, LTD.
// SPDX-License-Identifier: Apache-2.0

//! The Baby Jubjub twisted Edwards curve, defined over the scalar prime of
//! BN254 so that its group operations are cheap inside BN254 arithmetic
//! circuits.

use crypto_bigint::U256;

use crate::{
    curve::{AffinePoint, TwistedEdwardsCurve},
    field::PrimeField,
};

pub const LIMBS: usize = U256::LIMBS;

/// The modulus `p` of the base field: the scalar prime of BN254.
pub const BASE_FIELD_MODULUS: U256 =
    U256::from_be_hex("30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001");

/// `p - 1` is divisible by `2^28`.
pub const BASE_FIELD_TWO_ADICITY: u32 = 28;

/// The least quadratic nonresidue modulo `p`.
pub const BASE_FIELD_NONRESIDUE: U256 = U256::from_u8(5);

/// The modulus of the scalar field: the prime subgroup order
/// `ORDER / COFACTOR`.
pub const SCALAR_FIELD_MODULUS: U256 =
    U256::from_be_hex("060c89ce5c263405370a08b6d0302b0bab3eedb83920ee0a677297dc392126f1");

pub const SCALAR_FIELD_TWO_ADICITY: u32 = 4;

/// The least quadratic nonresidue modulo the scalar field's modulus.
pub const SCALAR_FIELD_NONRESIDUE: U256 = U256::from_u8(19);

/// The order of the full curve group.
pub const ORDER: U256 =
    U256::from_be_hex("30644e72e131a029b85045b68181585d59f76dc1c90770533b94bee1c9093788");

pub const COFACTOR: U256 = U256::from_u8(8);

/// The coefficient `a` of the curve equation $a x^2 + y^2 = 1 + d x^2 y^2$.
pub const CURVE_EQUATION_A: U256 = U256::from_u32(168700);

/// The coefficient `d` of the curve equation.
pub const CURVE_EQUATION_D: U256 = U256::from_u32(168696);

/// A generator of the full curve group.
pub const GENERATOR_X: U256 =
    U256::from_be_hex("023343e3445b673d38bcba38f25645adb494b1255b1162bb40f41a59f4d4b45e");
pub const GENERATOR_Y: U256 =
    U256::from_be_hex("0c19139cb84c680a6e14116da06056174a0cfa121e6e5c2450f87d64fc000001");

/// The cofactor-cleared generator of the prime-order subgroup.
pub const BASE_POINT_X: U256 =
    U256::from_be_hex("0bb77a6ad63e739b4eacb2e09d6277c12ab8d8010534e0b62893f3f6bb957051");
pub const BASE_POINT_Y: U256 =
    U256::from_be_hex("25797203f7a0b24925572e1cd16bf9edfce0051fb9e133774b3c257a872d7d8b");

pub fn base_field() -> PrimeField<LIMBS> {
    PrimeField::new(
        BASE_FIELD_MODULUS,
        BASE_FIELD_TWO_ADICITY,
        BASE_FIELD_NONRESIDUE,
    )
}

pub fn scalar_field() -> PrimeField<LIMBS> {
    PrimeField::new(
        SCALAR_FIELD_MODULUS,
        SCALAR_FIELD_TWO_ADICITY,
        SCALAR_FIELD_NONRESIDUE,
    )
}

pub fn curve() -> TwistedEdwardsCurve<LIMBS> {
    let base_field = base_field();

    // The parameters above are fixed constants satisfying the cofactor
    // invariant, so construction cannot fail.
    TwistedEdwardsCurve::new(
        base_field,
        scalar_field(),
        ORDER,
        COFACTOR,
        AffinePoint {
            x: base_field.from_uint(GENERATOR_X),
            y: base_field.from_uint(GENERATOR_Y),
        },
        AffinePoint {
            x: base_field.from_uint(BASE_POINT_X),
            y: base_field.from_uint(BASE_POINT_Y),
        },
        base_field.from_uint(CURVE_EQUATION_A),
        base_field.from_uint(CURVE_EQUATION_D),
    )
    .expect("valid Baby Jubjub parameters")
}
