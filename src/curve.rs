// Author: dWallet Labs, LTD.
// SPDX-License-Identifier: Apache-2.0

pub mod baby_jub_jub;

use crypto_bigint::{Encoding, Limb, NonZero, Uint};
use serde::{Deserialize, Serialize};
use subtle::{Choice, ConstantTimeEq};

use crate::{
    field,
    field::{FieldElement, PrimeField},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid curve parameters: the cofactor times the prime subgroup order must equal the curve order")]
    InvalidParameters,

    #[error("invalid serialized point")]
    InvalidPoint,

    #[error("field error")]
    Field(#[from] field::Error),

    #[error("serialization/deserialization error")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A point of the curve in affine coordinates.
///
/// The curve's neutral element is the ordinary affine point $(0, 1)$; there
/// is no separate representation for a point at infinity.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct AffinePoint<const LIMBS: usize> {
    pub x: FieldElement<LIMBS>,
    pub y: FieldElement<LIMBS>,
}

impl<const LIMBS: usize> ConstantTimeEq for AffinePoint<LIMBS> {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.x.ct_eq(&other.x) & self.y.ct_eq(&other.y)
    }
}

/// The textual form of a point: decimal coordinate strings inside a JSON
/// object.
#[derive(Serialize, Deserialize)]
struct EncodedPoint {
    x: String,
    y: String,
}

/// A twisted Edwards curve $a x^2 + y^2 = 1 + d x^2 y^2$ over a prime base
/// field, together with its scalar field and subgroup structure.
///
/// The affine group law divides by $1 \pm d x_1 x_2 y_1 y_2$ and is therefore
/// only valid over the prime-order subgroup (the neutral element included),
/// where the denominators cannot vanish; for other coordinate pairs the
/// results of [`Self::add`] and [`Self::double`] are undefined.
///
/// Immutable once constructed and freely shareable between threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TwistedEdwardsCurve<const LIMBS: usize> {
    base_field: PrimeField<LIMBS>,
    scalar_field: PrimeField<LIMBS>,
    order: Uint<LIMBS>,
    prime_subgroup_order: Uint<LIMBS>,
    cofactor: Uint<LIMBS>,
    generator: AffinePoint<LIMBS>,
    base_point: AffinePoint<LIMBS>,
    neutral: AffinePoint<LIMBS>,
    equation_a: FieldElement<LIMBS>,
    equation_d: FieldElement<LIMBS>,
}

impl<const LIMBS: usize> TwistedEdwardsCurve<LIMBS> {
    /// Instantiates the curve, deriving the prime subgroup order as
    /// `order / cofactor` and failing with [`Error::InvalidParameters`]
    /// unless the division is exact.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        base_field: PrimeField<LIMBS>,
        scalar_field: PrimeField<LIMBS>,
        order: Uint<LIMBS>,
        cofactor: Uint<LIMBS>,
        generator: AffinePoint<LIMBS>,
        base_point: AffinePoint<LIMBS>,
        a: FieldElement<LIMBS>,
        d: FieldElement<LIMBS>,
    ) -> Result<Self> {
        let nonzero_cofactor =
            Option::from(NonZero::new(cofactor)).ok_or(Error::InvalidParameters)?;

        let (prime_subgroup_order, remainder) = order.div_rem(&nonzero_cofactor);
        if remainder != Uint::ZERO {
            return Err(Error::InvalidParameters);
        }

        Ok(Self {
            base_field,
            scalar_field,
            order,
            prime_subgroup_order,
            cofactor,
            generator,
            base_point,
            neutral: AffinePoint {
                x: base_field.zero(),
                y: base_field.one(),
            },
            equation_a: a,
            equation_d: d,
        })
    }

    pub fn base_field(&self) -> PrimeField<LIMBS> {
        self.base_field
    }

    pub fn scalar_field(&self) -> PrimeField<LIMBS> {
        self.scalar_field
    }

    pub fn order(&self) -> Uint<LIMBS> {
        self.order
    }

    pub fn prime_subgroup_order(&self) -> Uint<LIMBS> {
        self.prime_subgroup_order
    }

    pub fn cofactor(&self) -> Uint<LIMBS> {
        self.cofactor
    }

    pub fn generator(&self) -> AffinePoint<LIMBS> {
        self.generator
    }

    /// The cofactor-cleared generator of the prime-order subgroup.
    pub fn base_point(&self) -> AffinePoint<LIMBS> {
        self.base_point
    }

    pub fn neutral(&self) -> AffinePoint<LIMBS> {
        self.neutral
    }

    pub fn equation_a(&self) -> FieldElement<LIMBS> {
        self.equation_a
    }

    pub fn equation_d(&self) -> FieldElement<LIMBS> {
        self.equation_d
    }

    /// The byte length of the fixed-width point encoding: both coordinates
    /// at the base field's width.
    pub fn encoded_point_length(&self) -> usize {
        2 * self.base_field.num_bytes()
    }

    /// Whether `point` satisfies the curve equation exactly.
    pub fn is_on_curve(&self, point: &AffinePoint<LIMBS>) -> bool {
        let field = &self.base_field;

        let x_squared = field.square(&point.x);
        let y_squared = field.square(&point.y);

        field.add(&field.mul(&self.equation_a, &x_squared), &y_squared)
            == field.add(
                &field.one(),
                &field.product(&[x_squared, y_squared, self.equation_d]),
            )
    }

    /// Whether `point` lies in the prime-order subgroup.
    ///
    /// The subgroup order is public, so the multiplication uses the
    /// variable-time ladder.
    pub fn is_in_subgroup(&self, point: &AffinePoint<LIMBS>) -> bool {
        self.is_on_curve(point)
            && self.scalar_mul_vartime(point, &self.prime_subgroup_order) == self.neutral
    }

    pub fn neg(&self, point: &AffinePoint<LIMBS>) -> AffinePoint<LIMBS> {
        AffinePoint {
            x: point.x,
            y: self.base_field.neg(&point.y),
        }
    }

    /// Adds two subgroup points with the affine twisted Edwards addition
    /// law.
    pub fn add(&self, lhs: &AffinePoint<LIMBS>, rhs: &AffinePoint<LIMBS>) -> AffinePoint<LIMBS> {
        let field = &self.base_field;

        let x1y2 = field.mul(&lhs.x, &rhs.y);
        let x2y1 = field.mul(&rhs.x, &lhs.y);
        let denominator_term = field.product(&[self.equation_d, x1y2, x2y1]);

        let x = field.div_or_zero(
            &field.add(&x1y2, &x2y1),
            &field.add(&field.one(), &denominator_term),
        );

        let y = field.div_or_zero(
            &field.sub(
                &field.mul(&lhs.y, &rhs.y),
                &field.product(&[self.equation_a, lhs.x, rhs.x]),
            ),
            &field.sub(&field.one(), &denominator_term),
        );

        AffinePoint { x, y }
    }

    /// Doubles a subgroup point.
    pub fn double(&self, point: &AffinePoint<LIMBS>) -> AffinePoint<LIMBS> {
        let field = &self.base_field;

        let a_x_squared = field.mul(&self.equation_a, &field.square(&point.x));
        let y_squared = field.square(&point.y);

        let x = field.div_or_zero(
            &field.product(&[field.two(), point.x, point.y]),
            &field.add(&a_x_squared, &y_squared),
        );

        let y = field.div_or_zero(
            &field.sub(&y_squared, &a_x_squared),
            &field.sub(&field.sub(&field.two(), &a_x_squared), &y_squared),
        );

        AffinePoint { x, y }
    }

    /// Multiplies `point` by `scalar` with a double-always-add ladder.
    ///
    /// Every iteration doubles the accumulator, computes the tentative sum
    /// with `point` unconditionally, and then blends the two candidates
    /// arithmetically, the scalar bit entering only as a field element lifted
    /// through a constant-time select. The ladder walks the full integer
    /// width rather than the scalar's bit length, so neither the running
    /// time nor the memory-access pattern depends on the scalar. Intended
    /// for secret scalars.
    pub fn scalar_mul(
        &self,
        point: &AffinePoint<LIMBS>,
        scalar: &Uint<LIMBS>,
    ) -> AffinePoint<LIMBS> {
        let mut accumulator = self.neutral;
        for index in (0..Uint::<LIMBS>::BITS).rev() {
            accumulator = self.double(&accumulator);
            let sum = self.add(&accumulator, point);

            accumulator = self.blend(scalar_bit(scalar, index), &sum, &accumulator);
        }

        accumulator
    }

    /// Multiplies `point` by `scalar`, branching on each scalar bit.
    ///
    /// Cheaper than [`Self::scalar_mul`] but leaks the scalar through
    /// timing; use only with public scalars (cofactor clearing, subgroup
    /// checks).
    pub fn scalar_mul_vartime(
        &self,
        point: &AffinePoint<LIMBS>,
        scalar: &Uint<LIMBS>,
    ) -> AffinePoint<LIMBS> {
        let mut accumulator = self.neutral;
        for index in (0..scalar.bits_vartime()).rev() {
            accumulator = self.double(&accumulator);
            if scalar.bit_vartime(index) {
                accumulator = self.add(&accumulator, point);
            }
        }

        accumulator
    }

    // Returns `taken` when `choice` is set and `other` otherwise, as the
    // arithmetic blend `s * taken + (1 - s) * other` per coordinate; both
    // inputs are always consumed and no branch depends on `choice`.
    fn blend(
        &self,
        choice: Choice,
        taken: &AffinePoint<LIMBS>,
        other: &AffinePoint<LIMBS>,
    ) -> AffinePoint<LIMBS> {
        let field = &self.base_field;

        let selector = field.from_choice(choice);
        let complement = field.sub(&field.one(), &selector);

        AffinePoint {
            x: field.add(
                &field.mul(&taken.x, &selector),
                &field.mul(&other.x, &complement),
            ),
            y: field.add(
                &field.mul(&taken.y, &selector),
                &field.mul(&other.y, &complement),
            ),
        }
    }

    /// Parses the textual point encoding produced by [`Self::to_string`],
    /// failing on malformed structure, bad coordinate strings, or a
    /// well-formed point that does not lie on the curve.
    pub fn from_string(&self, input: &str) -> Result<AffinePoint<LIMBS>> {
        let encoded: EncodedPoint = serde_json::from_str(input)?;

        let point = AffinePoint {
            x: self.base_field.from_string(&encoded.x)?,
            y: self.base_field.from_string(&encoded.y)?,
        };

        if !self.is_on_curve(&point) {
            return Err(Error::InvalidPoint);
        }

        Ok(point)
    }

    pub fn to_string(&self, point: &AffinePoint<LIMBS>) -> Result<String> {
        Ok(serde_json::to_string(&EncodedPoint {
            x: self.base_field.to_string(&point.x),
            y: self.base_field.to_string(&point.y),
        })?)
    }
}

impl<const LIMBS: usize> TwistedEdwardsCurve<LIMBS>
where
    Uint<LIMBS>: Encoding,
{
    /// Encodes `point` as the x coordinate's bytes followed by the y
    /// coordinate's bytes, each at the base field's fixed width.
    pub fn to_bytes(&self, point: &AffinePoint<LIMBS>) -> Vec<u8> {
        let mut bytes = self.base_field.to_bytes(&point.x);
        bytes.extend_from_slice(&self.base_field.to_bytes(&point.y));

        bytes
    }

    /// Decodes a point, returning `None` (never an error) on a wrong total
    /// length or when the coordinates do not satisfy the curve equation.
    ///
    /// Beyond the length check, the only data-dependent decision is the
    /// final canonical field-equality comparison of the curve-equation
    /// check.
    pub fn from_bytes(&self, bytes: &[u8]) -> Option<AffinePoint<LIMBS>> {
        if bytes.len() != self.encoded_point_length() {
            return None;
        }

        let (x_bytes, y_bytes) = bytes.split_at(self.base_field.num_bytes());
        let point = AffinePoint {
            x: self.base_field.from_bytes(x_bytes)?,
            y: self.base_field.from_bytes(y_bytes)?,
        };

        self.is_on_curve(&point).then_some(point)
    }
}

fn scalar_bit<const LIMBS: usize>(scalar: &Uint<LIMBS>, index: usize) -> Choice {
    let word = scalar.as_words()[index / Limb::BITS];

    Choice::from(((word >> (index % Limb::BITS)) & 1) as u8)
}
