// Author: dWallet Labs, LTD.
// SPDX-License-Identifier: Apache-2.0

use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crypto_bigint::{
    modular::runtime_mod::{DynResidue, DynResidueParams},
    Encoding, NonZero, Uint,
};
use subtle::{Choice, ConditionallySelectable, ConstantTimeEq};

#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum Error {
    #[error("division by zero: the zero element has no inverse")]
    DivisionByZero,

    #[error("length mismatch: dot-product operands must have equal lengths")]
    LengthMismatch,

    #[error("invalid string for field element: {0}")]
    Parse(String),

    #[error("invalid legendre symbol (are the field parameters correct?)")]
    InternalConsistency,
}

pub type Result<T> = std::result::Result<T, Error>;

/// An element of the prime field $\mathbb{Z}_p$, kept in Montgomery form.
///
/// Every element observable through [`PrimeField`] operations is canonical:
/// [`Self::value()`] is always in $[0, p)$.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct FieldElement<const LIMBS: usize>(DynResidue<LIMBS>);

impl<const LIMBS: usize> FieldElement<LIMBS> {
    /// The canonical value of this element in $[0, p)$.
    pub fn value(&self) -> Uint<LIMBS> {
        self.0.retrieve()
    }
}

impl<const LIMBS: usize> ConstantTimeEq for FieldElement<LIMBS> {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.value().ct_eq(&other.value())
    }
}

/// The prime field $\mathbb{Z}_p$ for a fixed odd prime `p`.
///
/// Parametrized at construction by the modulus, its two-adicity and a fixed
/// quadratic nonresidue; these are caller-supplied preconditions and are not
/// verified. An instance is immutable and can be shared freely between
/// threads; all consumers of the same modulus should share one instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrimeField<const LIMBS: usize> {
    params: DynResidueParams<LIMBS>,
    modulus: Uint<LIMBS>,
    num_bits: usize,
    num_bytes: usize,
    two_adicity: u32,
    nonresidue: Uint<LIMBS>,
    // (p - 1) / 2
    legendre_exponent: Uint<LIMBS>,
    // (p - 1) / 2^two_adicity
    two_adic_cofactor: Uint<LIMBS>,
    // (two_adic_cofactor + 1) / 2
    sqrt_exponent: Uint<LIMBS>,
}

impl<const LIMBS: usize> PrimeField<LIMBS> {
    pub fn new(modulus: Uint<LIMBS>, two_adicity: u32, nonresidue: Uint<LIMBS>) -> Self {
        let params = DynResidueParams::new(&modulus);
        let num_bits = modulus.bits_vartime();
        let modulus_minus_one = modulus.wrapping_sub(&Uint::ONE);
        let two_adic_cofactor = modulus_minus_one.shr_vartime(two_adicity as usize);

        Self {
            params,
            modulus,
            num_bits,
            num_bytes: (num_bits + 7) / 8,
            two_adicity,
            nonresidue,
            legendre_exponent: modulus_minus_one.shr_vartime(1),
            two_adic_cofactor,
            sqrt_exponent: two_adic_cofactor.wrapping_add(&Uint::ONE).shr_vartime(1),
        }
    }

    pub fn modulus(&self) -> Uint<LIMBS> {
        self.modulus
    }

    /// The bit length of the modulus.
    pub fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// The byte length of the fixed-width encoding, `ceil(num_bits / 8)`.
    pub fn num_bytes(&self) -> usize {
        self.num_bytes
    }

    pub fn zero(&self) -> FieldElement<LIMBS> {
        FieldElement(DynResidue::zero(self.params))
    }

    pub fn one(&self) -> FieldElement<LIMBS> {
        FieldElement(DynResidue::one(self.params))
    }

    pub fn two(&self) -> FieldElement<LIMBS> {
        self.from_uint(Uint::from_u8(2))
    }

    /// Reduces `value` modulo `p` into the field.
    pub fn from_uint(&self, value: Uint<LIMBS>) -> FieldElement<LIMBS> {
        FieldElement(DynResidue::new(&value, self.params))
    }

    /// Lifts a selector bit into the field without branching on it.
    ///
    /// Used to blend between candidate values arithmetically where a
    /// data-dependent branch would leak.
    pub fn from_choice(&self, choice: Choice) -> FieldElement<LIMBS> {
        self.from_uint(Uint::conditional_select(&Uint::ZERO, &Uint::ONE, choice))
    }

    pub fn add(&self, lhs: &FieldElement<LIMBS>, rhs: &FieldElement<LIMBS>) -> FieldElement<LIMBS> {
        FieldElement(lhs.0 + rhs.0)
    }

    pub fn sub(&self, lhs: &FieldElement<LIMBS>, rhs: &FieldElement<LIMBS>) -> FieldElement<LIMBS> {
        FieldElement(lhs.0 - rhs.0)
    }

    pub fn neg(&self, lhs: &FieldElement<LIMBS>) -> FieldElement<LIMBS> {
        FieldElement(lhs.0.neg())
    }

    pub fn mul(&self, lhs: &FieldElement<LIMBS>, rhs: &FieldElement<LIMBS>) -> FieldElement<LIMBS> {
        FieldElement(lhs.0 * rhs.0)
    }

    pub fn square(&self, lhs: &FieldElement<LIMBS>) -> FieldElement<LIMBS> {
        FieldElement(lhs.0.square())
    }

    /// Inverts `lhs`, failing with [`Error::DivisionByZero`] on the zero
    /// element.
    pub fn inv(&self, lhs: &FieldElement<LIMBS>) -> Result<FieldElement<LIMBS>> {
        let (inverted, invertible) = lhs.0.invert();

        match invertible.into() {
            true => Ok(FieldElement(inverted)),
            false => Err(Error::DivisionByZero),
        }
    }

    /// Inverts `lhs`, mapping the zero element to zero.
    pub fn inv_or_zero(&self, lhs: &FieldElement<LIMBS>) -> FieldElement<LIMBS> {
        let (inverted, invertible) = lhs.0.invert();

        match invertible.into() {
            true => FieldElement(inverted),
            false => self.zero(),
        }
    }

    pub fn div(
        &self,
        lhs: &FieldElement<LIMBS>,
        rhs: &FieldElement<LIMBS>,
    ) -> Result<FieldElement<LIMBS>> {
        Ok(self.mul(lhs, &self.inv(rhs)?))
    }

    pub fn div_or_zero(
        &self,
        lhs: &FieldElement<LIMBS>,
        rhs: &FieldElement<LIMBS>,
    ) -> FieldElement<LIMBS> {
        self.mul(lhs, &self.inv_or_zero(rhs))
    }

    /// Raises `base` to `exponent` by most-significant-bit-first
    /// square-and-multiply.
    ///
    /// Runs in time dependent on the exponent's value; only pass public
    /// exponents.
    pub fn pow(&self, base: &FieldElement<LIMBS>, exponent: &Uint<LIMBS>) -> FieldElement<LIMBS> {
        let mut result = self.one();
        for index in (0..exponent.bits_vartime()).rev() {
            result = self.square(&result);
            if exponent.bit_vartime(index) {
                result = self.mul(&result, base);
            }
        }

        result
    }

    /// The Legendre symbol $x^{(p-1)/2}$: one for a nonzero quadratic
    /// residue, $p - 1$ for a nonresidue and zero for zero.
    pub fn legendre_symbol(&self, lhs: &FieldElement<LIMBS>) -> FieldElement<LIMBS> {
        self.pow(lhs, &self.legendre_exponent)
    }

    /// Computes a square root of `lhs` via Tonelli-Shanks, or `None` if `lhs`
    /// is a quadratic nonresidue.
    ///
    /// A Legendre symbol outside $\{0, 1, p - 1\}$ means the field was
    /// constructed with inconsistent parameters and fails with
    /// [`Error::InternalConsistency`]; it is unreachable for a valid field.
    pub fn sqrt(&self, lhs: &FieldElement<LIMBS>) -> Result<Option<FieldElement<LIMBS>>> {
        let legendre = self.legendre_symbol(lhs);

        if legendre == self.zero() {
            return Ok(Some(self.zero()));
        }
        if legendre == self.neg(&self.one()) {
            return Ok(None);
        }
        if legendre != self.one() {
            return Err(Error::InternalConsistency);
        }

        self.tonelli_shanks(lhs).map(Some)
    }

    fn tonelli_shanks(&self, lhs: &FieldElement<LIMBS>) -> Result<FieldElement<LIMBS>> {
        let mut m = self.two_adicity;
        let mut c = self.pow(&self.from_uint(self.nonresidue), &self.two_adic_cofactor);
        let mut t = self.pow(lhs, &self.two_adic_cofactor);
        let mut r = self.pow(lhs, &self.sqrt_exponent);

        loop {
            if t == self.zero() {
                return Ok(self.zero());
            }
            if t == self.one() {
                return Ok(r);
            }

            // Find the least `i > 0` with `t^(2^i) == 1`; the Legendre check
            // above guarantees `i < m`, so hitting the bound means the field
            // parameters are inconsistent.
            let mut i = 0u32;
            let mut current = t;
            while current != self.one() {
                current = self.square(&current);
                i += 1;

                if i >= m {
                    return Err(Error::InternalConsistency);
                }
            }

            let b = self.pow(&c, &Uint::ONE.shl_vartime((m - i - 1) as usize));
            m = i;
            c = self.square(&b);
            t = self.mul(&t, &c);
            r = self.mul(&r, &b);
        }
    }

    pub fn product(&self, elements: &[FieldElement<LIMBS>]) -> FieldElement<LIMBS> {
        elements
            .iter()
            .fold(self.one(), |accumulator, element| self.mul(&accumulator, element))
    }

    pub fn sum(&self, elements: &[FieldElement<LIMBS>]) -> FieldElement<LIMBS> {
        elements
            .iter()
            .fold(self.zero(), |accumulator, element| self.add(&accumulator, element))
    }

    /// The inner product of `lhs` and `rhs`, failing with
    /// [`Error::LengthMismatch`] on unequal lengths.
    pub fn dot_product(
        &self,
        lhs: &[FieldElement<LIMBS>],
        rhs: &[FieldElement<LIMBS>],
    ) -> Result<FieldElement<LIMBS>> {
        if lhs.len() != rhs.len() {
            return Err(Error::LengthMismatch);
        }

        Ok(lhs
            .iter()
            .zip(rhs.iter())
            .fold(self.zero(), |accumulator, (left, right)| {
                self.add(&accumulator, &self.mul(left, right))
            }))
    }

    /// Derives a field element from `bytes` of entropy, interpreted as a
    /// little-endian integer and reduced modulo `p`.
    ///
    /// The fold below performs one field multiplication and addition per
    /// byte, so the timing depends only on the length of `bytes`. There is no
    /// rejection sampling: callers must supply substantially more entropy
    /// than [`Self::num_bytes()`] for the reduction bias to be negligible.
    pub fn from_entropy(&self, bytes: &[u8]) -> FieldElement<LIMBS> {
        let radix = self.from_uint(Uint::from_u16(256));

        bytes.iter().rev().fold(self.zero(), |accumulator, &byte| {
            self.add(
                &self.mul(&accumulator, &radix),
                &self.from_uint(Uint::from_u8(byte)),
            )
        })
    }
}

impl<const LIMBS: usize> PrimeField<LIMBS>
where
    Uint<LIMBS>: Encoding,
{
    /// Decodes a field element from the fixed-width little-endian encoding
    /// produced by [`Self::to_bytes()`].
    ///
    /// Returns `None` if `bytes` is not exactly [`Self::num_bytes()`] long;
    /// beyond that length check the decoding does not branch on the byte
    /// values, the out-of-range case included (the value is reduced).
    pub fn from_bytes(&self, bytes: &[u8]) -> Option<FieldElement<LIMBS>> {
        if bytes.len() != self.num_bytes {
            return None;
        }

        let mut buffer = vec![0u8; Uint::<LIMBS>::BYTES];
        buffer[..bytes.len()].copy_from_slice(bytes);

        Some(self.from_uint(Uint::from_le_slice(&buffer)))
    }

    /// Encodes `element` canonically as exactly [`Self::num_bytes()`]
    /// little-endian bytes.
    pub fn to_bytes(&self, element: &FieldElement<LIMBS>) -> Vec<u8> {
        element.value().to_le_bytes().as_ref()[..self.num_bytes].to_vec()
    }
}

impl<const LIMBS: usize> PrimeField<LIMBS> {
    /// Parses a decimal string, reducing into the field; a leading `-`
    /// negates. Not constant time.
    pub fn from_string(&self, input: &str) -> Result<FieldElement<LIMBS>> {
        let (negative, digits) = match input.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, input),
        };

        if digits.is_empty() {
            return Err(Error::Parse(input.to_string()));
        }

        let ten = self.from_uint(Uint::from_u8(10));
        let mut value = self.zero();
        for character in digits.chars() {
            let digit = character
                .to_digit(10)
                .ok_or_else(|| Error::Parse(input.to_string()))?;

            value = self.add(&self.mul(&value, &ten), &self.from_uint(Uint::from_u32(digit)));
        }

        Ok(match negative {
            true => self.neg(&value),
            false => value,
        })
    }

    /// Formats the canonical value of `element` in decimal. Not constant
    /// time.
    pub fn to_string(&self, element: &FieldElement<LIMBS>) -> String {
        let mut value = element.value();
        if value == Uint::ZERO {
            return "0".to_string();
        }

        // Ten is nonzero, so this is safe to unwrap.
        let ten = NonZero::new(Uint::from_u8(10)).unwrap();

        let mut digits = Vec::new();
        while value != Uint::ZERO {
            let (quotient, remainder) = value.div_rem(&ten);
            digits.push(remainder.as_words()[0] as u8);
            value = quotient;
        }

        digits
            .iter()
            .rev()
            .map(|&digit| char::from(b'0' + digit))
            .collect()
    }
}

impl<const LIMBS: usize> Add<Self> for FieldElement<LIMBS> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl<'r, const LIMBS: usize> Add<&'r Self> for FieldElement<LIMBS> {
    type Output = Self;

    fn add(self, rhs: &'r Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl<const LIMBS: usize> Sub<Self> for FieldElement<LIMBS> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl<'r, const LIMBS: usize> Sub<&'r Self> for FieldElement<LIMBS> {
    type Output = Self;

    fn sub(self, rhs: &'r Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl<const LIMBS: usize> Neg for FieldElement<LIMBS> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0.neg())
    }
}

impl<const LIMBS: usize> Mul<Self> for FieldElement<LIMBS> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl<'r, const LIMBS: usize> Mul<&'r Self> for FieldElement<LIMBS> {
    type Output = Self;

    fn mul(self, rhs: &'r Self) -> Self::Output {
        Self(self.0 * rhs.0)
    }
}

impl<const LIMBS: usize> AddAssign<Self> for FieldElement<LIMBS> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs
    }
}

impl<const LIMBS: usize> SubAssign<Self> for FieldElement<LIMBS> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs
    }
}

impl<const LIMBS: usize> MulAssign<Self> for FieldElement<LIMBS> {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs
    }
}
