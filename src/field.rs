//! Arithmetic in the prime field used by the secure aggregation protocols.
//!
//! The field is `Z/pZ` with the Mersenne prime `p = 2^127 - 1`. Shamir shares
//! and masked weight chunks are exchanged between independent SDK
//! implementations as canonical representatives of this field, so every
//! operation here must produce exactly the same representative as the
//! reference reduction, not merely an equivalent one. The reduction exploits
//! the Mersenne identity `x mod p = (x & p) + (x >> 127)`.

use std::{
    convert::TryInto,
    fmt,
    ops::{Add, Mul, Sub},
};

use serde::{Deserialize, Serialize};
use sodiumoxide::randombytes::randombytes;

/// The field modulus, the Mersenne prime `2^127 - 1`.
pub const MODULUS: u128 = (1 << 127) - 1;

/// An element of the prime field `Z/pZ`, `p = 2^127 - 1`.
///
/// The inner value is always the canonical representative in `[0, p)`. Every
/// constructor and operation upholds this invariant; operations assume their
/// inputs already satisfy it.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FieldElement(u128);

impl FieldElement {
    /// The additive identity.
    pub const ZERO: FieldElement = FieldElement(0);

    /// The multiplicative identity.
    pub const ONE: FieldElement = FieldElement(1);

    /// Length in bytes of the canonical big-endian encoding.
    pub const LENGTH: usize = 16;

    /// Creates an element from an integer that is already canonical.
    ///
    /// Returns `None` if `value >= p`.
    pub fn new(value: u128) -> Option<Self> {
        if value < MODULUS {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Creates an element by reducing an arbitrary 128-bit integer mod `p`.
    pub fn reduce(value: u128) -> Self {
        let mut reduced = (value & MODULUS) + (value >> 127);
        if reduced >= MODULUS {
            reduced -= MODULUS;
        }
        Self(reduced)
    }

    /// Gets the canonical integer representative.
    pub fn value(self) -> u128 {
        self.0
    }

    /// Encodes this element as 16 big-endian bytes.
    pub fn to_bytes(self) -> [u8; Self::LENGTH] {
        self.0.to_be_bytes()
    }

    /// Decodes a canonical 16-byte big-endian encoding.
    ///
    /// Returns `None` for slices of the wrong length and for non-canonical
    /// values.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; Self::LENGTH] = bytes.try_into().ok()?;
        Self::new(u128::from_be_bytes(bytes))
    }

    /// Folds an arbitrary 16-byte string into the field.
    ///
    /// Unlike [`from_bytes()`], this never fails: values at or above `p` are
    /// reduced. Used to reinterpret PRG output and raw key material as field
    /// elements.
    ///
    /// [`from_bytes()`]: FieldElement::from_bytes
    pub fn from_bytes_reduced(bytes: &[u8; Self::LENGTH]) -> Self {
        Self::reduce(u128::from_be_bytes(*bytes))
    }

    /// Draws a uniformly random element from the system CSPRNG.
    ///
    /// Rejection sampling: 128 random bits with the top bit cleared lie in
    /// `[0, 2^127)`; the single non-canonical leftover `p` is redrawn.
    pub fn random() -> Self {
        loop {
            let bytes = randombytes(Self::LENGTH);
            // UNWRAP_SAFE: randombytes returns exactly LENGTH bytes
            let value = u128::from_be_bytes(bytes.as_slice().try_into().unwrap()) & MODULUS;
            if value < MODULUS {
                return Self(value);
            }
        }
    }

    /// Computes the multiplicative inverse via Fermat's little theorem,
    /// `a^(p-2) mod p`.
    ///
    /// Square-and-multiply over the 127-bit exponent, low word first. The
    /// inverse of zero is defined as zero; callers never place it in a
    /// denominator.
    pub fn inverse(self) -> Self {
        // p - 2 = 2^127 - 3
        const EXP_LO: u64 = 0xffff_ffff_ffff_fffd;
        const EXP_HI: u64 = 0x7fff_ffff_ffff_ffff;
        let mut result = Self::ONE;
        let mut base = self;
        for word in [EXP_LO, EXP_HI] {
            let mut bits = word;
            for _ in 0..64 {
                if bits & 1 == 1 {
                    result = result * base;
                }
                base = base * base;
                bits >>= 1;
            }
        }
        result
    }
}

impl Add for FieldElement {
    type Output = FieldElement;

    fn add(self, other: FieldElement) -> FieldElement {
        // both operands are < 2^127, so the sum fits in 128 bits
        let mut sum = self.0 + other.0;
        if sum >= MODULUS {
            sum -= MODULUS;
        }
        FieldElement(sum)
    }
}

impl Sub for FieldElement {
    type Output = FieldElement;

    fn sub(self, other: FieldElement) -> FieldElement {
        if self.0 >= other.0 {
            FieldElement(self.0 - other.0)
        } else {
            FieldElement(MODULUS - (other.0 - self.0))
        }
    }
}

impl Mul for FieldElement {
    type Output = FieldElement;

    fn mul(self, other: FieldElement) -> FieldElement {
        // 256-bit schoolbook product from four 64x64 -> 128 partials, merged
        // into four 64-bit words. The high halves are < 2^63, so none of the
        // merges can wrap a u128.
        let (a_lo, a_hi) = (self.0 as u64, (self.0 >> 64) as u64);
        let (b_lo, b_hi) = (other.0 as u64, (other.0 >> 64) as u64);

        let ll = (a_lo as u128) * (b_lo as u128);
        let lh = (a_lo as u128) * (b_hi as u128);
        let hl = (a_hi as u128) * (b_lo as u128);
        let hh = (a_hi as u128) * (b_hi as u128);

        let mid = (ll >> 64) + (lh as u64 as u128) + (hl as u64 as u128);
        let upper = (mid >> 64) + (lh >> 64) + (hl >> 64) + hh;

        let lo = ((mid as u64 as u128) << 64) | (ll as u64 as u128);
        let hi = upper;

        // x mod p = (x & p) + (x >> 127); the product is < 2^254 so the
        // shifted part fits in a u128, and two folding rounds plus a final
        // conditional subtraction reach the canonical representative
        let shifted = (hi << 1) | (lo >> 127);
        let mut reduced = (lo & MODULUS) + shifted;
        reduced = (reduced & MODULUS) + (reduced >> 127);
        if reduced >= MODULUS {
            reduced -= MODULUS;
        }
        FieldElement(reduced)
    }
}

impl From<u32> for FieldElement {
    fn from(value: u32) -> Self {
        Self(value as u128)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
