//! ristretto255 group elements
//!
//! wraps `RistrettoPoint` so pool code speaks in add/neg/sub/mul and an
//! explicit identity check. ristretto has prime order, so there is no
//! cofactor to clear and every decompressed point is a valid element.

use std::sync::OnceLock;

use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar,
    traits::{Identity, IsIdentity},
};
use sha2::Sha512;

use crate::{CryptoError, Result, GENERATOR_H_DOMAIN};

/// group element
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point(RistrettoPoint);

impl Point {
    /// the identity (zero) point
    pub fn identity() -> Self {
        Self(RistrettoPoint::identity())
    }

    /// generator G, used for encryption randomness and public keys
    pub fn generator() -> Self {
        Self(RISTRETTO_BASEPOINT_POINT)
    }

    /// generator H, used to encode amounts
    pub fn generator_h() -> Self {
        static H: OnceLock<RistrettoPoint> = OnceLock::new();
        Self(*H.get_or_init(|| RistrettoPoint::hash_from_bytes::<Sha512>(GENERATOR_H_DOMAIN)))
    }

    /// hash arbitrary bytes to a group element under a domain tag
    pub fn hash_to_point(domain: &[u8], message: &[u8]) -> Self {
        let mut input = Vec::with_capacity(domain.len() + message.len() + 4);
        input.extend_from_slice(&(domain.len() as u32).to_le_bytes());
        input.extend_from_slice(domain);
        input.extend_from_slice(message);
        Self(RistrettoPoint::hash_from_bytes::<Sha512>(&input))
    }

    pub fn add(&self, other: &Self) -> Self {
        Self(self.0 + other.0)
    }

    pub fn neg(&self) -> Self {
        Self(-self.0)
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self(self.0 - other.0)
    }

    pub fn double(&self) -> Self {
        Self(self.0 + self.0)
    }

    /// scalar multiplication, reduced mod the group order
    pub fn mul(&self, scalar: &Scalar) -> Self {
        Self(self.0 * scalar)
    }

    /// double-and-add by a small integer, msb first
    pub fn mul_u64(&self, k: u64) -> Self {
        let mut acc = Self::identity();
        for bit in (0..64 - k.leading_zeros()).rev() {
            acc = acc.double();
            if (k >> bit) & 1 == 1 {
                acc = acc.add(self);
            }
        }
        acc
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_identity()
    }

    /// reject the identity where a key or commitment is expected
    pub fn ensure_nonzero(self) -> Result<Self> {
        if self.is_zero() {
            Err(CryptoError::IdentityPoint)
        } else {
            Ok(self)
        }
    }

    pub fn compress(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }

    pub fn decompress(bytes: &[u8; 32]) -> Option<Self> {
        CompressedRistretto::from_slice(bytes)
            .ok()?
            .decompress()
            .map(Self)
    }

    /// decompress and require a non-identity point
    pub fn from_public_bytes(bytes: &[u8; 32]) -> Result<Self> {
        Self::decompress(bytes)
            .ok_or(CryptoError::InvalidPoint)?
            .ensure_nonzero()
    }

    pub fn inner(&self) -> &RistrettoPoint {
        &self.0
    }
}

impl Default for Point {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<RistrettoPoint> for Point {
    fn from(p: RistrettoPoint) -> Self {
        Self(p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_laws() {
        let g = Point::generator();
        let h = Point::generator_h();

        assert_eq!(g.add(&h), h.add(&g));
        assert_eq!(g.sub(&g), Point::identity());
        assert_eq!(g.add(&g.neg()), Point::identity());
        assert_eq!(g.add(&Point::identity()), g);
        assert!(Point::identity().is_zero());
        assert!(!g.is_zero());
    }

    #[test]
    fn test_generators_independent() {
        assert_ne!(Point::generator(), Point::generator_h());
        assert_eq!(Point::generator_h(), Point::generator_h());
    }

    #[test]
    fn test_double_and_add_matches_scalar_mul() {
        let h = Point::generator_h();
        for k in [0u64, 1, 2, 3, 7, 255, 1 << 40, u64::MAX] {
            assert_eq!(h.mul_u64(k), h.mul(&Scalar::from(k)), "k = {}", k);
        }
    }

    #[test]
    fn test_scalar_mul_wraps_group_order() {
        // l*G = 0 and (l+1)*G = G since scalars are reduced mod l
        let g = Point::generator();
        let minus_one = -Scalar::ONE;
        assert_eq!(g.mul(&minus_one).add(&g), Point::identity());
    }

    #[test]
    fn test_compress_roundtrip() {
        let p = Point::generator().mul(&Scalar::from(42u64));
        let bytes = p.compress();
        assert_eq!(Point::decompress(&bytes), Some(p));

        // not a canonical ristretto encoding
        assert_eq!(Point::decompress(&[0xff; 32]), None);
    }

    #[test]
    fn test_public_bytes_rejects_identity() {
        let zero = Point::identity().compress();
        assert_eq!(Point::from_public_bytes(&zero), Err(CryptoError::IdentityPoint));
        assert_eq!(Point::from_public_bytes(&[0xff; 32]), Err(CryptoError::InvalidPoint));
    }

    #[test]
    fn test_hash_to_point_domain_separated() {
        let a = Point::hash_to_point(b"a", b"msg");
        let b = Point::hash_to_point(b"b", b"msg");
        assert_ne!(a, b);
        assert!(!a.is_zero());
    }
}
