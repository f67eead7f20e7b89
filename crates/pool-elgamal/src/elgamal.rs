//! exponential elgamal over ristretto255
//!
//! amounts are encoded as `amount*H` so ciphertexts add under a fixed
//! public key: Enc(a) + Enc(b) = Enc(a + b)

use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::point::Point;
use crate::{CryptoError, Result};

/// elgamal ciphertext
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ciphertext {
    /// c1 = r * G (ephemeral key)
    pub c1: Point,
    /// c2 = amount * H + r * PK
    pub c2: Point,
}

impl Ciphertext {
    pub fn new(c1: Point, c2: Point) -> Self {
        Self { c1, c2 }
    }

    /// encryption of zero with zero randomness, the additive identity
    pub fn zero() -> Self {
        Self {
            c1: Point::identity(),
            c2: Point::identity(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.c1.is_zero() && self.c2.is_zero()
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        bytes[..32].copy_from_slice(&self.c1.compress());
        bytes[32..].copy_from_slice(&self.c2.compress());
        bytes
    }

    pub fn from_bytes(bytes: &[u8; 64]) -> Option<Self> {
        let mut c1 = [0u8; 32];
        let mut c2 = [0u8; 32];
        c1.copy_from_slice(&bytes[..32]);
        c2.copy_from_slice(&bytes[32..]);
        Some(Self {
            c1: Point::decompress(&c1)?,
            c2: Point::decompress(&c2)?,
        })
    }
}

/// secret decryption key, wiped on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(Scalar);

impl SecretKey {
    pub fn new(scalar: Scalar) -> Self {
        Self(scalar)
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(Scalar::random(rng))
    }

    /// parse a canonical 32-byte scalar
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        Option::<Scalar>::from(Scalar::from_canonical_bytes(*bytes))
            .map(Self)
            .ok_or(CryptoError::InvalidScalar)
    }

    pub fn scalar(&self) -> &Scalar {
        &self.0
    }
}

impl core::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("SecretKey(..)")
    }
}

/// elgamal key pair
#[derive(Clone, Debug)]
pub struct KeyPair {
    secret: SecretKey,
    public: Point,
}

impl KeyPair {
    /// fails for the zero secret, whose public key is the identity
    pub fn from_secret(secret: SecretKey) -> Result<Self> {
        let public = derive_public_key(secret.scalar()).ensure_nonzero()?;
        Ok(Self { secret, public })
    }

    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        loop {
            if let Ok(pair) = Self::from_secret(SecretKey::random(rng)) {
                return pair;
            }
        }
    }

    pub fn public_key(&self) -> Point {
        self.public
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    pub fn decrypt(&self, ct: &Ciphertext) -> Point {
        decrypt_point(ct, self.secret.scalar())
    }
}

/// PK = sk * G
pub fn derive_public_key(secret_key: &Scalar) -> Point {
    Point::generator().mul(secret_key)
}

/// M = amount * H
pub fn encode_amount(amount: u64) -> Point {
    Point::generator_h().mul(&Scalar::from(amount))
}

/// C = (r*G, amount*H + r*PK)
pub fn encrypt(amount: u64, public_key: &Point, randomness: &Scalar) -> Ciphertext {
    let c1 = Point::generator().mul(randomness);
    let c2 = encode_amount(amount).add(&public_key.mul(randomness));
    Ciphertext { c1, c2 }
}

/// encrypt with fresh randomness, returning it for proof generation
pub fn encrypt_with_rng<R: RngCore + CryptoRng>(
    amount: u64,
    public_key: &Point,
    rng: &mut R,
) -> (Ciphertext, Scalar) {
    let r = Scalar::random(rng);
    (encrypt(amount, public_key, &r), r)
}

/// M = C2 - sk * C1
pub fn decrypt_point(ciphertext: &Ciphertext, secret_key: &Scalar) -> Point {
    ciphertext.c2.sub(&ciphertext.c1.mul(secret_key))
}

pub fn homomorphic_add(ct1: &Ciphertext, ct2: &Ciphertext) -> Ciphertext {
    Ciphertext {
        c1: ct1.c1.add(&ct2.c1),
        c2: ct1.c2.add(&ct2.c2),
    }
}

pub fn homomorphic_sub(ct1: &Ciphertext, ct2: &Ciphertext) -> Ciphertext {
    Ciphertext {
        c1: ct1.c1.sub(&ct2.c1),
        c2: ct1.c2.sub(&ct2.c2),
    }
}

/// k * Enc(a) = Enc(k * a)
pub fn homomorphic_scalar_mul(scalar: &Scalar, ct: &Ciphertext) -> Ciphertext {
    Ciphertext {
        c1: ct.c1.mul(scalar),
        c2: ct.c2.mul(scalar),
    }
}

/// C' = C + Enc(0, PK, r'), unlinkable to C but decrypts identically
pub fn rerandomize(ciphertext: &Ciphertext, public_key: &Point, new_randomness: &Scalar) -> Ciphertext {
    homomorphic_add(ciphertext, &encrypt(0, public_key, new_randomness))
}
