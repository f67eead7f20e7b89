//! sigma proofs with fiat-shamir challenges
//!
//! - [`SchnorrProof`]: knowledge of x with P = x*G
//! - [`EncryptionProof`]: knowledge of (amount, r) behind an elgamal ciphertext
//! - [`DecryptionProof`]: a ciphertext decrypts to a claimed message point
//!
//! responses are `Scalar`s, so every response is reduced mod the group
//! order l rather than the base field prime.

use curve25519_dalek::scalar::Scalar;
use rand_core::{CryptoRng, RngCore};

use crate::elgamal::{derive_public_key, encode_amount, Ciphertext, KeyPair};
use crate::point::Point;
use crate::transcript::Transcript;
use crate::{
    CryptoError, Result, DECRYPTION_PROOF_DOMAIN, ENCRYPTION_PROOF_DOMAIN, SCHNORR_DOMAIN,
};

fn scalar_from_slice(bytes: &[u8]) -> Option<Scalar> {
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Scalar::from_canonical_bytes(arr).into()
}

fn point_from_slice(bytes: &[u8]) -> Option<Point> {
    let arr: [u8; 32] = bytes.try_into().ok()?;
    Point::decompress(&arr)
}

/// schnorr proof of knowledge of a discrete log
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchnorrProof {
    /// R = k * G
    pub commitment: Point,
    /// e = H(P, R, context)
    pub challenge: Scalar,
    /// s = k - e * x
    pub response: Scalar,
}

impl SchnorrProof {
    fn challenge(public: &Point, commitment: &Point, context: &[u8]) -> Scalar {
        let mut t = Transcript::new(SCHNORR_DOMAIN);
        t.append_point(b"G", &Point::generator());
        t.append_point(b"P", public);
        t.append_point(b"R", commitment);
        t.append_message(b"context", context);
        t.challenge_scalar(b"e")
    }

    /// prove knowledge of `secret` for `public` with an explicit nonce
    pub fn prove(secret: &Scalar, public: &Point, nonce: &Scalar, context: &[u8]) -> Self {
        let commitment = Point::generator().mul(nonce);
        let challenge = Self::challenge(public, &commitment, context);
        let response = nonce - challenge * secret;
        Self {
            commitment,
            challenge,
            response,
        }
    }

    pub fn prove_with_rng<R: RngCore + CryptoRng>(
        secret: &Scalar,
        context: &[u8],
        rng: &mut R,
    ) -> Self {
        let public = derive_public_key(secret);
        Self::prove(secret, &public, &Scalar::random(rng), context)
    }

    /// check s*G + e*P == R with a recomputed challenge
    pub fn verify(&self, public: &Point, context: &[u8]) -> bool {
        if public.is_zero() || self.commitment.is_zero() {
            return false;
        }
        if Self::challenge(public, &self.commitment, context) != self.challenge {
            return false;
        }
        let lhs = Point::generator()
            .mul(&self.response)
            .add(&public.mul(&self.challenge));
        lhs == self.commitment
    }

    pub fn to_bytes(&self) -> [u8; 96] {
        let mut bytes = [0u8; 96];
        bytes[..32].copy_from_slice(&self.commitment.compress());
        bytes[32..64].copy_from_slice(self.challenge.as_bytes());
        bytes[64..].copy_from_slice(self.response.as_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 96 {
            return Err(CryptoError::InvalidPoint);
        }
        Ok(Self {
            commitment: point_from_slice(&bytes[..32]).ok_or(CryptoError::InvalidPoint)?,
            challenge: scalar_from_slice(&bytes[32..64]).ok_or(CryptoError::InvalidScalar)?,
            response: scalar_from_slice(&bytes[64..]).ok_or(CryptoError::InvalidScalar)?,
        })
    }
}

/// proof that a ciphertext was built from a known (amount, r)
///
/// statement: C1 = r*G, C2 = a*H + r*PK
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EncryptionProof {
    /// A1 = k_r * G
    pub commitment_c1: Point,
    /// A2 = k_a * H + k_r * PK
    pub commitment_c2: Point,
    pub challenge: Scalar,
    /// z_a = k_a + e * a
    pub response_amount: Scalar,
    /// z_r = k_r + e * r
    pub response_randomness: Scalar,
}

impl EncryptionProof {
    fn challenge(pk: &Point, ct: &Ciphertext, a1: &Point, a2: &Point) -> Scalar {
        let mut t = Transcript::new(ENCRYPTION_PROOF_DOMAIN);
        t.append_point(b"G", &Point::generator());
        t.append_point(b"H", &Point::generator_h());
        t.append_point(b"PK", pk);
        t.append_point(b"C1", &ct.c1);
        t.append_point(b"C2", &ct.c2);
        t.append_point(b"A1", a1);
        t.append_point(b"A2", a2);
        t.challenge_scalar(b"e")
    }

    /// prove with explicit nonces (k_a, k_r)
    pub fn prove(
        amount: u64,
        randomness: &Scalar,
        public_key: &Point,
        ciphertext: &Ciphertext,
        nonce_amount: &Scalar,
        nonce_randomness: &Scalar,
    ) -> Self {
        let commitment_c1 = Point::generator().mul(nonce_randomness);
        let commitment_c2 = Point::generator_h()
            .mul(nonce_amount)
            .add(&public_key.mul(nonce_randomness));
        let challenge = Self::challenge(public_key, ciphertext, &commitment_c1, &commitment_c2);
        Self {
            commitment_c1,
            commitment_c2,
            challenge,
            response_amount: nonce_amount + challenge * Scalar::from(amount),
            response_randomness: nonce_randomness + challenge * randomness,
        }
    }

    pub fn prove_with_rng<R: RngCore + CryptoRng>(
        amount: u64,
        randomness: &Scalar,
        public_key: &Point,
        ciphertext: &Ciphertext,
        rng: &mut R,
    ) -> Self {
        let k_a = Scalar::random(rng);
        let k_r = Scalar::random(rng);
        Self::prove(amount, randomness, public_key, ciphertext, &k_a, &k_r)
    }

    /// z_r*G == A1 + e*C1 and z_a*H + z_r*PK == A2 + e*C2
    pub fn verify(&self, public_key: &Point, ciphertext: &Ciphertext) -> bool {
        if public_key.is_zero() || ciphertext.c1.is_zero() {
            return false;
        }
        let e = Self::challenge(public_key, ciphertext, &self.commitment_c1, &self.commitment_c2);
        if e != self.challenge {
            return false;
        }

        let lhs1 = Point::generator().mul(&self.response_randomness);
        let rhs1 = self.commitment_c1.add(&ciphertext.c1.mul(&e));

        let lhs2 = Point::generator_h()
            .mul(&self.response_amount)
            .add(&public_key.mul(&self.response_randomness));
        let rhs2 = self.commitment_c2.add(&ciphertext.c2.mul(&e));

        lhs1 == rhs1 && lhs2 == rhs2
    }
}

/// chaum-pedersen proof that `ciphertext` decrypts to `message` under the
/// secret key behind `public_key`
///
/// statement: log_G(PK) == log_C1(C2 - M)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecryptionProof {
    /// A = k * G
    pub commitment_g: Point,
    /// B = k * C1
    pub commitment_c1: Point,
    pub challenge: Scalar,
    /// s = k + e * sk
    pub response: Scalar,
}

impl DecryptionProof {
    fn challenge(pk: &Point, ct: &Ciphertext, message: &Point, a: &Point, b: &Point) -> Scalar {
        let mut t = Transcript::new(DECRYPTION_PROOF_DOMAIN);
        t.append_point(b"G", &Point::generator());
        t.append_point(b"PK", pk);
        t.append_point(b"C1", &ct.c1);
        t.append_point(b"C2", &ct.c2);
        t.append_point(b"M", message);
        t.append_point(b"A", a);
        t.append_point(b"B", b);
        t.challenge_scalar(b"e")
    }

    /// decrypt and prove the result, returning (M, proof)
    pub fn prove(keypair: &KeyPair, ciphertext: &Ciphertext, nonce: &Scalar) -> (Point, Self) {
        let message = keypair.decrypt(ciphertext);
        let commitment_g = Point::generator().mul(nonce);
        let commitment_c1 = ciphertext.c1.mul(nonce);
        let challenge = Self::challenge(
            &keypair.public_key(),
            ciphertext,
            &message,
            &commitment_g,
            &commitment_c1,
        );
        let response = nonce + challenge * keypair.secret_key().scalar();
        (
            message,
            Self {
                commitment_g,
                commitment_c1,
                challenge,
                response,
            },
        )
    }

    pub fn prove_with_rng<R: RngCore + CryptoRng>(
        keypair: &KeyPair,
        ciphertext: &Ciphertext,
        rng: &mut R,
    ) -> (Point, Self) {
        Self::prove(keypair, ciphertext, &Scalar::random(rng))
    }

    pub fn verify(&self, public_key: &Point, ciphertext: &Ciphertext, message: &Point) -> bool {
        if public_key.is_zero() {
            return false;
        }
        let e = Self::challenge(
            public_key,
            ciphertext,
            message,
            &self.commitment_g,
            &self.commitment_c1,
        );
        if e != self.challenge {
            return false;
        }
        let shared = ciphertext.c2.sub(message);
        let lhs1 = Point::generator().mul(&self.response);
        let rhs1 = self.commitment_g.add(&public_key.mul(&e));
        let lhs2 = ciphertext.c1.mul(&self.response);
        let rhs2 = self.commitment_c1.add(&shared.mul(&e));
        lhs1 == rhs1 && lhs2 == rhs2
    }

    /// verify against an integer amount rather than a message point
    pub fn verify_amount(&self, public_key: &Point, ciphertext: &Ciphertext, amount: u64) -> bool {
        self.verify(public_key, ciphertext, &encode_amount(amount))
    }
}
