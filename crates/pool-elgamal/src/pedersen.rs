//! pedersen commitments
//!
//! C = amount*H + blinding*G, same generator roles as the elgamal layer so
//! an amount commitment and an encryption of that amount share `amount*H`

use curve25519_dalek::scalar::Scalar;

use crate::point::Point;

pub fn pedersen_commit(amount: &Scalar, blinding: &Scalar) -> Point {
    Point::generator_h()
        .mul(amount)
        .add(&Point::generator().mul(blinding))
}

/// commit to an integer amount
pub fn pedersen_commit_amount(amount: u128, blinding: &Scalar) -> Point {
    pedersen_commit(&Scalar::from(amount), blinding)
}

/// check an opening (amount, blinding) against a commitment
pub fn verify_opening(commitment: &Point, amount: u128, blinding: &Scalar) -> bool {
    !commitment.is_zero() && pedersen_commit_amount(amount, blinding) == *commitment
}
