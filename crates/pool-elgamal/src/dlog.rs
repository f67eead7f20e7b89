//! bounded discrete log recovery
//!
//! baby-step giant-step over amount*H. only sensible for small ranges:
//! table size is sqrt(bound), so the bound is capped at 2^40.

use std::collections::HashMap;

use curve25519_dalek::scalar::Scalar;

use crate::elgamal::{decrypt_point, Ciphertext};
use crate::point::Point;
use crate::{CryptoError, Result};

/// largest bound accepted by [`solve_discrete_log`]
pub const MAX_DLOG_BOUND: u64 = 1 << 40;

/// find `amount <= bound` with `amount*H == message`
pub fn solve_discrete_log(message: &Point, bound: u64) -> Result<u64> {
    if bound > MAX_DLOG_BOUND {
        return Err(CryptoError::BoundTooLarge {
            bound,
            max: MAX_DLOG_BOUND,
        });
    }

    let h = Point::generator_h();
    let m = (bound as f64 + 1.0).sqrt().ceil() as u64;
    let m = m.max(1);

    // baby steps: j*H for j in [0, m)
    let mut table = HashMap::with_capacity(m as usize);
    let mut step = Point::identity();
    for j in 0..m {
        table.entry(step.compress()).or_insert(j);
        step = step.add(&h);
    }

    // giant steps: message - i*m*H
    let giant = h.mul_u64(m);
    let mut gamma = *message;
    for i in 0..=m {
        if let Some(j) = table.get(&gamma.compress()) {
            let amount = i * m + j;
            if amount <= bound {
                return Ok(amount);
            }
        }
        gamma = gamma.sub(&giant);
    }

    Err(CryptoError::DiscreteLogOutOfRange { bound })
}

/// decrypt and recover the integer amount, for amounts known to be small
pub fn decrypt_bounded(ciphertext: &Ciphertext, secret_key: &Scalar, bound: u64) -> Result<u64> {
    solve_discrete_log(&decrypt_point(ciphertext, secret_key), bound)
}
