//! blake2b fiat-shamir transcript
//!
//! running hash over length-prefixed labeled messages. challenges are
//! derived from a clone of the state and folded back in, so two challenges
//! drawn in sequence never repeat.

use blake2::{Blake2b512, Digest};
use curve25519_dalek::scalar::Scalar;

use crate::point::Point;

#[derive(Clone)]
pub struct Transcript {
    state: Blake2b512,
    challenge_counter: u64,
}

impl Transcript {
    /// new transcript bound to a domain separator
    pub fn new(domain_sep: &[u8]) -> Self {
        let mut state = Blake2b512::new();
        state.update(b"pool-elgamal.transcript.v1");
        state.update((domain_sep.len() as u32).to_le_bytes());
        state.update(domain_sep);
        Self {
            state,
            challenge_counter: 0,
        }
    }

    pub fn append_message(&mut self, label: &[u8], message: &[u8]) {
        self.state.update((label.len() as u32).to_le_bytes());
        self.state.update(label);
        self.state.update((message.len() as u32).to_le_bytes());
        self.state.update(message);
    }

    pub fn append_u64(&mut self, label: &[u8], value: u64) {
        self.append_message(label, &value.to_le_bytes());
    }

    pub fn append_point(&mut self, label: &[u8], point: &Point) {
        self.append_message(label, &point.compress());
    }

    /// challenge scalar, wide-reduced mod the group order
    pub fn challenge_scalar(&mut self, label: &[u8]) -> Scalar {
        let mut challenge_state = self.state.clone();
        challenge_state.update(b"challenge");
        challenge_state.update((label.len() as u32).to_le_bytes());
        challenge_state.update(label);
        challenge_state.update(self.challenge_counter.to_le_bytes());
        self.challenge_counter += 1;

        let mut wide = [0u8; 64];
        wide.copy_from_slice(&challenge_state.finalize());
        self.state.update(b"challenge_out");
        self.state.update(wide);

        Scalar::from_bytes_mod_order_wide(&wide)
    }
}
