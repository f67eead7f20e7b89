//! non-compliant exit
//!
//! a depositor who never makes it into an inclusion set can reclaim the
//! deposit after `ragequit_delay`, within `ragequit_window`. the exit opens
//! the commitment, so the nullifier is publicly linked to the deposit.

use std::fmt;

use pool_elgamal::Scalar;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    AccountId, Amount, AssetId, Commitment, Nullifier, PoolError, RequestId, Result, Timestamp,
};

/// ragequit lifecycle. `Executable` and `Expired` are reached by time alone
/// and are reported through [`RagequitRequest::effective_status`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RagequitStatus {
    /// waiting out the delay
    Pending,
    /// delay elapsed, window open
    Executable,
    /// paid out, nullifier spent
    Completed,
    /// withdrawn by the depositor
    Cancelled,
    /// window closed without execution
    Expired,
}

impl RagequitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RagequitStatus::Pending => "Pending",
            RagequitStatus::Executable => "Executable",
            RagequitStatus::Completed => "Completed",
            RagequitStatus::Cancelled => "Cancelled",
            RagequitStatus::Expired => "Expired",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, RagequitStatus::Pending | RagequitStatus::Executable)
    }

    pub fn can_transition_to(self, next: RagequitStatus) -> bool {
        use RagequitStatus::*;
        matches!(
            (self, next),
            (Pending, Executable)
                | (Pending, Cancelled)
                | (Executable, Completed)
                | (Executable, Cancelled)
                | (Executable, Expired)
        )
    }

    pub fn transition(self, next: RagequitStatus) -> Result<RagequitStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(PoolError::InvalidTransition {
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagequitRequest {
    pub request_id: RequestId,
    pub commitment: Commitment,
    pub nullifier: Nullifier,
    pub depositor: AccountId,
    pub asset_id: AssetId,
    pub amount: Amount,
    pub recipient: AccountId,
    pub initiated_at: Timestamp,
    /// initiated_at + ragequit_delay
    pub executable_at: Timestamp,
    /// executable_at + ragequit_window
    pub expires_at: Timestamp,
    /// last recorded status; see `effective_status`
    pub status: RagequitStatus,
}

impl RagequitRequest {
    /// stored status with the clock applied
    pub fn effective_status(&self, now: Timestamp) -> RagequitStatus {
        if !self.status.is_open() {
            return self.status;
        }
        if now > self.expires_at {
            RagequitStatus::Expired
        } else if now >= self.executable_at || self.status == RagequitStatus::Executable {
            RagequitStatus::Executable
        } else {
            RagequitStatus::Pending
        }
    }

    /// stored status after recording the clock-driven steps
    /// (Pending -> Executable -> Expired) that have happened by `now`
    fn settled(&self, now: Timestamp) -> Result<RagequitStatus> {
        let target = self.effective_status(now);
        let mut status = self.status;
        if status == RagequitStatus::Pending && target != RagequitStatus::Pending {
            status = status.transition(RagequitStatus::Executable)?;
        }
        if status == RagequitStatus::Executable && target == RagequitStatus::Expired {
            status = status.transition(RagequitStatus::Expired)?;
        }
        Ok(status)
    }

    /// move to `next` through the transition table, returning the stored
    /// status it replaced. nothing is written on error
    pub fn advance(&mut self, next: RagequitStatus, now: Timestamp) -> Result<RagequitStatus> {
        let to = self.settled(now)?.transition(next)?;
        Ok(std::mem::replace(&mut self.status, to))
    }

    /// record an expiry the clock has already reached
    pub fn expire(&mut self, now: Timestamp) -> Result<RagequitStatus> {
        let settled = self.settled(now)?;
        if settled != RagequitStatus::Expired || self.status == RagequitStatus::Expired {
            return Err(PoolError::InvalidTransition {
                from: self.effective_status(now).as_str(),
                to: RagequitStatus::Expired.as_str(),
            });
        }
        Ok(std::mem::replace(&mut self.status, settled))
    }

    /// Ok if the request may pay out at `now`
    pub fn ensure_executable(&self, now: Timestamp) -> Result<()> {
        match self.effective_status(now) {
            RagequitStatus::Executable => Ok(()),
            RagequitStatus::Pending => Err(PoolError::NotYetExecutable {
                executable_at: self.executable_at,
                now,
            }),
            RagequitStatus::Expired => Err(PoolError::Expired {
                expires_at: self.expires_at,
                now,
            }),
            status => status.transition(RagequitStatus::Completed).map(|_| ()),
        }
    }
}

/// full opening of a deposit, revealed only on ragequit
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct RagequitClaim {
    #[zeroize(skip)]
    pub commitment: Commitment,
    pub secret: [u8; 32],
    pub nullifier_seed: [u8; 32],
    pub amount: Amount,
    pub blinding: Scalar,
}

impl fmt::Debug for RagequitClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RagequitClaim")
            .field("commitment", &self.commitment)
            .field("amount", &self.amount)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(initiated_at: Timestamp) -> RagequitRequest {
        RagequitRequest {
            request_id: 0,
            commitment: Commitment([1; 32]),
            nullifier: Nullifier([2; 32]),
            depositor: [3; 32],
            asset_id: 0,
            amount: 100,
            recipient: [4; 32],
            initiated_at,
            executable_at: initiated_at + 100,
            expires_at: initiated_at + 100 + 50,
            status: RagequitStatus::Pending,
        }
    }

    #[test]
    fn test_effective_status_boundaries() {
        let req = request(1_000);
        assert_eq!(req.effective_status(1_000), RagequitStatus::Pending);
        assert_eq!(req.effective_status(1_099), RagequitStatus::Pending);
        assert_eq!(req.effective_status(1_100), RagequitStatus::Executable);
        assert_eq!(req.effective_status(1_150), RagequitStatus::Executable);
        assert_eq!(req.effective_status(1_151), RagequitStatus::Expired);
    }

    #[test]
    fn test_terminal_status_ignores_clock() {
        let mut req = request(0);
        req.status = RagequitStatus::Cancelled;
        assert_eq!(req.effective_status(120), RagequitStatus::Cancelled);
        assert!(matches!(
            req.ensure_executable(120),
            Err(PoolError::InvalidTransition { from: "Cancelled", .. })
        ));
    }

    #[test]
    fn test_ensure_executable() {
        let req = request(0);
        assert_eq!(
            req.ensure_executable(99),
            Err(PoolError::NotYetExecutable {
                executable_at: 100,
                now: 99
            })
        );
        assert!(req.ensure_executable(100).is_ok());
        assert_eq!(
            req.ensure_executable(151),
            Err(PoolError::Expired {
                expires_at: 150,
                now: 151
            })
        );
    }

    #[test]
    fn test_advance_records_executable_first() {
        let mut req = request(0);
        assert!(matches!(
            req.advance(RagequitStatus::Completed, 99),
            Err(PoolError::InvalidTransition { from: "Pending", to: "Completed" })
        ));
        assert_eq!(req.status, RagequitStatus::Pending);

        assert_eq!(req.advance(RagequitStatus::Completed, 100), Ok(RagequitStatus::Pending));
        assert_eq!(req.status, RagequitStatus::Completed);
        assert!(req.advance(RagequitStatus::Cancelled, 101).is_err());
        assert_eq!(req.status, RagequitStatus::Completed);
    }

    #[test]
    fn test_advance_after_expiry_fails() {
        let mut req = request(0);
        assert!(matches!(
            req.advance(RagequitStatus::Completed, 151),
            Err(PoolError::InvalidTransition { from: "Expired", to: "Completed" })
        ));
        assert!(req.advance(RagequitStatus::Cancelled, 151).is_err());
        assert_eq!(req.status, RagequitStatus::Pending);
    }

    #[test]
    fn test_stored_executable_still_expires() {
        let mut req = request(0);
        req.status = RagequitStatus::Executable;
        assert_eq!(req.effective_status(120), RagequitStatus::Executable);
        assert_eq!(req.effective_status(151), RagequitStatus::Expired);
    }

    #[test]
    fn test_expire() {
        let mut req = request(0);
        assert!(req.expire(150).is_err());
        assert_eq!(req.status, RagequitStatus::Pending);

        assert_eq!(req.expire(151), Ok(RagequitStatus::Pending));
        assert_eq!(req.status, RagequitStatus::Expired);
        assert!(req.expire(152).is_err());

        let mut cancelled = request(0);
        cancelled.advance(RagequitStatus::Cancelled, 10).unwrap();
        assert!(matches!(
            cancelled.expire(200),
            Err(PoolError::InvalidTransition { from: "Cancelled", .. })
        ));
    }

    #[test]
    fn test_transition_table() {
        use RagequitStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Executable.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Expired.can_transition_to(Executable));
        assert!(!Cancelled.can_transition_to(Pending));
    }
}
