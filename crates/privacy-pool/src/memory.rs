//! in-memory collaborators for tests and the simulator

use std::cell::Cell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::{AccountId, Amount, AssetId, Clock, ProofVerifier, Timestamp, TokenLedger};

/// balance table keyed by (asset, account)
#[derive(Clone, Debug)]
pub struct MemoryLedger {
    pool_account: AccountId,
    balances: HashMap<(AssetId, AccountId), Amount>,
    /// accounts that refuse to send or receive
    frozen: HashSet<AccountId>,
}

impl MemoryLedger {
    pub fn new(pool_account: AccountId) -> Self {
        Self {
            pool_account,
            balances: HashMap::new(),
            frozen: HashSet::new(),
        }
    }

    pub fn pool_account(&self) -> AccountId {
        self.pool_account
    }

    pub fn mint(&mut self, asset: AssetId, who: &AccountId, amount: Amount) {
        let balance = self.balances.entry((asset, *who)).or_insert(0);
        *balance = balance.saturating_add(amount);
    }

    pub fn freeze(&mut self, who: &AccountId) {
        self.frozen.insert(*who);
    }

    pub fn unfreeze(&mut self, who: &AccountId) {
        self.frozen.remove(who);
    }

    fn move_funds(&mut self, asset: AssetId, from: &AccountId, to: &AccountId, amount: Amount) -> bool {
        if self.frozen.contains(from) || self.frozen.contains(to) {
            return false;
        }
        let available = self.balance_of(asset, from);
        if available < amount {
            return false;
        }
        let credited = match self.balance_of(asset, to).checked_add(amount) {
            Some(v) => v,
            None => return false,
        };
        if from == to {
            return true;
        }
        self.balances.insert((asset, *from), available - amount);
        self.balances.insert((asset, *to), credited);
        true
    }
}

impl TokenLedger for MemoryLedger {
    fn transfer(&mut self, asset: AssetId, to: &AccountId, amount: Amount) -> bool {
        let from = self.pool_account;
        self.move_funds(asset, &from, to, amount)
    }

    fn transfer_from(
        &mut self,
        asset: AssetId,
        from: &AccountId,
        to: &AccountId,
        amount: Amount,
    ) -> bool {
        self.move_funds(asset, from, to, amount)
    }

    fn balance_of(&self, asset: AssetId, who: &AccountId) -> Amount {
        self.balances.get(&(asset, *who)).copied().unwrap_or(0)
    }
}

/// verifier with a fixed answer; stands in for a real proof system
#[derive(Clone, Copy, Debug)]
pub struct StaticVerifier {
    accept: bool,
}

impl StaticVerifier {
    pub fn accepting() -> Self {
        Self { accept: true }
    }

    pub fn rejecting() -> Self {
        Self { accept: false }
    }
}

impl ProofVerifier for StaticVerifier {
    fn verify(&self, _proof: &[u8], _public_inputs: &[[u8; 32]]) -> bool {
        self.accept
    }
}

/// settable clock; clones share the same time
#[derive(Clone, Debug, Default)]
pub struct ManualClock(Rc<Cell<Timestamp>>);

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self(Rc::new(Cell::new(now)))
    }

    pub fn set(&self, now: Timestamp) {
        self.0.set(now);
    }

    pub fn advance(&self, secs: u64) {
        self.0.set(self.0.get().saturating_add(secs));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.0.get()
    }
}

/// wall clock, seconds since the unix epoch
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}
