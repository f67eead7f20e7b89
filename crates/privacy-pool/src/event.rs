//! domain events, appended by every successful state change

use serde::{Deserialize, Serialize};

use crate::{
    AccountId, Amount, AspId, AspStatus, AssetId, Commitment, Hash, Nullifier, RequestId, SetId,
    SetType, Timestamp,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolEvent {
    Initialized {
        owner: AccountId,
        pool_account: AccountId,
        auditors: u32,
    },
    AuditorAdded {
        auditor: AccountId,
    },
    AuditorRemoved {
        auditor: AccountId,
    },
    Paused,
    Unpaused,

    AspRegistered {
        asp_id: AspId,
        owner: AccountId,
        stake: Amount,
    },
    AspApprovalVoted {
        asp_id: AspId,
        auditor: AccountId,
        votes: u32,
    },
    AspStatusChanged {
        asp_id: AspId,
        from: AspStatus,
        to: AspStatus,
        reason: Option<u32>,
    },

    AssociationSetCreated {
        set_id: SetId,
        asp_id: AspId,
        set_type: SetType,
        root: Hash,
        member_count: u64,
    },
    AssociationSetExtended {
        set_id: SetId,
        root: Hash,
        start_index: u64,
        inserted_count: u64,
    },
    AssociationSetDeactivated {
        set_id: SetId,
    },

    /// leaf appended to the deposit tree
    Deposited {
        commitment: Commitment,
        index: u64,
        asset_id: AssetId,
        amount: Amount,
        root: Hash,
    },
    /// nullifier spent by a compliant withdrawal; no link to the deposit
    Withdrawn {
        nullifier: Nullifier,
        recipient: AccountId,
        asset_id: AssetId,
        amount: Amount,
    },

    RagequitRequested {
        request_id: RequestId,
        commitment: Commitment,
        executable_at: Timestamp,
        expires_at: Timestamp,
    },
    /// nullifier spent by ragequit, publicly linked to its commitment
    RagequitExecuted {
        request_id: RequestId,
        commitment: Commitment,
        nullifier: Nullifier,
        recipient: AccountId,
        amount: Amount,
    },
    RagequitCancelled {
        request_id: RequestId,
    },
    RagequitExpired {
        request_id: RequestId,
    },
}
