//! Creates and tracks custody vaults.
//!
//! The factory derives fresh container identities from its own identity plus
//! a sequence number, so two factory instances never claim each other's
//! containers.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::environment::Environment;
use crate::error::CustodyError;
use crate::events::Event;
use crate::id::AccountId;
use crate::vault::Vault;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultFactory {
    id: AccountId,
    /// Append-only creation order.
    sequence: Vec<AccountId>,
    /// Membership set for O(1) "is this one of ours" queries.
    members: HashSet<AccountId>,
}

impl VaultFactory {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            sequence: Vec::new(),
            members: HashSet::new(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Create a vault owned by the caller, endowed with `endowment` native
    /// units moved from the caller's balance. The container accepts the
    /// creation-time deposit unconditionally.
    pub fn create_vault(
        &mut self,
        caller: AccountId,
        endowment: u128,
        env: &mut Environment,
    ) -> Result<Vault, CustodyError> {
        if caller.is_zero() {
            return Err(CustodyError::ZeroOwner);
        }
        let seq = self.sequence.len() as u64;
        let vault_id = AccountId::derive(&[b"vault", self.id.bytes(), &seq.to_le_bytes()]);
        let vault = Vault::new(vault_id, caller);
        if endowment > 0 {
            env.native.transfer(caller, vault_id, endowment)?;
        }
        self.sequence.push(vault_id);
        self.members.insert(vault_id);
        env.journal.record(Event::VaultCreated {
            creator: caller,
            vault: vault_id,
        });
        debug!("factory {} created vault {} for {}", self.id, vault_id, caller);
        Ok(vault)
    }

    /// Number of vaults created so far.
    pub fn count(&self) -> usize {
        self.sequence.len()
    }

    /// Identity of the `index`-th created vault.
    pub fn at(&self, index: usize) -> Result<AccountId, CustodyError> {
        self.sequence
            .get(index)
            .copied()
            .ok_or(CustodyError::IndexOutOfRange)
    }

    /// Whether this factory instance created the given container. False for
    /// structurally identical containers from another factory.
    pub fn ours(&self, container: &AccountId) -> bool {
        self.members.contains(container)
    }
}
