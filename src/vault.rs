//! The custody container: single-owner authority over a basket of native
//! currency, fungible tokens and NFTs, with an optional time-lock.
//!
//! Time-locking gates asset movement and lock reconfiguration. It never
//! gates succession of control: ownership transfer succeeds on a locked
//! container.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::clock::Timestamp;
use crate::environment::Environment;
use crate::error::CustodyError;
use crate::events::Event;
use crate::id::{AccountId, TokenId};
use crate::ownable::Ownable;
use crate::registry::OwnerRegistry;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vault {
    id: AccountId,
    owner: AccountId,
    /// Zero or any value <= now means UNLOCKED; a future value means LOCKED.
    /// Lock state is recomputed against the clock on every call.
    unlock_time: Timestamp,
    /// Audit record of custodied tokens per collection. The asset ledger is
    /// authoritative; tokens pushed in without the acceptance hook do not
    /// appear here.
    held: HashMap<AccountId, BTreeSet<TokenId>>,
}

impl Vault {
    pub fn new(id: AccountId, owner: AccountId) -> Self {
        Self {
            id,
            owner,
            unlock_time: 0,
            held: HashMap::new(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }

    pub fn unlock_time(&self) -> Timestamp {
        self.unlock_time
    }

    /// Whether the container is currently LOCKED. A computed predicate, not
    /// a stored flag: the container unlocks by itself once the clock passes
    /// the unlock point.
    pub fn is_locked(&self, env: &Environment) -> bool {
        self.unlock_time > env.now()
    }

    /// Audit view of custodied token ids for one collection.
    pub fn custodied(&self, asset: &AccountId) -> Vec<TokenId> {
        self.held
            .get(asset)
            .map(|tokens| tokens.iter().copied().collect())
            .unwrap_or_default()
    }

    fn ensure_owner(&self, caller: AccountId) -> Result<(), CustodyError> {
        if caller != self.owner {
            return Err(CustodyError::NotOwner);
        }
        Ok(())
    }

    fn ensure_unlocked(&self, env: &Environment) -> Result<(), CustodyError> {
        if self.is_locked(env) {
            return Err(CustodyError::TimeLocked);
        }
        Ok(())
    }

    /// Withdraw native currency to the owner.
    pub fn withdraw_native(
        &self,
        caller: AccountId,
        amount: u128,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        self.ensure_owner(caller)?;
        self.ensure_unlocked(env)?;
        env.native.transfer(self.id, self.owner, amount)?;
        env.journal.record(Event::Withdraw {
            from: caller,
            asset: AccountId::ZERO,
            amount,
        });
        debug!("vault {} withdrew {} native units", self.id, amount);
        Ok(())
    }

    /// Withdraw the whole native balance. The balance is read immediately
    /// before the transfer so nothing can slip in between.
    pub fn withdraw_all_native(
        &self,
        caller: AccountId,
        env: &mut Environment,
    ) -> Result<u128, CustodyError> {
        self.ensure_owner(caller)?;
        self.ensure_unlocked(env)?;
        let amount = env.native.balance_of(&self.id);
        env.native.transfer(self.id, self.owner, amount)?;
        env.journal.record(Event::Withdraw {
            from: caller,
            asset: AccountId::ZERO,
            amount,
        });
        Ok(amount)
    }

    /// Withdraw a fungible asset to the owner.
    pub fn withdraw_fungible(
        &self,
        caller: AccountId,
        asset: AccountId,
        amount: u128,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        self.ensure_owner(caller)?;
        self.ensure_unlocked(env)?;
        let owner = self.owner;
        let ledger = env.token_mut(&asset)?;
        ledger.transfer(self.id, owner, amount)?;
        env.journal.record(Event::Withdraw {
            from: caller,
            asset,
            amount,
        });
        Ok(())
    }

    /// Withdraw the whole balance of one fungible asset.
    pub fn withdraw_all_fungible(
        &self,
        caller: AccountId,
        asset: AccountId,
        env: &mut Environment,
    ) -> Result<u128, CustodyError> {
        self.ensure_owner(caller)?;
        self.ensure_unlocked(env)?;
        let owner = self.owner;
        let ledger = env.token_mut(&asset)?;
        let amount = ledger.balance_of(&self.id);
        ledger.transfer(self.id, owner, amount)?;
        env.journal.record(Event::Withdraw {
            from: caller,
            asset,
            amount,
        });
        Ok(amount)
    }

    /// Withdraw one custodied token to the owner.
    ///
    /// Fails with `InsufficientBalance` when the authoritative ledger does
    /// not show this vault as the token's holder. The audit record is
    /// dropped before the ledger transfer executes.
    pub fn withdraw_nft(
        &mut self,
        caller: AccountId,
        asset: AccountId,
        token_id: TokenId,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        self.ensure_owner(caller)?;
        self.ensure_unlocked(env)?;
        if env.nft(&asset)?.owner_of(&token_id) != Some(self.id) {
            return Err(CustodyError::InsufficientBalance);
        }
        self.forget(asset, token_id);
        let owner = self.owner;
        env.nft_mut(&asset)?
            .transfer_from(self.id, self.id, owner, token_id)?;
        env.journal.record(Event::NftWithdraw {
            from: caller,
            asset,
            token_id,
        });
        Ok(())
    }

    /// Withdraw every recorded token of one collection. Ids the
    /// authoritative ledger no longer attributes to this vault are dropped
    /// from the record and skipped. Returns the ids actually withdrawn.
    pub fn withdraw_all_nfts(
        &mut self,
        caller: AccountId,
        asset: AccountId,
        env: &mut Environment,
    ) -> Result<Vec<TokenId>, CustodyError> {
        self.ensure_owner(caller)?;
        self.ensure_unlocked(env)?;
        env.nft(&asset)?;
        let owner = self.owner;
        let recorded: Vec<TokenId> = self
            .held
            .remove(&asset)
            .map(|tokens| tokens.into_iter().collect())
            .unwrap_or_default();
        let mut withdrawn = Vec::with_capacity(recorded.len());
        for token_id in recorded {
            if env.nft(&asset)?.owner_of(&token_id) != Some(self.id) {
                continue;
            }
            env.nft_mut(&asset)?
                .transfer_from(self.id, self.id, owner, token_id)?;
            env.journal.record(Event::NftWithdraw {
                from: caller,
                asset,
                token_id,
            });
            withdrawn.push(token_id);
        }
        Ok(withdrawn)
    }

    /// Pull-path deposit: moves `token_id` from the caller into custody,
    /// relying on the approval the token's owner granted this vault on the
    /// asset ledger. Owner-agnostic; refusal of the vault's own governing
    /// certificate happens before any ledger is touched.
    pub fn deposit_nft(
        &mut self,
        caller: AccountId,
        asset: AccountId,
        token_id: TokenId,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        self.refuse_own_certificate(asset, token_id)?;
        env.nft_mut(&asset)?
            .transfer_from(self.id, caller, self.id, token_id)?;
        self.held.entry(asset).or_default().insert(token_id);
        Ok(())
    }

    /// Push-path acceptance hook, invoked after an asset ledger has already
    /// moved a token here on its own authority. No approval check; custody
    /// is only recorded, never acquired.
    pub fn on_nft_received(
        &mut self,
        asset: AccountId,
        token_id: TokenId,
    ) -> Result<(), CustodyError> {
        self.refuse_own_certificate(asset, token_id)?;
        self.held.entry(asset).or_default().insert(token_id);
        Ok(())
    }

    // Absorbing the certificate that represents this vault's own ownership
    // would strand the container with no reachable owner.
    fn refuse_own_certificate(
        &self,
        asset: AccountId,
        token_id: TokenId,
    ) -> Result<(), CustodyError> {
        if asset == self.owner && token_id == TokenId::from(self.id) {
            return Err(CustodyError::SelfCustody);
        }
        Ok(())
    }

    fn forget(&mut self, asset: AccountId, token_id: TokenId) {
        if let Some(tokens) = self.held.get_mut(&asset) {
            tokens.remove(&token_id);
            if tokens.is_empty() {
                self.held.remove(&asset);
            }
        }
    }

    /// Establish or clear a time-lock. Only reachable from the UNLOCKED
    /// state: once LOCKED, every attempt fails alike until the unlock time
    /// elapses. `new_time <= now` leaves the container UNLOCKED.
    pub fn set_unlock_time(
        &mut self,
        caller: AccountId,
        new_time: Timestamp,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        self.ensure_owner(caller)?;
        self.ensure_unlocked(env)?;
        let old_time = self.unlock_time;
        self.unlock_time = new_time;
        env.journal.record(Event::TimeLock {
            from: caller,
            old_time,
            new_time,
        });
        debug!("vault {} unlock time {} -> {}", self.id, old_time, new_time);
        Ok(())
    }

    /// Hand the container to a new direct owner. Permitted regardless of
    /// lock state.
    pub fn transfer_ownership(
        &mut self,
        caller: AccountId,
        new_owner: AccountId,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        self.ensure_owner(caller)?;
        if new_owner.is_zero() {
            return Err(CustodyError::ZeroOwner);
        }
        let previous_owner = self.owner;
        self.owner = new_owner;
        env.journal.record(Event::OwnershipTransferred {
            previous_owner,
            new_owner,
        });
        Ok(())
    }

    /// Hand the container to a registry and mint the ownership certificate
    /// to the previous owner in one step. If minting fails the ownership
    /// change is undone and the whole operation fails. Permitted regardless
    /// of lock state.
    pub fn transfer_ownership_to_registry(
        &mut self,
        caller: AccountId,
        registry: &mut OwnerRegistry,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        self.ensure_owner(caller)?;
        let previous_owner = self.owner;
        self.owner = registry.id();
        if let Err(err) = registry.mint_to(self, previous_owner, env) {
            self.owner = previous_owner;
            return Err(err);
        }
        env.journal.record(Event::OwnershipTransferred {
            previous_owner,
            new_owner: registry.id(),
        });
        Ok(())
    }
}

impl Ownable for Vault {
    fn id(&self) -> AccountId {
        self.id
    }

    fn owner(&self) -> AccountId {
        self.owner
    }

    fn set_owner(&mut self, new_owner: AccountId) {
        self.owner = new_owner;
    }
}
