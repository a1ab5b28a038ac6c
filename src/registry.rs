//! Registry of transferable ownership certificates.
//!
//! While a certificate for a container is outstanding, the registry is the
//! container's owner of record and the certificate holder is its beneficial
//! owner. Minting requires the registry to already own the container, and
//! burning is the only path by which registry-held ownership returns to a
//! direct address. The certificate table and the container's owner field are
//! kept consistent at every observable boundary.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::environment::Environment;
use crate::error::CustodyError;
use crate::events::Event;
use crate::id::AccountId;
use crate::ownable::Ownable;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRegistry {
    id: AccountId,
    /// container -> beneficial owner; at most one certificate per container
    certificates: BTreeMap<AccountId, AccountId>,
    /// container -> delegate approved for that single certificate
    approvals: HashMap<AccountId, AccountId>,
    /// holder -> operators approved for all of the holder's certificates
    operators: HashMap<AccountId, HashSet<AccountId>>,
}

impl OwnerRegistry {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            certificates: BTreeMap::new(),
            approvals: HashMap::new(),
            operators: HashMap::new(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    /// Number of certificates currently outstanding.
    pub fn total_outstanding(&self) -> usize {
        self.certificates.len()
    }

    /// Beneficial owner of the given container's certificate.
    pub fn owner_of(&self, container: &AccountId) -> Result<AccountId, CustodyError> {
        self.certificates
            .get(container)
            .copied()
            .ok_or(CustodyError::TokenNotFound)
    }

    /// Number of certificates held by `holder`.
    pub fn balance_of(&self, holder: &AccountId) -> usize {
        self.certificates
            .values()
            .filter(|owner| *owner == holder)
            .count()
    }

    /// Issue the certificate for a container the registry already owns.
    ///
    /// Any caller may mint; authority comes from the container's owner field
    /// pointing at this registry, which only the previous owner can have
    /// arranged.
    pub fn mint_to(
        &mut self,
        container: &dyn Ownable,
        beneficiary: AccountId,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        if beneficiary.is_zero() {
            return Err(CustodyError::ZeroOwner);
        }
        if container.owner() != self.id {
            return Err(CustodyError::NotRegistryOwned);
        }
        let container_id = container.id();
        if self.certificates.contains_key(&container_id) {
            return Err(CustodyError::AlreadyMinted);
        }
        self.certificates.insert(container_id, beneficiary);
        env.journal.record(Event::CertificateMinted {
            container: container_id,
            beneficiary,
        });
        debug!("minted certificate for {} to {}", container_id, beneficiary);
        Ok(())
    }

    /// Destroy the certificate and hand the container to `new_owner`.
    ///
    /// Caller must be the certificate holder, its approved delegate, or an
    /// operator for the holder. The certificate is removed before the
    /// container handover executes, so no observer sees a burned certificate
    /// alongside a registry-owned container or vice versa.
    pub fn burn_to(
        &mut self,
        caller: AccountId,
        container: &mut dyn Ownable,
        new_owner: AccountId,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        if new_owner.is_zero() {
            return Err(CustodyError::ZeroOwner);
        }
        let container_id = container.id();
        let holder = self
            .certificates
            .get(&container_id)
            .copied()
            .ok_or(CustodyError::TokenNotFound)?;
        if !self.is_authorized(caller, holder, &container_id) {
            return Err(CustodyError::NotAuthorized);
        }
        if container.owner() != self.id {
            return Err(CustodyError::NotRegistryOwned);
        }
        self.certificates.remove(&container_id);
        self.approvals.remove(&container_id);
        container.set_owner(new_owner);
        env.journal.record(Event::CertificateBurned {
            container: container_id,
            new_owner,
        });
        env.journal.record(Event::OwnershipTransferred {
            previous_owner: self.id,
            new_owner,
        });
        debug!("burned certificate for {} to {}", container_id, new_owner);
        Ok(())
    }

    /// Approve a delegate for one certificate. Caller must be the holder or
    /// one of the holder's operators.
    pub fn approve(
        &mut self,
        caller: AccountId,
        delegate: AccountId,
        container: AccountId,
    ) -> Result<(), CustodyError> {
        let holder = self
            .certificates
            .get(&container)
            .copied()
            .ok_or(CustodyError::TokenNotFound)?;
        if caller != holder && !self.is_approved_for_all(&holder, &caller) {
            return Err(CustodyError::NotAuthorized);
        }
        self.approvals.insert(container, delegate);
        Ok(())
    }

    pub fn approved_for(&self, container: &AccountId) -> Option<AccountId> {
        self.approvals.get(container).copied()
    }

    /// Grant or revoke an operator over every certificate the caller holds
    /// now or later.
    pub fn set_approval_for_all(&mut self, caller: AccountId, operator: AccountId, approved: bool) {
        if approved {
            self.operators.entry(caller).or_default().insert(operator);
        } else if let Some(operators) = self.operators.get_mut(&caller) {
            operators.remove(&operator);
            if operators.is_empty() {
                self.operators.remove(&caller);
            }
        }
    }

    pub fn is_approved_for_all(&self, holder: &AccountId, operator: &AccountId) -> bool {
        self.operators
            .get(holder)
            .map(|operators| operators.contains(operator))
            .unwrap_or(false)
    }

    /// Move beneficial ownership between holders without touching the
    /// container; the registry stays its owner of record throughout. The
    /// single-certificate approval is consumed by the move.
    pub fn transfer_from(
        &mut self,
        caller: AccountId,
        from: AccountId,
        to: AccountId,
        container: AccountId,
        env: &mut Environment,
    ) -> Result<(), CustodyError> {
        if to.is_zero() {
            return Err(CustodyError::ZeroOwner);
        }
        let holder = self
            .certificates
            .get(&container)
            .copied()
            .ok_or(CustodyError::TokenNotFound)?;
        if holder != from {
            return Err(CustodyError::NotAuthorized);
        }
        if !self.is_authorized(caller, holder, &container) {
            return Err(CustodyError::NotAuthorized);
        }
        self.approvals.remove(&container);
        self.certificates.insert(container, to);
        env.journal.record(Event::CertificateTransferred {
            from,
            to,
            container,
        });
        Ok(())
    }

    fn is_authorized(&self, actor: AccountId, holder: AccountId, container: &AccountId) -> bool {
        actor == holder
            || self.approvals.get(container) == Some(&actor)
            || self.is_approved_for_all(&holder, &actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::Vault;

    /// Bare ownable with no custody machinery, for exercising the registry
    /// against the capability seam alone.
    struct OwnableMock {
        id: AccountId,
        owner: AccountId,
    }

    impl OwnableMock {
        fn new(id: AccountId, owner: AccountId) -> Self {
            Self { id, owner }
        }
    }

    impl Ownable for OwnableMock {
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

    struct Fixture {
        env: Environment,
        registry: OwnerRegistry,
        owner: AccountId,
        not_owner: AccountId,
        nft_owner: AccountId,
        new_owner: AccountId,
        approved: AccountId,
    }

    fn setup() -> Fixture {
        Fixture {
            env: Environment::new(),
            registry: OwnerRegistry::new(AccountId::derive(&[b"registry"])),
            owner: AccountId::derive(&[b"owner"]),
            not_owner: AccountId::derive(&[b"not_owner"]),
            nft_owner: AccountId::derive(&[b"nft_owner"]),
            new_owner: AccountId::derive(&[b"new_owner"]),
            approved: AccountId::derive(&[b"approved"]),
        }
    }

    fn registry_owned(f: &Fixture) -> OwnableMock {
        let mut ownable = OwnableMock::new(AccountId::derive(&[b"ownable"]), f.owner);
        ownable.set_owner(f.registry.id());
        ownable
    }

    #[test]
    fn test_can_mint() {
        let mut f = setup();
        let ownable = registry_owned(&f);
        f.registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap();
        assert_eq!(ownable.owner(), f.registry.id());
        assert_eq!(f.registry.balance_of(&f.nft_owner), 1);
        assert_eq!(f.registry.owner_of(&ownable.id()).unwrap(), f.nft_owner);
        assert_eq!(
            f.env.journal.last().unwrap().event,
            Event::CertificateMinted {
                container: ownable.id(),
                beneficiary: f.nft_owner,
            }
        );
    }

    #[test]
    fn test_cannot_mint_if_not_owned_by_registry() {
        let mut f = setup();
        let ownable = OwnableMock::new(AccountId::derive(&[b"ownable"]), f.owner);
        let err = f
            .registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap_err();
        assert_eq!(err.to_string(), "owner is not the registry");
    }

    #[test]
    fn test_cannot_mint_twice() {
        let mut f = setup();
        let ownable = registry_owned(&f);
        f.registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap();
        let err = f
            .registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap_err();
        assert_eq!(err.to_string(), "token already minted");
    }

    #[test]
    fn test_holder_can_burn() {
        let mut f = setup();
        let mut ownable = registry_owned(&f);
        f.registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap();
        f.registry
            .burn_to(f.nft_owner, &mut ownable, f.new_owner, &mut f.env)
            .unwrap();
        assert_eq!(f.registry.balance_of(&f.nft_owner), 0);
        assert_eq!(ownable.owner(), f.new_owner);
        assert!(f.registry.owner_of(&ownable.id()).is_err());
    }

    #[test]
    fn test_approved_can_burn() {
        let mut f = setup();
        let mut ownable = registry_owned(&f);
        f.registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap();
        f.registry
            .approve(f.nft_owner, f.approved, ownable.id())
            .unwrap();
        f.registry
            .burn_to(f.approved, &mut ownable, f.new_owner, &mut f.env)
            .unwrap();
        assert_eq!(f.registry.balance_of(&f.nft_owner), 0);
        assert_eq!(ownable.owner(), f.new_owner);
    }

    #[test]
    fn test_approved_for_all_can_burn() {
        let mut f = setup();
        let mut ownable = registry_owned(&f);
        f.registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap();
        f.registry
            .set_approval_for_all(f.nft_owner, f.approved, true);
        f.registry
            .burn_to(f.approved, &mut ownable, f.new_owner, &mut f.env)
            .unwrap();
        assert_eq!(f.registry.balance_of(&f.nft_owner), 0);
        assert_eq!(ownable.owner(), f.new_owner);
    }

    #[test]
    fn test_stranger_cannot_burn() {
        let mut f = setup();
        let mut ownable = registry_owned(&f);
        f.registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap();
        let err = f
            .registry
            .burn_to(f.not_owner, &mut ownable, f.new_owner, &mut f.env)
            .unwrap_err();
        assert_eq!(err.to_string(), "caller is not owner nor approved");
    }

    #[test]
    fn test_burn_of_unminted_certificate() {
        let mut f = setup();
        let mut ownable = registry_owned(&f);
        let err = f
            .registry
            .burn_to(f.nft_owner, &mut ownable, f.new_owner, &mut f.env)
            .unwrap_err();
        assert_eq!(err.to_string(), "token does not exist");
    }

    #[test]
    fn test_certificate_transfer_moves_beneficial_ownership_only() {
        let mut f = setup();
        let mut ownable = registry_owned(&f);
        f.registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap();
        f.registry
            .approve(f.nft_owner, f.approved, ownable.id())
            .unwrap();

        f.registry
            .transfer_from(f.nft_owner, f.nft_owner, f.new_owner, ownable.id(), &mut f.env)
            .unwrap();

        // the container itself never changed hands
        assert_eq!(ownable.owner(), f.registry.id());
        assert_eq!(f.registry.owner_of(&ownable.id()).unwrap(), f.new_owner);
        // single-certificate approval was consumed by the move
        assert_eq!(f.registry.approved_for(&ownable.id()), None);
        let err = f
            .registry
            .burn_to(f.approved, &mut ownable, f.new_owner, &mut f.env)
            .unwrap_err();
        assert_eq!(err.to_string(), "caller is not owner nor approved");

        // the new holder can burn
        f.registry
            .burn_to(f.new_owner, &mut ownable, f.new_owner, &mut f.env)
            .unwrap();
        assert_eq!(ownable.owner(), f.new_owner);
    }

    #[test]
    fn test_round_trip_restores_direct_ownership() {
        let mut f = setup();
        let mut vault = Vault::new(AccountId::derive(&[b"vault"]), f.owner);
        let before = f.registry.total_outstanding();

        vault
            .transfer_ownership_to_registry(f.owner, &mut f.registry, &mut f.env)
            .unwrap();
        assert_eq!(f.registry.total_outstanding(), before + 1);

        f.registry
            .burn_to(f.owner, &mut vault, f.new_owner, &mut f.env)
            .unwrap();
        assert_eq!(vault.owner(), f.new_owner);
        assert_eq!(f.registry.total_outstanding(), before);
    }

    #[test]
    fn test_failed_mint_rolls_back_ownership_change() {
        let mut f = setup();
        let mut vault = Vault::new(AccountId::derive(&[b"vault"]), f.owner);

        // a certificate for the vault's identity is already outstanding
        let squatter = OwnableMock::new(vault.id(), f.registry.id());
        f.registry
            .mint_to(&squatter, f.nft_owner, &mut f.env)
            .unwrap();

        let err = vault
            .transfer_ownership_to_registry(f.owner, &mut f.registry, &mut f.env)
            .unwrap_err();
        assert_eq!(err.to_string(), "token already minted");
        // the whole operation failed: the vault is still directly owned
        assert_eq!(vault.owner(), f.owner);
    }

    #[test]
    fn test_mint_to_zero_beneficiary() {
        let mut f = setup();
        let ownable = registry_owned(&f);
        let err = f
            .registry
            .mint_to(&ownable, AccountId::ZERO, &mut f.env)
            .unwrap_err();
        assert_eq!(err.to_string(), "new owner is the zero account");
    }

    #[test]
    fn test_operator_revocation() {
        let mut f = setup();
        let mut ownable = registry_owned(&f);
        f.registry
            .mint_to(&ownable, f.nft_owner, &mut f.env)
            .unwrap();
        f.registry
            .set_approval_for_all(f.nft_owner, f.approved, true);
        assert!(f
            .registry
            .is_approved_for_all(&f.nft_owner, &f.approved));
        f.registry
            .set_approval_for_all(f.nft_owner, f.approved, false);
        let err = f
            .registry
            .burn_to(f.approved, &mut ownable, f.new_owner, &mut f.env)
            .unwrap_err();
        assert_eq!(err.to_string(), "caller is not owner nor approved");
    }
}
