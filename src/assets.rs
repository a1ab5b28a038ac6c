//! Asset-side state the custody containers run atop.
//!
//! Authoritative custody lives in these ledgers, not in the container: a
//! vault "holds" an asset exactly when the asset's own ledger says so. The
//! containers keep only audit records.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::error::CustodyError;
use crate::id::{AccountId, TokenId};

/// Debit `from` in full before crediting `to`, so an exact-balance transfer
/// leaves zero and a self-transfer is a no-op.
fn move_amount(
    balances: &mut HashMap<AccountId, u128>,
    from: AccountId,
    to: AccountId,
    amount: u128,
) -> Result<(), CustodyError> {
    let held = balances.get(&from).copied().unwrap_or(0);
    if amount > held {
        return Err(CustodyError::InsufficientBalance);
    }
    balances.insert(from, held - amount);
    *balances.entry(to).or_insert(0) += amount;
    Ok(())
}

/// Ledger of the native currency. Plain value deposits never fail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeLedger {
    balances: HashMap<AccountId, u128>,
}

impl NativeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Unconditional deposit of freshly issued units.
    pub fn mint(&mut self, to: AccountId, amount: u128) {
        *self.balances.entry(to).or_insert(0) += amount;
    }

    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), CustodyError> {
        move_amount(&mut self.balances, from, to, amount)
    }
}

/// A single fungible asset, identified like any other participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenLedger {
    id: AccountId,
    symbol: String,
    balances: HashMap<AccountId, u128>,
}

impl TokenLedger {
    pub fn new(id: AccountId, symbol: impl Into<String>) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            balances: HashMap::new(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn balance_of(&self, account: &AccountId) -> u128 {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn mint(&mut self, to: AccountId, amount: u128) {
        *self.balances.entry(to).or_insert(0) += amount;
    }

    pub fn transfer(
        &mut self,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<(), CustodyError> {
        move_amount(&mut self.balances, from, to, amount)
    }
}

/// A single non-fungible collection: unique-id ownership with single-token
/// approvals and blanket operator approvals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftLedger {
    id: AccountId,
    owners: BTreeMap<TokenId, AccountId>,
    token_approvals: HashMap<TokenId, AccountId>,
    /// holder -> operators approved for all of the holder's tokens
    operator_approvals: HashMap<AccountId, HashSet<AccountId>>,
}

impl NftLedger {
    pub fn new(id: AccountId) -> Self {
        Self {
            id,
            owners: BTreeMap::new(),
            token_approvals: HashMap::new(),
            operator_approvals: HashMap::new(),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn mint(&mut self, to: AccountId, token: TokenId) -> Result<(), CustodyError> {
        if to.is_zero() {
            return Err(CustodyError::ZeroOwner);
        }
        if self.owners.contains_key(&token) {
            return Err(CustodyError::AlreadyMinted);
        }
        self.owners.insert(token, to);
        Ok(())
    }

    pub fn owner_of(&self, token: &TokenId) -> Option<AccountId> {
        self.owners.get(token).copied()
    }

    pub fn balance_of(&self, account: &AccountId) -> usize {
        self.owners.values().filter(|owner| *owner == account).count()
    }

    /// Approve a delegate for one token. Caller must be the token's owner or
    /// an operator for the owner.
    pub fn approve(
        &mut self,
        caller: AccountId,
        delegate: AccountId,
        token: TokenId,
    ) -> Result<(), CustodyError> {
        let owner = self.owner_of(&token).ok_or(CustodyError::TokenNotFound)?;
        if caller != owner && !self.is_approved_for_all(&owner, &caller) {
            return Err(CustodyError::NotAuthorized);
        }
        self.token_approvals.insert(token, delegate);
        Ok(())
    }

    pub fn approved_for(&self, token: &TokenId) -> Option<AccountId> {
        self.token_approvals.get(token).copied()
    }

    pub fn set_approval_for_all(&mut self, caller: AccountId, operator: AccountId, approved: bool) {
        if approved {
            self.operator_approvals
                .entry(caller)
                .or_default()
                .insert(operator);
        } else if let Some(operators) = self.operator_approvals.get_mut(&caller) {
            operators.remove(&operator);
            if operators.is_empty() {
                self.operator_approvals.remove(&caller);
            }
        }
    }

    pub fn is_approved_for_all(&self, holder: &AccountId, operator: &AccountId) -> bool {
        self.operator_approvals
            .get(holder)
            .map(|operators| operators.contains(operator))
            .unwrap_or(false)
    }

    fn is_authorized(&self, actor: AccountId, owner: AccountId, token: &TokenId) -> bool {
        actor == owner
            || self.token_approvals.get(token) == Some(&actor)
            || self.is_approved_for_all(&owner, &actor)
    }

    /// Move a token. `operator` must be the owner, the token's approved
    /// delegate, or an operator for the owner; the token must currently be
    /// held by `from`. The single-token approval is consumed by the move.
    pub fn transfer_from(
        &mut self,
        operator: AccountId,
        from: AccountId,
        to: AccountId,
        token: TokenId,
    ) -> Result<(), CustodyError> {
        if to.is_zero() {
            return Err(CustodyError::ZeroOwner);
        }
        let owner = self.owner_of(&token).ok_or(CustodyError::InsufficientBalance)?;
        if owner != from {
            return Err(CustodyError::InsufficientBalance);
        }
        if !self.is_authorized(operator, owner, &token) {
            return Err(CustodyError::NotAuthorized);
        }
        self.token_approvals.remove(&token);
        self.owners.insert(token, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acct(seed: &[u8]) -> AccountId {
        AccountId::derive(&[seed])
    }

    #[test]
    fn test_native_transfer_exact_balance() {
        let mut ledger = NativeLedger::new();
        let a = acct(b"a");
        let b = acct(b"b");
        ledger.mint(a, 10);
        ledger.transfer(a, b, 10).unwrap();
        assert_eq!(ledger.balance_of(&a), 0);
        assert_eq!(ledger.balance_of(&b), 10);
    }

    #[test]
    fn test_native_transfer_above_balance() {
        let mut ledger = NativeLedger::new();
        let a = acct(b"a");
        let b = acct(b"b");
        ledger.mint(a, 10);
        let err = ledger.transfer(a, b, 11).unwrap_err();
        assert_eq!(err.to_string(), "transfer amount exceeds balance");
        // nothing moved
        assert_eq!(ledger.balance_of(&a), 10);
        assert_eq!(ledger.balance_of(&b), 0);
    }

    #[test]
    fn test_fungible_ledger() {
        let mut token = TokenLedger::new(acct(b"token"), "TEST");
        let a = acct(b"a");
        let b = acct(b"b");
        token.mint(a, 1000);
        token.transfer(a, b, 400).unwrap();
        assert_eq!(token.balance_of(&a), 600);
        assert_eq!(token.balance_of(&b), 400);
        assert_eq!(token.symbol(), "TEST");
    }

    #[test]
    fn test_nft_mint_and_transfer_by_owner() {
        let mut nft = NftLedger::new(acct(b"collection"));
        let a = acct(b"a");
        let b = acct(b"b");
        let token = TokenId::from_u64(1);
        nft.mint(a, token).unwrap();
        assert_eq!(nft.owner_of(&token), Some(a));
        assert_eq!(nft.balance_of(&a), 1);

        nft.transfer_from(a, a, b, token).unwrap();
        assert_eq!(nft.owner_of(&token), Some(b));
        assert_eq!(nft.balance_of(&a), 0);
    }

    #[test]
    fn test_nft_mint_twice() {
        let mut nft = NftLedger::new(acct(b"collection"));
        let a = acct(b"a");
        let token = TokenId::from_u64(1);
        nft.mint(a, token).unwrap();
        let err = nft.mint(a, token).unwrap_err();
        assert_eq!(err.to_string(), "token already minted");
    }

    #[test]
    fn test_nft_transfer_requires_authorization() {
        let mut nft = NftLedger::new(acct(b"collection"));
        let a = acct(b"a");
        let b = acct(b"b");
        let stranger = acct(b"stranger");
        let token = TokenId::from_u64(7);
        nft.mint(a, token).unwrap();

        let err = nft.transfer_from(stranger, a, b, token).unwrap_err();
        assert!(matches!(err, CustodyError::NotAuthorized));

        // single-token approval authorizes, and is consumed by the move
        nft.approve(a, stranger, token).unwrap();
        nft.transfer_from(stranger, a, b, token).unwrap();
        assert_eq!(nft.owner_of(&token), Some(b));
        assert_eq!(nft.approved_for(&token), None);
    }

    #[test]
    fn test_nft_operator_approval() {
        let mut nft = NftLedger::new(acct(b"collection"));
        let a = acct(b"a");
        let b = acct(b"b");
        let operator = acct(b"operator");
        let token = TokenId::from_u64(3);
        nft.mint(a, token).unwrap();

        nft.set_approval_for_all(a, operator, true);
        assert!(nft.is_approved_for_all(&a, &operator));
        nft.transfer_from(operator, a, b, token).unwrap();
        assert_eq!(nft.owner_of(&token), Some(b));

        nft.set_approval_for_all(a, operator, false);
        assert!(!nft.is_approved_for_all(&a, &operator));
    }

    #[test]
    fn test_nft_transfer_from_wrong_holder() {
        let mut nft = NftLedger::new(acct(b"collection"));
        let a = acct(b"a");
        let b = acct(b"b");
        let token = TokenId::from_u64(9);
        nft.mint(a, token).unwrap();
        let err = nft.transfer_from(b, b, a, token).unwrap_err();
        assert!(matches!(err, CustodyError::InsufficientBalance));
    }
}
