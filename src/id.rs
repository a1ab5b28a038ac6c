use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::ops::Deref;

/// Number of raw bytes in an identity handle.
pub const ID_LEN: usize = 32;

// AccountId identifies a participant in the custody system: an externally
// controlled account, a vault, a registry, a factory, or an asset ledger.
// It is a 32 byte opaque handle, resembling an address.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct AccountId([u8; ID_LEN]);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Format as a hex string with a prefix of the first 6 bytes
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "acct:{}", prefix)
    }
}

impl Deref for AccountId {
    type Target = [u8; ID_LEN];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AccountId {
    /// The zero sentinel identity. Never a valid owner; stands in for the
    /// native asset in withdrawal records.
    pub const ZERO: AccountId = AccountId([0; ID_LEN]);

    pub fn new(bytes: [u8; ID_LEN]) -> Self {
        AccountId(bytes)
    }

    /// Get a reference to the internal bytes
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; ID_LEN]
    }

    /// Derive an identity deterministically from the given seed slices.
    ///
    /// The same seeds always yield the same identity, so a factory can
    /// derive fresh container addresses from its own identity plus a
    /// sequence number without coordination.
    pub fn derive(seeds: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();

        // Domain separator
        hasher.update(b"STRONGBOX_Account");

        for seed in seeds {
            hasher.update(seed);
        }

        AccountId(hasher.finalize().into())
    }
}

/// Identifier of a single token inside a non-fungible collection.
///
/// Ownership certificates are keyed by the container they govern, so a
/// container identity converts directly into the token id of its
/// certificate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TokenId([u8; ID_LEN]);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = hex::encode(&self.0[0..6]);
        write!(f, "tok:{}", prefix)
    }
}

impl From<AccountId> for TokenId {
    fn from(id: AccountId) -> Self {
        TokenId(*id)
    }
}

impl TokenId {
    pub fn new(bytes: [u8; ID_LEN]) -> Self {
        TokenId(bytes)
    }

    /// Ordinary small token ids, zero-extended into the 32 byte form.
    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; ID_LEN];
        bytes[ID_LEN - 8..].copy_from_slice(&value.to_be_bytes());
        TokenId(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}
