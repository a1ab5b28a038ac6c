//! Event records observable by external indexers.
//!
//! Record shapes are interface-stable. The journal chains a blake3 digest
//! over every appended record so an indexer can verify that no record was
//! dropped or rewritten after the fact.

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::id::{AccountId, TokenId};

/// A single observable record emitted by a custody operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Native or fungible withdrawal. The native asset uses
    /// `AccountId::ZERO` as its identity.
    Withdraw {
        from: AccountId,
        asset: AccountId,
        amount: u128,
    },
    /// Non-fungible withdrawal.
    NftWithdraw {
        from: AccountId,
        asset: AccountId,
        token_id: TokenId,
    },
    /// Unlock time changed.
    TimeLock {
        from: AccountId,
        old_time: Timestamp,
        new_time: Timestamp,
    },
    /// Container owner of record replaced.
    OwnershipTransferred {
        previous_owner: AccountId,
        new_owner: AccountId,
    },
    /// Factory created a new container.
    VaultCreated {
        creator: AccountId,
        vault: AccountId,
    },
    /// Ownership certificate issued.
    CertificateMinted {
        container: AccountId,
        beneficiary: AccountId,
    },
    /// Beneficial ownership moved between holders.
    CertificateTransferred {
        from: AccountId,
        to: AccountId,
        container: AccountId,
    },
    /// Ownership certificate destroyed; container handed to a direct owner.
    CertificateBurned {
        container: AccountId,
        new_owner: AccountId,
    },
}

impl Event {
    /// Stable byte encoding fed into the chain digest. The leading tag and
    /// the field order are fixed; changing either invalidates every
    /// previously recorded chain.
    fn feed(&self, hasher: &mut blake3::Hasher) {
        match self {
            Event::Withdraw { from, asset, amount } => {
                hasher.update(&[0u8]);
                hasher.update(from.bytes());
                hasher.update(asset.bytes());
                hasher.update(&amount.to_le_bytes());
            }
            Event::NftWithdraw { from, asset, token_id } => {
                hasher.update(&[1u8]);
                hasher.update(from.bytes());
                hasher.update(asset.bytes());
                hasher.update(token_id.bytes());
            }
            Event::TimeLock { from, old_time, new_time } => {
                hasher.update(&[2u8]);
                hasher.update(from.bytes());
                hasher.update(&old_time.to_le_bytes());
                hasher.update(&new_time.to_le_bytes());
            }
            Event::OwnershipTransferred { previous_owner, new_owner } => {
                hasher.update(&[3u8]);
                hasher.update(previous_owner.bytes());
                hasher.update(new_owner.bytes());
            }
            Event::VaultCreated { creator, vault } => {
                hasher.update(&[4u8]);
                hasher.update(creator.bytes());
                hasher.update(vault.bytes());
            }
            Event::CertificateMinted { container, beneficiary } => {
                hasher.update(&[5u8]);
                hasher.update(container.bytes());
                hasher.update(beneficiary.bytes());
            }
            Event::CertificateTransferred { from, to, container } => {
                hasher.update(&[6u8]);
                hasher.update(from.bytes());
                hasher.update(to.bytes());
                hasher.update(container.bytes());
            }
            Event::CertificateBurned { container, new_owner } => {
                hasher.update(&[7u8]);
                hasher.update(container.bytes());
                hasher.update(new_owner.bytes());
            }
        }
    }
}

/// One appended record plus its position and chain digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub event: Event,
    /// blake3 over the previous head, the sequence number and the event.
    pub digest: [u8; 32],
}

/// Append-only, digest-chained journal of every emitted record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventJournal {
    head: [u8; 32],
    records: Vec<EventRecord>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record, advancing the chain head.
    pub fn record(&mut self, event: Event) {
        let seq = self.records.len() as u64;
        let digest = Self::chain(&self.head, seq, &event);
        self.head = digest;
        self.records.push(EventRecord { seq, event, digest });
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&EventRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn head(&self) -> [u8; 32] {
        self.head
    }

    /// Recompute the whole chain from genesis. True exactly when no record
    /// was dropped, reordered, or rewritten.
    pub fn verify(&self) -> bool {
        let mut head = [0u8; 32];
        for (index, record) in self.records.iter().enumerate() {
            if record.seq != index as u64 {
                return false;
            }
            let digest = Self::chain(&head, record.seq, &record.event);
            if digest != record.digest {
                return false;
            }
            head = digest;
        }
        head == self.head
    }

    fn chain(head: &[u8; 32], seq: u64, event: &Event) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(b"STRONGBOX_Event");
        hasher.update(head);
        hasher.update(&seq.to_le_bytes());
        event.feed(&mut hasher);
        *hasher.finalize().as_bytes()
    }
}
