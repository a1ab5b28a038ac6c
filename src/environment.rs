//! The execution environment the custody core runs atop.
//!
//! One `Environment` owns the asset ledgers, the clock, and the event
//! journal. Every public custody operation borrows it mutably, so calls are
//! serialized: an operation either completes or returns an error with no
//! partial mutation left behind, and nothing can re-enter the core while a
//! call is in flight.

use std::collections::HashMap;
use std::sync::Arc;

use crate::assets::{NativeLedger, NftLedger, TokenLedger};
use crate::clock::{Clock, SystemClock, Timestamp};
use crate::error::CustodyError;
use crate::events::EventJournal;
use crate::id::AccountId;

pub struct Environment {
    pub native: NativeLedger,
    tokens: HashMap<AccountId, TokenLedger>,
    nfts: HashMap<AccountId, NftLedger>,
    pub clock: Arc<dyn Clock>,
    pub journal: EventJournal,
}

impl Environment {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            native: NativeLedger::new(),
            tokens: HashMap::new(),
            nfts: HashMap::new(),
            clock,
            journal: EventJournal::new(),
        }
    }

    /// Reassemble an environment from checkpointed parts.
    pub fn from_parts(
        native: NativeLedger,
        tokens: HashMap<AccountId, TokenLedger>,
        nfts: HashMap<AccountId, NftLedger>,
        clock: Arc<dyn Clock>,
        journal: EventJournal,
    ) -> Self {
        Self {
            native,
            tokens,
            nfts,
            clock,
            journal,
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn register_token(&mut self, ledger: TokenLedger) {
        self.tokens.insert(ledger.id(), ledger);
    }

    pub fn register_nft(&mut self, ledger: NftLedger) {
        self.nfts.insert(ledger.id(), ledger);
    }

    pub fn token(&self, asset: &AccountId) -> Result<&TokenLedger, CustodyError> {
        self.tokens.get(asset).ok_or(CustodyError::UnknownAsset)
    }

    pub fn token_mut(&mut self, asset: &AccountId) -> Result<&mut TokenLedger, CustodyError> {
        self.tokens.get_mut(asset).ok_or(CustodyError::UnknownAsset)
    }

    pub fn nft(&self, asset: &AccountId) -> Result<&NftLedger, CustodyError> {
        self.nfts.get(asset).ok_or(CustodyError::UnknownAsset)
    }

    pub fn nft_mut(&mut self, asset: &AccountId) -> Result<&mut NftLedger, CustodyError> {
        self.nfts.get_mut(asset).ok_or(CustodyError::UnknownAsset)
    }

    pub fn tokens(&self) -> &HashMap<AccountId, TokenLedger> {
        &self.tokens
    }

    pub fn nfts(&self) -> &HashMap<AccountId, NftLedger> {
        &self.nfts
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}
