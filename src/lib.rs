//! Time-locked multi-asset custody vaults with transferable ownership
//! certificates.
//!
//! A [`Vault`] holds native currency, fungible tokens and NFTs on behalf of
//! a single owner and can be time-locked against withdrawal and lock
//! reconfiguration. Ownership itself is never lock-gated: it moves either
//! directly, or indirectly by handing the vault to an [`OwnerRegistry`],
//! which issues a transferable certificate to the beneficial owner and hands
//! the vault back on burn. A [`VaultFactory`] creates and tracks vaults.
//!
//! All asset-side state (balances, token ownership, the clock, the event
//! journal) lives in an [`Environment`]; operations borrow it mutably and
//! either complete or fail with no partial mutation.

pub mod assets;
pub mod clock;
pub mod environment;
pub mod error;
pub mod events;
pub mod factory;
pub mod id;
pub mod ownable;
pub mod registry;
pub mod snapshot;
pub mod vault;

// Re-export the main types for convenience
pub use assets::{NativeLedger, NftLedger, TokenLedger};
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use environment::Environment;
pub use error::CustodyError;
pub use events::{Event, EventJournal, EventRecord};
pub use factory::VaultFactory;
pub use id::{AccountId, TokenId};
pub use ownable::Ownable;
pub use registry::OwnerRegistry;
pub use snapshot::Snapshot;
pub use vault::Vault;
