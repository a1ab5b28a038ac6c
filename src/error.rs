use std::io;
use thiserror::Error;

/// Represents all possible errors surfaced by custody operations.
///
/// The message strings of the protocol variants are part of the public
/// interface: external indexers and callers match on them verbatim, so they
/// are stable and never reworded.
#[derive(Error, Debug)]
pub enum CustodyError {
    /// Caller does not hold authority over the container
    #[error("caller is not the owner")]
    NotOwner,

    /// The container is LOCKED; withdrawals and lock reconfiguration wait
    /// for the unlock time to elapse
    #[error("time-locked")]
    TimeLocked,

    /// Requested more than the held balance, or the identified token is not
    /// custodied here
    #[error("transfer amount exceeds balance")]
    InsufficientBalance,

    /// Certificate minting requires the registry to already be the
    /// container's owner of record
    #[error("owner is not the registry")]
    NotRegistryOwned,

    /// At most one outstanding certificate per container
    #[error("token already minted")]
    AlreadyMinted,

    /// Caller is neither the certificate holder nor an approved delegate
    #[error("caller is not owner nor approved")]
    NotAuthorized,

    /// Factory index query beyond the current sequence length
    #[error("index exceeds list length")]
    IndexOutOfRange,

    /// Owner identities are never the zero account
    #[error("new owner is the zero account")]
    ZeroOwner,

    /// No such token: no outstanding certificate for this container, or a
    /// nonexistent collection token
    #[error("token does not exist")]
    TokenNotFound,

    /// The environment has no ledger registered under this asset identity
    #[error("unknown asset ledger")]
    UnknownAsset,

    /// A container refuses custody of its own governing certificate;
    /// absorbing it would lock out every future owner
    #[error("cannot take custody of own ownership certificate")]
    SelfCustody,

    /// Snapshot file was malformed, truncated, or failed verification
    #[error("snapshot error: {0}")]
    Snapshot(String),

    /// IO errors from snapshot persistence
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Anyhow error wrapper for error context
    #[error(transparent)]
    Context(#[from] anyhow::Error),
}

impl From<bincode::Error> for CustodyError {
    fn from(err: bincode::Error) -> Self {
        CustodyError::Snapshot(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_messages_are_verbatim() {
        // These strings are asserted on by external callers; any change here
        // is a compatibility break.
        assert_eq!(CustodyError::NotOwner.to_string(), "caller is not the owner");
        assert_eq!(CustodyError::TimeLocked.to_string(), "time-locked");
        assert_eq!(
            CustodyError::InsufficientBalance.to_string(),
            "transfer amount exceeds balance"
        );
        assert_eq!(
            CustodyError::NotRegistryOwned.to_string(),
            "owner is not the registry"
        );
        assert_eq!(CustodyError::AlreadyMinted.to_string(), "token already minted");
        assert_eq!(
            CustodyError::NotAuthorized.to_string(),
            "caller is not owner nor approved"
        );
        assert_eq!(
            CustodyError::IndexOutOfRange.to_string(),
            "index exceeds list length"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: CustodyError = io_err.into();
        assert!(matches!(err, CustodyError::Io(_)));
    }
}
