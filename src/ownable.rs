use crate::id::AccountId;

/// Narrow ownership capability over a container.
///
/// Distinguishes the opaque owner-of-record handle from whoever beneficially
/// controls it: the registry becomes a container's owner of record while a
/// certificate is outstanding, and is the only privileged caller of
/// `set_owner`, gated by certificate lifecycle. Nothing else reaches through
/// this seam.
pub trait Ownable {
    /// Identity of the container itself.
    fn id(&self) -> AccountId;

    /// Current owner of record.
    fn owner(&self) -> AccountId;

    /// Replace the owner of record. Authorization is the caller's problem;
    /// implementors only store the handle.
    fn set_owner(&mut self, new_owner: AccountId);
}
