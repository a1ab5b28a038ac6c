//! Point-in-time checkpointing of the whole custody state to a file.
//!
//! The on-disk layout is a magic tag, a format version, and one
//! length-prefixed bincode body. Loading re-verifies the event journal's
//! digest chain, so a checkpoint that was truncated or edited is rejected
//! rather than silently restored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;

use crate::assets::{NativeLedger, NftLedger, TokenLedger};
use crate::clock::Clock;
use crate::environment::Environment;
use crate::error::CustodyError;
use crate::events::EventJournal;
use crate::factory::VaultFactory;
use crate::id::AccountId;
use crate::registry::OwnerRegistry;
use crate::vault::Vault;

const MAGIC: &[u8; 8] = b"SBOXSNAP";
const VERSION: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub native: NativeLedger,
    pub tokens: HashMap<AccountId, TokenLedger>,
    pub nfts: HashMap<AccountId, NftLedger>,
    pub journal: EventJournal,
    pub vaults: Vec<Vault>,
    pub registry: Option<OwnerRegistry>,
    pub factory: Option<VaultFactory>,
}

impl Snapshot {
    /// Capture the environment plus the custody components living on it.
    pub fn capture(
        env: &Environment,
        vaults: &[Vault],
        registry: Option<&OwnerRegistry>,
        factory: Option<&VaultFactory>,
    ) -> Self {
        Self {
            native: env.native.clone(),
            tokens: env.tokens().clone(),
            nfts: env.nfts().clone(),
            journal: env.journal.clone(),
            vaults: vaults.to_vec(),
            registry: registry.cloned(),
            factory: factory.cloned(),
        }
    }

    /// Rebuild the environment (with a caller-supplied clock) and hand back
    /// the captured components.
    #[allow(clippy::type_complexity)]
    pub fn restore(
        self,
        clock: Arc<dyn Clock>,
    ) -> (
        Environment,
        Vec<Vault>,
        Option<OwnerRegistry>,
        Option<VaultFactory>,
    ) {
        let Snapshot {
            native,
            tokens,
            nfts,
            journal,
            vaults,
            registry,
            factory,
        } = self;
        let env = Environment::from_parts(native, tokens, nfts, clock, journal);
        (env, vaults, registry, factory)
    }

    pub fn save(&self, path: &Path) -> Result<(), CustodyError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        let body = bincode::serialize(self)?;
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        writer.write_all(&(body.len() as u64).to_le_bytes())?;
        writer.write_all(&body)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, CustodyError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(CustodyError::Snapshot("not a snapshot file".to_string()));
        }

        let mut version = [0u8; 2];
        reader.read_exact(&mut version)?;
        let version = u16::from_le_bytes(version);
        if version != VERSION {
            return Err(CustodyError::Snapshot(format!(
                "unsupported snapshot version {}",
                version
            )));
        }

        let mut len = [0u8; 8];
        reader.read_exact(&mut len)?;
        let len = u64::from_le_bytes(len) as usize;

        let mut body = vec![0u8; len];
        reader.read_exact(&mut body)?;

        let snapshot: Snapshot = bincode::deserialize(&body)?;
        if !snapshot.journal.verify() {
            return Err(CustodyError::Snapshot(
                "event journal digest chain does not verify".to_string(),
            ));
        }
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn populated() -> (Environment, Vec<Vault>, OwnerRegistry, VaultFactory) {
        let mut env = Environment::with_clock(Arc::new(ManualClock::new(1_000)));
        let mut factory = VaultFactory::new(AccountId::derive(&[b"factory"]));
        let mut registry = OwnerRegistry::new(AccountId::derive(&[b"registry"]));
        let creator = AccountId::derive(&[b"creator"]);

        env.native.mint(creator, 100);
        let mut vault = factory.create_vault(creator, 60, &mut env).unwrap();
        vault
            .transfer_ownership_to_registry(creator, &mut registry, &mut env)
            .unwrap();

        (env, vec![vault], registry, factory)
    }

    #[test]
    fn test_round_trip_through_file() {
        let (env, vaults, registry, factory) = populated();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.snap");

        Snapshot::capture(&env, &vaults, Some(&registry), Some(&factory))
            .save(&path)
            .unwrap();

        let loaded = Snapshot::load(&path).unwrap();
        assert!(loaded.journal.verify());
        assert_eq!(loaded.journal.len(), env.journal.len());
        assert_eq!(loaded.journal.head(), env.journal.head());

        let clock = Arc::new(ManualClock::new(2_000));
        let (restored_env, restored_vaults, restored_registry, restored_factory) =
            loaded.restore(clock);

        let vault = &restored_vaults[0];
        assert_eq!(restored_env.native.balance_of(&vault.id()), 60);
        let registry = restored_registry.unwrap();
        assert_eq!(vault.owner(), registry.id());
        assert_eq!(
            registry.owner_of(&vault.id()).unwrap(),
            AccountId::derive(&[b"creator"])
        );
        assert_eq!(restored_factory.unwrap().count(), 1);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_snapshot");
        std::fs::write(&path, b"definitely not a snapshot file").unwrap();
        let err = Snapshot::load(&path).unwrap_err();
        assert!(matches!(err, CustodyError::Snapshot(_)));
    }

    #[test]
    fn test_rejects_truncated_file() {
        let (env, vaults, registry, factory) = populated();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.snap");
        Snapshot::capture(&env, &vaults, Some(&registry), Some(&factory))
            .save(&path)
            .unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        assert!(Snapshot::load(&path).is_err());
    }
}
