use std::collections::HashMap;
use std::fmt::Write as _;

use itertools::chain;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreErr;
use crate::kv_store::KeyValueStore;
use crate::metadata::{
    PoStRecord, SealedSectorMetadata, SecondsSinceEpoch, SectorId, StagedSectorMetadata,
};
use crate::post::{GeneratePoStRequest, GeneratePoStResponse};

const STAGED_NS: &str = "staged";
const SEALED_NS: &str = "sealed";
const POST_NS: &str = "post";

/// Authoritative read/upsert/allocate API over per-miner sector records.
///
/// Upserts are last-write-wins, keyed by (miner, sector id). There is no
/// per-key locking here; the orchestrator guarantees at most one writer per
/// sector by spawning exactly one task per sector.
pub struct SectorStateManager<T: KeyValueStore> {
    kv_store: T,
}

fn sector_key(namespace: &str, miner_address: &str, sector_id: SectorId) -> String {
    format!("{}/{}/{}", namespace, miner_address, sector_id)
}

fn miner_prefix(namespace: &str, miner_address: &str) -> String {
    format!("{}/{}", namespace, miner_address)
}

impl<T: KeyValueStore> SectorStateManager<T> {
    pub fn new(kv_store: T) -> SectorStateManager<T> {
        SectorStateManager { kv_store }
    }

    pub fn get_staged(
        &self,
        miner_address: &str,
    ) -> Result<HashMap<SectorId, StagedSectorMetadata>, StoreErr> {
        let records: Vec<StagedSectorMetadata> =
            self.list_records(&miner_prefix(STAGED_NS, miner_address))?;

        Ok(records.into_iter().map(|s| (s.sector_id, s)).collect())
    }

    pub fn get_sealed(
        &self,
        miner_address: &str,
    ) -> Result<HashMap<SectorId, SealedSectorMetadata>, StoreErr> {
        let records: Vec<SealedSectorMetadata> =
            self.list_records(&miner_prefix(SEALED_NS, miner_address))?;

        Ok(records.into_iter().map(|s| (s.sector_id, s)).collect())
    }

    pub fn put_staged(
        &self,
        miner_address: &str,
        sector: &StagedSectorMetadata,
    ) -> Result<(), StoreErr> {
        let key = sector_key(STAGED_NS, miner_address, sector.sector_id);
        self.put_record(&key, sector)
    }

    pub fn put_sealed(
        &self,
        miner_address: &str,
        sector: &SealedSectorMetadata,
    ) -> Result<(), StoreErr> {
        let key = sector_key(SEALED_NS, miner_address, sector.sector_id);
        self.put_record(&key, sector)
    }

    /// Retires a staged record, typically after its sector has sealed.
    pub fn delete_staged(
        &self,
        miner_address: &str,
        sector_id: SectorId,
    ) -> Result<(), StoreErr> {
        self.kv_store
            .delete(&sector_key(STAGED_NS, miner_address, sector_id))
    }

    /// Caches a generated PoSt, keyed by challenge seed.
    pub fn put_post(
        &self,
        miner_address: &str,
        request: &GeneratePoStRequest,
        response: &GeneratePoStResponse,
    ) -> Result<(), StoreErr> {
        let record = PoStRecord {
            miner_address: miner_address.to_string(),
            challenge_seed: request.challenge_seed,
            sorted_sector_info: request.sorted_sector_info.clone(),
            proof: response.proof.clone(),
            timestamp: SecondsSinceEpoch::now(),
        };

        let mut seed_hex = String::with_capacity(64);
        for byte in &request.challenge_seed {
            let _ = write!(seed_hex, "{:02x}", byte);
        }

        let key = format!("{}/{}/{}", POST_NS, miner_address, seed_hex);
        self.put_record(&key, &record)
    }

    /// Proposes a sector id not present in the union of this miner's staged
    /// and sealed records. A proposal, not a reservation: concurrent callers
    /// must not race on the same logical allocation.
    pub fn next_sector_id(&self, miner_address: &str) -> Result<SectorId, StoreErr> {
        let staged = self.get_staged(miner_address)?;
        let sealed = self.get_sealed(miner_address)?;

        let max_known = chain(staged.keys(), sealed.keys()).max().copied();

        Ok(max_known.map_or(1, |id| id + 1))
    }

    fn put_record<S: Serialize>(&self, key: &str, record: &S) -> Result<(), StoreErr> {
        let serialized = serde_cbor::to_vec(record).map_err(|err| StoreErr::CorruptRecord {
            key: key.to_string(),
            err,
        })?;

        self.kv_store.put(key, &serialized)
    }

    fn list_records<D: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<D>, StoreErr> {
        let values = self.kv_store.list(prefix)?;

        values
            .into_iter()
            .map(|v| {
                serde_cbor::from_slice(&v).map_err(|err| StoreErr::CorruptRecord {
                    key: prefix.to_string(),
                    err,
                })
            })
            .collect()
    }
}
