use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};

use crate::constants::*;
use crate::engine::SectorEngine;
use crate::error::{err_unrecov, Result};
use crate::helpers;
use crate::kv_store::{FileSystemKvs, KeyValueStore};
use crate::metadata::{
    address_to_prover_id, SealStatus, SealedSectorMetadata, SectorId, StagedSectorMetadata,
};
use crate::post::{GeneratePoStRequest, GeneratePoStResponse};
use crate::sealer::{SealerInput, SealerWorker};
use crate::state::SectorStateManager;

const FATAL_SLRSND: &str = "could not send to sealer";
const FATAL_NORECV: &str = "could not receive seal result";

/// Proof-system parameters for the sectors this builder manages.
#[derive(Clone, Copy, Debug)]
pub struct SectorClass {
    pub sector_size: u64,
    pub porep_partitions: u8,
    pub post_partitions: u8,
}

impl SectorClass {
    /// Preprocessing overhead shrinks the user-addressable portion of a
    /// sector to 127/128 of its raw size.
    pub fn max_user_bytes_per_sector(self) -> u64 {
        self.sector_size / UNSEALED_DENOMINATOR * UNSEALED_NUMERATOR
    }
}

/// Everything a builder needs, threaded explicitly through the constructor.
#[derive(Clone, Debug)]
pub struct SectorBuilderConfig {
    pub miner_address: String,
    pub sector_class: SectorClass,
    pub metadata_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub sealed_dir: PathBuf,
    pub max_num_staged_sectors: u8,
    pub num_sealer_workers: usize,
}

/// Orchestrates the staged→sealed sector lifecycle for one miner: piece
/// ingest, batch sealing through a bounded worker pool, and PoSt
/// generation over the sealed set.
pub struct SectorBuilder<E: SectorEngine + 'static, T: KeyValueStore> {
    miner_address: String,
    max_user_bytes_per_sector: u64,
    staging_dir: PathBuf,
    state: SectorStateManager<T>,
    engine: Arc<E>,
    sealer_tx: mpsc::Sender<SealerInput>,
    sealers: Vec<SealerWorker>,
}

impl<E: SectorEngine + 'static> SectorBuilder<E, FileSystemKvs> {
    /// Initializes a builder over a file-system metadata store rooted at
    /// the configured metadata directory, creating the staging and sealed
    /// directories if needed.
    pub fn init_from_config(
        config: SectorBuilderConfig,
        engine: E,
    ) -> Result<SectorBuilder<E, FileSystemKvs>> {
        fs::create_dir_all(&config.staging_dir)?;
        fs::create_dir_all(&config.sealed_dir)?;

        let kv_store = FileSystemKvs::initialize(&config.metadata_dir)?;

        SectorBuilder::init_with_kv_store(config, engine, kv_store)
    }
}

impl<E: SectorEngine + 'static, T: KeyValueStore> SectorBuilder<E, T> {
    pub fn init_with_kv_store(
        config: SectorBuilderConfig,
        engine: E,
        kv_store: T,
    ) -> Result<SectorBuilder<E, T>> {
        let engine = Arc::new(engine);

        // Configure the sealer workers and their shared task queue. The
        // pool size bounds how many engine seal calls run at once.
        let (sealer_tx, sealers) = {
            let (tx, rx) = mpsc::channel();
            let rx = Arc::new(Mutex::new(rx));

            let num_workers = config.num_sealer_workers.max(1);

            let sealers = (0..num_workers)
                .map(|n| SealerWorker::start(n, rx.clone(), engine.clone()))
                .collect();

            (tx, sealers)
        };

        Ok(SectorBuilder {
            miner_address: config.miner_address,
            max_user_bytes_per_sector: config.sector_class.max_user_bytes_per_sector(),
            staging_dir: config.staging_dir,
            state: SectorStateManager::new(kv_store),
            engine,
            sealer_tx,
            sealers,
        })
    }

    // Stages user piece-bytes for sealing. The data source must yield
    // exactly `piece_bytes_amount` bytes; any mismatch fails the call with
    // no partial persistence.
    pub fn add_piece<R: Read>(
        &self,
        piece_key: String,
        piece_bytes_amount: u64,
        piece_file: R,
    ) -> Result<SectorId> {
        helpers::add_piece(
            self.engine.as_ref(),
            &self.state,
            &self.miner_address,
            piece_key,
            piece_bytes_amount,
            piece_file,
            &self.staging_dir,
            self.max_user_bytes_per_sector,
        )
    }

    // Returns all staged sector metadata for this miner.
    pub fn get_staged_sectors(&self) -> Result<Vec<StagedSectorMetadata>> {
        let staged = self.state.get_staged(&self.miner_address)?;
        Ok(staged.into_iter().map(|(_, v)| v).collect())
    }

    // Returns all sealed sector metadata for this miner.
    pub fn get_sealed_sectors(&self) -> Result<Vec<SealedSectorMetadata>> {
        let sealed = self.state.get_sealed(&self.miner_address)?;
        Ok(sealed.into_iter().map(|(_, v)| v).collect())
    }

    /// Seals every Pending staged sector with at least one piece, one
    /// worker task per sector, and blocks until all tasks complete.
    ///
    /// Partial-success: a sector that fails to seal is logged and its
    /// staged record left in place for a later retry; it never blocks the
    /// other sectors. Callers re-query staged/sealed state for outcomes.
    pub fn seal_all_staged_sectors(&self) -> Result<()> {
        let staged = self.state.get_staged(&self.miner_address)?;

        let to_seal: Vec<StagedSectorMetadata> = staged
            .into_iter()
            .map(|(_, v)| v)
            .filter(|s| s.seal_status == SealStatus::Pending && !s.pieces.is_empty())
            .collect();

        if to_seal.is_empty() {
            info!("no staged sector needs sealing");
            return Ok(());
        }

        let mut ids: Vec<SectorId> = to_seal.iter().map(|s| s.sector_id).collect();
        ids.sort_unstable();
        info!("sealing staged sectors for {}: {:?}", self.miner_address, ids);

        let prover_id = address_to_prover_id(&self.miner_address);

        let (done_tx, done_rx) = mpsc::channel();
        let num_tasks = to_seal.len();

        for mut staged_sector in to_seal {
            staged_sector.seal_status = SealStatus::Sealing;

            self.sealer_tx
                .send(SealerInput::Seal {
                    staged_sector,
                    prover_id,
                    done_tx: done_tx.clone(),
                })
                .map_err(|_| err_unrecov(FATAL_SLRSND))?;
        }

        drop(done_tx);

        // Join barrier: exactly one outcome per dispatched task.
        for _ in 0..num_tasks {
            let (sector_id, result) = done_rx.recv().map_err(|_| err_unrecov(FATAL_NORECV))?;

            match result {
                Ok(sealed_sector) => {
                    let persisted = self
                        .state
                        .put_sealed(&self.miner_address, &sealed_sector)
                        .and_then(|_| self.state.delete_staged(&self.miner_address, sector_id));

                    match persisted {
                        Ok(()) => info!("sealing succeeded: sector {}", sector_id),
                        Err(err) => {
                            error!("failed to persist sealed sector {}: {}", sector_id, err)
                        }
                    }
                }
                Err(err) => error!("sealing failed: sector {}: {:?}", sector_id, err),
            }
        }

        Ok(())
    }

    /// Generates a proof-of-spacetime over the requested sealed sectors.
    /// The resulting proof is cached in the metadata store on a best-effort
    /// basis; a cache failure never invalidates the proof.
    pub fn generate_post(&self, request: &GeneratePoStRequest) -> Result<GeneratePoStResponse> {
        let sealed = self.state.get_sealed(&self.miner_address)?;

        let response =
            helpers::generate_post(self.engine.as_ref(), &self.miner_address, &sealed, request)?;

        if let Err(err) = self.state.put_post(&self.miner_address, request, &response) {
            warn!("failed to cache PoSt for {}: {}", self.miner_address, err);
        }

        Ok(response)
    }
}


impl<E: SectorEngine + 'static, T: KeyValueStore> Drop for SectorBuilder<E, T> {
    fn drop(&mut self) {
        // Shut down the sealer workers and wait for them to return.
        for _ in &mut self.sealers {
            let _ = self
                .sealer_tx
                .send(SealerInput::Shutdown)
                .map_err(|err| error!("err sending Shutdown to sealer: {:?}", err));
        }

        for sealer in &mut self.sealers {
            if let Some(thread) = sealer.thread.take() {
                let _ = thread
                    .join()
                    .map_err(|err| error!("err joining sealer thread {}: {:?}", sealer.id, err));
            }
        }
    }
}
