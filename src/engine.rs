use std::path::{Path, PathBuf};

use crate::error::EngineErr;
use crate::metadata::{SectorId, SealedSectorMetadata, StagedSectorMetadata};
use crate::post::{Challenge, PoStChallengeSeed};

/// Parameters handed to a proving engine when it is brought up. Mirrors the
/// engine's native initialization call.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub sector_size: u64,
    pub porep_partitions: u8,
    pub post_partitions: u8,
    pub sealed_dir: PathBuf,
    pub staging_dir: PathBuf,
    pub max_num_staged_sectors: u8,
}

/// Output of a successful seal: the replica commitments and the
/// proof-of-replication bytes. Write-once; the orchestrator copies these
/// into a sealed sector record and never mutates them afterwards.
#[derive(Clone, Debug, PartialEq)]
pub struct SealOutput {
    pub comm_r: [u8; 32],
    pub comm_d: [u8; 32],
    pub comm_r_star: [u8; 32],
    pub proof: Vec<u8>,
}

/// Boundary to the external, compute-heavy proving engine.
///
/// Implementations typically wrap a native handle; the handle must be owned
/// by the implementation and released in its `Drop`, never exposed to
/// callers. An engine is assumed safe for concurrent use across distinct
/// sector arguments, which is what the sealer worker pool relies on.
pub trait SectorEngine: Send + Sync {
    /// Decides which sector the piece lands in. The `proposed_id` computed
    /// by the caller is non-binding; the engine's answer is authoritative
    /// and overrides it if staged state changed mid-call.
    fn propose_sector_for_piece(
        &self,
        miner_address: &str,
        staged_sectors: &[StagedSectorMetadata],
        piece_bytes_amount: u64,
        proposed_id: SectorId,
    ) -> Result<SectorId, EngineErr>;

    /// Writes the piece bytes at `piece_path` into the sector's staging
    /// area and returns the updated staged metadata, with the piece
    /// appended to the sector's piece list.
    fn commit_piece(
        &self,
        miner_address: &str,
        sector: StagedSectorMetadata,
        piece_key: &str,
        piece_bytes_amount: u64,
        piece_path: &Path,
    ) -> Result<StagedSectorMetadata, EngineErr>;

    /// Seals a staged sector. Blocks for a long time; callers must not hold
    /// locks across this call.
    fn seal(
        &self,
        miner_address: &str,
        staged_sector: &StagedSectorMetadata,
        prover_id: [u8; 31],
    ) -> Result<SealOutput, EngineErr>;

    /// PoSt phase 1: given the entire sealed population, deterministically
    /// derive the challenged subset for this seed.
    fn derive_challenges(
        &self,
        challenge_seed: &PoStChallengeSeed,
        faults: &[SectorId],
        sealed_sectors: &[SealedSectorMetadata],
    ) -> Result<Vec<Challenge>, EngineErr>;

    /// PoSt phase 2: prove the challenged subset.
    fn prove_challenges(
        &self,
        miner_address: &str,
        challenges: &[Challenge],
        faults: &[SectorId],
        challenged_sectors: &[SealedSectorMetadata],
    ) -> Result<Vec<u8>, EngineErr>;
}
