use crate::error::EngineErr;
use crate::metadata::SectorId;
use crate::post::{PoStChallengeSeed, SortedSectorInfo};

#[derive(Clone, Debug)]
pub struct VerifySealRequest {
    pub comm_d: [u8; 32],
    pub comm_r: [u8; 32],
    pub comm_r_star: [u8; 32],
    pub proof: Vec<u8>,
    pub prover_id: [u8; 31],
    pub sector_id: SectorId,
    pub sector_size: u64,
}

#[derive(Clone, Debug)]
pub struct VerifyPoStRequest {
    pub challenge_seed: PoStChallengeSeed,
    pub sorted_sector_info: SortedSectorInfo,
    pub faults: Vec<SectorId>,
    pub proof: Vec<u8>,
    pub sector_size: u64,
}

/// Stateless proof verification boundary. Both calls are pure and
/// idempotent: identical inputs yield identical results, with no side
/// effects on sector state.
pub trait Verifier {
    fn verify_seal(&self, request: VerifySealRequest) -> Result<bool, EngineErr>;
    fn verify_post(&self, request: VerifyPoStRequest) -> Result<bool, EngineErr>;
}
