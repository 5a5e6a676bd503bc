use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::metadata::SectorId;

pub type PoStChallengeSeed = [u8; 32];

/// Samples a fresh challenge seed from the thread-local RNG.
pub fn random_challenge_seed() -> PoStChallengeSeed {
    let mut seed = [0u8; 32];
    rand::thread_rng().fill(&mut seed);
    seed
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct SectorInfo {
    pub sector_id: SectorId,
    pub comm_r: [u8; 32],
}

/// The sealed population a PoSt is generated over. Entries are ordered by
/// replica commitment, which is the order in which the proving engine
/// derives challenges.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct SortedSectorInfo {
    values: Vec<SectorInfo>,
}

impl SortedSectorInfo {
    pub fn new(mut infos: Vec<SectorInfo>) -> SortedSectorInfo {
        infos.sort_by(|a, b| a.comm_r.cmp(&b.comm_r));
        SortedSectorInfo { values: infos }
    }

    pub fn values(&self) -> &[SectorInfo] {
        &self.values
    }
}

/// A challenged (sector, leaf) pair produced by the first phase of PoSt
/// generation.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct Challenge {
    pub sector: SectorId,
    pub leaf: u64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratePoStRequest {
    pub challenge_seed: PoStChallengeSeed,
    pub sorted_sector_info: SortedSectorInfo,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GeneratePoStResponse {
    pub proof: Vec<u8>,
}
