use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};

use crate::error;
use crate::post::{PoStChallengeSeed, SortedSectorInfo};

pub type SectorId = u64;

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct SecondsSinceEpoch(pub u64);

impl SecondsSinceEpoch {
    pub fn now() -> SecondsSinceEpoch {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        SecondsSinceEpoch(secs)
    }
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PieceMetadata {
    pub piece_key: String,
    pub num_bytes: u64,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub enum SealStatus {
    Pending,
    Sealing,
}

#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct StagedSectorMetadata {
    pub sector_id: SectorId,
    pub miner_address: String,
    pub pieces: Vec<PieceMetadata>,
    pub seal_status: SealStatus,
    pub last_updated: SecondsSinceEpoch,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SealedSectorMetadata {
    pub sector_id: SectorId,
    pub miner_address: String,
    pub pieces: Vec<PieceMetadata>,
    pub comm_r_star: [u8; 32],
    pub comm_r: [u8; 32],
    pub comm_d: [u8; 32],
    pub proof: Vec<u8>,
}

/// Best-effort record of a generated PoSt, cached alongside sector metadata.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct PoStRecord {
    pub miner_address: String,
    pub challenge_seed: PoStChallengeSeed,
    pub sorted_sector_info: SortedSectorInfo,
    pub proof: Vec<u8>,
    pub timestamp: SecondsSinceEpoch,
}

impl Default for StagedSectorMetadata {
    fn default() -> StagedSectorMetadata {
        StagedSectorMetadata {
            sector_id: Default::default(),
            miner_address: Default::default(),
            pieces: Default::default(),
            seal_status: SealStatus::Pending,
            last_updated: Default::default(),
        }
    }
}

impl PartialEq for SealedSectorMetadata {
    fn eq(&self, other: &SealedSectorMetadata) -> bool {
        self.sector_id == other.sector_id
            && self.miner_address == other.miner_address
            && self.pieces == other.pieces
            && self.comm_r_star == other.comm_r_star
            && self.comm_r == other.comm_r
            && self.comm_d == other.comm_d
            && self.proof.iter().eq(other.proof.iter())
    }
}

impl fmt::Debug for SealedSectorMetadata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SealedSectorMetadata {{ sector_id: {}, miner_address: {}, pieces: {:?}, comm_r_star: {:?}, comm_r: {:?}, comm_d: {:?} }}", self.sector_id, self.miner_address, self.pieces, self.comm_r_star, self.comm_r, self.comm_d)
    }
}

pub fn sector_id_as_bytes(sector_id: SectorId) -> error::Result<[u8; 31]> {
    // Transmute a u64 sector id to a zero-padded byte array.
    let mut sector_id_as_bytes = [0u8; 31];
    sector_id_as_bytes
        .as_mut()
        .write_u64::<LittleEndian>(sector_id)?;

    Ok(sector_id_as_bytes)
}

/// Derives the prover identity which binds proofs to a storage provider.
pub fn address_to_prover_id(miner_address: &str) -> [u8; 31] {
    let hash = blake2b_simd::Params::new()
        .hash_length(31)
        .hash(miner_address.as_bytes());

    let mut prover_id = [0u8; 31];
    prover_id.copy_from_slice(hash.as_bytes());
    prover_id
}
