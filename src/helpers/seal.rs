use crate::engine::{SealOutput, SectorEngine};
use crate::error::Result;
use crate::metadata::{SealedSectorMetadata, StagedSectorMetadata};

/// Seals one staged sector through the proving engine and assembles the
/// sealed record. The commitments and proof are write-once from here on.
pub fn seal<E: SectorEngine>(
    engine: &E,
    prover_id: [u8; 31],
    staged_sector: StagedSectorMetadata,
) -> Result<SealedSectorMetadata> {
    // This call blocks for a long time, so make sure you're not holding any
    // locks.
    let SealOutput {
        comm_r,
        comm_d,
        comm_r_star,
        proof,
    } = engine.seal(&staged_sector.miner_address, &staged_sector, prover_id)?;

    let newly_sealed_sector = SealedSectorMetadata {
        sector_id: staged_sector.sector_id,
        miner_address: staged_sector.miner_address,
        pieces: staged_sector.pieces,
        comm_r_star,
        comm_r,
        comm_d,
        proof,
    };

    Ok(newly_sealed_sector)
}
