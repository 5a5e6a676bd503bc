use std::collections::HashMap;

use crate::engine::SectorEngine;
use crate::error::{err_sectornotfound, Result};
use crate::metadata::{SealedSectorMetadata, SectorId};
use crate::post::{GeneratePoStRequest, GeneratePoStResponse};

/// Runs the two-phase challenge/proof protocol over the sealed set.
///
/// The engine must see the entire sealed population before it can
/// deterministically derive which sectors are challenged; only then is the
/// (typically much smaller) challenged subset proven. Every referenced
/// sector id is validated against the sealed set before any engine call.
pub fn generate_post<E: SectorEngine>(
    engine: &E,
    miner_address: &str,
    sealed_sectors: &HashMap<SectorId, SealedSectorMetadata>,
    request: &GeneratePoStRequest,
) -> Result<GeneratePoStResponse> {
    let mut population: Vec<SealedSectorMetadata> =
        Vec::with_capacity(request.sorted_sector_info.values().len());

    for info in request.sorted_sector_info.values() {
        let sector = sealed_sectors
            .get(&info.sector_id)
            .ok_or_else(|| err_sectornotfound(info.sector_id))?;

        population.push(sector.clone());
    }

    // Fault reporting is not implemented yet; the list is always empty.
    let faults: Vec<SectorId> = Vec::new();

    let challenges = engine.derive_challenges(&request.challenge_seed, &faults, &population)?;

    let mut challenged_sectors: Vec<SealedSectorMetadata> = Vec::with_capacity(challenges.len());

    for challenge in &challenges {
        let sector = sealed_sectors
            .get(&challenge.sector)
            .ok_or_else(|| err_sectornotfound(challenge.sector))?;

        challenged_sectors.push(sector.clone());
    }

    let proof =
        engine.prove_challenges(miner_address, &challenges, &faults, &challenged_sectors)?;

    Ok(GeneratePoStResponse { proof })
}
