use std::io::{self, Read};
use std::path::Path;

use crate::engine::SectorEngine;
use crate::error::*;
use crate::kv_store::KeyValueStore;
use crate::metadata::{SealStatus, SecondsSinceEpoch, SectorId, StagedSectorMetadata};
use crate::state::SectorStateManager;

/// Stages piece bytes for sealing, returning the id of the sector the piece
/// now belongs to.
///
/// Sector assignment is two-phase: the destination computed here from a
/// snapshot of staged state is only a proposal, because staged state may
/// change mid-call. The proving engine's answer is authoritative and
/// overrides the proposal. Nothing is persisted until the engine has
/// accepted the piece, so any failure leaves the staged set untouched.
#[allow(clippy::too_many_arguments)]
pub fn add_piece<E: SectorEngine, T: KeyValueStore, R: Read>(
    engine: &E,
    state: &SectorStateManager<T>,
    miner_address: &str,
    piece_key: String,
    piece_bytes_amount: u64,
    mut piece_file: R,
    staging_dir: &Path,
    max_user_bytes_per_sector: u64,
) -> Result<SectorId> {
    if piece_bytes_amount == 0 {
        return Err(SectorBuilderErr::EmptyPiece.into());
    }

    let pending: Vec<StagedSectorMetadata> = {
        let staged = state.get_staged(miner_address)?;

        staged
            .into_iter()
            .map(|(_, v)| v)
            .filter(|v| v.seal_status == SealStatus::Pending)
            .collect()
    };

    let proposed_id = compute_destination_sector_id(
        &pending,
        max_user_bytes_per_sector,
        piece_bytes_amount,
    )?
    .ok_or(())
    .or_else(|_| state.next_sector_id(miner_address))?;

    let dest_sector_id =
        engine.propose_sector_for_piece(miner_address, &pending, piece_bytes_amount, proposed_id)?;

    let sector = pending
        .iter()
        .find(|s| s.sector_id == dest_sector_id)
        .cloned()
        .unwrap_or_else(|| StagedSectorMetadata {
            sector_id: dest_sector_id,
            miner_address: miner_address.to_string(),
            ..Default::default()
        });

    // Scoped temp resource: removed on drop on every exit path below.
    let mut temp_file = tempfile::NamedTempFile::new_in(staging_dir)?;

    let num_bytes_written = io::copy(&mut piece_file, &mut temp_file)?;

    if num_bytes_written != piece_bytes_amount {
        return Err(err_inc_write(num_bytes_written, piece_bytes_amount).into());
    }

    let mut meta = engine.commit_piece(
        miner_address,
        sector,
        &piece_key,
        piece_bytes_amount,
        temp_file.path(),
    )?;

    meta.last_updated = SecondsSinceEpoch::now();

    state.put_staged(miner_address, &meta)?;

    Ok(meta.sector_id)
}

// Given the staged sectors which are accepting data, propose the best-fit
// destination: the fullest sector the piece still fits into, ties broken by
// the lower sector id. None means a fresh sector must be allocated.
fn compute_destination_sector_id(
    candidate_sectors: &[StagedSectorMetadata],
    max_bytes_per_sector: u64,
    num_bytes_in_piece: u64,
) -> Result<Option<SectorId>> {
    if num_bytes_in_piece > max_bytes_per_sector {
        return Err(err_overflow(num_bytes_in_piece, max_bytes_per_sector).into());
    }

    Ok(candidate_sectors
        .iter()
        .filter_map(|sector| {
            let occupied: u64 = sector.pieces.iter().map(|p| p.num_bytes).sum();
            let remaining = max_bytes_per_sector.saturating_sub(occupied);

            if num_bytes_in_piece <= remaining {
                Some((remaining - num_bytes_in_piece, sector.sector_id))
            } else {
                None
            }
        })
        .min()
        .map(|(_, sector_id)| sector_id))
}
