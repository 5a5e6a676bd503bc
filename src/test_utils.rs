use std::collections::HashSet;
use std::convert::TryInto;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::builder::{SectorBuilderConfig, SectorClass};
use crate::engine::{EngineConfig, SealOutput, SectorEngine};
use crate::error::EngineErr;
use crate::metadata::{PieceMetadata, SealedSectorMetadata, SectorId, StagedSectorMetadata};
use crate::post::{Challenge, PoStChallengeSeed};
use crate::verifier::{Verifier, VerifyPoStRequest, VerifySealRequest};

pub fn hash_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut state = blake2b_simd::Params::new().hash_length(32).to_state();

    for part in parts {
        state.update(part);
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(state.finalize().as_bytes());
    out
}

fn challenge_from_digest(sector_id: SectorId, digest: &[u8; 32]) -> Challenge {
    Challenge {
        sector: sector_id,
        leaf: u64::from_le_bytes(digest[1..9].try_into().unwrap()),
    }
}

/// Challenge-derivation rule shared by the fake engine and the fake
/// verifier: a sector is challenged when the seed-bound digest of its
/// replica commitment is even, with the first sector as a fallback so a
/// non-empty population always yields at least one challenge.
pub fn derive_fake_challenges(
    seed: &PoStChallengeSeed,
    sectors: &[(SectorId, [u8; 32])],
) -> Vec<Challenge> {
    let mut challenges = Vec::new();

    for (sector_id, comm_r) in sectors {
        let digest = hash_parts(&[b"challenge", seed, comm_r]);

        if digest[0] % 2 == 0 {
            challenges.push(challenge_from_digest(*sector_id, &digest));
        }
    }

    if challenges.is_empty() {
        if let Some((sector_id, comm_r)) = sectors.first() {
            let digest = hash_parts(&[b"challenge", seed, comm_r]);
            challenges.push(challenge_from_digest(*sector_id, &digest));
        }
    }

    challenges
}

pub fn fake_post_proof(challenges: &[Challenge], comm_rs: &[[u8; 32]]) -> Vec<u8> {
    let mut state = blake2b_simd::Params::new().hash_length(32).to_state();
    state.update(b"post");

    for (challenge, comm_r) in challenges.iter().zip(comm_rs.iter()) {
        state.update(&challenge.sector.to_le_bytes());
        state.update(&challenge.leaf.to_le_bytes());
        state.update(comm_r);
    }

    state.finalize().as_bytes().to_vec()
}

pub fn fake_seal_proof(
    prover_id: &[u8; 31],
    sector_id: SectorId,
    comm_r: &[u8; 32],
    comm_d: &[u8; 32],
    comm_r_star: &[u8; 32],
) -> Vec<u8> {
    hash_parts(&[
        b"porep",
        prover_id,
        &sector_id.to_le_bytes(),
        comm_r,
        comm_d,
        comm_r_star,
    ])
    .to_vec()
}

/// In-process stand-in for the external proving engine. Deterministic, so
/// `FakeVerifier` can recompute and accept everything it produces. Counts
/// calls so tests can assert that validation failures short-circuit before
/// the engine is reached.
pub struct FakeSectorEngine {
    max_user_bytes_per_sector: u64,
    seal_failures: HashSet<SectorId>,
    pub engine_calls: Arc<AtomicUsize>,
    pub seal_calls: Arc<AtomicUsize>,
}

impl FakeSectorEngine {
    pub fn from_config(config: &EngineConfig) -> FakeSectorEngine {
        FakeSectorEngine {
            max_user_bytes_per_sector: config.sector_size / 128 * 127,
            seal_failures: HashSet::new(),
            engine_calls: Arc::new(AtomicUsize::new(0)),
            seal_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Marks a sector so that its seal call fails with an engine error.
    pub fn fail_sealing_of(mut self, sector_id: SectorId) -> FakeSectorEngine {
        self.seal_failures.insert(sector_id);
        self
    }

    fn record_call(&self) {
        self.engine_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn fits(&self, sector: &StagedSectorMetadata, piece_bytes_amount: u64) -> bool {
        let occupied: u64 = sector.pieces.iter().map(|p| p.num_bytes).sum();
        occupied + piece_bytes_amount <= self.max_user_bytes_per_sector
    }
}

impl SectorEngine for FakeSectorEngine {
    fn propose_sector_for_piece(
        &self,
        _miner_address: &str,
        staged_sectors: &[StagedSectorMetadata],
        piece_bytes_amount: u64,
        proposed_id: SectorId,
    ) -> Result<SectorId, EngineErr> {
        self.record_call();

        // Honor the caller's proposal when it still fits; otherwise fall
        // back to the first staged sector with room, then to the proposal
        // as a fresh sector.
        if let Some(proposed) = staged_sectors.iter().find(|s| s.sector_id == proposed_id) {
            if self.fits(proposed, piece_bytes_amount) {
                return Ok(proposed_id);
            }
        } else {
            return Ok(proposed_id);
        }

        let mut candidates: Vec<&StagedSectorMetadata> = staged_sectors.iter().collect();
        candidates.sort_by_key(|s| s.sector_id);

        Ok(candidates
            .into_iter()
            .find(|s| self.fits(s, piece_bytes_amount))
            .map(|s| s.sector_id)
            .unwrap_or(proposed_id))
    }

    fn commit_piece(
        &self,
        _miner_address: &str,
        mut sector: StagedSectorMetadata,
        piece_key: &str,
        piece_bytes_amount: u64,
        piece_path: &Path,
    ) -> Result<StagedSectorMetadata, EngineErr> {
        self.record_call();

        let len = fs::metadata(piece_path)
            .map_err(|err| EngineErr(format!("piece file unreadable: {}", err)))?
            .len();

        if len != piece_bytes_amount {
            return Err(EngineErr(format!(
                "piece file holds {} bytes, expected {}",
                len, piece_bytes_amount
            )));
        }

        sector.pieces.push(PieceMetadata {
            piece_key: piece_key.to_string(),
            num_bytes: piece_bytes_amount,
        });

        Ok(sector)
    }

    fn seal(
        &self,
        miner_address: &str,
        staged_sector: &StagedSectorMetadata,
        prover_id: [u8; 31],
    ) -> Result<SealOutput, EngineErr> {
        self.record_call();
        self.seal_calls.fetch_add(1, Ordering::SeqCst);

        if self.seal_failures.contains(&staged_sector.sector_id) {
            return Err(EngineErr(format!(
                "engine rejected sector {}",
                staged_sector.sector_id
            )));
        }

        let mut state = blake2b_simd::Params::new().hash_length(32).to_state();
        state.update(b"comm_d");
        state.update(miner_address.as_bytes());
        state.update(&staged_sector.sector_id.to_le_bytes());
        for piece in &staged_sector.pieces {
            state.update(piece.piece_key.as_bytes());
            state.update(&piece.num_bytes.to_le_bytes());
        }

        let mut comm_d = [0u8; 32];
        comm_d.copy_from_slice(state.finalize().as_bytes());

        let comm_r = hash_parts(&[b"comm_r", &comm_d]);
        let comm_r_star = hash_parts(&[b"comm_r_star", &comm_r]);

        let proof = fake_seal_proof(
            &prover_id,
            staged_sector.sector_id,
            &comm_r,
            &comm_d,
            &comm_r_star,
        );

        Ok(SealOutput {
            comm_r,
            comm_d,
            comm_r_star,
            proof,
        })
    }

    fn derive_challenges(
        &self,
        challenge_seed: &PoStChallengeSeed,
        _faults: &[SectorId],
        sealed_sectors: &[SealedSectorMetadata],
    ) -> Result<Vec<Challenge>, EngineErr> {
        self.record_call();

        let sectors: Vec<(SectorId, [u8; 32])> = sealed_sectors
            .iter()
            .map(|s| (s.sector_id, s.comm_r))
            .collect();

        Ok(derive_fake_challenges(challenge_seed, &sectors))
    }

    fn prove_challenges(
        &self,
        _miner_address: &str,
        challenges: &[Challenge],
        _faults: &[SectorId],
        challenged_sectors: &[SealedSectorMetadata],
    ) -> Result<Vec<u8>, EngineErr> {
        self.record_call();

        let mut comm_rs = Vec::with_capacity(challenges.len());

        for challenge in challenges {
            let sector = challenged_sectors
                .iter()
                .find(|s| s.sector_id == challenge.sector)
                .ok_or_else(|| {
                    EngineErr(format!("challenged sector {} missing", challenge.sector))
                })?;

            comm_rs.push(sector.comm_r);
        }

        Ok(fake_post_proof(challenges, &comm_rs))
    }
}

/// Stateless counterpart to `FakeSectorEngine`: recomputes what the engine
/// would have produced and compares.
pub struct FakeVerifier;

impl Verifier for FakeVerifier {
    fn verify_seal(&self, request: VerifySealRequest) -> Result<bool, EngineErr> {
        let expected = fake_seal_proof(
            &request.prover_id,
            request.sector_id,
            &request.comm_r,
            &request.comm_d,
            &request.comm_r_star,
        );

        Ok(expected == request.proof)
    }

    fn verify_post(&self, request: VerifyPoStRequest) -> Result<bool, EngineErr> {
        let sectors: Vec<(SectorId, [u8; 32])> = request
            .sorted_sector_info
            .values()
            .iter()
            .map(|info| (info.sector_id, info.comm_r))
            .collect();

        let challenges = derive_fake_challenges(&request.challenge_seed, &sectors);

        let mut comm_rs = Vec::with_capacity(challenges.len());
        for challenge in &challenges {
            let comm_r = sectors
                .iter()
                .find(|(id, _)| *id == challenge.sector)
                .map(|(_, comm_r)| *comm_r)
                .ok_or_else(|| {
                    EngineErr(format!("challenged sector {} missing", challenge.sector))
                })?;

            comm_rs.push(comm_r);
        }

        Ok(fake_post_proof(&challenges, &comm_rs) == request.proof)
    }
}

/// Builder + engine configs over a scratch directory, sized so a sector
/// holds 1016 user bytes.
pub fn test_configs<P: AsRef<Path>>(root: P) -> (SectorBuilderConfig, EngineConfig) {
    let root = root.as_ref();

    let sector_class = SectorClass {
        sector_size: 1024,
        porep_partitions: 2,
        post_partitions: 1,
    };

    let builder_config = SectorBuilderConfig {
        miner_address: "t0123".to_string(),
        sector_class,
        metadata_dir: root.join("metadata"),
        staging_dir: root.join("staging"),
        sealed_dir: root.join("sealed"),
        max_num_staged_sectors: 10,
        num_sealer_workers: 2,
    };

    let engine_config = EngineConfig {
        sector_size: sector_class.sector_size,
        porep_partitions: sector_class.porep_partitions,
        post_partitions: sector_class.post_partitions,
        sealed_dir: builder_config.sealed_dir.clone(),
        staging_dir: builder_config.staging_dir.clone(),
        max_num_staged_sectors: builder_config.max_num_staged_sectors,
    };

    (builder_config, engine_config)
}
