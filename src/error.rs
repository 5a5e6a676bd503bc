use thiserror::Error;

use crate::metadata::SectorId;

pub type Result<T> = anyhow::Result<T>;

/// Validation and internal-invariant failures caught by the orchestration
/// layer itself, before (or instead of) touching the engine or the store.
#[derive(Debug, Error)]
pub enum SectorBuilderErr {
    #[error(
        "number of bytes in piece ({num_bytes_in_piece}) exceeds maximum ({max_bytes_per_sector})"
    )]
    OverflowError {
        num_bytes_in_piece: u64,
        max_bytes_per_sector: u64,
    },

    #[error(
        "number of bytes written ({num_bytes_written}) does not match declared piece size ({num_bytes_in_piece})"
    )]
    IncompleteWriteError {
        num_bytes_written: u64,
        num_bytes_in_piece: u64,
    },

    #[error("piece size must be greater than zero")]
    EmptyPiece,

    #[error("sealed sector {0} not found")]
    SectorNotFound(SectorId),

    #[error("unrecoverable error: {0}")]
    Unrecoverable(String),
}

/// Failure of a metadata-store operation. `Unavailable` is distinct from an
/// empty listing so that callers can tell "no records yet" from "store down".
#[derive(Debug, Error)]
pub enum StoreErr {
    #[error("metadata store unavailable: {0}")]
    Unavailable(String),

    #[error("store i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt record at key {key}: {err}")]
    CorruptRecord { key: String, err: serde_cbor::Error },

    #[error("malformed store key: {0}")]
    InvalidKey(String),
}

/// Failure reported by the external proving engine. Never retried
/// automatically; always surfaced to the caller.
#[derive(Debug, Error)]
#[error("proving engine: {0}")]
pub struct EngineErr(pub String);

pub fn err_overflow(num_bytes_in_piece: u64, max_bytes_per_sector: u64) -> SectorBuilderErr {
    SectorBuilderErr::OverflowError {
        num_bytes_in_piece,
        max_bytes_per_sector,
    }
}

pub fn err_inc_write(num_bytes_written: u64, num_bytes_in_piece: u64) -> SectorBuilderErr {
    SectorBuilderErr::IncompleteWriteError {
        num_bytes_written,
        num_bytes_in_piece,
    }
}

pub fn err_sectornotfound(sector_id: SectorId) -> SectorBuilderErr {
    SectorBuilderErr::SectorNotFound(sector_id)
}

pub fn err_unrecov<S: Into<String>>(msg: S) -> SectorBuilderErr {
    SectorBuilderErr::Unrecoverable(msg.into())
}
