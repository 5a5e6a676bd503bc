use std::path::Path;

use crate::error::StoreErr;

mod fs;

pub use self::fs::*;

/// Namespaced key/value persistence for sector metadata. Keys are
/// slash-separated paths of the shape `<namespace>/<miner>/<sector_id>`.
///
/// Implementations must be safe for concurrent writes to distinct keys.
/// Concurrent read-modify-write on the same key is not supported; callers
/// serialize per-sector access by construction.
pub trait KeyValueStore: Sized + Sync + Send {
    fn initialize<P: AsRef<Path>>(root_dir: P) -> Result<Self, StoreErr>;
    fn put(&self, key: &str, value: &[u8]) -> Result<(), StoreErr>;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreErr>;

    /// Returns the values of every key under `prefix`. A prefix with no
    /// entries yields an empty vector; an unavailable store yields
    /// `StoreErr::Unavailable`.
    fn list(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StoreErr>;

    /// Removes a key. Deleting an absent key is a no-op.
    fn delete(&self, key: &str) -> Result<(), StoreErr>;
}
