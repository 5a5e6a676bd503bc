/// Default size of the sealer worker pool. Each worker drives at most one
/// proving-engine seal call at a time, so this bounds seal concurrency.
pub const DEFAULT_NUM_SEALER_WORKERS: usize = 2;

/// Default cap on the number of staged sectors accepting pieces at once.
pub const DEFAULT_MAX_NUM_STAGED_SECTORS: u8 = 10;

// Preprocessing expands every 127 bytes of user data to 128 bytes on disk,
// so a sector of n bytes holds n * 127/128 bytes of user data.
pub const UNSEALED_NUMERATOR: u64 = 127;
pub const UNSEALED_DENOMINATOR: u64 = 128;
