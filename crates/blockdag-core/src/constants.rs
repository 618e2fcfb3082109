pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const GENESIS_INDEX: u64 = 0;
pub const GENESIS_TRANSACTION: &str = "Genesis Transaction";
