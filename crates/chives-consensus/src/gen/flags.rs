use clvmr::MEMPOOL_MODE as CLVM_MEMPOOL_MODE;

// flags controlling condition parsing

// unknown condition codes are disallowed
pub const NO_UNKNOWN_CONDS: u32 = 0x2_0000;

// conditions are required to carry exactly the number of arguments currently
// supported for them. This is meant for mempool-mode
pub const STRICT_ARGS_COUNT: u32 = 0x8_0000;

// the serialization of puzzles and solutions is allowed to contain
// back-references
pub const ALLOW_BACKREFS: u32 = 0x0200_0000;

// skip the aggregate signature check. Conditions are still parsed and the
// AGG_SIG messages collected
pub const DONT_VALIDATE_SIGNATURE: u32 = 0x1_0000;

pub const MEMPOOL_MODE: u32 = CLVM_MEMPOOL_MODE | NO_UNKNOWN_CONDS | STRICT_ARGS_COUNT;
