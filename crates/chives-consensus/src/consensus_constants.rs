use chives_protocol::Bytes32;
use chives_streamable_macro::Streamable;

#[derive(Streamable, Hash, Debug, Clone, Eq, PartialEq)]
pub struct ConsensusConstants {
    /// The challenge hashed into the first block of the chain.
    pub genesis_challenge: Bytes32,

    /// Domain separator mixed into AGG_SIG_ME messages. Forks must change
    /// this value to provide replay attack protection.
    pub agg_sig_me_additional_data: Bytes32,

    /// Spends are rejected if any of their time locks would still fail this
    /// many blocks past the current peak.
    pub mempool_block_buffer: u8,

    /// The largest coin amount, in mojo. Coin amounts fit in 64 bits.
    pub max_coin_amount: u64,

    /// Max block cost in clvm cost units.
    pub max_block_cost_clvm: u64,

    /// Cost charged per byte of serialized puzzle and solution.
    pub cost_per_byte: u64,

    /// How many seconds a transaction timestamp may lie in the future.
    pub max_future_time: u32,

    /// The first block height at which the 2.0 hard-fork rules apply.
    pub hard_fork_height: u32,
}

pub const TEST_CONSTANTS: ConsensusConstants = ConsensusConstants {
    genesis_challenge: Bytes32::new([
        0xe3, 0xb0, 0xc4, 0x42, 0x98, 0xfc, 0x1c, 0x14, 0x9a, 0xfb, 0xf4, 0xc8, 0x99, 0x6f, 0xb9,
        0x24, 0x27, 0xae, 0x41, 0xe4, 0x64, 0x9b, 0x93, 0x4c, 0xa4, 0x95, 0x99, 0x1b, 0x78, 0x52,
        0xb8, 0x55,
    ]),
    agg_sig_me_additional_data: Bytes32::new([
        0xcc, 0xd5, 0xbb, 0x71, 0x18, 0x35, 0x32, 0xbf, 0xf2, 0x20, 0xba, 0x46, 0xc2, 0x68, 0x99,
        0x1a, 0x3f, 0xf0, 0x7e, 0xb3, 0x58, 0xe8, 0x25, 0x5a, 0x65, 0xc3, 0x0a, 0x2d, 0xce, 0x0e,
        0x5f, 0xbb,
    ]),
    mempool_block_buffer: 10,
    max_coin_amount: u64::MAX,
    max_block_cost_clvm: 11_000_000_000,
    cost_per_byte: 12_000,
    max_future_time: 5 * 60,
    hard_fork_height: 0,
};
