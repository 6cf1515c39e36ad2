use crate::{Bytes32, Coin, CoinState};
use chives_streamable_macro::Streamable;

/// Ledger bookkeeping for one coin. These are values the full node derives
/// and stores per coin, they are not part of the coin itself.
#[derive(Streamable, Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub struct CoinRecord {
    pub coin: Coin,
    pub confirmed_block_index: u32,
    pub spent_block_index: u32,
    pub coinbase: bool,
    pub timestamp: u64,
}

impl CoinRecord {
    pub fn new(
        coin: Coin,
        confirmed_block_index: u32,
        spent_block_index: u32,
        coinbase: bool,
        timestamp: u64,
    ) -> Self {
        CoinRecord {
            coin,
            confirmed_block_index,
            spent_block_index,
            coinbase,
            timestamp,
        }
    }

    pub fn spent(&self) -> bool {
        self.spent_block_index > 0
    }

    /// A record with both a zero confirmed index and a zero timestamp has
    /// not been included in a block yet. Genesis records are confirmed at
    /// index 0 but carry a timestamp.
    pub fn confirmed(&self) -> bool {
        self.confirmed_block_index > 0 || self.timestamp > 0
    }

    pub fn name(&self) -> Bytes32 {
        self.coin.coin_id()
    }

    pub fn mark_spent(&mut self, height: u32) {
        self.spent_block_index = height;
    }

    /// The wallet-protocol view of this record. A record with both a zero
    /// confirmed index and a zero timestamp has not been confirmed yet and
    /// reports no created height.
    pub fn coin_state(&self) -> CoinState {
        let spent_height = if self.spent() {
            Some(self.spent_block_index)
        } else {
            None
        };
        let created_height = if self.confirmed_block_index == 0 && self.timestamp == 0 {
            None
        } else {
            Some(self.confirmed_block_index)
        };
        CoinState::new(self.coin, spent_height, created_height)
    }
}
