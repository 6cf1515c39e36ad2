use crate::Coin;
use chives_streamable_macro::Streamable;

#[derive(Streamable, Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub struct CoinState {
    pub coin: Coin,
    pub spent_height: Option<u32>,
    pub created_height: Option<u32>,
}

impl CoinState {
    pub fn new(coin: Coin, spent_height: Option<u32>, created_height: Option<u32>) -> Self {
        CoinState {
            coin,
            spent_height,
            created_height,
        }
    }
}
