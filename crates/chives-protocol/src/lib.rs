mod bytes;
mod coin;
mod coin_record;
mod coin_spend;
mod coin_state;
mod lineage_proof;
mod program;
mod spend_bundle;

pub use bytes::{Bytes, Bytes32, Bytes48, Bytes96, BytesImpl};
pub use coin::Coin;
pub use coin_record::CoinRecord;
pub use coin_spend::CoinSpend;
pub use coin_state::CoinState;
pub use lineage_proof::LineageProof;
pub use program::Program;
pub use spend_bundle::SpendBundle;
