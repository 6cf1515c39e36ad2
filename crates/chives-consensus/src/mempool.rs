use std::collections::{HashMap, HashSet};

use crate::check_time_locks::check_time_locks;
use crate::coin_store::CoinStore;
use crate::consensus_constants::ConsensusConstants;
use crate::gen::validation_error::ErrorCode;
use crate::owned_conditions::OwnedSpendBundleConditions;
use crate::spendbundle_validation::validate_clvm_and_signature;
use chives_protocol::{Bytes32, Coin, CoinRecord, SpendBundle};
use indexmap::IndexMap;

/// A fully validated spend bundle waiting for block inclusion.
#[derive(Debug, Clone)]
pub struct MempoolItem {
    pub spend_bundle: SpendBundle,
    pub conds: OwnedSpendBundleConditions,
    pub fee: u64,
}

/// The pool of admitted, unconfirmed spend bundles, together with the coin
/// set they are validated against.
///
/// Admission is all-or-nothing. A bundle runs through the pipeline
/// (conditions, cost, signature, coin lookups, time locks) without touching
/// any state; only when everything passed are its removals reserved in the
/// store, one atomic check-and-mark per coin. A bundle racing for a coin
/// another pending item already reserved is rejected with
/// `MempoolConflict`, and any reservations it made are rolled back.
#[derive(Debug, Clone)]
pub struct Mempool {
    constants: ConsensusConstants,
    store: CoinStore,
    height: u32,
    timestamp: u64,
    items: IndexMap<Bytes32, MempoolItem>,
    pending_removals: HashSet<Bytes32>,
}

impl Mempool {
    pub fn new(constants: ConsensusConstants, timestamp: u64) -> Self {
        Self {
            constants,
            store: CoinStore::new(),
            height: 0,
            timestamp,
            items: IndexMap::new(),
            pending_removals: HashSet::new(),
        }
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn coin_store(&self) -> &CoinStore {
        &self.store
    }

    pub fn item(&self, name: &Bytes32) -> Option<&MempoolItem> {
        self.items.get(name)
    }

    pub fn items(&self) -> impl Iterator<Item = &MempoolItem> {
        self.items.values()
    }

    /// Confirm a coin into the coin set at the current height, outside of
    /// any spend bundle (block rewards, test setup).
    pub fn add_coin(&mut self, coin: Coin, coinbase: bool) {
        self.store.add_coin(CoinRecord::new(
            coin,
            self.height,
            0,
            coinbase,
            self.timestamp,
        ));
    }

    /// Validate a spend bundle and, if everything checks out, admit it.
    /// Returns the bundle name it is tracked under.
    pub fn add_spend_bundle(&mut self, spend_bundle: SpendBundle) -> Result<Bytes32, ErrorCode> {
        if spend_bundle.coin_spends.is_empty() {
            return Err(ErrorCode::InvalidSpendBundle);
        }

        let (conds, _duration) = validate_clvm_and_signature(
            &spend_bundle,
            self.constants.max_block_cost_clvm,
            &self.constants,
            self.height,
        )?;

        // a height lock too far ahead will not resolve within the window
        // pending items are expected to survive
        if conds.height_absolute > self.height + u32::from(self.constants.mempool_block_buffer) {
            return Err(ErrorCode::AssertHeightAbsoluteFailed);
        }
        if conds.seconds_absolute > self.timestamp + u64::from(self.constants.max_future_time) {
            return Err(ErrorCode::TimestampTooFarInFuture);
        }

        // coins created by this same bundle may also be spent by it
        let additions: HashSet<Bytes32> = conds
            .spends
            .iter()
            .flat_map(|spend| {
                spend
                    .create_coin
                    .iter()
                    .map(|(ph, amount, _hint)| Coin::new(spend.coin_id, *ph, *amount).coin_id())
            })
            .collect();

        let next_height = self.height + 1;
        let mut removal_records = HashMap::new();
        for spend in &conds.spends {
            if self.pending_removals.contains(&spend.coin_id) {
                return Err(ErrorCode::MempoolConflict);
            }
            let record = match self.store.coin_record(&spend.coin_id) {
                Some(record) => {
                    if record.spent() {
                        return Err(ErrorCode::DoubleSpend);
                    }
                    *record
                }
                None => {
                    if !additions.contains(&spend.coin_id) {
                        return Err(ErrorCode::UnknownUnspent);
                    }
                    // ephemeral spend, confirmed by the block that will
                    // include this bundle
                    CoinRecord::new(
                        Coin::new(spend.parent_id, spend.puzzle_hash, spend.coin_amount),
                        next_height,
                        0,
                        false,
                        self.timestamp,
                    )
                }
            };
            removal_records.insert(spend.coin_id, record);
        }

        if let Some(code) = check_time_locks(&removal_records, &conds, self.height, self.timestamp)
        {
            return Err(code);
        }

        // commit: reserve every on-chain removal. The pre-checks above make
        // a reservation failure impossible here short of a duplicate coin
        // id in the bundle itself, which parsing already rejects, but roll
        // back and report if one happens anyway.
        let mut reserved = Vec::new();
        for spend in &conds.spends {
            if additions.contains(&spend.coin_id) {
                continue;
            }
            if let Err(code) = self.store.reserve_spend(&spend.coin_id, next_height) {
                for name in &reserved {
                    self.store.unreserve(name);
                }
                return Err(code);
            }
            reserved.push(spend.coin_id);
        }
        self.pending_removals.extend(reserved);

        let fee = u64::try_from(conds.removal_amount - conds.addition_amount).unwrap_or(u64::MAX);
        let name = spend_bundle.name();
        self.items.insert(
            name,
            MempoolItem {
                spend_bundle,
                conds,
                fee,
            },
        );
        Ok(name)
    }

    /// Remove a pending bundle and release its reservations.
    pub fn remove_item(&mut self, name: &Bytes32) -> Option<MempoolItem> {
        let item = self.items.shift_remove(name)?;
        for spend in &item.conds.spends {
            if self.pending_removals.remove(&spend.coin_id) {
                self.store.unreserve(&spend.coin_id);
            }
        }
        Some(item)
    }

    /// Farm a block at `timestamp`: every pending bundle is included, its
    /// removals become spent at the new height and its additions confirmed
    /// coins. Returns the names of the included bundles.
    pub fn new_block(&mut self, timestamp: u64) -> Vec<Bytes32> {
        let height = self.height + 1;
        let items = std::mem::take(&mut self.items);
        self.pending_removals.clear();

        let mut included = Vec::with_capacity(items.len());
        for (name, item) in items {
            for spend in &item.conds.spends {
                for (puzzle_hash, amount, _hint) in &spend.create_coin {
                    let coin = Coin::new(spend.coin_id, *puzzle_hash, *amount);
                    self.store
                        .add_coin(CoinRecord::new(coin, height, 0, false, timestamp));
                }
            }
            for spend in &item.conds.spends {
                // on-chain removals were already reserved at this height
                // during admission; this claims the ephemeral ones
                let _ = self.store.reserve_spend(&spend.coin_id, height);
            }
            included.push(name);
        }
        self.height = height;
        self.timestamp = timestamp;
        included
    }
}
