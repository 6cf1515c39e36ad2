use crate::gen::validation_error::ErrorCode;
use chives_protocol::{Bytes32, CoinRecord};
use indexmap::IndexMap;

/// In-memory coin set, keyed by coin name. Insertion order is preserved so
/// block application and test output stay deterministic.
///
/// The store is the single arbiter of spent-ness. `reserve_spend()` checks
/// and marks in one step, so when two validated bundles race on the same
/// coin, whichever commits second sees the coin already spent.
#[derive(Debug, Default, Clone)]
pub struct CoinStore {
    records: IndexMap<Bytes32, CoinRecord>,
}

impl CoinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_coin(&mut self, record: CoinRecord) {
        self.records.insert(record.name(), record);
    }

    pub fn coin_record(&self, name: &Bytes32) -> Option<&CoinRecord> {
        self.records.get(name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn children(&self, name: &Bytes32) -> Vec<&CoinRecord> {
        self.records
            .values()
            .filter(|rec| &rec.coin.parent_coin_info == name)
            .collect()
    }

    pub fn records_by_puzzle_hash(&self, puzzle_hash: &Bytes32) -> Vec<&CoinRecord> {
        self.records
            .values()
            .filter(|rec| &rec.coin.puzzle_hash == puzzle_hash)
            .collect()
    }

    /// Atomically claim a coin for spending at `height`. The check and the
    /// mark happen in one step under the same borrow, so no other caller can
    /// observe the coin unspent once this returns Ok.
    pub fn reserve_spend(&mut self, name: &Bytes32, height: u32) -> Result<(), ErrorCode> {
        let Some(record) = self.records.get_mut(name) else {
            return Err(ErrorCode::UnknownUnspent);
        };
        if !record.confirmed() {
            return Err(ErrorCode::UnknownUnspent);
        }
        if record.spent() {
            return Err(ErrorCode::DoubleSpend);
        }
        record.mark_spent(height);
        Ok(())
    }

    /// Roll back a reservation made by `reserve_spend()`, when a later stage
    /// of admission rejects the bundle.
    pub fn unreserve(&mut self, name: &Bytes32) {
        if let Some(record) = self.records.get_mut(name) {
            record.spent_block_index = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chives_protocol::Coin;
    use std::sync::{Arc, Mutex};

    fn record(parent: u8, puzzle_hash: u8, amount: u64, height: u32) -> CoinRecord {
        CoinRecord::new(
            Coin::new([parent; 32].into(), [puzzle_hash; 32].into(), amount),
            height,
            0,
            false,
            1_000_000 + u64::from(height),
        )
    }

    #[test]
    fn lookup_and_children() {
        let mut store = CoinStore::new();
        let parent = record(1, 2, 1000, 5);
        store.add_coin(parent);

        let child = CoinRecord::new(
            Coin::new(parent.name(), [3; 32].into(), 900),
            6,
            0,
            false,
            1_000_006,
        );
        store.add_coin(child);

        assert_eq!(store.len(), 2);
        assert_eq!(store.coin_record(&parent.name()), Some(&parent));
        assert_eq!(store.children(&parent.name()), vec![&child]);
        assert!(store.children(&child.name()).is_empty());
        assert_eq!(
            store.records_by_puzzle_hash(&[3; 32].into()),
            vec![&child]
        );
        assert!(store.records_by_puzzle_hash(&[9; 32].into()).is_empty());
    }

    #[test]
    fn reserve_spend_unknown_coin() {
        let mut store = CoinStore::new();
        assert_eq!(
            store.reserve_spend(&[7; 32].into(), 10),
            Err(ErrorCode::UnknownUnspent)
        );
    }

    #[test]
    fn reserve_spend_unconfirmed_coin() {
        let mut store = CoinStore::new();
        let rec = CoinRecord::new(Coin::new([1; 32].into(), [2; 32].into(), 1000), 0, 0, false, 0);
        store.add_coin(rec);

        // a record that hasn't been included in a block yet can't be spent
        assert_eq!(
            store.reserve_spend(&rec.name(), 10),
            Err(ErrorCode::UnknownUnspent)
        );
        assert!(!store.coin_record(&rec.name()).unwrap().spent());
    }

    #[test]
    fn reserve_spend_then_double_spend() {
        let mut store = CoinStore::new();
        let rec = record(1, 2, 1000, 5);
        store.add_coin(rec);

        assert_eq!(store.reserve_spend(&rec.name(), 10), Ok(()));
        assert!(store.coin_record(&rec.name()).unwrap().spent());
        assert_eq!(
            store.coin_record(&rec.name()).unwrap().spent_block_index,
            10
        );

        // the second claim loses
        assert_eq!(
            store.reserve_spend(&rec.name(), 10),
            Err(ErrorCode::DoubleSpend)
        );
    }

    #[test]
    fn unreserve_restores_coin() {
        let mut store = CoinStore::new();
        let rec = record(1, 2, 1000, 5);
        store.add_coin(rec);

        store.reserve_spend(&rec.name(), 10).unwrap();
        store.unreserve(&rec.name());
        assert!(!store.coin_record(&rec.name()).unwrap().spent());

        // reservable again after rollback
        assert_eq!(store.reserve_spend(&rec.name(), 11), Ok(()));
    }

    #[test]
    fn concurrent_reservations_single_winner() {
        let rec = record(1, 2, 1000, 5);
        let name = rec.name();
        let mut store = CoinStore::new();
        store.add_coin(rec);
        let store = Arc::new(Mutex::new(store));

        let mut handles = vec![];
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(std::thread::spawn(move || {
                store.lock().unwrap().reserve_spend(&name, 10).is_ok()
            }));
        }
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
    }
}
