use crate::{Bytes32, CoinSpend};
use chia_bls::Signature;
use chives_streamable_macro::Streamable;
use chives_traits::Streamable;

/// A set of coin spends plus one aggregate signature covering every
/// AGG_SIG condition produced by the spends.
#[derive(Streamable, Hash, Debug, Clone, Eq, PartialEq)]
pub struct SpendBundle {
    pub coin_spends: Vec<CoinSpend>,
    pub aggregated_signature: Signature,
}

impl SpendBundle {
    pub fn new(coin_spends: Vec<CoinSpend>, aggregated_signature: Signature) -> Self {
        SpendBundle {
            coin_spends,
            aggregated_signature,
        }
    }

    /// Combine bundles into one, aggregating their signatures.
    pub fn aggregate(bundles: &[SpendBundle]) -> Self {
        let mut coin_spends = Vec::new();
        let mut aggregated_signature = Signature::default();
        for b in bundles {
            coin_spends.extend_from_slice(&b.coin_spends);
            aggregated_signature.aggregate(&b.aggregated_signature);
        }
        SpendBundle {
            coin_spends,
            aggregated_signature,
        }
    }

    /// The bundle name, the sha256 of the streamed encoding.
    pub fn name(&self) -> Bytes32 {
        self.hash().into()
    }

    /// The coins spent by this bundle.
    pub fn removals(&self) -> Vec<crate::Coin> {
        self.coin_spends.iter().map(|cs| cs.coin).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coin, Program};
    use hex_literal::hex;

    fn bundle_with_amount(amount: u64) -> SpendBundle {
        let spend = CoinSpend::new(
            Coin::new([1; 32].into(), [2; 32].into(), amount),
            Program::from(&hex!("01")[..]),
            Program::from(&hex!("80")[..]),
        );
        SpendBundle::new(vec![spend], Signature::default())
    }

    #[test]
    fn name_commits_to_contents() {
        assert_eq!(bundle_with_amount(1).name(), bundle_with_amount(1).name());
        assert_ne!(bundle_with_amount(1).name(), bundle_with_amount(2).name());
    }

    #[test]
    fn aggregate_concatenates_spends() {
        let agg = SpendBundle::aggregate(&[bundle_with_amount(1), bundle_with_amount(2)]);
        assert_eq!(agg.coin_spends.len(), 2);
        assert_eq!(agg.aggregated_signature, Signature::default());
    }

    #[test]
    fn streaming() {
        let b = bundle_with_amount(42);
        let bytes = b.to_bytes().unwrap();
        assert_eq!(SpendBundle::from_bytes(&bytes).unwrap(), b);
    }
}
