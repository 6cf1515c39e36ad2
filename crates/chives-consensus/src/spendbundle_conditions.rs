use crate::consensus_constants::ConsensusConstants;
use crate::gen::conditions::{
    process_single_spend, validate_conditions, ParseState, SpendBundleConditions,
};
use crate::gen::flags::{ALLOW_BACKREFS, DONT_VALIDATE_SIGNATURE, MEMPOOL_MODE};
use crate::gen::validation_error::{ErrorCode, ValidationErr};
use crate::owned_conditions::OwnedSpendBundleConditions;
use crate::spendbundle_validation::get_flags_for_height_and_constants;
use chives_protocol::SpendBundle;
use clvm_utils::tree_hash;
use clvmr::allocator::{Allocator, NodePtr};
use clvmr::chia_dialect::ChiaDialect;
use clvmr::reduction::Reduction;
use clvmr::run_program::run_program;
use clvmr::serde::{node_from_bytes, node_from_bytes_backrefs};

pub(crate) fn subtract_cost(cost_left: &mut u64, subtract: u64) -> Result<(), ValidationErr> {
    if subtract > *cost_left {
        Err(ValidationErr(NodePtr::NIL, ErrorCode::CostExceeded))
    } else {
        *cost_left -= subtract;
        Ok(())
    }
}

/// Run every puzzle in the bundle and parse the conditions they return. The
/// cost of the returned conditions includes the CLVM execution cost and the
/// byte cost of the serialized puzzles and solutions. The aggregate
/// signature is NOT checked here, see `validate_clvm_and_signature()`.
pub fn get_conditions_from_spendbundle(
    spend_bundle: &SpendBundle,
    max_cost: u64,
    height: u32,
    constants: &ConsensusConstants,
) -> Result<OwnedSpendBundleConditions, ValidationErr> {
    if spend_bundle.coin_spends.is_empty() {
        return Err(ValidationErr(NodePtr::NIL, ErrorCode::InvalidSpendBundle));
    }

    let flags =
        get_flags_for_height_and_constants(height, constants) | MEMPOOL_MODE | DONT_VALIDATE_SIGNATURE;
    let decoder = if (flags & ALLOW_BACKREFS) != 0 {
        node_from_bytes_backrefs
    } else {
        node_from_bytes
    };

    let mut cost_left = max_cost;
    let dialect = ChiaDialect::new(flags);
    let mut a = Allocator::new();
    let mut ret = SpendBundleConditions::default();
    let mut state = ParseState::default();

    for coin_spend in &spend_bundle.coin_spends {
        // the serialized size of the spend counts against the cost limit,
        // the same way the block generator's size would
        let byte_cost = (coin_spend.puzzle_reveal.len() + coin_spend.solution.len()) as u64
            * constants.cost_per_byte;
        subtract_cost(&mut cost_left, byte_cost)?;

        let puz = decoder(&mut a, coin_spend.puzzle_reveal.as_slice())?;
        let sol = decoder(&mut a, coin_spend.solution.as_slice())?;
        let parent = a.new_atom(coin_spend.coin.parent_coin_info.as_slice())?;
        let amount = a.new_number(coin_spend.coin.amount.into())?;
        let Reduction(clvm_cost, conditions) = run_program(&mut a, &dialect, puz, sol, cost_left)?;

        subtract_cost(&mut cost_left, clvm_cost)?;

        let buf = tree_hash(&a, puz);
        let puzzle_hash = a.new_atom(&buf)?;
        process_single_spend(
            &a,
            &mut ret,
            &mut state,
            parent,
            puzzle_hash,
            amount,
            conditions,
            flags,
            &mut cost_left,
            constants,
        )?;
    }

    validate_conditions(&a, &ret, &state, NodePtr::NIL)?;
    ret.cost = max_cost - cost_left;
    Ok(OwnedSpendBundleConditions::from(&a, ret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus_constants::TEST_CONSTANTS;
    use chia_bls::Signature;
    use chives_protocol::{Coin, CoinSpend, Program};
    use hex_literal::hex;

    fn test_coin() -> Coin {
        Coin::new(
            hex!("4444444444444444444444444444444444444444444444444444444444444444").into(),
            hex!("3333333333333333333333333333333333333333333333333333333333333333").into(),
            1,
        )
    }

    #[test]
    fn test_conditions_from_spendbundle() {
        // the puzzle is the identity (1), so the solution is the condition
        // list: ((49 <pubkey> "hello"))
        let solution = hex!("ffff31ffb0997cc43ed8788f841fcf3071f6f212b89ba494b6ebaf1bda88c3f9de9d968a61f3b7284a5ee13889399ca71a026549a2ff8568656c6c6f8080").to_vec();
        let spend = CoinSpend::new(
            test_coin(),
            Program::from(&hex!("01")[..]),
            Program::from(&solution[..]),
        );
        let spend_bundle = SpendBundle::new(vec![spend], Signature::default());

        let osbc = get_conditions_from_spendbundle(
            &spend_bundle,
            TEST_CONSTANTS.max_block_cost_clvm,
            TEST_CONSTANTS.hard_fork_height,
            &TEST_CONSTANTS,
        )
        .expect("valid bundle");

        assert_eq!(osbc.spends.len(), 1);
        assert_eq!(osbc.agg_sig_unsafe.len(), 1);
        // byte cost, clvm cost and the agg-sig condition cost are all
        // included
        let byte_cost = (1 + solution.len() as u64) * TEST_CONSTANTS.cost_per_byte;
        assert!(osbc.cost > byte_cost);
    }

    #[test]
    fn test_cost_limit_applies_to_byte_cost() {
        let spend = CoinSpend::new(
            test_coin(),
            Program::from(&hex!("01")[..]),
            Program::from(&hex!("80")[..]),
        );
        let spend_bundle = SpendBundle::new(vec![spend], Signature::default());

        let err = get_conditions_from_spendbundle(&spend_bundle, 100, 0, &TEST_CONSTANTS)
            .expect_err("cost limit");
        assert_eq!(err.1, ErrorCode::CostExceeded);
    }

    #[test]
    fn test_puzzle_hash_is_computed_from_reveal() {
        // quote of nil: (q . ()) with tree hash != the coin's puzzle hash
        // would be rejected downstream, but conditions still parse. Here the
        // reveal is the identity puzzle, whose tree hash does not match the
        // test coin's puzzle hash either. The parsed spend reports the
        // computed hash, not the claimed one.
        let spend = CoinSpend::new(
            test_coin(),
            Program::from(&hex!("01")[..]),
            Program::from(&hex!("80")[..]),
        );
        let spend_bundle = SpendBundle::new(vec![spend], Signature::default());
        let osbc = get_conditions_from_spendbundle(
            &spend_bundle,
            TEST_CONSTANTS.max_block_cost_clvm,
            TEST_CONSTANTS.hard_fork_height,
            &TEST_CONSTANTS,
        )
        .expect("valid bundle");

        let expected = clvm_utils::tree_hash_atom(&[1]);
        assert_eq!(osbc.spends[0].puzzle_hash.as_slice(), expected.to_bytes());
    }
}
