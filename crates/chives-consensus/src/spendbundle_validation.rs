use crate::consensus_constants::ConsensusConstants;
use crate::gen::flags::ALLOW_BACKREFS;
use crate::gen::opcodes::{
    AGG_SIG_AMOUNT, AGG_SIG_ME, AGG_SIG_PARENT, AGG_SIG_PARENT_AMOUNT, AGG_SIG_PARENT_PUZZLE,
    AGG_SIG_PUZZLE, AGG_SIG_PUZZLE_AMOUNT,
};
use crate::gen::validation_error::ErrorCode;
use crate::make_aggsig_final_message::make_aggsig_final_message;
use crate::owned_conditions::OwnedSpendBundleConditions;
use crate::spendbundle_conditions::get_conditions_from_spendbundle;
use chia_bls::aggregate_verify;
use chives_protocol::SpendBundle;
use std::time::{Duration, Instant};

/// The full validation a spend bundle goes through before it's admitted to
/// the mempool: run the puzzles, parse and check the conditions, and verify
/// the aggregate BLS signature against every AGG_SIG condition the spends
/// produced.
pub fn validate_clvm_and_signature(
    spend_bundle: &SpendBundle,
    max_cost: u64,
    constants: &ConsensusConstants,
    height: u32,
) -> Result<(OwnedSpendBundleConditions, Duration), ErrorCode> {
    let start_time = Instant::now();
    let mut conditions =
        get_conditions_from_spendbundle(spend_bundle, max_cost, height, constants)
            .map_err(|e| e.1)?;

    let iter = conditions.spends.iter().flat_map(|spend| {
        let condition_items_pairs = [
            (AGG_SIG_PARENT, &spend.agg_sig_parent),
            (AGG_SIG_PUZZLE, &spend.agg_sig_puzzle),
            (AGG_SIG_AMOUNT, &spend.agg_sig_amount),
            (AGG_SIG_PUZZLE_AMOUNT, &spend.agg_sig_puzzle_amount),
            (AGG_SIG_PARENT_AMOUNT, &spend.agg_sig_parent_amount),
            (AGG_SIG_PARENT_PUZZLE, &spend.agg_sig_parent_puzzle),
            (AGG_SIG_ME, &spend.agg_sig_me),
        ];
        condition_items_pairs
            .into_iter()
            .flat_map(move |(condition, items)| {
                items.iter().map(move |(pk, msg)| {
                    let mut final_msg = msg.as_ref().to_vec();
                    make_aggsig_final_message(condition, &mut final_msg, spend, constants);
                    (pk, final_msg)
                })
            })
    });
    let unsafe_items = conditions
        .agg_sig_unsafe
        .iter()
        .map(|(pk, msg)| (pk, msg.as_ref().to_vec()));

    if !aggregate_verify(
        &spend_bundle.aggregated_signature,
        iter.chain(unsafe_items),
    ) {
        return Err(ErrorCode::BadAggregateSignature);
    }
    conditions.validated_signature = true;
    Ok((conditions, start_time.elapsed()))
}

pub fn get_flags_for_height_and_constants(height: u32, constants: &ConsensusConstants) -> u32 {
    let mut flags: u32 = 0;

    if height >= constants.hard_fork_height {
        // past the 2.0 hard-fork, puzzles and solutions may be serialized
        // with back-references
        flags |= ALLOW_BACKREFS;
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus_constants::TEST_CONSTANTS;
    use crate::make_aggsig_final_message::agg_sig_additional_data;
    use chia_bls::{sign, SecretKey, Signature};
    use chives_protocol::{Coin, CoinSpend, Program};
    use clvm_utils::tree_hash_atom;
    use hex_literal::hex;

    const SEED: &[u8; 32] =
        &hex!("6fc9d9a2b05fd1f0e51bc91041a03be8657081f272ec281aff731624f0d1c220");

    // the coin's puzzle hash has to match the identity puzzle the bundles
    // reveal, since the coin id entering the signed message is computed from
    // the reveal
    fn test_coin() -> Coin {
        Coin::new(
            hex!("4444444444444444444444444444444444444444444444444444444444444444").into(),
            tree_hash_atom(&[1]).to_bytes().into(),
            1,
        )
    }

    // identity puzzle, the solution is the condition list
    fn bundle_with_conditions(conditions: &[u8], signature: Signature) -> SpendBundle {
        let spend = CoinSpend::new(
            test_coin(),
            Program::from(&hex!("01")[..]),
            Program::from(conditions),
        );
        SpendBundle::new(vec![spend], signature)
    }

    #[test]
    fn test_validate_no_signatures() {
        // ((51 0x2222...22 1))
        let conditions = hex!(
            "ffff33ffa02222222222222222222222222222222222222222222222222222222222222222ff018080"
        );
        let bundle = bundle_with_conditions(&conditions, Signature::default());
        let (osbc, _duration) = validate_clvm_and_signature(
            &bundle,
            TEST_CONSTANTS.max_block_cost_clvm,
            &TEST_CONSTANTS,
            TEST_CONSTANTS.hard_fork_height,
        )
        .expect("no signatures to check");
        assert_eq!(osbc.spends.len(), 1);
        assert_eq!(osbc.spends[0].create_coin.len(), 1);
    }

    #[test]
    fn test_validate_agg_sig_me() {
        let sk = SecretKey::from_seed(SEED);
        let pk = sk.public_key();

        // (50 <pk> "hello")
        let mut conditions = vec![0xff, 0xff, 0x32, 0xff, 0xb0];
        conditions.extend_from_slice(&pk.to_bytes());
        conditions.extend_from_slice(&hex!("ff8568656c6c6f80"));
        conditions.extend_from_slice(&[0x80]);

        let mut signed_msg = b"hello".to_vec();
        signed_msg.extend(test_coin().coin_id().as_slice());
        signed_msg.extend(TEST_CONSTANTS.agg_sig_me_additional_data.as_slice());
        let sig = sign(&sk, &signed_msg);

        let bundle = bundle_with_conditions(&conditions, sig);
        let (osbc, _duration) = validate_clvm_and_signature(
            &bundle,
            TEST_CONSTANTS.max_block_cost_clvm,
            &TEST_CONSTANTS,
            TEST_CONSTANTS.hard_fork_height,
        )
        .expect("valid signature");
        assert_eq!(osbc.spends[0].agg_sig_me.len(), 1);

        // the same bundle with the identity signature must fail
        let bundle = bundle_with_conditions(&conditions, Signature::default());
        let err = validate_clvm_and_signature(
            &bundle,
            TEST_CONSTANTS.max_block_cost_clvm,
            &TEST_CONSTANTS,
            TEST_CONSTANTS.hard_fork_height,
        )
        .expect_err("wrong signature");
        assert_eq!(err, ErrorCode::BadAggregateSignature);
    }

    #[test]
    fn test_validate_agg_sig_parent() {
        let sk = SecretKey::from_seed(SEED);
        let pk = sk.public_key();

        // (43 <pk> "hello")
        let mut conditions = vec![0xff, 0xff, 0x2b, 0xff, 0xb0];
        conditions.extend_from_slice(&pk.to_bytes());
        conditions.extend_from_slice(&hex!("ff8568656c6c6f80"));
        conditions.extend_from_slice(&[0x80]);

        let mut signed_msg = b"hello".to_vec();
        signed_msg.extend(test_coin().parent_coin_info.as_slice());
        signed_msg.extend(agg_sig_additional_data(&TEST_CONSTANTS, AGG_SIG_PARENT).as_slice());
        let sig = sign(&sk, &signed_msg);

        let bundle = bundle_with_conditions(&conditions, sig);
        validate_clvm_and_signature(
            &bundle,
            TEST_CONSTANTS.max_block_cost_clvm,
            &TEST_CONSTANTS,
            TEST_CONSTANTS.hard_fork_height,
        )
        .expect("valid signature");
    }

    #[test]
    fn test_flags_for_height() {
        let mut constants = TEST_CONSTANTS.clone();
        constants.hard_fork_height = 100;

        let flags = get_flags_for_height_and_constants(99, &constants);
        assert_eq!(flags & ALLOW_BACKREFS, 0);

        let flags = get_flags_for_height_and_constants(100, &constants);
        assert_eq!(flags & ALLOW_BACKREFS, ALLOW_BACKREFS);
    }
}
