use crate::consensus_constants::ConsensusConstants;
use crate::gen::opcodes::{
    ConditionOpcode, AGG_SIG_AMOUNT, AGG_SIG_ME, AGG_SIG_PARENT, AGG_SIG_PARENT_AMOUNT,
    AGG_SIG_PARENT_PUZZLE, AGG_SIG_PUZZLE, AGG_SIG_PUZZLE_AMOUNT,
};
use crate::owned_conditions::OwnedSpendConditions;
use chives_protocol::{Bytes32, Coin};
use sha2::{Digest, Sha256};

/// Each AGG_SIG opcode uses its own domain separator, derived from the
/// network's AGG_SIG_ME data by hashing in the opcode.
pub fn agg_sig_additional_data(constants: &ConsensusConstants, opcode: ConditionOpcode) -> Bytes32 {
    if opcode == AGG_SIG_ME {
        return constants.agg_sig_me_additional_data;
    }
    let mut hasher = Sha256::new();
    hasher.update(constants.agg_sig_me_additional_data.as_slice());
    hasher.update([opcode as u8]);
    let digest: [u8; 32] = hasher.finalize().into();
    Bytes32::new(digest)
}

pub fn make_aggsig_final_message(
    opcode: ConditionOpcode,
    msg: &mut Vec<u8>,
    spend: &OwnedSpendConditions,
    constants: &ConsensusConstants,
) {
    match opcode {
        AGG_SIG_PARENT => {
            msg.extend(spend.parent_id.as_slice());
        }
        AGG_SIG_PUZZLE => {
            msg.extend(spend.puzzle_hash.as_slice());
        }
        AGG_SIG_AMOUNT => {
            msg.extend(u64_to_bytes(spend.coin_amount).as_slice());
        }
        AGG_SIG_PUZZLE_AMOUNT => {
            msg.extend(spend.puzzle_hash.as_slice());
            msg.extend(u64_to_bytes(spend.coin_amount).as_slice());
        }
        AGG_SIG_PARENT_AMOUNT => {
            msg.extend(spend.parent_id.as_slice());
            msg.extend(u64_to_bytes(spend.coin_amount).as_slice());
        }
        AGG_SIG_PARENT_PUZZLE => {
            msg.extend(spend.parent_id.as_slice());
            msg.extend(spend.puzzle_hash.as_slice());
        }
        AGG_SIG_ME => {
            let coin = Coin::new(spend.parent_id, spend.puzzle_hash, spend.coin_amount);
            msg.extend(coin.coin_id().as_slice());
        }
        _ => return,
    }
    msg.extend(agg_sig_additional_data(constants, opcode).as_slice());
}

/// Minimal big-endian encoding of an unsigned value, matching how clvm
/// atoms represent integers.
pub fn u64_to_bytes(val: u64) -> Vec<u8> {
    let amount_bytes: [u8; 8] = val.to_be_bytes();
    if val >= 0x8000_0000_0000_0000_u64 {
        let mut ret = Vec::<u8>::new();
        ret.push(0_u8);
        ret.extend(amount_bytes);
        ret
    } else {
        let start = match val {
            n if n >= 0x0080_0000_0000_0000_u64 => 0,
            n if n >= 0x8000_0000_0000_u64 => 1,
            n if n >= 0x0080_0000_0000_u64 => 2,
            n if n >= 0x8000_0000_u64 => 3,
            n if n >= 0x0080_0000_u64 => 4,
            n if n >= 0x8000_u64 => 5,
            n if n >= 0x80_u64 => 6,
            n if n > 0 => 7,
            _ => 8,
        };
        amount_bytes[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gen::conditions::SpendConditions;
    use crate::consensus_constants::TEST_CONSTANTS;
    use clvmr::Allocator;
    use hex_literal::hex;
    use rstest::rstest;
    use std::sync::Arc;

    #[test]
    fn test_u64_to_bytes_matches_atom_encoding() {
        let mut a = Allocator::new();
        for v in 0..10000 {
            let ptr = a.new_small_number(v).expect("valid u64");
            assert_eq!(a.atom(ptr).as_ref(), u64_to_bytes(v as u64).as_slice());
        }
        for v in u64::MAX - 1000..u64::MAX {
            let ptr = a.new_number(v.into()).expect("valid u64");
            assert_eq!(a.atom(ptr).as_ref(), u64_to_bytes(v).as_slice());
        }
    }

    #[test]
    fn test_additional_data_distinct_per_opcode() {
        let opcodes = [
            AGG_SIG_PARENT,
            AGG_SIG_PUZZLE,
            AGG_SIG_AMOUNT,
            AGG_SIG_PUZZLE_AMOUNT,
            AGG_SIG_PARENT_AMOUNT,
            AGG_SIG_PARENT_PUZZLE,
            AGG_SIG_ME,
        ];
        for (i, lhs) in opcodes.iter().enumerate() {
            for rhs in &opcodes[i + 1..] {
                assert_ne!(
                    agg_sig_additional_data(&TEST_CONSTANTS, *lhs),
                    agg_sig_additional_data(&TEST_CONSTANTS, *rhs)
                );
            }
        }
        assert_eq!(
            agg_sig_additional_data(&TEST_CONSTANTS, AGG_SIG_ME),
            TEST_CONSTANTS.agg_sig_me_additional_data
        );
    }

    #[rstest]
    #[case(AGG_SIG_PARENT, 10000)]
    #[case(AGG_SIG_PUZZLE, 261)]
    #[case(AGG_SIG_AMOUNT, 100_000_000_005)]
    #[case(AGG_SIG_PUZZLE_AMOUNT, 410)]
    #[case(AGG_SIG_PARENT_AMOUNT, 909)]
    #[case(AGG_SIG_PARENT_PUZZLE, 10_061_997)]
    #[case(AGG_SIG_ME, 1303)]
    fn test_make_aggsig_final_message(#[case] opcode: ConditionOpcode, #[case] coin_amount: u64) {
        let parent_id = hex!("4444444444444444444444444444444444444444444444444444444444444444");
        let puzzle_hash = hex!("3333333333333333333333333333333333333333333333333333333333333333");
        let mut msg = b"message".to_vec();

        let coin = Coin::new(Bytes32::new(parent_id), Bytes32::new(puzzle_hash), coin_amount);

        let mut expected_result = Vec::<u8>::new();
        expected_result.extend_from_slice(msg.as_slice());
        match opcode {
            AGG_SIG_PARENT => {
                expected_result.extend(parent_id.as_slice());
            }
            AGG_SIG_PUZZLE => {
                expected_result.extend(puzzle_hash.as_slice());
            }
            AGG_SIG_AMOUNT => {
                expected_result.extend(u64_to_bytes(coin_amount).as_slice());
            }
            AGG_SIG_PUZZLE_AMOUNT => {
                expected_result.extend(puzzle_hash.as_slice());
                expected_result.extend(u64_to_bytes(coin_amount).as_slice());
            }
            AGG_SIG_PARENT_AMOUNT => {
                expected_result.extend(parent_id.as_slice());
                expected_result.extend(u64_to_bytes(coin_amount).as_slice());
            }
            AGG_SIG_PARENT_PUZZLE => {
                expected_result.extend(parent_id.as_slice());
                expected_result.extend(puzzle_hash.as_slice());
            }
            AGG_SIG_ME => {
                expected_result.extend(coin.coin_id().as_slice());
            }
            _ => unreachable!(),
        }
        expected_result.extend(agg_sig_additional_data(&TEST_CONSTANTS, opcode).as_slice());

        let mut a = Allocator::new();
        let spend = SpendConditions::new(
            a.new_atom(parent_id.as_slice()).expect("atom"),
            coin_amount,
            a.new_atom(puzzle_hash.as_slice()).expect("atom"),
            Arc::new(coin.coin_id()),
        );
        let spend = OwnedSpendConditions::from(&a, spend);

        make_aggsig_final_message(opcode, &mut msg, &spend, &TEST_CONSTANTS);
        assert_eq!(msg, expected_result);
    }
}
