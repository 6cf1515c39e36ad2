use super::condition_sanitizers::{
    parse_amount, sanitize_announce_msg, sanitize_hash, sanitize_message_mode,
};
use super::opcodes::{
    compute_unknown_condition_cost, parse_opcode, ConditionOpcode, AGG_SIG_AMOUNT, AGG_SIG_COST,
    AGG_SIG_ME, AGG_SIG_PARENT, AGG_SIG_PARENT_AMOUNT, AGG_SIG_PARENT_PUZZLE, AGG_SIG_PUZZLE,
    AGG_SIG_PUZZLE_AMOUNT, AGG_SIG_UNSAFE, ASSERT_BEFORE_HEIGHT_ABSOLUTE,
    ASSERT_BEFORE_HEIGHT_RELATIVE, ASSERT_BEFORE_SECONDS_ABSOLUTE, ASSERT_BEFORE_SECONDS_RELATIVE,
    ASSERT_COIN_ANNOUNCEMENT, ASSERT_CONCURRENT_PUZZLE, ASSERT_CONCURRENT_SPEND, ASSERT_EPHEMERAL,
    ASSERT_HEIGHT_ABSOLUTE, ASSERT_HEIGHT_RELATIVE, ASSERT_MY_AMOUNT, ASSERT_MY_BIRTH_HEIGHT,
    ASSERT_MY_BIRTH_SECONDS, ASSERT_MY_COIN_ID, ASSERT_MY_PARENT_ID, ASSERT_MY_PUZZLEHASH,
    ASSERT_PUZZLE_ANNOUNCEMENT, ASSERT_SECONDS_ABSOLUTE, ASSERT_SECONDS_RELATIVE, CREATE_COIN,
    CREATE_COIN_ANNOUNCEMENT, CREATE_COIN_COST, CREATE_PUZZLE_ANNOUNCEMENT, RECEIVE_MESSAGE,
    REMARK, RESERVE_FEE, SEND_MESSAGE, SOFTFORK,
};
use super::sanitize_int::{sanitize_uint, SanitizedUint};
use super::validation_error::{check_nil, first, next, rest, ErrorCode, ValidationErr};
use crate::consensus_constants::ConsensusConstants;
use crate::gen::flags::{DONT_VALIDATE_SIGNATURE, NO_UNKNOWN_CONDS, STRICT_ARGS_COUNT};
use crate::gen::messages::{Message, SpendId};
use crate::make_aggsig_final_message::{agg_sig_additional_data, u64_to_bytes};
use chia_bls::{aggregate_verify, PublicKey, Signature};
use chives_protocol::{Bytes, Bytes32};
use clvmr::allocator::{Allocator, NodePtr, SExp};
use clvmr::cost::Cost;
use sha2::{Digest, Sha256};
use std::cmp::{max, min};
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

// The conditions for a bundle of spends form a list, one entry per spent
// coin:
//
// ((<parent-id> <puzzle-hash> <amount> (CONDITION ...)) ...)
//
// each CONDITION is, in turn, a list:
//
// (<condition-opcode> <arg1> <arg2> ...)
//
// different conditions take different numbers and types of arguments.

#[derive(Debug)]
pub enum Condition {
    // pubkey (48 bytes) and message (<= 1024 bytes)
    AggSigUnsafe(NodePtr, NodePtr),
    AggSigMe(NodePtr, NodePtr),
    AggSigParent(NodePtr, NodePtr),
    AggSigPuzzle(NodePtr, NodePtr),
    AggSigAmount(NodePtr, NodePtr),
    AggSigPuzzleAmount(NodePtr, NodePtr),
    AggSigParentAmount(NodePtr, NodePtr),
    AggSigParentPuzzle(NodePtr, NodePtr),
    // puzzle hash (32 bytes), amount, optional hint (32 bytes, nil if absent)
    CreateCoin(NodePtr, u64, NodePtr),
    // amount
    ReserveFee(u64),
    // message (<= 1024 bytes)
    CreateCoinAnnouncement(NodePtr),
    CreatePuzzleAnnouncement(NodePtr),
    // announcement ID (hash, 32 bytes)
    AssertCoinAnnouncement(NodePtr),
    AssertPuzzleAnnouncement(NodePtr),
    // ensure the specified coin ID is also being spent (hash, 32 bytes)
    AssertConcurrentSpend(NodePtr),
    // ensure the specified puzzle hash is used by at least one other spend
    AssertConcurrentPuzzle(NodePtr),
    // ID (hash, 32 bytes)
    AssertMyCoinId(NodePtr),
    AssertMyParentId(NodePtr),
    AssertMyPuzzlehash(NodePtr),
    // amount
    AssertMyAmount(u64),
    // seconds
    AssertMyBirthSeconds(u64),
    // block height
    AssertMyBirthHeight(u32),
    // seconds
    AssertSecondsRelative(u64),
    AssertSecondsAbsolute(u64),
    // block height
    AssertHeightRelative(u32),
    AssertHeightAbsolute(u32),
    // seconds
    AssertBeforeSecondsRelative(u64),
    AssertBeforeSecondsAbsolute(u64),
    // block height
    AssertBeforeHeightRelative(u32),
    AssertBeforeHeightAbsolute(u32),
    AssertEphemeral,

    // a condition we don't understand, it just applies the specified cost
    Softfork(Cost),

    // source, destination, message
    SendMessage(u8, SpendId, NodePtr),
    ReceiveMessage(SpendId, u8, NodePtr),

    // the condition is unconditionally true and can be skipped
    Skip,
    SkipRelativeCondition,
}

pub(crate) fn compute_coin_id(
    a: &Allocator,
    parent_id: NodePtr,
    puzzle_hash: NodePtr,
    amount: &[u8],
) -> Bytes32 {
    let mut hasher = Sha256::new();
    hasher.update(a.atom(parent_id).as_ref());
    hasher.update(a.atom(puzzle_hash).as_ref());
    hasher.update(amount);
    let digest: [u8; 32] = hasher.finalize().into();
    Bytes32::new(digest)
}

// AGG_SIG_UNSAFE messages must not end in any of the domain separators used
// by the other AGG_SIG_* conditions, or an unsafe signature could be replayed
// as a safe one.
fn check_agg_sig_unsafe_message(
    a: &Allocator,
    msg: NodePtr,
    constants: &ConsensusConstants,
) -> Result<(), ValidationErr> {
    if a.atom_len(msg) < 32 {
        return Ok(());
    }
    let buf = a.atom(msg);
    for opcode in [
        AGG_SIG_PARENT,
        AGG_SIG_PUZZLE,
        AGG_SIG_AMOUNT,
        AGG_SIG_PUZZLE_AMOUNT,
        AGG_SIG_PARENT_AMOUNT,
        AGG_SIG_PARENT_PUZZLE,
        AGG_SIG_ME,
    ] {
        let additional_data = agg_sig_additional_data(constants, opcode);
        if buf.as_ref().ends_with(additional_data.as_slice()) {
            return Err(ValidationErr(msg, ErrorCode::InvalidMessage));
        }
    }
    Ok(())
}

fn maybe_check_args_terminator(
    a: &Allocator,
    arg: NodePtr,
    flags: u32,
) -> Result<(), ValidationErr> {
    if (flags & STRICT_ARGS_COUNT) != 0 {
        check_nil(a, rest(a, arg)?)?;
    }
    Ok(())
}

pub fn parse_args(
    a: &Allocator,
    mut c: NodePtr,
    op: ConditionOpcode,
    flags: u32,
) -> Result<Condition, ValidationErr> {
    match op {
        AGG_SIG_UNSAFE
        | AGG_SIG_ME
        | AGG_SIG_PUZZLE
        | AGG_SIG_PUZZLE_AMOUNT
        | AGG_SIG_PARENT
        | AGG_SIG_AMOUNT
        | AGG_SIG_PARENT_PUZZLE
        | AGG_SIG_PARENT_AMOUNT => {
            let pubkey = sanitize_hash(a, first(a, c)?, 48, ErrorCode::InvalidPublicKey)?;
            c = rest(a, c)?;
            let message = sanitize_announce_msg(a, first(a, c)?, ErrorCode::InvalidMessage)?;
            // AGG_SIG_* take two parameters
            if (flags & STRICT_ARGS_COUNT) != 0 {
                check_nil(a, rest(a, c)?)?;
            }
            match op {
                AGG_SIG_UNSAFE => Ok(Condition::AggSigUnsafe(pubkey, message)),
                AGG_SIG_ME => Ok(Condition::AggSigMe(pubkey, message)),
                AGG_SIG_PARENT => Ok(Condition::AggSigParent(pubkey, message)),
                AGG_SIG_PUZZLE => Ok(Condition::AggSigPuzzle(pubkey, message)),
                AGG_SIG_AMOUNT => Ok(Condition::AggSigAmount(pubkey, message)),
                AGG_SIG_PUZZLE_AMOUNT => Ok(Condition::AggSigPuzzleAmount(pubkey, message)),
                AGG_SIG_PARENT_AMOUNT => Ok(Condition::AggSigParentAmount(pubkey, message)),
                AGG_SIG_PARENT_PUZZLE => Ok(Condition::AggSigParentPuzzle(pubkey, message)),
                _ => Err(ValidationErr(c, ErrorCode::InvalidConditionOpcode)),
            }
        }
        CREATE_COIN => {
            let puzzle_hash = sanitize_hash(a, first(a, c)?, 32, ErrorCode::InvalidPuzzleHash)?;
            c = rest(a, c)?;
            let node = first(a, c)?;
            let amount = match sanitize_uint(a, node, 8, ErrorCode::InvalidCoinAmount)? {
                SanitizedUint::PositiveOverflow => {
                    return Err(ValidationErr(node, ErrorCode::CoinAmountExceedsMaximum));
                }
                SanitizedUint::NegativeOverflow => {
                    return Err(ValidationErr(node, ErrorCode::CoinAmountNegative));
                }
                SanitizedUint::Ok(amount) => amount,
            };
            // CREATE_COIN takes an optional third parameter, a list whose
            // first element is a hint (typically a 32 byte hash). Anything
            // else in the list is ignored, since garbage arguments are
            // allowed (unless STRICT_ARGS_COUNT is set).
            c = rest(a, c)?;
            if let Ok(params) = first(a, c) {
                maybe_check_args_terminator(a, c, flags)?;
                if let Ok(param) = first(a, params) {
                    if let SExp::Atom = a.sexp(param) {
                        if a.atom_len(param) <= 32 {
                            return Ok(Condition::CreateCoin(puzzle_hash, amount, param));
                        }
                    }
                }
            } else if (flags & STRICT_ARGS_COUNT) != 0 {
                check_nil(a, c)?;
            }
            Ok(Condition::CreateCoin(puzzle_hash, amount, NodePtr::NIL))
        }
        SOFTFORK => {
            if (flags & NO_UNKNOWN_CONDS) != 0 {
                // no softforked-in conditions are known, so they are all
                // unknown
                Err(ValidationErr(c, ErrorCode::InvalidConditionOpcode))
            } else {
                match sanitize_uint(a, first(a, c)?, 4, ErrorCode::InvalidSoftforkCost)? {
                    // the argument is the cost of the condition, scaled down
                    // by 10000 to keep it small
                    SanitizedUint::Ok(cost) => Ok(Condition::Softfork(cost * 10000)),
                    _ => Err(ValidationErr(c, ErrorCode::InvalidSoftforkCost)),
                }
            }
        }
        256..=65535 => {
            // unknown conditions with a cost attached to them
            if (flags & NO_UNKNOWN_CONDS) != 0 {
                Err(ValidationErr(c, ErrorCode::InvalidConditionOpcode))
            } else {
                Ok(Condition::Softfork(compute_unknown_condition_cost(op)))
            }
        }
        RESERVE_FEE => {
            maybe_check_args_terminator(a, c, flags)?;
            let fee = parse_amount(a, first(a, c)?, ErrorCode::ReserveFeeConditionFailed)?;
            Ok(Condition::ReserveFee(fee))
        }
        CREATE_COIN_ANNOUNCEMENT => {
            maybe_check_args_terminator(a, c, flags)?;
            let msg = sanitize_announce_msg(a, first(a, c)?, ErrorCode::InvalidCoinAnnouncement)?;
            Ok(Condition::CreateCoinAnnouncement(msg))
        }
        ASSERT_COIN_ANNOUNCEMENT => {
            maybe_check_args_terminator(a, c, flags)?;
            let id = sanitize_hash(a, first(a, c)?, 32, ErrorCode::AssertCoinAnnouncementFailed)?;
            Ok(Condition::AssertCoinAnnouncement(id))
        }
        CREATE_PUZZLE_ANNOUNCEMENT => {
            maybe_check_args_terminator(a, c, flags)?;
            let msg = sanitize_announce_msg(a, first(a, c)?, ErrorCode::InvalidPuzzleAnnouncement)?;
            Ok(Condition::CreatePuzzleAnnouncement(msg))
        }
        ASSERT_PUZZLE_ANNOUNCEMENT => {
            maybe_check_args_terminator(a, c, flags)?;
            let id = sanitize_hash(
                a,
                first(a, c)?,
                32,
                ErrorCode::AssertPuzzleAnnouncementFailed,
            )?;
            Ok(Condition::AssertPuzzleAnnouncement(id))
        }
        ASSERT_CONCURRENT_SPEND => {
            maybe_check_args_terminator(a, c, flags)?;
            let id = sanitize_hash(a, first(a, c)?, 32, ErrorCode::AssertConcurrentSpendFailed)?;
            Ok(Condition::AssertConcurrentSpend(id))
        }
        ASSERT_CONCURRENT_PUZZLE => {
            maybe_check_args_terminator(a, c, flags)?;
            let id = sanitize_hash(a, first(a, c)?, 32, ErrorCode::AssertConcurrentPuzzleFailed)?;
            Ok(Condition::AssertConcurrentPuzzle(id))
        }
        ASSERT_MY_COIN_ID => {
            maybe_check_args_terminator(a, c, flags)?;
            let id = sanitize_hash(a, first(a, c)?, 32, ErrorCode::AssertMyCoinIdFailed)?;
            Ok(Condition::AssertMyCoinId(id))
        }
        ASSERT_MY_PARENT_ID => {
            maybe_check_args_terminator(a, c, flags)?;
            let id = sanitize_hash(a, first(a, c)?, 32, ErrorCode::AssertMyParentIdFailed)?;
            Ok(Condition::AssertMyParentId(id))
        }
        ASSERT_MY_PUZZLEHASH => {
            maybe_check_args_terminator(a, c, flags)?;
            let id = sanitize_hash(a, first(a, c)?, 32, ErrorCode::AssertMyPuzzleHashFailed)?;
            Ok(Condition::AssertMyPuzzlehash(id))
        }
        ASSERT_MY_AMOUNT => {
            maybe_check_args_terminator(a, c, flags)?;
            let amount = parse_amount(a, first(a, c)?, ErrorCode::AssertMyAmountFailed)?;
            Ok(Condition::AssertMyAmount(amount))
        }
        ASSERT_MY_BIRTH_SECONDS => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertMyBirthSecondsFailed;
            match sanitize_uint(a, node, 8, code)? {
                SanitizedUint::PositiveOverflow | SanitizedUint::NegativeOverflow => {
                    Err(ValidationErr(node, code))
                }
                SanitizedUint::Ok(r) => Ok(Condition::AssertMyBirthSeconds(r)),
            }
        }
        ASSERT_MY_BIRTH_HEIGHT => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertMyBirthHeightFailed;
            match sanitize_uint(a, node, 4, code)? {
                SanitizedUint::PositiveOverflow | SanitizedUint::NegativeOverflow => {
                    Err(ValidationErr(node, code))
                }
                SanitizedUint::Ok(r) => Ok(Condition::AssertMyBirthHeight(r as u32)),
            }
        }
        ASSERT_EPHEMERAL => {
            // this condition does not take any parameters
            if (flags & STRICT_ARGS_COUNT) != 0 {
                check_nil(a, c)?;
            }
            Ok(Condition::AssertEphemeral)
        }
        ASSERT_SECONDS_RELATIVE => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertSecondsRelativeFailed;
            match sanitize_uint(a, node, 8, code)? {
                SanitizedUint::PositiveOverflow => Err(ValidationErr(node, code)),
                SanitizedUint::NegativeOverflow => Ok(Condition::SkipRelativeCondition),
                SanitizedUint::Ok(r) => Ok(Condition::AssertSecondsRelative(r)),
            }
        }
        ASSERT_SECONDS_ABSOLUTE => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertSecondsAbsoluteFailed;
            match sanitize_uint(a, node, 8, code)? {
                SanitizedUint::PositiveOverflow => Err(ValidationErr(node, code)),
                SanitizedUint::NegativeOverflow => Ok(Condition::Skip),
                SanitizedUint::Ok(r) => Ok(Condition::AssertSecondsAbsolute(r)),
            }
        }
        ASSERT_HEIGHT_RELATIVE => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertHeightRelativeFailed;
            match sanitize_uint(a, node, 4, code)? {
                SanitizedUint::PositiveOverflow => Err(ValidationErr(node, code)),
                SanitizedUint::NegativeOverflow => Ok(Condition::SkipRelativeCondition),
                SanitizedUint::Ok(r) => Ok(Condition::AssertHeightRelative(r as u32)),
            }
        }
        ASSERT_HEIGHT_ABSOLUTE => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertHeightAbsoluteFailed;
            match sanitize_uint(a, node, 4, code)? {
                SanitizedUint::PositiveOverflow => Err(ValidationErr(node, code)),
                SanitizedUint::NegativeOverflow => Ok(Condition::Skip),
                SanitizedUint::Ok(r) => Ok(Condition::AssertHeightAbsolute(r as u32)),
            }
        }
        ASSERT_BEFORE_SECONDS_RELATIVE => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertBeforeSecondsRelativeFailed;
            match sanitize_uint(a, node, 8, code)? {
                SanitizedUint::PositiveOverflow => Ok(Condition::SkipRelativeCondition),
                SanitizedUint::NegativeOverflow => Err(ValidationErr(node, code)),
                SanitizedUint::Ok(r) => Ok(Condition::AssertBeforeSecondsRelative(r)),
            }
        }
        ASSERT_BEFORE_SECONDS_ABSOLUTE => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertBeforeSecondsAbsoluteFailed;
            match sanitize_uint(a, node, 8, code)? {
                SanitizedUint::PositiveOverflow => Ok(Condition::Skip),
                SanitizedUint::NegativeOverflow => Err(ValidationErr(node, code)),
                SanitizedUint::Ok(r) => Ok(Condition::AssertBeforeSecondsAbsolute(r)),
            }
        }
        ASSERT_BEFORE_HEIGHT_RELATIVE => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertBeforeHeightRelativeFailed;
            match sanitize_uint(a, node, 4, code)? {
                SanitizedUint::PositiveOverflow => Ok(Condition::SkipRelativeCondition),
                SanitizedUint::NegativeOverflow => Err(ValidationErr(node, code)),
                SanitizedUint::Ok(r) => Ok(Condition::AssertBeforeHeightRelative(r as u32)),
            }
        }
        ASSERT_BEFORE_HEIGHT_ABSOLUTE => {
            maybe_check_args_terminator(a, c, flags)?;
            let node = first(a, c)?;
            let code = ErrorCode::AssertBeforeHeightAbsoluteFailed;
            match sanitize_uint(a, node, 4, code)? {
                SanitizedUint::PositiveOverflow => Ok(Condition::Skip),
                SanitizedUint::NegativeOverflow => Err(ValidationErr(node, code)),
                SanitizedUint::Ok(r) => Ok(Condition::AssertBeforeHeightAbsolute(r as u32)),
            }
        }
        SEND_MESSAGE => {
            let mode = sanitize_message_mode(a, first(a, c)?)?;
            c = rest(a, c)?;
            let message = sanitize_announce_msg(a, first(a, c)?, ErrorCode::InvalidMessage)?;
            c = rest(a, c)?;
            let dst = SpendId::parse(a, &mut c, (mode & 0b111) as u8)?;
            if (flags & STRICT_ARGS_COUNT) != 0 {
                check_nil(a, c)?;
            }
            Ok(Condition::SendMessage(
                ((mode >> 3) & 0b111) as u8,
                dst,
                message,
            ))
        }
        RECEIVE_MESSAGE => {
            let mode = sanitize_message_mode(a, first(a, c)?)?;
            c = rest(a, c)?;
            let message = sanitize_announce_msg(a, first(a, c)?, ErrorCode::InvalidMessage)?;
            c = rest(a, c)?;
            let src = SpendId::parse(a, &mut c, ((mode >> 3) & 0b111) as u8)?;
            if (flags & STRICT_ARGS_COUNT) != 0 {
                check_nil(a, c)?;
            }
            Ok(Condition::ReceiveMessage(
                src,
                (mode & 0b111) as u8,
                message,
            ))
        }
        REMARK => {
            // this condition is always true, arguments are ignored
            Ok(Condition::Skip)
        }
        _ => Err(ValidationErr(c, ErrorCode::InvalidConditionOpcode)),
    }
}

#[derive(Debug, Clone)]
pub struct NewCoin {
    pub puzzle_hash: Bytes32,
    pub amount: u64,
    // the hint is optional, nil when absent. It's not part of the coin's
    // identity and not hashed into the coin ID
    pub hint: NodePtr,
}

impl Hash for NewCoin {
    fn hash<H: Hasher>(&self, h: &mut H) {
        self.puzzle_hash.hash(h);
        self.amount.hash(h);
    }
}

impl Eq for NewCoin {}

impl PartialEq for NewCoin {
    fn eq(&self, lhs: &NewCoin) -> bool {
        self.amount == lhs.amount && self.puzzle_hash == lhs.puzzle_hash
    }
}

/// The conditions tied directly to one spent coin.
#[derive(Debug, Clone)]
pub struct SpendConditions {
    // the parent coin ID of the coin being spent
    pub parent_id: NodePtr,
    pub coin_amount: u64,
    pub puzzle_hash: NodePtr,
    // computed from parent_id, puzzle_hash and coin_amount
    pub coin_id: Arc<Bytes32>,
    // all of these start as None, meaning "no constraint". For the
    // before_-fields we keep the lowest (most restrictive) value, for the
    // others the highest
    pub height_relative: Option<u32>,
    pub seconds_relative: Option<u64>,
    pub before_height_relative: Option<u32>,
    pub before_seconds_relative: Option<u64>,
    // set if the coin asserts its birth height or timestamp
    pub birth_height: Option<u32>,
    pub birth_seconds: Option<u64>,
    // all coins created by this spend. Duplicates are failures
    pub create_coin: HashSet<NewCoin>,
    // all AGG_SIG_* conditions (except AGG_SIG_UNSAFE, which lives on the
    // bundle), organized by opcode
    pub agg_sig_me: Vec<(PublicKey, NodePtr)>,
    pub agg_sig_parent: Vec<(PublicKey, NodePtr)>,
    pub agg_sig_puzzle: Vec<(PublicKey, NodePtr)>,
    pub agg_sig_amount: Vec<(PublicKey, NodePtr)>,
    pub agg_sig_puzzle_amount: Vec<(PublicKey, NodePtr)>,
    pub agg_sig_parent_amount: Vec<(PublicKey, NodePtr)>,
    pub agg_sig_parent_puzzle: Vec<(PublicKey, NodePtr)>,
    // set if the spend used any relative time lock or birth assertion. Those
    // conditions are not allowed on ephemeral spends
    pub has_relative_condition: bool,
}

impl SpendConditions {
    pub fn new(
        parent_id: NodePtr,
        coin_amount: u64,
        puzzle_hash: NodePtr,
        coin_id: Arc<Bytes32>,
    ) -> SpendConditions {
        SpendConditions {
            parent_id,
            coin_amount,
            puzzle_hash,
            coin_id,
            height_relative: None,
            seconds_relative: None,
            before_height_relative: None,
            before_seconds_relative: None,
            birth_height: None,
            birth_seconds: None,
            create_coin: HashSet::new(),
            agg_sig_me: Vec::new(),
            agg_sig_parent: Vec::new(),
            agg_sig_puzzle: Vec::new(),
            agg_sig_amount: Vec::new(),
            agg_sig_puzzle_amount: Vec::new(),
            agg_sig_parent_amount: Vec::new(),
            agg_sig_parent_puzzle: Vec::new(),
            has_relative_condition: false,
        }
    }
}

/// The conditions and properties of a complete spend bundle. Conditions
/// without an implied coin (reserve fee, absolute time locks, unsafe
/// signatures) are aggregated here, the rest stay on their spend.
#[derive(Debug, Default)]
pub struct SpendBundleConditions {
    pub spends: Vec<SpendConditions>,
    // the sum of all RESERVE_FEE conditions
    pub reserve_fee: u64,
    // the highest (most strict) height/time conditions. 0 means no constraint
    pub height_absolute: u32,
    pub seconds_absolute: u64,
    // AGG_SIG_UNSAFE conditions, not tied to the spend emitting them
    pub agg_sig_unsafe: Vec<(PublicKey, NodePtr)>,
    // when set, the lowest (most restrictive) ASSERT_BEFORE_*_ABSOLUTE
    pub before_height_absolute: Option<u32>,
    pub before_seconds_absolute: Option<u64>,
    // the cost of all conditions. The full validation pipeline also folds in
    // the CLVM execution cost and the byte cost
    pub cost: u64,
    // the sum of all spent amounts
    pub removal_amount: u128,
    // the sum of all CREATE_COIN amounts
    pub addition_amount: u128,
    // true if the bundle's aggregate signature was checked
    pub validated_signature: bool,
}

#[derive(Default)]
pub struct ParseState {
    // hashing of announcements is deferred until parsing is complete, in
    // case parsing fails first
    announce_coin: HashSet<(Arc<Bytes32>, NodePtr)>,
    announce_puzzle: HashSet<(NodePtr, NodePtr)>,

    // announcement assertions, checked after everything has been parsed
    assert_coin: HashSet<NodePtr>,
    assert_puzzle: HashSet<NodePtr>,

    // all messages sent or received, resolved once all spends are parsed
    messages: Vec<Message>,

    // concurrent-spend and concurrent-puzzle assertions, checked at the end
    assert_concurrent_spend: HashSet<NodePtr>,
    assert_concurrent_puzzle: HashSet<NodePtr>,

    // all coin IDs spent so far, mapped to the index of the spend in
    // SpendBundleConditions::spends. Reference counted since announcements
    // may also hold the ID
    spent_coins: HashMap<Arc<Bytes32>, usize>,

    // the puzzle hash of every spend. These are node pointers, so there may
    // be duplicates. Only expanded into a set if there are any
    // concurrent-puzzle assertions
    spent_puzzles: HashSet<NodePtr>,

    // spends asserting that they are ephemeral, as indices into
    // SpendBundleConditions::spends. Verified at the end
    assert_ephemeral: HashSet<usize>,

    // spends with relative time locks or birth assertions, which are not
    // allowed on ephemeral coins. Also verified at the end
    assert_not_ephemeral: HashSet<usize>,

    // all public keys and messages the spends require signatures over,
    // validated against the aggregate signature unless
    // DONT_VALIDATE_SIGNATURE is set
    pub pkm_pairs: Vec<(PublicKey, Bytes)>,
}

// returns (parent-id, puzzle-hash, amount, condition-list)
pub(crate) fn parse_single_spend(
    a: &Allocator,
    mut spend: NodePtr,
) -> Result<(NodePtr, NodePtr, NodePtr, NodePtr), ValidationErr> {
    let parent_id = first(a, spend)?;
    spend = rest(a, spend)?;
    let puzzle_hash = first(a, spend)?;
    spend = rest(a, spend)?;
    let amount = first(a, spend)?;
    spend = rest(a, spend)?;
    let cond = first(a, spend)?;
    // anything past the conditions is reserved for future extensions
    Ok((parent_id, puzzle_hash, amount, cond))
}

#[allow(clippy::too_many_arguments)]
pub fn process_single_spend(
    a: &Allocator,
    ret: &mut SpendBundleConditions,
    state: &mut ParseState,
    parent_id: NodePtr,
    puzzle_hash: NodePtr,
    amount: NodePtr,
    conditions: NodePtr,
    flags: u32,
    max_cost: &mut Cost,
    constants: &ConsensusConstants,
) -> Result<(), ValidationErr> {
    let parent_id = sanitize_hash(a, parent_id, 32, ErrorCode::InvalidParentId)?;
    let puzzle_hash = sanitize_hash(a, puzzle_hash, 32, ErrorCode::InvalidPuzzleHash)?;
    let my_amount = parse_amount(a, amount, ErrorCode::InvalidCoinAmount)?;
    let amount_buf = a.atom(amount);

    let coin_id = Arc::new(compute_coin_id(
        a,
        parent_id,
        puzzle_hash,
        amount_buf.as_ref(),
    ));

    if state
        .spent_coins
        .insert(coin_id.clone(), ret.spends.len())
        .is_some()
    {
        // the same coin ID twice in one bundle is a double spend
        return Err(ValidationErr(parent_id, ErrorCode::DoubleSpend));
    }

    state.spent_puzzles.insert(puzzle_hash);

    ret.removal_amount += my_amount as u128;

    let spend = SpendConditions::new(parent_id, my_amount, puzzle_hash, coin_id);

    parse_conditions(a, ret, state, spend, conditions, flags, max_cost, constants)
}

fn assert_not_ephemeral(spend: &mut SpendConditions, state: &mut ParseState, idx: usize) {
    if spend.has_relative_condition {
        return;
    }
    state.assert_not_ephemeral.insert(idx);
    spend.has_relative_condition = true;
}

fn decrement(cnt: &mut u32, n: NodePtr) -> Result<(), ValidationErr> {
    if *cnt == 0 {
        Err(ValidationErr(n, ErrorCode::TooManyAnnouncements))
    } else {
        *cnt -= 1;
        Ok(())
    }
}

fn to_key(a: &Allocator, pk: NodePtr) -> Result<PublicKey, ValidationErr> {
    let bytes: [u8; 48] = a
        .atom(pk)
        .as_ref()
        .try_into()
        .map_err(|_| ValidationErr(pk, ErrorCode::InvalidPublicKey))?;
    let key = PublicKey::from_bytes(&bytes).map_err(|_| ValidationErr(pk, ErrorCode::InvalidPublicKey))?;
    if key.is_inf() {
        Err(ValidationErr(pk, ErrorCode::InvalidPublicKey))
    } else {
        Ok(key)
    }
}

#[allow(clippy::too_many_arguments)]
pub fn parse_conditions(
    a: &Allocator,
    ret: &mut SpendBundleConditions,
    state: &mut ParseState,
    mut spend: SpendConditions,
    mut iter: NodePtr,
    flags: u32,
    max_cost: &mut Cost,
    constants: &ConsensusConstants,
) -> Result<(), ValidationErr> {
    let mut announce_countdown: u32 = 1024;

    while let Some((mut c, tail)) = next(a, iter)? {
        iter = tail;
        let Some(op) = parse_opcode(a, first(a, c)?) else {
            // in strict mode unknown conditions are not allowed
            if (flags & NO_UNKNOWN_CONDS) != 0 {
                return Err(ValidationErr(c, ErrorCode::InvalidConditionOpcode));
            }
            continue;
        };

        // subtract from max_cost up front, to fail as early as possible if
        // the limit is exceeded
        match op {
            CREATE_COIN => {
                if *max_cost < CREATE_COIN_COST {
                    return Err(ValidationErr(c, ErrorCode::CostExceeded));
                }
                *max_cost -= CREATE_COIN_COST;
            }
            AGG_SIG_UNSAFE
            | AGG_SIG_ME
            | AGG_SIG_PUZZLE
            | AGG_SIG_PUZZLE_AMOUNT
            | AGG_SIG_PARENT
            | AGG_SIG_AMOUNT
            | AGG_SIG_PARENT_PUZZLE
            | AGG_SIG_PARENT_AMOUNT => {
                if *max_cost < AGG_SIG_COST {
                    return Err(ValidationErr(c, ErrorCode::CostExceeded));
                }
                *max_cost -= AGG_SIG_COST;
            }
            _ => (),
        }
        c = rest(a, c)?;
        let cva = parse_args(a, c, op, flags)?;
        match cva {
            Condition::ReserveFee(limit) => {
                // reserve fees accumulate
                ret.reserve_fee = ret
                    .reserve_fee
                    .checked_add(limit)
                    .ok_or(ValidationErr(c, ErrorCode::ReserveFeeConditionFailed))?;
            }
            Condition::CreateCoin(ph, amount, hint) => {
                let new_coin = NewCoin {
                    puzzle_hash: a
                        .atom(ph)
                        .as_ref()
                        .try_into()
                        .map_err(|_| ValidationErr(ph, ErrorCode::InvalidPuzzleHash))?,
                    amount,
                    hint,
                };
                if !spend.create_coin.insert(new_coin) {
                    return Err(ValidationErr(c, ErrorCode::DuplicateOutput));
                }
                ret.addition_amount += amount as u128;
            }
            Condition::AssertSecondsRelative(s) => {
                // keep the most strict condition, the highest limit
                spend.seconds_relative = Some(match spend.seconds_relative {
                    Some(existing) => max(existing, s),
                    None => s,
                });
                if let Some(bs) = spend.before_seconds_relative {
                    if bs <= s {
                        // spending *before* a timestamp and also at-or-after
                        // it can never succeed
                        return Err(ValidationErr(
                            c,
                            ErrorCode::ImpossibleSecondsRelativeConstraints,
                        ));
                    }
                }
                assert_not_ephemeral(&mut spend, state, ret.spends.len());
            }
            Condition::AssertSecondsAbsolute(s) => {
                ret.seconds_absolute = max(ret.seconds_absolute, s);
            }
            Condition::AssertHeightRelative(h) => {
                spend.height_relative = Some(match spend.height_relative {
                    Some(existing) => max(existing, h),
                    None => h,
                });
                if let Some(bh) = spend.before_height_relative {
                    if bh <= h {
                        return Err(ValidationErr(
                            c,
                            ErrorCode::ImpossibleHeightRelativeConstraints,
                        ));
                    }
                }
                assert_not_ephemeral(&mut spend, state, ret.spends.len());
            }
            Condition::AssertHeightAbsolute(h) => {
                ret.height_absolute = max(ret.height_absolute, h);
            }
            Condition::AssertBeforeSecondsRelative(s) => {
                // keep the most strict condition, the lowest limit
                spend.before_seconds_relative = Some(match spend.before_seconds_relative {
                    Some(existing) => min(existing, s),
                    None => s,
                });
                if let Some(sr) = spend.seconds_relative {
                    if s <= sr {
                        return Err(ValidationErr(
                            c,
                            ErrorCode::ImpossibleSecondsRelativeConstraints,
                        ));
                    }
                }
                assert_not_ephemeral(&mut spend, state, ret.spends.len());
            }
            Condition::AssertBeforeSecondsAbsolute(s) => {
                ret.before_seconds_absolute = Some(match ret.before_seconds_absolute {
                    Some(existing) => min(existing, s),
                    None => s,
                });
            }
            Condition::AssertBeforeHeightRelative(h) => {
                spend.before_height_relative = Some(match spend.before_height_relative {
                    Some(existing) => min(existing, h),
                    None => h,
                });
                if let Some(hr) = spend.height_relative {
                    if h <= hr {
                        return Err(ValidationErr(
                            c,
                            ErrorCode::ImpossibleHeightRelativeConstraints,
                        ));
                    }
                }
                assert_not_ephemeral(&mut spend, state, ret.spends.len());
            }
            Condition::AssertBeforeHeightAbsolute(h) => {
                ret.before_height_absolute = Some(match ret.before_height_absolute {
                    Some(existing) => min(existing, h),
                    None => h,
                });
            }
            Condition::AssertMyCoinId(id) => {
                if a.atom(id).as_ref() != (*spend.coin_id).as_ref() {
                    return Err(ValidationErr(c, ErrorCode::AssertMyCoinIdFailed));
                }
            }
            Condition::AssertMyAmount(amount) => {
                if amount != spend.coin_amount {
                    return Err(ValidationErr(c, ErrorCode::AssertMyAmountFailed));
                }
            }
            Condition::AssertMyBirthSeconds(s) => {
                // two different birth assertions can never both hold
                if spend.birth_seconds.map(|v| v == s) == Some(false) {
                    return Err(ValidationErr(c, ErrorCode::AssertMyBirthSecondsFailed));
                }
                spend.birth_seconds = Some(s);
                assert_not_ephemeral(&mut spend, state, ret.spends.len());
            }
            Condition::AssertMyBirthHeight(h) => {
                if spend.birth_height.map(|v| v == h) == Some(false) {
                    return Err(ValidationErr(c, ErrorCode::AssertMyBirthHeightFailed));
                }
                spend.birth_height = Some(h);
                assert_not_ephemeral(&mut spend, state, ret.spends.len());
            }
            Condition::AssertEphemeral => {
                state.assert_ephemeral.insert(ret.spends.len());
            }
            Condition::AssertMyParentId(id) => {
                if a.atom(id).as_ref() != a.atom(spend.parent_id).as_ref() {
                    return Err(ValidationErr(c, ErrorCode::AssertMyParentIdFailed));
                }
            }
            Condition::AssertMyPuzzlehash(hash) => {
                if a.atom(hash).as_ref() != a.atom(spend.puzzle_hash).as_ref() {
                    return Err(ValidationErr(c, ErrorCode::AssertMyPuzzleHashFailed));
                }
            }
            Condition::CreateCoinAnnouncement(msg) => {
                decrement(&mut announce_countdown, msg)?;
                state.announce_coin.insert((spend.coin_id.clone(), msg));
            }
            Condition::CreatePuzzleAnnouncement(msg) => {
                decrement(&mut announce_countdown, msg)?;
                state.announce_puzzle.insert((spend.puzzle_hash, msg));
            }
            Condition::AssertCoinAnnouncement(msg) => {
                decrement(&mut announce_countdown, msg)?;
                state.assert_coin.insert(msg);
            }
            Condition::AssertPuzzleAnnouncement(msg) => {
                decrement(&mut announce_countdown, msg)?;
                state.assert_puzzle.insert(msg);
            }
            Condition::AssertConcurrentSpend(id) => {
                decrement(&mut announce_countdown, id)?;
                state.assert_concurrent_spend.insert(id);
            }
            Condition::AssertConcurrentPuzzle(id) => {
                decrement(&mut announce_countdown, id)?;
                state.assert_concurrent_puzzle.insert(id);
            }
            Condition::AggSigMe(pk, msg) => {
                spend.agg_sig_me.push((to_key(a, pk)?, msg));
                if (flags & DONT_VALIDATE_SIGNATURE) == 0 {
                    let mut msg = a.atom(msg).as_ref().to_vec();
                    msg.extend((*spend.coin_id).as_slice());
                    msg.extend(constants.agg_sig_me_additional_data.as_slice());
                    state.pkm_pairs.push((to_key(a, pk)?, msg.into()));
                }
            }
            Condition::AggSigParent(pk, msg) => {
                spend.agg_sig_parent.push((to_key(a, pk)?, msg));
                if (flags & DONT_VALIDATE_SIGNATURE) == 0 {
                    let mut msg = a.atom(msg).as_ref().to_vec();
                    msg.extend(a.atom(spend.parent_id).as_ref());
                    msg.extend(agg_sig_additional_data(constants, AGG_SIG_PARENT).as_slice());
                    state.pkm_pairs.push((to_key(a, pk)?, msg.into()));
                }
            }
            Condition::AggSigPuzzle(pk, msg) => {
                spend.agg_sig_puzzle.push((to_key(a, pk)?, msg));
                if (flags & DONT_VALIDATE_SIGNATURE) == 0 {
                    let mut msg = a.atom(msg).as_ref().to_vec();
                    msg.extend(a.atom(spend.puzzle_hash).as_ref());
                    msg.extend(agg_sig_additional_data(constants, AGG_SIG_PUZZLE).as_slice());
                    state.pkm_pairs.push((to_key(a, pk)?, msg.into()));
                }
            }
            Condition::AggSigAmount(pk, msg) => {
                spend.agg_sig_amount.push((to_key(a, pk)?, msg));
                if (flags & DONT_VALIDATE_SIGNATURE) == 0 {
                    let mut msg = a.atom(msg).as_ref().to_vec();
                    msg.extend(u64_to_bytes(spend.coin_amount).as_slice());
                    msg.extend(agg_sig_additional_data(constants, AGG_SIG_AMOUNT).as_slice());
                    state.pkm_pairs.push((to_key(a, pk)?, msg.into()));
                }
            }
            Condition::AggSigPuzzleAmount(pk, msg) => {
                spend.agg_sig_puzzle_amount.push((to_key(a, pk)?, msg));
                if (flags & DONT_VALIDATE_SIGNATURE) == 0 {
                    let mut msg = a.atom(msg).as_ref().to_vec();
                    msg.extend(a.atom(spend.puzzle_hash).as_ref());
                    msg.extend(u64_to_bytes(spend.coin_amount).as_slice());
                    msg.extend(
                        agg_sig_additional_data(constants, AGG_SIG_PUZZLE_AMOUNT).as_slice(),
                    );
                    state.pkm_pairs.push((to_key(a, pk)?, msg.into()));
                }
            }
            Condition::AggSigParentAmount(pk, msg) => {
                spend.agg_sig_parent_amount.push((to_key(a, pk)?, msg));
                if (flags & DONT_VALIDATE_SIGNATURE) == 0 {
                    let mut msg = a.atom(msg).as_ref().to_vec();
                    msg.extend(a.atom(spend.parent_id).as_ref());
                    msg.extend(u64_to_bytes(spend.coin_amount).as_slice());
                    msg.extend(
                        agg_sig_additional_data(constants, AGG_SIG_PARENT_AMOUNT).as_slice(),
                    );
                    state.pkm_pairs.push((to_key(a, pk)?, msg.into()));
                }
            }
            Condition::AggSigParentPuzzle(pk, msg) => {
                spend.agg_sig_parent_puzzle.push((to_key(a, pk)?, msg));
                if (flags & DONT_VALIDATE_SIGNATURE) == 0 {
                    let mut msg = a.atom(msg).as_ref().to_vec();
                    msg.extend(a.atom(spend.parent_id).as_ref());
                    msg.extend(a.atom(spend.puzzle_hash).as_ref());
                    msg.extend(
                        agg_sig_additional_data(constants, AGG_SIG_PARENT_PUZZLE).as_slice(),
                    );
                    state.pkm_pairs.push((to_key(a, pk)?, msg.into()));
                }
            }
            Condition::AggSigUnsafe(pk, msg) => {
                check_agg_sig_unsafe_message(a, msg, constants)?;
                ret.agg_sig_unsafe.push((to_key(a, pk)?, msg));
                if (flags & DONT_VALIDATE_SIGNATURE) == 0 {
                    state
                        .pkm_pairs
                        .push((to_key(a, pk)?, a.atom(msg).as_ref().to_vec().into()));
                }
            }
            Condition::Softfork(cost) => {
                if *max_cost < cost {
                    return Err(ValidationErr(c, ErrorCode::CostExceeded));
                }
                *max_cost -= cost;
            }
            Condition::SendMessage(src_mode, dst, msg) => {
                decrement(&mut announce_countdown, msg)?;
                let src = SpendId::from_self(
                    src_mode,
                    spend.parent_id,
                    spend.puzzle_hash,
                    spend.coin_amount,
                    &spend.coin_id,
                )?;
                state.messages.push(Message {
                    src,
                    dst,
                    msg,
                    counter: 1,
                });
            }
            Condition::ReceiveMessage(src, dst_mode, msg) => {
                decrement(&mut announce_countdown, msg)?;
                let dst = SpendId::from_self(
                    dst_mode,
                    spend.parent_id,
                    spend.puzzle_hash,
                    spend.coin_amount,
                    &spend.coin_id,
                )?;
                state.messages.push(Message {
                    src,
                    dst,
                    msg,
                    counter: -1,
                });
            }
            Condition::SkipRelativeCondition => {
                assert_not_ephemeral(&mut spend, state, ret.spends.len());
            }
            Condition::Skip => {}
        }
    }

    ret.spends.push(spend);
    Ok(())
}

fn is_ephemeral(
    a: &Allocator,
    spend_idx: usize,
    spent_ids: &HashMap<Arc<Bytes32>, usize>,
    spends: &[SpendConditions],
) -> bool {
    let spend = &spends[spend_idx];
    let Ok(parent_id) = Bytes32::try_from(a.atom(spend.parent_id).as_ref()) else {
        return false;
    };
    let Some(idx) = spent_ids.get(&parent_id) else {
        return false;
    };
    let Ok(puzzle_hash) = Bytes32::try_from(a.atom(spend.puzzle_hash).as_ref()) else {
        return false;
    };

    // look up the coin (puzzle hash, amount) in the parent's set of created
    // coins. The hint is not part of this lookup
    let parent_spend = &spends[*idx];
    parent_spend.create_coin.contains(&NewCoin {
        puzzle_hash,
        amount: spend.coin_amount,
        hint: NodePtr::NIL,
    })
}

/// Parse and validate a list of spends in the form described at the top of
/// this file, returning all spends along with their conditions, organized by
/// condition opcode.
pub fn parse_spends(
    a: &Allocator,
    spends: NodePtr,
    max_cost: Cost,
    flags: u32,
    aggregate_signature: &Signature,
    constants: &ConsensusConstants,
) -> Result<SpendBundleConditions, ValidationErr> {
    let mut ret = SpendBundleConditions::default();
    let mut state = ParseState::default();

    let mut cost_left = max_cost;

    let mut iter = spends;
    while let Some((spend, tail)) = next(a, iter)? {
        iter = tail;
        // cost_left is decremented by the cost of each condition, to fail as
        // early as possible when the limit is exceeded
        let (parent_id, puzzle_hash, amount, conds) = parse_single_spend(a, spend)?;

        process_single_spend(
            a,
            &mut ret,
            &mut state,
            parent_id,
            puzzle_hash,
            amount,
            conds,
            flags,
            &mut cost_left,
            constants,
        )?;
    }

    validate_conditions(a, &ret, &state, spends)?;
    validate_signature(&state, aggregate_signature, flags)?;
    ret.validated_signature = (flags & DONT_VALIDATE_SIGNATURE) == 0;

    ret.cost = max_cost - cost_left;
    Ok(ret)
}

pub fn validate_conditions(
    a: &Allocator,
    ret: &SpendBundleConditions,
    state: &ParseState,
    spends: NodePtr,
) -> Result<(), ValidationErr> {
    if ret.removal_amount < ret.addition_amount {
        // the sum of removal amounts must not be less than the sum of
        // addition amounts
        return Err(ValidationErr(spends, ErrorCode::MintingCoin));
    }

    if ret.removal_amount - ret.addition_amount < ret.reserve_fee as u128 {
        // the actual fee is lower than the reserved fee
        return Err(ValidationErr(spends, ErrorCode::ReserveFeeConditionFailed));
    }

    if let Some(bh) = ret.before_height_absolute {
        if bh <= ret.height_absolute {
            return Err(ValidationErr(
                spends,
                ErrorCode::ImpossibleHeightAbsoluteConstraints,
            ));
        }
    }

    if let Some(bs) = ret.before_seconds_absolute {
        if bs <= ret.seconds_absolute {
            return Err(ValidationErr(
                spends,
                ErrorCode::ImpossibleSecondsAbsoluteConstraints,
            ));
        }
    }

    for coin_id in &state.assert_concurrent_spend {
        let id = Bytes32::try_from(a.atom(*coin_id).as_ref())
            .map_err(|_| ValidationErr(*coin_id, ErrorCode::AssertConcurrentSpendFailed))?;
        if !state.spent_coins.contains_key(&id) {
            return Err(ValidationErr(
                *coin_id,
                ErrorCode::AssertConcurrentSpendFailed,
            ));
        }
    }

    if !state.assert_concurrent_puzzle.is_empty() {
        // expand all the spent puzzle hashes into a set for fast lookups
        let mut spent_phs = HashSet::<Vec<u8>>::new();
        for ph in &state.spent_puzzles {
            spent_phs.insert(a.atom(*ph).as_ref().to_vec());
        }

        for puzzle_assert in &state.assert_concurrent_puzzle {
            if !spent_phs.contains(a.atom(*puzzle_assert).as_ref()) {
                return Err(ValidationErr(
                    *puzzle_assert,
                    ErrorCode::AssertConcurrentPuzzleFailed,
                ));
            }
        }
    }

    // if there are no announcement asserts, there's no need to hash any of
    // the announcements
    if !state.assert_coin.is_empty() {
        let mut announcements = HashSet::<Bytes32>::new();

        for (coin_id, announce) in &state.announce_coin {
            let mut hasher = Sha256::new();
            hasher.update(coin_id.as_slice());
            hasher.update(a.atom(*announce).as_ref());
            let announcement_id: [u8; 32] = hasher.finalize().into();
            announcements.insert(announcement_id.into());
        }

        for coin_assert in &state.assert_coin {
            let id = Bytes32::try_from(a.atom(*coin_assert).as_ref())
                .map_err(|_| ValidationErr(*coin_assert, ErrorCode::AssertCoinAnnouncementFailed))?;
            if !announcements.contains(&id) {
                return Err(ValidationErr(
                    *coin_assert,
                    ErrorCode::AssertCoinAnnouncementFailed,
                ));
            }
        }
    }

    if !state.assert_puzzle.is_empty() {
        let mut announcements = HashSet::<Bytes32>::new();

        for (puzzle_hash, announce) in &state.announce_puzzle {
            let mut hasher = Sha256::new();
            hasher.update(a.atom(*puzzle_hash).as_ref());
            hasher.update(a.atom(*announce).as_ref());
            let announcement_id: [u8; 32] = hasher.finalize().into();
            announcements.insert(announcement_id.into());
        }

        for puzzle_assert in &state.assert_puzzle {
            let id = Bytes32::try_from(a.atom(*puzzle_assert).as_ref()).map_err(|_| {
                ValidationErr(*puzzle_assert, ErrorCode::AssertPuzzleAnnouncementFailed)
            })?;
            if !announcements.contains(&id) {
                return Err(ValidationErr(
                    *puzzle_assert,
                    ErrorCode::AssertPuzzleAnnouncementFailed,
                ));
            }
        }
    }

    for spend_idx in &state.assert_ephemeral {
        // the coin must have been created by another spend in this bundle
        if !is_ephemeral(a, *spend_idx, &state.spent_coins, &ret.spends) {
            return Err(ValidationErr(
                ret.spends[*spend_idx].parent_id,
                ErrorCode::AssertEphemeralFailed,
            ));
        }
    }

    for spend_idx in &state.assert_not_ephemeral {
        // relative conditions are not allowed on ephemeral spends
        if is_ephemeral(a, *spend_idx, &state.spent_coins, &ret.spends) {
            return Err(ValidationErr(
                ret.spends[*spend_idx].parent_id,
                ErrorCode::EphemeralRelativeCondition,
            ));
        }
    }

    if !state.messages.is_empty() {
        // the counters track sends minus receives per message key. All must
        // end at zero, otherwise some message was not sent or received the
        // right number of times
        let mut messages = HashMap::<Vec<u8>, i32>::new();

        for msg in &state.messages {
            *messages.entry(msg.make_key(a)).or_insert(0) += i32::from(msg.counter);
        }

        for count in messages.values() {
            if *count != 0 {
                return Err(ValidationErr(
                    NodePtr::NIL,
                    ErrorCode::MessageNotSentOrReceived,
                ));
            }
        }
    }

    Ok(())
}

pub fn validate_signature(
    state: &ParseState,
    signature: &Signature,
    flags: u32,
) -> Result<(), ValidationErr> {
    if (flags & DONT_VALIDATE_SIGNATURE) != 0 {
        return Ok(());
    }

    if !aggregate_verify(
        signature,
        state.pkm_pairs.iter().map(|(pk, msg)| (pk, msg.as_ref())),
    ) {
        return Err(ValidationErr(
            NodePtr::NIL,
            ErrorCode::BadAggregateSignature,
        ));
    }
    Ok(())
}
