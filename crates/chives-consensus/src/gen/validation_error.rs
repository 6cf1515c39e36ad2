use clvmr::allocator::{Allocator, NodePtr, SExp};
use clvmr::reduction::EvalErr;
use thiserror::Error;

/// Reasons a spend bundle (or one of its conditions) is rejected. The
/// numeric codes (see `From<ErrorCode> for u32`) are part of the wallet
/// protocol and must stay stable.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    #[default]
    Unknown,
    DuplicateOutput,
    DoubleSpend,
    UnknownUnspent,
    BadAggregateSignature,
    InvalidCondition,
    InvalidConditionOpcode,
    InvalidParentId,
    InvalidPuzzleHash,
    InvalidPublicKey,
    InvalidMessage,
    InvalidCoinAmount,
    InvalidCoinAnnouncement,
    InvalidPuzzleAnnouncement,
    AssertMyCoinIdFailed,
    AssertPuzzleAnnouncementFailed,
    AssertCoinAnnouncementFailed,
    AssertHeightRelativeFailed,
    AssertHeightAbsoluteFailed,
    AssertSecondsAbsoluteFailed,
    CoinAmountExceedsMaximum,
    InvalidFeeLowFee,
    MempoolConflict,
    MintingCoin,
    CostExceeded,
    TimestampTooFarInFuture,
    ReserveFeeConditionFailed,
    AssertSecondsRelativeFailed,
    AssertMyParentIdFailed,
    AssertMyPuzzleHashFailed,
    AssertMyAmountFailed,
    GeneratorRuntimeError,
    CoinAmountNegative,
    InvalidSpendBundle,
    AssertBeforeSecondsAbsoluteFailed,
    AssertBeforeSecondsRelativeFailed,
    AssertBeforeHeightAbsoluteFailed,
    AssertBeforeHeightRelativeFailed,
    AssertConcurrentSpendFailed,
    AssertConcurrentPuzzleFailed,
    ImpossibleSecondsRelativeConstraints,
    ImpossibleSecondsAbsoluteConstraints,
    ImpossibleHeightRelativeConstraints,
    ImpossibleHeightAbsoluteConstraints,
    AssertMyBirthSecondsFailed,
    AssertMyBirthHeightFailed,
    AssertEphemeralFailed,
    EphemeralRelativeCondition,
    InvalidSoftforkCondition,
    InvalidSoftforkCost,
    TooManyAnnouncements,
    InvalidMessageMode,
    InvalidCoinId,
    MessageNotSentOrReceived,
    BadCatLineage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("validation error: {1:?}")]
pub struct ValidationErr(pub NodePtr, pub ErrorCode);

impl From<EvalErr> for ValidationErr {
    fn from(v: EvalErr) -> Self {
        if v.1 == "cost exceeded" {
            ValidationErr(v.0, ErrorCode::CostExceeded)
        } else {
            ValidationErr(v.0, ErrorCode::GeneratorRuntimeError)
        }
    }
}

impl From<std::io::Error> for ValidationErr {
    fn from(_: std::io::Error) -> Self {
        ValidationErr(NodePtr::NIL, ErrorCode::GeneratorRuntimeError)
    }
}

// numeric codes from chives/util/errors.py
impl From<ErrorCode> for u32 {
    fn from(err: ErrorCode) -> u32 {
        match err {
            ErrorCode::Unknown => 1,
            ErrorCode::DuplicateOutput => 4,
            ErrorCode::DoubleSpend => 5,
            ErrorCode::UnknownUnspent => 6,
            ErrorCode::BadAggregateSignature => 7,
            ErrorCode::InvalidCondition
            | ErrorCode::InvalidConditionOpcode
            | ErrorCode::InvalidParentId
            | ErrorCode::InvalidPuzzleHash
            | ErrorCode::InvalidPublicKey
            | ErrorCode::InvalidMessage
            | ErrorCode::InvalidCoinAmount
            | ErrorCode::InvalidCoinAnnouncement
            | ErrorCode::InvalidPuzzleAnnouncement => 10,
            ErrorCode::AssertMyCoinIdFailed => 11,
            ErrorCode::AssertPuzzleAnnouncementFailed | ErrorCode::AssertCoinAnnouncementFailed => {
                12
            }
            ErrorCode::AssertHeightRelativeFailed => 13,
            ErrorCode::AssertHeightAbsoluteFailed => 14,
            ErrorCode::AssertSecondsAbsoluteFailed => 15,
            ErrorCode::CoinAmountExceedsMaximum => 16,
            ErrorCode::InvalidFeeLowFee => 18,
            ErrorCode::MempoolConflict => 19,
            ErrorCode::MintingCoin => 20,
            ErrorCode::CostExceeded => 23,
            ErrorCode::TimestampTooFarInFuture => 26,
            ErrorCode::ReserveFeeConditionFailed => 48,
            ErrorCode::AssertSecondsRelativeFailed => 105,
            ErrorCode::AssertMyParentIdFailed => 114,
            ErrorCode::AssertMyPuzzleHashFailed => 115,
            ErrorCode::AssertMyAmountFailed => 116,
            ErrorCode::GeneratorRuntimeError => 117,
            ErrorCode::CoinAmountNegative => 124,
            ErrorCode::InvalidSpendBundle => 126,
            ErrorCode::AssertBeforeSecondsAbsoluteFailed => 128,
            ErrorCode::AssertBeforeSecondsRelativeFailed => 129,
            ErrorCode::AssertBeforeHeightAbsoluteFailed => 130,
            ErrorCode::AssertBeforeHeightRelativeFailed => 131,
            ErrorCode::AssertConcurrentSpendFailed => 132,
            ErrorCode::AssertConcurrentPuzzleFailed => 133,
            ErrorCode::ImpossibleSecondsRelativeConstraints => 134,
            ErrorCode::ImpossibleSecondsAbsoluteConstraints => 135,
            ErrorCode::ImpossibleHeightRelativeConstraints => 136,
            ErrorCode::ImpossibleHeightAbsoluteConstraints => 137,
            ErrorCode::AssertMyBirthSecondsFailed => 138,
            ErrorCode::AssertMyBirthHeightFailed => 139,
            ErrorCode::AssertEphemeralFailed => 140,
            ErrorCode::EphemeralRelativeCondition => 141,
            ErrorCode::InvalidSoftforkCondition => 142,
            ErrorCode::InvalidSoftforkCost => 143,
            ErrorCode::TooManyAnnouncements => 144,
            ErrorCode::InvalidMessageMode => 145,
            ErrorCode::InvalidCoinId => 146,
            ErrorCode::MessageNotSentOrReceived => 147,
            ErrorCode::BadCatLineage => 148,
        }
    }
}

// helper functions that fail with ValidationErr
pub fn first(a: &Allocator, n: NodePtr) -> Result<NodePtr, ValidationErr> {
    match a.sexp(n) {
        SExp::Pair(left, _) => Ok(left),
        SExp::Atom => Err(ValidationErr(n, ErrorCode::InvalidCondition)),
    }
}

pub fn rest(a: &Allocator, n: NodePtr) -> Result<NodePtr, ValidationErr> {
    match a.sexp(n) {
        SExp::Pair(_, right) => Ok(right),
        SExp::Atom => Err(ValidationErr(n, ErrorCode::InvalidCondition)),
    }
}

/// Advance a proper list by one element. `None` at the nil terminator; a
/// non-empty atom terminator is malformed.
pub fn next(a: &Allocator, n: NodePtr) -> Result<Option<(NodePtr, NodePtr)>, ValidationErr> {
    match a.sexp(n) {
        SExp::Pair(left, right) => Ok(Some((left, right))),
        SExp::Atom => {
            if a.atom_len(n) == 0 {
                Ok(None)
            } else {
                Err(ValidationErr(n, ErrorCode::InvalidCondition))
            }
        }
    }
}

pub fn atom(a: &Allocator, n: NodePtr, code: ErrorCode) -> Result<clvmr::allocator::Atom<'_>, ValidationErr> {
    match a.sexp(n) {
        SExp::Atom => Ok(a.atom(n)),
        SExp::Pair(..) => Err(ValidationErr(n, code)),
    }
}

pub fn check_nil(a: &Allocator, n: NodePtr) -> Result<(), ValidationErr> {
    if atom(a, n, ErrorCode::InvalidCondition)?.as_ref().is_empty() {
        Ok(())
    } else {
        Err(ValidationErr(n, ErrorCode::InvalidCondition))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_helpers() {
        let mut a = Allocator::new();
        let item = a.new_atom(&[1, 2, 3]).unwrap();
        let list = a.new_pair(item, NodePtr::NIL).unwrap();

        assert_eq!(first(&a, list).unwrap(), item);
        assert_eq!(rest(&a, list).unwrap(), NodePtr::NIL);
        assert_eq!(next(&a, list).unwrap(), Some((item, NodePtr::NIL)));
        assert_eq!(next(&a, NodePtr::NIL).unwrap(), None);

        // a non-nil atom is not a valid terminator
        assert_eq!(
            next(&a, item).unwrap_err(),
            ValidationErr(item, ErrorCode::InvalidCondition)
        );
        assert_eq!(
            first(&a, item).unwrap_err(),
            ValidationErr(item, ErrorCode::InvalidCondition)
        );
    }

    #[test]
    fn nil_checks() {
        let mut a = Allocator::new();
        let item = a.new_atom(&[1]).unwrap();
        assert!(check_nil(&a, NodePtr::NIL).is_ok());
        assert!(check_nil(&a, item).is_err());
    }

    #[test]
    fn stable_numeric_codes() {
        assert_eq!(u32::from(ErrorCode::DoubleSpend), 5);
        assert_eq!(u32::from(ErrorCode::UnknownUnspent), 6);
        assert_eq!(u32::from(ErrorCode::BadAggregateSignature), 7);
        assert_eq!(u32::from(ErrorCode::MintingCoin), 20);
        assert_eq!(u32::from(ErrorCode::CostExceeded), 23);
        assert_eq!(u32::from(ErrorCode::ReserveFeeConditionFailed), 48);
        assert_eq!(u32::from(ErrorCode::GeneratorRuntimeError), 117);
    }
}
