use super::sanitize_int::{sanitize_uint, SanitizedUint};
use super::validation_error::{atom, ErrorCode, ValidationErr};
use clvmr::allocator::{Allocator, NodePtr};

pub fn sanitize_hash(
    a: &Allocator,
    n: NodePtr,
    size: usize,
    code: ErrorCode,
) -> Result<NodePtr, ValidationErr> {
    let buf = atom(a, n, code)?;
    if buf.as_ref().len() == size {
        Ok(n)
    } else {
        Err(ValidationErr(n, code))
    }
}

/// Coin amounts must fit in 64 bits and may not be negative.
pub fn parse_amount(a: &Allocator, n: NodePtr, code: ErrorCode) -> Result<u64, ValidationErr> {
    match sanitize_uint(a, n, 8, code)? {
        SanitizedUint::NegativeOverflow | SanitizedUint::PositiveOverflow => {
            Err(ValidationErr(n, code))
        }
        SanitizedUint::Ok(r) => Ok(r),
    }
}

/// Announcement messages are limited to 1024 bytes.
pub fn sanitize_announce_msg(
    a: &Allocator,
    n: NodePtr,
    code: ErrorCode,
) -> Result<NodePtr, ValidationErr> {
    let buf = atom(a, n, code)?;
    if buf.as_ref().len() > 1024 {
        Err(ValidationErr(n, code))
    } else {
        Ok(n)
    }
}

/// SEND_MESSAGE/RECEIVE_MESSAGE modes commit to properties of the sender
/// (high three bits) and receiver (low three bits).
pub fn sanitize_message_mode(a: &Allocator, node: NodePtr) -> Result<u32, ValidationErr> {
    let Some(mode) = a.small_number(node) else {
        return Err(ValidationErr(node, ErrorCode::InvalidMessageMode));
    };
    if (mode & !0b11_1111) != 0 {
        return Err(ValidationErr(node, ErrorCode::InvalidMessageMode));
    }
    Ok(mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(31, false)]
    #[case(32, true)]
    #[case(33, false)]
    #[case(0, false)]
    fn test_sanitize_hash(#[case] len: usize, #[case] pass: bool) {
        let mut a = Allocator::new();
        let n = a.new_atom(&vec![0x55; len]).unwrap();
        let ret = sanitize_hash(&a, n, 32, ErrorCode::InvalidPuzzleHash);
        if pass {
            assert_eq!(ret, Ok(n));
        } else {
            assert_eq!(ret, Err(ValidationErr(n, ErrorCode::InvalidPuzzleHash)));
        }
    }

    #[test]
    fn test_sanitize_hash_on_pair() {
        let mut a = Allocator::new();
        let n = a.new_atom(&[0x55; 32]).unwrap();
        let p = a.new_pair(n, n).unwrap();
        assert_eq!(
            sanitize_hash(&a, p, 32, ErrorCode::InvalidPuzzleHash),
            Err(ValidationErr(p, ErrorCode::InvalidPuzzleHash))
        );
    }

    #[rstest]
    #[case(&[], Some(0))]
    #[case(&[1], Some(1))]
    #[case(&[0x7f, 0xff], Some(0x7fff))]
    #[case(&[0xff], None)]
    #[case(&[1, 0, 0, 0, 0, 0, 0, 0, 0], None)]
    fn test_parse_amount(#[case] buf: &[u8], #[case] expect: Option<u64>) {
        let mut a = Allocator::new();
        let n = a.new_atom(buf).unwrap();
        let ret = parse_amount(&a, n, ErrorCode::InvalidCoinAmount);
        match expect {
            Some(v) => assert_eq!(ret, Ok(v)),
            None => assert_eq!(ret, Err(ValidationErr(n, ErrorCode::InvalidCoinAmount))),
        }
    }

    #[rstest]
    #[case(1023, true)]
    #[case(1024, true)]
    #[case(1025, false)]
    fn test_sanitize_announce_msg(#[case] len: usize, #[case] pass: bool) {
        let mut a = Allocator::new();
        let n = a.new_atom(&vec![0xaa; len]).unwrap();
        let ret = sanitize_announce_msg(&a, n, ErrorCode::InvalidCoinAnnouncement);
        if pass {
            assert_eq!(ret, Ok(n));
        } else {
            assert_eq!(
                ret,
                Err(ValidationErr(n, ErrorCode::InvalidCoinAnnouncement))
            );
        }
    }

    #[rstest]
    #[case(0, true)]
    #[case(-1, false)]
    #[case(0b11_1111, true)]
    #[case(0b100_1001, false)]
    #[case(0b10_0111, true)]
    #[case(10_000_000_000, false)]
    fn test_sanitize_message_mode(#[case] value: i64, #[case] pass: bool) {
        let mut a = Allocator::new();
        let node = a.new_number(value.into()).unwrap();
        let ret = sanitize_message_mode(&a, node);
        if pass {
            assert_eq!(i64::from(ret.unwrap()), value);
        } else {
            assert_eq!(ret.unwrap_err().1, ErrorCode::InvalidMessageMode);
        }
    }
}
