use super::validation_error::{atom, ErrorCode, ValidationErr};
use clvmr::allocator::{Allocator, NodePtr};
use clvmr::op_utils::u64_from_bytes;

#[derive(PartialEq, Eq, Debug)]
pub enum SanitizedUint {
    Ok(u64),
    PositiveOverflow,
    NegativeOverflow,
}

/// Interpret an atom as an unsigned integer of at most `max_size` bytes.
/// Redundant leading zero bytes are a hard failure with the given error
/// code; values out of range are reported as overflows so the caller can
/// decide whether the condition is impossible or just invalid.
pub fn sanitize_uint(
    a: &Allocator,
    n: NodePtr,
    max_size: usize,
    code: ErrorCode,
) -> Result<SanitizedUint, ValidationErr> {
    assert!(max_size <= 8);

    let buf = atom(a, n, code)?;
    let buf = buf.as_ref();

    if buf.is_empty() {
        return Ok(SanitizedUint::Ok(0));
    }

    // the top bit set means a negative number
    if (buf[0] & 0x80) != 0 {
        return Ok(SanitizedUint::NegativeOverflow);
    }

    // a leading zero is only allowed when it prevents the value from being
    // interpreted as negative. Zero itself must be the empty atom
    if buf == [0_u8] || (buf.len() > 1 && buf[0] == 0 && (buf[1] & 0x80) == 0) {
        return Err(ValidationErr(n, code));
    }

    let size_limit = if buf[0] == 0 { max_size + 1 } else { max_size };
    if buf.len() > size_limit {
        return Ok(SanitizedUint::PositiveOverflow);
    }

    Ok(SanitizedUint::Ok(u64_from_bytes(buf)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const E: ErrorCode = ErrorCode::InvalidCoinAmount;

    fn node(a: &mut Allocator, buf: &[u8]) -> NodePtr {
        a.new_atom(buf).unwrap()
    }

    #[test]
    fn empty_atom_is_zero() {
        let mut a = Allocator::new();
        let n = node(&mut a, &[]);
        assert_eq!(sanitize_uint(&a, n, 8, E), Ok(SanitizedUint::Ok(0)));
    }

    #[test]
    fn negative_values_overflow() {
        let mut a = Allocator::new();
        let n = node(&mut a, &[0xff; 8]);
        assert_eq!(
            sanitize_uint(&a, n, 8, E),
            Ok(SanitizedUint::NegativeOverflow)
        );
    }

    #[test]
    fn redundant_leading_zeros() {
        let mut a = Allocator::new();
        // zero must be the empty atom
        let n = node(&mut a, &[0]);
        assert_eq!(sanitize_uint(&a, n, 8, E), Err(ValidationErr(n, E)));
        // 0x7f does not need the zero prefix
        let n = node(&mut a, &[0, 0x7f]);
        assert_eq!(sanitize_uint(&a, n, 8, E), Err(ValidationErr(n, E)));
        // 0x80 does
        let n = node(&mut a, &[0, 0x80]);
        assert_eq!(sanitize_uint(&a, n, 8, E), Ok(SanitizedUint::Ok(0x80)));
    }

    #[test]
    fn size_limits() {
        let mut a = Allocator::new();
        let n = node(&mut a, &[0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(
            sanitize_uint(&a, n, 8, E),
            Ok(SanitizedUint::Ok(0x7fff_ffff_ffff_ffff))
        );
        // nine payload bytes exceed the maximum
        let n = node(&mut a, &[0x01, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(
            sanitize_uint(&a, n, 8, E),
            Ok(SanitizedUint::PositiveOverflow)
        );
        // a leading zero byte followed by 8 payload bytes is still in range
        let n = node(&mut a, &[0, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);
        assert_eq!(sanitize_uint(&a, n, 8, E), Ok(SanitizedUint::Ok(u64::MAX)));
    }

    #[test]
    fn pairs_are_rejected() {
        let mut a = Allocator::new();
        let n1 = node(&mut a, &[1]);
        let p = a.new_pair(n1, n1).unwrap();
        assert_eq!(sanitize_uint(&a, p, 8, E), Err(ValidationErr(p, E)));
    }
}
