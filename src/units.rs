//! User-facing unit conversions. The base unit of the chain is the mojo;
//! only user interfaces should deal in chives or colouredcoin.

use thiserror::Error;

/// Number of mojos in one chives (XCC).
pub const MOJO_PER_CHIVES: u64 = 100_000_000;

/// Number of mojos in one colouredcoin (CAT unit).
pub const MOJO_PER_COLOUREDCOIN: u64 = 100_000;

/// Parsing failures for decimal amount strings.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountError {
    #[error("not a decimal number")]
    Malformed,
    #[error("more fractional digits than the unit can represent")]
    TooPrecise,
    #[error("amount out of range")]
    Overflow,
}

/// Convert a decimal amount string (e.g. "2.5") into mojos, for a unit with
/// the given number of mojos per whole unit. Integer arithmetic only; an
/// amount that cannot be represented exactly is rejected rather than
/// rounded.
pub fn parse_amount(s: &str, mojo_per_unit: u64) -> Result<u64, AmountError> {
    let (whole, frac) = match s.split_once('.') {
        Some((w, f)) => (w, f),
        None => (s, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return Err(AmountError::Malformed);
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AmountError::Malformed);
    }

    let whole_mojos = if whole.is_empty() {
        0
    } else {
        whole
            .parse::<u64>()
            .map_err(|_| AmountError::Overflow)?
            .checked_mul(mojo_per_unit)
            .ok_or(AmountError::Overflow)?
    };

    // scale the fractional digits up to one whole unit, rejecting digits
    // below the mojo
    let mut frac_mojos = 0_u64;
    let mut place = mojo_per_unit;
    for b in frac.bytes() {
        if place % 10 != 0 {
            if b != b'0' {
                return Err(AmountError::TooPrecise);
            }
            continue;
        }
        place /= 10;
        frac_mojos += u64::from(b - b'0') * place;
    }

    whole_mojos
        .checked_add(frac_mojos)
        .ok_or(AmountError::Overflow)
}

/// Parse a chives (XCC) amount into mojos.
pub fn chives_to_mojo(s: &str) -> Result<u64, AmountError> {
    parse_amount(s, MOJO_PER_CHIVES)
}

/// Parse a colouredcoin amount into mojos.
pub fn colouredcoin_to_mojo(s: &str) -> Result<u64, AmountError> {
    parse_amount(s, MOJO_PER_COLOUREDCOIN)
}
