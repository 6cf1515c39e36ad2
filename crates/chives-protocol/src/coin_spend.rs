use crate::{Coin, Program};
use chives_streamable_macro::Streamable;

/// One spent coin together with the puzzle reveal and the solution passed
/// to it.
#[derive(Streamable, Hash, Debug, Clone, Eq, PartialEq)]
pub struct CoinSpend {
    pub coin: Coin,
    pub puzzle_reveal: Program,
    pub solution: Program,
}

impl CoinSpend {
    pub fn new(coin: Coin, puzzle_reveal: Program, solution: Program) -> Self {
        CoinSpend {
            coin,
            puzzle_reveal,
            solution,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chives_traits::Streamable;
    use hex_literal::hex;

    #[test]
    fn streaming() {
        let cs = CoinSpend::new(
            Coin::new([1; 32].into(), [2; 32].into(), 3),
            Program::from(&hex!("ff0101")[..]),
            Program::from(&hex!("80")[..]),
        );
        let bytes = cs.to_bytes().unwrap();
        assert_eq!(CoinSpend::from_bytes(&bytes).unwrap(), cs);
    }
}
