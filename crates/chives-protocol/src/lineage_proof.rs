use crate::Bytes32;
use chives_streamable_macro::Streamable;

/// Proof that the parent of a CAT coin was itself a CAT of the same asset.
/// The parent's full puzzle hash is reconstructed by wrapping
/// `parent_inner_puzzle_hash` in the CAT outer puzzle, and the resulting
/// coin id must match the child's `parent_coin_info`.
#[derive(Streamable, Hash, Debug, Copy, Clone, Eq, PartialEq)]
pub struct LineageProof {
    pub parent_parent_coin_info: Bytes32,
    pub parent_inner_puzzle_hash: Bytes32,
    pub parent_amount: u64,
}

impl LineageProof {
    pub fn new(
        parent_parent_coin_info: Bytes32,
        parent_inner_puzzle_hash: Bytes32,
        parent_amount: u64,
    ) -> Self {
        LineageProof {
            parent_parent_coin_info,
            parent_inner_puzzle_hash,
            parent_amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chives_traits::Streamable;

    #[test]
    fn fixed_width_encoding() {
        let proof = LineageProof::new([1; 32].into(), [2; 32].into(), 1000);
        let bytes = proof.to_bytes().unwrap();
        assert_eq!(bytes.len(), 32 + 32 + 8);
        assert_eq!(LineageProof::from_bytes(&bytes).unwrap(), proof);
    }
}
