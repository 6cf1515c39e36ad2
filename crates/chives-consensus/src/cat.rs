use crate::gen::validation_error::ErrorCode;
use chia_bls::PublicKey;
use chia_puzzles::{CAT_PUZZLE_HASH, EVERYTHING_WITH_SIGNATURE_HASH, GENESIS_BY_COIN_ID_HASH};
use chives_protocol::{Bytes32, Coin, LineageProof, Program};
use clvm_utils::{tree_hash_atom, tree_hash_pair, TreeHash};
use indexmap::IndexMap;

const OP_QUOTE: u8 = 1;
const OP_APPLY: u8 = 2;
const OP_CONS: u8 = 4;

// The tree hash of one level of currying: (c (q . arg) rest)
fn curry_single_arg(arg_hash: TreeHash, rest: TreeHash) -> TreeHash {
    tree_hash_pair(
        tree_hash_atom(&[OP_CONS]),
        tree_hash_pair(
            tree_hash_pair(tree_hash_atom(&[OP_QUOTE]), arg_hash),
            tree_hash_pair(rest, tree_hash_atom(&[])),
        ),
    )
}

// The tree hash of (a (q . mod) args), the shape produced by curry
fn curry_and_treehash(mod_hash: TreeHash, args_hash: TreeHash) -> TreeHash {
    tree_hash_pair(
        tree_hash_atom(&[OP_APPLY]),
        tree_hash_pair(
            tree_hash_pair(tree_hash_atom(&[OP_QUOTE]), mod_hash),
            tree_hash_pair(args_hash, tree_hash_atom(&[])),
        ),
    )
}

/// The full puzzle hash of a CAT coin: the CAT outer puzzle curried with
/// (mod hash, asset id, inner puzzle). Pure tree-hash math, the puzzles
/// themselves are never executed.
pub fn cat_puzzle_hash(asset_id: Bytes32, inner_puzzle_hash: Bytes32) -> Bytes32 {
    // curried arguments hash from the last argument outwards, ending in
    // the environment atom 1
    let args_hash = tree_hash_atom(&[1]);
    let args_hash = curry_single_arg(TreeHash::new(inner_puzzle_hash.into()), args_hash);
    let args_hash = curry_single_arg(tree_hash_atom(asset_id.as_slice()), args_hash);
    let args_hash = curry_single_arg(tree_hash_atom(&CAT_PUZZLE_HASH), args_hash);

    curry_and_treehash(TreeHash::new(CAT_PUZZLE_HASH), args_hash).to_bytes().into()
}

/// The asset id of a CAT issued with the genesis-by-coin-id TAIL, curried
/// with the coin id the asset may be minted from.
pub fn genesis_by_coin_id_tail_hash(genesis_coin_id: Bytes32) -> Bytes32 {
    let args_hash = tree_hash_atom(&[1]);
    let args_hash = curry_single_arg(tree_hash_atom(genesis_coin_id.as_slice()), args_hash);
    curry_and_treehash(TreeHash::new(GENESIS_BY_COIN_ID_HASH), args_hash)
        .to_bytes()
        .into()
}

/// The asset id of a CAT issued with the everything-with-signature TAIL,
/// curried with the authority public key.
pub fn everything_with_signature_tail_hash(public_key: &PublicKey) -> Bytes32 {
    let args_hash = tree_hash_atom(&[1]);
    let args_hash = curry_single_arg(tree_hash_atom(&public_key.to_bytes()), args_hash);
    curry_and_treehash(TreeHash::new(EVERYTHING_WITH_SIGNATURE_HASH), args_hash)
        .to_bytes()
        .into()
}

/// Everything known about one asset type. The lineage map is keyed by coin
/// name; a `None` value marks a mint, which has no parent proof. A coin
/// name absent from the map has never been validated for this asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatInfo {
    pub limitations_program_hash: Bytes32,
    pub tail: Option<Program>,
    pub lineage_proofs: IndexMap<Bytes32, Option<LineageProof>>,
}

impl CatInfo {
    pub fn new(limitations_program_hash: Bytes32, tail: Option<Program>) -> Self {
        Self {
            limitations_program_hash,
            tail,
            lineage_proofs: IndexMap::new(),
        }
    }
}

/// Chain-of-custody registry for CAT coins, one [`CatInfo`] per asset id.
/// Every admitted coin chains back, proof by proof, to a mint this tracker
/// accepted. Proofs are only ever stored here after validating, so lookup
/// of a parent is a plain map hit; the tracker never re-derives a missing
/// proof from chain history.
#[derive(Debug, Default, Clone)]
pub struct CatTracker {
    assets: IndexMap<Bytes32, CatInfo>,
}

impl CatTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_asset(&mut self, asset_id: Bytes32, tail: Option<Program>) {
        self.assets
            .entry(asset_id)
            .or_insert_with(|| CatInfo::new(asset_id, tail));
    }

    pub fn asset(&self, asset_id: &Bytes32) -> Option<&CatInfo> {
        self.assets.get(asset_id)
    }

    /// The lineage entry for a tracked coin, or `None` if the coin was
    /// never admitted under this asset id.
    pub fn lineage_proof(
        &self,
        asset_id: &Bytes32,
        coin_name: &Bytes32,
    ) -> Option<&Option<LineageProof>> {
        self.assets.get(asset_id)?.lineage_proofs.get(coin_name)
    }

    /// The proof a child of `coin` would present when it is spent.
    pub fn proof_for_child(coin: &Coin, inner_puzzle_hash: Bytes32) -> LineageProof {
        LineageProof::new(coin.parent_coin_info, inner_puzzle_hash, coin.amount)
    }

    /// Admit a CAT coin under `asset_id`.
    ///
    /// With a proof, the proof must reconstruct the coin's parent exactly
    /// (same asset wrapping, matching coin id) and the parent must already
    /// be tracked. Without a proof the coin claims to be a mint, which is
    /// only accepted when the asset id is the genesis-by-coin-id TAIL
    /// curried with the coin's parent, so the asset can only ever be minted
    /// by spending that one genesis coin.
    pub fn track_child(
        &mut self,
        asset_id: Bytes32,
        coin: &Coin,
        inner_puzzle_hash: Bytes32,
        proof: Option<LineageProof>,
    ) -> Result<(), ErrorCode> {
        if coin.puzzle_hash != cat_puzzle_hash(asset_id, inner_puzzle_hash) {
            return Err(ErrorCode::BadCatLineage);
        }
        let Some(info) = self.assets.get_mut(&asset_id) else {
            return Err(ErrorCode::BadCatLineage);
        };

        match proof {
            Some(proof) => {
                let parent = Coin::new(
                    proof.parent_parent_coin_info,
                    cat_puzzle_hash(asset_id, proof.parent_inner_puzzle_hash),
                    proof.parent_amount,
                );
                let parent_name = parent.coin_id();
                if parent_name != coin.parent_coin_info {
                    return Err(ErrorCode::BadCatLineage);
                }
                if !info.lineage_proofs.contains_key(&parent_name) {
                    return Err(ErrorCode::BadCatLineage);
                }
                info.lineage_proofs.insert(coin.coin_id(), Some(proof));
            }
            None => {
                if genesis_by_coin_id_tail_hash(coin.parent_coin_info) != asset_id {
                    return Err(ErrorCode::MintingCoin);
                }
                info.lineage_proofs.insert(coin.coin_id(), None);
            }
        }
        Ok(())
    }
}
