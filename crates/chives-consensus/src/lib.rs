pub mod cat;
pub mod check_time_locks;
pub mod coin_store;
pub mod consensus_constants;
pub mod gen;
pub mod make_aggsig_final_message;
pub mod mempool;
pub mod owned_conditions;
pub mod spendbundle_conditions;
pub mod spendbundle_validation;
