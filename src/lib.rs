//! Meta-crate re-exporting the Chives coin-set primitives and the
//! spend bundle validation pipeline.

pub use chives_consensus as consensus;
pub use chives_protocol as protocol;
pub use chives_traits as traits;

pub mod units;
