mod bls;
mod chives_error;
mod streamable;

pub use chives_error::{Error, Result};
pub use streamable::{read_bytes, Streamable};
