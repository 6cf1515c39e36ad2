pub mod condition_sanitizers;
pub mod conditions;
pub mod flags;
pub mod messages;
pub mod opcodes;
pub mod sanitize_int;
pub mod validation_error;
