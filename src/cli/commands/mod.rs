//! CLI command implementations.

pub mod indicator;
pub mod run;
pub mod strategies;
pub mod validate;
