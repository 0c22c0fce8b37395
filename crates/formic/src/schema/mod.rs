//! Schema building: declarative rule registration against the model shape

pub mod builder;
pub mod dynamic;
pub(crate) mod rules;

pub use builder::{ElementSchema, RuleGroup, Schema};
