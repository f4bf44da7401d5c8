//! Policy engine collaborator types.
//!
//! # Responsibility
//! - Model the engine's in-memory rule store and its line parser.
//! - Define the adapter contract the engine drives.
//!
//! # Invariants
//! - Adapters only append to a model on load and only read it on save.

pub mod adapter;
pub mod line;
pub mod model;
