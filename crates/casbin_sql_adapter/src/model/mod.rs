//! Persistence-side data model for stored policy rules.
//!
//! # Responsibility
//! - Define the flat `casbin_rule` row shape and its mapping to policy tuples.
//! - Define the two filter shapes used by filtered load and filtered delete.
//!
//! # Invariants
//! - Stored string columns are never null; an absent field is an empty string.
//! - Only `V0..V5` take part in matching; `V6`/`V7` exist for storage only.

pub mod filter;
pub mod rule;
