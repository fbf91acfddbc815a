//! Conflicts: the entity, merge/dedup, and the static rule engine.

pub mod entities;
pub mod merge;
pub mod rules;

pub use entities::{CORROBORATION_BONUS, Conflict, ConflictSource};
pub use merge::{merge_conflicts, merge_into};
pub use rules::StaticRuleEngine;
