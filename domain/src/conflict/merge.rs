//! Conflict deduplication and merging

use super::entities::Conflict;

/// Add a candidate to an already-deduplicated list.
///
/// The candidate folds into the first conflict with the same identity, or is
/// appended when none matches.
pub fn merge_into(merged: &mut Vec<Conflict>, candidate: Conflict) {
    match merged.iter_mut().find(|c| c.same_identity(&candidate)) {
        Some(existing) => existing.absorb(candidate),
        None => merged.push(candidate),
    }
}

/// Merge AI conflicts into static ones.
///
/// Static conflicts keep their positions; AI-only conflicts are appended in
/// the order the model returned them.
pub fn merge_conflicts(static_conflicts: Vec<Conflict>, ai_conflicts: Vec<Conflict>) -> Vec<Conflict> {
    let mut merged = Vec::with_capacity(static_conflicts.len() + ai_conflicts.len());
    for conflict in static_conflicts.into_iter().chain(ai_conflicts) {
        merge_into(&mut merged, conflict);
    }
    merged
}
