//! Installation order

use crate::conflict::Conflict;
use crate::core::error::DomainError;
use crate::discovery::AnalyzedTool;
use crate::pattern::ConflictKind;
use std::collections::{BTreeMap, BTreeSet};

/// Recommend an order to install the analyzed tools.
///
/// Tools without conflicts come first, in key order. Conflicting tools
/// follow, topologically sorted by the preference edges of
/// functionality-overlap conflicts (foundational tool first). Ties go to the
/// lexically smallest key; a cycle is broken the same way.
pub fn installation_order(
    roster: &[AnalyzedTool],
    conflicts: &[Conflict],
) -> Result<Vec<String>, DomainError> {
    if roster.is_empty() {
        return Err(DomainError::EmptyToolSet);
    }

    let keys: BTreeSet<&str> = roster.iter().map(|t| t.tool_key.as_str()).collect();
    let conflicting: BTreeSet<&str> = conflicts
        .iter()
        .flat_map(|c| c.tools.iter().map(String::as_str))
        .filter(|key| keys.contains(key))
        .collect();

    // successor -> set of predecessors
    let mut preds: BTreeMap<&str, BTreeSet<&str>> =
        conflicting.iter().map(|key| (*key, BTreeSet::new())).collect();
    for conflict in conflicts
        .iter()
        .filter(|c| c.kind == ConflictKind::FunctionalityOverlap)
    {
        let chain: Vec<&str> = conflict
            .preference
            .iter()
            .map(String::as_str)
            .filter(|key| conflicting.contains(key))
            .collect();
        for (i, before) in chain.iter().enumerate() {
            for after in &chain[i + 1..] {
                if before != after
                    && let Some(set) = preds.get_mut(after)
                {
                    set.insert(*before);
                }
            }
        }
    }

    let mut order: Vec<String> = keys
        .iter()
        .filter(|key| !conflicting.contains(*key))
        .map(|key| key.to_string())
        .collect();

    while !preds.is_empty() {
        let next = preds
            .iter()
            .find(|(_, before)| before.is_empty())
            .map(|(key, _)| *key)
            .or_else(|| preds.keys().next().copied());
        let Some(next) = next else { break };

        preds.remove(next);
        for before in preds.values_mut() {
            before.remove(next);
        }
        order.push(next.to_string());
    }

    Ok(order)
}
