//! Conflict ranking

use crate::conflict::Conflict;
use crate::discovery::AnalyzedTool;
use std::cmp::Ordering;

/// Position of the earliest-declared tool a conflict involves
fn first_declared(conflict: &Conflict, roster: &[AnalyzedTool]) -> usize {
    conflict
        .tools
        .iter()
        .filter_map(|key| roster.iter().position(|t| &t.tool_key == key))
        .min()
        .unwrap_or(usize::MAX)
}

/// Order conflicts for presentation.
///
/// Severity descending, then confidence descending, then the declaration
/// position of the earliest involved tool. Kind and tool keys break any
/// remaining tie so the order is total.
pub fn rank_conflicts(mut conflicts: Vec<Conflict>, roster: &[AnalyzedTool]) -> Vec<Conflict> {
    conflicts.sort_by(|a, b| compare(a, b, roster));
    conflicts
}

fn compare(a: &Conflict, b: &Conflict, roster: &[AnalyzedTool]) -> Ordering {
    b.severity
        .cmp(&a.severity)
        .then_with(|| b.confidence.total_cmp(&a.confidence))
        .then_with(|| first_declared(a, roster).cmp(&first_declared(b, roster)))
        .then_with(|| a.kind.cmp(&b.kind))
        .then_with(|| a.tools.cmp(&b.tools))
}
