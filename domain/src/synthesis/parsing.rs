//! Defensive parsing of model output into conflicts and commentary
//!
//! The only place that interprets free-form text. Anything that does not fit
//! is dropped rather than reported as an error.

use crate::conflict::{Conflict, ConflictSource};
use crate::discovery::AnalyzedTool;
use crate::pattern::{ConflictKind, Severity};
use crate::report::{CompatibleCombination, ModelInsights};
use crate::util::normalize_key;
use serde_json::Value;

/// Confidence when the model does not report one
pub const DEFAULT_AI_CONFIDENCE: f64 = 0.5;

/// Map a self-reported confidence label or number onto [0, 1]
pub fn confidence_from_value(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(|v| v.clamp(0.0, 1.0))
            .unwrap_or(DEFAULT_AI_CONFIDENCE),
        Some(Value::String(label)) => match label.trim().to_lowercase().as_str() {
            "high" => 0.85,
            "medium" => 0.65,
            "low" => 0.4,
            other => other
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(DEFAULT_AI_CONFIDENCE),
        },
        _ => DEFAULT_AI_CONFIDENCE,
    }
}

/// Recover a JSON value from a response that may wrap it in prose or fences
fn extract_json(response: &str) -> Option<Value> {
    let trimmed = response.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let Some(start) = trimmed.find(open)
            && let Some(end) = trimmed.rfind(close)
            && end > start
            && let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end])
        {
            return Some(value);
        }
    }
    None
}

/// Resolve a model-supplied name to an analyzed tool key
fn resolve_tool<'a>(name: &str, roster: &'a [AnalyzedTool]) -> Option<&'a str> {
    let wanted = normalize_key(name);
    roster
        .iter()
        .find(|t| normalize_key(&t.tool_key) == wanted || normalize_key(&t.display_name) == wanted)
        .map(|t| t.tool_key.as_str())
}

fn string_field<'v>(entry: &'v Value, names: &[&str]) -> Option<&'v str> {
    names
        .iter()
        .find_map(|name| entry.get(*name).and_then(Value::as_str))
}

fn parse_entry(entry: &Value, roster: &[AnalyzedTool]) -> Option<Conflict> {
    let kind: ConflictKind = string_field(entry, &["type", "kind"])?.parse().ok()?;

    let names = entry
        .get("tools_involved")
        .or_else(|| entry.get("tools"))
        .and_then(Value::as_array)?;
    let mut tools: Vec<String> = Vec::new();
    for name in names.iter().filter_map(Value::as_str) {
        if let Some(key) = resolve_tool(name, roster)
            && !tools.iter().any(|t| t == key)
        {
            tools.push(key.to_string());
        }
    }
    if tools.len() < 2 {
        return None;
    }

    let severity = string_field(entry, &["severity"])
        .and_then(|s| s.parse::<Severity>().ok())
        .unwrap_or_default();
    let confidence = confidence_from_value(entry.get("confidence"));

    let mut description = string_field(entry, &["description"]).unwrap_or_default().to_string();
    if let Some(issues) = string_field(entry, &["potential_issues"])
        && !issues.trim().is_empty()
    {
        if description.is_empty() {
            description = issues.to_string();
        } else {
            description = format!("{} {}", description, issues);
        }
    }
    let mitigation = string_field(entry, &["mitigation"]).unwrap_or_default();

    Conflict::new(
        kind,
        tools,
        severity,
        confidence,
        description,
        mitigation,
        ConflictSource::AiAnalysis,
    )
    .ok()
}

/// Parse model output into AI-sourced conflicts.
///
/// Accepts an object with a `conflicts` array, a bare array, or either
/// wrapped in prose or a fenced block. Entries with an unknown kind or fewer
/// than two known tools are dropped. Returns `None` when no usable JSON can
/// be recovered at all.
pub fn parse_model_conflicts(response: &str, roster: &[AnalyzedTool]) -> Option<Vec<Conflict>> {
    let value = extract_json(response)?;
    let entries = match &value {
        Value::Array(items) => items,
        Value::Object(map) => map.get("conflicts")?.as_array()?,
        _ => return None,
    };
    Some(
        entries
            .iter()
            .filter_map(|entry| parse_entry(entry, roster))
            .collect(),
    )
}

fn parse_combination(entry: &Value, roster: &[AnalyzedTool]) -> Option<CompatibleCombination> {
    let mut tools: Vec<String> = Vec::new();
    for name in entry.get("tools")?.as_array()?.iter().filter_map(Value::as_str) {
        if let Some(key) = resolve_tool(name, roster)
            && !tools.iter().any(|t| t == key)
        {
            tools.push(key.to_string());
        }
    }
    if tools.len() < 2 {
        return None;
    }
    let reason = string_field(entry, &["reason"]).unwrap_or_default().trim().to_string();
    Some(CompatibleCombination { tools, reason })
}

/// Parse the commentary that accompanies the conflicts: compatible
/// combinations, recommendations and an overall assessment.
///
/// Missing or malformed parts are left empty. Combinations naming fewer than
/// two known tools are dropped.
pub fn parse_model_insights(response: &str, roster: &[AnalyzedTool]) -> ModelInsights {
    let Some(Value::Object(map)) = extract_json(response) else {
        return ModelInsights::default();
    };

    let compatible_combinations = map
        .get("compatible_combinations")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| parse_combination(entry, roster))
                .collect()
        })
        .unwrap_or_default();

    let recommendations = map
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    let overall_assessment = map
        .get("overall_assessment")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from);

    ModelInsights {
        compatible_combinations,
        recommendations,
        overall_assessment,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::ToolOrigin;

    fn roster() -> Vec<AnalyzedTool> {
        [("streamlit", "Streamlit"), ("gradio", "Gradio"), ("semantic-kernel", "Semantic Kernel")]
            .iter()
            .map(|(key, name)| AnalyzedTool {
                tool_key: key.to_string(),
                display_name: name.to_string(),
                origin: ToolOrigin::Planned,
                status: None,
                confidence: None,
                port: None,
                github_url: None,
            })
            .collect()
    }

    #[test]
    fn test_parse_object_with_prose() {
        let response = r#"Here is my analysis:
```json
{"conflicts": [{"type": "port_conflict", "severity": "high",
  "tools_involved": ["Streamlit", "GRADIO"], "description": "Both use 8501",
  "mitigation": "Move one", "confidence": "high"}]}
```"#;
        let conflicts = parse_model_conflicts(response, &roster()).unwrap();
        assert_eq!(conflicts.len(), 1);
        let c = &conflicts[0];
        assert_eq!(c.kind, ConflictKind::Port);
        assert_eq!(c.tools, vec!["streamlit", "gradio"]);
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.confidence, 0.85);
        assert!(c.has_source(ConflictSource::AiAnalysis));
        assert!(!c.has_source(ConflictSource::StaticRule));
    }

    #[test]
    fn test_parse_bare_array() {
        let response = r#"[{"kind": "resource_competition", "tools": ["semantic_kernel", "gradio"]}]"#;
        let conflicts = parse_model_conflicts(response, &roster()).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::Resource);
        assert_eq!(conflicts[0].severity, Severity::Medium);
        assert_eq!(conflicts[0].confidence, DEFAULT_AI_CONFIDENCE);
    }

    #[test]
    fn test_drops_unknown_tools_and_kinds() {
        let response = r#"{"conflicts": [
            {"type": "port_conflict", "tools_involved": ["streamlit", "jupyter"]},
            {"type": "cosmic_rays", "tools_involved": ["streamlit", "gradio"]},
            {"type": "dependency_conflict", "tools_involved": ["gradio", "Gradio"]},
            {"type": "environment_conflict", "tools_involved": ["gradio", "streamlit", "jupyter"]}
        ]}"#;
        let conflicts = parse_model_conflicts(response, &roster()).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::EnvVar);
        assert_eq!(conflicts[0].tools, vec!["gradio", "streamlit"]);
    }

    #[test]
    fn test_unparseable_is_none() {
        assert!(parse_model_conflicts("I cannot help with that.", &roster()).is_none());
        assert!(parse_model_conflicts("{\"conflicts\": [", &roster()).is_none());
        assert!(parse_model_conflicts("{\"summary\": \"ok\"}", &roster()).is_none());
    }

    #[test]
    fn test_empty_conflicts_is_some() {
        let conflicts = parse_model_conflicts("{\"conflicts\": []}", &roster()).unwrap();
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_parse_insights() {
        let response = r#"```json
{"conflicts": [],
 "compatible_combinations": [
    {"tools": ["Streamlit", "semantic_kernel"], "reason": " Different layers "},
    {"tools": ["streamlit", "jupyter"], "reason": "unknown tool"},
    {"reason": "no tools"}
 ],
 "recommendations": ["Run Gradio on 7861", "", 42],
 "overall_assessment": "Compatible with port changes"}
```"#;
        let insights = parse_model_insights(response, &roster());
        assert_eq!(insights.compatible_combinations.len(), 1);
        assert_eq!(
            insights.compatible_combinations[0].tools,
            vec!["streamlit", "semantic-kernel"]
        );
        assert_eq!(insights.compatible_combinations[0].reason, "Different layers");
        assert_eq!(insights.recommendations, vec!["Run Gradio on 7861"]);
        assert_eq!(
            insights.overall_assessment.as_deref(),
            Some("Compatible with port changes")
        );
    }

    #[test]
    fn test_insights_empty_without_commentary() {
        let bare = r#"[{"kind": "port_conflict", "tools": ["streamlit", "gradio"]}]"#;
        assert!(parse_model_insights(bare, &roster()).is_empty());
        assert!(parse_model_insights("{\"conflicts\": []}", &roster()).is_empty());
        assert!(parse_model_insights("no json here", &roster()).is_empty());
    }

    #[test]
    fn test_confidence_mapping() {
        use serde_json::json;
        assert_eq!(confidence_from_value(Some(&json!("LOW"))), 0.4);
        assert_eq!(confidence_from_value(Some(&json!(0.7))), 0.7);
        assert_eq!(confidence_from_value(Some(&json!(3))), 1.0);
        assert_eq!(confidence_from_value(Some(&json!("0.3"))), 0.3);
        assert_eq!(confidence_from_value(Some(&json!("sure"))), DEFAULT_AI_CONFIDENCE);
        assert_eq!(confidence_from_value(None), DEFAULT_AI_CONFIDENCE);
    }
}
