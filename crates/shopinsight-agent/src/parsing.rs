//! Reading structured data out of free-form completion text.

use serde_json::{Map, Value};
use shopinsight_core::{Confidence, Domain, Explanation, Intent};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Removes a surrounding Markdown code fence (with an optional language tag
/// such as `sql` or `json`) and trims the result.
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // The language tag runs to the end of the opening line.
    let body = match rest.find('\n') {
        Some(newline) if !rest[..newline].trim().contains(' ') => &rest[newline + 1..],
        _ => rest,
    };

    body.trim_end()
        .strip_suffix("```")
        .unwrap_or(body)
        .trim()
}

fn json_object(raw: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(strip_code_fences(raw)).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Builds an [`Intent`] from classifier output.
///
/// Returns `None` when the text is not a JSON object. Otherwise every field
/// that is missing or has the wrong type takes its fallback value, and a
/// domain outside the known set resolves to orders.
pub fn parse_intent(raw: &str) -> Option<Intent> {
    let map = json_object(raw)?;
    let fallback = Intent::fallback();

    let domain = map
        .get("domain")
        .and_then(Value::as_str)
        .and_then(|d| Domain::from_str(d).ok())
        .unwrap_or(fallback.domain);

    let metrics = match map.get("metrics") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(single)) => vec![single.clone()],
        _ => fallback.metrics,
    };

    let filters = match map.get("filters") {
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), value)
            })
            .collect(),
        _ => BTreeMap::new(),
    };

    Some(Intent {
        domain,
        metrics,
        time_period: string_field(&map, "time_period").unwrap_or(fallback.time_period),
        filters,
        summary: string_field(&map, "intent_summary").unwrap_or_default(),
    })
}

/// Builds an [`Explanation`] from explainer output. `None` when the text is
/// not a JSON object with a string `answer`.
pub fn parse_explanation(raw: &str) -> Option<Explanation> {
    let map = json_object(raw)?;
    let answer = string_field(&map, "answer")?;

    let confidence = map
        .get("confidence")
        .and_then(Value::as_str)
        .and_then(|c| Confidence::from_str(c).ok())
        .unwrap_or(Confidence::Medium);

    Some(Explanation {
        answer,
        confidence,
        reasoning: string_field(&map, "reasoning"),
    })
}

/// First `limit` characters of the serialized result.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
