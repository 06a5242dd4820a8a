//! Per-mode contract validators (spec.md §4.4). A validator returns the
//! list of missing/invalid fields; an empty list means the contract
//! artifact is valid. Dispatch is a plain `match` on the mode's contract
//! key — no reflection, per spec.md §9's Design Note.

use serde_json::Value;

fn is_non_empty_string(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

fn is_object(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Object(_)))
}

fn is_array(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Array(_)))
}

fn is_number(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Number(_)))
}

fn key_exists(obj: &serde_json::Map<String, Value>, key: &str) -> bool {
    obj.contains_key(key)
}

fn is_string_or_null_present(obj: &serde_json::Map<String, Value>, key: &str) -> bool {
    matches!(obj.get(key), Some(Value::String(_)) | Some(Value::Null))
}

fn is_snake_case_ident(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn is_numeric_like(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Number(_)) => true,
        Some(Value::String(s)) => {
            let normalized = s.replace(',', ".");
            normalized.parse::<f64>().is_ok()
        }
        _ => false,
    }
}

/// Validate a contract artifact against the named mode. `mode_key` is
/// `Mode::contract_key()` — `core`, `auto`, `ecom`, `news`, or `social`.
pub fn validate(mode_key: &str, value: &Value) -> Result<(), Vec<String>> {
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => return Err(vec!["json_object".to_string()]),
    };

    match mode_key {
        "core" => validate_core(obj),
        "auto" => validate_auto(obj),
        "ecom" => validate_ecom(obj),
        "news" => validate_news(obj),
        "social" => validate_social(obj),
        other => Err(vec![format!("unknown_contract:{other}")]),
    }
}

fn validate_core(obj: &serde_json::Map<String, Value>) -> Result<(), Vec<String>> {
    let mut missing = Vec::new();
    if !is_non_empty_string(obj.get("schema_version")) {
        missing.push("schema_version".to_string());
    }
    if !is_object(obj.get("extracted")) {
        missing.push("extracted".to_string());
    }
    if !is_number(obj.get("confidence")) {
        missing.push("confidence".to_string());
    }
    done(missing)
}

fn validate_auto(obj: &serde_json::Map<String, Value>) -> Result<(), Vec<String>> {
    let mut missing = Vec::new();
    if !is_non_empty_string(obj.get("schema_version")) {
        missing.push("schema_version".to_string());
    }
    match obj.get("type") {
        Some(Value::String(s)) if !s.is_empty() => {
            if !is_snake_case_ident(s) {
                missing.push("type_snake_case".to_string());
            }
        }
        _ => missing.push("type".to_string()),
    }
    if !is_object(obj.get("data")) {
        missing.push("data".to_string());
    }
    if !is_number(obj.get("confidence")) {
        missing.push("confidence".to_string());
    }
    done(missing)
}

fn validate_ecom(obj: &serde_json::Map<String, Value>) -> Result<(), Vec<String>> {
    let mut missing = Vec::new();
    if !is_non_empty_string(obj.get("title")) {
        missing.push("title".to_string());
    }
    if !is_numeric_like(obj.get("price")) {
        missing.push("price".to_string());
    }
    match obj.get("currency") {
        Some(Value::String(s)) if s.len() >= 3 => {}
        _ => missing.push("currency".to_string()),
    }
    if !is_object(obj.get("spec")) {
        missing.push("spec".to_string());
    }
    if !is_array(obj.get("skus")) {
        missing.push("skus".to_string());
    }
    if !is_array(obj.get("bullet_points")) {
        missing.push("bullet_points".to_string());
    }
    done(missing)
}

fn validate_news(obj: &serde_json::Map<String, Value>) -> Result<(), Vec<String>> {
    let mut missing = Vec::new();
    if !is_non_empty_string(obj.get("title")) {
        missing.push("title".to_string());
    }
    if !key_exists(obj, "author") || !is_string_or_null_present(obj, "author") {
        missing.push("author".to_string());
    }
    if !key_exists(obj, "published_at") || !is_string_or_null_present(obj, "published_at") {
        missing.push("published_at".to_string());
    }
    if !matches!(obj.get("summary"), Some(Value::String(_))) {
        missing.push("summary".to_string());
    }
    if !is_array(obj.get("viewpoints")) {
        missing.push("viewpoints".to_string());
    }
    if !is_array(obj.get("entities")) {
        missing.push("entities".to_string());
    }
    done(missing)
}

fn validate_social(obj: &serde_json::Map<String, Value>) -> Result<(), Vec<String>> {
    let mut missing = Vec::new();
    if !is_non_empty_string(obj.get("sentiment")) {
        missing.push("sentiment".to_string());
    }
    if !matches!(obj.get("core_demand"), Some(Value::String(_))) {
        missing.push("core_demand".to_string());
    }
    if !is_array(obj.get("brands")) {
        missing.push("brands".to_string());
    }
    if !key_exists(obj, "purchase_intent") || !matches!(obj.get("purchase_intent"), Some(Value::Bool(_))) {
        missing.push("purchase_intent".to_string());
    }
    if !is_non_empty_string(obj.get("purchase_intent_reason")) {
        missing.push("purchase_intent_reason".to_string());
    }
    done(missing)
}

fn done(missing: Vec<String>) -> Result<(), Vec<String>> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}
