//! Local format parsers (spec.md §4.5): the cascade attempted, in order,
//! before falling back to an upstream call. Each parser returns
//! `Some(value)` on success, `None` on failure — cascade failures are
//! silently swallowed by the caller (spec.md §7).

pub mod sanitize;

use sanitize::sanitize_key;
use serde_json::{Map, Value};

/// Strict JSON: succeeds only if the first non-space character is `{` or
/// `[` and the remainder decodes as valid JSON.
pub fn parse_json(input: &str) -> Option<Value> {
    let trimmed = input.trim_start();
    match trimmed.chars().next() {
        Some('{') | Some('[') => serde_json::from_str(trimmed).ok(),
        _ => None,
    }
}

/// Query-string: requires at least one `=`. Decoded with standard
/// `application/x-www-form-urlencoded` semantics (`+` is space). Dot
/// characters in keys are normalized to underscore (documented, spec.md
/// §4.5 / §9).
pub fn parse_query(input: &str) -> Option<Value> {
    let trimmed = input.trim();
    if !trimmed.contains('=') {
        return None;
    }

    let mut map = Map::new();
    for pair in trimmed.split('&') {
        if pair.is_empty() {
            continue;
        }
        let (raw_key, raw_value) = match pair.split_once('=') {
            Some((k, v)) => (k, v),
            None => (pair, ""),
        };
        let key = form_decode(raw_key).replace('.', "_");
        let value = form_decode(raw_value);
        if key.is_empty() {
            continue;
        }
        map.insert(key, Value::String(value));
    }

    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

fn form_decode(raw: &str) -> String {
    let spaces_decoded = raw.replace('+', " ");
    urlencoding::decode(&spaces_decoded)
        .map(|cow| cow.into_owned())
        .unwrap_or(spaces_decoded)
}

/// Key-value lines: split on CR/LF; blank lines and lines beginning with
/// `#` or `//` are ignored; each kept line must contain `=` or `:` (`=`
/// takes precedence when both are present). At least one hit is required.
pub fn parse_kv(input: &str) -> Option<Value> {
    let mut map = Map::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        let eq_pos = line.find('=');
        let colon_pos = line.find(':');
        // `=` takes precedence over `:` when both are present (spec.md §4.5).
        let sep_pos = match (eq_pos, colon_pos) {
            (Some(e), _) => Some(e),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        };

        let Some(idx) = sep_pos else { continue };
        let key = sanitize_key(line[..idx].trim());
        let value = line[idx + 1..].trim().to_string();
        map.insert(key, Value::String(value));
    }

    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// CSV: requires both a comma and a line break. First non-empty line is
/// the header; up to 999 data rows are decoded (cap bounds memory); row
/// columns are aligned to `min(header_len, row_len)`; keys are sanitized.
pub fn parse_csv(input: &str) -> Option<Value> {
    if !input.contains(',') || !(input.contains('\n') || input.contains('\r')) {
        return None;
    }

    let mut lines = input.lines().filter(|l| !l.trim().is_empty());
    let header_line = lines.next()?;
    let header: Vec<String> = header_line
        .split(',')
        .map(|h| sanitize_key(h.trim()))
        .collect();

    let mut rows = Vec::new();
    for line in lines.take(999) {
        let cols: Vec<&str> = line.split(',').collect();
        let width = header.len().min(cols.len());
        let mut row = Map::new();
        for i in 0..width {
            row.insert(header[i].clone(), Value::String(cols[i].trim().to_string()));
        }
        rows.push(Value::Object(row));
    }

    if rows.is_empty() {
        None
    } else {
        Some(Value::Array(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_requires_object_or_array_start() {
        assert!(parse_json(r#"{"a":1}"#).is_some());
        assert!(parse_json("[1,2,3]").is_some());
        assert!(parse_json("not json").is_none());
        assert!(parse_json("\"just a string\"").is_none());
    }

    #[test]
    fn query_decodes_and_normalizes_dots() {
        let v = parse_query("a.b=1&c=2").unwrap();
        assert_eq!(v["a_b"], "1");
        assert_eq!(v["c"], "2");
    }

    #[test]
    fn query_without_equals_fails() {
        assert!(parse_query("not a query string").is_none());
    }

    #[test]
    fn kv_lines_skip_comments_and_blank_lines() {
        let input = "name=alice\nage=30\n# comment\npath=/tmp\n\n";
        let v = parse_kv(input).unwrap();
        assert_eq!(v["name"], "alice");
        assert_eq!(v["age"], "30");
        assert_eq!(v["path"], "/tmp");
    }

    #[test]
    fn kv_equals_takes_precedence_over_colon() {
        let v = parse_kv("a=1:2").unwrap();
        assert_eq!(v["a"], "1:2");
    }

    #[test]
    fn kv_colon_used_when_no_equals() {
        let v = parse_kv("a: 1").unwrap();
        assert_eq!(v["a"], "1");
    }

    #[test]
    fn csv_sanitizes_header_keys() {
        let v = parse_csv("col a,b\n1,2\n3,4").unwrap();
        let rows = v.as_array().unwrap();
        assert_eq!(rows[0]["col_a"], "1");
        assert_eq!(rows[0]["b"], "2");
        assert_eq!(rows[1]["col_a"], "3");
    }

    #[test]
    fn csv_caps_at_999_rows() {
        let mut input = String::from("a,b\n");
        for i in 0..1005 {
            input.push_str(&format!("{i},{i}\n"));
        }
        let v = parse_csv(&input).unwrap();
        assert_eq!(v.as_array().unwrap().len(), 999);
    }

    #[test]
    fn csv_requires_comma_and_newline() {
        assert!(parse_csv("a,b,c").is_none());
        assert!(parse_csv("a\nb").is_none());
    }
}
