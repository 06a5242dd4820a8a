/// Key sanitation (spec.md §4.5.1): replace any character outside
/// `[A-Za-z0-9_.-]` with `_`, collapse runs of `_`, strip leading/trailing
/// `_`, and substitute the literal `"key"` if the result is empty.
pub fn sanitize_key(raw: &str) -> String {
    let mut replaced = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-' {
            replaced.push(c);
        } else {
            replaced.push('_');
        }
    }

    let mut collapsed = String::with_capacity(replaced.len());
    let mut last_was_underscore = false;
    for c in replaced.chars() {
        if c == '_' {
            if !last_was_underscore {
                collapsed.push('_');
            }
            last_was_underscore = true;
        } else {
            collapsed.push(c);
            last_was_underscore = false;
        }
    }

    let trimmed = collapsed.trim_matches('_');
    if trimmed.is_empty() {
        "key".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize_key;

    #[test]
    fn replaces_disallowed_characters() {
        assert_eq!(sanitize_key("col a"), "col_a");
        assert_eq!(sanitize_key("name!!"), "name");
    }

    #[test]
    fn collapses_runs_of_underscore() {
        assert_eq!(sanitize_key("a   b"), "a_b");
    }

    #[test]
    fn strips_leading_and_trailing_underscore() {
        assert_eq!(sanitize_key("  leading"), "leading");
        assert_eq!(sanitize_key("trailing  "), "trailing");
    }

    #[test]
    fn empty_result_becomes_key() {
        assert_eq!(sanitize_key("!!!"), "key");
        assert_eq!(sanitize_key(""), "key");
    }

    #[test]
    fn preserves_dots_and_dashes() {
        assert_eq!(sanitize_key("a.b-c"), "a.b-c");
    }
}
