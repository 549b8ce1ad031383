//! Frontmatter and inline field extraction.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_yaml::Value;

use crate::FieldValue;

static BRACKETED_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\[(]\s*([^\[\]()]+?)\s*::\s*([^\[\]()]*?)\s*[\])]").expect("valid regex")
});

static BARE_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:[-*+]\s+)?([A-Za-z_][\w\-]*)\s*::\s*(.*?)\s*$").expect("valid regex")
});

/// Splits a leading `---` block from the body. Unterminated blocks are body.
pub(super) fn split_frontmatter(text: &str) -> (Option<&str>, &str) {
    let text = text.trim_start_matches('\u{feff}');
    let mut lines = text.split_inclusive('\n');
    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return (None, text),
    }
    let block_start = text.find('\n').map_or(text.len(), |i| i + 1);
    let mut offset = block_start;
    for line in lines {
        if line.trim_end() == "---" {
            let block = &text[block_start..offset];
            let body = &text[offset + line.len()..];
            return (Some(block), body);
        }
        offset += line.len();
    }
    (None, text)
}

/// YAML first; a block YAML rejects falls back to `key: value` lines.
pub(super) fn frontmatter_fields(block: &str) -> Vec<(String, FieldValue)> {
    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Mapping(map)) => map
            .into_iter()
            .filter_map(|(k, v)| Some((yaml_key(k)?, yaml_scalar(v)?)))
            .collect(),
        Ok(Value::Null) => Vec::new(),
        _ => line_fields(block),
    }
}

fn yaml_key(key: Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_scalar(value: Value) -> Option<FieldValue> {
    match value {
        Value::Number(n) => n.as_f64().map(FieldValue::Number),
        Value::Bool(b) => Some(FieldValue::Flag(b)),
        Value::String(s) => scalar(&s),
        _ => None,
    }
}

fn line_fields(block: &str) -> Vec<(String, FieldValue)> {
    block
        .lines()
        .filter(|line| !line.starts_with(char::is_whitespace) && !line.starts_with('-'))
        .filter_map(|line| {
            let (key, raw) = line.split_once(':')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some((key.to_string(), scalar(raw)?))
        })
        .collect()
}

/// `[Key:: value]`, `(Key:: value)` anywhere on a line, or a whole
/// `Key:: value` line.
pub(super) fn inline_fields(body: &str) -> Vec<(String, FieldValue)> {
    let mut fields = Vec::new();
    for line in body.lines() {
        let before = fields.len();
        for caps in BRACKETED_FIELD.captures_iter(line) {
            if let Some(value) = scalar(&caps[2]) {
                fields.push((caps[1].to_string(), value));
            }
        }
        if fields.len() > before {
            continue;
        }
        if let Some(caps) = BARE_FIELD.captures(line) {
            if let Some(value) = scalar(&caps[2]) {
                fields.push((caps[1].to_string(), value));
            }
        }
    }
    fields
}

/// Frontmatter first, then inline fields; later writes win.
pub(super) fn collect_fields(front: Option<&str>, body: &str) -> BTreeMap<String, FieldValue> {
    let mut merged = BTreeMap::new();
    if let Some(block) = front {
        merged.extend(frontmatter_fields(block));
    }
    merged.extend(inline_fields(body));
    merged
}

pub(super) fn scalar(raw: &str) -> Option<FieldValue> {
    let raw = raw.trim().trim_matches('"');
    if raw.is_empty() {
        return None;
    }
    if let Ok(n) = raw.parse::<f64>() {
        if n.is_finite() {
            return Some(FieldValue::Number(n));
        }
    }
    if raw.eq_ignore_ascii_case("true") {
        return Some(FieldValue::Flag(true));
    }
    if raw.eq_ignore_ascii_case("false") {
        return Some(FieldValue::Flag(false));
    }
    Some(FieldValue::Text(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_frontmatter_from_body() {
        let text = "---\nExercise: 30\n---\n# Log\nbody";
        let (front, body) = split_frontmatter(text);
        assert_eq!(front, Some("Exercise: 30\n"));
        assert_eq!(body, "# Log\nbody");
    }

    #[test]
    fn unterminated_frontmatter_is_body() {
        let text = "---\nExercise: 30\n# no closing fence";
        let (front, body) = split_frontmatter(text);
        assert!(front.is_none());
        assert_eq!(body, text);
    }

    #[test]
    fn yaml_lists_and_comments_are_skipped() {
        let fields = frontmatter_fields("tags: #Daily\naliases:\n  - a\nStudy: 30\n");
        assert_eq!(fields, vec![("Study".to_string(), FieldValue::Number(30.0))]);
    }

    #[test]
    fn broken_yaml_falls_back_to_lines() {
        let fields = frontmatter_fields("Study: 30\nbad: [unclosed\nCoding: 15\n");
        assert!(fields.contains(&("Study".to_string(), FieldValue::Number(30.0))));
        assert!(fields.contains(&("Coding".to_string(), FieldValue::Number(15.0))));
    }

    #[test]
    fn reads_all_inline_forms() {
        let body = "Brush_Teeth:: 2\n- Today [Coding:: 30] and (Study:: 15)\nnot a field: 3\n";
        let fields = inline_fields(body);
        assert_eq!(
            fields,
            vec![
                ("Brush_Teeth".to_string(), FieldValue::Number(2.0)),
                ("Coding".to_string(), FieldValue::Number(30.0)),
                ("Study".to_string(), FieldValue::Number(15.0)),
            ]
        );
    }

    #[test]
    fn inline_overrides_frontmatter() {
        let fields = collect_fields(Some("Exercise: 10\n"), "Exercise:: 60\n");
        assert_eq!(fields.get("Exercise"), Some(&FieldValue::Number(60.0)));
    }

    #[test]
    fn empty_values_are_absent() {
        assert!(inline_fields("Exercise::\n").is_empty());
        assert_eq!(scalar("yes"), Some(FieldValue::Text("yes".to_string())));
    }
}
