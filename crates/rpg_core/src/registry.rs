//! Source registry: which frontmatter/inline keys award XP, and how.

use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};

use crate::{Aggregation, CustomMapping, FieldValue, GameContent, SignalMapping};

/// Outcome of looking up a source key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    Mapped(&'a SignalMapping),
    Ignored,
    NotFound,
}

/// Keys are matched case-sensitively. User overrides shadow built-ins.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    builtin: AHashMap<String, SignalMapping>,
    overrides: AHashMap<String, Option<SignalMapping>>,
    internal_keys: AHashSet<String>,
}

impl SourceRegistry {
    pub fn new(content: &GameContent, custom: &BTreeMap<String, CustomMapping>) -> Self {
        let builtin = content
            .signals
            .iter()
            .map(|m| (m.key.clone(), m.clone()))
            .collect();

        let overrides = custom
            .iter()
            .map(|(key, mapping)| {
                let resolved = (!mapping.is_ignore()).then(|| SignalMapping {
                    key: key.clone(),
                    skill_id: mapping.skill_id.clone(),
                    xp_per_unit: mapping.xp_per_unit,
                    aggregation: mapping.aggregation,
                    target: None,
                    unit: None,
                    label: None,
                });
                (key.clone(), resolved)
            })
            .collect();

        let internal_keys = content
            .constants
            .ignored_keys
            .iter()
            .map(|k| k.to_lowercase())
            .collect();

        Self {
            builtin,
            overrides,
            internal_keys,
        }
    }

    pub fn resolve(&self, key: &str) -> Resolution<'_> {
        if let Some(entry) = self.overrides.get(key) {
            return match entry {
                Some(mapping) => Resolution::Mapped(mapping),
                None => Resolution::Ignored,
            };
        }
        match self.builtin.get(key) {
            Some(mapping) => Resolution::Mapped(mapping),
            None => Resolution::NotFound,
        }
    }

    /// Note metadata (tags, aliases, ...) that is neither a signal nor unknown.
    pub fn is_internal(&self, key: &str) -> bool {
        self.internal_keys.contains(&key.to_lowercase())
    }
}

/// XP a single observation earns. `None` when the value cannot be read as the
/// mapping's aggregation expects.
pub(crate) fn xp_for_value(mapping: &SignalMapping, value: &FieldValue) -> Option<f64> {
    let xp = match mapping.aggregation {
        Aggregation::Completion => {
            if is_truthy(value) {
                mapping.xp_per_unit
            } else {
                0.0
            }
        }
        Aggregation::Count | Aggregation::Duration | Aggregation::Rating => {
            numeric(value)? * mapping.xp_per_unit
        }
    };
    Some(xp.max(0.0))
}

pub(crate) fn numeric(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Number(n) if n.is_finite() => Some(*n),
        FieldValue::Number(_) => None,
        FieldValue::Flag(b) => Some(if *b { 1.0 } else { 0.0 }),
        FieldValue::Text(s) => leading_number(s),
    }
}

fn is_truthy(value: &FieldValue) -> bool {
    match value {
        FieldValue::Flag(b) => *b,
        FieldValue::Number(n) => n.is_finite() && *n != 0.0,
        FieldValue::Text(s) => {
            let s = s.trim();
            if let Some(n) = leading_number(s) {
                return n != 0.0;
            }
            matches!(
                s.to_lowercase().as_str(),
                "true" | "yes" | "y" | "done" | "x" | "✓" | "✅"
            )
        }
    }
}

/// Parses the longest numeric prefix: `"45 min"` reads as 45.
pub(crate) fn leading_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'-' | b'+')) {
        end = 1;
    }
    let digits_start = end;
    let mut seen_dot = false;
    while end < bytes.len() {
        match bytes[end] {
            b'0'..=b'9' => end += 1,
            b'.' if !seen_dot => {
                seen_dot = true;
                end += 1;
            }
            _ => break,
        }
    }
    if !s[digits_start..end].bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    s[..end].trim_end_matches('.').parse().ok()
}
