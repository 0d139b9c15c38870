//! Property-name normalization for nested resource values.
//!
//! Declarative templates and control-plane APIs disagree on key casing
//! (`PascalCase` template fields vs `camelCase` API fields). This module
//! rewrites mapping keys across an arbitrarily nested value with a caller
//! supplied transform, honoring an exclusion tree for keys that must keep
//! their original spelling. The traversal is pure: same input and transform
//! always yield the same output, and the input is never mutated.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Exclusion marker for one key at one nesting level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyExclusion {
    /// The key and its entire subtree are left untouched.
    Subtree,
    /// The key itself is transformed, but these nested exclusions apply
    /// within its value.
    Nested(ExclusionMap),
}

/// Exclusions keyed by the (untransformed) key they apply to.
pub type ExclusionMap = BTreeMap<String, KeyExclusion>;

/// Recursively rewrites every mapping key in `value` with `transform`.
///
/// Sequences are transformed element-wise with the same exclusions; mappings
/// are transformed key-by-key. Exclusion markers propagate down only along
/// excluded branches; sibling branches are transformed normally. Scalars and
/// `null` pass through unchanged.
#[must_use]
pub fn transform_object_keys<F>(value: &Value, transform: &F, exclusions: &ExclusionMap) -> Value
where
    F: Fn(&str) -> String,
{
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| transform_object_keys(item, transform, exclusions))
                .collect(),
        ),
        Value::Object(entries) => {
            let mut out = Map::with_capacity(entries.len());
            for (key, child) in entries {
                match exclusions.get(key) {
                    Some(KeyExclusion::Subtree) => {
                        out.insert(key.clone(), child.clone());
                    }
                    Some(KeyExclusion::Nested(nested)) => {
                        out.insert(
                            transform(key),
                            transform_object_keys(child, transform, nested),
                        );
                    }
                    None => {
                        out.insert(
                            transform(key),
                            transform_object_keys(child, transform, &ExclusionMap::new()),
                        );
                    }
                }
            }
            Value::Object(out)
        }
        _ => value.clone(),
    }
}

/// Lower-cases the first character of an identifier.
///
/// Empty strings pass through unchanged. Used as the concrete transform for
/// converting `PascalCase` API field names to `camelCase` template fields.
#[must_use]
pub fn lower_case_first_character(input: &str) -> String {
    let mut chars = input.chars();
    chars.next().map_or_else(String::new, |first| {
        let mut out = String::with_capacity(input.len());
        out.extend(first.to_lowercase());
        out.push_str(chars.as_str());
        out
    })
}
