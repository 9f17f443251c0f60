//! Template normalization, comparison and source resolution.
//!
//! Templates are opaque bodies. The only thing this crate does with them is
//! bring them into a canonical form so that two bodies can be compared or
//! diffed without formatting noise.

pub mod diff;
pub mod resolve;

use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

pub use diff::{DiffLine, DiffRun, TemplateDiff};
pub use resolve::{ResolveError, TemplateSource};

/// Canonical pretty form of a template body.
///
/// JSON bodies are re-serialized with sorted keys and two-space indentation,
/// YAML documents with sorted keys. Anything else is returned with trailing
/// whitespace and trailing blank lines removed.
pub fn normalize(body: &str) -> String {
  if let Ok(value) = serde_json::from_str::<JsonValue>(body) {
    if let Ok(pretty) = serde_json::to_string_pretty(&sort_json(value)) {
      return pretty;
    }
  }

  if let Ok(value) = serde_yaml::from_str::<YamlValue>(body) {
    // plain scalars parse as YAML too; only structured documents are rewritten
    if matches!(value, YamlValue::Mapping(_) | YamlValue::Sequence(_) | YamlValue::Tagged(_)) {
      if let Ok(pretty) = serde_yaml::to_string(&sort_yaml(value)) {
        return pretty.trim_end().to_string();
      }
    }
  }

  let mut lines: Vec<&str> = body.lines().map(str::trim_end).collect();
  while lines.last().is_some_and(|line| line.is_empty()) {
    lines.pop();
  }
  lines.join("\n")
}

/// Whether two bodies are the same template once normalized.
pub fn templates_equivalent(a: &str, b: &str) -> bool {
  normalize(a) == normalize(b)
}

fn sort_json(value: JsonValue) -> JsonValue {
  match value {
    JsonValue::Object(map) => {
      let mut entries: Vec<_> = map.into_iter().collect();
      entries.sort_by(|(a, _), (b, _)| a.cmp(b));
      JsonValue::Object(entries.into_iter().map(|(k, v)| (k, sort_json(v))).collect())
    }
    JsonValue::Array(items) => JsonValue::Array(items.into_iter().map(sort_json).collect()),
    other => other,
  }
}

fn sort_yaml(value: YamlValue) -> YamlValue {
  match value {
    YamlValue::Mapping(map) => {
      let mut entries: Vec<_> = map.into_iter().collect();
      entries.sort_by_key(|(key, _)| yaml_key(key));
      YamlValue::Mapping(entries.into_iter().map(|(k, v)| (k, sort_yaml(v))).collect())
    }
    YamlValue::Sequence(items) => YamlValue::Sequence(items.into_iter().map(sort_yaml).collect()),
    YamlValue::Tagged(mut tagged) => {
      tagged.value = sort_yaml(tagged.value);
      YamlValue::Tagged(tagged)
    }
    other => other,
  }
}

fn yaml_key(key: &YamlValue) -> String {
  match key {
    YamlValue::String(s) => s.clone(),
    other => serde_yaml::to_string(other).unwrap_or_default(),
  }
}
