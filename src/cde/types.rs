//! Binding and descriptor types for CDE reconciliation.
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Vocabulary authority recorded when a binding omits `CDEOrigin`.
pub const DEFAULT_ORIGIN: &str = "caDSR";

/// A `(code, version)` pair identifying one CDE.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CodeVersion {
    #[serde(rename = "CDECode")]
    pub code: String,
    #[serde(rename = "CDEVersion")]
    pub version: String,
}

impl CodeVersion {
    pub fn new(code: &str, version: &str) -> Self {
        Self {
            code: code.to_string(),
            version: version.to_string(),
        }
    }
}

impl fmt::Display for CodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.code, self.version)
    }
}

/// Structured binding key: property path plus the bound CDE.
///
/// The wire form is `"<path>;<code>.<version>"`; keys compare structurally so
/// delimiter characters inside a path or code cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingKey {
    pub path: String,
    pub cde: CodeVersion,
}

impl BindingKey {
    pub fn new(path: &str, code: &str, version: &str) -> Self {
        Self {
            path: path.to_string(),
            cde: CodeVersion::new(code, version),
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{};{}", self.path, self.cde)
    }
}

/// Value half of a binding-map entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CdeBinding {
    #[serde(rename = "CDECode", deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(rename = "CDEVersion", deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(rename = "CDEOrigin", default = "default_origin")]
    pub origin: String,
}

fn default_origin() -> String {
    DEFAULT_ORIGIN.to_string()
}

/// One item returned by the vocabulary service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CdeDescriptor {
    #[serde(rename = "CDECode", deserialize_with = "string_or_number")]
    pub code: String,
    #[serde(rename = "CDEVersion", deserialize_with = "string_or_number")]
    pub version: String,
    #[serde(rename = "CDEFullName", default)]
    pub full_name: String,
    /// `None` means the authority has no opinion; `Some(vec![])` means unconstrained.
    #[serde(rename = "PermissibleValues", default)]
    pub permissible_values: Option<Vec<String>>,
    #[serde(rename = "CDEOrigin", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl CdeDescriptor {
    pub fn code_version(&self) -> CodeVersion {
        CodeVersion::new(&self.code, &self.version)
    }
}

/// Binding map keyed structurally; iteration order is deterministic.
pub type BindingMap = BTreeMap<BindingKey, CdeBinding>;

/// Convert the wire binding map `{"path;code.version": {CDECode, ...}}`.
///
/// Entries whose key has no `;` or whose value is not a binding are skipped
/// with a warning. The value's code and version are authoritative.
pub fn parse_binding_map(raw: &Value) -> BindingMap {
    let mut bindings = BindingMap::new();
    let Some(entries) = raw.as_object() else {
        tracing::warn!("binding map is not a JSON object; no bindings loaded");
        return bindings;
    };
    for (raw_key, raw_value) in entries {
        let Some((path, key_cde)) = raw_key.split_once(';') else {
            tracing::warn!(key = %raw_key, "binding key has no ';' separator; skipped");
            continue;
        };
        if path.is_empty() {
            tracing::warn!(key = %raw_key, "binding key has an empty property path; skipped");
            continue;
        }
        let binding: CdeBinding = match serde_json::from_value(raw_value.clone()) {
            Ok(binding) => binding,
            Err(err) => {
                tracing::warn!(key = %raw_key, %err, "binding value is malformed; skipped");
                continue;
            }
        };
        let key = BindingKey::new(path, &binding.code, &binding.version);
        if key.cde.to_string() != key_cde {
            tracing::debug!(
                key = %raw_key,
                code = %binding.code,
                version = %binding.version,
                "binding key text disagrees with binding value; using value"
            );
        }
        bindings.insert(key, binding);
    }
    bindings
}

/// Parse the vocabulary response: a bare array or `{"retrieveCDEs": [...]}`.
///
/// Items that do not parse are dropped with a warning.
pub fn parse_descriptors(raw: &Value) -> Vec<CdeDescriptor> {
    let items: &[Value] = match raw {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("retrieveCDEs")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };
    items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(descriptor) => Some(descriptor),
            Err(err) => {
                tracing::warn!(%err, "vocabulary descriptor is malformed; dropped");
                None
            }
        })
        .collect()
}

/// Distinct `(code, version)` pairs to request from the vocabulary service.
pub fn requested_codes(bindings: &BindingMap) -> Vec<CodeVersion> {
    bindings
        .keys()
        .map(|key| key.cde.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wire_binding_map() {
        let raw = json!({
            "program.program_name;11444542.1.00": {
                "CDECode": "11444542",
                "CDEVersion": "1.00",
                "CDEOrigin": "caDSR"
            },
            "study.phase;7890.2": {"CDECode": 7890, "CDEVersion": 2}
        });
        let bindings = parse_binding_map(&raw);
        assert_eq!(bindings.len(), 2);

        let key = BindingKey::new("program.program_name", "11444542", "1.00");
        assert_eq!(key.to_string(), "program.program_name;11444542.1.00");
        assert_eq!(bindings[&key].origin, "caDSR");

        let phase = BindingKey::new("study.phase", "7890", "2");
        assert_eq!(bindings[&phase].origin, DEFAULT_ORIGIN);
    }

    #[test]
    fn malformed_binding_entries_are_skipped() {
        let raw = json!({
            "no_separator": {"CDECode": "1", "CDEVersion": "1"},
            ";1.1": {"CDECode": "1", "CDEVersion": "1"},
            "a.b;1.1": "not an object",
            "a.c;2.1": {"CDECode": "2", "CDEVersion": "1"}
        });
        let bindings = parse_binding_map(&raw);
        assert_eq!(bindings.len(), 1);
        assert!(bindings.contains_key(&BindingKey::new("a.c", "2", "1")));
        assert!(parse_binding_map(&json!([1, 2])).is_empty());
    }

    #[test]
    fn value_wins_when_key_text_disagrees() {
        let raw = json!({"a.b;9.9": {"CDECode": "1", "CDEVersion": "2"}});
        let bindings = parse_binding_map(&raw);
        assert!(bindings.contains_key(&BindingKey::new("a.b", "1", "2")));
    }

    #[test]
    fn parses_descriptor_response_shapes() {
        let item = json!({
            "CDECode": "11444542",
            "CDEVersion": "1.00",
            "CDEFullName": "Program Name",
            "PermissibleValues": ["Pediatric"],
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let bare = parse_descriptors(&json!([item.clone(), {"CDEVersion": "1"}]));
        assert_eq!(bare.len(), 1);
        assert_eq!(
            bare[0].permissible_values.as_deref(),
            Some(&["Pediatric".to_string()][..])
        );

        let wrapped = parse_descriptors(&json!({"retrieveCDEs": [item]}));
        assert_eq!(wrapped, bare);
        assert!(parse_descriptors(&json!("nope")).is_empty());
    }

    #[test]
    fn null_permissible_values_stay_absent() {
        let descriptors = parse_descriptors(&json!([
            {"CDECode": "1", "CDEVersion": "1", "PermissibleValues": null},
            {"CDECode": "2", "CDEVersion": "1", "PermissibleValues": []}
        ]));
        assert_eq!(descriptors[0].permissible_values, None);
        assert_eq!(descriptors[1].permissible_values, Some(Vec::new()));
    }

    #[test]
    fn requested_codes_are_distinct_and_sorted() {
        let mut bindings = BindingMap::new();
        for (path, code) in [("b.x", "2"), ("a.x", "1"), ("c.x", "2")] {
            bindings.insert(
                BindingKey::new(path, code, "1.00"),
                CdeBinding {
                    code: code.to_string(),
                    version: "1.00".to_string(),
                    origin: DEFAULT_ORIGIN.to_string(),
                },
            );
        }
        assert_eq!(
            requested_codes(&bindings),
            vec![CodeVersion::new("1", "1.00"), CodeVersion::new("2", "1.00")]
        );
    }
}
