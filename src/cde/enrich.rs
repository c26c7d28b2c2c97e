//! Dictionary walk that applies CDE permissible values to bound properties.
//!
//! The input tree is cloned once; the walk owns and mutates only the clone.
//! Traversal uses an explicit stack, so nesting depth is bounded by memory
//! rather than by the call stack.
use super::resolve::{resolve_bindings, ReconciliationTables, ResolvedCde};
use super::types::{BindingKey, BindingMap, CdeDescriptor};
use serde::Serialize;
use serde_json::{Map, Value};

/// Enum written to a bound property when the vocabulary service has no entry for it.
pub const FALLBACK_MESSAGE: &str = "Permissible values are currently not available. \
Please contact the Data Hub HelpDesk at NCICRDCHelpDesk@mail.nih.gov";

/// Public caDSR reference page for one CDE version.
pub const CDE_PUBLIC_URL_TEMPLATE: &str = "https://cadsr.cancer.gov/onedata/dmdirect/NIH/NCI/CO/CDEDD?filter=CDEDD.ITEM_ID={code}%20and%20ver_nr={version}";

const PROPERTIES_KEY: &str = "properties";
const ENUM_KEY: &str = "enum";
const TYPE_KEY: &str = "type";

/// Counters describing what one enrichment run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichReport {
    pub properties_visited: usize,
    pub matched: usize,
    pub matched_without_data: usize,
    pub enums_replaced: usize,
    pub enums_cleared: usize,
    pub fallbacks_applied: usize,
}

/// Enriched copy of a dictionary plus the run's counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched {
    pub dictionary: Value,
    pub report: EnrichReport,
}

pub fn cde_public_url(code: &str, version: &str) -> String {
    CDE_PUBLIC_URL_TEMPLATE
        .replace("{code}", code)
        .replace("{version}", version)
}

/// Enrich a copy of `dictionary` with the vocabulary `response`.
///
/// `response_was_error` is recorded but does not change the outcome: a
/// failed query and a query with no match both take the fallback path.
pub fn update_enums(
    dictionary: &Value,
    bindings: &BindingMap,
    response: &[CdeDescriptor],
    response_was_error: bool,
) -> Enriched {
    tracing::debug!(
        response_was_error,
        bindings = bindings.len(),
        descriptors = response.len(),
        "enriching dictionary"
    );
    let tables = resolve_bindings(bindings, response);
    let mut working = dictionary.clone();
    let report = traverse_and_replace(&mut working, &tables);
    tracing::info!(
        visited = report.properties_visited,
        matched = report.matched,
        without_data = report.matched_without_data,
        fallbacks = report.fallbacks_applied,
        "dictionary enriched"
    );
    Enriched {
        dictionary: working,
        report,
    }
}

/// Walk `root` depth-first, applying the enum policy to every `properties` entry.
///
/// Paths are dot-joined keys from the root (array items contribute their
/// index). Children are visited in document order.
pub fn traverse_and_replace(root: &mut Value, tables: &ReconciliationTables) -> EnrichReport {
    let mut report = EnrichReport::default();
    let mut stack: Vec<(&mut Value, String)> = vec![(root, String::new())];

    while let Some((node, prefix)) = stack.pop() {
        match node {
            Value::Object(map) => {
                if let Some(Value::Object(properties)) = map.get_mut(PROPERTIES_KEY) {
                    for (key, property) in properties.iter_mut() {
                        let full_path = join_path(&prefix, key);
                        apply_policy(property, &full_path, tables, &mut report);
                    }
                }
                for (key, child) in map.iter_mut().rev() {
                    if is_container(child) {
                        stack.push((child, join_path(&prefix, key)));
                    }
                }
            }
            Value::Array(items) => {
                for (index, child) in items.iter_mut().enumerate().rev() {
                    if is_container(child) {
                        stack.push((child, join_path(&prefix, &index.to_string())));
                    }
                }
            }
            _ => {}
        }
    }
    report
}

fn is_container(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

fn apply_policy(
    property: &mut Value,
    full_path: &str,
    tables: &ReconciliationTables,
    report: &mut EnrichReport,
) {
    let Value::Object(definition) = property else {
        return;
    };
    report.properties_visited += 1;

    if let Some(key) = tables.prefixes_with_data.get(full_path) {
        let Some(resolved) = tables.result_map.get(key) else {
            return;
        };
        report.matched += 1;
        write_identity(definition, resolved);
        match resolved.descriptor.permissible_values.as_deref() {
            Some(values) if !values.is_empty() => {
                let values = values.iter().cloned().map(Value::String).collect();
                definition.insert(ENUM_KEY.to_string(), Value::Array(values));
                report.enums_replaced += 1;
            }
            Some(_) => {
                if has_enum(definition) {
                    definition.shift_remove(ENUM_KEY);
                    definition.insert(TYPE_KEY.to_string(), Value::String("string".to_string()));
                    report.enums_cleared += 1;
                }
            }
            None => {}
        }
    } else if let Some(key) = tables.prefixes_without_data.get(full_path) {
        report.matched_without_data += 1;
        if has_enum(definition) {
            definition.insert(
                ENUM_KEY.to_string(),
                Value::Array(vec![Value::String(FALLBACK_MESSAGE.to_string())]),
            );
            report.fallbacks_applied += 1;
            log_unmatched(full_path, key);
        }
    }
}

/// A `null` enum is treated as no enum at all.
fn has_enum(definition: &Map<String, Value>) -> bool {
    definition
        .get(ENUM_KEY)
        .is_some_and(|values| !values.is_null())
}

fn write_identity(definition: &mut Map<String, Value>, resolved: &ResolvedCde) {
    let descriptor = &resolved.descriptor;
    let fields = [
        ("CDEFullName", descriptor.full_name.clone()),
        ("CDECode", descriptor.code.clone()),
        (
            "CDEPublicID",
            cde_public_url(&descriptor.code, &descriptor.version),
        ),
        ("CDEVersion", descriptor.version.clone()),
        ("CDEOrigin", resolved.origin.clone()),
    ];
    for (name, value) in fields {
        definition.insert(name.to_string(), Value::String(value));
    }
}

fn log_unmatched(full_path: &str, key: &BindingKey) {
    tracing::warn!(
        property = full_path,
        code = %key.cde.code,
        version = %key.cde.version,
        "no vocabulary entry for bound property; using fallback enum"
    );
}

#[cfg(test)]
#[path = "enrich_tests.rs"]
mod tests;
