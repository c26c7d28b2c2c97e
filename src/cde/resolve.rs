//! Reconcile a binding map against the vocabulary response.
//!
//! Produces three tables consumed by the dictionary walk. Tables are built
//! fresh for every enrichment run and never persisted.
use super::types::{BindingKey, BindingMap, CdeDescriptor, CodeVersion};
use std::collections::BTreeMap;

/// A descriptor matched to a binding, carrying the binding's origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCde {
    pub descriptor: CdeDescriptor,
    pub origin: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationTables {
    /// Binding key to matched descriptor.
    pub result_map: BTreeMap<BindingKey, ResolvedCde>,
    /// Property path to binding key, for bindings found in the response.
    pub prefixes_with_data: BTreeMap<String, BindingKey>,
    /// Property path to binding key, for bindings missing from the response.
    pub prefixes_without_data: BTreeMap<String, BindingKey>,
}

/// Build the reconciliation tables for one enrichment run.
///
/// A path lands in exactly one prefix table; a later binding for the same
/// path replaces the earlier one.
pub fn resolve_bindings(bindings: &BindingMap, response: &[CdeDescriptor]) -> ReconciliationTables {
    let index: BTreeMap<CodeVersion, &CdeDescriptor> = response
        .iter()
        .map(|descriptor| (descriptor.code_version(), descriptor))
        .collect();

    let mut tables = ReconciliationTables::default();
    for (key, binding) in bindings {
        match index.get(&key.cde) {
            Some(descriptor) => {
                tables.result_map.insert(
                    key.clone(),
                    ResolvedCde {
                        descriptor: (*descriptor).clone(),
                        origin: binding.origin.clone(),
                    },
                );
                tables.prefixes_without_data.remove(&key.path);
                tables
                    .prefixes_with_data
                    .insert(key.path.clone(), key.clone());
            }
            None => {
                tables.prefixes_with_data.remove(&key.path);
                tables
                    .prefixes_without_data
                    .insert(key.path.clone(), key.clone());
            }
        }
    }
    tracing::debug!(
        bindings = bindings.len(),
        descriptors = response.len(),
        with_data = tables.prefixes_with_data.len(),
        without_data = tables.prefixes_without_data.len(),
        "bindings resolved"
    );
    tables
}
