//! Facet filter configuration derived from a model's navigator config.
//!
//! The facet list lives under `facetFilterSearchData` as
//! `[{datafield, checkboxItems: [{name}]}]`. Only null/array checks are
//! applied; anything else degrades to an empty result.
use serde::Serialize;
use serde_json::{Map, Value};

/// Key of the facet list inside the navigator configuration.
pub const FACET_SEARCH_KEY: &str = "facetFilterSearchData";
/// Container key used for facets without a `datafield`.
pub const BASE_FACET: &str = "base";

/// Both filter structures handed to the display layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterConfig {
    /// `datafield` to an empty array, in facet order.
    pub containers: Map<String, Value>,
    pub options: Vec<String>,
}

impl FilterConfig {
    pub fn from_navigator_config(dc: Option<&Value>) -> Self {
        Self {
            containers: build_base_filter_containers(dc),
            options: build_filter_options_list(dc),
        }
    }
}

fn facet_entries(dc: Option<&Value>) -> &[Value] {
    dc.and_then(|dc| dc.get(FACET_SEARCH_KEY))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// One empty container per facet `datafield`, keyed in first-seen order.
///
/// Every entry contributes; one without a string `datafield` (including a
/// non-object entry) lands under `"base"`. Duplicates collapse.
pub fn build_base_filter_containers(dc: Option<&Value>) -> Map<String, Value> {
    let mut containers = Map::new();
    for facet in facet_entries(dc) {
        let datafield = facet
            .get("datafield")
            .and_then(Value::as_str)
            .unwrap_or(BASE_FACET);
        containers.insert(datafield.to_string(), Value::Array(Vec::new()));
    }
    containers
}

/// Every checkbox item name across all facets, lower-cased, in encounter order.
pub fn build_filter_options_list(dc: Option<&Value>) -> Vec<String> {
    facet_entries(dc)
        .iter()
        .filter_map(|facet| facet.get("checkboxItems").and_then(Value::as_array))
        .flatten()
        .filter_map(|item| item.get("name").and_then(Value::as_str))
        .map(str::to_lowercase)
        .collect()
}
