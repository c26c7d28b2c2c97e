//! CDE (Common Data Element) reconciliation.
//!
//! A binding map ties dictionary property paths to CDE code/version pairs.
//! The vocabulary service's descriptors are matched against those bindings,
//! then the dictionary walk rewrites each bound property's enum, type, and
//! identity fields under a fixed precedence policy.
mod enrich;
mod resolve;
mod types;

pub use enrich::update_enums;
pub use types::{parse_binding_map, parse_descriptors, requested_codes, CodeVersion};
