//! Deterministic ids for findings and patches

use magistrat_model::ContentHash;
use serde_json::Value;

/// `finding-<hash>` over the semantic inputs of a finding
#[must_use]
pub fn finding_id(parts: &Value) -> String {
    ContentHash::of_json(parts).prefixed("finding")
}

/// `patch-<hash>` over the originating finding id and op name
#[must_use]
pub fn patch_id(finding_id: &str, op_name: &str) -> String {
    ContentHash::of_json(&serde_json::json!([finding_id, op_name])).prefixed("patch")
}
