//! Document-state persistence
//!
//! State lives as JSON inside the host's document carrier text, between two
//! marker comments. Text outside the markers is preserved on save.

use crate::error::StateStoreError;
use crate::host::DocumentCarrier;
use chrono::Utc;
use magistrat_model::{Coverage, DocumentState, STATE_SCHEMA_VERSION};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub const STATE_START: &str = "<!-- MAGISTRAT_STATE_V1_START -->";
pub const STATE_END: &str = "<!-- MAGISTRAT_STATE_V1_END -->";

/// JSON between the markers, trimmed; `None` when either marker is missing
#[must_use]
pub fn extract_state_json(carrier: &str) -> Option<&str> {
    let start = carrier.find(STATE_START)? + STATE_START.len();
    let end = carrier[start..].find(STATE_END)? + start;
    Some(carrier[start..end].trim())
}

/// Replace the state block, or append one when absent
#[must_use]
pub fn upsert_state_block(carrier: &str, json: &str) -> String {
    let block = format!("{STATE_START}\n{json}\n{STATE_END}");
    let Some(start) = carrier.find(STATE_START) else {
        return if carrier.is_empty() {
            block
        } else {
            format!("{carrier}\n{block}")
        };
    };
    let body = start + STATE_START.len();
    match carrier[body..].find(STATE_END) {
        Some(offset) => {
            let after = body + offset + STATE_END.len();
            format!("{}{block}{}", &carrier[..start], &carrier[after..])
        }
        None => format!("{}{block}", &carrier[..start]),
    }
}

/// Fill fields older writers left out
///
/// A coverage block without `notAnalyzedObjects` gets the count of distinct
/// objects with NOT_ANALYZED findings; one without `continuityStatus` is
/// treated as never having run continuity.
///
/// # Errors
/// Returns error when the value is not a document state
pub fn migrate_state(raw: Value) -> Result<DocumentState, serde_json::Error> {
    let written = |key: &str| {
        raw.get("coverage")
            .and_then(Value::as_object)
            .is_some_and(|coverage| coverage.contains_key(key))
    };
    let has_not_analyzed = written("notAnalyzedObjects");
    let has_continuity = written("continuityStatus");

    let mut state: DocumentState = serde_json::from_value(raw)?;
    if let Some(snapshot) = state.coverage.as_mut() {
        if !has_not_analyzed {
            snapshot.not_analyzed_objects = state
                .findings
                .iter()
                .filter(|f| f.coverage == Coverage::NotAnalyzed)
                .filter_map(|f| f.object_id.as_deref().map(|o| (f.slide_id.as_str(), o)))
                .collect::<BTreeSet<_>>()
                .len();
        }
        if !has_continuity {
            snapshot.continuity_coverage = 0.0;
        }
    }
    Ok(state)
}

/// Loads and saves [`DocumentState`] through an optional carrier
///
/// Without a carrier, state is kept in memory only.
pub struct StateStore {
    carrier: Option<Arc<dyn DocumentCarrier>>,
    cached: Mutex<Option<DocumentState>>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("has_carrier", &self.carrier.is_some())
            .finish_non_exhaustive()
    }
}

impl StateStore {
    #[must_use]
    pub fn new(carrier: Arc<dyn DocumentCarrier>) -> Self {
        Self {
            carrier: Some(carrier),
            cached: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            carrier: None,
            cached: Mutex::new(None),
        }
    }

    fn cached_or_default(&self) -> DocumentState {
        self.cached.lock().clone().unwrap_or_default()
    }

    /// Current state; falls back to the last cached or default state when
    /// the carrier is unreadable or holds no valid block
    pub async fn load(&self) -> DocumentState {
        let Some(carrier) = &self.carrier else {
            return self.cached_or_default();
        };
        let text = match carrier.read_carrier().await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "document carrier unreadable, using cached state");
                return self.cached_or_default();
            }
        };
        let Some(json) = extract_state_json(&text) else {
            debug!("no state block in document carrier");
            return self.cached_or_default();
        };
        let parsed = serde_json::from_str::<Value>(json).and_then(migrate_state);
        match parsed {
            Ok(state) => {
                debug!(
                    findings = state.findings.len(),
                    patch_log = state.patch_log.len(),
                    "document state loaded"
                );
                *self.cached.lock() = Some(state.clone());
                state
            }
            Err(err) => {
                warn!(error = %err, "state block unparseable, using cached state");
                self.cached_or_default()
            }
        }
    }

    /// Stamp and persist; returns the state as written
    ///
    /// # Errors
    /// Returns error when serialization or a carrier call fails
    pub async fn save(&self, state: DocumentState) -> Result<DocumentState, StateStoreError> {
        let state = DocumentState {
            schema_version: STATE_SCHEMA_VERSION,
            last_updated: Utc::now(),
            ..state
        };
        if let Some(carrier) = &self.carrier {
            let json = serde_json::to_string(&state)?;
            let current = carrier.read_carrier().await?;
            carrier
                .write_carrier(&upsert_state_block(&current, &json))
                .await?;
            debug!(bytes = json.len(), "document state saved");
        }
        *self.cached.lock() = Some(state.clone());
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_requires_both_markers() {
        assert_eq!(extract_state_json("notes"), None);
        assert_eq!(extract_state_json(&format!("{STATE_START} {{}}")), None);
        let carrier = format!("intro\n{STATE_START}\n{{\"a\":1}}\n{STATE_END}\noutro");
        assert_eq!(extract_state_json(&carrier), Some("{\"a\":1}"));
    }

    #[test]
    fn upsert_preserves_surrounding_text() {
        assert_eq!(
            upsert_state_block("", "{}"),
            format!("{STATE_START}\n{{}}\n{STATE_END}")
        );
        let appended = upsert_state_block("speaker notes", "{}");
        assert!(appended.starts_with("speaker notes\n"));

        let replaced = upsert_state_block(&format!("before {STATE_START}\nold\n{STATE_END} after"), "new");
        assert_eq!(replaced, format!("before {STATE_START}\nnew\n{STATE_END} after"));

        let unterminated = upsert_state_block(&format!("keep {STATE_START} dangling"), "new");
        assert_eq!(unterminated, format!("keep {STATE_START}\nnew\n{STATE_END}"));
    }

    #[test]
    fn migration_backfills_legacy_coverage() {
        let raw = json!({
            "schemaVersion": 1,
            "lastUpdated": "2026-01-02T03:04:05Z",
            "findings": [
                {
                    "id": "f1", "ruleId": "BP-COVERAGE-001", "source": "playbook",
                    "slideId": "s1", "objectId": "o1",
                    "observed": {}, "expected": {},
                    "evidence": [{"type": "HYGIENE_EVIDENCE", "summary": "x"}],
                    "confidence": 1.0, "risk": "manual", "severity": "info",
                    "coverage": "NOT_ANALYZED", "notAnalyzedReason": "API_LIMITATION"
                }
            ],
            "coverage": {"analyzedSlides": 1, "totalSlides": 1, "continuityCoverage": 1.0}
        });
        let state = migrate_state(raw).unwrap();
        let coverage = state.coverage.unwrap();
        assert_eq!(coverage.not_analyzed_objects, 1);
        assert_eq!(coverage.continuity_coverage, 0.0);
    }

    #[test]
    fn migration_keeps_data_when_timestamp_missing() {
        let raw = json!({
            "schemaVersion": 1,
            "findings": [],
            "patchLog": [],
            "styleMap": {
                "TITLE": {
                    "fontFamily": "Aptos Display", "fontSizePt": 30.0,
                    "bold": true, "italic": false, "fontColor": "#1F1F1F"
                }
            }
        });
        let state = migrate_state(raw).unwrap();
        assert!(state.style_map.is_some_and(|m| m.len() == 1));
        assert_eq!(state.schema_version, STATE_SCHEMA_VERSION);
    }
}
