//! Serializable achievement progress snapshot.
//!
//! The JSON shape is the persisted format and must stay stable:
//!
//! ```json
//! {
//!   "schemaVersion": "achv-snap-v1",
//!   "completedIds": ["first_blood"],
//!   "progress": {
//!     "speedrun": {
//!       "primed": false,
//!       "remembered": { "kind": "int", "i64": 12, "f64": 0.0 },
//!       "conditions": [{ "hits": 3, "isMet": true }],
//!       "measuredCurrent": 0.0,
//!       "measuredTarget": 0.0,
//!       "measuredActive": false,
//!       "measuredIsPercent": false
//!     }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::numeric::Numeric;

/// Schema tag written into every snapshot.
pub const STATE_SCHEMA_VERSION: &str = "achv-snap-v1";

fn default_schema_version() -> String {
    STATE_SCHEMA_VERSION.to_string()
}

/// Progress of every achievement known to an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    /// Ids of achievements that have already unlocked.
    #[serde(default)]
    pub completed_ids: Vec<String>,
    /// Runtime state of achievements that have not unlocked yet.
    #[serde(default)]
    pub progress: BTreeMap<String, AchievementProgress>,
}

impl Default for StateSnapshot {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            completed_ids: Vec::new(),
            progress: BTreeMap::new(),
        }
    }
}

impl StateSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn is_current_schema(&self) -> bool {
        self.schema_version == STATE_SCHEMA_VERSION
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementProgress {
    #[serde(default)]
    pub primed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remembered: Option<StoredNumber>,
    #[serde(default)]
    pub conditions: Vec<ConditionProgress>,
    #[serde(default)]
    pub measured_current: f64,
    #[serde(default)]
    pub measured_target: f64,
    #[serde(default)]
    pub measured_active: bool,
    #[serde(default)]
    pub measured_is_percent: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionProgress {
    #[serde(default)]
    pub hits: u32,
    #[serde(default)]
    pub is_met: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberKind {
    #[default]
    Int,
    Float,
}

/// Wire form of a [`Numeric`]. Both payload slots are always written; `kind` selects one.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StoredNumber {
    #[serde(default)]
    pub kind: NumberKind,
    #[serde(rename = "i64", default)]
    pub int_value: i64,
    #[serde(rename = "f64", default)]
    pub float_value: f64,
}

impl From<Numeric> for StoredNumber {
    fn from(value: Numeric) -> Self {
        match value {
            Numeric::Integer(v) => Self {
                kind: NumberKind::Int,
                int_value: v,
                float_value: 0.0,
            },
            Numeric::Float(v) => Self {
                kind: NumberKind::Float,
                int_value: 0,
                float_value: v,
            },
        }
    }
}

impl From<StoredNumber> for Numeric {
    fn from(stored: StoredNumber) -> Self {
        match stored.kind {
            NumberKind::Int => Numeric::Integer(stored.int_value),
            NumberKind::Float => Numeric::Float(stored.float_value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let mut snapshot = StateSnapshot::default();
        snapshot.completed_ids.push("a".into());
        snapshot.progress.insert(
            "b".into(),
            AchievementProgress {
                primed: true,
                remembered: Some(Numeric::Float(1.5).into()),
                conditions: vec![ConditionProgress { hits: 2, is_met: true }],
                measured_current: 3.0,
                measured_target: 10.0,
                measured_active: true,
                measured_is_percent: false,
            },
        );

        let value: serde_json::Value =
            serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["schemaVersion"], "achv-snap-v1");
        assert_eq!(value["completedIds"][0], "a");
        let b = &value["progress"]["b"];
        assert_eq!(b["remembered"]["kind"], "float");
        assert_eq!(b["remembered"]["f64"], 1.5);
        assert_eq!(b["conditions"][0]["isMet"], true);
        assert_eq!(b["measuredTarget"], 10.0);
        assert_eq!(b["measuredIsPercent"], false);
    }

    #[test]
    fn test_missing_fields_default() {
        let snapshot = StateSnapshot::from_json(r#"{"progress":{"x":{"primed":true}}}"#).unwrap();
        assert!(snapshot.is_current_schema());
        assert!(snapshot.completed_ids.is_empty());
        let x = &snapshot.progress["x"];
        assert!(x.primed);
        assert!(x.remembered.is_none());
        assert!(x.conditions.is_empty());
    }

    #[test]
    fn test_stored_number_conversion() {
        let int: StoredNumber = Numeric::Integer(-4).into();
        assert_eq!(int.kind, NumberKind::Int);
        assert_eq!(Numeric::from(int), Numeric::Integer(-4));

        let parsed: StoredNumber =
            serde_json::from_str(r#"{"kind":"float","i64":0,"f64":2.25}"#).unwrap();
        assert_eq!(Numeric::from(parsed), Numeric::Float(2.25));
    }
}
