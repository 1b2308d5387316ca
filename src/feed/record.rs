//! Raw change records as served by the feed, and the observations derived
//! from them.

use serde::{Deserialize, Deserializer, Serialize};

use crate::ml::labels::LabelSet;

/// One entry of the recent-changes list.
///
/// Sizes default to zero and strings to empty when the API omits them, as it
/// does for hidden users or comments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawChange {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub oldlen: i64,
    #[serde(default)]
    pub newlen: i64,
    #[serde(default)]
    pub parsedcomment: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub bot: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub minor: bool,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub new: bool,
}

/// Flags come as booleans under `formatversion=2` and as empty strings
/// (present means set) under the legacy format.
fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(!matches!(
        value,
        None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false))
    ))
}

/// A change reduced to what the classifier consumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    /// `newlen - oldlen`, in bytes.
    pub length_delta: i64,
    pub comment: String,
    pub username: String,
    pub title: String,
    pub labels: LabelSet,
}

impl From<RawChange> for Observation {
    fn from(raw: RawChange) -> Self {
        Self {
            length_delta: raw.newlen - raw.oldlen,
            comment: raw.parsedcomment,
            username: raw.user,
            title: raw.title,
            labels: LabelSet::new(raw.bot, raw.minor, raw.new),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_flags() {
        let json = r#"{"title":"A","user":"B","oldlen":10,"newlen":4,
            "parsedcomment":"c","bot":true,"minor":false}"#;
        let raw: RawChange = serde_json::from_str(json).unwrap();
        assert!(raw.bot);
        assert!(!raw.minor);
        assert!(!raw.new);
    }

    #[test]
    fn test_legacy_presence_flags() {
        let raw: RawChange =
            serde_json::from_str(r#"{"title":"A","user":"B","minor":"","new":""}"#).unwrap();
        assert!(!raw.bot);
        assert!(raw.minor);
        assert!(raw.new);
    }

    #[test]
    fn test_missing_fields_default() {
        let raw: RawChange = serde_json::from_str(r#"{"type":"log","bot":null}"#).unwrap();
        assert_eq!(raw, RawChange::default());
    }

    #[test]
    fn test_observation_from_raw() {
        let raw = RawChange {
            title: "Main Page".to_string(),
            user: "Example".to_string(),
            oldlen: 120,
            newlen: 100,
            parsedcomment: "trim".to_string(),
            bot: false,
            minor: true,
            new: false,
        };
        let obs = Observation::from(raw);
        assert_eq!(obs.length_delta, -20);
        assert_eq!(obs.comment, "trim");
        assert_eq!(obs.username, "Example");
        assert_eq!(obs.labels, LabelSet::new(false, true, false));
    }

    #[test]
    fn test_serialized_record_reads_back() {
        let raw = RawChange {
            title: "T".to_string(),
            new: true,
            ..Default::default()
        };
        let line = serde_json::to_string(&raw).unwrap();
        let back: RawChange = serde_json::from_str(&line).unwrap();
        assert_eq!(back, raw);
    }
}
