//! Form snapshot model and its text-tier encoding.
//!
//! A snapshot is stored as a single JSON object: the caller's fields plus an
//! injected `savedAt` timestamp. The timestamp is stripped again on decode so
//! callers only ever see their own fields.

use crate::error::{FormsafeError, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// Key under which the save timestamp is injected.
pub const SAVED_AT_KEY: &str = "savedAt";

/// Field name to value mapping for one form.
pub type FormFields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct FormSnapshot {
    pub fields: FormFields,
    pub saved_at: DateTime<Utc>,
}

impl FormSnapshot {
    pub fn new(fields: FormFields, saved_at: DateTime<Utc>) -> Self {
        Self { fields, saved_at }
    }

    /// Serializes the snapshot with `savedAt` injected as an RFC 3339 string.
    pub fn encode(&self) -> Result<String> {
        let mut object = self.fields.clone();
        object.insert(
            SAVED_AT_KEY.to_string(),
            Value::String(self.saved_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        Ok(serde_json::to_string(&Value::Object(object))?)
    }

    /// Parses a stored snapshot, removing the injected `savedAt` key.
    pub fn decode(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)?;
        let Value::Object(mut fields) = value else {
            return Err(FormsafeError::json("stored snapshot is not a JSON object"));
        };

        let saved_at = match fields.remove(SAVED_AT_KEY) {
            Some(Value::String(stamp)) => DateTime::parse_from_rfc3339(&stamp)
                .map_err(|e| FormsafeError::json(format!("invalid savedAt '{}': {}", stamp, e)))?
                .with_timezone(&Utc),
            Some(other) => {
                return Err(FormsafeError::json(format!(
                    "savedAt must be a string, got {}",
                    other
                )));
            }
            None => return Err(FormsafeError::json("stored snapshot has no savedAt")),
        };

        Ok(Self { fields, saved_at })
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.saved_at
    }

    /// A snapshot is expired once its age is strictly greater than `expiry`.
    pub fn is_expired(&self, now: DateTime<Utc>, expiry: Duration) -> bool {
        self.age(now) > expiry
    }
}

/// Whether a field value counts as user input.
///
/// `null`, empty strings, empty arrays and empty objects do not.
pub fn has_content(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fields(value: Value) -> FormFields {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_encode_injects_saved_at() {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        let snapshot = FormSnapshot::new(fields(json!({"name": "Ada"})), at);

        let raw = snapshot.encode().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["name"], "Ada");
        assert_eq!(value["savedAt"], "2026-10-19T08:30:00.000Z");
    }

    #[test]
    fn test_decode_strips_saved_at() {
        let raw = r#"{"name":"Ada","tags":["a"],"savedAt":"2026-10-19T08:30:00.000Z"}"#;
        let snapshot = FormSnapshot::decode(raw).unwrap();

        assert!(!snapshot.fields.contains_key(SAVED_AT_KEY));
        assert_eq!(snapshot.fields["tags"], json!(["a"]));
        assert_eq!(
            snapshot.saved_at,
            Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(FormSnapshot::decode("not json").unwrap_err().is_serialization());
        assert!(FormSnapshot::decode("[1,2]").unwrap_err().is_serialization());
        assert!(FormSnapshot::decode(r#"{"name":"x"}"#)
            .unwrap_err()
            .is_serialization());
        assert!(FormSnapshot::decode(r#"{"savedAt":"yesterday"}"#)
            .unwrap_err()
            .is_serialization());
    }

    #[test]
    fn test_expiry_is_strict() {
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        let expiry = Duration::hours(1);

        let exact = FormSnapshot::new(FormFields::new(), now - expiry);
        assert!(!exact.is_expired(now, expiry));

        let older = FormSnapshot::new(FormFields::new(), now - expiry - Duration::milliseconds(1));
        assert!(older.is_expired(now, expiry));
    }

    #[test]
    fn test_has_content() {
        assert!(!has_content(&Value::Null));
        assert!(!has_content(&json!("")));
        assert!(!has_content(&json!([])));
        assert!(!has_content(&json!({})));
        assert!(has_content(&json!(0)));
        assert!(has_content(&json!(false)));
        assert!(has_content(&json!("a")));
    }
}
