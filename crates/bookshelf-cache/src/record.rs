//! Conversion between serde structs and flat string field maps.
//!
//! Every field is stored as a string: strings as-is, everything else as its
//! JSON text. Records should therefore use string-like field types
//! (`String`, `Uuid`, unit enums, `DateTime<Utc>`).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::store::{CacheError, Fields};

pub fn encode_record<T: Serialize>(record: &T) -> Result<Fields, CacheError> {
    match serde_json::to_value(record)? {
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(name, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (name, text)
            })
            .collect()),
        other => Err(CacheError::Malformed(format!(
            "expected a struct, got {}",
            other
        ))),
    }
}

pub fn decode_record<T: DeserializeOwned>(fields: Fields) -> Result<T, CacheError> {
    let map: Map<String, Value> = fields
        .into_iter()
        .map(|(name, text)| (name, Value::String(text)))
        .collect();

    Ok(serde_json::from_value(Value::Object(map))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    enum Kind {
        Primary,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        owner: String,
        kind: Kind,
        expires_at: DateTime<Utc>,
    }

    #[test]
    fn test_encode_flattens_to_strings() {
        let expires_at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let fields = encode_record(&Sample {
            owner: "u1".into(),
            kind: Kind::Primary,
            expires_at,
        })
        .unwrap();

        assert_eq!(fields["owner"], "u1");
        assert_eq!(fields["kind"], "primary");
        assert_eq!(fields["expires_at"], "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_decode_reads_stored_fields() {
        let fields = Fields::from([
            ("owner".to_string(), "u2".to_string()),
            ("kind".to_string(), "primary".to_string()),
            ("expires_at".to_string(), "2023-11-14T22:13:20Z".to_string()),
        ]);

        let sample: Sample = decode_record(fields).unwrap();

        assert_eq!(sample.owner, "u2");
        assert_eq!(sample.kind, Kind::Primary);
        assert_eq!(sample.expires_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_decode_missing_field_fails() {
        let fields = Fields::from([("owner".to_string(), "u3".to_string())]);

        let result: Result<Sample, _> = decode_record(fields);

        assert!(matches!(result, Err(CacheError::Serialization(_))));
    }

    #[test]
    fn test_encode_rejects_non_struct() {
        let result = encode_record(&"just a string");
        assert!(matches!(result, Err(CacheError::Malformed(_))));
    }
}
