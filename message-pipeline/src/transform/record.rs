use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::RawRecord;
use crate::error::ParseError;
use crate::serialization::{
    deserialize_flexible_f64, deserialize_flexible_i64, deserialize_flexible_option_f64,
    deserialize_flexible_string,
};

/// A versioned value for a key. This is also the form kept in the cache and republished.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalRecord {
    #[serde(deserialize_with = "deserialize_flexible_string")]
    pub key: String,
    #[serde(deserialize_with = "deserialize_flexible_i64")]
    pub version: i64,
    #[serde(deserialize_with = "deserialize_flexible_f64")]
    pub value: f64,
}

/// Marks a key for removal from the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct TombstoneRecord {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransformRecord {
    Normal(NormalRecord),
    Tombstone(TombstoneRecord),
}

#[derive(Deserialize)]
struct TombstoneFields {
    #[serde(deserialize_with = "deserialize_flexible_string")]
    key: String,
    #[serde(default, deserialize_with = "deserialize_flexible_option_f64")]
    value: Option<f64>,
    #[serde(
        rename = "TOTAL",
        default,
        deserialize_with = "deserialize_flexible_option_f64"
    )]
    total: Option<f64>,
}

impl TransformRecord {
    /// A record with `key`, `version` and `value` is a Normal. Anything else that has a
    /// `key` is a Tombstone, valued from `TOTAL`, then `value`, then zero.
    pub fn parse(raw: &RawRecord) -> Result<Self, ParseError> {
        let parsed: Value = serde_json::from_str(raw.payload())
            .map_err(|e| ParseError::InvalidJson(e.to_string()))?;

        let is_normal = match &parsed {
            Value::Object(object) => {
                if !object.contains_key("key") {
                    return Err(ParseError::MissingFields(vec!["key".to_string()]));
                }
                object.contains_key("version") && object.contains_key("value")
            }
            _ => return Err(ParseError::NotAnObject),
        };

        if is_normal {
            let normal: NormalRecord = serde_json::from_value(parsed)
                .map_err(|e| ParseError::InvalidField(e.to_string()))?;
            return Ok(TransformRecord::Normal(normal));
        }

        let fields: TombstoneFields =
            serde_json::from_value(parsed).map_err(|e| ParseError::InvalidField(e.to_string()))?;
        Ok(TransformRecord::Tombstone(TombstoneRecord {
            key: fields.key,
            value: fields.total.or(fields.value).unwrap_or(0.0),
        }))
    }

    pub fn key(&self) -> &str {
        match self {
            TransformRecord::Normal(normal) => &normal.key,
            TransformRecord::Tombstone(tombstone) => &tombstone.key,
        }
    }
}
