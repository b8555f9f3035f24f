use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::broker::RawRecord;
use crate::error::ParseError;
use crate::serialization::{deserialize_flexible_f64, deserialize_flexible_string};

/// Fields a record must carry to be classified.
pub const REQUIRED_FIELDS: [&str; 4] = ["uid", "key", "comment", "value"];

/// A record headed for classification. Fields beyond the required four are discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiableMessage {
    uid: Value,
    key: String,
    comment: Value,
    value: f64,
    running_total: Option<f64>,
    storage_id: Option<String>,
}

#[derive(Deserialize)]
struct MessageFields {
    uid: Value,
    #[serde(deserialize_with = "deserialize_flexible_string")]
    key: String,
    comment: Value,
    #[serde(deserialize_with = "deserialize_flexible_f64")]
    value: f64,
}

#[derive(Serialize)]
struct AcceptedForm<'a> {
    uid: &'a Value,
    key: &'a str,
    comment: &'a Value,
    value: f64,
    uuid: Option<&'a str>,
}

#[derive(Serialize)]
struct RejectedForm<'a> {
    uid: &'a Value,
    key: &'a str,
    comment: &'a Value,
    value: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredForm<'a> {
    uid: &'a Value,
    key: &'a str,
    comment: &'a Value,
    value: f64,
    running_total_value: Option<f64>,
}

impl ClassifiableMessage {
    pub fn new(uid: Value, key: impl Into<String>, comment: Value, value: f64) -> Self {
        Self {
            uid,
            key: key.into(),
            comment,
            value,
            running_total: None,
            storage_id: None,
        }
    }

    pub fn parse(raw: &RawRecord) -> Result<Self, ParseError> {
        let parsed: Value = serde_json::from_str(raw.payload())
            .map_err(|e| ParseError::InvalidJson(e.to_string()))?;

        let missing: Vec<String> = match &parsed {
            Value::Object(object) => REQUIRED_FIELDS
                .iter()
                .filter(|field| !object.contains_key(**field))
                .map(|field| field.to_string())
                .collect(),
            _ => return Err(ParseError::NotAnObject),
        };
        if !missing.is_empty() {
            return Err(ParseError::MissingFields(missing));
        }

        let fields: MessageFields =
            serde_json::from_value(parsed).map_err(|e| ParseError::InvalidField(e.to_string()))?;
        Ok(Self::new(fields.uid, fields.key, fields.comment, fields.value))
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn running_total(&self) -> Option<f64> {
        self.running_total
    }

    pub fn storage_id(&self) -> Option<&str> {
        self.storage_id.as_deref()
    }

    pub(crate) fn set_running_total(&mut self, total: f64) {
        self.running_total = Some(total);
    }

    pub(crate) fn set_storage_id(&mut self, id: String) {
        self.storage_id = Some(id);
    }

    /// `{uid, key, comment, value, uuid}`, where `uuid` is the storage id or null.
    pub fn accepted_form(&self) -> impl Serialize + '_ {
        AcceptedForm {
            uid: &self.uid,
            key: &self.key,
            comment: &self.comment,
            value: self.value,
            uuid: self.storage_id.as_deref(),
        }
    }

    /// `{uid, key, comment, value}`
    pub fn rejected_form(&self) -> impl Serialize + '_ {
        RejectedForm {
            uid: &self.uid,
            key: &self.key,
            comment: &self.comment,
            value: self.value,
        }
    }

    /// `{uid, key, comment, value, runningTotalValue}`, the shape written to the blob store.
    pub fn stored_form(&self) -> impl Serialize + '_ {
        StoredForm {
            uid: &self.uid,
            key: &self.key,
            comment: &self.comment,
            value: self.value,
            running_total_value: self.running_total,
        }
    }
}
