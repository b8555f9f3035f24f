use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Blob, BlobError, BlobStore};

const PUT_PATH: &str = "/api/v1/data_definition/blob";
const BLOB_PATH: &str = "/api/v1/blob/";

/// Client for the storage service's blob REST API.
pub struct HttpBlobStore {
    client: reqwest::Client,
    base_url: String,
    owner_uid: String,
}

#[derive(Serialize)]
struct PutBlobRequest<'a> {
    uid: &'a str,
    #[serde(rename = "datasetName")]
    dataset_name: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct GetBlobResponse {
    #[serde(rename = "datasetName")]
    dataset_name: String,
    data: String,
}

impl HttpBlobStore {
    /// `base_url` may omit the scheme, in which case https is assumed. `owner_uid` is sent
    /// with every write to identify the submitter.
    pub fn new(base_url: &str, owner_uid: &str, timeout: Duration) -> Result<Self, BlobError> {
        if base_url.trim().is_empty() {
            return Err(BlobError::InvalidConfiguration(
                "blob store url cannot be empty".to_string(),
            ));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            owner_uid: owner_uid.to_owned(),
        })
    }

    fn blob_url(&self, id: &str) -> String {
        format!("{}{BLOB_PATH}{id}", self.base_url)
    }
}

fn normalize_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_owned()
    } else {
        format!("https://{trimmed}")
    }
}

/// The store answers a put with the bare id, sometimes wrapped in JSON quotes.
fn parse_id(body: &str) -> Result<String, BlobError> {
    let body = body.trim();
    let id = body
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(body);

    if id.is_empty() {
        return Err(BlobError::ParseError("blob store returned an empty id".to_string()));
    }
    Ok(id.to_owned())
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, dataset_name: &str, data: &str) -> Result<String, BlobError> {
        let body = PutBlobRequest {
            uid: &self.owner_uid,
            dataset_name,
            data,
        };

        let response = self
            .client
            .post(format!("{}{PUT_PATH}", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BlobError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let id = parse_id(&response.text().await?)?;
        debug!("Pushed blob to {} as {}", dataset_name, id);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<Blob>, BlobError> {
        let response = self.client.get(self.blob_url(id)).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(BlobError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body: GetBlobResponse = serde_json::from_str(&response.text().await?)?;
        Ok(Some(Blob {
            dataset_name: body.dataset_name,
            data: body.data,
        }))
    }

    async fn delete(&self, id: &str) -> Result<bool, BlobError> {
        let response = self.client.delete(self.blob_url(id)).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(BlobError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        debug!("Deleted blob {}", id);
        Ok(true)
    }
}
