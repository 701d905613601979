use super::{ObjectStore, StorageError, validate_name};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

/// Objects in a Supabase storage bucket, addressed through its REST API.
pub struct BucketStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl BucketStore {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: &str, bucket: &str) -> Self {
        BucketStore {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key: api_key.to_owned(),
            bucket: bucket.to_owned(),
        }
    }

    fn object_url(&self, name: &str) -> Result<String, StorageError> {
        validate_name(name)?;
        Ok(format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, name
        ))
    }
}

impl ObjectStore for BucketStore {
    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let url = self.object_url(name)?;
        let size = bytes.len();

        let res = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("apikey", &self.api_key)
            .header("x-upsert", "true")
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                error!(name, bucket = %self.bucket, "upload failed: {e}");
                StorageError::from(e)
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!(name, bucket = %self.bucket, %status, "upload rejected: {body}");
            return Err(StorageError::Backend(format!(
                "upload of {name} rejected with {status}: {body}"
            )));
        }

        debug!(name, bucket = %self.bucket, bytes = size, "uploaded object");
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.object_url(name)?;

        let res = self
            .client
            .get(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header("apikey", &self.api_key)
            .send()
            .await
            .map_err(|e| {
                error!(name, bucket = %self.bucket, "download failed: {e}");
                StorageError::from(e)
            })?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            if is_missing_object(status, &body) {
                return Err(StorageError::NotFound(name.to_owned()));
            }
            error!(name, bucket = %self.bucket, %status, "download rejected: {body}");
            return Err(StorageError::Backend(format!(
                "download of {name} rejected with {status}: {body}"
            )));
        }

        let bytes = res.bytes().await?;
        if bytes.is_empty() {
            return Err(StorageError::NotFound(name.to_owned()));
        }
        Ok(bytes.to_vec())
    }
}

/// Supabase answers a missing object with either a plain 404 or a 400 whose
/// JSON body carries `"statusCode": "404"` / `"error": "not_found"`. A missing
/// bucket is a configuration problem and stays a backend error.
fn is_missing_object(status: StatusCode, body: &str) -> bool {
    let body = body.to_ascii_lowercase();
    if body.contains("bucket not found") {
        return false;
    }
    match status {
        StatusCode::NOT_FOUND => true,
        StatusCode::BAD_REQUEST => body.contains("\"not_found\"") || body.contains("\"404\""),
        _ => false,
    }
}
