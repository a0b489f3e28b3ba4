//! Object storage for uploaded résumés.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::intake::resume::ResumeFile;

/// Upload gives a file a stable URL; download reads it back by that URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, preset: &str, file: &ResumeFile) -> Result<String, AppError>;

    /// `None` when the URL is not one this store issued or the object is gone.
    async fn download(&self, url: &str) -> Result<Option<ResumeFile>, AppError>;
}

/// S3 / MinIO backed store. URLs are `<public_url>/<bucket>/<key>`.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_url: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_url: String) -> Self {
        Self {
            client,
            bucket,
            public_url,
        }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, preset: &str, file: &ResumeFile) -> Result<String, AppError> {
        let key = object_key(preset, Uuid::new_v4(), &file.file_name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(file.bytes.clone()))
            .content_type(
                file.content_type
                    .as_deref()
                    .unwrap_or("application/octet-stream"),
            )
            .send()
            .await
            .map_err(|e| AppError::S3(format!("Résumé upload failed: {e}")))?;

        info!("Uploaded résumé to s3://{}/{}", self.bucket, key);

        Ok(public_url(&self.public_url, &self.bucket, &key))
    }

    async fn download(&self, url: &str) -> Result<Option<ResumeFile>, AppError> {
        let Some(key) = key_from_url(&self.public_url, &self.bucket, url) else {
            return Ok(None);
        };

        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|e| e.is_no_such_key()) => {
                return Ok(None)
            }
            Err(e) => return Err(AppError::S3(format!("Résumé download failed: {e}"))),
        };

        let content_type = output.content_type().map(str::to_string);
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| AppError::S3(format!("Résumé download failed: {e}")))?
            .into_bytes();

        debug!("Downloaded s3://{}/{} ({} bytes)", self.bucket, key, bytes.len());

        Ok(Some(ResumeFile {
            file_name: key.rsplit('/').next().unwrap_or(key).to_string(),
            content_type,
            bytes,
        }))
    }
}

/// `<preset>/<id>-<file name>` with anything outside `[A-Za-z0-9._-]` replaced.
pub fn object_key(preset: &str, id: Uuid, file_name: &str) -> String {
    let mut safe: String = file_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.trim_matches(|c| c == '.' || c == '_').is_empty() {
        safe = "resume".to_string();
    }
    format!("{}/{}-{}", preset.trim_matches('/'), id, safe)
}

fn public_url(base: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, key)
}

/// Inverse of `public_url`.
fn key_from_url<'a>(base: &str, bucket: &str, url: &'a str) -> Option<&'a str> {
    let key = url
        .strip_prefix(base.trim_end_matches('/'))?
        .strip_prefix('/')?
        .strip_prefix(bucket)?
        .strip_prefix('/')?;
    (!key.is_empty()).then_some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_sanitizes_file_name() {
        let id = Uuid::nil();
        assert_eq!(
            object_key("resumes", id, "Jane Doe (final).pdf"),
            format!("resumes/{id}-Jane_Doe__final_.pdf")
        );
    }

    #[test]
    fn test_object_key_blocks_path_traversal() {
        let key = object_key("resumes/", Uuid::nil(), "../../etc/passwd");
        assert!(!key.contains("../"));
        assert!(key.starts_with("resumes/"));
    }

    #[test]
    fn test_object_key_falls_back_for_empty_name() {
        let key = object_key("resumes", Uuid::nil(), "");
        assert!(key.ends_with("-resume"));
    }

    #[test]
    fn test_public_url_joins_without_double_slash() {
        assert_eq!(
            public_url("http://localhost:9000/", "mockprep", "resumes/a.pdf"),
            "http://localhost:9000/mockprep/resumes/a.pdf"
        );
    }

    #[test]
    fn test_key_is_recovered_from_issued_url() {
        let key = object_key("resumes", Uuid::nil(), "cv.pdf");
        let url = public_url("http://localhost:9000/", "mockprep", &key);
        assert_eq!(
            key_from_url("http://localhost:9000", "mockprep", &url),
            Some(key.as_str())
        );
    }

    #[test]
    fn test_foreign_urls_have_no_key() {
        let base = "http://localhost:9000";
        assert_eq!(key_from_url(base, "mockprep", "https://cdn.example.com/mockprep/a.pdf"), None);
        assert_eq!(key_from_url(base, "mockprep", "http://localhost:9000/other/a.pdf"), None);
        assert_eq!(key_from_url(base, "mockprep", "http://localhost:9000/mockprep/"), None);
    }
}
