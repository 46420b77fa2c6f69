//! S3-compatible object storage for uploaded images
mod error;

use std::sync::Arc;

use aws_sdk_s3::{
    error::SdkError, operation::head_object::HeadObjectError, primitives::ByteStream,
    Client as S3Client,
};
use tracing::{debug, info};
use url::Url;

pub use error::{StorageError, StorageResult};

/// Metadata returned by the storage service for an uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Bucket the object was written to
    pub bucket: String,
    /// Object key (the uploaded filename)
    pub key: String,
    /// Entity tag reported by the service, if any
    pub e_tag: Option<String>,
    /// Object size in bytes
    pub size: usize,
}

/// Operations the store needs from an object storage service
#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Uploads `bytes` under `filename`. Existing objects are never overwritten.
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> StorageResult<StoredObject>;

    /// Returns the public URL of an existing object
    async fn public_url(&self, bucket: &str, filename: &str) -> StorageResult<String>;

    /// Deletes an object
    async fn remove(&self, bucket: &str, filename: &str) -> StorageResult<()>;
}

/// Rejects keys the storage service would misinterpret
fn validate_key(filename: &str) -> StorageResult<()> {
    if filename.trim().is_empty() {
        return Err(StorageError::InvalidInput(
            "filename must not be empty".to_string(),
        ));
    }
    if filename.starts_with('/') || filename.split('/').any(|segment| segment == "..") {
        return Err(StorageError::InvalidInput(format!(
            "filename is not a relative object key: {filename}"
        )));
    }
    Ok(())
}

/// Guesses the content type from the file extension
fn content_type_for(filename: &str) -> mime::Mime {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("png") => mime::IMAGE_PNG,
        Some("jpg" | "jpeg") => mime::IMAGE_JPEG,
        Some("gif") => mime::IMAGE_GIF,
        Some("svg") => mime::IMAGE_SVG,
        Some("bmp") => mime::IMAGE_BMP,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Builds `{base}/{bucket}/{key}` with every segment percent-encoded
///
/// # Errors
///
/// Returns `StorageError::ConfigError` if `base` is not an absolute URL
pub fn build_public_url(base: &str, bucket: &str, key: &str) -> StorageResult<String> {
    let mut url = Url::parse(base)
        .map_err(|e| StorageError::ConfigError(format!("Invalid public base URL {base}: {e}")))?;

    url.path_segments_mut()
        .map_err(|()| StorageError::ConfigError(format!("Public base URL cannot be a base: {base}")))?
        .pop_if_empty()
        .push(bucket)
        .extend(key.split('/'));

    Ok(url.to_string())
}

/// Object storage client backed by the S3 API
pub struct MediaStorage {
    s3_client: Arc<S3Client>,
    public_base_url: String,
}

impl MediaStorage {
    /// Creates a new media storage client
    ///
    /// # Arguments
    ///
    /// * `s3_client` - Pre-configured S3 client
    /// * `public_base_url` - Base under which objects are publicly reachable
    #[must_use]
    pub const fn new(s3_client: Arc<S3Client>, public_base_url: String) -> Self {
        Self {
            s3_client,
            public_base_url,
        }
    }

    /// Checks if an object exists in the bucket
    ///
    /// # Returns
    ///
    /// * `Ok(true)` if object exists
    /// * `Ok(false)` if object does not exist
    /// * `Err(StorageError)` if the storage operation fails
    ///
    /// # Errors
    ///
    /// Returns `StorageError::S3Error` for storage service errors
    /// Returns `StorageError::UpstreamError` for 5xx errors
    pub async fn check_object_exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let result = self
            .s3_client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
            {
                Ok(false)
            }
            Err(e) => Err(StorageError::from(e)),
        }
    }
}

#[async_trait::async_trait]
impl ObjectStorage for MediaStorage {
    async fn upload(
        &self,
        bucket: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> StorageResult<StoredObject> {
        validate_key(filename)?;

        if self.check_object_exists(bucket, filename).await? {
            return Err(StorageError::ObjectExists(filename.to_string()));
        }

        let size = bytes.len();
        let content_type = content_type_for(filename);
        debug!("Uploading {filename} ({size} bytes, {content_type}) to {bucket}");

        let output = self
            .s3_client
            .put_object()
            .bucket(bucket)
            .key(filename)
            .content_type(content_type.as_ref())
            .body(ByteStream::from(bytes))
            .send()
            .await?;

        info!("Uploaded {filename} to {bucket}");

        Ok(StoredObject {
            bucket: bucket.to_string(),
            key: filename.to_string(),
            e_tag: output.e_tag().map(ToString::to_string),
            size,
        })
    }

    async fn public_url(&self, bucket: &str, filename: &str) -> StorageResult<String> {
        validate_key(filename)?;

        if !self.check_object_exists(bucket, filename).await? {
            return Err(StorageError::NotFound(filename.to_string()));
        }

        build_public_url(&self.public_base_url, bucket, filename)
    }

    async fn remove(&self, bucket: &str, filename: &str) -> StorageResult<()> {
        validate_key(filename)?;

        self.s3_client
            .delete_object()
            .bucket(bucket)
            .key(filename)
            .send()
            .await?;

        debug!("Removed {filename} from {bucket}");
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    //! In-memory [`ObjectStorage`] for tests
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::{
        build_public_url, validate_key, ObjectStorage, StorageError, StorageResult, StoredObject,
    };

    /// In-memory object storage with injectable failures
    pub struct MockObjectStorage {
        public_base_url: String,
        objects: Mutex<HashMap<(String, String), Vec<u8>>>,
        fail_upload: Option<String>,
        fail_public_url: Option<String>,
    }

    impl Default for MockObjectStorage {
        fn default() -> Self {
            Self::new("https://storage.test")
        }
    }

    impl MockObjectStorage {
        /// Empty storage whose public URLs start with `public_base_url`
        #[must_use]
        pub fn new(public_base_url: &str) -> Self {
            Self {
                public_base_url: public_base_url.to_string(),
                objects: Mutex::new(HashMap::new()),
                fail_upload: None,
                fail_public_url: None,
            }
        }

        /// Every upload fails with an upstream error carrying `message`
        #[must_use]
        pub fn failing_upload(mut self, message: &str) -> Self {
            self.fail_upload = Some(message.to_string());
            self
        }

        /// Every public URL lookup fails with an upstream error carrying `message`
        #[must_use]
        pub fn failing_public_url(mut self, message: &str) -> Self {
            self.fail_public_url = Some(message.to_string());
            self
        }

        /// Bytes stored under `bucket`/`key`
        #[must_use]
        pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
            self.objects
                .lock()
                .unwrap()
                .get(&(bucket.to_string(), key.to_string()))
                .cloned()
        }
    }

    #[async_trait::async_trait]
    impl ObjectStorage for MockObjectStorage {
        async fn upload(
            &self,
            bucket: &str,
            filename: &str,
            bytes: Vec<u8>,
        ) -> StorageResult<StoredObject> {
            validate_key(filename)?;
            if let Some(message) = &self.fail_upload {
                return Err(StorageError::UpstreamError(message.clone()));
            }

            let mut objects = self.objects.lock().unwrap();
            let id = (bucket.to_string(), filename.to_string());
            if objects.contains_key(&id) {
                return Err(StorageError::ObjectExists(filename.to_string()));
            }

            let size = bytes.len();
            objects.insert(id, bytes);
            Ok(StoredObject {
                bucket: bucket.to_string(),
                key: filename.to_string(),
                e_tag: None,
                size,
            })
        }

        async fn public_url(&self, bucket: &str, filename: &str) -> StorageResult<String> {
            validate_key(filename)?;
            if let Some(message) = &self.fail_public_url {
                return Err(StorageError::UpstreamError(message.clone()));
            }
            if self.object(bucket, filename).is_none() {
                return Err(StorageError::NotFound(filename.to_string()));
            }
            build_public_url(&self.public_base_url, bucket, filename)
        }

        async fn remove(&self, bucket: &str, filename: &str) -> StorageResult<()> {
            validate_key(filename)?;
            self.objects
                .lock()
                .unwrap()
                .remove(&(bucket.to_string(), filename.to_string()));
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_encodes_segments() {
        assert_eq!(
            build_public_url("https://cdn.example.com", "test-bucket", "my cat.png").unwrap(),
            "https://cdn.example.com/test-bucket/my%20cat.png"
        );
        assert_eq!(
            build_public_url(
                "https://x.supabase.co/storage/v1/object/public/",
                "test-bucket",
                "2024/a.jpg"
            )
            .unwrap(),
            "https://x.supabase.co/storage/v1/object/public/test-bucket/2024/a.jpg"
        );
    }

    #[test]
    fn public_url_rejects_relative_base() {
        assert!(matches!(
            build_public_url("cdn.example.com", "b", "k"),
            Err(StorageError::ConfigError(_))
        ));
    }

    #[test]
    fn keys_are_validated() {
        assert!(validate_key("cat.png").is_ok());
        assert!(validate_key("albums/cat.png").is_ok());
        assert!(matches!(validate_key("  "), Err(StorageError::InvalidInput(_))));
        assert!(matches!(
            validate_key("../etc/passwd"),
            Err(StorageError::InvalidInput(_))
        ));
        assert!(matches!(validate_key("/abs"), Err(StorageError::InvalidInput(_))));
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for("a.PNG"), mime::IMAGE_PNG);
        assert_eq!(content_type_for("a.jpeg"), mime::IMAGE_JPEG);
        assert_eq!(content_type_for("noext"), mime::APPLICATION_OCTET_STREAM);
    }
}
