//! # Artifact Storage
//!
//! Object-store access for the pipeline: input acquisition by reference
//! and artifact publication by deterministic key. Backed by any
//! S3-compatible endpoint via `object_store`; tests swap in the in-memory
//! backend through [`ArtifactStorage::with_store`].
//!
//! Published artifacts get a durable reference: the configured public base
//! URL joined with the key when one is set, otherwise a time-limited
//! presigned URL.

use std::path::Path as FsPath;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::signer::Signer;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use tracing::debug;

use crate::config::StorageConfig;
use crate::constants::{ANONYMOUS_USER_SEGMENT, SIGNED_URL_TTL_SECS};
use crate::error::{Result, WorkerError};

/// Deterministic, collision-resistant artifact key for a finished task.
pub fn artifact_key(user_id: Option<&str>, task_id: &str) -> String {
    let user_segment = user_id.unwrap_or(ANONYMOUS_USER_SEGMENT);
    format!("uploads/{user_segment}/outputs/{task_id}.img")
}

/// Object-store client shared by acquisition and publication
#[derive(Clone)]
pub struct ArtifactStorage {
    store: Arc<dyn ObjectStore>,
    signer: Option<Arc<dyn Signer>>,
    public_base: Option<String>,
}

impl std::fmt::Debug for ArtifactStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ArtifactStorage<public_base={:?}>", self.public_base)
    }
}

impl ArtifactStorage {
    /// Build against an S3-compatible endpoint.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let s3 = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key)
            .with_secret_access_key(&config.secret_key)
            .with_region("auto")
            .with_virtual_hosted_style_request(false)
            .with_allow_http(true)
            .build()
            .map_err(|e| WorkerError::configuration(format!("object store: {e}")))?;

        let s3 = Arc::new(s3);
        Ok(Self {
            store: s3.clone(),
            signer: Some(s3),
            public_base: config.public_url.clone(),
        })
    }

    /// Wrap an existing backend (tests, development). No presigned-URL
    /// support; set a public base for publication to succeed.
    pub fn with_store(store: Arc<dyn ObjectStore>, public_base: Option<String>) -> Self {
        Self {
            store,
            signer: None,
            public_base,
        }
    }

    /// Storage key for a supplied reference: a single leading slash is
    /// stripped, the rest is used verbatim.
    pub fn object_key(reference: &str) -> &str {
        reference.strip_prefix('/').unwrap_or(reference)
    }

    /// Fetch an object by reference into a local file.
    pub async fn fetch_to_file(&self, reference: &str, local: &FsPath) -> Result<()> {
        let key = Self::object_key(reference);
        let path = ObjectPath::from(key);

        let data = self
            .store
            .get(&path)
            .await
            .map_err(|e| WorkerError::acquisition(reference, e))?
            .bytes()
            .await
            .map_err(|e| WorkerError::acquisition(reference, e))?;

        tokio::fs::write(local, &data)
            .await
            .map_err(|e| WorkerError::acquisition(reference, e))?;

        debug!(key, local = %local.display(), bytes = data.len(), "Fetched input object");
        Ok(())
    }

    /// Upload a local file at the given key and return a durable reference.
    pub async fn publish_file(
        &self,
        local: &FsPath,
        key: &str,
        content_type: &str,
    ) -> Result<String> {
        let data = tokio::fs::read(local)
            .await
            .map_err(|e| WorkerError::publication(format!("{}: {e}", local.display())))?;

        let path = ObjectPath::from(key);
        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());

        self.store
            .put_opts(
                &path,
                PutPayload::from(Bytes::from(data)),
                PutOptions {
                    attributes,
                    ..Default::default()
                },
            )
            .await
            .map_err(WorkerError::publication)?;

        let url = self.reference_url(&path, key).await?;
        debug!(key, url = %url, "Published artifact");
        Ok(url)
    }

    /// Public base + key, or a presigned GET as fallback.
    async fn reference_url(&self, path: &ObjectPath, key: &str) -> Result<String> {
        if let Some(base) = &self.public_base {
            return Ok(format!("{}/{key}", base.trim_end_matches('/')));
        }

        let Some(signer) = &self.signer else {
            return Err(WorkerError::publication(
                "no public URL configured and backend cannot presign",
            ));
        };

        let url = signer
            .signed_url(
                http::Method::GET,
                path,
                Duration::from_secs(SIGNED_URL_TTL_SECS),
            )
            .await
            .map_err(WorkerError::publication)?;
        Ok(url.to_string())
    }

    /// Storage-relative path for a reference URL, falling back to the
    /// deterministic key when the URL does not match the public base.
    pub fn storage_relative_path(&self, url: &str, fallback_key: &str) -> String {
        if let Some(base) = &self.public_base {
            let base = base.trim_end_matches('/');
            if let Some(rest) = url.strip_prefix(base) {
                return rest.trim_start_matches('/').to_string();
            }
        }
        fallback_key.to_string()
    }
}
