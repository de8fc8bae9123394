//! Range reads from S3 and S3-compatible object storage.
//!
//! Cloud-Optimized GeoTIFFs are laid out so a reader can fetch the header
//! and a single tile with HTTP range requests. Every read checks that the
//! storage returned exactly the requested number of bytes, since tile
//! ranges come straight from TileOffsets/TileByteCounts.

use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;
use url::Url;

use super::{check_range, RangeReader};
use crate::error::IoError;

/// Location of an object in a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Object {
    pub bucket: String,
    pub key: String,
}

impl S3Object {
    /// Parse an `s3://bucket/key` URL.
    ///
    /// Returns `None` for other schemes, or when the bucket or key is empty.
    pub fn parse(source: &str) -> Option<Self> {
        let url = Url::parse(source).ok()?;
        if url.scheme() != "s3" {
            return None;
        }

        let bucket = url.host_str().filter(|b| !b.is_empty())?;
        let key = url.path().trim_start_matches('/');
        if key.is_empty() {
            return None;
        }

        Some(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }
}

impl fmt::Display for S3Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// HTTP Range header value for `len` bytes at `offset` (inclusive end).
///
/// `None` for an empty range, which HTTP cannot express.
fn byte_range(offset: u64, len: usize) -> Option<String> {
    let last = offset.checked_add(len as u64)?.checked_sub(1)?;
    (len > 0).then(|| format!("bytes={}-{}", offset, last))
}

/// Reject a response body whose length differs from the requested range.
fn expect_length(offset: u64, expected: usize, data: Bytes) -> Result<Bytes, IoError> {
    if data.len() != expected {
        return Err(IoError::ShortRead {
            offset,
            expected: expected as u64,
            actual: data.len() as u64,
        });
    }
    Ok(data)
}

/// RangeReader over one S3 object.
///
/// The object size is read once with a HEAD request when the reader is
/// opened.
#[derive(Clone)]
pub struct S3RangeReader {
    client: Client,
    object: S3Object,
    size: u64,
    identifier: String,
}

impl S3RangeReader {
    /// Open `object`, failing with `NotFound` if it does not exist.
    pub async fn open(client: Client, object: S3Object) -> Result<Self, IoError> {
        let identifier = object.to_string();

        let head = client
            .head_object()
            .bucket(&object.bucket)
            .key(&object.key)
            .send()
            .await
            .map_err(|e| {
                let missing = e.as_service_error().is_some_and(|se| se.is_not_found())
                    || e.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if missing {
                    IoError::NotFound(identifier.clone())
                } else {
                    IoError::S3(e.to_string())
                }
            })?;

        let size = head
            .content_length()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| IoError::S3(format!("{}: HEAD response has no size", identifier)))?;
        debug!(object = %identifier, size, "opened S3 object");

        Ok(Self {
            client,
            object,
            size,
            identifier,
        })
    }

    pub fn object(&self) -> &S3Object {
        &self.object
    }
}

#[async_trait]
impl RangeReader for S3RangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;
        let Some(range) = byte_range(offset, len) else {
            return Ok(Bytes::new());
        };

        let response = self
            .client
            .get_object()
            .bucket(&self.object.bucket)
            .key(&self.object.key)
            .range(range)
            .send()
            .await
            .map_err(|e| IoError::S3(e.to_string()))?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?
            .into_bytes();

        expect_length(offset, len, body)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Build an S3 client for `region`.
///
/// A custom `endpoint` (MinIO, localstack, ...) switches to path-style
/// addressing, which those services expect.
pub async fn create_s3_client(endpoint: Option<&str>, region: &str) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));
    if let Some(endpoint) = endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let sdk_config = loader.load().await;

    let config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(endpoint.is_some())
        .build();
    Client::from_conf(config)
}
