//! Shared Response Module
//!
//! A response whose body has been drained once into memory so that any
//! number of callers can read it independently.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    http::{header::CONTENT_LENGTH, HeaderMap, HeaderValue, Response, StatusCode, Version},
    response::IntoResponse,
};
use serde::de::DeserializeOwned;

use crate::error::{BodyAccessor, CacheError, Result};

// == Snapshot ==
/// Immutable copy of a response taken at store time.
#[derive(Debug)]
struct Snapshot {
    status: StatusCode,
    version: Version,
    headers: HeaderMap,
    text: String,
    /// Length of the drained body before text decoding
    raw_len: usize,
}

// == Shared Response ==
/// Multi-read handle over a materialized response.
///
/// Cloning is cheap; every clone reads the same snapshot. Accessors are pure
/// functions of the buffered text, so concurrent readers never interfere.
/// The buffer holds text, which cannot represent arbitrary binary payloads,
/// so the binary accessors always fail.
#[derive(Debug, Clone)]
pub struct SharedResponse {
    inner: Arc<Snapshot>,
}

impl SharedResponse {
    // == Materialize ==
    /// Drains a one-shot response body exactly once and wraps the result.
    ///
    /// Invalid UTF-8 in the body is replaced with U+FFFD. A transport error
    /// while draining is reported as [`CacheError::Downstream`].
    pub async fn materialize(response: Response<Body>) -> Result<Self> {
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, usize::MAX)
            .await
            .map_err(|err| CacheError::Downstream(Box::new(err)))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();

        Ok(Self {
            inner: Arc::new(Snapshot {
                status: parts.status,
                version: parts.version,
                headers: parts.headers,
                text,
                raw_len: bytes.len(),
            }),
        })
    }

    // == Metadata ==
    /// Status code of the stored response.
    pub fn status(&self) -> StatusCode {
        self.inner.status
    }

    /// HTTP version of the stored response.
    pub fn version(&self) -> Version {
        self.inner.version
    }

    /// Headers of the stored response, as received.
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    // == Body Accessors ==
    /// The buffered body as text.
    pub fn text(&self) -> &str {
        &self.inner.text
    }

    /// Parses the buffered body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.inner.text)?)
    }

    /// Always fails: raw bytes are not kept.
    pub fn bytes(&self) -> Result<Bytes> {
        Err(CacheError::UnsupportedBodyAccess(BodyAccessor::Bytes))
    }

    /// Always fails: binary large objects are not kept.
    pub fn blob(&self) -> Result<Bytes> {
        Err(CacheError::UnsupportedBodyAccess(BodyAccessor::Blob))
    }

    /// Always fails: form bodies are not kept.
    pub fn form_data(&self) -> Result<Vec<(String, String)>> {
        Err(CacheError::UnsupportedBodyAccess(BodyAccessor::FormData))
    }

    // == Conversion ==
    /// Builds a fresh response from the snapshot.
    ///
    /// A `Content-Length` header is kept as received unless decoding
    /// changed the body length (invalid UTF-8), in which case it is
    /// rewritten to match the buffered text. Bodiless responses such as
    /// HEAD keep their advertised length.
    pub fn to_response(&self) -> Response<Body> {
        let mut response = Response::new(Body::from(self.inner.text.clone()));
        *response.status_mut() = self.inner.status;
        *response.version_mut() = self.inner.version;
        *response.headers_mut() = self.inner.headers.clone();
        if self.inner.text.len() != self.inner.raw_len
            && response.headers().contains_key(CONTENT_LENGTH)
        {
            response
                .headers_mut()
                .insert(CONTENT_LENGTH, HeaderValue::from(self.inner.text.len()));
        }
        response
    }

    /// Returns true if both handles read the same snapshot.
    pub fn shares_snapshot_with(&self, other: &SharedResponse) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl IntoResponse for SharedResponse {
    fn into_response(self) -> axum::response::Response {
        self.to_response()
    }
}
