//! Response body helpers.

use crate::base::neterror::NetError;
use crate::ops::HttpResponse;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};

/// Reads an entire response body.
pub async fn read_body(resp: HttpResponse) -> Result<Bytes, NetError> {
    let collected = resp.into_body().collect().await?;
    Ok(collected.to_bytes())
}

/// Reads an entire response body as UTF-8 text.
pub async fn read_text(resp: HttpResponse) -> Result<String, NetError> {
    let bytes = read_body(resp).await?;
    String::from_utf8(bytes.to_vec())
        .map_err(|e| NetError::InvalidRequest(format!("response body is not utf-8: {e}")))
}

/// Reads and deserializes a JSON response body.
pub async fn read_json<T: serde::de::DeserializeOwned>(resp: HttpResponse) -> Result<T, NetError> {
    let bytes = read_body(resp).await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| NetError::InvalidRequest(format!("response body is not json: {e}")))
}

/// Builds a request body from bytes.
pub fn full(body: impl Into<Bytes>) -> Full<Bytes> {
    Full::new(body.into())
}

/// An empty request body.
pub fn empty() -> Full<Bytes> {
    Full::new(Bytes::new())
}
