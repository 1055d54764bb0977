//! Transport-neutral request and response values.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use std::fmt;

use crate::error::ClientError;

/// HTTP verbs used by the Pantry API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// An outbound request before it reaches the transport.
///
/// `path` is relative to the configured API origin and always starts with `/`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.headers.contains_key(AUTHORIZATION)
    }

    /// Token from an `Authorization: Bearer <token>` header, if present.
    pub fn bearer_token(&self) -> Option<&str> {
        self.headers
            .get(AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
    }
}

/// Raw response from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// JSON response with the given status.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(status, value.to_string())
    }

    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode a successful body, or turn a non-2xx response into `Http`.
    ///
    /// An empty success body decodes as JSON `null`, so `()` and `Option<_>`
    /// targets accept `201`/`204` responses.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        if !self.is_success() {
            return Err(ClientError::from_response(self.status, &self.body));
        }
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        Ok(serde_json::from_slice(body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        name: String,
    }

    #[test]
    fn decodes_success_body() {
        let response = ApiResponse::new(200, r#"{"name":"salt"}"#);
        let item: Item = response.decode().unwrap();
        assert_eq!(item.name, "salt");
    }

    #[test]
    fn empty_success_body_decodes_as_unit() {
        let response = ApiResponse::empty(204);
        let () = response.decode().unwrap();
        let missing: Option<Item> = ApiResponse::empty(201).decode().unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let response = ApiResponse::new(200, "{not json");
        let err = response.decode::<Item>().unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[test]
    fn error_status_becomes_http_error() {
        let response = ApiResponse::new(404, r#"{"error":"Recipe not found"}"#);
        let err = response.decode::<Item>().unwrap_err();
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "HTTP 404: Recipe not found");
    }

    #[test]
    fn bearer_token_is_read_back() {
        let request = ApiRequest::new(Method::Get, "/api/recipes").with_header(
            AUTHORIZATION,
            HeaderValue::from_static("Bearer abc"),
        );
        assert!(request.is_authenticated());
        assert_eq!(request.bearer_token(), Some("abc"));
        assert_eq!(ApiRequest::new(Method::Get, "/").bearer_token(), None);
    }
}
