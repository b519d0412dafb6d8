//! Request descriptors
//!
//! A `RequestDescriptor` describes one logical API call. Unset fields take the
//! defaults the executor applies before sending: GET, JSON body and response.

use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde_json::Value;

/// One API call, as requested by a caller.
#[derive(Debug, Clone, Default)]
pub struct RequestDescriptor {
    pub method: Option<Method>,
    pub url: String,
    /// Send and expect JSON; `None` means yes
    pub json: Option<bool>,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.json = Some(json);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub(crate) fn normalize(self) -> PreparedRequest {
        PreparedRequest {
            method: self.method.unwrap_or(Method::GET),
            url: self.url,
            json: self.json.unwrap_or(true),
            body: self.body,
        }
    }
}

/// A descriptor with defaults applied; reused verbatim across retries.
#[derive(Debug, Clone)]
pub(crate) struct PreparedRequest {
    pub method: Method,
    pub url: String,
    pub json: bool,
    pub body: Option<Value>,
}

impl PreparedRequest {
    pub fn builder(&self, client: &reqwest::Client, access_token: Option<&str>) -> reqwest::RequestBuilder {
        let mut builder = client.request(self.method.clone(), &self.url);
        if let Some(token) = access_token {
            builder = builder.bearer_auth(token);
        }
        if self.json {
            builder = builder.header(ACCEPT, HeaderValue::from_static("application/json"));
            if let Some(body) = &self.body {
                builder = builder.json(body);
            }
        } else if let Some(body) = &self.body {
            let text = match body {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            builder = builder
                .header(CONTENT_TYPE, HeaderValue::from_static("text/plain"))
                .body(text);
        }
        builder
    }

    /// Decode a response body.
    ///
    /// In JSON mode an empty body is `null` and unparseable text is returned
    /// as a JSON string. Otherwise the body is always a JSON string.
    pub fn decode_body(&self, bytes: &[u8]) -> Value {
        let text = String::from_utf8_lossy(bytes);
        if !self.json {
            return Value::String(text.into_owned());
        }
        if text.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(bytes).unwrap_or_else(|_| Value::String(text.into_owned()))
    }
}
