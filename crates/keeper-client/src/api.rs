//! Keeper document API
//!
//! Thin verb methods over `Executor`. Each maps to one fixed route under
//! `{api_site}/v2/document`; retries and token handling are the executor's.

use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::request::RequestDescriptor;

/// CRUD operations on Keeper documents.
#[derive(Clone)]
pub struct DocumentApi {
    executor: Executor,
}

impl DocumentApi {
    pub fn new(executor: Executor) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// `POST /v2/document` with `doc` as the JSON body.
    pub async fn create_document(&self, doc: &Value) -> Result<Value> {
        let url = self.documents_url(None)?;
        self.executor
            .execute(RequestDescriptor::new(url).method(Method::POST).body(doc.clone()))
            .await
    }

    /// `GET /v2/document/{id}`
    pub async fn get_document(&self, id: &str) -> Result<Value> {
        let url = self.documents_url(Some(id))?;
        self.executor.execute(RequestDescriptor::new(url)).await
    }

    /// `PUT /v2/document/{doc.id}` with `update` as the JSON body.
    pub async fn update_document(&self, doc: &Value, update: &Value) -> Result<Value> {
        let id = document_id(doc)?;
        let url = self.documents_url(Some(&id))?;
        self.executor
            .execute(RequestDescriptor::new(url).method(Method::PUT).body(update.clone()))
            .await
    }

    /// `DELETE /v2/document/{doc.id}`
    pub async fn remove_document(&self, doc: &Value) -> Result<Value> {
        let id = document_id(doc)?;
        let url = self.documents_url(Some(&id))?;
        self.executor
            .execute(RequestDescriptor::new(url).method(Method::DELETE))
            .await
    }

    fn documents_url(&self, id: Option<&str>) -> Result<String> {
        let api_site = self.executor.tokens().api_site();
        let mut url = Url::parse(&api_site)
            .map_err(|e| Error::InvalidRequest(format!("api site {api_site:?} is not a valid URL: {e}")))?;
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::InvalidRequest(format!("api site {api_site:?} cannot carry a path")))?;
            segments.pop_if_empty().extend(["v2", "document"]);
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url.into())
    }
}

/// The `id` of a document, as a string or a number.
fn document_id(doc: &Value) -> Result<String> {
    match doc.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(Error::InvalidRequest("document has no id".into())),
    }
}
