//! REST transport.
//!
//! Screens talk to the server only through [`BackofficeApi`], so tests and
//! alternative transports can stand in for [`HttpApi`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use backoffice_core::RowId;

use crate::common_data::Descriptors;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::import::{ImportBatch, ImportException, ImportPreview, ImportRequest, ImportStatus};
use crate::types::ListResponse;
use crate::upload::UploadChunk;

#[async_trait]
pub trait BackofficeApi: Send + Sync {
    /// `GET <entity>?<query string>`; `path` comes from [`crate::query::QueryKey::path`].
    async fn list(&self, path: &str) -> Result<ListResponse, ApiError>;

    async fn create(&self, entity: &str, body: &Value) -> Result<Value, ApiError>;

    async fn update(&self, entity: &str, id: RowId, body: &Value) -> Result<Value, ApiError>;

    /// Delete one record, or a batch when more than one id is given.
    async fn delete(&self, entity: &str, ids: &[RowId]) -> Result<(), ApiError>;

    /// Fetch several common-data blocks in one round trip.
    async fn common_data(&self, descriptors: &Descriptors) -> Result<BTreeMap<String, Value>, ApiError>;

    async fn import_upload(
        &self,
        entity: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ImportPreview, ApiError>;

    async fn import_process(&self, entity: &str, request: &ImportRequest) -> Result<ImportBatch, ApiError>;

    async fn import_status(&self, batch: &ImportBatch) -> Result<ImportStatus, ApiError>;

    async fn import_exceptions(&self, batch: &ImportBatch) -> Result<Vec<ImportException>, ApiError>;

    async fn upload_chunk(&self, endpoint: &str, chunk: UploadChunk) -> Result<Value, ApiError>;

    /// `GET <entity>-export?<query string>`, raw file bytes.
    async fn export(&self, path: &str) -> Result<Vec<u8>, ApiError>;
}

/// `reqwest`-backed implementation.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct BatchEnvelope {
    batch: ImportBatch,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::new(base_url)
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        match &config.auth_token {
            Some(token) => Self::with_token(&config.api_url, token),
            None => Self::new(&config.api_url),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, ApiError> {
        let req = match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        };

        let resp = req.header(ACCEPT, "application/json").send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), "request failed");
        Err(ApiError::from_status(status.as_u16(), &body))
    }

    async fn json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        let resp = self.send(req).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }
}

#[async_trait]
impl BackofficeApi for HttpApi {
    async fn list(&self, path: &str) -> Result<ListResponse, ApiError> {
        self.json(self.client.get(self.url(path))).await
    }

    async fn create(&self, entity: &str, body: &Value) -> Result<Value, ApiError> {
        self.json(self.client.post(self.url(entity)).json(body)).await
    }

    async fn update(&self, entity: &str, id: RowId, body: &Value) -> Result<Value, ApiError> {
        let url = self.url(&format!("{entity}/{id}"));
        self.json(self.client.put(url).json(body)).await
    }

    async fn delete(&self, entity: &str, ids: &[RowId]) -> Result<(), ApiError> {
        let req = match ids {
            [id] => self.client.delete(self.url(&format!("{entity}/{id}"))),
            _ => self
                .client
                .delete(self.url(entity))
                .json(&json!({ "ids": ids })),
        };
        self.send(req).await?;
        Ok(())
    }

    async fn common_data(&self, descriptors: &Descriptors) -> Result<BTreeMap<String, Value>, ApiError> {
        let req = self
            .client
            .post(self.url("common-data"))
            .json(&json!({ "blocks": descriptors }));
        self.json(req).await
    }

    async fn import_upload(
        &self,
        entity: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> Result<ImportPreview, ApiError> {
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name.to_string()));
        let req = self
            .client
            .post(self.url(&format!("{entity}/import")))
            .multipart(form);
        self.json(req).await
    }

    async fn import_process(&self, entity: &str, request: &ImportRequest) -> Result<ImportBatch, ApiError> {
        let req = self
            .client
            .post(self.url(&format!("{entity}/import/process")))
            .json(request);
        let envelope: BatchEnvelope = self.json(req).await?;
        Ok(envelope.batch)
    }

    async fn import_status(&self, batch: &ImportBatch) -> Result<ImportStatus, ApiError> {
        let url = self.url(&format!("import/process/{}/{}", batch.name, batch.id));
        self.json(self.client.get(url)).await
    }

    async fn import_exceptions(&self, batch: &ImportBatch) -> Result<Vec<ImportException>, ApiError> {
        let url = self.url(&format!("import/exception/{}", batch.name));
        self.json(self.client.get(url)).await
    }

    async fn upload_chunk(&self, endpoint: &str, chunk: UploadChunk) -> Result<Value, ApiError> {
        let form = Form::new()
            .text("chunk_index", chunk.index.to_string())
            .text("total_chunks", chunk.total.to_string())
            .text("file_name", chunk.file_name.clone())
            .part("file", Part::bytes(chunk.data).file_name(chunk.file_name));
        self.json(self.client.post(self.url(endpoint)).multipart(form))
            .await
    }

    async fn export(&self, path: &str) -> Result<Vec<u8>, ApiError> {
        let resp = self.send(self.client.get(self.url(path))).await?;
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }
}
